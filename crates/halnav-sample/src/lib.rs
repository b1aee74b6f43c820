//! # HAL Catalog Sample Library
//!
//! A product catalog service and a gateway in front of it, both built on `halnav`.
//! This library exposes the modules for the demo binary and the integration tests.

pub mod api;
pub mod catalog;
pub mod clients;
pub mod error;
pub mod gateway;
pub mod lifecycle;
pub mod model;
