//! # HAL Documents
//!
//! [`HalResource`] is the in-memory form of a `application/hal+json` document:
//! a JSON object of state fields plus the reserved `_links` and `_embedded` maps.
//!
//! Relations are kept in ordered maps, so documents built from the same input
//! serialize byte-for-byte identically with relation groups sorted by name. Within
//! a relation, links and embedded documents keep their insertion order.
//!
//! On the wire a relation holding a single entry is written as a plain object and
//! a relation holding several as an array; both forms are accepted when reading.

use crate::error::{HalError, Result};
use crate::link::Link;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

pub const LINKS: &str = "_links";
pub const EMBEDDED: &str = "_embedded";
pub const SELF: &str = "self";

/// A HAL document.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HalResource {
    state: Map<String, Value>,
    links: BTreeMap<String, Vec<Link>>,
    embedded: BTreeMap<String, Vec<HalResource>>,
}

impl HalResource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a document from a state value. `null` yields an empty state;
    /// anything other than a JSON object is rejected.
    pub fn from_state(state: Value) -> Result<Self> {
        let mut resource = Self::new();
        resource.set_state(state)?;
        Ok(resource)
    }

    /// Replaces the state with the fields of a JSON object.
    pub fn with_state_map(mut self, state: Map<String, Value>) -> Self {
        self.state = state
            .into_iter()
            .filter(|(k, _)| k != LINKS && k != EMBEDDED)
            .collect();
        self
    }

    pub fn with_link(mut self, relation: &str, link: Link) -> Self {
        self.add_link(relation, link);
        self
    }

    pub fn with_embedded(mut self, relation: &str, resource: HalResource) -> Self {
        self.add_embedded(relation, resource);
        self
    }

    pub fn set_state(&mut self, state: Value) -> Result<()> {
        match state {
            Value::Null => self.state.clear(),
            Value::Object(map) => {
                self.state = map
                    .into_iter()
                    .filter(|(k, _)| k != LINKS && k != EMBEDDED)
                    .collect();
            }
            other => {
                return Err(HalError::developer(format!(
                    "resource state must be a JSON object, got {other}"
                )))
            }
        }
        Ok(())
    }

    pub fn state(&self) -> &Map<String, Value> {
        &self.state
    }

    /// The state as a standalone JSON object (without `_links`/`_embedded`).
    pub fn state_value(&self) -> Value {
        Value::Object(self.state.clone())
    }

    pub fn add_link(&mut self, relation: &str, link: Link) {
        self.links.entry(relation.to_string()).or_default().push(link);
    }

    /// Replaces all links of a relation with a single link.
    pub fn set_link(&mut self, relation: &str, link: Link) {
        self.links.insert(relation.to_string(), vec![link]);
    }

    pub fn add_embedded(&mut self, relation: &str, resource: HalResource) {
        self.embedded
            .entry(relation.to_string())
            .or_default()
            .push(resource);
    }

    pub fn links(&self, relation: &str) -> &[Link] {
        self.links.get(relation).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn link(&self, relation: &str) -> Option<&Link> {
        self.links(relation).first()
    }

    pub fn self_link(&self) -> Option<&Link> {
        self.link(SELF)
    }

    pub fn embedded(&self, relation: &str) -> &[HalResource] {
        self.embedded
            .get(relation)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn link_relations(&self) -> impl Iterator<Item = &str> {
        self.links.keys().map(String::as_str)
    }

    pub fn embedded_relations(&self) -> impl Iterator<Item = &str> {
        self.embedded.keys().map(String::as_str)
    }

    pub fn to_json(&self) -> Value {
        let mut object = Map::new();
        if !self.links.is_empty() {
            let links = self
                .links
                .iter()
                .map(|(rel, links)| (rel.clone(), relation_value(links.as_slice(), to_value)))
                .collect();
            object.insert(LINKS.to_string(), Value::Object(links));
        }
        for (key, value) in &self.state {
            object.insert(key.clone(), value.clone());
        }
        if !self.embedded.is_empty() {
            let embedded = self
                .embedded
                .iter()
                .map(|(rel, docs)| (rel.clone(), relation_value(docs.as_slice(), HalResource::to_json)))
                .collect();
            object.insert(EMBEDDED.to_string(), Value::Object(embedded));
        }
        Value::Object(object)
    }

    pub fn from_json(value: Value) -> std::result::Result<Self, String> {
        let Value::Object(mut object) = value else {
            return Err("HAL document must be a JSON object".to_string());
        };
        let mut resource = Self::new();
        if let Some(links) = object.remove(LINKS) {
            let Value::Object(links) = links else {
                return Err(format!("{LINKS} must be an object"));
            };
            for (rel, entries) in links {
                for entry in entries_of(entries) {
                    let link: Link = serde_json::from_value(entry)
                        .map_err(|e| format!("invalid link for relation '{rel}': {e}"))?;
                    resource.add_link(&rel, link);
                }
            }
        }
        if let Some(embedded) = object.remove(EMBEDDED) {
            let Value::Object(embedded) = embedded else {
                return Err(format!("{EMBEDDED} must be an object"));
            };
            for (rel, entries) in embedded {
                for entry in entries_of(entries) {
                    resource.add_embedded(&rel, Self::from_json(entry)?);
                }
            }
        }
        resource.state = object;
        Ok(resource)
    }
}

fn to_value(link: &Link) -> Value {
    serde_json::to_value(link).unwrap_or(Value::Null)
}

fn relation_value<T>(entries: &[T], convert: impl Fn(&T) -> Value) -> Value {
    match entries {
        [single] => convert(single),
        many => Value::Array(many.iter().map(convert).collect()),
    }
}

fn entries_of(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        single => vec![single],
    }
}

impl Serialize for HalResource {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for HalResource {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        HalResource::from_json(value).map_err(D::Error::custom)
    }
}
