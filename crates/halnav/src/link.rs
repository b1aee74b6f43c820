//! # Links
//!
//! A [`Link`] points at a resolved URI or at a URI template. Whether a link is
//! templated is never stored separately: it is derived from the href, so a link is
//! a template if and only if at least one of its variables is still unbound.

use crate::uri_template::{self, UriTemplate};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A hypermedia link as it appears in `_links`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "LinkRepr", into = "LinkRepr")]
pub struct Link {
    href: String,
    title: Option<String>,
    name: Option<String>,
    media_type: Option<String>,
}

impl Link {
    pub fn new(href: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            ..Self::default()
        }
    }

    /// Builds a link from a template, expanding the given variables and keeping
    /// unbound ones (`null` values) as template expressions.
    pub fn from_template(template: &str, variables: &Map<String, Value>) -> Self {
        Self::new(UriTemplate::parse(template).bind_all(variables).expand_partial())
    }

    /// The same link pointing elsewhere, e.g. after resolving a relative href.
    pub fn with_href(mut self, href: impl Into<String>) -> Self {
        self.href = href.into();
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = Some(media_type.into());
        self
    }

    pub fn href(&self) -> &str {
        &self.href
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn media_type(&self) -> Option<&str> {
        self.media_type.as_deref()
    }

    pub fn is_templated(&self) -> bool {
        uri_template::has_expressions(&self.href)
    }
}

#[derive(Serialize, Deserialize)]
struct LinkRepr {
    href: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    templated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    media_type: Option<String>,
}

impl From<LinkRepr> for Link {
    fn from(repr: LinkRepr) -> Self {
        Self {
            href: repr.href,
            title: repr.title,
            name: repr.name,
            media_type: repr.media_type,
        }
    }
}

impl From<Link> for LinkRepr {
    fn from(link: Link) -> Self {
        Self {
            templated: link.is_templated(),
            href: link.href,
            title: link.title,
            name: link.name,
            media_type: link.media_type,
        }
    }
}
