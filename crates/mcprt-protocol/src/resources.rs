//! Resource and resource-template descriptors (spec §3).

use serde::{Deserialize, Serialize};

/// A resource bound to a concrete URI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    /// Concrete URI; unique within the server's resource set.
    pub uri: String,
    /// Optional display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Optional human-readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ResourceDescriptor {
    /// Creates a new resource descriptor for the given URI.
    #[must_use]
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            name: None,
            description: None,
        }
    }
}

/// A resource template bound to a URI pattern (spec §4.3 grammar).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceTemplateDescriptor {
    /// The raw template string, e.g. `example://{user}/posts/{post_id:int}`.
    #[serde(rename = "uriTemplate")]
    pub uri_template: String,
    /// Optional display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Optional human-readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ResourceTemplateDescriptor {
    /// Creates a new resource template descriptor.
    #[must_use]
    pub fn new(uri_template: impl Into<String>) -> Self {
        Self {
            uri_template: uri_template.into(),
            name: None,
            description: None,
        }
    }
}
