//! Tool descriptors (spec §3 "Tool descriptor").

use serde::{Deserialize, Serialize};

/// A single declared tool parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolParam {
    /// Parameter name, keyed into the `arguments` object at call time.
    pub name: String,
    /// Type tag (`"string"`, `"int"`, `"float"`, `"bool"`, or any custom label).
    #[serde(rename = "type")]
    pub type_tag: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Whether `call_tool` must reject a call missing this parameter.
    pub required: bool,
}

impl ToolParam {
    /// Convenience constructor for a required string parameter.
    #[must_use]
    pub fn required(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_tag: "string".to_string(),
            description: description.into(),
            required: true,
        }
    }
}

/// A registered tool: a name unique within the server, a description, and an
/// ordered parameter list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Unique tool name.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Ordered parameter declarations.
    #[serde(default)]
    pub params: Vec<ToolParam>,
}

impl ToolDescriptor {
    /// Creates a new tool descriptor with no parameters.
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            params: Vec::new(),
        }
    }

    /// Appends a parameter declaration, builder-style.
    #[must_use]
    pub fn with_param(mut self, param: ToolParam) -> Self {
        self.params.push(param);
        self
    }
}
