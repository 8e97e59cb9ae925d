//! Content items returned from `read_resource` and `call_tool` (spec §3).

use serde::{Deserialize, Serialize};

/// The three content shapes a handler may return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    /// Plain UTF-8 text.
    Text,
    /// A JSON value, carried as its serialized bytes.
    Json,
    /// Opaque binary data.
    Blob,
}

/// A single content item. Each item owns its `mime_type` and `data`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentItem {
    /// Discriminates how `data` should be interpreted.
    #[serde(rename = "type")]
    pub content_type: ContentType,
    /// MIME type of the payload, e.g. `text/plain`.
    pub mime_type: String,
    /// The payload bytes. For `Text`/`Json` this is valid UTF-8.
    #[serde(skip)]
    pub data: Vec<u8>,
}

impl ContentItem {
    /// Builds a text content item.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content_type: ContentType::Text,
            mime_type: "text/plain".to_string(),
            data: text.into().into_bytes(),
        }
    }

    /// Builds a JSON content item from an already-serialized value.
    #[must_use]
    pub fn json(value: &serde_json::Value) -> Self {
        Self {
            content_type: ContentType::Json,
            mime_type: "application/json".to_string(),
            data: serde_json::to_vec(value).unwrap_or_default(),
        }
    }

    /// Builds a binary content item.
    #[must_use]
    pub fn blob(mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            content_type: ContentType::Blob,
            mime_type: mime_type.into(),
            data,
        }
    }

    /// Size of the payload in bytes.
    #[must_use]
    pub fn data_size(&self) -> usize {
        self.data.len()
    }

    /// Renders this item as the wire-shape object used in MCP responses:
    /// `{"type", "mimeType", "text"|"data"}` (base64 for blob).
    #[must_use]
    pub fn to_wire(&self) -> serde_json::Value {
        use base64_lite::encode;
        let mut obj = serde_json::Map::new();
        obj.insert(
            "type".to_string(),
            serde_json::to_value(self.content_type).unwrap(),
        );
        obj.insert("mimeType".to_string(), self.mime_type.clone().into());
        match self.content_type {
            ContentType::Text => {
                obj.insert(
                    "text".to_string(),
                    String::from_utf8_lossy(&self.data).into_owned().into(),
                );
            }
            ContentType::Json => {
                let v: serde_json::Value =
                    serde_json::from_slice(&self.data).unwrap_or(serde_json::Value::Null);
                obj.insert("text".to_string(), v.to_string().into());
            }
            ContentType::Blob => {
                obj.insert("data".to_string(), encode(&self.data).into());
            }
        }
        serde_json::Value::Object(obj)
    }
}

/// Minimal inline base64 encoder so `mcprt-protocol` doesn't need an extra
/// dependency just for blob content's wire representation.
mod base64_lite {
    const ALPHABET: &[u8; 64] =
        b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

    pub fn encode(data: &[u8]) -> String {
        let mut out = String::with_capacity(data.len().div_ceil(3) * 4);
        for chunk in data.chunks(3) {
            let b0 = chunk[0];
            let b1 = chunk.get(1).copied().unwrap_or(0);
            let b2 = chunk.get(2).copied().unwrap_or(0);
            out.push(ALPHABET[(b0 >> 2) as usize] as char);
            out.push(ALPHABET[(((b0 & 0x03) << 4) | (b1 >> 4)) as usize] as char);
            out.push(if chunk.len() > 1 {
                ALPHABET[(((b1 & 0x0f) << 2) | (b2 >> 6)) as usize] as char
            } else {
                '='
            });
            out.push(if chunk.len() > 2 {
                ALPHABET[(b2 & 0x3f) as usize] as char
            } else {
                '='
            });
        }
        out
    }
}
