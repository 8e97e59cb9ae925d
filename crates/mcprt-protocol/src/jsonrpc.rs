//! JSON-RPC 2.0 envelope types (spec §6 "External Interfaces").

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;

/// The literal `"2.0"` JSON-RPC version marker, serialized as a bare string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JsonRpcVersion;

impl Serialize for JsonRpcVersion {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str("2.0")
    }
}

impl<'de> Deserialize<'de> for JsonRpcVersion {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        if s == "2.0" {
            Ok(JsonRpcVersion)
        } else {
            Err(serde::de::Error::custom(format!(
                "invalid jsonrpc version: expected \"2.0\", got {s:?}"
            )))
        }
    }
}

/// A JSON-RPC request id: either a number or a string, per the spec.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    /// Numeric id.
    Number(i64),
    /// String id.
    String(String),
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s}"),
        }
    }
}

/// A single JSON-RPC request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    /// Always `"2.0"`.
    pub jsonrpc: JsonRpcVersion,
    /// Method name to dispatch.
    pub method: String,
    /// Optional parameters object or array.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    /// Request identifier, echoed back in the response.
    pub id: RequestId,
}

/// A JSON-RPC error payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    /// Numeric error code (spec §6 table).
    pub code: i64,
    /// Human-readable message.
    pub message: String,
    /// Optional structured error data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// The payload half of a response: mutually exclusive result or error.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JsonRpcResponsePayload {
    /// Successful result.
    Success {
        /// The result value.
        result: Value,
    },
    /// Error result.
    Error {
        /// The error object.
        error: JsonRpcError,
    },
}

/// A single JSON-RPC response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// Always `"2.0"`.
    pub jsonrpc: JsonRpcVersion,
    /// Result or error, flattened into the same object.
    #[serde(flatten)]
    pub payload: JsonRpcResponsePayload,
    /// Echoes the request id.
    pub id: RequestId,
}

impl JsonRpcResponse {
    /// Builds a success response.
    #[must_use]
    pub fn success(id: RequestId, result: Value) -> Self {
        Self {
            jsonrpc: JsonRpcVersion,
            payload: JsonRpcResponsePayload::Success { result },
            id,
        }
    }

    /// Builds an error response from an [`crate::error::McpError`].
    #[must_use]
    pub fn from_error(id: RequestId, err: &crate::error::McpError) -> Self {
        Self {
            jsonrpc: JsonRpcVersion,
            payload: JsonRpcResponsePayload::Error {
                error: JsonRpcError {
                    code: err.kind.code(),
                    message: err.message.clone(),
                    data: None,
                },
            },
            id,
        }
    }
}

/// Either a single request or a batch of requests (spec §6: "Batch is a JSON array").
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JsonRpcEnvelope {
    /// A single request.
    Single(JsonRpcRequest),
    /// A batch of requests, processed independently with order preserved.
    Batch(Vec<JsonRpcRequest>),
}

/// Either a single response or a batch of responses, mirroring [`JsonRpcEnvelope`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JsonRpcResponseEnvelope {
    /// A single response.
    Single(JsonRpcResponse),
    /// A batch of responses in request order.
    Batch(Vec<JsonRpcResponse>),
}
