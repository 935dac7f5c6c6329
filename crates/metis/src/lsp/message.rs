//! The JSON-RPC 2.0 message envelope and its wire serialization.
//!
//! A message is exactly one of three shapes:
//!
//! - **request**: `id` + `method`
//! - **response**: `id` + (`result` xor `error`)
//! - **notification**: `method`, no `id`, no `result`/`error`
//!
//! On the wire every message is framed as
//! `Content-Length: <N>\r\nContent-Type: <mime>\r\n\r\n<N bytes of UTF-8 JSON>`
//! where `<N>` counts *bytes* of the encoded body, not characters.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// MIME type sent in the `Content-Type` header of every outgoing message.
pub const CONTENT_TYPE: &str = "application/vscode-jsonrpc; charset=utf-8";

fn jsonrpc_version() -> String {
    "2.0".to_string()
}

/// Deserialize a present-but-null field as `Some(Value::Null)`.
///
/// Plain `Option<Value>` folds JSON `null` into `None`, but for the
/// `result` member the distinction matters: a null result is still a
/// result, and makes the message a response.
fn some_value<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// A JSON-RPC request identifier. The protocol allows both integers and
/// strings; this client only allocates integers but must accept either in
/// messages originating from the server.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    /// Numeric id, allocated by this client's session counter.
    Number(i64),
    /// String id, only ever seen on server-originated requests.
    Text(String),
}

impl RequestId {
    /// The numeric value of this id, parsing string ids that hold digits.
    #[must_use]
    pub fn as_number(&self) -> Option<i64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.parse().ok(),
        }
    }
}

impl From<i64> for RequestId {
    fn from(id: i64) -> Self {
        Self::Number(id)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

/// The `error` member of a response envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseError {
    /// JSON-RPC error code.
    pub code: i64,
    /// Human-readable error description.
    pub message: String,
    /// Optional server-defined payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// A JSON-RPC 2.0 message envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Protocol version, always `"2.0"`.
    #[serde(default = "jsonrpc_version")]
    pub jsonrpc: String,
    /// Request/response correlation id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<RequestId>,
    /// Method name for requests and notifications.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    /// Arguments for requests and notifications.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    /// Result payload for successful responses. `Some(Value::Null)` and
    /// absent are distinct: a null result is still a result.
    #[serde(
        default,
        deserialize_with = "some_value",
        skip_serializing_if = "Option::is_none"
    )]
    pub result: Option<Value>,
    /// Error payload for failed responses.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ResponseError>,
}

impl Message {
    fn empty() -> Self {
        Self {
            jsonrpc: jsonrpc_version(),
            id: None,
            method: None,
            params: None,
            result: None,
            error: None,
        }
    }

    /// Create a request message.
    #[must_use]
    pub fn request(id: impl Into<RequestId>, method: &str, params: Value) -> Self {
        Self {
            id: Some(id.into()),
            method: Some(method.to_string()),
            params: Some(params),
            ..Self::empty()
        }
    }

    /// Create a successful response message.
    #[must_use]
    pub fn response(id: RequestId, result: Value) -> Self {
        Self {
            id: Some(id),
            result: Some(result),
            ..Self::empty()
        }
    }

    /// Create an error response message.
    #[must_use]
    pub fn error_response(id: RequestId, code: i64, message: &str) -> Self {
        Self {
            id: Some(id),
            error: Some(ResponseError {
                code,
                message: message.to_string(),
                data: None,
            }),
            ..Self::empty()
        }
    }

    /// Create a notification message.
    #[must_use]
    pub fn notification(method: &str, params: Value) -> Self {
        Self {
            method: Some(method.to_string()),
            params: Some(params),
            ..Self::empty()
        }
    }

    /// A request carries both an id and a method.
    #[must_use]
    pub fn is_request(&self) -> bool {
        self.id.is_some() && self.method.is_some()
    }

    /// A response carries an id and either a result or an error.
    #[must_use]
    pub fn is_response(&self) -> bool {
        self.id.is_some() && (self.result.is_some() || self.error.is_some())
    }

    /// A notification carries a method and nothing that would make it a
    /// request or response.
    #[must_use]
    pub fn is_notification(&self) -> bool {
        self.method.is_some() && self.id.is_none() && self.result.is_none() && self.error.is_none()
    }

    /// Serialize to the framed wire format.
    ///
    /// # Errors
    ///
    /// Returns the underlying `serde_json` error if the params or result
    /// payload cannot be serialized.
    pub fn to_wire(&self) -> Result<Vec<u8>, serde_json::Error> {
        let body = serde_json::to_vec(self)?;
        let header = format!(
            "Content-Length: {}\r\nContent-Type: {CONTENT_TYPE}\r\n\r\n",
            body.len()
        );
        let mut framed = Vec::with_capacity(header.len() + body.len());
        framed.extend_from_slice(header.as_bytes());
        framed.extend_from_slice(&body);
        Ok(framed)
    }
}
