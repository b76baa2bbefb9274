//! Wire message definitions
//!
//! This module defines the JSON frames exchanged with the remote debugging server.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outbound command
#[derive(Debug, Clone, Serialize)]
pub struct RpcRequest {
    /// Request ID
    pub id: u64,
    /// Method name (e.g., "Page.navigate")
    pub method: String,
    /// Method parameters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl RpcRequest {
    /// Build a request, dropping `null` and empty-object parameters
    pub fn new(id: u64, method: &str, params: Value) -> Self {
        let params = match params {
            Value::Null => None,
            Value::Object(map) if map.is_empty() => None,
            other => Some(other),
        };

        Self {
            id,
            method: method.to_string(),
            params,
        }
    }
}

/// Inbound notification (event)
#[derive(Debug, Clone, PartialEq)]
pub struct RpcNotification {
    /// Event method (e.g., "Page.loadEventFired")
    pub method: String,
    /// Event parameters
    pub params: Value,
}

/// Error object carried by a response
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RpcErrorDetail {
    /// Error code
    pub code: i64,
    /// Error message
    #[serde(default)]
    pub message: String,
    /// Additional error data
    #[serde(default)]
    pub data: Option<Value>,
}

impl From<RpcErrorDetail> for Error {
    fn from(detail: RpcErrorDetail) -> Self {
        Error::RemoteCall {
            code: detail.code,
            message: detail.message,
            data: detail.data,
        }
    }
}

/// Inbound response
#[derive(Debug, Clone, PartialEq)]
pub struct RpcResponse {
    /// Response ID (matches request ID)
    pub id: u64,
    /// Outcome of the call
    pub outcome: std::result::Result<Value, RpcErrorDetail>,
}

/// A classified inbound frame
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    /// Response to a call
    Response(RpcResponse),
    /// Notification/Event
    Notification(RpcNotification),
}

/// Loose shape used to classify inbound frames
#[derive(Debug, Deserialize)]
struct RawInbound {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    params: Option<Value>,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorDetail>,
}

impl InboundMessage {
    /// Classify a text frame.
    ///
    /// Any failure here is a protocol violation; callers close the connection.
    pub fn parse(text: &str) -> Result<Self> {
        let raw: RawInbound = serde_json::from_str(text)
            .map_err(|e| Error::protocol(format!("Invalid JSON received: {}", e)))?;

        if let Some(id) = raw.id.filter(|id| !id.is_null()) {
            let id = id
                .as_u64()
                .ok_or_else(|| Error::protocol(format!("Invalid response id {}", id)))?;
            let outcome = match raw.error {
                Some(detail) => Err(detail),
                None => Ok(raw.result.unwrap_or_else(|| Value::Object(Default::default()))),
            };
            return Ok(InboundMessage::Response(RpcResponse { id, outcome }));
        }

        if let Some(method) = raw.method {
            return Ok(InboundMessage::Notification(RpcNotification {
                method,
                params: raw.params.unwrap_or_else(|| Value::Object(Default::default())),
            }));
        }

        Err(Error::protocol(format!("Invalid JSON RPC message {}", text)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_serialization() {
        let request = RpcRequest::new(1, "Page.navigate", json!({ "url": "https://example.com" }));

        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("\"id\":1"));
        assert!(json.contains("\"method\":\"Page.navigate\""));
    }

    #[test]
    fn test_request_without_params() {
        let request = RpcRequest::new(2, "Page.enable", json!({}));

        let json = serde_json::to_string(&request).unwrap();
        assert!(!json.contains("\"params\""));

        let request = RpcRequest::new(3, "Page.enable", Value::Null);
        assert!(request.params.is_none());
    }

    #[test]
    fn test_parse_success_and_error() {
        let ok = InboundMessage::parse(r#"{"id":4,"result":{"value":3}}"#).unwrap();
        assert_eq!(
            ok,
            InboundMessage::Response(RpcResponse {
                id: 4,
                outcome: Ok(json!({ "value": 3 })),
            })
        );

        let err = InboundMessage::parse(r#"{"id":5,"error":{"code":-32601,"message":"nope"}}"#).unwrap();
        match err {
            InboundMessage::Response(RpcResponse { id: 5, outcome: Err(detail) }) => {
                assert_eq!(detail.code, -32601);
                assert_eq!(detail.message, "nope");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_notification_defaults_params() {
        let msg = InboundMessage::parse(r#"{"method":"Page.loadEventFired"}"#).unwrap();
        assert_eq!(
            msg,
            InboundMessage::Notification(RpcNotification {
                method: "Page.loadEventFired".to_string(),
                params: json!({}),
            })
        );
    }

    #[test]
    fn test_parse_malformed() {
        assert!(matches!(InboundMessage::parse("not json"), Err(Error::Protocol(_))));
        assert!(matches!(InboundMessage::parse(r#"{"foo":1}"#), Err(Error::Protocol(_))));
        assert!(matches!(InboundMessage::parse(r#"{"id":"x"}"#), Err(Error::Protocol(_))));
    }
}
