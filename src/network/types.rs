//! Network resource data types

use crate::events::Event;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Kind of resource the browser loaded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceType {
    Document,
    Stylesheet,
    Image,
    Media,
    Font,
    Script,
    #[serde(rename = "XHR")]
    Xhr,
    Fetch,
    WebSocket,
    #[serde(other)]
    Other,
}

impl ResourceType {
    /// Wire spelling
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Document => "Document",
            ResourceType::Stylesheet => "Stylesheet",
            ResourceType::Image => "Image",
            ResourceType::Media => "Media",
            ResourceType::Font => "Font",
            ResourceType::Script => "Script",
            ResourceType::Xhr => "XHR",
            ResourceType::Fetch => "Fetch",
            ResourceType::WebSocket => "WebSocket",
            ResourceType::Other => "Other",
        }
    }
}

/// Outgoing HTTP request as reported by the browser
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkRequest {
    pub url: String,
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub headers: HashMap<String, Value>,
    #[serde(default)]
    pub post_data: Option<String>,
}

/// HTTP response headers and metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkResponse {
    pub url: String,
    #[serde(default)]
    pub status: i64,
    #[serde(default)]
    pub status_text: String,
    #[serde(default)]
    pub headers: HashMap<String, Value>,
    #[serde(default)]
    pub request_headers: HashMap<String, Value>,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub connection_id: Option<f64>,
    #[serde(default)]
    pub connection_reused: bool,
    #[serde(default)]
    pub from_disk_cache: bool,
    #[serde(default)]
    pub timing: Option<ResourceTiming>,
}

/// Timing breakdown; every `*_start`/`*_end` is in milliseconds relative
/// to `request_time`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResourceTiming {
    /// Seconds since the epoch
    pub request_time: f64,
    pub proxy_start: f64,
    pub proxy_end: f64,
    pub dns_start: f64,
    pub dns_end: f64,
    pub connect_start: f64,
    pub connect_end: f64,
    pub ssl_start: f64,
    pub ssl_end: f64,
    pub send_start: f64,
    pub send_end: f64,
    pub receive_headers_end: f64,
}

/// Everything known about one network request, merged from its events
#[derive(Debug, Clone, Default)]
pub struct ResourceRecord {
    /// Correlation id shared by every event of this request
    pub request_id: String,
    pub request: Option<NetworkRequest>,
    pub response: Option<NetworkResponse>,
    pub resource_type: Option<ResourceType>,
    pub document_url: Option<String>,
    /// Raw initiator payload
    pub initiator: Option<Value>,
    pub loader_id: Option<String>,
    pub canceled: bool,
    pub served_from_cache: bool,
    /// Sum of every reported data chunk
    pub bytes_received: u64,
    /// Timestamp of the loading-finished event
    pub finished_at: Option<f64>,
    /// First non-empty failure reason
    pub error: Option<String>,
    /// Most recently applied event for this request
    pub last_event: Option<Event>,
    pub(crate) body: Option<Bytes>,
}

impl ResourceRecord {
    pub(crate) fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            ..Default::default()
        }
    }

    /// The body, if it was already fetched
    pub fn cached_body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// True once loading finished or failed
    pub fn is_complete(&self) -> bool {
        self.finished_at.is_some() || self.error.is_some() || self.canceled
    }
}
