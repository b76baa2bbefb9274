//! # Events
//!
//! Decodes peer notifications into typed events.
//!
//! ## Module structure
//! - `registry`: static wire-name table and capability gates
//! - `payloads`: typed notification params
//! - `conditions`: predicates used by `wait_for`
//! - `dispatcher`: decoding plus the cache side effects of each kind

pub mod registry;
pub mod payloads;
pub mod conditions;
pub mod dispatcher;

pub use conditions::{can_receive, matches, Condition};
pub use dispatcher::{dispatch, DispatchContext, Dispatched};
pub use registry::{EventToggles, EventType, Gate};

use crate::console::ConsoleMessage;
use crate::dom::NodeId;
use payloads::*;
use serde_json::Value;

/// Typed content of a decoded notification
#[derive(Debug, Clone)]
pub enum EventKind {
    PageLoaded { timestamp: f64 },
    PageDomContentLoaded { timestamp: f64 },
    ConsoleMessage(ConsoleMessage),
    ConsoleRepeatCount { count: u64 },
    ConsoleCleared,
    DomDocumentUpdated,
    DomChildNodes { parent_id: NodeId, count: usize },
    DomAttributeModified { node_id: NodeId, name: String, value: String },
    DomAttributeRemoved { node_id: NodeId, name: String },
    NetworkRequest(RequestWillBeSent),
    NetworkResponse(ResponseReceived),
    NetworkData(DataReceived),
    NetworkLoad(LoadingFinished),
    NetworkFailure(LoadingFailed),
    NetworkCacheHit(RequestServedFromCache),
    /// Unregistered, or registered but undecodable
    Generic,
}

/// A notification received from the peer
#[derive(Debug, Clone)]
pub struct Event {
    /// Wire name, e.g. `Page.loadEventFired`
    pub name: String,
    /// Prefix of the name before the first `.`
    pub domain: String,
    /// Raw params
    pub params: Value,
    pub kind: EventKind,
}

impl Event {
    pub(crate) fn new(name: String, params: Value, kind: EventKind) -> Self {
        let domain = name.split('.').next().unwrap_or_default().to_string();
        Self {
            name,
            domain,
            params,
            kind,
        }
    }

    /// Kind tag of the decoded variant
    pub fn event_type(&self) -> EventType {
        match &self.kind {
            EventKind::PageLoaded { .. } => EventType::PageLoaded,
            EventKind::PageDomContentLoaded { .. } => EventType::PageDomContentLoaded,
            EventKind::ConsoleMessage(_) => EventType::ConsoleMessage,
            EventKind::ConsoleRepeatCount { .. } => EventType::ConsoleRepeatCount,
            EventKind::ConsoleCleared => EventType::ConsoleCleared,
            EventKind::DomDocumentUpdated => EventType::DomDocumentUpdated,
            EventKind::DomChildNodes { .. } => EventType::DomChildNodes,
            EventKind::DomAttributeModified { .. } => EventType::DomAttributeModified,
            EventKind::DomAttributeRemoved { .. } => EventType::DomAttributeRemoved,
            EventKind::NetworkRequest(_) => EventType::NetworkRequest,
            EventKind::NetworkResponse(_) => EventType::NetworkResponse,
            EventKind::NetworkData(_) => EventType::NetworkData,
            EventKind::NetworkLoad(_) => EventType::NetworkLoad,
            EventKind::NetworkFailure(_) => EventType::NetworkFailure,
            EventKind::NetworkCacheHit(_) => EventType::NetworkCacheHit,
            EventKind::Generic => EventType::Generic,
        }
    }

    /// Correlation id of a network event
    pub fn request_id(&self) -> Option<&str> {
        match &self.kind {
            EventKind::NetworkRequest(e) => Some(&e.request_id),
            EventKind::NetworkResponse(e) => Some(&e.request_id),
            EventKind::NetworkData(e) => Some(&e.request_id),
            EventKind::NetworkLoad(e) => Some(&e.request_id),
            EventKind::NetworkFailure(e) => Some(&e.request_id),
            EventKind::NetworkCacheHit(e) => Some(&e.request_id),
            _ => None,
        }
    }

    /// Named attribute used by attribute conditions.
    ///
    /// Keys without a typed meaning fall back to the raw params.
    pub fn attribute(&self, key: &str) -> Option<Value> {
        match key {
            "name" => return Some(Value::from(self.name.as_str())),
            "domain" => return Some(Value::from(self.domain.as_str())),
            _ => {}
        }

        let typed = match (&self.kind, key) {
            (EventKind::ConsoleMessage(m), "level") => Some(Value::from(m.level.as_str())),
            (EventKind::ConsoleMessage(m), "reason") => Some(Value::from(m.reason.as_str())),
            (EventKind::ConsoleMessage(m), "text") => Some(Value::from(m.text.as_str())),
            (EventKind::ConsoleMessage(m), "type") => m.kind.as_deref().map(Value::from),
            (EventKind::NetworkRequest(e), "type") => e.resource_type.map(|t| t.as_str().into()),
            (EventKind::NetworkResponse(e), "type") => e.resource_type.map(|t| t.as_str().into()),
            (EventKind::NetworkFailure(e), "type") => e.resource_type.map(|t| t.as_str().into()),
            (_, "request_id") => self.request_id().map(Value::from),
            _ => None,
        };

        typed.or_else(|| self.params.get(key).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_domain_is_name_prefix() {
        let event = Event::new("Page.loadEventFired".into(), json!({}), EventKind::PageLoaded { timestamp: 1.0 });
        assert_eq!(event.domain, "Page");
        assert_eq!(event.event_type(), EventType::PageLoaded);

        let odd = Event::new("bare".into(), json!({}), EventKind::Generic);
        assert_eq!(odd.domain, "bare");
    }

    #[test]
    fn test_attribute_falls_back_to_params() {
        let event = Event::new(
            "Page.frameNavigated".into(),
            json!({ "frame": { "id": "F1" }, "answer": 42 }),
            EventKind::Generic,
        );
        assert_eq!(event.attribute("name"), Some(json!("Page.frameNavigated")));
        assert_eq!(event.attribute("domain"), Some(json!("Page")));
        assert_eq!(event.attribute("answer"), Some(json!(42)));
        assert_eq!(event.attribute("missing"), None);
    }
}
