//! Notification decoding and cache side effects
//!
//! Decoding runs synchronously against the client's subsystems. Side effects
//! that need the connection (releasing console parameters) are returned to
//! the caller in [`Dispatched::orphans`].

use super::payloads::*;
use super::registry::EventType;
use super::{Event, EventKind};
use crate::console::{ConsoleLog, ConsoleMessage};
use crate::dom::NodeCache;
use crate::network::ResourceAggregator;
use crate::rpc::RpcNotification;
use crate::runtime::{RemoteObject, RemoteValueStore};
use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// Subsystems a decoded event may update
pub struct DispatchContext<'a> {
    pub values: &'a mut RemoteValueStore,
    pub network: &'a mut ResourceAggregator,
    pub console: &'a mut ConsoleLog,
    pub dom: &'a mut NodeCache,
}

/// A decoded event plus the handles it left without an owner
#[derive(Debug)]
pub struct Dispatched {
    pub event: Event,
    /// Peer-held values the caller must release
    pub orphans: Vec<Arc<RemoteObject>>,
}

fn parse<T: DeserializeOwned>(params: &Value) -> Result<T> {
    serde_json::from_value(params.clone()).map_err(|e| Error::decode(e.to_string()))
}

/// Decode a notification and apply its side effects.
///
/// Never fails: a registered event whose params cannot be decoded is logged
/// and delivered as `Generic`.
pub fn dispatch(notification: RpcNotification, ctx: &mut DispatchContext<'_>) -> Dispatched {
    let RpcNotification { method, params } = notification;
    let ty = EventType::lookup(&method);
    let mut orphans = Vec::new();

    let kind = match decode(ty, &params, ctx, &mut orphans) {
        Ok(kind) => kind,
        Err(e) => {
            warn!(method = %method, "Undecodable event params, delivering as generic: {}", e);
            EventKind::Generic
        }
    };

    let event = Event::new(method, params, kind);
    if event.request_id().is_some() {
        ctx.network.apply(&event);
    }
    debug!(name = %event.name, "Dispatched event");

    Dispatched { event, orphans }
}

fn decode(
    ty: EventType,
    params: &Value,
    ctx: &mut DispatchContext<'_>,
    orphans: &mut Vec<Arc<RemoteObject>>,
) -> Result<EventKind> {
    let kind = match ty {
        EventType::PageLoaded => EventKind::PageLoaded {
            timestamp: parse::<PageTimestamp>(params)?.timestamp,
        },
        EventType::PageDomContentLoaded => EventKind::PageDomContentLoaded {
            timestamp: parse::<PageTimestamp>(params)?.timestamp,
        },
        EventType::ConsoleMessage => {
            let raw = params
                .get("message")
                .ok_or_else(|| Error::decode("Console message event without message"))?;
            let message = ConsoleMessage::from_raw(raw, ctx.values)?;
            if let Some(request_id) = &message.network_request_id {
                ctx.network.get_or_create(request_id);
            }
            ctx.console.add(message.clone());
            EventKind::ConsoleMessage(message)
        }
        EventType::ConsoleRepeatCount => {
            let count = parse::<RepeatCount>(params)?.count;
            ctx.console.update_repeat_count(count);
            EventKind::ConsoleRepeatCount { count }
        }
        EventType::ConsoleCleared => {
            orphans.extend(ctx.console.clear());
            EventKind::ConsoleCleared
        }
        EventType::DomDocumentUpdated => {
            ctx.dom.clear();
            EventKind::DomDocumentUpdated
        }
        EventType::DomChildNodes => {
            let payload = parse::<SetChildNodes>(params)?;
            ctx.dom.set_child_nodes(payload.parent_id, &payload.nodes)?;
            EventKind::DomChildNodes {
                parent_id: payload.parent_id,
                count: payload.nodes.len(),
            }
        }
        EventType::DomAttributeModified => {
            let payload = parse::<AttributeModified>(params)?;
            ctx.dom.set_attribute(payload.node_id, &payload.name, &payload.value);
            EventKind::DomAttributeModified {
                node_id: payload.node_id,
                name: payload.name,
                value: payload.value,
            }
        }
        EventType::DomAttributeRemoved => {
            let payload = parse::<AttributeRemoved>(params)?;
            ctx.dom.remove_attribute(payload.node_id, &payload.name);
            EventKind::DomAttributeRemoved {
                node_id: payload.node_id,
                name: payload.name,
            }
        }
        EventType::NetworkRequest => EventKind::NetworkRequest(parse(params)?),
        EventType::NetworkResponse => EventKind::NetworkResponse(parse(params)?),
        EventType::NetworkData => EventKind::NetworkData(parse(params)?),
        EventType::NetworkLoad => EventKind::NetworkLoad(parse(params)?),
        EventType::NetworkFailure => EventKind::NetworkFailure(parse(params)?),
        EventType::NetworkCacheHit => EventKind::NetworkCacheHit(parse(params)?),
        EventType::Generic => EventKind::Generic,
    };
    Ok(kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Default)]
    struct Fixture {
        values: RemoteValueStore,
        network: ResourceAggregator,
        console: ConsoleLog,
        dom: NodeCache,
    }

    impl Fixture {
        fn dispatch(&mut self, method: &str, params: Value) -> Dispatched {
            let mut ctx = DispatchContext {
                values: &mut self.values,
                network: &mut self.network,
                console: &mut self.console,
                dom: &mut self.dom,
            };
            dispatch(
                RpcNotification {
                    method: method.to_string(),
                    params,
                },
                &mut ctx,
            )
        }
    }

    #[test]
    fn test_unregistered_event_is_generic() {
        let mut fx = Fixture::default();
        let out = fx.dispatch("Page.frameNavigated", json!({ "frame": {} }));

        assert_eq!(out.event.event_type(), EventType::Generic);
        assert_eq!(out.event.domain, "Page");
        assert!(out.orphans.is_empty());
    }

    #[test]
    fn test_bad_params_degrade_to_generic() {
        let mut fx = Fixture::default();
        let out = fx.dispatch("Network.responseReceived", json!({ "requestId": 5 }));

        assert_eq!(out.event.event_type(), EventType::Generic);
        assert_eq!(out.event.name, "Network.responseReceived");
        assert!(fx.network.is_empty());
    }

    #[test]
    fn test_undecodable_console_message_holds_no_handles() {
        let mut fx = Fixture::default();
        let out = fx.dispatch(
            "Console.messageAdded",
            json!({ "message": {
                "text": "half",
                "parameters": [
                    { "type": "object", "objectId": "p1" },
                    { "type": "symbol" },
                ],
            }}),
        );

        assert_eq!(out.event.event_type(), EventType::Generic);
        assert!(fx.console.is_empty());
        assert!(fx.values.group(None).is_none());
        assert!(out.orphans.is_empty());
    }

    #[test]
    fn test_console_bigint_param_is_logged() {
        let mut fx = Fixture::default();
        fx.dispatch(
            "Console.messageAdded",
            json!({ "message": {
                "text": "big",
                "parameters": [
                    { "type": "object", "objectId": "p1" },
                    { "type": "bigint", "unserializableValue": "1n" },
                ],
            }}),
        );

        assert_eq!(fx.console.len(), 1);
        assert_eq!(fx.console.messages()[0].params[1].as_primitive(), Some(&json!("1n")));
    }

    #[test]
    fn test_console_events_feed_the_log() {
        let mut fx = Fixture::default();
        let out = fx.dispatch(
            "Console.messageAdded",
            json!({ "message": {
                "text": "boom", "level": "error", "source": "network",
                "networkRequestId": "42",
                "parameters": [{ "type": "object", "objectId": "p1" }],
            }}),
        );
        assert_eq!(out.event.attribute("level"), Some(json!("error")));
        assert_eq!(fx.console.len(), 1);
        assert!(fx.network.get("42").is_some());

        fx.dispatch("Console.messageRepeatCountUpdated", json!({ "count": 3 }));
        assert_eq!(fx.console.messages()[0].count, 3);

        let cleared = fx.dispatch("Console.messagesCleared", json!({}));
        assert!(fx.console.is_empty());
        assert_eq!(cleared.orphans.len(), 1);
        assert_eq!(cleared.orphans[0].remote_id(), "p1");
    }

    #[test]
    fn test_document_updated_invalidates_nodes() {
        let mut fx = Fixture::default();
        fx.dom.set_root(&json!({ "nodeId": 1, "children": [{ "nodeId": 2 }] })).unwrap();

        fx.dispatch("DOM.setChildNodes", json!({ "parentId": 2, "nodes": [{ "nodeId": 3, "nodeName": "P" }] }));
        assert_eq!(fx.dom.children(2).len(), 1);
        fx.dispatch("DOM.attributeModified", json!({ "nodeId": 3, "name": "id", "value": "x" }));
        assert_eq!(fx.dom.get(3).unwrap().attributes["id"], "x");

        let out = fx.dispatch("DOM.documentUpdated", json!({}));
        assert_eq!(out.event.event_type(), EventType::DomDocumentUpdated);
        assert!(fx.dom.root().is_none());
        assert!(!fx.dom.contains(1));
        assert!(!fx.dom.contains(3));
    }

    #[test]
    fn test_network_events_feed_the_aggregator() {
        let mut fx = Fixture::default();
        let out = fx.dispatch(
            "Network.requestWillBeSent",
            json!({ "requestId": "9", "request": { "url": "http://x/", "method": "GET" }, "type": "Document" }),
        );
        assert_eq!(out.event.attribute("request_id"), Some(json!("9")));
        assert_eq!(out.event.attribute("type"), Some(json!("Document")));

        fx.dispatch("Network.requestServedFromCache", json!({ "requestId": "9" }));
        fx.dispatch("Network.loadingFinished", json!({ "requestId": "9", "timestamp": 4.0 }));

        let record = fx.network.get("9").unwrap();
        assert!(record.served_from_cache);
        assert_eq!(record.finished_at, Some(4.0));
        assert_eq!(record.request.as_ref().unwrap().url, "http://x/");
        assert_eq!(record.last_event.as_ref().unwrap().event_type(), EventType::NetworkLoad);
    }
}
