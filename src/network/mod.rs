//! # Network resources
//!
//! Folds the `Network.*` notifications of each request into one
//! [`ResourceRecord`].
//!
//! The browser does not guarantee the relative order of a request's events,
//! so every field uses a merge rule that gives the same result in any order:
//! - set-if-absent for snapshots and metadata
//! - logical OR for flags
//! - sum for byte counts
//!
//! Only `last_event` depends on order.

pub mod types;

pub use types::{NetworkRequest, NetworkResponse, ResourceRecord, ResourceTiming, ResourceType};

use crate::events::{Event, EventKind};
use crate::rpc::RpcEngine;
use crate::{Error, Result};
use base64::Engine as _;
use bytes::Bytes;
use serde_json::json;
use std::collections::HashMap;
use tracing::{debug, info};

fn set_if_absent<T: Clone>(slot: &mut Option<T>, value: Option<&T>) {
    if slot.is_none() {
        *slot = value.cloned();
    }
}

/// Per-request records, in first-seen order
#[derive(Debug, Default)]
pub struct ResourceAggregator {
    records: HashMap<String, ResourceRecord>,
    order: Vec<String>,
}

impl ResourceAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// The record for `request_id`, created empty if unknown
    pub fn get_or_create(&mut self, request_id: &str) -> &mut ResourceRecord {
        if !self.records.contains_key(request_id) {
            self.order.push(request_id.to_string());
        }
        self.records
            .entry(request_id.to_string())
            .or_insert_with(|| ResourceRecord::new(request_id))
    }

    pub fn get(&self, request_id: &str) -> Option<&ResourceRecord> {
        self.records.get(request_id)
    }

    /// Every record, in the order its first event arrived
    pub fn resources(&self) -> impl Iterator<Item = &ResourceRecord> {
        self.order.iter().filter_map(|id| self.records.get(id))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Merge one network event into its record; other events are ignored
    pub fn apply(&mut self, event: &Event) {
        let Some(request_id) = event.request_id() else {
            return;
        };
        let record = self.get_or_create(request_id);

        match &event.kind {
            EventKind::NetworkRequest(e) => {
                set_if_absent(&mut record.request, Some(&e.request));
                set_if_absent(&mut record.resource_type, e.resource_type.as_ref());
                set_if_absent(&mut record.document_url, e.document_url.as_ref());
                set_if_absent(&mut record.initiator, e.initiator.as_ref());
                set_if_absent(&mut record.loader_id, e.loader_id.as_ref());
            }
            EventKind::NetworkResponse(e) => {
                set_if_absent(&mut record.response, Some(&e.response));
                set_if_absent(&mut record.resource_type, e.resource_type.as_ref());
                set_if_absent(&mut record.loader_id, e.loader_id.as_ref());
                record.served_from_cache |= e.response.from_disk_cache;
            }
            EventKind::NetworkData(e) => {
                record.bytes_received += e.data_length;
            }
            EventKind::NetworkLoad(e) => {
                set_if_absent(&mut record.finished_at, Some(&e.timestamp));
            }
            EventKind::NetworkFailure(e) => {
                record.canceled |= e.canceled;
                set_if_absent(&mut record.resource_type, e.resource_type.as_ref());
                if !e.error_text.is_empty() {
                    set_if_absent(&mut record.error, Some(&e.error_text));
                }
            }
            EventKind::NetworkCacheHit(_) => {
                record.served_from_cache = true;
            }
            _ => {}
        }

        record.last_event = Some(event.clone());
    }

    /// Response body, fetched from the peer on first access
    pub async fn body(&mut self, rpc: &mut RpcEngine, request_id: &str) -> Result<Bytes> {
        let record = self
            .records
            .get_mut(request_id)
            .ok_or_else(|| Error::usage(format!("Unknown network resource {}", request_id)))?;
        if let Some(body) = &record.body {
            return Ok(body.clone());
        }

        debug!(request_id, "Fetching response body");
        let result = rpc
            .call("Network.getResponseBody", json!({ "requestId": request_id }))
            .await?;
        let text = result.get("body").and_then(|b| b.as_str()).unwrap_or_default();
        let encoded = result
            .get("base64Encoded")
            .and_then(|b| b.as_bool())
            .unwrap_or(false);

        let body = if encoded {
            let decoded = base64::engine::general_purpose::STANDARD
                .decode(text)
                .map_err(|e| Error::decode(format!("Invalid base64 body: {}", e)))?;
            Bytes::from(decoded)
        } else {
            Bytes::copy_from_slice(text.as_bytes())
        };

        record.body = Some(body.clone());
        Ok(body)
    }

    /// Drop every record
    pub fn clear(&mut self) {
        if !self.records.is_empty() {
            info!("Clearing {} network resources", self.records.len());
        }
        self.records.clear();
        self.order.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::payloads::*;
    use crate::rpc::MockPeer;

    fn request_sent(id: &str) -> Event {
        let params = json!({
            "requestId": id,
            "loaderId": "L1",
            "documentURL": "http://x/",
            "request": { "url": "http://x/app.js", "method": "GET", "headers": {} },
            "initiator": { "type": "parser" },
            "type": "Script",
            "timestamp": 1.0,
        });
        let payload: RequestWillBeSent = serde_json::from_value(params.clone()).unwrap();
        Event::new("Network.requestWillBeSent".into(), params, EventKind::NetworkRequest(payload))
    }

    fn response_received(id: &str) -> Event {
        let params = json!({
            "requestId": id,
            "loaderId": "L1",
            "type": "Script",
            "timestamp": 2.0,
            "response": { "url": "http://x/app.js", "status": 200, "statusText": "OK", "mimeType": "text/javascript" },
        });
        let payload: ResponseReceived = serde_json::from_value(params.clone()).unwrap();
        Event::new("Network.responseReceived".into(), params, EventKind::NetworkResponse(payload))
    }

    fn failed(id: &str, error: &str, canceled: bool) -> Event {
        let params = json!({ "requestId": id, "errorText": error, "canceled": canceled, "timestamp": 3.0 });
        let payload: LoadingFailed = serde_json::from_value(params.clone()).unwrap();
        Event::new("Network.loadingFailed".into(), params, EventKind::NetworkFailure(payload))
    }

    fn data(id: &str, len: u64) -> Event {
        let params = json!({ "requestId": id, "dataLength": len, "encodedDataLength": len });
        let payload: DataReceived = serde_json::from_value(params.clone()).unwrap();
        Event::new("Network.dataReceived".into(), params, EventKind::NetworkData(payload))
    }

    fn finished(id: &str, timestamp: f64) -> Event {
        let params = json!({ "requestId": id, "timestamp": timestamp });
        let payload: LoadingFinished = serde_json::from_value(params.clone()).unwrap();
        Event::new("Network.loadingFinished".into(), params, EventKind::NetworkLoad(payload))
    }

    fn cache_hit(id: &str) -> Event {
        let params = json!({ "requestId": id });
        let payload: RequestServedFromCache = serde_json::from_value(params.clone()).unwrap();
        Event::new("Network.requestServedFromCache".into(), params, EventKind::NetworkCacheHit(payload))
    }

    fn fields(record: &ResourceRecord) -> impl PartialEq + std::fmt::Debug {
        (
            record.request.clone(),
            record.response.clone(),
            record.resource_type,
            record.document_url.clone(),
            record.loader_id.clone(),
            record.canceled,
            record.bytes_received,
            record.error.clone(),
            record.served_from_cache,
            record.finished_at,
        )
    }

    #[test]
    fn test_merge_of_every_event_kind_is_order_independent() {
        let events = || {
            vec![
                request_sent("9"),
                response_received("9"),
                data("9", 100),
                finished("9", 4.0),
                failed("9", "net::ERR_ABORTED", true),
                cache_hit("9"),
            ]
        };
        let orders: [[usize; 6]; 3] = [[0, 1, 2, 3, 4, 5], [5, 4, 3, 2, 1, 0], [2, 5, 1, 4, 0, 3]];

        let mut merged = Vec::new();
        for order in orders {
            let all = events();
            let mut aggregator = ResourceAggregator::new();
            for &i in &order {
                aggregator.apply(&all[i]);
            }
            let record = aggregator.get("9").unwrap();
            assert_eq!(aggregator.len(), 1);
            assert_eq!(record.last_event.as_ref().unwrap().name, all[order[5]].name);
            merged.push(fields(record));
        }

        assert_eq!(merged[0], merged[1]);
        assert_eq!(merged[0], merged[2]);
    }

    #[test]
    fn test_merge_is_order_independent() {
        let mut forward = ResourceAggregator::new();
        forward.apply(&request_sent("42"));
        forward.apply(&response_received("42"));

        let mut reverse = ResourceAggregator::new();
        reverse.apply(&response_received("42"));
        reverse.apply(&request_sent("42"));

        let a = forward.get("42").unwrap();
        let b = reverse.get("42").unwrap();
        assert_eq!(fields(a), fields(b));
        assert_eq!(a.resource_type, Some(ResourceType::Script));
        assert_eq!(a.response.as_ref().unwrap().status, 200);

        assert_eq!(a.last_event.as_ref().unwrap().name, "Network.responseReceived");
        assert_eq!(b.last_event.as_ref().unwrap().name, "Network.requestWillBeSent");
    }

    #[test]
    fn test_flags_accumulate_and_error_is_set_once() {
        let mut aggregator = ResourceAggregator::new();
        aggregator.apply(&failed("7", "net::ERR_ABORTED", true));
        aggregator.apply(&failed("7", "net::ERR_FAILED", false));
        aggregator.apply(&data("7", 10));
        aggregator.apply(&data("7", 5));

        let record = aggregator.get("7").unwrap();
        assert!(record.canceled);
        assert_eq!(record.error.as_deref(), Some("net::ERR_ABORTED"));
        assert_eq!(record.bytes_received, 15);
        assert!(record.is_complete());
    }

    #[test]
    fn test_resources_in_first_seen_order() {
        let mut aggregator = ResourceAggregator::new();
        aggregator.apply(&request_sent("b"));
        aggregator.apply(&request_sent("a"));
        aggregator.apply(&response_received("b"));

        let ids: Vec<&str> = aggregator.resources().map(|r| r.request_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);

        aggregator.clear();
        assert!(aggregator.is_empty());
        assert_eq!(aggregator.resources().count(), 0);
    }

    #[tokio::test]
    async fn test_body_fetched_once_and_decoded() {
        let (channel, mut peer) = MockPeer::pair();
        let mut rpc = RpcEngine::new(channel);
        let mut aggregator = ResourceAggregator::new();
        aggregator.apply(&request_sent("42"));

        peer.respond(1, json!({ "body": "aGVsbG8=", "base64Encoded": true }));
        let first = aggregator.body(&mut rpc, "42").await.unwrap();
        let second = aggregator.body(&mut rpc, "42").await.unwrap();

        assert_eq!(first, Bytes::from_static(b"hello"));
        assert_eq!(first, second);
        assert_eq!(aggregator.get("42").unwrap().cached_body(), Some(&first));
        assert_eq!(peer.call_count("Network.getResponseBody"), 1);
    }

    #[tokio::test]
    async fn test_body_for_unknown_resource_is_usage_error() {
        let (channel, mut peer) = MockPeer::pair();
        let mut rpc = RpcEngine::new(channel);
        let mut aggregator = ResourceAggregator::new();

        assert!(matches!(aggregator.body(&mut rpc, "nope").await, Err(Error::Usage(_))));
        assert!(peer.sent().is_empty());
    }
}
