//! Scripted in-memory peer for testing
//!
//! `MockPeer` drives the far side of a [`TransportChannel::pair`]. Frames are
//! queued up front, so tests can script a whole exchange (including
//! notifications interleaved with responses) before the client starts
//! reading.

use super::transport::{PeerEnd, TransportChannel};
use serde_json::{json, Value};

/// Scripted remote debugging peer
#[derive(Debug)]
pub struct MockPeer {
    end: Option<PeerEnd>,
    /// Frames sent by the client so far, oldest first
    sent: Vec<Value>,
}

impl MockPeer {
    /// Create a channel and the mock peer attached to it
    pub fn pair() -> (TransportChannel, Self) {
        let (channel, end) = TransportChannel::pair();
        (
            channel,
            Self {
                end: Some(end),
                sent: Vec::new(),
            },
        )
    }

    /// Deliver a raw text frame
    pub fn push_raw(&self, text: &str) {
        if let Some(end) = &self.end {
            let _ = end.sender.send(Ok(text.to_string()));
        }
    }

    /// Deliver a JSON frame
    pub fn push(&self, frame: Value) {
        self.push_raw(&frame.to_string());
    }

    /// Deliver a success response
    pub fn respond(&self, id: u64, result: Value) {
        self.push(json!({ "id": id, "result": result }));
    }

    /// Deliver an error response
    pub fn respond_error(&self, id: u64, code: i64, message: &str) {
        self.push(json!({ "id": id, "error": { "code": code, "message": message } }));
    }

    /// Deliver a notification
    pub fn notify(&self, method: &str, params: Value) {
        self.push(json!({ "method": method, "params": params }));
    }

    /// Drop the peer side, as if the server went away
    pub fn hang_up(&mut self) {
        self.end = None;
    }

    /// Every frame the client has sent, oldest first
    pub fn sent(&mut self) -> &[Value] {
        if let Some(end) = &mut self.end {
            while let Ok(text) = end.received.try_recv() {
                let frame = serde_json::from_str(&text).unwrap_or(Value::String(text));
                self.sent.push(frame);
            }
        }
        &self.sent
    }

    /// Methods of every frame the client has sent
    pub fn sent_methods(&mut self) -> Vec<String> {
        self.sent()
            .iter()
            .filter_map(|frame| frame.get("method").and_then(|m| m.as_str()))
            .map(str::to_string)
            .collect()
    }

    /// Number of calls the client issued for `method`
    pub fn call_count(&mut self, method: &str) -> usize {
        self.sent_methods().iter().filter(|m| *m == method).count()
    }
}
