//! Request/response multiplexer
//!
//! The engine is the only reader of its transport. `call` and
//! `next_notification` both take `&mut self` and funnel every inbound frame
//! through [`RpcEngine::receive`], so a response is only ever matched against
//! the single call in flight and notifications pulled while waiting for it
//! are queued instead of lost.

use super::transport::{CloseHandle, TransportChannel};
use super::types::*;
use crate::{Error, Result};
use serde_json::Value;
use std::collections::{HashSet, VecDeque};
use tracing::{debug, error, info, warn};

/// Id-correlated RPC engine over one transport
#[derive(Debug)]
pub struct RpcEngine {
    /// Underlying frame channel
    transport: TransportChannel,
    /// Id of the next call
    next_id: u64,
    /// The call currently waiting for its response
    pending: Option<u64>,
    /// Calls whose futures were dropped before their response arrived
    abandoned: HashSet<u64>,
    /// Notifications received but not yet consumed
    notifications: VecDeque<RpcNotification>,
    /// Set once closed; never cleared
    closed: bool,
}

impl RpcEngine {
    /// Create an engine that owns the given transport
    pub fn new(transport: TransportChannel) -> Self {
        Self {
            transport,
            next_id: 1,
            pending: None,
            abandoned: HashSet::new(),
            notifications: VecDeque::new(),
            closed: false,
        }
    }

    /// Issue a call and wait for its response.
    ///
    /// Notifications that arrive first are queued for `next_notification`.
    /// A remote `error` object becomes `Error::RemoteCall` and leaves the
    /// connection usable.
    pub async fn call(&mut self, method: &str, params: Value) -> Result<Value> {
        if self.is_closed() {
            return Err(Error::ConnectionClosed);
        }

        self.abandon_pending();

        let id = self.next_id;
        self.next_id += 1;

        let request = RpcRequest::new(id, method, params);
        let json = serde_json::to_string(&request)?;

        debug!(id, method, "Sending call");
        if let Err(e) = self.transport.send(json) {
            self.close();
            return Err(e);
        }
        self.pending = Some(id);

        loop {
            match self.receive(Some(id)).await {
                Ok(None) => continue,
                Ok(Some(result)) => {
                    self.pending = None;
                    return Ok(result);
                }
                Err(e) => {
                    self.pending = None;
                    return Err(e);
                }
            }
        }
    }

    /// Next notification, oldest first.
    ///
    /// Already-queued notifications are returned before any new frame is
    /// pulled from the transport.
    pub async fn next_notification(&mut self) -> Result<RpcNotification> {
        loop {
            if self.is_closed() {
                self.close();
                return Err(Error::ConnectionClosed);
            }
            if let Some(notification) = self.notifications.pop_front() {
                return Ok(notification);
            }
            self.abandon_pending();
            // A response cannot match when nothing is expected; receive fails instead.
            self.receive(None).await?;
        }
    }

    /// A call still marked pending here had its future dropped; its
    /// response is discarded when it shows up.
    fn abandon_pending(&mut self) {
        if let Some(stale) = self.pending.take() {
            debug!(id = stale, "Previous call was abandoned before its response");
            self.abandoned.insert(stale);
        }
    }

    /// Pull and route one inbound frame.
    ///
    /// Returns the result when the frame answers `expected`, `None` when it
    /// was queued or discarded, and closes the connection on any protocol
    /// violation.
    async fn receive(&mut self, expected: Option<u64>) -> Result<Option<Value>> {
        let text = match self.transport.recv().await {
            Ok(text) => text,
            Err(e) => {
                warn!("Receive failed: {}", e);
                self.close();
                return Err(e);
            }
        };

        let message = match InboundMessage::parse(&text) {
            Ok(message) => message,
            Err(e) => return Err(self.fail(e)),
        };

        match message {
            InboundMessage::Notification(notification) => {
                debug!(method = %notification.method, "Queued notification");
                self.notifications.push_back(notification);
                Ok(None)
            }
            InboundMessage::Response(response) if Some(response.id) == expected => {
                debug!(id = response.id, "Received response");
                response.outcome.map(Some).map_err(Error::from)
            }
            InboundMessage::Response(response) if self.abandoned.remove(&response.id) => {
                debug!(id = response.id, "Discarded response to an abandoned call");
                Ok(None)
            }
            InboundMessage::Response(response) => {
                let reason = match expected {
                    Some(expected) => format!(
                        "Out of sequence RPC response id {} (expected {})",
                        response.id, expected
                    ),
                    None => format!("RPC response id {} matches no pending call", response.id),
                };
                Err(self.fail(Error::protocol(reason)))
            }
        }
    }

    /// Close the connection, then hand back the error
    fn fail(&mut self, e: Error) -> Error {
        error!("Fatal protocol error, closing connection: {}", e);
        self.close();
        e
    }

    /// Handle that can close the connection from another task
    pub fn closer(&self) -> CloseHandle {
        self.transport.closer()
    }

    /// True once the connection was closed
    pub fn is_closed(&self) -> bool {
        self.closed || self.transport.is_closed()
    }

    /// Id the next call will use
    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    /// Number of notifications waiting to be consumed
    pub fn queued_notifications(&self) -> usize {
        self.notifications.len()
    }

    /// Close the connection; idempotent.
    ///
    /// Local state is released even when the peer is already unreachable.
    pub fn close(&mut self) {
        if !self.closed {
            info!("Closing RPC connection");
            self.closed = true;
        }
        self.transport.close();
        self.pending = None;
        self.abandoned.clear();
        self.notifications.clear();
    }
}
