//! Duplex text-frame transport
//!
//! A `TransportChannel` hides where frames come from. `connect` bridges a
//! WebSocket to two queues through a writer pump and a reader pump spawned on
//! the caller's [`IoContext`]; `pair` wires the same queues to an in-memory
//! [`PeerEnd`] instead.

use crate::{Error, Result};
use futures::{SinkExt, StreamExt};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

/// Inbound frame, or the transport failure that ended the stream
type InboundFrame = Result<String>;

/// Caller-owned I/O execution context
///
/// Every task a connection needs is spawned here, and aborted when the
/// connection closes.
#[derive(Debug, Clone)]
pub struct IoContext {
    handle: tokio::runtime::Handle,
}

impl IoContext {
    /// Wrap an existing runtime handle
    pub fn from_handle(handle: tokio::runtime::Handle) -> Self {
        Self { handle }
    }

    /// Use the runtime the caller is currently running on
    pub fn current() -> Result<Self> {
        tokio::runtime::Handle::try_current()
            .map(Self::from_handle)
            .map_err(|e| Error::usage(format!("No tokio runtime available: {}", e)))
    }

    fn spawn<F>(&self, future: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.handle.spawn(future)
    }
}

/// Closes a `TransportChannel` from anywhere
///
/// A receive in progress on the channel fails with `Error::ConnectionClosed`.
#[derive(Debug, Clone)]
pub struct CloseHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CloseHandle {
    /// Close the channel; idempotent
    pub fn close(&self) {
        self.tx.send_replace(true);
    }

    /// True once the channel was closed
    pub fn is_closed(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Resolves once the close flag is raised or its sender is gone
async fn wait_closed(rx: &mut watch::Receiver<bool>) {
    loop {
        let closed = *rx.borrow_and_update();
        if closed {
            return;
        }
        if rx.changed().await.is_err() {
            return;
        }
    }
}

/// Order-preserving duplex channel of text frames
#[derive(Debug)]
pub struct TransportChannel {
    /// Frames waiting for transmission
    outbound: mpsc::UnboundedSender<String>,
    /// Frames received from the peer
    inbound: mpsc::UnboundedReceiver<InboundFrame>,
    /// Close flag shared with the pumps and every `CloseHandle`
    closer: CloseHandle,
    closed_rx: watch::Receiver<bool>,
    /// Pump tasks (empty for in-memory channels)
    tasks: Vec<JoinHandle<()>>,
}

/// The far side of an in-memory channel
#[derive(Debug)]
pub struct PeerEnd {
    /// Frames sent by the channel owner
    pub received: mpsc::UnboundedReceiver<String>,
    /// Frames delivered to the channel owner
    pub sender: mpsc::UnboundedSender<InboundFrame>,
}

impl TransportChannel {
    fn from_parts(
        outbound: mpsc::UnboundedSender<String>,
        inbound: mpsc::UnboundedReceiver<InboundFrame>,
        closed_tx: watch::Sender<bool>,
        closed_rx: watch::Receiver<bool>,
    ) -> Self {
        Self {
            outbound,
            inbound,
            closer: CloseHandle {
                tx: Arc::new(closed_tx),
            },
            closed_rx,
            tasks: Vec::new(),
        }
    }

    /// Open a WebSocket connection to a debug-socket URL
    ///
    /// # Arguments
    /// * `url` - WebSocket URL (e.g., "ws://localhost:9222/devtools/page/ABC123")
    /// * `io` - execution context that owns the pump tasks
    pub async fn connect(url: &str, io: &IoContext) -> Result<Self> {
        info!("Connecting to WebSocket: {}", url);

        let (ws_stream, _) = connect_async(url)
            .await
            .map_err(|e| Error::transport(format!("Failed to connect to {}: {}", url, e)))?;
        let (mut sink, mut stream) = ws_stream.split();

        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<String>();
        let (in_tx, in_rx) = mpsc::unbounded_channel::<InboundFrame>();
        let (closed_tx, closed_rx) = watch::channel(false);

        let mut channel = Self::from_parts(out_tx, in_rx, closed_tx, closed_rx.clone());

        let mut writer_closed = closed_rx.clone();
        let writer = io.spawn(async move {
            loop {
                tokio::select! {
                    frame = out_rx.recv() => match frame {
                        Some(text) => {
                            if let Err(e) = sink.send(Message::Text(text)).await {
                                error!("Failed to send frame: {}", e);
                                break;
                            }
                        }
                        None => break,
                    },
                    _ = wait_closed(&mut writer_closed) => break,
                }
            }
            if let Err(e) = sink.close().await {
                debug!("WebSocket close handshake failed: {}", e);
            }
            debug!("Writer pump exited");
        });

        let mut reader_closed = closed_rx;
        let reader = io.spawn(async move {
            loop {
                tokio::select! {
                    message = stream.next() => match message {
                        Some(Ok(Message::Text(text))) => {
                            if in_tx.send(Ok(text)).is_err() {
                                break;
                            }
                        }
                        Some(Ok(Message::Close(_))) => {
                            info!("WebSocket close frame received");
                            let _ = in_tx.send(Err(Error::transport("The server closed the WebSocket")));
                            break;
                        }
                        Some(Ok(other)) => {
                            debug!("Ignoring non-text frame: {:?}", other);
                        }
                        Some(Err(e)) => {
                            error!("WebSocket error: {}", e);
                            let _ = in_tx.send(Err(Error::transport(format!("WebSocket error: {}", e))));
                            break;
                        }
                        None => {
                            warn!("WebSocket stream closed");
                            let _ = in_tx.send(Err(Error::transport("The server closed the WebSocket")));
                            break;
                        }
                    },
                    _ = wait_closed(&mut reader_closed) => break,
                }
            }
            debug!("Reader pump exited");
        });

        channel.tasks = vec![writer, reader];
        info!("WebSocket connection established");

        Ok(channel)
    }

    /// Create an in-memory channel and the peer end that drives it
    pub fn pair() -> (Self, PeerEnd) {
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (in_tx, in_rx) = mpsc::unbounded_channel();
        let (closed_tx, closed_rx) = watch::channel(false);

        let channel = Self::from_parts(out_tx, in_rx, closed_tx, closed_rx);
        let peer = PeerEnd {
            received: out_rx,
            sender: in_tx,
        };

        (channel, peer)
    }

    /// Queue a frame for transmission; never waits for the peer
    pub fn send(&self, frame: String) -> Result<()> {
        if self.is_closed() {
            return Err(Error::ConnectionClosed);
        }

        self.outbound
            .send(frame)
            .map_err(|_| Error::transport("Transmission queue is gone"))
    }

    /// Next inbound frame, in arrival order
    pub async fn recv(&mut self) -> Result<String> {
        if self.is_closed() {
            return Err(Error::ConnectionClosed);
        }

        let frame = tokio::select! {
            frame = self.inbound.recv() => frame,
            _ = wait_closed(&mut self.closed_rx) => return Err(Error::ConnectionClosed),
        };

        match frame {
            Some(Ok(text)) => Ok(text),
            Some(Err(e)) => {
                self.close();
                Err(e)
            }
            None => {
                self.close();
                Err(Error::transport("The server closed the connection"))
            }
        }
    }

    /// Handle that can close this channel from another task
    pub fn closer(&self) -> CloseHandle {
        self.closer.clone()
    }

    /// True once the channel was closed, locally or by a transport failure
    pub fn is_closed(&self) -> bool {
        self.closer.is_closed()
    }

    /// Close both directions; idempotent
    pub fn close(&mut self) {
        self.closer.close();
        for task in self.tasks.drain(..) {
            task.abort();
        }
        self.inbound.close();
    }
}

impl Drop for TransportChannel {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_pair_preserves_order() {
        let (mut channel, mut peer) = TransportChannel::pair();

        channel.send("one".to_string()).unwrap();
        channel.send("two".to_string()).unwrap();
        assert_eq!(peer.received.recv().await.unwrap(), "one");
        assert_eq!(peer.received.recv().await.unwrap(), "two");

        peer.sender.send(Ok("a".to_string())).unwrap();
        peer.sender.send(Ok("b".to_string())).unwrap();
        assert_eq!(channel.recv().await.unwrap(), "a");
        assert_eq!(channel.recv().await.unwrap(), "b");
    }

    #[tokio::test]
    async fn test_close_is_idempotent_and_fails_io() {
        let (mut channel, _peer) = TransportChannel::pair();

        channel.close();
        channel.close();

        assert!(matches!(channel.send("x".to_string()), Err(Error::ConnectionClosed)));
        assert!(matches!(channel.recv().await, Err(Error::ConnectionClosed)));
    }

    #[tokio::test]
    async fn test_peer_hangup_is_transport_error() {
        let (mut channel, peer) = TransportChannel::pair();
        drop(peer);

        assert!(matches!(channel.recv().await, Err(Error::Transport(_))));
        assert!(channel.is_closed());
    }

    #[tokio::test]
    async fn test_closer_interrupts_pending_recv() {
        let (mut channel, _peer) = TransportChannel::pair();
        let closer = channel.closer();

        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            closer.close();
        });

        assert!(matches!(channel.recv().await, Err(Error::ConnectionClosed)));
    }

    #[tokio::test]
    async fn test_connect_refused() {
        let io = IoContext::current().unwrap();
        let result = TransportChannel::connect("ws://127.0.0.1:1/devtools/page/x", &io).await;
        assert!(matches!(result, Err(Error::Transport(_))));
    }
}
