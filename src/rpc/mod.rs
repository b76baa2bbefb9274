//! # RPC layer
//!
//! Carries JSON commands and notifications over one duplex text-frame
//! connection to a tab's remote debugging endpoint.
//!
//! ## Module structure
//! - `types`: wire frames and their classification
//! - `transport`: WebSocket and in-memory frame channels
//! - `engine`: id correlation and the notification queue
//! - `mock`: scripted peer for tests
//!
//! ## Usage example
//! ```rust,no_run
//! use webkit_remote::rpc::{IoContext, RpcEngine, TransportChannel};
//!
//! # async fn example() -> webkit_remote::Result<()> {
//! let io = IoContext::current()?;
//! let transport = TransportChannel::connect("ws://localhost:9222/devtools/page/ABC", &io).await?;
//! let mut rpc = RpcEngine::new(transport);
//!
//! let result = rpc
//!     .call("Runtime.evaluate", serde_json::json!({ "expression": "1 + 2", "returnByValue": true }))
//!     .await?;
//! println!("{}", result["result"]["value"]);
//! rpc.close();
//! # Ok(())
//! # }
//! ```

pub mod types;
pub mod transport;
pub mod engine;
pub mod mock;


pub use engine::RpcEngine;
pub use mock::MockPeer;
pub use transport::{CloseHandle, IoContext, PeerEnd, TransportChannel};
pub use types::{InboundMessage, RpcErrorDetail, RpcNotification, RpcRequest, RpcResponse};
