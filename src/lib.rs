//! webkit-remote: client for the browser remote debugging protocol
//!
//! Drives and inspects one browser tab over its debug socket: issues
//! commands, decodes notifications into typed events, tracks peer-held
//! JavaScript values, and keeps DOM, network and console state assembled
//! from the event stream.

pub mod error;
pub mod config;

pub mod rpc;
pub mod events;
pub mod runtime;
pub mod network;
pub mod console;
pub mod dom;
pub mod client;
pub mod discovery;

// Re-exports
pub use client::Client;
pub use config::ClientConfig;
pub use error::{Error, Result};

/// webkit-remote library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
