//! # Runtime values
//!
//! Peer-held JavaScript values and their lifecycle.
//!
//! ## Module structure
//! - `value`: the `RemoteValue` tagged union and `RemoteObject` handles
//! - `group`: object groups released together
//! - `store`: handle resolution and release bookkeeping

pub mod value;
pub mod group;
pub mod store;

pub use group::ObjectGroup;
pub use store::RemoteValueStore;
pub use value::{RemoteObject, RemoteProperty, RemoteValue};
