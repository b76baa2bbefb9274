//! Handle and group lifecycle for peer-held values
//!
//! The store models manual memory management of objects living in the peer:
//! every handle belongs to exactly one group, groups are created on first
//! use, and a group disappears from the store as soon as its last member is
//! released.
//!
//! Identity is keyed by the peer-assigned object id alone. If the peer reuses
//! an id after the old object was released, the new object is
//! indistinguishable from the old one.

use super::group::ObjectGroup;
use super::value::{RemoteObject, RemoteProperty, RemoteValue};
use crate::rpc::RpcEngine;
use crate::{Error, Result};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Tracks every handle the peer handed out on one connection
#[derive(Debug, Default)]
pub struct RemoteValueStore {
    groups: HashMap<Option<String>, Arc<ObjectGroup>>,
}

/// Empty names mean the anonymous group
fn group_key(name: Option<&str>) -> Option<String> {
    name.filter(|n| !n.is_empty()).map(str::to_string)
}

/// Fail without I/O when a handle was already released
pub(crate) fn ensure_live(handle: &RemoteObject) -> Result<()> {
    if handle.is_released() {
        return Err(Error::usage(format!(
            "Remote object {} was already released",
            handle.remote_id()
        )));
    }
    Ok(())
}

/// Decode a payload that carries no `objectId`.
///
/// Values the peer cannot serialize as JSON (`NaN`, `-0`, bigints) arrive as
/// `unserializableValue` and are kept as their textual form.
fn decode_primitive(raw: &Value) -> Result<RemoteValue> {
    let js_type = raw.get("type").and_then(|t| t.as_str());
    let subtype = raw.get("subtype").and_then(|t| t.as_str());
    match (js_type, subtype) {
        (Some("undefined"), _) => Ok(RemoteValue::Undefined),
        (Some("object"), Some("null")) => Ok(RemoteValue::Null),
        _ => {
            if let Some(value) = raw.get("unserializableValue") {
                return Ok(RemoteValue::Primitive(value.clone()));
            }
            match (js_type, raw.get("value")) {
                (Some("boolean" | "number" | "string"), Some(value)) => {
                    Ok(RemoteValue::Primitive(value.clone()))
                }
                (Some("boolean" | "number" | "string"), None) => {
                    Err(Error::decode(format!("Primitive without value {}", raw)))
                }
                _ => Err(Error::decode(format!("Unable to parse {}", raw))),
            }
        }
    }
}

impl RemoteValueStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a raw `Runtime.RemoteObject` payload.
    ///
    /// Payloads carrying an `objectId` resolve to the handle already tracked
    /// in `group` for that id, or to a new one. Primitives are returned by
    /// value with no bookkeeping.
    pub fn wrap(&mut self, raw: &Value, group: Option<&str>) -> Result<RemoteValue> {
        if let Some(remote_id) = raw.get("objectId").and_then(|id| id.as_str()) {
            let group = self.group_or_create(group);
            if let Some(existing) = group.get(remote_id) {
                return Ok(RemoteValue::Handle(existing));
            }

            let object = Arc::new(RemoteObject::new(
                remote_id.to_string(),
                group.name().map(str::to_string),
                raw,
            ));
            group.add(Arc::clone(&object));
            return Ok(RemoteValue::Handle(object));
        }

        decode_primitive(raw)
    }

    /// Check that `raw` would wrap, without registering anything
    pub(crate) fn check_wrappable(raw: &Value) -> Result<()> {
        if raw.get("objectId").and_then(|id| id.as_str()).is_some() {
            return Ok(());
        }
        decode_primitive(raw).map(|_| ())
    }

    fn group_or_create(&mut self, name: Option<&str>) -> Arc<ObjectGroup> {
        let key = group_key(name);
        Arc::clone(
            self.groups
                .entry(key.clone())
                .or_insert_with(|| Arc::new(ObjectGroup::new(key))),
        )
    }

    /// Look up a live group; `None` names the anonymous group
    pub fn group(&self, name: Option<&str>) -> Option<Arc<ObjectGroup>> {
        self.groups.get(&group_key(name)).cloned()
    }

    /// Number of live groups
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Release one handle; a no-op if it was already released
    pub async fn release(&mut self, rpc: &mut RpcEngine, handle: &RemoteObject) -> Result<()> {
        if handle.is_released() {
            return Ok(());
        }

        rpc.call("Runtime.releaseObject", json!({ "objectId": handle.remote_id() }))
            .await?;
        self.detach(handle);
        Ok(())
    }

    /// Drop local bookkeeping for a handle the peer no longer holds
    fn detach(&mut self, handle: &RemoteObject) {
        handle.mark_released();

        let key = group_key(handle.group());
        let emptied = match self.groups.get(&key) {
            Some(group) => group.remove(handle.remote_id()),
            None => false,
        };
        if emptied {
            if let Some(group) = self.groups.remove(&key) {
                group.mark_released();
                debug!("Object group {:?} released with its last member", key);
            }
        }
    }

    /// Release every member of a group.
    ///
    /// Named groups use one bulk call. The anonymous group has no bulk verb,
    /// so its members are released one by one.
    pub async fn release_all(&mut self, rpc: &mut RpcEngine, name: Option<&str>) -> Result<()> {
        let key = group_key(name);
        let Some(group) = self.groups.get(&key).cloned() else {
            return Ok(());
        };

        match &key {
            None => {
                for member in group.snapshot() {
                    self.release(rpc, &member).await?;
                }
                group.mark_released();
                self.groups.remove(&None);
            }
            Some(name) => {
                rpc.call("Runtime.releaseObjectGroup", json!({ "objectGroup": name }))
                    .await?;
                group.release_members();
                self.groups.remove(&key);
            }
        }

        info!("Released object group {:?}", key);
        Ok(())
    }

    /// Release every group the store tracks
    pub async fn release_all_groups(&mut self, rpc: &mut RpcEngine) -> Result<()> {
        let names: Vec<Option<String>> = self.groups.keys().cloned().collect();
        for name in names {
            self.release_all(rpc, name.as_deref()).await?;
        }
        Ok(())
    }

    /// Forget every handle without contacting the peer
    pub fn clear(&mut self) {
        for (_, group) in self.groups.drain() {
            group.release_members();
        }
    }

    /// Fetch an object's own and inherited properties
    pub async fn properties(
        &mut self,
        rpc: &mut RpcEngine,
        handle: &RemoteObject,
    ) -> Result<Vec<RemoteProperty>> {
        ensure_live(handle)?;

        let result = rpc
            .call("Runtime.getProperties", json!({ "objectId": handle.remote_id() }))
            .await?;
        let raw_properties = result
            .get("result")
            .and_then(|r| r.as_array())
            .cloned()
            .unwrap_or_default();

        let group = handle.group();
        let mut properties = Vec::with_capacity(raw_properties.len());
        for raw in raw_properties {
            let flag = |key: &str| raw.get(key).and_then(|v| v.as_bool()).unwrap_or(false);
            let mut wrap_field = |key: &str| -> Result<Option<RemoteValue>> {
                raw.get(key).map(|v| self.wrap(v, group)).transpose()
            };

            properties.push(RemoteProperty {
                name: raw
                    .get("name")
                    .and_then(|n| n.as_str())
                    .unwrap_or_default()
                    .to_string(),
                value: wrap_field("value")?,
                getter: wrap_field("get")?,
                setter: wrap_field("set")?,
                configurable: flag("configurable"),
                enumerable: flag("enumerable"),
                writable: flag("writable"),
            });
        }

        Ok(properties)
    }

    /// Call a function with `this` bound to the handle's object
    pub async fn call_function_on(
        &mut self,
        rpc: &mut RpcEngine,
        handle: &RemoteObject,
        declaration: &str,
        args: &[RemoteValue],
    ) -> Result<RemoteValue> {
        ensure_live(handle)?;
        for arg in args {
            if let Some(arg_handle) = arg.as_handle() {
                ensure_live(arg_handle)?;
            }
        }

        let arguments: Vec<Value> = args.iter().map(RemoteValue::to_call_argument).collect();
        let result = rpc
            .call(
                "Runtime.callFunctionOn",
                json!({
                    "objectId": handle.remote_id(),
                    "functionDeclaration": declaration,
                    "arguments": arguments,
                    "returnByValue": false,
                }),
            )
            .await?;

        if result.get("exceptionDetails").is_some() || result.get("wasThrown").is_some() {
            debug!("Function call on {} threw", handle.remote_id());
        }
        self.wrap(&result["result"], handle.group())
    }
}
