//! # Client
//!
//! One debugging session with one browser tab.
//!
//! The client owns one instance of every subsystem, built in dependency
//! order by [`Client::new`] and torn down by [`Client::close`]. Commands and
//! event consumption both take `&mut self`, so only one of them can be
//! reading from the connection at any time.
//!
//! ## Usage example
//! ```rust,no_run
//! use webkit_remote::events::{Condition, EventType};
//! use webkit_remote::rpc::IoContext;
//! use webkit_remote::{Client, ClientConfig};
//!
//! # async fn example() -> webkit_remote::Result<()> {
//! let io = IoContext::current()?;
//! let mut client = Client::connect(
//!     "ws://localhost:9222/devtools/page/ABC",
//!     &io,
//!     ClientConfig::default(),
//! )
//! .await?;
//!
//! client.set_page_events(true).await?;
//! client.call("Page.navigate", serde_json::json!({ "url": "https://example.com" })).await?;
//! let events = client.wait_for(&[Condition::Type(EventType::PageLoaded)]).await?;
//! println!("{} events until load", events.len());
//!
//! let title = client.remote_eval("document.title", None).await?;
//! println!("{}", title.to_text());
//! client.shutdown().await;
//! # Ok(())
//! # }
//! ```


use crate::config::ClientConfig;
use crate::console::{ConsoleLog, ConsoleMessage};
use crate::discovery::Tab;
use crate::dom::{NodeCache, NodeDescriptor, NodeId};
use crate::events::{self, Condition, DispatchContext, Event, EventToggles, Gate};
use crate::network::{ResourceAggregator, ResourceRecord};
use crate::rpc::{CloseHandle, IoContext, RpcEngine, TransportChannel};
use crate::runtime::store::ensure_live;
use crate::runtime::{
    ObjectGroup, RemoteObject, RemoteProperty, RemoteValue, RemoteValueStore,
};
use crate::{Error, Result};
use bytes::Bytes;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Debugging session for one tab
#[derive(Debug)]
pub struct Client {
    rpc: RpcEngine,
    config: ClientConfig,
    toggles: EventToggles,
    values: RemoteValueStore,
    network: ResourceAggregator,
    console: ConsoleLog,
    dom: NodeCache,
}

impl Client {
    /// Build a client over an open transport
    pub fn new(transport: TransportChannel, config: ClientConfig) -> Self {
        Self {
            rpc: RpcEngine::new(transport),
            config,
            toggles: EventToggles::default(),
            values: RemoteValueStore::new(),
            network: ResourceAggregator::new(),
            console: ConsoleLog::new(),
            dom: NodeCache::new(),
        }
    }

    /// Connect to a tab's debug socket URL
    pub async fn connect(url: &str, io: &IoContext, config: ClientConfig) -> Result<Self> {
        let transport = TransportChannel::connect(url, io).await?;
        info!("Connected to {}", url);
        Ok(Self::new(transport, config))
    }

    /// Connect to a tab returned by a [`crate::discovery::TabLister`]
    pub async fn connect_tab(tab: &Tab, io: &IoContext, config: ClientConfig) -> Result<Self> {
        let url = tab
            .debug_url
            .as_deref()
            .ok_or_else(|| Error::usage(format!("Target tab not specified: {} has no debug URL", tab.url)))?;
        Self::connect(url, io, config).await
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Issue a raw command
    pub async fn call(&mut self, method: &str, params: Value) -> Result<Value> {
        self.rpc.call(method, params).await
    }

    /// Handle that can close the connection from another task
    pub fn closer(&self) -> CloseHandle {
        self.rpc.closer()
    }

    pub fn is_closed(&self) -> bool {
        self.rpc.is_closed()
    }

    /// Next decoded event, oldest first
    pub async fn next_event(&mut self) -> Result<Event> {
        let notification = self.rpc.next_notification().await?;
        let dispatched = {
            let mut ctx = DispatchContext {
                values: &mut self.values,
                network: &mut self.network,
                console: &mut self.console,
                dom: &mut self.dom,
            };
            events::dispatch(notification, &mut ctx)
        };

        self.release_handles(dispatched.orphans).await?;
        Ok(dispatched.event)
    }

    /// Consume events until one satisfies every condition.
    ///
    /// Returns every event seen, the matching one last. Fails with a usage
    /// error, before touching the connection, if no such event can arrive
    /// under the current toggles.
    pub async fn wait_for(&mut self, conditions: &[Condition]) -> Result<Vec<Event>> {
        if !self.can_receive(conditions) {
            return Err(Error::usage(format!(
                "Waiting for {:?} would block forever with {:?}",
                conditions, self.toggles
            )));
        }

        let mut seen = Vec::new();
        loop {
            let event = self.next_event().await?;
            let done = events::matches(&event, conditions);
            seen.push(event);
            if done {
                return Ok(seen);
            }
        }
    }

    /// True if an event satisfying `conditions` can arrive
    pub fn can_receive(&self, conditions: &[Condition]) -> bool {
        events::can_receive(&self.toggles, conditions)
    }

    pub fn toggles(&self) -> EventToggles {
        self.toggles
    }

    pub async fn set_console_events(&mut self, enabled: bool) -> Result<()> {
        self.set_toggle(Gate::Console, enabled).await
    }

    pub async fn set_network_events(&mut self, enabled: bool) -> Result<()> {
        self.set_toggle(Gate::Network, enabled).await
    }

    pub async fn set_page_events(&mut self, enabled: bool) -> Result<()> {
        self.set_toggle(Gate::Page, enabled).await
    }

    /// Enable or disable an event family; no-op if already in that state
    async fn set_toggle(&mut self, gate: Gate, enabled: bool) -> Result<()> {
        if gate.is_open(&self.toggles) == enabled {
            return Ok(());
        }

        let verb = if enabled { "enable" } else { "disable" };
        self.rpc
            .call(&format!("{}.{}", gate.domain(), verb), json!({}))
            .await?;

        let slot = match gate {
            Gate::Console => &mut self.toggles.console,
            Gate::Network => &mut self.toggles.network,
            Gate::Page => &mut self.toggles.page,
        };
        *slot = enabled;
        debug!("{} events {}d", gate.domain(), verb);
        Ok(())
    }

    /// Evaluate an expression in the tab.
    ///
    /// Objects are placed in `group`, or in the configured default group.
    /// A thrown exception is returned like any other value.
    pub async fn remote_eval(&mut self, expression: &str, group: Option<&str>) -> Result<RemoteValue> {
        let group = group.unwrap_or(self.config.default_object_group.as_str()).to_string();
        let result = self
            .rpc
            .call(
                "Runtime.evaluate",
                json!({ "expression": expression, "objectGroup": group }),
            )
            .await?;

        if result.get("exceptionDetails").is_some() || result.get("wasThrown").is_some() {
            debug!("Evaluation threw: {}", expression);
        }
        self.values.wrap(&result["result"], Some(&group))
    }

    /// A live object group; `None` is the anonymous group
    pub fn object_group(&self, name: Option<&str>) -> Option<Arc<ObjectGroup>> {
        self.values.group(name)
    }

    pub async fn properties(&mut self, handle: &RemoteObject) -> Result<Vec<RemoteProperty>> {
        self.values.properties(&mut self.rpc, handle).await
    }

    pub async fn call_function_on(
        &mut self,
        handle: &RemoteObject,
        declaration: &str,
        args: &[RemoteValue],
    ) -> Result<RemoteValue> {
        self.values
            .call_function_on(&mut self.rpc, handle, declaration, args)
            .await
    }

    /// Release one handle; idempotent
    pub async fn release(&mut self, handle: &RemoteObject) -> Result<()> {
        self.values.release(&mut self.rpc, handle).await
    }

    /// Release every member of a group
    pub async fn release_group(&mut self, name: Option<&str>) -> Result<()> {
        self.values.release_all(&mut self.rpc, name).await
    }

    /// Release every group
    pub async fn release_all_groups(&mut self) -> Result<()> {
        self.values.release_all_groups(&mut self.rpc).await
    }

    async fn release_handles(&mut self, handles: Vec<Arc<RemoteObject>>) -> Result<()> {
        for handle in handles {
            if let Err(e) = self.values.release(&mut self.rpc, &handle).await {
                if e.is_fatal() {
                    return Err(e);
                }
                warn!("Failed to release {}: {}", handle.remote_id(), e);
            }
        }
        Ok(())
    }

    /// Network resources seen so far, in first-seen order
    pub fn resources(&self) -> impl Iterator<Item = &ResourceRecord> {
        self.network.resources()
    }

    pub fn resource(&self, request_id: &str) -> Option<&ResourceRecord> {
        self.network.get(request_id)
    }

    /// A resource's body, fetched on first access
    pub async fn resource_body(&mut self, request_id: &str) -> Result<Bytes> {
        self.network.body(&mut self.rpc, request_id).await
    }

    /// Forget every network resource
    pub fn clear_network(&mut self) {
        self.network.clear();
    }

    /// Console messages received since the last clear
    pub fn console_messages(&self) -> &[ConsoleMessage] {
        self.console.messages()
    }

    /// Clear the tab's console and release logged values
    pub async fn clear_console(&mut self) -> Result<()> {
        self.rpc.call("Console.clearMessages", json!({})).await?;
        let handles = self.console.clear();
        self.release_handles(handles).await
    }

    pub fn dom(&self) -> &NodeCache {
        &self.dom
    }

    pub fn dom_node(&self, id: NodeId) -> Option<&NodeDescriptor> {
        self.dom.get(id)
    }

    /// Root document node, fetched once per document
    pub async fn dom_root(&mut self) -> Result<NodeId> {
        if let Some(root) = self.dom.root() {
            return Ok(root.id);
        }

        let result = self.rpc.call("DOM.getDocument", json!({})).await?;
        self.dom.set_root(&result["root"])
    }

    /// Forget every cached node
    pub fn clear_dom(&mut self) {
        self.dom.clear();
    }

    /// First descendant matching a CSS selector
    pub async fn query_selector(&mut self, node: NodeId, selector: &str) -> Result<Option<NodeId>> {
        let result = self
            .rpc
            .call("DOM.querySelector", json!({ "nodeId": node, "selector": selector }))
            .await?;

        match result.get("nodeId").and_then(|id| id.as_i64()) {
            None | Some(0) => Ok(None),
            Some(id) => {
                self.dom.get_or_create(id);
                Ok(Some(id))
            }
        }
    }

    /// Every descendant matching a CSS selector
    pub async fn query_selector_all(&mut self, node: NodeId, selector: &str) -> Result<Vec<NodeId>> {
        let result = self
            .rpc
            .call("DOM.querySelectorAll", json!({ "nodeId": node, "selector": selector }))
            .await?;

        let ids: Vec<NodeId> = result
            .get("nodeIds")
            .and_then(|ids| ids.as_array())
            .map(|ids| ids.iter().filter_map(Value::as_i64).collect())
            .unwrap_or_default();
        for id in &ids {
            self.dom.get_or_create(*id);
        }
        Ok(ids)
    }

    /// Re-read a node's attributes from the peer.
    ///
    /// The reply is a complete snapshot, so it replaces the cached map
    /// outright: attributes missing from it are dropped. Event-driven updates
    /// only ever add, overwrite or remove the one attribute they name.
    pub async fn dom_attributes(&mut self, node: NodeId) -> Result<HashMap<String, String>> {
        let result = self
            .rpc
            .call("DOM.getAttributes", json!({ "nodeId": node }))
            .await?;

        let descriptor = self.dom.get_or_create(node);
        descriptor.attributes.clear();
        if let Some(flat) = result.get("attributes").and_then(|a| a.as_array()) {
            for pair in flat.chunks(2) {
                if let [Value::String(name), Value::String(value)] = pair {
                    descriptor.attributes.insert(name.clone(), value.clone());
                }
            }
        }
        Ok(descriptor.attributes.clone())
    }

    pub async fn outer_html(&mut self, node: NodeId) -> Result<String> {
        let result = self
            .rpc
            .call("DOM.getOuterHTML", json!({ "nodeId": node }))
            .await?;
        Ok(result
            .get("outerHTML")
            .and_then(|h| h.as_str())
            .unwrap_or_default()
            .to_string())
    }

    /// JavaScript object for a DOM node
    pub async fn resolve_node(&mut self, node: NodeId, group: Option<&str>) -> Result<RemoteValue> {
        let group = group.unwrap_or(self.config.default_object_group.as_str()).to_string();
        let result = self
            .rpc
            .call("DOM.resolveNode", json!({ "nodeId": node, "objectGroup": group }))
            .await?;
        self.values.wrap(&result["object"], Some(&group))
    }

    /// DOM node for a JavaScript object
    pub async fn request_node(&mut self, handle: &RemoteObject) -> Result<NodeId> {
        ensure_live(handle)?;

        let result = self
            .rpc
            .call("DOM.requestNode", json!({ "objectId": handle.remote_id() }))
            .await?;
        let id = result
            .get("nodeId")
            .and_then(|id| id.as_i64())
            .ok_or_else(|| Error::decode(format!("DOM.requestNode returned {}", result)))?;
        self.dom.get_or_create(id);
        Ok(id)
    }

    /// Release peer-side state, then close
    pub async fn shutdown(&mut self) {
        if !self.is_closed() {
            if let Err(e) = self.values.release_all_groups(&mut self.rpc).await {
                warn!("Releasing object groups during shutdown failed: {}", e);
            }
        }
        self.close();
    }

    /// Close the connection and drop local state; idempotent.
    ///
    /// Works when the peer is already gone.
    pub fn close(&mut self) {
        self.rpc.close();
        self.values.clear();
        let _ = self.console.clear();
        self.network.clear();
        self.dom.clear();
    }
}
