//! DOM node cache
//!
//! Descriptors are stored in one table keyed by node id, so a parent's child
//! list holds ids that always resolve to the current descriptor. Updates only
//! add or overwrite fields. A document reset drops the whole table at once;
//! ids obtained earlier no longer resolve and callers must fetch the root
//! again.

use crate::{Error, Result};
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

/// Peer-assigned node id
pub type NodeId = i64;

/// W3C node type codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    Element,
    Attribute,
    Text,
    CdataSection,
    EntityReference,
    Entity,
    ProcessingInstruction,
    Comment,
    Document,
    DocumentType,
    DocumentFragment,
    Notation,
    Other(u64),
}

impl From<u64> for NodeType {
    fn from(code: u64) -> Self {
        match code {
            1 => NodeType::Element,
            2 => NodeType::Attribute,
            3 => NodeType::Text,
            4 => NodeType::CdataSection,
            5 => NodeType::EntityReference,
            6 => NodeType::Entity,
            7 => NodeType::ProcessingInstruction,
            8 => NodeType::Comment,
            9 => NodeType::Document,
            10 => NodeType::DocumentType,
            11 => NodeType::DocumentFragment,
            12 => NodeType::Notation,
            other => NodeType::Other(other),
        }
    }
}

/// Cached view of one DOM node
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeDescriptor {
    pub id: NodeId,
    pub node_type: Option<NodeType>,
    pub name: Option<String>,
    pub local_name: Option<String>,
    pub value: Option<String>,
    pub attributes: HashMap<String, String>,
    /// Child ids, in document order; `None` until the peer sent them
    pub children: Option<Vec<NodeId>>,
    pub child_node_count: Option<u64>,
    /// For frame owners, the root of the framed document
    pub content_document: Option<NodeId>,
    pub document_url: Option<String>,
    pub xml_version: Option<String>,
    pub public_id: Option<String>,
    pub system_id: Option<String>,
    pub internal_subset: Option<String>,
    pub attr_name: Option<String>,
    pub attr_value: Option<String>,
}

impl NodeDescriptor {
    fn new(id: NodeId) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }

    /// Overwrite the fields present in `raw`, leaving the rest alone
    fn merge_fields(&mut self, raw: &Value) {
        let text = |key: &str| raw.get(key).and_then(|v| v.as_str()).map(str::to_string);

        if let Some(code) = raw.get("nodeType").and_then(|v| v.as_u64()) {
            self.node_type = Some(NodeType::from(code));
        }
        if let Some(name) = text("nodeName") {
            self.name = Some(name);
        }
        if let Some(local_name) = text("localName") {
            self.local_name = Some(local_name);
        }
        if let Some(value) = text("nodeValue") {
            self.value = Some(value);
        }
        if let Some(count) = raw.get("childNodeCount").and_then(|v| v.as_u64()) {
            self.child_node_count = Some(count);
        }
        if let Some(url) = text("documentURL") {
            self.document_url = Some(url);
        }
        if let Some(version) = text("xmlVersion") {
            self.xml_version = Some(version);
        }
        if let Some(id) = text("publicId") {
            self.public_id = Some(id);
        }
        if let Some(id) = text("systemId") {
            self.system_id = Some(id);
        }
        if let Some(subset) = text("internalSubset") {
            self.internal_subset = Some(subset);
        }
        if let Some(name) = text("name") {
            self.attr_name = Some(name);
        }
        if let Some(value) = text("value") {
            self.attr_value = Some(value);
        }
        if let Some(flat) = raw.get("attributes").and_then(|v| v.as_array()) {
            // Flat [name, value, name, value, ...] list.
            for pair in flat.chunks(2) {
                if let [name, value] = pair {
                    if let (Some(name), Some(value)) = (name.as_str(), value.as_str()) {
                        self.attributes.insert(name.to_string(), value.to_string());
                    }
                }
            }
        }
    }
}

/// Descriptor table for one document
#[derive(Debug, Default)]
pub struct NodeCache {
    nodes: HashMap<NodeId, NodeDescriptor>,
    root: Option<NodeId>,
}

fn node_id(raw: &Value) -> Result<NodeId> {
    raw.get("nodeId")
        .and_then(|v| v.as_i64())
        .ok_or_else(|| Error::decode(format!("DOM node without nodeId: {}", raw)))
}

impl NodeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The descriptor for `id`, created empty if unknown
    pub fn get_or_create(&mut self, id: NodeId) -> &mut NodeDescriptor {
        self.nodes.entry(id).or_insert_with(|| NodeDescriptor::new(id))
    }

    pub fn get(&self, id: NodeId) -> Option<&NodeDescriptor> {
        self.nodes.get(&id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Merge a partial `DOM.Node` payload and everything nested in it.
    ///
    /// Returns the id of the merged node.
    pub fn update_all(&mut self, raw: &Value) -> Result<NodeId> {
        let id = node_id(raw)?;
        self.get_or_create(id).merge_fields(raw);

        if let Some(raw_children) = raw.get("children").and_then(|v| v.as_array()) {
            let children = raw_children
                .iter()
                .map(|child| self.update_all(child))
                .collect::<Result<Vec<_>>>()?;
            self.get_or_create(id).children = Some(children);
        }
        if let Some(raw_document) = raw.get("contentDocument").filter(|v| v.is_object()) {
            let document = self.update_all(raw_document)?;
            self.get_or_create(id).content_document = Some(document);
        }

        Ok(id)
    }

    /// Merge a document payload and remember it as the root
    pub fn set_root(&mut self, raw: &Value) -> Result<NodeId> {
        let id = self.update_all(raw)?;
        self.root = Some(id);
        Ok(id)
    }

    pub fn root(&self) -> Option<&NodeDescriptor> {
        self.root.and_then(|id| self.nodes.get(&id))
    }

    /// Apply `DOM.setChildNodes`: the parent's child list is replaced
    pub fn set_child_nodes(&mut self, parent_id: NodeId, nodes: &[Value]) -> Result<()> {
        let children = nodes
            .iter()
            .map(|node| self.update_all(node))
            .collect::<Result<Vec<_>>>()?;

        let parent = self.get_or_create(parent_id);
        parent.child_node_count = Some(children.len() as u64);
        parent.children = Some(children);
        Ok(())
    }

    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) {
        self.get_or_create(id)
            .attributes
            .insert(name.to_string(), value.to_string());
    }

    /// Explicit removal reported by the peer
    pub fn remove_attribute(&mut self, id: NodeId, name: &str) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.attributes.remove(name);
        }
    }

    /// Descriptors of a node's known children, in order
    pub fn children(&self, id: NodeId) -> Vec<&NodeDescriptor> {
        self.nodes
            .get(&id)
            .and_then(|node| node.children.as_ref())
            .map(|ids| ids.iter().filter_map(|child| self.nodes.get(child)).collect())
            .unwrap_or_default()
    }

    /// Drop the root and every descriptor
    pub fn clear(&mut self) {
        if !self.nodes.is_empty() {
            debug!("Invalidating {} cached DOM nodes", self.nodes.len());
        }
        self.nodes.clear();
        self.root = None;
    }
}
