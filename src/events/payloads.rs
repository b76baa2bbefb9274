//! Typed notification payloads

use crate::network::{NetworkRequest, NetworkResponse, ResourceType};
use serde::Deserialize;
use serde_json::Value;

/// Params of `Page.loadEventFired` and `Page.domContentEventFired`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PageTimestamp {
    #[serde(default)]
    pub timestamp: f64,
}

/// Params of `Console.messageRepeatCountUpdated`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RepeatCount {
    pub count: u64,
}

/// Params of `DOM.setChildNodes`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetChildNodes {
    pub parent_id: i64,
    pub nodes: Vec<Value>,
}

/// Params of `DOM.attributeModified`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeModified {
    pub node_id: i64,
    pub name: String,
    pub value: String,
}

/// Params of `DOM.attributeRemoved`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeRemoved {
    pub node_id: i64,
    pub name: String,
}

/// Params of `Network.requestWillBeSent`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestWillBeSent {
    pub request_id: String,
    #[serde(default)]
    pub loader_id: Option<String>,
    #[serde(default)]
    pub document_url: Option<String>,
    pub request: NetworkRequest,
    #[serde(default)]
    pub redirect_response: Option<NetworkResponse>,
    #[serde(default)]
    pub initiator: Option<Value>,
    #[serde(default, rename = "type")]
    pub resource_type: Option<ResourceType>,
    #[serde(default)]
    pub timestamp: f64,
}

/// Params of `Network.responseReceived`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseReceived {
    pub request_id: String,
    #[serde(default)]
    pub loader_id: Option<String>,
    pub response: NetworkResponse,
    #[serde(default, rename = "type")]
    pub resource_type: Option<ResourceType>,
    #[serde(default)]
    pub timestamp: f64,
}

/// Params of `Network.dataReceived`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataReceived {
    pub request_id: String,
    #[serde(default)]
    pub data_length: u64,
    #[serde(default)]
    pub encoded_data_length: u64,
    #[serde(default)]
    pub timestamp: f64,
}

/// Params of `Network.loadingFinished`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadingFinished {
    pub request_id: String,
    #[serde(default)]
    pub timestamp: f64,
}

/// Params of `Network.loadingFailed`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadingFailed {
    pub request_id: String,
    #[serde(default)]
    pub error_text: String,
    #[serde(default)]
    pub canceled: bool,
    #[serde(default, rename = "type")]
    pub resource_type: Option<ResourceType>,
    #[serde(default)]
    pub timestamp: f64,
}

/// Params of `Network.requestServedFromCache`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestServedFromCache {
    pub request_id: String,
}
