//! Tab discovery over the browser's HTTP debug endpoint

use crate::config::ClientConfig;
use crate::{Error, Result};
use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

/// A browser tab that may be debugged
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tab {
    pub title: String,
    pub url: String,
    /// WebSocket URL of the tab's debug socket; absent while another
    /// debugger is attached
    pub debug_url: Option<String>,
}

impl Tab {
    /// Parse one entry of the `/json` listing
    pub fn from_json(entry: &Value) -> Option<Tab> {
        let url = entry.get("url").and_then(|v| v.as_str())?;
        Some(Tab {
            title: entry
                .get("title")
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string(),
            url: url.to_string(),
            debug_url: entry
                .get("webSocketDebuggerUrl")
                .and_then(|v| v.as_str())
                .map(str::to_string),
        })
    }
}

/// Lists the tabs of a running browser
#[async_trait]
pub trait TabLister: Send + Sync {
    async fn tabs(&self) -> Result<Vec<Tab>>;
}

/// `TabLister` backed by `GET {endpoint}/json`
#[derive(Debug, Clone)]
pub struct HttpTabLister {
    endpoint: String,
    http: reqwest::Client,
}

impl HttpTabLister {
    /// `endpoint` is the debug server base URL, e.g. `http://localhost:9292`
    pub fn new<S: Into<String>>(endpoint: S) -> Self {
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.http_endpoint())
    }
}

#[async_trait]
impl TabLister for HttpTabLister {
    async fn tabs(&self) -> Result<Vec<Tab>> {
        let url = format!("{}/json", self.endpoint);
        debug!("Fetching tabs from {}", url);

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::discovery(format!("Failed to fetch tabs: {}", e)))?;
        let entries: Vec<Value> = response
            .json()
            .await
            .map_err(|e| Error::discovery(format!("Failed to parse tabs: {}", e)))?;

        Ok(entries.iter().filter_map(Tab::from_json).collect())
    }
}
