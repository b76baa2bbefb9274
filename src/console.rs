//! Console message log
//!
//! Messages arrive through `Console.messageAdded` while console events are
//! enabled. Their parameters are peer-held values, so clearing the log has to
//! release them; [`ConsoleLog::clear`] hands the handles back to the caller,
//! which owns the connection needed to release them.

use crate::runtime::{RemoteObject, RemoteValue, RemoteValueStore};
use crate::{Error, Result};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

/// Message severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConsoleLevel {
    Log,
    Debug,
    Info,
    Warning,
    Error,
    Tip,
}

impl ConsoleLevel {
    /// Parse a wire level; unknown levels count as errors
    pub fn parse(level: Option<&str>) -> Self {
        match level {
            Some("log") => ConsoleLevel::Log,
            Some("debug") => ConsoleLevel::Debug,
            Some("info") => ConsoleLevel::Info,
            Some("warning") | Some("warn") => ConsoleLevel::Warning,
            Some("tip") => ConsoleLevel::Tip,
            _ => ConsoleLevel::Error,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConsoleLevel::Log => "log",
            ConsoleLevel::Debug => "debug",
            ConsoleLevel::Info => "info",
            ConsoleLevel::Warning => "warning",
            ConsoleLevel::Error => "error",
            ConsoleLevel::Tip => "tip",
        }
    }
}

/// One frame of a message's stack trace
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackFrame {
    #[serde(default)]
    pub function_name: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub line_number: Option<u32>,
    #[serde(default)]
    pub column_number: Option<u32>,
}

/// A message logged to the tab's console
#[derive(Debug, Clone)]
pub struct ConsoleMessage {
    pub text: String,
    pub level: ConsoleLevel,
    /// Component that produced the message, e.g. `console_api` or `network`
    pub reason: String,
    /// Message type, e.g. `log`, `dir` or `assert`
    pub kind: Option<String>,
    pub source_url: Option<String>,
    pub source_line: Option<u32>,
    /// Number of consecutive repeats, at least 1
    pub count: u64,
    /// Logged values, wrapped into the anonymous object group
    pub params: Vec<RemoteValue>,
    /// Correlation id of the network resource this message refers to
    pub network_request_id: Option<String>,
    pub stack_trace: Option<Vec<StackFrame>>,
}

impl ConsoleMessage {
    /// Build a message from a raw `Console.ConsoleMessage` payload
    pub fn from_raw(raw: &Value, values: &mut RemoteValueStore) -> Result<Self> {
        if !raw.is_object() {
            return Err(Error::decode(format!("Console message is not an object: {}", raw)));
        }
        let text = |key: &str| raw.get(key).and_then(|v| v.as_str()).map(str::to_string);

        let stack_trace = raw
            .get("stackTrace")
            .filter(|s| !s.is_null())
            .map(|s| serde_json::from_value::<Vec<StackFrame>>(s.clone()))
            .transpose()
            .map_err(|e| Error::decode(format!("Invalid stack trace: {}", e)))?;

        // Every parameter is checked before any is registered, so a rejected
        // message leaves no handles behind in the anonymous group.
        let raw_params = raw
            .get("parameters")
            .and_then(|p| p.as_array())
            .map(Vec::as_slice)
            .unwrap_or_default();
        for p in raw_params {
            RemoteValueStore::check_wrappable(p)?;
        }
        let params = raw_params
            .iter()
            .map(|p| values.wrap(p, None))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            text: text("text").unwrap_or_default(),
            level: ConsoleLevel::parse(raw.get("level").and_then(|v| v.as_str())),
            reason: text("source")
                .map(|s| s.replace('-', "_"))
                .unwrap_or_else(|| "other".to_string()),
            kind: text("type"),
            source_url: text("url"),
            source_line: raw.get("line").and_then(|v| v.as_u64()).map(|l| l as u32),
            count: raw.get("repeatCount").and_then(|v| v.as_u64()).unwrap_or(1),
            params,
            network_request_id: text("networkRequestId"),
            stack_trace,
        })
    }

    /// Handles among this message's parameters
    pub fn param_handles(&self) -> impl Iterator<Item = &Arc<RemoteObject>> {
        self.params.iter().filter_map(RemoteValue::as_handle)
    }
}

/// Messages received since the last clear, oldest first
#[derive(Debug, Default)]
pub struct ConsoleLog {
    messages: Vec<ConsoleMessage>,
}

impl ConsoleLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[ConsoleMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub(crate) fn add(&mut self, message: ConsoleMessage) {
        self.messages.push(message);
    }

    /// Apply `Console.messageRepeatCountUpdated` to the newest message
    pub(crate) fn update_repeat_count(&mut self, count: u64) {
        if let Some(last) = self.messages.last_mut() {
            last.count = count;
        }
    }

    /// Empty the log; returns the parameter handles that must be released
    #[must_use]
    pub(crate) fn clear(&mut self) -> Vec<Arc<RemoteObject>> {
        self.messages
            .drain(..)
            .flat_map(|message| message.param_handles().cloned().collect::<Vec<_>>())
            .collect()
    }
}
