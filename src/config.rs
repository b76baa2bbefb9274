//! Configuration management for webkit-remote

use crate::{Error, Result};
use serde::Deserialize;
use std::env;

/// Client configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Host of the browser's remote debugging server
    pub host: String,

    /// Port of the browser's remote debugging server
    pub port: u16,

    /// Object group used by `remote_eval` when the caller names none
    pub default_object_group: String,

    /// Log level
    pub log_level: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 9292,
            default_object_group: "_".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = ClientConfig::default();

        if let Ok(host) = env::var("WEBKIT_REMOTE_HOST") {
            config.host = host;
        }

        if let Ok(port) = env::var("WEBKIT_REMOTE_PORT") {
            config.port = port
                .parse()
                .map_err(|_| Error::configuration("Invalid WEBKIT_REMOTE_PORT"))?;
        }

        if let Ok(group) = env::var("WEBKIT_REMOTE_DEFAULT_GROUP") {
            if group.is_empty() {
                return Err(Error::configuration("WEBKIT_REMOTE_DEFAULT_GROUP must not be empty"));
            }
            config.default_object_group = group;
        }

        if let Ok(log_level) = env::var("WEBKIT_REMOTE_LOG_LEVEL") {
            config.log_level = log_level;
        }

        Ok(config)
    }

    /// Load configuration from a file
    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::configuration(format!("Failed to read config file: {}", e)))?;

        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: ClientConfig = toml::from_str(content)
            .map_err(|e| Error::configuration(format!("Failed to parse config: {}", e)))?;

        if config.default_object_group.is_empty() {
            return Err(Error::configuration("default_object_group must not be empty"));
        }

        Ok(config)
    }

    /// Base URL of the HTTP discovery endpoint
    pub fn http_endpoint(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.http_endpoint(), "http://localhost:9292");
        assert_eq!(config.default_object_group, "_");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = ClientConfig::from_toml("port = 9222\n").unwrap();
        assert_eq!(config.port, 9222);
        assert_eq!(config.host, "localhost");
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_empty_group_rejected() {
        let result = ClientConfig::from_toml("default_object_group = \"\"\n");
        assert!(matches!(result, Err(Error::Configuration(_))));
    }
}
