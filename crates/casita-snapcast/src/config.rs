//! Snapcast server configuration.

use casita_core::RefreshPolicy;
use serde::{Deserialize, Serialize};

use crate::control::CONTROL_PORT;

/// Configuration for one Snapcast server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapcastConfig {
    /// Server hostname or address.
    pub host: String,

    /// Control port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Keep the control connection alive across server restarts.
    #[serde(default = "default_reconnect")]
    pub reconnect: bool,

    /// When adapters re-read server state after a write.
    #[serde(default = "default_refresh_policy")]
    pub refresh_policy: RefreshPolicy,
}

fn default_port() -> u16 {
    CONTROL_PORT
}

fn default_reconnect() -> bool {
    true
}

fn default_refresh_policy() -> RefreshPolicy {
    RefreshPolicy::OnWrite
}

impl SnapcastConfig {
    /// Configuration with defaults for everything but the host.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: default_port(),
            reconnect: default_reconnect(),
            refresh_policy: default_refresh_policy(),
        }
    }

    /// Set the control port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the refresh policy.
    pub fn with_refresh_policy(mut self, policy: RefreshPolicy) -> Self {
        self.refresh_policy = policy;
        self
    }

    /// `host:port` part used in entity unique ids, so entities from
    /// several servers never collide.
    pub fn server_id(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SnapcastConfig::new("snapserver.local");
        assert_eq!(config.port, 1705);
        assert!(config.reconnect);
        assert_eq!(config.refresh_policy, RefreshPolicy::OnWrite);
        assert_eq!(config.server_id(), "snapserver.local:1705");
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config: SnapcastConfig = serde_json::from_str(r#"{"host": "10.0.0.2"}"#).unwrap();
        assert_eq!(config.host, "10.0.0.2");
        assert_eq!(config.port, 1705);
        assert!(config.reconnect);
    }

    #[test]
    fn test_deserialize_overrides() {
        let config: SnapcastConfig =
            serde_json::from_str(r#"{"host": "10.0.0.2", "port": 1706, "refresh_policy": "push_only"}"#)
                .unwrap();
        assert_eq!(config.port, 1706);
        assert_eq!(config.refresh_policy, RefreshPolicy::PushOnly);
    }
}
