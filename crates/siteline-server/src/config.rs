use std::net::SocketAddr;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Capacity of each realtime connection's event channel.
    pub channel_capacity: usize,
    /// Hard cap on simultaneous realtime connections.
    pub max_connections: usize,
    /// Allow any origin on the HTTP surface (mobile clients and the
    /// operator UI are served from other hosts).
    pub permissive_cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8430".parse().unwrap(),
            channel_capacity: 64,
            max_connections: 1024,
            permissive_cors: true,
        }
    }
}

impl ServerConfig {
    /// Load from a TOML file; absent keys fall back to defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("parsing config from {}", path.display()))
    }
}
