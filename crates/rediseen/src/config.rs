//! Gateway configuration and startup validation

use serde::{Deserialize, Serialize};
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::Path;
use tracing::info;

use crate::error::ConfigError;
use crate::policy::AccessPolicy;
use crate::store::{RedisConnector, StoreConnector};

/// Raw gateway configuration as supplied by flags, environment or file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Bind host
    pub host: String,
    /// Bind port
    pub port: u16,
    /// `redis://` URI of the backing store
    pub redis_uri: String,
    /// Database exposure specifier
    pub db_exposed: String,
    /// Key pattern; empty when unset
    pub key_pattern_exposed: String,
    /// Expose every key instead of a pattern
    pub key_pattern_expose_all: bool,
    /// Shared secret for X-API-KEY; empty means none
    pub api_key: Option<String>,
    /// Skip the startup ping
    pub test_mode: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: String::from("localhost"),
            port: 8000,
            redis_uri: String::new(),
            db_exposed: String::new(),
            key_pattern_exposed: String::new(),
            key_pattern_expose_all: false,
            api_key: None,
            test_mode: false,
        }
    }
}

/// Validated configuration, ready to serve with.
#[derive(Debug)]
pub struct GatewaySettings {
    /// Resolved listen address
    pub bind_addr: SocketAddr,
    /// Per-request connection factory
    pub connector: RedisConnector,
    /// Database and key exposure
    pub policy: AccessPolicy,
    /// Non-empty shared secret, if any
    pub api_key: Option<String>,
    /// Skip the startup ping
    pub test_mode: bool,
}

impl GatewayConfig {
    /// Loads a `.toml` or `.json` file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::File(format!("{}: {}", path.display(), e)))?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();

        match ext.to_lowercase().as_str() {
            "toml" => toml::from_str(&contents).map_err(|e| ConfigError::File(e.to_string())),
            "json" => serde_json::from_str(&contents).map_err(|e| ConfigError::File(e.to_string())),
            _ => Err(ConfigError::File(format!(
                "unsupported config file extension: {}",
                ext
            ))),
        }
    }

    /// Checks the Redis URI, then the database specifier, then the key
    /// pattern rules, then the bind address.
    pub fn validate(&self) -> Result<GatewaySettings, ConfigError> {
        let connector = RedisConnector::new(&self.redis_uri)?;
        let policy = AccessPolicy::new(
            &self.db_exposed,
            &self.key_pattern_exposed,
            self.key_pattern_expose_all,
        )?;

        let bind = format!("{}:{}", self.host, self.port);
        let bind_addr = bind
            .to_socket_addrs()
            .map_err(|e| ConfigError::InvalidBindAddr(format!("{} ({})", bind, e)))?
            .next()
            .ok_or_else(|| ConfigError::InvalidBindAddr(bind.clone()))?;

        Ok(GatewaySettings {
            bind_addr,
            connector,
            policy,
            api_key: self.api_key.clone().filter(|k| !k.is_empty()),
            test_mode: self.test_mode,
        })
    }
}

impl GatewaySettings {
    /// Pings database 0 once; skipped in test mode.
    pub async fn check_store(&self) -> Result<(), ConfigError> {
        if self.test_mode {
            info!("test mode: skipping initial Redis check");
            return Ok(());
        }
        let mut store = self
            .connector
            .connect(0)
            .await
            .map_err(ConfigError::StoreUnreachable)?;
        store.ping().await.map_err(ConfigError::StoreUnreachable)?;
        info!(redis = %self.connector.addr(), "Redis is reachable");
        Ok(())
    }
}
