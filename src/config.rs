//! Global Configuration Singleton

use std::sync::OnceLock;
use std::time::Duration;

use crate::models::config::BridgeConfig;

static CONFIG: OnceLock<RuntimeConfig> = OnceLock::new();

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub endpoint_host: String,
    pub path_prefix: String,
    /// `None` waits for the host indefinitely
    pub ready_timeout: Option<Duration>,
    pub discovery_timeout: Option<Duration>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::from(&BridgeConfig::default())
    }
}

impl From<&BridgeConfig> for RuntimeConfig {
    fn from(config: &BridgeConfig) -> Self {
        Self {
            endpoint_host: config.endpoint.host.clone(),
            path_prefix: config.endpoint.path_prefix.clone(),
            ready_timeout: config.host.ready_timeout_secs.map(Duration::from_secs),
            discovery_timeout: config.host.discovery_timeout_secs.map(Duration::from_secs),
        }
    }
}

/// Install the runtime values; only the first call has any effect
pub fn init(config: &BridgeConfig) {
    let _ = CONFIG.set(RuntimeConfig::from(config));
}

pub fn endpoint_host() -> String {
    config().endpoint_host
}

pub fn path_prefix() -> String {
    config().path_prefix
}

pub fn ready_timeout() -> Option<Duration> {
    config().ready_timeout
}

pub fn discovery_timeout() -> Option<Duration> {
    config().discovery_timeout
}

fn config() -> RuntimeConfig {
    CONFIG.get().cloned().unwrap_or_default()
}
