//! Configuration model for the bridge

use serde::{Deserialize, Serialize};

use super::capability::CapabilityOptions;
use super::language::LanguageDescriptor;

/// Bridge configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    #[serde(default)]
    pub host: HostSettings,

    #[serde(default)]
    pub endpoint: EndpointSettings,

    #[serde(default)]
    pub capabilities: CapabilityOptions,

    /// Languages served by the static host
    #[serde(default = "defaults::languages")]
    pub languages: Vec<LanguageDescriptor>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            host: HostSettings::default(),
            endpoint: EndpointSettings::default(),
            capabilities: CapabilityOptions::default(),
            languages: defaults::languages(),
        }
    }
}

/// How the host API is reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum HostMode {
    /// JSON-RPC host process over TCP
    #[default]
    Rpc,
    /// Languages and port taken from this configuration
    Static,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostSettings {
    #[serde(default)]
    pub mode: HostMode,

    #[serde(default = "defaults::host_address")]
    pub address: String,

    /// Unset means wait for the host indefinitely
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ready_timeout_secs: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discovery_timeout_secs: Option<u64>,
}

impl Default for HostSettings {
    fn default() -> Self {
        Self {
            mode: HostMode::default(),
            address: defaults::host_address(),
            ready_timeout_secs: None,
            discovery_timeout_secs: None,
        }
    }
}

/// Where the multiplexed language-server endpoint listens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointSettings {
    #[serde(default = "defaults::endpoint_host")]
    pub host: String,

    #[serde(default = "defaults::path_prefix")]
    pub path_prefix: String,

    /// Only consulted by the static host; RPC hosts report their own port
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

impl Default for EndpointSettings {
    fn default() -> Self {
        Self {
            host: defaults::endpoint_host(),
            path_prefix: defaults::path_prefix(),
            port: None,
        }
    }
}

mod defaults {
    use crate::models::language::LanguageDescriptor;

    pub fn host_address() -> String {
        "127.0.0.1:7878".to_string()
    }
    pub fn endpoint_host() -> String {
        "127.0.0.1".to_string()
    }
    pub fn path_prefix() -> String {
        "/lsp".to_string()
    }

    pub fn languages() -> Vec<LanguageDescriptor> {
        vec![
            LanguageDescriptor::new("python")
                .with_display("Python Source")
                .with_lsp(["pylsp"])
                .with_suffixes([".py"])
                .with_aliases(["py", "python", "Python", "python3", "Python3"]),
            LanguageDescriptor::new("cpp")
                .with_display("C++ Source")
                .with_lsp(["clangd"])
                .with_suffixes([".cpp", ".cc", ".cxx", ".c++", ".C"])
                .with_aliases(["cpp", "Cpp", "CPP", "c++", "C++", "c_cpp"]),
        ]
    }
}
