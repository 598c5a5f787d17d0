//! Application container for tie-lsp

use std::sync::Arc;

use crate::cli::OutputContext;
use crate::config;
use crate::infra::host::{HostApi, RpcHost, StaticHost};
use crate::infra::socket::WebSocketFactory;
use crate::models::config::{BridgeConfig, HostMode};
use crate::services::bridge::{BridgeOptions, LspBridge};
use crate::services::config::{ConfigService, DefaultConfigService};

pub struct App {
    pub(crate) output: OutputContext,
    pub(crate) config_service: Arc<dyn ConfigService>,
    pub(crate) config: BridgeConfig,
}

impl App {
    pub async fn new() -> anyhow::Result<Self> {
        let root = std::env::current_dir()?;

        tracing::debug!("Initializing tie-lsp at {:?}", root);

        let output = OutputContext::new(root.clone());
        let config_service = Arc::new(DefaultConfigService::new(&root));
        let config = match config_service.load(false).await {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Using default configuration: {}", e);
                BridgeConfig::default()
            }
        };

        config::init(&config);

        Ok(Self {
            output,
            config_service,
            config,
        })
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Host named by the configuration; connects for RPC hosts
    pub async fn host(&self) -> anyhow::Result<Arc<dyn HostApi>> {
        let host: Arc<dyn HostApi> = match self.config.host.mode {
            HostMode::Rpc => Arc::new(RpcHost::connect(&self.config.host.address).await?),
            HostMode::Static => Arc::new(StaticHost::from_config(&self.config)),
        };
        tracing::debug!("Using {:?} host", self.config.host.mode);
        Ok(host)
    }

    pub async fn bridge(&self) -> anyhow::Result<LspBridge> {
        let host = self.host().await?;
        let options = BridgeOptions {
            capabilities: self.config.capabilities.clone(),
            ..BridgeOptions::default()
        };
        Ok(LspBridge::new(host, Arc::new(WebSocketFactory), options))
    }
}
