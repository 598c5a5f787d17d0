//! Configuration service
//!
//! The project file is layered over the global file key by key; arrays such
//! as `languages` are replaced, not appended.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::ConfigError;
use crate::models::config::BridgeConfig;

const APP_DIR: &str = "tie-lsp";
const CONFIG_FILE: &str = "config.toml";

#[async_trait]
pub trait ConfigService: Send + Sync {
    async fn load(&self, global_only: bool) -> Result<BridgeConfig, ConfigError>;
    fn config_path(&self, global: bool) -> PathBuf;
    async fn init(&self, global: bool, force: bool) -> Result<PathBuf, ConfigError>;
}

pub struct DefaultConfigService {
    root: PathBuf,
    global_path: PathBuf,
}

impl DefaultConfigService {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            global_path: Self::global_config_path(),
        }
    }

    pub fn with_global_path(mut self, path: PathBuf) -> Self {
        self.global_path = path;
        self
    }

    fn global_config_path() -> PathBuf {
        // XDG standard: ~/.config/tie-lsp/config.toml
        std::env::var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .ok()
            .or_else(|| dirs::home_dir().map(|h| h.join(".config")))
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
            .join(CONFIG_FILE)
    }

    fn project_config_path(&self) -> PathBuf {
        self.root.join(format!(".{APP_DIR}")).join(CONFIG_FILE)
    }

    async fn load_table(path: &Path) -> Result<toml::Table, ConfigError> {
        if !path.exists() {
            return Ok(toml::Table::new());
        }
        let content = tokio::fs::read_to_string(path).await?;
        content
            .parse::<toml::Table>()
            .map_err(|e| ConfigError::Parse(format!("{}: {}", path.display(), e)))
    }

    async fn write_default_config(path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let config = BridgeConfig::default();
        let content =
            toml::to_string_pretty(&config).map_err(|e| ConfigError::Parse(e.to_string()))?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }
}

#[async_trait]
impl ConfigService for DefaultConfigService {
    async fn load(&self, global_only: bool) -> Result<BridgeConfig, ConfigError> {
        let mut table = Self::load_table(&self.global_path).await?;
        if !global_only {
            let project = Self::load_table(&self.project_config_path()).await?;
            merge_tables(&mut table, project);
        }

        let config: BridgeConfig = toml::Value::Table(table)
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::Parse(e.to_string()))?;

        if global_only {
            return Ok(config);
        }
        apply_env_overrides(config, |key| std::env::var(key).ok())
    }

    fn config_path(&self, global: bool) -> PathBuf {
        if global {
            self.global_path.clone()
        } else {
            self.project_config_path()
        }
    }

    async fn init(&self, global: bool, force: bool) -> Result<PathBuf, ConfigError> {
        let path = self.config_path(global);

        if path.exists() && !force {
            return Err(ConfigError::InvalidValue {
                key: "config".to_string(),
                message: format!(
                    "Config already exists: {}. Use --force to overwrite.",
                    path.display()
                ),
            });
        }

        Self::write_default_config(&path).await?;
        Ok(path)
    }
}

fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(nested)) => {
                merge_tables(existing, nested);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

fn apply_env_overrides<F>(mut config: BridgeConfig, var: F) -> Result<BridgeConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(val) = var("TIE_LSP_HOST_ADDR") {
        config.host.address = val;
    }
    if let Some(val) = var("TIE_LSP_ENDPOINT_HOST") {
        config.endpoint.host = val;
    }
    if let Some(val) = var("TIE_LSP_READY_TIMEOUT") {
        config.host.ready_timeout_secs = Some(parse_secs("TIE_LSP_READY_TIMEOUT", &val)?);
    }
    if let Some(val) = var("TIE_LSP_DISCOVERY_TIMEOUT") {
        config.host.discovery_timeout_secs = Some(parse_secs("TIE_LSP_DISCOVERY_TIMEOUT", &val)?);
    }
    Ok(config)
}

fn parse_secs(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("expected whole seconds, got '{value}'"),
    })
}
