//! The assembled language provider
//!
//! Holds every connection descriptor together with the editor feature set
//! and routes editor requests to the right language server.

use serde::Serialize;
use serde_json::Value;
use url::Url;

use super::connections::{ConnectionDescriptor, TransportKind};
use crate::error::ProviderError;
use crate::infra::socket::SocketState;
use crate::models::capability::CapabilityOptions;
use crate::models::language::ModePattern;

#[derive(Debug)]
pub struct LanguageProvider {
    connections: Vec<ConnectionDescriptor>,
    options: CapabilityOptions,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConnectionSummary {
    pub language: String,
    pub mode_pattern: ModePattern,
    pub transport: TransportKind,
    pub url: Url,
    pub socket: SocketState,
    pub client_loaded: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProviderSummary {
    pub connections: Vec<ConnectionSummary>,
    pub functionality: Value,
}

impl LanguageProvider {
    /// Compose descriptors and options; order and count are preserved
    pub fn assemble(connections: Vec<ConnectionDescriptor>, options: CapabilityOptions) -> Self {
        tracing::debug!("Assembling provider with {} connections", connections.len());
        Self {
            connections,
            options,
        }
    }

    pub fn connections(&self) -> &[ConnectionDescriptor] {
        &self.connections
    }

    pub fn options(&self) -> &CapabilityOptions {
        &self.options
    }

    /// Editor-facing feature object
    pub fn functionality(&self) -> Value {
        self.options.functionality()
    }

    /// First connection whose mode pattern names `mode`
    pub fn connection_for(&self, mode: &str) -> Option<&ConnectionDescriptor> {
        self.connections
            .iter()
            .find(|connection| connection.mode_pattern.matches(mode))
    }

    pub async fn hover(&self, mode: &str, params: Value) -> Result<Value, ProviderError> {
        if !self.options.hover {
            return Err(ProviderError::CapabilityDisabled("hover"));
        }
        self.forward(mode, "textDocument/hover", params).await
    }

    pub async fn completion(&self, mode: &str, params: Value) -> Result<Value, ProviderError> {
        if !self.options.completion.enabled {
            return Err(ProviderError::CapabilityDisabled("completion"));
        }
        self.forward(mode, "textDocument/completion", params).await
    }

    pub async fn document_highlights(&self, mode: &str, params: Value) -> Result<Value, ProviderError> {
        if !self.options.document_highlights {
            return Err(ProviderError::CapabilityDisabled("documentHighlights"));
        }
        self.forward(mode, "textDocument/documentHighlight", params)
            .await
    }

    async fn forward(&self, mode: &str, method: &str, params: Value) -> Result<Value, ProviderError> {
        let connection = self
            .connection_for(mode)
            .ok_or_else(|| ProviderError::NoConnection(mode.to_string()))?;
        let client = connection.client()?;
        Ok(client.request(method, Some(params)).await?)
    }

    pub fn summary(&self) -> ProviderSummary {
        ProviderSummary {
            connections: self
                .connections
                .iter()
                .map(|connection| ConnectionSummary {
                    language: connection.language().to_string(),
                    mode_pattern: connection.mode_pattern.clone(),
                    transport: connection.transport,
                    url: connection.socket.url().clone(),
                    socket: connection.socket.state(),
                    client_loaded: connection.loader.is_loaded(),
                })
                .collect(),
            functionality: self.functionality(),
        }
    }
}
