//! Language and endpoint discovery against the host

use crate::error::DiscoveryError;
use crate::infra::host::HostApi;
use crate::models::language::LanguageDescriptor;

/// Snapshot of everything the host told us during initialization
#[derive(Debug, Clone)]
pub struct Discovery {
    pub languages: Vec<LanguageDescriptor>,
    pub port: u16,
}

pub async fn discover_languages(host: &dyn HostApi) -> Result<Vec<LanguageDescriptor>, DiscoveryError> {
    host.get_langs().await.map_err(DiscoveryError::Languages)
}

pub async fn discover_endpoint_port(host: &dyn HostApi) -> Result<u16, DiscoveryError> {
    host.get_port().await.map_err(DiscoveryError::Port)
}

/// Issue both discovery calls concurrently; either failure aborts
pub async fn discover(host: &dyn HostApi) -> Result<Discovery, DiscoveryError> {
    let (languages, port) =
        tokio::try_join!(discover_languages(host), discover_endpoint_port(host)).inspect_err(|e| {
            tracing::error!("{}", e);
        })?;

    tracing::debug!(
        "Discovered {} languages, language server endpoint on port {}",
        languages.len(),
        port
    );
    Ok(Discovery { languages, port })
}
