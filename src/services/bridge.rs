//! Bridge lifecycle
//!
//! Waits for the host, discovers languages and the endpoint port, opens one
//! connection per language and publishes the assembled provider. Runs at
//! most once per bridge. A failed initialization publishes nothing, so
//! pending provider requests stay pending.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;

use super::connections::{Endpoint, build_descriptors};
use super::discovery::discover;
use super::provider::LanguageProvider;
use super::registry::ProviderRegistry;
use crate::error::{BridgeResult, DiscoveryError, HostError, RegistryError};
use crate::infra::gate::ReadinessGate;
use crate::infra::host::HostApi;
use crate::infra::socket::SocketFactory;
use crate::models::capability::CapabilityOptions;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", content = "reason", rename_all = "snake_case")]
pub enum InitPhase {
    WaitingForHost,
    Discovering,
    Connecting,
    Published,
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct BridgeOptions {
    pub capabilities: CapabilityOptions,
    pub endpoint_host: String,
    pub path_prefix: String,
    pub ready_timeout: Option<Duration>,
    pub discovery_timeout: Option<Duration>,
}

impl Default for BridgeOptions {
    fn default() -> Self {
        Self {
            capabilities: CapabilityOptions::default(),
            endpoint_host: crate::config::endpoint_host(),
            path_prefix: crate::config::path_prefix(),
            ready_timeout: crate::config::ready_timeout(),
            discovery_timeout: crate::config::discovery_timeout(),
        }
    }
}

struct BridgeInner {
    host: Arc<dyn HostApi>,
    sockets: Arc<dyn SocketFactory>,
    options: BridgeOptions,
    gate: ReadinessGate,
    registry: ProviderRegistry<LanguageProvider>,
    phase: watch::Sender<InitPhase>,
}

pub struct LspBridge {
    inner: Arc<BridgeInner>,
    started: AtomicBool,
}

impl LspBridge {
    pub fn new(host: Arc<dyn HostApi>, sockets: Arc<dyn SocketFactory>, options: BridgeOptions) -> Self {
        let (phase, _) = watch::channel(InitPhase::WaitingForHost);
        Self {
            inner: Arc::new(BridgeInner {
                host,
                sockets,
                options,
                gate: ReadinessGate::new(),
                registry: ProviderRegistry::new(),
                phase,
            }),
            started: AtomicBool::new(false),
        }
    }

    /// Spawn initialization; returns `false` if it was already started
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&self) -> bool {
        if self.started.swap(true, Ordering::AcqRel) {
            tracing::debug!("Bridge already started");
            return false;
        }
        tokio::spawn(Arc::clone(&self.inner).run());
        true
    }

    /// Resolves with the provider once published; never resolves otherwise
    pub fn provider(&self) -> impl Future<Output = Arc<LanguageProvider>> + Send + 'static {
        self.inner.registry.request()
    }

    pub async fn provider_within(&self, timeout: Duration) -> Result<Arc<LanguageProvider>, RegistryError> {
        self.inner.registry.request_within(timeout).await
    }

    pub fn published(&self) -> Option<Arc<LanguageProvider>> {
        self.inner.registry.get()
    }

    pub fn phase(&self) -> InitPhase {
        self.inner.phase.borrow().clone()
    }

    pub fn watch_phase(&self) -> watch::Receiver<InitPhase> {
        self.inner.phase.subscribe()
    }

    /// Resolves with the reason if initialization fails; pends otherwise
    pub async fn failure(&self) -> String {
        let mut phases = self.watch_phase();
        loop {
            if let InitPhase::Failed(reason) = &*phases.borrow_and_update() {
                return reason.clone();
            }
            if phases.changed().await.is_err() {
                return std::future::pending().await;
            }
        }
    }

    pub fn is_host_ready(&self) -> bool {
        self.inner.gate.is_open()
    }

    pub async fn wait_until_host_ready(&self) {
        self.inner.gate.wait().await
    }
}

impl BridgeInner {
    async fn run(self: Arc<Self>) {
        if let Err(e) = self.initialize().await {
            tracing::error!("Language provider initialization failed: {}", e);
            self.phase.send_replace(InitPhase::Failed(e.to_string()));
        }
    }

    fn set_phase(&self, phase: InitPhase) {
        tracing::debug!("Bridge phase: {:?}", phase);
        self.phase.send_replace(phase);
    }

    async fn initialize(&self) -> BridgeResult<()> {
        self.set_phase(InitPhase::WaitingForHost);
        let armed = self.gate.arm(self.host.as_ref());
        match self.options.ready_timeout {
            Some(limit) => tokio::time::timeout(limit, armed)
                .await
                .map_err(|_| HostError::Unavailable(limit))??,
            None => armed.await?,
        }

        self.set_phase(InitPhase::Discovering);
        let discovering = discover(self.host.as_ref());
        let discovery = match self.options.discovery_timeout {
            Some(limit) => tokio::time::timeout(limit, discovering)
                .await
                .map_err(|_| DiscoveryError::Timeout(limit))??,
            None => discovering.await?,
        };

        self.set_phase(InitPhase::Connecting);
        let endpoint = Endpoint::new(
            &self.options.endpoint_host,
            discovery.port,
            &self.options.path_prefix,
        )?;
        let descriptors = build_descriptors(&discovery.languages, &endpoint, self.sockets.as_ref());
        let count = descriptors.len();
        let provider = LanguageProvider::assemble(descriptors, self.options.capabilities.clone());

        self.registry.publish(provider)?;
        self.set_phase(InitPhase::Published);
        tracing::info!("Language provider published with {} connections", count);
        Ok(())
    }
}
