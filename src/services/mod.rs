//! Service layer for the bridge

pub mod bridge;
pub mod config;
pub mod connections;
pub mod discovery;
pub mod provider;
pub mod registry;

pub use bridge::{BridgeOptions, InitPhase, LspBridge};
pub use config::{ConfigService, DefaultConfigService};
pub use connections::{ConnectionDescriptor, Endpoint, PlannedConnection, TransportKind};
pub use provider::{LanguageProvider, ProviderSummary};
pub use registry::ProviderRegistry;
