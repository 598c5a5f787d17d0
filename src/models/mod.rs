//! Data models for the bridge
//!
//! Contains core type definitions used throughout the application.

pub mod capability;
pub mod config;
pub mod language;

// Re-export commonly used types
pub use capability::{CapabilityOptions, CompletionOptions, TriggerCharacters};
pub use config::{BridgeConfig, EndpointSettings, HostMode, HostSettings};
pub use language::{LanguageDescriptor, ModePattern};
