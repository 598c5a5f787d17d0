//! tie-lsp - Language server provider bridge
//!
//! Publishes a single language provider for the TIE editor once the host is
//! ready: one WebSocket connection per language with a language server,
//! routed by document mode.

pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod infra;
pub mod models;
pub mod services;

#[cfg(test)]
mod testing;

pub use error::{BridgeError, BridgeResult};
