//! Command implementations for tie-lsp
//!
//! Each command is implemented in its own module.

pub mod config;
pub mod connect;
pub mod plan;
