//! CLI module for tie-lsp
//!
//! Provides command-line interface using clap derive macros.

pub mod commands;
pub mod output;

pub use output::OutputContext;

use clap::{Parser, Subcommand};

use commands::{config::ConfigArgs, connect::ConnectArgs, plan::PlanArgs};

const LONG_ABOUT: &str = r#"
tie-lsp - Language server provider bridge for the TIE editor

Waits for the host to come up, asks it which languages exist and where the
language-server endpoint listens, then opens one WebSocket per language at
ws://<host>:<port>/lsp/<id> and publishes a single language provider.

QUICK START:
  1. Write a config:          tie-lsp config init
  2. Preview connections:     tie-lsp plan --port 9000
  3. Connect to the host:     tie-lsp connect --timeout 30

HOST MODES:
  rpc      JSON-RPC host process over TCP ([host].address)
  static   languages and port from the config file itself
"#;

/// tie-lsp - Language server provider bridge
#[derive(Parser, Debug)]
#[command(name = "tie-lsp")]
#[command(author, version, about, long_about = LONG_ABOUT)]
#[command(propagate_version = true)]
#[command(after_help = "Use 'tie-lsp <COMMAND> --help' for more information about a command.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbose output (show debug info)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the bridge and report the published provider
    Connect(ConnectArgs),

    /// Show the connections the configured languages would open
    Plan(PlanArgs),

    /// Configuration management
    Config(ConfigArgs),
}
