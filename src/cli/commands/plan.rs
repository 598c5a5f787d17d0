//! Plan command implementation
//!
//! Dry run: show the connections the configured languages would produce
//! without opening any socket.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use crate::app::App;
use crate::services::connections::{Endpoint, PlannedConnection, plan_connections};

#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Endpoint port (defaults to [endpoint].port)
    #[arg(short, long)]
    pub port: Option<u16>,
}

#[derive(Serialize)]
struct PlanResponse {
    port: u16,
    connections: Vec<PlannedConnection>,
    skipped: Vec<String>,
    functionality: serde_json::Value,
}

pub async fn execute(args: PlanArgs, app: &App) -> Result<()> {
    let ctx = &app.output;
    let config = app.config();

    let port = args
        .port
        .or(config.endpoint.port)
        .context("No endpoint port: pass --port or set [endpoint].port")?;
    let endpoint = Endpoint::new(&config.endpoint.host, port, &config.endpoint.path_prefix)?;

    let response = PlanResponse {
        port,
        connections: plan_connections(&config.languages, &endpoint),
        skipped: config
            .languages
            .iter()
            .filter(|language| !language.has_lsp())
            .map(|language| language.id.clone())
            .collect(),
        functionality: config.capabilities.functionality(),
    };
    ctx.print_success_flat(response);
    Ok(())
}
