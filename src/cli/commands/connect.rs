//! Connect command implementation
//!
//! Run the bridge against the configured host and report the published
//! provider.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Args;
use futures::future::join_all;
use serde::Serialize;

use crate::app::App;
use crate::services::bridge::{InitPhase, LspBridge};
use crate::services::provider::{LanguageProvider, ProviderSummary};

#[derive(Args, Debug)]
pub struct ConnectArgs {
    /// Give up waiting for the provider after this many seconds
    #[arg(short, long)]
    pub timeout: Option<u64>,

    /// Wait for every language server handshake before reporting
    #[arg(long)]
    pub settle: bool,
}

#[derive(Serialize)]
struct ConnectResponse {
    phase: InitPhase,
    #[serde(flatten)]
    summary: ProviderSummary,
}

pub async fn execute(args: ConnectArgs, app: &App) -> Result<()> {
    let ctx = &app.output;
    let bridge = app.bridge().await?;
    bridge.start();

    let provider = wait_for_provider(&bridge, args.timeout.map(Duration::from_secs)).await?;

    if args.settle {
        join_all(
            provider
                .connections()
                .iter()
                .map(|connection| connection.socket.settled()),
        )
        .await;
    }

    ctx.print_success_flat(ConnectResponse {
        phase: bridge.phase(),
        summary: provider.summary(),
    });
    Ok(())
}

/// Provider, or the reason initialization failed, whichever comes first
async fn wait_for_provider(bridge: &LspBridge, timeout: Option<Duration>) -> Result<Arc<LanguageProvider>> {
    let published = async {
        match timeout {
            Some(limit) => bridge
                .provider_within(limit)
                .await
                .map_err(anyhow::Error::from),
            None => Ok(bridge.provider().await),
        }
    };

    tokio::select! {
        provider = published => provider,
        reason = bridge.failure() => Err(anyhow::anyhow!(reason)),
    }
}
