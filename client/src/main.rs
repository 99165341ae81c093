// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Tessera Wallet Client
//!
//! Entry point for the `tessera` binary. Parses CLI arguments, initializes
//! logging, resolves the client configuration, and dispatches to a
//! subcommand:
//!
//! - `keygen`  — generate a wallet key as an encrypted key file
//! - `sign`    — build and sign a transaction
//! - `propose` — build and sign an oracle proposal
//! - `submit`  — send signed transactions to the announcer
//! - `check`   — find a transaction's block through the repeater

mod cli;
mod commands;
mod logging;

use anyhow::{Context, Result};
use clap::Parser;

use tessera_protocol::config::ClientConfig;

use cli::{Commands, NetworkArgs, TesseraCli};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = TesseraCli::parse();
    logging::init_logging(logging::DEFAULT_FILTER, cli.log_format);

    match &cli.command {
        Commands::Keygen(args) => commands::keygen(args),
        Commands::Sign(args) => commands::sign(args).map(|_| ()),
        Commands::Propose(args) => commands::propose(args),
        Commands::Submit(args) => {
            let config = resolve_config(&cli.network)?;
            commands::submit(args, &config).await
        }
        Commands::Check(args) => {
            let config = resolve_config(&cli.network)?;
            commands::check(args, &config).await
        }
    }
}

/// Config file (or defaults), then flag and environment overrides.
fn resolve_config(network: &NetworkArgs) -> Result<ClientConfig> {
    let base = match &network.config {
        Some(path) => ClientConfig::from_json_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => ClientConfig::default(),
    };
    let config = network.apply(base);
    config.validate().context("invalid client configuration")?;

    tracing::debug!(
        announcer = %config.announcer_endpoint,
        repeater = %config.repeater_endpoint,
        shard = %config.shard,
        timeout_ms = config.request_timeout_ms,
        "client configuration resolved"
    );
    Ok(config)
}
