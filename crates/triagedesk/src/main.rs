//! `triagedesk` - command-line client for the email triage dashboard
//!
//! Lists and watches ingested emails, shows their AI analysis, and edits and
//! sends acknowledgment drafts through the dashboard backend.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod cli;
mod commands;
mod notify;
mod render;
mod state;

use anyhow::Context;
use clap::Parser;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use triagedesk_core::Config;

use cli::Cli;
use commands::App;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries command output.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "triagedesk=info,triagedesk_core=info,triagedesk_api=warn".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = Config::from_env().context("loading configuration")?;
    if let Some(url) = cli.api_url {
        config = config.with_api_base_url(url);
        config.validate().context("invalid --api-url")?;
    }
    debug!(api = %config.api_base_url, "Starting triagedesk");

    App::new(config)?.run(cli.command).await
}
