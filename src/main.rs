//! ring-history: download overnight Ring doorbell recordings.
//!
//! Pages backwards through each doorbell's event history, keeps events whose
//! local wall-clock time falls inside a nightly window, and saves their
//! recordings. A small checkpoint file lets successive `--resume` runs walk
//! further back in time.

#![warn(clippy::all)]

mod auth;
mod checkpoint;
mod cli;
mod config;
mod download;
mod history;
mod report;
pub mod retry;
mod ring;
mod run;
mod types;
mod window;

use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use auth::endpoints::Endpoints;
use auth::oauth::OAuthClient;
use auth::TokenCacheProvider;

const USER_AGENT: &str = concat!("ring-history/", env!("CARGO_PKG_VERSION"));

fn build_http_client() -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(Duration::from_secs(30))
        .timeout(Duration::from_secs(600))
        .build()
        .context("Failed to build HTTP client")
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(cli.log_level.as_filter())),
        )
        .init();

    let config = config::Config::from_cli(cli)?;
    tracing::debug!(?config, "Starting ring-history");

    let http = build_http_client()?;
    let endpoints = Endpoints::default();

    let provider = TokenCacheProvider::new(
        config.token_cache.clone(),
        OAuthClient::new(http.clone(), endpoints.clone()),
    );
    let session = auth::acquire_session(Box::new(provider))
        .await
        .context("Authentication failed")?;

    if config.auth_only {
        tracing::info!(
            "Authentication completed; token cached at {}",
            config.token_cache.display()
        );
        return Ok(());
    }

    let client = ring::RingClient::new(http, endpoints, session);
    client.register().await;

    let report = run::run(&client, &config).await;
    print!("{}", report.render(&config.zone, &config.window));

    let failed = report.failed_downloads();
    if failed > 0 {
        tracing::warn!(
            "{} recording(s) could not be downloaded; re-run to retry them",
            failed
        );
    }
    Ok(())
}
