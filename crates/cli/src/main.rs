//! calnote-auth
//!
//! Makes sure a usable Google token is on disk for the exporter, running the
//! interactive authorization flow when there is none.
//!
//! Configuration comes from the environment (a `.env` file is honored) and
//! an optional `calnote.toml`; see `calnote_infra::config`. Set
//! `CALNOTE_FORCE_REAUTH=1` to discard the stored token first.

use std::io::IsTerminal;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use calnote_common::auth::{OAuthTokenClient, TokenStore};
use calnote_domain::CalnoteError;
use calnote_infra::auth::{
    AuthorizationCoordinator, CoordinatorSettings, CredentialLoader, FileTokenStore,
};
use calnote_infra::config;
use tracing::{error, info, warn};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

const FORCE_REAUTH_ENV: &str = "CALNOTE_FORCE_REAUTH";

#[tokio::main]
async fn main() -> ExitCode {
    register_logger();

    match dotenvy::dotenv() {
        Ok(path) => info!(path = %path.display(), "Loaded .env"),
        Err(e) if e.not_found() => {}
        Err(e) => warn!(error = %e, "Could not load .env file"),
    }

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %format!("{err:#}"), "Authorization failed");
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr; stdout is reserved for operator prompts.
fn register_logger() {
    let filter =
        EnvFilter::builder().with_default_directive(LevelFilter::INFO.into()).from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .init();
}

async fn run() -> anyhow::Result<()> {
    let config = config::load().context("loading configuration")?;

    let token_path = config::resolve_token_path(&config.auth)?;
    let store = Arc::new(FileTokenStore::new(token_path));

    if force_reauth() {
        info!(location = %store.location(), "Discarding stored token");
        store.clear().await.map_err(CalnoteError::from)?;
    }

    let credentials = CredentialLoader::from_config(&config.auth)
        .load()
        .map_err(CalnoteError::from)
        .context("loading OAuth client credentials")?;
    let exchanger = Arc::new(OAuthTokenClient::new(credentials.clone()));

    let coordinator = AuthorizationCoordinator::new(credentials, store, exchanger)
        .with_settings(CoordinatorSettings::from(&config.auth));

    let token = coordinator.acquire().await.map_err(CalnoteError::from)?;

    info!(
        has_refresh_token = !token.refresh_token.is_empty(),
        expired = token.is_expired(),
        "Token ready"
    );
    Ok(())
}

fn force_reauth() -> bool {
    std::env::var(FORCE_REAUTH_ENV)
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}
