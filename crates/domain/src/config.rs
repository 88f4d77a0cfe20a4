//! Configuration management

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_CALLBACK_TIMEOUT_SECS, DEFAULT_MANUAL_ATTEMPTS, DEFAULT_SHUTDOWN_GRACE_SECS,
};

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub auth: AuthConfig,
}

/// Authorization flow configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Where the token is persisted. `None` uses the platform config dir.
    pub token_path: Option<PathBuf>,
    /// Credentials document checked before the standard search path.
    pub credentials_path: Option<PathBuf>,
    /// How long the loopback server waits for the provider redirect.
    pub callback_timeout_seconds: u64,
    /// Grace period for the loopback server to stop.
    pub shutdown_grace_seconds: u64,
    /// How many times the operator is prompted before manual entry gives up.
    pub manual_attempts: u32,
    /// Whether to try launching the default browser.
    pub open_browser: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_path: None,
            credentials_path: None,
            callback_timeout_seconds: DEFAULT_CALLBACK_TIMEOUT_SECS,
            shutdown_grace_seconds: DEFAULT_SHUTDOWN_GRACE_SECS,
            manual_attempts: DEFAULT_MANUAL_ATTEMPTS,
            open_browser: true,
        }
    }
}
