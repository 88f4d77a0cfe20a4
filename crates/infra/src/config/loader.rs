//! Configuration loader
//!
//! Loads application configuration from an optional file and environment
//! variables.
//!
//! ## Loading Strategy
//! 1. Start from the file named by `CALNOTE_CONFIG`, or the first file found
//!    by [`probe_config_paths`], or built-in defaults when there is none
//! 2. Apply environment variable overrides on top
//! 3. Supports JSON and TOML formats
//!
//! ## Environment Variables
//! - `CALNOTE_CONFIG`: Explicit config file path (must exist)
//! - `CALNOTE_TOKEN_PATH`: Token file path
//! - `CALNOTE_CREDENTIALS_PATH`: Credentials document path
//! - `CALNOTE_CALLBACK_TIMEOUT_SECS`: Loopback redirect timeout in seconds
//! - `CALNOTE_SHUTDOWN_GRACE_SECS`: Loopback shutdown grace in seconds
//! - `CALNOTE_MANUAL_ATTEMPTS`: Manual entry prompts before giving up
//! - `CALNOTE_OPEN_BROWSER`: Whether to launch a browser (true/false)
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./calnote.toml` or `./calnote.json` (current working directory)
//! 2. `<config dir>/calnote/config.toml` or `config.json`

use std::path::{Path, PathBuf};
use std::str::FromStr;

use calnote_domain::constants::{APP_NAME, TOKEN_FILE_NAME};
use calnote_domain::{CalnoteError, Config, Result};

/// Environment variable naming an explicit config file.
pub const CONFIG_PATH_ENV: &str = "CALNOTE_CONFIG";

/// Load configuration with automatic fallback strategy
///
/// Reads the config file if one is named or found, then applies environment
/// overrides from the process environment.
///
/// # Errors
/// Returns `CalnoteError::Config` if:
/// - `CALNOTE_CONFIG` names a file that does not exist
/// - File format is invalid
/// - An environment override has an invalid value
pub fn load() -> Result<Config> {
    let explicit = std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from);

    let base = match explicit.or_else(probe_config_paths) {
        Some(path) => load_from_file(Some(path))?,
        None => {
            tracing::debug!("No config file found, using defaults");
            Config::default()
        }
    };

    apply_env_overrides(base, |key| std::env::var(key).ok())
}

/// Apply `CALNOTE_*` overrides to `config`
///
/// `lookup` resolves a variable name to its value; [`load`] passes the
/// process environment. Empty values are ignored.
///
/// # Errors
/// Returns `CalnoteError::Config` when a numeric or boolean variable cannot
/// be parsed.
pub fn apply_env_overrides<F>(mut config: Config, lookup: F) -> Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
    let auth = &mut config.auth;

    if let Some(path) = get("CALNOTE_TOKEN_PATH") {
        auth.token_path = Some(PathBuf::from(path));
    }
    if let Some(path) = get("CALNOTE_CREDENTIALS_PATH") {
        auth.credentials_path = Some(PathBuf::from(path));
    }
    if let Some(value) = get("CALNOTE_CALLBACK_TIMEOUT_SECS") {
        auth.callback_timeout_seconds = parse_number("CALNOTE_CALLBACK_TIMEOUT_SECS", &value)?;
    }
    if let Some(value) = get("CALNOTE_SHUTDOWN_GRACE_SECS") {
        auth.shutdown_grace_seconds = parse_number("CALNOTE_SHUTDOWN_GRACE_SECS", &value)?;
    }
    if let Some(value) = get("CALNOTE_MANUAL_ATTEMPTS") {
        auth.manual_attempts = parse_number("CALNOTE_MANUAL_ATTEMPTS", &value)?;
    }
    if let Some(value) = get("CALNOTE_OPEN_BROWSER") {
        auth.open_browser = parse_bool("CALNOTE_OPEN_BROWSER", &value)?;
    }

    if auth.manual_attempts == 0 {
        return Err(CalnoteError::Config("manual_attempts must be at least 1".to_string()));
    }
    if auth.callback_timeout_seconds == 0 {
        return Err(CalnoteError::Config(
            "callback_timeout_seconds must be at least 1".to_string(),
        ));
    }

    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes the standard locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Arguments
/// * `path` - Optional path to config file. If `None`, uses
///   [`probe_config_paths`].
///
/// # Errors
/// Returns `CalnoteError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(CalnoteError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            CalnoteError::Config("No config file found in any of the standard locations".to_string())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| CalnoteError::Config(format!("Failed to read config file: {e}")))?;

    parse_config(&contents, &config_path)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| CalnoteError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| CalnoteError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(CalnoteError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// Probe the standard locations for a configuration file
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        candidates.push(cwd.join(format!("{APP_NAME}.toml")));
        candidates.push(cwd.join(format!("{APP_NAME}.json")));
    }

    if let Some(dir) = default_config_dir() {
        candidates.push(dir.join("config.toml"));
        candidates.push(dir.join("config.json"));
    }

    candidates.into_iter().find(|path| path.is_file())
}

/// Per-user calnote configuration directory (`<config dir>/calnote`)
///
/// Falls back to `~/.calnote` on platforms without a config directory.
#[must_use]
pub fn default_config_dir() -> Option<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join(APP_NAME))
        .or_else(|| dirs::home_dir().map(|home| home.join(format!(".{APP_NAME}"))))
}

/// Resolve where the token file lives
///
/// # Errors
/// Returns `CalnoteError::Config` when no path is configured and the
/// platform has neither a config nor a home directory.
pub fn resolve_token_path(auth: &calnote_domain::AuthConfig) -> Result<PathBuf> {
    if let Some(path) = &auth.token_path {
        return Ok(path.clone());
    }

    default_config_dir().map(|dir| dir.join(TOKEN_FILE_NAME)).ok_or_else(|| {
        CalnoteError::Config(
            "Cannot determine a token location; set CALNOTE_TOKEN_PATH".to_string(),
        )
    })
}

fn parse_number<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse::<T>()
        .map_err(|e| CalnoteError::Config(format!("Invalid value for {key}: {e}")))
}

/// Parse boolean from an environment value
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(CalnoteError::Config(format!("Invalid boolean for {key}: {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_parse_bool_values() {
        for value in ["1", "true", "YES", "on"] {
            assert!(parse_bool("K", value).expect("truthy"), "{value}");
        }
        for value in ["0", "false", "No", "OFF"] {
            assert!(!parse_bool("K", value).expect("falsy"), "{value}");
        }
        assert!(matches!(parse_bool("K", "maybe"), Err(CalnoteError::Config(_))));
    }

    #[test]
    fn test_env_overrides_applied() {
        let lookup = lookup_from(&[
            ("CALNOTE_TOKEN_PATH", "/tmp/calnote/token.json"),
            ("CALNOTE_CALLBACK_TIMEOUT_SECS", "60"),
            ("CALNOTE_MANUAL_ATTEMPTS", "5"),
            ("CALNOTE_OPEN_BROWSER", "false"),
        ]);

        let config = apply_env_overrides(Config::default(), lookup).expect("valid overrides");

        assert_eq!(config.auth.token_path, Some(PathBuf::from("/tmp/calnote/token.json")));
        assert_eq!(config.auth.callback_timeout_seconds, 60);
        assert_eq!(config.auth.manual_attempts, 5);
        assert!(!config.auth.open_browser);
        assert_eq!(config.auth.shutdown_grace_seconds, 5);
    }

    #[test]
    fn test_env_overrides_empty_values_ignored() {
        let lookup = lookup_from(&[("CALNOTE_TOKEN_PATH", ""), ("CALNOTE_MANUAL_ATTEMPTS", " ")]);

        let config = apply_env_overrides(Config::default(), lookup).expect("valid overrides");

        assert!(config.auth.token_path.is_none());
        assert_eq!(config.auth.manual_attempts, 3);
    }

    #[test]
    fn test_env_overrides_invalid_number() {
        let lookup = lookup_from(&[("CALNOTE_CALLBACK_TIMEOUT_SECS", "five minutes")]);

        let err = apply_env_overrides(Config::default(), lookup).expect_err("invalid");

        assert!(
            matches!(&err, CalnoteError::Config(msg) if msg.contains("CALNOTE_CALLBACK_TIMEOUT_SECS")),
            "{err}"
        );
    }

    #[test]
    fn test_zero_manual_attempts_rejected() {
        let lookup = lookup_from(&[("CALNOTE_MANUAL_ATTEMPTS", "0")]);

        assert!(apply_env_overrides(Config::default(), lookup).is_err());
    }

    #[test]
    fn test_parse_config_unsupported_extension() {
        let result = parse_config("", Path::new("calnote.yaml"));
        assert!(matches!(result, Err(CalnoteError::Config(msg)) if msg.contains("yaml")));
    }

    #[test]
    fn test_resolve_token_path_prefers_configured() {
        let auth = calnote_domain::AuthConfig {
            token_path: Some(PathBuf::from("/srv/calnote/token.json")),
            ..Default::default()
        };

        assert_eq!(
            resolve_token_path(&auth).expect("configured"),
            PathBuf::from("/srv/calnote/token.json")
        );
    }

    #[test]
    fn test_resolve_token_path_default_ends_with_file_name() {
        let auth = calnote_domain::AuthConfig::default();

        if let Ok(path) = resolve_token_path(&auth) {
            assert!(path.ends_with(Path::new(APP_NAME).join(TOKEN_FILE_NAME))
                || path.ends_with(Path::new(".calnote").join(TOKEN_FILE_NAME)));
        }
    }
}
