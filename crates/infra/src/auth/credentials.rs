//! Client credentials discovery
//!
//! Locates the provider's OAuth client document on a fixed search path and
//! turns it into [`Credentials`]. The document is the JSON file the Google
//! Cloud console downloads: a top-level `installed` (desktop app) or `web`
//! object holding the client id, secret, endpoints and redirect URIs.

use std::path::{Path, PathBuf};

use calnote_common::auth::{AuthError, Credentials};
use calnote_domain::constants::{APP_NAME, CREDENTIALS_FILE_NAME};
use calnote_domain::AuthConfig;
use serde::Deserialize;
use tracing::{debug, info};

#[derive(Debug, Deserialize)]
struct ClientDocument {
    installed: Option<ClientSection>,
    web: Option<ClientSection>,
}

#[derive(Debug, Deserialize)]
struct ClientSection {
    #[serde(default)]
    client_id: String,
    #[serde(default)]
    client_secret: String,
    #[serde(default)]
    auth_uri: String,
    #[serde(default)]
    token_uri: String,
    #[serde(default)]
    redirect_uris: Vec<String>,
}

/// Finds and parses the OAuth client document
#[derive(Debug, Clone)]
pub struct CredentialLoader {
    candidates: Vec<PathBuf>,
}

impl CredentialLoader {
    /// Loader that checks exactly `candidates`, in order.
    #[must_use]
    pub const fn new(candidates: Vec<PathBuf>) -> Self {
        Self { candidates }
    }

    /// Loader over the standard search path, led by the configured override.
    #[must_use]
    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(standard_candidates(config.credentials_path.as_deref()))
    }

    /// Paths checked by [`load`](Self::load), in order
    #[must_use]
    pub fn candidates(&self) -> &[PathBuf] {
        &self.candidates
    }

    /// First candidate that exists as a file
    #[must_use]
    pub fn locate(&self) -> Option<&Path> {
        self.candidates.iter().map(PathBuf::as_path).find(|path| path.is_file())
    }

    /// Load credentials from the first existing candidate.
    ///
    /// Later candidates are not consulted once a file is found, even when
    /// that file fails to parse.
    ///
    /// # Errors
    /// - [`AuthError::CredentialsNotFound`] when no candidate exists
    /// - [`AuthError::CredentialsParse`] when the file is unreadable or
    ///   malformed
    pub fn load(&self) -> Result<Credentials, AuthError> {
        let Some(path) = self.locate() else {
            let searched = self
                .candidates
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", ");
            return Err(AuthError::CredentialsNotFound { searched });
        };

        info!(path = %path.display(), "Loading OAuth client credentials");

        let contents = std::fs::read_to_string(path).map_err(|e| AuthError::CredentialsParse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        parse_credentials(&contents, path)
    }
}

/// Standard credential search path
///
/// 1. `explicit`, when given
/// 2. `./credentials.json`
/// 3. `<config dir>/calnote/credentials.json`
/// 4. `~/.calnote/credentials.json`
#[must_use]
pub fn standard_candidates(explicit: Option<&Path>) -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    if let Some(path) = explicit {
        candidates.push(path.to_path_buf());
    }
    candidates.push(PathBuf::from(CREDENTIALS_FILE_NAME));
    if let Some(dir) = dirs::config_dir() {
        candidates.push(dir.join(APP_NAME).join(CREDENTIALS_FILE_NAME));
    }
    if let Some(home) = dirs::home_dir() {
        candidates.push(home.join(format!(".{APP_NAME}")).join(CREDENTIALS_FILE_NAME));
    }

    candidates
}

/// Parse a client document; `path` is only used for error messages.
///
/// # Errors
/// Returns [`AuthError::CredentialsParse`] when the JSON is invalid, has
/// neither an `installed` nor a `web` section, or lacks the client id or an
/// endpoint.
pub fn parse_credentials(contents: &str, path: &Path) -> Result<Credentials, AuthError> {
    let parse_error = |reason: String| AuthError::CredentialsParse { path: path.to_path_buf(), reason };

    let document: ClientDocument =
        serde_json::from_str(contents).map_err(|e| parse_error(e.to_string()))?;

    let (kind, section) = match (document.installed, document.web) {
        (Some(section), _) => ("installed", section),
        (None, Some(section)) => ("web", section),
        (None, None) => {
            return Err(parse_error("expected an \"installed\" or \"web\" client".to_string()));
        }
    };

    for (field, value) in [
        ("client_id", &section.client_id),
        ("auth_uri", &section.auth_uri),
        ("token_uri", &section.token_uri),
    ] {
        if value.trim().is_empty() {
            return Err(parse_error(format!("{kind} client is missing {field}")));
        }
    }

    debug!(kind, redirect_uris = section.redirect_uris.len(), "Parsed client document");

    Ok(Credentials::new(
        section.client_id,
        section.client_secret,
        section.auth_uri,
        section.token_uri,
        section.redirect_uris,
    ))
}

#[cfg(test)]
mod tests {
    use calnote_domain::constants::REQUIRED_SCOPES;
    use tempfile::TempDir;

    use super::*;

    const INSTALLED: &str = r#"{
        "installed": {
            "client_id": "1234.apps.googleusercontent.com",
            "project_id": "calnote-test",
            "auth_uri": "https://accounts.google.com/o/oauth2/auth",
            "token_uri": "https://oauth2.googleapis.com/token",
            "auth_provider_x509_cert_url": "https://www.googleapis.com/oauth2/v1/certs",
            "client_secret": "GOCSPX-secret",
            "redirect_uris": ["http://localhost"]
        }
    }"#;

    #[test]
    fn parses_installed_client() {
        let creds = parse_credentials(INSTALLED, Path::new("credentials.json")).expect("parse");

        assert_eq!(creds.client_id, "1234.apps.googleusercontent.com");
        assert_eq!(creds.client_secret, "GOCSPX-secret");
        assert_eq!(creds.token_uri, "https://oauth2.googleapis.com/token");
        assert_eq!(creds.redirect_uris, vec!["http://localhost".to_string()]);
        assert_eq!(creds.scopes, REQUIRED_SCOPES.map(String::from).to_vec());
    }

    #[test]
    fn parses_web_client() {
        let doc = INSTALLED.replace("\"installed\"", "\"web\"");
        let creds = parse_credentials(&doc, Path::new("credentials.json")).expect("parse");
        assert_eq!(creds.client_id, "1234.apps.googleusercontent.com");
    }

    #[test]
    fn rejects_document_without_client_section() {
        let err = parse_credentials(r#"{"type": "service_account"}"#, Path::new("c.json"))
            .expect_err("not a client document");
        assert!(matches!(err, AuthError::CredentialsParse { reason, .. } if reason.contains("installed")));
    }

    #[test]
    fn rejects_missing_token_uri() {
        let doc = r#"{"installed": {"client_id": "id", "auth_uri": "https://a"}}"#;
        let err = parse_credentials(doc, Path::new("c.json")).expect_err("no token_uri");
        assert!(matches!(err, AuthError::CredentialsParse { reason, .. } if reason.contains("token_uri")));
    }

    #[test]
    fn first_existing_candidate_wins() {
        let dir = TempDir::new().expect("temp dir");
        let missing = dir.path().join("missing.json");
        let first = dir.path().join("first.json");
        let second = dir.path().join("second.json");
        std::fs::write(&first, INSTALLED).expect("write");
        std::fs::write(&second, INSTALLED.replace("1234", "5678")).expect("write");

        let loader = CredentialLoader::new(vec![missing, first.clone(), second]);

        assert_eq!(loader.locate(), Some(first.as_path()));
        assert_eq!(loader.load().expect("load").client_id, "1234.apps.googleusercontent.com");
    }

    #[test]
    fn no_candidate_is_not_found() {
        let dir = TempDir::new().expect("temp dir");
        let loader = CredentialLoader::new(vec![dir.path().join("nope.json")]);

        let err = loader.load().expect_err("nothing to load");
        assert!(matches!(err, AuthError::CredentialsNotFound { searched } if searched.contains("nope.json")));
    }

    #[test]
    fn explicit_path_leads_search_order() {
        let candidates = standard_candidates(Some(Path::new("/etc/calnote/client.json")));

        assert_eq!(candidates[0], PathBuf::from("/etc/calnote/client.json"));
        assert_eq!(candidates[1], PathBuf::from(CREDENTIALS_FILE_NAME));
    }
}
