//! OAuth 2.0 types and structures
//!
//! Defines the persisted token, the client credentials used to talk to the
//! provider, and the provider's token endpoint responses.

use std::fmt;

use calnote_domain::constants::{DEFAULT_MANUAL_REDIRECT_URI, REQUIRED_SCOPES};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// OAuth 2.0 user token as persisted between runs
///
/// The JSON shape (`access_token`, `token_type`, `refresh_token`, `expiry`)
/// matches what Google client libraries write, so a token file produced by
/// another tool for the same client can be reused. Every field defaults when
/// absent; a token with neither an access nor a refresh token is treated as
/// absent by the coordinator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// Bearer token sent with API requests
    #[serde(default)]
    pub access_token: String,

    /// Token type (normally "Bearer")
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub token_type: String,

    /// Refresh token used by the consuming transport to renew access
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub refresh_token: String,

    /// Absolute expiration of the access token (UTC)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
}

impl Token {
    /// Create a bearer token expiring `expires_in` seconds from now.
    ///
    /// A non-positive or out-of-range `expires_in` leaves the expiry unset.
    #[must_use]
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        expires_in: i64,
    ) -> Self {
        let expiry = (expires_in > 0)
            .then(|| Duration::try_seconds(expires_in))
            .flatten()
            .and_then(|lifetime| Utc::now().checked_add_signed(lifetime));

        Self {
            access_token: access_token.into(),
            token_type: "Bearer".to_string(),
            refresh_token: refresh_token.into(),
            expiry,
        }
    }

    /// Whether the token can be used without re-authorizing.
    ///
    /// Either half is enough: an expired access token with a refresh token is
    /// still usable because the transport renews it.
    #[must_use]
    pub fn is_usable(&self) -> bool {
        !self.access_token.is_empty() || !self.refresh_token.is_empty()
    }

    /// Check if the access token is past its expiry.
    ///
    /// Tokens without an expiry are never considered expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expiry.is_some_and(|expiry| Utc::now() >= expiry)
    }
}

/// OAuth token response from the authorization server
///
/// Standard OAuth 2.0 token response format (RFC 6749 §5.1).
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub scope: Option<String>,
}

impl From<TokenResponse> for Token {
    fn from(response: TokenResponse) -> Self {
        let mut token = Self::new(
            response.access_token,
            response.refresh_token.unwrap_or_default(),
            response.expires_in.unwrap_or_default(),
        );
        if let Some(token_type) = response.token_type.filter(|t| !t.is_empty()) {
            token.token_type = token_type;
        }
        token
    }
}

/// Client credentials for the OAuth provider
///
/// Loaded once per process run from the provider's client document. The
/// scope set is not read from the document: it is always exactly the scopes
/// in [`REQUIRED_SCOPES`].
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// OAuth client ID
    pub client_id: String,

    /// OAuth client secret (installed-app secrets are not confidential but
    /// are still required by the token endpoint)
    pub client_secret: String,

    /// Authorization endpoint the operator's browser is sent to
    pub auth_uri: String,

    /// Token endpoint the authorization code is exchanged at
    pub token_uri: String,

    /// Redirect URIs registered for the client
    pub redirect_uris: Vec<String>,

    /// Scopes requested on authorization
    pub scopes: Vec<String>,
}

impl Credentials {
    /// Create credentials with the fixed scope set.
    #[must_use]
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        auth_uri: impl Into<String>,
        token_uri: impl Into<String>,
        redirect_uris: Vec<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            auth_uri: auth_uri.into(),
            token_uri: token_uri.into(),
            redirect_uris,
            scopes: REQUIRED_SCOPES.iter().map(ToString::to_string).collect(),
        }
    }

    /// Get scopes as space-separated string
    #[must_use]
    pub fn scope_string(&self) -> String {
        self.scopes.join(" ")
    }

    /// Redirect URI used when the loopback server is not involved.
    ///
    /// The provider redirects the browser to this address; nothing listens
    /// there, so the operator copies the resulting URL back by hand.
    #[must_use]
    pub fn manual_redirect_uri(&self) -> &str {
        self.redirect_uris
            .iter()
            .map(String::as_str)
            .find(|uri| !uri.is_empty())
            .unwrap_or(DEFAULT_MANUAL_REDIRECT_URI)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("auth_uri", &self.auth_uri)
            .field("token_uri", &self.token_uri)
            .field("redirect_uris", &self.redirect_uris)
            .field("scopes", &self.scopes)
            .finish()
    }
}

/// OAuth error response from authorization server
///
/// Standard OAuth 2.0 error response format (RFC 6749 §5.2).
#[derive(Debug, Deserialize)]
pub struct OAuthErrorResponse {
    pub error: String,
    pub error_description: Option<String>,
}

impl fmt::Display for OAuthErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.error_description {
            Some(desc) => write!(f, "{}: {}", self.error, desc),
            None => write!(f, "{}", self.error),
        }
    }
}
