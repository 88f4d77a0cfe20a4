//! OAuth 2.0 authorization-code client
//!
//! Handles the two provider-facing pieces of the flow:
//! - Building the browser authorization URL
//! - Exchanging the authorization code for a token

use std::time::Duration;

use async_trait::async_trait;
use calnote_domain::constants::TOKEN_REQUEST_TIMEOUT_SECS;
use reqwest::Client;
use tracing::{debug, info};

use super::error::AuthError;
use super::state::CsrfState;
use super::traits::CodeExchanger;
use super::types::{Credentials, OAuthErrorResponse, Token, TokenResponse};

/// Build the authorization URL the operator opens in a browser
///
/// Requests offline access with a forced consent screen so the provider
/// issues a refresh token even when the operator authorized this client
/// before.
#[must_use]
pub fn build_authorization_url(
    credentials: &Credentials,
    redirect_uri: &str,
    state: &CsrfState,
) -> String {
    let params = [
        ("response_type", "code".to_string()),
        ("client_id", credentials.client_id.clone()),
        ("redirect_uri", redirect_uri.to_string()),
        ("scope", credentials.scope_string()),
        ("state", state.as_str().to_string()),
        ("access_type", "offline".to_string()),
        ("prompt", "consent".to_string()),
    ];

    let query_string = params
        .iter()
        .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");

    let separator = if credentials.auth_uri.contains('?') { '&' } else { '?' };
    format!("{}{separator}{query_string}", credentials.auth_uri)
}

/// Token endpoint client
///
/// Implements the authorization-code grant of RFC 6749 §4.1.3. Refresh is
/// not handled here; the consuming HTTP transport owns it.
#[derive(Debug, Clone)]
pub struct OAuthTokenClient {
    credentials: Credentials,
    client: Client,
}

impl OAuthTokenClient {
    /// Create a client for the given credentials
    ///
    /// Honors `CALNOTE_DISABLE_PROXY` to bypass system proxies (useful when
    /// the token endpoint is a local test server).
    #[must_use]
    pub fn new(credentials: Credentials) -> Self {
        let builder = Client::builder().timeout(Duration::from_secs(TOKEN_REQUEST_TIMEOUT_SECS));
        let builder = if std::env::var_os("CALNOTE_DISABLE_PROXY").is_some() {
            builder.no_proxy()
        } else {
            builder
        };
        let client = builder.build().unwrap_or_else(|_| Client::new());

        Self { credentials, client }
    }

    /// Create a client that reuses an existing `reqwest::Client`
    #[must_use]
    pub fn with_http_client(credentials: Credentials, client: Client) -> Self {
        Self { credentials, client }
    }

    /// Get a reference to the credentials
    #[must_use]
    pub const fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Exchange authorization code for a token
    ///
    /// # Arguments
    /// * `code` - Authorization code from the redirect or the operator
    /// * `redirect_uri` - Redirect URI used in the authorization request
    ///
    /// # Errors
    /// Returns [`AuthError::Exchange`] if:
    /// - The request fails (network, timeout)
    /// - The provider answers with an OAuth error
    /// - The response cannot be parsed
    pub async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<Token, AuthError> {
        let request_body = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("redirect_uri", redirect_uri),
        ];

        debug!(token_uri = %self.credentials.token_uri, "Exchanging authorization code");

        let response = self
            .client
            .post(&self.credentials.token_uri)
            .form(&request_body)
            .send()
            .await
            .map_err(|e| AuthError::Exchange(format!("request to token endpoint failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<OAuthErrorResponse>(&body).map_or_else(
                |_| format!("HTTP {status}: {}", body.trim()),
                |error| format!("HTTP {status}: {error}"),
            );
            return Err(AuthError::Exchange(message));
        }

        let token_response: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::Exchange(format!("invalid token response: {e}")))?;

        let token = Token::from(token_response);
        info!(
            has_refresh_token = !token.refresh_token.is_empty(),
            "Authorization code exchanged for token"
        );
        Ok(token)
    }
}

#[async_trait]
impl CodeExchanger for OAuthTokenClient {
    async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<Token, AuthError> {
        Self::exchange_code(self, code, redirect_uri).await
    }
}
