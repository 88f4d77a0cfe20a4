//! Capability traits injected into the authorization coordinator
//!
//! These traits enable dependency injection and testing by abstracting the
//! coordinator's side effects: token persistence, the provider's token
//! endpoint, the operator's browser and the operator's terminal.

use std::io;

use async_trait::async_trait;

use super::error::AuthError;
use super::types::Token;

/// Trait for token persistence
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Load the persisted token
    ///
    /// # Errors
    /// - [`AuthError::TokenNotFound`] when nothing has been stored yet
    /// - [`AuthError::TokenParse`] when the stored content is malformed
    /// - [`AuthError::TokenRead`] for other I/O failures
    async fn load(&self) -> Result<Token, AuthError>;

    /// Persist `token`, replacing any previous one
    ///
    /// # Errors
    /// Returns [`AuthError::TokenWrite`] if the token cannot be written
    async fn save(&self, token: &Token) -> Result<(), AuthError>;

    /// Remove the persisted token; removing a missing token succeeds
    ///
    /// # Errors
    /// Returns [`AuthError::TokenWrite`] if removal fails
    async fn clear(&self) -> Result<(), AuthError>;

    /// Human-readable location for log and console messages
    fn location(&self) -> String;
}

/// Trait for exchanging an authorization code at the token endpoint
#[async_trait]
pub trait CodeExchanger: Send + Sync {
    /// Exchange `code` for a token
    ///
    /// `redirect_uri` must be the same value that was sent in the
    /// authorization request that produced `code`.
    ///
    /// # Errors
    /// Returns [`AuthError::Exchange`] if the provider rejects the code or the
    /// request fails
    async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<Token, AuthError>;
}

/// Best-effort launcher for the operator's default browser
///
/// Failure is reported to the caller for logging only; it never changes the
/// authorization flow.
pub trait BrowserLauncher: Send + Sync {
    /// Ask the platform to open `url`
    ///
    /// # Errors
    /// Returns the underlying I/O error when the launcher cannot be spawned
    fn open(&self, url: &str) -> io::Result<()>;

    /// Short launcher name for logs
    fn name(&self) -> &'static str;
}

/// Operator-facing terminal
#[async_trait]
pub trait OperatorConsole: Send + Sync {
    /// Print a line of plain text for the operator
    fn say(&self, text: &str);

    /// Read one line of operator input, without the trailing newline
    ///
    /// Returns `Ok(None)` at end of input.
    ///
    /// # Errors
    /// Returns the underlying I/O error when reading fails
    async fn read_line(&self) -> io::Result<Option<String>>;
}
