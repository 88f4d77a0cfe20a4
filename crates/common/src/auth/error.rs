//! Error taxonomy for token acquisition
//!
//! Local-flow failures (`Bind`, `CsrfMismatch`, `Timeout`, `MissingCode`,
//! `MalformedCallback`, `Denied`, `ResultAbandoned`, `Shutdown`) are absorbed by the coordinator
//! and turned into a fallback to manual entry. Exchange and storage errors
//! are terminal.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use calnote_domain::CalnoteError;
use thiserror::Error;

/// Error type for authorization operations
#[derive(Debug, Error)]
pub enum AuthError {
    /// Loopback listener could not be bound
    #[error("failed to bind loopback callback server: {0}")]
    Bind(#[source] io::Error),

    /// Redirect carried a state that does not belong to this attempt
    #[error("OAuth state mismatch on redirect (possible CSRF); discarding attempt")]
    CsrfMismatch,

    /// No redirect arrived before the deadline
    #[error("no authorization redirect received within {0:?}")]
    Timeout(Duration),

    /// Redirect carried a matching state but no code
    #[error("authorization redirect did not include a code")]
    MissingCode,

    /// Redirect query string could not be read at all
    #[error("malformed authorization redirect: {0}")]
    MalformedCallback(String),

    /// Provider redirected with an `error` parameter
    #[error("authorization denied by provider: {0}")]
    Denied(String),

    /// Listener went away before delivering a result
    #[error("callback server stopped before delivering a result")]
    ResultAbandoned,

    /// Listener did not stop within its grace period
    #[error("callback server shutdown failed: {0}")]
    Shutdown(String),

    /// Operator input contained no recognizable code
    #[error("could not extract an authorization code: {0}")]
    Extraction(String),

    /// Provider rejected the code or the request failed
    #[error("token exchange failed: {0}")]
    Exchange(String),

    /// No token file exists yet
    #[error("no token stored at {}", .0.display())]
    TokenNotFound(PathBuf),

    /// Token file exists but is not a token
    #[error("failed to parse token file {}: {source}", path.display())]
    TokenParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Token file exists but could not be read
    #[error("failed to read token file {}: {source}", path.display())]
    TokenRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Token could not be persisted
    #[error("failed to write token file {}: {source}", path.display())]
    TokenWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// None of the candidate credential paths exist
    #[error("no credentials file found (searched: {searched})")]
    CredentialsNotFound { searched: String },

    /// Credentials document is malformed
    #[error("failed to parse credentials file {}: {reason}", path.display())]
    CredentialsParse { path: PathBuf, reason: String },

    /// Reading operator input or writing prompts failed
    #[error("console I/O failed: {0}")]
    Console(#[source] io::Error),

    /// Loopback flow failed and manual entry failed after it
    #[error("authorization failed: {local}; manual entry: {manual}")]
    AuthorizationFailed {
        local: Box<AuthError>,
        #[source]
        manual: Box<AuthError>,
    },
}

impl AuthError {
    /// Whether this error ends the loopback flow but leaves manual entry
    /// available.
    #[must_use]
    pub const fn is_local_flow_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Bind(_)
                | Self::CsrfMismatch
                | Self::Timeout(_)
                | Self::MissingCode
                | Self::MalformedCallback(_)
                | Self::Denied(_)
                | Self::ResultAbandoned
                | Self::Shutdown(_)
        )
    }

    /// Whether this error is security relevant and should be logged as such.
    #[must_use]
    pub const fn is_security_relevant(&self) -> bool {
        matches!(self, Self::CsrfMismatch)
    }
}

impl From<AuthError> for CalnoteError {
    fn from(err: AuthError) -> Self {
        let message = err.to_string();
        match err {
            AuthError::Bind(_) => Self::Network(message),
            AuthError::CsrfMismatch => Self::Security(message),
            AuthError::Timeout(_)
            | AuthError::MissingCode
            | AuthError::MalformedCallback(_)
            | AuthError::Denied(_)
            | AuthError::Exchange(_)
            | AuthError::AuthorizationFailed { .. } => Self::Auth(message),
            AuthError::Extraction(_) => Self::InvalidInput(message),
            AuthError::TokenNotFound(_) | AuthError::CredentialsNotFound { .. } => {
                Self::NotFound(message)
            }
            AuthError::TokenParse { .. } | AuthError::CredentialsParse { .. } => {
                Self::Config(message)
            }
            AuthError::TokenRead { .. } | AuthError::TokenWrite { .. } | AuthError::Console(_) => {
                Self::Io(message)
            }
            AuthError::ResultAbandoned | AuthError::Shutdown(_) => Self::Internal(message),
        }
    }
}
