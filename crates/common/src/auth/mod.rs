//! OAuth 2.0 authorization-code primitives
//!
//! Building blocks for acquiring a user token from a desktop command-line
//! tool. The orchestration itself (loopback server, manual fallback,
//! coordinator) lives in `calnote-infra`; this module holds the pieces that
//! have no I/O of their own or only talk to the provider's token endpoint.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────┐
//! │ AuthorizationCoordinator │  (calnote-infra)
//! └────────────┬─────────────┘
//!              │
//!              ├──► TokenStore        (trait, file-backed in infra)
//!              ├──► CodeExchanger     (trait, OAuthTokenClient here)
//!              ├──► BrowserLauncher   (trait, per-platform in infra)
//!              ├──► OperatorConsole   (trait, stdin/stdout in infra)
//!              │
//!              └──► ResultSlot        (callback handler → waiting caller)
//! ```
//!
//! # Module Organization
//!
//! - **[`types`]**: `Token`, `Credentials`, provider responses
//! - **[`state`]**: CSRF state generation and constant-time validation
//! - **[`error`]**: `AuthError`, the taxonomy shared by every flow
//! - **[`slot`]**: first-writer-wins result slot with bounded wait
//! - **[`traits`]**: capability traits injected into the coordinator
//! - **[`client`]**: authorization URL builder and token endpoint client
//!
//! # Security Features
//!
//! - **State Validation**: 16 random bytes per attempt, compared in constant
//!   time
//! - **Owner-only storage**: enforced by the file store in `calnote-infra`
//! - **No secret logging**: tokens and codes never reach `tracing` fields

#[cfg(feature = "platform")]
pub mod client;
pub mod error;
#[cfg(feature = "runtime")]
pub mod slot;
pub mod state;
#[cfg(feature = "runtime")]
pub mod traits;
pub mod types;

// Re-export commonly used types and functions
#[cfg(feature = "platform")]
pub use client::{build_authorization_url, OAuthTokenClient};
pub use error::AuthError;
#[cfg(feature = "runtime")]
pub use slot::{result_slot, ResultSlot, ResultWaiter, WaitError};
pub use state::{generate_state, validate_state, CsrfState};
#[cfg(feature = "runtime")]
pub use traits::{BrowserLauncher, CodeExchanger, OperatorConsole, TokenStore};
pub use types::{Credentials, OAuthErrorResponse, Token, TokenResponse};
