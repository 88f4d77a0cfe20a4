//! # calnote Infrastructure
//!
//! I/O-bound implementations behind the calnote authorization flow.
//!
//! This crate contains:
//! - File-backed token storage and credential discovery
//! - The loopback OAuth callback server (axum)
//! - Browser, terminal and manual-entry adapters
//! - The authorization coordinator
//! - Configuration loading
//!
//! ## Architecture
//! - Implements traits defined in `calnote-common`
//! - Depends on `calnote-domain` and `calnote-common`
//! - Contains all "impure" code (network listeners, files, processes)

pub mod auth;
pub mod config;

// Re-export commonly used items
pub use auth::{
    AuthPhase, AuthorizationCoordinator, CoordinatorSettings, CredentialLoader, FileTokenStore,
    LocalCallbackServer, ManualCodeEntry,
};
