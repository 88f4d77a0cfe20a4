//! # calnote Domain
//!
//! Domain types shared by every calnote crate.
//!
//! This crate contains:
//! - The application-wide error type and `Result` alias
//! - Runtime configuration structures
//! - Domain constants (OAuth scopes, timeouts, file names)
//!
//! ## Architecture
//! - No dependencies on other calnote crates
//! - Only external dependencies allowed
//! - Pure data structures, no I/O

pub mod config;
pub mod constants;
pub mod errors;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
