//! Configuration loading and management
//!
//! This module provides utilities for loading application configuration
//! from files and environment variables, and for resolving the on-disk
//! locations the authorization flow reads and writes.

pub mod loader;

// Re-export commonly used items
pub use loader::{
    apply_env_overrides, default_config_dir, load, load_from_file, probe_config_paths,
    resolve_token_path,
};
