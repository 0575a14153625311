//! Retry settings and their loading
//!
//! [`RetrySettings`] is the user-facing configuration; [`loader`] reads it
//! from environment variables and files.

pub mod loader;
pub mod settings;

// Re-export commonly used items
pub use loader::{
    load, load_from_env, load_from_file, load_from_str, probe_config_paths, ConfigFormat,
};
pub use settings::{BackoffKind, RetrySettings};
