//! Configuration module for backup-orchestrator
//!
//! This module handles loading and validating configuration from TOML files.
//!
//! ## Example Usage
//!
//! ```no_run
//! use backup_orchestrator::config;
//!
//! let config = config::load_config("config.toml")?;
//! println!("Lock file: {:?}", config.lock_file);
//! println!("Schema policy: {:?}", config.mysql.schema_rule());
//! # Ok::<(), config::ConfigError>(())
//! ```

mod loader;
mod types;

pub use loader::{load_config, validate_remote_storage, ConfigError, Result};
pub use types::*;

/// Expand tilde (~) in path
pub fn expand_tilde(path: &std::path::Path) -> std::path::PathBuf {
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    path.to_path_buf()
}
