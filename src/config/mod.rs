//! Configuration module for db-backup-manager
//!
//! This module handles loading and validating the configuration document.
//! The document is JSON by default; files with a `.toml` extension are
//! parsed as TOML with the same keys.
//!
//! ## Example Usage
//!
//! ```no_run
//! use db_backup_manager::config;
//!
//! let config = config::load_config("backup-config.json")?;
//!
//! for database in &config.databases {
//!     println!("Database: {:?} {:?}", database.kind, database.database_name);
//! }
//! # Ok::<(), config::ConfigError>(())
//! ```

mod loader;
mod types;

pub use loader::{load_config, ConfigError, Result};
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
