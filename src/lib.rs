//! DB Backup Manager Library
//!
//! Configuration-driven backup and restore of a MySQL, PostgreSQL or MongoDB
//! database to local disk or a cloud object store.

pub mod config;
pub mod databases;
pub mod managers;
pub mod resolver;
pub mod storage;
pub mod utils;

// Re-export commonly used types
pub use config::{load_config, Config, ConfigError};
pub use databases::DatabaseConnector;
pub use managers::logging::{init_console_logging, init_logging, LogGuard, LoggingConfig, RunLogger, TracingLogger};
pub use managers::notification::{DiscordNotifier, Notification, Notifier};
pub use managers::pipeline::{BackupJob, Command, JobState, Pipeline, Stage};
pub use resolver::{BackendResolver, DeclarativeSelection, InteractiveSelection, ResolvedStorage, SelectionPolicy};
pub use storage::StorageConnector;
