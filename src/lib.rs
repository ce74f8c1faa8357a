//! Backup Orchestrator Library
//!
//! Discovers backup targets (MySQL schemas or a container's built-in backup),
//! dumps, archives and hashes each one, publishes it to object storage, and
//! enforces age-based retention.

pub mod config;
pub mod managers;
pub mod strategies;
pub mod utils;

// Re-export commonly used types
pub use config::{load_config, Config};
pub use managers::backup::{BackupManager, RunError, Workflow};
pub use managers::logging::{init_console_logging, init_logging, LogGuard, LoggingConfig};
pub use managers::notification::{Notifier, TelegramNotifier};
pub use managers::report::RunSummary;
pub use managers::restore::RestoreManager;
