pub mod archive;
pub mod command;
pub mod docker;
pub mod hash;
pub mod locker;
pub mod setup;
pub mod storage;
pub mod tabular;

// Trait-based abstractions for testability
pub mod executor;

// Re-export commonly used types and traits (used by test crate)
pub use archive::{Archiver, ZipArchiver};
pub use executor::{CommandExecutor, RealExecutor};
pub use storage::{ArtifactStore, LocalStore, S3Store};
