//! Whole-run scenarios for backup-orchestrator
//!
//! Each test drives a complete run (lock, discovery, filtering, per-target
//! pipeline, retention, report) against mocked tools and storage.

mod container;
mod mysql;
mod retention;
