//! Unit tests for backup-orchestrator
//!
//! Configuration loading, filter resolution and the local artifact store,
//! exercised through the public library API.

mod config;
mod filter;
mod storage;
