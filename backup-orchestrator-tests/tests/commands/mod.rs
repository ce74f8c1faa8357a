//! Command tests for backup-orchestrator
//!
//! These tests verify the behaviour behind each CLI subcommand using mocked
//! dependencies.

mod restore;
mod setup;
mod validate;
