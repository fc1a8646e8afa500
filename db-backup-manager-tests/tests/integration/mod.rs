//! Integration tests for db-backup-manager
//!
//! These tests require Docker and the engines' client tools, and run full
//! backup/restore round trips against real database servers.
//! Run with: `cargo test -p db-backup-manager-tests --test integration -- --ignored`

mod common;
