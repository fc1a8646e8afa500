//! Unit tests for db-backup-manager
//!
//! These tests exercise configuration loading and backend resolution
//! without touching any database or network.

mod config;
mod resolver;
