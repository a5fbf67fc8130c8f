//! Database layer for aiwarden
//!
//! This module provides the storage layer using SQLite with:
//! - Schema migrations
//! - Repository pattern for queries
//! - JSON columns for findings, secret labels, and raw journal records

pub mod repo;
pub mod schema;

pub use repo::Database;
