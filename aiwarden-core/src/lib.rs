//! # aiwarden-core
//!
//! Core library for aiwarden - a local security monitor for AI agent runtimes.
//!
//! This library provides:
//! - Domain types for sessions, activities, and threat findings
//! - Session journal tailing with tool-call correlation
//! - A rule-based threat classifier with secret scanning
//! - Database storage layer with SQLite
//! - Configuration management
//! - Logging infrastructure
//!
//! ## Architecture
//!
//! Activity flows through four stages:
//! - **Watch:** Tail per-session JSONL journals incrementally, correlate calls with results
//! - **Classify:** Run every analyzer over each activity, keep all findings
//! - **Store:** Persist to SQLite with full `raw_data` preservation
//! - **Publish:** Push activities, alerts, and session updates to a configured receiver
//!
//! The local store is the source of truth; publishing is best-effort and
//! never blocks detection.
//!
//! ## Example
//!
//! ```rust,no_run
//! use aiwarden_core::{Config, Database};
//!
//! // Load configuration
//! let config = Config::load().expect("failed to load config");
//!
//! // Open database
//! let db = Database::open(&Config::database_path()).expect("failed to open database");
//! db.migrate().expect("failed to run migrations");
//! ```

// Re-export commonly used items at the crate root
pub use config::Config;
pub use db::Database;
pub use error::{Error, Result};
pub use monitor::Monitor;
pub use types::*;

// Public modules
pub mod config;
pub mod db;
pub mod error;
pub mod gateway;
pub mod logging;
pub mod monitor;
pub mod notifier;
pub mod threat;
pub mod types;
pub mod watch;
