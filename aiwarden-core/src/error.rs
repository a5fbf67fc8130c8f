//! Error types for aiwarden-core

use thiserror::Error;

/// Main error type for the aiwarden-core library
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error for session journals
    #[error("parse error in {agent} journal: {message}")]
    Parse { agent: String, message: String },

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Session not found
    #[error("session not found: {0}")]
    SessionNotFound(String),

    /// Watcher error
    #[error("watcher error: {0}")]
    Watch(String),

    /// Notification delivery error
    #[error("notifier error: {0}")]
    Notify(String),
}

/// Result type alias for aiwarden-core
pub type Result<T> = std::result::Result<T, Error>;
