//! Database schema and migrations
//!
//! Uses SQLite with embedded migrations managed via PRAGMA user_version.

use rusqlite::Connection;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// SQL migrations, indexed by version number
const MIGRATIONS: &[&str] = &[
    // Version 1: Initial schema
    r#"
    -- ============================================
    -- Sessions
    -- ============================================

    CREATE TABLE IF NOT EXISTS sessions (
        id               TEXT PRIMARY KEY,
        agent            TEXT NOT NULL,
        start_time       DATETIME NOT NULL,
        end_time         DATETIME,
        status           TEXT NOT NULL,      -- 'active', 'ended'
        model            TEXT
    );

    CREATE INDEX IF NOT EXISTS idx_sessions_start ON sessions(start_time DESC);
    CREATE INDEX IF NOT EXISTS idx_sessions_status ON sessions(status);

    -- ============================================
    -- Activities
    -- ============================================

    CREATE TABLE IF NOT EXISTS activities (
        id               INTEGER PRIMARY KEY AUTOINCREMENT,
        session_id       TEXT NOT NULL REFERENCES sessions(id),
        activity_type    TEXT NOT NULL,      -- 'file_read', 'file_write', 'shell_command', ...
        detail           TEXT NOT NULL,
        tool_name        TEXT,
        target           TEXT,
        timestamp        DATETIME NOT NULL,
        run_id           TEXT,

        -- Content previews (capped at parse time)
        content_preview  TEXT,
        read_preview     TEXT,

        -- Classification
        threat_level     TEXT NOT NULL,      -- 'none', 'low', 'medium', 'high', 'critical'
        findings         JSON NOT NULL,
        secrets          JSON NOT NULL,

        -- Lossless capture
        raw_data         JSON NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_activities_session ON activities(session_id, timestamp);
    CREATE INDEX IF NOT EXISTS idx_activities_threat ON activities(threat_level);
    CREATE INDEX IF NOT EXISTS idx_activities_ts ON activities(timestamp DESC);
    "#,
];

/// Run all pending migrations
pub fn run_migrations(conn: &Connection) -> crate::error::Result<()> {
    let current_version: i32 = conn
        .query_row("PRAGMA user_version", [], |r| r.get(0))
        .unwrap_or(0);

    tracing::info!(
        current_version,
        target_version = SCHEMA_VERSION,
        "Checking database migrations"
    );

    for (i, migration) in MIGRATIONS.iter().enumerate() {
        let version = (i + 1) as i32;
        if version > current_version {
            tracing::info!(version, "Running migration");
            conn.execute_batch(migration)?;
            conn.execute(&format!("PRAGMA user_version = {}", version), [])?;
        }
    }

    if current_version < SCHEMA_VERSION {
        tracing::info!(
            from = current_version,
            to = SCHEMA_VERSION,
            "Migrations complete"
        );
    }

    Ok(())
}

/// Get the current schema version from the database
pub fn get_schema_version(conn: &Connection) -> crate::error::Result<i32> {
    let version: i32 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;
    Ok(version)
}
