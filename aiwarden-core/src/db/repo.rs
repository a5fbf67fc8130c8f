//! Database repository layer
//!
//! Provides query and insert operations for sessions and activities.

use crate::error::{Error, Result};
use crate::types::*;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::warn;

/// Database handle with connection pooling (single connection for now)
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open or create a database at the given path
    pub fn open(path: &PathBuf) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // Enable foreign keys and WAL mode for better concurrency
        conn.execute_batch(
            "
            PRAGMA foreign_keys = ON;
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA cache_size = -64000;  -- 64MB cache
            ",
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run migrations on this database
    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        super::schema::run_migrations(&conn)
    }

    /// Get the underlying connection (for advanced use)
    pub fn connection(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap()
    }

    // ============================================
    // Session operations
    // ============================================

    /// Insert or update a session
    pub fn upsert_session(&self, session: &Session) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            INSERT INTO sessions (id, agent, start_time, end_time, status, model)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(id) DO UPDATE SET
                agent = excluded.agent,
                end_time = excluded.end_time,
                status = excluded.status,
                model = COALESCE(excluded.model, sessions.model)
            "#,
            params![
                session.id,
                session.agent,
                session.start_time.to_rfc3339(),
                session.end_time.map(|t| t.to_rfc3339()),
                session.status.as_str(),
                session.model,
            ],
        )?;
        Ok(())
    }

    /// Get a session by ID
    pub fn find_session(&self, id: &str) -> Result<Option<Session>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row("SELECT * FROM sessions WHERE id = ?", [id], |row| {
            Self::row_to_session(row)
        })
        .optional()
        .map_err(Error::from)
    }

    /// List all sessions, most recently started first
    pub fn list_sessions(&self) -> Result<Vec<Session>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT * FROM sessions ORDER BY start_time DESC")?;

        let sessions = stmt
            .query_map([], Self::row_to_session)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(sessions)
    }

    fn row_to_session(row: &Row) -> rusqlite::Result<Session> {
        let start_str: String = row.get("start_time")?;
        let end_str: Option<String> = row.get("end_time")?;
        let status_str: String = row.get("status")?;

        Ok(Session {
            id: row.get("id")?,
            agent: row.get("agent")?,
            start_time: DateTime::parse_from_rfc3339(&start_str)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
            end_time: end_str
                .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
                .map(|dt| dt.with_timezone(&Utc)),
            status: status_str.parse().unwrap_or(SessionStatus::Active),
            model: row.get("model")?,
        })
    }

    // ============================================
    // Activity operations
    // ============================================

    /// Insert an activity and read back the stored record with its assigned id
    pub fn insert_activity(&self, activity: &NewActivity) -> Result<Activity> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            INSERT INTO activities (session_id, activity_type, detail, tool_name, target,
                                    timestamp, run_id, content_preview, read_preview,
                                    threat_level, findings, secrets, raw_data)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
            params![
                activity.session_id,
                activity.activity_type.as_str(),
                activity.detail,
                activity.tool_name,
                activity.target,
                activity.timestamp.to_rfc3339(),
                activity.run_id,
                activity.content_preview,
                activity.read_preview,
                activity.threat_level.as_str(),
                serde_json::to_string(&activity.findings)?,
                serde_json::to_string(&activity.secrets)?,
                activity.raw_data.to_string(),
            ],
        )?;

        let id = conn.last_insert_rowid();
        let stored = conn.query_row("SELECT * FROM activities WHERE id = ?", [id], |row| {
            Self::row_to_activity(row)
        })?;

        Ok(stored)
    }

    /// List activities, most recent first, optionally filtered by session
    ///
    /// Rows whose persisted JSON columns fail to parse are dropped with a
    /// warning; one bad record never aborts the listing.
    pub fn list_activities(
        &self,
        session_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Activity>> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = match session_id {
            Some(_) => conn.prepare(
                "SELECT * FROM activities WHERE session_id = ?1 ORDER BY timestamp DESC, id DESC LIMIT ?2",
            )?,
            None => conn
                .prepare("SELECT * FROM activities ORDER BY timestamp DESC, id DESC LIMIT ?1")?,
        };

        let rows = match session_id {
            Some(sid) => stmt.query_map(params![sid, limit as i64], Self::row_to_activity)?,
            None => stmt.query_map(params![limit as i64], Self::row_to_activity)?,
        };

        let activities = rows
            .filter_map(|r| match r {
                Ok(activity) => Some(activity),
                Err(e) => {
                    warn!(error = %e, "Dropping unreadable activity row");
                    None
                }
            })
            .collect();

        Ok(activities)
    }

    /// Count stored activities for a session
    pub fn count_activities(&self, session_id: &str) -> Result<u64> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM activities WHERE session_id = ?",
            [session_id],
            |r| r.get(0),
        )?;
        Ok(count as u64)
    }

    /// Recompute the per-severity activity histogram for a session
    pub fn severity_histogram(&self, session_id: &str) -> Result<SeverityHistogram> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT threat_level, COUNT(*) FROM activities WHERE session_id = ? GROUP BY threat_level",
        )?;

        let mut histogram = SeverityHistogram::default();
        let rows = stmt.query_map([session_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;

        for row in rows {
            let (level_str, count) = row?;
            match level_str.parse::<ThreatLevel>() {
                Ok(level) => histogram.add(level, count as u64),
                Err(_) => warn!(level = %level_str, "Skipping unknown threat level in histogram"),
            }
        }

        Ok(histogram)
    }

    fn row_to_activity(row: &Row) -> rusqlite::Result<Activity> {
        let ts_str: String = row.get("timestamp")?;
        let type_str: String = row.get("activity_type")?;
        let level_str: String = row.get("threat_level")?;
        let findings_str: String = row.get("findings")?;
        let secrets_str: String = row.get("secrets")?;
        let raw_str: String = row.get("raw_data")?;

        let findings: Vec<ThreatFinding> = serde_json::from_str(&findings_str)
            .map_err(|e| Self::json_column_error(row, "findings", e))?;
        let secrets: Vec<String> = serde_json::from_str(&secrets_str)
            .map_err(|e| Self::json_column_error(row, "secrets", e))?;

        Ok(Activity {
            id: row.get("id")?,
            session_id: row.get("session_id")?,
            activity_type: type_str.parse().unwrap_or(ActivityType::Unknown),
            detail: row.get("detail")?,
            tool_name: row.get("tool_name")?,
            target: row.get("target")?,
            timestamp: DateTime::parse_from_rfc3339(&ts_str)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
            run_id: row.get("run_id")?,
            content_preview: row.get("content_preview")?,
            read_preview: row.get("read_preview")?,
            threat_level: level_str.parse().unwrap_or(ThreatLevel::None),
            findings,
            secrets,
            raw_data: serde_json::from_str(&raw_str).unwrap_or(serde_json::json!({})),
        })
    }

    fn json_column_error(row: &Row, column: &str, e: serde_json::Error) -> rusqlite::Error {
        let idx = row.as_ref().column_index(column).unwrap_or(0);
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    }
}
