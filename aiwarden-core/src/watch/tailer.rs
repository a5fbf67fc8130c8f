//! Incremental file tailing
//!
//! Tracks a byte offset per journal file and reads exactly the appended range
//! on each cycle. New files start at their current end: history is never
//! replayed, only activity after the watcher attached is monitored. A file
//! observed smaller than its stored offset is treated as truncated/rotated
//! and the offset resets to zero.

use crate::error::Result;
use crate::watch::journal::SessionIndex;
use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Tailing state for one journal file.
#[derive(Debug, Clone)]
pub struct WatchState {
    pub path: PathBuf,
    pub session_id: String,
    pub agent: String,
    /// Absolute byte offset already consumed
    pub offset: u64,
}

/// A session log found during discovery.
#[derive(Debug, Clone)]
pub struct DiscoveredSession {
    pub path: PathBuf,
    pub session_id: String,
    pub agent: String,
    /// Model name, when the agent's index reported one
    pub model: Option<String>,
}

/// Enumerate agent subdirectories and their session logs.
///
/// Layout: `<agents_dir>/<agent>/sessions/*.jsonl`, with an optional
/// `<agents_dir>/<agent>/sessions.json` index naming known sessions. A
/// missing or unreadable directory is "nothing to watch yet", never an
/// error; the next discovery cycle retries.
pub fn discover_sessions(agents_dir: &Path) -> Vec<DiscoveredSession> {
    let mut found = Vec::new();

    let entries = match std::fs::read_dir(agents_dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::debug!(dir = %agents_dir.display(), error = %e, "agents directory not readable yet");
            return found;
        }
    };

    for entry in entries.flatten() {
        let agent_dir = entry.path();
        if !agent_dir.is_dir() {
            continue;
        }
        let agent = match agent_dir.file_name().and_then(|n| n.to_str()) {
            Some(name) => name.to_string(),
            None => continue,
        };

        let sessions_dir = agent_dir.join("sessions");
        let mut seen_paths: Vec<PathBuf> = Vec::new();

        // Indexed sessions first: they carry the authoritative id and model
        let index_path = agent_dir.join("sessions.json");
        if let Ok(raw) = std::fs::read_to_string(&index_path) {
            match serde_json::from_str::<SessionIndex>(&raw) {
                Ok(index) => {
                    for item in index.sessions {
                        let (Some(id), Some(file)) = (item.id, item.file) else {
                            continue;
                        };
                        let path = sessions_dir.join(&file);
                        if !path.is_file() {
                            continue;
                        }
                        seen_paths.push(path.clone());
                        found.push(DiscoveredSession {
                            path,
                            session_id: id,
                            agent: agent.clone(),
                            model: item.model,
                        });
                    }
                }
                Err(e) => {
                    tracing::warn!(path = %index_path.display(), error = %e, "skipping malformed session index");
                }
            }
        }

        // Then any log files the index does not know about
        let pattern = sessions_dir.join("*.jsonl");
        let pattern_str = pattern.to_string_lossy();
        match glob::glob(&pattern_str) {
            Ok(paths) => {
                for path in paths.flatten() {
                    if seen_paths.contains(&path) {
                        continue;
                    }
                    let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                        continue;
                    };
                    found.push(DiscoveredSession {
                        session_id: stem.to_string(),
                        agent: agent.clone(),
                        model: None,
                        path,
                    });
                }
            }
            Err(e) => {
                tracing::warn!(pattern = %pattern_str, error = %e, "invalid discovery pattern");
            }
        }
    }

    found
}

/// Per-file offset bookkeeping for all watched journals.
#[derive(Debug, Default)]
pub struct FileTailer {
    states: HashMap<PathBuf, WatchState>,
}

impl FileTailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_tracked(&self, path: &Path) -> bool {
        self.states.contains_key(path)
    }

    /// Owning state for a path, if tracked.
    pub fn state(&self, path: &Path) -> Option<&WatchState> {
        self.states.get(path)
    }

    /// Start tracking a discovered file at its current end.
    ///
    /// Returns false if the file was already tracked (discovery is
    /// intentionally redundant and must be idempotent).
    pub fn track(&mut self, discovered: &DiscoveredSession) -> Result<bool> {
        if self.states.contains_key(&discovered.path) {
            return Ok(false);
        }
        let size = std::fs::metadata(&discovered.path)?.len();
        self.states.insert(
            discovered.path.clone(),
            WatchState {
                path: discovered.path.clone(),
                session_id: discovered.session_id.clone(),
                agent: discovered.agent.clone(),
                offset: size,
            },
        );
        tracing::info!(
            path = %discovered.path.display(),
            session = %discovered.session_id,
            agent = %discovered.agent,
            offset = size,
            "watching session log"
        );
        Ok(true)
    }

    /// Read the bytes appended since the last cycle, split into lines.
    ///
    /// Advances the stored offset to the file size observed by this call's
    /// stat. Returns an empty batch when nothing new is present or the path
    /// is not tracked.
    pub fn read_new_lines(&mut self, path: &Path) -> Result<Vec<String>> {
        let Some(state) = self.states.get_mut(path) else {
            return Ok(Vec::new());
        };

        let size = std::fs::metadata(path)?.len();
        if size < state.offset {
            tracing::warn!(
                path = %path.display(),
                offset = state.offset,
                size,
                "file shrank, assuming truncation and rereading from start"
            );
            state.offset = 0;
        }
        if size == state.offset {
            return Ok(Vec::new());
        }

        let mut file = File::open(path)?;
        file.seek(SeekFrom::Start(state.offset))?;
        let mut buf = Vec::with_capacity((size - state.offset) as usize);
        file.take(size - state.offset).read_to_end(&mut buf)?;
        state.offset = size;

        let text = String::from_utf8_lossy(&buf);
        Ok(text
            .split('\n')
            .filter(|line| !line.trim().is_empty())
            .map(|line| line.to_string())
            .collect())
    }

    /// All tracked files.
    pub fn tracked(&self) -> impl Iterator<Item = &WatchState> {
        self.states.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn discovered(path: &Path) -> DiscoveredSession {
        DiscoveredSession {
            path: path.to_path_buf(),
            session_id: "s-1".to_string(),
            agent: "alpha".to_string(),
            model: None,
        }
    }

    #[test]
    fn track_starts_at_current_end() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s-1.jsonl");
        std::fs::write(&path, "{\"id\":\"old\"}\n").unwrap();

        let mut tailer = FileTailer::new();
        assert!(tailer.track(&discovered(&path)).unwrap());
        // history before attach is never replayed
        assert!(tailer.read_new_lines(&path).unwrap().is_empty());
    }

    #[test]
    fn track_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s-1.jsonl");
        std::fs::write(&path, "").unwrap();

        let mut tailer = FileTailer::new();
        assert!(tailer.track(&discovered(&path)).unwrap());
        assert!(!tailer.track(&discovered(&path)).unwrap());
    }

    #[test]
    fn reads_only_appended_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s-1.jsonl");
        std::fs::write(&path, "{\"id\":\"old\"}\n").unwrap();

        let mut tailer = FileTailer::new();
        tailer.track(&discovered(&path)).unwrap();

        let mut f = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
        writeln!(f, "{{\"id\":\"a\"}}").unwrap();
        writeln!(f, "{{\"id\":\"b\"}}").unwrap();
        drop(f);

        let lines = tailer.read_new_lines(&path).unwrap();
        assert_eq!(lines, vec!["{\"id\":\"a\"}", "{\"id\":\"b\"}"]);

        // second cycle with no growth yields nothing
        assert!(tailer.read_new_lines(&path).unwrap().is_empty());

        let mut f = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
        writeln!(f, "{{\"id\":\"c\"}}").unwrap();
        drop(f);

        let lines = tailer.read_new_lines(&path).unwrap();
        assert_eq!(lines, vec!["{\"id\":\"c\"}"]);
    }

    #[test]
    fn shrunk_file_resets_to_start() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s-1.jsonl");
        std::fs::write(&path, "{\"id\":\"one\"}\n{\"id\":\"two\"}\n").unwrap();

        let mut tailer = FileTailer::new();
        tailer.track(&discovered(&path)).unwrap();

        // rotation: file replaced with shorter content
        std::fs::write(&path, "{\"id\":\"new\"}\n").unwrap();

        let lines = tailer.read_new_lines(&path).unwrap();
        assert_eq!(lines, vec!["{\"id\":\"new\"}"]);
    }

    #[test]
    fn untracked_path_reads_nothing() {
        let mut tailer = FileTailer::new();
        let lines = tailer.read_new_lines(Path::new("/nonexistent/x.jsonl")).unwrap();
        assert!(lines.is_empty());
    }

    #[test]
    fn discovery_merges_index_and_directory() {
        let dir = tempfile::tempdir().unwrap();
        let agent_dir = dir.path().join("alpha");
        let sessions_dir = agent_dir.join("sessions");
        std::fs::create_dir_all(&sessions_dir).unwrap();

        std::fs::write(sessions_dir.join("indexed.jsonl"), "").unwrap();
        std::fs::write(sessions_dir.join("orphan.jsonl"), "").unwrap();
        std::fs::write(
            agent_dir.join("sessions.json"),
            r#"{"sessions":[{"id":"sess-indexed","file":"indexed.jsonl","model":"m-1"}]}"#,
        )
        .unwrap();

        let mut found = discover_sessions(dir.path());
        found.sort_by(|a, b| a.session_id.cmp(&b.session_id));

        assert_eq!(found.len(), 2);
        assert_eq!(found[0].session_id, "orphan");
        assert!(found[0].model.is_none());
        assert_eq!(found[1].session_id, "sess-indexed");
        assert_eq!(found[1].model.as_deref(), Some("m-1"));
        assert_eq!(found[1].agent, "alpha");
    }

    #[test]
    fn discovery_of_missing_dir_is_empty() {
        let found = discover_sessions(Path::new("/nonexistent/agents"));
        assert!(found.is_empty());
    }

    #[test]
    fn malformed_index_still_discovers_files() {
        let dir = tempfile::tempdir().unwrap();
        let agent_dir = dir.path().join("beta");
        let sessions_dir = agent_dir.join("sessions");
        std::fs::create_dir_all(&sessions_dir).unwrap();

        std::fs::write(sessions_dir.join("s-9.jsonl"), "").unwrap();
        std::fs::write(agent_dir.join("sessions.json"), "{not json").unwrap();

        let found = discover_sessions(dir.path());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].session_id, "s-9");
    }
}
