//! Tool-call correlation
//!
//! Turns parsed journal entries into normalized activity events. The
//! interesting state is run-scoped: a user message opens a new interaction
//! run, tool calls register pending entries keyed by call id, and tool
//! results resolve them into content-carrying activities. A read's resolved
//! content is cached per (run, path) so a later write to the same path in the
//! same run can carry the file's prior content.

use crate::types::{ActivityEvent, ActivityType};
use crate::watch::journal::{JournalEntry, MessageRole, ToolCallItem};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};

/// Marker appended when a preview is cut at the cap.
const TRUNCATION_MARKER: &str = "... [truncated]";

/// A tool invocation awaiting its result.
#[derive(Debug, Clone)]
struct PendingCall {
    session_id: String,
    agent: String,
    activity_type: ActivityType,
    tool_name: String,
    detail: String,
    target: Option<String>,
    run_id: Option<String>,
    #[allow(dead_code)]
    called_at: DateTime<Utc>,
}

/// Run-scoped correlation state across all watched sessions.
///
/// All mutation happens on the watcher's single processing task, in journal
/// order per file; no interior locking is needed.
#[derive(Debug)]
pub struct Correlator {
    preview_cap: usize,
    /// session id -> current interaction-run id
    current_runs: HashMap<String, String>,
    /// call id -> pending call; entries whose result never arrives stay put
    pending_calls: HashMap<String, PendingCall>,
    /// every call id ever processed, for duplicate-replay dedup
    seen_calls: HashSet<String>,
    /// (run id, target path) -> resolved read content
    read_cache: HashMap<(String, String), String>,
}

impl Correlator {
    pub fn new(preview_cap: usize) -> Self {
        Self {
            preview_cap,
            current_runs: HashMap::new(),
            pending_calls: HashMap::new(),
            seen_calls: HashSet::new(),
            read_cache: HashMap::new(),
        }
    }

    /// Process one parsed journal entry, in file order.
    ///
    /// Returns the activity events this entry produces: zero for user
    /// messages and unknowns, one per fresh tool call, one per resolved
    /// result.
    pub fn process_entry(
        &mut self,
        session_id: &str,
        agent: &str,
        entry: &JournalEntry,
        raw: &serde_json::Value,
    ) -> Vec<ActivityEvent> {
        match entry.role() {
            MessageRole::User => {
                self.start_run(session_id, entry);
                Vec::new()
            }
            MessageRole::Assistant => self.process_tool_calls(session_id, agent, entry, raw),
            MessageRole::ToolResult => self.process_tool_result(entry, raw),
            MessageRole::Other => Vec::new(),
        }
    }

    /// A user message opens a new run and invalidates the previous run's
    /// read cache for this session.
    fn start_run(&mut self, session_id: &str, entry: &JournalEntry) {
        let Some(run_id) = entry.id.clone() else {
            return;
        };
        let previous = self.current_runs.insert(session_id.to_string(), run_id.clone());
        if let Some(prev) = previous {
            self.read_cache.retain(|(run, _), _| *run != prev);
        }
        tracing::debug!(session = %session_id, run = %run_id, "new interaction run");
    }

    fn process_tool_calls(
        &mut self,
        session_id: &str,
        agent: &str,
        entry: &JournalEntry,
        raw: &serde_json::Value,
    ) -> Vec<ActivityEvent> {
        let Some(message) = entry.message.as_ref() else {
            return Vec::new();
        };

        let mut events = Vec::new();
        let timestamp = entry.emitted_at();
        let run_id = self.current_runs.get(session_id).cloned();

        for call in message.tool_calls() {
            if call.id.is_empty() || !self.seen_calls.insert(call.id.clone()) {
                // duplicate replay of an already-processed call
                continue;
            }

            let (activity_type, detail, target) = map_tool_call(call);

            self.pending_calls.insert(
                call.id.clone(),
                PendingCall {
                    session_id: session_id.to_string(),
                    agent: agent.to_string(),
                    activity_type,
                    tool_name: call.name.clone(),
                    detail: detail.clone(),
                    target: target.clone(),
                    run_id: run_id.clone(),
                    called_at: timestamp,
                },
            );

            // the call itself, content still unresolved
            events.push(ActivityEvent {
                session_id: session_id.to_string(),
                agent: agent.to_string(),
                activity_type,
                detail,
                tool_name: Some(call.name.clone()),
                target,
                timestamp,
                run_id: run_id.clone(),
                content_preview: None,
                read_preview: None,
                raw_data: raw.clone(),
            });
        }

        events
    }

    fn process_tool_result(
        &mut self,
        entry: &JournalEntry,
        raw: &serde_json::Value,
    ) -> Vec<ActivityEvent> {
        let Some(message) = entry.message.as_ref() else {
            return Vec::new();
        };
        let Some(call_id) = message.tool_call_id.as_deref() else {
            return Vec::new();
        };
        // No pending entry: a result for a call logged before we attached
        let Some(pending) = self.pending_calls.remove(call_id) else {
            tracing::debug!(call = %call_id, "result without a pending call, ignoring");
            return Vec::new();
        };

        let content = self.cap_preview(&message.text());

        let mut read_preview = None;
        if let (Some(run), Some(target)) = (pending.run_id.as_ref(), pending.target.as_ref()) {
            let key = (run.clone(), target.clone());
            match pending.activity_type {
                ActivityType::FileRead => {
                    self.read_cache.insert(key, content.clone());
                }
                ActivityType::FileWrite => {
                    read_preview = self.read_cache.get(&key).cloned();
                }
                _ => {}
            }
        }

        vec![ActivityEvent {
            session_id: pending.session_id,
            agent: pending.agent,
            activity_type: pending.activity_type,
            detail: pending.detail,
            tool_name: Some(pending.tool_name),
            target: pending.target,
            timestamp: entry.emitted_at(),
            run_id: pending.run_id,
            content_preview: Some(content),
            read_preview,
            raw_data: raw.clone(),
        }]
    }

    fn cap_preview(&self, text: &str) -> String {
        match text.char_indices().nth(self.preview_cap) {
            Some((idx, _)) => format!("{}{}", &text[..idx], TRUNCATION_MARKER),
            None => text.to_string(),
        }
    }

    /// Number of calls still awaiting a result (diagnostics only).
    pub fn pending_count(&self) -> usize {
        self.pending_calls.len()
    }
}

// ============================================================
// Tool naming conventions
// ============================================================

/// Map a tool call onto (activity type, detail, target) by tool-name
/// convention. Browse-like names are checked before search-like ones so
/// `web_search` lands on web_browse rather than file_read.
fn map_tool_call(call: &ToolCallItem) -> (ActivityType, String, Option<String>) {
    let name = call.name.to_lowercase();
    let args = &call.arguments;

    if name_matches(&name, &["browse", "fetch", "web"]) {
        let url = string_arg(args, &["url", "uri"]);
        let detail = url.clone().unwrap_or_else(|| call.name.clone());
        return (ActivityType::WebBrowse, detail, url);
    }
    if name_matches(&name, &["send", "notify", "message", "reply"]) {
        let to = string_arg(args, &["to", "channel", "recipient", "target"]);
        let detail = match &to {
            Some(to) => format!("message to {}", to),
            None => "outbound message".to_string(),
        };
        return (ActivityType::Message, detail, to);
    }
    if name_matches(&name, &["exec", "shell", "bash", "terminal", "command"]) {
        let command = string_arg(args, &["command", "cmd", "script"]);
        let detail = command.unwrap_or_else(|| call.name.clone());
        return (ActivityType::ShellCommand, detail, None);
    }
    if name_matches(&name, &["write", "edit", "patch"]) {
        let path = string_arg(args, &["path", "file_path", "filePath", "file"]);
        let detail = match &path {
            Some(p) => format!("write {}", p),
            None => call.name.clone(),
        };
        return (ActivityType::FileWrite, detail, path);
    }
    if name_matches(&name, &["read", "view", "search", "grep", "glob", "find", "list"]) {
        let path = string_arg(args, &["path", "file_path", "filePath", "file"]);
        let detail = match &path {
            Some(p) => format!("read {}", p),
            None => call.name.clone(),
        };
        return (ActivityType::FileRead, detail, path);
    }

    (ActivityType::ToolCall, call.name.clone(), None)
}

fn name_matches(name: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| name.contains(k))
}

fn string_arg(args: &serde_json::Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|k| args.get(k).and_then(|v| v.as_str()))
        .map(|s| s.to_string())
}
