//! Journal entry model
//!
//! Serde types for the monitored runtime's session journals: newline-delimited
//! JSON, one entry per line. Uses `#[serde(default)]` liberally so missing
//! fields degrade to `None` instead of failing the line, and `#[serde(other)]`
//! so unknown content-item types are ignored rather than rejected.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Parse one journal line into its lossless JSON value and the typed entry.
///
/// The raw value rides along so downstream storage keeps the complete
/// original record. Malformed lines are the caller's problem to skip; the
/// error names the agent whose journal produced them.
pub fn parse_line(agent: &str, line: &str) -> Result<(serde_json::Value, JournalEntry)> {
    let raw: serde_json::Value = serde_json::from_str(line).map_err(|e| Error::Parse {
        agent: agent.to_string(),
        message: format!("invalid JSON line: {}", e),
    })?;
    let entry: JournalEntry = serde_json::from_value(raw.clone()).map_err(|e| Error::Parse {
        agent: agent.to_string(),
        message: format!("unrecognized journal entry: {}", e),
    })?;
    Ok((raw, entry))
}

/// One line of a session journal.
#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct JournalEntry {
    /// Entry kind as written by the runtime ("message", "system", ...)
    #[serde(rename = "type")]
    pub entry_type: Option<String>,
    /// Entry id; for user messages this becomes the interaction-run id
    pub id: Option<String>,
    /// RFC 3339 timestamp
    pub timestamp: Option<String>,
    /// Present on message-type entries
    pub message: Option<JournalMessage>,
}

impl JournalEntry {
    /// Timestamp parsed from the entry, falling back to `now` when absent or
    /// malformed.
    pub fn emitted_at(&self) -> DateTime<Utc> {
        self.timestamp
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(Utc::now)
    }

    /// Role of the nested message, normalized.
    pub fn role(&self) -> MessageRole {
        self.message
            .as_ref()
            .and_then(|m| m.role.as_deref())
            .map(MessageRole::from_wire)
            .unwrap_or(MessageRole::Other)
    }
}

/// Nested message object on message-type entries.
#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct JournalMessage {
    /// "user", "assistant", or "toolResult"
    pub role: Option<String>,
    /// For toolResult messages: the call this result answers
    pub tool_call_id: Option<String>,
    pub content: Option<JournalContent>,
}

impl JournalMessage {
    /// All tool-call items in this message's content, in order.
    pub fn tool_calls(&self) -> Vec<&ToolCallItem> {
        match &self.content {
            Some(JournalContent::Items(items)) => items
                .iter()
                .filter_map(|item| match item {
                    ContentItem::ToolCall(call) => Some(call),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Concatenate the textual fragments of this message's content.
    pub fn text(&self) -> String {
        match &self.content {
            Some(JournalContent::Text(s)) => s.clone(),
            Some(JournalContent::Items(items)) => {
                let mut out = String::new();
                for item in items {
                    if let ContentItem::Text { text } = item {
                        if !out.is_empty() {
                            out.push('\n');
                        }
                        out.push_str(text);
                    }
                }
                out
            }
            None => String::new(),
        }
    }
}

/// Message role, tolerant of values this version does not know.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageRole {
    User,
    Assistant,
    ToolResult,
    Other,
}

impl MessageRole {
    fn from_wire(s: &str) -> Self {
        match s {
            "user" => MessageRole::User,
            "assistant" => MessageRole::Assistant,
            "toolResult" => MessageRole::ToolResult,
            _ => MessageRole::Other,
        }
    }
}

/// Message content: either a bare string or an array of typed items.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum JournalContent {
    Text(String),
    Items(Vec<ContentItem>),
}

impl Default for JournalContent {
    fn default() -> Self {
        JournalContent::Text(String::new())
    }
}

/// One typed item in a content array.
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum ContentItem {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "toolCall")]
    ToolCall(ToolCallItem),
    #[serde(rename = "thinking")]
    Thinking {
        #[serde(default)]
        #[allow(dead_code)]
        thinking: String,
    },
    // Catch-all for item types this version does not know
    #[serde(other)]
    Unknown,
}

/// A tool invocation carried in an assistant message.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct ToolCallItem {
    pub id: String,
    pub name: String,
    pub arguments: serde_json::Value,
}

// ============================================================
// Session index
// ============================================================

/// Optional per-agent `sessions.json` index. Absence is not an error; log
/// files are also discovered by directory listing.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct SessionIndex {
    pub sessions: Vec<SessionIndexEntry>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionIndexEntry {
    pub id: Option<String>,
    /// Log file name relative to the agent's sessions directory
    pub file: Option<String>,
    pub model: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_user_message() {
        let line = r#"{"type":"message","id":"run-1","timestamp":"2026-08-20T10:00:00Z","message":{"role":"user","content":[{"type":"text","text":"fix the bug"}]}}"#;
        let (_, entry) = parse_line("alpha", line).unwrap();
        assert_eq!(entry.id.as_deref(), Some("run-1"));
        assert_eq!(entry.role(), MessageRole::User);
        assert_eq!(entry.message.as_ref().unwrap().text(), "fix the bug");
    }

    #[test]
    fn parses_assistant_tool_call() {
        let line = r#"{"type":"message","id":"m2","timestamp":"2026-08-20T10:00:01Z","message":{"role":"assistant","content":[{"type":"text","text":"reading"},{"type":"toolCall","id":"call-1","name":"read","arguments":{"path":"/etc/hosts"}}]}}"#;
        let (_, entry) = parse_line("alpha", line).unwrap();
        assert_eq!(entry.role(), MessageRole::Assistant);
        let msg = entry.message.as_ref().unwrap();
        let calls = msg.tool_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].id, "call-1");
        assert_eq!(calls[0].name, "read");
        assert_eq!(calls[0].arguments["path"], "/etc/hosts");
    }

    #[test]
    fn parses_tool_result() {
        let line = r#"{"type":"message","id":"m3","timestamp":"2026-08-20T10:00:02Z","message":{"role":"toolResult","toolCallId":"call-1","content":[{"type":"text","text":"127.0.0.1 localhost"}]}}"#;
        let (_, entry) = parse_line("alpha", line).unwrap();
        assert_eq!(entry.role(), MessageRole::ToolResult);
        let msg = entry.message.as_ref().unwrap();
        assert_eq!(msg.tool_call_id.as_deref(), Some("call-1"));
        assert_eq!(msg.text(), "127.0.0.1 localhost");
    }

    #[test]
    fn unknown_item_types_are_ignored() {
        let line = r#"{"type":"message","id":"m4","message":{"role":"assistant","content":[{"type":"audio","data":"xxx"},{"type":"text","text":"ok"}]}}"#;
        let (_, entry) = parse_line("alpha", line).unwrap();
        assert_eq!(entry.message.as_ref().unwrap().text(), "ok");
    }

    #[test]
    fn unknown_role_is_other() {
        let line = r#"{"type":"message","id":"m5","message":{"role":"narrator","content":"..."}}"#;
        let (_, entry) = parse_line("alpha", line).unwrap();
        assert_eq!(entry.role(), MessageRole::Other);
    }

    #[test]
    fn missing_fields_default() {
        let (_, entry) = parse_line("alpha", r#"{"type":"system"}"#).unwrap();
        assert!(entry.id.is_none());
        assert!(entry.message.is_none());
        assert_eq!(entry.role(), MessageRole::Other);
    }

    #[test]
    fn bad_timestamp_falls_back_to_now() {
        let (_, entry) = parse_line("alpha", r#"{"id":"x","timestamp":"not-a-date"}"#).unwrap();
        let before = Utc::now();
        let at = entry.emitted_at();
        assert!(at >= before - chrono::Duration::seconds(1));
    }

    #[test]
    fn plain_string_content() {
        let line = r#"{"type":"message","id":"m6","message":{"role":"user","content":"just text"}}"#;
        let (_, entry) = parse_line("alpha", line).unwrap();
        assert_eq!(entry.message.as_ref().unwrap().text(), "just text");
    }

    #[test]
    fn malformed_line_names_the_agent() {
        let err = parse_line("beta", "this is not json").unwrap_err();
        assert!(err.to_string().contains("beta"));
        assert!(err.to_string().contains("invalid JSON line"));
    }

    #[test]
    fn session_index_parses() {
        let raw = r#"{"sessions":[{"id":"s-1","file":"s-1.jsonl","model":"gpt-5"},{"id":"s-2","file":"s-2.jsonl"}]}"#;
        let index: SessionIndex = serde_json::from_str(raw).unwrap();
        assert_eq!(index.sessions.len(), 2);
        assert_eq!(index.sessions[0].model.as_deref(), Some("gpt-5"));
        assert!(index.sessions[1].model.is_none());
    }
}
