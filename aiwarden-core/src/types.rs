//! Core domain types for aiwarden
//!
//! These types represent the normalized security data model shared by the
//! watcher, the classifier, the store, and the notifier.
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Agent** | One monitored agent instance, named after its directory under the agents root |
//! | **Session** | One agent conversation, backed by a single append-only journal file |
//! | **Interaction run** | The scope of activity triggered by one user message within a session |
//! | **Activity** | One normalized, classified unit of agent behavior (file op, command, browse, message, tool call) |
//! | **Finding** | One analyzer's severity-tagged verdict contributing to an activity's overall threat level |
//! | **Threat level** | The ordered severity scale `none < low < medium < high < critical` |
//!
//! An activity's `threat_level` is always the maximum severity among its
//! findings, or [`ThreatLevel::None`] when it has none.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================
// Threat Levels
// ============================================

/// Severity scale for findings and activities.
///
/// The derive ordering is load-bearing: aggregation takes the `max()` of
/// finding severities, so variant order must stay `None < Low < Medium <
/// High < Critical`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreatLevel {
    #[default]
    None,
    Low,
    Medium,
    High,
    Critical,
}

impl ThreatLevel {
    /// Returns the identifier used in database storage
    pub fn as_str(&self) -> &'static str {
        match self {
            ThreatLevel::None => "none",
            ThreatLevel::Low => "low",
            ThreatLevel::Medium => "medium",
            ThreatLevel::High => "high",
            ThreatLevel::Critical => "critical",
        }
    }

    /// True for levels that warrant a dedicated alert notification
    pub fn is_alerting(&self) -> bool {
        *self >= ThreatLevel::High
    }
}

impl std::fmt::Display for ThreatLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ThreatLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(ThreatLevel::None),
            "low" => Ok(ThreatLevel::Low),
            "medium" => Ok(ThreatLevel::Medium),
            "high" => Ok(ThreatLevel::High),
            "critical" => Ok(ThreatLevel::Critical),
            _ => Err(format!("unknown threat level: {}", s)),
        }
    }
}

// ============================================
// Threat Categories
// ============================================

/// The fixed set of threat dimensions the classifier reports on.
///
/// Serialized form is the stable category code (e.g. `DATA_EXFIL`) used in
/// persisted findings and alert payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ThreatCategory {
    #[serde(rename = "SECRET_EXPOSURE")]
    SecretExposure,
    #[serde(rename = "DATA_EXFIL")]
    DataExfiltration,
    #[serde(rename = "PROMPT_INJECTION")]
    PromptInjection,
    #[serde(rename = "DESTRUCTIVE_OP")]
    DestructiveOperation,
    #[serde(rename = "PRIV_ESC")]
    PrivilegeEscalation,
    #[serde(rename = "SUPPLY_CHAIN")]
    SupplyChain,
    #[serde(rename = "SENSITIVE_FILE")]
    SensitiveFileAccess,
    #[serde(rename = "SYSTEM_MOD")]
    SystemModification,
    #[serde(rename = "NET_SUSPICIOUS")]
    SuspiciousNetwork,
    #[serde(rename = "TOOL_POISONING")]
    ToolPoisoning,
}

impl ThreatCategory {
    /// Returns the stable category code
    pub fn code(&self) -> &'static str {
        match self {
            ThreatCategory::SecretExposure => "SECRET_EXPOSURE",
            ThreatCategory::DataExfiltration => "DATA_EXFIL",
            ThreatCategory::PromptInjection => "PROMPT_INJECTION",
            ThreatCategory::DestructiveOperation => "DESTRUCTIVE_OP",
            ThreatCategory::PrivilegeEscalation => "PRIV_ESC",
            ThreatCategory::SupplyChain => "SUPPLY_CHAIN",
            ThreatCategory::SensitiveFileAccess => "SENSITIVE_FILE",
            ThreatCategory::SystemModification => "SYSTEM_MOD",
            ThreatCategory::SuspiciousNetwork => "NET_SUSPICIOUS",
            ThreatCategory::ToolPoisoning => "TOOL_POISONING",
        }
    }

    /// Returns the human-readable category name
    pub fn display_name(&self) -> &'static str {
        match self {
            ThreatCategory::SecretExposure => "Secret Exposure",
            ThreatCategory::DataExfiltration => "Data Exfiltration",
            ThreatCategory::PromptInjection => "Prompt Injection",
            ThreatCategory::DestructiveOperation => "Destructive Operation",
            ThreatCategory::PrivilegeEscalation => "Privilege Escalation",
            ThreatCategory::SupplyChain => "Supply Chain Risk",
            ThreatCategory::SensitiveFileAccess => "Sensitive File Access",
            ThreatCategory::SystemModification => "System Modification",
            ThreatCategory::SuspiciousNetwork => "Suspicious Network Activity",
            ThreatCategory::ToolPoisoning => "Tool Poisoning",
        }
    }
}

impl std::fmt::Display for ThreatCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl std::str::FromStr for ThreatCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SECRET_EXPOSURE" => Ok(ThreatCategory::SecretExposure),
            "DATA_EXFIL" => Ok(ThreatCategory::DataExfiltration),
            "PROMPT_INJECTION" => Ok(ThreatCategory::PromptInjection),
            "DESTRUCTIVE_OP" => Ok(ThreatCategory::DestructiveOperation),
            "PRIV_ESC" => Ok(ThreatCategory::PrivilegeEscalation),
            "SUPPLY_CHAIN" => Ok(ThreatCategory::SupplyChain),
            "SENSITIVE_FILE" => Ok(ThreatCategory::SensitiveFileAccess),
            "SYSTEM_MOD" => Ok(ThreatCategory::SystemModification),
            "NET_SUSPICIOUS" => Ok(ThreatCategory::SuspiciousNetwork),
            "TOOL_POISONING" => Ok(ThreatCategory::ToolPoisoning),
            _ => Err(format!("unknown threat category: {}", s)),
        }
    }
}

/// One analyzer's verdict on an activity.
///
/// Findings are immutable once produced; the owning activity's threat level
/// is derived from them, never the other way around.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreatFinding {
    /// Which threat dimension fired
    pub category: ThreatCategory,
    /// Severity of this finding
    pub severity: ThreatLevel,
    /// Free-text explanation of what matched
    pub reason: String,
    /// Pattern label or secret-type label that matched, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence: Option<String>,
    /// External reference tag (e.g. a rule id), if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

impl ThreatFinding {
    pub fn new(category: ThreatCategory, severity: ThreatLevel, reason: impl Into<String>) -> Self {
        Self {
            category,
            severity,
            reason: reason.into(),
            evidence: None,
            reference: None,
        }
    }

    pub fn with_evidence(mut self, evidence: impl Into<String>) -> Self {
        self.evidence = Some(evidence.into());
        self
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }
}

// ============================================
// Sessions
// ============================================

/// Lifecycle status of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Session is in progress
    Active,
    /// Session received an explicit end signal
    Ended,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Active => "active",
            SessionStatus::Ended => "ended",
        }
    }
}

impl std::str::FromStr for SessionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(SessionStatus::Active),
            "ended" => Ok(SessionStatus::Ended),
            _ => Err(format!("unknown session status: {}", s)),
        }
    }
}

/// One agent conversation.
///
/// Sessions are created on first observed activity or on an explicit start
/// signal from the runtime link, and are never deleted by the monitor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Unique identifier (the runtime's session id)
    pub id: String,
    /// Agent directory this session was discovered under ("unknown" when
    /// only the runtime link reported it)
    pub agent: String,
    /// When the session started
    pub start_time: DateTime<Utc>,
    /// When the session ended, if it has
    pub end_time: Option<DateTime<Utc>>,
    /// Current lifecycle status
    pub status: SessionStatus,
    /// Model name, if the runtime reported one
    pub model: Option<String>,
}

impl Session {
    /// Create a new active session starting now
    pub fn started(id: impl Into<String>, agent: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            agent: agent.into(),
            start_time: Utc::now(),
            end_time: None,
            status: SessionStatus::Active,
            model: None,
        }
    }
}

// ============================================
// Activities
// ============================================

/// Normalized kind of agent behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    /// Reading a file (includes search-like tools)
    FileRead,
    /// Writing, editing, or patching a file
    FileWrite,
    /// Executing a shell command
    ShellCommand,
    /// Fetching or browsing a URL
    WebBrowse,
    /// A tool call with no recognized mapping
    ToolCall,
    /// An outbound message leaving the local trust boundary
    Message,
    /// Anything else
    Unknown,
}

impl ActivityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityType::FileRead => "file_read",
            ActivityType::FileWrite => "file_write",
            ActivityType::ShellCommand => "shell_command",
            ActivityType::WebBrowse => "web_browse",
            ActivityType::ToolCall => "tool_call",
            ActivityType::Message => "message",
            ActivityType::Unknown => "unknown",
        }
    }

    /// True for activity types whose content the agent consumes (reads,
    /// command output, fetched pages, generic tool results)
    pub fn consumes_content(&self) -> bool {
        matches!(
            self,
            ActivityType::FileRead
                | ActivityType::ShellCommand
                | ActivityType::WebBrowse
                | ActivityType::ToolCall
        )
    }

    /// True for content fetched from outside the local trust boundary
    pub fn is_external_source(&self) -> bool {
        matches!(self, ActivityType::WebBrowse | ActivityType::ToolCall)
    }
}

impl std::fmt::Display for ActivityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ActivityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "file_read" => Ok(ActivityType::FileRead),
            "file_write" => Ok(ActivityType::FileWrite),
            "shell_command" => Ok(ActivityType::ShellCommand),
            "web_browse" => Ok(ActivityType::WebBrowse),
            "tool_call" => Ok(ActivityType::ToolCall),
            "message" => Ok(ActivityType::Message),
            "unknown" => Ok(ActivityType::Unknown),
            _ => Err(format!("unknown activity type: {}", s)),
        }
    }
}

/// A raw activity event emitted by the watcher or the runtime link,
/// before classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityEvent {
    /// Session this activity belongs to
    pub session_id: String,
    /// Agent directory the session was discovered under
    pub agent: String,
    /// Normalized kind of behavior
    pub activity_type: ActivityType,
    /// Human-readable summary (command line, path, tool label)
    pub detail: String,
    /// Name of the tool that produced this activity, if any
    pub tool_name: Option<String>,
    /// Target path or URL, if any
    pub target: Option<String>,
    /// When the activity occurred
    pub timestamp: DateTime<Utc>,
    /// Interaction run this activity belongs to, if known
    pub run_id: Option<String>,
    /// Capped preview of the activity's content, if resolved
    pub content_preview: Option<String>,
    /// For writes: content of the target as read earlier in the same run
    pub read_preview: Option<String>,
    /// Complete original journal record - never loses data
    pub raw_data: serde_json::Value,
}

/// A classified activity ready for insertion, before the store assigns an id
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewActivity {
    /// Session this activity belongs to
    pub session_id: String,
    /// Normalized kind of behavior
    pub activity_type: ActivityType,
    /// Human-readable summary
    pub detail: String,
    /// Name of the tool that produced this activity, if any
    pub tool_name: Option<String>,
    /// Target path or URL, if any
    pub target: Option<String>,
    /// When the activity occurred
    pub timestamp: DateTime<Utc>,
    /// Interaction run this activity belongs to, if known
    pub run_id: Option<String>,
    /// Capped preview of the activity's content, if resolved
    pub content_preview: Option<String>,
    /// For writes: content of the target as read earlier in the same run
    pub read_preview: Option<String>,
    /// Maximum severity among `findings`, or `none` when empty
    pub threat_level: ThreatLevel,
    /// Ordered analyzer findings
    pub findings: Vec<ThreatFinding>,
    /// Deduplicated labels of secrets detected in content
    pub secrets: Vec<String>,
    /// Complete original journal record - never loses data
    pub raw_data: serde_json::Value,
}

/// A stored, classified activity record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    /// Database ID (auto-incremented)
    pub id: i64,
    /// Session this activity belongs to
    pub session_id: String,
    /// Normalized kind of behavior
    pub activity_type: ActivityType,
    /// Human-readable summary
    pub detail: String,
    /// Name of the tool that produced this activity, if any
    pub tool_name: Option<String>,
    /// Target path or URL, if any
    pub target: Option<String>,
    /// When the activity occurred
    pub timestamp: DateTime<Utc>,
    /// Interaction run this activity belongs to, if known
    pub run_id: Option<String>,
    /// Capped preview of the activity's content, if resolved
    pub content_preview: Option<String>,
    /// For writes: content of the target as read earlier in the same run
    pub read_preview: Option<String>,
    /// Maximum severity among `findings`, or `none` when empty
    pub threat_level: ThreatLevel,
    /// Ordered analyzer findings
    pub findings: Vec<ThreatFinding>,
    /// Deduplicated labels of secrets detected in content
    pub secrets: Vec<String>,
    /// Complete original journal record - never loses data
    pub raw_data: serde_json::Value,
}

// ============================================
// Session Summaries
// ============================================

/// Per-severity activity counts for one session
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SeverityHistogram {
    pub none: u64,
    pub low: u64,
    pub medium: u64,
    pub high: u64,
    pub critical: u64,
}

impl SeverityHistogram {
    /// Bump the bucket for one threat level
    pub fn record(&mut self, level: ThreatLevel) {
        self.add(level, 1);
    }

    /// Add a whole count to the bucket for one threat level
    pub fn add(&mut self, level: ThreatLevel, count: u64) {
        match level {
            ThreatLevel::None => self.none += count,
            ThreatLevel::Low => self.low += count,
            ThreatLevel::Medium => self.medium += count,
            ThreatLevel::High => self.high += count,
            ThreatLevel::Critical => self.critical += count,
        }
    }

    /// Total activities counted across all buckets
    pub fn total(&self) -> u64 {
        self.none + self.low + self.medium + self.high + self.critical
    }
}

/// Snapshot published on session start/end signals
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    /// The session record as stored
    pub session: Session,
    /// Number of stored activities for this session
    pub activity_count: u64,
    /// Per-severity breakdown recomputed from stored activities
    pub histogram: SeverityHistogram,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threat_level_ordering_is_total() {
        assert!(ThreatLevel::None < ThreatLevel::Low);
        assert!(ThreatLevel::Low < ThreatLevel::Medium);
        assert!(ThreatLevel::Medium < ThreatLevel::High);
        assert!(ThreatLevel::High < ThreatLevel::Critical);

        let max = [ThreatLevel::Low, ThreatLevel::Critical, ThreatLevel::Medium]
            .into_iter()
            .max();
        assert_eq!(max, Some(ThreatLevel::Critical));
    }

    #[test]
    fn threat_level_round_trips_through_str() {
        for level in [
            ThreatLevel::None,
            ThreatLevel::Low,
            ThreatLevel::Medium,
            ThreatLevel::High,
            ThreatLevel::Critical,
        ] {
            assert_eq!(level.as_str().parse::<ThreatLevel>(), Ok(level));
        }
        assert!("severe".parse::<ThreatLevel>().is_err());
    }

    #[test]
    fn alerting_threshold_is_high() {
        assert!(!ThreatLevel::Medium.is_alerting());
        assert!(ThreatLevel::High.is_alerting());
        assert!(ThreatLevel::Critical.is_alerting());
    }

    #[test]
    fn category_codes_round_trip() {
        let all = [
            ThreatCategory::SecretExposure,
            ThreatCategory::DataExfiltration,
            ThreatCategory::PromptInjection,
            ThreatCategory::DestructiveOperation,
            ThreatCategory::PrivilegeEscalation,
            ThreatCategory::SupplyChain,
            ThreatCategory::SensitiveFileAccess,
            ThreatCategory::SystemModification,
            ThreatCategory::SuspiciousNetwork,
            ThreatCategory::ToolPoisoning,
        ];
        for category in all {
            assert_eq!(category.code().parse::<ThreatCategory>(), Ok(category));
        }
    }

    #[test]
    fn finding_serializes_category_as_code() {
        let finding = ThreatFinding::new(
            ThreatCategory::DataExfiltration,
            ThreatLevel::High,
            "known paste service",
        )
        .with_evidence("pastebin.com");

        let json = serde_json::to_value(&finding).unwrap();
        assert_eq!(json["category"], "DATA_EXFIL");
        assert_eq!(json["severity"], "high");
        assert_eq!(json["evidence"], "pastebin.com");
        assert!(json.get("reference").is_none());
    }

    #[test]
    fn histogram_counts_by_level() {
        let mut histogram = SeverityHistogram::default();
        histogram.record(ThreatLevel::None);
        histogram.record(ThreatLevel::High);
        histogram.record(ThreatLevel::High);
        histogram.record(ThreatLevel::Critical);

        assert_eq!(histogram.none, 1);
        assert_eq!(histogram.high, 2);
        assert_eq!(histogram.critical, 1);
        assert_eq!(histogram.total(), 4);
    }

    #[test]
    fn histogram_accumulates_whole_buckets() {
        let mut histogram = SeverityHistogram::default();
        histogram.add(ThreatLevel::Medium, 3);
        histogram.add(ThreatLevel::Medium, 2);
        histogram.add(ThreatLevel::Critical, 1);
        histogram.record(ThreatLevel::Medium);

        assert_eq!(histogram.medium, 6);
        assert_eq!(histogram.critical, 1);
        assert_eq!(histogram.total(), 7);
    }
}
