use aiwarden_core::types::{
    ActivityType, NewActivity, Session, ThreatCategory, ThreatFinding, ThreatLevel,
};
use aiwarden_core::Database;
use chrono::Utc;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

struct CliTestEnv {
    _temp_dir: TempDir,
    home: PathBuf,
    xdg_data: PathBuf,
    xdg_config: PathBuf,
    xdg_state: PathBuf,
}

impl CliTestEnv {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let base = temp_dir.path().to_path_buf();
        let home = base.join("home");
        let xdg_data = base.join("xdg-data");
        let xdg_config = base.join("xdg-config");
        let xdg_state = base.join("xdg-state");

        fs::create_dir_all(&home).expect("failed to create HOME");
        fs::create_dir_all(&xdg_data).expect("failed to create XDG_DATA_HOME");
        fs::create_dir_all(&xdg_config).expect("failed to create XDG_CONFIG_HOME");
        fs::create_dir_all(&xdg_state).expect("failed to create XDG_STATE_HOME");

        Self {
            _temp_dir: temp_dir,
            home,
            xdg_data,
            xdg_config,
            xdg_state,
        }
    }

    fn db_path(&self) -> PathBuf {
        self.xdg_data.join("aiwarden/monitor.db")
    }

    /// Lay out a session journal the way the monitored runtime does,
    /// copied from the core fixture set.
    fn seed_session_log(&self, agent: &str, session_id: &str, fixture: &str) {
        let source = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("../aiwarden-core/tests/fixtures/openclaw")
            .join(fixture);
        let target = self
            .home
            .join(".openclaw/agents")
            .join(agent)
            .join("sessions")
            .join(format!("{}.jsonl", session_id));

        fs::create_dir_all(target.parent().expect("missing fixture parent"))
            .expect("failed to create agents directories");
        fs::copy(source, target).expect("failed to copy session fixture");
    }
}

fn run_bin(env: &CliTestEnv, bin_name: &str, args: &[&str]) -> Output {
    let bin_path = match bin_name {
        "aiwarden" => PathBuf::from(assert_cmd::cargo::cargo_bin!("aiwarden")),
        "aiwarden-report" => PathBuf::from(assert_cmd::cargo::cargo_bin!("aiwarden-report")),
        _ => panic!("unsupported binary in test harness: {bin_name}"),
    };

    let mut command = Command::new(bin_path);

    command
        .args(args)
        .env("HOME", &env.home)
        .env("XDG_DATA_HOME", &env.xdg_data)
        .env("XDG_CONFIG_HOME", &env.xdg_config)
        .env("XDG_STATE_HOME", &env.xdg_state)
        .output()
        .unwrap_or_else(|e| panic!("failed to execute {bin_name}: {e}"))
}

fn assert_success(bin_name: &str, args: &[&str], output: &Output) {
    if output.status.success() {
        return;
    }

    let rendered_args = args
        .iter()
        .map(|arg| OsString::from(arg).to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ");
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    panic!(
        "{bin_name} {rendered_args} failed\nstatus: {}\nstdout:\n{}\nstderr:\n{}",
        output.status, stdout, stderr
    );
}

/// Open the env's database the way the monitor would, creating it if needed.
fn seed_database(env: &CliTestEnv) -> Database {
    let db = Database::open(&env.db_path()).expect("failed to open db");
    db.migrate().expect("failed to migrate db");
    db
}

fn seed_critical_activity(db: &Database, session_id: &str, agent: &str) {
    let session = Session::started(session_id, agent);
    db.upsert_session(&session).expect("failed to insert session");

    let finding = ThreatFinding::new(
        ThreatCategory::DestructiveOperation,
        ThreatLevel::Critical,
        "recursive delete aimed at the filesystem root",
    )
    .with_evidence("rm root wipe");

    let activity = NewActivity {
        session_id: session_id.to_string(),
        activity_type: ActivityType::ShellCommand,
        detail: "rm -rf /".to_string(),
        tool_name: Some("exec".to_string()),
        target: None,
        timestamp: Utc::now(),
        run_id: Some("run-1".to_string()),
        content_preview: None,
        read_preview: None,
        threat_level: ThreatLevel::Critical,
        findings: vec![finding],
        secrets: Vec::new(),
        raw_data: serde_json::json!({}),
    };
    db.insert_activity(&activity)
        .expect("failed to insert activity");
}

#[test]
fn report_handles_missing_database() {
    let env = CliTestEnv::new();

    let output = run_bin(&env, "aiwarden-report", &["sessions"]);
    assert_success("aiwarden-report", &["sessions"], &output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("Database not found"),
        "expected missing-database notice, got:\n{stdout}"
    );
}

#[test]
fn discovery_pass_lists_seeded_session_logs() {
    let env = CliTestEnv::new();
    env.seed_session_log("alpha", "sess-1", "exfil-session.jsonl");

    let output = run_bin(&env, "aiwarden", &["--once"]);
    assert_success("aiwarden", &["--once"], &output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("Discovered 1 session log(s)"),
        "expected discovery summary, got:\n{stdout}"
    );
    assert!(stdout.contains("sess-1"));
    assert!(stdout.contains("[alpha]"));
}

#[test]
fn discovery_pass_without_agents_dir_is_clean() {
    let env = CliTestEnv::new();

    let output = run_bin(&env, "aiwarden", &["--once"]);
    assert_success("aiwarden", &["--once"], &output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Discovered 0 session log(s)"));
    assert!(stdout.contains("No session logs found"));
}

#[test]
fn report_lists_sessions_and_activities() {
    let env = CliTestEnv::new();
    {
        let db = seed_database(&env);
        seed_critical_activity(&db, "sess-cli-1", "alpha");
    }

    let sessions = run_bin(&env, "aiwarden-report", &["sessions"]);
    assert_success("aiwarden-report", &["sessions"], &sessions);
    let stdout = String::from_utf8_lossy(&sessions.stdout);
    assert!(stdout.contains("1 session(s):"), "got:\n{stdout}");
    assert!(stdout.contains("alpha"));
    assert!(stdout.contains("1 critical"));

    let activities = run_bin(
        &env,
        "aiwarden-report",
        &["activities", "--session", "sess-cli-1"],
    );
    assert_success("aiwarden-report", &["activities"], &activities);
    let stdout = String::from_utf8_lossy(&activities.stdout);
    assert!(stdout.contains("rm -rf /"));
    assert!(stdout.contains("DESTRUCTIVE_OP critical"));
    assert!(stdout.contains("rm root wipe"));

    let show = run_bin(&env, "aiwarden-report", &["show", "sess-cli-1"]);
    assert_success("aiwarden-report", &["show", "sess-cli-1"], &show);
    let stdout = String::from_utf8_lossy(&show.stdout);
    assert!(stdout.contains("Session sess-cli-1"));
    assert!(stdout.contains("Agent:       alpha"));
    assert!(stdout.contains("Alerting activities:"));
}

#[test]
fn sessions_listing_handles_multibyte_session_ids() {
    let env = CliTestEnv::new();
    {
        let db = seed_database(&env);
        // journal file stems are arbitrary, ids are not always ASCII
        seed_critical_activity(&db, "日本語セッション記録", "alpha");
    }

    let output = run_bin(&env, "aiwarden-report", &["sessions"]);
    assert_success("aiwarden-report", &["sessions"], &output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("日本語セッション"),
        "expected truncated session id, got:\n{stdout}"
    );
    assert!(stdout.contains("1 critical"));
}

#[test]
fn show_reports_unknown_session() {
    let env = CliTestEnv::new();
    {
        seed_database(&env);
    }

    let output = run_bin(&env, "aiwarden-report", &["show", "no-such-session"]);
    assert_success("aiwarden-report", &["show", "no-such-session"], &output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Session not found: no-such-session"));
}

#[test]
fn ensure_fixture_layout_matches_discovery() {
    // guards the seed helper against fixture renames
    let source = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../aiwarden-core/tests/fixtures/openclaw/exfil-session.jsonl");
    assert!(
        Path::new(&source).exists(),
        "core fixture moved: {}",
        source.display()
    );
}
