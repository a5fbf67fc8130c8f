//! aiwarden-report - inspect the aiwarden activity database
//!
//! Read-only views over what the monitor has recorded:
//! - Session listing with per-severity activity breakdowns
//! - Activity listing with findings and evidence
//! - Single-session detail with its alerting activities
//!
//! Uses XDG Base Directory specification for file locations:
//! - Database: $XDG_DATA_HOME/aiwarden/monitor.db (~/.local/share/aiwarden/monitor.db)
//! - Config: $XDG_CONFIG_HOME/aiwarden/config.toml (~/.config/aiwarden/config.toml)

use aiwarden_core::{Activity, Config, Database, SessionStatus, SeverityHistogram};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "aiwarden-report")]
#[command(about = "Inspect recorded agent activity and threat findings")]
#[command(version)]
struct Args {
    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List monitored sessions with threat summaries
    Sessions {
        /// Include ended sessions
        #[arg(short, long)]
        all: bool,
    },

    /// List recorded activities, newest first
    Activities {
        /// Restrict to one session id
        #[arg(short, long)]
        session: Option<String>,

        /// Maximum rows to print
        #[arg(short, long, default_value = "50")]
        limit: usize,
    },

    /// Show one session in detail
    Show {
        /// Full session id
        session_id: String,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    Config::ensure_xdg_env();

    let config = Config::load().context("failed to load configuration")?;

    // Reporting writes to stdout; file logging only when asked for
    let _log_guard = if args.verbose {
        Some(
            aiwarden_core::logging::init(&config.logging)
                .context("failed to initialize logging")?,
        )
    } else {
        None
    };

    let db_path = Config::database_path();
    if !db_path.exists() {
        println!("Database not found at {}", db_path.display());
        println!("Run 'aiwarden' first to start recording activity.");
        return Ok(());
    }

    let db = Database::open(&db_path).context("failed to open database")?;
    db.migrate().context("failed to run database migrations")?;

    match args.command {
        Command::Sessions { all } => cmd_sessions(&db, all),
        Command::Activities { session, limit } => cmd_activities(&db, session, limit),
        Command::Show { session_id } => cmd_show(&db, &session_id),
    }
}

fn cmd_sessions(db: &Database, all: bool) -> Result<()> {
    let sessions = db.list_sessions()?;
    let shown: Vec<_> = sessions
        .iter()
        .filter(|s| all || s.status == SessionStatus::Active)
        .collect();

    if shown.is_empty() {
        if sessions.is_empty() {
            println!("No sessions recorded.");
        } else {
            println!(
                "No active sessions ({} ended; use --all to include them).",
                sessions.len()
            );
        }
        return Ok(());
    }

    println!("{} session(s):", shown.len());
    println!();
    for session in shown {
        let count = db.count_activities(&session.id)?;
        let histogram = db.severity_histogram(&session.id)?;
        println!(
            "  {}  {:<14} {:<7} {:>5} activities  {}",
            short_id(&session.id),
            session.agent,
            session.status.as_str(),
            count,
            format_levels(&histogram)
        );
    }

    Ok(())
}

fn cmd_activities(db: &Database, session: Option<String>, limit: usize) -> Result<()> {
    let activities = db.list_activities(session.as_deref(), limit)?;

    if activities.is_empty() {
        println!("No activities recorded.");
        return Ok(());
    }

    for activity in &activities {
        print_activity(activity);
    }

    Ok(())
}

fn cmd_show(db: &Database, session_id: &str) -> Result<()> {
    let Some(session) = db.find_session(session_id)? else {
        println!("Session not found: {}", session_id);
        return Ok(());
    };

    let count = db.count_activities(&session.id)?;
    let histogram = db.severity_histogram(&session.id)?;

    println!("Session {}", session.id);
    println!("========================================");
    println!("Agent:       {}", session.agent);
    println!("Status:      {}", session.status.as_str());
    println!(
        "Model:       {}",
        session.model.as_deref().unwrap_or("<unknown>")
    );
    println!(
        "Started:     {}",
        session.start_time.format("%Y-%m-%d %H:%M:%S UTC")
    );
    match session.end_time {
        Some(end) => println!("Ended:       {}", end.format("%Y-%m-%d %H:%M:%S UTC")),
        None => println!("Ended:       -"),
    }
    println!("Activities:  {}", count);
    println!("Severity:    {}", format_levels(&histogram));

    let alerting: Vec<_> = db
        .list_activities(Some(&session.id), 200)?
        .into_iter()
        .filter(|a| a.threat_level.is_alerting())
        .take(10)
        .collect();

    if !alerting.is_empty() {
        println!();
        println!("Alerting activities:");
        for activity in &alerting {
            print_activity(activity);
        }
    }

    Ok(())
}

fn print_activity(activity: &Activity) {
    println!(
        "[{}] {:<8} {:<13} {}",
        activity.timestamp.format("%Y-%m-%d %H:%M:%S"),
        activity.threat_level.as_str(),
        activity.activity_type.as_str(),
        activity.detail
    );
    for finding in &activity.findings {
        let evidence = match &finding.evidence {
            Some(evidence) => format!(" ({})", evidence),
            None => String::new(),
        };
        println!(
            "      {} {}: {}{}",
            finding.category.code(),
            finding.severity.as_str(),
            finding.reason,
            evidence
        );
    }
    if !activity.secrets.is_empty() {
        println!("      secrets: {}", activity.secrets.join(", "));
    }
}

/// First eight characters of a session id, for compact listings.
/// Ids are journal file stems and need not be ASCII.
fn short_id(id: &str) -> String {
    id.chars().take(8).collect()
}

/// Non-zero severity buckets, most severe first
fn format_levels(histogram: &SeverityHistogram) -> String {
    let mut parts = Vec::new();
    for (count, label) in [
        (histogram.critical, "critical"),
        (histogram.high, "high"),
        (histogram.medium, "medium"),
        (histogram.low, "low"),
    ] {
        if count > 0 {
            parts.push(format!("{} {}", count, label));
        }
    }
    if parts.is_empty() {
        "clean".to_string()
    } else {
        parts.join(", ")
    }
}
