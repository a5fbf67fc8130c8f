//! aiwarden - local security monitor for AI agent runtimes
//!
//! Tails per-agent session journals, classifies every activity against the
//! threat rules, persists the results, and raises alerts for HIGH and
//! CRITICAL findings. Runs until interrupted.
//!
//! Uses XDG Base Directory specification for file locations:
//! - Database: $XDG_DATA_HOME/aiwarden/monitor.db (~/.local/share/aiwarden/monitor.db)
//! - Logs: $XDG_STATE_HOME/aiwarden/aiwarden.log (~/.local/state/aiwarden/aiwarden.log)
//! - Config: $XDG_CONFIG_HOME/aiwarden/config.toml (~/.config/aiwarden/config.toml)

use aiwarden_core::gateway::{ChannelLink, RuntimeLink};
use aiwarden_core::notifier::{Notifier, NullNotifier, WebhookNotifier};
use aiwarden_core::watch::{discover_sessions, SessionLogWatcher};
use aiwarden_core::{Config, Database, Monitor};
use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::oneshot;

#[derive(Parser)]
#[command(name = "aiwarden")]
#[command(about = "Monitor AI agent activity for security threats")]
#[command(version)]
struct Args {
    /// Path to a config file (default: $XDG_CONFIG_HOME/aiwarden/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Agents directory to watch (overrides config)
    #[arg(long)]
    agents_dir: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Discover session logs, print them, and exit without monitoring
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Ensure XDG environment variables are set before using core library
    Config::ensure_xdg_env();

    // Load configuration
    let mut config = match &args.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .context("failed to load configuration")?;

    if let Some(dir) = args.agents_dir {
        config.watcher.agents_dir = Some(dir);
    }
    if args.verbose > 0 {
        config.logging.level = "debug".to_string();
    }

    // Initialize logging
    let _log_guard =
        aiwarden_core::logging::init(&config.logging).context("failed to initialize logging")?;

    tracing::info!("aiwarden starting");

    let agents_dir = config.watcher.agents_dir();
    println!("Agents directory: {}", agents_dir.display());

    if args.once {
        return run_discovery(&agents_dir);
    }

    // Open database at XDG-compliant path
    let db_path = Config::database_path();
    tracing::info!(path = %db_path.display(), "Opening database");

    let db = Database::open(&db_path).context("failed to open database")?;
    db.migrate().context("failed to run database migrations")?;

    println!("Database: {}", db_path.display());

    // Webhook publishing is optional; detection always runs locally
    let notifier: Arc<dyn Notifier> = if config.notifier.is_ready() {
        println!(
            "Webhook notifier: enabled ({})",
            config.notifier.webhook_url.as_deref().unwrap_or("")
        );
        Arc::new(
            WebhookNotifier::new(config.notifier.clone())
                .context("failed to create webhook notifier")?,
        )
    } else {
        Arc::new(NullNotifier)
    };

    // In-process runtime link; session start/end signals arrive through it.
    // A configured gateway endpoint is served by an adapter feeding this
    // link's handle, so the daemon only reports it here.
    if let Some(url) = &config.gateway.url {
        tracing::info!(
            url = %url,
            reconnect_secs = config.gateway.reconnect_secs,
            "gateway endpoint configured"
        );
    }
    let mut link = ChannelLink::new(config.watcher.channel_capacity);
    link.connect();
    let link_rx = link
        .take_events()
        .context("runtime link event stream already taken")?;

    let watcher = SessionLogWatcher::new(config.watcher.clone());
    let (watcher_handle, watch_rx) = watcher.spawn();

    let mut monitor = Monitor::new(db, notifier);

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nShutting down...");
            let _ = shutdown_tx.send(());
        }
    });

    println!("Monitoring. Press Ctrl+C to stop.");
    println!();

    monitor.run(watch_rx, link_rx, shutdown_rx).await;

    link.disconnect();
    watcher_handle.shutdown().await;

    println!("Stopped.");
    tracing::info!("aiwarden stopped");

    Ok(())
}

/// Print what a monitoring run would watch, without starting one.
fn run_discovery(agents_dir: &std::path::Path) -> Result<()> {
    let discovered = discover_sessions(agents_dir);

    println!("Discovered {} session log(s):", discovered.len());
    for session in &discovered {
        println!(
            "  - {} [{}] {}",
            session.session_id,
            session.agent,
            session.path.display()
        );
        if let Some(model) = &session.model {
            println!("      model: {}", model);
        }
    }

    if discovered.is_empty() {
        println!();
        println!(
            "No session logs found. The monitored runtime writes them under {}",
            agents_dir.display()
        );
    }

    tracing::info!(count = discovered.len(), "discovery pass complete");
    Ok(())
}
