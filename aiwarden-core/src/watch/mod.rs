//! Session log watching
//!
//! Discovers per-agent session journals under the agents root, tails them
//! incrementally, and turns new journal entries into normalized activity
//! events. Two redundant triggers drive reads: filesystem change
//! notifications (inotify on Linux, debounced) and a periodic discovery tick.
//! Native recursive watching is not guaranteed everywhere, so both paths are
//! idempotent against re-seeing an already-tracked file.
//!
//! All correlation state is owned by a single spawned task; events flow out
//! over a bounded channel returned from [`SessionLogWatcher::spawn`].

pub mod correlate;
pub mod journal;
pub mod tailer;

pub use correlate::Correlator;
pub use tailer::{discover_sessions, DiscoveredSession, FileTailer};

use crate::config::WatcherConfig;
use crate::error::{Error, Result};
use crate::types::ActivityEvent;
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// How often pending debounced paths are checked for readiness.
const DEBOUNCE_TICK: Duration = Duration::from_millis(50);

/// Events delivered to the monitor.
#[derive(Debug, Clone)]
pub enum WatchEvent {
    /// A normalized, correlated activity from a session journal
    Activity(ActivityEvent),
    /// A session journal was found and is now being tailed
    SessionDiscovered {
        session_id: String,
        agent: String,
        model: Option<String>,
    },
}

/// Watches the agents root for session journals.
pub struct SessionLogWatcher {
    config: WatcherConfig,
}

impl SessionLogWatcher {
    pub fn new(config: WatcherConfig) -> Self {
        Self { config }
    }

    /// Start the watch task.
    ///
    /// Returns a handle for shutdown plus the event stream. The first
    /// discovery pass runs immediately; files found there start at their
    /// current end, so history is never replayed.
    pub fn spawn(self) -> (WatcherHandle, mpsc::Receiver<WatchEvent>) {
        let (events_tx, events_rx) = mpsc::channel(self.config.channel_capacity);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(watch_loop(self.config, events_tx, shutdown_rx));
        (
            WatcherHandle {
                shutdown_tx: Some(shutdown_tx),
                task,
            },
            events_rx,
        )
    }
}

/// Handle to a running watch task.
pub struct WatcherHandle {
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl WatcherHandle {
    /// Stop watching. Once this returns, the filesystem watcher is dropped,
    /// the discovery timer is cancelled, and no further events are delivered.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        let _ = self.task.await;
    }
}

async fn watch_loop(
    config: WatcherConfig,
    events: mpsc::Sender<WatchEvent>,
    mut shutdown: oneshot::Receiver<()>,
) {
    let agents_dir = config.agents_dir();
    let mut state = WatchLoopState {
        tailer: FileTailer::new(),
        correlator: Correlator::new(config.content_preview_chars),
        events,
    };

    // The sender side stays alive for the whole loop so a watcher attached
    // after startup (agents dir created later) still delivers.
    let (fs_tx, mut fs_rx) = mpsc::channel::<notify::Event>(512);
    let mut fs_watcher = attach_fs_watcher(&agents_dir, fs_tx.clone());

    let mut discovery = tokio::time::interval(Duration::from_secs(config.poll_interval_secs));
    discovery.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    let debounce = Duration::from_millis(config.debounce_ms);
    let mut pending: HashMap<PathBuf, Instant> = HashMap::new();

    'run: loop {
        tokio::select! {
            _ = &mut shutdown => break 'run,
            _ = discovery.tick() => {
                if fs_watcher.is_none() {
                    fs_watcher = attach_fs_watcher(&agents_dir, fs_tx.clone());
                }
                if !state.sweep(&agents_dir).await {
                    break 'run;
                }
            }
            Some(event) = fs_rx.recv() => {
                for path in event.paths {
                    if is_journal_path(&path) {
                        pending.insert(path, Instant::now());
                    }
                }
            }
            _ = tokio::time::sleep(DEBOUNCE_TICK) => {
                let now = Instant::now();
                let ready: Vec<PathBuf> = pending
                    .iter()
                    .filter(|(_, seen)| now.duration_since(**seen) >= debounce)
                    .map(|(path, _)| path.clone())
                    .collect();
                for path in ready {
                    pending.remove(&path);
                    if !state.handle_change(&agents_dir, &path).await {
                        break 'run;
                    }
                }
            }
        }
    }

    drop(fs_watcher);
    tracing::info!("session log watcher stopped");
}

/// All mutable tailing/correlation state, owned by the watch task.
struct WatchLoopState {
    tailer: FileTailer,
    correlator: Correlator,
    events: mpsc::Sender<WatchEvent>,
}

impl WatchLoopState {
    /// Full discovery pass plus a read of every tracked file.
    /// Returns false once the event receiver is gone.
    async fn sweep(&mut self, agents_dir: &Path) -> bool {
        for discovered in tailer::discover_sessions(agents_dir) {
            if !self.begin_watching(&discovered).await {
                return false;
            }
        }

        let paths: Vec<PathBuf> = self.tailer.tracked().map(|s| s.path.clone()).collect();
        for path in paths {
            if !self.read_and_forward(&path).await {
                return false;
            }
        }
        true
    }

    async fn begin_watching(&mut self, discovered: &DiscoveredSession) -> bool {
        match self.tailer.track(discovered) {
            Ok(true) => {
                self.forward(WatchEvent::SessionDiscovered {
                    session_id: discovered.session_id.clone(),
                    agent: discovered.agent.clone(),
                    model: discovered.model.clone(),
                })
                .await
            }
            Ok(false) => true,
            Err(e) => {
                tracing::warn!(
                    path = %discovered.path.display(),
                    error = %e,
                    "failed to start watching session log"
                );
                true
            }
        }
    }

    /// A debounced change notification for one path.
    async fn handle_change(&mut self, agents_dir: &Path, path: &Path) -> bool {
        if !self.tailer.is_tracked(path) {
            // a journal that appeared between discovery ticks
            match discovered_from_path(agents_dir, path) {
                Some(discovered) => {
                    if !self.begin_watching(&discovered).await {
                        return false;
                    }
                }
                None => return true,
            }
        }
        self.read_and_forward(path).await
    }

    async fn read_and_forward(&mut self, path: &Path) -> bool {
        let lines = match self.tailer.read_new_lines(path) {
            Ok(lines) => lines,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to read session log");
                return true;
            }
        };
        if lines.is_empty() {
            return true;
        }

        let (session_id, agent) = match self.tailer.state(path) {
            Some(state) => (state.session_id.clone(), state.agent.clone()),
            None => return true,
        };

        for line in lines {
            let (raw, entry) = match journal::parse_line(&agent, &line) {
                Ok(parsed) => parsed,
                Err(e) => {
                    tracing::warn!(session = %session_id, error = %e, "skipping journal line");
                    continue;
                }
            };

            for activity in self.correlator.process_entry(&session_id, &agent, &entry, &raw) {
                if !self.forward(WatchEvent::Activity(activity)).await {
                    return false;
                }
            }
        }
        true
    }

    async fn forward(&mut self, event: WatchEvent) -> bool {
        if self.events.send(event).await.is_err() {
            tracing::debug!("event receiver dropped, stopping watcher");
            return false;
        }
        true
    }
}

/// Attach a recursive filesystem watcher over the agents root.
///
/// Missing directory or watcher failure degrades to discovery polling only,
/// retried on the next tick.
fn attach_fs_watcher(
    agents_dir: &Path,
    tx: mpsc::Sender<notify::Event>,
) -> Option<RecommendedWatcher> {
    if !agents_dir.is_dir() {
        tracing::debug!(
            path = %agents_dir.display(),
            "agents directory not present, discovery polling only"
        );
        return None;
    }

    match try_attach_fs_watcher(agents_dir, tx) {
        Ok(watcher) => {
            tracing::info!(path = %agents_dir.display(), "watching agents directory");
            Some(watcher)
        }
        Err(e) => {
            tracing::warn!(
                path = %agents_dir.display(),
                error = %e,
                "failed to watch agents directory, discovery polling only"
            );
            None
        }
    }
}

/// Set up the notify backend and subscribe the agents root.
fn try_attach_fs_watcher(
    agents_dir: &Path,
    tx: mpsc::Sender<notify::Event>,
) -> Result<RecommendedWatcher> {
    let mut watcher = RecommendedWatcher::new(
        move |res: std::result::Result<notify::Event, notify::Error>| {
            if let Ok(event) = res {
                let _ = tx.blocking_send(event);
            }
        },
        notify::Config::default(),
    )
    .map_err(|e| Error::Watch(e.to_string()))?;

    watcher
        .watch(agents_dir, RecursiveMode::Recursive)
        .map_err(|e| Error::Watch(e.to_string()))?;

    Ok(watcher)
}

fn is_journal_path(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("jsonl")
}

/// Derive a session from `<agents_dir>/<agent>/sessions/<id>.jsonl`.
fn discovered_from_path(agents_dir: &Path, path: &Path) -> Option<DiscoveredSession> {
    if !is_journal_path(path) || !path.is_file() {
        return None;
    }
    let sessions_dir = path.parent()?;
    if sessions_dir.file_name()?.to_str()? != "sessions" {
        return None;
    }
    let agent_dir = sessions_dir.parent()?;
    if agent_dir.parent()? != agents_dir {
        return None;
    }
    Some(DiscoveredSession {
        path: path.to_path_buf(),
        session_id: path.file_stem()?.to_str()?.to_string(),
        agent: agent_dir.file_name()?.to_str()?.to_string(),
        model: None,
    })
}
