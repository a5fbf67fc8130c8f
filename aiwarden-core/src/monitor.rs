//! Monitor orchestrator
//!
//! Ties the pieces together: consumes activity events from the session log
//! watcher and the runtime link, classifies each one, persists it, keeps
//! session records current, and publishes notifications. Local persistence
//! always happens before publishing; a failed publish is logged and dropped,
//! never propagated into the loop.

use crate::db::Database;
use crate::error::Result;
use crate::gateway::{LinkEvent, LinkStatus};
use crate::notifier::{Alert, Notifier};
use crate::threat::{classify, ActivityInput};
use crate::types::{
    Activity, ActivityEvent, NewActivity, Session, SessionStatus, SessionSummary,
};
use crate::watch::WatchEvent;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

/// The monitoring event loop.
pub struct Monitor {
    db: Database,
    notifier: Arc<dyn Notifier>,
    last_activity: Option<DateTime<Utc>>,
}

impl Monitor {
    pub fn new(db: Database, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            db,
            notifier,
            last_activity: None,
        }
    }

    /// The backing store (reporting and tests read through this).
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Run until `shutdown` fires or an event source closes.
    ///
    /// Sources are drained before the shutdown signal is honored, so events
    /// already in flight still land in the store.
    pub async fn run(
        &mut self,
        mut watch_rx: mpsc::Receiver<WatchEvent>,
        mut link_rx: mpsc::Receiver<LinkEvent>,
        mut shutdown: oneshot::Receiver<()>,
    ) {
        tracing::info!("monitor started");
        loop {
            tokio::select! {
                biased;
                event = watch_rx.recv() => {
                    let Some(event) = event else {
                        tracing::info!("watcher stream closed, stopping monitor");
                        break;
                    };
                    self.handle_watch_event(event).await;
                }
                event = link_rx.recv() => {
                    let Some(event) = event else {
                        tracing::info!("runtime link stream closed, stopping monitor");
                        break;
                    };
                    self.handle_link_event(event).await;
                }
                _ = &mut shutdown => {
                    tracing::info!("monitor shutting down");
                    break;
                }
            }
        }
    }

    async fn handle_watch_event(&mut self, event: WatchEvent) {
        match event {
            WatchEvent::Activity(activity) => self.handle_activity(activity).await,
            WatchEvent::SessionDiscovered {
                session_id,
                agent,
                model,
            } => {
                self.handle_session_start(&session_id, Some(&agent), model)
                    .await
            }
        }
    }

    async fn handle_link_event(&mut self, event: LinkEvent) {
        match event {
            LinkEvent::Activity(activity) => self.handle_activity(activity).await,
            LinkEvent::SessionStart { id, model } => {
                self.handle_session_start(&id, None, model).await
            }
            LinkEvent::SessionEnd { id } => self.handle_session_end(&id).await,
            LinkEvent::StatusChange(status) => self.handle_status(status).await,
        }
    }

    /// Classify, persist, publish; alert on HIGH/CRITICAL.
    async fn handle_activity(&mut self, event: ActivityEvent) {
        self.last_activity = Some(event.timestamp);

        let stored = match self.classify_and_store(&event) {
            Ok(stored) => stored,
            Err(e) => {
                tracing::error!(
                    session = %event.session_id,
                    error = %e,
                    "Failed to store activity"
                );
                return;
            }
        };

        if let Err(e) = self.notifier.publish_activity(&stored).await {
            tracing::warn!(error = %e, "Failed to publish activity");
        }

        if stored.threat_level.is_alerting() {
            let alert = Alert::from_activity(&stored, &event.agent);
            tracing::warn!(
                severity = %stored.threat_level,
                session = %stored.session_id,
                reason = %alert.reason,
                "threat detected"
            );
            if let Err(e) = self.notifier.publish_alert(&alert).await {
                tracing::warn!(error = %e, "Failed to publish alert");
            }
        }
    }

    fn classify_and_store(&self, event: &ActivityEvent) -> Result<Activity> {
        let classification = classify(&ActivityInput::from_event(event));

        if self.db.find_session(&event.session_id)?.is_none() {
            let mut session = Session::started(&event.session_id, &event.agent);
            session.start_time = event.timestamp;
            self.db.upsert_session(&session)?;
            tracing::info!(
                session = %event.session_id,
                agent = %event.agent,
                "session first seen"
            );
        }

        let new_activity = NewActivity {
            session_id: event.session_id.clone(),
            activity_type: event.activity_type,
            detail: event.detail.clone(),
            tool_name: event.tool_name.clone(),
            target: event.target.clone(),
            timestamp: event.timestamp,
            run_id: event.run_id.clone(),
            content_preview: event.content_preview.clone(),
            read_preview: event.read_preview.clone(),
            threat_level: classification.severity,
            findings: classification.findings,
            secrets: classification.secrets,
            raw_data: event.raw_data.clone(),
        };

        self.db.insert_activity(&new_activity)
    }

    /// Create-or-update on a start signal, then publish a summary.
    async fn handle_session_start(
        &mut self,
        id: &str,
        agent: Option<&str>,
        model: Option<String>,
    ) {
        let result = self.upsert_started_session(id, agent, model);
        self.publish_summary(id, result).await;
    }

    fn upsert_started_session(
        &self,
        id: &str,
        agent: Option<&str>,
        model: Option<String>,
    ) -> Result<SessionSummary> {
        let mut session = match self.db.find_session(id)? {
            Some(existing) => existing,
            None => {
                tracing::info!(session = %id, agent = agent.unwrap_or("unknown"), "session started");
                Session::started(id, agent.unwrap_or("unknown"))
            }
        };
        if let Some(agent) = agent {
            if session.agent == "unknown" {
                session.agent = agent.to_string();
            }
        }
        if model.is_some() {
            session.model = model;
        }
        self.db.upsert_session(&session)?;
        self.session_summary(&session)
    }

    /// Mark ended and publish a final summary. An end signal for a session
    /// never seen still creates its record.
    async fn handle_session_end(&mut self, id: &str) {
        let result = self.upsert_ended_session(id);
        self.publish_summary(id, result).await;
    }

    fn upsert_ended_session(&self, id: &str) -> Result<SessionSummary> {
        let mut session = self
            .db
            .find_session(id)?
            .unwrap_or_else(|| Session::started(id, "unknown"));
        session.status = SessionStatus::Ended;
        session.end_time = Some(Utc::now());
        self.db.upsert_session(&session)?;
        tracing::info!(session = %id, "session ended");
        self.session_summary(&session)
    }

    fn session_summary(&self, session: &Session) -> Result<SessionSummary> {
        Ok(SessionSummary {
            session: session.clone(),
            activity_count: self.db.count_activities(&session.id)?,
            histogram: self.db.severity_histogram(&session.id)?,
        })
    }

    async fn publish_summary(&self, id: &str, result: Result<SessionSummary>) {
        match result {
            Ok(summary) => {
                if let Err(e) = self.notifier.publish_session_update(&summary).await {
                    tracing::warn!(error = %e, "Failed to publish session update");
                }
            }
            Err(e) => {
                tracing::error!(session = %id, error = %e, "Failed to update session");
            }
        }
    }

    async fn handle_status(&mut self, status: LinkStatus) {
        tracing::info!(status = %status, "runtime link status changed");
        if let Err(e) = self
            .notifier
            .publish_status(status, self.last_activity)
            .await
        {
            tracing::warn!(error = %e, "Failed to publish status");
        }
    }
}
