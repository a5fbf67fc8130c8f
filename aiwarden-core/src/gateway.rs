//! Runtime gateway link
//!
//! Besides tailing journals, the monitor can attach to the agent runtime
//! itself for session lifecycle and live activity. Transports differ per
//! deployment, so the core ships only the contract ([`RuntimeLink`]), the
//! event types, and a channel-backed implementation that in-process adapters
//! and tests drive directly.

use crate::types::ActivityEvent;
use std::fmt;
use tokio::sync::mpsc;

/// Connection state of the runtime link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStatus {
    Disconnected,
    Connecting,
    Connected,
}

impl LinkStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkStatus::Disconnected => "disconnected",
            LinkStatus::Connecting => "connecting",
            LinkStatus::Connected => "connected",
        }
    }
}

impl fmt::Display for LinkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Events arriving over the runtime link.
#[derive(Debug, Clone)]
pub enum LinkEvent {
    /// A live activity reported by the runtime
    Activity(ActivityEvent),
    /// A session began
    SessionStart { id: String, model: Option<String> },
    /// A session ended
    SessionEnd { id: String },
    /// The link's connection state changed
    StatusChange(LinkStatus),
}

/// A live connection to the monitored runtime.
///
/// Implementations deliver [`LinkEvent`]s over the receiver obtained from
/// [`take_events`](RuntimeLink::take_events); the monitor selects over it
/// alongside the log watcher.
pub trait RuntimeLink: Send {
    fn connect(&mut self);
    fn reconnect(&mut self);
    fn disconnect(&mut self);
    fn current_status(&self) -> LinkStatus;

    /// Take the event stream. Yields `None` after the first call.
    fn take_events(&mut self) -> Option<mpsc::Receiver<LinkEvent>>;
}

/// In-process [`RuntimeLink`] backed by a bounded channel.
///
/// An adapter (or a test) obtains a [`LinkHandle`] and feeds events through
/// it; connection-state transitions are surfaced as [`LinkEvent::StatusChange`]
/// like any remote link would report them.
pub struct ChannelLink {
    status: LinkStatus,
    tx: mpsc::Sender<LinkEvent>,
    rx: Option<mpsc::Receiver<LinkEvent>>,
}

impl ChannelLink {
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity);
        Self {
            status: LinkStatus::Disconnected,
            tx,
            rx: Some(rx),
        }
    }

    /// Sender half for whatever feeds this link.
    pub fn handle(&self) -> LinkHandle {
        LinkHandle {
            tx: self.tx.clone(),
        }
    }

    fn transition(&mut self, status: LinkStatus) {
        if self.status == status {
            return;
        }
        self.status = status;
        tracing::debug!(status = %status, "runtime link state");
        // state changes ride the same stream as remote-reported ones;
        // a full channel drops the transition rather than blocking
        let _ = self.tx.try_send(LinkEvent::StatusChange(status));
    }
}

impl RuntimeLink for ChannelLink {
    fn connect(&mut self) {
        self.transition(LinkStatus::Connecting);
        self.transition(LinkStatus::Connected);
    }

    fn reconnect(&mut self) {
        self.transition(LinkStatus::Connecting);
        self.transition(LinkStatus::Connected);
    }

    fn disconnect(&mut self) {
        self.transition(LinkStatus::Disconnected);
    }

    fn current_status(&self) -> LinkStatus {
        self.status
    }

    fn take_events(&mut self) -> Option<mpsc::Receiver<LinkEvent>> {
        self.rx.take()
    }
}

/// Feeding side of a [`ChannelLink`].
#[derive(Clone)]
pub struct LinkHandle {
    tx: mpsc::Sender<LinkEvent>,
}

impl LinkHandle {
    /// Deliver one event; returns false once the consuming side is gone.
    pub async fn send(&self, event: LinkEvent) -> bool {
        self.tx.send(event).await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn connect_surfaces_status_transitions() {
        let mut link = ChannelLink::new(8);
        let mut rx = link.take_events().unwrap();
        assert_eq!(link.current_status(), LinkStatus::Disconnected);

        link.connect();
        assert_eq!(link.current_status(), LinkStatus::Connected);

        match rx.recv().await.unwrap() {
            LinkEvent::StatusChange(status) => assert_eq!(status, LinkStatus::Connecting),
            other => panic!("unexpected event {:?}", other),
        }
        match rx.recv().await.unwrap() {
            LinkEvent::StatusChange(status) => assert_eq!(status, LinkStatus::Connected),
            other => panic!("unexpected event {:?}", other),
        }

        link.disconnect();
        match rx.recv().await.unwrap() {
            LinkEvent::StatusChange(status) => assert_eq!(status, LinkStatus::Disconnected),
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn repeated_transition_is_not_reemitted() {
        let mut link = ChannelLink::new(8);
        let mut rx = link.take_events().unwrap();

        link.connect();
        link.connect();
        link.disconnect();

        let mut statuses = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let LinkEvent::StatusChange(status) = event {
                statuses.push(status);
            }
        }
        assert_eq!(
            statuses,
            vec![
                LinkStatus::Connecting,
                LinkStatus::Connected,
                LinkStatus::Disconnected
            ]
        );
    }

    #[tokio::test]
    async fn handle_feeds_session_lifecycle() {
        let mut link = ChannelLink::new(8);
        let mut rx = link.take_events().unwrap();
        let handle = link.handle();

        assert!(
            handle
                .send(LinkEvent::SessionStart {
                    id: "sess-9".to_string(),
                    model: Some("sonnet".to_string()),
                })
                .await
        );
        assert!(handle.send(LinkEvent::SessionEnd { id: "sess-9".to_string() }).await);

        match rx.recv().await.unwrap() {
            LinkEvent::SessionStart { id, model } => {
                assert_eq!(id, "sess-9");
                assert_eq!(model.as_deref(), Some("sonnet"));
            }
            other => panic!("unexpected event {:?}", other),
        }
        match rx.recv().await.unwrap() {
            LinkEvent::SessionEnd { id } => assert_eq!(id, "sess-9"),
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn events_stream_is_single_take() {
        let mut link = ChannelLink::new(1);
        assert!(link.take_events().is_some());
        assert!(link.take_events().is_none());
    }

    #[test]
    fn status_strings() {
        assert_eq!(LinkStatus::Connected.as_str(), "connected");
        assert_eq!(LinkStatus::Connecting.to_string(), "connecting");
        assert_eq!(LinkStatus::Disconnected.as_str(), "disconnected");
    }
}
