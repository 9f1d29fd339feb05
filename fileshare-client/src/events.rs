//! In-process notification bus
//!
//! Replaces window-level events with an injectable broadcast channel so the
//! gateway, the session machine and tests all see the same deliveries.

use tokio::sync::broadcast;

/// Process-wide notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEvent {
    /// A token was rejected; the session must end
    AuthInvalid,
    /// The signed-in user changed their profile; identity must be refetched
    ProfileUpdated,
}

#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<AppEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(64);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.tx.subscribe()
    }

    /// Deliver an event once to every current subscriber
    ///
    /// Returns the number of subscribers reached; zero is not an error.
    pub fn publish(&self, event: AppEvent) -> usize {
        tracing::debug!(?event, "Publishing event");
        self.tx.send(event).unwrap_or(0)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
