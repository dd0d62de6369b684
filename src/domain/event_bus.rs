//! Broadcast channel for domain events.
//!
//! [`EventBus`] wraps a [`tokio::sync::broadcast`] channel. The relay
//! publishes a [`RelayEvent`] for every session transition and upstream
//! frame, and each WebSocket observer subscribes to receive filtered events.

use tokio::sync::broadcast;

use super::RelayEvent;

/// Fan-out of relay events to `/ws` observers.
///
/// Capacity comes from `EVENT_BUS_CAPACITY`. An observer that falls more
/// than that many events behind loses the oldest ones and is told how many
/// it skipped.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<RelayEvent>,
}

impl EventBus {
    /// Creates a new `EventBus` with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes `event` and returns how many observers it reached.
    ///
    /// Zero observers is normal while nobody watches `/ws`.
    pub fn publish(&self, event: RelayEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    /// Returns a receiver for events published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<RelayEvent> {
        self.sender.subscribe()
    }
}
