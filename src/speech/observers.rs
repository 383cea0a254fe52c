//! Broadcast hub for live observers.

use tokio::sync::broadcast;
use tracing::debug;

use crate::models::live::LiveEvent;

/// Default number of events buffered per observer before it lags.
pub const DEFAULT_CAPACITY: usize = 64;

/// Fan-out of [`LiveEvent`]s to every connected observer.
///
/// Publishing never blocks and never fails; with no observers the event is
/// dropped.
#[derive(Debug, Clone)]
pub struct ObserverHub {
    tx: broadcast::Sender<LiveEvent>,
}

impl ObserverHub {
    /// Create a hub buffering up to `capacity` events per observer.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Deliver `event` to all current observers.
    pub fn publish(&self, event: LiveEvent) {
        match self.tx.send(event) {
            Ok(receivers) => debug!(receivers, "live event published"),
            Err(_) => debug!("live event dropped: no observers"),
        }
    }

    /// Register a new observer.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<LiveEvent> {
        self.tx.subscribe()
    }

    /// Number of connected observers.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for ObserverHub {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
