use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::trace;

use super::{Notifier, NotifyError, QueueEvent};

const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out of events over a `tokio::sync::broadcast` channel.
///
/// Publishing with no subscribers is not an error. Slow subscribers lag
/// and miss events rather than blocking publishers.
#[derive(Clone)]
pub struct BroadcastNotifier {
    tx: broadcast::Sender<QueueEvent>,
}

impl BroadcastNotifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn from_sender(tx: broadcast::Sender<QueueEvent>) -> Self {
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<QueueEvent> {
        self.tx.subscribe()
    }

    pub fn sender(&self) -> broadcast::Sender<QueueEvent> {
        self.tx.clone()
    }
}

impl Default for BroadcastNotifier {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[async_trait]
impl Notifier for BroadcastNotifier {
    async fn notify(&self, event: QueueEvent) -> Result<(), NotifyError> {
        if let Err(err) = self.tx.send(event) {
            trace!(event = %err.0.event, "no event subscribers");
        }
        Ok(())
    }
}
