//! BroadcastEventSink - tokio broadcast によるリアルタイム配信
//!
//! 購読者がいない／遅れている場合でも publish は失敗しません
//! （exactly-once 配信は保証しない）。

use tokio::sync::broadcast;
use tracing::debug;

use crate::domain::events::DomainEvent;
use crate::ports::EventSink;

pub struct BroadcastEventSink {
    tx: broadcast::Sender<DomainEvent>,
}

impl BroadcastEventSink {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Receives every event published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for BroadcastEventSink {
    fn default() -> Self {
        Self::new(256)
    }
}

impl EventSink for BroadcastEventSink {
    fn publish(&self, event: DomainEvent) {
        let name = event.name();
        if self.tx.send(event).is_err() {
            debug!(event = name, "no subscribers, event dropped");
        }
    }
}
