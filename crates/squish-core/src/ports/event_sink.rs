//! EventSink port - イベント配信の抽象化
//!
//! publish は fire-and-forget で、配信の確認は求めません。
//!
//! # 実装
//! - NoopEventSink: 何もしない
//! - FanoutEventSink: 複数の sink へ複製
//! - impls::BroadcastEventSink / impls::MemoryEventSink

use std::sync::Arc;

use crate::domain::events::DomainEvent;

pub trait EventSink: Send + Sync {
    fn publish(&self, event: DomainEvent);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEventSink;

impl EventSink for NoopEventSink {
    fn publish(&self, _event: DomainEvent) {}
}

/// Publishes every event to each inner sink, in order.
#[derive(Clone, Default)]
pub struct FanoutEventSink {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl FanoutEventSink {
    pub fn new(sinks: Vec<Arc<dyn EventSink>>) -> Self {
        Self { sinks }
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl EventSink for FanoutEventSink {
    fn publish(&self, event: DomainEvent) {
        let Some((last, rest)) = self.sinks.split_last() else {
            return;
        };
        for sink in rest {
            sink.publish(event.clone());
        }
        last.publish(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BatchCompleted, BatchId};
    use crate::impls::MemoryEventSink;
    use ulid::Ulid;

    #[test]
    fn fanout_delivers_to_every_sink() {
        let a = Arc::new(MemoryEventSink::new());
        let b = Arc::new(MemoryEventSink::new());
        let fanout = FanoutEventSink::new(vec![
            a.clone() as Arc<dyn EventSink>,
            Arc::new(NoopEventSink),
            b.clone() as Arc<dyn EventSink>,
        ]);

        fanout.publish(DomainEvent::AllImagesCompressed(BatchCompleted {
            batch_id: BatchId::from_ulid(Ulid::new()),
            succeeded: 1,
            failed: 0,
        }));

        assert_eq!(fanout.len(), 3);
        assert_eq!(a.events().len(), 1);
        assert_eq!(b.events().len(), 1);
    }

    #[test]
    fn empty_fanout_is_a_noop() {
        let fanout = FanoutEventSink::default();
        assert!(fanout.is_empty());
        fanout.publish(DomainEvent::AllImagesCompressed(BatchCompleted {
            batch_id: BatchId::from_ulid(Ulid::new()),
            succeeded: 0,
            failed: 0,
        }));
    }
}
