//! In-process sync queue adapter.
//!
//! An unbounded channel is enough here: events are small, produced at
//! request rate, and consumed by a single worker task. Losing the process
//! loses queued events, which the eventual-consistency contract already
//! tolerates; the mirror heals on the next write.

use async_trait::async_trait;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::domain::ports::{SyncDispatchError, SyncQueue};
use crate::domain::SyncEvent;

/// Channel-backed implementation of the sync queue port.
#[derive(Clone)]
pub struct TokioSyncQueue {
    sender: UnboundedSender<SyncEvent>,
}

/// Create a queue and the receiver the worker drains.
pub fn sync_channel() -> (TokioSyncQueue, UnboundedReceiver<SyncEvent>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (TokioSyncQueue { sender }, receiver)
}

#[async_trait]
impl SyncQueue for TokioSyncQueue {
    async fn publish(&self, event: SyncEvent) -> Result<(), SyncDispatchError> {
        self.sender
            .send(event)
            .map_err(|err| SyncDispatchError::closed(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use crate::domain::ProjectId;

    fn event() -> SyncEvent {
        SyncEvent::ProjectDeleted {
            id: ProjectId::new("5f1d7f00c0ffee00deadbeef").expect("valid id"),
        }
    }

    #[tokio::test]
    async fn published_events_reach_the_receiver() {
        let (queue, mut receiver) = sync_channel();
        queue.publish(event()).await.expect("publish succeeds");
        let received = receiver.recv().await.expect("event delivered");
        assert_eq!(received.label(), "project_deleted");
    }

    #[tokio::test]
    async fn publish_after_worker_gone_reports_closed() {
        let (queue, receiver) = sync_channel();
        drop(receiver);
        let err = queue.publish(event()).await.expect_err("queue closed");
        assert!(matches!(err, SyncDispatchError::Closed { .. }));
    }
}
