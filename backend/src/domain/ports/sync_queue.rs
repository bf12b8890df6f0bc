//! Port carrying domain events from mutation engines to the sync worker.

use async_trait::async_trait;

use crate::domain::SyncEvent;

use super::define_port_error;

define_port_error! {
    /// Dispatch errors raised by sync queue adapters.
    pub enum SyncDispatchError {
        /// The queue no longer accepts events (worker gone).
        Closed { message: String } => "sync queue closed: {message}",
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SyncQueue: Send + Sync {
    /// Enqueue an event for the reference sync worker.
    ///
    /// Publishing happens after the primary write has committed; a dispatch
    /// failure is logged by the caller and never converts the committed
    /// write into an API error.
    async fn publish(&self, event: SyncEvent) -> Result<(), SyncDispatchError>;
}
