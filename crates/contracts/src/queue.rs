//! QueueWriter trait - Dispatcher output interface

use bytes::Bytes;

use crate::ContractError;

/// Append capability for named queues
///
/// Each call is independent; no ordering is implied across queues.
#[trait_variant::make(QueueWriter: Send)]
pub trait LocalQueueWriter {
    /// Writer name (used for logging)
    fn name(&self) -> &str;

    /// Append payload to the tail of `queue`
    ///
    /// # Errors
    /// Returns append error (should include the queue name)
    async fn append(&mut self, queue: &str, payload: &Bytes) -> Result<(), ContractError>;
}
