//! Store facility abstraction
//!
//! Defines the trait the bridge uses to reach the pub/sub and queue store,
//! supporting the Redis implementation and the in-memory one used for tests.

use std::future::Future;

use contracts::{QueueWriter, Subscription};

use crate::error::Result;

/// Pub/sub + queue store
pub trait Broker: Send + Sync {
    /// Subscription handle produced by [`Broker::subscribe`]
    type Subscription: Subscription + Send + 'static;

    /// Queue writer produced by [`Broker::queue_writer`]
    type Writer: QueueWriter + Send + 'static;

    /// Connect and verify the store is reachable
    fn connect(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Open a subscription to exactly `channels`
    ///
    /// Either every channel is subscribed or an error is returned; there is
    /// no partial subscription.
    ///
    /// # Errors
    /// - `NoChannels` when `channels` is empty
    /// - `NotConnected` before `connect`
    fn subscribe(
        &self,
        channels: &[String],
    ) -> impl Future<Output = Result<Self::Subscription>> + Send;

    /// Writer appending to queues in this store
    fn queue_writer(&self) -> Result<Self::Writer>;
}
