//! Subscription trait - live interest in a set of channels
//!
//! Decouples the dispatcher from the concrete pub/sub facility, so Redis and
//! in-memory subscriptions are driven by the same loop.

use crate::{ContractError, InboundMessage};

/// Live subscription handle
///
/// # Example
///
/// ```ignore
/// let mut sub = broker.subscribe(&["orders".to_string()]).await?;
/// while let Some(msg) = sub.next_message().await {
///     println!("{} -> {} bytes", msg.channel, msg.payload.len());
/// }
/// sub.close().await?;
/// ```
#[trait_variant::make(Subscription: Send)]
pub trait LocalSubscription {
    /// Channel names this subscription was opened against
    fn channels(&self) -> &[String];

    /// Wait for the next message
    ///
    /// Returns `None` once the subscription has ended or been closed.
    /// Must be cancel-safe: dropping the future before it completes must not
    /// lose a message.
    async fn next_message(&mut self) -> Option<InboundMessage>;

    /// Close the subscription and release its resources
    ///
    /// Idempotent. Messages still queued are discarded.
    async fn close(&mut self) -> Result<(), ContractError>;
}
