//! Dispatcher error types

use broker::BrokerError;
use thiserror::Error;

/// Dispatcher-specific errors
///
/// Only raised while the dispatcher is being created; once running, every
/// failure is reported through logs and metrics instead.
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// Subscription could not be established
    #[error("failed to subscribe to {channels:?}: {source}")]
    Subscribe {
        channels: Vec<String>,
        #[source]
        source: BrokerError,
    },

    /// Queue writer could not be created
    #[error("failed to create queue writer: {0}")]
    Writer(#[source] BrokerError),

    /// Mapping has no channels
    #[error("no channel mappings configured")]
    NoChannels,
}

impl DispatcherError {
    /// Create a subscribe error
    pub fn subscribe(channels: Vec<String>, source: BrokerError) -> Self {
        Self::Subscribe { channels, source }
    }
}
