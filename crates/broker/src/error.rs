//! Broker error types

use contracts::ContractError;
use thiserror::Error;

/// Broker specific error
#[derive(Debug, Error)]
pub enum BrokerError {
    /// Store unreachable or handshake failed
    #[error("failed to connect to {address}: {message}")]
    ConnectionFailed { address: String, message: String },

    /// Operation attempted before `connect`
    #[error("broker not connected")]
    NotConnected,

    /// Subscribe command rejected
    #[error("failed to subscribe to channels {channels:?}: {message}")]
    SubscribeFailed {
        channels: Vec<String>,
        message: String,
    },

    /// Nothing to subscribe to
    #[error("no channel mappings configured")]
    NoChannels,

    /// Wrapped ContractError
    #[error(transparent)]
    Contract(#[from] ContractError),
}

impl BrokerError {
    /// Create connection error
    pub fn connection(address: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConnectionFailed {
            address: address.into(),
            message: message.into(),
        }
    }

    /// Create subscribe error
    pub fn subscribe(channels: &[String], message: impl Into<String>) -> Self {
        Self::SubscribeFailed {
            channels: channels.to_vec(),
            message: message.into(),
        }
    }
}

/// Result alias
pub type Result<T> = std::result::Result<T, BrokerError>;
