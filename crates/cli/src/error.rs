//! Error types for CLI operations.

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Store unreachable at startup
    #[error("Failed to connect to Redis at {address}: {message}")]
    RedisConnection { address: String, message: String },

    /// Subscription could not be established at startup
    #[error("Failed to subscribe to channels: {message}")]
    Subscribe { message: String },

    /// Subscription ended without a shutdown request
    #[error("Subscription ended unexpectedly after {messages} messages")]
    SubscriptionLost { messages: u64 },

    /// Dispatcher task did not finish cleanly
    #[error("Error during shutdown: {message}")]
    Shutdown { message: String },
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn redis_connection(address: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RedisConnection {
            address: address.into(),
            message: message.into(),
        }
    }

    pub fn subscribe(message: impl Into<String>) -> Self {
        Self::Subscribe {
            message: message.into(),
        }
    }

    pub fn subscription_lost(messages: u64) -> Self {
        Self::SubscriptionLost { messages }
    }

    pub fn shutdown(message: impl Into<String>) -> Self {
        Self::Shutdown {
            message: message.into(),
        }
    }
}
