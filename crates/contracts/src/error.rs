//! Layered error definitions
//!
//! Categorized by source: config / mapping / queue

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Mapping Errors =====
    /// Mapping table construction error
    #[error("invalid mapping for channel '{channel}': {message}")]
    InvalidMapping { channel: String, message: String },

    // ===== Queue Errors =====
    /// Queue append error
    #[error("append to queue '{queue}' failed: {message}")]
    QueueWrite { queue: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create mapping error
    pub fn invalid_mapping(channel: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidMapping {
            channel: channel.into(),
            message: message.into(),
        }
    }

    /// Create queue write error
    pub fn queue_write(queue: impl Into<String>, message: impl Into<String>) -> Self {
        Self::QueueWrite {
            queue: queue.into(),
            message: message.into(),
        }
    }
}
