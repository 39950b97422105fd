//! Messages flowing through the bridge

use bytes::Bytes;

/// One message received from a subscribed channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Channel the message was published on
    pub channel: String,

    /// Raw payload, forwarded unmodified
    pub payload: Bytes,
}

impl InboundMessage {
    pub fn new(channel: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            channel: channel.into(),
            payload: payload.into(),
        }
    }
}

/// Outcome of a single queue append
///
/// Ephemeral; only drives logging and metrics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchOutcome {
    /// Target queue
    pub queue: String,

    /// Error text when the append failed
    pub error: Option<String>,
}

impl DispatchOutcome {
    pub fn success(queue: impl Into<String>) -> Self {
        Self {
            queue: queue.into(),
            error: None,
        }
    }

    pub fn failure(queue: impl Into<String>, error: impl std::fmt::Display) -> Self {
        Self {
            queue: queue.into(),
            error: Some(error.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}
