//! ShutdownCoordinator - cancellation and completion signalling
//!
//! Two one-shot signals shared between the controlling task and the
//! dispatcher task:
//!
//! ```text
//!  ShutdownCoordinator ──cancel──► CancellationToken ──► Dispatcher loop
//!          ▲                                                  │
//!          └──────── watch<DispatcherState> (Stopped) ◄───────┘
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Dispatcher lifecycle
///
/// Transitions only move forward: `Idle → Running → Draining → Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DispatcherState {
    /// Constructed, not yet running
    Idle,
    /// Subscription live, draining messages
    Running,
    /// Stop observed; finishing the in-flight fan-out, then releasing the
    /// subscription
    Draining,
    /// Terminal; completion signal
    Stopped,
}

impl std::fmt::Display for DispatcherState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Draining => "draining",
            Self::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Dispatcher side of the shutdown signals
///
/// Owned by exactly one dispatcher. Dropping it (including by a panicking
/// task) marks the dispatcher `Stopped` so waiters are never stranded.
pub struct DispatchSignals {
    token: CancellationToken,
    state_tx: watch::Sender<DispatcherState>,
}

impl DispatchSignals {
    /// Cancellation token observed by the dispatcher loop
    pub fn cancellation(&self) -> &CancellationToken {
        &self.token
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Move to `next` if it is ahead of the current state
    ///
    /// Returns false when the transition was ignored.
    pub fn transition(&self, next: DispatcherState) -> bool {
        self.state_tx.send_if_modified(|state| {
            if next > *state {
                debug!(from = %state, to = %next, "Dispatcher state transition");
                *state = next;
                true
            } else {
                false
            }
        })
    }
}

impl Drop for DispatchSignals {
    fn drop(&mut self) {
        if self.transition(DispatcherState::Stopped) {
            warn!("Dispatcher signals dropped before reaching stopped state");
        }
    }
}

/// Controlling side of the shutdown signals
///
/// Cheap to clone; all clones refer to the same dispatcher.
#[derive(Clone)]
pub struct ShutdownCoordinator {
    token: CancellationToken,
    requested: Arc<AtomicBool>,
    state_rx: watch::Receiver<DispatcherState>,
}

impl ShutdownCoordinator {
    /// Create a coordinator and the matching dispatcher-side signals
    pub fn new() -> (Self, DispatchSignals) {
        let token = CancellationToken::new();
        let (state_tx, state_rx) = watch::channel(DispatcherState::Idle);

        let coordinator = Self {
            token: token.clone(),
            requested: Arc::new(AtomicBool::new(false)),
            state_rx,
        };
        (coordinator, DispatchSignals { token, state_tx })
    }

    /// Ask the dispatcher to stop accepting messages
    ///
    /// Idempotent: returns true only for the call that actually fired the
    /// cancellation signal.
    pub fn request_shutdown(&self) -> bool {
        if self.requested.swap(true, Ordering::AcqRel) {
            debug!("Shutdown already requested");
            return false;
        }
        info!("Shutting down gracefully...");
        self.token.cancel();
        true
    }

    pub fn is_shutdown_requested(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Current dispatcher state
    pub fn state(&self) -> DispatcherState {
        *self.state_rx.borrow()
    }

    pub fn is_complete(&self) -> bool {
        self.state() == DispatcherState::Stopped
    }

    /// Wait until the dispatcher reaches `Stopped`
    ///
    /// No timeout: in-flight appends are bounded by the store client.
    pub async fn await_completion(&self) {
        let mut state_rx = self.state_rx.clone();
        if state_rx
            .wait_for(|state| *state == DispatcherState::Stopped)
            .await
            .is_err()
        {
            warn!("Dispatcher signals closed without completion");
        }
    }

    /// Request shutdown and wait for completion
    pub async fn shutdown(&self) {
        self.request_shutdown();
        self.await_completion().await;
        info!("Dispatcher shutdown complete");
    }
}
