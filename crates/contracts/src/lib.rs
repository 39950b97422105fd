//! # Contracts
//!
//! Frozen interface contracts shared by every bridge crate.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Data flow
//! - `Subscription` yields `InboundMessage`s in delivery order
//! - `MappingTable` resolves a channel to its ordered `QueueList`
//! - `QueueWriter` appends the unmodified payload to each queue

mod config;
mod error;
mod mapping;
mod message;
mod queue;
mod subscription;

pub use config::*;
pub use error::*;
pub use mapping::{MappingTable, QueueList};
pub use message::{DispatchOutcome, InboundMessage};
pub use queue::*;
pub use subscription::*;
