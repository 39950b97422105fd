//! # Broker
//!
//! Store facility module.
//!
//! Responsibilities:
//! - Connect to the pub/sub + queue store and verify reachability
//! - Open subscriptions for the configured channels
//! - Provide queue writers (tail append)
//! - Provide an in-memory store for tests and local runs
//!
//! ## Feature Flags
//!
//! - `real-redis`: Enable the Redis broker (requires redis crate)

pub mod client;
pub mod error;
pub mod memory;

#[cfg(feature = "real-redis")]
pub mod redis_broker;

pub use client::Broker;
pub use contracts::{InboundMessage, QueueWriter, Subscription};
pub use error::{BrokerError, Result};
pub use memory::{AppendRecord, MemoryBroker, MemoryConfig, MemoryQueueWriter, MemorySubscription};

#[cfg(feature = "real-redis")]
pub use redis_broker::{RedisBroker, RedisQueueWriter, RedisSubscription};
