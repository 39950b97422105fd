//! BridgeConfig - Config Loader input/output
//!
//! `RawBridgeConfig` is what the file deserializes into; mapping values may be
//! a single queue name or a list. `BridgeConfig` is the normalized form the
//! rest of the bridge consumes.

use std::collections::BTreeMap;

use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};

use crate::MappingTable;

/// Config file as written on disk
#[derive(Debug, Clone, Deserialize)]
pub struct RawBridgeConfig {
    /// Redis connection settings
    #[serde(default)]
    pub redis: RedisConfig,

    /// Channel -> queue(s), not yet normalized
    #[serde(default)]
    pub mappings: BTreeMap<String, RawMapping>,
}

/// Mapping value before normalization
///
/// Untagged so that both `channel: queue` and `channel: [q1, q2]` parse;
/// anything else lands in `Invalid` and is reported by the loader.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawMapping {
    /// Single queue
    Single(String),
    /// Many queues
    Many(Vec<RawQueueEntry>),
    /// Neither a string nor a list
    Invalid(IgnoredAny),
}

/// One element of a list-form mapping
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawQueueEntry {
    Name(String),
    Invalid(IgnoredAny),
}

/// Normalized bridge configuration
#[derive(Debug, Clone, Serialize)]
pub struct BridgeConfig {
    /// Redis connection settings
    pub redis: RedisConfig,

    /// Channel -> queues routing table
    pub mappings: MappingTable,
}

/// Redis connection settings
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Server host
    #[serde(default = "default_redis_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_redis_port")]
    pub port: u16,

    /// Password (empty = no AUTH); falls back to `REDIS_PASSWORD`
    #[serde(default)]
    pub password: String,

    /// Database index
    #[serde(default)]
    pub db: i64,
}

fn default_redis_host() -> String {
    "localhost".to_string()
}

fn default_redis_port() -> u16 {
    6379
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            host: default_redis_host(),
            port: default_redis_port(),
            password: String::new(),
            db: 0,
        }
    }
}

impl RedisConfig {
    /// `host:port`
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Password as an option (None when empty)
    pub fn password(&self) -> Option<&str> {
        if self.password.is_empty() {
            None
        } else {
            Some(&self.password)
        }
    }
}

impl std::fmt::Debug for RedisConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("password", &self.password().map(|_| "***"))
            .field("db", &self.db)
            .finish()
    }
}
