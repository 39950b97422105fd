//! MappingTable - Config Loader output
//!
//! Channel name -> ordered, non-empty list of target queues.
//! Immutable after construction; read by the dispatcher without locking.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::ContractError;

/// Ordered, non-empty list of queue names
///
/// Can only be built through [`QueueList::new`], so an empty list or an
/// empty queue name never reaches the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct QueueList(Vec<String>);

impl QueueList {
    /// Validate and wrap a list of queue names, preserving order
    pub fn new(channel: &str, queues: Vec<String>) -> Result<Self, ContractError> {
        if queues.is_empty() {
            return Err(ContractError::invalid_mapping(channel, "empty queue list"));
        }
        if let Some(idx) = queues.iter().position(|q| q.is_empty()) {
            return Err(ContractError::invalid_mapping(
                channel,
                format!("empty queue name at index {idx}"),
            ));
        }
        Ok(Self(queues))
    }

    /// Queue names in configured order
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; kept for clippy's `len_without_is_empty`
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Channel -> queues routing table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct MappingTable {
    entries: BTreeMap<String, QueueList>,
}

impl MappingTable {
    /// Build a table from normalized entries
    ///
    /// # Errors
    /// - Empty channel name
    /// - Channel listed twice
    pub fn from_entries<I>(entries: I) -> Result<Self, ContractError>
    where
        I: IntoIterator<Item = (String, QueueList)>,
    {
        let mut table = BTreeMap::new();
        for (channel, queues) in entries {
            if channel.is_empty() {
                return Err(ContractError::invalid_mapping(
                    channel,
                    "channel name cannot be empty",
                ));
            }
            if table.contains_key(&channel) {
                return Err(ContractError::invalid_mapping(channel, "duplicate channel"));
            }
            table.insert(channel, queues);
        }
        Ok(Self { entries: table })
    }

    /// Resolve a channel to its target queues
    ///
    /// `None` means the channel has no mapping. That is an expected case for
    /// the caller to report, not an error.
    pub fn resolve(&self, channel: &str) -> Option<&[String]> {
        self.entries.get(channel).map(QueueList::as_slice)
    }

    /// Channel names, sorted
    pub fn channels(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    /// Iterate `(channel, queues)` in channel order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(channel, queues)| (channel.as_str(), queues.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of channel -> queue routes
    pub fn route_count(&self) -> usize {
        self.entries.values().map(QueueList::len).sum()
    }
}
