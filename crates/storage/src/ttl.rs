//! TTL (Time-To-Live) index for efficient expiration cleanup
//!
//! This module provides TTLIndex that enables efficient queries for expired keys
//! without scanning the entire key space:
//! - Maps expiry instant → Set<storage key> using BTreeMap for sorted order
//! - find_expired() returns all keys expired at or before a given instant
//! - O(expired count) instead of O(total data)
//!
//! The index is advisory: the entry itself records its expiry and is checked
//! again before anything is removed.

use std::collections::{BTreeMap, HashSet};
use std::time::Instant;

/// TTL index: expiry instant → storage keys
#[derive(Debug, Default)]
pub struct TTLIndex {
    index: BTreeMap<Instant, HashSet<String>>,
}

impl TTLIndex {
    /// Create a new empty TTLIndex
    pub fn new() -> Self {
        Self {
            index: BTreeMap::new(),
        }
    }

    /// Add key to TTL index with given expiry instant
    pub fn insert(&mut self, expires_at: Instant, key: String) {
        self.index.entry(expires_at).or_default().insert(key);
    }

    /// Remove key from TTL index at given expiry instant
    ///
    /// Used when a key is deleted or its expiry is replaced.
    /// If the set becomes empty, removes the instant entry entirely.
    pub fn remove(&mut self, expires_at: Instant, key: &str) {
        if let Some(keys) = self.index.get_mut(&expires_at) {
            keys.remove(key);
            if keys.is_empty() {
                self.index.remove(&expires_at);
            }
        }
    }

    /// Find all keys whose expiry is at or before `now`
    pub fn find_expired(&self, now: Instant) -> Vec<String> {
        self.index
            .range(..=now)
            .flat_map(|(_, keys)| keys.iter().cloned())
            .collect()
    }

    /// Drop and return every key whose expiry is at or before `now`
    pub fn take_expired(&mut self, now: Instant) -> Vec<String> {
        let expired: Vec<Instant> = self.index.range(..=now).map(|(at, _)| *at).collect();

        let mut keys = Vec::new();
        for at in expired {
            if let Some(set) = self.index.remove(&at) {
                keys.extend(set);
            }
        }
        keys
    }

    /// Check if the index is empty
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Get the total number of keys in the index
    pub fn len(&self) -> usize {
        self.index.values().map(|keys| keys.len()).sum()
    }

    /// Get the number of distinct expiry instants
    pub fn instant_count(&self) -> usize {
        self.index.len()
    }
}
