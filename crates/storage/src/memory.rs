//! In-process key-value backend
//!
//! Replaces the network store with a DashMap of typed structures.
//! Reads only lock the target shard, writes only lock the target shard.
//!
//! # Design
//!
//! - DashMap: sharded by key, shard count from [`InMemoryConfig`]
//! - FxHashSet / [`SortedSet`]: unordered and score-ordered membership
//! - Expiry is lazy: every access first drops the key if its deadline passed
//! - [`TTLIndex`] lets [`InMemoryBackend::purge_expired`] find expired keys
//!   without a full scan
//!
//! A key holds exactly one structure. Using it as another fails with
//! [`Error::WrongType`]. Sets that become empty are removed, so membership
//! keys never linger at cardinality zero.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use keybranch_core::{Error, FieldMap, Result};
use parking_lot::Mutex;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::backend::KeyValueBackend;
use crate::range::{Page, ScoreRange};
use crate::sorted_set::SortedSet;
use crate::ttl::TTLIndex;

/// Configuration of the in-process backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InMemoryConfig {
    /// Number of DashMap shards; a power of two greater than 1
    pub shard_amount: usize,
}

impl Default for InMemoryConfig {
    fn default() -> Self {
        InMemoryConfig { shard_amount: 16 }
    }
}

impl InMemoryConfig {
    /// Check the configuration before any map is built
    pub fn validate(&self) -> Result<()> {
        if self.shard_amount < 2 || !self.shard_amount.is_power_of_two() {
            return Err(Error::InvalidConfig(format!(
                "shard_amount must be a power of two greater than 1, got {}",
                self.shard_amount
            )));
        }
        Ok(())
    }
}

#[derive(Debug)]
enum Structure {
    Hash(FieldMap),
    Set(FxHashSet<String>),
    Sorted(SortedSet),
}

impl Structure {
    fn kind(&self) -> &'static str {
        match self {
            Structure::Hash(_) => "hash",
            Structure::Set(_) => "set",
            Structure::Sorted(_) => "zset",
        }
    }

    fn is_empty(&self) -> bool {
        match self {
            Structure::Hash(map) => map.is_empty(),
            Structure::Set(set) => set.is_empty(),
            Structure::Sorted(set) => set.is_empty(),
        }
    }
}

#[derive(Debug)]
struct Entry {
    value: Structure,
    expires_at: Option<Instant>,
}

impl Entry {
    fn new(value: Structure) -> Self {
        Entry {
            value,
            expires_at: None,
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

fn wrong_type(key: &str, expected: &'static str, actual: &'static str) -> Error {
    Error::WrongType {
        key: key.to_string(),
        expected,
        actual,
    }
}

/// In-process implementation of [`KeyValueBackend`]
#[derive(Debug)]
pub struct InMemoryBackend {
    data: DashMap<String, Entry>,
    expiries: Mutex<TTLIndex>,
}

impl InMemoryBackend {
    /// Create a backend with the default configuration
    pub fn new() -> Self {
        InMemoryBackend {
            data: DashMap::new(),
            expiries: Mutex::new(TTLIndex::new()),
        }
    }

    /// Create a backend from a validated configuration
    pub fn with_config(config: &InMemoryConfig) -> Result<Self> {
        config.validate()?;
        Ok(InMemoryBackend {
            data: DashMap::with_shard_amount(config.shard_amount),
            expiries: Mutex::new(TTLIndex::new()),
        })
    }

    /// Number of live keys
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.data
            .iter()
            .filter(|item| !item.value().is_expired(now))
            .count()
    }

    /// Whether no live key exists
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `key` exists and has not expired
    pub fn contains_key(&self, key: &str) -> bool {
        self.evict_expired(key);
        self.data.contains_key(key)
    }

    /// Every live key, sorted
    pub fn keys(&self) -> Vec<String> {
        let now = Instant::now();
        let mut keys: Vec<String> = self
            .data
            .iter()
            .filter(|item| !item.value().is_expired(now))
            .map(|item| item.key().clone())
            .collect();
        keys.sort();
        keys
    }

    /// Time left before `key` expires; `None` if it has no deadline
    pub fn time_to_live(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        self.data
            .get(key)
            .and_then(|entry| entry.expires_at)
            .map(|at| at.saturating_duration_since(now))
    }

    /// Remove every key whose deadline has passed; returns how many went
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let candidates = self.expiries.lock().take_expired(now);

        let mut purged = 0;
        for key in candidates {
            if self
                .data
                .remove_if(key.as_str(), |_, entry| entry.is_expired(now))
                .is_some()
            {
                purged += 1;
            }
        }
        if purged > 0 {
            debug!(target: "keybranch::storage", purged, "Purged expired keys");
        }
        purged
    }

    fn evict_expired(&self, key: &str) {
        let now = Instant::now();
        if let Some((key, entry)) = self.data.remove_if(key, |_, entry| entry.is_expired(now)) {
            self.forget_expiry(&key, &entry);
            trace!(target: "keybranch::storage", key = %key, "Evicted expired key");
        }
    }

    // Never call with a shard guard held
    fn forget_expiry(&self, key: &str, entry: &Entry) {
        if let Some(at) = entry.expires_at {
            self.expiries.lock().remove(at, key);
        }
    }

    fn remove_if_empty(&self, key: &str) {
        if let Some((key, entry)) = self.data.remove_if(key, |_, entry| entry.value.is_empty()) {
            self.forget_expiry(&key, &entry);
        }
    }

    fn inspect<T>(&self, key: &str, f: impl FnOnce(&Structure) -> Result<T>) -> Result<Option<T>> {
        self.evict_expired(key);
        match self.data.get(key) {
            Some(entry) => f(&entry.value).map(Some),
            None => Ok(None),
        }
    }

    fn upsert<T>(
        &self,
        key: &str,
        create: impl FnOnce() -> Structure,
        f: impl FnOnce(&mut Structure) -> Result<T>,
    ) -> Result<T> {
        self.evict_expired(key);
        let mut entry = self
            .data
            .entry(key.to_string())
            .or_insert_with(|| Entry::new(create()));
        f(&mut entry.value)
    }

    fn modify<T>(&self, key: &str, f: impl FnOnce(&mut Structure) -> Result<T>) -> Result<Option<T>> {
        self.evict_expired(key);
        let result = match self.data.get_mut(key) {
            Some(mut entry) => f(&mut entry.value).map(Some),
            None => Ok(None),
        };
        self.remove_if_empty(key);
        result
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyValueBackend for InMemoryBackend {
    async fn hash_set(&self, key: &str, fields: &FieldMap) -> Result<()> {
        if fields.is_empty() {
            return Ok(());
        }
        self.upsert(
            key,
            || Structure::Hash(FieldMap::new()),
            |value| match value {
                Structure::Hash(map) => {
                    map.extend(fields.iter().map(|(k, v)| (k.clone(), v.clone())));
                    Ok(())
                }
                other => Err(wrong_type(key, "hash", other.kind())),
            },
        )?;
        trace!(target: "keybranch::storage", key = %key, fields = fields.len(), "hash_set");
        Ok(())
    }

    async fn hash_get_all(&self, key: &str) -> Result<FieldMap> {
        let fields = self.inspect(key, |value| match value {
            Structure::Hash(map) => Ok(map.clone()),
            other => Err(wrong_type(key, "hash", other.kind())),
        })?;
        Ok(fields.unwrap_or_default())
    }

    async fn key_delete(&self, key: &str) -> Result<bool> {
        self.evict_expired(key);
        match self.data.remove(key) {
            Some((key, entry)) => {
                self.forget_expiry(&key, &entry);
                trace!(target: "keybranch::storage", key = %key, "key_delete");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn key_expire(&self, key: &str, ttl: Duration) -> Result<bool> {
        self.evict_expired(key);
        let at = Instant::now()
            .checked_add(ttl)
            .ok_or_else(|| Error::backend(format!("ttl of {ttl:?} is out of range")))?;

        let previous = match self.data.get_mut(key) {
            Some(mut entry) => entry.expires_at.replace(at),
            None => return Ok(false),
        };

        let mut expiries = self.expiries.lock();
        if let Some(previous) = previous {
            expiries.remove(previous, key);
        }
        expiries.insert(at, key.to_string());
        debug!(target: "keybranch::storage", key = %key, ttl_ms = ttl.as_millis() as u64, "key_expire");
        Ok(true)
    }

    async fn set_add(&self, key: &str, member: &str) -> Result<bool> {
        self.upsert(
            key,
            || Structure::Set(FxHashSet::default()),
            |value| match value {
                Structure::Set(set) => Ok(set.insert(member.to_string())),
                other => Err(wrong_type(key, "set", other.kind())),
            },
        )
    }

    async fn set_remove(&self, key: &str, member: &str) -> Result<bool> {
        let removed = self.modify(key, |value| match value {
            Structure::Set(set) => Ok(set.remove(member)),
            other => Err(wrong_type(key, "set", other.kind())),
        })?;
        Ok(removed.unwrap_or(false))
    }

    async fn set_members(&self, key: &str) -> Result<Vec<String>> {
        let members = self.inspect(key, |value| match value {
            Structure::Set(set) => Ok(set.iter().cloned().collect()),
            other => Err(wrong_type(key, "set", other.kind())),
        })?;
        Ok(members.unwrap_or_default())
    }

    async fn set_len(&self, key: &str) -> Result<u64> {
        let len = self.inspect(key, |value| match value {
            Structure::Set(set) => Ok(set.len() as u64),
            other => Err(wrong_type(key, "set", other.kind())),
        })?;
        Ok(len.unwrap_or(0))
    }

    async fn sorted_set_add(&self, key: &str, member: &str, score: f64) -> Result<bool> {
        if score.is_nan() {
            return Err(Error::backend(format!("score for {member} at {key} is not a number")));
        }
        self.upsert(
            key,
            || Structure::Sorted(SortedSet::new()),
            |value| match value {
                Structure::Sorted(set) => Ok(set.insert(member, score)),
                other => Err(wrong_type(key, "zset", other.kind())),
            },
        )
    }

    async fn sorted_set_remove(&self, key: &str, member: &str) -> Result<bool> {
        let removed = self.modify(key, |value| match value {
            Structure::Sorted(set) => Ok(set.remove(member)),
            other => Err(wrong_type(key, "zset", other.kind())),
        })?;
        Ok(removed.unwrap_or(false))
    }

    async fn sorted_set_range_by_score(
        &self,
        key: &str,
        range: ScoreRange,
        page: Option<Page>,
    ) -> Result<Vec<String>> {
        let members = self.inspect(key, |value| match value {
            Structure::Sorted(set) => Ok(set.range_by_score(range, page)),
            other => Err(wrong_type(key, "zset", other.kind())),
        })?;
        Ok(members.unwrap_or_default())
    }

    async fn sorted_set_len_by_score(&self, key: &str, range: ScoreRange) -> Result<u64> {
        let len = self.inspect(key, |value| match value {
            Structure::Sorted(set) => Ok(set.count_by_score(range) as u64),
            other => Err(wrong_type(key, "zset", other.kind())),
        })?;
        Ok(len.unwrap_or(0))
    }
}
