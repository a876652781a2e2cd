//! Key-value backend contract
//!
//! The index engine talks to storage only through [`KeyValueBackend`]. Any
//! store offering field maps, sets and score-ordered sets with key expiry
//! qualifies; [`crate::InMemoryBackend`] is the in-process implementation.
//!
//! All keys are full storage keys (`<EntityType>:<key>`). Errors from the
//! store are passed through unchanged; nothing here retries.

use std::time::Duration;

use async_trait::async_trait;
use keybranch_core::{FieldMap, Result};

use crate::range::{Page, ScoreRange};

/// Primitives the index engine consumes
#[async_trait]
pub trait KeyValueBackend: Send + Sync {
    /// Upsert every field of `fields` into the map at `key`
    async fn hash_set(&self, key: &str, fields: &FieldMap) -> Result<()>;

    /// Full field map at `key`, empty if the key doesn't exist
    async fn hash_get_all(&self, key: &str) -> Result<FieldMap>;

    /// Remove `key` and its value; true if the key existed
    async fn key_delete(&self, key: &str) -> Result<bool>;

    /// Attach a time-to-live to `key`; true if the key existed
    async fn key_expire(&self, key: &str, ttl: Duration) -> Result<bool>;

    /// Add `member` to the set at `key`; true if it was not a member
    async fn set_add(&self, key: &str, member: &str) -> Result<bool>;

    /// Remove `member` from the set at `key`; true if it was a member
    async fn set_remove(&self, key: &str, member: &str) -> Result<bool>;

    /// Every member of the set at `key`, unordered
    async fn set_members(&self, key: &str) -> Result<Vec<String>>;

    /// Cardinality of the set at `key`
    async fn set_len(&self, key: &str) -> Result<u64>;

    /// Add or re-score `member` in the ordered set at `key`; true if new
    async fn sorted_set_add(&self, key: &str, member: &str, score: f64) -> Result<bool>;

    /// Remove `member` from the ordered set at `key`; true if it was a member
    async fn sorted_set_remove(&self, key: &str, member: &str) -> Result<bool>;

    /// Members with a score inside `range`, ascending, then sliced by `page`
    async fn sorted_set_range_by_score(
        &self,
        key: &str,
        range: ScoreRange,
        page: Option<Page>,
    ) -> Result<Vec<String>>;

    /// Number of members with a score inside `range`
    async fn sorted_set_len_by_score(&self, key: &str, range: ScoreRange) -> Result<u64>;
}
