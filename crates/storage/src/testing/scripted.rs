//! Recording backend with injectable failures

use std::time::Duration;

use async_trait::async_trait;
use keybranch_core::{Error, FieldMap, Result};
use parking_lot::Mutex;

use crate::backend::KeyValueBackend;
use crate::memory::InMemoryBackend;
use crate::range::{Page, ScoreRange};

/// Backend primitive, as recorded by [`ScriptedBackend`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendOp {
    /// `hash_set`
    HashSet,
    /// `hash_get_all`
    HashGetAll,
    /// `key_delete`
    KeyDelete,
    /// `key_expire`
    KeyExpire,
    /// `set_add`
    SetAdd,
    /// `set_remove`
    SetRemove,
    /// `set_members`
    SetMembers,
    /// `set_len`
    SetLen,
    /// `sorted_set_add`
    SortedSetAdd,
    /// `sorted_set_remove`
    SortedSetRemove,
    /// `sorted_set_range_by_score`
    SortedSetRange,
    /// `sorted_set_len_by_score`
    SortedSetLen,
}

#[derive(Debug)]
struct Failure {
    op: BackendOp,
    key_fragment: String,
}

/// In-memory backend that records calls and fails on demand
///
/// A call is recorded before the failure check, so failed calls still show
/// up in [`ScriptedBackend::calls`].
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    inner: InMemoryBackend,
    calls: Mutex<Vec<(BackendOp, String)>>,
    failures: Mutex<Vec<Failure>>,
    refused_expiries: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    /// Create an empty scripted backend
    pub fn new() -> Self {
        Self::default()
    }

    /// Backing store, for inspecting state directly
    pub fn inner(&self) -> &InMemoryBackend {
        &self.inner
    }

    /// Fail every `op` on a key containing `key_fragment`
    pub fn fail_on(&self, op: BackendOp, key_fragment: &str) {
        self.failures.lock().push(Failure {
            op,
            key_fragment: key_fragment.to_string(),
        });
    }

    /// Make `key_expire` report `false` for keys containing `key_fragment`
    pub fn refuse_expire(&self, key_fragment: &str) {
        self.refused_expiries.lock().push(key_fragment.to_string());
    }

    /// Drop every injected failure and refusal
    pub fn heal(&self) {
        self.failures.lock().clear();
        self.refused_expiries.lock().clear();
    }

    /// Every call so far, in order
    pub fn calls(&self) -> Vec<(BackendOp, String)> {
        self.calls.lock().clone()
    }

    /// Keys passed to `op`, in order
    pub fn keys_for(&self, op: BackendOp) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter(|(recorded, _)| *recorded == op)
            .map(|(_, key)| key.clone())
            .collect()
    }

    /// Forget recorded calls
    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    fn record(&self, op: BackendOp, key: &str) -> Result<()> {
        self.calls.lock().push((op, key.to_string()));
        let injected = self
            .failures
            .lock()
            .iter()
            .any(|failure| failure.op == op && key.contains(&failure.key_fragment));
        if injected {
            return Err(Error::backend(format!("injected failure: {op:?} {key}")));
        }
        Ok(())
    }
}

#[async_trait]
impl KeyValueBackend for ScriptedBackend {
    async fn hash_set(&self, key: &str, fields: &FieldMap) -> Result<()> {
        self.record(BackendOp::HashSet, key)?;
        self.inner.hash_set(key, fields).await
    }

    async fn hash_get_all(&self, key: &str) -> Result<FieldMap> {
        self.record(BackendOp::HashGetAll, key)?;
        self.inner.hash_get_all(key).await
    }

    async fn key_delete(&self, key: &str) -> Result<bool> {
        self.record(BackendOp::KeyDelete, key)?;
        self.inner.key_delete(key).await
    }

    async fn key_expire(&self, key: &str, ttl: Duration) -> Result<bool> {
        self.record(BackendOp::KeyExpire, key)?;
        let refused = self
            .refused_expiries
            .lock()
            .iter()
            .any(|fragment| key.contains(fragment.as_str()));
        if refused {
            return Ok(false);
        }
        self.inner.key_expire(key, ttl).await
    }

    async fn set_add(&self, key: &str, member: &str) -> Result<bool> {
        self.record(BackendOp::SetAdd, key)?;
        self.inner.set_add(key, member).await
    }

    async fn set_remove(&self, key: &str, member: &str) -> Result<bool> {
        self.record(BackendOp::SetRemove, key)?;
        self.inner.set_remove(key, member).await
    }

    async fn set_members(&self, key: &str) -> Result<Vec<String>> {
        self.record(BackendOp::SetMembers, key)?;
        self.inner.set_members(key).await
    }

    async fn set_len(&self, key: &str) -> Result<u64> {
        self.record(BackendOp::SetLen, key)?;
        self.inner.set_len(key).await
    }

    async fn sorted_set_add(&self, key: &str, member: &str, score: f64) -> Result<bool> {
        self.record(BackendOp::SortedSetAdd, key)?;
        self.inner.sorted_set_add(key, member, score).await
    }

    async fn sorted_set_remove(&self, key: &str, member: &str) -> Result<bool> {
        self.record(BackendOp::SortedSetRemove, key)?;
        self.inner.sorted_set_remove(key, member).await
    }

    async fn sorted_set_range_by_score(
        &self,
        key: &str,
        range: ScoreRange,
        page: Option<Page>,
    ) -> Result<Vec<String>> {
        self.record(BackendOp::SortedSetRange, key)?;
        self.inner.sorted_set_range_by_score(key, range, page).await
    }

    async fn sorted_set_len_by_score(&self, key: &str, range: ScoreRange) -> Result<u64> {
        self.record(BackendOp::SortedSetLen, key)?;
        self.inner.sorted_set_len_by_score(key, range).await
    }
}
