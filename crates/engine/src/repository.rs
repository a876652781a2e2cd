//! Repository: primary storage plus branch index maintenance
//!
//! A repository owns one implicit primary-data branch ([`BRANCH_DATA`],
//! grouped by the identifier, no filters, no sort) and the branches
//! registered while it is being set up. Once the repository is shared the
//! registry is read-only, so no operation takes a lock.
//!
//! # Write path
//!
//! ```text
//! add / update(entity):
//!   plan: for each branch, maintenance key + add/remove (+ score)
//!   hash_set(primary key, encode(entity))
//!   for each branch, in registration order:
//!       [update only] remove id from the key the stored version mapped to
//!       filters pass  -> set_add / sorted_set_add
//!       filters fail  -> set_remove / sorted_set_remove
//!
//! delete(entity):
//!   key_delete(primary key)
//!   for each branch: set_remove / sorted_set_remove, filters ignored
//! ```
//!
//! Keys and scores are computed before the first backend call, so a bad
//! attribute value fails the operation before anything is written. Backend
//! calls are issued one at a time; a backend failure part way through
//! leaves the calls already made in place.

use std::sync::Arc;
use std::time::Duration;

use keybranch_core::{decode, encode, Entity, EntityState, Error, Result, ID_ATTRIBUTE};
use keybranch_storage::{KeyValueBackend, Page, ScoreRange};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::branch::Branch;
use crate::config::{MissingRecordPolicy, RepositoryConfig};
use crate::event::{EntityEvent, EntityListener};

/// Reserved id of the primary-data branch
pub const BRANCH_DATA: &str = "BRANCH_DATA";

const KIND_PRIMARY: &str = "primary";
const KIND_SORTED: &str = "sorted";
const KIND_UNSORTED: &str = "unsorted";

#[derive(Debug, Clone, Copy, PartialEq)]
enum IndexOp {
    SetAdd,
    SetRemove,
    SortedAdd(f64),
    SortedRemove,
}

struct PlannedWrite {
    key: String,
    op: IndexOp,
    stale_key: Option<String>,
}

/// Index engine for one entity type
pub struct Repository<E: Entity> {
    backend: Arc<dyn KeyValueBackend>,
    config: RepositoryConfig,
    data_branch: Branch<E>,
    branches: Vec<Branch<E>>,
    listeners: Vec<Arc<dyn EntityListener<E>>>,
}

impl<E: Entity> Repository<E> {
    /// Repository with the default configuration
    pub fn new(backend: Arc<dyn KeyValueBackend>) -> Result<Self> {
        Self::with_config(backend, RepositoryConfig::default())
    }

    /// Repository with an explicit configuration
    pub fn with_config(backend: Arc<dyn KeyValueBackend>, config: RepositoryConfig) -> Result<Self> {
        let data_branch = Branch::new(BRANCH_DATA).group_by(ID_ATTRIBUTE)?;
        info!(
            target: "keybranch::repo",
            entity_type = E::TYPE_NAME,
            evict_stale_entries = config.evict_stale_entries,
            "Repository created"
        );
        Ok(Repository {
            backend,
            config,
            data_branch,
            branches: Vec::new(),
            listeners: Vec::new(),
        })
    }

    // ========== Setup ==========

    /// Register a branch
    ///
    /// Fails if the branch has no id, isn't bound to `E`, or reuses an id.
    pub fn add_branch(&mut self, branch: Branch<E>) -> Result<()> {
        let id = branch.validate()?;
        if id == BRANCH_DATA || self.branches.iter().any(|b| b.id() == Some(id)) {
            return Err(Error::DuplicateBranch {
                branch_id: id.to_string(),
            });
        }
        info!(
            target: "keybranch::repo",
            entity_type = E::TYPE_NAME,
            branch_id = %id,
            key = %branch.template_key(),
            "Branch registered"
        );
        self.branches.push(branch);
        Ok(())
    }

    /// Receive an event after every successful mutation
    pub fn subscribe<L>(&mut self, listener: L)
    where
        L: EntityListener<E> + 'static,
    {
        self.listeners.push(Arc::new(listener));
    }

    // ========== Introspection ==========

    /// Active configuration
    pub fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    /// Backend this repository writes to
    pub fn backend(&self) -> &Arc<dyn KeyValueBackend> {
        &self.backend
    }

    /// Every branch id, primary-data branch first, then registration order
    pub fn branch_ids(&self) -> Vec<&str> {
        self.all_branches().filter_map(|b| b.id()).collect()
    }

    /// Look up a branch
    pub fn branch(&self, branch_id: &str) -> Result<&Branch<E>> {
        self.all_branches()
            .find(|b| b.id() == Some(branch_id))
            .ok_or_else(|| Error::BranchNotFound {
                branch_id: branch_id.to_string(),
                registered: self.all_branches().map(|b| b.template_key()).collect(),
            })
    }

    /// `(branch id, template key)` of every branch
    pub fn describe(&self) -> Vec<(String, String)> {
        self.all_branches()
            .map(|b| (b.id().unwrap_or_default().to_string(), b.template_key()))
            .collect()
    }

    /// Storage key of the primary record for `id`
    pub fn primary_key(&self, id: &str) -> Result<String> {
        self.data_branch.query_key(&[id])
    }

    // ========== Mutations ==========

    /// Store a new entity and index it
    ///
    /// An empty id is replaced by a UUID unless `assign_missing_ids` is off.
    pub async fn add(&self, entity: &mut E) -> Result<()> {
        if entity.id().is_empty() {
            if !self.config.assign_missing_ids {
                return Err(Error::MissingValue {
                    attribute: ID_ATTRIBUTE.to_string(),
                });
            }
            entity.set_id(Uuid::new_v4().to_string());
        }

        self.write(entity, None).await?;
        debug!(target: "keybranch::repo", entity_type = E::TYPE_NAME, id = %entity.id(), "Entity added");

        if let Some(ttl) = self.config.default_ttl() {
            self.expire_maintained(entity, ttl).await?;
        }
        self.emit(entity, EntityState::Added);
        Ok(())
    }

    /// Store a changed entity and move it between branch keys
    pub async fn update(&self, entity: &E) -> Result<()> {
        let id = require_id(entity)?;
        let previous = if self.config.evict_stale_entries {
            self.get_by_id(id).await?
        } else {
            None
        };

        self.write(entity, previous.as_ref()).await?;
        debug!(target: "keybranch::repo", entity_type = E::TYPE_NAME, id = %id, "Entity updated");
        self.emit(entity, EntityState::Updated);
        Ok(())
    }

    /// Delete the primary record and remove the id from every branch key
    /// `entity` maps to; true if the record existed
    ///
    /// `Deleted` is emitted only when a record existed.
    pub async fn delete(&self, entity: &E) -> Result<bool> {
        let id = require_id(entity)?;
        let primary = self.primary_key(id)?;
        let keys = self
            .branches
            .iter()
            .map(|b| b.maintenance_key(entity).map(|key| (b.is_sorted(), key)))
            .collect::<Result<Vec<_>>>()?;

        let existed = self.backend.key_delete(&primary).await?;
        for (sorted, key) in &keys {
            let op = if *sorted {
                IndexOp::SortedRemove
            } else {
                IndexOp::SetRemove
            };
            self.apply(key, id, op).await?;
        }

        debug!(target: "keybranch::repo", entity_type = E::TYPE_NAME, id = %id, existed, "Entity deleted");
        if existed {
            self.emit(entity, EntityState::Deleted);
        }
        Ok(existed)
    }

    /// Delete by id, using the stored version to find its branch keys;
    /// false if no record exists
    pub async fn delete_by_id(&self, id: &str) -> Result<bool> {
        match self.get_by_id(id).await? {
            Some(entity) => self.delete(&entity).await,
            None => Ok(false),
        }
    }

    /// Expire the primary record and every branch key `entity` maps to
    ///
    /// Every expiration is issued; the result is true only if all of them
    /// succeeded. Branch keys the entity was filtered out of usually don't
    /// exist, and their expiration reports false.
    pub async fn set_key_expire(&self, entity: &E, ttl: Duration) -> Result<bool> {
        let id = require_id(entity)?;
        let mut keys = vec![self.primary_key(id)?];
        for branch in &self.branches {
            keys.push(branch.maintenance_key(entity)?);
        }
        self.expire_keys(id, &keys, ttl).await
    }

    // Default TTL on add: only the keys the entity was just written to
    async fn expire_maintained(&self, entity: &E, ttl: Duration) -> Result<()> {
        let id = require_id(entity)?;
        let mut keys = vec![self.primary_key(id)?];
        for branch in self.branches.iter().filter(|b| b.apply_filters(entity)) {
            keys.push(branch.maintenance_key(entity)?);
        }
        if !self.expire_keys(id, &keys, ttl).await? {
            warn!(
                target: "keybranch::repo",
                entity_type = E::TYPE_NAME,
                id = %id,
                "Default TTL not applied to every key"
            );
        }
        Ok(())
    }

    async fn expire_keys(&self, id: &str, keys: &[String], ttl: Duration) -> Result<bool> {
        let mut all_applied = true;
        for key in keys {
            let applied = self.backend.key_expire(key, ttl).await?;
            if !applied {
                warn!(target: "keybranch::repo", key = %key, id = %id, "Key expiration not applied");
            }
            all_applied &= applied;
        }
        Ok(all_applied)
    }

    /// [`Repository::set_key_expire`] on the stored version; false if no
    /// record exists
    pub async fn set_key_expire_by_id(&self, id: &str, ttl: Duration) -> Result<bool> {
        match self.get_by_id(id).await? {
            Some(entity) => self.set_key_expire(&entity, ttl).await,
            None => Ok(false),
        }
    }

    // ========== Queries ==========

    /// Load one entity; `None` if no record exists
    pub async fn get_by_id(&self, id: &str) -> Result<Option<E>> {
        let key = self.primary_key(id)?;
        let fields = self.backend.hash_get_all(&key).await?;
        if fields.is_empty() {
            return Ok(None);
        }
        decode(&fields).map(Some)
    }

    /// Entities in an unsorted branch key, in no particular order
    ///
    /// `values` fill the branch's attribute dimensions in declared order.
    pub async fn get_by_branch(&self, branch_id: &str, values: &[&str]) -> Result<Vec<E>> {
        let branch = self.branch(branch_id)?;
        require_kind(branch, KIND_UNSORTED)?;
        let key = branch.query_key(values)?;
        debug!(target: "keybranch::repo", branch_id = %branch_id, key = %key, "Query branch");

        let ids = self.backend.set_members(&key).await?;
        self.hydrate(ids).await
    }

    /// Entities under one value per grouping dimension, function dimensions
    /// included; sorted branches come back in ascending score order
    pub async fn get_by_category(&self, branch_id: &str, values: &[&str]) -> Result<Vec<E>> {
        let branch = self.branch(branch_id)?;
        require_index(branch)?;
        let key = branch.category_query_key(values)?;
        debug!(target: "keybranch::repo", branch_id = %branch_id, key = %key, "Query category");

        let ids = if branch.is_sorted() {
            self.backend
                .sorted_set_range_by_score(&key, ScoreRange::all(), None)
                .await?
        } else {
            self.backend.set_members(&key).await?
        };
        self.hydrate(ids).await
    }

    /// Every entity in a sorted branch key, ascending by score
    pub async fn get_by_sorted_branch(&self, branch_id: &str, values: &[&str]) -> Result<Vec<E>> {
        self.get_by_score(branch_id, ScoreRange::all(), None, values)
            .await
    }

    /// Entities scoring `from` or more
    pub async fn get_by_sorted_branch_from(
        &self,
        branch_id: &str,
        from: f64,
        values: &[&str],
    ) -> Result<Vec<E>> {
        self.get_by_score(branch_id, ScoreRange::from(from), None, values)
            .await
    }

    /// Entities with `from <= score <= to`
    pub async fn get_by_sorted_branch_range(
        &self,
        branch_id: &str,
        from: f64,
        to: f64,
        values: &[&str],
    ) -> Result<Vec<E>> {
        self.get_by_score(branch_id, ScoreRange::new(from, to), None, values)
            .await
    }

    /// One page of the entities with `from <= score <= to`
    pub async fn get_by_sorted_branch_page(
        &self,
        branch_id: &str,
        from: f64,
        to: f64,
        skip: usize,
        take: usize,
        values: &[&str],
    ) -> Result<Vec<E>> {
        self.get_by_score(
            branch_id,
            ScoreRange::new(from, to),
            Some(Page::new(skip, take)),
            values,
        )
        .await
    }

    /// Sorted branch query with an explicit range and optional page
    pub async fn get_by_score(
        &self,
        branch_id: &str,
        range: ScoreRange,
        page: Option<Page>,
        values: &[&str],
    ) -> Result<Vec<E>> {
        let branch = self.branch(branch_id)?;
        require_kind(branch, KIND_SORTED)?;
        let key = branch.query_key(values)?;
        debug!(
            target: "keybranch::repo",
            branch_id = %branch_id,
            key = %key,
            min = range.min,
            max = range.max,
            "Query sorted branch"
        );

        let ids = self
            .backend
            .sorted_set_range_by_score(&key, range, page)
            .await?;
        self.hydrate(ids).await
    }

    /// Number of ids in an unsorted branch key
    pub async fn count_by_branch(&self, branch_id: &str, values: &[&str]) -> Result<u64> {
        let branch = self.branch(branch_id)?;
        require_kind(branch, KIND_UNSORTED)?;
        let key = branch.query_key(values)?;
        self.backend.set_len(&key).await
    }

    /// Number of ids under one value per grouping dimension
    pub async fn count_by_category(&self, branch_id: &str, values: &[&str]) -> Result<u64> {
        let branch = self.branch(branch_id)?;
        require_index(branch)?;
        let key = branch.category_query_key(values)?;
        if branch.is_sorted() {
            self.backend
                .sorted_set_len_by_score(&key, ScoreRange::all())
                .await
        } else {
            self.backend.set_len(&key).await
        }
    }

    /// Number of ids in a sorted branch key
    pub async fn count_by_sorted_branch(&self, branch_id: &str, values: &[&str]) -> Result<u64> {
        self.count_by_score(branch_id, ScoreRange::all(), values)
            .await
    }

    /// Number of ids scoring `from` or more
    pub async fn count_by_sorted_branch_from(
        &self,
        branch_id: &str,
        from: f64,
        values: &[&str],
    ) -> Result<u64> {
        self.count_by_score(branch_id, ScoreRange::from(from), values)
            .await
    }

    /// Number of ids with `from <= score <= to`
    pub async fn count_by_sorted_branch_range(
        &self,
        branch_id: &str,
        from: f64,
        to: f64,
        values: &[&str],
    ) -> Result<u64> {
        self.count_by_score(branch_id, ScoreRange::new(from, to), values)
            .await
    }

    /// Sorted branch count with an explicit range
    pub async fn count_by_score(
        &self,
        branch_id: &str,
        range: ScoreRange,
        values: &[&str],
    ) -> Result<u64> {
        let branch = self.branch(branch_id)?;
        require_kind(branch, KIND_SORTED)?;
        let key = branch.query_key(values)?;
        self.backend.sorted_set_len_by_score(&key, range).await
    }

    // ========== Internals ==========

    fn all_branches(&self) -> impl Iterator<Item = &Branch<E>> + '_ {
        std::iter::once(&self.data_branch).chain(self.branches.iter())
    }

    fn plan(&self, entity: &E, previous: Option<&E>) -> Result<Vec<PlannedWrite>> {
        self.branches
            .iter()
            .map(|branch| {
                let key = branch.maintenance_key(entity)?;
                let op = match (branch.apply_filters(entity), branch.sort()) {
                    (true, Some(sort)) => IndexOp::SortedAdd(sort.score(entity)?),
                    (true, None) => IndexOp::SetAdd,
                    (false, Some(_)) => IndexOp::SortedRemove,
                    (false, None) => IndexOp::SetRemove,
                };
                let stale_key = previous.and_then(|previous| stale_key(branch, previous, &key));
                Ok(PlannedWrite { key, op, stale_key })
            })
            .collect()
    }

    async fn write(&self, entity: &E, previous: Option<&E>) -> Result<()> {
        let id = require_id(entity)?;
        let primary = self.primary_key(id)?;
        let fields = encode(entity)?;
        let plan = self.plan(entity, previous)?;

        self.backend.hash_set(&primary, &fields).await?;
        for write in &plan {
            if let Some(stale) = &write.stale_key {
                let remove = match write.op {
                    IndexOp::SortedAdd(_) | IndexOp::SortedRemove => IndexOp::SortedRemove,
                    IndexOp::SetAdd | IndexOp::SetRemove => IndexOp::SetRemove,
                };
                self.apply(stale, id, remove).await?;
                debug!(target: "keybranch::repo", id = %id, key = %stale, "Evicted stale entry");
            }
            self.apply(&write.key, id, write.op).await?;
        }
        Ok(())
    }

    async fn apply(&self, key: &str, id: &str, op: IndexOp) -> Result<()> {
        match op {
            IndexOp::SetAdd => self.backend.set_add(key, id).await?,
            IndexOp::SetRemove => self.backend.set_remove(key, id).await?,
            IndexOp::SortedAdd(score) => self.backend.sorted_set_add(key, id, score).await?,
            IndexOp::SortedRemove => self.backend.sorted_set_remove(key, id).await?,
        };
        Ok(())
    }

    async fn hydrate(&self, ids: Vec<String>) -> Result<Vec<E>> {
        let mut entities = Vec::with_capacity(ids.len());
        for id in ids {
            match self.get_by_id(&id).await? {
                Some(entity) => entities.push(entity),
                None => match self.config.missing_record_policy {
                    MissingRecordPolicy::Skip => {
                        warn!(
                            target: "keybranch::repo",
                            entity_type = E::TYPE_NAME,
                            id = %id,
                            "Indexed id has no primary record"
                        );
                    }
                    MissingRecordPolicy::Error => {
                        return Err(Error::RecordNotFound {
                            entity_type: E::TYPE_NAME.to_string(),
                            id,
                        });
                    }
                },
            }
        }
        Ok(entities)
    }

    fn emit(&self, entity: &E, state: EntityState) {
        let event = EntityEvent { entity, state };
        for listener in &self.listeners {
            listener.on_event(&event);
        }
    }
}

impl<E: Entity> std::fmt::Debug for Repository<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("entity_type", &E::TYPE_NAME)
            .field("config", &self.config)
            .field("branches", &self.branch_ids())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

fn require_id<E: Entity>(entity: &E) -> Result<&str> {
    match entity.id() {
        "" => Err(Error::MissingValue {
            attribute: ID_ATTRIBUTE.to_string(),
        }),
        id => Ok(id),
    }
}

fn branch_kind<E: Entity>(branch: &Branch<E>) -> &'static str {
    if branch.id() == Some(BRANCH_DATA) {
        KIND_PRIMARY
    } else if branch.is_sorted() {
        KIND_SORTED
    } else {
        KIND_UNSORTED
    }
}

fn require_kind<E: Entity>(branch: &Branch<E>, expected: &'static str) -> Result<()> {
    let actual = branch_kind(branch);
    if actual != expected {
        return Err(Error::BranchKindMismatch {
            branch_id: branch.id().unwrap_or_default().to_string(),
            expected,
            actual,
        });
    }
    Ok(())
}

fn require_index<E: Entity>(branch: &Branch<E>) -> Result<()> {
    if branch_kind(branch) == KIND_PRIMARY {
        return Err(Error::BranchKindMismatch {
            branch_id: BRANCH_DATA.to_string(),
            expected: "index",
            actual: KIND_PRIMARY,
        });
    }
    Ok(())
}

// Key the stored version occupied, if it differs from the new one
fn stale_key<E: Entity>(branch: &Branch<E>, previous: &E, current: &str) -> Option<String> {
    match branch.maintenance_key(previous) {
        Ok(key) if key != current => Some(key),
        Ok(_) => None,
        Err(e) => {
            debug!(
                target: "keybranch::repo",
                branch_id = branch.id().unwrap_or_default(),
                error = %e,
                "Stored version has no key in branch"
            );
            None
        }
    }
}
