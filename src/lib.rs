//! keybranch - declarative secondary indexes over a key-value store
//!
//! Entities are stored as one hash per record. Branches describe which
//! entities to index (filters), how to group them (attribute or function
//! dimensions) and optionally how to order them (a sort dimension). The
//! repository keeps every branch key current as entities are added,
//! updated and deleted, and answers queries by reading the index keys.
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use keybranch::{Branch, InMemoryBackend, Repository};
//!
//! let backend = Arc::new(InMemoryBackend::new());
//! let mut repo = Repository::<Property>::new(backend)?;
//! repo.add_branch(
//!     Branch::new("BRANCH_LOCATION_SORTBY_PRICE")
//!         .filter_by(|p: &Property| p.is_active && p.is_approved)
//!         .group_by("Location")?
//!         .sort_by("Price")?,
//! )?;
//!
//! repo.add(&mut property).await?;
//! let cheapest = repo
//!     .get_by_sorted_branch_range("BRANCH_LOCATION_SORTBY_PRICE", 0.0, 1500.0, &["Istanbul"])
//!     .await?;
//! ```
//!
//! # Layout
//!
//! - `keybranch-core`: keys, entity descriptors, the field codec and errors
//! - `keybranch-storage`: the backend contract and an in-memory backend
//! - `keybranch-engine`: branches, the repository and its configuration

pub use keybranch_core::{
    decode, encode, storage_key, Attribute, AttributeEnum, BranchKey, EncodingKind, Entity,
    EntityState, Error, ErrorCategory, FieldMap, FieldValue, KeyCategory, Result, StoredTime,
    TimeZoneKind, ID_ATTRIBUTE, PLACEHOLDER_VALUE,
};
pub use keybranch_engine::{
    Branch, EntityEvent, EntityListener, EventLog, GroupDimension, MissingRecordPolicy,
    Repository, RepositoryConfig, SortDimension, BRANCH_DATA,
};
pub use keybranch_storage::{
    ExpiryCleaner, InMemoryBackend, InMemoryConfig, KeyValueBackend, Page, ScoreRange,
};

/// Test doubles for code built on [`KeyValueBackend`]
pub mod testing {
    pub use keybranch_storage::testing::{BackendOp, ScriptedBackend};
}
