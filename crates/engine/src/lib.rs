//! Branch index engine for keybranch
//!
//! This crate turns declarative branch definitions into index maintenance:
//! - Branch: filters, grouping dimensions and an optional sort dimension
//! - Repository: primary storage plus index upkeep on add, update and delete
//! - Queries: by branch, by category, by score range with paging
//! - Events: lifecycle notifications after successful mutations
//! - Config: TOML-backed repository options
//!
//! The engine only talks to storage through `KeyValueBackend`, so any
//! backend with hash, set and sorted-set primitives can hold the indexes.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod branch;
pub mod config;
pub mod dimension;
pub mod event;
pub mod repository;

#[cfg(test)]
mod test_entity;

pub use branch::{Branch, Filter};
pub use config::{MissingRecordPolicy, RepositoryConfig};
pub use dimension::{GroupDimension, GroupFn, ScoreFn, SortDimension};
pub use event::{EntityEvent, EntityListener, EventLog};
pub use repository::{Repository, BRANCH_DATA};
