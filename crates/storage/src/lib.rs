//! Storage layer for keybranch
//!
//! This crate defines the key-value contract the index engine runs on and
//! an in-process implementation of it:
//! - KeyValueBackend: async field-map / set / ordered-set / expiry primitives
//! - InMemoryBackend: DashMap-sharded structures with lazy expiry
//! - SortedSet: score-ordered membership with inclusive range reads
//! - TTLIndex: expiry instant → keys, for cleanup without scanning
//! - ExpiryCleaner: background thread purging expired keys
//!
//! A networked store plugs in by implementing [`KeyValueBackend`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod cleaner;
pub mod memory;
pub mod range;
pub mod sorted_set;
pub mod testing;
pub mod ttl;

pub use backend::KeyValueBackend;
pub use cleaner::ExpiryCleaner;
pub use memory::{InMemoryBackend, InMemoryConfig};
pub use range::{Page, ScoreRange};
pub use sorted_set::SortedSet;
pub use ttl::TTLIndex;
