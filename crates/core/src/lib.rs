//! Core types for keybranch
//!
//! This crate defines the foundational types used throughout the system:
//! - BranchKey: Primary / Grouped / Sorted keys and their canonical rendering
//! - FieldValue: Attribute values handed between entities and the engine
//! - Entity: Entity trait and static attribute descriptors
//! - Codec: Entity ⇄ field map conversion for primary storage
//! - StoredTime: Tick-based timestamp encoding
//! - Error: Error type hierarchy

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod codec;
pub mod entity;
pub mod error;
pub mod key;
pub mod time;
pub mod value;

pub use codec::{decode, encode, FieldMap};
pub use entity::{Attribute, EncodingKind, Entity, EntityState, ID_ATTRIBUTE};
pub use error::{Error, ErrorCategory, Result};
pub use key::{storage_key, BranchKey, KeyCategory, KeyError, PLACEHOLDER_VALUE};
pub use time::{StoredTime, TimeZoneKind};
pub use value::{AttributeEnum, FieldValue};
