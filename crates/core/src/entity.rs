//! Entity types and their attribute descriptors
//!
//! An entity type declares its attributes once, as a static table of
//! [`Attribute`] descriptors (name, encoding kind, getter, setter). Dimension
//! lookup, the codec and the index engine all work off this table, so nothing
//! is re-derived per call.
//!
//! # Example
//!
//! ```
//! use keybranch_core::entity::{Attribute, EncodingKind, Entity};
//! use keybranch_core::FieldValue;
//!
//! #[derive(Debug, Default, Clone)]
//! struct Note {
//!     id: String,
//!     pinned: bool,
//! }
//!
//! static NOTE_ATTRIBUTES: [Attribute<Note>; 2] = [
//!     Attribute::identifier(),
//!     Attribute::new(
//!         "Pinned",
//!         EncodingKind::Bool,
//!         |n| Ok(FieldValue::Bool(n.pinned)),
//!         |n, v| {
//!             n.pinned = v.into_bool("Pinned")?;
//!             Ok(())
//!         },
//!     ),
//! ];
//!
//! impl Entity for Note {
//!     const TYPE_NAME: &'static str = "Note";
//!
//!     fn id(&self) -> &str {
//!         &self.id
//!     }
//!
//!     fn set_id(&mut self, id: String) {
//!         self.id = id;
//!     }
//!
//!     fn attributes() -> &'static [Attribute<Self>] {
//!         &NOTE_ATTRIBUTES
//!     }
//! }
//!
//! assert!(Note::attribute("Pinned").is_some());
//! assert!(Note::attribute("Colour").is_none());
//! ```

use std::fmt;

use crate::error::{Error, Result};
use crate::value::FieldValue;

/// Name of the reserved identifier attribute
pub const ID_ATTRIBUTE: &str = "Id";

/// Reads an attribute from an entity
pub type Getter<E> = fn(&E) -> Result<FieldValue>;

/// Writes a decoded attribute into an entity
pub type Setter<E> = fn(&mut E, FieldValue) -> Result<()>;

/// How an attribute is encoded in the primary field map
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EncodingKind {
    /// `true` / `false`
    Bool,
    /// Decimal integer
    Int,
    /// Decimal float
    Float,
    /// Raw string
    String,
    /// Ordinal of an enumeration
    Enum,
    /// `<ticks>|UTC` or `<ticks>|LOC`
    Time,
    /// JSON blob
    Json,
}

impl EncodingKind {
    /// Name used in diagnostics
    pub const fn name(&self) -> &'static str {
        match self {
            EncodingKind::Bool => "bool",
            EncodingKind::Int => "int",
            EncodingKind::Float => "float",
            EncodingKind::String => "string",
            EncodingKind::Enum => "enum",
            EncodingKind::Time => "time",
            EncodingKind::Json => "json",
        }
    }

    /// Whether values of this kind always have an `f64` score
    pub const fn is_scorable(&self) -> bool {
        matches!(
            self,
            EncodingKind::Int | EncodingKind::Float | EncodingKind::Enum | EncodingKind::Time
        )
    }
}

/// Descriptor of one entity attribute
pub struct Attribute<E> {
    name: &'static str,
    kind: EncodingKind,
    persistent: bool,
    get: Getter<E>,
    set: Setter<E>,
}

impl<E> Attribute<E> {
    /// Persistent attribute
    pub const fn new(name: &'static str, kind: EncodingKind, get: Getter<E>, set: Setter<E>) -> Self {
        Attribute {
            name,
            kind,
            persistent: true,
            get,
            set,
        }
    }

    /// Mark the attribute as non-persistent: readable by dimensions, never
    /// written to or read from the primary field map
    pub const fn transient(self) -> Self {
        Attribute {
            persistent: false,
            ..self
        }
    }

    /// Attribute name
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Encoding kind
    pub const fn kind(&self) -> EncodingKind {
        self.kind
    }

    /// Whether the codec stores this attribute
    pub const fn is_persistent(&self) -> bool {
        self.persistent
    }

    /// Whether this is the reserved identifier attribute
    pub fn is_identifier(&self) -> bool {
        self.name == ID_ATTRIBUTE
    }

    /// Read the current value
    pub fn read(&self, entity: &E) -> Result<FieldValue> {
        (self.get)(entity)
    }

    /// Write a value
    pub fn write(&self, entity: &mut E, value: FieldValue) -> Result<()> {
        (self.set)(entity, value)
    }
}

impl<E: Entity> Attribute<E> {
    /// Descriptor of the identifier attribute (`Id`, string)
    pub const fn identifier() -> Self {
        Attribute::new(ID_ATTRIBUTE, EncodingKind::String, read_id::<E>, write_id::<E>)
    }
}

fn read_id<E: Entity>(entity: &E) -> Result<FieldValue> {
    Ok(FieldValue::String(entity.id().to_string()))
}

fn write_id<E: Entity>(entity: &mut E, value: FieldValue) -> Result<()> {
    entity.set_id(value.into_string(ID_ATTRIBUTE)?);
    Ok(())
}

impl<E> fmt::Debug for Attribute<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attribute")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("persistent", &self.persistent)
            .finish()
    }
}

/// An entity type stored under a primary key and indexed by branches
pub trait Entity: Default + Send + Sync + 'static {
    /// Type name; prefixes every key the entity type owns
    const TYPE_NAME: &'static str;

    /// Identifier, empty if not yet assigned
    fn id(&self) -> &str;

    /// Assign the identifier
    fn set_id(&mut self, id: String);

    /// Attribute table, built once per type
    fn attributes() -> &'static [Attribute<Self>];

    /// Look up an attribute descriptor by name
    fn attribute(name: &str) -> Option<&'static Attribute<Self>> {
        Self::attributes().iter().find(|a| a.name() == name)
    }

    /// Look up an attribute, failing with a configuration error if unknown
    fn require_attribute(name: &str) -> Result<&'static Attribute<Self>> {
        Self::attribute(name).ok_or_else(|| Error::UnknownAttribute {
            entity_type: Self::TYPE_NAME.to_string(),
            attribute: name.to_string(),
        })
    }
}

/// Transient lifecycle state of an entity; never persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EntityState {
    /// Not handed to a repository yet
    #[default]
    Unset,
    /// Written by `add`
    Added,
    /// Written by `update`
    Updated,
    /// Removed by `delete`
    Deleted,
}

impl EntityState {
    /// Name used in logs
    pub const fn as_str(&self) -> &'static str {
        match self {
            EntityState::Unset => "unset",
            EntityState::Added => "added",
            EntityState::Updated => "updated",
            EntityState::Deleted => "deleted",
        }
    }
}

impl fmt::Display for EntityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
