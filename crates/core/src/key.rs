//! Branch keys and their canonical rendering
//!
//! Every backend address owned by an entity type is `<EntityTypeName>:<key>`,
//! where `<key>` is one of three categories:
//!
//! | Category | Rendering | Backed by |
//! |----------|-----------|-----------|
//! | Primary  | `data:<id>` | field map |
//! | Grouped  | `grouped:<by>` or `grouped:<by>:<value>` | unordered set |
//! | Sorted   | `sorted:<by>` | score-ordered set |
//!
//! The fixed prefixes keep the categories apart: two keys render to the same
//! string only if category, `by` and `value` are all equal.
//!
//! Keys are plain values. Instantiating a template returns a new key, a
//! key is never changed after construction.

use std::fmt;
use thiserror::Error;

/// Separator between key segments
pub const KEY_SEPARATOR: char = ':';

/// Value segment rendered by templates of attribute dimensions
pub const PLACEHOLDER_VALUE: &str = "{propertyValue}";

/// Key category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCategory {
    /// Per-entity record address
    Primary,
    /// Partition of an unordered membership index
    Grouped,
    /// Score-ordered membership index
    Sorted,
}

impl KeyCategory {
    /// Fixed rendering prefix
    pub const fn prefix(&self) -> &'static str {
        match self {
            KeyCategory::Primary => "data",
            KeyCategory::Grouped => "grouped",
            KeyCategory::Sorted => "sorted",
        }
    }
}

/// A single key segment group
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BranchKey {
    /// `data:<id>`
    Primary {
        /// Entity id
        id: String,
    },
    /// `grouped:<by>[:<value>]`
    Grouped {
        /// Dimension name
        by: String,
        /// Concrete value, `None` for the uninstantiated template
        value: Option<String>,
    },
    /// `sorted:<by>`
    Sorted {
        /// Dimension name
        by: String,
    },
}

impl BranchKey {
    /// Primary key for an entity id
    pub fn primary(id: impl Into<String>) -> Self {
        BranchKey::Primary { id: id.into() }
    }

    /// Uninstantiated grouped key
    pub fn grouped(by: impl Into<String>) -> Self {
        BranchKey::Grouped {
            by: by.into(),
            value: None,
        }
    }

    /// Grouped key instantiated for one value
    pub fn grouped_with(by: impl Into<String>, value: impl Into<String>) -> Self {
        BranchKey::Grouped {
            by: by.into(),
            value: Some(value.into()),
        }
    }

    /// Sorted key
    pub fn sorted(by: impl Into<String>) -> Self {
        BranchKey::Sorted { by: by.into() }
    }

    /// Category of this key
    pub fn category(&self) -> KeyCategory {
        match self {
            BranchKey::Primary { .. } => KeyCategory::Primary,
            BranchKey::Grouped { .. } => KeyCategory::Grouped,
            BranchKey::Sorted { .. } => KeyCategory::Sorted,
        }
    }

    /// Dimension name, if the category has one
    pub fn by(&self) -> Option<&str> {
        match self {
            BranchKey::Primary { .. } => None,
            BranchKey::Grouped { by, .. } | BranchKey::Sorted { by } => Some(by),
        }
    }

    /// Value segment, if any
    pub fn value(&self) -> Option<&str> {
        match self {
            BranchKey::Primary { id } => Some(id),
            BranchKey::Grouped { value, .. } => value.as_deref(),
            BranchKey::Sorted { .. } => None,
        }
    }

    /// Same key shape carrying `value`
    ///
    /// Sorted keys have no value segment and come back unchanged.
    pub fn with_value(&self, value: impl Into<String>) -> Self {
        match self {
            BranchKey::Primary { .. } => BranchKey::Primary { id: value.into() },
            BranchKey::Grouped { by, .. } => BranchKey::Grouped {
                by: by.clone(),
                value: Some(value.into()),
            },
            BranchKey::Sorted { .. } => self.clone(),
        }
    }
}

impl fmt::Display for BranchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = self.category().prefix();
        match self {
            BranchKey::Primary { id } => write!(f, "{prefix}{KEY_SEPARATOR}{id}"),
            BranchKey::Grouped { by, value: None } => write!(f, "{prefix}{KEY_SEPARATOR}{by}"),
            BranchKey::Grouped {
                by,
                value: Some(value),
            } => write!(f, "{prefix}{KEY_SEPARATOR}{by}{KEY_SEPARATOR}{value}"),
            BranchKey::Sorted { by } => write!(f, "{prefix}{KEY_SEPARATOR}{by}"),
        }
    }
}

/// Full storage key: `<entity_type>:<key>`
pub fn storage_key(entity_type: &str, key: &BranchKey) -> String {
    format!("{entity_type}{KEY_SEPARATOR}{key}")
}

/// Validate a dimension name
///
/// Dimension names become `by` segments, so they must be non-empty and must
/// not contain the segment separator or NUL bytes.
///
/// # Examples
///
/// ```
/// use keybranch_core::key::validate_dimension_name;
///
/// assert!(validate_dimension_name("Location").is_ok());
/// assert!(validate_dimension_name("").is_err());
/// assert!(validate_dimension_name("a:b").is_err());
/// ```
pub fn validate_dimension_name(name: &str) -> Result<(), KeyError> {
    if name.is_empty() {
        return Err(KeyError::Empty);
    }
    if name.contains(KEY_SEPARATOR) {
        return Err(KeyError::ContainsSeparator);
    }
    if name.contains('\x00') {
        return Err(KeyError::ContainsNul);
    }
    Ok(())
}

/// Dimension name validation errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyError {
    /// Name is empty
    #[error("name cannot be empty")]
    Empty,

    /// Name contains the segment separator
    #[error("name cannot contain '{}'", KEY_SEPARATOR)]
    ContainsSeparator,

    /// Name contains NUL byte (\0)
    #[error("name cannot contain NUL bytes")]
    ContainsNul,
}

impl KeyError {
    /// Short machine-readable reason
    pub fn reason_code(&self) -> &'static str {
        match self {
            KeyError::Empty => "empty_name",
            KeyError::ContainsSeparator => "contains_separator",
            KeyError::ContainsNul => "contains_nul",
        }
    }
}
