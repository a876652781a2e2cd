//! Error types for keybranch
//!
//! This module defines all error types used throughout the system.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! # Categories
//!
//! | Category | Variants | Description |
//! |----------|----------|-------------|
//! | Configuration | `UnknownAttribute`, `NotSortable`, `MissingBranchId`, ... | Bad branch definition or call shape |
//! | Not Found | `BranchNotFound`, `RecordNotFound` | Addressed thing doesn't exist |
//! | Type Conversion | `TypeConversion`, `MissingValue`, `Serialization` | Value can't be converted |
//! | Backend | `WrongType`, `Backend`, `Io` | Key-value store failures, passed through unchanged |

use std::io;
use thiserror::Error;

use crate::key::KeyError;

/// Result type alias for keybranch operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for keybranch
#[derive(Debug, Error)]
pub enum Error {
    // ==================== Configuration ====================
    /// A dimension was bound to an attribute the entity type doesn't declare
    #[error("{attribute} is not an attribute of {entity_type}")]
    UnknownAttribute {
        /// Entity type name
        entity_type: String,
        /// Offending attribute name
        attribute: String,
    },

    /// A dimension name can't be used as a key segment
    #[error("invalid dimension name '{name}': {source}")]
    InvalidDimensionName {
        /// Offending name
        name: String,
        /// Validation failure
        #[source]
        source: KeyError,
    },

    /// A sort dimension was bound to an attribute that has no numeric form
    #[error("{attribute} of {entity_type} cannot be used as a sort score (encoded as {kind})")]
    NotSortable {
        /// Entity type name
        entity_type: String,
        /// Offending attribute name
        attribute: String,
        /// Declared encoding of the attribute
        kind: &'static str,
    },

    /// Branch registered without an id
    #[error("branch id must be set before the branch is registered")]
    MissingBranchId,

    /// Branch registered without an entity type
    #[error("entity type must be set before branch {branch_id} is registered")]
    MissingEntityType {
        /// Branch id
        branch_id: String,
    },

    /// Branch id registered twice
    #[error("branch {branch_id} is already registered")]
    DuplicateBranch {
        /// Branch id
        branch_id: String,
    },

    /// Branch bound to another entity type than the repository serves
    #[error("branch {branch_id} is bound to {found}, repository serves {expected}")]
    EntityTypeMismatch {
        /// Branch id
        branch_id: String,
        /// Entity type of the repository
        expected: String,
        /// Entity type recorded on the branch
        found: String,
    },

    /// Query supplied the wrong number of group values
    #[error("branch {branch_id} takes {expected} group parameters, got {actual}")]
    ParameterCount {
        /// Branch id
        branch_id: String,
        /// Number of attribute group dimensions
        expected: usize,
        /// Number of values supplied
        actual: usize,
    },

    /// Sorted operation on an unsorted branch, or the other way round
    #[error("branch {branch_id} is {actual}, operation requires a {expected} branch")]
    BranchKindMismatch {
        /// Branch id
        branch_id: String,
        /// Kind the operation needs
        expected: &'static str,
        /// Kind of the branch
        actual: &'static str,
    },

    /// Configuration file or document could not be loaded
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    // ==================== Not Found ====================
    /// Unknown branch id
    #[error("branch not found: {branch_id}. Registered branches: [{}]", registered.join(", "))]
    BranchNotFound {
        /// Requested branch id
        branch_id: String,
        /// Template keys of every registered branch
        registered: Vec<String>,
    },

    /// Indexed identifier with no primary record
    #[error("no primary record for {entity_type} {id}")]
    RecordNotFound {
        /// Entity type name
        entity_type: String,
        /// Entity id
        id: String,
    },

    // ==================== Type Conversion ====================
    /// Value can't be converted to what the attribute or score needs
    #[error("cannot convert {attribute}: expected {expected}, found '{found}'")]
    TypeConversion {
        /// Attribute (or dimension) name
        attribute: String,
        /// Expected form
        expected: &'static str,
        /// Rendering of what was found
        found: String,
    },

    /// Attribute needed for a key has no value
    #[error("attribute {attribute} has no value")]
    MissingValue {
        /// Attribute name
        attribute: String,
    },

    /// JSON serialization/deserialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    // ==================== Backend ====================
    /// Operation against a key holding another kind of structure
    #[error("wrong type: key {key} holds a {actual}, operation needs a {expected}")]
    WrongType {
        /// Storage key
        key: String,
        /// Structure the operation needs
        expected: &'static str,
        /// Structure the key holds
        actual: &'static str,
    },

    /// Backend client error (connectivity, timeout, protocol)
    #[error("backend error: {0}")]
    Backend(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Coarse classification of an [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Branch definition or call shape is wrong; fix the caller
    Configuration,
    /// Addressed branch or record doesn't exist
    NotFound,
    /// A value couldn't be converted
    TypeConversion,
    /// The key-value backend failed
    Backend,
}

impl Error {
    /// Shorthand for [`Error::Backend`]
    pub fn backend(message: impl Into<String>) -> Self {
        Error::Backend(message.into())
    }

    /// Shorthand for [`Error::TypeConversion`]
    pub fn conversion(
        attribute: impl Into<String>,
        expected: &'static str,
        found: impl Into<String>,
    ) -> Self {
        Error::TypeConversion {
            attribute: attribute.into(),
            expected,
            found: found.into(),
        }
    }

    /// Category of this error
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::UnknownAttribute { .. }
            | Error::InvalidDimensionName { .. }
            | Error::NotSortable { .. }
            | Error::MissingBranchId
            | Error::MissingEntityType { .. }
            | Error::DuplicateBranch { .. }
            | Error::EntityTypeMismatch { .. }
            | Error::ParameterCount { .. }
            | Error::BranchKindMismatch { .. }
            | Error::InvalidConfig(_) => ErrorCategory::Configuration,
            Error::BranchNotFound { .. } | Error::RecordNotFound { .. } => ErrorCategory::NotFound,
            Error::TypeConversion { .. } | Error::MissingValue { .. } | Error::Serialization(_) => {
                ErrorCategory::TypeConversion
            }
            Error::WrongType { .. } | Error::Backend(_) | Error::Io(_) => ErrorCategory::Backend,
        }
    }

    /// Whether a caller may reasonably retry the operation
    ///
    /// Only backend failures qualify. This layer never retries on its own.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Backend(_) | Error::Io(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
