//! Branch definitions
//!
//! A branch is a declarative index over one entity type: filters decide
//! membership, grouping dimensions pick the key, and an optional sort
//! dimension turns the key into an ordered index.
//!
//! # Example
//!
//! ```ignore
//! let branch = Branch::<Property>::new("BRANCH_LOCATION_SORTBY_PRICE")
//!     .filter_by(|p| p.is_active && p.is_approved)
//!     .group_by("Location")?
//!     .sort_by("Price")?;
//!
//! assert_eq!(
//!     branch.template_key(),
//!     "Property:grouped:Location:{propertyValue}:sorted:Price"
//! );
//! ```
//!
//! # Keys
//!
//! | Method | Group segments |
//! |--------|----------------|
//! | `maintenance_key(entity)` | entity form of every dimension |
//! | `template_key()` | template of every dimension |
//! | `query_key(values)` | attribute dimensions take `values` in order, function dimensions their template |
//! | `category_query_key(values)` | every dimension takes one value in order |
//!
//! A sorted branch appends `:sorted:<by>` in every form.

use std::fmt;
use std::sync::Arc;

use keybranch_core::key::KEY_SEPARATOR;
use keybranch_core::{BranchKey, Entity, Error, Result};

use crate::dimension::{GroupDimension, SortDimension};

/// Membership predicate of a branch
pub type Filter<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;

/// Declarative index over one entity type
pub struct Branch<E: 'static> {
    id: Option<String>,
    entity_type: Option<String>,
    filters: Vec<Filter<E>>,
    groups: Vec<GroupDimension<E>>,
    sort: Option<SortDimension<E>>,
}

impl<E: Entity> Branch<E> {
    /// Branch with an id, bound to `E`
    pub fn new(id: impl Into<String>) -> Self {
        Branch {
            id: Some(id.into()),
            entity_type: Some(E::TYPE_NAME.to_string()),
            ..Self::unbound()
        }
    }

    /// Branch with neither id nor entity type; can't be registered until
    /// both are set
    pub fn unbound() -> Self {
        Branch {
            id: None,
            entity_type: None,
            filters: Vec::new(),
            groups: Vec::new(),
            sort: None,
        }
    }

    /// Set the branch id
    pub fn set_branch_id(&mut self, id: impl Into<String>) {
        self.id = Some(id.into());
    }

    /// Bind the branch to an entity type name
    pub fn set_entity_type(&mut self, entity_type: impl Into<String>) {
        self.entity_type = Some(entity_type.into());
    }

    /// Branch id, if set
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Entity type name, if set
    pub fn entity_type(&self) -> Option<&str> {
        self.entity_type.as_deref()
    }

    /// Add a membership filter; filters are ANDed in registration order
    pub fn filter_by<F>(mut self, filter: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.filters.push(Arc::new(filter));
        self
    }

    /// Append a grouping dimension on a declared attribute
    pub fn group_by(mut self, attribute: &str) -> Result<Self> {
        self.groups.push(GroupDimension::attribute(attribute)?);
        Ok(self)
    }

    /// Append a grouping dimension on a computed category
    pub fn group_by_fn<F>(mut self, name: impl Into<String>, compute: F) -> Result<Self>
    where
        F: Fn(&E) -> String + Send + Sync + 'static,
    {
        self.groups.push(GroupDimension::function(name, compute)?);
        Ok(self)
    }

    /// Sort on a declared numeric attribute; replaces any previous sort
    pub fn sort_by(mut self, attribute: &str) -> Result<Self> {
        self.sort = Some(SortDimension::attribute(attribute)?);
        Ok(self)
    }

    /// Sort on a computed score; replaces any previous sort
    pub fn sort_by_fn<F>(mut self, name: impl Into<String>, compute: F) -> Result<Self>
    where
        F: Fn(&E) -> f64 + Send + Sync + 'static,
    {
        self.sort = Some(SortDimension::function(name, compute)?);
        Ok(self)
    }

    /// Grouping dimensions in declared order
    pub fn groups(&self) -> &[GroupDimension<E>] {
        &self.groups
    }

    /// Sort dimension, if any
    pub fn sort(&self) -> Option<&SortDimension<E>> {
        self.sort.as_ref()
    }

    /// Whether the branch is backed by an ordered index
    pub fn is_sorted(&self) -> bool {
        self.sort.is_some()
    }

    /// Number of values `query_key` expects
    pub fn parameter_count(&self) -> usize {
        self.groups.iter().filter(|g| g.is_attribute()).count()
    }

    /// True iff every filter accepts `entity`
    pub fn apply_filters(&self, entity: &E) -> bool {
        self.filters.iter().all(|filter| filter(entity))
    }

    /// Key holding `entity` in this branch
    pub fn maintenance_key(&self, entity: &E) -> Result<String> {
        let groups = self
            .groups
            .iter()
            .map(|group| group.key_for(entity))
            .collect::<Result<Vec<_>>>()?;
        Ok(self.compose(groups))
    }

    /// Parameter-free shape of the branch
    pub fn template_key(&self) -> String {
        self.compose(self.groups.iter().map(|group| group.template_key().clone()))
    }

    /// Key for a query by attribute values
    ///
    /// `values` fill the attribute dimensions in declared order. Function
    /// dimensions take no value and render their template.
    pub fn query_key(&self, values: &[&str]) -> Result<String> {
        let expected = self.parameter_count();
        if values.len() != expected {
            return Err(self.parameter_error(expected, values.len()));
        }

        let mut values = values.iter();
        let groups = self.groups.iter().map(|group| {
            if group.is_attribute() {
                // Count checked above
                match values.next() {
                    Some(value) => group.key_with_value(value),
                    None => group.template_key().clone(),
                }
            } else {
                group.template_key().clone()
            }
        });
        Ok(self.compose(groups))
    }

    /// Key for a query naming one value per grouping dimension
    ///
    /// Function dimensions take their category here, so this addresses the
    /// same key `maintenance_key` produced for entities in that category.
    pub fn category_query_key(&self, values: &[&str]) -> Result<String> {
        if values.len() != self.groups.len() {
            return Err(self.parameter_error(self.groups.len(), values.len()));
        }
        let groups = self
            .groups
            .iter()
            .zip(values)
            .map(|(group, value)| group.key_with_value(value));
        Ok(self.compose(groups))
    }

    /// Check the branch can be registered under `E`; returns its id
    pub(crate) fn validate(&self) -> Result<&str> {
        let id = match self.id.as_deref() {
            Some(id) if !id.is_empty() => id,
            _ => return Err(Error::MissingBranchId),
        };
        match self.entity_type.as_deref() {
            None | Some("") => Err(Error::MissingEntityType {
                branch_id: id.to_string(),
            }),
            Some(found) if found != E::TYPE_NAME => Err(Error::EntityTypeMismatch {
                branch_id: id.to_string(),
                expected: E::TYPE_NAME.to_string(),
                found: found.to_string(),
            }),
            Some(_) => Ok(id),
        }
    }

    fn parameter_error(&self, expected: usize, actual: usize) -> Error {
        Error::ParameterCount {
            branch_id: self.id.clone().unwrap_or_default(),
            expected,
            actual,
        }
    }

    fn compose(&self, groups: impl IntoIterator<Item = BranchKey>) -> String {
        let mut key = String::from(E::TYPE_NAME);
        for group in groups {
            key.push(KEY_SEPARATOR);
            key.push_str(&group.to_string());
        }
        if let Some(sort) = &self.sort {
            key.push(KEY_SEPARATOR);
            key.push_str(&sort.key().to_string());
        }
        key
    }
}

impl<E: Entity> Default for Branch<E> {
    fn default() -> Self {
        Self::unbound()
    }
}

impl<E: 'static> Clone for Branch<E> {
    fn clone(&self) -> Self {
        Branch {
            id: self.id.clone(),
            entity_type: self.entity_type.clone(),
            filters: self.filters.clone(),
            groups: self.groups.clone(),
            sort: self.sort.clone(),
        }
    }
}

impl<E: 'static> fmt::Debug for Branch<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Branch")
            .field("id", &self.id)
            .field("entity_type", &self.entity_type)
            .field("filters", &self.filters.len())
            .field("groups", &self.groups)
            .field("sort", &self.sort)
            .finish()
    }
}
