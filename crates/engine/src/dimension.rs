//! Grouping and sort dimensions
//!
//! A dimension extracts one key segment (grouping) or one score (sorting)
//! from an entity, either from a declared attribute or from a function the
//! branch author supplies. Attribute dimensions are checked against the
//! entity's attribute table when they are built, never on first use.
//!
//! Key shapes:
//!
//! | Dimension | Template | Entity form | Explicit form |
//! |-----------|----------|-------------|---------------|
//! | group by `Id` | `data:{propertyValue}` | `data:<id>` | `data:<value>` |
//! | group by attribute `A` | `grouped:A:{propertyValue}` | `grouped:A:<value>` | `grouped:A:<value>` |
//! | group by function `F` | `grouped:F` | `grouped:<result>` | `grouped:<category>` |
//! | sort by `S` | `sorted:S` | `sorted:S` | `sorted:S` |
//!
//! Function groups render their name in the template but their computed
//! category on the entity path, so a template-based query never addresses
//! a key the write path produced. [`GroupDimension::key_with_value`] is the
//! explicit by-category form.

use std::fmt;
use std::sync::Arc;

use keybranch_core::key::validate_dimension_name;
use keybranch_core::{Attribute, BranchKey, Entity, Error, Result, PLACEHOLDER_VALUE};

/// Computes a grouping category from an entity
pub type GroupFn<E> = Arc<dyn Fn(&E) -> String + Send + Sync>;

/// Computes a sort score from an entity
pub type ScoreFn<E> = Arc<dyn Fn(&E) -> f64 + Send + Sync>;

fn checked_name(name: &str) -> Result<()> {
    validate_dimension_name(name).map_err(|source| Error::InvalidDimensionName {
        name: name.to_string(),
        source,
    })
}

enum GroupSource<E: 'static> {
    Attribute(&'static Attribute<E>),
    Function { name: String, compute: GroupFn<E> },
}

/// Grouping dimension of a branch
pub struct GroupDimension<E: 'static> {
    source: GroupSource<E>,
    template: BranchKey,
}

impl<E: Entity> GroupDimension<E> {
    /// Group by a declared attribute
    ///
    /// Grouping by the identifier attribute produces primary keys.
    pub fn attribute(name: &str) -> Result<Self> {
        let attribute = E::require_attribute(name)?;
        checked_name(attribute.name())?;
        let template = if attribute.is_identifier() {
            BranchKey::primary(PLACEHOLDER_VALUE)
        } else {
            BranchKey::grouped_with(attribute.name(), PLACEHOLDER_VALUE)
        };
        Ok(GroupDimension {
            source: GroupSource::Attribute(attribute),
            template,
        })
    }

    /// Group by a computed category
    pub fn function<F>(name: impl Into<String>, compute: F) -> Result<Self>
    where
        F: Fn(&E) -> String + Send + Sync + 'static,
    {
        let name = name.into();
        checked_name(&name)?;
        let template = BranchKey::grouped(name.as_str());
        Ok(GroupDimension {
            source: GroupSource::Function {
                name,
                compute: Arc::new(compute),
            },
            template,
        })
    }

    /// Dimension name: the attribute name or the function name
    pub fn name(&self) -> &str {
        match &self.source {
            GroupSource::Attribute(attribute) => attribute.name(),
            GroupSource::Function { name, .. } => name,
        }
    }

    /// Whether this dimension reads a declared attribute
    pub fn is_attribute(&self) -> bool {
        matches!(self.source, GroupSource::Attribute(_))
    }

    /// Parameter-free key shape
    pub fn template_key(&self) -> &BranchKey {
        &self.template
    }

    /// Key addressing `entity`
    pub fn key_for(&self, entity: &E) -> Result<BranchKey> {
        match &self.source {
            GroupSource::Attribute(attribute) => {
                let value = attribute.read(entity)?;
                let rendered = value.render().ok_or_else(|| Error::MissingValue {
                    attribute: attribute.name().to_string(),
                })?;
                Ok(self.template.with_value(rendered))
            }
            GroupSource::Function { compute, .. } => Ok(BranchKey::grouped(compute(entity))),
        }
    }

    /// Key addressing an explicit value (attribute) or category (function)
    pub fn key_with_value(&self, value: &str) -> BranchKey {
        match &self.source {
            GroupSource::Attribute(_) => self.template.with_value(value),
            GroupSource::Function { .. } => BranchKey::grouped(value),
        }
    }
}

impl<E: 'static> Clone for GroupDimension<E> {
    fn clone(&self) -> Self {
        let source = match &self.source {
            GroupSource::Attribute(attribute) => GroupSource::Attribute(*attribute),
            GroupSource::Function { name, compute } => GroupSource::Function {
                name: name.clone(),
                compute: Arc::clone(compute),
            },
        };
        GroupDimension {
            source,
            template: self.template.clone(),
        }
    }
}

impl<E: 'static> fmt::Debug for GroupDimension<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.source {
            GroupSource::Attribute(_) => "attribute",
            GroupSource::Function { .. } => "function",
        };
        f.debug_struct("GroupDimension")
            .field("kind", &kind)
            .field("template", &self.template.to_string())
            .finish()
    }
}

enum SortSource<E: 'static> {
    Attribute(&'static Attribute<E>),
    Function { name: String, compute: ScoreFn<E> },
}

/// Sort dimension of a branch
pub struct SortDimension<E: 'static> {
    source: SortSource<E>,
    key: BranchKey,
}

impl<E: Entity> SortDimension<E> {
    /// Sort by a declared attribute
    ///
    /// The attribute must have a numeric form (int, float, enum, time),
    /// otherwise this fails with [`Error::NotSortable`].
    pub fn attribute(name: &str) -> Result<Self> {
        let attribute = E::require_attribute(name)?;
        if !attribute.kind().is_scorable() {
            return Err(Error::NotSortable {
                entity_type: E::TYPE_NAME.to_string(),
                attribute: attribute.name().to_string(),
                kind: attribute.kind().name(),
            });
        }
        checked_name(attribute.name())?;
        Ok(SortDimension {
            source: SortSource::Attribute(attribute),
            key: BranchKey::sorted(attribute.name()),
        })
    }

    /// Sort by a computed score
    pub fn function<F>(name: impl Into<String>, compute: F) -> Result<Self>
    where
        F: Fn(&E) -> f64 + Send + Sync + 'static,
    {
        let name = name.into();
        checked_name(&name)?;
        let key = BranchKey::sorted(name.as_str());
        Ok(SortDimension {
            source: SortSource::Function {
                name,
                compute: Arc::new(compute),
            },
            key,
        })
    }

    /// Dimension name
    pub fn name(&self) -> &str {
        match &self.source {
            SortSource::Attribute(attribute) => attribute.name(),
            SortSource::Function { name, .. } => name,
        }
    }

    /// `sorted:<name>`
    pub fn key(&self) -> &BranchKey {
        &self.key
    }

    /// Score of `entity` inside the ordered index
    pub fn score(&self, entity: &E) -> Result<f64> {
        match &self.source {
            SortSource::Attribute(attribute) => {
                let value = attribute.read(entity)?;
                value
                    .as_score()
                    .ok_or_else(|| Error::conversion(attribute.name(), "numeric score", value.to_string()))
            }
            SortSource::Function { name, compute } => {
                let score = compute(entity);
                if score.is_nan() {
                    return Err(Error::conversion(name.as_str(), "numeric score", "NaN"));
                }
                Ok(score)
            }
        }
    }
}

impl<E: 'static> Clone for SortDimension<E> {
    fn clone(&self) -> Self {
        let source = match &self.source {
            SortSource::Attribute(attribute) => SortSource::Attribute(*attribute),
            SortSource::Function { name, compute } => SortSource::Function {
                name: name.clone(),
                compute: Arc::clone(compute),
            },
        };
        SortDimension {
            source,
            key: self.key.clone(),
        }
    }
}

impl<E: 'static> fmt::Debug for SortDimension<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SortDimension")
            .field("key", &self.key.to_string())
            .finish()
    }
}
