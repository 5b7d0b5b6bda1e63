//! Projection specifications

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::store::ID_FIELD;

/// Whether a projection keeps or drops its listed fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectionMode {
    /// Only the listed fields (plus `_id` unless excluded) survive
    Include,
    /// Every field except the listed ones survives
    Exclude,
}

/// One projected field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectField {
    /// Top-level field name
    pub field: String,
    /// `true` to include, `false` to exclude
    pub include: bool,
}

/// Ordered field → inclusion map
///
/// ```rust
/// use catalog_engine::query::{ProjectionMode, SelectSpec};
///
/// let select = SelectSpec::new().include("name").include("slug");
/// assert_eq!(select.mode(), Some(ProjectionMode::Include));
///
/// let mixed = SelectSpec::new().include("name").exclude("slug");
/// assert_eq!(mixed.mode(), None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SelectSpec(Vec<SelectField>);

impl SelectSpec {
    /// An empty projection
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Add or replace an entry
    #[must_use]
    pub fn with(mut self, field: impl Into<String>, include: bool) -> Self {
        let field = field.into();
        if let Some(existing) = self.0.iter_mut().find(|f| f.field == field) {
            existing.include = include;
        } else {
            self.0.push(SelectField { field, include });
        }
        self
    }

    /// Include a field
    #[must_use]
    pub fn include(self, field: impl Into<String>) -> Self {
        self.with(field, true)
    }

    /// Exclude a field
    #[must_use]
    pub fn exclude(self, field: impl Into<String>) -> Self {
        self.with(field, false)
    }

    /// The entries, in insertion order
    #[must_use]
    pub fn fields(&self) -> &[SelectField] {
        &self.0
    }

    /// Whether no field is listed
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Inclusion flag for `_id`, if listed
    #[must_use]
    pub fn id_flag(&self) -> Option<bool> {
        self.0
            .iter()
            .find(|f| f.field == ID_FIELD)
            .map(|f| f.include)
    }

    /// Resolve the projection mode
    ///
    /// `_id` may be excluded from an inclusion projection. Any other mix of
    /// inclusions and exclusions is invalid and yields `None`. A spec that
    /// lists only `_id` follows its flag.
    #[must_use]
    pub fn mode(&self) -> Option<ProjectionMode> {
        let mut includes = false;
        let mut excludes = false;
        for entry in self.0.iter().filter(|f| f.field != ID_FIELD) {
            if entry.include {
                includes = true;
            } else {
                excludes = true;
            }
        }

        match (includes, excludes) {
            (true, true) => None,
            (true, false) => Some(ProjectionMode::Include),
            (false, true) => Some(ProjectionMode::Exclude),
            (false, false) => match self.id_flag() {
                Some(false) => Some(ProjectionMode::Exclude),
                _ => Some(ProjectionMode::Include),
            },
        }
    }

    /// Render as `{ field: 1 | 0, ... }`
    #[must_use]
    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        for entry in &self.0 {
            map.insert(entry.field.clone(), Value::from(i32::from(entry.include)));
        }
        Value::Object(map)
    }
}
