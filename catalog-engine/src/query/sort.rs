//! Sort specifications

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Direction for ordering results
///
/// ```rust
/// use catalog_engine::query::OrderDirection;
///
/// assert_eq!(format!("{}", OrderDirection::Ascending), "asc");
/// assert_eq!(OrderDirection::Descending.as_wire(), -1);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum OrderDirection {
    /// Sort in ascending order (A-Z, 0-9)
    #[default]
    #[serde(rename = "asc")]
    Ascending,
    /// Sort in descending order (Z-A, 9-0)
    #[serde(rename = "desc")]
    Descending,
}

impl fmt::Display for OrderDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ascending => write!(f, "asc"),
            Self::Descending => write!(f, "desc"),
        }
    }
}

impl OrderDirection {
    /// The numeric form used in pipeline sort stages
    #[must_use]
    pub const fn as_wire(&self) -> i32 {
        match self {
            Self::Ascending => 1,
            Self::Descending => -1,
        }
    }

    /// Parse `1`, `-1`, `"asc"`, `"desc"` (and their long spellings)
    #[must_use]
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => match n.as_i64() {
                Some(1) => Some(Self::Ascending),
                Some(-1) => Some(Self::Descending),
                _ => None,
            },
            Value::String(s) => match s.to_ascii_lowercase().as_str() {
                "asc" | "ascending" | "1" => Some(Self::Ascending),
                "desc" | "descending" | "-1" => Some(Self::Descending),
                _ => None,
            },
            _ => None,
        }
    }
}

/// One sort key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey {
    /// Field to sort on (dotted paths allowed)
    pub field: String,
    /// Direction
    #[serde(default)]
    pub direction: OrderDirection,
}

/// Ordered list of sort keys; earlier keys take precedence
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SortSpec(Vec<SortKey>);

impl SortSpec {
    /// An empty sort spec
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Append a key
    #[must_use]
    pub fn then(mut self, field: impl Into<String>, direction: OrderDirection) -> Self {
        self.0.push(SortKey {
            field: field.into(),
            direction,
        });
        self
    }

    /// Shorthand for a single ascending key
    #[must_use]
    pub fn ascending(field: impl Into<String>) -> Self {
        Self::new().then(field, OrderDirection::Ascending)
    }

    /// Shorthand for a single descending key
    #[must_use]
    pub fn descending(field: impl Into<String>) -> Self {
        Self::new().then(field, OrderDirection::Descending)
    }

    /// The keys, highest precedence first
    #[must_use]
    pub fn keys(&self) -> &[SortKey] {
        &self.0
    }

    /// Whether the spec has no keys
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Render as `{ field: 1 | -1, ... }`
    #[must_use]
    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        for key in &self.0 {
            map.insert(key.field.clone(), Value::from(key.direction.as_wire()));
        }
        Value::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_order_direction_default() {
        assert_eq!(OrderDirection::default(), OrderDirection::Ascending);
    }

    #[test]
    fn test_order_direction_from_json() {
        assert_eq!(OrderDirection::from_json(&json!(1)), Some(OrderDirection::Ascending));
        assert_eq!(OrderDirection::from_json(&json!(-1)), Some(OrderDirection::Descending));
        assert_eq!(OrderDirection::from_json(&json!("DESC")), Some(OrderDirection::Descending));
        assert_eq!(OrderDirection::from_json(&json!(2)), None);
        assert_eq!(OrderDirection::from_json(&json!(true)), None);
    }

    #[test]
    fn test_sort_spec_to_json_keeps_order() {
        let spec = SortSpec::descending("createdAt").then("name", OrderDirection::Ascending);
        let rendered = spec.to_json();
        let keys: Vec<_> = rendered.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["createdAt".to_string(), "name".to_string()]);
        assert_eq!(rendered, json!({ "createdAt": -1, "name": 1 }));
    }

    #[test]
    fn test_sort_spec_serde() {
        let spec: SortSpec =
            serde_json::from_value(json!([{ "field": "createdAt", "direction": "desc" }])).unwrap();
        assert_eq!(spec, SortSpec::descending("createdAt"));
    }
}
