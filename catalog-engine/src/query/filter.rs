//! Typed filter conditions
//!
//! Filters are a closed set of constraint variants (equality, comparison,
//! set membership, text match) combined conjunctively. Nothing untyped is
//! ever forwarded to the store.
//!
//! # Example
//!
//! ```rust
//! use catalog_engine::query::{Filter, FilterCondition};
//! use serde_json::json;
//!
//! let filter = Filter::new()
//!     .and(FilterCondition::eq("visibility", true))
//!     .and(FilterCondition::gte("rank", 2_i64))
//!     .and(FilterCondition::contains("name", "land"));
//!
//! assert_eq!(
//!     filter.to_json(),
//!     json!({
//!         "visibility": true,
//!         "rank": { "$gte": 2 },
//!         "name": { "$regex": "land", "$options": "i" }
//!     })
//! );
//! ```

use std::fmt;

use serde_json::{Map, Value};

use crate::store::{ObjectId, ID_FIELD};

/// Comparison operators for filter conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterOperator {
    /// Equal to
    Equal,
    /// Not equal to
    NotEqual,
    /// Greater than
    GreaterThan,
    /// Greater than or equal to
    GreaterThanOrEqual,
    /// Less than
    LessThan,
    /// Less than or equal to
    LessThanOrEqual,
    /// Value is in a list
    In,
    /// Case-insensitive substring match on a string field
    Contains,
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Equal => write!(f, "$eq"),
            Self::NotEqual => write!(f, "$ne"),
            Self::GreaterThan => write!(f, "$gt"),
            Self::GreaterThanOrEqual => write!(f, "$gte"),
            Self::LessThan => write!(f, "$lt"),
            Self::LessThanOrEqual => write!(f, "$lte"),
            Self::In => write!(f, "$in"),
            Self::Contains => write!(f, "$regex"),
        }
    }
}

impl FilterOperator {
    /// Parse a wire operator (`$gte`, `$in`, ...)
    ///
    /// `$regex` is deliberately absent: text matches are built through
    /// [`FilterCondition::contains`] only, never from raw patterns.
    #[must_use]
    pub fn from_wire(op: &str) -> Option<Self> {
        match op {
            "$eq" => Some(Self::Equal),
            "$ne" => Some(Self::NotEqual),
            "$gt" => Some(Self::GreaterThan),
            "$gte" => Some(Self::GreaterThanOrEqual),
            "$lt" => Some(Self::LessThan),
            "$lte" => Some(Self::LessThanOrEqual),
            "$in" => Some(Self::In),
            _ => None,
        }
    }
}

/// A value that can be used in filter conditions
///
/// ```rust
/// use catalog_engine::query::FilterValue;
///
/// let string_val: FilterValue = "active".into();
/// let int_val: FilterValue = 42_i64.into();
/// let bool_val: FilterValue = true.into();
/// # let _ = (string_val, int_val, bool_val);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    /// String value
    String(String),
    /// 64-bit integer value
    Integer(i64),
    /// 64-bit floating point value
    Float(f64),
    /// Boolean value
    Boolean(bool),
    /// List of string values (for `In`)
    StringList(Vec<String>),
    /// List of integer values (for `In`)
    IntegerList(Vec<i64>),
    /// Null value
    Null,
}

impl FilterValue {
    /// JSON form of the value
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::String(s) => Value::String(s.clone()),
            Self::Integer(n) => Value::from(*n),
            Self::Float(n) => Value::from(*n),
            Self::Boolean(b) => Value::Bool(*b),
            Self::StringList(list) => Value::from(list.clone()),
            Self::IntegerList(list) => Value::from(list.clone()),
            Self::Null => Value::Null,
        }
    }

    /// Build a scalar value from JSON
    ///
    /// Arrays are accepted only when every element is a string or every
    /// element is an integer. Objects are never accepted.
    #[must_use]
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(Self::Null),
            Value::Bool(b) => Some(Self::Boolean(*b)),
            Value::String(s) => Some(Self::String(s.clone())),
            Value::Number(n) => n
                .as_i64()
                .map(Self::Integer)
                .or_else(|| n.as_f64().map(Self::Float)),
            Value::Array(items) => {
                if let Some(strings) = items
                    .iter()
                    .map(|v| v.as_str().map(str::to_string))
                    .collect::<Option<Vec<_>>>()
                {
                    return Some(Self::StringList(strings));
                }
                items
                    .iter()
                    .map(Value::as_i64)
                    .collect::<Option<Vec<_>>>()
                    .map(Self::IntegerList)
            }
            Value::Object(_) => None,
        }
    }

    /// Whether this is a list value
    #[must_use]
    pub const fn is_list(&self) -> bool {
        matches!(self, Self::StringList(_) | Self::IntegerList(_))
    }
}

impl From<&str> for FilterValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for FilterValue {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<i32> for FilterValue {
    fn from(n: i32) -> Self {
        Self::Integer(i64::from(n))
    }
}

impl From<f64> for FilterValue {
    fn from(n: f64) -> Self {
        Self::Float(n)
    }
}

impl From<bool> for FilterValue {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<Vec<String>> for FilterValue {
    fn from(list: Vec<String>) -> Self {
        Self::StringList(list)
    }
}

impl From<Vec<i64>> for FilterValue {
    fn from(list: Vec<i64>) -> Self {
        Self::IntegerList(list)
    }
}

impl From<ObjectId> for FilterValue {
    fn from(id: ObjectId) -> Self {
        Self::String(id.to_hex())
    }
}

/// A single filter condition
#[derive(Debug, Clone, PartialEq)]
pub struct FilterCondition {
    /// The field name (dotted paths allowed)
    pub field: String,
    /// The comparison operator
    pub operator: FilterOperator,
    /// The value to compare against
    pub value: FilterValue,
}

impl FilterCondition {
    /// Create a new filter condition
    pub fn new(field: impl Into<String>, operator: FilterOperator, value: FilterValue) -> Self {
        Self {
            field: field.into(),
            operator,
            value,
        }
    }

    /// Equality (`field == value`)
    pub fn eq(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(field, FilterOperator::Equal, value.into())
    }

    /// Inequality (`field != value`)
    pub fn ne(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(field, FilterOperator::NotEqual, value.into())
    }

    /// `field > value`
    pub fn gt(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(field, FilterOperator::GreaterThan, value.into())
    }

    /// `field >= value`
    pub fn gte(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(field, FilterOperator::GreaterThanOrEqual, value.into())
    }

    /// `field < value`
    pub fn lt(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(field, FilterOperator::LessThan, value.into())
    }

    /// `field <= value`
    pub fn lte(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(field, FilterOperator::LessThanOrEqual, value.into())
    }

    /// Membership in a list of strings
    pub fn in_strings(field: impl Into<String>, values: Vec<String>) -> Self {
        Self::new(field, FilterOperator::In, FilterValue::StringList(values))
    }

    /// Membership in a list of integers
    pub fn in_integers(field: impl Into<String>, values: Vec<i64>) -> Self {
        Self::new(field, FilterOperator::In, FilterValue::IntegerList(values))
    }

    /// Membership of the document id in a set of ids
    pub fn id_in(ids: &[ObjectId]) -> Self {
        Self::in_strings(ID_FIELD, ids.iter().map(ObjectId::to_hex).collect())
    }

    /// Case-insensitive substring match
    ///
    /// The term is matched literally; regex metacharacters are escaped when
    /// the condition is rendered.
    pub fn contains(field: impl Into<String>, term: impl Into<String>) -> Self {
        Self::new(
            field,
            FilterOperator::Contains,
            FilterValue::String(term.into()),
        )
    }

    fn operator_json(&self) -> Value {
        match (self.operator, &self.value) {
            (FilterOperator::Contains, FilterValue::String(term)) => {
                let mut op = Map::new();
                op.insert("$regex".into(), Value::String(regex::escape(term)));
                op.insert("$options".into(), Value::String("i".into()));
                Value::Object(op)
            }
            (operator, value) => {
                let mut op = Map::new();
                op.insert(operator.to_string(), value.to_json());
                Value::Object(op)
            }
        }
    }
}

/// A conjunction of filter conditions
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<FilterCondition>,
}

impl Filter {
    /// An empty filter (matches every document)
    #[must_use]
    pub const fn new() -> Self {
        Self {
            conditions: Vec::new(),
        }
    }

    /// Filter matching a single document id
    #[must_use]
    pub fn by_id(id: ObjectId) -> Self {
        Self::new().and(FilterCondition::eq(ID_FIELD, id))
    }

    /// Filter matching any id in the set
    #[must_use]
    pub fn by_ids(ids: &[ObjectId]) -> Self {
        Self::new().and(FilterCondition::id_in(ids))
    }

    /// Add a condition
    #[must_use]
    pub fn and(mut self, condition: FilterCondition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Add a condition in place
    pub fn push(&mut self, condition: FilterCondition) {
        self.conditions.push(condition);
    }

    /// The conditions, in insertion order
    #[must_use]
    pub fn conditions(&self) -> &[FilterCondition] {
        &self.conditions
    }

    /// Whether the filter has no conditions
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Render as a MongoDB query document
    ///
    /// Conditions on distinct fields merge into one object; a lone equality
    /// renders as a bare value. If the same operator appears twice on one
    /// field the conditions render as an `$and` list instead.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let mut merged = Map::new();
        let mut collided = false;

        for condition in &self.conditions {
            let rendered = condition.operator_json();
            match merged.get_mut(&condition.field) {
                None => {
                    merged.insert(condition.field.clone(), rendered);
                }
                Some(Value::Object(existing)) => {
                    if let Value::Object(ops) = rendered {
                        for (op, value) in ops {
                            if existing.contains_key(&op) {
                                collided = true;
                            }
                            existing.insert(op, value);
                        }
                    }
                }
                Some(_) => collided = true,
            }
        }

        if collided {
            let parts = self
                .conditions
                .iter()
                .map(|c| {
                    let mut part = Map::new();
                    part.insert(c.field.clone(), c.operator_json());
                    Value::Object(part)
                })
                .collect::<Vec<_>>();
            let mut and = Map::new();
            and.insert("$and".into(), Value::Array(parts));
            return Value::Object(and);
        }

        // Collapse `{ field: { "$eq": v } }` to `{ field: v }`
        for value in merged.values_mut() {
            if let Value::Object(ops) = value {
                if ops.len() == 1 {
                    if let Some(inner) = ops.get("$eq") {
                        *value = inner.clone();
                    }
                }
            }
        }

        Value::Object(merged)
    }
}

impl From<Vec<FilterCondition>> for Filter {
    fn from(conditions: Vec<FilterCondition>) -> Self {
        Self { conditions }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_filter_operator_display() {
        assert_eq!(format!("{}", FilterOperator::Equal), "$eq");
        assert_eq!(format!("{}", FilterOperator::NotEqual), "$ne");
        assert_eq!(format!("{}", FilterOperator::GreaterThan), "$gt");
        assert_eq!(format!("{}", FilterOperator::GreaterThanOrEqual), "$gte");
        assert_eq!(format!("{}", FilterOperator::LessThan), "$lt");
        assert_eq!(format!("{}", FilterOperator::LessThanOrEqual), "$lte");
        assert_eq!(format!("{}", FilterOperator::In), "$in");
        assert_eq!(format!("{}", FilterOperator::Contains), "$regex");
    }

    #[test]
    fn test_from_wire_rejects_unknown() {
        assert_eq!(FilterOperator::from_wire("$gte"), Some(FilterOperator::GreaterThanOrEqual));
        assert_eq!(FilterOperator::from_wire("$where"), None);
        assert_eq!(FilterOperator::from_wire("$regex"), None);
    }

    #[test]
    fn test_filter_value_from_json() {
        assert_eq!(FilterValue::from_json(&json!(3)), Some(FilterValue::Integer(3)));
        assert_eq!(FilterValue::from_json(&json!(1.5)), Some(FilterValue::Float(1.5)));
        assert_eq!(
            FilterValue::from_json(&json!(["a", "b"])),
            Some(FilterValue::StringList(vec!["a".into(), "b".into()]))
        );
        assert_eq!(
            FilterValue::from_json(&json!([1, 2])),
            Some(FilterValue::IntegerList(vec![1, 2]))
        );
        assert_eq!(FilterValue::from_json(&json!(["a", 1])), None);
        assert_eq!(FilterValue::from_json(&json!({ "$gt": 1 })), None);
    }

    #[test]
    fn test_filter_value_from_object_id() {
        let id = ObjectId::parse("65f1c2d3e4a5b6c7d8e9f0a1").unwrap();
        let value: FilterValue = id.into();
        assert_eq!(value, FilterValue::String("65f1c2d3e4a5b6c7d8e9f0a1".into()));
    }

    #[test]
    fn test_filter_to_json_merges_range() {
        let filter = Filter::new()
            .and(FilterCondition::gte("price", 10_i64))
            .and(FilterCondition::lt("price", 20_i64));
        assert_eq!(filter.to_json(), json!({ "price": { "$gte": 10, "$lt": 20 } }));
    }

    #[test]
    fn test_filter_to_json_equality_is_bare() {
        let filter = Filter::new().and(FilterCondition::eq("status", "active"));
        assert_eq!(filter.to_json(), json!({ "status": "active" }));
    }

    #[test]
    fn test_filter_to_json_collision_uses_and() {
        let filter = Filter::new()
            .and(FilterCondition::eq("status", "a"))
            .and(FilterCondition::eq("status", "b"));
        assert_eq!(
            filter.to_json(),
            json!({ "$and": [ { "status": { "$eq": "a" } }, { "status": { "$eq": "b" } } ] })
        );
    }

    #[test]
    fn test_contains_escapes_metacharacters() {
        let filter = Filter::new().and(FilterCondition::contains("name", "a.b*"));
        assert_eq!(
            filter.to_json(),
            json!({ "name": { "$regex": "a\\.b\\*", "$options": "i" } })
        );
    }

    #[test]
    fn test_by_ids() {
        let id = ObjectId::parse("65f1c2d3e4a5b6c7d8e9f0a1").unwrap();
        let filter = Filter::by_ids(&[id]);
        assert_eq!(
            filter.to_json(),
            json!({ "_id": { "$in": ["65f1c2d3e4a5b6c7d8e9f0a1"] } })
        );
    }

    #[test]
    fn test_empty_filter() {
        assert!(Filter::new().is_empty());
        assert_eq!(Filter::new().to_json(), json!({}));
    }
}
