//! Result envelopes
//!
//! Every service operation answers with an [`Envelope`]. List results go
//! through [`shape`], which flattens the paginated facet output into the same
//! `{ data, count }` contract the unpaginated path produces.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::query::{COUNT_FIELD, DATA_FIELD};
use crate::store::Document;

/// Response envelope
///
/// # Example
///
/// ```rust
/// use catalog_engine::response::Envelope;
///
/// let envelope: Envelope<serde_json::Value> = Envelope::ok("Orientation deleted").with_count(2);
/// let json = serde_json::to_value(&envelope).unwrap();
/// assert_eq!(
///     json,
///     serde_json::json!({ "success": true, "message": "Orientation deleted", "count": 2 })
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    /// Always `true`; failures travel as errors, not envelopes
    pub success: bool,
    /// Human-readable outcome
    pub message: String,
    /// Payload, omitted when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Number of affected or matching records, omitted when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
}

impl<T> Envelope<T> {
    /// A successful envelope with no data
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: None,
            count: None,
        }
    }

    /// Attach a payload
    #[must_use]
    pub fn with_data(mut self, data: T) -> Self {
        self.data = Some(data);
        self
    }

    /// Attach a count
    #[must_use]
    pub fn with_count(mut self, count: u64) -> Self {
        self.count = Some(count);
        self
    }

    /// Map the payload to a new type
    pub fn map<U, F>(self, f: F) -> Envelope<U>
    where
        F: FnOnce(T) -> U,
    {
        Envelope {
            success: self.success,
            message: self.message,
            data: self.data.map(f),
            count: self.count,
        }
    }
}

/// Turn raw aggregation output into a list envelope
///
/// Unpaginated: `data` is the raw list and `count` its length. Paginated: the
/// raw list holds at most one `{ data, count }` document; missing pieces
/// become an empty page and a zero count.
#[must_use]
pub fn shape(raw: Vec<Document>, paginated: bool, message: impl Into<String>) -> Envelope<Vec<Document>> {
    if !paginated {
        let count = raw.len() as u64;
        return Envelope::ok(message).with_data(raw).with_count(count);
    }

    let mut facet = raw.into_iter().next().unwrap_or_default();
    let data = match facet.remove(DATA_FIELD) {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(doc) => Some(doc),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    };
    let count = facet.get(COUNT_FIELD).and_then(Value::as_u64).unwrap_or(0);

    Envelope::ok(message).with_data(data).with_count(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::document;
    use serde_json::json;

    #[test]
    fn test_flat_count_is_length() {
        let raw = vec![document(json!({ "name": "a" })), document(json!({ "name": "b" }))];
        let envelope = shape(raw, false, "Orientations fetched");
        assert_eq!(envelope.count, Some(2));
        assert_eq!(envelope.data.as_ref().map(Vec::len), Some(2));
        assert!(envelope.success);
    }

    #[test]
    fn test_paginated_unwraps_facet() {
        let raw = vec![document(json!({
            "data": [ { "name": "a" } ],
            "count": 7
        }))];
        let envelope = shape(raw, true, "ok");
        assert_eq!(envelope.count, Some(7));
        assert_eq!(envelope.data.unwrap()[0]["name"], json!("a"));
    }

    #[test]
    fn test_paginated_empty_defaults_to_zero() {
        let envelope = shape(Vec::new(), true, "ok");
        assert_eq!(envelope.count, Some(0));
        assert_eq!(envelope.data, Some(Vec::new()));

        let envelope = shape(vec![document(json!({ "data": [] }))], true, "ok");
        assert_eq!(envelope.count, Some(0));
    }

    #[test]
    fn test_optional_fields_are_omitted() {
        let envelope: Envelope<()> = Envelope::ok("done");
        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({ "success": true, "message": "done" })
        );
    }

    #[test]
    fn test_map() {
        let envelope = Envelope::ok("x").with_data(2).map(|n| n * 10);
        assert_eq!(envelope.data, Some(20));
    }
}
