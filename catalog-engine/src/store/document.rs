//! Documents, identifiers and value ordering
//!
//! Documents are JSON objects. Identifiers are 12-byte object ids rendered as
//! 24 lowercase hex characters, the same shape document databases hand out.
//!
//! # Example
//!
//! ```rust
//! use catalog_engine::store::{document, ObjectId};
//! use serde_json::json;
//!
//! let id = ObjectId::new();
//! assert_eq!(id.to_hex().len(), 24);
//!
//! let doc = document(json!({ "name": "Landscape", "meta": { "rank": 3 } }));
//! assert_eq!(catalog_engine::store::get_path(&doc, "meta.rank"), Some(&json!(3)));
//! ```

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering as AtomicOrdering};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// Field holding the document identifier
pub const ID_FIELD: &str = "_id";

/// A stored document
pub type Document = Map<String, Value>;

/// Convert a JSON value into a document
///
/// Non-object values produce an empty document.
#[must_use]
pub fn document(value: Value) -> Document {
    match value {
        Value::Object(map) => map,
        _ => Document::new(),
    }
}

static COUNTER: AtomicU32 = AtomicU32::new(0);

/// Error returned when parsing an [`ObjectId`] from text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectIdParseError {
    input: String,
}

impl fmt::Display for ObjectIdParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid object id '{}': expected 24 hexadecimal characters",
            self.input
        )
    }
}

impl std::error::Error for ObjectIdParseError {}

/// Opaque, globally unique document identifier
///
/// Layout: 4-byte big-endian seconds since the Unix epoch, 5 random bytes,
/// 3-byte process-wide counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId([u8; 12]);

impl ObjectId {
    /// Generate a fresh identifier
    #[must_use]
    pub fn new() -> Self {
        let mut bytes = [0_u8; 12];

        let seconds = u32::try_from(chrono::Utc::now().timestamp()).unwrap_or(u32::MAX);
        bytes[..4].copy_from_slice(&seconds.to_be_bytes());

        let random = uuid::Uuid::new_v4();
        bytes[4..9].copy_from_slice(&random.as_bytes()[..5]);

        let count = COUNTER.fetch_add(1, AtomicOrdering::Relaxed);
        bytes[9..].copy_from_slice(&count.to_be_bytes()[1..]);

        Self(bytes)
    }

    /// Parse a 24-character hex string
    ///
    /// # Errors
    ///
    /// Returns [`ObjectIdParseError`] if the input is not exactly 24 hex characters.
    pub fn parse(input: &str) -> Result<Self, ObjectIdParseError> {
        let err = || ObjectIdParseError {
            input: input.to_string(),
        };

        if input.len() != 24 || !input.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(err());
        }

        let mut bytes = [0_u8; 12];
        for (i, byte) in bytes.iter_mut().enumerate() {
            let pair = &input[i * 2..i * 2 + 2];
            *byte = u8::from_str_radix(pair, 16).map_err(|_| err())?;
        }
        Ok(Self(bytes))
    }

    /// Lowercase hex rendering
    #[must_use]
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }

    /// The identifier as a JSON value, the form stored in documents
    #[must_use]
    pub fn to_value(&self) -> Value {
        Value::String(self.to_hex())
    }

}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for ObjectId {
    type Err = ObjectIdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for ObjectId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Read the identifier of a document, if it holds a well-formed one
#[must_use]
pub fn document_id(doc: &Document) -> Option<ObjectId> {
    doc.get(ID_FIELD)
        .and_then(Value::as_str)
        .and_then(|raw| ObjectId::parse(raw).ok())
}

/// Resolve a dotted field path (`a.b.c`) inside a document
#[must_use]
pub fn get_path<'a>(doc: &'a Document, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let first = segments.next()?;
    let mut current = doc.get(first)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

fn type_rank(value: Option<&Value>) -> u8 {
    match value {
        None | Some(Value::Null) => 0,
        Some(Value::Number(_)) => 1,
        Some(Value::String(_)) => 2,
        Some(Value::Object(_)) => 3,
        Some(Value::Array(_)) => 4,
        Some(Value::Bool(_)) => 5,
    }
}

/// Total order over optional JSON values
///
/// Missing and null sort first, then numbers, strings, objects, arrays and
/// booleans, the same bracket order document databases use.
#[must_use]
pub fn compare_values(left: Option<&Value>, right: Option<&Value>) -> Ordering {
    let rank = type_rank(left).cmp(&type_rank(right));
    if rank != Ordering::Equal {
        return rank;
    }

    match (left, right) {
        (Some(Value::Number(a)), Some(Value::Number(b))) => {
            let a = a.as_f64().unwrap_or(0.0);
            let b = b.as_f64().unwrap_or(0.0);
            a.partial_cmp(&b).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(a)), Some(Value::String(b))) => a.cmp(b),
        (Some(Value::Bool(a)), Some(Value::Bool(b))) => a.cmp(b),
        (Some(Value::Array(a)), Some(Value::Array(b))) => {
            for (x, y) in a.iter().zip(b.iter()) {
                let ord = compare_values(Some(x), Some(y));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            a.len().cmp(&b.len())
        }
        (Some(Value::Object(a)), Some(Value::Object(b))) => {
            for ((ka, va), (kb, vb)) in a.iter().zip(b.iter()) {
                let ord = ka.cmp(kb).then_with(|| compare_values(Some(va), Some(vb)));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            a.len().cmp(&b.len())
        }
        _ => Ordering::Equal,
    }
}

/// Equality with numeric normalisation (`1` equals `1.0`)
#[must_use]
pub fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(_), Value::Number(_)) => {
            compare_values(Some(left), Some(right)) == Ordering::Equal
        }
        _ => left == right,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_object_id_hex_roundtrip() {
        let id = ObjectId::new();
        let hex = id.to_hex();
        assert_eq!(hex.len(), 24);
        assert!(hex.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_eq!(ObjectId::parse(&hex).unwrap(), id);
    }

    #[test]
    fn test_object_id_unique() {
        let a = ObjectId::new();
        let b = ObjectId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn test_object_id_rejects_bad_input() {
        assert!(ObjectId::parse("abc").is_err());
        assert!(ObjectId::parse("zzzzzzzzzzzzzzzzzzzzzzzz").is_err());
        assert!(ObjectId::parse("65f1c2d3e4a5b6c7d8e9f0a1b").is_err());
        assert!(ObjectId::parse("65f1c2d3e4a5b6c7d8e9f0a1").is_ok());
    }

    #[test]
    fn test_object_id_rejects_signs() {
        assert!(ObjectId::parse("+0+0+0+0+0+0+0+0+0+0+0+0").is_err());
        assert!(ObjectId::parse("-1-1-1-1-1-1-1-1-1-1-1-1").is_err());
        assert!(ObjectId::parse("65f1c2d3e4a5b6c7d8e9f0+1").is_err());
    }

    #[test]
    fn test_object_id_serde() {
        let id = ObjectId::parse("65f1c2d3e4a5b6c7d8e9f0a1").unwrap();
        let encoded = serde_json::to_value(id).unwrap();
        assert_eq!(encoded, json!("65f1c2d3e4a5b6c7d8e9f0a1"));
        let decoded: ObjectId = serde_json::from_value(encoded).unwrap();
        assert_eq!(decoded, id);
    }

    #[test]
    fn test_get_path_nested() {
        let doc = document(json!({ "a": { "b": { "c": 1 } }, "x": 2 }));
        assert_eq!(get_path(&doc, "a.b.c"), Some(&json!(1)));
        assert_eq!(get_path(&doc, "x"), Some(&json!(2)));
        assert_eq!(get_path(&doc, "a.missing"), None);
        assert_eq!(get_path(&doc, "x.y"), None);
    }

    #[test]
    fn test_compare_values_brackets() {
        assert_eq!(compare_values(None, Some(&json!(1))), Ordering::Less);
        assert_eq!(compare_values(Some(&json!(5)), Some(&json!("a"))), Ordering::Less);
        assert_eq!(compare_values(Some(&json!("b")), Some(&json!("a"))), Ordering::Greater);
        assert_eq!(compare_values(Some(&json!(2)), Some(&json!(10))), Ordering::Less);
        assert_eq!(compare_values(Some(&json!(1)), Some(&json!(1.0))), Ordering::Equal);
    }

    #[test]
    fn test_values_equal_numeric() {
        assert!(values_equal(&json!(3), &json!(3.0)));
        assert!(!values_equal(&json!(3), &json!("3")));
    }
}
