//! Record inputs

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::entity::{CREATED_AT_FIELD, NAME_FIELD, SLUG_FIELD, UPDATED_AT_FIELD};
use crate::store::{Document, ID_FIELD};

const SERVER_FIELDS: [&str; 3] = [ID_FIELD, CREATED_AT_FIELD, UPDATED_AT_FIELD];

fn dotted_field(fields: &Document) -> Option<&str> {
    fields.keys().map(String::as_str).find(|k| k.contains('.'))
}

fn strip_server_fields(fields: &mut Document) {
    for field in SERVER_FIELDS {
        fields.remove(field);
    }
}

/// A record to create
///
/// Fields other than `name` and `slug` are stored as given. `_id`,
/// `createdAt` and `updatedAt` are assigned by the server and ignored here.
///
/// ```rust
/// use catalog_engine::service::RecordInput;
/// use serde_json::json;
///
/// let input: RecordInput = serde_json::from_value(json!({
///     "name": "Landscape",
///     "visibility": true
/// }))
/// .unwrap();
/// assert_eq!(input.name, "Landscape");
/// assert!(input.slug.is_none());
/// assert_eq!(input.fields["visibility"], json!(true));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordInput {
    /// Display name; must not be blank
    #[serde(default)]
    pub name: String,
    /// Requested slug; derived from the name when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    /// Every other field
    #[serde(flatten)]
    pub fields: Document,
}

impl RecordInput {
    /// Input with a name only
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Request a slug
    #[must_use]
    pub fn with_slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = Some(slug.into());
        self
    }

    /// Add an extra field
    #[must_use]
    pub fn with_field(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    pub(crate) fn has_blank_name(&self) -> bool {
        self.name.trim().is_empty()
    }

    /// First extra field whose name contains a dot
    pub(crate) fn dotted_field(&self) -> Option<&str> {
        dotted_field(&self.fields)
    }

    /// Build the stored document with the resolved slug and timestamps
    pub(crate) fn into_document(self, slug: String, now: &str) -> Document {
        let mut fields = self.fields;
        strip_server_fields(&mut fields);
        fields.remove(NAME_FIELD);
        fields.remove(SLUG_FIELD);

        let mut doc = Document::new();
        doc.insert(NAME_FIELD.to_string(), Value::String(self.name));
        doc.insert(SLUG_FIELD.to_string(), Value::String(slug));
        doc.extend(fields);
        doc.insert(CREATED_AT_FIELD.to_string(), Value::String(now.to_string()));
        doc.insert(UPDATED_AT_FIELD.to_string(), Value::String(now.to_string()));
        doc
    }
}

/// A partial update
///
/// Only the fields present are written, as top-level fields; names containing
/// a dot are refused by the service. Server-assigned fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordPatch {
    /// New display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New slug; re-resolved only when it differs from the stored one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    /// Every other field to overwrite
    #[serde(flatten)]
    pub fields: Document,
}

impl RecordPatch {
    /// An empty patch
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the name
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the slug
    #[must_use]
    pub fn slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = Some(slug.into());
        self
    }

    /// Set an extra field
    #[must_use]
    pub fn field(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    pub(crate) fn has_blank_name(&self) -> bool {
        self.name.as_deref().is_some_and(|name| name.trim().is_empty())
    }

    /// First extra field whose name contains a dot
    pub(crate) fn dotted_field(&self) -> Option<&str> {
        dotted_field(&self.fields)
    }

    /// The `$set` document, excluding the slug and server fields
    pub(crate) fn into_set(self) -> Document {
        let mut fields = self.fields;
        strip_server_fields(&mut fields);
        fields.remove(SLUG_FIELD);
        fields.remove(NAME_FIELD);

        let mut set = Document::new();
        if let Some(name) = self.name {
            set.insert(NAME_FIELD.to_string(), Value::String(name));
        }
        set.extend(fields);
        set
    }
}
