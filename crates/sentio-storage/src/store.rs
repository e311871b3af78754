//! The collection-based document store interface.
//!
//! Documents are flat JSON objects addressed by `(collection, id)`. Lookups
//! are conjunctions of field equality filters returning at most one match.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Value};

use crate::error::StorageError;

/// Top-level fields of a document.
pub type Fields = serde_json::Map<String, Value>;

/// Key marking a field value that the store must replace with its own clock.
const SERVER_TIMESTAMP_KEY: &str = "$serverTimestamp";

/// A stored document.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Store-generated identifier.
    pub id: String,
    /// Document body.
    pub fields: Fields,
}

impl Document {
    /// Look up a string field.
    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }
}

/// A `field == value` predicate.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub value: Value,
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Whether `fields` satisfies this predicate.
    pub fn matches(&self, fields: &Fields) -> bool {
        fields.get(&self.field) == Some(&self.value)
    }
}

/// Durable collection-based key/value store.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Return the first document in `collection` matching every filter.
    async fn find_one(
        &self,
        collection: &str,
        filters: &[Filter],
    ) -> Result<Option<Document>, StorageError>;

    /// Fetch a document by id.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StorageError>;

    /// Insert a new document and return its generated id.
    async fn create(&self, collection: &str, fields: Fields) -> Result<String, StorageError>;

    /// Replace the given top-level fields of an existing document.
    ///
    /// Fields not named in `fields` are left untouched.
    async fn update(&self, collection: &str, id: &str, fields: Fields) -> Result<(), StorageError>;
}

/// Placeholder value resolved to the write time by the store.
pub fn server_timestamp() -> Value {
    json!({ SERVER_TIMESTAMP_KEY: true })
}

fn is_server_timestamp(value: &Value) -> bool {
    value
        .as_object()
        .map(|o| o.len() == 1 && o.get(SERVER_TIMESTAMP_KEY) == Some(&Value::Bool(true)))
        .unwrap_or(false)
}

/// Replace every top-level server-timestamp placeholder with `now`.
pub(crate) fn resolve_server_timestamps(fields: &mut Fields, now: DateTime<Utc>) {
    let stamp = Value::String(now.to_rfc3339_opts(SecondsFormat::Millis, true));
    for value in fields.values_mut() {
        if is_server_timestamp(value) {
            *value = stamp.clone();
        }
    }
}

/// Generate a new document id.
pub(crate) fn new_document_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}
