//! Document store for bookshare.
//!
//! Handlers talk to [`DocumentStore`]; the process holds exactly one store for
//! its lifetime. [`MongoStore`] backs production, [`MemoryStore`] backs tests
//! and local runs without a database.

use std::fmt;

use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;
use serde::Serialize;
use serde_json::Value;

pub mod error;
pub mod memory;
pub mod mongo;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use mongo::MongoStore;

/// A schema-less document as exchanged with HTTP clients.
pub type Document = serde_json::Map<String, Value>;

/// Field holding the store-assigned identifier.
pub const ID_FIELD: &str = "_id";

/// Store-assigned document identifier (a MongoDB ObjectId).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DocumentId(ObjectId);

impl DocumentId {
    /// Parse a 24-character hex identifier.
    pub fn parse(raw: &str) -> Result<Self, StoreError> {
        ObjectId::parse_str(raw)
            .map(Self)
            .map_err(|_| StoreError::InvalidId(raw.to_string()))
    }

    pub(crate) fn generate() -> Self {
        Self(ObjectId::new())
    }

    pub(crate) fn object_id(&self) -> ObjectId {
        self.0
    }

    pub fn to_hex(&self) -> String {
        self.0.to_hex()
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.to_hex())
    }
}

/// Sort direction for [`FindQuery::sort_by`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// Equality filter, optional single-field sort and optional limit.
#[derive(Debug, Clone, Default)]
pub struct FindQuery {
    pub filter: Vec<(String, Value)>,
    pub sort: Option<(String, SortOrder)>,
    pub limit: Option<i64>,
}

impl FindQuery {
    /// Match every document in the collection.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn filter_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter.push((field.into(), value.into()));
        self
    }

    pub fn sort_by(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.sort = Some((field.into(), order));
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Field value a write requires, checked in the same operation as the `_id`
/// match. An expected `null` also accepts a missing field, as MongoDB's
/// `{ field: null }` does.
#[derive(Debug, Clone, PartialEq)]
pub struct Precondition {
    pub field: String,
    pub expected: Value,
}

impl Precondition {
    pub fn new(field: impl Into<String>, expected: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            expected: expected.into(),
        }
    }

    pub(crate) fn holds_for(&self, document: &Document) -> bool {
        document.get(&self.field).unwrap_or(&Value::Null) == &self.expected
    }
}

/// Result of [`DocumentStore::insert_one`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertOutcome {
    pub acknowledged: bool,
    pub inserted_id: String,
}

/// Result of [`DocumentStore::update_by_id`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOutcome {
    pub acknowledged: bool,
    pub matched_count: u64,
    pub modified_count: u64,
    pub upserted_count: u64,
    pub upserted_id: Option<String>,
}

impl UpdateOutcome {
    pub(crate) fn new(matched_count: u64, modified_count: u64) -> Self {
        Self {
            acknowledged: true,
            matched_count,
            modified_count,
            upserted_count: 0,
            upserted_id: None,
        }
    }
}

/// Result of [`DocumentStore::delete_by_id`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteOutcome {
    pub acknowledged: bool,
    pub deleted_count: u64,
}

/// Operations the HTTP handlers need from the document database.
///
/// Implementations must be safe to share across every in-flight request.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Short backend name for logs.
    fn backend(&self) -> &'static str;

    async fn find(&self, collection: &str, query: FindQuery) -> Result<Vec<Document>, StoreError>;

    async fn find_by_id(
        &self,
        collection: &str,
        id: &DocumentId,
    ) -> Result<Option<Document>, StoreError>;

    /// Insert `document` verbatim. Any client-supplied `_id` is replaced.
    async fn insert_one(
        &self,
        collection: &str,
        document: Document,
    ) -> Result<InsertOutcome, StoreError>;

    /// Shallow merge: set every top-level field of `fields` on the document.
    /// With a precondition, a document that fails it counts as unmatched.
    async fn update_by_id(
        &self,
        collection: &str,
        id: &DocumentId,
        precondition: Option<&Precondition>,
        fields: Document,
    ) -> Result<UpdateOutcome, StoreError>;

    async fn delete_by_id(
        &self,
        collection: &str,
        id: &DocumentId,
        precondition: Option<&Precondition>,
    ) -> Result<DeleteOutcome, StoreError>;

    /// Round-trip to the backend to confirm it is reachable.
    async fn ping(&self) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_identifiers() {
        let id = DocumentId::parse("65a1f0c2e4b0a1b2c3d4e5f6").unwrap();
        assert_eq!(id.to_string(), "65a1f0c2e4b0a1b2c3d4e5f6");
    }

    #[test]
    fn rejects_malformed_identifiers() {
        let err = DocumentId::parse("not-an-id").unwrap_err();
        assert!(matches!(err, StoreError::InvalidId(raw) if raw == "not-an-id"));
    }

    #[test]
    fn null_precondition_accepts_missing_fields() {
        let unowned = Precondition::new("userEmail", Value::Null);
        let owned = Precondition::new("userEmail", "a@example.com");

        let mut document = Document::new();
        assert!(unowned.holds_for(&document));
        assert!(!owned.holds_for(&document));

        document.insert("userEmail".to_string(), Value::from("a@example.com"));
        assert!(!unowned.holds_for(&document));
        assert!(owned.holds_for(&document));
    }

    #[test]
    fn outcomes_serialize_like_driver_metadata() {
        let value = serde_json::to_value(UpdateOutcome::new(1, 0)).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "acknowledged": true,
                "matchedCount": 1,
                "modifiedCount": 0,
                "upsertedCount": 0,
                "upsertedId": null
            })
        );
    }
}
