//! In-process document store.

use std::cmp::Ordering;
use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::{
    DeleteOutcome, Document, DocumentId, DocumentStore, FindQuery, InsertOutcome, Precondition,
    SortOrder, StoreError, UpdateOutcome, ID_FIELD,
};

/// Keeps collections in insertion order behind a single lock.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Vec<Document>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn has_id(document: &Document, id: &DocumentId) -> bool {
    document.get(ID_FIELD).and_then(Value::as_str) == Some(id.to_hex().as_str())
}

fn targets(document: &Document, id: &DocumentId, precondition: Option<&Precondition>) -> bool {
    has_id(document, id) && precondition.map_or(true, |p| p.holds_for(document))
}

fn matches(document: &Document, filter: &[(String, Value)]) -> bool {
    filter
        .iter()
        .all(|(field, expected)| document.get(field) == Some(expected))
}

/// Rank of a value's type in MongoDB's cross-type sort order.
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

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let x = x.as_f64().unwrap_or_default();
            let y = y.as_f64().unwrap_or_default();
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn find(&self, collection: &str, query: FindQuery) -> Result<Vec<Document>, StoreError> {
        let collections = self.collections.read().await;
        let mut found: Vec<Document> = collections
            .get(collection)
            .map(|documents| {
                documents
                    .iter()
                    .filter(|document| matches(document, &query.filter))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if let Some((field, order)) = &query.sort {
            found.sort_by(|a, b| {
                let ordering = compare_values(a.get(field), b.get(field));
                match order {
                    SortOrder::Ascending => ordering,
                    SortOrder::Descending => ordering.reverse(),
                }
            });
        }

        // A limit of zero means "no limit", as with the MongoDB driver.
        if let Some(limit) = query.limit.filter(|limit| *limit != 0) {
            found.truncate(limit.unsigned_abs() as usize);
        }

        Ok(found)
    }

    async fn find_by_id(
        &self,
        collection: &str,
        id: &DocumentId,
    ) -> Result<Option<Document>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|documents| documents.iter().find(|document| has_id(document, id)))
            .cloned())
    }

    async fn insert_one(
        &self,
        collection: &str,
        mut document: Document,
    ) -> Result<InsertOutcome, StoreError> {
        let id = DocumentId::generate();
        document.insert(ID_FIELD.to_string(), Value::String(id.to_hex()));

        self.collections
            .write()
            .await
            .entry(collection.to_string())
            .or_default()
            .push(document);

        Ok(InsertOutcome {
            acknowledged: true,
            inserted_id: id.to_hex(),
        })
    }

    async fn update_by_id(
        &self,
        collection: &str,
        id: &DocumentId,
        precondition: Option<&Precondition>,
        fields: Document,
    ) -> Result<UpdateOutcome, StoreError> {
        let mut collections = self.collections.write().await;
        let Some(document) = collections.get_mut(collection).and_then(|documents| {
            documents
                .iter_mut()
                .find(|document| targets(document, id, precondition))
        })
        else {
            return Ok(UpdateOutcome::new(0, 0));
        };

        let mut modified = false;
        for (field, value) in fields {
            if field == ID_FIELD {
                continue;
            }
            if document.get(&field) != Some(&value) {
                document.insert(field, value);
                modified = true;
            }
        }

        Ok(UpdateOutcome::new(1, u64::from(modified)))
    }

    async fn delete_by_id(
        &self,
        collection: &str,
        id: &DocumentId,
        precondition: Option<&Precondition>,
    ) -> Result<DeleteOutcome, StoreError> {
        let mut collections = self.collections.write().await;
        let deleted_count = match collections.get_mut(collection) {
            Some(documents) => match documents
                .iter()
                .position(|document| targets(document, id, precondition))
            {
                Some(index) => {
                    documents.remove(index);
                    1
                }
                None => 0,
            },
            None => 0,
        };

        Ok(DeleteOutcome {
            acknowledged: true,
            deleted_count,
        })
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[tokio::test]
    async fn insert_assigns_fresh_identifier() {
        let store = MemoryStore::new();
        let outcome = store
            .insert_one("books", doc(json!({"_id": "client-chosen", "title": "Dune"})))
            .await
            .unwrap();

        let id = DocumentId::parse(&outcome.inserted_id).unwrap();
        let stored = store.find_by_id("books", &id).await.unwrap().unwrap();
        assert_eq!(stored["_id"], json!(outcome.inserted_id));
        assert_eq!(stored["title"], json!("Dune"));
    }

    #[tokio::test]
    async fn find_filters_sorts_and_limits() {
        let store = MemoryStore::new();
        for (owner, created) in [("a", 1), ("b", 2), ("a", 3), ("a", 2)] {
            store
                .insert_one("books", doc(json!({"userEmail": owner, "createdAt": created})))
                .await
                .unwrap();
        }

        let found = store
            .find(
                "books",
                FindQuery::all()
                    .filter_eq("userEmail", "a")
                    .sort_by("createdAt", SortOrder::Descending)
                    .limit(2),
            )
            .await
            .unwrap();

        let created: Vec<_> = found.iter().map(|d| d["createdAt"].clone()).collect();
        assert_eq!(created, vec![json!(3), json!(2)]);
    }

    #[tokio::test]
    async fn missing_sort_field_orders_last_when_descending() {
        let store = MemoryStore::new();
        store
            .insert_one("books", doc(json!({"title": "undated"})))
            .await
            .unwrap();
        store
            .insert_one("books", doc(json!({"title": "dated", "createdAt": "2024-01-01"})))
            .await
            .unwrap();

        let found = store
            .find(
                "books",
                FindQuery::all().sort_by("createdAt", SortOrder::Descending),
            )
            .await
            .unwrap();
        assert_eq!(found[0]["title"], json!("dated"));
        assert_eq!(found[1]["title"], json!("undated"));
    }

    #[tokio::test]
    async fn update_merges_shallowly_and_counts() {
        let store = MemoryStore::new();
        let outcome = store
            .insert_one("books", doc(json!({"title": "Dune", "pages": 412})))
            .await
            .unwrap();
        let id = DocumentId::parse(&outcome.inserted_id).unwrap();

        let updated = store
            .update_by_id("books", &id, None, doc(json!({"pages": 500, "_id": "ignored"})))
            .await
            .unwrap();
        assert_eq!(updated, UpdateOutcome::new(1, 1));

        let unchanged = store
            .update_by_id("books", &id, None, doc(json!({"pages": 500})))
            .await
            .unwrap();
        assert_eq!(unchanged, UpdateOutcome::new(1, 0));

        let stored = store.find_by_id("books", &id).await.unwrap().unwrap();
        assert_eq!(stored["title"], json!("Dune"));
        assert_eq!(stored["pages"], json!(500));
        assert_eq!(stored["_id"], json!(outcome.inserted_id));
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let store = MemoryStore::new();
        let outcome = store
            .insert_one("books", doc(json!({"title": "Dune"})))
            .await
            .unwrap();
        let id = DocumentId::parse(&outcome.inserted_id).unwrap();

        assert_eq!(store.delete_by_id("books", &id, None).await.unwrap().deleted_count, 1);
        assert_eq!(store.delete_by_id("books", &id, None).await.unwrap().deleted_count, 0);
    }

    #[tokio::test]
    async fn writes_skip_documents_failing_the_precondition() {
        let store = MemoryStore::new();
        let outcome = store
            .insert_one("books", doc(json!({"title": "Dune", "userEmail": "b@example.com"})))
            .await
            .unwrap();
        let id = DocumentId::parse(&outcome.inserted_id).unwrap();
        let stale = Precondition::new("userEmail", "a@example.com");

        let updated = store
            .update_by_id("books", &id, Some(&stale), doc(json!({"title": "Mine"})))
            .await
            .unwrap();
        assert_eq!(updated, UpdateOutcome::new(0, 0));

        let deleted = store.delete_by_id("books", &id, Some(&stale)).await.unwrap();
        assert_eq!(deleted.deleted_count, 0);

        let stored = store.find_by_id("books", &id).await.unwrap().unwrap();
        assert_eq!(stored["title"], json!("Dune"));

        let current = Precondition::new("userEmail", "b@example.com");
        let deleted = store.delete_by_id("books", &id, Some(&current)).await.unwrap();
        assert_eq!(deleted.deleted_count, 1);
    }
}
