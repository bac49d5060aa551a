//! MongoDB-backed document store.

use async_trait::async_trait;
use futures_util::TryStreamExt;
use mongodb::bson::{self, doc, Bson};
use mongodb::options::{ClientOptions, Credential};
use mongodb::{Client, Collection, Database};
use serde_json::Value;

use crate::{
    DeleteOutcome, Document, DocumentId, DocumentStore, FindQuery, InsertOutcome, Precondition,
    SortOrder, StoreError, UpdateOutcome, ID_FIELD,
};

/// Connection parameters for [`MongoStore::connect`].
#[derive(Debug, Clone, Copy)]
pub struct ConnectOptions<'a> {
    pub uri: &'a str,
    pub database: &'a str,
    pub user: Option<&'a str>,
    pub password: Option<&'a str>,
    pub app_name: &'a str,
}

/// One long-lived client shared by every request.
#[derive(Clone, Debug)]
pub struct MongoStore {
    client: Client,
    database: Database,
}

impl MongoStore {
    /// Build the client. The driver connects lazily, so this does not fail
    /// when the cluster is unreachable; call [`DocumentStore::ping`] for that.
    pub async fn connect(options: ConnectOptions<'_>) -> Result<Self, StoreError> {
        let mut client_options = ClientOptions::parse(options.uri).await?;

        if let (Some(user), Some(password)) = (options.user, options.password) {
            client_options.credential = Some(
                Credential::builder()
                    .username(user.to_string())
                    .password(password.to_string())
                    .build(),
            );
        }
        client_options.app_name = Some(options.app_name.to_string());

        let client = Client::with_options(client_options)?;
        let database = client.database(options.database);

        tracing::info!(
            target: "bookshare-db",
            database = options.database,
            authenticated = options.user.is_some(),
            "mongodb client created"
        );

        Ok(Self { client, database })
    }

    fn collection(&self, name: &str) -> Collection<bson::Document> {
        self.database.collection(name)
    }
}

fn to_bson_document(document: &Document) -> Result<bson::Document, StoreError> {
    Ok(bson::to_document(document)?)
}

fn filter_document(filter: &[(String, Value)]) -> Result<bson::Document, StoreError> {
    let mut out = bson::Document::new();
    for (field, value) in filter {
        out.insert(field.clone(), bson::to_bson(value)?);
    }
    Ok(out)
}

/// Render a stored document as client JSON, with `_id` as a hex string.
fn to_json(mut document: bson::Document) -> Document {
    let hex = match document.get(ID_FIELD) {
        Some(Bson::ObjectId(oid)) => Some(oid.to_hex()),
        _ => None,
    };
    if let Some(hex) = hex {
        document.insert(ID_FIELD, hex);
    }

    match Bson::Document(document).into_relaxed_extjson() {
        Value::Object(map) => map,
        _ => Document::new(),
    }
}

fn by_id(id: &DocumentId) -> bson::Document {
    doc! { ID_FIELD: id.object_id() }
}

fn by_id_where(
    id: &DocumentId,
    precondition: Option<&Precondition>,
) -> Result<bson::Document, StoreError> {
    let mut filter = by_id(id);
    if let Some(precondition) = precondition {
        filter.insert(
            precondition.field.clone(),
            bson::to_bson(&precondition.expected)?,
        );
    }
    Ok(filter)
}

#[async_trait]
impl DocumentStore for MongoStore {
    fn backend(&self) -> &'static str {
        "mongodb"
    }

    async fn find(&self, collection: &str, query: FindQuery) -> Result<Vec<Document>, StoreError> {
        let collection = self.collection(collection);
        let mut action = collection.find(filter_document(&query.filter)?);

        if let Some((field, order)) = &query.sort {
            let direction = match order {
                SortOrder::Ascending => 1,
                SortOrder::Descending => -1,
            };
            let mut sort = bson::Document::new();
            sort.insert(field.clone(), direction);
            action = action.sort(sort);
        }
        if let Some(limit) = query.limit {
            action = action.limit(limit);
        }

        let documents: Vec<bson::Document> = action.await?.try_collect().await?;
        Ok(documents.into_iter().map(to_json).collect())
    }

    async fn find_by_id(
        &self,
        collection: &str,
        id: &DocumentId,
    ) -> Result<Option<Document>, StoreError> {
        let found = self.collection(collection).find_one(by_id(id)).await?;
        Ok(found.map(to_json))
    }

    async fn insert_one(
        &self,
        collection: &str,
        mut document: Document,
    ) -> Result<InsertOutcome, StoreError> {
        document.remove(ID_FIELD);
        let result = self
            .collection(collection)
            .insert_one(to_bson_document(&document)?)
            .await?;

        let inserted_id = match result.inserted_id {
            Bson::ObjectId(oid) => oid.to_hex(),
            other => other.to_string(),
        };

        Ok(InsertOutcome {
            acknowledged: true,
            inserted_id,
        })
    }

    async fn update_by_id(
        &self,
        collection: &str,
        id: &DocumentId,
        precondition: Option<&Precondition>,
        mut fields: Document,
    ) -> Result<UpdateOutcome, StoreError> {
        fields.remove(ID_FIELD);
        let collection = self.collection(collection);
        let filter = by_id_where(id, precondition)?;

        // The server rejects an empty `$set`.
        if fields.is_empty() {
            let matched = collection.count_documents(filter).await?;
            return Ok(UpdateOutcome::new(matched, 0));
        }

        let result = collection
            .update_one(filter, doc! { "$set": to_bson_document(&fields)? })
            .await?;

        Ok(UpdateOutcome::new(result.matched_count, result.modified_count))
    }

    async fn delete_by_id(
        &self,
        collection: &str,
        id: &DocumentId,
        precondition: Option<&Precondition>,
    ) -> Result<DeleteOutcome, StoreError> {
        let result = self
            .collection(collection)
            .delete_one(by_id_where(id, precondition)?)
            .await?;
        Ok(DeleteOutcome {
            acknowledged: true,
            deleted_count: result.deleted_count,
        })
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await?;
        Ok(())
    }
}
