//! MongoDB access layer
//!
//! Every read and conditional update excludes soft-deleted documents.
//! Multi-collection writes run through the `*_in` methods inside a session
//! transaction, which needs a replica set or mongos.

use bson::{doc, DateTime, Document};
use futures_util::{TryStream, TryStreamExt};
use mongodb::{
    error::{ErrorKind, WriteFailure},
    options::{IndexOptions, UpdateModifications},
    Client, ClientSession, Collection, IndexModel,
};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{info, warn};

use crate::db::schemas::Metadata;
use crate::types::MicError;

/// Duplicate key server error code
const DUPLICATE_KEY: i32 = 11000;

/// Index definitions a document type wants on its collection
pub trait IntoIndexes {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)>;
}

/// Access to a document's bookkeeping metadata
pub trait MutMetadata {
    fn mut_metadata(&mut self) -> &mut Metadata;
}

/// Connected client bound to one database
#[derive(Clone)]
pub struct MongoClient {
    client: Client,
    db_name: String,
}

impl MongoClient {
    /// Connect and ping. Fails fast when the server is unreachable.
    pub async fn new(uri: &str, db_name: &str) -> Result<Self, MicError> {
        info!(uri, "Connecting to MongoDB");

        let timeout_uri = if uri.contains('?') {
            format!("{}&serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        } else {
            format!("{}?serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        };

        let client = Client::with_uri_str(&timeout_uri)
            .await
            .map_err(|e| MicError::Database(format!("Failed to connect to MongoDB: {}", e)))?;

        client
            .database(db_name)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| MicError::Database(format!("MongoDB ping failed: {}", e)))?;

        info!(db = db_name, "MongoDB reachable");

        Ok(Self {
            client,
            db_name: db_name.to_string(),
        })
    }

    /// Get a typed collection
    pub async fn collection<T>(&self, name: &str) -> Result<MongoCollection<T>, MicError>
    where
        T: Serialize + DeserializeOwned + Unpin + Send + Sync + Default + IntoIndexes + MutMetadata,
    {
        MongoCollection::new(&self.client, &self.db_name, name).await
    }

    /// Open a session with a transaction already started
    pub async fn start_transaction(&self) -> Result<ClientSession, MicError> {
        let mut session = self
            .client
            .start_session()
            .await
            .map_err(|e| MicError::Database(format!("Failed to start session: {}", e)))?;
        session
            .start_transaction()
            .await
            .map_err(|e| MicError::Database(format!("Failed to start transaction: {}", e)))?;
        Ok(session)
    }

    pub fn db_name(&self) -> &str {
        &self.db_name
    }
}

/// Collection of `T` with its indexes applied on open
#[derive(Debug, Clone)]
pub struct MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync,
{
    inner: Collection<T>,
}

impl<T> MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync + Default + IntoIndexes + MutMetadata,
{
    /// Create a new collection and apply indexes
    pub async fn new(client: &Client, db_name: &str, collection_name: &str) -> Result<Self, MicError> {
        let collection = client.database(db_name).collection::<T>(collection_name);
        let mongo_collection = MongoCollection { inner: collection };

        mongo_collection.apply_indexes().await?;

        Ok(mongo_collection)
    }

    async fn apply_indexes(&self) -> Result<(), MicError> {
        let schema_indices = T::into_indices();

        if schema_indices.is_empty() {
            return Ok(());
        }

        let indices: Vec<IndexModel> = schema_indices
            .into_iter()
            .map(|(keys, opts)| IndexModel::builder().keys(keys).options(opts).build())
            .collect();

        self.inner
            .create_indexes(indices)
            .await
            .map_err(|e| MicError::Database(format!("Failed to create indexes: {}", e)))?;

        Ok(())
    }

    /// Insert a document, keeping its timestamps and clearing the deleted flag
    pub async fn insert_one(&self, mut item: T) -> Result<(), MicError> {
        let metadata = item.mut_metadata();
        metadata.is_deleted = false;
        metadata.created_at.get_or_insert_with(DateTime::now);
        metadata.updated_at.get_or_insert_with(DateTime::now);

        self.inner
            .insert_one(item)
            .await
            .map_err(|e| MicError::Database(format!("Insert failed: {}", e)))?;

        Ok(())
    }

    /// Insert `item` unless a document matches `filter`. Returns whether it
    /// was inserted. A concurrent insert losing on a unique index counts as
    /// "already present".
    pub async fn insert_if_absent(&self, filter: Document, item: T) -> Result<bool, MicError> {
        let fields = insert_fields(item)?;

        match self
            .inner
            .update_one(filter, doc! { "$setOnInsert": fields })
            .upsert(true)
            .await
        {
            Ok(result) => Ok(result.upserted_id.is_some()),
            Err(e) if is_duplicate_key(&e) => Ok(false),
            Err(e) => Err(MicError::Database(format!("Upsert failed: {}", e))),
        }
    }

    /// `insert_if_absent` inside `session`'s transaction. A unique-index
    /// race aborts the transaction instead of reading as "already present".
    pub async fn insert_if_absent_in(
        &self,
        session: &mut ClientSession,
        filter: Document,
        item: T,
    ) -> Result<bool, MicError> {
        let fields = insert_fields(item)?;

        self.inner
            .update_one(filter, doc! { "$setOnInsert": fields })
            .upsert(true)
            .session(&mut *session)
            .await
            .map(|r| r.upserted_id.is_some())
            .map_err(|e| MicError::Database(format!("Upsert failed: {}", e)))
    }

    /// Find one live document by filter
    pub async fn find_one(&self, filter: Document) -> Result<Option<T>, MicError> {
        self.inner
            .find_one(live(filter))
            .await
            .map_err(|e| MicError::Database(format!("Find failed: {}", e)))
    }

    /// Find live documents, optionally sorted
    pub async fn find_many(&self, filter: Document, sort: Option<Document>) -> Result<Vec<T>, MicError> {
        let mut find = self.inner.find(live(filter));
        if let Some(sort) = sort {
            find = find.sort(sort);
        }

        let cursor = find
            .await
            .map_err(|e| MicError::Database(format!("Find failed: {}", e)))?;

        collect_documents(cursor).await
    }

    /// Count live documents
    pub async fn count(&self, filter: Document) -> Result<u64, MicError> {
        self.inner
            .count_documents(live(filter))
            .await
            .map_err(|e| MicError::Database(format!("Count failed: {}", e)))
    }

    /// Update one live document; returns the matched count
    pub async fn update_one(
        &self,
        filter: Document,
        update: impl Into<UpdateModifications>,
    ) -> Result<u64, MicError> {
        self.inner
            .update_one(live(filter), update.into())
            .await
            .map(|r| r.matched_count)
            .map_err(|e| MicError::Database(format!("Update failed: {}", e)))
    }

    /// `update_one` inside `session`'s transaction
    pub async fn update_one_in(
        &self,
        session: &mut ClientSession,
        filter: Document,
        update: impl Into<UpdateModifications>,
    ) -> Result<u64, MicError> {
        self.inner
            .update_one(live(filter), update.into())
            .session(&mut *session)
            .await
            .map(|r| r.matched_count)
            .map_err(|e| MicError::Database(format!("Update failed: {}", e)))
    }

    /// Soft delete one live document; returns the matched count
    pub async fn soft_delete(&self, filter: Document) -> Result<u64, MicError> {
        self.update_one(filter, soft_delete_update()).await
    }

    pub async fn soft_delete_in(&self, session: &mut ClientSession, filter: Document) -> Result<u64, MicError> {
        self.update_one_in(session, filter, soft_delete_update()).await
    }

    /// Remove every matching document inside `session`'s transaction
    pub async fn delete_many_in(&self, session: &mut ClientSession, filter: Document) -> Result<u64, MicError> {
        self.inner
            .delete_many(filter)
            .session(&mut *session)
            .await
            .map(|r| r.deleted_count)
            .map_err(|e| MicError::Database(format!("Delete failed: {}", e)))
    }

    /// Remove one document outright
    pub async fn delete_one(&self, filter: Document) -> Result<u64, MicError> {
        self.inner
            .delete_one(filter)
            .await
            .map(|r| r.deleted_count)
            .map_err(|e| MicError::Database(format!("Delete failed: {}", e)))
    }
}

/// Commit on `Ok`, abort on `Err`, and pass the result through.
pub async fn finish_transaction<R>(
    session: &mut ClientSession,
    result: Result<R, MicError>,
) -> Result<R, MicError> {
    match result {
        Ok(value) => {
            session
                .commit_transaction()
                .await
                .map_err(|e| MicError::Database(format!("Commit failed: {}", e)))?;
            Ok(value)
        }
        Err(e) => {
            if let Err(abort) = session.abort_transaction().await {
                warn!(error = %abort, "Transaction abort failed");
            }
            Err(e)
        }
    }
}

/// Drain a cursor. One undecodable document fails the whole read.
async fn collect_documents<S, T, E>(cursor: S) -> Result<Vec<T>, MicError>
where
    S: TryStream<Ok = T, Error = E>,
    E: std::fmt::Display,
{
    cursor
        .try_collect()
        .await
        .map_err(|e| MicError::Database(format!("Failed to read documents: {}", e)))
}

/// Document fields for an upsert, with fresh metadata and no `_id`
fn insert_fields<T: Serialize + MutMetadata>(mut item: T) -> Result<Document, MicError> {
    let metadata = item.mut_metadata();
    metadata.is_deleted = false;
    metadata.created_at.get_or_insert_with(DateTime::now);
    metadata.updated_at.get_or_insert_with(DateTime::now);

    let mut fields = bson::to_document(&item)?;
    fields.remove("_id");
    Ok(fields)
}

fn soft_delete_update() -> Document {
    doc! {
        "$set": {
            "metadata.is_deleted": true,
            "metadata.deleted_at": DateTime::now(),
            "metadata.updated_at": DateTime::now(),
        }
    }
}

fn live(mut filter: Document) -> Document {
    filter.insert("metadata.is_deleted", doc! { "$ne": true });
    filter
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(e)) if e.code == DUPLICATE_KEY
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    // Queries against a live server need a running MongoDB instance

    #[tokio::test]
    async fn test_undecodable_document_fails_listing() {
        let cursor = futures_util::stream::iter(vec![
            Ok::<i32, String>(1),
            Err("missing field `status`".to_string()),
            Ok(3),
        ]);
        let err = collect_documents(cursor).await.unwrap_err();
        assert!(matches!(err, MicError::Database(ref m) if m.contains("missing field")));

        let cursor = futures_util::stream::iter(vec![Ok::<i32, String>(1), Ok(2)]);
        assert_eq!(collect_documents(cursor).await.unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_soft_delete_marks_metadata() {
        let update = soft_delete_update();
        let set = update.get_document("$set").unwrap();
        assert!(set.get_bool("metadata.is_deleted").unwrap());
        assert!(set.contains_key("metadata.deleted_at"));
    }

    #[test]
    fn test_live_filter_excludes_deleted() {
        let filter = live(doc! { "submission_id": "s-1" });
        assert_eq!(filter.get_str("submission_id").unwrap(), "s-1");
        assert_eq!(
            filter.get_document("metadata.is_deleted").unwrap(),
            &doc! { "$ne": true }
        );
    }
}
