//! MongoDB client and collection wrapper
//!
//! Typed collections apply their schema indexes on first use, stamp
//! metadata on insert and hide soft-deleted documents from reads.

use bson::{doc, DateTime, Document};
use futures_util::StreamExt;
use mongodb::{
    error::{ErrorKind, WriteFailure},
    options::{IndexOptions, ReturnDocument, UpdateModifications},
    results::UpdateResult,
    Client, Collection, IndexModel,
};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{error, info};

use crate::db::schemas::Metadata;
use crate::types::NotewardenError;

/// Server error code for unique index violations
const DUPLICATE_KEY_CODE: i32 = 11000;

/// Trait for schemas that provide index definitions
pub trait IntoIndexes {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)>;
}

/// Trait for schemas with mutable metadata
pub trait MutMetadata {
    fn mut_metadata(&mut self) -> &mut Metadata;
}

/// MongoDB client wrapper
#[derive(Clone)]
pub struct MongoClient {
    client: Client,
    db_name: String,
}

impl MongoClient {
    /// Connect and ping the database
    pub async fn new(uri: &str, db_name: &str) -> Result<Self, NotewardenError> {
        info!("Connecting to MongoDB");

        // Use serverSelectionTimeoutMS to avoid hanging on unreachable MongoDB
        let timeout_uri = if uri.contains('?') {
            format!("{}&serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        } else {
            format!("{}?serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        };

        let client = Client::with_uri_str(&timeout_uri).await.map_err(|e| {
            NotewardenError::RepositoryUnavailable(format!("Failed to connect to MongoDB: {}", e))
        })?;

        client
            .database(db_name)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| {
                NotewardenError::RepositoryUnavailable(format!("MongoDB ping failed: {}", e))
            })?;

        info!("Connected to MongoDB database '{}'", db_name);

        Ok(Self {
            client,
            db_name: db_name.to_string(),
        })
    }

    /// Get a typed collection
    pub async fn collection<T>(&self, name: &str) -> Result<MongoCollection<T>, NotewardenError>
    where
        T: Serialize + DeserializeOwned + Unpin + Send + Sync + IntoIndexes + MutMetadata,
    {
        MongoCollection::new(&self.client, &self.db_name, name).await
    }

    pub fn db_name(&self) -> &str {
        &self.db_name
    }
}

/// Typed MongoDB collection with automatic indexing
#[derive(Debug, Clone)]
pub struct MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync,
{
    inner: Collection<T>,
}

impl<T> MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync + IntoIndexes + MutMetadata,
{
    /// Create a new collection and apply indexes
    pub async fn new(
        client: &Client,
        db_name: &str,
        collection_name: &str,
    ) -> Result<Self, NotewardenError> {
        let collection = client.database(db_name).collection::<T>(collection_name);
        let mongo_collection = MongoCollection { inner: collection };

        mongo_collection.apply_indexes().await?;

        Ok(mongo_collection)
    }

    async fn apply_indexes(&self) -> Result<(), NotewardenError> {
        let schema_indices = T::into_indices();

        if schema_indices.is_empty() {
            return Ok(());
        }

        let indices: Vec<IndexModel> = schema_indices
            .into_iter()
            .map(|(keys, opts)| IndexModel::builder().keys(keys).options(opts).build())
            .collect();

        self.inner.create_indexes(indices).await.map_err(|e| {
            NotewardenError::RepositoryUnavailable(format!("Failed to create indexes: {}", e))
        })?;

        Ok(())
    }

    /// Insert a document, setting metadata timestamps
    ///
    /// Unique index violations surface as `ValidationFailed`.
    pub async fn insert_one(&self, mut item: T) -> Result<T, NotewardenError> {
        let metadata = item.mut_metadata();
        let now = DateTime::now();
        metadata.is_deleted = false;
        metadata.created_at = Some(now);
        metadata.updated_at = Some(now);

        match self.inner.insert_one(&item).await {
            Ok(_) => Ok(item),
            Err(e) if is_duplicate_key(&e) => Err(NotewardenError::ValidationFailed(
                "Email or username already exists".into(),
            )),
            Err(e) => Err(NotewardenError::RepositoryUnavailable(format!(
                "Insert failed: {}",
                e
            ))),
        }
    }

    /// Find one live document by filter
    pub async fn find_one(&self, filter: Document) -> Result<Option<T>, NotewardenError> {
        self.inner
            .find_one(live(filter))
            .await
            .map_err(|e| NotewardenError::RepositoryUnavailable(format!("Find failed: {}", e)))
    }

    /// Find live documents by filter, oldest first
    pub async fn find_many(&self, filter: Document) -> Result<Vec<T>, NotewardenError> {
        let cursor = self
            .inner
            .find(live(filter))
            .sort(doc! { "metadata.created_at": 1, "_id": 1 })
            .await
            .map_err(|e| NotewardenError::RepositoryUnavailable(format!("Find failed: {}", e)))?;

        let results: Vec<T> = cursor
            .filter_map(|doc| async {
                match doc {
                    Ok(d) => Some(d),
                    Err(e) => {
                        error!("Error reading document: {}", e);
                        None
                    }
                }
            })
            .collect()
            .await;

        Ok(results)
    }

    /// Update one live document
    pub async fn update_one(
        &self,
        filter: Document,
        update: impl Into<UpdateModifications>,
    ) -> Result<UpdateResult, NotewardenError> {
        self.inner
            .update_one(live(filter), update.into())
            .await
            .map_err(|e| NotewardenError::RepositoryUnavailable(format!("Update failed: {}", e)))
    }

    /// Atomic find-and-modify on one live document
    pub async fn find_one_and_update(
        &self,
        filter: Document,
        update: impl Into<UpdateModifications>,
        return_document: ReturnDocument,
    ) -> Result<Option<T>, NotewardenError> {
        self.inner
            .find_one_and_update(live(filter), update.into())
            .return_document(return_document)
            .await
            .map_err(|e| NotewardenError::RepositoryUnavailable(format!("Update failed: {}", e)))
    }

    /// Soft delete a document
    pub async fn soft_delete(&self, filter: Document) -> Result<UpdateResult, NotewardenError> {
        let update = doc! {
            "$set": {
                "metadata.is_deleted": true,
                "metadata.deleted_at": DateTime::now(),
                "metadata.updated_at": DateTime::now(),
            }
        };

        self.update_one(filter, update).await
    }
}

/// Add the soft-delete exclusion to a filter
fn live(mut filter: Document) -> Document {
    filter.insert("metadata.is_deleted", doc! { "$ne": true });
    filter
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write_error)) => {
            write_error.code == DUPLICATE_KEY_CODE
        }
        _ => false,
    }
}
