//! `Documents`: path-dispatched CRUD over a [`DocumentStore`].
//!
//! Every operation resolves its path once, checks it names the right kind,
//! and forwards to the store. Nothing here re-implements store semantics:
//! increments, array unions, and listener delivery all belong to the store.
//!
//! # Switching stores
//!
//! The active store is a runtime selection, like picking which database a
//! process talks to. It lives behind an `RwLock<Arc<S>>`: each call clones
//! the `Arc` once at the start and uses that snapshot throughout, so
//! [`Documents::switch`] affects calls that start afterwards and never a
//! call already in flight.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{Number, Value};
use tokio::sync::RwLock;

use crate::{
    from_fields, resolve, CollectionAddress, DocumentAddress, DocumentStore,
    FieldTransform, Fetched, Fields, ResolvedPath, SetOptions, Snapshot,
    StoreError, Subscription,
};

/// Facade over the active document store.
pub struct Documents<S> {
    store: RwLock<Arc<S>>,
}

impl<S: DocumentStore> Documents<S> {
    pub fn new(store: S) -> Self {
        Self {
            store: RwLock::new(Arc::new(store)),
        }
    }

    /// Makes `store` the target of every call that starts from now on.
    pub async fn switch(&self, store: S) {
        *self.store.write().await = Arc::new(store);
        tracing::info!("document store switched");
    }

    /// The store the next call would use.
    pub async fn current(&self) -> Arc<S> {
        Arc::clone(&*self.store.read().await)
    }

    // =====================================================================
    // Either kind
    // =====================================================================

    /// Reads a document body, or lists a collection, depending on `path`.
    pub async fn get(&self, path: &str) -> Result<Fetched, StoreError> {
        let store = self.current().await;
        match resolve(path)? {
            ResolvedPath::Document(doc) => {
                tracing::debug!(path = %doc, "get document");
                Ok(Fetched::Document(store.get(&doc).await?))
            }
            ResolvedPath::Collection(collection) => {
                tracing::debug!(path = %collection, "get collection");
                Ok(Fetched::Collection(store.list(&collection).await?))
            }
        }
    }

    /// Deletes a document, or every document of a collection.
    ///
    /// Returns the number of documents deleted (for a document path this
    /// is always 1, whether or not it existed).
    pub async fn delete(&self, path: &str) -> Result<usize, StoreError> {
        match resolve(path)? {
            ResolvedPath::Document(doc) => {
                self.delete_document(doc).await?;
                Ok(1)
            }
            ResolvedPath::Collection(collection) => {
                self.delete_collection(collection).await
            }
        }
    }

    // =====================================================================
    // Documents
    // =====================================================================

    pub async fn get_document(
        &self,
        path: impl DocumentAddress,
    ) -> Result<Option<Fields>, StoreError> {
        let path = path.into_document_path()?;
        let store = self.current().await;
        tracing::debug!(%path, "get document");
        store.get(&path).await
    }

    /// Reads a document and deserializes it into `T`.
    pub async fn get_document_as<T: DeserializeOwned>(
        &self,
        path: impl DocumentAddress,
    ) -> Result<Option<T>, StoreError> {
        self.get_document(path)
            .await?
            .map(from_fields)
            .transpose()
    }

    pub async fn set_document(
        &self,
        path: impl DocumentAddress,
        data: Fields,
        merge: bool,
    ) -> Result<(), StoreError> {
        let path = path.into_document_path()?;
        let store = self.current().await;
        tracing::debug!(%path, merge, "set document");
        store.set(&path, data, SetOptions { merge }).await
    }

    pub async fn update_document(
        &self,
        path: impl DocumentAddress,
        data: Fields,
    ) -> Result<(), StoreError> {
        let path = path.into_document_path()?;
        let store = self.current().await;
        tracing::debug!(%path, "update document");
        store.update(&path, data).await
    }

    pub async fn delete_document(
        &self,
        path: impl DocumentAddress,
    ) -> Result<(), StoreError> {
        let path = path.into_document_path()?;
        let store = self.current().await;
        tracing::debug!(%path, "delete document");
        store.delete(&path).await
    }

    // =====================================================================
    // Collections
    // =====================================================================

    pub async fn list_collection(
        &self,
        path: impl CollectionAddress,
    ) -> Result<Vec<Snapshot>, StoreError> {
        let path = path.into_collection_path()?;
        let store = self.current().await;
        tracing::debug!(%path, "list collection");
        store.list(&path).await
    }

    /// Ids of every document in a collection, in store order.
    pub async fn list_collection_ids(
        &self,
        path: impl CollectionAddress,
    ) -> Result<Vec<String>, StoreError> {
        let docs = self.list_collection(path).await?;
        Ok(docs.iter().map(|doc| doc.id().to_string()).collect())
    }

    /// Adds a document with a store-generated id and returns that id.
    pub async fn add_to_collection(
        &self,
        path: impl CollectionAddress,
        data: Fields,
    ) -> Result<String, StoreError> {
        let path = path.into_collection_path()?;
        let store = self.current().await;
        let id = store.add(&path, data).await?;
        tracing::debug!(%path, %id, "document added");
        Ok(id)
    }

    /// Deletes every document currently listed in the collection.
    ///
    /// Deletes are issued one at a time and each is awaited, so an error
    /// stops the sweep and is returned. Returns the number deleted.
    pub async fn delete_collection(
        &self,
        path: impl CollectionAddress,
    ) -> Result<usize, StoreError> {
        let path = path.into_collection_path()?;
        let store = self.current().await;
        let docs = store.list(&path).await?;
        for doc in &docs {
            store.delete(&doc.path).await?;
        }
        tracing::debug!(%path, deleted = docs.len(), "collection deleted");
        Ok(docs.len())
    }

    /// Clears `field` on every document of a collection. Returns the number
    /// of documents touched.
    pub async fn clear_field_in_collection(
        &self,
        path: impl CollectionAddress,
        field: &str,
    ) -> Result<usize, StoreError> {
        let path = path.into_collection_path()?;
        let store = self.current().await;
        let docs = store.list(&path).await?;
        for doc in &docs {
            store.transform(&doc.path, field, FieldTransform::Clear).await?;
        }
        Ok(docs.len())
    }

    // =====================================================================
    // Field transforms
    // =====================================================================

    pub async fn increment_field(
        &self,
        path: impl DocumentAddress,
        field: &str,
        by: impl Into<Number>,
    ) -> Result<(), StoreError> {
        self.transform(path, field, FieldTransform::Increment(by.into()))
            .await
    }

    pub async fn decrement_field(
        &self,
        path: impl DocumentAddress,
        field: &str,
        by: impl Into<Number>,
    ) -> Result<(), StoreError> {
        self.transform(path, field, FieldTransform::decrement(by))
            .await
    }

    pub async fn array_union_field(
        &self,
        path: impl DocumentAddress,
        field: &str,
        value: Value,
    ) -> Result<(), StoreError> {
        self.transform(path, field, FieldTransform::ArrayUnion(vec![value]))
            .await
    }

    pub async fn array_remove_field(
        &self,
        path: impl DocumentAddress,
        field: &str,
        value: Value,
    ) -> Result<(), StoreError> {
        self.transform(path, field, FieldTransform::ArrayRemove(vec![value]))
            .await
    }

    pub async fn clear_field(
        &self,
        path: impl DocumentAddress,
        field: &str,
    ) -> Result<(), StoreError> {
        self.transform(path, field, FieldTransform::Clear).await
    }

    /// Sets `field` to the store's current time.
    pub async fn server_timestamp_field(
        &self,
        path: impl DocumentAddress,
        field: &str,
    ) -> Result<(), StoreError> {
        self.transform(path, field, FieldTransform::ServerTimestamp)
            .await
    }

    async fn transform(
        &self,
        path: impl DocumentAddress,
        field: &str,
        transform: FieldTransform,
    ) -> Result<(), StoreError> {
        let path = path.into_document_path()?;
        let store = self.current().await;
        tracing::debug!(%path, field, ?transform, "transform field");
        store.transform(&path, field, transform).await
    }

    // =====================================================================
    // Listeners
    // =====================================================================

    /// Calls `listener` with each new state of the document until the
    /// returned [`Subscription`] is dropped.
    pub async fn watch_document(
        &self,
        path: impl DocumentAddress,
        listener: impl Fn(Snapshot) + Send + Sync + 'static,
    ) -> Result<Subscription, StoreError> {
        let path = path.into_document_path()?;
        let store = self.current().await;
        store.watch_document(&path, Arc::new(listener))
    }

    /// Calls `listener` with each changed document of the collection until
    /// the returned [`Subscription`] is dropped.
    pub async fn watch_collection(
        &self,
        path: impl CollectionAddress,
        listener: impl Fn(Snapshot) + Send + Sync + 'static,
    ) -> Result<Subscription, StoreError> {
        let path = path.into_collection_path()?;
        let store = self.current().await;
        store.watch_collection(&path, Arc::new(listener))
    }
}
