//! The seam to the external document store.
//!
//! Docgate doesn't implement a database. It defines the [`DocumentStore`]
//! trait, the set of primitives a managed document store offers, and
//! everything above this crate talks to the store only through it. A
//! production deployment plugs in a client for its hosted store; tests and
//! demos use [`MemoryStore`](crate::MemoryStore).

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use crate::{
    CollectionPath, DocumentPath, FieldTransform, Fields, SetOptions,
    Snapshot, StoreError,
};

/// Callback invoked with the new state of a changed document.
///
/// Delivery is the store's business: at-least-once per change, no ordering
/// guarantee across documents.
pub type Listener = Arc<dyn Fn(Snapshot) + Send + Sync + 'static>;

/// Primitives of the external document store.
///
/// # Trait bounds
///
/// - `Send + Sync + 'static` → one store handle is shared by every task
///   that goes through the facade.
/// - The returned futures are `Send` so callers can `tokio::spawn` work
///   that awaits them.
pub trait DocumentStore: Send + Sync + 'static {
    /// Reads a document. `Ok(None)` if it does not exist.
    fn get(
        &self,
        path: &DocumentPath,
    ) -> impl Future<Output = Result<Option<Fields>, StoreError>> + Send;

    /// Writes a whole document, replacing it unless `options.merge` is set.
    fn set(
        &self,
        path: &DocumentPath,
        data: Fields,
        options: SetOptions,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Overwrites the given top-level fields of an existing document.
    ///
    /// # Errors
    /// [`StoreError::NotFound`] if the document does not exist.
    fn update(
        &self,
        path: &DocumentPath,
        data: Fields,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Deletes a document. Deleting a missing document succeeds.
    fn delete(
        &self,
        path: &DocumentPath,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Lists the documents of a collection, in the store's order.
    fn list(
        &self,
        path: &CollectionPath,
    ) -> impl Future<Output = Result<Vec<Snapshot>, StoreError>> + Send;

    /// Adds a document with a store-generated id and returns the id.
    fn add(
        &self,
        path: &CollectionPath,
        data: Fields,
    ) -> impl Future<Output = Result<String, StoreError>> + Send;

    /// Applies an atomic transform to one field of an existing document.
    fn transform(
        &self,
        path: &DocumentPath,
        field: &str,
        transform: FieldTransform,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Registers a listener for one document.
    fn watch_document(
        &self,
        path: &DocumentPath,
        listener: Listener,
    ) -> Result<Subscription, StoreError>;

    /// Registers a listener for every document of a collection.
    fn watch_collection(
        &self,
        path: &CollectionPath,
        listener: Listener,
    ) -> Result<Subscription, StoreError>;
}

/// Handle for a registered listener.
///
/// Dropping the handle unsubscribes, so keep it alive for as long as you
/// want notifications.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send + 'static>>,
}

impl Subscription {
    /// Creates a handle that runs `cancel` exactly once, on
    /// [`unsubscribe`](Self::unsubscribe) or drop.
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Stops delivery.
    pub fn unsubscribe(mut self) {
        self.cancel_now();
    }

    fn cancel_now(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel_now();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}
