//! In-process [`DocumentStore`] for tests, demos, and local development.
//!
//! Documents live in a `BTreeMap` keyed by path, so listing a collection
//! yields documents ordered by id. Listeners are called synchronously
//! after each write, with the internal lock already released, so a
//! listener may call back into the store.
//!
//! Cloning a `MemoryStore` clones a handle: both clones see the same data.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use rand::distr::Alphanumeric;
use rand::Rng;
use serde_json::{Number, Value};

use crate::{
    CollectionPath, DocumentPath, DocumentStore, FieldTransform, Fields,
    Listener, SetOptions, Snapshot, StoreError, Subscription,
};

/// Length of ids generated by [`DocumentStore::add`].
const GENERATED_ID_LEN: usize = 20;

#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    docs: BTreeMap<DocumentPath, Fields>,
    watchers: HashMap<u64, Watcher>,
    next_watcher: u64,
}

struct Watcher {
    target: WatchTarget,
    listener: Listener,
}

enum WatchTarget {
    Document(DocumentPath),
    Collection(CollectionPath),
}

impl WatchTarget {
    fn matches(&self, path: &DocumentPath) -> bool {
        match self {
            Self::Document(doc) => doc == path,
            Self::Collection(collection) => collection.contains(path),
        }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of documents across all collections.
    pub fn len(&self) -> usize {
        self.lock().docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().docs.is_empty()
    }

    /// Number of registered listeners.
    pub fn watcher_count(&self) -> usize {
        self.lock().watchers.len()
    }

    // A panicking listener runs outside the lock, so poisoning can only come
    // from a panic inside one of the short critical sections below. The map
    // is still consistent in that case.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Applies `mutate` under the lock, then notifies matching listeners
    /// with the resulting snapshot once the lock is released.
    fn write<T>(
        &self,
        path: &DocumentPath,
        mutate: impl FnOnce(&mut BTreeMap<DocumentPath, Fields>) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let (result, snapshot, listeners) = {
            let mut inner = self.lock();
            let result = mutate(&mut inner.docs)?;
            let snapshot = Snapshot {
                path: path.clone(),
                data: inner.docs.get(path).cloned(),
            };
            let listeners: Vec<Listener> = inner
                .watchers
                .values()
                .filter(|w| w.target.matches(path))
                .map(|w| Arc::clone(&w.listener))
                .collect();
            (result, snapshot, listeners)
        };

        for listener in listeners {
            listener(snapshot.clone());
        }
        Ok(result)
    }

    fn register(&self, target: WatchTarget, listener: Listener) -> Subscription {
        let id = {
            let mut inner = self.lock();
            let id = inner.next_watcher;
            inner.next_watcher += 1;
            inner.watchers.insert(id, Watcher { target, listener });
            id
        };

        // Weak so a forgotten subscription doesn't keep the store alive.
        let inner = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = inner.upgrade() {
                inner
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .watchers
                    .remove(&id);
            }
        })
    }

    fn set_sync(
        &self,
        path: &DocumentPath,
        data: Fields,
        options: SetOptions,
    ) -> Result<(), StoreError> {
        self.write(path, |docs| {
            if options.merge {
                if let Some(existing) = docs.get_mut(path) {
                    merge_into(existing, data);
                    return Ok(());
                }
            }
            docs.insert(path.clone(), data);
            Ok(())
        })
    }

    fn update_sync(
        &self,
        path: &DocumentPath,
        data: Fields,
    ) -> Result<(), StoreError> {
        self.write(path, |docs| {
            let existing = docs
                .get_mut(path)
                .ok_or_else(|| StoreError::NotFound(path.to_string()))?;
            existing.extend(data);
            Ok(())
        })
    }

    fn delete_sync(&self, path: &DocumentPath) -> Result<(), StoreError> {
        self.write(path, |docs| {
            docs.remove(path);
            Ok(())
        })
    }

    fn add_sync(
        &self,
        collection: &CollectionPath,
        data: Fields,
    ) -> Result<String, StoreError> {
        let path = {
            let inner = self.lock();
            loop {
                let candidate = collection.doc(&generate_id());
                if !inner.docs.contains_key(&candidate) {
                    break candidate;
                }
            }
        };
        self.set_sync(&path, data, SetOptions::default())?;
        Ok(path.id().to_string())
    }

    fn transform_sync(
        &self,
        path: &DocumentPath,
        field: &str,
        transform: FieldTransform,
    ) -> Result<(), StoreError> {
        self.write(path, |docs| {
            let doc = docs
                .get_mut(path)
                .ok_or_else(|| StoreError::NotFound(path.to_string()))?;
            let current = doc.remove(field).unwrap_or(Value::Null);
            doc.insert(field.to_string(), apply(current, transform));
            Ok(())
        })
    }
}

impl DocumentStore for MemoryStore {
    async fn get(
        &self,
        path: &DocumentPath,
    ) -> Result<Option<Fields>, StoreError> {
        Ok(self.lock().docs.get(path).cloned())
    }

    async fn set(
        &self,
        path: &DocumentPath,
        data: Fields,
        options: SetOptions,
    ) -> Result<(), StoreError> {
        self.set_sync(path, data, options)
    }

    async fn update(
        &self,
        path: &DocumentPath,
        data: Fields,
    ) -> Result<(), StoreError> {
        self.update_sync(path, data)
    }

    async fn delete(&self, path: &DocumentPath) -> Result<(), StoreError> {
        self.delete_sync(path)
    }

    async fn list(
        &self,
        path: &CollectionPath,
    ) -> Result<Vec<Snapshot>, StoreError> {
        let inner = self.lock();
        Ok(inner
            .docs
            .iter()
            .filter(|(doc, _)| path.contains(doc))
            .map(|(doc, data)| Snapshot {
                path: doc.clone(),
                data: Some(data.clone()),
            })
            .collect())
    }

    async fn add(
        &self,
        path: &CollectionPath,
        data: Fields,
    ) -> Result<String, StoreError> {
        self.add_sync(path, data)
    }

    async fn transform(
        &self,
        path: &DocumentPath,
        field: &str,
        transform: FieldTransform,
    ) -> Result<(), StoreError> {
        self.transform_sync(path, field, transform)
    }

    fn watch_document(
        &self,
        path: &DocumentPath,
        listener: Listener,
    ) -> Result<Subscription, StoreError> {
        Ok(self.register(WatchTarget::Document(path.clone()), listener))
    }

    fn watch_collection(
        &self,
        path: &CollectionPath,
        listener: Listener,
    ) -> Result<Subscription, StoreError> {
        Ok(self.register(WatchTarget::Collection(path.clone()), listener))
    }
}

fn generate_id() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(GENERATED_ID_LEN)
        .map(char::from)
        .collect()
}

/// Deep-merges `patch` into `target`: nested objects merge, everything
/// else overwrites.
fn merge_into(target: &mut Fields, patch: Fields) {
    for (key, value) in patch {
        let overwrite = match (target.get_mut(&key), value) {
            (Some(Value::Object(existing)), Value::Object(nested)) => {
                merge_into(existing, nested);
                None
            }
            (_, value) => Some(value),
        };
        if let Some(value) = overwrite {
            target.insert(key, value);
        }
    }
}

fn apply(current: Value, transform: FieldTransform) -> Value {
    match transform {
        FieldTransform::Increment(by) => match current {
            Value::Number(n) => Value::Number(add(&n, &by)),
            _ => Value::Number(by),
        },
        FieldTransform::ArrayUnion(values) => {
            let mut items = match current {
                Value::Array(items) => items,
                _ => Vec::new(),
            };
            for value in values {
                if !items.contains(&value) {
                    items.push(value);
                }
            }
            Value::Array(items)
        }
        FieldTransform::ArrayRemove(values) => match current {
            Value::Array(mut items) => {
                items.retain(|item| !values.contains(item));
                Value::Array(items)
            }
            _ => Value::Array(Vec::new()),
        },
        FieldTransform::Clear => Value::Null,
        FieldTransform::ServerTimestamp => Value::Number(Number::from(now_millis())),
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or_default()
}

/// Integer addition when both sides are integers and it doesn't overflow,
/// float addition otherwise.
fn add(a: &Number, b: &Number) -> Number {
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        if let Some(sum) = x.checked_add(y) {
            return Number::from(sum);
        }
    }
    let sum = a.as_f64().unwrap_or(0.0) + b.as_f64().unwrap_or(0.0);
    Number::from_f64(sum).unwrap_or_else(|| a.clone())
}
