//! Document bodies, snapshots, and field transforms.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Number, Value};

use crate::{DocumentPath, StoreError};

/// A document body: a JSON object.
pub type Fields = serde_json::Map<String, Value>;

/// The state of one document as reported by the store.
///
/// `data` is `None` when the document does not exist, e.g. in the
/// notification sent after a delete.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub path: DocumentPath,
    pub data: Option<Fields>,
}

impl Snapshot {
    /// The document id (last path segment).
    pub fn id(&self) -> &str {
        self.path.id()
    }

    pub fn exists(&self) -> bool {
        self.data.is_some()
    }
}

/// Result of [`Documents::get`](crate::Documents::get), which accepts either
/// kind of path.
#[derive(Debug, Clone, PartialEq)]
pub enum Fetched {
    Document(Option<Fields>),
    Collection(Vec<Snapshot>),
}

/// Options for a full-document write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetOptions {
    /// Merge into an existing document instead of replacing it.
    pub merge: bool,
}

/// Atomic single-field mutations. These are the store's native primitives;
/// the facade only routes to them.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldTransform {
    /// Add to a numeric field. A missing or non-numeric field becomes the
    /// operand.
    Increment(Number),
    /// Append each value not already present.
    ArrayUnion(Vec<Value>),
    /// Remove every occurrence of each value.
    ArrayRemove(Vec<Value>),
    /// Set the field to `null`.
    Clear,
    /// Set the field to the store's current time. Stores that have a
    /// native timestamp type use it; otherwise epoch milliseconds.
    ServerTimestamp,
}

impl FieldTransform {
    /// `Increment` by the negation of `by`.
    pub fn decrement(by: impl Into<Number>) -> Self {
        Self::Increment(negate(&by.into()))
    }
}

fn negate(n: &Number) -> Number {
    if let Some(i) = n.as_i64().and_then(i64::checked_neg) {
        return Number::from(i);
    }
    n.as_f64()
        .and_then(|f| Number::from_f64(-f))
        .unwrap_or_else(|| n.clone())
}

/// Serializes `value` into a document body.
///
/// # Errors
/// [`StoreError::Serialization`] if serialization fails or `value` is not
/// a JSON object.
pub fn to_fields<T: Serialize>(value: &T) -> Result<Fields, StoreError> {
    match serde_json::to_value(value)? {
        Value::Object(fields) => Ok(fields),
        other => Err(StoreError::Serialization(
            <serde_json::Error as serde::ser::Error>::custom(format!(
                "document body must be an object, got {other}"
            )),
        )),
    }
}

/// Deserializes a document body into `T`.
pub fn from_fields<T: DeserializeOwned>(fields: Fields) -> Result<T, StoreError> {
    Ok(serde_json::from_value(Value::Object(fields))?)
}
