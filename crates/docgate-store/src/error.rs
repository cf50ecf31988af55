//! Error types for the store layer.

/// Boxed cause carried by collaborator failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while addressing or talking to the document store.
///
/// `InvalidPath` is the only error this layer produces on its own; the
/// rest describe what the external store reported.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The path is empty, or names the wrong kind for the operation
    /// (a collection where a document was required, or vice versa).
    #[error("invalid path {path:?}: {reason}")]
    InvalidPath {
        path: String,
        reason: &'static str,
    },

    /// The store has no document at this path and the operation
    /// requires one (update, field transforms).
    #[error("no document at {0}")]
    NotFound(String),

    /// A document body could not be converted to or from a Rust type.
    #[error("document serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Any failure reported by the store itself. The original cause is
    /// preserved as the error source.
    #[error("document store error: {0}")]
    Backend(#[source] BoxError),
}

impl StoreError {
    /// Wraps a collaborator failure, keeping it as the source.
    pub fn backend(cause: impl Into<BoxError>) -> Self {
        Self::Backend(cause.into())
    }

    pub(crate) fn invalid_path(path: &str, reason: &'static str) -> Self {
        Self::InvalidPath {
            path: path.to_string(),
            reason,
        }
    }
}
