//! Unified error type for Docgate.

use docgate_identity::IdentityError;
use docgate_session::SessionError;
use docgate_store::StoreError;

/// Top-level error that wraps every layer's error.
///
/// When using the `docgate` crate you deal with this single error type
/// instead of importing errors from each layer. The `#[from]` attributes
/// let `?` convert layer errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum DocgateError {
    /// A document store error (bad path, missing document, backend).
    #[error(transparent)]
    Store(#[from] StoreError),

    /// An identity provider error (unknown user, bad token, backend).
    #[error(transparent)]
    Identity(#[from] IdentityError),

    /// A login flow error (unknown or expired token).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A user lookup key that is neither an email nor a uid.
    #[error("not an email or uid: {0:?}")]
    InvalidUserKey(String),
}
