//! Error types for the session layer.

use docgate_identity::IdentityError;
use docgate_store::StoreError;

/// Errors that can occur while initiating or confirming a login.
///
/// `UnknownToken` and `ExpiredToken` are this layer's own verdicts and are
/// final for that token: the caller has to initiate a new login. Store and
/// identity failures pass through unchanged and may be worth retrying.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// No pending login matches the token. It was never issued, was
    /// already consumed, or belongs to a different user.
    #[error("unknown login token")]
    UnknownToken,

    /// The login token matched but its time-to-live has elapsed.
    #[error("login token expired")]
    ExpiredToken,

    /// The document store failed or a session path was invalid.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The identity provider failed.
    #[error(transparent)]
    Identity(#[from] IdentityError),
}

impl SessionError {
    /// Returns `true` for the terminal verdicts on a token.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::UnknownToken | Self::ExpiredToken)
    }
}
