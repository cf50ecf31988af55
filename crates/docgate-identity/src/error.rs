//! Error types for the identity layer.

use crate::Uid;

/// Boxed cause carried by provider failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors reported by the identity provider.
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    /// No user matches the given uid or email.
    #[error("no user found for {0}")]
    UserNotFound(String),

    /// Another user already owns this email address.
    #[error("email already in use: {0}")]
    EmailExists(String),

    /// Another user already has this uid.
    #[error("uid already in use: {0}")]
    UidExists(Uid),

    /// The token or cookie is malformed, unknown, or expired.
    #[error("invalid token: {0}")]
    InvalidToken(String),

    /// The user's refresh tokens were revoked after this credential was
    /// issued.
    #[error("credential revoked for user {0}")]
    TokenRevoked(Uid),

    /// Any other provider failure (network, availability, quota). The
    /// original cause is preserved as the error source.
    #[error("identity provider error: {0}")]
    Provider(#[source] BoxError),
}

impl IdentityError {
    /// Wraps a provider failure, keeping it as the source.
    pub fn provider(cause: impl Into<BoxError>) -> Self {
        Self::Provider(cause.into())
    }
}
