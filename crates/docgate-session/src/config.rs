//! Session configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ConfirmedTokenPolicy
// ---------------------------------------------------------------------------

/// Which key a confirmed session is stored under.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfirmedTokenPolicy {
    /// Reuse the login token. A holder of the emailed link can correlate
    /// it with the durable session record.
    #[default]
    Reuse,

    /// Mint a fresh token for the durable record, so the emailed value
    /// stops identifying anything once it is consumed.
    Rotate,
}

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Configuration for the login flow.
///
/// Defaults match the hosted layout: pending logins under `sessions/{token}`
/// for 20 minutes, confirmed sessions under `users/{uid}/sessions/{token}`
/// for 30 days. Override individual fields with struct-update syntax:
///
/// ```rust
/// use std::time::Duration;
/// use docgate_session::SessionConfig;
///
/// let config = SessionConfig {
///     login_ttl: Duration::from_secs(5 * 60),
///     ..SessionConfig::default()
/// };
/// assert_eq!(config.users_collection, "users");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// How long a login token stays confirmable.
    pub login_ttl: Duration,

    /// How long a confirmed session is recorded as valid.
    pub session_ttl: Duration,

    /// Top-level collection holding pending logins, keyed by token.
    pub login_collection: String,

    /// Top-level collection holding one document per user.
    pub users_collection: String,

    /// Sub-collection under each user document holding confirmed sessions.
    pub user_sessions_collection: String,

    pub confirmed_token_policy: ConfirmedTokenPolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            login_ttl: Duration::from_secs(20 * 60),
            session_ttl: Duration::from_secs(30 * 24 * 60 * 60),
            login_collection: "sessions".to_string(),
            users_collection: "users".to_string(),
            user_sessions_collection: "sessions".to_string(),
            confirmed_token_policy: ConfirmedTokenPolicy::Reuse,
        }
    }
}
