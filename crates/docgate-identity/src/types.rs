//! User records and token payloads.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Custom claims attached to a user or a token.
pub type Claims = serde_json::Map<String, serde_json::Value>;

/// A user id assigned by the identity provider.
///
/// Newtype over `String` so a uid can't be confused with an email or a
/// token in a signature. Serializes as the bare string.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Uid(String);

impl Uid {
    pub fn new(uid: impl Into<String>) -> Self {
        Self(uid.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Uid {
    fn from(uid: String) -> Self {
        Self(uid)
    }
}

impl From<&str> for Uid {
    fn from(uid: &str) -> Self {
        Self(uid.to_string())
    }
}

impl AsRef<str> for Uid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A user as the identity provider stores it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub uid: Uid,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub disabled: bool,
    #[serde(default)]
    pub custom_claims: Claims,
    /// Epoch millis of the last refresh-token revocation, if any.
    pub tokens_valid_after: Option<u64>,
}

/// Fields for a new user. Unset fields are left to the provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateUser {
    pub uid: Option<Uid>,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub disabled: bool,
}

impl CreateUser {
    pub fn with_email(email: impl Into<String>) -> Self {
        Self {
            email: Some(email.into()),
            ..Self::default()
        }
    }
}

/// Fields to change on an existing user. `None` leaves a field as it is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateUser {
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub disabled: Option<bool>,
}

/// The verified contents of an id token or session cookie.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodedToken {
    pub uid: Uid,
    pub claims: Claims,
    /// Epoch millis.
    pub issued_at: u64,
    /// Epoch millis.
    pub expires_at: u64,
}

/// One page of [`IdentityProvider::list_users`](crate::IdentityProvider::list_users).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPage {
    pub users: Vec<UserRecord>,
    /// Pass back to fetch the next page; `None` on the last page.
    pub next_page_token: Option<String>,
}
