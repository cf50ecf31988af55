//! Session records: what gets stored, and what callers get back.
//!
//! Two records are stored:
//!
//! - a **login session** at `sessions/{token}`: `{ uid, expires, data? }`
//! - a **confirmed session** at `users/{uid}/sessions/{token}`:
//!   `{ uid, expires, ip? }`
//!
//! `expires` is epoch milliseconds. The token is the document id and is
//! not repeated inside the body.

use docgate_identity::Uid;
use docgate_store::Fields;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// LoginSession
// ---------------------------------------------------------------------------

/// A pending, single-use login.
#[derive(Debug, Clone, PartialEq)]
pub struct LoginSession {
    pub token: String,
    pub uid: Uid,
    /// Epoch millis after which the token no longer confirms.
    pub expires_at: u64,
    /// Caller-supplied payload passed to `initiate`.
    pub data: Option<Fields>,
}

impl LoginSession {
    /// Expiry is strict: a token is still good at exactly `expires_at`.
    pub fn is_expired(&self, now_millis: u64) -> bool {
        now_millis > self.expires_at
    }

    pub(crate) fn from_record(token: &str, record: LoginRecord) -> Self {
        Self {
            token: token.to_string(),
            uid: record.uid,
            expires_at: record.expires,
            data: record.data,
        }
    }

    pub(crate) fn to_record(&self) -> LoginRecord {
        LoginRecord {
            uid: self.uid.clone(),
            expires: self.expires_at,
            data: self.data.clone(),
        }
    }
}

/// Stored body of a login session.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct LoginRecord {
    pub(crate) uid: Uid,
    pub(crate) expires: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) data: Option<Fields>,
}

// ---------------------------------------------------------------------------
// ConfirmedSession
// ---------------------------------------------------------------------------

/// A durable session, recorded once a login is confirmed. Never mutated
/// by this crate after creation.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfirmedSession {
    pub token: String,
    pub uid: Uid,
    /// Epoch millis.
    pub expires_at: u64,
    pub ip: Option<String>,
}

impl ConfirmedSession {
    pub(crate) fn to_record(&self) -> ConfirmedRecord {
        ConfirmedRecord {
            uid: self.uid.clone(),
            expires: self.expires_at,
            ip: self.ip.clone(),
        }
    }
}

/// Stored body of a confirmed session.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct ConfirmedRecord {
    pub(crate) uid: Uid,
    pub(crate) expires: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) ip: Option<String>,
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// What `initiate` hands back. Deliver `token` out of band (e.g. an
/// emailed link); it does not prove the caller controls the email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginTicket {
    pub uid: Uid,
    pub token: String,
    /// `true` if this login created the user.
    pub created: bool,
}

/// What `confirm` hands back.
#[derive(Debug, Clone, PartialEq)]
pub struct Confirmation {
    /// Signed custom token from the identity provider.
    pub identity_token: String,
    /// The durable record that was stored.
    pub session: ConfirmedSession,
}
