//! Telling emails and uids apart.
//!
//! `user_data` accepts either, so the key's shape decides how it is
//! resolved. A uid from the identity provider is exactly 28 ASCII
//! alphanumerics; an email is anything of the form `local@domain.tld`
//! without whitespace.

use std::fmt;
use std::sync::LazyLock;

use docgate_identity::Uid;
use regex::Regex;

use crate::DocgateError;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));
static UID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9a-zA-Z]{28}$").expect("valid uid regex"));

/// A user lookup key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserKey {
    Email(String),
    Uid(Uid),
}

impl UserKey {
    /// Classifies `key` by shape.
    ///
    /// # Errors
    /// [`DocgateError::InvalidUserKey`] if it looks like neither.
    pub fn parse(key: &str) -> Result<Self, DocgateError> {
        if EMAIL_RE.is_match(key) {
            Ok(Self::Email(key.to_string()))
        } else if UID_RE.is_match(key) {
            Ok(Self::Uid(Uid::from(key)))
        } else {
            Err(DocgateError::InvalidUserKey(key.to_string()))
        }
    }
}

impl fmt::Display for UserKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Email(email) => f.write_str(email),
            Self::Uid(uid) => write!(f, "{uid}"),
        }
    }
}
