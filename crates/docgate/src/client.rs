//! `Docgate` builder and client.
//!
//! This is the entry point for applications. It ties the layers together:
//! store → identity → sessions, and adds user lookup by email or uid.

use docgate_identity::{Identity, IdentityError, IdentityProvider, Uid};
use docgate_session::{
    Clock, Confirmation, LoginTicket, SessionConfig, SessionManager, SystemClock,
};
use docgate_store::{CollectionPath, DocumentStore, Documents, Fields};

use crate::{DocgateError, UserKey};

/// Builder for a [`Docgate`] client.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use docgate::{Docgate, ManualClock, MemoryIdentityProvider, MemoryStore, SessionConfig};
///
/// let docgate = Docgate::builder()
///     .session_config(SessionConfig {
///         login_ttl: Duration::from_secs(10 * 60),
///         ..SessionConfig::default()
///     })
///     .clock(ManualClock::starting_at(0))
///     .build(MemoryStore::new(), MemoryIdentityProvider::new());
/// assert_eq!(docgate.sessions().config().login_ttl.as_secs(), 600);
/// ```
pub struct DocgateBuilder<C = SystemClock> {
    session_config: SessionConfig,
    clock: C,
}

impl DocgateBuilder<SystemClock> {
    /// Creates a builder with default settings and the system clock.
    pub fn new() -> Self {
        Self {
            session_config: SessionConfig::default(),
            clock: SystemClock,
        }
    }
}

impl Default for DocgateBuilder<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> DocgateBuilder<C> {
    /// Sets the session configuration.
    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.session_config = config;
        self
    }

    /// Replaces the time source used for login and session expiry.
    pub fn clock<C2: Clock>(self, clock: C2) -> DocgateBuilder<C2> {
        DocgateBuilder {
            session_config: self.session_config,
            clock,
        }
    }

    pub fn build<S: DocumentStore, P: IdentityProvider>(
        self,
        store: S,
        provider: P,
    ) -> Docgate<S, P, C> {
        tracing::debug!(config = ?self.session_config, "docgate client built");
        Docgate {
            sessions: SessionManager::with_clock(store, provider, self.session_config, self.clock),
        }
    }
}

/// A Docgate client over one store and one identity provider.
///
/// Share it behind an `Arc`; every method takes `&self`.
pub struct Docgate<S, P, C = SystemClock> {
    sessions: SessionManager<S, P, C>,
}

// On a concrete instantiation so `Docgate::builder()` needs no type
// annotations; the real types are picked by `DocgateBuilder::build`.
impl Docgate<(), ()> {
    /// Creates a new builder.
    pub fn builder() -> DocgateBuilder {
        DocgateBuilder::new()
    }
}

impl<S: DocumentStore, P: IdentityProvider, C: Clock> Docgate<S, P, C> {
    pub fn sessions(&self) -> &SessionManager<S, P, C> {
        &self.sessions
    }

    pub fn documents(&self) -> &Documents<S> {
        self.sessions.documents()
    }

    pub fn identity(&self) -> &Identity<P> {
        self.sessions.identity()
    }

    /// Starts an email login. See [`SessionManager::initiate`].
    pub async fn initiate(
        &self,
        email: &str,
        extra: Option<Fields>,
    ) -> Result<LoginTicket, DocgateError> {
        Ok(self.sessions.initiate(email, extra).await?)
    }

    /// Confirms an email login. See [`SessionManager::confirm`].
    pub async fn confirm(
        &self,
        token: &str,
        uid: &Uid,
        ip: Option<&str>,
    ) -> Result<Confirmation, DocgateError> {
        Ok(self.sessions.confirm(token, uid, ip).await?)
    }

    /// Reads the user's document from the users collection.
    ///
    /// `key` is an email or a uid. An email is resolved to its uid through
    /// the identity provider first. Returns `Ok(None)` if the user exists
    /// but has no document.
    ///
    /// # Errors
    /// - [`DocgateError::InvalidUserKey`] if `key` is neither shape
    /// - [`IdentityError::UserNotFound`] if no user owns the email
    pub async fn user_data(&self, key: &str) -> Result<Option<Fields>, DocgateError> {
        let uid = match UserKey::parse(key)? {
            UserKey::Uid(uid) => uid,
            UserKey::Email(email) => self
                .identity()
                .find_user_by_email(&email)
                .await?
                .map(|user| user.uid)
                .ok_or(IdentityError::UserNotFound(email))?,
        };

        let path = CollectionPath::parse(&self.sessions.config().users_collection)?
            .doc(uid.as_str());
        Ok(self.documents().get_document(path).await?)
    }
}
