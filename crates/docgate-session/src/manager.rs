//! The session manager: runs the two-step email login.
//!
//! This is the central piece of the session layer. It's responsible for:
//! - Resolving an email to a user, creating the user on first sight
//! - Issuing single-use login tokens with a short time-to-live
//! - Consuming a token exactly once and recording a durable session
//! - Asking the identity provider for a signed token after confirmation
//!
//! # State per login attempt
//!
//! ```text
//! initiate() ──→ [pending] ──confirm(), in time──→ [confirmed]
//!                    │
//!                    ├──confirm(), too late──→ ExpiredToken
//!                    └──confirm(), unknown───→ UnknownToken
//! ```
//!
//! # Ordering in `confirm`
//!
//! The signed identity token is requested before anything is written, so a
//! provider failure leaves the store untouched and the login confirmable.
//! The durable `ConfirmedSession` write is then awaited before the pending
//! `LoginSession` is deleted. If the process dies between the two, the
//! login can still be confirmed again, and no state exists where the token
//! is gone but the session was never recorded.
//!
//! # Concurrency note
//!
//! The manager keeps no state of its own beyond the two facades, so it is
//! shared behind an `Arc` and called from any task. Each operation takes a
//! snapshot of the active store and provider when it starts and uses only
//! those, so a `switch_*` call never splits an operation across targets.

use docgate_identity::{CreateUser, Identity, IdentityError, IdentityProvider, Uid, UserRecord};
use docgate_store::{
    from_fields, to_fields, CollectionPath, DocumentPath, DocumentStore, Documents, Fields,
    SetOptions,
};
use rand::Rng;

use crate::session::LoginRecord;
use crate::{
    Clock, Confirmation, ConfirmedSession, ConfirmedTokenPolicy, LoginSession, LoginTicket,
    SessionConfig, SessionError, SystemClock,
};

/// Runs email logins against a document store and an identity provider.
///
/// `C` is the time source. Production code uses the default
/// [`SystemClock`]; tests pass a [`ManualClock`](crate::ManualClock) to
/// step past expiry without sleeping.
pub struct SessionManager<S, P, C = SystemClock> {
    documents: Documents<S>,
    identity: Identity<P>,
    config: SessionConfig,
    clock: C,
}

impl<S: DocumentStore, P: IdentityProvider> SessionManager<S, P, SystemClock> {
    /// Creates a manager that reads the wall clock.
    pub fn new(store: S, provider: P, config: SessionConfig) -> Self {
        Self::with_clock(store, provider, config, SystemClock)
    }
}

impl<S: DocumentStore, P: IdentityProvider, C: Clock> SessionManager<S, P, C> {
    pub fn with_clock(store: S, provider: P, config: SessionConfig, clock: C) -> Self {
        Self {
            documents: Documents::new(store),
            identity: Identity::new(provider),
            config,
            clock,
        }
    }

    /// The document facade this manager persists through.
    pub fn documents(&self) -> &Documents<S> {
        &self.documents
    }

    /// The identity facade this manager resolves users through.
    pub fn identity(&self) -> &Identity<P> {
        &self.identity
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Points every operation that starts from now on at `store`.
    pub async fn switch_database(&self, store: S) {
        self.documents.switch(store).await;
    }

    /// Points every operation that starts from now on at `provider`.
    pub async fn switch_project(&self, provider: P) {
        self.identity.switch_project(provider).await;
    }

    // =====================================================================
    // initiate()
    // =====================================================================

    /// Starts a login for `email`.
    ///
    /// Looks the user up by email and creates one if none exists, then
    /// stores a pending login at `{login_collection}/{token}` that expires
    /// after `config.login_ttl`. `extra` is stored alongside it and comes
    /// back from [`login_session`](Self::login_session).
    ///
    /// No identity token is issued here. Getting `token` to the owner of
    /// the email (and only to them) is the caller's job.
    ///
    /// # Errors
    /// Store and identity failures pass through unchanged.
    pub async fn initiate(
        &self,
        email: &str,
        extra: Option<Fields>,
    ) -> Result<LoginTicket, SessionError> {
        let store = self.documents.current().await;
        let provider = self.identity.current().await;

        let (user, created) = resolve_or_create_user(&*provider, email).await?;

        let session = LoginSession {
            token: generate_token(),
            uid: user.uid,
            expires_at: self.expiry_after(self.config.login_ttl),
            data: extra,
        };
        let path = self.login_path(&session.token)?;
        store
            .set(&path, to_fields(&session.to_record())?, SetOptions::default())
            .await?;

        tracing::info!(
            uid = %session.uid,
            token = redact(&session.token),
            created,
            "login initiated"
        );

        Ok(LoginTicket {
            uid: session.uid,
            token: session.token,
            created,
        })
    }

    // =====================================================================
    // confirm()
    // =====================================================================

    /// Consumes a login token and records a durable session for `uid`.
    ///
    /// Steps, each awaited before the next:
    /// 1. read the pending login at `{login_collection}/{token}`
    /// 2. reject it if it has expired
    /// 3. ask the identity provider for a custom token
    /// 4. write the confirmed session under the user
    /// 5. delete the pending login
    ///
    /// A failure at any step leaves the pending login in place, so the
    /// caller can retry with the same token.
    ///
    /// # Errors
    /// - [`SessionError::UnknownToken`] if no pending login matches, or it
    ///   belongs to a different uid (the pending login is left in place)
    /// - [`SessionError::ExpiredToken`] if it matched but is past its
    ///   time-to-live; nothing is written
    /// - store and identity failures pass through unchanged
    pub async fn confirm(
        &self,
        token: &str,
        uid: &Uid,
        ip: Option<&str>,
    ) -> Result<Confirmation, SessionError> {
        let store = self.documents.current().await;
        let provider = self.identity.current().await;

        let login_path = self.login_path(token)?;
        let Some(pending) = read_login(&*store, &login_path, token).await? else {
            tracing::warn!(token = redact(token), "confirm with unknown token");
            return Err(SessionError::UnknownToken);
        };

        if pending.uid != *uid {
            tracing::warn!(
                token = redact(token),
                presented = %uid,
                "confirm with token issued to another user"
            );
            return Err(SessionError::UnknownToken);
        }

        let now = self.clock.now_millis();
        if pending.is_expired(now) {
            tracing::warn!(
                token = redact(token),
                %uid,
                expired_at = pending.expires_at,
                "confirm with expired token"
            );
            return Err(SessionError::ExpiredToken);
        }

        let identity_token = provider.create_custom_token(&pending.uid, None).await?;

        let session_token = match self.config.confirmed_token_policy {
            ConfirmedTokenPolicy::Reuse => token.to_string(),
            ConfirmedTokenPolicy::Rotate => generate_token(),
        };
        let session = ConfirmedSession {
            token: session_token,
            uid: pending.uid,
            expires_at: now.saturating_add(millis(self.config.session_ttl)),
            ip: ip.map(str::to_string),
        };

        let session_path = self.user_session_path(&session.uid, &session.token)?;
        store
            .set(
                &session_path,
                to_fields(&session.to_record())?,
                SetOptions::default(),
            )
            .await?;
        store.delete(&login_path).await?;

        tracing::info!(
            uid = %session.uid,
            token = redact(&session.token),
            "login confirmed"
        );

        Ok(Confirmation {
            identity_token,
            session,
        })
    }

    // =====================================================================
    // Inspection & cleanup
    // =====================================================================

    /// Returns the pending login for `token`, or `None` if it does not
    /// exist or has expired. Never modifies anything.
    pub async fn login_session(&self, token: &str) -> Result<Option<LoginSession>, SessionError> {
        let store = self.documents.current().await;
        let path = self.login_path(token)?;
        let now = self.clock.now_millis();
        Ok(read_login(&*store, &path, token)
            .await?
            .filter(|session| !session.is_expired(now)))
    }

    /// Deletes every pending login that has expired and returns their
    /// tokens.
    ///
    /// Expiry is enforced on read, so this is housekeeping only. Nothing
    /// schedules it; call it from a periodic job if storage matters.
    /// Documents in the login collection that don't parse as a login are
    /// skipped.
    pub async fn purge_expired_logins(&self) -> Result<Vec<String>, SessionError> {
        let store = self.documents.current().await;
        let collection = CollectionPath::parse(&self.config.login_collection)?;
        let now = self.clock.now_millis();

        let mut purged = Vec::new();
        for snapshot in store.list(&collection).await? {
            let Some(data) = snapshot.data.clone() else {
                continue;
            };
            let Ok(record) = from_fields::<LoginRecord>(data) else {
                tracing::debug!(path = %snapshot.path, "skipping malformed login");
                continue;
            };
            if now > record.expires {
                store.delete(&snapshot.path).await?;
                purged.push(snapshot.id().to_string());
            }
        }

        if !purged.is_empty() {
            tracing::info!(count = purged.len(), "expired logins purged");
        }
        Ok(purged)
    }

    // -- Helpers ----------------------------------------------------------

    fn expiry_after(&self, ttl: std::time::Duration) -> u64 {
        self.clock.now_millis().saturating_add(millis(ttl))
    }

    /// `{login_collection}/{token}`. A token that is empty or would add
    /// path segments can't have been issued by us.
    fn login_path(&self, token: &str) -> Result<DocumentPath, SessionError> {
        if token.is_empty() || token.contains('/') {
            return Err(SessionError::UnknownToken);
        }
        Ok(CollectionPath::parse(&self.config.login_collection)?.doc(token))
    }

    /// `{users_collection}/{uid}/{user_sessions_collection}/{token}`.
    fn user_session_path(&self, uid: &Uid, token: &str) -> Result<DocumentPath, SessionError> {
        Ok(CollectionPath::parse(&self.config.users_collection)?
            .doc(uid.as_str())
            .collection(&self.config.user_sessions_collection)
            .doc(token))
    }
}

/// Finds the user owning `email`, creating one if there is none.
///
/// Two initiations for a new email can both miss the lookup. The loser's
/// `create_user` then fails with `EmailExists`, and it falls back to the
/// winner's record, so the email still maps to exactly one user.
async fn resolve_or_create_user<P: IdentityProvider>(
    provider: &P,
    email: &str,
) -> Result<(UserRecord, bool), SessionError> {
    if let Some(user) = provider.find_user_by_email(email).await? {
        return Ok((user, false));
    }

    match provider.create_user(CreateUser::with_email(email)).await {
        Ok(user) => Ok((user, true)),
        Err(IdentityError::EmailExists(taken)) => {
            tracing::debug!(email = %taken, "lost user creation race, re-reading");
            provider
                .find_user_by_email(email)
                .await?
                .map(|user| (user, false))
                .ok_or(SessionError::Identity(IdentityError::EmailExists(taken)))
        }
        Err(err) => Err(err.into()),
    }
}

async fn read_login<S: DocumentStore>(
    store: &S,
    path: &DocumentPath,
    token: &str,
) -> Result<Option<LoginSession>, SessionError> {
    let Some(data) = store.get(path).await? else {
        return Ok(None);
    };
    let record: LoginRecord = from_fields(data)?;
    Ok(Some(LoginSession::from_record(token, record)))
}

/// Generates a random 128-bit token as 32 lowercase hex characters.
fn generate_token() -> String {
    let bytes: [u8; 16] = rand::rng().random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// First 8 characters of a token, for logs.
fn redact(token: &str) -> &str {
    token.get(..8).unwrap_or(token)
}

fn millis(duration: std::time::Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

// =========================================================================
// Tests
// =========================================================================
