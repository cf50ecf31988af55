//! End-to-end tests of the login flow over the in-memory collaborators.
//!
//! The wrappers at the top stand in for the awkward behaviour of a real
//! hosted service: a store that records the order of writes (or refuses
//! some of them), and an identity provider whose lookups can be stale or
//! held back, and whose token signing can fail.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use docgate_identity::{
    Claims, CreateUser, DecodedToken, IdentityError, IdentityProvider, MemoryIdentityProvider,
    Uid, UpdateUser, UserPage, UserRecord,
};
use docgate_session::{ManualClock, SessionConfig, SessionError, SessionManager};
use docgate_store::{
    CollectionPath, DocumentPath, DocumentStore, FieldTransform, Fields, Listener, MemoryStore,
    SetOptions, Snapshot, StoreError, Subscription,
};
use tokio::sync::Barrier;

const START: u64 = 1_700_000_000_000;
const DAY_MS: u64 = 24 * 60 * 60 * 1000;

// =========================================================================
// A store that records writes
// =========================================================================

#[derive(Debug, Clone, PartialEq)]
enum Op {
    Set(String),
    Delete(String),
}

#[derive(Debug, thiserror::Error)]
#[error("write rejected")]
struct Rejected;

#[derive(Clone, Default)]
struct RecordingStore {
    inner: MemoryStore,
    ops: Arc<Mutex<Vec<Op>>>,
    /// Sets to paths starting with this prefix fail.
    reject_prefix: Arc<Mutex<Option<String>>>,
}

impl RecordingStore {
    fn ops(&self) -> Vec<Op> {
        self.ops.lock().unwrap().clone()
    }

    fn reject_sets_under(&self, prefix: &str) {
        *self.reject_prefix.lock().unwrap() = Some(prefix.to_string());
    }
}

impl DocumentStore for RecordingStore {
    async fn get(&self, path: &DocumentPath) -> Result<Option<Fields>, StoreError> {
        self.inner.get(path).await
    }

    async fn set(
        &self,
        path: &DocumentPath,
        data: Fields,
        options: SetOptions,
    ) -> Result<(), StoreError> {
        let rejected = self
            .reject_prefix
            .lock()
            .unwrap()
            .as_deref()
            .is_some_and(|prefix| path.to_string().starts_with(prefix));
        if rejected {
            return Err(StoreError::backend(Rejected));
        }
        self.inner.set(path, data, options).await?;
        self.ops.lock().unwrap().push(Op::Set(path.to_string()));
        Ok(())
    }

    async fn update(&self, path: &DocumentPath, data: Fields) -> Result<(), StoreError> {
        self.inner.update(path, data).await
    }

    async fn delete(&self, path: &DocumentPath) -> Result<(), StoreError> {
        self.inner.delete(path).await?;
        self.ops.lock().unwrap().push(Op::Delete(path.to_string()));
        Ok(())
    }

    async fn list(&self, path: &CollectionPath) -> Result<Vec<Snapshot>, StoreError> {
        self.inner.list(path).await
    }

    async fn add(&self, path: &CollectionPath, data: Fields) -> Result<String, StoreError> {
        self.inner.add(path, data).await
    }

    async fn transform(
        &self,
        path: &DocumentPath,
        field: &str,
        transform: FieldTransform,
    ) -> Result<(), StoreError> {
        self.inner.transform(path, field, transform).await
    }

    fn watch_document(
        &self,
        path: &DocumentPath,
        listener: Listener,
    ) -> Result<Subscription, StoreError> {
        self.inner.watch_document(path, listener)
    }

    fn watch_collection(
        &self,
        path: &CollectionPath,
        listener: Listener,
    ) -> Result<Subscription, StoreError> {
        self.inner.watch_collection(path, listener)
    }
}

// =========================================================================
// A provider with injectable faults
// =========================================================================

#[derive(Debug, thiserror::Error)]
#[error("unavailable")]
struct Unavailable;

/// Wraps the in-memory provider. Each counter arms its fault for that many
/// calls.
#[derive(Clone, Default)]
struct FlakyProvider {
    inner: MemoryIdentityProvider,
    /// `find_user_by_email` reports no user even when one exists.
    stale_lookups: Arc<AtomicUsize>,
    /// `find_user_by_email` waits on `gate` after looking up, so concurrent
    /// initiations all see the same (missing) user before any creates it.
    gated_lookups: Arc<AtomicUsize>,
    gate: Option<Arc<Barrier>>,
    /// `create_custom_token` fails.
    failing_tokens: Arc<AtomicUsize>,
}

impl FlakyProvider {
    fn with_gate(parties: usize) -> Self {
        Self {
            gated_lookups: Arc::new(AtomicUsize::new(parties)),
            gate: Some(Arc::new(Barrier::new(parties))),
            ..Self::default()
        }
    }
}

/// Decrements `counter` if it is positive. Returns whether it did.
fn take(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

impl IdentityProvider for FlakyProvider {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, IdentityError> {
        let found = if take(&self.stale_lookups) {
            None
        } else {
            self.inner.find_user_by_email(email).await?
        };
        if let Some(gate) = &self.gate {
            if take(&self.gated_lookups) {
                gate.wait().await;
            }
        }
        Ok(found)
    }
    async fn get_user(&self, uid: &Uid) -> Result<UserRecord, IdentityError> {
        self.inner.get_user(uid).await
    }
    async fn create_user(&self, user: CreateUser) -> Result<UserRecord, IdentityError> {
        self.inner.create_user(user).await
    }
    async fn update_user(&self, uid: &Uid, update: UpdateUser) -> Result<UserRecord, IdentityError> {
        self.inner.update_user(uid, update).await
    }
    async fn delete_user(&self, uid: &Uid) -> Result<(), IdentityError> {
        self.inner.delete_user(uid).await
    }
    async fn set_custom_claims(&self, uid: &Uid, claims: Claims) -> Result<(), IdentityError> {
        self.inner.set_custom_claims(uid, claims).await
    }
    async fn create_custom_token(
        &self,
        uid: &Uid,
        claims: Option<Claims>,
    ) -> Result<String, IdentityError> {
        if take(&self.failing_tokens) {
            return Err(IdentityError::provider(Unavailable));
        }
        self.inner.create_custom_token(uid, claims).await
    }
    async fn create_session_cookie(
        &self,
        id_token: &str,
        expires_in: Duration,
    ) -> Result<String, IdentityError> {
        self.inner.create_session_cookie(id_token, expires_in).await
    }
    async fn verify_id_token(&self, token: &str) -> Result<DecodedToken, IdentityError> {
        self.inner.verify_id_token(token).await
    }
    async fn verify_session_cookie(
        &self,
        cookie: &str,
        check_revoked: bool,
    ) -> Result<DecodedToken, IdentityError> {
        self.inner.verify_session_cookie(cookie, check_revoked).await
    }
    async fn revoke_refresh_tokens(&self, uid: &Uid) -> Result<(), IdentityError> {
        self.inner.revoke_refresh_tokens(uid).await
    }
    async fn list_users(
        &self,
        max_results: Option<usize>,
        page_token: Option<&str>,
    ) -> Result<UserPage, IdentityError> {
        self.inner.list_users(max_results, page_token).await
    }
}

// =========================================================================
// Helpers
// =========================================================================

type Manager = SessionManager<MemoryStore, MemoryIdentityProvider, ManualClock>;

fn setup() -> (Manager, MemoryStore, MemoryIdentityProvider, ManualClock) {
    let store = MemoryStore::new();
    let provider = MemoryIdentityProvider::new();
    let clock = ManualClock::starting_at(START);
    let manager = SessionManager::with_clock(
        store.clone(),
        provider.clone(),
        SessionConfig::default(),
        clock.clone(),
    );
    (manager, store, provider, clock)
}

async fn confirmed_sessions(store: &MemoryStore, uid: &Uid) -> Vec<Snapshot> {
    let path = CollectionPath::parse("users")
        .unwrap()
        .doc(uid.as_str())
        .collection("sessions");
    store.list(&path).await.unwrap()
}

// =========================================================================
// initiate()
// =========================================================================

#[tokio::test]
async fn test_initiate_same_email_twice_reuses_user() {
    let (manager, _, provider, _) = setup();

    let first = manager.initiate("a@example.com", None).await.unwrap();
    let second = manager.initiate("a@example.com", None).await.unwrap();

    assert!(first.created);
    assert!(!second.created);
    assert_eq!(first.uid, second.uid);
    assert_ne!(first.token, second.token);
    assert_eq!(provider.user_count(), 1);
}

#[tokio::test]
async fn test_initiate_concurrently_creates_one_user() {
    // Both lookups miss before either initiation creates the user.
    let provider = FlakyProvider::with_gate(2);
    let inner = provider.inner.clone();
    let manager = Arc::new(SessionManager::new(
        MemoryStore::new(),
        provider,
        SessionConfig::default(),
    ));

    let a = tokio::spawn({
        let manager = Arc::clone(&manager);
        async move { manager.initiate("race@example.com", None).await }
    });
    let b = tokio::spawn({
        let manager = Arc::clone(&manager);
        async move { manager.initiate("race@example.com", None).await }
    });
    let a = a.await.unwrap().unwrap();
    let b = b.await.unwrap().unwrap();

    assert_eq!(a.uid, b.uid);
    assert_eq!(inner.user_count(), 1);
    assert!(a.created != b.created, "exactly one initiation creates");
}

#[tokio::test]
async fn test_initiate_after_stale_lookup_falls_back_to_existing_user() {
    let inner = MemoryIdentityProvider::new();
    let existing = inner
        .create_user(CreateUser::with_email("a@example.com"))
        .await
        .unwrap();
    let provider = FlakyProvider {
        inner: inner.clone(),
        stale_lookups: Arc::new(AtomicUsize::new(1)),
        ..FlakyProvider::default()
    };
    let manager = SessionManager::new(MemoryStore::new(), provider, SessionConfig::default());

    let ticket = manager.initiate("a@example.com", None).await.unwrap();

    assert_eq!(ticket.uid, existing.uid);
    assert!(!ticket.created);
    assert_eq!(inner.user_count(), 1);
}

// =========================================================================
// confirm()
// =========================================================================

#[tokio::test]
async fn test_confirm_accepts_token_exactly_once() {
    let (manager, _, _, _) = setup();
    let ticket = manager.initiate("a@example.com", None).await.unwrap();

    manager
        .confirm(&ticket.token, &ticket.uid, None)
        .await
        .expect("first confirm succeeds");
    let err = manager
        .confirm(&ticket.token, &ticket.uid, None)
        .await
        .unwrap_err();

    assert!(matches!(err, SessionError::UnknownToken));
    assert!(err.is_terminal());
}

#[tokio::test]
async fn test_confirm_after_ttl_is_expired_and_writes_nothing() {
    let (manager, store, _, clock) = setup();
    let ticket = manager.initiate("a@example.com", None).await.unwrap();

    clock.advance(Duration::from_secs(20 * 60 + 1));
    let err = manager
        .confirm(&ticket.token, &ticket.uid, Some("1.2.3.4"))
        .await
        .unwrap_err();

    assert!(matches!(err, SessionError::ExpiredToken));
    assert!(confirmed_sessions(&store, &ticket.uid).await.is_empty());
}

#[tokio::test]
async fn test_confirm_never_issued_token_is_unknown() {
    let (manager, _, _, _) = setup();

    let err = manager
        .confirm("00000000000000000000000000000000", &Uid::from("nobody"), None)
        .await
        .unwrap_err();

    assert!(matches!(err, SessionError::UnknownToken));
}

#[tokio::test]
async fn test_confirm_records_ip_and_thirty_day_expiry() {
    let (manager, store, provider, clock) = setup();
    let ticket = manager.initiate("a@example.com", None).await.unwrap();
    clock.advance(Duration::from_secs(60));

    let confirmation = manager
        .confirm(&ticket.token, &ticket.uid, Some("1.2.3.4"))
        .await
        .unwrap();

    let session = &confirmation.session;
    assert_eq!(session.ip.as_deref(), Some("1.2.3.4"));
    assert_eq!(session.token, ticket.token);
    let expected = START + 60_000 + 30 * DAY_MS;
    assert!(session.expires_at.abs_diff(expected) < 1_000);

    let stored = confirmed_sessions(&store, &ticket.uid).await;
    assert_eq!(stored.len(), 1);
    let body = stored[0].data.as_ref().unwrap();
    assert_eq!(body["ip"], "1.2.3.4");
    assert_eq!(body["uid"], ticket.uid.as_str());

    let decoded = provider
        .verify_id_token(&confirmation.identity_token)
        .await
        .unwrap();
    assert_eq!(decoded.uid, ticket.uid);
}

#[tokio::test]
async fn test_confirm_writes_durable_session_before_deleting_login() {
    let store = RecordingStore::default();
    let manager = SessionManager::new(
        store.clone(),
        MemoryIdentityProvider::new(),
        SessionConfig::default(),
    );
    let ticket = manager.initiate("a@example.com", None).await.unwrap();

    manager
        .confirm(&ticket.token, &ticket.uid, None)
        .await
        .unwrap();

    let login = format!("sessions/{}", ticket.token);
    let durable = format!("users/{}/sessions/{}", ticket.uid, ticket.token);
    assert_eq!(
        store.ops(),
        vec![
            Op::Set(login.clone()),
            Op::Set(durable),
            Op::Delete(login),
        ]
    );
}

#[tokio::test]
async fn test_confirm_failed_durable_write_keeps_login() {
    let store = RecordingStore::default();
    let manager = SessionManager::new(
        store.clone(),
        MemoryIdentityProvider::new(),
        SessionConfig::default(),
    );
    let ticket = manager.initiate("a@example.com", None).await.unwrap();
    store.reject_sets_under("users/");

    let err = manager
        .confirm(&ticket.token, &ticket.uid, None)
        .await
        .unwrap_err();

    assert!(matches!(err, SessionError::Store(StoreError::Backend(_))));
    assert!(!err.is_terminal());
    assert!(manager.login_session(&ticket.token).await.unwrap().is_some());
}

#[tokio::test]
async fn test_confirm_token_signing_failure_leaves_login_retryable() {
    let store = MemoryStore::new();
    let provider = FlakyProvider {
        failing_tokens: Arc::new(AtomicUsize::new(1)),
        ..FlakyProvider::default()
    };
    let manager = SessionManager::new(store.clone(), provider, SessionConfig::default());
    let ticket = manager.initiate("a@example.com", None).await.unwrap();

    let err = manager
        .confirm(&ticket.token, &ticket.uid, Some("1.2.3.4"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        SessionError::Identity(IdentityError::Provider(_))
    ));
    assert!(!err.is_terminal());
    assert!(confirmed_sessions(&store, &ticket.uid).await.is_empty());
    assert!(manager.login_session(&ticket.token).await.unwrap().is_some());

    let confirmation = manager
        .confirm(&ticket.token, &ticket.uid, Some("1.2.3.4"))
        .await
        .expect("retry succeeds");
    assert_eq!(confirmation.session.ip.as_deref(), Some("1.2.3.4"));
    assert_eq!(confirmed_sessions(&store, &ticket.uid).await.len(), 1);
}

// =========================================================================
// switching targets
// =========================================================================

#[tokio::test]
async fn test_switch_database_strands_pending_logins() {
    let (manager, _, _, _) = setup();
    let ticket = manager.initiate("a@example.com", None).await.unwrap();

    manager.switch_database(MemoryStore::new()).await;
    let err = manager
        .confirm(&ticket.token, &ticket.uid, None)
        .await
        .unwrap_err();

    assert!(matches!(err, SessionError::UnknownToken));
}

#[tokio::test]
async fn test_switch_project_creates_user_in_new_project() {
    let (manager, _, first, _) = setup();
    manager.initiate("a@example.com", None).await.unwrap();

    let second = MemoryIdentityProvider::new();
    manager.switch_project(second.clone()).await;
    let ticket = manager.initiate("a@example.com", None).await.unwrap();

    assert!(ticket.created);
    assert_eq!(first.user_count(), 1);
    assert_eq!(second.user_count(), 1);
}
