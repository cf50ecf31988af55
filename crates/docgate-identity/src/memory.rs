//! In-process [`IdentityProvider`] for tests, demos, and local development.
//!
//! Tokens are opaque random strings recorded in a grant table rather than
//! signed JWTs: verifying a token means finding its grant and checking the
//! expiry. That keeps the semantics callers depend on (issue, verify,
//! expire, revoke) without any cryptography.
//!
//! Custom tokens double as id tokens here. A real provider has the client
//! exchange the custom token for an id token; the in-memory provider skips
//! that round-trip.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rand::distr::Alphanumeric;
use rand::Rng;

use crate::{
    Claims, CreateUser, DecodedToken, IdentityError, IdentityProvider, Uid,
    UpdateUser, UserPage, UserRecord,
};

/// Length of generated uids.
const UID_LEN: usize = 28;

/// Lifetime of custom tokens.
const CUSTOM_TOKEN_TTL: Duration = Duration::from_secs(60 * 60);

/// Page size when `list_users` is called without one.
const DEFAULT_PAGE_SIZE: usize = 1000;

#[derive(Clone, Default)]
pub struct MemoryIdentityProvider {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    users: BTreeMap<Uid, UserRecord>,
    /// Lowercased email → uid. Emails are unique per provider.
    emails: HashMap<String, Uid>,
    grants: HashMap<String, Grant>,
    /// Per-user serial below which grants count as revoked.
    revoked_before: HashMap<Uid, u64>,
    next_serial: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GrantKind {
    IdToken,
    SessionCookie,
}

struct Grant {
    kind: GrantKind,
    uid: Uid,
    claims: Claims,
    issued_at: u64,
    expires_at: u64,
    /// Issue order. Revocation compares serials, not timestamps, so a
    /// revoke in the same millisecond as an issue is still ordered.
    serial: u64,
}

impl Grant {
    fn decode(&self) -> DecodedToken {
        DecodedToken {
            uid: self.uid.clone(),
            claims: self.claims.clone(),
            issued_at: self.issued_at,
            expires_at: self.expires_at,
        }
    }
}

impl MemoryIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of users.
    pub fn user_count(&self) -> usize {
        self.lock().users.len()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Inner {
    fn user_mut(&mut self, uid: &Uid) -> Result<&mut UserRecord, IdentityError> {
        self.users
            .get_mut(uid)
            .ok_or_else(|| IdentityError::UserNotFound(uid.to_string()))
    }

    fn claim_email(&mut self, email: &str, uid: &Uid) -> Result<String, IdentityError> {
        let key = email.trim().to_lowercase();
        if key.is_empty() {
            return Err(IdentityError::provider("email must not be empty"));
        }
        match self.emails.get(&key) {
            Some(owner) if owner != uid => Err(IdentityError::EmailExists(key)),
            _ => {
                self.emails.insert(key.clone(), uid.clone());
                Ok(key)
            }
        }
    }

    fn issue(
        &mut self,
        kind: GrantKind,
        uid: &Uid,
        claims: Claims,
        ttl: Duration,
    ) -> String {
        let now = now_millis();
        let serial = self.next_serial;
        self.next_serial += 1;

        let token = random_string(40);
        self.grants.insert(
            token.clone(),
            Grant {
                kind,
                uid: uid.clone(),
                claims,
                issued_at: now,
                expires_at: now.saturating_add(millis(ttl)),
                serial,
            },
        );
        token
    }

    fn verify(
        &self,
        token: &str,
        kind: GrantKind,
    ) -> Result<&Grant, IdentityError> {
        let grant = self
            .grants
            .get(token)
            .filter(|grant| grant.kind == kind)
            .ok_or_else(|| IdentityError::InvalidToken("unknown token".into()))?;
        if now_millis() > grant.expires_at {
            return Err(IdentityError::InvalidToken("token expired".into()));
        }
        Ok(grant)
    }
}

impl IdentityProvider for MemoryIdentityProvider {
    async fn find_user_by_email(
        &self,
        email: &str,
    ) -> Result<Option<UserRecord>, IdentityError> {
        let inner = self.lock();
        let key = email.trim().to_lowercase();
        Ok(inner
            .emails
            .get(&key)
            .and_then(|uid| inner.users.get(uid))
            .cloned())
    }

    async fn get_user(&self, uid: &Uid) -> Result<UserRecord, IdentityError> {
        self.lock()
            .users
            .get(uid)
            .cloned()
            .ok_or_else(|| IdentityError::UserNotFound(uid.to_string()))
    }

    async fn create_user(
        &self,
        user: CreateUser,
    ) -> Result<UserRecord, IdentityError> {
        let mut inner = self.lock();

        let uid = match user.uid {
            Some(uid) if inner.users.contains_key(&uid) => {
                return Err(IdentityError::UidExists(uid));
            }
            Some(uid) => uid,
            None => loop {
                let candidate = Uid::new(random_string(UID_LEN));
                if !inner.users.contains_key(&candidate) {
                    break candidate;
                }
            },
        };

        let email = match user.email.as_deref() {
            Some(email) => Some(inner.claim_email(email, &uid)?),
            None => None,
        };

        let record = UserRecord {
            uid: uid.clone(),
            email,
            display_name: user.display_name,
            disabled: user.disabled,
            custom_claims: Claims::new(),
            tokens_valid_after: None,
        };
        inner.users.insert(uid, record.clone());
        Ok(record)
    }

    async fn update_user(
        &self,
        uid: &Uid,
        update: UpdateUser,
    ) -> Result<UserRecord, IdentityError> {
        let mut inner = self.lock();
        let previous_email = inner.user_mut(uid)?.email.clone();

        let email = match update.email.as_deref() {
            Some(email) => {
                let key = inner.claim_email(email, uid)?;
                if let Some(old) = previous_email.filter(|old| *old != key) {
                    inner.emails.remove(&old);
                }
                Some(key)
            }
            None => None,
        };

        let user = inner.user_mut(uid)?;
        if let Some(email) = email {
            user.email = Some(email);
        }
        if let Some(display_name) = update.display_name {
            user.display_name = Some(display_name);
        }
        if let Some(disabled) = update.disabled {
            user.disabled = disabled;
        }
        Ok(user.clone())
    }

    async fn delete_user(&self, uid: &Uid) -> Result<(), IdentityError> {
        let mut inner = self.lock();
        let user = inner
            .users
            .remove(uid)
            .ok_or_else(|| IdentityError::UserNotFound(uid.to_string()))?;
        if let Some(email) = user.email {
            inner.emails.remove(&email);
        }
        inner.grants.retain(|_, grant| grant.uid != *uid);
        inner.revoked_before.remove(uid);
        Ok(())
    }

    async fn set_custom_claims(
        &self,
        uid: &Uid,
        claims: Claims,
    ) -> Result<(), IdentityError> {
        self.lock().user_mut(uid)?.custom_claims = claims;
        Ok(())
    }

    async fn create_custom_token(
        &self,
        uid: &Uid,
        claims: Option<Claims>,
    ) -> Result<String, IdentityError> {
        let mut inner = self.lock();
        Ok(inner.issue(
            GrantKind::IdToken,
            uid,
            claims.unwrap_or_default(),
            CUSTOM_TOKEN_TTL,
        ))
    }

    async fn create_session_cookie(
        &self,
        id_token: &str,
        expires_in: Duration,
    ) -> Result<String, IdentityError> {
        let mut inner = self.lock();
        let (uid, claims) = {
            let grant = inner.verify(id_token, GrantKind::IdToken)?;
            (grant.uid.clone(), grant.claims.clone())
        };
        Ok(inner.issue(GrantKind::SessionCookie, &uid, claims, expires_in))
    }

    async fn verify_id_token(
        &self,
        token: &str,
    ) -> Result<DecodedToken, IdentityError> {
        let inner = self.lock();
        Ok(inner.verify(token, GrantKind::IdToken)?.decode())
    }

    async fn verify_session_cookie(
        &self,
        cookie: &str,
        check_revoked: bool,
    ) -> Result<DecodedToken, IdentityError> {
        let inner = self.lock();
        let grant = inner.verify(cookie, GrantKind::SessionCookie)?;
        if check_revoked {
            let revoked = inner
                .revoked_before
                .get(&grant.uid)
                .is_some_and(|&before| grant.serial < before);
            if revoked {
                return Err(IdentityError::TokenRevoked(grant.uid.clone()));
            }
        }
        Ok(grant.decode())
    }

    async fn revoke_refresh_tokens(&self, uid: &Uid) -> Result<(), IdentityError> {
        let mut inner = self.lock();
        let serial = inner.next_serial;
        inner.user_mut(uid)?.tokens_valid_after = Some(now_millis());
        inner.revoked_before.insert(uid.clone(), serial);
        Ok(())
    }

    async fn list_users(
        &self,
        max_results: Option<usize>,
        page_token: Option<&str>,
    ) -> Result<UserPage, IdentityError> {
        let inner = self.lock();
        let page_size = max_results.unwrap_or(DEFAULT_PAGE_SIZE).max(1);

        let mut remaining = inner
            .users
            .values()
            .filter(|user| page_token.is_none_or(|after| user.uid.as_str() > after));
        let users: Vec<UserRecord> =
            remaining.by_ref().take(page_size).cloned().collect();
        let next_page_token = match (remaining.next(), users.last()) {
            (Some(_), Some(last)) => Some(last.uid.to_string()),
            _ => None,
        };

        Ok(UserPage {
            users,
            next_page_token,
        })
    }
}

fn random_string(len: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(millis)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn claims(value: serde_json::Value) -> Claims {
        match value {
            serde_json::Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    // =====================================================================
    // users
    // =====================================================================

    #[tokio::test]
    async fn test_create_user_generates_28_char_uid() {
        let idp = MemoryIdentityProvider::new();

        let user = idp
            .create_user(CreateUser::with_email("a@example.com"))
            .await
            .unwrap();

        assert_eq!(user.uid.as_str().len(), UID_LEN);
        assert_eq!(user.email.as_deref(), Some("a@example.com"));
    }

    #[tokio::test]
    async fn test_create_user_duplicate_email_returns_email_exists() {
        let idp = MemoryIdentityProvider::new();
        idp.create_user(CreateUser::with_email("a@example.com"))
            .await
            .unwrap();

        let result = idp
            .create_user(CreateUser::with_email("A@Example.com"))
            .await;

        assert!(matches!(result, Err(IdentityError::EmailExists(_))));
        assert_eq!(idp.user_count(), 1);
    }

    #[tokio::test]
    async fn test_find_user_by_email_is_case_insensitive() {
        let idp = MemoryIdentityProvider::new();
        let created = idp
            .create_user(CreateUser::with_email("a@example.com"))
            .await
            .unwrap();

        let found = idp.find_user_by_email("A@EXAMPLE.COM").await.unwrap();
        assert_eq!(found.map(|u| u.uid), Some(created.uid));
        assert!(idp.find_user_by_email("b@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_user_moves_email_index() {
        let idp = MemoryIdentityProvider::new();
        let user = idp
            .create_user(CreateUser::with_email("old@example.com"))
            .await
            .unwrap();

        idp.update_user(
            &user.uid,
            UpdateUser {
                email: Some("new@example.com".into()),
                ..UpdateUser::default()
            },
        )
        .await
        .unwrap();

        assert!(idp.find_user_by_email("old@example.com").await.unwrap().is_none());
        assert!(idp.find_user_by_email("new@example.com").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_user_frees_email() {
        let idp = MemoryIdentityProvider::new();
        let user = idp
            .create_user(CreateUser::with_email("a@example.com"))
            .await
            .unwrap();

        idp.delete_user(&user.uid).await.unwrap();

        assert!(matches!(
            idp.get_user(&user.uid).await,
            Err(IdentityError::UserNotFound(_))
        ));
        idp.create_user(CreateUser::with_email("a@example.com"))
            .await
            .expect("email should be free again");
    }

    // =====================================================================
    // tokens
    // =====================================================================

    #[tokio::test]
    async fn test_custom_token_verifies_with_claims() {
        let idp = MemoryIdentityProvider::new();
        let uid = Uid::from("u1");

        let token = idp
            .create_custom_token(&uid, Some(claims(json!({"admin": true}))))
            .await
            .unwrap();
        let decoded = idp.verify_id_token(&token).await.unwrap();

        assert_eq!(decoded.uid, uid);
        assert_eq!(decoded.claims["admin"], json!(true));
    }

    #[tokio::test]
    async fn test_verify_unknown_token_returns_invalid() {
        let idp = MemoryIdentityProvider::new();
        let result = idp.verify_id_token("forged").await;
        assert!(matches!(result, Err(IdentityError::InvalidToken(_))));
    }

    #[tokio::test]
    async fn test_session_cookie_is_not_an_id_token() {
        let idp = MemoryIdentityProvider::new();
        let id_token = idp
            .create_custom_token(&Uid::from("u1"), None)
            .await
            .unwrap();
        let cookie = idp
            .create_session_cookie(&id_token, Duration::from_secs(60))
            .await
            .unwrap();

        assert!(idp.verify_session_cookie(&cookie, false).await.is_ok());
        assert!(idp.verify_id_token(&cookie).await.is_err());
        assert!(idp.verify_session_cookie(&id_token, false).await.is_err());
    }

    #[tokio::test]
    async fn test_zero_ttl_cookie_expires() {
        let idp = MemoryIdentityProvider::new();
        let id_token = idp
            .create_custom_token(&Uid::from("u1"), None)
            .await
            .unwrap();
        let cookie = idp
            .create_session_cookie(&id_token, Duration::ZERO)
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(5)).await;

        assert!(matches!(
            idp.verify_session_cookie(&cookie, false).await,
            Err(IdentityError::InvalidToken(_))
        ));
    }

    #[tokio::test]
    async fn test_revoke_rejects_older_cookies_only_when_checked() {
        let idp = MemoryIdentityProvider::new();
        let user = idp
            .create_user(CreateUser::with_email("a@example.com"))
            .await
            .unwrap();
        let id_token = idp.create_custom_token(&user.uid, None).await.unwrap();
        let old_cookie = idp
            .create_session_cookie(&id_token, Duration::from_secs(60))
            .await
            .unwrap();

        idp.revoke_refresh_tokens(&user.uid).await.unwrap();
        let new_cookie = idp
            .create_session_cookie(&id_token, Duration::from_secs(60))
            .await
            .unwrap();

        assert!(matches!(
            idp.verify_session_cookie(&old_cookie, true).await,
            Err(IdentityError::TokenRevoked(_))
        ));
        assert!(idp.verify_session_cookie(&old_cookie, false).await.is_ok());
        assert!(idp.verify_session_cookie(&new_cookie, true).await.is_ok());
        assert!(idp.get_user(&user.uid).await.unwrap().tokens_valid_after.is_some());
    }

    // =====================================================================
    // list_users
    // =====================================================================

    #[tokio::test]
    async fn test_list_users_pages_through_everyone() {
        let idp = MemoryIdentityProvider::new();
        for i in 0..5 {
            idp.create_user(CreateUser::with_email(format!("u{i}@example.com")))
                .await
                .unwrap();
        }

        let mut seen = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let page = idp.list_users(Some(2), page_token.as_deref()).await.unwrap();
            assert!(page.users.len() <= 2);
            seen.extend(page.users.into_iter().map(|u| u.uid));
            match page.next_page_token {
                Some(next) => page_token = Some(next),
                None => break,
            }
        }

        let mut sorted = seen.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(seen.len(), 5);
        assert_eq!(seen, sorted, "pages come back in uid order, no repeats");
    }
}
