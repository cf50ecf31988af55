//! `Identity`: pass-through over the active [`IdentityProvider`].
//!
//! No logic lives here beyond holding the provider. Like the document
//! facade, the provider sits behind an `RwLock<Arc<P>>` so switching
//! projects only affects calls that start after the switch.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;

use crate::{
    Claims, CreateUser, DecodedToken, IdentityError, IdentityProvider, Uid,
    UpdateUser, UserPage, UserRecord,
};

pub struct Identity<P> {
    provider: RwLock<Arc<P>>,
}

impl<P: IdentityProvider> Identity<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider: RwLock::new(Arc::new(provider)),
        }
    }

    /// Makes `provider` the target of every call that starts from now on.
    pub async fn switch_project(&self, provider: P) {
        *self.provider.write().await = Arc::new(provider);
        tracing::info!("identity project switched");
    }

    /// The provider the next call would use.
    pub async fn current(&self) -> Arc<P> {
        Arc::clone(&*self.provider.read().await)
    }

    pub async fn find_user_by_email(
        &self,
        email: &str,
    ) -> Result<Option<UserRecord>, IdentityError> {
        self.current().await.find_user_by_email(email).await
    }

    pub async fn get_user(&self, uid: &Uid) -> Result<UserRecord, IdentityError> {
        self.current().await.get_user(uid).await
    }

    pub async fn create_user(
        &self,
        user: CreateUser,
    ) -> Result<UserRecord, IdentityError> {
        let created = self.current().await.create_user(user).await?;
        tracing::debug!(uid = %created.uid, "user created");
        Ok(created)
    }

    pub async fn update_user(
        &self,
        uid: &Uid,
        update: UpdateUser,
    ) -> Result<UserRecord, IdentityError> {
        self.current().await.update_user(uid, update).await
    }

    pub async fn delete_user(&self, uid: &Uid) -> Result<(), IdentityError> {
        self.current().await.delete_user(uid).await?;
        tracing::debug!(%uid, "user deleted");
        Ok(())
    }

    pub async fn set_custom_claims(
        &self,
        uid: &Uid,
        claims: Claims,
    ) -> Result<(), IdentityError> {
        self.current().await.set_custom_claims(uid, claims).await
    }

    pub async fn create_custom_token(
        &self,
        uid: &Uid,
        claims: Option<Claims>,
    ) -> Result<String, IdentityError> {
        self.current().await.create_custom_token(uid, claims).await
    }

    pub async fn create_session_cookie(
        &self,
        id_token: &str,
        expires_in: Duration,
    ) -> Result<String, IdentityError> {
        self.current()
            .await
            .create_session_cookie(id_token, expires_in)
            .await
    }

    pub async fn verify_id_token(
        &self,
        token: &str,
    ) -> Result<DecodedToken, IdentityError> {
        self.current().await.verify_id_token(token).await
    }

    pub async fn verify_session_cookie(
        &self,
        cookie: &str,
        check_revoked: bool,
    ) -> Result<DecodedToken, IdentityError> {
        self.current()
            .await
            .verify_session_cookie(cookie, check_revoked)
            .await
    }

    pub async fn revoke_refresh_tokens(
        &self,
        uid: &Uid,
    ) -> Result<(), IdentityError> {
        self.current().await.revoke_refresh_tokens(uid).await?;
        tracing::info!(%uid, "refresh tokens revoked");
        Ok(())
    }

    pub async fn list_users(
        &self,
        max_results: Option<usize>,
        page_token: Option<&str>,
    ) -> Result<UserPage, IdentityError> {
        self.current()
            .await
            .list_users(max_results, page_token)
            .await
    }
}
