//! The seam to the external identity provider.

use std::future::Future;
use std::time::Duration;

use crate::{
    Claims, CreateUser, DecodedToken, IdentityError, Uid, UpdateUser, UserPage,
    UserRecord,
};

/// Operations of a managed identity provider.
///
/// # Trait bounds
///
/// - `Send + Sync + 'static` → one provider handle is shared across tasks
///   for the life of the process.
/// - Futures are `Send` so callers can spawn work that awaits them.
///
/// # Example
///
/// ```rust
/// use docgate_identity::{IdentityError, IdentityProvider, Uid, UserRecord};
///
/// /// Rejects every lookup. Handy for testing failure paths.
/// struct Offline;
///
/// impl IdentityProvider for Offline {
///     async fn find_user_by_email(
///         &self,
///         _email: &str,
///     ) -> Result<Option<UserRecord>, IdentityError> {
///         Err(IdentityError::provider("provider unreachable"))
///     }
///     // ...the remaining methods follow the same shape.
/// #   async fn get_user(&self, uid: &Uid) -> Result<UserRecord, IdentityError> { unimplemented!() }
/// #   async fn create_user(&self, _: docgate_identity::CreateUser) -> Result<UserRecord, IdentityError> { unimplemented!() }
/// #   async fn update_user(&self, _: &Uid, _: docgate_identity::UpdateUser) -> Result<UserRecord, IdentityError> { unimplemented!() }
/// #   async fn delete_user(&self, _: &Uid) -> Result<(), IdentityError> { unimplemented!() }
/// #   async fn set_custom_claims(&self, _: &Uid, _: docgate_identity::Claims) -> Result<(), IdentityError> { unimplemented!() }
/// #   async fn create_custom_token(&self, _: &Uid, _: Option<docgate_identity::Claims>) -> Result<String, IdentityError> { unimplemented!() }
/// #   async fn create_session_cookie(&self, _: &str, _: std::time::Duration) -> Result<String, IdentityError> { unimplemented!() }
/// #   async fn verify_id_token(&self, _: &str) -> Result<docgate_identity::DecodedToken, IdentityError> { unimplemented!() }
/// #   async fn verify_session_cookie(&self, _: &str, _: bool) -> Result<docgate_identity::DecodedToken, IdentityError> { unimplemented!() }
/// #   async fn revoke_refresh_tokens(&self, _: &Uid) -> Result<(), IdentityError> { unimplemented!() }
/// #   async fn list_users(&self, _: Option<usize>, _: Option<&str>) -> Result<docgate_identity::UserPage, IdentityError> { unimplemented!() }
/// }
/// ```
pub trait IdentityProvider: Send + Sync + 'static {
    /// Looks a user up by email. `Ok(None)` if no user has it.
    fn find_user_by_email(
        &self,
        email: &str,
    ) -> impl Future<Output = Result<Option<UserRecord>, IdentityError>> + Send;

    /// # Errors
    /// [`IdentityError::UserNotFound`] if the uid is unknown.
    fn get_user(
        &self,
        uid: &Uid,
    ) -> impl Future<Output = Result<UserRecord, IdentityError>> + Send;

    /// # Errors
    /// [`IdentityError::EmailExists`] if another user owns the email.
    fn create_user(
        &self,
        user: CreateUser,
    ) -> impl Future<Output = Result<UserRecord, IdentityError>> + Send;

    fn update_user(
        &self,
        uid: &Uid,
        update: UpdateUser,
    ) -> impl Future<Output = Result<UserRecord, IdentityError>> + Send;

    fn delete_user(
        &self,
        uid: &Uid,
    ) -> impl Future<Output = Result<(), IdentityError>> + Send;

    /// Replaces the user's custom claims.
    fn set_custom_claims(
        &self,
        uid: &Uid,
        claims: Claims,
    ) -> impl Future<Output = Result<(), IdentityError>> + Send;

    /// Issues a signed token a client can exchange for a session.
    fn create_custom_token(
        &self,
        uid: &Uid,
        claims: Option<Claims>,
    ) -> impl Future<Output = Result<String, IdentityError>> + Send;

    /// Mints a session cookie from a verified id token.
    fn create_session_cookie(
        &self,
        id_token: &str,
        expires_in: Duration,
    ) -> impl Future<Output = Result<String, IdentityError>> + Send;

    fn verify_id_token(
        &self,
        token: &str,
    ) -> impl Future<Output = Result<DecodedToken, IdentityError>> + Send;

    /// Verifies a session cookie. With `check_revoked`, cookies issued
    /// before the user's last revocation are rejected.
    fn verify_session_cookie(
        &self,
        cookie: &str,
        check_revoked: bool,
    ) -> impl Future<Output = Result<DecodedToken, IdentityError>> + Send;

    fn revoke_refresh_tokens(
        &self,
        uid: &Uid,
    ) -> impl Future<Output = Result<(), IdentityError>> + Send;

    /// Lists users a page at a time, ordered by uid.
    fn list_users(
        &self,
        max_results: Option<usize>,
        page_token: Option<&str>,
    ) -> impl Future<Output = Result<UserPage, IdentityError>> + Send;
}
