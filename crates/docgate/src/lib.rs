//! # Docgate
//!
//! A thin layer over a managed document store and identity provider, with
//! a passwordless email login built on top.
//!
//! Docgate doesn't store anything itself. You bring a [`DocumentStore`]
//! and an [`IdentityProvider`] (or use the in-memory ones behind the
//! `memory` feature) and get:
//!
//! - path-dispatched CRUD where `users/alice` is a document and `users` is
//!   a collection ([`Documents`])
//! - pass-through user management ([`Identity`])
//! - a two-step email login: [`initiate`](Docgate::initiate) issues a
//!   single-use token, [`confirm`](Docgate::confirm) consumes it, records
//!   a 30-day session and returns a signed identity token
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use docgate::prelude::*;
//!
//! # async fn run() -> Result<(), DocgateError> {
//! let docgate = Docgate::builder().build(MemoryStore::new(), MemoryIdentityProvider::new());
//!
//! let ticket = docgate.initiate("ada@example.com", None).await?;
//! // ...deliver ticket.token by email, then when the link is followed:
//! let confirmation = docgate.confirm(&ticket.token, &ticket.uid, Some("203.0.113.7")).await?;
//! println!("signed in: {}", confirmation.identity_token);
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! - `memory` (default): in-process `MemoryStore` and
//!   `MemoryIdentityProvider`

mod client;
mod error;
mod logging;
mod lookup;

pub use client::{Docgate, DocgateBuilder};
pub use error::DocgateError;
pub use logging::init_tracing;
pub use lookup::UserKey;

pub use docgate_identity::{
    Claims, CreateUser, DecodedToken, Identity, IdentityError, IdentityProvider, Uid, UpdateUser,
    UserPage, UserRecord,
};
pub use docgate_session::{
    Clock, Confirmation, ConfirmedSession, ConfirmedTokenPolicy, LoginSession, LoginTicket,
    ManualClock, SessionConfig, SessionError, SessionManager, SystemClock,
};
pub use docgate_store::{
    classify, resolve, CollectionPath, DocumentPath, DocumentStore, Documents, FieldTransform,
    Fetched, Fields, PathKind, ResolvedPath, SetOptions, Snapshot, StoreError, Subscription,
};

#[cfg(feature = "memory")]
pub use docgate_identity::MemoryIdentityProvider;
#[cfg(feature = "memory")]
pub use docgate_store::MemoryStore;

/// The types most applications need.
pub mod prelude {
    pub use crate::{
        Confirmation, Docgate, DocgateError, DocumentStore, Fields, IdentityProvider,
        LoginTicket, SessionConfig, Uid,
    };

    #[cfg(feature = "memory")]
    pub use crate::{MemoryIdentityProvider, MemoryStore};
}
