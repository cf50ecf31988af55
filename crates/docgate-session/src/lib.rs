//! Passwordless email-login sessions for Docgate.
//!
//! This crate is the part of Docgate with actual state. It runs a two-step
//! login:
//!
//! 1. **Initiate**: an email resolves to a user (created on first sight)
//!    and a short-lived, single-use login token is issued
//!    ([`SessionManager::initiate`])
//! 2. **Confirm**: the token comes back (typically via an emailed link),
//!    is consumed, a durable session is recorded under the user, and the
//!    identity provider signs a custom token ([`SessionManager::confirm`])
//!
//! # How it fits in the stack
//!
//! ```text
//! Docgate client (above)  ← re-exports the manager and adds user lookup
//!     ↕
//! Session Layer (this crate)  ← login tokens, expiry, single-use consumption
//!     ↕
//! Store + Identity Layers (below)  ← persistence and user records
//! ```

mod clock;
mod config;
mod error;
mod manager;
mod session;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfirmedTokenPolicy, SessionConfig};
pub use error::SessionError;
pub use manager::SessionManager;
pub use session::{Confirmation, ConfirmedSession, LoginSession, LoginTicket};
