//! Identity provider layer for Docgate.
//!
//! Docgate doesn't issue or verify credentials itself. That's the job of a
//! managed identity provider. This crate defines:
//!
//! 1. **The seam**: the [`IdentityProvider`] trait, one method per
//!    provider operation
//! 2. **The facade**: [`Identity`], a pure pass-through that lets the
//!    active provider (project) be switched at runtime
//! 3. **An in-process provider**: [`MemoryIdentityProvider`] (feature
//!    `memory`, default) for tests and demos
//!
//! Every failure is an [`IdentityError`]; provider-side causes travel
//! inside [`IdentityError::Provider`] untouched.

#![allow(async_fn_in_trait)]

mod error;
mod facade;
#[cfg(feature = "memory")]
mod memory;
mod provider;
mod types;

pub use error::{BoxError, IdentityError};
pub use facade::Identity;
#[cfg(feature = "memory")]
pub use memory::MemoryIdentityProvider;
pub use provider::IdentityProvider;
pub use types::{
    Claims, CreateUser, DecodedToken, Uid, UpdateUser, UserPage, UserRecord,
};
