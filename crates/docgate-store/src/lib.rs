//! Document store layer for Docgate.
//!
//! This crate is the bottom of the stack. It knows how to:
//!
//! 1. **Resolve paths**: decide whether a string like `users/alice`
//!    names a document or a collection ([`resolve`], [`classify`])
//! 2. **Talk to a store**: the [`DocumentStore`] trait is the seam to the
//!    external, managed database
//! 3. **Dispatch by kind**: [`Documents`] takes plain string paths,
//!    resolves them once, and refuses operations on the wrong kind
//!
//! # How it fits in the stack
//!
//! ```text
//! Session Layer (above)  ← persists login sessions through Documents
//!     ↕
//! Store Layer (this crate)  ← paths, facade, collaborator trait
//!     ↕
//! External document store (below)  ← MemoryStore in tests and demos
//! ```
//!
//! # Feature Flags
//!
//! - `memory` (default): in-process [`MemoryStore`]

#![allow(async_fn_in_trait)]

mod error;
mod facade;
#[cfg(feature = "memory")]
mod memory;
mod path;
mod store;
mod types;

pub use error::{BoxError, StoreError};
pub use facade::Documents;
#[cfg(feature = "memory")]
pub use memory::MemoryStore;
pub use path::{
    classify, resolve, CollectionAddress, CollectionPath, DocumentAddress,
    DocumentPath, PathKind, ResolvedPath,
};
pub use store::{DocumentStore, Listener, Subscription};
pub use types::{
    from_fields, to_fields, FieldTransform, Fetched, Fields, SetOptions,
    Snapshot,
};
