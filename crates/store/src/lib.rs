//! SurveyLens document store adapters.
//!
//! Implements the [`pipeline::DocumentStore`] trait twice:
//!
//! - [`FirestoreStore`]: Firestore REST v1 over `reqwest`. Typed-value
//!   encoding lives in [`value`]; the rest of the workspace only sees plain JSON.
//! - [`MemoryStore`]: in-process store with the same observable semantics,
//!   used by tests and by offline runs of the CLI.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Request formatting, authentication, and error mapping live
//! here. The [`pipeline`] crate sees only [`pipeline::DocumentStore`] and
//! [`pipeline::StoreError`]. No operation retries.

pub mod firestore;
pub mod ids;
pub mod memory;
pub mod value;

pub use firestore::{FirestoreConfig, FirestoreStore};
pub use memory::MemoryStore;
