//! Concurrent session storage with per-session single-writer serialization
//! and lock-free reads across sessions.

pub mod error;
pub mod store;

pub use error::StoreError;
pub use store::{MutateError, SessionStore};
