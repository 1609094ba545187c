//! Durable session storage.
//!
//! This module provides:
//! - `SessionStore`: persists the logged-in session under two entries,
//!   `user` (the JSON identity record) and `token` (the raw bearer token)
//! - `KeyValueBackend`: the storage the entries live in, with file,
//!   OS keychain and in-memory implementations
//!
//! A corrupt `user` entry is treated as "not logged in" so it can never
//! block startup.

pub mod backend;
pub mod session_store;

use thiserror::Error;

pub use backend::{FileBackend, KeyValueBackend, KeyringBackend, MemoryBackend};
pub use session_store::{SessionStore, TOKEN_KEY, USER_KEY};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Session storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Keychain access failed: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("Failed to serialize session: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Persisted session is malformed: {0}")]
    Corrupt(#[source] serde_json::Error),
}
