//! Core library for bookshelf.
//!
//! Keeps the user's session across restarts, gates book downloads on it and
//! drops it when the server stops accepting the token.
//!
//! Wiring, leaves first:
//! - `store::SessionStore` persists the session
//! - `auth::AuthManager` owns the session state and is the only store writer
//! - `download::Downloader` fetches books with the session's bearer token
//!
//! `api::ApiClient` implements the network side of both, and the `ui`
//! traits are supplied by whatever front end embeds the library.

pub mod api;
pub mod auth;
pub mod blob;
pub mod config;
pub mod download;
pub mod store;
pub mod ui;

#[cfg(test)]
pub(crate) mod testing;

pub use api::{ApiClient, ApiError};
pub use auth::{AuthError, AuthManager, AuthService, Credentials, Identity, SessionState, UserSession};
pub use blob::{BlobRegistry, Resource, ResourceLease};
pub use config::Config;
pub use download::{DownloadOutcome, Downloader, FetchOutcome, RedirectReason, ResourceFetcher};
pub use store::SessionStore;
pub use ui::{Navigator, Notification, NotificationLevel, Notifier, Route, Viewer};
