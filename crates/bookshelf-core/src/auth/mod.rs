//! Authentication module for managing the user's session.
//!
//! This module provides:
//! - `AuthManager`: the session state machine, sole writer of the session store
//! - `UserSession` / `SessionState`: the session model
//! - `Credentials`: what the user types into the login form
//!
//! Sessions are restored from disk at startup and cleared on logout or when
//! the server rejects the token.

pub mod credentials;
pub mod error;
pub mod manager;
pub mod session;

pub use credentials::Credentials;
pub use error::AuthError;
pub use manager::{AuthManager, AuthService};
pub use session::{Identity, SessionError, SessionState, UserSession};
