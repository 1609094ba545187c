//! Session state machine.
//!
//! `Loading -> {Anonymous, Authenticated}` once at startup, then
//! `Anonymous <-> Authenticated` through login, logout and invalidation.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{watch, Mutex};
use tracing::{debug, error, info, warn};

use super::{AuthError, Credentials, Identity, SessionState, UserSession};
use crate::store::SessionStore;
use crate::ui::{Notification, Notifier};

/// How long the welcome notification stays up
const LOGIN_NOTICE_DURATION: Duration = Duration::from_secs(3);

/// Remote service that exchanges credentials for an identity record.
#[async_trait]
pub trait AuthService: Send + Sync {
    async fn login(&self, credentials: &Credentials) -> Result<Identity, AuthError>;
}

/// Owns the in-memory session and is the only writer of the `SessionStore`.
///
/// Construct once at startup and share as `Arc<AuthManager>`. Callers are
/// expected not to run two logins at once. A login that straddles an explicit
/// logout is discarded; see `login`.
pub struct AuthManager {
    store: SessionStore,
    auth: Arc<dyn AuthService>,
    notifier: Arc<dyn Notifier>,
    state: watch::Sender<SessionState>,
    /// Bumped by every explicit logout or invalidation
    epoch: AtomicU64,
    /// Serializes store writes; each write reflects the latest state
    persist_lock: Mutex<()>,
}

impl AuthManager {
    pub fn new(
        store: SessionStore,
        auth: Arc<dyn AuthService>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let (state, _) = watch::channel(SessionState::Loading);
        Self {
            store,
            auth,
            notifier,
            state,
            epoch: AtomicU64::new(0),
            persist_lock: Mutex::new(()),
        }
    }

    /// Resolve the startup state from the persisted session.
    ///
    /// Only the first call does any work; later calls return the current
    /// state. Never fails and never touches the network.
    pub async fn initialize(&self) -> SessionState {
        if !self.state.borrow().is_loading() {
            return self.current_session();
        }

        let store = self.store.clone();
        let restored = match tokio::task::spawn_blocking(move || store.load()).await {
            Ok(restored) => restored,
            Err(e) => {
                warn!(error = %e, "Session restore task failed, starting logged out");
                None
            }
        };

        self.state.send_if_modified(|state| {
            if !state.is_loading() {
                return false;
            }
            *state = match restored {
                Some(session) => {
                    info!(name = %session.display_name(), "Restored persisted session");
                    SessionState::Authenticated(session)
                }
                None => {
                    debug!("No session to restore");
                    SessionState::Anonymous
                }
            };
            true
        });

        self.current_session()
    }

    /// Log in with the given credentials.
    ///
    /// On failure the current state is left untouched and the error is
    /// returned for the caller to present. If `logout` or `invalidate` runs
    /// while the request is in flight, the result is discarded with
    /// `AuthError::Superseded`.
    pub async fn login(&self, credentials: &Credentials) -> Result<UserSession, AuthError> {
        if !credentials.is_complete() {
            return Err(AuthError::MissingCredentials);
        }

        let started = self.epoch.load(Ordering::SeqCst);

        let identity = match self.auth.login(credentials).await {
            Ok(identity) => identity,
            Err(e) => {
                error!(error = %e, email = %credentials.email, "Login failed");
                return Err(e);
            }
        };

        let session = UserSession::new(identity).map_err(|e| {
            error!(error = %e, "Login response carried no usable token");
            AuthError::from(e)
        })?;

        let applied = self.state.send_if_modified(|state| {
            if self.epoch.load(Ordering::SeqCst) != started {
                return false;
            }
            *state = SessionState::Authenticated(session.clone());
            true
        });

        if !applied {
            warn!(email = %credentials.email, "Discarding login that finished after a logout");
            return Err(AuthError::Superseded);
        }
        self.persist().await;

        info!(name = %session.display_name(), "Login successful");
        self.notifier.notify(
            Notification::success(
                "Login successful.",
                format!("Welcome {}!", session.display_name()),
            )
            .with_duration(LOGIN_NOTICE_DURATION),
        );

        Ok(session)
    }

    /// Log out. Always ends Anonymous; store failures are only logged.
    pub async fn logout(&self) {
        self.end_session().await;
        info!("Logged out");
    }

    /// Same effect as `logout`, for sessions the server no longer accepts
    pub async fn invalidate(&self) {
        self.end_session().await;
        info!("Session invalidated");
    }

    /// Invalidate the session only if it still carries `token`.
    ///
    /// Used when the server rejects a specific token. A newer session
    /// established in the meantime is kept, and the logout epoch is not
    /// bumped, so an in-flight login is not discarded. Returns whether the
    /// session was cleared.
    pub async fn invalidate_token(&self, token: &str) -> bool {
        let cleared = self.state.send_if_modified(|state| {
            if state.token() != Some(token) {
                return false;
            }
            *state = SessionState::Anonymous;
            true
        });

        if cleared {
            self.persist().await;
            info!("Session invalidated by server");
        } else {
            debug!("Ignoring rejection of a token that is no longer current");
        }
        cleared
    }

    async fn end_session(&self) {
        self.state.send_modify(|state| {
            self.epoch.fetch_add(1, Ordering::SeqCst);
            *state = SessionState::Anonymous;
        });
        self.persist().await;
    }

    /// Write the current state to the store off the async runtime.
    ///
    /// The snapshot is taken after acquiring `persist_lock`, so whichever write
    /// runs last leaves the store matching the in-memory state. Failures are
    /// logged only.
    async fn persist(&self) {
        let _guard = self.persist_lock.lock().await;
        let snapshot = self.current_session();
        if snapshot.is_loading() {
            return;
        }

        let store = self.store.clone();
        let result = tokio::task::spawn_blocking(move || match snapshot {
            SessionState::Authenticated(session) => store.save(&session),
            _ => store.clear(),
        })
        .await;

        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "Failed to persist session"),
            Err(e) => warn!(error = %e, "Session persist task failed"),
        }
    }

    /// Snapshot of the current state
    pub fn current_session(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Bearer token of the current session, if any
    pub fn token(&self) -> Option<String> {
        self.state.borrow().token().map(str::to_string)
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    /// Receiver that is notified on every state change
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }
}
