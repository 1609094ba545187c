//! In-process fakes for the collaborator traits, shared by unit tests.

use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::Notify;

use crate::auth::{AuthError, AuthService, Credentials, Identity, UserSession};
use crate::blob::ResourceLease;
use crate::download::{FetchOutcome, ResourceFetcher};
use crate::store::{KeyValueBackend, StoreError};
use crate::ui::{Navigator, Notification, Notifier, Route, Viewer};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap()
}

pub fn identity(name: &str, token: &str) -> Identity {
    serde_json::from_value(json!({
        "id": 1,
        "name": name,
        "email": format!("{}@example.com", name.to_lowercase()),
        "token": token,
    }))
    .unwrap()
}

pub fn session(name: &str, token: &str) -> UserSession {
    UserSession::new(identity(name, token)).unwrap()
}

/// Backend whose every operation fails
pub struct FailingBackend;

impl FailingBackend {
    fn error() -> StoreError {
        io::Error::new(io::ErrorKind::PermissionDenied, "storage unavailable").into()
    }
}

impl KeyValueBackend for FailingBackend {
    fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
        Err(Self::error())
    }

    fn set(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
        Err(Self::error())
    }

    fn remove(&self, _key: &str) -> Result<(), StoreError> {
        Err(Self::error())
    }
}

/// Auth service answering from a queue of canned responses
#[derive(Default)]
pub struct FakeAuthService {
    responses: Mutex<VecDeque<Result<Identity, AuthError>>>,
    gate: Mutex<Option<Arc<Notify>>>,
    calls: AtomicUsize,
}

impl FakeAuthService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_ok(&self, identity: Identity) {
        lock(&self.responses).push_back(Ok(identity));
    }

    pub fn push_err(&self, error: AuthError) {
        lock(&self.responses).push_back(Err(error));
    }

    /// Make subsequent logins wait until the returned `Notify` fires
    pub fn gate(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *lock(&self.gate) = Some(gate.clone());
        gate
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuthService for FakeAuthService {
    async fn login(&self, _credentials: &Credentials) -> Result<Identity, AuthError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let gate = lock(&self.gate).clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        lock(&self.responses)
            .pop_front()
            .unwrap_or(Err(AuthError::Rejected {
                status: 401,
                message: None,
            }))
    }
}

/// Fetcher that records the tokens it was called with
pub struct FakeFetcher {
    respond: Box<dyn Fn() -> FetchOutcome + Send + Sync>,
    tokens: Mutex<Vec<String>>,
}

impl FakeFetcher {
    pub fn new(respond: impl Fn() -> FetchOutcome + Send + Sync + 'static) -> Self {
        Self {
            respond: Box::new(respond),
            tokens: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        lock(&self.tokens).len()
    }

    pub fn tokens(&self) -> Vec<String> {
        lock(&self.tokens).clone()
    }
}

#[async_trait]
impl ResourceFetcher for FakeFetcher {
    async fn fetch(&self, _resource_id: &str, token: &str) -> FetchOutcome {
        lock(&self.tokens).push(token.to_string());
        (self.respond)()
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    notifications: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn notifications(&self) -> Vec<Notification> {
        lock(&self.notifications).clone()
    }

    pub fn clear(&self) {
        lock(&self.notifications).clear();
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        lock(&self.notifications).push(notification);
    }
}

#[derive(Default)]
pub struct RecordingNavigator {
    routes: Mutex<Vec<Route>>,
}

impl RecordingNavigator {
    pub fn routes(&self) -> Vec<Route> {
        lock(&self.routes).clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, route: Route) {
        lock(&self.routes).push(route);
    }
}

/// Viewer that keeps every lease open until `close_all`
#[derive(Default)]
pub struct RecordingViewer {
    leases: Mutex<Vec<ResourceLease>>,
}

impl RecordingViewer {
    pub fn opened(&self) -> Vec<String> {
        lock(&self.leases)
            .iter()
            .map(|lease| lease.url().to_string())
            .collect()
    }

    pub fn last_bytes(&self) -> Option<Vec<u8>> {
        lock(&self.leases).last().map(|lease| lease.bytes().to_vec())
    }

    pub fn close_all(&self) {
        lock(&self.leases).clear();
    }
}

impl Viewer for RecordingViewer {
    fn open(&self, lease: ResourceLease) {
        lock(&self.leases).push(lease);
    }
}
