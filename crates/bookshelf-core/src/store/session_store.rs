use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, warn};

use super::{FileBackend, KeyValueBackend, KeyringBackend, MemoryBackend, StoreError};
use crate::auth::UserSession;

/// Entry holding the JSON identity record (token included)
pub const USER_KEY: &str = "user";

/// Entry holding the raw bearer token on its own
pub const TOKEN_KEY: &str = "token";

/// Persists the current session across restarts.
///
/// `user` is the source of truth. `token` is a copy kept for consumers that
/// only need the bearer token; `load` rewrites it when it has drifted.
/// Writes to the two entries are not transactional.
#[derive(Clone)]
pub struct SessionStore {
    backend: Arc<dyn KeyValueBackend>,
}

impl SessionStore {
    pub fn new(backend: Arc<dyn KeyValueBackend>) -> Self {
        Self { backend }
    }

    pub fn file(dir: PathBuf) -> Self {
        Self::new(Arc::new(FileBackend::new(dir)))
    }

    pub fn keyring(service: &str) -> Self {
        Self::new(Arc::new(KeyringBackend::new(service)))
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBackend::new()))
    }

    /// Load the persisted session.
    ///
    /// Missing, unreadable and malformed entries all yield `None`.
    pub fn load(&self) -> Option<UserSession> {
        let raw = match self.backend.get(USER_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!("No persisted session found");
                return None;
            }
            Err(e) => {
                warn!(error = %e, "Failed to read persisted session, starting logged out");
                return None;
            }
        };

        let session = match Self::parse(&raw) {
            Ok(session) => session,
            Err(e) => {
                warn!(error = %e, "Ignoring malformed persisted session");
                return None;
            }
        };

        self.repair_token(&session);
        Some(session)
    }

    /// Persist the session and its standalone token copy
    pub fn save(&self, session: &UserSession) -> Result<(), StoreError> {
        let contents = serde_json::to_string_pretty(session)?;
        self.backend.set(USER_KEY, &contents)?;
        self.backend.set(TOKEN_KEY, session.token())?;
        Ok(())
    }

    /// Remove both entries. Clearing an empty store succeeds.
    pub fn clear(&self) -> Result<(), StoreError> {
        let user = self.backend.remove(USER_KEY);
        let token = self.backend.remove(TOKEN_KEY);
        user.and(token)
    }

    /// Read the standalone token entry
    pub fn token(&self) -> Option<String> {
        match self.backend.get(TOKEN_KEY) {
            Ok(token) => token.filter(|t| !t.is_empty()),
            Err(e) => {
                warn!(error = %e, "Failed to read persisted token");
                None
            }
        }
    }

    fn parse(raw: &str) -> Result<UserSession, StoreError> {
        serde_json::from_str(raw).map_err(StoreError::Corrupt)
    }

    fn repair_token(&self, session: &UserSession) {
        match self.backend.get(TOKEN_KEY) {
            Ok(Some(token)) if token == session.token() => {}
            Ok(_) => {
                debug!("Standalone token entry out of sync, rewriting it");
                if let Err(e) = self.backend.set(TOKEN_KEY, session.token()) {
                    warn!(error = %e, "Failed to repair persisted token");
                }
            }
            Err(e) => warn!(error = %e, "Failed to read persisted token"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{session, FailingBackend};

    fn memory_store() -> (Arc<MemoryBackend>, SessionStore) {
        let backend = Arc::new(MemoryBackend::new());
        (backend.clone(), SessionStore::new(backend))
    }

    #[test]
    fn test_load_empty_store() {
        let (_, store) = memory_store();
        assert!(store.load().is_none());
        assert!(store.token().is_none());
    }

    #[test]
    fn test_save_then_load_roundtrip() {
        let (backend, store) = memory_store();
        let saved = session("Ana", "abc");
        store.save(&saved).unwrap();

        assert_eq!(store.load(), Some(saved));
        assert_eq!(backend.get(TOKEN_KEY).unwrap().as_deref(), Some("abc"));
        assert_eq!(store.token().as_deref(), Some("abc"));
    }

    #[test]
    fn test_load_malformed_json_is_absent() {
        let (backend, store) = memory_store();
        backend.set(USER_KEY, "{not json").unwrap();
        assert!(store.load().is_none());
    }

    #[test]
    fn test_load_record_without_token_is_absent() {
        let (backend, store) = memory_store();
        backend
            .set(USER_KEY, r#"{"name":"Ana","token":""}"#)
            .unwrap();
        assert!(store.load().is_none());
    }

    #[test]
    fn test_load_repairs_missing_token_entry() {
        let (backend, store) = memory_store();
        store.save(&session("Ana", "abc")).unwrap();
        backend.remove(TOKEN_KEY).unwrap();

        assert!(store.load().is_some());
        assert_eq!(backend.get(TOKEN_KEY).unwrap().as_deref(), Some("abc"));
    }

    #[test]
    fn test_load_repairs_divergent_token_entry() {
        let (backend, store) = memory_store();
        store.save(&session("Ana", "abc")).unwrap();
        backend.set(TOKEN_KEY, "stale").unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.token(), "abc");
        assert_eq!(store.token().as_deref(), Some("abc"));
    }

    #[test]
    fn test_clear_is_idempotent() {
        let (backend, store) = memory_store();
        store.save(&session("Ana", "abc")).unwrap();

        store.clear().unwrap();
        assert!(backend.is_empty());
        store.clear().unwrap();
        assert!(backend.is_empty());
        assert!(store.load().is_none());
    }

    #[test]
    fn test_unreadable_backend_loads_as_absent() {
        let store = SessionStore::new(Arc::new(FailingBackend));
        assert!(store.load().is_none());
        assert!(store.save(&session("Ana", "abc")).is_err());
        assert!(store.clear().is_err());
    }

    #[test]
    fn test_file_store_survives_new_instance() {
        let dir = tempfile::tempdir().unwrap();
        SessionStore::file(dir.path().to_path_buf())
            .save(&session("Ana", "abc"))
            .unwrap();

        let reopened = SessionStore::file(dir.path().to_path_buf());
        assert_eq!(reopened.load().unwrap().display_name(), "Ana");
    }
}
