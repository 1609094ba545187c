//! Transient, process-local handles for downloaded payloads.
//!
//! A registered payload is addressable by a `blob:` url until its
//! `ResourceLease` is dropped or the retention period runs out, whichever
//! happens first. The lease keeps its own reference to the bytes, so the
//! holder can keep reading after the url has been revoked.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::debug;

/// How long a handle stays addressable when nobody releases it earlier
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(5);

const URL_PREFIX: &str = "blob:bookshelf/";

/// An in-memory binary payload and its declared content type.
#[derive(Clone, PartialEq, Eq)]
pub struct Resource {
    bytes: Arc<[u8]>,
    content_type: Option<String>,
}

impl Resource {
    pub fn new(bytes: impl Into<Arc<[u8]>>, content_type: Option<String>) -> Self {
        Self {
            bytes: bytes.into(),
            content_type,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("len", &self.bytes.len())
            .field("content_type", &self.content_type)
            .finish()
    }
}

#[derive(Default)]
struct Inner {
    entries: Mutex<HashMap<String, Resource>>,
    revoked: AtomicUsize,
}

/// Registry of live transient handles. Clones share the same registry.
#[derive(Clone, Default)]
pub struct BlobRegistry {
    inner: Arc<Inner>,
}

impl BlobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, Resource>> {
        self.inner
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Make a payload addressable and hand out the lease that owns it.
    ///
    /// Must be called from within a Tokio runtime; the expiry timer runs as
    /// a spawned task.
    pub fn register(&self, resource: Resource, retention: Duration) -> ResourceLease {
        let url = format!("{}{:032x}", URL_PREFIX, rand::random::<u128>());
        self.entries().insert(url.clone(), resource.clone());

        let registry = self.clone();
        let expiring = url.clone();
        tokio::spawn(async move {
            tokio::time::sleep(retention).await;
            if registry.revoke(&expiring) {
                debug!(url = %expiring, "Transient handle expired");
            }
        });

        let expires_at = Utc::now()
            + chrono::Duration::from_std(retention).unwrap_or_else(|_| chrono::Duration::zero());
        debug!(url = %url, bytes = resource.len(), "Transient handle created");

        ResourceLease {
            url,
            resource,
            expires_at,
            registry: self.clone(),
        }
    }

    /// Look up a live handle
    pub fn resolve(&self, url: &str) -> Option<Resource> {
        self.entries().get(url).cloned()
    }

    pub fn is_live(&self, url: &str) -> bool {
        self.entries().contains_key(url)
    }

    pub fn live_count(&self) -> usize {
        self.entries().len()
    }

    /// Total number of handles revoked so far
    pub fn revoked_count(&self) -> usize {
        self.inner.revoked.load(Ordering::SeqCst)
    }

    /// Returns false if the handle was already gone
    fn revoke(&self, url: &str) -> bool {
        let removed = self.entries().remove(url).is_some();
        if removed {
            self.inner.revoked.fetch_add(1, Ordering::SeqCst);
        }
        removed
    }
}

/// Ownership of a transient handle. Dropping it revokes the url.
pub struct ResourceLease {
    url: String,
    resource: Resource,
    expires_at: DateTime<Utc>,
    registry: BlobRegistry,
}

impl ResourceLease {
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn resource(&self) -> &Resource {
        &self.resource
    }

    pub fn bytes(&self) -> &[u8] {
        self.resource.bytes()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.resource.content_type()
    }

    /// Latest moment the url stays addressable
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Revoke the url now
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for ResourceLease {
    fn drop(&mut self) {
        if self.registry.revoke(&self.url) {
            debug!(url = %self.url, "Transient handle released");
        }
    }
}

impl fmt::Debug for ResourceLease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceLease")
            .field("url", &self.url)
            .field("resource", &self.resource)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pdf() -> Resource {
        Resource::new(b"%PDF-1.4".to_vec(), Some("application/pdf".to_string()))
    }

    #[tokio::test(start_paused = true)]
    async fn test_handle_expires_after_retention() {
        let registry = BlobRegistry::new();
        let lease = registry.register(pdf(), DEFAULT_RETENTION);
        let url = lease.url().to_string();
        assert!(url.starts_with(URL_PREFIX));

        tokio::time::sleep(Duration::from_millis(4_900)).await;
        assert!(registry.is_live(&url));
        assert_eq!(registry.resolve(&url).unwrap().bytes(), b"%PDF-1.4");

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(!registry.is_live(&url));
        assert_eq!(registry.revoked_count(), 1);

        // The holder still owns the payload after the url is gone
        assert_eq!(lease.bytes(), b"%PDF-1.4");
        drop(lease);
        assert_eq!(registry.revoked_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_release_revokes_once() {
        let registry = BlobRegistry::new();
        let lease = registry.register(pdf(), DEFAULT_RETENTION);
        let url = lease.url().to_string();

        lease.release();
        assert!(!registry.is_live(&url));
        assert_eq!(registry.live_count(), 0);

        tokio::time::sleep(DEFAULT_RETENTION * 2).await;
        assert_eq!(registry.revoked_count(), 1);
    }

    #[tokio::test]
    async fn test_handles_are_distinct() {
        let registry = BlobRegistry::new();
        let a = registry.register(pdf(), DEFAULT_RETENTION);
        let b = registry.register(pdf(), DEFAULT_RETENTION);
        assert_ne!(a.url(), b.url());
        assert_eq!(registry.live_count(), 2);
        assert!(a.expires_at() > Utc::now());
    }

    #[test]
    fn test_resource_debug_omits_payload() {
        let debug = format!("{:?}", pdf());
        assert!(debug.contains("len: 8"));
        assert!(!debug.contains("PDF"));
    }
}
