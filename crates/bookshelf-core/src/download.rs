//! Authenticated book downloads.
//!
//! `Downloader::download` runs a small workflow:
//! check the session, fetch with the bearer token, then settle the outcome.
//! Without a session no request is made. A 403 invalidates the session and
//! sends the user to the login page.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::api::ApiError;
use crate::auth::AuthManager;
use crate::blob::{BlobRegistry, Resource, DEFAULT_RETENTION};
use crate::ui::{Navigator, Notification, Notifier, Route, Viewer};

const DOWNLOAD_FAILED_TITLE: &str = "Download failed";

/// Result of a protected fetch, classified once at the HTTP boundary.
#[derive(Debug)]
pub enum FetchOutcome {
    Ok(Resource),
    /// The server no longer accepts the token
    Forbidden,
    OtherError(ApiError),
}

#[async_trait]
pub trait ResourceFetcher: Send + Sync {
    async fn fetch(&self, resource_id: &str, token: &str) -> FetchOutcome;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectReason {
    NotLoggedIn,
    SessionExpired,
}

impl RedirectReason {
    pub fn message(&self) -> &'static str {
        match self {
            RedirectReason::NotLoggedIn => "You need to be logged in to download this.",
            RedirectReason::SessionExpired => "Session expired. Please log in again.",
        }
    }
}

/// Terminal state of a download.
#[derive(Debug)]
pub enum DownloadOutcome {
    /// User was sent to the login page
    Redirected(RedirectReason),
    /// Payload handed to the viewer under this url
    Opened { url: String },
    /// Logged only; session untouched
    Failed(ApiError),
}

enum DownloadStep {
    CheckAuth,
    Fetch { token: String },
    Outcome { token: String, outcome: FetchOutcome },
    Terminal(DownloadOutcome),
}

pub struct Downloader {
    auth: Arc<AuthManager>,
    fetcher: Arc<dyn ResourceFetcher>,
    notifier: Arc<dyn Notifier>,
    navigator: Arc<dyn Navigator>,
    viewer: Arc<dyn Viewer>,
    blobs: BlobRegistry,
    retention: Duration,
}

impl Downloader {
    pub fn new(
        auth: Arc<AuthManager>,
        fetcher: Arc<dyn ResourceFetcher>,
        notifier: Arc<dyn Notifier>,
        navigator: Arc<dyn Navigator>,
        viewer: Arc<dyn Viewer>,
    ) -> Self {
        Self {
            auth,
            fetcher,
            notifier,
            navigator,
            viewer,
            blobs: BlobRegistry::new(),
            retention: DEFAULT_RETENTION,
        }
    }

    /// Share an existing registry, e.g. one the viewer resolves urls from
    pub fn with_registry(mut self, blobs: BlobRegistry) -> Self {
        self.blobs = blobs;
        self
    }

    /// Upper bound on how long an opened payload stays addressable
    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    pub fn registry(&self) -> &BlobRegistry {
        &self.blobs
    }

    /// Download a book and open it in the viewer.
    ///
    /// Not cancellable once the request is sent.
    pub async fn download(&self, resource_id: &str) -> DownloadOutcome {
        let mut step = DownloadStep::CheckAuth;
        loop {
            step = match step {
                DownloadStep::CheckAuth => match self.auth.token() {
                    Some(token) => DownloadStep::Fetch { token },
                    None => {
                        warn!(resource = resource_id, "Download attempted without a session");
                        DownloadStep::Terminal(self.redirect(RedirectReason::NotLoggedIn))
                    }
                },
                DownloadStep::Fetch { token } => {
                    let outcome = self.fetcher.fetch(resource_id, &token).await;
                    DownloadStep::Outcome { token, outcome }
                }
                DownloadStep::Outcome { token, outcome } => {
                    DownloadStep::Terminal(self.settle(resource_id, &token, outcome).await)
                }
                DownloadStep::Terminal(outcome) => return outcome,
            };
        }
    }

    async fn settle(&self, resource_id: &str, token: &str, outcome: FetchOutcome) -> DownloadOutcome {
        match outcome {
            FetchOutcome::Ok(resource) => {
                let lease = self.blobs.register(resource, self.retention);
                let url = lease.url().to_string();
                info!(resource = resource_id, url = %url, "Opening downloaded book");
                self.viewer.open(lease);
                DownloadOutcome::Opened { url }
            }
            FetchOutcome::Forbidden => {
                warn!(resource = resource_id, "Download rejected, session expired");
                self.auth.invalidate_token(token).await;
                self.redirect(RedirectReason::SessionExpired)
            }
            FetchOutcome::OtherError(e) => {
                error!(resource = resource_id, error = %e, "Failed to download book");
                DownloadOutcome::Failed(e)
            }
        }
    }

    fn redirect(&self, reason: RedirectReason) -> DownloadOutcome {
        self.notifier
            .notify(Notification::error(DOWNLOAD_FAILED_TITLE, reason.message()));
        self.navigator.navigate(Route::Login);
        DownloadOutcome::Redirected(reason)
    }
}
