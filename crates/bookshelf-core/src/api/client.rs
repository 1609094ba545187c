//! API client for communicating with the bookshelf REST API.
//!
//! This module provides the `ApiClient` struct for logging in and for
//! downloading book files with a bearer token.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode, Url};
use serde::Deserialize;
use tracing::debug;

use super::ApiError;
use crate::auth::{AuthError, AuthService, Credentials, Identity};
use crate::blob::Resource;
use crate::download::{FetchOutcome, ResourceFetcher};

// ============================================================================
// Constants
// ============================================================================

/// Default server used when no base URL is configured
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";

/// HTTP request timeout in seconds.
/// 30s allows for large PDFs over slow links while failing fast enough for good UX.
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Accept header for book downloads
const DOWNLOAD_ACCEPT: &str = "application/pdf, application/octet-stream";

/// Error body returned by the server on rejected requests
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

/// API client for the bookshelf server.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// Create a new API client with the default request timeout
    pub fn new(base_url: impl Into<String>) -> Result<Self, ApiError> {
        Self::with_timeout(base_url, Duration::from_secs(REQUEST_TIMEOUT_SECS))
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(timeout).build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Download URL with `resource_id` escaped as a single path segment
    fn download_url(&self, resource_id: &str) -> Result<Url, ApiError> {
        let invalid = |reason: String| ApiError::InvalidUrl(format!("{}: {}", self.base_url, reason));
        let mut url = Url::parse(&self.base_url).map_err(|e| invalid(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| invalid("cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(["books", resource_id, "download"]);
        Ok(url)
    }

    /// Map a failed login response to an `AuthError`.
    ///
    /// The server's `error` message is kept verbatim for validation and
    /// conflict statuses; other client errors are plain rejections.
    fn login_rejection(status: StatusCode, body: &str) -> AuthError {
        match status.as_u16() {
            400 | 409 | 422 => AuthError::Rejected {
                status: status.as_u16(),
                message: serde_json::from_str::<ErrorBody>(body)
                    .ok()
                    .and_then(|b| b.error),
            },
            400..=499 if status != StatusCode::TOO_MANY_REQUESTS => AuthError::Rejected {
                status: status.as_u16(),
                message: None,
            },
            _ => ApiError::from_status(status, body).into(),
        }
    }
}

#[async_trait]
impl AuthService for ApiClient {
    async fn login(&self, credentials: &Credentials) -> Result<Identity, AuthError> {
        let url = self.url("/users/login");

        let response = self
            .client
            .post(&url)
            .header(header::ACCEPT, "application/json")
            .json(credentials)
            .send()
            .await
            .map_err(ApiError::from)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Self::login_rejection(status, &body));
        }

        let identity = response.json::<Identity>().await.map_err(|e| {
            ApiError::InvalidResponse(format!("Failed to parse login response: {}", e))
        })?;
        Ok(identity)
    }
}

#[async_trait]
impl ResourceFetcher for ApiClient {
    async fn fetch(&self, resource_id: &str, token: &str) -> FetchOutcome {
        let url = match self.download_url(resource_id) {
            Ok(url) => url,
            Err(e) => return FetchOutcome::OtherError(e),
        };

        let response = match self
            .client
            .get(url)
            .bearer_auth(token)
            .header(header::ACCEPT, DOWNLOAD_ACCEPT)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return FetchOutcome::OtherError(e.into()),
        };

        let status = response.status();
        if status == StatusCode::FORBIDDEN {
            return FetchOutcome::Forbidden;
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return FetchOutcome::OtherError(ApiError::from_status(status, &body));
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        debug!(resource = resource_id, content_type = ?content_type, "Download response received");

        match response.bytes().await {
            Ok(bytes) => FetchOutcome::Ok(Resource::new(bytes.to_vec(), content_type)),
            Err(e) => FetchOutcome::OtherError(e.into()),
        }
    }
}
