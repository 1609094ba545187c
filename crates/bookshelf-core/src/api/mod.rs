//! REST API client module for the bookshelf server.
//!
//! This module provides the `ApiClient`, which implements both the
//! `AuthService` (login) and the `ResourceFetcher` (book downloads)
//! used by the core.
//!
//! Downloads are authorized with a JWT bearer token obtained from the
//! login endpoint.

pub mod client;
pub mod error;

pub use client::ApiClient;
pub use error::ApiError;
