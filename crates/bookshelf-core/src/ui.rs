//! Seams to the surrounding UI layer.
//!
//! The core never renders anything itself. It reports to a `Notifier`,
//! asks a `Navigator` to move the user, and hands downloaded payloads to a
//! `Viewer`.

use std::time::Duration;

use crate::blob::ResourceLease;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Success,
    Error,
}

/// A toast-style message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub description: String,
    pub level: NotificationLevel,
    pub duration: Duration,
}

impl Notification {
    pub fn success(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            level: NotificationLevel::Success,
            duration: Duration::from_secs(3),
        }
    }

    pub fn error(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            level: NotificationLevel::Error,
            duration: Duration::from_secs(5),
        }
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Places the core can send the user to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Login,
}

impl Route {
    pub fn path(&self) -> &'static str {
        match self {
            Route::Login => "/login",
        }
    }
}

pub trait Navigator: Send + Sync {
    fn navigate(&self, route: Route);
}

/// Presents a downloaded payload outside the current flow.
///
/// The viewer owns the lease; the payload's url is revoked when the lease
/// is dropped or its retention runs out.
pub trait Viewer: Send + Sync {
    fn open(&self, lease: ResourceLease);
}
