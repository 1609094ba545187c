//! Terminal implementations of the core's UI seams.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use bookshelf_core::{Navigator, Notification, NotificationLevel, Notifier, ResourceLease, Route, Viewer};
use tracing::error;

/// Prints notifications to stderr
pub struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn notify(&self, notification: Notification) {
        let mark = match notification.level {
            NotificationLevel::Success => "✓",
            NotificationLevel::Error => "✗",
        };
        eprintln!("{} {} {}", mark, notification.title, notification.description);
    }
}

/// The only place to send a terminal user is the login command
pub struct TerminalNavigator;

impl Navigator for TerminalNavigator {
    fn navigate(&self, route: Route) {
        match route {
            Route::Login => eprintln!("Run `bookshelf login` to sign in."),
        }
    }
}

/// File extension for a content type, ignoring parameters like `charset`
pub fn extension_for(content_type: Option<&str>) -> &'static str {
    let mime = content_type
        .and_then(|ct| ct.split(';').next())
        .map(|ct| ct.trim().to_ascii_lowercase());
    match mime.as_deref() {
        Some("application/pdf") => "pdf",
        Some("application/epub+zip") => "epub",
        Some("text/plain") => "txt",
        _ => "bin",
    }
}

/// File name stem for a resource id; anything but `[A-Za-z0-9_-]` becomes `_`
fn file_stem(resource_id: &str) -> String {
    resource_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

/// Writes the downloaded payload to disk while it holds the lease.
pub struct FileViewer {
    resource_id: String,
    output: Option<PathBuf>,
    saved: Mutex<Option<PathBuf>>,
}

impl FileViewer {
    pub fn new(resource_id: impl Into<String>, output: Option<PathBuf>) -> Self {
        Self {
            resource_id: resource_id.into(),
            output,
            saved: Mutex::new(None),
        }
    }

    /// Path the last payload was written to
    pub fn saved_path(&self) -> Option<PathBuf> {
        self.saved.lock().ok().and_then(|saved| saved.clone())
    }

    fn target(&self, lease: &ResourceLease) -> PathBuf {
        self.output.clone().unwrap_or_else(|| {
            PathBuf::from(format!(
                "{}.{}",
                file_stem(&self.resource_id),
                extension_for(lease.content_type())
            ))
        })
    }

    fn write(path: &Path, lease: &ResourceLease) -> std::io::Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, lease.bytes())
    }
}

impl Viewer for FileViewer {
    fn open(&self, lease: ResourceLease) {
        let path = self.target(&lease);
        match Self::write(&path, &lease) {
            Ok(()) => {
                if let Ok(mut saved) = self.saved.lock() {
                    *saved = Some(path);
                }
            }
            Err(e) => error!(error = %e, path = %path.display(), "Failed to write downloaded book"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookshelf_core::{BlobRegistry, Resource};
    use std::time::Duration;

    #[test]
    fn test_extension_for_content_types() {
        assert_eq!(extension_for(Some("application/pdf")), "pdf");
        assert_eq!(extension_for(Some("Application/PDF; charset=binary")), "pdf");
        assert_eq!(extension_for(Some("application/epub+zip")), "epub");
        assert_eq!(extension_for(Some("image/png")), "bin");
        assert_eq!(extension_for(None), "bin");
    }

    #[tokio::test]
    async fn test_file_viewer_writes_payload_and_releases_lease() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("books").join("dom-casmurro.pdf");
        let registry = BlobRegistry::new();
        let lease = registry.register(
            Resource::new(b"%PDF-1.4".to_vec(), Some("application/pdf".to_string())),
            Duration::from_secs(60),
        );
        let url = lease.url().to_string();

        let viewer = FileViewer::new("42", Some(output.clone()));
        viewer.open(lease);

        assert_eq!(std::fs::read(&output).unwrap(), b"%PDF-1.4");
        assert_eq!(viewer.saved_path(), Some(output));
        assert!(!registry.is_live(&url));
    }

    #[tokio::test]
    async fn test_file_viewer_default_name_uses_content_type() {
        let viewer = FileViewer::new("42", None);
        let registry = BlobRegistry::new();
        let lease = registry.register(
            Resource::new(b"x".to_vec(), Some("application/epub+zip".to_string())),
            Duration::from_secs(60),
        );
        assert_eq!(viewer.target(&lease), PathBuf::from("42.epub"));
    }

    #[tokio::test]
    async fn test_file_viewer_default_name_stays_in_working_dir() {
        let viewer = FileViewer::new("../../etc/passwd", None);
        let registry = BlobRegistry::new();
        let lease = registry.register(
            Resource::new(b"x".to_vec(), Some("application/pdf".to_string())),
            Duration::from_secs(60),
        );
        assert_eq!(viewer.target(&lease), PathBuf::from("______etc_passwd.pdf"));
    }
}
