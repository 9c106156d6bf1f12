use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CourierError {
    #[error("Missing credentials")]
    MissingCredentials,

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Browser launch failed: {0}")]
    LaunchFailed(String),

    #[error("Browser session is not running")]
    SessionClosed,

    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Timed out after {timeout_ms}ms waiting for {subject} to become visible")]
    TimeoutExceeded { subject: String, timeout_ms: u64 },

    #[error("No export link matching \"pdf\" in the reports menu")]
    ExportLinkNotFound,

    #[error("Report artifact unavailable at {path}: {source}")]
    ArtifactUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JavaScript execution failed: {0}")]
    JavaScriptFailed(String),

    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Notification failed: {0}")]
    NotificationFailed(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CourierError>;

// Chrome calls surface anyhow errors; fold them into the crate taxonomy.
impl From<anyhow::Error> for CourierError {
    fn from(err: anyhow::Error) -> Self {
        CourierError::JavaScriptFailed(err.to_string())
    }
}
