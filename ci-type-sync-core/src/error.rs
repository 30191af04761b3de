//! Error types shared by the report builder, the renderer and the page protocol.
//!
//! Nothing in this crate recovers from an error locally: every variant below aborts
//! the run and is surfaced to the CLI boundary.

use std::path::PathBuf;

/// Boxed error for backend-specific failures (database driver, template engine).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("locator kind {0:?} does not exist in the source")]
    UnknownLocatorKind(String),
    #[error("{kind} {code:?} referenced by a link record does not exist")]
    DanglingReference { kind: &'static str, code: String },
    #[error("source query failed: {0}")]
    Backend(#[source] BoxError),
}

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("template rendering failed: {0}")]
    Render(#[source] BoxError),

    #[error("page store returned HTTP {status} for {url}")]
    Http { status: u16, url: String, body: String },

    #[error("page store request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("no page titled {0:?} found in the page store")]
    PageNotFound(String),

    #[error("unexpected page store response: {0}")]
    UnexpectedResponse(String),

    #[error("page version {0} is not an integer")]
    MalformedVersion(String),

    #[error("failed to write {}: {source}", .path.display())]
    LocalWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SyncError {
    /// HTTP status carried by [`SyncError::Http`], if that is what this is.
    pub fn status(&self) -> Option<u16> {
        match self {
            SyncError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}
