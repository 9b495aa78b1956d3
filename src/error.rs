//! Error taxonomy for the navigator
//!
//! "Not found" is deliberately absent: a symbol with no match is a valid
//! `None` / empty result. Extractors and the cache never hand these errors to
//! completion callers; they degrade to empty indexes and log. Only the
//! create-file path, configuration loading and the external query timeout
//! surface to a user.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NavigatorError {
    /// The external introspection query exited non-zero or printed output we
    /// could not parse.
    #[error("external query failed: {reason}")]
    ExternalQueryFailed { reason: String },

    /// The external introspection query did not exit before its deadline and
    /// was killed.
    #[error("external query timed out after {timeout:?}")]
    ExternalQueryTimeout { timeout: Duration },

    #[error("failed to create {path:?}: {source}")]
    CreateFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{path:?} is not a resolution candidate for this view")]
    NotACandidate { path: PathBuf },

    #[error("{path:?} already exists")]
    AlreadyExists { path: PathBuf },

    #[error("invalid configuration in {path:?}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("no Laravel project found at or above {start:?}")]
    ProjectNotFound { start: PathBuf },
}

impl NavigatorError {
    /// Whether this failure should be shown to the user rather than only
    /// logged.
    pub fn is_user_visible(&self) -> bool {
        !matches!(self, NavigatorError::ExternalQueryFailed { .. })
    }
}

pub type Result<T> = std::result::Result<T, NavigatorError>;
