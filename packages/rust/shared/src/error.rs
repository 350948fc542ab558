//! Error types for hcexport.
//!
//! Library crates use [`HelpCenterError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all export operations.
#[derive(Debug, thiserror::Error)]
pub enum HelpCenterError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error while fetching the help center.
    #[error("network error: {0}")]
    Network(String),

    /// The API kept redirecting past the configured limit.
    #[error("too many redirects while fetching {url}")]
    TooManyRedirects { url: String },

    /// Malformed cached JSON or API payload.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (bad template, invalid value, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// A WordPress cross-link points at an entity with no known permalink.
    #[error("unresolved cross-link to id {id} ({url})")]
    UnresolvedLink { id: u64, url: String },

    /// No translation string exists for the requested language and key.
    #[error("missing translation for language '{language}', key '{key}'")]
    MissingTranslation { language: String, key: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, HelpCenterError>;

impl HelpCenterError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
