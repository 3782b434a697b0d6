//! Error types for PatentInsight.
//!
//! Library crates use [`PatentInsightError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.
//!
//! Per-record errors (invalid URL, network, blocked, parse, validation) are
//! recovered locally by the pipeline; only [`PatentInsightError::Config`] and
//! [`PatentInsightError::Io`] abort a run.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level error type for all PatentInsight operations.
#[derive(Debug, thiserror::Error)]
pub enum PatentInsightError {
    /// Configuration loading or validation error. Fatal.
    #[error("config error: {message}")]
    Config { message: String },

    /// Filesystem I/O error. Fatal.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Malformed source URL; failed before any network call.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// Network/HTTP error (timeout, connection, non-success status).
    #[error("network error: {0}")]
    Network(String),

    /// Rate-limiting or CAPTCHA signal from the remote source.
    #[error("blocked by remote source: {0}")]
    Blocked(String),

    /// Content extraction error (no selector matched).
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Data validation error (missing required field, malformed row).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, PatentInsightError>;

/// Classification of a failed fetch attempt, recorded on the
/// per-record fetch result artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchErrorKind {
    InvalidUrl,
    NetworkError,
    Blocked,
    ParseError,
}

impl std::fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FetchErrorKind::InvalidUrl => "invalid_url",
            FetchErrorKind::NetworkError => "network_error",
            FetchErrorKind::Blocked => "blocked",
            FetchErrorKind::ParseError => "parse_error",
        };
        write!(f, "{name}")
    }
}

impl PatentInsightError {
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

    /// Whether this error aborts a run rather than being absorbed into
    /// per-record statistics.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Config { .. } | Self::Io { .. })
    }

    /// The fetch-result classification of this error, if it is one of the
    /// per-record fetch failures.
    pub fn fetch_kind(&self) -> Option<FetchErrorKind> {
        match self {
            Self::InvalidUrl(_) => Some(FetchErrorKind::InvalidUrl),
            Self::Network(_) => Some(FetchErrorKind::NetworkError),
            Self::Blocked(_) => Some(FetchErrorKind::Blocked),
            Self::Parse { .. } => Some(FetchErrorKind::ParseError),
            _ => None,
        }
    }
}
