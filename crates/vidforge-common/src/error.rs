//! Unified error type for vidforge.
//!
//! Every crate funnels its failures into [`Error`], which carries enough
//! context for the HTTP layer to derive a status code via
//! [`Error::http_status`].

use std::fmt;

/// Unified error type covering all failure modes in vidforge.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The requested asset (or other entity) does not exist.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of entity (e.g. "asset").
        entity: String,
        /// The identifier that was looked up.
        id: String,
    },

    /// The asset exists but is zero bytes or cannot be read.
    #[error("Empty or corrupt asset: {0}")]
    EmptyOrCorrupt(String),

    /// The detected MIME type is not on the allow-list.
    #[error("Unsupported video format (detected: {detected})")]
    UnsupportedFormat {
        /// The MIME type the detectors settled on, or "unknown".
        detected: String,
    },

    /// The `Range` header is malformed or out of bounds.
    #[error("Invalid range: {reason}")]
    InvalidRange {
        /// Size of the asset the range was evaluated against.
        total_size: u64,
        /// Human-readable description of what was wrong.
        reason: String,
    },

    /// Every transcode strategy failed and passthrough is disallowed.
    #[error("Conversion failed: {0}")]
    ConversionFailure(String),

    /// An external tool (ffmpeg, ffprobe) returned an error.
    #[error("Tool error [{tool}]: {message}")]
    Tool {
        /// Name of the tool that failed.
        tool: String,
        /// Human-readable error description.
        message: String,
    },

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Configuration could not be parsed or is invalid.
    #[error("Config error: {0}")]
    Config(String),

    /// Catch-all for unexpected internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Map this error to an appropriate HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            Error::NotFound { .. } => 404,
            Error::EmptyOrCorrupt(_) => 422,
            Error::UnsupportedFormat { .. } => 415,
            Error::InvalidRange { .. } => 416,
            Error::ConversionFailure(_) => 502,
            Error::Tool { .. } => 502,
            Error::Io { .. } => 500,
            Error::Config(_) => 400,
            Error::Internal(_) => 500,
        }
    }

    /// Convenience constructor for [`Error::NotFound`].
    pub fn not_found(entity: impl Into<String>, id: impl fmt::Display) -> Self {
        Error::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Convenience constructor for [`Error::Tool`].
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Tool {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Convenience constructor for [`Error::InvalidRange`].
    pub fn invalid_range(total_size: u64, reason: impl Into<String>) -> Self {
        Error::InvalidRange {
            total_size,
            reason: reason.into(),
        }
    }

    /// Convenience constructor for [`Error::UnsupportedFormat`].
    pub fn unsupported(detected: Option<&str>) -> Self {
        Error::UnsupportedFormat {
            detected: detected.unwrap_or("unknown").to_string(),
        }
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
