//! # Error Hierarchy
//!
//! Structured error types shared by every Trellis crate, built with `thiserror`.
//!
//! [`AppError`] is the typed application exception: business code raises it
//! with an explicit HTTP status and the error pipeline translates it into an
//! envelope carrying that status. The remaining enums cover configuration and
//! application-context failures.

use thiserror::Error;

/// Typed application exception carrying its own HTTP status code.
///
/// Raised by controllers and services; propagates unchanged until the error
/// handler registry turns it into a response whose `message` and `error`
/// fields both carry the display text of the variant's message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    /// Request was well-formed but semantically wrong (400).
    #[error("{0}")]
    BadRequest(String),

    /// Authentication failure (401).
    #[error("{0}")]
    Unauthorized(String),

    /// Authorization failure (403).
    #[error("{0}")]
    Forbidden(String),

    /// Resource not found (404).
    #[error("{0}")]
    NotFound(String),

    /// Conflict with current resource state (409).
    #[error("{0}")]
    Conflict(String),

    /// Request understood but not processable (422).
    #[error("{0}")]
    Unprocessable(String),

    /// Internal server error (500).
    #[error("{0}")]
    Internal(String),

    /// Any other status code.
    #[error("{message}")]
    Status {
        /// HTTP status code to respond with.
        status: u16,
        /// Human-readable message.
        message: String,
    },
}

impl AppError {
    /// Build an error for an arbitrary status code.
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self::Status {
            status,
            message: message.into(),
        }
    }

    /// Return the HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::BadRequest(_) => 400,
            Self::Unauthorized(_) => 401,
            Self::Forbidden(_) => 403,
            Self::NotFound(_) => 404,
            Self::Conflict(_) => 409,
            Self::Unprocessable(_) => 422,
            Self::Internal(_) => 500,
            Self::Status { status, .. } => *status,
        }
    }

    /// Return the message carried by this error.
    pub fn message(&self) -> &str {
        match self {
            Self::BadRequest(m)
            | Self::Unauthorized(m)
            | Self::Forbidden(m)
            | Self::NotFound(m)
            | Self::Conflict(m)
            | Self::Unprocessable(m)
            | Self::Internal(m) => m,
            Self::Status { message, .. } => message,
        }
    }
}

/// Errors while reading typed configuration from a provider.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A key was present but its value could not be interpreted.
    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        /// Configuration key.
        key: String,
        /// Raw value found.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A key required by the caller was absent.
    #[error("missing required configuration key: {0}")]
    Missing(String),
}

/// Errors from the application context lifecycle.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContextError {
    /// `ContextSlot::init` was called a second time.
    #[error("application context is already initialized")]
    AlreadyInitialized,

    /// The context was read before it was initialized.
    #[error("application context has not been initialized")]
    NotInitialized,

    /// A plugin name was registered twice.
    #[error("plugin already registered: {0}")]
    DuplicatePlugin(String),
}
