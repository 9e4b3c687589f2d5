//! Error types shared by the store clients and the creation saga.
//!
//! [`FsError`] is what callers see: a closed set of kinds, each carrying a
//! sanitized, human readable message. [`StoreError`] is what a backend
//! reports; it is logged where it happens and never handed to a caller as is.

use std::fmt;

/// Classification of an [`FsError`], used by hosts to pick a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Argument,
    Forbidden,
    NotFound,
    Conflict,
    Server,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Argument => "argument",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Server => "server",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors returned to callers of the file namespace.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FsError {
    /// Malformed input, e.g. a relative path or a path without a file part
    #[error("Argument error: {0}")]
    Argument(String),
    /// The requester does not own the target path
    #[error("Forbidden: {0}")]
    Forbidden(String),
    /// The requested metadata entry does not exist
    #[error("Not found: {0}")]
    NotFound(String),
    /// The file collides with an existing entry or object
    #[error("Conflict: {0}")]
    Conflict(String),
    /// Store failures, corrupted records and compensation outcomes
    #[error("Server error: {0}")]
    Server(String),
}

impl FsError {
    pub fn argument(msg: impl Into<String>) -> Self {
        Self::Argument(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn server(msg: impl Into<String>) -> Self {
        Self::Server(msg.into())
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Argument(_) => ErrorKind::Argument,
            Self::Forbidden(_) => ErrorKind::Forbidden,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::Server(_) => ErrorKind::Server,
        }
    }

    /// The message without the kind prefix.
    pub fn message(&self) -> &str {
        match self {
            Self::Argument(msg)
            | Self::Forbidden(msg)
            | Self::NotFound(msg)
            | Self::Conflict(msg)
            | Self::Server(msg) => msg,
        }
    }

    /// HTTP status code a host should answer with.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self.kind() {
            ErrorKind::Argument => 400,
            ErrorKind::Forbidden => 403,
            ErrorKind::NotFound => 404,
            ErrorKind::Conflict => 409,
            ErrorKind::Server => 500,
        }
    }
}

pub type Result<T> = std::result::Result<T, FsError>;

/// Failure reported by a metadata or object backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// A conditional write found its precondition violated
    #[error("conditional check failed")]
    ConditionalCheckFailed,
    /// The addressed item or object does not exist
    #[error("not found: {0}")]
    NotFound(String),
    /// Any other service, transport or encoding failure
    #[error("{code}: {message}")]
    Service { code: String, message: String },
}

impl StoreError {
    pub fn service(code: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Service {
            code: code.into(),
            message: message.to_string(),
        }
    }
}
