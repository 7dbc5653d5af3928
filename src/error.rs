//! Error types for the session core.

use thiserror::Error;

/// Failures surfaced by [`crate::session::FtpSession`] operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Transport could not be opened, or the server greeting was not positive.
    #[error("connection to {host}:{port} refused: {reason}")]
    ConnectionRefused {
        host: String,
        port: u16,
        reason: String,
    },

    #[error("login failed for {username}: {reason}")]
    AuthenticationFailed { username: String, reason: String },

    #[error("Not connected to FTP server")]
    NotConnected,

    /// Any other error reported by the transport while connected.
    #[error("FTP transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Error reported by a [`crate::transport::Transport`] implementation.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct TransportError {
    pub message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<suppaftp::FtpError> for TransportError {
    fn from(e: suppaftp::FtpError) -> Self {
        TransportError::new(e.to_string())
    }
}

impl From<std::io::Error> for TransportError {
    fn from(e: std::io::Error) -> Self {
        TransportError::new(format!("I/O error: {}", e))
    }
}

/// Listing parse failures. Both are recovered inside the session.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ListingError {
    /// A LIST line matched no known server dialect.
    #[error("unrecognized listing dialect: {0:?}")]
    UnsupportedDialect(String),

    /// The name-list fallback also failed.
    #[error("listing unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CredentialError {
    #[error("stored salt is not valid base64: {0}")]
    InvalidSalt(String),
}

/// Persistence failures. Non-fatal: in-memory state stays usable.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("connection store I/O error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("connection store is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error("no connection with id {0}")]
    UnknownProfile(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Json(#[from] serde_json::Error),
}

pub type SessionResult<T> = Result<T, SessionError>;
