//! Error types for regdesk.

/// Errors produced by the console, the backend client, and the stores.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The HTTP call itself failed (connect, timeout, or body decode).
    #[error("transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-success status other than 401/403.
    #[error("backend returned status {status}")]
    Backend {
        /// HTTP status code returned by the backend.
        status: u16,
    },

    /// The backend rejected our credentials (401/403 on an authenticated
    /// call). The caller must clear the credential store and re-login.
    #[error("session invalid: credentials rejected by backend")]
    SessionInvalid,

    /// Configuration could not be loaded or written.
    #[error("config error: {0}")]
    Config(String),

    /// The credential store could not be read or written.
    #[error("credential store error: {0}")]
    Store(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns true if this error means the stored session is no longer
    /// usable and the user must log in again.
    #[must_use]
    pub fn is_session_invalid(&self) -> bool {
        matches!(self, Error::SessionInvalid)
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
