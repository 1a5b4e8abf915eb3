//! Persisted admin credentials.
//!
//! The backend session is two opaque strings: the bearer token and the
//! last-known role. They live and die together — saved in one write,
//! cleared in one call, never independently. The store is an injected
//! capability so guard logic stays testable without touching the
//! filesystem.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::PathBuf;
use tracing::debug;

/// The persisted session pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Bearer token issued at login.
    pub token: String,
    /// Last-known role. Overwritten with the server-confirmed role on
    /// every successful validation.
    pub role: String,
}

/// Read/write/clear capability over the persisted credentials.
pub trait CredentialStore: Send + Sync {
    /// Load the stored credentials, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the store exists but cannot be read or parsed.
    fn load(&self) -> crate::Result<Option<Credentials>>;

    /// Persist the credentials, replacing any previous pair.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    fn save(&self, credentials: &Credentials) -> crate::Result<()>;

    /// Remove both values. A no-op when nothing is stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be cleared.
    fn clear(&self) -> crate::Result<()>;
}

/// Credentials stored as a TOML file, replaced atomically on save.
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    /// Create a store backed by the given file path.
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Default credentials path under the platform data directory.
    ///
    /// # Errors
    ///
    /// Returns an error if no home directory can be determined.
    pub fn default_path() -> crate::Result<PathBuf> {
        directories::ProjectDirs::from("", "", "regdesk")
            .map(|dirs| dirs.data_dir().join("credentials.toml"))
            .ok_or_else(|| crate::Error::Store("no home directory available".to_string()))
    }

    /// The backing file path.
    #[must_use]
    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> crate::Result<Option<Credentials>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path)?;
        let credentials =
            toml::from_str(&content).map_err(|e| crate::Error::Store(e.to_string()))?;
        Ok(Some(credentials))
    }

    fn save(&self, credentials: &Credentials) -> crate::Result<()> {
        let parent = self
            .path
            .parent()
            .ok_or_else(|| crate::Error::Store("credentials path has no parent".to_string()))?;
        std::fs::create_dir_all(parent)?;

        let content = toml::to_string_pretty(credentials)
            .map_err(|e| crate::Error::Store(e.to_string()))?;

        // Write-then-rename so a crash never leaves half a credential pair.
        let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
        tmp.write_all(content.as_bytes())?;
        tmp.persist(&self.path)
            .map_err(|e| crate::Error::Store(e.to_string()))?;

        debug!("credentials saved to {}", self.path.display());
        Ok(())
    }

    fn clear(&self) -> crate::Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                debug!("credentials cleared from {}", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory credential store for tests and embedders that manage their
/// own persistence.
#[derive(Default)]
pub struct MemoryCredentialStore {
    inner: Mutex<Option<Credentials>>,
}

impl MemoryCredentialStore {
    /// Create an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with the given pair.
    #[must_use]
    pub fn with_credentials(credentials: Credentials) -> Self {
        Self {
            inner: Mutex::new(Some(credentials)),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> crate::Result<Option<Credentials>> {
        Ok(self.inner.lock().clone())
    }

    fn save(&self, credentials: &Credentials) -> crate::Result<()> {
        *self.inner.lock() = Some(credentials.clone());
        Ok(())
    }

    fn clear(&self) -> crate::Result<()> {
        *self.inner.lock() = None;
        Ok(())
    }
}
