//! Durable storage for the bearer token.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::SessionError;

/// Persists the session token across restarts.
///
/// Implementations are synchronous: the payload is a few bytes and every
/// call happens outside any network round trip.
pub trait TokenStore: Send + Sync {
    /// Read the stored token, if any.
    ///
    /// # Errors
    ///
    /// Returns error if the store exists but cannot be read or decoded.
    fn load(&self) -> Result<Option<SecretString>, SessionError>;

    /// Replace the stored token.
    ///
    /// # Errors
    ///
    /// Returns error if the store cannot be written.
    fn save(&self, token: &SecretString) -> Result<(), SessionError>;

    /// Erase the stored token. Erasing an empty store succeeds.
    ///
    /// # Errors
    ///
    /// Returns error if the store cannot be removed.
    fn clear(&self) -> Result<(), SessionError>;
}

impl<T: TokenStore + ?Sized> TokenStore for std::sync::Arc<T> {
    fn load(&self) -> Result<Option<SecretString>, SessionError> {
        (**self).load()
    }

    fn save(&self, token: &SecretString) -> Result<(), SessionError> {
        (**self).save(token)
    }

    fn clear(&self) -> Result<(), SessionError> {
        (**self).clear()
    }
}

/// On-disk layout: `{"authToken": "..."}`.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionFile {
    #[serde(default)]
    auth_token: Option<String>,
}

/// Token store backed by a JSON file.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    /// Store the token at `path`. Parent directories are created on save.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the session file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<Option<SecretString>, SessionError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        if contents.trim().is_empty() {
            return Ok(None);
        }

        let file: SessionFile = serde_json::from_str(&contents)?;
        Ok(file
            .auth_token
            .filter(|t| !t.is_empty())
            .map(SecretString::from))
    }

    fn save(&self, token: &SecretString) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let file = SessionFile {
            auth_token: Some(token.expose_secret().to_string()),
        };
        fs::write(&self.path, serde_json::to_vec(&file)?)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionError> {
        match fs::remove_file(&self.path) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

/// Process-local token store, for tests and embedders without a disk.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<SecretString>>,
}

impl MemoryTokenStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that already holds `token`, as if persisted by an earlier run.
    #[must_use]
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(SecretString::from(token.into()))),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Result<Option<SecretString>, SessionError> {
        Ok(self
            .token
            .lock()
            .map_err(|_| SessionError::Poisoned)?
            .clone())
    }

    fn save(&self, token: &SecretString) -> Result<(), SessionError> {
        *self.token.lock().map_err(|_| SessionError::Poisoned)? = Some(token.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionError> {
        *self.token.lock().map_err(|_| SessionError::Poisoned)? = None;
        Ok(())
    }
}
