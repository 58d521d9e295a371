//! Bearer token stores.

use crate::domain::error::{MihfError, Result};
use crate::storage::backend::{CredentialStore, KeyValueCache};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Token kept in a single owner-readable file.
///
/// The file holds the raw token and nothing else. Writes go through a
/// temporary file and a rename, and on Unix the file mode is `0600`.
#[derive(Debug)]
pub struct FileCredentialStore {
    file_path: PathBuf,
}

impl FileCredentialStore {
    #[must_use]
    pub const fn new(file_path: PathBuf) -> Self {
        Self { file_path }
    }

    #[cfg(unix)]
    fn restrict_permissions(path: &std::path::Path) -> std::io::Result<()> {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
    }

    #[cfg(not(unix))]
    fn restrict_permissions(_path: &std::path::Path) -> std::io::Result<()> {
        Ok(())
    }
}

impl CredentialStore for FileCredentialStore {
    fn save_token(&mut self, token: &str) -> Result<()> {
        if let Some(parent) = self.file_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp_path = self.file_path.with_extension("tmp");
        std::fs::write(&tmp_path, token)?;
        Self::restrict_permissions(&tmp_path)?;
        std::fs::rename(&tmp_path, &self.file_path)?;
        tracing::debug!(path = ?self.file_path, "token saved");
        Ok(())
    }

    fn read_token(&self) -> Result<Option<String>> {
        match std::fs::read_to_string(&self.file_path) {
            Ok(raw) => {
                let token = raw.trim();
                Ok((!token.is_empty()).then(|| token.to_string()))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn delete_token(&mut self) -> Result<()> {
        match std::fs::remove_file(&self.file_path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

fn poisoned<T>(e: std::sync::PoisonError<T>) -> MihfError {
    MihfError::Storage(format!("lock poisoned: {e}"))
}

/// In-process token slot.
///
/// Clones share the same slot, so a test can keep one handle while the
/// session worker owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryCredentialStore {
    slot: Arc<Mutex<Option<String>>>,
}

impl MemoryCredentialStore {
    #[must_use]
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(token.into()))),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn save_token(&mut self, token: &str) -> Result<()> {
        *self.slot.lock().map_err(poisoned)? = Some(token.to_string());
        Ok(())
    }

    fn read_token(&self) -> Result<Option<String>> {
        Ok(self.slot.lock().map_err(poisoned)?.clone())
    }

    fn delete_token(&mut self) -> Result<()> {
        *self.slot.lock().map_err(poisoned)? = None;
        Ok(())
    }
}

/// In-process key-value cache with shared clones.
#[derive(Debug, Clone, Default)]
pub struct MemoryCache {
    entries: Arc<Mutex<BTreeMap<String, String>>>,
}

impl KeyValueCache for MemoryCache {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.lock().map_err(poisoned)?.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries
            .lock()
            .map_err(poisoned)?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.entries.lock().map_err(poisoned)?.remove(key);
        Ok(())
    }
}
