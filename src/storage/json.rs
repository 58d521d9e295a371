//! JSON file-based key-value cache.
//!
//! Keeps the whole map in memory and rewrites the file on every change using
//! write-to-temp + rename, so a crash never leaves a half-written cache.
//!
//! # File Format
//!
//! ```json
//! {
//!   "version": 1,
//!   "entries": {
//!     "current_user": "{\"id\":\"1\",\"first_name\":\"Ivan\",...}"
//!   }
//! }
//! ```

use crate::domain::error::{MihfError, Result};
use crate::storage::backend::KeyValueCache;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheData {
    version: u32,

    #[serde(default)]
    entries: BTreeMap<String, String>,
}

impl Default for CacheData {
    fn default() -> Self {
        Self {
            version: FORMAT_VERSION,
            entries: BTreeMap::new(),
        }
    }
}

/// JSON file cache.
///
/// # Thread Safety
///
/// `Send` but not `Sync`; the session worker is its only user.
pub struct JsonStore {
    file_path: PathBuf,
    data: CacheData,
    dirty: bool,
}

impl JsonStore {
    /// Opens the cache at `file_path`, creating parent directories.
    ///
    /// A file that is not valid JSON is moved aside to `<name>.corrupt` and the
    /// cache starts empty; the cache only holds data that can be refetched.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent directory cannot be created or an
    /// existing file cannot be read.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use mihf::storage::{JsonStore, KeyValueCache};
    /// use std::path::PathBuf;
    ///
    /// let mut store = JsonStore::new(PathBuf::from("/tmp/mihf/cache.json"))?;
    /// store.set("greeting", "hello")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn new(file_path: PathBuf) -> Result<Self> {
        tracing::debug!(path = ?file_path, "opening JSON cache");

        if let Some(parent) = file_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let data = if file_path.exists() {
            Self::load_from_file(&file_path)?
        } else {
            tracing::debug!("initializing new empty cache");
            CacheData::default()
        };

        tracing::debug!(entries = data.entries.len(), "cache opened");

        Ok(Self {
            file_path,
            data,
            dirty: false,
        })
    }

    fn load_from_file(path: &Path) -> Result<CacheData> {
        let contents = std::fs::read_to_string(path)?;
        match serde_json::from_str::<CacheData>(&contents) {
            Ok(data) => {
                tracing::debug!(version = data.version, "loaded cache data");
                Ok(data)
            }
            Err(e) => {
                let aside = path.with_extension("corrupt");
                tracing::warn!(error = %e, aside = ?aside, "cache file is corrupt, starting empty");
                std::fs::rename(path, &aside)?;
                Ok(CacheData::default())
            }
        }
    }

    fn save_to_file(&mut self) -> Result<()> {
        if !self.dirty {
            tracing::trace!("skipping save, no changes");
            return Ok(());
        }

        let json = serde_json::to_string_pretty(&self.data)
            .map_err(|e| MihfError::Storage(format!("failed to serialize cache: {e}")))?;

        let tmp_path = self.file_path.with_extension("tmp");
        std::fs::write(&tmp_path, json)?;
        std::fs::rename(&tmp_path, &self.file_path)?;

        self.dirty = false;
        tracing::debug!(path = ?self.file_path, "cache saved");
        Ok(())
    }
}

impl KeyValueCache for JsonStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.data.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let _span = tracing::debug_span!("json_cache_set", key = %key).entered();

        self.data.entries.insert(key.to_string(), value.to_string());
        self.dirty = true;
        self.save_to_file()
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        let _span = tracing::debug_span!("json_cache_remove", key = %key).entered();

        if self.data.entries.remove(key).is_none() {
            return Ok(());
        }
        self.dirty = true;
        self.save_to_file()
    }
}

impl Drop for JsonStore {
    fn drop(&mut self) {
        if self.dirty {
            tracing::debug!("saving dirty cache on drop");
            if let Err(e) = self.save_to_file() {
                tracing::error!(error = %e, "failed to save cache on drop");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn values_survive_reopen() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("nested").join("cache.json");

        let mut store = JsonStore::new(path.clone()).expect("open");
        store.set("current_user", "{\"id\":\"1\"}").expect("set");
        drop(store);

        let reopened = JsonStore::new(path).expect("reopen");
        assert_eq!(
            reopened.get("current_user").expect("get").as_deref(),
            Some("{\"id\":\"1\"}")
        );
    }

    #[test]
    fn removing_missing_key_is_ok() {
        let dir = TempDir::new().expect("tempdir");
        let mut store = JsonStore::new(dir.path().join("cache.json")).expect("open");
        store.remove("nothing").expect("remove");
        assert!(!dir.path().join("cache.json").exists());
    }

    #[test]
    fn corrupt_file_is_moved_aside() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("cache.json");
        std::fs::write(&path, "{ not json").expect("write");

        let store = JsonStore::new(path.clone()).expect("open");
        assert_eq!(store.get("current_user").expect("get"), None);
        assert!(dir.path().join("cache.corrupt").exists());
    }
}
