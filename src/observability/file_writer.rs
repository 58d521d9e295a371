//! Rotating log file with size-based rotation and backup retention.
//!
//! Plugged into `tracing-subscriber` as a `MakeWriter` through `Arc`, so every
//! formatted event ends up in [`FileWriter::write`] under one mutex.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Mutex;

/// Maximum file size before rotation (10 MB).
pub const MAX_FILE_SIZE_BYTES: u64 = 10 * 1024 * 1024;

/// Number of backup files to retain after rotation.
pub const MAX_BACKUP_FILES: usize = 3;

/// Thread-safe rotating file writer.
///
/// When the current file exceeds the size limit it is renamed to
/// `<name>.<unix_timestamp>` and a fresh file is started. Only the newest
/// [`MAX_BACKUP_FILES`] backups are kept.
pub struct FileWriter {
    file_path: PathBuf,
    max_bytes: u64,
    /// Opened on first write.
    file: Mutex<Option<File>>,
}

impl FileWriter {
    #[must_use]
    pub const fn new(file_path: PathBuf) -> Self {
        Self::with_limit(file_path, MAX_FILE_SIZE_BYTES)
    }

    #[must_use]
    pub const fn with_limit(file_path: PathBuf, max_bytes: u64) -> Self {
        Self {
            file_path,
            max_bytes,
            file: Mutex::new(None),
        }
    }

    fn append(&self, buf: &[u8]) -> io::Result<()> {
        let mut file = self
            .file
            .lock()
            .map_err(|e| io::Error::other(format!("log writer poisoned: {e}")))?;

        if fs::metadata(&self.file_path).is_ok_and(|m| m.len() > self.max_bytes) {
            *file = None;
            self.rotate()?;
        }

        let handle = match file.as_mut() {
            Some(handle) => handle,
            None => file.insert(
                OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&self.file_path)?,
            ),
        };
        handle.write_all(buf)?;
        handle.flush()
    }

    fn rotate(&self) -> io::Result<()> {
        let timestamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();

        let mut backup = self.file_path.clone().into_os_string();
        backup.push(format!(".{timestamp}"));

        if self.file_path.exists() {
            fs::rename(&self.file_path, PathBuf::from(backup))?;
        }
        self.cleanup_old_backups()
    }

    fn cleanup_old_backups(&self) -> io::Result<()> {
        let parent = self
            .file_path
            .parent()
            .ok_or_else(|| io::Error::other("log file has no parent directory"))?;
        let prefix = self
            .file_path
            .file_name()
            .and_then(|s| s.to_str())
            .map(|name| format!("{name}."))
            .ok_or_else(|| io::Error::other("invalid log file name"))?;

        let mut backups: Vec<PathBuf> = fs::read_dir(parent)?
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| {
                path.file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| name.starts_with(&prefix))
            })
            .collect();

        // Backup suffixes are timestamps of equal width, so names sort by age.
        backups.sort_unstable_by(|a, b| b.cmp(a));

        for old in backups.iter().skip(MAX_BACKUP_FILES) {
            let _ = fs::remove_file(old);
        }
        Ok(())
    }
}

impl Write for &FileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.append(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl std::fmt::Debug for FileWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileWriter")
            .field("file_path", &self.file_path)
            .field("max_bytes", &self.max_bytes)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn appends_lines() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("mihf.log");
        let writer = FileWriter::new(path.clone());

        (&writer).write_all(b"first\n").expect("write");
        (&writer).write_all(b"second\n").expect("write");

        assert_eq!(fs::read_to_string(path).expect("read"), "first\nsecond\n");
    }

    #[test]
    fn rotates_and_keeps_three_backups() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("mihf.log");
        let writer = FileWriter::with_limit(path.clone(), 8);

        for i in 0..6 {
            (&writer)
                .write_all(format!("line number {i}\n").as_bytes())
                .expect("write");
        }

        let backups = fs::read_dir(dir.path())
            .expect("read dir")
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().starts_with("mihf.log."))
            .count();
        assert_eq!(backups, MAX_BACKUP_FILES);
        assert_eq!(fs::read_to_string(path).expect("read"), "line number 5\n");
    }
}
