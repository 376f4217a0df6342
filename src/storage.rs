//! Persisted client-side state: the recent-uploads list.
//!
//! The list is held in memory and rewritten to a JSON file in the data
//! directory after every mutation. Writes go through a temporary file that
//! is renamed into place, so a crash never leaves a half-written list.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use thiserror::Error;

use crate::models::RecentUploadRecord;

/// Errors from persisting client state.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Newest-first list of successful uploads, capped at `capacity` entries.
pub struct RecentUploads {
    path: PathBuf,
    capacity: usize,
    entries: Mutex<Vec<RecentUploadRecord>>,
}

impl RecentUploads {
    /// Load the list from `path`.
    ///
    /// A missing file is an empty list. So is an unreadable or corrupt one,
    /// with a warning; the next mutation overwrites it.
    pub fn load(path: impl Into<PathBuf>, capacity: usize) -> Self {
        let path = path.into();
        let mut entries = match std::fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<Vec<RecentUploadRecord>>(&contents) {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!(
                        "Ignoring corrupt recent uploads file {}: {}",
                        path.display(),
                        e
                    );
                    Vec::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                tracing::warn!("Failed to read {}: {}", path.display(), e);
                Vec::new()
            }
        };

        let capacity = capacity.max(1);
        entries.truncate(capacity);
        tracing::debug!("Loaded {} recent uploads", entries.len());

        Self {
            path,
            capacity,
            entries: Mutex::new(entries),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record a successful upload at the front of the list.
    ///
    /// A name already in the list gets a ` (n)` version marker. Returns the
    /// record as stored.
    pub fn push(
        &self,
        name: &str,
        file_type: &str,
        file_size: u64,
    ) -> Result<RecentUploadRecord, StorageError> {
        let mut entries = self.lock();

        let mut unique = name.to_string();
        let mut counter = 1;
        while entries.iter().any(|e| e.name == unique) {
            unique = format!("{} ({})", name, counter);
            counter += 1;
        }

        let record = RecentUploadRecord {
            name: unique,
            file_type: file_type.to_string(),
            file_size,
            upload_timestamp: Utc::now(),
        };
        let mut next = Vec::with_capacity(entries.len() + 1);
        next.push(record.clone());
        next.extend(entries.iter().cloned());
        next.truncate(self.capacity);

        self.commit(&mut entries, next)?;
        Ok(record)
    }

    /// Remove an entry by name. Returns whether it was present.
    pub fn remove(&self, name: &str) -> Result<bool, StorageError> {
        let mut entries = self.lock();
        if !entries.iter().any(|e| e.name == name) {
            return Ok(false);
        }
        let next = entries.iter().filter(|e| e.name != name).cloned().collect();
        self.commit(&mut entries, next)?;
        Ok(true)
    }

    pub fn clear(&self) -> Result<(), StorageError> {
        let mut entries = self.lock();
        self.commit(&mut entries, Vec::new())
    }

    /// Snapshot, newest first.
    pub fn list(&self) -> Vec<RecentUploadRecord> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<RecentUploadRecord>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Write `next` to disk and only then make it the in-memory list.
    fn commit(
        &self,
        entries: &mut MutexGuard<'_, Vec<RecentUploadRecord>>,
        next: Vec<RecentUploadRecord>,
    ) -> Result<(), StorageError> {
        self.persist(&next)?;
        **entries = next;
        Ok(())
    }

    fn persist(&self, entries: &[RecentUploadRecord]) -> Result<(), StorageError> {
        let io_err = |source: std::io::Error| StorageError::Io {
            path: self.path.clone(),
            source,
        };

        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).map_err(io_err)?;

        let json = serde_json::to_vec_pretty(entries)?;
        let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(io_err)?;
        tmp.write_all(&json).map_err(io_err)?;
        tmp.persist(&self.path).map_err(|e| io_err(e.error))?;
        Ok(())
    }
}
