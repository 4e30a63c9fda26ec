//! JSON-backed persistence for the conversation log and its metadata.
//!
//! The log lives in one pretty-printed JSON array that is rewritten in full on
//! every save. Writes go to a sibling temp file that is fsynced and renamed over
//! the record, under an exclusive advisory lock, so a crash mid-write never
//! leaves a truncated record behind.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;

use super::bounding::bound_history;
use super::message::Message;
use super::metadata::{SessionConfig, SessionMetadata};
use super::stats::ConversationStats;
use crate::errors::StoreError;

pub struct ConversationStore {
    history_path: PathBuf,
    metadata_path: PathBuf,
    config: SessionConfig,
}

impl ConversationStore {
    pub fn new(history_path: PathBuf, metadata_path: PathBuf, config: SessionConfig) -> Self {
        Self {
            history_path,
            metadata_path,
            config,
        }
    }

    pub fn config(&self) -> SessionConfig {
        self.config
    }

    pub fn history_path(&self) -> &Path {
        &self.history_path
    }

    pub fn metadata_path(&self) -> &Path {
        &self.metadata_path
    }

    /// Load the stored log, creating an empty record if none exists yet.
    pub fn load(&self) -> Result<Vec<Message>, StoreError> {
        match read_json(&self.history_path)? {
            Some(log) => Ok(log),
            None => {
                let empty: Vec<Message> = Vec::new();
                write_json_atomic(&self.history_path, &empty)?;
                Ok(empty)
            }
        }
    }

    /// Bound `log`, persist it, and refresh the metadata record.
    ///
    /// Returns what was actually written, which is what the next `load` sees.
    pub fn save(&self, log: Vec<Message>) -> Result<Vec<Message>, StoreError> {
        let before = log.len();
        let bounded = bound_history(log, self.config.max_history);
        if bounded.len() < before {
            tracing::info!(
                before,
                after = bounded.len(),
                max_history = self.config.max_history,
                "Bounded conversation history"
            );
        }

        write_json_atomic(&self.history_path, &bounded)?;
        let metadata = SessionMetadata::new(bounded.len(), self.config);
        write_json_atomic(&self.metadata_path, &metadata)?;
        Ok(bounded)
    }

    /// Reset the stored log to an empty sequence.
    pub fn clear(&self) -> Result<(), StoreError> {
        write_json_atomic(&self.history_path, &Vec::<Message>::new())
    }

    pub fn load_metadata(&self) -> Result<Option<SessionMetadata>, StoreError> {
        read_json(&self.metadata_path)
    }

    /// Delete the metadata record. Returns whether a record existed.
    pub fn remove_metadata(&self) -> Result<bool, StoreError> {
        match fs::remove_file(&self.metadata_path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(StoreError::Write {
                path: self.metadata_path.clone(),
                source,
            }),
        }
    }

    pub fn stats(&self) -> Result<ConversationStats, StoreError> {
        Ok(ConversationStats::from_messages(&self.load()?))
    }
}

/// Read a JSON record. A missing or blank file reads as `None`.
fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(StoreError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    if content.trim().is_empty() {
        return Ok(None);
    }

    serde_json::from_str(&content)
        .map(Some)
        .map_err(|source| StoreError::Parse {
            path: path.to_path_buf(),
            source,
        })
}

fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StoreError> {
    let write_err = |source| StoreError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(write_err)?;
    }

    let json = serde_json::to_string_pretty(value).map_err(|source| StoreError::Serialize {
        path: path.to_path_buf(),
        source,
    })?;

    let _lock = FileLock::acquire(path)?;

    let tmp_path = sibling_path(path, "tmp");
    let mut tmp = File::create(&tmp_path).map_err(write_err)?;
    tmp.write_all(json.as_bytes()).map_err(write_err)?;
    tmp.sync_all().map_err(write_err)?;
    drop(tmp);

    fs::rename(&tmp_path, path).map_err(write_err)
}

/// `dir/.name.suffix` next to `path`.
fn sibling_path(path: &Path, suffix: &str) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.{}", name, suffix))
}

/// Exclusive advisory lock held for the duration of a write.
struct FileLock {
    _file: File,
}

impl FileLock {
    fn acquire(path: &Path) -> Result<Self, StoreError> {
        let lock_path = sibling_path(path, "lock");
        let lock_err = |source| StoreError::Lock {
            path: lock_path.clone(),
            source,
        };
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(lock_err)?;
        fs2::FileExt::lock_exclusive(&file).map_err(lock_err)?;
        // Released when the handle closes.
        Ok(Self { _file: file })
    }
}
