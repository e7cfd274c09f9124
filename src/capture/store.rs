//! Capture store - File-backed, append-only capture log
//!
//! There is no locking: two processes appending at the same time race on
//! the read-modify-write cycle and the last full rewrite wins.

use super::record::CaptureRecord;
use serde_json::Value;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Capture log persistence errors
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Failed to read capture log {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("Failed to write capture log {}: {source}", .path.display())]
    Write { path: PathBuf, source: io::Error },

    #[error("Failed to encode capture log: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Append-only capture log stored as one JSON array
#[derive(Debug, Clone)]
pub struct CaptureStore {
    path: PathBuf,
}

impl CaptureStore {
    /// Create a store for the log at `path`. Nothing is touched on disk
    /// until the first append.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every element of the log as raw JSON.
    ///
    /// A missing file, or content that is not a JSON array, reads as an
    /// empty log.
    pub fn load_raw(&self) -> Result<Vec<Value>, PersistenceError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::debug!("Capture log {} does not exist yet", self.path.display());
                return Ok(Vec::new());
            }
            Err(source) => {
                return Err(PersistenceError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        match serde_json::from_slice::<Vec<Value>>(&bytes) {
            Ok(entries) => Ok(entries),
            Err(e) => {
                log::debug!(
                    "Capture log {} is not a JSON array ({}), starting empty",
                    self.path.display(),
                    e
                );
                Ok(Vec::new())
            }
        }
    }

    /// Decode the log, skipping entries that are not capture records.
    pub fn records(&self) -> Result<Vec<CaptureRecord>, PersistenceError> {
        let records = self
            .load_raw()?
            .into_iter()
            .enumerate()
            .filter_map(|(index, entry)| match serde_json::from_value(entry) {
                Ok(record) => Some(record),
                Err(e) => {
                    log::warn!("Skipping capture log entry {}: {}", index, e);
                    None
                }
            })
            .collect();
        Ok(records)
    }

    /// Stamp `record` with the current time and append it to the log.
    ///
    /// Existing entries are kept verbatim, including ones this crate cannot
    /// decode. Returns the record as written.
    pub fn append(&self, mut record: CaptureRecord) -> Result<CaptureRecord, PersistenceError> {
        record.set_timestamp(epoch_seconds());

        let mut entries = self.load_raw()?;
        entries.push(serde_json::to_value(&record)?);
        let encoded = serde_json::to_vec_pretty(&entries)?;

        fs::write(&self.path, encoded).map_err(|source| PersistenceError::Write {
            path: self.path.clone(),
            source,
        })?;

        log::info!(
            "Appended {} capture to {} ({} entries)",
            record.kind(),
            self.path.display(),
            entries.len()
        );
        Ok(record)
    }
}

/// Wall-clock time as fractional seconds since the Unix epoch
fn epoch_seconds() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::record::Operand;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_reads_empty() {
        let dir = tempdir().expect("tempdir");
        let store = CaptureStore::new(dir.path().join("absent.json"));
        assert!(store.load_raw().unwrap().is_empty());
        assert!(!store.path().exists());
    }

    #[test]
    fn test_append_creates_file() {
        let dir = tempdir().expect("tempdir");
        let store = CaptureStore::new(dir.path().join("log.json"));
        let written = store
            .append(CaptureRecord::build_value(Operand::new("x", 1)))
            .unwrap();

        assert!(store.path().exists());
        assert!(written.timestamp() > 0.0);
        assert_eq!(store.records().unwrap(), vec![written]);
    }

    #[test]
    fn test_timestamp_reflects_append_time() {
        let dir = tempdir().expect("tempdir");
        let store = CaptureStore::new(dir.path().join("log.json"));
        let before = epoch_seconds();
        let written = store
            .append(CaptureRecord::build_value(Operand::new("x", 1)))
            .unwrap();
        let after = epoch_seconds();
        assert!(written.timestamp() >= before && written.timestamp() <= after);
    }

    #[test]
    fn test_non_array_json_reads_empty() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("log.json");
        fs::write(&path, r#"{"type": "val"}"#).unwrap();
        assert!(CaptureStore::new(&path).load_raw().unwrap().is_empty());
    }

    #[test]
    fn test_invalid_utf8_reads_empty() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("log.json");
        fs::write(&path, [0xff, 0xfe, 0x00]).unwrap();
        assert!(CaptureStore::new(&path).load_raw().unwrap().is_empty());
    }

    #[test]
    fn test_foreign_entries_survive_append() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("log.json");
        fs::write(&path, r#"[{"note": "hand written"}]"#).unwrap();

        let store = CaptureStore::new(&path);
        store
            .append(CaptureRecord::build_value(Operand::new("y", 2)))
            .unwrap();

        let raw = store.load_raw().unwrap();
        assert_eq!(raw.len(), 2);
        assert_eq!(raw[0]["note"], "hand written");
        assert_eq!(store.records().unwrap().len(), 1);
    }

    #[test]
    fn test_write_failure_is_reported() {
        let dir = tempdir().expect("tempdir");
        let store = CaptureStore::new(dir.path().join("missing_dir").join("log.json"));
        let err = store
            .append(CaptureRecord::build_value(Operand::new("z", 3)))
            .unwrap_err();
        assert!(matches!(err, PersistenceError::Write { .. }));
    }

    #[test]
    fn test_directory_path_is_read_error() {
        let dir = tempdir().expect("tempdir");
        let store = CaptureStore::new(dir.path());
        assert!(matches!(
            store.load_raw(),
            Err(PersistenceError::Read { .. })
        ));
    }
}
