// SPDX-FileCopyrightText: 2026 Tessera Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Atomic JSON file IO with day-stamped backups and tolerant loads.
//!
//! Every write goes to a temp file in the same directory followed by a
//! rename, so a crash mid-write never leaves a truncated document behind.
//! Before the first write of each calendar day the previous document is
//! copied to a `.bak` sibling.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tessera_core::TesseraError;
use tracing::warn;

/// Path of the backup sibling for a document path.
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".bak");
    PathBuf::from(name)
}

/// Serialize `value` as pretty JSON and atomically replace the file at `path`.
///
/// Refreshes the `.bak` sibling first when the existing document has not been
/// backed up today.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), TesseraError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(TesseraError::storage)?;
        }
    }

    refresh_daily_backup(path)?;

    let json = serde_json::to_vec_pretty(value).map_err(TesseraError::storage)?;

    let tmp = path.with_extension("tmp");
    fs::write(&tmp, &json).map_err(TesseraError::storage)?;
    fs::rename(&tmp, path).map_err(TesseraError::storage)?;
    Ok(())
}

/// Copy the current document to its `.bak` sibling if the backup is missing
/// or was last refreshed on an earlier calendar day.
fn refresh_daily_backup(path: &Path) -> Result<(), TesseraError> {
    if !path.exists() {
        return Ok(());
    }

    let bak = backup_path(path);
    let needs_backup = match fs::metadata(&bak).and_then(|m| m.modified()) {
        Ok(mtime) => {
            let bak_day = DateTime::<Local>::from(mtime).date_naive();
            bak_day < Local::now().date_naive()
        }
        Err(_) => true,
    };

    if needs_backup {
        fs::copy(path, &bak).map_err(TesseraError::storage)?;
    }
    Ok(())
}

/// Load a JSON document, tolerating absence and corruption.
///
/// Resolution order: the main file, then the `.bak` sibling, then
/// `T::default()`. A corrupt main file is logged and left in place; the next
/// write replaces it.
pub fn load_tolerant<T: DeserializeOwned + Default>(path: &Path) -> T {
    match try_load(path) {
        Ok(Some(value)) => return value,
        Ok(None) => return T::default(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "document unreadable, trying backup");
        }
    }

    let bak = backup_path(path);
    match try_load(&bak) {
        Ok(Some(value)) => value,
        Ok(None) => T::default(),
        Err(e) => {
            warn!(path = %bak.display(), error = %e, "backup unreadable, starting empty");
            T::default()
        }
    }
}

/// Read and parse a JSON document. `Ok(None)` means the file does not exist.
fn try_load<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, TesseraError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(TesseraError::storage(e)),
    };
    let value = serde_json::from_slice(&bytes).map_err(TesseraError::storage)?;
    Ok(Some(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    type Doc = BTreeMap<String, u64>;

    #[test]
    fn write_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.json");

        let mut doc = Doc::new();
        doc.insert("counter".into(), 61);
        write_json_atomic(&path, &doc).unwrap();

        let loaded: Doc = load_tolerant(&path);
        assert_eq!(loaded, doc);
    }

    #[test]
    fn missing_file_loads_default() {
        let dir = tempfile::tempdir().unwrap();
        let loaded: Doc = load_tolerant(&dir.path().join("absent.json"));
        assert!(loaded.is_empty());
    }

    #[test]
    fn corrupt_file_falls_back_to_backup() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.json");

        let mut doc = Doc::new();
        doc.insert("counter".into(), 61);
        write_json_atomic(&path, &doc).unwrap();

        // Second write on the same day does not refresh the backup, so the
        // backup still holds the first version.
        let mut doc2 = doc.clone();
        doc2.insert("extra".into(), 1);
        write_json_atomic(&path, &doc2).unwrap();

        fs::write(&path, b"{ not json").unwrap();

        let loaded: Doc = load_tolerant(&path);
        assert_eq!(loaded.get("counter"), Some(&61));
    }

    #[test]
    fn corrupt_file_without_backup_loads_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.json");
        fs::write(&path, b"garbage").unwrap();

        let loaded: Doc = load_tolerant(&path);
        assert!(loaded.is_empty());
    }

    #[test]
    fn first_write_of_day_creates_backup() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.json");

        let mut doc = Doc::new();
        doc.insert("a".into(), 1);
        write_json_atomic(&path, &doc).unwrap();
        // No document existed yet, so no backup.
        assert!(!backup_path(&path).exists());

        doc.insert("b".into(), 2);
        write_json_atomic(&path, &doc).unwrap();
        // The pre-write document is preserved.
        assert!(backup_path(&path).exists());
        let bak: Doc = load_tolerant(&backup_path(&path));
        assert_eq!(bak.len(), 1);
    }

    #[test]
    fn no_temp_file_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.json");
        write_json_atomic(&path, &Doc::new()).unwrap();
        assert!(!path.with_extension("tmp").exists());
    }
}
