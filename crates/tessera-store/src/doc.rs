// SPDX-FileCopyrightText: 2026 Tessera Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Synchronously persisted JSON document.
//!
//! Every mutation is written to disk before the update call returns. This is
//! the storage mode for the ticket ledger and operator control state, where a
//! crash must never lose an acknowledged transition.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tessera_core::TesseraError;

use crate::file;

/// A JSON document whose every update is durable before the caller proceeds.
pub struct SyncDoc<T> {
    path: PathBuf,
    data: Mutex<T>,
}

impl<T> SyncDoc<T>
where
    T: Serialize + DeserializeOwned + Default,
{
    /// Open the document at `path`, tolerating a missing or corrupt file.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let data = file::load_tolerant(&path);
        Self {
            path,
            data: Mutex::new(data),
        }
    }

    /// Read the document under the lock.
    pub fn read<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let guard = self.data.lock().expect("document lock poisoned");
        f(&guard)
    }

    /// Mutate the document and persist it atomically before returning.
    ///
    /// If the write fails the in-memory mutation is kept; the next successful
    /// update persists it.
    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> Result<R, TesseraError> {
        let mut guard = self.data.lock().expect("document lock poisoned");
        let result = f(&mut guard);
        file::write_json_atomic(&self.path, &*guard)?;
        Ok(result)
    }

    /// The on-disk location of this document.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
    struct Counter {
        value: u64,
    }

    #[test]
    fn update_is_visible_after_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("counter.json");

        let doc: SyncDoc<Counter> = SyncDoc::open(&path);
        doc.update(|c| c.value = 61).unwrap();
        drop(doc);

        let reopened: SyncDoc<Counter> = SyncDoc::open(&path);
        assert_eq!(reopened.read(|c| c.value), 61);
    }

    #[test]
    fn update_returns_closure_result() {
        let dir = tempfile::tempdir().unwrap();
        let doc: SyncDoc<Counter> = SyncDoc::open(dir.path().join("counter.json"));

        let next = doc
            .update(|c| {
                c.value += 1;
                c.value
            })
            .unwrap();
        assert_eq!(next, 1);
    }

    #[test]
    fn missing_file_opens_default() {
        let dir = tempfile::tempdir().unwrap();
        let doc: SyncDoc<Counter> = SyncDoc::open(dir.path().join("absent.json"));
        assert_eq!(doc.read(|c| c.value), 0);
    }
}
