// SPDX-FileCopyrightText: 2026 Tessera Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Debounced JSON document with a single background flush task.
//!
//! Updates mutate the in-memory document immediately and mark it dirty; a
//! background task coalesces bursts of updates and writes one snapshot after
//! the debounce window. All disk writes for a document go through that one
//! task, so concurrent updates can never interleave partial files.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tessera_core::TesseraError;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::file;

struct DocShared<T> {
    path: PathBuf,
    data: RwLock<T>,
    dirty: AtomicBool,
    wake: Notify,
}

impl<T: Serialize> DocShared<T> {
    fn flush(&self) -> Result<(), TesseraError> {
        self.dirty.store(false, Ordering::SeqCst);
        let guard = self.data.read().expect("document lock poisoned");
        file::write_json_atomic(&self.path, &*guard)
    }
}

/// A JSON document flushed by a background task after a debounce window.
///
/// Suitable for chatty state like sessions and profiles where losing the last
/// fraction of a second on a crash is acceptable.
pub struct DebouncedDoc<T> {
    shared: Arc<DocShared<T>>,
    cancel: CancellationToken,
    task: tokio::task::JoinHandle<()>,
}

impl<T> DebouncedDoc<T>
where
    T: Serialize + DeserializeOwned + Default + Send + Sync + 'static,
{
    /// Open the document at `path` and spawn its flush task.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn open(path: impl Into<PathBuf>, debounce: Duration) -> Self {
        let path = path.into();
        let data = file::load_tolerant(&path);
        let shared = Arc::new(DocShared {
            path,
            data: RwLock::new(data),
            dirty: AtomicBool::new(false),
            wake: Notify::new(),
        });
        let cancel = CancellationToken::new();

        let task_shared = Arc::clone(&shared);
        let task_cancel = cancel.clone();
        let task = tokio::spawn(async move {
            flush_loop(task_shared, task_cancel, debounce).await;
        });

        Self {
            shared,
            cancel,
            task,
        }
    }

    /// Read the document under the lock.
    pub fn read<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let guard = self.shared.data.read().expect("document lock poisoned");
        f(&guard)
    }

    /// Mutate the document in memory and schedule a flush.
    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let result = {
            let mut guard = self.shared.data.write().expect("document lock poisoned");
            f(&mut guard)
        };
        self.shared.dirty.store(true, Ordering::SeqCst);
        self.shared.wake.notify_one();
        result
    }

    /// Write the current document to disk immediately.
    pub fn flush_now(&self) -> Result<(), TesseraError> {
        self.shared.flush()
    }

    /// Flush any pending state and stop the background task.
    pub async fn shutdown(self) -> Result<(), TesseraError> {
        self.cancel.cancel();
        if self.task.await.is_err() {
            error!(path = %self.shared.path.display(), "flush task panicked");
        }
        if self.shared.dirty.load(Ordering::SeqCst) {
            self.shared.flush()?;
        }
        Ok(())
    }
}

async fn flush_loop<T: Serialize>(
    shared: Arc<DocShared<T>>,
    cancel: CancellationToken,
    debounce: Duration,
) {
    loop {
        tokio::select! {
            _ = shared.wake.notified() => {}
            _ = cancel.cancelled() => break,
        }

        // Coalesce the burst before writing.
        tokio::select! {
            _ = tokio::time::sleep(debounce) => {}
            _ = cancel.cancelled() => break,
        }

        if shared.dirty.load(Ordering::SeqCst) {
            if let Err(e) = shared.flush() {
                error!(path = %shared.path.display(), error = %e, "flush failed");
            } else {
                debug!(path = %shared.path.display(), "flushed");
            }
        }
    }

    // Final flush on shutdown.
    if shared.dirty.load(Ordering::SeqCst) {
        if let Err(e) = shared.flush() {
            error!(path = %shared.path.display(), error = %e, "final flush failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::collections::BTreeMap;

    #[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
    struct Table {
        rows: BTreeMap<String, String>,
    }

    #[tokio::test]
    async fn updates_flush_after_debounce() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("table.json");

        let doc: DebouncedDoc<Table> = DebouncedDoc::open(&path, Duration::from_millis(10));
        doc.update(|t| {
            t.rows.insert("a".into(), "1".into());
        });
        tokio::time::sleep(Duration::from_millis(100)).await;

        let on_disk: Table = file::load_tolerant(&path);
        assert_eq!(on_disk.rows.get("a"), Some(&"1".to_string()));
        doc.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn burst_of_updates_lands_as_one_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("table.json");

        let doc: DebouncedDoc<Table> = DebouncedDoc::open(&path, Duration::from_millis(50));
        for i in 0..20 {
            doc.update(|t| {
                t.rows.insert(format!("k{i}"), i.to_string());
            });
        }
        tokio::time::sleep(Duration::from_millis(200)).await;

        let on_disk: Table = file::load_tolerant(&path);
        assert_eq!(on_disk.rows.len(), 20);
        doc.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn shutdown_flushes_pending_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("table.json");

        let doc: DebouncedDoc<Table> = DebouncedDoc::open(&path, Duration::from_secs(60));
        doc.update(|t| {
            t.rows.insert("pending".into(), "yes".into());
        });
        // The debounce window has not elapsed; shutdown must still persist.
        doc.shutdown().await.unwrap();

        let on_disk: Table = file::load_tolerant(&path);
        assert_eq!(on_disk.rows.get("pending"), Some(&"yes".to_string()));
    }

    #[tokio::test]
    async fn reopen_sees_flushed_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("table.json");

        let doc: DebouncedDoc<Table> = DebouncedDoc::open(&path, Duration::from_millis(10));
        doc.update(|t| {
            t.rows.insert("a".into(), "1".into());
        });
        doc.shutdown().await.unwrap();

        let reopened: DebouncedDoc<Table> = DebouncedDoc::open(&path, Duration::from_millis(10));
        assert_eq!(reopened.read(|t| t.rows.len()), 1);
        reopened.shutdown().await.unwrap();
    }
}
