//! Persistence layer: JSON snapshot management and the write-behind flusher.
//!
//! The database file is a single JSON object. On startup [`load`] restores
//! it (a missing or empty file starts an empty database; a malformed one
//! refuses to start). At runtime a [`Flusher`] thread wakes once per flush
//! interval and, when the store is dirty, snapshots the root under the lock
//! and writes it outside the lock: temporary file in the same directory,
//! fsync, atomic rename over the target. A failed write leaves the store
//! dirty so the next tick retries while queries keep succeeding in memory.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, error};

use crate::datum::{Datum, Mapping};
use crate::error::{ApocryphaError, Result};
use crate::store::Store;

/// Reads the database file back into a root mapping.
pub fn load(path: &Path) -> Result<Mapping> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Mapping::new()),
        Err(e) => {
            return Err(ApocryphaError::Persistence(format!(
                "could not read '{}': {e}",
                path.display()
            )))
        }
    };
    if text.trim().is_empty() {
        return Ok(Mapping::new());
    }
    match serde_json::from_str::<Datum>(&text) {
        Ok(Datum::Map(root)) => Ok(root),
        Ok(other) => Err(ApocryphaError::Persistence(format!(
            "database file must contain a JSON object, found a {}",
            other.kind()
        ))),
        Err(e) => Err(ApocryphaError::Persistence(format!(
            "could not parse database on disk: {e}"
        ))),
    }
}

/// Writes the snapshot to `<path>.tmp`, fsyncs, and renames it over `path`.
pub fn write_snapshot(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut temporary = path.as_os_str().to_owned();
    temporary.push(".tmp");
    let temporary = PathBuf::from(temporary);
    let mut file = fs::File::create(&temporary)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    fs::rename(&temporary, path)?;
    Ok(())
}

/// One flush pass: snapshot if dirty, then write. Also used for the final
/// pass on shutdown.
pub fn flush(store: &Store, path: &Path) {
    match store.snapshot_if_dirty() {
        Ok(Some(bytes)) => match write_snapshot(path, &bytes) {
            Ok(()) => debug!(bytes = bytes.len(), path = %path.display(), "database flushed"),
            Err(write_error) => {
                error!(error = %write_error, path = %path.display(), "snapshot write failed");
                // the next tick retries
                if let Err(lock_error) = store.mark_dirty() {
                    error!(error = %lock_error, "could not re-mark the store dirty");
                }
            }
        },
        Ok(None) => (),
        Err(snapshot_error) => error!(error = %snapshot_error, "snapshot failed"),
    }
}

/// Background thread flushing the store at most once per interval, stopped
/// cooperatively through a shared flag.
pub struct Flusher {
    running: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl Flusher {
    pub fn spawn(store: Arc<Store>, path: PathBuf, interval: Duration) -> Flusher {
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);
        let join = thread::spawn(move || {
            while flag.load(Ordering::Relaxed) {
                thread::sleep(interval);
                flush(&store, &path);
            }
        });
        Flusher {
            running,
            join: Some(join),
        }
    }

    /// Stops the thread and waits for the tick in progress to finish.
    pub fn stop(mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}
