//! Append-only operation log.
//!
//! A dedicated writer thread consumes a bounded queue of textual
//! operation records and appends them to the log file, one per line.
//! Producers never block: when the queue is full or the writer is gone,
//! the record is dropped, logged and counted — the in-memory store
//! remains authoritative until the next snapshot.
//!
//! On startup the log is replayed line-by-line through the command
//! pipeline; individual bad lines are skipped.

use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path as FsPath, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{sync_channel, Receiver, RecvTimeoutError, SyncSender, TrySendError};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// Queue capacity. Producers use `try_send`, so this bounds memory,
/// not latency.
const QUEUE_CAPACITY: usize = 8192;

/// How long `stop` waits for the writer to drain before giving up.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Handle to the background AOF writer. Shareable: `append` and `stop`
/// both work through `&self`, so the same handle can sit behind the
/// store's mutation observer and the shutdown path.
///
/// Stopping (or dropping) disconnects the queue; the writer drains
/// what was already enqueued and exits.
pub struct AofWriter {
    tx: Mutex<Option<SyncSender<String>>>,
    handle: Mutex<Option<JoinHandle<()>>>,
    errors: Arc<AtomicU64>,
    path: PathBuf,
}

impl AofWriter {
    /// Open (creating if needed) the log file for append and start the
    /// writer thread.
    pub fn start(path: impl AsRef<FsPath>) -> std::io::Result<AofWriter> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let (tx, rx) = sync_channel(QUEUE_CAPACITY);
        let errors = Arc::new(AtomicU64::new(0));

        let thread_errors = errors.clone();
        let handle = std::thread::Builder::new()
            .name("grove-aof-writer".to_string())
            .spawn(move || write_loop(file, rx, thread_errors))?;

        info!(target: "grove::aof", file = %path.display(), "AOF writer started");
        Ok(AofWriter {
            tx: Mutex::new(Some(tx)),
            handle: Mutex::new(Some(handle)),
            errors,
            path,
        })
    }

    /// Enqueue one operation record. Never blocks; a full queue counts
    /// as a persistence failure.
    pub fn append(&self, record: &str) {
        let tx = self.tx.lock();
        let Some(tx) = tx.as_ref() else { return };
        match tx.try_send(record.to_string()) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                self.errors.fetch_add(1, Ordering::Relaxed);
                warn!(target: "grove::aof", "AOF queue full, dropping record");
            }
            Err(TrySendError::Disconnected(_)) => {
                self.errors.fetch_add(1, Ordering::Relaxed);
                warn!(target: "grove::aof", "AOF writer gone, dropping record");
            }
        }
    }

    /// Number of records lost to queue or I/O failures.
    pub fn error_count(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }

    pub fn path(&self) -> &FsPath {
        &self.path
    }

    /// Disconnect the queue and wait (bounded) for the writer to drain.
    /// Further `append` calls become counted no-ops.
    pub fn stop(&self) {
        self.tx.lock().take();
        if let Some(handle) = self.handle.lock().take() {
            let deadline = Instant::now() + DRAIN_TIMEOUT;
            while !handle.is_finished() && Instant::now() < deadline {
                std::thread::sleep(Duration::from_millis(20));
            }
            if handle.is_finished() {
                let _ = handle.join();
                info!(target: "grove::aof", "AOF writer stopped");
            } else {
                warn!(target: "grove::aof", "AOF writer did not drain in time, detaching");
            }
        }
    }
}

impl Drop for AofWriter {
    fn drop(&mut self) {
        self.tx.lock().take();
        if let Some(handle) = self.handle.lock().take() {
            let _ = handle.join();
        }
    }
}

fn write_loop(file: File, rx: Receiver<String>, errors: Arc<AtomicU64>) {
    let mut writer = BufWriter::new(file);
    loop {
        match rx.recv_timeout(Duration::from_millis(100)) {
            Ok(record) => {
                let outcome = writer
                    .write_all(record.as_bytes())
                    .and_then(|_| writer.write_all(b"\n"))
                    .and_then(|_| writer.flush());
                if let Err(e) = outcome {
                    errors.fetch_add(1, Ordering::Relaxed);
                    error!(target: "grove::aof", error = %e, "AOF write failed");
                }
            }
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    if let Err(e) = writer.flush() {
        error!(target: "grove::aof", error = %e, "final AOF flush failed");
    }
}

/// Replay the log, feeding each non-empty line to `apply`. Returns the
/// number of lines offered. `apply` returns `false` for lines it could
/// not execute; those are logged and skipped.
pub fn replay(
    path: impl AsRef<FsPath>,
    mut apply: impl FnMut(&str) -> bool,
) -> std::io::Result<usize> {
    let path = path.as_ref();
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!(target: "grove::aof", file = %path.display(), "no AOF to replay");
            return Ok(0);
        }
        Err(e) => return Err(e),
    };

    let mut replayed = 0usize;
    let mut skipped = 0usize;
    for line in BufReader::new(file).lines() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        replayed += 1;
        if !apply(trimmed) {
            skipped += 1;
            warn!(target: "grove::aof", line = trimmed, "skipping unreplayable AOF line");
        }
    }
    info!(
        target: "grove::aof",
        file = %path.display(),
        replayed,
        skipped,
        "AOF replay finished"
    );
    Ok(replayed)
}
