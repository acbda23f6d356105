//! Asynchronous write pipeline.
//!
//! A [`FlushQueue`] buffers entries from any number of producer threads and
//! hands them to a single background thread that owns the [`RecordSink`].
//! The worker swaps the pending buffer for an empty one, writes the batch,
//! flushes the sink, and then sleeps for at most the poll interval.
//!
//! [`FlushQueue::flush`] is a barrier: every entry whose `enqueue` returned
//! before the call is written and flushed when it returns. Each call takes a
//! ticket; the worker snapshots the latest ticket *before* swapping the
//! buffer and reports it complete after the batch is written, so a
//! completed ticket implies that every earlier enqueue has been drained.
//!
//! A failed batch is logged and dropped; the worker keeps running.

use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use tracing::{debug, error, warn};

use crate::codec;
use crate::error::{LogError, Result};
use crate::traits::RecordSink;
use crate::types::LogEntry;

/// How long the worker sleeps between drain cycles when nothing wakes it.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Counters describing what the worker has done so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    /// Entries handed to the sink.
    pub written_entries: u64,
    /// Batches that hit a write or flush error.
    pub failed_batches: u64,
    /// Entries discarded because their batch failed.
    pub dropped_entries: u64,
}

struct Pending {
    entries: Vec<LogEntry>,
    closed: bool,
    /// Set once the worker has exited, normally or by unwinding.
    stopped: bool,
}

struct Control {
    quit: bool,
    running: bool,
    requested: u64,
    completed: u64,
}

#[derive(Default)]
struct Counters {
    written_entries: AtomicU64,
    failed_batches: AtomicU64,
    dropped_entries: AtomicU64,
}

struct Shared {
    name: String,
    pending: Mutex<Pending>,
    control: Mutex<Control>,
    /// Wakes the worker early.
    wake: Condvar,
    /// Signals flush waiters that a drain cycle finished.
    drained: Condvar,
    counters: Counters,
}

/// Buffered writer driving a [`RecordSink`] from a background thread.
pub struct FlushQueue<S: RecordSink> {
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
    _sink: PhantomData<fn(S)>,
}

impl<S: RecordSink> FlushQueue<S> {
    /// Starts a worker thread that owns `sink`.
    ///
    /// # Errors
    ///
    /// Returns an error if the thread cannot be spawned.
    pub fn spawn(name: impl Into<String>, sink: S) -> Result<Self> {
        Self::with_poll_interval(name, sink, DEFAULT_POLL_INTERVAL)
    }

    /// Starts a worker thread with a custom poll interval.
    ///
    /// # Errors
    ///
    /// Returns an error if the thread cannot be spawned.
    pub fn with_poll_interval(name: impl Into<String>, sink: S, poll: Duration) -> Result<Self> {
        let name = name.into();
        let shared = Arc::new(Shared {
            name: name.clone(),
            pending: Mutex::new(Pending {
                entries: Vec::new(),
                closed: false,
                stopped: false,
            }),
            control: Mutex::new(Control {
                quit: false,
                running: true,
                requested: 0,
                completed: 0,
            }),
            wake: Condvar::new(),
            drained: Condvar::new(),
            counters: Counters::default(),
        });

        let worker_shared = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name(format!("claw-logstore-{name}"))
            .spawn(move || run_worker(&worker_shared, sink, poll))?;

        debug!(queue = %name, "log writer started");

        Ok(Self {
            shared,
            worker: Mutex::new(Some(handle)),
            _sink: PhantomData,
        })
    }

    /// Queues an entry for the worker. Never waits on I/O.
    ///
    /// # Errors
    ///
    /// Returns [`LogError::Closed`] after [`shutdown`](Self::shutdown) and
    /// [`LogError::WorkerStopped`] if the worker thread has died.
    pub fn enqueue(&self, entry: LogEntry) -> Result<()> {
        let mut pending = self.shared.pending.lock();
        if pending.closed {
            return Err(LogError::Closed);
        }
        if pending.stopped {
            return Err(LogError::WorkerStopped);
        }
        pending.entries.push(entry);
        Ok(())
    }

    /// Blocks until every entry queued before this call has been written.
    ///
    /// # Errors
    ///
    /// Returns [`LogError::Closed`] after shutdown and
    /// [`LogError::WorkerStopped`] if the worker thread has died.
    pub fn flush(&self) -> Result<()> {
        if self.shared.pending.lock().closed {
            return Err(LogError::Closed);
        }

        let mut control = self.shared.control.lock();
        if !control.running {
            return Err(LogError::WorkerStopped);
        }
        control.requested += 1;
        let ticket = control.requested;
        self.shared.wake.notify_one();

        while control.completed < ticket {
            if !control.running {
                return Err(LogError::WorkerStopped);
            }
            self.shared.drained.wait(&mut control);
        }
        Ok(())
    }

    /// Stops the worker after it has written everything still queued.
    ///
    /// Later calls return immediately.
    ///
    /// # Errors
    ///
    /// Returns [`LogError::WorkerStopped`] if the worker thread panicked.
    pub fn shutdown(&self) -> Result<()> {
        self.shared.pending.lock().closed = true;
        {
            let mut control = self.shared.control.lock();
            control.quit = true;
            self.shared.wake.notify_one();
        }

        let Some(handle) = self.worker.lock().take() else {
            return Ok(());
        };
        handle.join().map_err(|_| LogError::WorkerStopped)?;
        debug!(queue = %self.shared.name, "log writer stopped");
        Ok(())
    }

    /// Returns true while the worker thread is alive.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.shared.control.lock().running
    }

    /// Returns true once [`shutdown`](Self::shutdown) has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.shared.pending.lock().closed
    }

    /// Number of entries waiting for the next drain cycle.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.shared.pending.lock().entries.len()
    }

    /// Returns a snapshot of the worker counters.
    #[must_use]
    pub fn stats(&self) -> QueueStats {
        let counters = &self.shared.counters;
        QueueStats {
            written_entries: counters.written_entries.load(Ordering::Relaxed),
            failed_batches: counters.failed_batches.load(Ordering::Relaxed),
            dropped_entries: counters.dropped_entries.load(Ordering::Relaxed),
        }
    }
}

impl<S: RecordSink> Drop for FlushQueue<S> {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            warn!(queue = %self.shared.name, error = %e, "log writer did not stop cleanly");
        }
    }
}

/// Marks the worker as gone, including when it unwinds.
struct RunningGuard<'a>(&'a Shared);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        let orphaned = {
            let mut pending = self.0.pending.lock();
            pending.stopped = true;
            std::mem::take(&mut pending.entries).len() as u64
        };
        if orphaned > 0 {
            self.0
                .counters
                .dropped_entries
                .fetch_add(orphaned, Ordering::Relaxed);
            error!(
                queue = %self.0.name,
                dropped = orphaned,
                "log writer exited with entries still queued"
            );
        }

        let mut control = self.0.control.lock();
        control.running = false;
        self.0.drained.notify_all();
    }
}

fn run_worker<S: RecordSink>(shared: &Shared, mut sink: S, poll: Duration) {
    let _guard = RunningGuard(shared);

    loop {
        let (ticket, quit) = {
            let control = shared.control.lock();
            (control.requested, control.quit)
        };

        let batch = std::mem::take(&mut shared.pending.lock().entries);
        if !batch.is_empty() {
            write_batch(shared, &mut sink, &batch);
        }

        let mut control = shared.control.lock();
        control.completed = control.completed.max(ticket);
        shared.drained.notify_all();

        if quit {
            break;
        }
        if control.requested == ticket && !control.quit {
            shared.wake.wait_for(&mut control, poll);
        }
    }

    if let Err(e) = sink.close() {
        error!(queue = %shared.name, error = %e, "failed to close log file");
    }

    // Nothing can be queued once closed, so every ticket is satisfied.
    let mut control = shared.control.lock();
    control.completed = control.requested;
}

fn write_batch<S: RecordSink>(shared: &Shared, sink: &mut S, batch: &[LogEntry]) {
    let mut written = 0u64;
    let result = write_entries(sink, batch, &mut written);
    shared
        .counters
        .written_entries
        .fetch_add(written, Ordering::Relaxed);

    if let Err(e) = result {
        let dropped = batch.len() as u64 - written;
        shared.counters.failed_batches.fetch_add(1, Ordering::Relaxed);
        shared
            .counters
            .dropped_entries
            .fetch_add(dropped, Ordering::Relaxed);
        error!(
            queue = %shared.name,
            error = %e,
            written,
            dropped,
            "failed to write log batch"
        );
    }
}

fn write_entries<S: RecordSink>(sink: &mut S, batch: &[LogEntry], written: &mut u64) -> Result<()> {
    for entry in batch {
        let record = codec::encode(entry)?;
        sink.append(&record)?;
        *written += 1;
    }
    sink.flush()
}
