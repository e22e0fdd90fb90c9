//! Single-threaded task queue serializing all agent state mutation.
//!
//! Public entry points never touch shared state directly; they enqueue
//! closures here and the worker drains them in FIFO order. This removes data
//! races between directive ingress, focus changes, and media callbacks, and
//! keeps observer notification in transition order.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Sender};
use std::sync::Mutex;
use std::thread::{self, JoinHandle, ThreadId};

use tracing::{debug, warn};

use crate::error::{Result, SynthError};

type Task = Box<dyn FnOnce() + Send + 'static>;

/// One worker thread consuming a FIFO queue of tasks.
///
/// After [`SerialExecutor::shutdown`] sets the stop flag, new submissions are
/// dropped while tasks already queued are drained before the worker exits.
pub struct SerialExecutor {
    tx: Mutex<Option<Sender<Task>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    worker_id: ThreadId,
    stopping: AtomicBool,
}

impl SerialExecutor {
    /// Spawn the worker thread.
    ///
    /// # Errors
    ///
    /// Returns an error if the OS refuses to spawn the thread.
    pub fn new() -> Result<Self> {
        let (tx, rx) = mpsc::channel::<Task>();
        let handle = thread::Builder::new()
            .name("guth-executor".to_owned())
            .spawn(move || {
                while let Ok(task) = rx.recv() {
                    task();
                }
            })
            .map_err(|e| SynthError::Executor(format!("failed to spawn executor worker: {e}")))?;
        let worker_id = handle.thread().id();
        Ok(Self {
            tx: Mutex::new(Some(tx)),
            worker: Mutex::new(Some(handle)),
            worker_id,
            stopping: AtomicBool::new(false),
        })
    }

    /// True if the calling thread is the executor worker.
    pub fn on_worker_thread(&self) -> bool {
        thread::current().id() == self.worker_id
    }

    /// True once shutdown has begun.
    pub fn is_stopping(&self) -> bool {
        self.stopping.load(Ordering::Acquire)
    }

    /// Enqueue a task. Returns false (and drops the task) once shutdown has
    /// begun.
    pub fn submit<F>(&self, task: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        if self.is_stopping() {
            debug!("task dropped: executor is stopping");
            return false;
        }
        let guard = self.tx.lock().unwrap_or_else(|e| e.into_inner());
        match guard.as_ref() {
            Some(tx) => tx.send(Box::new(task)).is_ok(),
            None => false,
        }
    }

    /// Enqueue a task and block until it has run.
    ///
    /// When called from the worker thread itself the task runs inline (it is
    /// already serialized with everything else), since waiting there would
    /// deadlock the queue.
    pub fn submit_and_wait<F>(&self, task: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        if self.on_worker_thread() {
            task();
            return true;
        }
        let (done_tx, done_rx) = mpsc::channel::<()>();
        let submitted = self.submit(move || {
            task();
            let _ = done_tx.send(());
        });
        if !submitted {
            return false;
        }
        done_rx.recv().is_ok()
    }

    /// Stop accepting tasks, drain everything already queued, and join the
    /// worker. Idempotent.
    pub fn shutdown(&self) {
        if self.stopping.swap(true, Ordering::AcqRel) {
            return;
        }
        // Dropping the sender lets the worker finish the queue and exit.
        drop(self.tx.lock().unwrap_or_else(|e| e.into_inner()).take());
        if self.on_worker_thread() {
            warn!("executor shutdown requested from its own worker; skipping join");
            return;
        }
        let handle = self.worker.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                warn!("executor worker panicked while draining");
            }
        }
    }
}

impl Drop for SerialExecutor {
    fn drop(&mut self) {
        self.shutdown();
    }
}
