//! Serialized execution context for all core logic.
//!
//! Every bus delivery, and therefore every state-manager transition, runs
//! as a [`Work`] item on one worker.  Producers only hand work over; they
//! never run it themselves.
//!
//! Two implementations:
//!
//! - [`WorkQueue`]: a dedicated thread draining an `embassy_sync`
//!   channel.  Used by the device/host binary.
//! - [`ManualWorker`]: queues work until the owner steps it.  Used by
//!   tests and deterministic simulations.

use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::collections::VecDeque;
use std::sync::Arc;
use std::thread::JoinHandle;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use futures_lite::future::block_on;
use log::info;
use parking_lot::Mutex;

use crate::error::WorkerError;

/// A unit of deferred work.
pub type Work = Box<dyn FnOnce() + Send + 'static>;

/// Something that runs [`Work`] items one at a time, in submission order.
pub trait Worker: Send + Sync {
    /// Queue `work` to run later.  Never runs it inline.
    fn run_once(&self, work: Work) -> Result<(), WorkerError>;
}

// ═══════════════════════════════════════════════════════════════
//  Thread-backed work queue
// ═══════════════════════════════════════════════════════════════

/// Work queue with room for `N` pending items, drained by its own thread.
pub struct WorkQueue<const N: usize> {
    queue: Channel<CriticalSectionRawMutex, Work, N>,
    running: AtomicBool,
}

impl<const N: usize> WorkQueue<N> {
    /// Start the worker thread.
    pub fn spawn(name: &str) -> std::io::Result<(Arc<Self>, JoinHandle<()>)> {
        let queue = Arc::new(Self {
            queue: Channel::new(),
            running: AtomicBool::new(true),
        });
        let worker = Arc::clone(&queue);
        let handle = std::thread::Builder::new()
            .name(name.into())
            .spawn(move || worker.run())?;
        Ok((queue, handle))
    }

    fn run(&self) {
        info!("Worker: started");
        while self.running.load(Ordering::Acquire) {
            let work = block_on(self.queue.receive());
            work();
        }
        info!("Worker: stopped");
    }

    /// Ask the thread to exit after the item it is running.  Work still
    /// queued is discarded.
    pub fn request_stop(&self) {
        self.running.store(false, Ordering::Release);
        // Wake the thread if it is parked on an empty queue.
        let _ = self.queue.try_send(Box::new(|| {}));
    }
}

impl<const N: usize> Worker for WorkQueue<N> {
    fn run_once(&self, work: Work) -> Result<(), WorkerError> {
        if !self.running.load(Ordering::Acquire) {
            return Err(WorkerError::Stopped);
        }
        self.queue.try_send(work).map_err(|_| WorkerError::QueueFull)
    }
}

// ═══════════════════════════════════════════════════════════════
//  Manually stepped worker
// ═══════════════════════════════════════════════════════════════

/// Queues work until [`step`](Self::step) or
/// [`run_until_idle`](Self::run_until_idle) is called on the owning thread.
pub struct ManualWorker {
    queue: Mutex<VecDeque<Work>>,
    capacity: AtomicUsize,
}

impl ManualWorker {
    pub fn new() -> Self {
        Self::with_capacity(64)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            capacity: AtomicUsize::new(capacity),
        }
    }

    pub fn set_capacity(&self, capacity: usize) {
        self.capacity.store(capacity, Ordering::Relaxed);
    }

    /// Number of queued items.
    pub fn pending(&self) -> usize {
        self.queue.lock().len()
    }

    /// Run the oldest queued item.  Returns `false` if there was none.
    pub fn step(&self) -> bool {
        // Popped under the lock, run without it: work may queue more work.
        let work = self.queue.lock().pop_front();
        match work {
            Some(work) => {
                work();
                true
            }
            None => false,
        }
    }

    /// Run items until the queue is empty, including items queued by the
    /// items themselves.  Returns how many ran.
    pub fn run_until_idle(&self) -> usize {
        let mut ran = 0;
        while self.step() {
            ran += 1;
        }
        ran
    }
}

impl Default for ManualWorker {
    fn default() -> Self {
        Self::new()
    }
}

impl Worker for ManualWorker {
    fn run_once(&self, work: Work) -> Result<(), WorkerError> {
        let mut queue = self.queue.lock();
        if queue.len() >= self.capacity.load(Ordering::Relaxed) {
            return Err(WorkerError::QueueFull);
        }
        queue.push_back(work);
        Ok(())
    }
}
