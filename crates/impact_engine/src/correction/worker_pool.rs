//! Fixed-size pool running correction jobs off the tick thread

use std::panic::{self, AssertUnwindSafe};
use std::thread;

use crossbeam::channel::{unbounded, Receiver, Sender};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Thread pool for correction jobs
///
/// Jobs are fire-and-forget; a job reports back through whatever channel it
/// captured. A panicking job does not take its worker thread down with it.
pub struct WorkerPool {
    workers: Vec<Worker>,
    sender: Option<Sender<Job>>,
}

impl WorkerPool {
    /// Spawn `size` workers (at least one)
    pub fn new(size: usize) -> Result<Self, String> {
        let (sender, receiver) = unbounded::<Job>();

        let workers = (0..size.max(1))
            .map(|id| Worker::spawn(id, receiver.clone()))
            .collect::<Result<Vec<_>, _>>()?;

        log::debug!("Correction worker pool started with {} threads", workers.len());
        Ok(Self {
            workers,
            sender: Some(sender),
        })
    }

    /// Pool sized to the machine's available parallelism
    pub fn with_default_size() -> Result<Self, String> {
        let size = thread::available_parallelism().map_or(2, |n| n.get().min(4));
        Self::new(size)
    }

    /// Number of worker threads
    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Queue a job without blocking; `false` if the pool is shutting down
    pub fn execute<F>(&self, job: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        match &self.sender {
            Some(sender) => sender.send(Box::new(job)).is_ok(),
            None => false,
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // Closing the channel ends every worker loop once the queue drains
        self.sender.take();

        for worker in self.workers.drain(..) {
            if worker.thread.join().is_err() {
                log::warn!("Correction worker {} exited abnormally", worker.id);
            }
        }
    }
}

struct Worker {
    id: usize,
    thread: thread::JoinHandle<()>,
}

impl Worker {
    fn spawn(id: usize, receiver: Receiver<Job>) -> Result<Self, String> {
        let thread = thread::Builder::new()
            .name(format!("impact-correction-{id}"))
            .spawn(move || {
                while let Ok(job) = receiver.recv() {
                    if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
                        log::warn!("Correction job panicked on worker {id}");
                    }
                }
            })
            .map_err(|e| format!("Failed to spawn correction worker {id}: {e}"))?;

        Ok(Self { id, thread })
    }
}
