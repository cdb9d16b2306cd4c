//! Fixed-size worker pool running marshaling jobs off the caller's thread.
//!
//! Every worker owns a [`Marshaler`] over the shared registry. Value
//! handles are only meaningful to the worker whose heap created them, so
//! jobs hand back native data (arrays, records), not handles.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, bounded, unbounded};
use parking_lot::Mutex;
use sysbind_registry::TypeSource;
use thiserror::Error;

use crate::config::MarshalConfig;
use crate::marshaler::Marshaler;

type Job = Box<dyn FnOnce(&mut Marshaler) + Send + 'static>;

/// Errors from submitting or awaiting jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// The pool has been shut down.
    #[error("worker pool is shut down")]
    PoolClosed,

    /// The job never produced a result (it panicked).
    #[error("job finished without a result")]
    JobLost,
}

/// Pending result of a submitted job.
///
/// Dropping the handle does not cancel the job; its result is discarded.
#[derive(Debug)]
pub struct JobHandle<T> {
    result: Receiver<T>,
}

impl<T> JobHandle<T> {
    /// Block until the job has run.
    pub fn wait(self) -> Result<T, DispatchError> {
        self.result.recv().map_err(|_| DispatchError::JobLost)
    }

    /// The result, if the job has already finished.
    pub fn try_result(&self) -> Option<T> {
        self.result.try_recv().ok()
    }
}

/// A fixed number of threads draining one job queue.
///
/// # Example
///
/// ```
/// use sysbind::Context;
/// use sysbind_core::{HostSequence, HostValue, scalars};
///
/// let mut ctx = Context::new();
/// ctx.seal().unwrap();
/// let mut pool = ctx.create_pool(2).unwrap();
///
/// let job = pool
///     .submit(|m| {
///         let input = HostValue::from(HostSequence::from_iter([7, 8]));
///         m.sequence_to_array(scalars::UINT8, &input, None).map(|a| a.len())
///     })
///     .unwrap();
/// assert_eq!(job.wait().unwrap(), Ok(2));
/// pool.shutdown();
/// ```
#[derive(Debug)]
pub struct WorkerPool {
    jobs: Option<Sender<Job>>,
    threads: Vec<JoinHandle<()>>,
    /// Ids of running workers.
    active: Arc<Mutex<Vec<usize>>>,
}

impl WorkerPool {
    /// Start `workers` threads (at least one).
    ///
    /// With a [`LiveRegistry`](sysbind_registry::LiveRegistry), types
    /// registered after this call are visible to jobs submitted later.
    pub fn new(registry: Arc<dyn TypeSource>, config: MarshalConfig, workers: usize) -> Self {
        let (sender, receiver) = unbounded::<Job>();
        let active = Arc::new(Mutex::new(Vec::new()));

        let threads = (0..workers.max(1))
            .map(|id| {
                active.lock().push(id);
                let registration = Registration {
                    id,
                    active: Arc::clone(&active),
                };
                let marshaler = Marshaler::new(Arc::clone(&registry), config.clone());
                let jobs = receiver.clone();
                thread::spawn(move || run_worker(registration, jobs, marshaler))
            })
            .collect();

        Self {
            jobs: Some(sender),
            threads,
            active,
        }
    }

    /// Queue `job` for the next free worker.
    pub fn submit<F, T>(&self, job: F) -> Result<JobHandle<T>, DispatchError>
    where
        F: FnOnce(&mut Marshaler) -> T + Send + 'static,
        T: Send + 'static,
    {
        let jobs = self.jobs.as_ref().ok_or(DispatchError::PoolClosed)?;
        let (tx, rx) = bounded(1);
        let job: Job = Box::new(move |marshaler| {
            if tx.send(job(marshaler)).is_err() {
                log::trace!("job result discarded: handle dropped");
            }
        });
        jobs.send(job).map_err(|_| DispatchError::PoolClosed)?;
        Ok(JobHandle { result: rx })
    }

    /// Number of threads the pool started.
    pub fn size(&self) -> usize {
        self.threads.len()
    }

    /// Number of workers still running.
    pub fn active_workers(&self) -> usize {
        self.active.lock().len()
    }

    pub fn is_closed(&self) -> bool {
        self.jobs.is_none()
    }

    /// Stop accepting jobs, let the workers drain the queue, and join them.
    ///
    /// Calling `shutdown()` more than once is a no-op.
    pub fn shutdown(&mut self) {
        if self.jobs.take().is_none() {
            return;
        }
        for handle in self.threads.drain(..) {
            if handle.join().is_err() {
                log::warn!("worker thread panicked");
            }
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Removes a worker from the active list when its thread exits, panics
/// included.
struct Registration {
    id: usize,
    active: Arc<Mutex<Vec<usize>>>,
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.active.lock().retain(|id| *id != self.id);
    }
}

fn run_worker(registration: Registration, jobs: Receiver<Job>, mut marshaler: Marshaler) {
    let id = registration.id;
    for job in jobs.iter() {
        log::trace!("worker {id}: running job");
        job(&mut marshaler);
    }
    log::trace!(
        "worker {id}: queue closed, dropping {} live values",
        marshaler.heap().len()
    );
}
