//! A basic thread pool for background analysis work.
//!
//! Adapted from the rust-analyzer lineage thread pool: a bounded crossbeam
//! channel of boxed jobs drained by a fixed set of worker threads. Handles
//! are joined on drop.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crossbeam::channel::{Receiver, Sender};

pub struct Pool {
    // The worker threads exit once the channel closes;
    // keep `job_sender` above `_handles` so the channel is
    // closed before the worker threads are joined.
    job_sender: Sender<Job>,
    _handles: Vec<jod_thread::JoinHandle>,
    extant_tasks: Arc<AtomicUsize>,
}

struct Job {
    f: Box<dyn FnOnce() + Send + 'static>,
}

impl Pool {
    pub fn new(threads: NonZeroUsize) -> Pool {
        // Override OS defaults to avoid stack overflows on platforms with
        // low stack size defaults.
        const STACK_SIZE: usize = 2 * 1024 * 1024;

        let threads = usize::from(threads);
        let (job_sender, job_receiver) = crossbeam::channel::bounded(std::cmp::min(threads * 2, 4));
        let extant_tasks = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::with_capacity(threads);
        for i in 0..threads {
            let handle = jod_thread::Builder::new()
                .stack_size(STACK_SIZE)
                .name(format!("dunlin:worker:{i}"))
                .spawn({
                    let extant_tasks = Arc::clone(&extant_tasks);
                    let job_receiver: Receiver<Job> = job_receiver.clone();
                    move || {
                        for job in job_receiver {
                            extant_tasks.fetch_add(1, Ordering::SeqCst);
                            (job.f)();
                            extant_tasks.fetch_sub(1, Ordering::SeqCst);
                        }
                    }
                })
                .expect("failed to spawn thread");

            handles.push(handle);
        }

        Pool {
            job_sender,
            _handles: handles,
            extant_tasks,
        }
    }

    pub fn spawn<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let job = Job { f: Box::new(f) };
        self.job_sender.send(job).unwrap();
    }

    pub fn len(&self) -> usize {
        self.extant_tasks.load(Ordering::SeqCst)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for Pool {
    fn default() -> Self {
        let threads = std::thread::available_parallelism()
            .unwrap_or_else(|_| NonZeroUsize::new(4).unwrap());
        Self::new(threads)
    }
}
