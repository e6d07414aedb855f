//! Background job queues
//!
//! A pool is a bounded crossbeam channel of boxed closures drained by a fixed
//! number of threads. Submitting never blocks: a full queue drops the job.
//! A pool with zero threads runs every job inline on the caller, which keeps
//! tests and headless runs deterministic.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};

use crate::error::SetupError;

pub type Job = Box<dyn FnOnce() + Send + 'static>;

pub struct WorkerPool {
    name: String,
    sender: Option<Sender<Job>>,
    handles: Vec<JoinHandle<()>>,
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("name", &self.name)
            .field("threads", &self.handles.len())
            .field("queued", &self.queued())
            .finish()
    }
}

impl WorkerPool {
    /// Spawn `threads` workers sharing a queue of `capacity` jobs
    pub fn new(name: &str, threads: usize, capacity: usize) -> Result<Self, SetupError> {
        if threads == 0 {
            return Ok(Self::inline(name));
        }

        let (sender, receiver) = bounded::<Job>(capacity.max(1));
        let mut handles = Vec::with_capacity(threads);
        for i in 0..threads {
            let receiver = receiver.clone();
            let pool_name = name.to_string();
            let handle = thread::Builder::new()
                .name(format!("{name}-{i}"))
                .spawn(move || worker_loop(&pool_name, receiver))
                .map_err(SetupError::WorkerSpawn)?;
            handles.push(handle);
        }

        log::debug!("worker pool `{}` started with {} threads", name, threads);
        Ok(Self {
            name: name.to_string(),
            sender: Some(sender),
            handles,
        })
    }

    /// Pool that runs jobs on the submitting thread
    pub fn inline(name: &str) -> Self {
        Self {
            name: name.to_string(),
            sender: None,
            handles: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn thread_count(&self) -> usize {
        self.handles.len()
    }

    pub fn is_inline(&self) -> bool {
        self.handles.is_empty()
    }

    /// Jobs waiting to be picked up
    pub fn queued(&self) -> usize {
        self.sender.as_ref().map_or(0, Sender::len)
    }

    /// Queue a job. Returns false if it was dropped.
    pub fn submit<F>(&self, job: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        if self.is_inline() {
            run_job(&self.name, Box::new(job));
            return true;
        }

        let Some(sender) = &self.sender else {
            return false;
        };
        match sender.try_send(Box::new(job)) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                log::warn!("worker pool `{}` is full, dropping job", self.name);
                false
            }
            Err(TrySendError::Disconnected(_)) => {
                log::warn!("worker pool `{}` is shut down, dropping job", self.name);
                false
            }
        }
    }

    /// Close the queue and wait for in-flight jobs to finish
    pub fn shutdown(&mut self) {
        self.sender = None;
        for handle in self.handles.drain(..) {
            if handle.join().is_err() {
                log::error!("worker pool `{}`: thread exited abnormally", self.name);
            }
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop(name: &str, receiver: Receiver<Job>) {
    while let Ok(job) = receiver.recv() {
        run_job(name, job);
    }
}

fn run_job(name: &str, job: Job) {
    if catch_unwind(AssertUnwindSafe(job)).is_err() {
        log::error!("worker pool `{}`: job panicked, request dropped", name);
    }
}
