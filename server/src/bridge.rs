//! Marshals work between the dispatch task and a fixed pool of blocking workers.
//!
//! Blocking closures run on the worker pool; their continuations travel back
//! through a callback queue that only the owning dispatcher drains, so state
//! owned by the dispatcher is only ever touched on its task.

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};

use crate::queue::{self, EventQueue, EventSender};

/// Number of blocking workers behind each bridge.
pub const WORKER_COUNT: usize = 5;

/// Continuation executed on the dispatch task with exclusive access to its state.
pub type Callback<S> = Box<dyn FnOnce(&mut S) + Send>;

/// Receiving half of the bridge, drained by the dispatcher.
pub type CallbackQueue<S> = EventQueue<Callback<S>>;

type Job = Box<dyn FnOnce() + Send>;

/// Cloneable handle used by producers (HTTP handlers, other tasks) to reach
/// the dispatcher owning state `S`.
pub struct EventLoopBridge<S> {
    jobs: mpsc::UnboundedSender<Job>,
    callbacks: EventSender<Callback<S>>,
}

impl<S> Clone for EventLoopBridge<S> {
    fn clone(&self) -> Self {
        Self {
            jobs: self.jobs.clone(),
            callbacks: self.callbacks.clone(),
        }
    }
}

impl<S: 'static> EventLoopBridge<S> {
    /// Spawn `worker_count` workers. Must be called inside a tokio runtime.
    pub fn new(worker_count: usize) -> (Self, CallbackQueue<S>) {
        let (jobs, job_rx) = mpsc::unbounded_channel::<Job>();
        let (callbacks, callback_queue) = queue::channel();

        // Workers share one receiver; each job is picked up by exactly one of them.
        let shared_rx = Arc::new(Mutex::new(job_rx));
        for worker_id in 0..worker_count {
            let rx = Arc::clone(&shared_rx);
            tokio::spawn(run_worker(worker_id, rx));
        }

        (Self { jobs, callbacks }, callback_queue)
    }

    /// Schedule `callback` on the dispatch task. Returns false if the
    /// dispatcher has shut down.
    pub fn submit<F>(&self, callback: F) -> bool
    where
        F: FnOnce(&mut S) + Send + 'static,
    {
        submit_to(&self.callbacks, Box::new(callback))
    }

    /// Run `work` on a worker, then `on_result` on the dispatch task.
    ///
    /// There is no cancellation: once a worker finishes `work`, its
    /// continuation is always queued.
    pub fn run_blocking<T, W, R>(&self, work: W, on_result: R) -> bool
    where
        T: Send + 'static,
        W: FnOnce() -> T + Send + 'static,
        R: FnOnce(&mut S, T) + Send + 'static,
    {
        let callbacks = self.callbacks.clone();
        let job: Job = Box::new(move || {
            let output = work();
            submit_to(&callbacks, Box::new(move |state: &mut S| on_result(state, output)));
        });
        if self.jobs.send(job).is_err() {
            tracing::warn!("Bridge workers have stopped, dropping blocking job");
            return false;
        }
        true
    }
}

fn submit_to<S>(callbacks: &EventSender<Callback<S>>, callback: Callback<S>) -> bool {
    if callbacks.enqueue(callback).is_err() {
        tracing::warn!("Dispatcher is gone, dropping callback");
        return false;
    }
    true
}

async fn run_worker(worker_id: usize, jobs: Arc<Mutex<mpsc::UnboundedReceiver<Job>>>) {
    tracing::debug!(worker_id, "Bridge worker started");
    loop {
        let job = {
            let mut rx = jobs.lock().await;
            match rx.recv().await {
                Some(job) => job,
                None => break,
            }
        };
        if let Err(e) = tokio::task::spawn_blocking(job).await {
            tracing::error!(worker_id, "Blocking job failed: {}", e);
        }
    }
    tracing::debug!(worker_id, "Bridge worker exiting");
}
