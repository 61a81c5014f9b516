use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::{Condvar, Mutex};

type Task = Box<dyn FnOnce() + Send + 'static>;

/// The worker count used when none is configured.
pub const DEFAULT_THREADS: usize = 5;

struct QueueState {
    tasks: VecDeque<Task>,
    shutdown: bool,
}

struct Shared {
    state: Mutex<QueueState>,
    work_available: Condvar,
    // Separate monitor for finish(): the worker that completes the last
    // task decrements and notifies under this mutex, so a finish() waiter
    // cannot miss the wake-up.
    pending: Mutex<usize>,
    all_done: Condvar,
}

/// A fixed pool of worker threads draining a FIFO task queue.
///
/// [`finish`](Self::finish) blocks until every submitted task has run while
/// leaving the queue usable; [`shutdown`](Self::shutdown) stops the workers
/// and abandons tasks that never started; [`join`](Self::join) does both
/// and then waits for the worker threads to exit.
pub struct WorkQueue {
    shared: Arc<Shared>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    size: usize,
}

impl WorkQueue {
    pub fn new(threads: usize) -> Self {
        let threads = threads.max(1);
        let shared = Arc::new(Shared {
            state: Mutex::new(QueueState {
                tasks: VecDeque::new(),
                shutdown: false,
            }),
            work_available: Condvar::new(),
            pending: Mutex::new(0),
            all_done: Condvar::new(),
        });

        let workers = (0..threads)
            .map(|n| {
                let shared = Arc::clone(&shared);
                thread::Builder::new()
                    .name(format!("worker-{n}"))
                    .spawn(move || worker_loop(&shared))
                    .expect("failed to spawn worker thread")
            })
            .collect();

        tracing::debug!(threads, "work queue started");
        WorkQueue {
            shared,
            workers: Mutex::new(workers),
            size: threads,
        }
    }

    /// Enqueues a task; some worker will run it when available.
    pub fn execute(&self, task: impl FnOnce() + Send + 'static) {
        *self.shared.pending.lock() += 1;
        let mut state = self.shared.state.lock();
        state.tasks.push_back(Box::new(task));
        self.shared.work_available.notify_one();
    }

    /// Blocks until no submitted task remains pending. Workers keep
    /// running; the queue stays usable.
    pub fn finish(&self) {
        let mut pending = self.shared.pending.lock();
        while *pending > 0 {
            self.shared.all_done.wait(&mut pending);
        }
    }

    /// Stops the workers. Tasks already running complete; enqueued tasks
    /// that never started are abandoned.
    pub fn shutdown(&self) {
        let mut state = self.shared.state.lock();
        state.shutdown = true;
        self.shared.work_available.notify_all();
        tracing::debug!("work queue shutting down");
    }

    /// Waits for pending work, then stops and joins the workers. The queue
    /// is unusable afterwards.
    pub fn join(&self) {
        self.finish();
        self.shutdown();
        let handles: Vec<_> = self.workers.lock().drain(..).collect();
        for handle in handles {
            let _ = handle.join();
        }
    }

    /// Number of worker threads.
    pub fn size(&self) -> usize {
        self.size
    }
}

impl Default for WorkQueue {
    fn default() -> Self {
        Self::new(DEFAULT_THREADS)
    }
}

impl Drop for WorkQueue {
    fn drop(&mut self) {
        self.shutdown();
        for handle in self.workers.lock().drain(..) {
            let _ = handle.join();
        }
    }
}

/// Waits for work or shutdown; shutdown wins even when tasks remain.
fn next_task(shared: &Shared) -> Option<Task> {
    let mut state = shared.state.lock();
    while state.tasks.is_empty() && !state.shutdown {
        shared.work_available.wait(&mut state);
    }
    if state.shutdown {
        None
    } else {
        state.tasks.pop_front()
    }
}

fn worker_loop(shared: &Shared) {
    while let Some(task) = next_task(shared) {
        if panic::catch_unwind(AssertUnwindSafe(task)).is_err() {
            tracing::warn!("task panicked; worker continues");
        }
        let mut pending = shared.pending.lock();
        *pending -= 1;
        if *pending == 0 {
            shared.all_done.notify_all();
        }
    }
    tracing::debug!("worker terminating");
}
