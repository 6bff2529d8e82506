//! Serialized, pausable task queue with awaitable completions.
//!
//! The engine runs one of these for graph updates (created paused, started
//! once initialization finishes) and one for statistics recomputation.
//! Concurrency is 1 and order is FIFO; `clear` cancels queued-but-unstarted
//! tasks, resolving their awaiters with an error.

use futures::future::BoxFuture;
use std::collections::VecDeque;
use std::error::Error;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{oneshot, Notify};

/// Represents errors returned to a task's awaiter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    /// The task was cleared before it ran
    Cancelled,
    /// The queue was closed
    Closed,
}

impl fmt::Display for QueueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueueError::Cancelled => write!(f, "Task cancelled before completion"),
            QueueError::Closed => write!(f, "Queue is closed"),
        }
    }
}

impl Error for QueueError {}

type Task = BoxFuture<'static, ()>;

struct QueueShared {
    tasks: Mutex<VecDeque<Task>>,
    paused: AtomicBool,
    pending: AtomicUsize,
    closed: AtomicBool,
    wake: Notify,
    idle: Notify,
}

fn lock_tasks(shared: &QueueShared) -> MutexGuard<'_, VecDeque<Task>> {
    // Tasks are plain boxed futures; a poisoned lock cannot leave them torn
    match shared.tasks.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Serialized task queue (concurrency 1)
#[derive(Clone)]
pub struct UpdateQueue {
    shared: Arc<QueueShared>,
}

impl UpdateQueue {
    /// Create a queue and spawn its worker. A paused queue accepts tasks but
    /// holds them until [`UpdateQueue::start`].
    pub fn new(start_paused: bool) -> Self {
        let shared = Arc::new(QueueShared {
            tasks: Mutex::new(VecDeque::new()),
            paused: AtomicBool::new(start_paused),
            pending: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
            wake: Notify::new(),
            idle: Notify::new(),
        });
        tokio::spawn(run_worker(shared.clone()));
        Self { shared }
    }

    /// Enqueue a task. The returned future resolves with the task's output
    /// once it has run, or with an error if it never will.
    pub fn add<T, F>(&self, task: F) -> impl Future<Output = Result<T, QueueError>>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let closed = self.shared.closed.load(Ordering::SeqCst);
        let (done_tx, done_rx) = oneshot::channel();
        if !closed {
            let boxed: Task = Box::pin(async move {
                let _ = done_tx.send(task.await);
            });
            lock_tasks(&self.shared).push_back(boxed);
            self.shared.wake.notify_one();
        }
        async move {
            if closed {
                return Err(QueueError::Closed);
            }
            done_rx.await.map_err(|_| QueueError::Cancelled)
        }
    }

    /// Number of queued, not yet started tasks
    pub fn size(&self) -> usize {
        lock_tasks(&self.shared).len()
    }

    /// Number of tasks currently running (0 or 1)
    pub fn pending(&self) -> usize {
        self.shared.pending.load(Ordering::SeqCst)
    }

    pub fn is_paused(&self) -> bool {
        self.shared.paused.load(Ordering::SeqCst)
    }

    /// Stop starting new tasks; the running task is unaffected
    pub fn pause(&self) {
        self.shared.paused.store(true, Ordering::SeqCst);
    }

    /// Resume starting tasks
    pub fn start(&self) {
        self.shared.paused.store(false, Ordering::SeqCst);
        self.shared.wake.notify_one();
    }

    /// Drop every queued task, cancelling its awaiter
    pub fn clear(&self) {
        lock_tasks(&self.shared).clear();
    }

    /// True when nothing is queued and nothing is running
    pub fn is_idle(&self) -> bool {
        self.size() == 0 && self.pending() == 0
    }

    /// Wait until the queue is idle
    pub async fn on_idle(&self) {
        let notified = self.shared.idle.notified();
        tokio::pin!(notified);
        loop {
            notified.as_mut().enable();
            if self.is_idle() {
                return;
            }
            notified.as_mut().await;
            notified.set(self.shared.idle.notified());
        }
    }

    /// Shut the worker down; queued tasks are cancelled
    pub fn close(&self) {
        self.shared.closed.store(true, Ordering::SeqCst);
        lock_tasks(&self.shared).clear();
        self.shared.wake.notify_one();
    }
}

async fn run_worker(shared: Arc<QueueShared>) {
    loop {
        if shared.closed.load(Ordering::SeqCst) {
            break;
        }
        let next = if shared.paused.load(Ordering::SeqCst) {
            None
        } else {
            lock_tasks(&shared).pop_front()
        };
        match next {
            Some(task) => {
                shared.pending.store(1, Ordering::SeqCst);
                task.await;
                shared.pending.store(0, Ordering::SeqCst);
                shared.idle.notify_waiters();
            }
            None => {
                shared.idle.notify_waiters();
                shared.wake.notified().await;
            }
        }
    }
    shared.pending.store(0, Ordering::SeqCst);
    shared.idle.notify_waiters();
}
