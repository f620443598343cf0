//! The UI execution context.
//!
//! All rendering and toolbar work happens on a single UI thread. Other threads hand work to it
//! through a [`UiHandle`]; the UI thread executes queued tasks in posting order whenever it calls
//! [`UiContext::run_pending`]. The queue is also the synchronization point: anything written
//! before a `post` is visible to the task when it runs.

use std::{sync::Arc, time::Duration};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

use crate::session::SessionScope;

type Task = Box<dyn FnOnce() + Send>;
type Waker = Arc<dyn Fn() + Send + Sync>;

/// How a task posted on behalf of a session reacts to that session ending
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    /// Skipped if the session scope is cancelled by the time the task runs
    Cancellable,
    /// Runs even when the session scope has been cancelled
    Atomic,
}

struct Posted {
    scope: Option<SessionScope>,
    mode: DispatchMode,
    task: Task,
}

impl Posted {
    fn is_stale(&self) -> bool {
        match (&self.scope, self.mode) {
            (Some(scope), DispatchMode::Cancellable) => scope.is_cancelled(),
            _ => false,
        }
    }
}

/// Owned by the UI thread
pub struct UiContext {
    tx: Sender<Posted>,
    rx: Receiver<Posted>,
    waker: Option<Waker>,
}

impl Default for UiContext {
    fn default() -> Self {
        Self::new()
    }
}

impl UiContext {
    pub fn new() -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self { tx, rx, waker: None }
    }

    /// Create a context that calls `waker` after every post, e.g. to request a repaint
    pub fn with_waker(waker: impl Fn() + Send + Sync + 'static) -> Self {
        let mut ctx = Self::new();
        ctx.waker = Some(Arc::new(waker));
        ctx
    }

    pub fn handle(&self) -> UiHandle {
        UiHandle {
            tx: self.tx.clone(),
            waker: self.waker.clone(),
        }
    }

    /// Number of tasks waiting to run
    pub fn pending(&self) -> usize {
        self.rx.len()
    }

    /// Run every queued task, returning how many actually executed
    pub fn run_pending(&self) -> usize {
        let mut executed = 0;
        while let Ok(posted) = self.rx.try_recv() {
            if self.run(posted) {
                executed += 1;
            }
        }
        executed
    }

    /// Block until at least one task arrives or `timeout` expires, then drain the queue
    pub fn run_until_idle(&self, timeout: Duration) -> eyre::Result<usize> {
        let posted = match self.rx.recv_timeout(timeout) {
            Ok(posted) => posted,
            Err(RecvTimeoutError::Timeout) => return Ok(0),
            Err(RecvTimeoutError::Disconnected) => eyre::bail!("ui task queue disconnected"),
        };
        let executed = usize::from(self.run(posted));
        Ok(executed + self.run_pending())
    }

    fn run(&self, posted: Posted) -> bool {
        if posted.is_stale() {
            tracing::debug!("session scope cancelled, dropping ui task");
            return false;
        }
        (posted.task)();
        true
    }
}

/// Cheap, cloneable sender of work onto the UI thread
#[derive(Clone)]
pub struct UiHandle {
    tx: Sender<Posted>,
    waker: Option<Waker>,
}

impl UiHandle {
    /// Post a task that is not tied to any session
    pub fn post(&self, task: impl FnOnce() + Send + 'static) {
        self.enqueue(Posted {
            scope: None,
            mode: DispatchMode::Atomic,
            task: Box::new(task),
        });
    }

    /// Post a task on behalf of a session
    pub fn post_in_scope(
        &self,
        scope: &SessionScope,
        mode: DispatchMode,
        task: impl FnOnce() + Send + 'static,
    ) {
        self.enqueue(Posted {
            scope: Some(scope.clone()),
            mode,
            task: Box::new(task),
        });
    }

    fn enqueue(&self, posted: Posted) {
        if self.tx.send(posted).is_err() {
            tracing::debug!("ui context gone, dropping task");
            return;
        }
        if let Some(waker) = &self.waker {
            waker();
        }
    }
}
