//! Execution-context runners.
//!
//! Some hosts guarantee that state tied to one request is only ever touched
//! from a single designated thread. An [`ExecutionContextRunner`] schedules
//! work onto that affinity.
//!
//! - [`AffinityRunner`] owns a dedicated thread and runs operations there in
//!   submission order.
//! - [`ContextFreeRunner`] runs operations immediately on the caller.
//!
//! # Choosing a runner
//!
//! [`ContextFreeRunner`] gives up the affinity guarantee silently. Nothing in
//! this crate can tell whether the host relies on that guarantee, so picking
//! it is the caller's responsibility: only use it when every piece of state
//! touched by scheduled operations tolerates concurrent access.
//!
//! ```rust
//! use portcullis_core::runner::{AffinityRunner, ExecutionContextRunner};
//!
//! let runner = AffinityRunner::new("request-affinity")?;
//! runner.run_on_context(Box::new(|| println!("on the affinity thread")));
//! # Ok::<(), portcullis_core::Error>(())
//! ```

use std::fmt;
use std::sync::Arc;
use std::thread::{self, ThreadId};

use tokio::sync::{mpsc, oneshot};

use crate::error::{Error, Result};

/// A unit of work scheduled onto an execution context.
pub type Operation = Box<dyn FnOnce() + Send + 'static>;

/// Schedules operations onto the execution affinity of a request.
pub trait ExecutionContextRunner: Send + Sync {
    /// Schedule `operation`. Fire-and-forget: completion is observed by the
    /// operation itself, see [`on_context`].
    fn run_on_context(&self, operation: Operation);
}

/// Run `f` on `runner` and await its result.
///
/// Fails with [`Error::ContextClosed`] if the runner dropped the operation
/// without running it.
pub async fn on_context<T, F>(runner: &dyn ExecutionContextRunner, f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let (tx, rx) = oneshot::channel();
    runner.run_on_context(Box::new(move || {
        // The receiver may have given up; nothing to do then.
        let _ = tx.send(f());
    }));
    rx.await.map_err(|_| Error::ContextClosed)
}

// ============================================================================
// ContextFreeRunner
// ============================================================================

/// Runs every operation immediately on the calling thread.
///
/// Forfeits any thread-affinity guarantee. See the module docs.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextFreeRunner;

impl ExecutionContextRunner for ContextFreeRunner {
    fn run_on_context(&self, operation: Operation) {
        operation();
    }
}

// ============================================================================
// AffinityRunner
// ============================================================================

/// Runs operations on one dedicated thread, in submission order.
///
/// Cheap to clone; clones share the same thread. The thread exits once the
/// last clone is dropped and the queue has drained.
#[derive(Clone)]
pub struct AffinityRunner {
    inner: Arc<AffinityRunnerInner>,
}

struct AffinityRunnerInner {
    name: String,
    tx: mpsc::UnboundedSender<Operation>,
    thread_id: ThreadId,
}

impl AffinityRunner {
    /// Spawn the affinity thread.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let (tx, mut rx) = mpsc::unbounded_channel::<Operation>();
        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                while let Some(operation) = rx.blocking_recv() {
                    operation();
                }
            })?;
        let thread_id = handle.thread().id();
        log::debug!("Started affinity runner '{name}'");
        Ok(Self {
            inner: Arc::new(AffinityRunnerInner {
                name,
                tx,
                thread_id,
            }),
        })
    }

    /// Name of the affinity thread.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Id of the affinity thread.
    pub fn thread_id(&self) -> ThreadId {
        self.inner.thread_id
    }

    /// Whether the caller is already on the affinity thread.
    pub fn is_current(&self) -> bool {
        thread::current().id() == self.inner.thread_id
    }
}

impl ExecutionContextRunner for AffinityRunner {
    fn run_on_context(&self, operation: Operation) {
        if self.inner.tx.send(operation).is_err() {
            log::error!(
                "Affinity runner '{}' is closed; dropping operation",
                self.inner.name
            );
        }
    }
}

impl fmt::Debug for AffinityRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AffinityRunner")
            .field("name", &self.inner.name)
            .field("thread_id", &self.inner.thread_id)
            .finish()
    }
}
