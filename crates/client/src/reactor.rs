//! Shared event loop for all transports
//!
//! Every socket, timer and completion handler of the transports runs on one
//! event loop. By default that is a single-threaded tokio runtime on a
//! dedicated background thread; an embedding application that already owns a
//! runtime can hand over its [`Handle`] instead.
//!
//! The reactor is passed explicitly to every transport so that independent
//! instances can coexist (one per test, for example).
//!
//! # Example
//!
//! ```
//! use framecast_client::Reactor;
//!
//! let reactor = Reactor::start().unwrap();
//! reactor.spawn(async { /* runs on the reactor thread */ });
//! reactor.shutdown();
//! ```

use std::future::Future;
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};

use parking_lot::Mutex;
use tokio::runtime::{Builder, Handle};
use tokio::task;
use tokio_util::sync::CancellationToken;

use crate::error::{Result, TransportError};

/// Name of the dedicated event loop thread
pub const REACTOR_THREAD_NAME: &str = "framecast-reactor";

/// Cloneable handle to the shared event loop
///
/// Dropping the last clone shuts the loop down, the same as
/// [`Reactor::shutdown`].
#[derive(Clone)]
pub struct Reactor {
    inner: Arc<Inner>,
}

struct Inner {
    spawner: Spawner,
    /// Dedicated loop thread, `None` when running on a borrowed handle
    thread: Mutex<Option<JoinHandle<()>>>,
    thread_id: Option<ThreadId>,
}

/// What background tasks keep instead of a [`Reactor`] clone
///
/// Tasks must not keep the reactor alive, otherwise dropping the last
/// user-facing clone would never stop them.
#[derive(Clone)]
pub(crate) struct Spawner {
    handle: Handle,
    shutdown: CancellationToken,
}

impl Spawner {
    pub(crate) fn spawn<F>(&self, future: F) -> task::JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let shutdown = self.shutdown.clone();
        self.handle.spawn(async move {
            tokio::select! {
                _ = shutdown.cancelled() => {}
                _ = future => {}
            }
        })
    }

    /// Token cancelled together with the reactor
    pub(crate) fn child_token(&self) -> CancellationToken {
        self.shutdown.child_token()
    }
}

impl Reactor {
    /// Start a dedicated single-threaded event loop on a background thread
    ///
    /// # Errors
    ///
    /// Returns error if the runtime or its thread cannot be created.
    pub fn start() -> Result<Self> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(TransportError::Reactor)?;
        let handle = runtime.handle().clone();
        let shutdown = CancellationToken::new();

        let token = shutdown.clone();
        let thread = thread::Builder::new()
            .name(REACTOR_THREAD_NAME.into())
            .spawn(move || {
                runtime.block_on(token.cancelled());
                tracing::debug!("reactor stopped");
            })
            .map_err(TransportError::Reactor)?;

        tracing::debug!(thread = REACTOR_THREAD_NAME, "reactor started");

        Ok(Self {
            inner: Arc::new(Inner {
                spawner: Spawner { handle, shutdown },
                thread_id: Some(thread.thread().id()),
                thread: Mutex::new(Some(thread)),
            }),
        })
    }

    /// Run on a runtime owned by the embedding application
    ///
    /// Shutting down cancels the tasks spawned through this reactor but
    /// leaves the runtime itself alone.
    pub fn from_handle(handle: Handle) -> Self {
        Self {
            inner: Arc::new(Inner {
                spawner: Spawner {
                    handle,
                    shutdown: CancellationToken::new(),
                },
                thread: Mutex::new(None),
                thread_id: None,
            }),
        }
    }

    /// Runtime handle of the event loop
    pub fn handle(&self) -> &Handle {
        &self.inner.spawner.handle
    }

    /// Spawn a task on the event loop; it is cancelled on shutdown
    pub fn spawn<F>(&self, future: F) -> task::JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.inner.spawner.spawn(future)
    }

    /// True once [`Reactor::shutdown`] was called
    pub fn is_shut_down(&self) -> bool {
        self.inner.spawner.shutdown.is_cancelled()
    }

    /// Cancel every task and join the dedicated thread
    ///
    /// Idempotent. Never joins when called from the loop thread itself.
    pub fn shutdown(&self) {
        self.inner.stop();
    }

    pub(crate) fn spawner(&self) -> Spawner {
        self.inner.spawner.clone()
    }
}

impl Inner {
    fn stop(&self) {
        self.spawner.shutdown.cancel();

        let Some(thread) = self.thread.lock().take() else {
            return;
        };
        if Some(thread::current().id()) == self.thread_id {
            // The loop exits on its own once the current task yields
            return;
        }
        if thread.join().is_err() {
            tracing::error!("reactor thread panicked");
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for Reactor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reactor")
            .field("dedicated", &self.inner.thread_id.is_some())
            .field("shut_down", &self.is_shut_down())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn test_tasks_run_on_reactor_thread() {
        let reactor = Reactor::start().unwrap();
        let (tx, rx) = mpsc::channel();

        reactor.spawn(async move {
            let name = thread::current().name().map(str::to_owned);
            tx.send(name).unwrap();
        });

        let name = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(name.as_deref(), Some(REACTOR_THREAD_NAME));
        reactor.shutdown();
    }

    #[test]
    fn test_shutdown_cancels_pending_tasks() {
        let reactor = Reactor::start().unwrap();
        let (tx, rx) = mpsc::channel::<()>();

        reactor.spawn(async move {
            std::future::pending::<()>().await;
            drop(tx);
        });

        reactor.shutdown();
        assert!(reactor.is_shut_down());
        // Sender dropped with the cancelled task
        assert!(rx.recv_timeout(Duration::from_secs(5)).is_err());
    }

    #[test]
    fn test_shutdown_is_idempotent() {
        let reactor = Reactor::start().unwrap();
        let clone = reactor.clone();
        reactor.shutdown();
        clone.shutdown();
        drop(reactor);
        drop(clone);
    }

    #[tokio::test]
    async fn test_from_handle_runs_on_caller_runtime() {
        let reactor = Reactor::from_handle(Handle::current());
        let (tx, rx) = tokio::sync::oneshot::channel();

        reactor.spawn(async move {
            let _ = tx.send(7);
        });

        assert_eq!(rx.await.unwrap(), 7);
        reactor.shutdown();
        assert!(reactor.is_shut_down());
    }
}
