use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, trace};

use crate::{
    config::Config,
    connection::{DrainStream, KeepAliveConn},
    queue::{PendingDrain, ReclamationQueue},
    worker::DrainWorker,
};

/// What [Reclaimer::abandon] did with an abandoned response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// queued for draining by background worker.
    Queued,
    /// nothing left to read. connection handed back to pool right away.
    Pooled,
    /// connection closed. either too much body left to drain or the queue is full.
    Discarded,
    /// connection is already in keep-alive pool. only the body is closed.
    Untouched,
}

/// Entry point for response bodies dropped before they are fully read.
///
/// Owns a [ReclamationQueue] and makes sure a [DrainWorker] is running on the tokio runtime
/// whenever the queue has work. Clone is cheap and all clones share the same queue.
pub struct Reclaimer<S, C> {
    inner: Arc<Inner<S, C>>,
}

struct Inner<S, C> {
    queue: Arc<ReclamationQueue<S, C>>,
    config: Config,
    worker_active: Mutex<bool>,
}

impl<S, C> Clone for Reclaimer<S, C> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<S, C> Reclaimer<S, C>
where
    S: DrainStream + Send + 'static,
    C: KeepAliveConn + Send + 'static,
{
    pub fn new(config: Config) -> Self {
        Self {
            inner: Arc::new(Inner {
                queue: Arc::new(ReclamationQueue::from_config(&config)),
                config,
                worker_active: Mutex::new(false),
            }),
        }
    }

    pub fn queue(&self) -> &ReclamationQueue<S, C> {
        &self.inner.queue
    }

    pub fn is_worker_active(&self) -> bool {
        *self.inner.lock_active()
    }

    /// Decide what happens to a connection whose response body is dropped early.
    ///
    /// Connections not worth draining and connections rejected by a full queue are closed here.
    /// A rejected connection is never handed back to pool with unread bytes on it.
    ///
    /// # Panics:
    /// When called outside the context of tokio runtime and a drain worker has to be spawned.
    pub fn abandon(&self, mut stream: S, conn: C) -> Admission {
        if conn.is_in_keep_alive_cache() {
            stream.mark_closed();
            return Admission::Untouched;
        }

        let remaining = stream.remaining();

        if remaining == 0 {
            conn.finished();
            stream.mark_closed();
            return Admission::Pooled;
        }

        if remaining > self.inner.config.max_data_to_reclaim {
            debug!(
                remaining,
                max = self.inner.config.max_data_to_reclaim,
                "response body too large to drain. closing connection"
            );
            conn.close_server();
            stream.mark_closed();
            return Admission::Discarded;
        }

        match self.inner.queue.submit(PendingDrain::new(stream, conn)) {
            Ok(()) => {
                self.spawn_worker();
                Admission::Queued
            }
            Err(e) => {
                debug!("{e}. closing connection");
                let (stream, conn) = e.into_inner().into_parts();
                if let Some(conn) = conn {
                    conn.close_server();
                }
                // stream is wrapped by PendingDrain::new above and never shared.
                if let Some(mut stream) = stream.as_ref().and_then(|s| s.try_lock().ok()) {
                    stream.mark_closed();
                }
                Admission::Discarded
            }
        }
    }

    fn spawn_worker(&self) {
        {
            let mut active = self.inner.lock_active();
            if *active {
                return;
            }
            *active = true;
        }

        Inner::spawn(self.inner.clone());
    }
}

impl<S, C> Inner<S, C>
where
    S: DrainStream + Send + 'static,
    C: KeepAliveConn + Send + 'static,
{
    // caller must own the active flag. ownership passes to the spawned worker.
    fn spawn(self: Arc<Self>) {
        tokio::spawn(async move {
            let guard = WorkerGuard(self);
            let stats = DrainWorker::new(guard.0.queue.clone(), &guard.0.config).run().await;
            trace!(drained = stats.total(), "drain worker finished");
        });
    }
}

// retire the worker when its task ends, including a panic from one of the collaborators in the
// middle of a drain. left over work is handed to a fresh worker.
struct WorkerGuard<S, C>(Arc<Inner<S, C>>)
where
    S: DrainStream + Send + 'static,
    C: KeepAliveConn + Send + 'static;

impl<S, C> Drop for WorkerGuard<S, C>
where
    S: DrainStream + Send + 'static,
    C: KeepAliveConn + Send + 'static,
{
    fn drop(&mut self) {
        if self.0.retire_worker() {
            return;
        }

        if tokio::runtime::Handle::try_current().is_ok() {
            Inner::spawn(self.0.clone());
        } else {
            // runtime is gone. nothing can drain the queue anymore.
            *self.0.lock_active() = false;
        }
    }
}

impl<S, C> Inner<S, C> {
    fn lock_active(&self) -> MutexGuard<'_, bool> {
        self.worker_active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // an entry submitted after the worker stopped waiting found it still marked active and did not
    // spawn a new one. the flag is only cleared when the queue is observed empty under the lock.
    fn retire_worker(&self) -> bool {
        let mut active = self.lock_active();
        if self.queue.is_empty() {
            *active = false;
            true
        } else {
            false
        }
    }
}
