use core::time::Duration;

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use tokio::{
    sync::Notify,
    time::{Instant, timeout_at},
};
use tracing::trace;

use crate::{config::Config, error::QueueFull};

/// Response body shared between the abandoning side and the drain worker. The worker holds the
/// lock for the whole time it drains the body.
pub type SharedStream<S> = Arc<tokio::sync::Mutex<S>>;

/// An abandoned response body waiting to be drained, together with the connection it was read
/// from.
pub struct PendingDrain<S, C> {
    stream: Option<SharedStream<S>>,
    conn: Option<C>,
}

impl<S, C> PendingDrain<S, C> {
    pub fn new(stream: S, conn: C) -> Self {
        Self {
            stream: Some(Arc::new(tokio::sync::Mutex::new(stream))),
            conn: Some(conn),
        }
    }

    /// Construct from a stream that is already shared. Either part can be absent, in which case
    /// there is nothing to drain or nothing to give back to the pool.
    pub fn from_parts(stream: Option<SharedStream<S>>, conn: Option<C>) -> Self {
        Self { stream, conn }
    }

    pub fn stream(&self) -> Option<&SharedStream<S>> {
        self.stream.as_ref()
    }

    pub fn conn(&self) -> Option<&C> {
        self.conn.as_ref()
    }

    pub fn into_parts(self) -> (Option<SharedStream<S>>, Option<C>) {
        (self.stream, self.conn)
    }
}

/// Bounded FIFO between any number of producers and a single [DrainWorker](crate::DrainWorker).
pub struct ReclamationQueue<S, C> {
    entries: Mutex<VecDeque<PendingDrain<S, C>>>,
    notify: Notify,
    cap: usize,
}

impl<S, C> ReclamationQueue<S, C> {
    /// # Panics:
    /// When pass 0 as capacity.
    pub fn new(cap: usize) -> Self {
        assert_ne!(cap, 0);
        Self {
            entries: Mutex::new(VecDeque::with_capacity(cap)),
            notify: Notify::new(),
            cap,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.max_capacity)
    }

    /// Append entry to the tail of queue.
    ///
    /// Never waits. When the queue is full the entry is handed back inside [QueueFull] and the
    /// queue is left unchanged.
    pub fn submit(&self, entry: PendingDrain<S, C>) -> Result<(), QueueFull<S, C>> {
        {
            let mut entries = self.lock();
            if entries.len() >= self.cap {
                trace!(cap = self.cap, "reclamation queue is full. rejecting entry");
                return Err(QueueFull::new(entry));
            }
            entries.push_back(entry);
        }

        self.notify.notify_one();
        Ok(())
    }

    /// Remove and return the head entry. When the queue is empty wait for new entry up to `timeout`.
    ///
    /// The timeout is a single budget for the whole call. Wake ups that find the queue still empty
    /// keep waiting for what is left of it.
    pub async fn take(&self, timeout: Duration) -> Option<PendingDrain<S, C>> {
        let deadline = Instant::now() + timeout;

        loop {
            if let Some(entry) = self.try_take() {
                return Some(entry);
            }

            // notify_one from a submit that raced with the check above is stored as permit and
            // resolves this wait immediately.
            if timeout_at(deadline, self.notify.notified()).await.is_err() {
                return self.try_take();
            }
        }
    }

    /// Remove and return the head entry without waiting.
    pub fn try_take(&self) -> Option<PendingDrain<S, C>> {
        self.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.cap
    }

    // entries are only pushed and popped under the lock. a panic can't leave the deque half
    // updated so a poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, VecDeque<PendingDrain<S, C>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn capacity() {
        let queue = ReclamationQueue::new(10);

        for i in 0..10 {
            assert!(queue.submit(PendingDrain::new((), i)).is_ok());
        }

        let rejected = queue.submit(PendingDrain::new((), 10)).unwrap_err();
        assert_eq!(rejected.into_inner().conn(), Some(&10));
        assert_eq!(queue.len(), 10);
        assert_eq!(queue.capacity(), 10);
    }

    #[test]
    fn capacity_concurrent_submit() {
        let queue = ReclamationQueue::new(10);

        let (accepted, mut rejected) = std::thread::scope(|s| {
            let handles = (0..64)
                .map(|i| {
                    let queue = &queue;
                    s.spawn(move || queue.submit(PendingDrain::new((), i)))
                })
                .collect::<Vec<_>>();

            let mut accepted = 0;
            let mut rejected = Vec::new();
            for handle in handles {
                match handle.join().unwrap() {
                    Ok(()) => accepted += 1,
                    Err(e) => rejected.push(*e.into_inner().conn().unwrap()),
                }
            }
            (accepted, rejected)
        });

        assert_eq!(accepted, 10);
        assert_eq!(rejected.len(), 54);
        assert_eq!(queue.len(), 10);

        // every entry is either queued or handed back, exactly once.
        while let Some(entry) = queue.try_take() {
            rejected.push(*entry.conn().unwrap());
        }
        rejected.sort_unstable();
        assert_eq!(rejected, (0..64).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn fifo() {
        let queue = ReclamationQueue::new(4);

        for i in ['a', 'b', 'c'] {
            queue.submit(PendingDrain::new((), i)).unwrap();
        }

        for i in ['a', 'b', 'c'] {
            let entry = queue.take(Duration::from_secs(1)).await.unwrap();
            assert_eq!(entry.conn(), Some(&i));
        }

        assert!(queue.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn take_timeout() {
        let queue = ReclamationQueue::<(), ()>::new(1);

        let now = Instant::now();
        assert!(queue.take(Duration::from_millis(100)).await.is_none());
        assert!(now.elapsed() >= Duration::from_millis(100));
    }

    #[tokio::test(start_paused = true)]
    async fn take_wakes_on_submit() {
        let queue = Arc::new(ReclamationQueue::new(1));

        let queue2 = queue.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            queue2.submit(PendingDrain::new((), 996)).unwrap();
        });

        let now = Instant::now();
        let entry = queue.take(Duration::from_secs(5)).await.unwrap();
        assert_eq!(entry.conn(), Some(&996));
        assert!(now.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn spurious_wake_keeps_deadline() {
        let queue = Arc::new(ReclamationQueue::<(), ()>::new(1));

        let queue2 = queue.clone();
        tokio::spawn(async move {
            for _ in 0..3 {
                tokio::time::sleep(Duration::from_millis(60)).await;
                queue2.notify.notify_one();
            }
        });

        let now = Instant::now();
        assert!(queue.take(Duration::from_millis(100)).await.is_none());
        let elapsed = now.elapsed();
        assert!(elapsed >= Duration::from_millis(100));
        assert!(elapsed < Duration::from_millis(160));
    }
}
