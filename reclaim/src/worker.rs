use core::time::Duration;

use std::{io, sync::Arc};

use tracing::{debug, trace, warn};

use crate::{
    config::Config,
    connection::{DrainStream, KeepAliveConn},
    error::DrainError,
    queue::{PendingDrain, ReclamationQueue},
};

/// Outcome of draining a single [PendingDrain].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// body fully drained and connection handed back to pool.
    Pooled,
    /// connection closed.
    Discarded,
    /// no connection to reclaim or it's already in pool. only the body is closed.
    Untouched,
}

/// Counters of one [DrainWorker::run].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
    pub pooled: usize,
    pub discarded: usize,
    pub untouched: usize,
}

impl Stats {
    pub fn total(&self) -> usize {
        self.pooled + self.discarded + self.untouched
    }

    fn record(&mut self, disposition: Disposition) {
        match disposition {
            Disposition::Pooled => self.pooled += 1,
            Disposition::Discarded => self.discarded += 1,
            Disposition::Untouched => self.untouched += 1,
        }
    }
}

/// Single consumer of [ReclamationQueue].
///
/// A worker drains entries one after another in queue order and ends once the queue stays empty
/// for the configured idle timeout. Starting a new worker when new entries arrive afterwards is up
/// to the owner of the queue. See [Reclaimer](crate::Reclaimer) for one that does.
pub struct DrainWorker<S, C> {
    queue: Arc<ReclamationQueue<S, C>>,
    overall_timeout: Duration,
    drain_timeout: Duration,
    max_retries: usize,
}

impl<S, C> DrainWorker<S, C>
where
    S: DrainStream + Send,
    C: KeepAliveConn + Send,
{
    pub fn new(queue: Arc<ReclamationQueue<S, C>>, config: &Config) -> Self {
        Self {
            queue,
            overall_timeout: config.overall_timeout,
            drain_timeout: config.drain_timeout,
            max_retries: config.max_retries,
        }
    }

    /// Drain queued entries until the queue has been idle for the overall timeout.
    pub async fn run(self) -> Stats {
        let mut stats = Stats::default();

        while let Some(entry) = self.queue.take(self.overall_timeout).await {
            stats.record(self.drain(entry).await);
        }

        debug!(
            pooled = stats.pooled,
            discarded = stats.discarded,
            untouched = stats.untouched,
            "drain worker idle for {:?}. exiting",
            self.overall_timeout
        );

        stats
    }

    /// Drain one entry and decide if its connection goes back to pool.
    ///
    /// Never fails. Every error is resolved by discarding the connection of the entry.
    pub async fn drain(&self, entry: PendingDrain<S, C>) -> Disposition {
        let (stream, conn) = entry.into_parts();

        let Some(stream) = stream else {
            trace!("pending drain without response body");
            return Disposition::Untouched;
        };

        let mut stream = stream.lock().await;

        let disposition = match conn {
            Some(conn) if !conn.is_in_keep_alive_cache() => self.reclaim(&mut *stream, conn).await,
            Some(_) => {
                trace!("connection is already in keep-alive pool");
                Disposition::Untouched
            }
            None => Disposition::Untouched,
        };

        stream.mark_closed();

        disposition
    }

    async fn reclaim(&self, stream: &mut S, mut conn: C) -> Disposition {
        let timeout = conn.read_timeout();
        conn.set_read_timeout(Some(self.drain_timeout));

        match self.skip_remaining(stream).await {
            Ok(()) => {
                conn.set_read_timeout(timeout);
                conn.finished();
                trace!("response body drained. connection returned to pool");
                Disposition::Pooled
            }
            Err(DrainError::Io(e)) => {
                warn!("transport error while draining response body: {e}. closing connection");
                conn.close_server();
                Disposition::Discarded
            }
            Err(e) => {
                debug!("{e}. closing connection");
                conn.close_server();
                Disposition::Discarded
            }
        }
    }

    // only a round that skips nothing counts as retry.
    async fn skip_remaining(&self, stream: &mut S) -> Result<(), DrainError> {
        let mut remaining = stream.remaining();
        let mut retries = 0;

        while remaining > 0 {
            if retries == self.max_retries {
                return Err(DrainError::RetryExhausted { remaining });
            }

            let n = tokio::time::timeout(self.drain_timeout, stream.skip(remaining))
                .await
                .map_err(|_| io::Error::from(io::ErrorKind::TimedOut))??;

            if n == 0 {
                retries += 1;
            } else {
                remaining -= n.min(remaining);
            }
        }

        Ok(())
    }
}
