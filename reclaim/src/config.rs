use core::time::Duration;

/// Tunables for draining abandoned response bodies.
///
/// Values are supplied by the owner of the connection pool. Nothing here is read from the
/// environment.
#[derive(Debug, Clone, Copy)]
pub struct Config {
    /// Max number of pending drains held by the queue.
    /// Default to 10.
    pub(crate) max_capacity: usize,
    /// Bodies with more unread bytes than this are not worth draining and are closed right away.
    /// Default to 512 KiB.
    pub(crate) max_data_to_reclaim: u64,
    /// Number of unproductive skip rounds tolerated before a connection is discarded.
    /// Default to 5.
    pub(crate) max_retries: usize,
    /// How long an idle worker waits for new work before it ends.
    /// Default to 5 seconds.
    pub(crate) overall_timeout: Duration,
    /// Read timeout applied to a connection while its body is drained.
    /// Default to 5 seconds.
    pub(crate) drain_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub const fn new() -> Self {
        Self {
            max_capacity: 10,
            max_data_to_reclaim: 512 * 1024,
            max_retries: 5,
            overall_timeout: Duration::from_secs(5),
            drain_timeout: Duration::from_secs(5),
        }
    }

    /// Set capacity of the reclamation queue.
    ///
    /// Default to 10
    ///
    /// # Panics:
    /// When pass 0 as queue capacity.
    pub fn set_max_capacity(mut self, cap: usize) -> Self {
        assert_ne!(cap, 0);
        self.max_capacity = cap;
        self
    }

    /// Set the largest amount of unread body bytes a connection can carry and still be queued
    /// for draining.
    ///
    /// Default to 512 KiB
    pub fn set_max_data_to_reclaim(mut self, bytes: u64) -> Self {
        self.max_data_to_reclaim = bytes;
        self
    }

    /// Set how many skip rounds without progress are tolerated per connection.
    ///
    /// Default to 5
    pub fn set_max_retries(mut self, retries: usize) -> Self {
        self.max_retries = retries;
        self
    }

    /// Set idle timeout of drain worker.
    ///
    /// Default to 5 seconds
    pub fn set_overall_timeout(mut self, dur: Duration) -> Self {
        self.overall_timeout = dur;
        self
    }

    /// Set read timeout used while draining a single connection.
    ///
    /// Default to 5 seconds
    pub fn set_drain_timeout(mut self, dur: Duration) -> Self {
        self.drain_timeout = dur;
        self
    }

    pub fn max_capacity(&self) -> usize {
        self.max_capacity
    }

    pub fn max_data_to_reclaim(&self) -> u64 {
        self.max_data_to_reclaim
    }

    pub fn max_retries(&self) -> usize {
        self.max_retries
    }

    pub fn overall_timeout(&self) -> Duration {
        self.overall_timeout
    }

    pub fn drain_timeout(&self) -> Duration {
        self.drain_timeout
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.max_capacity(), 10);
        assert_eq!(cfg.max_data_to_reclaim(), 512 * 1024);
        assert_eq!(cfg.max_retries(), 5);
        assert_eq!(cfg.overall_timeout(), Duration::from_secs(5));
        assert_eq!(cfg.drain_timeout(), Duration::from_secs(5));
    }

    #[test]
    #[should_panic]
    fn zero_capacity() {
        let _ = Config::new().set_max_capacity(0);
    }
}
