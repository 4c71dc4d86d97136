//! strongly typed library error.

use std::{error, fmt, io};

use crate::queue::PendingDrain;

/// Error returned by [ReclamationQueue::submit](crate::ReclamationQueue::submit) when the queue is
/// at full capacity.
///
/// The rejected entry is handed back untouched. It's the caller's job to close the connection
/// inside it as it would not be drained by any worker.
pub struct QueueFull<S, C>(PendingDrain<S, C>);

impl<S, C> QueueFull<S, C> {
    pub(crate) fn new(entry: PendingDrain<S, C>) -> Self {
        Self(entry)
    }

    /// Take back the rejected entry.
    pub fn into_inner(self) -> PendingDrain<S, C> {
        self.0
    }
}

impl<S, C> fmt::Debug for QueueFull<S, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("QueueFull(..)")
    }
}

impl<S, C> fmt::Display for QueueFull<S, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("reclamation queue is at full capacity")
    }
}

impl<S, C> error::Error for QueueFull<S, C> {}

/// Reason a connection is discarded instead of returned to the pool.
#[derive(Debug)]
#[non_exhaustive]
pub enum DrainError {
    /// transport failure while skipping body bytes. timeout of a single skip is reported as
    /// [io::ErrorKind::TimedOut].
    Io(io::Error),
    /// body bytes still on the wire after all retries are spent.
    RetryExhausted { remaining: u64 },
}

impl fmt::Display for DrainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Io(ref e) => write!(f, "transport error while draining response body: {e}"),
            Self::RetryExhausted { remaining } => {
                write!(f, "retry exhausted with {remaining} bytes of response body left unread")
            }
        }
    }
}

impl error::Error for DrainError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            Self::Io(ref e) => Some(e),
            Self::RetryExhausted { .. } => None,
        }
    }
}

impl From<io::Error> for DrainError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}
