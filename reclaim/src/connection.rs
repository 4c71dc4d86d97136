use core::{future::Future, time::Duration};

use std::io;

/// Handle to a pooled http/1 connection that produced an abandoned response body.
///
/// The two terminal operations take the handle by value. A connection is either handed back to
/// the pool or closed, never both.
pub trait KeepAliveConn {
    /// Return true when the connection is already resident in the keep-alive pool.
    fn is_in_keep_alive_cache(&self) -> bool;

    fn read_timeout(&self) -> Option<Duration>;

    fn set_read_timeout(&mut self, dur: Option<Duration>);

    /// Hand the connection back to the keep-alive pool.
    fn finished(self);

    /// Close the connection. It must never be pooled again.
    fn close_server(self);
}

/// Response body that still has unread bytes on the wire.
pub trait DrainStream {
    /// Bytes of the body not consumed yet.
    fn remaining(&self) -> u64;

    /// Skip up to `n` bytes and return the amount actually skipped.
    ///
    /// `Ok(0)` is a valid outcome and does not mean the body is finished.
    fn skip(&mut self, n: u64) -> impl Future<Output = io::Result<u64>> + Send;

    /// Mark the body closed. Calling it more than once has no further effect.
    fn mark_closed(&mut self);
}
