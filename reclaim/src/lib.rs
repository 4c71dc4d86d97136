//! reclaim keep-alive http/1 connections left behind by abandoned response bodies.
//!
//! When a caller drops a response body before reading it to the end the connection it came from
//! still has unread bytes on the wire and can't serve the next request. Instead of closing it the
//! body can be handed to a background worker that skips the leftover bytes and gives the
//! connection back to the keep-alive pool, or closes it when the peer does not cooperate.
//!
//! # Quick Start
//! ```no_run
//! use std::{io, time::Duration};
//!
//! use xitca_reclaim::{Admission, BodyDrain, Config, KeepAliveConn, Reclaimer};
//!
//! // connection handle provided by the pool implementation.
//! struct PoolConn;
//!
//! impl KeepAliveConn for PoolConn {
//!     fn is_in_keep_alive_cache(&self) -> bool { false }
//!     fn read_timeout(&self) -> Option<Duration> { None }
//!     fn set_read_timeout(&mut self, _: Option<Duration>) {}
//!     fn finished(self) { /* push back into pool */ }
//!     fn close_server(self) { /* shutdown socket */ }
//! }
//!
//! #[tokio::main]
//! async fn main() -> io::Result<()> {
//!     let reclaimer = Reclaimer::new(Config::new().set_max_capacity(32));
//!
//!     let stream = tokio::net::TcpStream::connect("127.0.0.1:8080").await?;
//!     // response body with 1024 bytes not read by caller.
//!     let body = BodyDrain::new(stream, 1024);
//!
//!     assert_eq!(reclaimer.abandon(body, PoolConn), Admission::Queued);
//!     Ok(())
//! }
//! ```
//!
//! # Composable
//! [ReclamationQueue] and [DrainWorker] can be driven directly when the pool wants to decide
//! on its own when a worker runs. [Reclaimer] is a thin owner of both that spawns a worker on
//! the tokio runtime whenever the queue has work.

#![forbid(unsafe_code)]

mod config;
mod connection;
mod queue;
mod reclaimer;
mod worker;

pub mod error;
pub mod io;

pub use self::config::Config;
pub use self::connection::{DrainStream, KeepAliveConn};
pub use self::io::BodyDrain;
pub use self::queue::{PendingDrain, ReclamationQueue, SharedStream};
pub use self::reclaimer::{Admission, Reclaimer};
pub use self::worker::{Disposition, DrainWorker, Stats};
