//! [DrainStream] implementation for response body with known length.

use core::future::Future;

use std::io;

use bytes::{BufMut, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::connection::DrainStream;

const SKIP_CHUNK: usize = 8 * 1024;

/// Content-length response body that can be drained from any [AsyncRead] type.
///
/// Skipped bytes are read into a scratch buffer owned by the body and thrown away.
pub struct BodyDrain<R> {
    io: R,
    buf: BytesMut,
    remaining: u64,
    closed: bool,
}

impl<R> BodyDrain<R> {
    /// `remaining` is the amount of body bytes still on the wire.
    pub fn new(io: R, remaining: u64) -> Self {
        Self {
            io,
            buf: BytesMut::new(),
            remaining,
            closed: false,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn into_inner(self) -> R {
        self.io
    }
}

impl<R> DrainStream for BodyDrain<R>
where
    R: AsyncRead + Unpin + Send,
{
    fn remaining(&self) -> u64 {
        self.remaining
    }

    fn skip(&mut self, n: u64) -> impl Future<Output = io::Result<u64>> + Send {
        async move {
            if self.closed {
                return Ok(0);
            }

            let len = n.min(self.remaining).min(SKIP_CHUNK as u64) as usize;
            if len == 0 {
                return Ok(0);
            }

            // capacity is kept across calls. only the first skip allocates.
            self.buf.clear();
            self.buf.reserve(len);

            let n = self.io.read_buf(&mut (&mut self.buf).limit(len)).await?;
            if n == 0 {
                return Err(io::Error::from(io::ErrorKind::UnexpectedEof));
            }

            self.remaining -= n as u64;
            Ok(n as u64)
        }
    }

    fn mark_closed(&mut self) {
        self.closed = true;
    }
}

#[cfg(test)]
mod test {
    use tokio::io::AsyncWriteExt;

    use super::*;

    #[tokio::test]
    async fn skip_in_chunks() {
        let (mut tx, rx) = tokio::io::duplex(64 * 1024);
        tx.write_all(&[1; 20 * 1024]).await.unwrap();

        let mut body = BodyDrain::new(rx, 20 * 1024);

        let mut skipped = 0;
        while body.remaining() > 0 {
            let n = body.skip(body.remaining()).await.unwrap();
            assert!(n as usize <= SKIP_CHUNK);
            skipped += n;
        }

        assert_eq!(skipped, 20 * 1024);
        assert_eq!(body.skip(1).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn skip_stops_at_body_end() {
        let (mut tx, rx) = tokio::io::duplex(1024);
        tx.write_all(b"hello world").await.unwrap();

        let mut body = BodyDrain::new(rx, 5);
        assert_eq!(body.skip(100).await.unwrap(), 5);
        assert_eq!(body.remaining(), 0);

        let mut rest = [0; 6];
        body.into_inner().read_exact(&mut rest).await.unwrap();
        assert_eq!(&rest, b" world");
    }

    #[tokio::test]
    async fn eof() {
        let (mut tx, rx) = tokio::io::duplex(1024);
        tx.write_all(b"foo").await.unwrap();
        drop(tx);

        let mut body = BodyDrain::new(rx, 10);
        assert_eq!(body.skip(10).await.unwrap(), 3);

        let e = body.skip(7).await.unwrap_err();
        assert_eq!(e.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[tokio::test]
    async fn skip_future_is_small() {
        let (mut tx, rx) = tokio::io::duplex(64 * 1024);
        tx.write_all(&[1; SKIP_CHUNK * 2]).await.unwrap();

        let mut body = BodyDrain::new(rx, SKIP_CHUNK as u64 * 2);

        let fut = body.skip(SKIP_CHUNK as u64 * 2);
        assert!(core::mem::size_of_val(&fut) < 256);
        assert_eq!(fut.await.unwrap(), SKIP_CHUNK as u64);

        assert_eq!(body.skip(SKIP_CHUNK as u64).await.unwrap(), SKIP_CHUNK as u64);
        assert_eq!(body.remaining(), 0);
    }

    #[tokio::test]
    async fn closed() {
        let (mut tx, rx) = tokio::io::duplex(1024);
        tx.write_all(b"foo").await.unwrap();

        let mut body = BodyDrain::new(rx, 3);
        body.mark_closed();
        body.mark_closed();

        assert!(body.is_closed());
        assert_eq!(body.skip(3).await.unwrap(), 0);
        assert_eq!(body.remaining(), 3);
    }
}
