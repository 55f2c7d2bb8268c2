use std::io;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::time::timeout;

use crate::Error;

/// Read half of a proxied connection. Every read carries the configured
/// deadline, and bytes can be pushed back so the next read returns them
/// before touching the socket again.
pub struct Reader<S> {
    half: ReadHalf<S>,
    deadline: Duration,
    buf: BytesMut,
    buf_size: usize,
    unread: Option<Bytes>,
}

/// Write half of a proxied connection, with a per-write deadline.
pub struct Writer<S> {
    half: WriteHalf<S>,
    deadline: Duration,
}

/// Splits a stream into deadline-carrying halves. The halves are
/// independently owned, so one task can read while another writes.
pub fn split<S: AsyncRead + AsyncWrite>(
    stream: S,
    read_deadline: Duration,
    write_deadline: Duration,
    buf_size: usize,
) -> (Reader<S>, Writer<S>) {
    let (read_half, write_half) = tokio::io::split(stream);
    (
        Reader {
            half: read_half,
            deadline: read_deadline,
            buf: BytesMut::with_capacity(buf_size),
            buf_size,
            unread: None,
        },
        Writer {
            half: write_half,
            deadline: write_deadline,
        },
    )
}

impl<S: AsyncRead> Reader<S> {
    /// Returns the next run of bytes: pushed-back bytes first, otherwise
    /// whatever the socket delivers next. A clean EOF surfaces as
    /// `Error::Closed`.
    pub async fn read(&mut self) -> Result<Bytes, Error> {
        if let Some(data) = self.unread.take() {
            return Ok(data);
        }
        self.buf.reserve(self.buf_size);
        let n = timeout(self.deadline, self.half.read_buf(&mut self.buf))
            .await
            .map_err(|_| Error::IO(io::ErrorKind::TimedOut.into()))??;
        if n == 0 {
            return Err(Error::Closed);
        }
        Ok(self.buf.split().freeze())
    }

    /// Hands bytes back to the reader; the next `read` returns exactly
    /// these bytes. At most one pushback may be outstanding.
    pub fn unread(&mut self, data: Bytes) {
        debug_assert!(self.unread.is_none());
        if !data.is_empty() {
            self.unread = Some(data);
        }
    }
}

impl<S: AsyncWrite> Writer<S> {
    pub async fn write(&mut self, data: &[u8]) -> Result<(), Error> {
        timeout(self.deadline, async {
            self.half.write_all(data).await?;
            self.half.flush().await
        })
        .await
        .map_err(|_| Error::IO(io::ErrorKind::TimedOut.into()))??;
        Ok(())
    }

    pub async fn close(&mut self) {
        let _ = self.half.shutdown().await;
    }
}
