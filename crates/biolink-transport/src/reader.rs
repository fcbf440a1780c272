//! Replay source for any async reader
//!
//! Feeds a capture file (or an in-memory buffer) through the same pipeline
//! a live port uses. Chunk size is configurable so replays can mimic the
//! fragmentation of a real serial link.

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::debug;

use crate::traits::{ByteSource, SourceEvent};

/// Default read size, matching the serial reader task
pub const DEFAULT_CHUNK_SIZE: usize = 1024;

/// Byte source over an [`AsyncRead`]
pub struct ReaderSource<R> {
    reader: R,
    buf: Vec<u8>,
    total: u64,
    finished: bool,
}

impl<R> ReaderSource<R>
where
    R: AsyncRead + Unpin + Send,
{
    pub fn new(reader: R) -> Self {
        Self::with_chunk_size(reader, DEFAULT_CHUNK_SIZE)
    }

    /// Read at most `chunk_size` bytes per event (minimum 1)
    pub fn with_chunk_size(reader: R, chunk_size: usize) -> Self {
        Self {
            reader,
            buf: vec![0u8; chunk_size.max(1)],
            total: 0,
            finished: false,
        }
    }

    /// Bytes read so far
    pub fn total_read(&self) -> u64 {
        self.total
    }
}

#[async_trait]
impl<R> ByteSource for ReaderSource<R>
where
    R: AsyncRead + Unpin + Send,
{
    async fn recv(&mut self) -> Option<SourceEvent> {
        if self.finished {
            return None;
        }

        match self.reader.read(&mut self.buf).await {
            Ok(0) => {
                debug!(total = self.total, "reader source exhausted");
                self.finished = true;
                Some(SourceEvent::Disconnected { reason: None })
            }
            Ok(n) => {
                self.total += n as u64;
                Some(SourceEvent::Data(Bytes::copy_from_slice(&self.buf[..n])))
            }
            Err(e) => {
                self.finished = true;
                Some(SourceEvent::Disconnected {
                    reason: Some(e.to_string()),
                })
            }
        }
    }
}
