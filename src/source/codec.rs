//! Line codec for chat source output streams.
//!
//! Wraps [`tokio_util::codec::AnyDelimiterCodec`] with a maximum line
//! length so a misbehaving source that never writes a newline cannot grow
//! the read buffer without bound. Lines are decoded lossily: a stray
//! invalid UTF-8 byte from the source costs one replacement character,
//! not the stream.

use bytes::{Bytes, BytesMut};
use tokio_util::codec::{AnyDelimiterCodec, AnyDelimiterCodecError, Decoder};
use tracing::warn;

use crate::{AppError, Result};

/// Maximum line length accepted from a chat source: 64 KiB.
pub const MAX_LINE_BYTES: usize = 65_536;

/// Newline-delimited text codec for chat source stdout/stderr.
///
/// Yields each line without its terminator; a trailing `\r` is removed.
///
/// A line longer than the limit is dropped with a warning and decoding
/// resumes after its newline. The error is not surfaced because
/// [`FramedRead`](tokio_util::codec::FramedRead) ends the stream after the
/// first decoder error, and one oversized line must not end the stream.
#[derive(Debug)]
pub struct ChatLineCodec {
    inner: AnyDelimiterCodec,
    oversized_lines: u64,
}

impl ChatLineCodec {
    /// Create a codec with the default [`MAX_LINE_BYTES`] limit.
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_length(MAX_LINE_BYTES)
    }

    /// Create a codec with a custom line limit.
    #[must_use]
    pub fn with_max_length(max_length: usize) -> Self {
        Self {
            inner: AnyDelimiterCodec::new_with_max_length(b"\n".to_vec(), Vec::new(), max_length),
            oversized_lines: 0,
        }
    }

    /// Number of lines dropped for exceeding the length limit.
    #[must_use]
    pub fn oversized_lines(&self) -> u64 {
        self.oversized_lines
    }
}

impl Default for ChatLineCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for ChatLineCodec {
    type Item = String;
    type Error = AppError;

    /// Decode the next newline-terminated line from `src`.
    ///
    /// Returns `Ok(None)` while no complete line is buffered.
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        loop {
            match self.inner.decode(src) {
                Ok(chunk) => return Ok(chunk.map(|bytes| into_line(&bytes))),
                Err(AnyDelimiterCodecError::MaxChunkLengthExceeded) => {
                    // The inner codec is now discarding up to the next newline.
                    self.oversized_lines += 1;
                    warn!(
                        dropped = self.oversized_lines,
                        "chat source line exceeded max length, dropping"
                    );
                }
                Err(AnyDelimiterCodecError::Io(err)) => return Err(AppError::Io(err.to_string())),
            }
        }
    }

    /// Decode the final unterminated line when the stream reaches EOF.
    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        loop {
            match self.inner.decode_eof(src) {
                Ok(chunk) => return Ok(chunk.map(|bytes| into_line(&bytes))),
                Err(AnyDelimiterCodecError::MaxChunkLengthExceeded) => {
                    self.oversized_lines += 1;
                    warn!(
                        dropped = self.oversized_lines,
                        "chat source line exceeded max length at EOF, dropping"
                    );
                }
                Err(AnyDelimiterCodecError::Io(err)) => return Err(AppError::Io(err.to_string())),
            }
        }
    }
}

fn into_line(bytes: &Bytes) -> String {
    let raw = bytes.strip_suffix(b"\r").unwrap_or(&bytes[..]);
    String::from_utf8_lossy(raw).into_owned()
}
