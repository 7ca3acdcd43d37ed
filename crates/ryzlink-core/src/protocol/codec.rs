//! Line framing for modem output
//!
//! The modem terminates response lines with `\r\n`, but a single read from the
//! UART may carry half a line or several lines at once. This decoder
//! accumulates bytes until a `\n` is seen and yields the raw line, terminator
//! included. Bytes without a terminator stay in the read buffer, where the
//! transport can pick them up after an inactivity timeout (the `> ` payload
//! prompt never gets a line terminator).

use bytes::BytesMut;
use std::io;
use tokio_util::codec::Decoder;

use super::MAX_LINE_LENGTH;

/// Splits the inbound byte stream on `\n`
#[derive(Debug, Clone, Copy)]
pub struct ModemLineCodec {
    max_length: usize,
}

impl ModemLineCodec {
    /// Create a codec with the default maximum line length
    pub fn new() -> Self {
        Self {
            max_length: MAX_LINE_LENGTH,
        }
    }

    /// Create a codec that hands over unterminated data once it exceeds `max_length`
    pub fn with_max_length(max_length: usize) -> Self {
        Self {
            max_length: max_length.max(1),
        }
    }
}

impl Default for ModemLineCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for ModemLineCodec {
    type Item = BytesMut;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<BytesMut>, io::Error> {
        if let Some(pos) = src.iter().position(|b| *b == b'\n') {
            return Ok(Some(src.split_to(pos + 1)));
        }
        if src.len() >= self.max_length {
            // Runaway output without terminators: deliver it in chunks
            return Ok(Some(src.split_to(self.max_length)));
        }
        Ok(None)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<BytesMut>, io::Error> {
        match self.decode(src)? {
            Some(line) => Ok(Some(line)),
            None if src.is_empty() => Ok(None),
            None => Ok(Some(src.split())),
        }
    }
}
