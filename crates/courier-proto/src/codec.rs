//! Newline-delimited JSON framing for the robot serial link.
//!
//! Each frame is one UTF-8 JSON object followed by `\n`. Serial drivers are
//! free to split or coalesce writes, so the decoder keeps partial frames
//! between reads and only decodes complete lines.

use bytes::{Bytes, BytesMut};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;
use thiserror::Error;

/// Frames longer than this without a terminator are dropped.
pub const MAX_FRAME_LEN: usize = 4096;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("frame is not valid UTF-8")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("malformed frame: {0}")]
    Json(#[from] serde_json::Error),

    #[error("frame exceeded {max} bytes without a terminator ({len} buffered)")]
    TooLong { len: usize, max: usize },
}

pub fn encode_frame<T: Serialize>(msg: &T) -> Result<Bytes, serde_json::Error> {
    let mut out = serde_json::to_vec(msg)?;
    out.push(b'\n');
    Ok(Bytes::from(out))
}

#[derive(Debug)]
pub struct FrameDecoder<T> {
    buf: BytesMut,
    max_len: usize,
    // Set after an overflow until the dropped frame's terminator shows up.
    discarding: bool,
    _frame: PhantomData<fn() -> T>,
}

impl<T> Default for FrameDecoder<T> {
    fn default() -> Self {
        Self::with_max_len(MAX_FRAME_LEN)
    }
}

impl<T> FrameDecoder<T> {
    pub fn with_max_len(max_len: usize) -> Self {
        Self { buf: BytesMut::with_capacity(256), max_len, discarding: false, _frame: PhantomData }
    }

    pub fn buffered(&self) -> usize {
        self.buf.len()
    }
}

impl<T: DeserializeOwned> FrameDecoder<T> {
    /// Appends a chunk and returns every frame it completed, in arrival order.
    /// A frame longer than the limit yields one `TooLong` and is skipped up
    /// to its terminator, however the bytes were split across chunks.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<Result<T, DecodeError>> {
        self.buf.extend_from_slice(chunk);
        let mut out = Vec::new();

        while let Some(pos) = self.buf.iter().position(|b| *b == b'\n') {
            let line = self.buf.split_to(pos + 1);
            if self.discarding {
                self.discarding = false;
                continue;
            }
            if pos > self.max_len {
                out.push(Err(DecodeError::TooLong { len: pos, max: self.max_len }));
                continue;
            }
            if let Some(frame) = decode_line(&line[..pos]) {
                out.push(frame);
            }
        }

        if self.buf.len() > self.max_len {
            let len = self.buf.len();
            self.buf.clear();
            if !self.discarding {
                self.discarding = true;
                out.push(Err(DecodeError::TooLong { len, max: self.max_len }));
            }
        }
        out
    }

    /// End of stream: decode whatever is left as a final unterminated frame.
    pub fn finish(&mut self) -> Option<Result<T, DecodeError>> {
        let rest = self.buf.split();
        if std::mem::take(&mut self.discarding) {
            return None;
        }
        decode_line(&rest[..])
    }
}

fn decode_line<T: DeserializeOwned>(line: &[u8]) -> Option<Result<T, DecodeError>> {
    let text = match std::str::from_utf8(line) {
        Ok(s) => s.trim(),
        Err(e) => return Some(Err(e.into())),
    };
    if text.is_empty() {
        return None;
    }
    Some(serde_json::from_str(text).map_err(DecodeError::from))
}
