use std::io::{ErrorKind, Write};

use crate::codec::{encode_len_prefix, FrameConfig};
use crate::error::{FrameError, Result};

/// Writes complete length-prefixed frames to any `Write` stream.
///
/// A frame is written whole or not at all: a short write that cannot be
/// completed fails the entire send, never reports partial success.
pub struct FrameWriter<T> {
    inner: T,
    config: FrameConfig,
}

impl<T: Write> FrameWriter<T> {
    /// Create a new frame writer with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame writer with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self { inner, config }
    }

    /// Encode and send one payload (blocking, all-or-fail).
    ///
    /// The prefix is streamed from a stack buffer and the payload slice is
    /// written directly, so large payloads are never copied into a staging
    /// buffer.
    pub fn send(&mut self, payload: &[u8]) -> Result<()> {
        if payload.len() > self.config.max_payload_size {
            return Err(FrameError::PayloadTooLarge {
                size: payload.len(),
                max: self.config.max_payload_size,
            });
        }

        let prefix = encode_len_prefix(payload.len())?;
        self.write_all(&prefix)?;
        self.write_all(payload)?;
        self.flush()
    }

    fn write_all(&mut self, buf: &[u8]) -> Result<()> {
        let mut offset = 0usize;
        while offset < buf.len() {
            match self.inner.write(&buf[offset..]) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
        Ok(())
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current frame writer configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}
