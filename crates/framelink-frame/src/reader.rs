use std::io::{ErrorKind, Read};

use bytes::{Bytes, BytesMut};

use crate::codec::{FrameConfig, LEN_PREFIX_SIZE};
use crate::error::{FrameError, Result};

/// Upper bound for a single underlying read while accumulating a payload.
pub const READ_CHUNK_SIZE: usize = 4096;

/// Reads complete length-prefixed frames from any `Read` stream.
///
/// Handles partial reads internally — however the transport fragments or
/// coalesces segments, callers always get complete payloads in the order
/// they were written.
pub struct FrameReader<T> {
    inner: T,
    config: FrameConfig,
}

impl<T: Read> FrameReader<T> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self { inner, config }
    }

    /// Read the next complete frame (blocking).
    ///
    /// Returns `Ok(None)` when the peer performed an orderly shutdown at a
    /// frame boundary (EOF before the first prefix byte). EOF after a
    /// partial prefix or mid-payload is `Err(FrameError::ConnectionClosed)`.
    pub fn read_frame(&mut self) -> Result<Option<Bytes>> {
        let mut prefix = [0u8; LEN_PREFIX_SIZE];
        if !self.read_prefix(&mut prefix)? {
            return Ok(None);
        }

        let len = u32::from_be_bytes(prefix) as usize;
        if len > self.config.max_payload_size {
            return Err(FrameError::PayloadTooLarge {
                size: len,
                max: self.config.max_payload_size,
            });
        }

        let mut payload = BytesMut::with_capacity(len);
        let mut chunk = [0u8; READ_CHUNK_SIZE];
        while payload.len() < len {
            let want = (len - payload.len()).min(READ_CHUNK_SIZE);
            match self.inner.read(&mut chunk[..want]) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => payload.extend_from_slice(&chunk[..n]),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }

        Ok(Some(payload.freeze()))
    }

    /// Fill the length prefix. `Ok(false)` means EOF before the first byte.
    fn read_prefix(&mut self, prefix: &mut [u8; LEN_PREFIX_SIZE]) -> Result<bool> {
        let mut filled = 0usize;
        while filled < LEN_PREFIX_SIZE {
            match self.inner.read(&mut prefix[filled..]) {
                Ok(0) if filled == 0 => return Ok(false),
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => filled += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
        Ok(true)
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current frame reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use bytes::{BufMut, BytesMut};

    use super::*;
    use crate::codec::encode_frame;

    #[test]
    fn read_single_frame() {
        let mut wire = BytesMut::new();
        encode_frame(b"hello", &mut wire).unwrap();

        let mut reader = FrameReader::new(Cursor::new(wire.to_vec()));
        let payload = reader.read_frame().unwrap().unwrap();

        assert_eq!(payload.as_ref(), b"hello");
    }

    #[test]
    fn read_multiple_frames_in_order() {
        let mut wire = BytesMut::new();
        encode_frame(b"one", &mut wire).unwrap();
        encode_frame(b"two", &mut wire).unwrap();
        encode_frame(b"three", &mut wire).unwrap();

        let mut reader = FrameReader::new(Cursor::new(wire.to_vec()));

        assert_eq!(reader.read_frame().unwrap().unwrap().as_ref(), b"one");
        assert_eq!(reader.read_frame().unwrap().unwrap().as_ref(), b"two");
        assert_eq!(reader.read_frame().unwrap().unwrap().as_ref(), b"three");
        assert!(reader.read_frame().unwrap().is_none());
    }

    #[test]
    fn payload_spanning_many_chunks() {
        let payload: Vec<u8> = (0..READ_CHUNK_SIZE * 3 + 123)
            .map(|i| (i % 251) as u8)
            .collect();
        let mut wire = BytesMut::new();
        encode_frame(&payload, &mut wire).unwrap();

        let mut reader = FrameReader::new(Cursor::new(wire.to_vec()));
        let got = reader.read_frame().unwrap().unwrap();

        assert_eq!(got.len(), payload.len());
        assert_eq!(got.as_ref(), payload.as_slice());
    }

    #[test]
    fn byte_by_byte_delivery_reassembles() {
        let mut wire = BytesMut::new();
        encode_frame(b"slow", &mut wire).unwrap();

        let mut reader = FrameReader::new(ByteByByteReader {
            bytes: wire.to_vec(),
            pos: 0,
        });

        let payload = reader.read_frame().unwrap().unwrap();
        assert_eq!(payload.as_ref(), b"slow");
    }

    #[test]
    fn eof_at_frame_boundary_is_clean() {
        let mut reader = FrameReader::new(Cursor::new(Vec::<u8>::new()));
        assert!(reader.read_frame().unwrap().is_none());
    }

    #[test]
    fn eof_inside_prefix_is_a_fault() {
        let mut reader = FrameReader::new(Cursor::new(vec![0x00, 0x00]));
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
    }

    #[test]
    fn eof_inside_payload_is_a_fault() {
        let mut wire = BytesMut::new();
        wire.put_u32(16);
        wire.put_slice(b"only-part");

        let mut reader = FrameReader::new(Cursor::new(wire.to_vec()));
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
    }

    #[test]
    fn empty_frame_yields_empty_payload() {
        let mut wire = BytesMut::new();
        encode_frame(b"", &mut wire).unwrap();
        encode_frame(b"after", &mut wire).unwrap();

        let mut reader = FrameReader::new(Cursor::new(wire.to_vec()));
        assert!(reader.read_frame().unwrap().unwrap().is_empty());
        assert_eq!(reader.read_frame().unwrap().unwrap().as_ref(), b"after");
    }

    #[test]
    fn oversized_frame_rejected_by_config() {
        let mut wire = BytesMut::new();
        wire.put_u32(1024);

        let cfg = FrameConfig {
            max_payload_size: 16,
        };
        let mut reader = FrameReader::with_config(Cursor::new(wire.to_vec()), cfg);
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::PayloadTooLarge { .. }));
    }

    #[test]
    fn interrupted_read_retries() {
        let mut wire = BytesMut::new();
        encode_frame(b"ok", &mut wire).unwrap();

        let mut reader = FrameReader::new(InterruptedThenData {
            interrupted: false,
            bytes: wire.to_vec(),
            pos: 0,
        });

        let payload = reader.read_frame().unwrap().unwrap();
        assert_eq!(payload.as_ref(), b"ok");
    }

    #[test]
    fn other_io_errors_propagate() {
        let mut reader = FrameReader::new(FailingReader);
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::Io(e) if e.kind() == ErrorKind::ConnectionReset));
    }

    #[test]
    fn accessors_and_into_inner() {
        let mut reader = FrameReader::new(Cursor::new(Vec::<u8>::new()));
        let _ = reader.get_ref();
        let _ = reader.get_mut();
        assert_eq!(
            reader.config().max_payload_size,
            crate::codec::MAX_WIRE_PAYLOAD
        );
        let _inner = reader.into_inner();
    }

    struct ByteByByteReader {
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for ByteByByteReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pos >= self.bytes.len() || buf.is_empty() {
                return Ok(0);
            }
            buf[0] = self.bytes[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }

    struct InterruptedThenData {
        interrupted: bool,
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for InterruptedThenData {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if !self.interrupted {
                self.interrupted = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            let remaining = self.bytes.len() - self.pos;
            let n = remaining.min(buf.len());
            buf[..n].copy_from_slice(&self.bytes[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    struct FailingReader;

    impl Read for FailingReader {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::from(ErrorKind::ConnectionReset))
        }
    }
}
