use bytes::{BufMut, BytesMut};

use crate::error::{FrameError, Result};

/// Length prefix size: 4 bytes, unsigned big-endian.
pub const LEN_PREFIX_SIZE: usize = 4;

/// Hard wire-format cap: the payload length must fit the 32-bit prefix.
pub const MAX_WIRE_PAYLOAD: usize = u32::MAX as usize;

/// Encode a payload into the wire format.
///
/// Wire format:
/// ```text
/// ┌────────────────┬─────────────────┐
/// │ Length (4B BE) │ Payload         │
/// │ unsigned       │ (Length bytes)  │
/// └────────────────┴─────────────────┘
/// ```
pub fn encode_frame(payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    let prefix = encode_len_prefix(payload.len())?;
    dst.reserve(LEN_PREFIX_SIZE + payload.len());
    dst.put_slice(&prefix);
    dst.put_slice(payload);
    Ok(())
}

/// Encode just the length prefix for a payload of `payload_len` bytes.
///
/// Lets callers stream the payload itself without staging a second copy of
/// the whole frame.
pub fn encode_len_prefix(payload_len: usize) -> Result<[u8; LEN_PREFIX_SIZE]> {
    if payload_len > MAX_WIRE_PAYLOAD {
        return Err(FrameError::PayloadTooLarge {
            size: payload_len,
            max: MAX_WIRE_PAYLOAD,
        });
    }
    Ok((payload_len as u32).to_be_bytes())
}

/// Configuration for the frame codec.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum payload size in bytes. Default: the wire-format cap.
    pub max_payload_size: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_payload_size: MAX_WIRE_PAYLOAD,
        }
    }
}
