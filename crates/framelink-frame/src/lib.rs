//! Length-prefixed message framing for framelink.
//!
//! Every message is framed as a 4-byte unsigned big-endian payload length
//! followed by the payload bytes. No magic, no version byte, no checksum:
//! the fixed prefix avoids delimiter-escaping problems and supports
//! arbitrary binary payloads at the cost of a hard ~4 GiB message cap.
//!
//! No partial reads, no buffer management in user code.

pub mod codec;
pub mod error;
pub mod reader;
pub mod writer;

pub use codec::{encode_frame, encode_len_prefix, FrameConfig, LEN_PREFIX_SIZE, MAX_WIRE_PAYLOAD};
pub use error::{FrameError, Result};
pub use reader::{FrameReader, READ_CHUNK_SIZE};
pub use writer::FrameWriter;
