//! Bidirectional length-prefixed TCP message channels.
//!
//! framelink frames arbitrary byte payloads with a fixed 4-byte unsigned
//! big-endian length prefix, so discrete messages written to a stream
//! socket are reassembled exactly as sent, however the transport fragments
//! or coalesces segments. Each [`channel::Channel`] is symmetric: it can
//! listen for one inbound peer and dial outbound, and once a link exists
//! both sides share identical send/receive semantics.
//!
//! # Crate Structure
//!
//! - [`transport`] — TCP acceptor/connector and error classification
//! - [`frame`] — the length-prefix wire codec plus blocking reader/writer
//! - [`channel`] — the high-level channel with accept and receive loops

/// Re-export transport types.
pub mod transport {
    pub use framelink_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use framelink_frame::*;
}

/// Re-export channel types.
pub mod channel {
    pub use framelink_channel::*;
}
