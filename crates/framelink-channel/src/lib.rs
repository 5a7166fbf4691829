//! High-level one-peer TCP message channel.
//!
//! This is the "just works" layer. A [`Channel`] can listen for a single
//! inbound peer, dial outbound, or both; once a link exists it delivers
//! complete framed payloads to a data callback and faults to an error
//! callback, from its own loop threads.

pub mod channel;
pub mod error;

pub use channel::{Channel, DataCallback, ErrorCallback};
pub use error::{ChannelError, Result};
