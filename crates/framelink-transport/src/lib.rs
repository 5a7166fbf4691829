//! TCP transport primitives for framelink.
//!
//! Provides the blocking socket layer everything else builds on:
//! - [`TcpAcceptor`] — a listener restricted to one pending connection
//! - [`connect`] — blocking outbound connect
//! - [`Disposition`] — classification of blocking-call failures, so the
//!   layers above never inspect raw platform error codes

pub mod disposition;
pub mod error;
pub mod tcp;

pub use disposition::{classify_io_error, is_closed_handle, Disposition};
pub use error::{Result, TransportError};
pub use tcp::{connect, TcpAcceptor};
