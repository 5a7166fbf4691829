use std::io;

/// Outcome classification for a failed blocking socket call.
///
/// Every error returned by a blocking accept/read/write passes through
/// [`classify_io_error`] exactly once; the accept and receive loops act on
/// the resulting variant and never look at raw error codes themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// The owning channel closed the handle out from under the call.
    /// Treated as clean shutdown, never reported as a fault.
    ClosedByUs,
    /// The remote side performed an orderly shutdown.
    PeerClosed,
    /// Anything else: reset, broken pipe, timeout.
    TransportFault,
}

/// True if `err` is the platform's "operation on a closed handle" signal.
///
/// A socket shut down by the same process surfaces from the still-blocked
/// call as `EBADF` or `EINVAL` on unix; std maps some of these onto
/// `ErrorKind::NotConnected` / `InvalidInput` depending on the call site.
pub fn is_closed_handle(err: &io::Error) -> bool {
    if matches!(
        err.kind(),
        io::ErrorKind::NotConnected | io::ErrorKind::InvalidInput
    ) {
        return true;
    }
    #[cfg(unix)]
    {
        matches!(err.raw_os_error(), Some(libc::EBADF | libc::EINVAL))
    }
    #[cfg(not(unix))]
    {
        false
    }
}

/// Classify a blocking-call failure.
///
/// `closing` is whether the owning channel had already requested closing
/// when the error surfaced. It dominates: once close was asked for, every
/// subsequent failure on that handle is intentional.
pub fn classify_io_error(err: &io::Error, closing: bool) -> Disposition {
    if closing || is_closed_handle(err) {
        Disposition::ClosedByUs
    } else if err.kind() == io::ErrorKind::UnexpectedEof {
        Disposition::PeerClosed
    } else {
        Disposition::TransportFault
    }
}
