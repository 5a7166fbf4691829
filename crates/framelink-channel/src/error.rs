/// Errors surfaced by channel operations or forwarded to the
/// connection-error callback.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] framelink_transport::TransportError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] framelink_frame::FrameError),

    /// An operation needed a connected peer and there was none.
    #[error("no peer connected")]
    NotConnected,

    /// A peer link is already active on this channel.
    #[error("a peer is already connected")]
    PeerActive,
}

pub type Result<T> = std::result::Result<T, ChannelError>;
