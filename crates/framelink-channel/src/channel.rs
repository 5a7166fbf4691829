use std::net::{Shutdown, SocketAddr, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use bytes::Bytes;
use framelink_frame::{FrameError, FrameReader, FrameWriter};
use framelink_transport::{classify_io_error, Disposition, TcpAcceptor};
use tracing::{debug, error, info, info_span, warn, Span};

use crate::error::{ChannelError, Result};

/// Application callback receiving each complete payload.
pub type DataCallback = Arc<dyn Fn(Bytes) + Send + Sync>;

/// Application callback receiving peer-link faults.
pub type ErrorCallback = Arc<dyn Fn(ChannelError) + Send + Sync>;

/// Base delay before retrying a failed accept; doubles up to the cap and
/// resets after a successful accept.
const ACCEPT_RETRY_BASE: Duration = Duration::from_millis(50);
const ACCEPT_RETRY_CAP: Duration = Duration::from_secs(1);

/// A bidirectional one-peer TCP message channel.
///
/// Each channel can listen for a single inbound connection
/// ([`start_accepting`](Self::start_accepting)), dial outbound
/// ([`connect`](Self::connect)), or both; whichever way the peer link is
/// established, [`send`](Self::send) and the receive loop behave
/// identically. Payloads are framed with a 4-byte big-endian length prefix
/// and delivered whole, in send order, to the data callback.
///
/// Callbacks run inline on the loop thread that detected the event: a slow
/// data callback stalls frame delivery (and, indirectly, acceptance of a
/// replacement peer), never reorders it.
pub struct Channel {
    inner: Arc<ChannelInner>,
}

struct ChannelInner {
    local_addr: SocketAddr,
    accepting: AtomicBool,
    receiving: AtomicBool,
    closed: AtomicBool,
    acceptor: Mutex<Option<Arc<TcpAcceptor>>>,
    peer: Mutex<Option<TcpStream>>,
    /// Serializes concurrent senders so frames never interleave on the wire.
    /// Held only for the duration of one framed write, never by `close`.
    send_lock: Mutex<()>,
    on_data: Mutex<Option<DataCallback>>,
    on_error: Mutex<Option<ErrorCallback>>,
    span: Span,
}

/// Callback panics must not poison channel state; recover the guard.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Channel {
    /// Create a channel identified by `local_addr`, the address
    /// [`start_accepting`](Self::start_accepting) will listen on.
    ///
    /// Construction does nothing with the network; the channel becomes
    /// active once the caller starts accepting and/or connects.
    pub fn new(local_addr: SocketAddr) -> Self {
        Self {
            inner: Arc::new(ChannelInner {
                local_addr,
                accepting: AtomicBool::new(false),
                receiving: AtomicBool::new(false),
                closed: AtomicBool::new(false),
                acceptor: Mutex::new(None),
                peer: Mutex::new(None),
                send_lock: Mutex::new(()),
                on_data: Mutex::new(None),
                on_error: Mutex::new(None),
                span: info_span!("channel", local = %local_addr),
            }),
        }
    }

    /// The address this channel was constructed with.
    pub fn local_addr(&self) -> SocketAddr {
        self.inner.local_addr
    }

    /// Register the data-received handler. Last registration wins.
    pub fn on_data_received(&self, handler: impl Fn(Bytes) + Send + Sync + 'static) {
        *lock(&self.inner.on_data) = Some(Arc::new(handler));
    }

    /// Register the connection-error handler. Last registration wins.
    pub fn on_connection_error(&self, handler: impl Fn(ChannelError) + Send + Sync + 'static) {
        *lock(&self.inner.on_error) = Some(Arc::new(handler));
    }

    /// Bind the local address with a listen backlog of one and start the
    /// accept loop on its own thread.
    ///
    /// Binding happens synchronously so bind failures surface here, not
    /// inside the loop. Returns the bound address, which differs from the
    /// constructed one when binding port 0.
    pub fn start_accepting(&self) -> Result<SocketAddr> {
        let _span = self.inner.span.enter();

        let acceptor = Arc::new(TcpAcceptor::bind(self.inner.local_addr)?);
        let bound = acceptor.local_addr();
        *lock(&self.inner.acceptor) = Some(Arc::clone(&acceptor));
        self.inner.accepting.store(true, Ordering::SeqCst);
        info!(%bound, "start accepting");

        let inner = Arc::clone(&self.inner);
        thread::Builder::new()
            .name("framelink-accept".into())
            .spawn(move || accept_loop(&inner, &acceptor))
            .map_err(|e| ChannelError::Transport(e.into()))?;

        Ok(bound)
    }

    /// Connect to a remote listener (blocking) and start receiving from the
    /// resulting socket.
    ///
    /// Connect failures (refused, unreachable) return `Err` to the caller
    /// directly; no receive loop exists yet to report through. Fails with
    /// [`ChannelError::PeerActive`] if a peer link is already up.
    pub fn connect(&self, remote_addr: SocketAddr) -> Result<()> {
        let _span = self.inner.span.enter();

        if lock(&self.inner.peer).is_some() {
            return Err(ChannelError::PeerActive);
        }

        info!(%remote_addr, "connecting");
        let stream = framelink_transport::connect(remote_addr)?;
        let peer_addr = stream
            .peer_addr()
            .map_err(|e| ChannelError::Transport(e.into()))?;
        info!(%peer_addr, "connected");

        install_peer(&self.inner, stream, peer_addr)
    }

    /// Frame and send one payload to the connected peer (blocking).
    ///
    /// The call never panics and never returns an error: failures
    /// (including sending on a channel that has no peer) are logged and
    /// forwarded to the connection-error callback, and are not retried.
    /// Safe to call concurrently with the receive loop (full duplex) and
    /// with other senders (frames are serialized, never interleaved).
    pub fn send(&self, payload: &[u8]) {
        let _span = self.inner.span.enter();
        let _serialized = lock(&self.inner.send_lock);

        let stream = {
            let guard = lock(&self.inner.peer);
            match guard.as_ref() {
                Some(stream) => stream
                    .try_clone()
                    .map_err(|e| ChannelError::Transport(e.into())),
                None => Err(ChannelError::NotConnected),
            }
        };

        let result = stream.and_then(|stream| {
            FrameWriter::new(stream)
                .send(payload)
                .map_err(ChannelError::from)
        });

        match result {
            Ok(()) => debug!(len = payload.len(), "sent frame"),
            Err(err) => {
                error!(%err, "send failed");
                deliver_error(&self.inner, err);
            }
        }
    }

    /// Stop accepting and receiving, then shut both sockets down.
    ///
    /// Idempotent; a channel that never listened or connected closes
    /// without error. Does not join the loop threads — they observe the
    /// flipped flags or the closed-handle signal on their next blocking
    /// call. After `close` returns, no further data or error callbacks
    /// fire for this channel.
    pub fn close(&self) {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let _span = self.inner.span.enter();
        info!("closing");

        self.inner.accepting.store(false, Ordering::SeqCst);
        self.inner.receiving.store(false, Ordering::SeqCst);

        if let Some(stream) = lock(&self.inner.peer).take() {
            let _ = stream.shutdown(Shutdown::Both);
        }
        if let Some(acceptor) = lock(&self.inner.acceptor).take() {
            acceptor.shutdown();
        }
    }

    /// Whether the accept loop is (meant to be) running.
    pub fn is_accepting(&self) -> bool {
        self.inner.accepting.load(Ordering::SeqCst)
    }

    /// Whether a receive loop is (meant to be) running.
    pub fn is_receiving(&self) -> bool {
        self.inner.receiving.load(Ordering::SeqCst)
    }

    /// Whether a peer link is currently up. Applications that register no
    /// callbacks can poll this to detect disconnects.
    pub fn has_peer(&self) -> bool {
        lock(&self.inner.peer).is_some()
    }

    /// Whether `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channel")
            .field("local_addr", &self.inner.local_addr)
            .field("accepting", &self.is_accepting())
            .field("receiving", &self.is_receiving())
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Record the new peer socket and start its receive loop.
///
/// Exactly one receive loop runs per peer socket; the loop owns a cloned
/// handle so `close` can shut the original down without contending with it.
fn install_peer(
    inner: &Arc<ChannelInner>,
    stream: TcpStream,
    peer_addr: SocketAddr,
) -> Result<()> {
    let loop_stream = stream
        .try_clone()
        .map_err(|e| ChannelError::Transport(e.into()))?;

    {
        let mut guard = lock(&inner.peer);
        if guard.is_some() {
            return Err(ChannelError::PeerActive);
        }
        *guard = Some(stream);
    }
    inner.receiving.store(true, Ordering::SeqCst);

    let loop_inner = Arc::clone(inner);
    let spawned = thread::Builder::new()
        .name("framelink-recv".into())
        .spawn(move || receive_loop(&loop_inner, loop_stream, peer_addr));

    if let Err(err) = spawned {
        lock(&inner.peer).take();
        inner.receiving.store(false, Ordering::SeqCst);
        return Err(ChannelError::Transport(err.into()));
    }
    Ok(())
}

/// Accept loop: block on accept while the accepting flag holds.
///
/// Accept failures never reach the connection-error callback; that one is
/// reserved for the peer data path. A failure caused by our own close is
/// swallowed, anything else is logged and retried with capped exponential
/// backoff. While a peer link is active, further inbound connections are
/// rejected to keep a single live peer per channel.
fn accept_loop(inner: &Arc<ChannelInner>, acceptor: &TcpAcceptor) {
    let _span = inner.span.clone().entered();
    let mut retry_delay = ACCEPT_RETRY_BASE;

    while inner.accepting.load(Ordering::SeqCst) {
        match acceptor.accept() {
            Ok((stream, peer_addr)) => {
                retry_delay = ACCEPT_RETRY_BASE;

                if !inner.accepting.load(Ordering::SeqCst) {
                    let _ = stream.shutdown(Shutdown::Both);
                    break;
                }
                if lock(&inner.peer).is_some() {
                    warn!(%peer_addr, "rejecting connection: a peer is already active");
                    let _ = stream.shutdown(Shutdown::Both);
                    continue;
                }

                info!(%peer_addr, "accepted connection");
                if let Err(err) = install_peer(inner, stream, peer_addr) {
                    error!(%err, "failed to start receive loop");
                }
            }
            Err(err) => {
                let closing = !inner.accepting.load(Ordering::SeqCst);
                match classify_io_error(err.io(), closing) {
                    Disposition::ClosedByUs => {
                        info!("listener closed, stopped accepting");
                        return;
                    }
                    _ if closing => return,
                    _ => {
                        error!(%err, retry_in_ms = retry_delay.as_millis() as u64, "accept failed");
                        thread::sleep(retry_delay);
                        retry_delay = (retry_delay * 2).min(ACCEPT_RETRY_CAP);
                    }
                }
            }
        }
    }
    debug!("accept loop exited");
}

/// Receive loop: decode frames from one peer socket until EOF, a fault, or
/// close. Payload delivery happens inline on this thread.
fn receive_loop(inner: &Arc<ChannelInner>, stream: TcpStream, peer_addr: SocketAddr) {
    let _span = inner.span.clone().entered();
    debug!(%peer_addr, "start receiving");

    let mut reader = FrameReader::new(stream);
    while inner.receiving.load(Ordering::SeqCst) {
        match reader.read_frame() {
            Ok(Some(payload)) => {
                if payload.is_empty() {
                    continue;
                }
                debug!(len = payload.len(), "received frame");
                deliver_data(inner, payload);
            }
            Ok(None) => {
                if inner.receiving.load(Ordering::SeqCst) {
                    info!(%peer_addr, "peer closed connection");
                } else {
                    info!("socket closed, stopped receiving");
                }
                break;
            }
            Err(err) => {
                let closing = !inner.receiving.load(Ordering::SeqCst);
                let disposition = match &err {
                    FrameError::Io(io) => classify_io_error(io, closing),
                    FrameError::ConnectionClosed if closing => Disposition::ClosedByUs,
                    _ => Disposition::TransportFault,
                };
                match disposition {
                    Disposition::ClosedByUs => info!("socket closed, stopped receiving"),
                    Disposition::PeerClosed => info!(%peer_addr, "peer closed connection"),
                    Disposition::TransportFault => {
                        error!(%err, "receive failed");
                        deliver_error(inner, err.into());
                    }
                }
                break;
            }
        }
    }

    release_peer(inner);
    debug!(%peer_addr, "receive loop exited");
}

/// Drop tracking of the current peer so a new one can be accepted.
fn release_peer(inner: &ChannelInner) {
    inner.receiving.store(false, Ordering::SeqCst);
    if let Some(stream) = lock(&inner.peer).take() {
        let _ = stream.shutdown(Shutdown::Both);
    }
}

fn deliver_data(inner: &ChannelInner, payload: Bytes) {
    let handler = lock(&inner.on_data).clone();
    if let Some(handler) = handler {
        // Re-checked after taking the handler: a concurrent close means
        // no further callbacks for this channel.
        if inner.closed.load(Ordering::SeqCst) {
            return;
        }
        handler(payload);
    }
}

fn deliver_error(inner: &ChannelInner, err: ChannelError) {
    let handler = lock(&inner.on_error).clone();
    if let Some(handler) = handler {
        if inner.closed.load(Ordering::SeqCst) {
            return;
        }
        handler(err);
    }
}
