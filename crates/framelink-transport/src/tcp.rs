use std::net::{SocketAddr, TcpListener, TcpStream};

use socket2::{Domain, Protocol, Socket, Type};
use tracing::{debug, info};

use crate::error::{Result, TransportError};

/// Pending-connection backlog: exactly one pre-accept connection. Further
/// inbound attempts are queued or refused by the OS, never seen by us.
const ACCEPT_BACKLOG: i32 = 1;

/// TCP listener restricted to a single pending connection.
///
/// The std listener API offers no control over the listen backlog, so the
/// socket is built by hand and then handed to `std::net::TcpListener`.
pub struct TcpAcceptor {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl TcpAcceptor {
    /// Bind and listen on `addr` with a backlog of one.
    ///
    /// `SO_REUSEADDR` is set so a channel can rebind its address right
    /// after closing. Binding port 0 picks an ephemeral port; the actual
    /// address is available via [`local_addr`](Self::local_addr).
    pub fn bind(addr: SocketAddr) -> Result<Self> {
        let bind_err = |source| TransportError::Bind { addr, source };

        let socket =
            Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))
                .map_err(bind_err)?;
        socket.set_reuse_address(true).map_err(bind_err)?;
        socket.bind(&addr.into()).map_err(bind_err)?;
        socket.listen(ACCEPT_BACKLOG).map_err(bind_err)?;

        let listener: TcpListener = socket.into();
        let local_addr = listener.local_addr().map_err(bind_err)?;
        info!(%local_addr, "listening");

        Ok(Self {
            listener,
            local_addr,
        })
    }

    /// Accept an incoming connection (blocking).
    pub fn accept(&self) -> Result<(TcpStream, SocketAddr)> {
        let (stream, peer_addr) = self.listener.accept().map_err(TransportError::Accept)?;
        debug!(%peer_addr, "accepted connection");
        Ok((stream, peer_addr))
    }

    /// The address this acceptor is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Wake a blocked [`accept`](Self::accept) by shutting the listening
    /// socket down.
    ///
    /// The pending call then fails with the platform's closed-handle
    /// signal, which [`classify_io_error`](crate::classify_io_error) maps
    /// to [`Disposition::ClosedByUs`](crate::Disposition::ClosedByUs).
    #[cfg(unix)]
    pub fn shutdown(&self) {
        use std::os::fd::AsRawFd;

        // SAFETY: the descriptor is owned by `self.listener` and stays open
        // for the duration of this call; shutdown() on a listening socket
        // marks it unusable without closing the descriptor.
        unsafe {
            libc::shutdown(self.listener.as_raw_fd(), libc::SHUT_RDWR);
        }
    }
}

impl std::fmt::Debug for TcpAcceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpAcceptor")
            .field("local_addr", &self.local_addr)
            .finish()
    }
}

/// Connect to a listening TCP peer (blocking).
pub fn connect(addr: SocketAddr) -> Result<TcpStream> {
    let stream = TcpStream::connect(addr).map_err(|source| TransportError::Connect {
        addr,
        source,
    })?;
    debug!(%addr, "connected");
    Ok(stream)
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};
    use std::time::Duration;

    use super::*;
    use crate::disposition::{classify_io_error, Disposition};

    fn loopback() -> SocketAddr {
        "127.0.0.1:0".parse().expect("loopback addr should parse")
    }

    #[test]
    fn bind_accept_connect_roundtrip() {
        let acceptor = TcpAcceptor::bind(loopback()).expect("bind should succeed");
        let addr = acceptor.local_addr();
        assert_ne!(addr.port(), 0);

        let client = std::thread::spawn(move || {
            let mut stream = connect(addr).expect("connect should succeed");
            stream.write_all(b"hello").expect("write should succeed");
        });

        let (mut stream, peer_addr) = acceptor.accept().expect("accept should succeed");
        assert!(peer_addr.ip().is_loopback());

        let mut buf = [0u8; 5];
        stream.read_exact(&mut buf).expect("read should succeed");
        assert_eq!(&buf, b"hello");

        client.join().expect("client thread should finish");
    }

    #[test]
    fn connect_refused_surfaces_synchronously() {
        // Bind then drop to obtain a port nothing listens on.
        let addr = {
            let acceptor = TcpAcceptor::bind(loopback()).expect("bind should succeed");
            acceptor.local_addr()
        };

        let err = connect(addr).expect_err("connect should be refused");
        assert!(matches!(err, TransportError::Connect { .. }));
        assert_eq!(err.io().kind(), std::io::ErrorKind::ConnectionRefused);
    }

    #[cfg(unix)]
    #[test]
    fn shutdown_unblocks_accept_as_closed_by_us() {
        let acceptor = std::sync::Arc::new(TcpAcceptor::bind(loopback()).expect("bind"));

        let waiter = {
            let acceptor = std::sync::Arc::clone(&acceptor);
            std::thread::spawn(move || acceptor.accept())
        };

        std::thread::sleep(Duration::from_millis(50));
        acceptor.shutdown();

        let err = waiter
            .join()
            .expect("accept thread should finish")
            .expect_err("accept should fail after shutdown");
        assert_eq!(
            classify_io_error(err.io(), false),
            Disposition::ClosedByUs,
            "shutdown must surface as the benign close signal, got: {err}"
        );
    }

    #[test]
    fn rebind_after_drop() {
        let addr = {
            let acceptor = TcpAcceptor::bind(loopback()).expect("first bind");
            acceptor.local_addr()
        };
        let _again = TcpAcceptor::bind(addr).expect("rebind should succeed");
    }
}
