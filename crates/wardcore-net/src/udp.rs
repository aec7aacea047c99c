//! UDP endpoint factory.
//!
//! The failure detector owns three datagram endpoints. Binding them through a
//! `Net` factory instead of calling `mio::net::UdpSocket::bind` directly lets
//! tests substitute endpoints bound to ephemeral loopback ports without the
//! detector knowing the difference.

use std::io;
use std::net::SocketAddr;

/// A bound UDP endpoint, ready for non-blocking send/receive and for
/// registration with an `mio::Poll`.
pub struct UdpEndpoint {
    socket: mio::net::UdpSocket,
}

impl UdpEndpoint {
    /// Binds a new non-blocking UDP socket at `addr`.
    pub fn bind(addr: SocketAddr) -> io::Result<Self> {
        let socket = mio::net::UdpSocket::bind(addr)?;
        Ok(Self { socket })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    pub fn send_to(&self, buf: &[u8], target: SocketAddr) -> io::Result<usize> {
        self.socket.send_to(buf, target)
    }

    /// Reads one datagram, returning `Ok(None)` on `WouldBlock` so callers
    /// can distinguish "nothing ready" from a real I/O error.
    pub fn try_recv_from(&self, buf: &mut [u8]) -> io::Result<Option<(usize, SocketAddr)>> {
        match self.socket.recv_from(buf) {
            Ok(result) => Ok(Some(result)),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Exposes the underlying `mio` source for `Poll::registry().register(...)`.
    pub fn mio_source(&mut self) -> &mut mio::net::UdpSocket {
        &mut self.socket
    }
}

/// Factory for UDP endpoints, injected into the failure detector so tests can
/// bind to ephemeral ports instead of fixed, collision-prone ones.
pub trait Net: Send + Sync {
    fn bind_udp(&self, addr: SocketAddr) -> io::Result<UdpEndpoint>;
}

/// The real `Net` implementation, backed by `mio`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MioNet;

impl Net for MioNet {
    fn bind_udp(&self, addr: SocketAddr) -> io::Result<UdpEndpoint> {
        UdpEndpoint::bind(addr).inspect_err(|err| {
            tracing::warn!(%addr, %err, "failed to bind udp endpoint");
        })
    }
}
