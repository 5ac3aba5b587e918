//! Listening socket setup and shutdown.

use crate::error::SetupError;
use socket2::{Domain, Protocol, Socket, Type};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;
use tracing::debug;

/// Bound on each self-connect used to wake blocked `accept` calls.
const WAKE_CONNECT_TIMEOUT: Duration = Duration::from_millis(100);

/// Resolve `host:port` to the first socket address.
pub(crate) fn resolve(addr: &str) -> Result<SocketAddr, SetupError> {
    addr.to_socket_addrs()
        .map_err(|e| SetupError::Resolve(addr.to_string(), e))?
        .next()
        .ok_or_else(|| SetupError::NoAddress(addr.to_string()))
}

/// Create a blocking TCP listener with SO_REUSEADDR and the platform's
/// maximum backlog.
///
/// On error the partially configured socket is dropped (and closed) before
/// returning.
pub(crate) fn create_listener(addr: SocketAddr) -> Result<Socket, SetupError> {
    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))
        .map_err(SetupError::Socket)?;

    socket
        .set_reuse_address(true)
        .map_err(SetupError::ReuseAddress)?;
    socket
        .bind(&addr.into())
        .map_err(|e| SetupError::Bind(addr, e))?;
    socket
        .listen(libc::SOMAXCONN)
        .map_err(|e| SetupError::Listen(addr, e))?;

    Ok(socket)
}

/// Unblock every worker parked in `accept` on `listener`.
///
/// Shutting down a listening socket makes pending `accept` calls fail on
/// Linux. Platforms where that is not enough get one throwaway connection
/// per worker instead. Callers must have left the running state first so
/// workers treat both outcomes as a stop signal.
pub(crate) fn wake_acceptors(listener: &Socket, local_addr: SocketAddr, workers: usize) {
    if let Err(e) = listener.shutdown(Shutdown::Both) {
        debug!(error = %e, "Listener shutdown not supported, falling back to wake connects");
    }

    let target = connectable(local_addr);
    for _ in 0..workers {
        if TcpStream::connect_timeout(&target, WAKE_CONNECT_TIMEOUT).is_err() {
            break;
        }
    }
}

/// Map a wildcard bind address to the loopback address of the same family.
fn connectable(addr: SocketAddr) -> SocketAddr {
    match addr.ip() {
        IpAddr::V4(ip) if ip.is_unspecified() => {
            SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), addr.port())
        }
        IpAddr::V6(ip) if ip.is_unspecified() => {
            SocketAddr::new(IpAddr::V6(Ipv6Addr::LOCALHOST), addr.port())
        }
        _ => addr,
    }
}

/// Worker pool size: the configured count, or one per available CPU.
pub(crate) fn pool_size(configured: Option<usize>) -> usize {
    configured.filter(|&n| n > 0).unwrap_or_else(num_cpus)
}

fn num_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
