//! Sequential round-trip latency client.
//!
//! One connection, one request in flight at a time. Each request is timed
//! from just before the first byte is written until the single read that
//! carries the response returns.

mod report;
mod result;
mod stats;

pub use report::BatchReport;
pub use result::LatencyResult;
pub use stats::{percentile_index, BatchSummary, LatencyStats, PERCENTILES};

use crate::config::ClientConfig;
use crate::error::{RequestError, SetupError};
use crate::protocol::{receive_once, send_all, RECV_BUFFER_SIZE};
use chrono::Local;
use std::io;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};
use tracing::{debug, info, trace};

/// Client holding at most one connection to the server.
pub struct LatencyClient {
    host: String,
    port: u16,
    connect_timeout: Option<Duration>,
    io_timeout: Option<Duration>,
    stream: Option<TcpStream>,
    buf: [u8; RECV_BUFFER_SIZE],
}

impl LatencyClient {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            connect_timeout: None,
            io_timeout: None,
            stream: None,
            buf: [0; RECV_BUFFER_SIZE],
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.host.clone(), config.port)
            .with_connect_timeout(config.connect_timeout)
            .with_io_timeout(config.io_timeout)
    }

    /// Bound the TCP handshake. `None` blocks indefinitely.
    pub fn with_connect_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Bound every send and receive. `None` blocks indefinitely.
    pub fn with_io_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.io_timeout = timeout;
        self
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Open the connection, trying each resolved address in turn.
    ///
    /// Replaces any existing connection.
    pub fn connect(&mut self) -> Result<SocketAddr, SetupError> {
        self.disconnect();

        let target = format!("{}:{}", self.host, self.port);
        let addrs = target
            .to_socket_addrs()
            .map_err(|e| SetupError::Resolve(target.clone(), e))?;

        let mut last_err = None;
        for addr in addrs {
            match self.open(addr) {
                Ok(stream) => {
                    info!(server = %addr, "Connected to server");
                    self.stream = Some(stream);
                    return Ok(addr);
                }
                Err(e) => {
                    debug!(server = %addr, error = %e, "Connect attempt failed");
                    last_err = Some(e);
                }
            }
        }

        Err(match last_err {
            Some(e) => SetupError::Connect(target, e),
            None => SetupError::NoAddress(target),
        })
    }

    fn open(&self, addr: SocketAddr) -> io::Result<TcpStream> {
        let stream = match self.connect_timeout {
            Some(timeout) => TcpStream::connect_timeout(&addr, timeout)?,
            None => TcpStream::connect(addr)?,
        };
        stream.set_read_timeout(self.io_timeout)?;
        stream.set_write_timeout(self.io_timeout)?;
        Ok(stream)
    }

    /// Close the connection if one is open.
    pub fn disconnect(&mut self) {
        if self.stream.take().is_some() {
            debug!("Disconnected from server");
        }
    }

    /// Send `request` and time the round trip.
    ///
    /// The response is whatever a single read returns. When `expected` is
    /// non-empty a differing response makes the result a mismatch failure.
    /// A failed send or receive closes the connection, since a late reply
    /// would otherwise be read as the response to the next request.
    pub fn send_request(&mut self, request: &str, expected: &str) -> LatencyResult {
        let (n, latency_ns) = match self.round_trip(request) {
            Ok(done) => done,
            Err(e) => {
                if e != RequestError::NotConnected {
                    self.disconnect();
                }
                return LatencyResult::failure(e);
            }
        };

        let response = String::from_utf8_lossy(&self.buf[..n]).into_owned();

        if !expected.is_empty() && response != expected {
            return LatencyResult::mismatch(latency_ns, expected, response);
        }

        LatencyResult::success(latency_ns, response)
    }

    /// Write the request and perform the single read. Returns the bytes
    /// read into `buf` and the elapsed nanoseconds.
    fn round_trip(&mut self, request: &str) -> Result<(usize, u64), RequestError> {
        let stream = self.stream.as_mut().ok_or(RequestError::NotConnected)?;

        let start = Instant::now();

        send_all(stream, request.as_bytes()).map_err(|e| {
            debug!(error = %e, "Send failed");
            RequestError::SendFailed
        })?;

        let n = match receive_once(stream, &mut self.buf) {
            Ok(0) => {
                debug!("Server closed the connection");
                return Err(RequestError::ReceiveFailed);
            }
            Ok(n) => n,
            Err(e) => {
                debug!(error = %e, "Receive failed");
                return Err(RequestError::ReceiveFailed);
            }
        };

        let latency_ns = u64::try_from(start.elapsed().as_nanos()).unwrap_or(u64::MAX);
        Ok((n, latency_ns))
    }

    /// Run `count` requests back to back over the current connection.
    pub fn run_batch(&mut self, request: &str, expected: &str, count: usize) -> BatchReport {
        info!(count, "Running batch");

        let started_at = Local::now();
        let mut results = Vec::with_capacity(count);
        let start = Instant::now();

        for seq in 0..count {
            let result = self.send_request(request, expected);
            trace!(
                seq,
                latency_ns = result.latency_ns,
                success = result.is_success(),
                "Request complete"
            );
            results.push(result);
        }

        let report = BatchReport::new(started_at, results, start.elapsed());
        info!(
            successful = report.summary.successful,
            failed = report.summary.failed,
            duration_ms = report.summary.duration.as_millis() as u64,
            "Batch complete"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;

    /// Accept one connection and answer each read with `reply`.
    fn fixed_reply_peer(reply: &'static [u8]) -> (SocketAddr, thread::JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut buf = [0u8; 256];
            while let Ok(n) = stream.read(&mut buf) {
                if n == 0 || stream.write_all(reply).is_err() {
                    break;
                }
            }
        });
        (addr, handle)
    }

    #[test]
    fn test_send_without_connection() {
        let mut client = LatencyClient::new("127.0.0.1", 1);
        let result = client.send_request("test", "respuesta");
        assert_eq!(result.error, Some(RequestError::NotConnected));
    }

    #[test]
    fn test_batch_without_connection() {
        let mut client = LatencyClient::new("127.0.0.1", 1);
        let report = client.run_batch("test", "respuesta", 3);
        assert_eq!(report.summary.failed, 3);
        assert_eq!(report.summary.failures.get("Not connected to server"), Some(&3));
    }

    #[test]
    fn test_connect_refused() {
        let addr = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap()
        };
        let mut client = LatencyClient::new("127.0.0.1", addr.port())
            .with_connect_timeout(Some(Duration::from_millis(500)));
        assert!(matches!(client.connect(), Err(SetupError::Connect(..))));
        assert!(!client.is_connected());
    }

    #[test]
    fn test_round_trip() {
        let (addr, peer) = fixed_reply_peer(b"respuesta");
        let mut client = LatencyClient::new("127.0.0.1", addr.port());
        client.connect().unwrap();

        let result = client.send_request("test", "respuesta");
        assert!(result.is_success(), "{}", result.error_message());
        assert_eq!(result.response, "respuesta");
        assert!(result.latency_ns > 0);

        client.disconnect();
        peer.join().unwrap();
    }

    #[test]
    fn test_empty_expected_skips_validation() {
        let (addr, peer) = fixed_reply_peer(b"anything");
        let mut client = LatencyClient::new("127.0.0.1", addr.port());
        client.connect().unwrap();

        let result = client.send_request("test", "");
        assert!(result.is_success());
        assert_eq!(result.response, "anything");

        client.disconnect();
        peer.join().unwrap();
    }

    #[test]
    fn test_mismatch() {
        let (addr, peer) = fixed_reply_peer(b"otra cosa");
        let mut client = LatencyClient::new("127.0.0.1", addr.port());
        client.connect().unwrap();

        let result = client.send_request("test", "respuesta");
        let message = result.error_message();
        assert!(!result.is_success());
        assert!(message.contains("respuesta"));
        assert!(message.contains("otra cosa"));
        assert!(result.latency_ns > 0);

        client.disconnect();
        peer.join().unwrap();
    }

    #[test]
    fn test_receive_after_peer_close() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let peer = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            drop(stream);
        });

        let mut client = LatencyClient::new("127.0.0.1", addr.port());
        client.connect().unwrap();
        peer.join().unwrap();

        let result = client.send_request("test", "respuesta");
        assert!(matches!(
            result.error,
            Some(RequestError::ReceiveFailed) | Some(RequestError::SendFailed)
        ));
    }

    #[test]
    fn test_late_reply_is_not_measured() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let peer = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut buf = [0u8; 256];
            let mut delay = Duration::from_millis(150);
            while let Ok(n) = stream.read(&mut buf) {
                if n == 0 {
                    break;
                }
                thread::sleep(delay);
                delay = Duration::from_millis(30);
                if stream.write_all(b"respuesta").is_err() {
                    break;
                }
            }
        });

        let mut client = LatencyClient::new("127.0.0.1", addr.port())
            .with_io_timeout(Some(Duration::from_millis(50)));
        client.connect().unwrap();

        let first = client.send_request("test", "respuesta");
        assert_eq!(first.error, Some(RequestError::ReceiveFailed));
        assert!(!client.is_connected());

        // Give the slow reply time to arrive; it must not be taken as the
        // response to the next request.
        thread::sleep(Duration::from_millis(150));
        let second = client.send_request("test", "respuesta");
        assert_eq!(second.error, Some(RequestError::NotConnected));

        peer.join().unwrap();
    }

    #[test]
    fn test_receive_timeout() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let mut client = LatencyClient::new("127.0.0.1", addr.port())
            .with_io_timeout(Some(Duration::from_millis(50)));
        client.connect().unwrap();

        // Connection sits in the backlog, nobody ever answers.
        let result = client.send_request("test", "respuesta");
        assert_eq!(result.error, Some(RequestError::ReceiveFailed));
        drop(listener);
    }
}
