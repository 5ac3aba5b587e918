//! Worker threads: accept a connection, serve it to completion, repeat.
//!
//! A worker never spawns further threads, so the pool size is also the
//! maximum number of connections served at once. Connections beyond that
//! wait in the listen backlog until a worker frees up.

use crate::protocol::{receive_once, send_all, RECV_BUFFER_SIZE};
use crate::server::state::StateCell;
use bytes::Bytes;
use socket2::Socket;
use std::io;
use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

/// Everything a worker needs, cloned once per thread.
pub(crate) struct WorkerContext {
    pub listener: Arc<Socket>,
    pub state: Arc<StateCell>,
    pub reply: Bytes,
    pub read_timeout: Option<Duration>,
    pub write_timeout: Option<Duration>,
}

/// Accept and serve connections until the server leaves `Running`.
///
/// Returns `Ok` when the exit was caused by shutdown and the accept error
/// otherwise.
pub(crate) fn worker_loop(worker_id: usize, ctx: WorkerContext) -> io::Result<()> {
    debug!(worker = worker_id, "Worker started");

    loop {
        match ctx.listener.accept() {
            Ok((socket, peer)) => {
                if !ctx.state.is_running() {
                    // Either a wake-up connect from stop() or a client that
                    // raced it; both are dropped unanswered.
                    break;
                }

                let peer = peer.as_socket();
                debug!(worker = worker_id, peer = ?peer, "Accepted connection");

                match handle_connection(socket.into(), &ctx) {
                    Ok(requests) => {
                        debug!(worker = worker_id, peer = ?peer, requests, "Connection closed")
                    }
                    Err(e) => {
                        debug!(worker = worker_id, peer = ?peer, error = %e, "Connection error")
                    }
                }
            }
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                if ctx.state.is_running() {
                    return Err(e);
                }
                break;
            }
        }
    }

    debug!(worker = worker_id, "Worker exiting");
    Ok(())
}

/// Serve one connection until the peer closes it or an I/O error occurs.
///
/// Every non-empty read counts as one request and is answered with the full
/// reply. Returns the number of requests served.
pub(crate) fn handle_connection(mut stream: TcpStream, ctx: &WorkerContext) -> io::Result<u64> {
    stream.set_read_timeout(ctx.read_timeout)?;
    stream.set_write_timeout(ctx.write_timeout)?;

    let mut buf = [0u8; RECV_BUFFER_SIZE];
    let mut served = 0;

    loop {
        let n = receive_once(&mut stream, &mut buf)?;
        if n == 0 {
            return Ok(served);
        }

        trace!(bytes = n, "Request received");
        send_all(&mut stream, &ctx.reply)?;
        served += 1;
    }
}
