//! Fixed-reply TCP server.
//!
//! A fixed pool of worker threads shares one blocking listener. Each worker
//! accepts a connection and serves it synchronously until the peer goes
//! away, answering every received chunk with the configured reply.
//!
//! `stop()` wakes the workers parked in `accept` and joins them. It does not
//! close connections already being served: a worker busy with a connected
//! peer is joined only once that peer disconnects (or the configured read
//! timeout fires).

mod listener;
mod state;
mod worker;

pub use state::ServerState;

use crate::config::ServerConfig;
use crate::error::SetupError;
use socket2::Socket;
use state::StateCell;
use std::net::SocketAddr;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{error, info};
use worker::{worker_loop, WorkerContext};

/// Server instance
pub struct Server {
    config: ServerConfig,
    state: Arc<StateCell>,
    listener: Option<Arc<Socket>>,
    local_addr: Option<SocketAddr>,
    workers: Vec<JoinHandle<()>>,
}

impl Server {
    /// Create a new server instance in the `Stopped` state.
    pub fn new(config: ServerConfig) -> Self {
        Server {
            config,
            state: Arc::new(StateCell::new(ServerState::Stopped)),
            listener: None,
            local_addr: None,
            workers: Vec::new(),
        }
    }

    pub fn state(&self) -> ServerState {
        self.state.load()
    }

    /// Address the listener is bound to while running.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Number of worker threads currently in the pool.
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Bind the listener and spawn the worker pool.
    ///
    /// On failure every resource acquired by this attempt is released and
    /// the server is back in `Stopped`.
    pub fn start(&mut self) -> Result<SocketAddr, SetupError> {
        if !self
            .state
            .transition(ServerState::Stopped, ServerState::Starting)
        {
            return Err(SetupError::AlreadyRunning);
        }

        match self.try_start() {
            Ok(addr) => Ok(addr),
            Err(e) => {
                self.shutdown();
                Err(e)
            }
        }
    }

    fn try_start(&mut self) -> Result<SocketAddr, SetupError> {
        let addr = listener::resolve(&self.config.listen_addr())?;
        let socket = listener::create_listener(addr)?;
        let local_addr = socket
            .local_addr()
            .ok()
            .and_then(|a| a.as_socket())
            .unwrap_or(addr);

        let shared = Arc::new(socket);
        self.listener = Some(Arc::clone(&shared));
        self.local_addr = Some(local_addr);

        let num_workers = listener::pool_size(self.config.workers);

        // Workers drop anything they accept outside `Running`.
        self.state.store(ServerState::Running);

        for worker_id in 0..num_workers {
            let ctx = WorkerContext {
                listener: Arc::clone(&shared),
                state: Arc::clone(&self.state),
                reply: self.config.reply.clone(),
                read_timeout: self.config.read_timeout,
                write_timeout: self.config.write_timeout,
            };

            let handle = thread::Builder::new()
                .name(format!("worker-{worker_id}"))
                .spawn(move || {
                    if let Err(e) = worker_loop(worker_id, ctx) {
                        error!(worker = worker_id, error = %e, "Worker failed");
                    }
                })
                .map_err(SetupError::Spawn)?;

            self.workers.push(handle);
        }

        info!(
            addr = %local_addr,
            workers = num_workers,
            reply_len = self.config.reply.len(),
            "Server started"
        );

        Ok(local_addr)
    }

    /// Stop accepting connections and join the worker pool.
    ///
    /// No-op unless the server is `Running`.
    pub fn stop(&mut self) {
        if !self
            .state
            .transition(ServerState::Running, ServerState::Stopping)
        {
            return;
        }

        self.shutdown();
        info!("Server stopped");
    }

    fn shutdown(&mut self) {
        self.state.store(ServerState::Stopping);

        if let (Some(socket), Some(addr)) = (self.listener.take(), self.local_addr.take()) {
            listener::wake_acceptors(&socket, addr, self.workers.len());
        }

        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                error!("Worker thread panicked");
            }
        }

        // The last Arc to the listener went away with the workers.
        self.state.store(ServerState::Stopped);
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        self.stop();
    }
}
