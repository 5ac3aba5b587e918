//! latency-server: answers every received payload with a fixed reply.
//!
//! Runs until Enter is pressed (or stdin reaches end of file).

use latency_bench::config::ServerConfig;
use latency_bench::{logging, Server};
use std::io::{self, BufRead};
use std::process::ExitCode;
use tracing::{error, info, warn};

fn main() -> ExitCode {
    let config = match ServerConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    logging::init(&config.log_level);

    info!(
        addr = %config.listen_addr(),
        workers = ?config.workers,
        read_timeout = ?config.read_timeout,
        "Starting latency server"
    );

    let mut server = Server::new(config);
    if let Err(e) = server.start() {
        error!(error = %e, "Failed to start server");
        return ExitCode::FAILURE;
    }

    println!("Server running. Press Enter to stop...");
    wait_for_enter();

    server.stop();
    ExitCode::SUCCESS
}

fn wait_for_enter() {
    let mut line = String::new();
    if let Err(e) = io::stdin().lock().read_line(&mut line) {
        warn!(error = %e, "Failed to read stdin, stopping");
    }
}
