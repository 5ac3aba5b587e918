//! latency-client: measures sequential request/response round trips.
//!
//! Exits 0 whatever happens to individual requests; failures show up in
//! the printed summary.

use latency_bench::config::ClientConfig;
use latency_bench::{logging, LatencyClient, SetupError};
use std::io::{self, Write};
use tracing::error;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = ClientConfig::load()?;

    logging::init(&config.log_level);

    println!("=== Latency Client ===");
    println!("Client Configuration:");
    println!("  Server: {}:{}", config.host, config.port);
    println!("  Request: \"{}\"", config.request);
    println!("  Expected Response: \"{}\"", config.expected);
    println!("  Requests: {}", config.requests);
    println!("  Concurrent Connections: 1\n");

    let mut client = LatencyClient::from_config(&config);
    if let Err(e) = client.connect() {
        error!(error = %e, "Failed to connect to server");
        report_connect_failure(&mut io::stderr(), &e);
        return Ok(());
    }

    println!("Running batch test with {} requests...\n", config.requests);
    let report = client.run_batch(&config.request, &config.expected, config.requests);
    print!("{report}");
    println!("Test completed.");

    client.disconnect();
    Ok(())
}

/// Written to stderr regardless of the log filter.
fn report_connect_failure<W: Write>(out: &mut W, e: &SetupError) {
    let _ = writeln!(out, "{e}");
}
