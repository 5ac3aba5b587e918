//! latency-bench: TCP request/response latency benchmarking.
//!
//! Two independently deployable components share nothing but the wire
//! protocol:
//! - `server`: a fixed worker pool that accepts connections and answers
//!   every received payload with a constant reply
//! - `client`: a single-connection client that issues requests one at a
//!   time, times each round trip and summarizes the batch
//!
//! Configuration comes from CLI arguments or a TOML file, see `config`.

pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod protocol;
pub mod server;

pub use client::{BatchReport, BatchSummary, LatencyClient, LatencyResult};
pub use error::{RequestError, SetupError};
pub use server::{Server, ServerState};
