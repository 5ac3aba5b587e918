//! Configuration for the latency server and client.
//!
//! Supports both command-line arguments and a TOML configuration file.
//! CLI arguments take precedence over config file values.

use crate::protocol::{DEFAULT_REPLY, DEFAULT_REQUEST};
use bytes::Bytes;
use clap::Parser;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Command-line arguments for the latency server
#[derive(Parser, Debug)]
#[command(name = "latency-server")]
#[command(author = "latency-bench authors")]
#[command(version = "0.1.0")]
#[command(about = "Fixed-reply TCP server for latency benchmarks", long_about = None)]
pub struct ServerArgs {
    /// Port to listen on (default 8080)
    pub port: Option<u16>,

    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Address to bind to (e.g., 0.0.0.0)
    #[arg(long)]
    pub host: Option<String>,

    /// Number of worker threads (defaults to number of CPU cores)
    #[arg(short = 'w', long)]
    pub workers: Option<usize>,

    /// Reply sent for every request
    #[arg(long)]
    pub reply: Option<String>,

    /// Per-connection read timeout in milliseconds (0 = none)
    #[arg(long)]
    pub read_timeout_ms: Option<u64>,

    /// Per-connection write timeout in milliseconds (0 = none)
    #[arg(long)]
    pub write_timeout_ms: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

/// Command-line arguments for the latency client
#[derive(Parser, Debug)]
#[command(name = "latency-client")]
#[command(author = "latency-bench authors")]
#[command(version = "0.1.0")]
#[command(about = "Sequential TCP round-trip latency client", long_about = None)]
pub struct ClientArgs {
    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Server host
    #[arg(long)]
    pub host: Option<String>,

    /// Server port
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Request payload sent on every round trip
    #[arg(long)]
    pub request: Option<String>,

    /// Expected response (empty disables validation)
    #[arg(long)]
    pub expected: Option<String>,

    /// Number of sequential requests in the batch
    #[arg(long)]
    pub requests: Option<usize>,

    /// Connect timeout in milliseconds (0 = none)
    #[arg(long)]
    pub connect_timeout_ms: Option<u64>,

    /// Send/receive timeout in milliseconds (0 = none)
    #[arg(long)]
    pub io_timeout_ms: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

/// TOML configuration file structure
#[derive(Debug, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub client: ClientSection,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server-related configuration
#[derive(Debug, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_server_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Number of worker threads
    pub workers: Option<usize>,
    #[serde(default = "default_reply")]
    pub reply: String,
    pub read_timeout_ms: Option<u64>,
    pub write_timeout_ms: Option<u64>,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_port(),
            workers: None,
            reply: default_reply(),
            read_timeout_ms: None,
            write_timeout_ms: None,
        }
    }
}

/// Client-related configuration
#[derive(Debug, Deserialize)]
pub struct ClientSection {
    #[serde(default = "default_client_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_request")]
    pub request: String,
    #[serde(default = "default_reply")]
    pub expected: String,
    #[serde(default = "default_requests")]
    pub requests: usize,
    pub connect_timeout_ms: Option<u64>,
    pub io_timeout_ms: Option<u64>,
}

impl Default for ClientSection {
    fn default() -> Self {
        Self {
            host: default_client_host(),
            port: default_port(),
            request: default_request(),
            expected: default_reply(),
            requests: default_requests(),
            connect_timeout_ms: None,
            io_timeout_ms: None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_server_host() -> String {
    "0.0.0.0".to_string()
}

fn default_client_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_reply() -> String {
    DEFAULT_REPLY.to_string()
}

fn default_request() -> String {
    DEFAULT_REQUEST.to_string()
}

fn default_requests() -> usize {
    5
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Resolved server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Worker pool size; `None` means one per available CPU.
    pub workers: Option<usize>,
    pub reply: Bytes,
    pub read_timeout: Option<Duration>,
    pub write_timeout: Option<Duration>,
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::merge(ServerArgs::parse_from(["latency-server"]), TomlConfig::default())
    }
}

impl ServerConfig {
    /// Load configuration from CLI args and optional TOML file.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_args(ServerArgs::parse())
    }

    pub fn from_args(cli: ServerArgs) -> Result<Self, ConfigError> {
        let toml_config = read_toml(cli.config.as_deref())?;
        Ok(Self::merge(cli, toml_config))
    }

    /// Merge CLI args with TOML config (CLI takes precedence)
    fn merge(cli: ServerArgs, toml_config: TomlConfig) -> Self {
        let server = toml_config.server;
        ServerConfig {
            host: cli.host.unwrap_or(server.host),
            port: cli.port.unwrap_or(server.port),
            workers: cli.workers.or(server.workers),
            reply: Bytes::from(cli.reply.unwrap_or(server.reply)),
            read_timeout: millis(cli.read_timeout_ms.or(server.read_timeout_ms)),
            write_timeout: millis(cli.write_timeout_ms.or(server.write_timeout_ms)),
            log_level: pick_log_level(cli.log_level, toml_config.logging.level),
        }
    }

    /// `host:port` string used for binding.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Resolved client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    pub request: String,
    pub expected: String,
    pub requests: usize,
    pub connect_timeout: Option<Duration>,
    pub io_timeout: Option<Duration>,
    pub log_level: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::merge(ClientArgs::parse_from(["latency-client"]), TomlConfig::default())
    }
}

impl ClientConfig {
    /// Load configuration from CLI args and optional TOML file.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_args(ClientArgs::parse())
    }

    pub fn from_args(cli: ClientArgs) -> Result<Self, ConfigError> {
        let toml_config = read_toml(cli.config.as_deref())?;
        Ok(Self::merge(cli, toml_config))
    }

    fn merge(cli: ClientArgs, toml_config: TomlConfig) -> Self {
        let client = toml_config.client;
        ClientConfig {
            host: cli.host.unwrap_or(client.host),
            port: cli.port.unwrap_or(client.port),
            request: cli.request.unwrap_or(client.request),
            expected: cli.expected.unwrap_or(client.expected),
            requests: cli.requests.unwrap_or(client.requests),
            connect_timeout: millis(cli.connect_timeout_ms.or(client.connect_timeout_ms)),
            io_timeout: millis(cli.io_timeout_ms.or(client.io_timeout_ms)),
            log_level: pick_log_level(cli.log_level, toml_config.logging.level),
        }
    }
}

fn read_toml(path: Option<&Path>) -> Result<TomlConfig, ConfigError> {
    match path {
        Some(path) => {
            let contents = std::fs::read_to_string(path)
                .map_err(|e| ConfigError::FileRead(path.to_path_buf(), e))?;
            toml::from_str(&contents).map_err(|e| ConfigError::TomlParse(path.to_path_buf(), e))
        }
        None => Ok(TomlConfig::default()),
    }
}

/// The CLI flag only wins when it was changed from its default.
fn pick_log_level(cli: String, file: String) -> String {
    if cli != "info" {
        cli
    } else {
        file
    }
}

/// Zero means "no timeout".
fn millis(ms: Option<u64>) -> Option<Duration> {
    ms.filter(|&ms| ms > 0).map(Duration::from_millis)
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {1}", path = .0.display())]
    FileRead(PathBuf, #[source] std::io::Error),
    #[error("Failed to parse config file '{path}': {1}", path = .0.display())]
    TomlParse(PathBuf, #[source] toml::de::Error),
}
