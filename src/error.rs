//! Error types shared by the server and the client.
//!
//! Setup errors are fatal to the component that hit them and are returned
//! once to the caller. Request errors are recorded on the individual
//! `LatencyResult` and never abort a batch.

use std::io;
use std::net::SocketAddr;
use thiserror::Error;

/// Failures while bringing a component up.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("Failed to resolve address '{0}': {1}")]
    Resolve(String, #[source] io::Error),

    #[error("Address '{0}' did not resolve to any socket address")]
    NoAddress(String),

    #[error("Failed to create socket: {0}")]
    Socket(#[source] io::Error),

    #[error("Failed to set SO_REUSEADDR: {0}")]
    ReuseAddress(#[source] io::Error),

    #[error("Failed to bind {0}: {1}")]
    Bind(SocketAddr, #[source] io::Error),

    #[error("Failed to listen on {0}: {1}")]
    Listen(SocketAddr, #[source] io::Error),

    #[error("Failed to spawn worker thread: {0}")]
    Spawn(#[source] io::Error),

    #[error("Failed to connect to {0}: {1}")]
    Connect(String, #[source] io::Error),

    #[error("Server is already running")]
    AlreadyRunning,
}

/// Failure of a single request within a batch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("Not connected to server")]
    NotConnected,

    #[error("Failed to send request")]
    SendFailed,

    #[error("Failed to receive response")]
    ReceiveFailed,

    #[error("Response mismatch. Expected: {expected}, Got: {actual}")]
    Mismatch { expected: String, actual: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_error_messages_are_distinct() {
        let messages = [
            RequestError::NotConnected.to_string(),
            RequestError::SendFailed.to_string(),
            RequestError::ReceiveFailed.to_string(),
        ];
        assert_eq!(messages[0], "Not connected to server");
        assert_ne!(messages[0], messages[1]);
        assert_ne!(messages[1], messages[2]);
    }

    #[test]
    fn test_mismatch_message_contains_both_texts() {
        let err = RequestError::Mismatch {
            expected: "respuesta".to_string(),
            actual: "otra".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("respuesta"));
        assert!(msg.contains("otra"));
    }

    #[test]
    fn test_setup_error_display() {
        let addr: SocketAddr = "127.0.0.1:8080".parse().unwrap();
        let err = SetupError::Bind(
            addr,
            io::Error::new(io::ErrorKind::AddrInUse, "address in use"),
        );
        assert_eq!(err.to_string(), "Failed to bind 127.0.0.1:8080: address in use");
    }
}
