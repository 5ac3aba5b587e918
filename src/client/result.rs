//! Outcome of a single timed request.

use crate::error::RequestError;

/// One round-trip measurement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LatencyResult {
    /// Elapsed time from first byte sent to response available.
    /// Zero when the request never completed a round trip.
    pub latency_ns: u64,
    /// Text of the response, lossily decoded as UTF-8.
    pub response: String,
    /// Why the request failed, if it did.
    pub error: Option<RequestError>,
}

impl LatencyResult {
    pub fn success(latency_ns: u64, response: String) -> Self {
        Self {
            latency_ns,
            response,
            error: None,
        }
    }

    /// A request that failed before a response was available.
    pub fn failure(error: RequestError) -> Self {
        Self {
            latency_ns: 0,
            response: String::new(),
            error: Some(error),
        }
    }

    /// A completed round trip whose response did not match. The latency is
    /// kept on the result even though summaries ignore it.
    pub fn mismatch(latency_ns: u64, expected: &str, response: String) -> Self {
        Self {
            latency_ns,
            error: Some(RequestError::Mismatch {
                expected: expected.to_string(),
                actual: response.clone(),
            }),
            response,
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Human-readable failure description, empty on success.
    pub fn error_message(&self) -> String {
        self.error.as_ref().map(ToString::to_string).unwrap_or_default()
    }
}
