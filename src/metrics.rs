//! The per-request result record.
//!
//! Every request attempt produces exactly one [`ResultRecord`], which is written once to the
//! record file and never modified afterwards.

use chrono::{DateTime, SecondsFormat, Utc};
use std::fmt;
use std::time::Duration;

/// Value written to the `status_code` column when no HTTP status was obtained.
pub const FAILED_STATUS_LABEL: &str = "ERROR";

/// The outcome of a single request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestStatus {
    /// The server responded, with any status code including 4xx and 5xx.
    Completed(u16),
    /// The transport failed (timeout, refused connection, invalid url...) before a status
    /// code was received.
    Failed,
}

impl RequestStatus {
    /// Returns the HTTP status code, if the server responded.
    pub fn code(&self) -> Option<u16> {
        match self {
            RequestStatus::Completed(code) => Some(*code),
            RequestStatus::Failed => None,
        }
    }

    /// A request is successful if the server responded with a 2xx status code.
    pub fn is_success(&self) -> bool {
        matches!(self, RequestStatus::Completed(code) if (200..300).contains(code))
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RequestStatus::Completed(code) => write!(f, "{}", code),
            RequestStatus::Failed => f.write_str(FAILED_STATUS_LABEL),
        }
    }
}

/// Describes the outcome of one request attempt.
#[derive(Clone, Debug, PartialEq)]
pub struct ResultRecord {
    /// When the request completed, in UTC.
    pub timestamp: DateTime<Utc>,
    /// How long the request took, in milliseconds.
    pub duration_ms: f64,
    /// The status code returned by the server, or `Failed`.
    pub status: RequestStatus,
}

impl ResultRecord {
    pub fn new(timestamp: DateTime<Utc>, elapsed: Duration, status: RequestStatus) -> Self {
        ResultRecord {
            timestamp,
            duration_ms: elapsed.as_nanos() as f64 / 1_000_000.0,
            status,
        }
    }

    /// ISO-8601 timestamp with microseconds and an explicit `+00:00` offset.
    pub fn formatted_timestamp(&self) -> String {
        self.timestamp.to_rfc3339_opts(SecondsFormat::Micros, false)
    }
}
