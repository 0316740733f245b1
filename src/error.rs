//! Error types for facebook-ads-downloader
//!
//! This module provides the error taxonomy of the library:
//! - Vendor errors decoded from the Graph API error envelope
//! - Report job failures (failed, skipped or stuck asynchronous insights jobs)
//! - Local persistence errors (SQLite, filesystem)
//! - Configuration errors with the offending key

use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for facebook-ads-downloader operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for facebook-ads-downloader
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "access_token")
        key: Option<String>,
    },

    /// Database operation failed
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// SQLx database error
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// The Graph API answered with an error envelope
    #[error("Graph API error: {0}")]
    Api(#[from] GraphApiError),

    /// The Graph API answered with a non-success status and no error envelope
    #[error("HTTP error {status}: {body}")]
    Http {
        /// HTTP status code
        status: u16,
        /// Response body (truncated)
        body: String,
    },

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A response parsed as JSON but did not have the expected shape
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Asynchronous insights report job error
    #[error("report job error: {0}")]
    ReportJob(#[from] ReportJobError),

    /// The run was cancelled (signal or explicit cancellation)
    #[error("download cancelled")]
    Cancelled,

    /// Some per-day downloads failed after all retries
    #[error("{failed} of {total} ad performance downloads failed")]
    DownloadsFailed {
        /// Number of days that could not be downloaded
        failed: usize,
        /// Number of days that were attempted
        total: usize,
    },

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Database-related errors
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to open or create a database file
    #[error("failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Failed to create the table schema
    #[error("failed to create schema: {0}")]
    SchemaFailed(String),

    /// Query failed
    #[error("query failed: {0}")]
    QueryFailed(String),
}

/// Error returned by the Graph API
///
/// Decoded from the `error` object of a failed response:
///
/// ```json
/// {
///   "error": {
///     "message": "(#17) User request limit reached",
///     "type": "OAuthException",
///     "code": 17,
///     "error_subcode": 2446079,
///     "fbtrace_id": "AbCdEf"
///   }
/// }
/// ```
#[derive(Debug, Clone, Deserialize, Error, PartialEq)]
#[error("({code}) {message}")]
pub struct GraphApiError {
    /// Human-readable message
    pub message: String,

    /// Error type (e.g. "OAuthException")
    #[serde(rename = "type", default)]
    pub error_type: Option<String>,

    /// Numeric error code, the basis for retry decisions
    #[serde(default)]
    pub code: i64,

    /// Optional more specific code
    #[serde(default)]
    pub error_subcode: Option<i64>,

    /// Trace id to quote when contacting vendor support
    #[serde(default)]
    pub fbtrace_id: Option<String>,
}

/// Envelope wrapping a [`GraphApiError`] in an error response body
#[derive(Debug, Deserialize)]
pub(crate) struct GraphErrorEnvelope {
    pub(crate) error: GraphApiError,
}

/// Asynchronous insights report job errors
#[derive(Debug, Error)]
pub enum ReportJobError {
    /// The job finished in a failed or skipped state
    #[error("report run {report_run_id} ended with status '{status}'")]
    Failed {
        /// The report run id
        report_run_id: String,
        /// The final `async_status`
        status: String,
    },

    /// The job did not complete within the configured timeout
    #[error("report run {report_run_id} did not complete within {waited:?}")]
    TimedOut {
        /// The report run id
        report_run_id: String,
        /// How long the job was polled
        waited: Duration,
    },
}

impl Error {
    /// Create a configuration error for a specific key
    pub fn config(key: &str, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.to_string()),
        }
    }

    /// The vendor error code, when this error came from the Graph API
    pub fn api_code(&self) -> Option<i64> {
        match self {
            Error::Api(e) => Some(e.code),
            _ => None,
        }
    }
}

#[allow(clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graph_error_envelope_deserialization() {
        let body = r#"{
            "error": {
                "message": "(#17) User request limit reached",
                "type": "OAuthException",
                "is_transient": true,
                "code": 17,
                "error_subcode": 2446079,
                "fbtrace_id": "A1b2C3"
            }
        }"#;

        let envelope: GraphErrorEnvelope = serde_json::from_str(body).expect("parse failed");
        assert_eq!(envelope.error.code, 17);
        assert_eq!(envelope.error.error_subcode, Some(2446079));
        assert_eq!(envelope.error.error_type.as_deref(), Some("OAuthException"));
        assert_eq!(envelope.error.fbtrace_id.as_deref(), Some("A1b2C3"));
    }

    #[test]
    fn test_graph_error_minimal_envelope() {
        let body = r#"{"error": {"message": "An unknown error occurred"}}"#;
        let envelope: GraphErrorEnvelope = serde_json::from_str(body).expect("parse failed");
        assert_eq!(envelope.error.code, 0);
        assert!(envelope.error.error_subcode.is_none());
    }

    #[test]
    fn test_error_display() {
        let err = Error::Api(GraphApiError {
            message: "Application request limit reached".into(),
            error_type: None,
            code: 4,
            error_subcode: None,
            fbtrace_id: None,
        });
        assert_eq!(
            err.to_string(),
            "Graph API error: (4) Application request limit reached"
        );

        let err = Error::DownloadsFailed {
            failed: 2,
            total: 30,
        };
        assert_eq!(err.to_string(), "2 of 30 ad performance downloads failed");

        let err = Error::ReportJob(ReportJobError::Failed {
            report_run_id: "123".into(),
            status: "Job Failed".into(),
        });
        assert!(err.to_string().contains("report run 123"));
    }

    #[test]
    fn test_config_error_keeps_key() {
        match Error::config("access_token", "must not be empty") {
            Error::Config { message, key } => {
                assert_eq!(message, "must not be empty");
                assert_eq!(key.as_deref(), Some("access_token"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_api_code() {
        let err = Error::Api(GraphApiError {
            message: "x".into(),
            error_type: None,
            code: 80000,
            error_subcode: None,
            fbtrace_id: None,
        });
        assert_eq!(err.api_code(), Some(80000));
        assert_eq!(Error::Cancelled.api_code(), None);
    }
}
