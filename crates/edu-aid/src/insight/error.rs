//! Error types for the remote insight client.
//!
//! Every variant routes control to the deterministic fallback; none of
//! these errors ever reach an end user.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum InsightError {
    /// Remote analysis is switched off in configuration.
    #[error("remote insight is disabled")]
    Disabled,

    /// No API key configured for the remote service.
    #[error("no API key configured for remote insight")]
    MissingApiKey,

    /// Network/HTTP request failed.
    #[error("network error: {message}")]
    Network { message: String },

    /// The request exceeded the configured timeout.
    #[error("remote insight timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// Remote service answered with a non-success status.
    #[error("remote service returned status {status}")]
    BadStatus { status: u16 },

    /// The response carried no usable text.
    #[error("remote service returned empty text")]
    EmptyResponse,

    /// The response text failed JSON parsing after fence stripping.
    #[error("malformed insight payload: {message}")]
    MalformedPayload { message: String },

    /// Base URL in configuration could not be parsed.
    #[error("invalid insight base URL: {message}")]
    InvalidUrl { message: String },
}

impl InsightError {
    /// True when the failure is transient (network or timeout) rather than
    /// a configuration or payload problem.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            InsightError::Network { .. }
                | InsightError::Timeout { .. }
                | InsightError::BadStatus { .. }
        )
    }
}

impl From<url::ParseError> for InsightError {
    fn from(err: url::ParseError) -> Self {
        InsightError::InvalidUrl {
            message: err.to_string(),
        }
    }
}
