use std::error::Error as StdError;
use thiserror::Error;

/// Result type alias for BigPanda operations
pub type Result<T> = std::result::Result<T, BigPandaError>;

/// Errors that can occur when interacting with the BigPanda API
#[derive(Debug, Error)]
pub enum BigPandaError {
    /// Failed to build HTTP client
    #[error("Failed to build HTTP client: {0}")]
    BuildHttpClient(#[source] reqwest::Error),

    /// HTTP request failed before a response was received
    #[error("HTTP request failed while {step}: {source}")]
    Request {
        /// The operation step that was in flight
        step: &'static str,
        #[source]
        source: reqwest_middleware::Error,
    },

    /// A 2xx response body could not be decoded into the expected shape
    #[error("Invalid response body while {step}: {source}")]
    Decode {
        /// The operation step that was in flight
        step: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// The BigPanda API returned an error response
    #[error("BigPanda API error while {step}: HTTP {status} - {message}")]
    Api {
        /// The operation step that was in flight
        step: &'static str,
        /// HTTP status code
        status: u16,
        /// Error message from BigPanda
        message: String,
    },

    /// Caller-supplied arguments are malformed or contradictory
    #[error("Invalid arguments: {0}")]
    Validation(String),

    /// Failed to serialize mapping records to CSV
    #[error("Failed to serialize mapping records: {0}")]
    Csv(#[source] csv::Error),

    /// No mapping enrichment with the given name exists
    #[error("No mapping enrichment named '{name}' was found")]
    EnrichmentNotFound {
        /// The enrichment name that was looked up
        name: String,
    },

    /// The upload was accepted but the response carried no job id
    #[error("Job ID not returned by upload to BigPanda")]
    MissingJobId,

    /// The enrichment job reached the `failed` terminal status
    #[error("Upload with job ID {job_id} failed")]
    JobFailed {
        /// Server-assigned job identifier
        job_id: String,
    },

    /// The configured poll-attempt cap was reached before the job finished
    #[error("Job {job_id} still not finished after {attempts} status polls")]
    JobTimeout {
        /// Server-assigned job identifier
        job_id: String,
        /// Number of status polls performed
        attempts: u32,
    },
}

impl BigPandaError {
    /// Check if the error is retryable
    ///
    /// Returns `true` for:
    /// - Network/connection errors
    /// - Timeout errors
    /// - Server errors (5xx status codes)
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Request { source, .. } => {
                if let Some(reqwest_err) = StdError::source(source) {
                    if let Some(err) = reqwest_err.downcast_ref::<reqwest::Error>() {
                        return err.is_connect() || err.is_timeout();
                    }
                }
                false
            }
            Self::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_retryable_5xx() {
        let error = BigPandaError::Api {
            step: "uploading mapping data",
            status: 500,
            message: "Internal server error".to_string(),
        };
        assert!(error.is_retryable());

        let error = BigPandaError::Api {
            step: "sending OIM alert",
            status: 503,
            message: "Service unavailable".to_string(),
        };
        assert!(error.is_retryable());
    }

    #[test]
    fn test_api_error_not_retryable_4xx() {
        let error = BigPandaError::Api {
            step: "creating maintenance plan",
            status: 400,
            message: "Bad request".to_string(),
        };
        assert!(!error.is_retryable());

        let error = BigPandaError::Api {
            step: "looking up mapping enrichment",
            status: 401,
            message: "Unauthorized".to_string(),
        };
        assert!(!error.is_retryable());
    }

    #[test]
    fn test_error_display_includes_step() {
        let error = BigPandaError::Api {
            step: "polling enrichment job",
            status: 500,
            message: "Internal server error".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "BigPanda API error while polling enrichment job: HTTP 500 - Internal server error"
        );
    }

    #[test]
    fn test_job_failed_names_job() {
        let error = BigPandaError::JobFailed {
            job_id: "job-42".to_string(),
        };
        assert!(error.to_string().contains("job-42"));
        assert!(!error.is_retryable());
    }

    #[test]
    fn test_missing_job_id_not_retryable() {
        assert!(!BigPandaError::MissingJobId.is_retryable());
    }

    #[test]
    fn test_validation_not_retryable() {
        let error = BigPandaError::Validation("bad arguments".to_string());
        assert!(!error.is_retryable());
    }
}
