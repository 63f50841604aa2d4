use thiserror::Error;

/// Errors produced by the request builder and the job driver
#[derive(Debug, Error)]
pub enum GenerationError {
    /// Bad request construction, raised before any network call
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Transport failure or non-2xx answer from the provider. `status` is
    /// `None` when the request never produced an HTTP response.
    #[error("provider request failed{}: {body}", fmt_status(.status))]
    Submission { status: Option<u16>, body: String },

    /// The provider reported completion but the response was unusable
    #[error("unusable provider response: {0}")]
    Protocol(String),

    /// The provider explicitly reported that the job failed
    #[error("generation failed: {0}")]
    Failed(String),

    #[error("generation timed out after {attempts} poll attempts")]
    Timeout { attempts: u32 },

    /// Driver misuse, e.g. polling a job that already reached a terminal
    /// state. Should never surface from a correct integration.
    #[error("invalid driver state: {0}")]
    InvalidState(String),

    #[error("generation was cancelled")]
    Cancelled,
}

fn fmt_status(status: &Option<u16>) -> String {
    match status {
        Some(status) => format!(" with status {status}"),
        None => String::new(),
    }
}

impl GenerationError {
    pub fn transport(err: reqwest::Error) -> Self {
        Self::Submission {
            status: err.status().map(|s| s.as_u16()),
            body: err.to_string(),
        }
    }

    pub fn http(status: reqwest::StatusCode, body: String) -> Self {
        Self::Submission {
            status: Some(status.as_u16()),
            body,
        }
    }
}
