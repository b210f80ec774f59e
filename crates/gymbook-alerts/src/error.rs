use thiserror::Error;

/// Errors that can occur while delivering an alert.
#[derive(Debug, Error)]
pub enum AlertError {
    /// The configured endpoint is not an http(s) URL.
    #[error("Invalid alert endpoint {url}: {reason}")]
    InvalidEndpoint { url: String, reason: String },

    /// The request could not be sent or timed out.
    #[error("Alert delivery failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The endpoint answered with a non-success status.
    #[error("Alert endpoint returned status {status}")]
    Rejected { status: u16 },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
