use thiserror::Error;

/// Errors raised while talking to the member portal.
#[derive(Debug, Error)]
pub enum PortalError {
    /// The configured base URL cannot be used to build portal endpoints.
    #[error("Invalid base URL {url}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("Email and password are required")]
    MissingCredentials,

    #[error("At least one club is required")]
    NoClubs,

    /// Login was not answered with a redirect to the landing page.
    #[error("Authentication failed: status {status}, location {location}", location = .location.as_deref().unwrap_or("<none>"))]
    AuthenticationFailed { status: u16, location: Option<String> },

    /// `book` was called without a club or class identifier.
    #[error("Club id and class id are required")]
    MissingIdentifier,

    #[error("Schedule request for club {club} failed: {reason}")]
    Schedule { club: String, reason: String },

    /// Transport-level failure (DNS, connect, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl PortalError {
    /// Short error code used as an alert tag.
    pub fn code(&self) -> &'static str {
        match self {
            PortalError::InvalidBaseUrl { .. } => "INVALID_BASE_URL",
            PortalError::MissingCredentials => "MISSING_CREDENTIALS",
            PortalError::NoClubs => "NO_CLUBS",
            PortalError::AuthenticationFailed { .. } => "AUTH_FAILED",
            PortalError::MissingIdentifier => "MISSING_IDENTIFIER",
            PortalError::Schedule { .. } => "SCHEDULE_ERROR",
            PortalError::Http(_) => "HTTP_ERROR",
        }
    }

    /// True for failures that a later attempt may not hit again.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PortalError::Http(_) | PortalError::Schedule { .. } | PortalError::AuthenticationFailed { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, PortalError>;
