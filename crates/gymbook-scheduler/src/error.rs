use std::fmt;

use gymbook_portal::PortalError;
use thiserror::Error;

/// Which part of an interest definition could not be parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterestField {
    Weekday,
    StartTime,
}

impl fmt::Display for InterestField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InterestField::Weekday => write!(f, "day_english"),
            InterestField::StartTime => write!(f, "time"),
        }
    }
}

/// Errors that can occur within the scheduler subsystem.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The interest set is empty; the loop idles instead of failing.
    #[error("No class interests configured")]
    NoInterestsConfigured,

    /// An interest's weekday or start time cannot be parsed.
    #[error("Malformed interest for {club} ({title}): invalid {field}: {reason}")]
    MalformedInterest {
        club: String,
        title: String,
        field: InterestField,
        reason: String,
    },

    /// The configured timezone is not a known IANA name.
    #[error("Invalid timezone {name}: {reason}")]
    InvalidTimezone { name: String, reason: String },

    /// The calendar ran out before a matching day was found.
    #[error("No occurrence representable after {0}")]
    OutOfRange(String),

    /// Logging in for a booking session failed.
    #[error("Start booking session: {0}")]
    Session(#[source] PortalError),

    /// Discovery or booking failed at the transport/protocol level.
    #[error("Portal error: {0}")]
    Portal(#[from] PortalError),

    /// A whole discovery + booking pass exceeded its time budget.
    #[error("Scheduling pass timed out after {ms}ms")]
    Timeout { ms: u64 },
}

impl SchedulerError {
    /// Configuration problems that retrying cannot fix.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SchedulerError::MalformedInterest { .. }
                | SchedulerError::InvalidTimezone { .. }
                | SchedulerError::OutOfRange(_)
        )
    }

    /// Short error code used as an alert tag.
    pub fn code(&self) -> &'static str {
        match self {
            SchedulerError::NoInterestsConfigured => "NO_INTERESTS",
            SchedulerError::MalformedInterest { .. } => "MALFORMED_INTEREST",
            SchedulerError::InvalidTimezone { .. } => "INVALID_TIMEZONE",
            SchedulerError::OutOfRange(_) => "OUT_OF_RANGE",
            SchedulerError::Session(_) => "SESSION_ERROR",
            SchedulerError::Portal(e) => e.code(),
            SchedulerError::Timeout { .. } => "TIMEOUT",
        }
    }
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
