use std::fmt;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use gymbook_core::types::Interest;

/// An interest paired with the next instant its weekly slot starts.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledOccurrence {
    /// Club the interest is configured under.
    pub club: String,
    pub interest: Interest,
    /// Class start, in the portal's timezone.
    pub start: DateTime<Tz>,
}

impl ScheduledOccurrence {
    pub fn start_utc(&self) -> DateTime<Utc> {
        self.start.with_timezone(&Utc)
    }
}

impl fmt::Display for ScheduledOccurrence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} | {}", self.club, self.interest)
    }
}

/// What one discovery pass concluded about a single interest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptStatus {
    /// No discovered class satisfied the interest.
    NoMatch,
    AlreadyBooked,
    /// Matched, but the booking window has not opened.
    NotOpen,
    /// Matched and bookable, but the club or class id is missing.
    MissingData,
    /// The reservation request failed or was not confirmed.
    BookingFailed,
    Booked,
}

impl AttemptStatus {
    /// Nothing left to do for this occurrence.
    pub fn is_satisfied(self) -> bool {
        matches!(self, AttemptStatus::Booked | AttemptStatus::AlreadyBooked)
    }
}

impl fmt::Display for AttemptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AttemptStatus::NoMatch => "no_match",
            AttemptStatus::AlreadyBooked => "already_booked",
            AttemptStatus::NotOpen => "not_open",
            AttemptStatus::MissingData => "missing_data",
            AttemptStatus::BookingFailed => "booking_failed",
            AttemptStatus::Booked => "booked",
        };
        write!(f, "{s}")
    }
}

/// Per-interest outcome of a discovery pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterestResult {
    pub club: String,
    pub interest: Interest,
    pub status: AttemptStatus,
}

/// States of the booking loop.
#[derive(Debug, Clone, PartialEq)]
pub enum LoopState {
    /// No interests configured; check again after the idle delay.
    Idle,
    /// Sleeping until shortly before the booking window opens.
    Waiting {
        occurrence: ScheduledOccurrence,
        wake_at: DateTime<Utc>,
    },
    /// Attempting reservation until satisfied or `cutoff` passes.
    Retrying {
        occurrence: ScheduledOccurrence,
        cutoff: DateTime<Utc>,
    },
}

/// How a retry phase ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseOutcome {
    /// Booked, or found already booked.
    Satisfied { attempts: u32 },
    /// The cutoff passed first.
    Missed { attempts: u32 },
    /// Shutdown was requested mid-phase.
    Shutdown,
}
