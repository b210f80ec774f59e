use std::fmt;

use async_trait::async_trait;
use gymbook_core::types::{Club, Credentials, Session};

use crate::error::Result;

/// How the portal answered a reservation request.
///
/// Kept as a tagged value rather than a boolean so "the request went through"
/// is never confused with "the class is booked".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookOutcome {
    /// HTTP 200, or a redirect back to the schedule listing.
    Confirmed,
    /// Redirected somewhere other than the schedule listing.
    Rejected { location: String },
    /// Any status that is neither 200 nor a redirect.
    UnexpectedStatus { status: u16 },
}

impl BookOutcome {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, BookOutcome::Confirmed)
    }
}

impl fmt::Display for BookOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookOutcome::Confirmed => write!(f, "confirmed"),
            BookOutcome::Rejected { location } => write!(f, "rejected, redirected to {location}"),
            BookOutcome::UnexpectedStatus { status } => write!(f, "unexpected status {status}"),
        }
    }
}

/// Everything the scheduler needs from the member portal.
#[async_trait]
pub trait Portal: Send + Sync {
    /// Log in and return every session of every requested club.
    ///
    /// Any failure fails the whole call; partial results are never returned.
    async fn fetch_sessions(&self, credentials: &Credentials, clubs: &[Club]) -> Result<Vec<Session>>;

    /// Log in and return a session that can submit reservations.
    async fn open_session(&self, credentials: &Credentials) -> Result<Box<dyn BookingSession>>;
}

/// An authenticated conversation scoped to one login.
///
/// Calls take `&mut self`: the portal's cookie state is not safe for concurrent
/// reservations, so they are serialized by the borrow checker.
#[async_trait]
pub trait BookingSession: Send {
    /// Submit a reservation for `class_id` at `club_id`.
    ///
    /// A transport error leaves the session usable for the next attempt.
    async fn book(&mut self, club_id: &str, class_id: &str) -> Result<BookOutcome>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_confirmed_counts_as_booked() {
        assert!(BookOutcome::Confirmed.is_confirmed());
        assert!(!BookOutcome::Rejected {
            location: "https://portal/login.php".to_string()
        }
        .is_confirmed());
        assert!(!BookOutcome::UnexpectedStatus { status: 500 }.is_confirmed());
    }

    #[test]
    fn outcome_display_names_target() {
        let outcome = BookOutcome::Rejected {
            location: "https://portal/full.php".to_string(),
        };
        assert_eq!(outcome.to_string(), "rejected, redirected to https://portal/full.php");
    }
}
