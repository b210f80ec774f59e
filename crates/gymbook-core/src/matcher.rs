//! Session matching — decides whether a discovered class satisfies an interest.
//!
//! Day is a case-insensitive substring filter, time an exact (trimmed,
//! case-insensitive) filter, and title an exact-then-substring filter. Empty
//! filters always pass. Partial title matches and interests without a title are
//! logged because they can select more classes than the user intended.

use std::collections::BTreeMap;

use tracing::info;

use crate::types::{Interest, Session};

/// Return true when `session` satisfies every non-empty filter of `interest`.
pub fn matches(session: &Session, interest: &Interest) -> bool {
    let day_needle = interest.day.trim().to_lowercase();
    if !day_needle.is_empty() && !session.day.trim().to_lowercase().contains(&day_needle) {
        return false;
    }

    let time_needle = interest.time.trim();
    if !time_needle.is_empty() && !session.time.trim().eq_ignore_ascii_case(time_needle) {
        return false;
    }

    let title_needle = interest.title.trim();
    if title_needle.is_empty() {
        info!(
            club = %session.club_name,
            day = %session.day,
            time = %session.time,
            title = %session.title,
            "interest has no title filter; matching any class"
        );
        return true;
    }

    let title = session.title.trim().to_lowercase();
    let title_needle = title_needle.to_lowercase();

    if title == title_needle {
        return true;
    }

    if title.contains(&title_needle) {
        info!(
            club = %session.club_name,
            day = %session.day,
            time = %session.time,
            interest_title = %interest.title,
            title = %session.title,
            "interest title partially matched class title"
        );
        return true;
    }

    false
}

/// First session of `club` that satisfies `interest`.
pub fn find_match<'a>(sessions: &'a [Session], club: &str, interest: &Interest) -> Option<&'a Session> {
    sessions
        .iter()
        .filter(|s| s.club_name == club)
        .find(|s| matches(s, interest))
}

/// Keep only sessions matched by at least one interest configured for their club.
pub fn filter_sessions(
    sessions: Vec<Session>,
    interests: &BTreeMap<String, Vec<Interest>>,
) -> Vec<Session> {
    sessions
        .into_iter()
        .filter(|s| {
            interests
                .get(&s.club_name)
                .is_some_and(|list| list.iter().any(|i| matches(s, i)))
        })
        .collect()
}
