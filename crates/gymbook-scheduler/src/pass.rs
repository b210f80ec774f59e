//! One discovery + booking pass over a set of interests.

use std::collections::BTreeMap;

use gymbook_core::{
    matcher::find_match,
    types::{Club, Credentials, Interest},
};
use gymbook_portal::{BookOutcome, BookingSession, Portal};
use tracing::{info, warn};

use crate::{
    error::{Result, SchedulerError},
    types::{AttemptStatus, InterestResult},
};

/// Fetch every club's schedule once, then classify and, where possible, book
/// each interest.
///
/// Exactly one result is returned per interest, in club key order then list
/// order. `session` is opened lazily on the first bookable match and left in
/// place for the caller to reuse. It is dropped when a reservation is
/// redirected elsewhere, which is also how the portal answers a lapsed login.
///
/// A discovery failure or a failed login fails the whole pass. A failed
/// reservation only marks its own interest as [`AttemptStatus::BookingFailed`].
pub async fn schedule_interests(
    portal: &dyn Portal,
    credentials: &Credentials,
    clubs: &[Club],
    interests: &BTreeMap<String, Vec<Interest>>,
    session: &mut Option<Box<dyn BookingSession>>,
) -> Result<Vec<InterestResult>> {
    let classes = portal.fetch_sessions(credentials, clubs).await?;

    let mut results = Vec::new();
    let mut matched = 0usize;

    for (club, list) in interests {
        for interest in list {
            let status = match find_match(&classes, club, interest) {
                None => AttemptStatus::NoMatch,
                Some(class) => {
                    matched += 1;

                    if class.already_booked {
                        info!(
                            club = %class.club_name,
                            day = %class.day,
                            time = %class.time,
                            title = %class.title,
                            trainer = %class.trainer,
                            class_id = %class.class_id,
                            "already booked"
                        );
                        AttemptStatus::AlreadyBooked
                    } else if !class.bookable {
                        info!(
                            club = %class.club_name,
                            day = %class.day,
                            time = %class.time,
                            title = %class.title,
                            trainer = %class.trainer,
                            "booking not open yet"
                        );
                        AttemptStatus::NotOpen
                    } else if class.class_id.is_empty() || class.club_id.is_empty() {
                        let missing = if class.class_id.is_empty() { "class" } else { "club" };
                        warn!(
                            club = %class.club_name,
                            day = %class.day,
                            time = %class.time,
                            title = %class.title,
                            missing,
                            "skipping class: missing identifier"
                        );
                        AttemptStatus::MissingData
                    } else {
                        let mut active = match session.take() {
                            Some(active) => active,
                            None => portal
                                .open_session(credentials)
                                .await
                                .map_err(SchedulerError::Session)?,
                        };

                        info!(
                            club = %class.club_name,
                            day = %class.day,
                            time = %class.time,
                            title = %class.title,
                            class_id = %class.class_id,
                            "scheduling attempt"
                        );

                        let mut return_session = true;
                        let status = match active.book(&class.club_id, &class.class_id).await {
                            Ok(BookOutcome::Confirmed) => {
                                info!(
                                    club = %class.club_name,
                                    day = %class.day,
                                    time = %class.time,
                                    title = %class.title,
                                    class_id = %class.class_id,
                                    "booked successfully"
                                );
                                AttemptStatus::Booked
                            }
                            Ok(outcome) => {
                                warn!(
                                    club = %class.club_name,
                                    day = %class.day,
                                    time = %class.time,
                                    title = %class.title,
                                    class_id = %class.class_id,
                                    %outcome,
                                    "booking attempted but not confirmed"
                                );
                                if matches!(outcome, BookOutcome::Rejected { .. }) {
                                    return_session = false;
                                }
                                AttemptStatus::BookingFailed
                            }
                            Err(e) => {
                                warn!(
                                    club = %class.club_name,
                                    day = %class.day,
                                    time = %class.time,
                                    title = %class.title,
                                    error = %e,
                                    "failed booking"
                                );
                                AttemptStatus::BookingFailed
                            }
                        };

                        if return_session {
                            *session = Some(active);
                        }
                        status
                    }
                }
            };

            results.push(InterestResult {
                club: club.clone(),
                interest: interest.clone(),
                status,
            });
        }
    }

    if matched == 0 {
        info!("no classes matched your filters");
    }

    Ok(results)
}

/// True when `results` show the given interest booked or already held.
pub fn is_satisfied(club: &str, interest: &Interest, results: &[InterestResult]) -> bool {
    results
        .iter()
        .find(|r| r.club == club && &r.interest == interest)
        .is_some_and(|r| r.status.is_satisfied())
}
