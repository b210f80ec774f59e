// In-memory stand-ins for the portal and the alert sink.

#![allow(dead_code)]

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use gymbook_alerts::{AlertSink, Tags};
use gymbook_core::types::{Club, Credentials, Interest, Session};
use gymbook_portal::{BookOutcome, BookingSession, Portal, PortalError};

#[derive(Default)]
struct State {
    pages: Mutex<Vec<Vec<Session>>>,
    outcomes: Mutex<VecDeque<Result<BookOutcome, PortalError>>>,
    fallback: Mutex<Option<BookOutcome>>,
    fail_fetch: AtomicBool,
    fail_login: AtomicBool,
    fetches: AtomicUsize,
    opens: AtomicUsize,
    booked: Mutex<Vec<(String, String)>>,
}

/// Portal whose schedule pages and booking answers are scripted.
///
/// Fetch `n` returns page `n`, repeating the last page once the script runs
/// out. Bookings consume scripted outcomes, then fall back to `Confirmed`.
#[derive(Clone, Default)]
pub struct FakePortal {
    state: Arc<State>,
}

impl FakePortal {
    pub fn with_pages(pages: Vec<Vec<Session>>) -> Self {
        let portal = Self::default();
        *portal.state.pages.lock().unwrap() = pages;
        portal
    }

    pub fn script_outcomes(&self, outcomes: Vec<Result<BookOutcome, PortalError>>) {
        self.state.outcomes.lock().unwrap().extend(outcomes);
    }

    /// Answer every unscripted booking with `outcome`.
    pub fn always(&self, outcome: BookOutcome) {
        *self.state.fallback.lock().unwrap() = Some(outcome);
    }

    pub fn fail_fetch(&self) {
        self.state.fail_fetch.store(true, Ordering::SeqCst);
    }

    pub fn fail_login(&self) {
        self.state.fail_login.store(true, Ordering::SeqCst);
    }

    pub fn fetches(&self) -> usize {
        self.state.fetches.load(Ordering::SeqCst)
    }

    pub fn opens(&self) -> usize {
        self.state.opens.load(Ordering::SeqCst)
    }

    pub fn books(&self) -> usize {
        self.state.booked.lock().unwrap().len()
    }

    pub fn booked(&self) -> Vec<(String, String)> {
        self.state.booked.lock().unwrap().clone()
    }
}

#[async_trait]
impl Portal for FakePortal {
    async fn fetch_sessions(&self, _credentials: &Credentials, clubs: &[Club]) -> gymbook_portal::Result<Vec<Session>> {
        let n = self.state.fetches.fetch_add(1, Ordering::SeqCst);
        if self.state.fail_fetch.load(Ordering::SeqCst) {
            return Err(PortalError::Schedule {
                club: clubs.first().map(|c| c.name.clone()).unwrap_or_default(),
                reason: "connection reset".to_string(),
            });
        }
        let pages = self.state.pages.lock().unwrap();
        Ok(pages.get(n).or(pages.last()).cloned().unwrap_or_default())
    }

    async fn open_session(&self, _credentials: &Credentials) -> gymbook_portal::Result<Box<dyn BookingSession>> {
        self.state.opens.fetch_add(1, Ordering::SeqCst);
        if self.state.fail_login.load(Ordering::SeqCst) {
            return Err(PortalError::AuthenticationFailed {
                status: 200,
                location: None,
            });
        }
        Ok(Box::new(FakeSession {
            state: Arc::clone(&self.state),
        }))
    }
}

struct FakeSession {
    state: Arc<State>,
}

#[async_trait]
impl BookingSession for FakeSession {
    async fn book(&mut self, club_id: &str, class_id: &str) -> gymbook_portal::Result<BookOutcome> {
        self.state
            .booked
            .lock()
            .unwrap()
            .push((club_id.to_string(), class_id.to_string()));

        if let Some(scripted) = self.state.outcomes.lock().unwrap().pop_front() {
            return scripted;
        }
        Ok(self
            .state
            .fallback
            .lock()
            .unwrap()
            .clone()
            .unwrap_or(BookOutcome::Confirmed))
    }
}

/// Alert sink that keeps everything it is given.
#[derive(Default)]
pub struct RecordingSink {
    alerts: Mutex<Vec<(String, Tags)>>,
}

impl RecordingSink {
    pub fn alerts(&self) -> Vec<(String, Tags)> {
        self.alerts.lock().unwrap().clone()
    }
}

impl AlertSink for RecordingSink {
    fn name(&self) -> &str {
        "recording"
    }

    fn report(&self, message: &str, tags: &Tags) {
        self.alerts
            .lock()
            .unwrap()
            .push((message.to_string(), tags.clone()));
    }
}

pub fn downtown() -> Club {
    Club {
        id: "12".to_string(),
        name: "Downtown".to_string(),
    }
}

pub fn credentials() -> Credentials {
    Credentials {
        email: "me@example.com".to_string(),
        password: "secret".to_string(),
    }
}

pub fn interest(day: &str, day_english: &str, time: &str, title: &str) -> Interest {
    Interest {
        day: day.to_string(),
        day_english: day_english.to_string(),
        time: time.to_string(),
        title: title.to_string(),
    }
}

/// Pilates on Monday 09:00 at Downtown.
pub fn pilates() -> Interest {
    interest("Luni", "Monday", "09:00 - 10:00", "Pilates")
}

pub fn interests(list: Vec<Interest>) -> BTreeMap<String, Vec<Interest>> {
    BTreeMap::from([("Downtown".to_string(), list)])
}

/// A Downtown class. `bookable` and `booked` mirror the book button's state.
pub fn class(day: &str, time: &str, title: &str, class_id: &str, bookable: bool, booked: bool) -> Session {
    Session {
        club_id: "12".to_string(),
        club_name: "Downtown".to_string(),
        day: day.to_string(),
        time: time.to_string(),
        title: title.to_string(),
        trainer: "Ana".to_string(),
        room: "Studio 1".to_string(),
        class_id: class_id.to_string(),
        bookable,
        already_booked: booked,
    }
}

pub fn pilates_class(bookable: bool, booked: bool) -> Session {
    class("Luni 05.01", "09:00 - 10:00", "Pilates", "9001", bookable, booked)
}
