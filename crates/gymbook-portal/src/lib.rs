//! `gymbook-portal` — HTTP conversation with the member portal.
//!
//! [`PortalClient`] implements [`Portal`]: it scrapes club schedules
//! ([`discovery`]) and opens authenticated [`HttpBookingSession`]s that submit
//! reservations. The scheduler only sees the traits, so tests can swap in an
//! in-memory portal.

pub mod client;
pub mod discovery;
pub mod error;
pub mod portal;
pub mod session;

pub use client::PortalClient;
pub use error::{PortalError, Result};
pub use portal::{BookOutcome, BookingSession, Portal};
pub use session::HttpBookingSession;
