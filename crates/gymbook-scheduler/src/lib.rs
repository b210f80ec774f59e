//! `gymbook-scheduler` — turns class interests into reservations.
//!
//! # Overview
//!
//! [`occurrence`] maps each interest to the next instant its weekly slot
//! starts. [`pass`] runs one discovery + booking pass against a
//! [`gymbook_portal::Portal`]. [`engine::BookingLoop`] strings the two together
//! into a long-running state machine:
//!
//! | State      | Behaviour                                                     |
//! |------------|---------------------------------------------------------------|
//! | `Idle`     | No interests; re-check after the idle delay                   |
//! | `Waiting`  | Sleep until `start - lead_time - early_buffer`                |
//! | `Retrying` | Attempt every `retry_delay` until booked or `start + grace`   |
//!
//! Time and sleeping go through [`clock::Clock`] so the loop can be driven by a
//! [`clock::ManualClock`] in tests.

pub mod clock;
pub mod engine;
pub mod error;
pub mod occurrence;
pub mod pass;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::BookingLoop;
pub use error::{InterestField, Result, SchedulerError};
pub use occurrence::{next_occurrence, next_scheduled_occurrence};
pub use pass::schedule_interests;
pub use types::{AttemptStatus, InterestResult, LoopState, PhaseOutcome, ScheduledOccurrence};
