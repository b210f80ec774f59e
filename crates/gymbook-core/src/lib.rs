//! `gymbook-core` — configuration, shared types and the session matcher.
//!
//! Every other crate in the workspace depends on this one. It performs no I/O
//! apart from reading the configuration file.

pub mod config;
pub mod error;
pub mod matcher;
pub mod types;

pub use config::{AlertingConfig, BookingConfig, GymbookConfig};
pub use error::{GymbookError, Result};
pub use types::{Club, Credentials, Interest, Session};
