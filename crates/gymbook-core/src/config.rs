use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{GymbookError, Result};
use crate::types::{Club, Credentials, Interest};

pub const DEFAULT_BASE_URL: &str = "https://members.worldclass.ro";
pub const DEFAULT_TIMEZONE: &str = "Europe/Bucharest";
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

// Booking timings observed on the member portal.
pub const DEFAULT_LEAD_TIME: Duration = Duration::from_secs(26 * 60 * 60); // reservations open 26h before start
pub const DEFAULT_EARLY_BUFFER: Duration = Duration::from_secs(60);
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(10);
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(60);
pub const DEFAULT_IDLE_DELAY: Duration = Duration::from_secs(60 * 60);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Top-level config (config.toml + GYMBOOK_* env overrides).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GymbookConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// IANA timezone name the portal's schedule is expressed in.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default)]
    pub credentials: Credentials,
    #[serde(default)]
    pub clubs: Vec<Club>,
    /// Interests keyed by club name. Sorted so every pass walks clubs in the same order.
    #[serde(default)]
    pub interests: BTreeMap<String, Vec<Interest>>,
    #[serde(default)]
    pub booking: BookingConfig,
    /// Alert webhook. When absent, alerts are dropped silently.
    #[serde(default)]
    pub alerting: Option<AlertingConfig>,
}

/// Booking-window timings. Values are humantime strings such as `"26h"` or `"10s"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingConfig {
    /// How long before class start the portal opens reservations.
    #[serde(default = "default_lead_time", with = "humantime_serde")]
    pub lead_time: Duration,
    /// Extra margin so the loop wakes before the window opens rather than racing it.
    #[serde(default = "default_early_buffer", with = "humantime_serde")]
    pub early_buffer: Duration,
    /// Pause between two attempts inside a retry phase.
    #[serde(default = "default_retry_delay", with = "humantime_serde")]
    pub retry_delay: Duration,
    /// How long after class start attempts are still made.
    #[serde(default = "default_grace_period", with = "humantime_serde")]
    pub grace_period: Duration,
    /// Sleep between checks when no interests are configured.
    #[serde(default = "default_idle_delay", with = "humantime_serde")]
    pub idle_delay: Duration,
    /// Upper bound for a single network call and for a whole discovery pass.
    #[serde(default = "default_request_timeout", with = "humantime_serde")]
    pub request_timeout: Duration,
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            lead_time: DEFAULT_LEAD_TIME,
            early_buffer: DEFAULT_EARLY_BUFFER,
            retry_delay: DEFAULT_RETRY_DELAY,
            grace_period: DEFAULT_GRACE_PERIOD,
            idle_delay: DEFAULT_IDLE_DELAY,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertingConfig {
    /// URL that receives a JSON POST per alert.
    pub endpoint: String,
    /// When set, the body is signed with HMAC-SHA256.
    pub secret: Option<String>,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}
fn default_timezone() -> String {
    DEFAULT_TIMEZONE.to_string()
}
fn default_lead_time() -> Duration {
    DEFAULT_LEAD_TIME
}
fn default_early_buffer() -> Duration {
    DEFAULT_EARLY_BUFFER
}
fn default_retry_delay() -> Duration {
    DEFAULT_RETRY_DELAY
}
fn default_grace_period() -> Duration {
    DEFAULT_GRACE_PERIOD
}
fn default_idle_delay() -> Duration {
    DEFAULT_IDLE_DELAY
}
fn default_request_timeout() -> Duration {
    DEFAULT_REQUEST_TIMEOUT
}

impl Default for GymbookConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timezone: default_timezone(),
            credentials: Credentials::default(),
            clubs: Vec::new(),
            interests: BTreeMap::new(),
            booking: BookingConfig::default(),
            alerting: None,
        }
    }
}

impl GymbookConfig {
    /// Load config from a TOML file with GYMBOOK_* env var overrides.
    ///
    /// Nested keys use a double underscore, e.g. `GYMBOOK_CREDENTIALS__PASSWORD`.
    pub fn load(path: &str) -> Result<Self> {
        if !Path::new(path).is_file() {
            return Err(GymbookError::Config(format!(
                "config file not found: {path}"
            )));
        }

        let config: GymbookConfig = Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("GYMBOOK_").ignore(&["config"]).split("__"))
            .extract()
            .map_err(|e| GymbookError::Config(e.to_string()))?;

        config.validate()
    }

    /// Apply defaults for blank values and reject incomplete configs.
    pub fn validate(mut self) -> Result<Self> {
        if self.base_url.trim().is_empty() {
            self.base_url = default_base_url();
        }
        if self.timezone.trim().is_empty() {
            self.timezone = default_timezone();
        }

        if !self.credentials.is_complete() {
            return Err(GymbookError::Config(
                "credentials.email and credentials.password must be set".to_string(),
            ));
        }

        if self.clubs.is_empty() {
            return Err(GymbookError::Config(
                "at least one club must be configured".to_string(),
            ));
        }

        if let Some(club) = self.clubs.iter().find(|c| c.name.trim().is_empty()) {
            return Err(GymbookError::Config(format!(
                "club {} has no name",
                club.id
            )));
        }

        if self
            .alerting
            .as_ref()
            .is_some_and(|a| a.endpoint.trim().is_empty())
        {
            tracing::warn!("alerting.endpoint is empty; alerts disabled");
            self.alerting = None;
        }

        Ok(self)
    }

    /// Total number of interests across all clubs.
    pub fn interest_count(&self) -> usize {
        self.interests.values().map(Vec::len).sum()
    }
}
