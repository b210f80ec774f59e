use std::time::Duration;

use async_trait::async_trait;
use gymbook_core::types::{Club, Credentials, Session};
use tracing::debug;
use url::Url;

use crate::discovery;
use crate::error::{PortalError, Result};
use crate::portal::{BookingSession, Portal};
use crate::session::HttpBookingSession;

pub(crate) const USER_AGENT: &str = concat!("gymbook/", env!("CARGO_PKG_VERSION"));

// Portal endpoints, relative to the base URL.
pub(crate) const LOGIN_PATH: &str = "_process_login.php";
pub(crate) const LANDING_PATH: &str = "dashboard.php";
pub(crate) const SCHEDULE_PATH: &str = "member-schedule.php";
pub(crate) const BOOK_PATH: &str = "_book_class.php";

/// Entry point for scraping schedules and opening booking sessions.
#[derive(Debug, Clone)]
pub struct PortalClient {
    base: PortalBase,
    request_timeout: Duration,
}

impl PortalClient {
    /// Validate `base_url` and build a client.
    ///
    /// An unusable base URL is a configuration problem, so it fails here rather
    /// than on the first request.
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self> {
        Ok(Self {
            base: PortalBase::parse(base_url)?,
            request_timeout,
        })
    }

    pub fn base(&self) -> &PortalBase {
        &self.base
    }
}

#[async_trait]
impl Portal for PortalClient {
    async fn fetch_sessions(&self, credentials: &Credentials, clubs: &[Club]) -> Result<Vec<Session>> {
        discovery::fetch_sessions(&self.base, self.request_timeout, credentials, clubs).await
    }

    async fn open_session(&self, credentials: &Credentials) -> Result<Box<dyn BookingSession>> {
        let session = HttpBookingSession::open(&self.base, self.request_timeout, credentials).await?;
        Ok(Box::new(session))
    }
}

/// Parsed base URL with helpers for the portal's fixed endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortalBase {
    url: Url,
}

impl PortalBase {
    pub fn parse(raw: &str) -> Result<Self> {
        let invalid = |reason: String| PortalError::InvalidBaseUrl {
            url: raw.to_string(),
            reason,
        };

        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(invalid("base URL is required".to_string()));
        }

        let url = Url::parse(trimmed).map_err(|e| invalid(e.to_string()))?;
        if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
            return Err(invalid("expected an http(s) URL".to_string()));
        }

        Ok(Self { url })
    }

    /// Append `path` as a segment under the base path (`https://host/app` + `x.php`
    /// gives `https://host/app/x.php`).
    pub fn endpoint(&self, path: &str) -> Url {
        let mut url = self.url.clone();
        url.set_query(None);
        url.set_fragment(None);
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(path);
        }
        url
    }

    pub fn login_url(&self) -> Url {
        self.endpoint(LOGIN_PATH)
    }

    pub fn landing_url(&self) -> Url {
        self.endpoint(LANDING_PATH)
    }

    pub fn schedule_url(&self) -> Url {
        self.endpoint(SCHEDULE_PATH)
    }

    pub fn book_url(&self, club_id: &str, class_id: &str) -> Url {
        let mut url = self.endpoint(BOOK_PATH);
        url.query_pairs_mut()
            .append_pair("id", class_id)
            .append_pair("clubid", club_id);
        url
    }

    /// Resolve a `Location` header the way a browser would for a request to
    /// one of the portal's endpoints.
    ///
    /// Unparseable values are returned verbatim so they still show up in errors.
    pub fn resolve_location(&self, location: &str) -> String {
        if location.is_empty() {
            return String::new();
        }
        match self.endpoint("").join(location) {
            Ok(url) => url.to_string(),
            Err(e) => {
                debug!(location, error = %e, "unresolvable redirect location");
                location.to_string()
            }
        }
    }
}
