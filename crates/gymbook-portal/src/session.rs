//! Authenticated booking session.
//!
//! The portal signals outcomes through redirects rather than response bodies:
//! a successful login redirects to the dashboard, a successful reservation
//! redirects back to the schedule listing. The client therefore never follows
//! redirects; the `Location` header is the answer.

use std::time::Duration;

use async_trait::async_trait;
use gymbook_core::types::Credentials;
use reqwest::{header::LOCATION, redirect, StatusCode};
use tracing::{debug, info, warn};

use crate::client::{PortalBase, USER_AGENT};
use crate::error::{PortalError, Result};
use crate::portal::{BookOutcome, BookingSession};

/// Booking session backed by a cookie-carrying `reqwest` client.
pub struct HttpBookingSession {
    client: reqwest::Client,
    base: PortalBase,
}

impl HttpBookingSession {
    /// Log in with `credentials` and keep the resulting cookies.
    pub async fn open(base: &PortalBase, timeout: Duration, credentials: &Credentials) -> Result<Self> {
        if !credentials.is_complete() {
            return Err(PortalError::MissingCredentials);
        }

        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .cookie_store(true)
            .redirect(redirect::Policy::none())
            .timeout(timeout)
            .build()?;

        debug!(url = %base.login_url(), "submitting login");

        let resp = client
            .post(base.login_url())
            .form(&[
                ("email", credentials.email.as_str()),
                ("member_password", credentials.password.as_str()),
                ("remember_me", "false"),
            ])
            .send()
            .await?;

        classify_login(base, resp.status(), location_header(&resp))?;
        info!(email = %credentials.email, "booking session opened");

        Ok(Self {
            client,
            base: base.clone(),
        })
    }
}

#[async_trait]
impl BookingSession for HttpBookingSession {
    async fn book(&mut self, club_id: &str, class_id: &str) -> Result<BookOutcome> {
        if club_id.is_empty() || class_id.is_empty() {
            return Err(PortalError::MissingIdentifier);
        }

        let url = self.base.book_url(club_id, class_id);
        debug!(%url, "submitting reservation");

        let resp = self.client.get(url).send().await?;
        let outcome = classify_booking(&self.base, resp.status(), location_header(&resp));

        if !outcome.is_confirmed() {
            warn!(club_id, class_id, %outcome, "reservation not confirmed");
        }
        Ok(outcome)
    }
}

fn location_header(resp: &reqwest::Response) -> Option<&str> {
    resp.headers().get(LOCATION).and_then(|v| v.to_str().ok())
}

/// Login succeeds only on a redirect to the landing page.
pub(crate) fn classify_login(base: &PortalBase, status: StatusCode, location: Option<&str>) -> Result<()> {
    let resolved = location.map(|l| base.resolve_location(l));

    if status.is_redirection() && resolved.as_deref() == Some(base.landing_url().as_str()) {
        return Ok(());
    }

    Err(PortalError::AuthenticationFailed {
        status: status.as_u16(),
        location: resolved,
    })
}

/// Map a reservation response onto a [`BookOutcome`].
pub(crate) fn classify_booking(base: &PortalBase, status: StatusCode, location: Option<&str>) -> BookOutcome {
    if status == StatusCode::OK {
        return BookOutcome::Confirmed;
    }

    if status.is_redirection() {
        let resolved = base.resolve_location(location.unwrap_or_default());
        if resolved == base.schedule_url().as_str() {
            return BookOutcome::Confirmed;
        }
        return BookOutcome::Rejected { location: resolved };
    }

    BookOutcome::UnexpectedStatus {
        status: status.as_u16(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> PortalBase {
        PortalBase::parse("https://portal.example.com").unwrap()
    }

    #[test]
    fn login_redirect_to_dashboard_succeeds() {
        assert!(classify_login(&base(), StatusCode::FOUND, Some("dashboard.php")).is_ok());
        assert!(classify_login(
            &base(),
            StatusCode::SEE_OTHER,
            Some("https://portal.example.com/dashboard.php")
        )
        .is_ok());
    }

    #[test]
    fn login_with_ok_status_is_an_auth_failure() {
        let err = classify_login(&base(), StatusCode::OK, None).unwrap_err();
        match err {
            PortalError::AuthenticationFailed { status, location } => {
                assert_eq!(status, 200);
                assert!(location.is_none());
            }
            other => panic!("expected AuthenticationFailed, got {other:?}"),
        }
    }

    #[test]
    fn login_redirect_elsewhere_is_an_auth_failure() {
        let err = classify_login(&base(), StatusCode::FOUND, Some("/login.php?error=1")).unwrap_err();
        match err {
            PortalError::AuthenticationFailed { status, location } => {
                assert_eq!(status, 302);
                assert_eq!(
                    location.as_deref(),
                    Some("https://portal.example.com/login.php?error=1")
                );
            }
            other => panic!("expected AuthenticationFailed, got {other:?}"),
        }
    }

    #[test]
    fn booking_ok_and_schedule_redirect_confirm() {
        assert_eq!(
            classify_booking(&base(), StatusCode::OK, None),
            BookOutcome::Confirmed
        );
        assert_eq!(
            classify_booking(&base(), StatusCode::FOUND, Some("member-schedule.php")),
            BookOutcome::Confirmed
        );
    }

    #[test]
    fn booking_redirect_elsewhere_is_rejected() {
        assert_eq!(
            classify_booking(&base(), StatusCode::FOUND, Some("/class-full.php")),
            BookOutcome::Rejected {
                location: "https://portal.example.com/class-full.php".to_string()
            }
        );
    }

    #[test]
    fn booking_other_status_is_unexpected() {
        assert_eq!(
            classify_booking(&base(), StatusCode::INTERNAL_SERVER_ERROR, None),
            BookOutcome::UnexpectedStatus { status: 500 }
        );
    }
}
