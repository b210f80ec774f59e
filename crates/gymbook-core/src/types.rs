use serde::{Deserialize, Serialize};
use std::fmt;

/// Member portal login.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn is_complete(&self) -> bool {
        !self.email.trim().is_empty() && !self.password.is_empty()
    }
}

// Keeps the password out of logs and panic messages.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// A club whose schedule should be scraped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Club {
    /// Portal-assigned club identifier (sent as `clubid`).
    pub id: String,
    /// Display name; also the key interests are grouped under.
    pub name: String,
}

/// A standing request to track or book a weekly class.
///
/// Equality covers every field, so two interests configured identically under
/// the same club are indistinguishable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interest {
    /// Day label as printed by the portal (e.g. `"Luni"`); matched as a substring.
    #[serde(default)]
    pub day: String,
    /// English weekday name used for date arithmetic (e.g. `"Monday"`).
    #[serde(default)]
    pub day_english: String,
    /// Time range as printed by the portal (e.g. `"07:00 - 08:00"`).
    #[serde(default)]
    pub time: String,
    /// Case-insensitive title filter. Empty matches every class.
    #[serde(default)]
    pub title: String,
}

impl fmt::Display for Interest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} | {}", self.day, self.time)?;
        if !self.title.is_empty() {
            write!(f, " | {}", self.title)?;
        }
        Ok(())
    }
}

/// One scheduled class as discovered on a club's schedule page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub club_id: String,
    pub club_name: String,
    pub day: String,
    pub time: String,
    pub title: String,
    pub trainer: String,
    pub room: String,
    /// Opaque portal identifier submitted when booking. May be empty.
    pub class_id: String,
    /// A reservation control is present and the class is not reserved yet.
    pub bookable: bool,
    pub already_booked: bool,
}

impl Session {
    /// Not bookable and not booked: the booking window has not opened yet.
    pub fn is_pending(&self) -> bool {
        !self.bookable && !self.already_booked
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_debug_redacts_password() {
        let creds = Credentials {
            email: "me@example.com".to_string(),
            password: "hunter2".to_string(),
        };
        let printed = format!("{creds:?}");
        assert!(printed.contains("me@example.com"));
        assert!(!printed.contains("hunter2"));
    }

    #[test]
    fn credentials_require_both_fields() {
        let mut creds = Credentials {
            email: "me@example.com".to_string(),
            password: String::new(),
        };
        assert!(!creds.is_complete());
        creds.password = "x".to_string();
        assert!(creds.is_complete());
    }

    #[test]
    fn interest_display_omits_empty_title() {
        let interest = Interest {
            day: "Luni".to_string(),
            day_english: "Monday".to_string(),
            time: "07:00 - 08:00".to_string(),
            title: String::new(),
        };
        assert_eq!(interest.to_string(), "Luni | 07:00 - 08:00");
    }

    #[test]
    fn pending_session_is_neither_bookable_nor_booked() {
        let session = Session::default();
        assert!(session.is_pending());
        let booked = Session {
            already_booked: true,
            ..Session::default()
        };
        assert!(!booked.is_pending());
    }
}
