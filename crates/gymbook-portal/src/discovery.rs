//! Schedule discovery — logs in and scrapes every club's schedule page.
//!
//! The schedule page is a list of `daily-schedule` blocks. Each block carries a
//! day label (`schedule-day` > `strong`) followed by `schedule-class` entries
//! with title, hours, room, trainers and an optional `btn-book-class` control
//! whose `cancel-link` class means the member already holds a reservation.

use std::sync::LazyLock;
use std::time::Duration;

use futures_util::future::try_join_all;
use gymbook_core::types::{Club, Credentials, Session};
use regex::Regex;
use tracing::{debug, info};

use crate::client::{PortalBase, USER_AGENT};
use crate::error::{PortalError, Result};

static CLASS_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<([a-z][a-z0-9]*)\b[^>]*?\sclass\s*=\s*["']([^"']*)["'][^>]*>"#).unwrap()
});
static STRONG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<strong\b[^>]*>(.*?)</strong\s*>").unwrap());
static DATA_TARGET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)data-target\s*=\s*["']([^"']*)["']"#).unwrap());
static ANY_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").unwrap());
static NUMERIC_ENTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&#(x[0-9a-fA-F]+|[0-9]+);").unwrap());

/// Log in, then fetch and parse every club's schedule concurrently.
pub(crate) async fn fetch_sessions(
    base: &PortalBase,
    timeout: Duration,
    credentials: &Credentials,
    clubs: &[Club],
) -> Result<Vec<Session>> {
    if !credentials.is_complete() {
        return Err(PortalError::MissingCredentials);
    }
    if clubs.is_empty() {
        return Err(PortalError::NoClubs);
    }

    // Redirects are followed here; discovery only needs the cookies.
    let client = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .cookie_store(true)
        .timeout(timeout)
        .build()?;

    let resp = client
        .post(base.login_url())
        .form(&[
            ("email", credentials.email.as_str()),
            ("member_password", credentials.password.as_str()),
            ("remember_me", "false"),
        ])
        .send()
        .await?;

    let status = resp.status();
    let landing = base.landing_url();
    if !status.is_success() || resp.url().path() != landing.path() {
        return Err(PortalError::AuthenticationFailed {
            status: status.as_u16(),
            location: Some(resp.url().to_string()),
        });
    }

    let pages = clubs.iter().map(|club| fetch_club(&client, base, club));
    let sessions: Vec<Session> = try_join_all(pages).await?.into_iter().flatten().collect();

    info!(clubs = clubs.len(), sessions = sessions.len(), "schedule discovery complete");
    Ok(sessions)
}

async fn fetch_club(client: &reqwest::Client, base: &PortalBase, club: &Club) -> Result<Vec<Session>> {
    let schedule_err = |e: reqwest::Error| PortalError::Schedule {
        club: club.name.clone(),
        reason: e.to_string(),
    };

    debug!(club = %club.name, club_id = %club.id, "requesting schedule");

    let html = client
        .post(base.schedule_url())
        .form(&[("clubid", club.id.as_str()), ("group", "-1")])
        .send()
        .await
        .map_err(schedule_err)?
        .error_for_status()
        .map_err(schedule_err)?
        .text()
        .await
        .map_err(schedule_err)?;

    let sessions = parse_schedule(&html, club);
    debug!(club = %club.name, count = sessions.len(), "schedule parsed");
    Ok(sessions)
}

/// An opening tag that carries a `class` attribute.
struct ClassTag<'a> {
    name: &'a str,
    classes: &'a str,
    start: usize,
    end: usize,
}

impl ClassTag<'_> {
    fn has_class(&self, class: &str) -> bool {
        self.classes.split_whitespace().any(|c| c.eq_ignore_ascii_case(class))
    }
}

fn class_tags(html: &str) -> Vec<ClassTag<'_>> {
    CLASS_TAG
        .captures_iter(html)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            Some(ClassTag {
                name: caps.get(1)?.as_str(),
                classes: caps.get(2)?.as_str(),
                start: whole.start(),
                end: whole.end(),
            })
        })
        .collect()
}

/// Split `[from, to)` into sections, each starting at a tag with `class`.
fn sections(tags: &[ClassTag<'_>], class: &str, from: usize, to: usize) -> Vec<(usize, usize)> {
    let starts: Vec<usize> = tags
        .iter()
        .filter(|t| t.start >= from && t.start < to && t.has_class(class))
        .map(|t| t.start)
        .collect();

    starts
        .iter()
        .enumerate()
        .map(|(i, &start)| (start, starts.get(i + 1).copied().unwrap_or(to)))
        .collect()
}

/// Text of the first element with `class` inside `[from, to)`.
fn element_text(html: &str, tags: &[ClassTag<'_>], class: &str, from: usize, to: usize) -> String {
    let Some(tag) = tags
        .iter()
        .find(|t| t.start >= from && t.start < to && t.has_class(class))
    else {
        return String::new();
    };

    let rest = &html[tag.end..to];
    let close = format!("</{}", tag.name.to_ascii_lowercase());
    let inner_end = rest.to_ascii_lowercase().find(&close).unwrap_or(rest.len());
    clean_text(&rest[..inner_end])
}

/// Parse one club's schedule page into sessions.
pub fn parse_schedule(html: &str, club: &Club) -> Vec<Session> {
    let tags = class_tags(html);
    let mut sessions = Vec::new();

    for (day_start, day_end) in sections(&tags, "daily-schedule", 0, html.len()) {
        let entries = sections(&tags, "schedule-class", day_start, day_end);
        let header_end = entries.first().map(|(s, _)| *s).unwrap_or(day_end);
        let day = day_label(html, &tags, day_start, header_end);

        for (start, end) in entries {
            let button = tags
                .iter()
                .find(|t| t.start >= start && t.start < end && t.has_class("btn-book-class"));
            let already_booked = button.is_some_and(|b| b.has_class("cancel-link"));

            sessions.push(Session {
                club_id: club.id.clone(),
                club_name: club.name.clone(),
                day: day.clone(),
                time: element_text(html, &tags, "class-hours", start, end),
                title: element_text(html, &tags, "class-title", start, end),
                trainer: element_text(html, &tags, "trainers", start, end),
                room: element_text(html, &tags, "room", start, end),
                class_id: class_id(&html[start..end]),
                bookable: button.is_some() && !already_booked,
                already_booked,
            });
        }
    }

    sessions
}

fn day_label(html: &str, tags: &[ClassTag<'_>], from: usize, to: usize) -> String {
    let Some(day_tag) = tags
        .iter()
        .find(|t| t.start >= from && t.start < to && t.has_class("schedule-day"))
    else {
        return String::new();
    };

    STRONG
        .captures(&html[day_tag.end..to])
        .and_then(|caps| caps.get(1))
        .map(|m| clean_text(m.as_str()))
        .unwrap_or_default()
}

/// `data-target="#class-123"` → `"123"`.
fn class_id(entry: &str) -> String {
    DATA_TARGET
        .captures(entry)
        .and_then(|caps| caps.get(1))
        .map(|m| {
            let raw = m.as_str().trim();
            let raw = raw.strip_prefix('#').unwrap_or(raw);
            raw.strip_prefix("class-").unwrap_or(raw).to_string()
        })
        .unwrap_or_default()
}

/// Strip tags, decode common entities and collapse whitespace.
fn clean_text(fragment: &str) -> String {
    let text = ANY_TAG.replace_all(fragment, " ");
    let text = NUMERIC_ENTITY.replace_all(&text, |caps: &regex::Captures| {
        let code = &caps[1];
        let value = match code.strip_prefix('x').or_else(|| code.strip_prefix('X')) {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => code.parse().ok(),
        };
        value
            .and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_default()
    });
    let text = text
        .replace("&nbsp;", " ")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&");

    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
