use std::collections::BTreeMap;

use chrono::{
    DateTime, Datelike, LocalResult, NaiveDateTime, NaiveTime, Offset, TimeDelta, TimeZone, Utc,
    Weekday,
};
use chrono_tz::Tz;
use gymbook_core::types::Interest;

use crate::{
    error::{InterestField, Result, SchedulerError},
    types::ScheduledOccurrence,
};

/// Parse a full English weekday name, case-insensitively.
///
/// Abbreviations are not accepted: interests are written as `Monday`, not `Mon`.
pub fn parse_weekday(raw: &str) -> Option<Weekday> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "monday" => Some(Weekday::Mon),
        "tuesday" => Some(Weekday::Tue),
        "wednesday" => Some(Weekday::Wed),
        "thursday" => Some(Weekday::Thu),
        "friday" => Some(Weekday::Fri),
        "saturday" => Some(Weekday::Sat),
        "sunday" => Some(Weekday::Sun),
        _ => None,
    }
}

/// Start time of a range such as `"07:00 - 08:00"`.
///
/// Only the part before the first `-` is read, and it must be `H:MM` or `HH:MM`.
pub fn parse_start_time(raw: &str) -> std::result::Result<NaiveTime, String> {
    let start = raw.split('-').next().unwrap_or_default().trim();
    let mut parts = start.split(':');
    let (Some(hour), Some(minute)) = (parts.next(), parts.next()) else {
        return Err(format!("expected HH:MM, got {start:?}"));
    };

    let hour: u32 = hour
        .trim()
        .parse()
        .map_err(|_| format!("invalid hour {hour:?}"))?;
    let minute: u32 = minute
        .trim()
        .parse()
        .map_err(|_| format!("invalid minute {minute:?}"))?;

    NaiveTime::from_hms_opt(hour, minute, 0)
        .ok_or_else(|| format!("{hour:02}:{minute:02} is out of range"))
}

/// The first instant strictly after `reference` that falls on `weekday` at
/// `start` local time in `tz`.
///
/// When `reference` is exactly such an instant the answer is one week later.
/// A start inside a DST gap is shifted forward by the gap length; an ambiguous
/// start resolves to the earlier of the two instants.
///
/// Returns `None` only when the calendar overflows.
pub fn next_occurrence(
    reference: DateTime<Utc>,
    tz: Tz,
    weekday: Weekday,
    start: NaiveTime,
) -> Option<DateTime<Tz>> {
    // Eight consecutive dates always contain the weekday twice when today
    // matches, so the later one is guaranteed to be after `reference`.
    reference
        .with_timezone(&tz)
        .date_naive()
        .iter_days()
        .take(8)
        .filter(|date| date.weekday() == weekday)
        .map(|date| resolve_local(tz, date.and_time(start)))
        .find(|candidate| candidate.with_timezone(&Utc) > reference)
}

fn resolve_local(tz: Tz, local: NaiveDateTime) -> DateTime<Tz> {
    match tz.from_local_datetime(&local) {
        LocalResult::Single(dt) => dt,
        LocalResult::Ambiguous(earliest, _) => earliest,
        LocalResult::None => {
            // Wall-clock time skipped by a forward transition: keep the offset
            // in force before the gap.
            let before = tz
                .from_local_datetime(&(local - TimeDelta::hours(3)))
                .earliest()
                .map(|dt| dt.offset().fix())
                .unwrap_or_else(|| Utc.fix());
            tz.from_utc_datetime(&(local - before))
        }
    }
}

/// The interest whose next occurrence is earliest, across all clubs.
///
/// Clubs are visited in key order and interests in list order; on a tie the
/// first one visited wins.
pub fn next_scheduled_occurrence(
    interests: &BTreeMap<String, Vec<Interest>>,
    tz: Tz,
    reference: DateTime<Utc>,
) -> Result<ScheduledOccurrence> {
    let mut best: Option<ScheduledOccurrence> = None;

    for (club, list) in interests {
        for interest in list {
            let malformed = |field: InterestField, reason: String| SchedulerError::MalformedInterest {
                club: club.clone(),
                title: interest.title.clone(),
                field,
                reason,
            };

            let weekday = parse_weekday(&interest.day_english).ok_or_else(|| {
                malformed(
                    InterestField::Weekday,
                    format!("unknown weekday {:?}", interest.day_english),
                )
            })?;
            let start = parse_start_time(&interest.time)
                .map_err(|reason| malformed(InterestField::StartTime, reason))?;

            let when = next_occurrence(reference, tz, weekday, start)
                .ok_or_else(|| SchedulerError::OutOfRange(reference.to_rfc3339()))?;

            if best.as_ref().map_or(true, |b| when < b.start) {
                best = Some(ScheduledOccurrence {
                    club: club.clone(),
                    interest: interest.clone(),
                    start: when,
                });
            }
        }
    }

    best.ok_or(SchedulerError::NoInterestsConfigured)
}

#[cfg(test)]
mod tests {
    use chrono::Timelike;
    use chrono_tz::Europe::Bucharest;

    use super::*;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Bucharest
            .with_ymd_and_hms(y, mo, d, h, mi, 0)
            .unwrap()
            .with_timezone(&Utc)
    }

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn interest(day: &str, time: &str, title: &str) -> Interest {
        Interest {
            day_english: day.to_string(),
            time: time.to_string(),
            title: title.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn weekday_names_are_case_insensitive() {
        assert_eq!(parse_weekday("Monday"), Some(Weekday::Mon));
        assert_eq!(parse_weekday(" SUNDAY "), Some(Weekday::Sun));
        assert_eq!(parse_weekday("Mon"), None);
        assert_eq!(parse_weekday("Luni"), None);
    }

    #[test]
    fn start_time_reads_the_range_start() {
        assert_eq!(parse_start_time("07:00 - 08:00").unwrap(), hm(7, 0));
        assert_eq!(parse_start_time("9:05").unwrap(), hm(9, 5));
        assert_eq!(parse_start_time("09:00:00 - 10:00:00").unwrap(), hm(9, 0));
        assert_eq!(parse_start_time("18:30:15").unwrap(), hm(18, 30));
        assert!(parse_start_time("0900").is_err());
        assert!(parse_start_time("25:00").is_err());
        assert!(parse_start_time("10:60").is_err());
        assert!(parse_start_time("ab:cd").is_err());
        assert!(parse_start_time("").is_err());
    }

    #[test]
    fn later_today_stays_today() {
        // 2026-01-06 is a Tuesday
        let next = next_occurrence(at(2026, 1, 6, 9, 0), Bucharest, Weekday::Tue, hm(11, 0)).unwrap();
        assert_eq!(next.with_timezone(&Utc), at(2026, 1, 6, 11, 0));
    }

    #[test]
    fn earlier_today_moves_a_week() {
        let next = next_occurrence(at(2026, 1, 6, 11, 0), Bucharest, Weekday::Tue, hm(9, 0)).unwrap();
        assert_eq!(next.with_timezone(&Utc), at(2026, 1, 13, 9, 0));
    }

    #[test]
    fn exact_reference_moves_a_week() {
        let reference = at(2026, 1, 6, 9, 0);
        let next = next_occurrence(reference, Bucharest, Weekday::Tue, hm(9, 0)).unwrap();
        assert_eq!(next.with_timezone(&Utc), at(2026, 1, 13, 9, 0));
        assert_eq!(next.with_timezone(&Utc) - reference, TimeDelta::days(7));
    }

    #[test]
    fn sunday_noon_finds_monday_morning() {
        let next = next_occurrence(at(2026, 1, 4, 12, 0), Bucharest, Weekday::Mon, hm(9, 0)).unwrap();
        assert_eq!(next.with_timezone(&Utc), at(2026, 1, 5, 9, 0));
    }

    #[test]
    fn result_is_after_reference_on_the_right_slot() {
        let weekdays = [
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Wed,
            Weekday::Thu,
            Weekday::Fri,
            Weekday::Sat,
            Weekday::Sun,
        ];
        // three DST-free weeks in January, sampled every 7 hours
        let mut reference = at(2026, 1, 5, 0, 0);
        while reference < at(2026, 1, 26, 0, 0) {
            for weekday in weekdays {
                let next = next_occurrence(reference, Bucharest, weekday, hm(18, 30)).unwrap();
                assert!(next.with_timezone(&Utc) > reference);
                assert!(next.with_timezone(&Utc) - reference <= TimeDelta::days(7));
                assert_eq!(next.weekday(), weekday);
                assert_eq!((next.hour(), next.minute()), (18, 30));

                let again = next_occurrence(reference, Bucharest, weekday, hm(18, 30)).unwrap();
                assert_eq!(next, again);
            }
            reference += TimeDelta::hours(7);
        }
    }

    #[test]
    fn start_inside_spring_gap_is_shifted_forward() {
        // 2026-03-29 03:00 EET jumps to 04:00 EEST
        let reference = at(2026, 3, 28, 12, 0);
        let next = next_occurrence(reference, Bucharest, Weekday::Sun, hm(3, 30)).unwrap();
        assert_eq!(
            next.with_timezone(&Utc),
            Utc.with_ymd_and_hms(2026, 3, 29, 1, 30, 0).unwrap()
        );
        assert_eq!((next.hour(), next.minute()), (4, 30));
    }

    #[test]
    fn ambiguous_start_takes_the_earlier_instant() {
        // 2026-10-25 04:00 EEST falls back to 03:00 EET
        let reference = Utc.with_ymd_and_hms(2026, 10, 24, 12, 0, 0).unwrap();
        let next = next_occurrence(reference, Bucharest, Weekday::Sun, hm(3, 30)).unwrap();
        assert_eq!(
            next.with_timezone(&Utc),
            Utc.with_ymd_and_hms(2026, 10, 25, 0, 30, 0).unwrap()
        );
    }

    #[test]
    fn earliest_interest_wins_across_clubs() {
        let interests = BTreeMap::from([
            (
                "Downtown".to_string(),
                vec![interest("Tuesday", "11:00 - 12:00", "Yoga")],
            ),
            (
                "Riverside".to_string(),
                vec![interest("Tuesday", "09:00 - 10:00", "Pilates")],
            ),
        ]);

        let next = next_scheduled_occurrence(&interests, Bucharest, at(2026, 1, 6, 8, 0)).unwrap();
        assert_eq!(next.club, "Riverside");
        assert_eq!(next.interest.title, "Pilates");
        assert_eq!(next.start_utc(), at(2026, 1, 6, 9, 0));

        // once 09:00 has passed, 11:00 the same day is next
        let next = next_scheduled_occurrence(&interests, Bucharest, at(2026, 1, 6, 9, 30)).unwrap();
        assert_eq!(next.club, "Downtown");
        assert_eq!(next.start_utc(), at(2026, 1, 6, 11, 0));
    }

    #[test]
    fn ties_go_to_the_first_club_in_order() {
        let interests = BTreeMap::from([
            ("B".to_string(), vec![interest("Friday", "10:00", "Box")]),
            ("A".to_string(), vec![interest("Friday", "10:00", "Aerobic")]),
        ]);
        let next = next_scheduled_occurrence(&interests, Bucharest, at(2026, 1, 6, 8, 0)).unwrap();
        assert_eq!(next.club, "A");
    }

    #[test]
    fn no_interests_is_reported() {
        let empty = BTreeMap::new();
        assert!(matches!(
            next_scheduled_occurrence(&empty, Bucharest, at(2026, 1, 6, 8, 0)),
            Err(SchedulerError::NoInterestsConfigured)
        ));

        let only_empty_lists = BTreeMap::from([("Downtown".to_string(), Vec::new())]);
        assert!(matches!(
            next_scheduled_occurrence(&only_empty_lists, Bucharest, at(2026, 1, 6, 8, 0)),
            Err(SchedulerError::NoInterestsConfigured)
        ));
    }

    #[test]
    fn malformed_interest_names_club_and_field() {
        let interests = BTreeMap::from([(
            "Downtown".to_string(),
            vec![interest("Someday", "10:00", "Yoga")],
        )]);
        match next_scheduled_occurrence(&interests, Bucharest, at(2026, 1, 6, 8, 0)) {
            Err(SchedulerError::MalformedInterest { club, title, field, .. }) => {
                assert_eq!(club, "Downtown");
                assert_eq!(title, "Yoga");
                assert_eq!(field, InterestField::Weekday);
            }
            other => panic!("expected MalformedInterest, got {other:?}"),
        }

        let interests = BTreeMap::from([(
            "Downtown".to_string(),
            vec![interest("Monday", "noon", "Yoga")],
        )]);
        let err = next_scheduled_occurrence(&interests, Bucharest, at(2026, 1, 6, 8, 0)).unwrap_err();
        assert!(err.is_fatal());
        assert!(matches!(
            err,
            SchedulerError::MalformedInterest {
                field: InterestField::StartTime,
                ..
            }
        ));
    }
}
