// src/window.rs
//! # Recency Window
//! Decides whether a content item is recent enough to count.
//!
//! The filter is pure: callers pass `now` explicitly. Timestamps are parsed
//! leniently (RFC 3339, RFC 2822, or offset-less ISO assumed UTC) and both
//! sides of the comparison are UTC instants.

use chrono::{DateTime, NaiveDateTime, TimeDelta, Utc};
use serde::ser::{Serialize, SerializeStruct, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::InputError;
use crate::fetch::ContentItem;

/// Units accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Mins,
    Hours,
    Days,
    Weeks,
}

impl TimeUnit {
    fn seconds(self) -> i64 {
        match self {
            TimeUnit::Mins => 60,
            TimeUnit::Hours => 3_600,
            TimeUnit::Days => 86_400,
            TimeUnit::Weeks => 604_800,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TimeUnit::Mins => "mins",
            TimeUnit::Hours => "hours",
            TimeUnit::Days => "days",
            TimeUnit::Weeks => "weeks",
        }
    }
}

impl FromStr for TimeUnit {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mins" => Ok(TimeUnit::Mins),
            "hours" => Ok(TimeUnit::Hours),
            "days" => Ok(TimeUnit::Days),
            "weeks" => Ok(TimeUnit::Weeks),
            other => Err(InputError::UnknownUnit(other.to_string())),
        }
    }
}

/// Non-negative span looking back from "now".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RecencyWindow {
    span: TimeDelta,
}

impl RecencyWindow {
    /// `count × unit`, rejecting spans that do not fit a `TimeDelta`.
    pub fn new(count: u64, unit: TimeUnit) -> Result<Self, InputError> {
        let overflow = || InputError::WindowOverflow {
            count,
            unit: unit.as_str().to_string(),
        };
        let secs = i64::try_from(count)
            .ok()
            .and_then(|c| c.checked_mul(unit.seconds()))
            .ok_or_else(overflow)?;
        let span = TimeDelta::try_seconds(secs).ok_or_else(overflow)?;
        Ok(Self { span })
    }

}

impl fmt::Display for RecencyWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = self.span.num_seconds();
        for unit in [TimeUnit::Weeks, TimeUnit::Days, TimeUnit::Hours, TimeUnit::Mins] {
            let s = unit.seconds();
            if secs > 0 && secs % s == 0 {
                let n = secs / s;
                let name = unit.as_str();
                let name = if n == 1 { name.trim_end_matches('s') } else { name };
                return write!(f, "{n} {name}");
            }
        }
        write!(f, "{secs} secs")
    }
}

impl Serialize for RecencyWindow {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        let mut st = s.serialize_struct("RecencyWindow", 2)?;
        st.serialize_field("seconds", &self.span.num_seconds())?;
        st.serialize_field("human", &self.to_string())?;
        st.end()
    }
}

/// Parse a published-at value into a UTC instant. `None` for anything unreadable.
pub fn parse_published_at(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// True iff the item has a parsable timestamp strictly younger than `window`.
pub fn is_recent(item: &ContentItem, window: RecencyWindow, now: DateTime<Utc>) -> bool {
    item.published_at
        .as_deref()
        .and_then(parse_published_at)
        .is_some_and(|ts| now - ts < window.span)
}

/// Source of "now" for the per-account processor.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Always returns the same instant. Handy for deterministic runs.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn item_at(ts: Option<&str>) -> ContentItem {
        ContentItem {
            text: "x".into(),
            published_at: ts.map(str::to_string),
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap()
    }

    #[test]
    fn parses_browser_iso_with_millis() {
        let ts = parse_published_at("2024-03-10T11:59:00.000Z").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 3, 10, 11, 59, 0).unwrap());
    }

    #[test]
    fn offsets_are_normalized_to_utc() {
        let ts = parse_published_at("2024-03-10T13:00:00+01:00").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap());
    }

    #[test]
    fn parses_rss_pub_date() {
        let ts = parse_published_at("Sun, 10 Mar 2024 11:00:00 GMT").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 3, 10, 11, 0, 0).unwrap());
    }

    #[test]
    fn naive_iso_is_assumed_utc() {
        let ts = parse_published_at("2024-03-10T10:30:00").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 3, 10, 10, 30, 0).unwrap());
    }

    #[test]
    fn garbage_does_not_parse() {
        assert!(parse_published_at("").is_none());
        assert!(parse_published_at("yesterday").is_none());
        assert!(parse_published_at("2024-13-40T99:00:00Z").is_none());
    }

    #[test]
    fn boundary_is_excluded() {
        let w = RecencyWindow::new(1, TimeUnit::Hours).unwrap();
        let exactly = item_at(Some("2024-03-10T11:00:00Z"));
        let just_inside = item_at(Some("2024-03-10T11:00:00.001Z"));
        assert!(!is_recent(&exactly, w, now()));
        assert!(is_recent(&just_inside, w, now()));
    }

    #[test]
    fn missing_or_broken_timestamp_is_never_recent() {
        let w = RecencyWindow::new(52, TimeUnit::Weeks).unwrap();
        assert!(!is_recent(&item_at(None), w, now()));
        assert!(!is_recent(&item_at(Some("n/a")), w, now()));
    }

    #[test]
    fn zero_window_counts_nothing_in_the_past() {
        let w = RecencyWindow::new(0, TimeUnit::Days).unwrap();
        assert!(!is_recent(&item_at(Some("2024-03-10T12:00:00Z")), w, now()));
    }

    #[test]
    fn unit_parsing_is_strict() {
        assert_eq!("weeks".parse::<TimeUnit>().unwrap(), TimeUnit::Weeks);
        assert!("hour".parse::<TimeUnit>().is_err());
        assert!("HOURS".parse::<TimeUnit>().is_err());
    }

    #[test]
    fn window_display_picks_largest_whole_unit() {
        assert_eq!(RecencyWindow::new(24, TimeUnit::Hours).unwrap().to_string(), "1 day");
        assert_eq!(RecencyWindow::new(90, TimeUnit::Mins).unwrap().to_string(), "90 mins");
        assert_eq!(RecencyWindow::new(36, TimeUnit::Hours).unwrap().to_string(), "36 hours");
        assert_eq!(RecencyWindow::new(0, TimeUnit::Mins).unwrap().to_string(), "0 secs");
    }

    #[test]
    fn huge_window_is_rejected() {
        assert!(RecencyWindow::new(u64::MAX, TimeUnit::Weeks).is_err());
    }
}
