//! Moment value object module
//!
//! This module defines the calendar timestamp used throughout rule
//! evaluation, including the decompositions needed by date specifications
//! (Gregorian, ordinal, ISO week), signed component arithmetic for
//! durations, and the "set earlier" watermark operation.

use chrono::{DateTime, Datelike, Months, NaiveDate, NaiveDateTime, TimeDelta, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A calendar component that can be added to a moment
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TimeComponent {
    Years,
    Months,
    Weeks,
    Days,
    Hours,
    Minutes,
    Seconds,
}

/// Duration components in the order they are applied to a start time
pub const DURATION_COMPONENTS: [TimeComponent; 7] = [
    TimeComponent::Years,
    TimeComponent::Months,
    TimeComponent::Weeks,
    TimeComponent::Days,
    TimeComponent::Hours,
    TimeComponent::Minutes,
    TimeComponent::Seconds,
];

impl TimeComponent {
    /// Returns the XML attribute name for this component
    pub fn as_str(self) -> &'static str {
        match self {
            TimeComponent::Years => "years",
            TimeComponent::Months => "months",
            TimeComponent::Weeks => "weeks",
            TimeComponent::Days => "days",
            TimeComponent::Hours => "hours",
            TimeComponent::Minutes => "minutes",
            TimeComponent::Seconds => "seconds",
        }
    }
}

/// Error raised when a moment cannot be parsed or computed
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MomentError {
    #[error("'{0}' is not a valid date/time")]
    Unparsable(String),
    #[error("date/time arithmetic out of range")]
    OutOfRange,
}

/// A calendar timestamp with sub-second precision
///
/// Moments are immutable in the public API; arithmetic returns new values.
/// The only mutating operation is [`Moment::set_if_earlier`], which is the
/// watermark primitive used to track the next rule-evaluation change.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct Moment(DateTime<Utc>);

impl Moment {
    /// Creates a moment from a UTC date/time
    pub fn new(datetime: DateTime<Utc>) -> Self {
        Self(datetime)
    }

    /// Parses a moment from a date/time string
    ///
    /// Accepts RFC 3339 (`2024-02-15T00:00:00Z`, with or without an offset),
    /// the same form with a space separator, and bare dates (midnight UTC).
    ///
    /// # Errors
    ///
    /// Returns [`MomentError::Unparsable`] if no accepted form matches.
    pub fn parse(text: &str) -> Result<Self, MomentError> {
        let text = text.trim();

        if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
            return Ok(Self(dt.with_timezone(&Utc)));
        }
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S") {
            return Ok(Self(naive.and_utc()));
        }
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S") {
            return Ok(Self(naive.and_utc()));
        }
        if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
            // Bare dates start at midnight
            let naive = date
                .and_hms_opt(0, 0, 0)
                .ok_or_else(|| MomentError::Unparsable(text.to_string()))?;
            return Ok(Self(naive.and_utc()));
        }

        Err(MomentError::Unparsable(text.to_string()))
    }

    /// Returns (year, month, day) in the Gregorian calendar
    pub fn gregorian(&self) -> (i64, i64, i64) {
        (
            self.0.year() as i64,
            self.0.month() as i64,
            self.0.day() as i64,
        )
    }

    /// Returns (hour, minute, second) of the time of day
    pub fn time_of_day(&self) -> (i64, i64, i64) {
        (
            self.0.hour() as i64,
            self.0.minute() as i64,
            self.0.second() as i64,
        )
    }

    /// Returns (year, day of year) with the day 1-based
    pub fn ordinal(&self) -> (i64, i64) {
        (self.0.year() as i64, self.0.ordinal() as i64)
    }

    /// Returns (week-based year, week, weekday) per ISO 8601
    ///
    /// The weekday is 1-based starting from Monday.
    pub fn iso_week(&self) -> (i64, i64, i64) {
        let week = self.0.iso_week();
        (
            week.year() as i64,
            week.week() as i64,
            self.0.weekday().number_from_monday() as i64,
        )
    }

    /// Adds a signed amount of one calendar component
    ///
    /// Year and month addition is calendar arithmetic (day-of-month clamped
    /// to the target month); the remaining components are fixed offsets.
    ///
    /// # Errors
    ///
    /// Returns [`MomentError::OutOfRange`] if the result cannot be
    /// represented.
    pub fn add(&self, component: TimeComponent, amount: i64) -> Result<Self, MomentError> {
        let added = match component {
            TimeComponent::Years => self.add_months_signed(amount.checked_mul(12)),
            TimeComponent::Months => self.add_months_signed(Some(amount)),
            TimeComponent::Weeks => self.add_delta(TimeDelta::try_weeks(amount)),
            TimeComponent::Days => self.add_delta(TimeDelta::try_days(amount)),
            TimeComponent::Hours => self.add_delta(TimeDelta::try_hours(amount)),
            TimeComponent::Minutes => self.add_delta(TimeDelta::try_minutes(amount)),
            TimeComponent::Seconds => self.add_delta(TimeDelta::try_seconds(amount)),
        };
        added.map(Self).ok_or(MomentError::OutOfRange)
    }

    /// Returns this moment shifted by a number of seconds
    ///
    /// Saturates instead of failing; second-level offsets are used for
    /// watermark boundaries where an unrepresentable result cannot occur.
    pub fn add_seconds(&self, seconds: i64) -> Self {
        match self.add(TimeComponent::Seconds, seconds) {
            Ok(moment) => moment,
            Err(_) => *self,
        }
    }

    /// Lowers this moment to `candidate` if `candidate` is strictly earlier
    ///
    /// Returns `true` if the value changed. This is the watermark sink: the
    /// rule engine only ever lowers the caller's next-change moment.
    pub fn set_if_earlier(&mut self, candidate: &Moment) -> bool {
        if *candidate < *self {
            *self = *candidate;
            return true;
        }
        false
    }

    fn add_months_signed(&self, months: Option<i64>) -> Option<DateTime<Utc>> {
        let months = months?;
        let magnitude = Months::new(u32::try_from(months.unsigned_abs()).ok()?);
        if months >= 0 {
            self.0.checked_add_months(magnitude)
        } else {
            self.0.checked_sub_months(magnitude)
        }
    }

    fn add_delta(&self, delta: Option<TimeDelta>) -> Option<DateTime<Utc>> {
        self.0.checked_add_signed(delta?)
    }
}

impl fmt::Display for Moment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%dT%H:%M:%SZ"))
    }
}

impl From<DateTime<Utc>> for Moment {
    fn from(datetime: DateTime<Utc>) -> Self {
        Self(datetime)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn moment(text: &str) -> Moment {
        Moment::parse(text).unwrap()
    }

    #[test]
    fn test_parse_rfc3339() {
        let m = moment("2024-02-15T09:30:05Z");
        assert_eq!(m.gregorian(), (2024, 2, 15));
        assert_eq!(m.time_of_day(), (9, 30, 5));
    }

    #[test]
    fn test_parse_space_separator_and_bare_date() {
        assert_eq!(
            moment("2024-02-15 09:30:05"),
            moment("2024-02-15T09:30:05Z")
        );
        assert_eq!(moment("2024-02-15"), moment("2024-02-15T00:00:00Z"));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            Moment::parse("not a date"),
            Err(MomentError::Unparsable(_))
        ));
    }

    #[test]
    fn test_ordinal_decomposition() {
        // 2024 is a leap year: Feb 15 is day 46
        assert_eq!(moment("2024-02-15T00:00:00Z").ordinal(), (2024, 46));
    }

    #[test]
    fn test_iso_week_decomposition() {
        // 2024-01-01 is a Monday in ISO week 1 of 2024
        assert_eq!(moment("2024-01-01T00:00:00Z").iso_week(), (2024, 1, 1));
        // 2023-01-01 is a Sunday in ISO week 52 of 2022
        assert_eq!(moment("2023-01-01T00:00:00Z").iso_week(), (2022, 52, 7));
    }

    #[test]
    fn test_add_months_clamps_day() {
        let m = moment("2024-01-31T12:00:00Z");
        let added = m.add(TimeComponent::Months, 1).unwrap();
        assert_eq!(added.gregorian(), (2024, 2, 29));
    }

    #[test]
    fn test_add_negative_component() {
        let m = moment("2024-03-15T00:00:00Z");
        let back = m.add(TimeComponent::Months, -2).unwrap();
        assert_eq!(back.gregorian(), (2024, 1, 15));
    }

    #[test]
    fn test_add_seconds_boundary() {
        let m = moment("2024-01-01T00:00:00Z");
        assert_eq!(m.add_seconds(1), moment("2024-01-01T00:00:01Z"));
    }

    #[test]
    fn test_set_if_earlier_only_lowers() {
        let mut watermark = moment("2024-06-01T00:00:00Z");
        let earlier = moment("2024-05-01T00:00:00Z");
        let later = moment("2024-07-01T00:00:00Z");

        assert!(watermark.set_if_earlier(&earlier));
        assert_eq!(watermark, earlier);

        assert!(!watermark.set_if_earlier(&later));
        assert_eq!(watermark, earlier);

        // Equal is not strictly earlier
        assert!(!watermark.set_if_earlier(&earlier));
    }
}
