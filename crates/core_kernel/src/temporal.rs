//! Temporal types for servicing dates
//!
//! Payment due dates, paid dates, and reversal dates are civil dates in the
//! platform's operating timezone. This module provides the timezone wrapper
//! and the inclusive date window used for promise-to-pay coverage checks.

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::str::FromStr;
use thiserror::Error;

/// Errors related to temporal operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemporalError {
    #[error("Invalid window: start {start} must not be after end {end}")]
    InvalidWindow { start: NaiveDate, end: NaiveDate },

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),
}

/// Timezone wrapper for the platform's operating jurisdiction
///
/// Wraps chrono_tz::Tz with custom serialization support.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timezone(pub Tz);

impl Serialize for Timezone {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.0.name())
    }
}

impl<'de> Deserialize<'de> for Timezone {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Tz::from_str(&s)
            .map(Timezone)
            .map_err(|_| serde::de::Error::custom(format!("Invalid timezone: {}", s)))
    }
}

impl Timezone {
    pub fn new(tz: Tz) -> Self {
        Self(tz)
    }

    /// The platform's default operating timezone
    pub fn operating() -> Self {
        Self(chrono_tz::Asia::Jakarta)
    }

    /// Converts a UTC timestamp to the civil date in this timezone
    pub fn civil_date(&self, utc: DateTime<Utc>) -> NaiveDate {
        utc.with_timezone(&self.0).date_naive()
    }

    /// Gets the start of day (00:00:00) in this timezone as UTC
    pub fn start_of_day(&self, date: NaiveDate) -> DateTime<Utc> {
        date.and_hms_opt(0, 0, 0)
            .unwrap()
            .and_local_timezone(self.0)
            .single()
            .expect("Invalid timezone conversion")
            .with_timezone(&Utc)
    }

    /// Gets the end of day (23:59:59.999999999) in this timezone as UTC
    pub fn end_of_day(&self, date: NaiveDate) -> DateTime<Utc> {
        date.and_hms_nano_opt(23, 59, 59, 999_999_999)
            .unwrap()
            .and_local_timezone(self.0)
            .single()
            .expect("Invalid timezone conversion")
            .with_timezone(&Utc)
    }
}

impl Default for Timezone {
    fn default() -> Self {
        Self::operating()
    }
}

/// An inclusive civil-date window
///
/// Used for promise-to-pay coverage: a PTP covers a transaction when the
/// transaction date falls on or between the window's bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    /// Start of the window (inclusive)
    pub start: NaiveDate,
    /// End of the window (inclusive)
    pub end: NaiveDate,
}

impl DateWindow {
    /// Creates a new window; start must not be after end
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, TemporalError> {
        if start > end {
            return Err(TemporalError::InvalidWindow { start, end });
        }
        Ok(Self { start, end })
    }

    /// Returns true if the window contains the given date
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Returns true if the window ends before the given date
    pub fn expired_by(&self, date: NaiveDate) -> bool {
        self.end < date
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_window_contains_bounds() {
        let w = DateWindow::new(d(2026, 3, 1), d(2026, 3, 10)).unwrap();
        assert!(w.contains(d(2026, 3, 1)));
        assert!(w.contains(d(2026, 3, 10)));
        assert!(!w.contains(d(2026, 2, 28)));
        assert!(!w.contains(d(2026, 3, 11)));
    }

    #[test]
    fn test_window_rejects_inverted_bounds() {
        assert!(DateWindow::new(d(2026, 3, 10), d(2026, 3, 1)).is_err());
    }

    #[test]
    fn test_window_expiry() {
        let w = DateWindow::new(d(2026, 3, 1), d(2026, 3, 10)).unwrap();
        assert!(w.expired_by(d(2026, 3, 11)));
        assert!(!w.expired_by(d(2026, 3, 10)));
    }

    #[test]
    fn test_civil_date_crosses_midnight() {
        // 18:00 UTC is already the next day in Jakarta (UTC+7)
        let tz = Timezone::operating();
        let utc = Utc.with_ymd_and_hms(2026, 3, 1, 18, 0, 0).unwrap();
        assert_eq!(tz.civil_date(utc), d(2026, 3, 2));
    }

    #[test]
    fn test_start_end_of_day_ordering() {
        let tz = Timezone::operating();
        let date = d(2026, 3, 1);
        assert!(tz.start_of_day(date) < tz.end_of_day(date));
    }
}
