//! Monotonic minute-of-day time values.
//!
//! Per the design notes, all simulator-internal time arithmetic uses a plain
//! integer count of minutes rather than wall-clock types, to avoid
//! midnight-wraparound subtleties and keep the tick loop free of `chrono`
//! overhead. Wall-clock parsing/formatting only happens at the loader and
//! report boundaries.

use std::fmt;
use std::ops::{Add, Sub};

use chrono::{NaiveDateTime, NaiveTime, Timelike};

use crate::error::LoadError;

/// A point in simulated time, in minutes since midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct SimTime(pub i64);

impl SimTime {
    pub const fn from_minutes(minutes: i64) -> Self {
        Self(minutes)
    }

    pub fn minutes(self) -> i64 {
        self.0
    }

    /// Parses `HH:MM:SS` or `YYYY-MM-DD HH:MM:SS`, per the dataset loader contract.
    pub fn parse(raw: &str, field: &'static str) -> Result<Self, LoadError> {
        let raw = raw.trim();
        if let Ok(t) = NaiveTime::parse_from_str(raw, "%H:%M:%S") {
            return Ok(Self::from_naive_time(t));
        }
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
            return Ok(Self::from_naive_time(dt.time()));
        }
        Err(LoadError::MalformedTime {
            field,
            value: raw.to_string(),
        })
    }

    fn from_naive_time(t: NaiveTime) -> Self {
        Self((t.hour() as i64) * 60 + (t.minute() as i64) + (t.second() as i64) / 60)
    }

    pub fn to_hh_mm_ss(self) -> String {
        let mut total = self.0.rem_euclid(24 * 60);
        let h = total / 60;
        total -= h * 60;
        format!("{h:02}:{total:02}:00")
    }
}

impl Add<i64> for SimTime {
    type Output = SimTime;
    fn add(self, rhs: i64) -> SimTime {
        SimTime(self.0 + rhs)
    }
}

impl Add<f64> for SimTime {
    type Output = SimTime;
    fn add(self, rhs: f64) -> SimTime {
        SimTime(self.0 + rhs.round() as i64)
    }
}

impl Sub for SimTime {
    type Output = i64;
    fn sub(self, rhs: SimTime) -> i64 {
        self.0 - rhs.0
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hh_mm_ss())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_time() {
        assert_eq!(SimTime::parse("17:00:00", "created_time").unwrap().minutes(), 17 * 60);
    }

    #[test]
    fn parses_datetime() {
        let t = SimTime::parse("2024-01-01 17:30:00", "created_time").unwrap();
        assert_eq!(t.minutes(), 17 * 60 + 30);
    }

    #[test]
    fn rejects_garbage() {
        assert!(SimTime::parse("not-a-time", "created_time").is_err());
    }

    #[test]
    fn round_trips_display() {
        let t = SimTime::from_minutes(17 * 60 + 5);
        assert_eq!(t.to_hh_mm_ss(), "17:05:00");
    }
}
