//! # Julian Day Conversion
//!
//! Converts UTC calendar instants to the continuous Julian Day scale and back.
//! Calendar input is always treated as proleptic Gregorian: the Gregorian
//! correction term is applied to every date, including those before the
//! historical October 1582 switchover.
//!
//! References: Meeus, *Astronomical Algorithms* (2nd ed.), chapter 7.

use crate::error::{MoonError, Result};
use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// Julian Day of the J2000.0 epoch (2000-01-01 12:00).
pub const J2000: f64 = 2_451_545.0;

/// Julian Day of the Unix epoch (1970-01-01 00:00 UTC).
pub const UNIX_EPOCH_JD: f64 = 2_440_587.5;

/// Days per Julian century.
pub const DAYS_PER_CENTURY: f64 = 36_525.0;

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Meeus 7.1 with the Gregorian correction. `month` must be 1-12.
fn gregorian_jd(year: i32, month: u32, day: f64) -> f64 {
    let (mut y, mut m) = (year as f64, month as f64);
    if month <= 2 {
        y -= 1.0;
        m += 12.0;
    }
    let a = (y / 100.0).floor();
    let b = 2.0 - a + (a / 4.0).floor();
    (365.25 * (y + 4716.0)).floor() + (30.6001 * (m + 1.0)).floor() + day + b - 1524.5
}

/// A point on the Julian Day scale (days since 4713 BCE Jan 1, 12:00 UTC).
///
/// # Example
/// ```
/// use moon_calendar_lib::julian::JulianDay;
///
/// let jd = JulianDay::from_calendar(2000, 1, 1.5).unwrap();
/// assert_eq!(jd.value(), 2_451_545.0);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct JulianDay(f64);

impl JulianDay {
    /// Wrap a raw Julian Day, rejecting NaN and infinities.
    pub fn new(value: f64) -> Result<Self> {
        if value.is_finite() {
            Ok(JulianDay(value))
        } else {
            Err(MoonError::invalid(format!("non-finite Julian Day: {value}")))
        }
    }

    /// Julian Day for a proleptic-Gregorian calendar date.
    ///
    /// `month` is 1 = Jan … 12 = Dec and `day` may carry a fractional part
    /// (`1.5` is noon on the first).
    pub fn from_calendar(year: i32, month: u32, day: f64) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(MoonError::invalid(format!("month {month} out of range 1-12")));
        }
        JulianDay::new(gregorian_jd(year, month, day))
    }

    /// Julian Day for a UTC instant. Sub-second precision is kept.
    pub fn from_datetime(instant: &DateTime<Utc>) -> Self {
        let hours = instant.hour() as f64
            + instant.minute() as f64 / 60.0
            + (instant.second() as f64 + instant.nanosecond() as f64 / 1e9) / 3600.0;
        let day = instant.day() as f64 + hours / 24.0;
        // chrono months are always 1-12 and the day is finite
        JulianDay(gregorian_jd(instant.year(), instant.month(), day))
    }

    pub fn value(self) -> f64 {
        self.0
    }

    /// Julian centuries elapsed since J2000.0 (negative before 2000).
    pub fn centuries_since_j2000(self) -> f64 {
        (self.0 - J2000) / DAYS_PER_CENTURY
    }

    /// Shift by a (possibly fractional) number of days.
    pub fn add_days(self, days: f64) -> Self {
        JulianDay(self.0 + days)
    }

    /// Inverse of [`JulianDay::from_calendar`]: `(year, month, fractional day)`.
    pub fn to_calendar(self) -> (i32, u32, f64) {
        let shifted = self.0 + 0.5;
        let z = shifted.floor();
        let f = shifted - z;
        let alpha = ((z - 1_867_216.25) / 36_524.25).floor();
        let a = z + 1.0 + alpha - (alpha / 4.0).floor();
        let b = a + 1524.0;
        let c = ((b - 122.1) / 365.25).floor();
        let d = (365.25 * c).floor();
        let e = ((b - d) / 30.6001).floor();

        let day = b - d - (30.6001 * e).floor() + f;
        let month = if e < 14.0 { e - 1.0 } else { e - 13.0 };
        let year = if month > 2.0 { c - 4716.0 } else { c - 4715.0 };
        (year as i32, month as u32, day)
    }

    /// Back to a UTC instant, rounded to the millisecond.
    pub fn to_datetime(self) -> Result<DateTime<Utc>> {
        let millis = ((self.0 - UNIX_EPOCH_JD) * MILLIS_PER_DAY).round();
        if !(i64::MIN as f64..=i64::MAX as f64).contains(&millis) {
            return Err(MoonError::invalid(format!(
                "Julian Day {} outside the representable range",
                self.0
            )));
        }
        DateTime::from_timestamp_millis(millis as i64).ok_or_else(|| {
            MoonError::invalid(format!("Julian Day {} outside the representable range", self.0))
        })
    }
}
