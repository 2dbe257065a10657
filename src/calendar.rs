//! # Day & Month Aggregation
//!
//! Builds the records the calendar endpoints return by combining the phase
//! calculator, the rise/set search and the zodiac lookup.
//!
//! - [`day_info`]: one [`DayRecord`] for an instant and an observer
//! - [`month_info`]: one record per calendar day at 12:00 UTC, in date order
//! - [`phase_range`]: one [`PhaseInfo`] per day between two instants
//!
//! A month is all-or-nothing: if any day fails, the month fails. The four
//! cardinal-phase date lists in [`MonthRecord`] are always filtered out of
//! `days`, never computed separately.

use crate::ephemeris::PositionProvider;
use crate::error::{MoonError, Result};
use crate::phase::{phase_info, PhaseCategory, PhaseInfo};
use crate::riseset::{rise_and_set, validate_window, Observer, RiseSetConfig};
use crate::{Body, CelestialPosition};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The twelve tropical zodiac signs, 30° each from Aries at 0°.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ZodiacSign {
    Aries,
    Taurus,
    Gemini,
    Cancer,
    Leo,
    Virgo,
    Libra,
    Scorpio,
    Sagittarius,
    Capricorn,
    Aquarius,
    Pisces,
}

impl ZodiacSign {
    pub const ALL: [ZodiacSign; 12] = [
        ZodiacSign::Aries,
        ZodiacSign::Taurus,
        ZodiacSign::Gemini,
        ZodiacSign::Cancer,
        ZodiacSign::Leo,
        ZodiacSign::Virgo,
        ZodiacSign::Libra,
        ZodiacSign::Scorpio,
        ZodiacSign::Sagittarius,
        ZodiacSign::Capricorn,
        ZodiacSign::Aquarius,
        ZodiacSign::Pisces,
    ];

    /// Sign containing an ecliptic longitude in degrees.
    pub fn from_longitude(longitude_deg: f64) -> Self {
        let idx = (crate::normalize_degrees(longitude_deg) / 30.0).floor() as usize % 12;
        Self::ALL[idx]
    }

    pub fn name(&self) -> &'static str {
        match self {
            ZodiacSign::Aries => "Aries",
            ZodiacSign::Taurus => "Taurus",
            ZodiacSign::Gemini => "Gemini",
            ZodiacSign::Cancer => "Cancer",
            ZodiacSign::Leo => "Leo",
            ZodiacSign::Virgo => "Virgo",
            ZodiacSign::Libra => "Libra",
            ZodiacSign::Scorpio => "Scorpio",
            ZodiacSign::Sagittarius => "Sagittarius",
            ZodiacSign::Capricorn => "Capricorn",
            ZodiacSign::Aquarius => "Aquarius",
            ZodiacSign::Pisces => "Pisces",
        }
    }
}

impl fmt::Display for ZodiacSign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Tuning for the per-day rise/set searches.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DaySettings {
    /// How far past UTC midnight to look for each crossing
    pub search_window_days: f64,
    pub rise_set: RiseSetConfig,
}

impl DaySettings {
    /// Check the window and rise/set tuning against the supported ranges.
    pub fn validate(&self) -> Result<()> {
        validate_window(self.search_window_days)?;
        self.rise_set.validate()
    }
}

impl Default for DaySettings {
    fn default() -> Self {
        DaySettings {
            search_window_days: 1.0,
            rise_set: RiseSetConfig::default(),
        }
    }
}

/// Everything the calendar shows for one day.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayRecord {
    pub date: DateTime<Utc>,
    #[serde(rename = "moonPhase")]
    pub phase_category: PhaseCategory,
    pub phase_angle: f64,
    pub illumination: f64,
    pub is_waxing: bool,
    pub moonrise: Option<DateTime<Utc>>,
    pub moonset: Option<DateTime<Utc>>,
    pub sunrise: Option<DateTime<Utc>>,
    pub sunset: Option<DateTime<Utc>>,
    pub moon_position: CelestialPosition,
    pub zodiac_sign: ZodiacSign,
}

/// One calendar month of [`DayRecord`]s plus the cardinal-phase dates.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthRecord {
    pub year: i32,
    /// Zero-based month (0 = January)
    pub month: u32,
    pub days: Vec<DayRecord>,
    pub new_moons: Vec<DateTime<Utc>>,
    pub full_moons: Vec<DateTime<Utc>>,
    pub first_quarters: Vec<DateTime<Utc>>,
    pub last_quarters: Vec<DateTime<Utc>>,
}

impl MonthRecord {
    /// Assemble a month from its day records, deriving the cardinal lists.
    ///
    /// `days` must already be in ascending date order.
    pub fn from_days(year: i32, month: u32, days: Vec<DayRecord>) -> Self {
        let dates_with = |category: PhaseCategory| -> Vec<DateTime<Utc>> {
            days.iter()
                .filter(|d| d.phase_category == category)
                .map(|d| d.date)
                .collect()
        };
        let new_moons = dates_with(PhaseCategory::NewMoon);
        let full_moons = dates_with(PhaseCategory::FullMoon);
        let first_quarters = dates_with(PhaseCategory::FirstQuarter);
        let last_quarters = dates_with(PhaseCategory::LastQuarter);

        MonthRecord {
            year,
            month,
            days,
            new_moons,
            full_moons,
            first_quarters,
            last_quarters,
        }
    }
}

/// Zodiac sign of the Moon's ecliptic longitude.
pub fn zodiac_sign(moon_longitude: f64) -> ZodiacSign {
    ZodiacSign::from_longitude(moon_longitude)
}

fn first_of_month(year: i32, month0: u32) -> Result<NaiveDate> {
    if month0 > 11 {
        return Err(MoonError::invalid(format!("month {month0} must be between 0 and 11")));
    }
    NaiveDate::from_ymd_opt(year, month0 + 1, 1)
        .ok_or_else(|| MoonError::invalid(format!("year {year} is out of range")))
}

/// Gregorian day count of a zero-based month.
pub fn days_in_month(year: i32, month0: u32) -> Result<u32> {
    let first = first_of_month(year, month0)?;
    let next = if month0 == 11 {
        first_of_month(year + 1, 0)?
    } else {
        first_of_month(year, month0 + 1)?
    };
    Ok(next.signed_duration_since(first).num_days() as u32)
}

/// 12:00 UTC of every day of a zero-based month, ascending.
pub fn month_noons(year: i32, month0: u32) -> Result<Vec<DateTime<Utc>>> {
    let first = first_of_month(year, month0)?;
    let count = days_in_month(year, month0)?;
    first
        .iter_days()
        .take(count as usize)
        .map(|day| {
            day.and_hms_opt(12, 0, 0)
                .map(|noon| noon.and_utc())
                .ok_or_else(|| MoonError::invalid(format!("no noon on {day}")))
        })
        .collect()
}

fn utc_midnight(instant: &DateTime<Utc>) -> Result<DateTime<Utc>> {
    instant
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|midnight| midnight.and_utc())
        .ok_or_else(|| MoonError::invalid(format!("no midnight for {instant}")))
}

/// Build the [`DayRecord`] for `instant` as seen from `observer`.
///
/// Phase and Moon position are evaluated at `instant`; rise and set times are
/// searched forward from UTC midnight of the same date.
pub fn day_info<P>(
    provider: &P,
    instant: DateTime<Utc>,
    observer: &Observer,
    settings: &DaySettings,
) -> Result<DayRecord>
where
    P: PositionProvider + ?Sized,
{
    let phase = phase_info(provider, instant)?;
    let midnight = utc_midnight(&instant)?;
    let window = settings.search_window_days;

    let moon = rise_and_set(provider, Body::Moon, observer, midnight, window, &settings.rise_set)?;
    let sun = rise_and_set(provider, Body::Sun, observer, midnight, window, &settings.rise_set)?;

    Ok(DayRecord {
        date: instant,
        phase_category: phase.phase_category,
        phase_angle: phase.phase_angle_deg,
        illumination: phase.illumination_pct,
        is_waxing: phase.is_waxing,
        moonrise: moon.rise,
        moonset: moon.set,
        sunrise: sun.rise,
        sunset: sun.set,
        moon_position: phase.moon_position,
        zodiac_sign: zodiac_sign(phase.moon_position.longitude),
    })
}

/// Build every [`DayRecord`] of a zero-based month, sequentially.
pub fn month_info<P>(
    provider: &P,
    year: i32,
    month0: u32,
    observer: &Observer,
    settings: &DaySettings,
) -> Result<MonthRecord>
where
    P: PositionProvider + ?Sized,
{
    let days = month_noons(year, month0)?
        .into_iter()
        .map(|noon| day_info(provider, noon, observer, settings))
        .collect::<Result<Vec<_>>>()?;
    Ok(MonthRecord::from_days(year, month0, days))
}

/// One [`PhaseInfo`] per day from `start` while `≤ end`, stepping 24 hours.
/// Empty when `start` is after `end`.
pub fn phase_range<P>(
    provider: &P,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Vec<PhaseInfo>>
where
    P: PositionProvider + ?Sized,
{
    let mut results = Vec::new();
    let mut current = start;
    while current <= end {
        results.push(phase_info(provider, current)?);
        current += Duration::days(1);
    }
    Ok(results)
}
