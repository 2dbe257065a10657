//! # Lunar Phase Calculator
//!
//! Turns a Moon and a Sun position into the numbers a calendar shows: the
//! phase angle (Moon minus Sun ecliptic longitude), the illuminated
//! percentage, waxing/waning, and one of eight named phases.
//!
//! The eight phases are equal 45° sectors centred on 0°, 45°, … 315°, so each
//! boundary sits on an odd multiple of 22.5° and belongs to the sector above
//! it (closed-open intervals).

use crate::ephemeris::PositionProvider;
use crate::error::Result;
use crate::julian::JulianDay;
use crate::{normalize_degrees, Body, CelestialPosition};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The eight conventional lunar phases.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseCategory {
    NewMoon,
    WaxingCrescent,
    FirstQuarter,
    WaxingGibbous,
    FullMoon,
    WaningGibbous,
    LastQuarter,
    WaningCrescent,
}

impl PhaseCategory {
    /// All phases in order of increasing phase angle.
    pub const ALL: [PhaseCategory; 8] = [
        PhaseCategory::NewMoon,
        PhaseCategory::WaxingCrescent,
        PhaseCategory::FirstQuarter,
        PhaseCategory::WaxingGibbous,
        PhaseCategory::FullMoon,
        PhaseCategory::WaningGibbous,
        PhaseCategory::LastQuarter,
        PhaseCategory::WaningCrescent,
    ];

    /// Classify a phase angle in degrees (any value; it is wrapped first).
    pub fn from_angle(angle_deg: f64) -> Self {
        let angle = normalize_degrees(angle_deg);
        // Shift by half a sector so new moon's wrap-around range starts at 0
        let sector = ((angle + 22.5) / 45.0).floor() as usize % 8;
        Self::ALL[sector]
    }

    /// Wire name, e.g. `"waxing_gibbous"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            PhaseCategory::NewMoon => "new_moon",
            PhaseCategory::WaxingCrescent => "waxing_crescent",
            PhaseCategory::FirstQuarter => "first_quarter",
            PhaseCategory::WaxingGibbous => "waxing_gibbous",
            PhaseCategory::FullMoon => "full_moon",
            PhaseCategory::WaningGibbous => "waning_gibbous",
            PhaseCategory::LastQuarter => "last_quarter",
            PhaseCategory::WaningCrescent => "waning_crescent",
        }
    }

    /// One of new, first quarter, full or last quarter.
    pub fn is_cardinal(&self) -> bool {
        matches!(
            self,
            PhaseCategory::NewMoon
                | PhaseCategory::FirstQuarter
                | PhaseCategory::FullMoon
                | PhaseCategory::LastQuarter
        )
    }

    /// Single-character glyph for terminal calendars.
    pub fn glyph(&self) -> char {
        match self {
            PhaseCategory::NewMoon => '●',
            PhaseCategory::WaxingCrescent => ')',
            PhaseCategory::FirstQuarter => '◐',
            PhaseCategory::WaxingGibbous => 'D',
            PhaseCategory::FullMoon => '○',
            PhaseCategory::WaningGibbous => 'C',
            PhaseCategory::LastQuarter => '◑',
            PhaseCategory::WaningCrescent => '(',
        }
    }
}

impl fmt::Display for PhaseCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Phase quantities derived from one Moon/Sun position pair.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PhaseMetrics {
    pub phase_angle: f64,
    pub illumination: f64,
    pub is_waxing: bool,
    pub category: PhaseCategory,
}

/// Illuminated percentage for a phase angle in degrees.
pub fn illumination_pct(phase_angle_deg: f64) -> f64 {
    (1.0 - phase_angle_deg.to_radians().cos()) / 2.0 * 100.0
}

/// Derive all phase quantities from the two positions.
pub fn compute_phase(moon: &CelestialPosition, sun: &CelestialPosition) -> PhaseMetrics {
    let phase_angle = normalize_degrees(moon.longitude - sun.longitude);
    PhaseMetrics {
        phase_angle,
        illumination: illumination_pct(phase_angle).clamp(0.0, 100.0),
        is_waxing: phase_angle < 180.0,
        category: PhaseCategory::from_angle(phase_angle),
    }
}

/// Full phase report for one instant.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseInfo {
    #[serde(rename = "date")]
    pub instant: DateTime<Utc>,
    #[serde(rename = "phase")]
    pub phase_category: PhaseCategory,
    #[serde(rename = "phaseAngle")]
    pub phase_angle_deg: f64,
    #[serde(rename = "illumination")]
    pub illumination_pct: f64,
    pub is_waxing: bool,
    pub moon_position: CelestialPosition,
    pub sun_position: CelestialPosition,
}

impl PhaseInfo {
    pub fn from_positions(
        instant: DateTime<Utc>,
        moon: CelestialPosition,
        sun: CelestialPosition,
    ) -> Self {
        let metrics = compute_phase(&moon, &sun);
        PhaseInfo {
            instant,
            phase_category: metrics.category,
            phase_angle_deg: metrics.phase_angle,
            illumination_pct: metrics.illumination,
            is_waxing: metrics.is_waxing,
            moon_position: moon,
            sun_position: sun,
        }
    }
}

/// Query Moon and Sun at `instant` and derive the phase.
pub fn phase_info<P>(provider: &P, instant: DateTime<Utc>) -> Result<PhaseInfo>
where
    P: PositionProvider + ?Sized,
{
    let jd = JulianDay::from_datetime(&instant);
    let moon = provider.position(jd, Body::Moon)?;
    let sun = provider.position(jd, Body::Sun)?;
    Ok(PhaseInfo::from_positions(instant, moon, sun))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ephemeris::MeeusProvider;
    use chrono::TimeZone;

    fn pos(lon: f64) -> CelestialPosition {
        CelestialPosition::new(lon, 0.0, 1.0)
    }

    #[test]
    fn test_boundaries_belong_to_upper_sector() {
        let expected = [
            (0.0, PhaseCategory::NewMoon),
            (22.4999, PhaseCategory::NewMoon),
            (22.5, PhaseCategory::WaxingCrescent),
            (67.5, PhaseCategory::FirstQuarter),
            (112.5, PhaseCategory::WaxingGibbous),
            (157.5, PhaseCategory::FullMoon),
            (202.5, PhaseCategory::WaningGibbous),
            (247.5, PhaseCategory::LastQuarter),
            (292.5, PhaseCategory::WaningCrescent),
            (337.4999, PhaseCategory::WaningCrescent),
            (337.5, PhaseCategory::NewMoon),
            (359.9999, PhaseCategory::NewMoon),
        ];
        for (angle, category) in expected {
            assert_eq!(PhaseCategory::from_angle(angle), category, "angle {angle}");
        }
    }

    #[test]
    fn test_every_angle_maps_to_one_category() {
        let mut counts = [0usize; 8];
        for tenth in 0..3600 {
            let category = PhaseCategory::from_angle(tenth as f64 / 10.0);
            let idx = PhaseCategory::ALL.iter().position(|c| *c == category).unwrap();
            counts[idx] += 1;
        }
        // Each sector is 45° wide = 450 tenths of a degree
        assert!(counts.iter().all(|&c| c == 450), "{counts:?}");
    }

    #[test]
    fn test_illumination_shape() {
        assert!(illumination_pct(0.0).abs() < 1e-12);
        assert!((illumination_pct(180.0) - 100.0).abs() < 1e-12);
        assert!((illumination_pct(90.0) - 50.0).abs() < 1e-9);
        assert!(illumination_pct(359.999) < 1e-6);

        let mut prev = illumination_pct(0.0);
        for deg in 1..=180 {
            let cur = illumination_pct(deg as f64);
            assert!(cur > prev, "not increasing at {deg}");
            prev = cur;
        }
        for deg in 181..360 {
            let cur = illumination_pct(deg as f64);
            assert!(cur < prev, "not decreasing at {deg}");
            prev = cur;
        }
    }

    #[test]
    fn test_compute_phase_wraps_and_flags_waxing() {
        let m = compute_phase(&pos(10.0), &pos(350.0));
        assert!((m.phase_angle - 20.0).abs() < 1e-9);
        assert!(m.is_waxing);
        assert_eq!(m.category, PhaseCategory::NewMoon);

        let m = compute_phase(&pos(100.0), &pos(280.0));
        assert_eq!(m.phase_angle, 180.0);
        assert!(!m.is_waxing);
        assert_eq!(m.category, PhaseCategory::FullMoon);
        assert!((m.illumination - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_phase_info_new_year_2025() {
        // New moon was 2024-12-30 22:27 UTC
        let instant = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let info = phase_info(&MeeusProvider, instant).unwrap();
        assert_eq!(info.phase_category, PhaseCategory::NewMoon);
        assert!(info.is_waxing);
        assert!((8.0..18.0).contains(&info.phase_angle_deg), "{}", info.phase_angle_deg);
        assert!(info.illumination_pct < 3.0);
    }

    #[test]
    fn test_phase_info_serializes_reference_shape() {
        let instant = Utc.with_ymd_and_hms(2025, 1, 13, 22, 27, 0).unwrap();
        let info = phase_info(&MeeusProvider, instant).unwrap();
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["phase"], "full_moon");
        assert_eq!(json["isWaxing"], info.is_waxing);
        assert!(json["phaseAngle"].is_number());
        assert!(json["illumination"].as_f64().unwrap() > 99.0);
        assert!(json["moonPosition"]["longitude"].is_number());
        assert_eq!(json["date"], "2025-01-13T22:27:00Z");
    }
}
