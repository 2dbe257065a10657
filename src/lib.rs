//! # Moon Calendar Core Library
//!
//! This library computes lunar phase, illumination, rise/set times and zodiac
//! position for a date and an observer location. It is the engine behind the
//! `moon-calendar` binary and can be mounted behind any HTTP layer through the
//! [`api`] module.
//!
//! ## Design Philosophy
//!
//! ### Pure Computation
//! - **Stateless core**: every record is recomputed from `(instant, location)`;
//!   nothing is mutated in place and nothing is persisted
//! - **Injected ephemeris**: positions come from a [`ephemeris::PositionProvider`]
//!   trait object, so phase and rise/set code never know which backend is in use
//! - **Explicit lifecycle**: the process-scoped [`ephemeris::Ephemeris`] handle is
//!   built once at startup, shared through `Arc`, and released with `shutdown()`
//!
//! ### Data Flow
//! 1. **Time**: UTC instant → [`julian::JulianDay`]
//! 2. **Positions**: Julian Day + [`Body`] → [`CelestialPosition`]
//! 3. **Derived**: phase angle/illumination/category ([`phase`]) and
//!    horizon crossings ([`riseset`])
//! 4. **Aggregates**: [`calendar::DayRecord`] and [`calendar::MonthRecord`]
//! 5. **Requests**: validation, caching and JSON envelopes ([`api`])
//!
//! ## Core Types
//!
//! The crate root exports the two value types every layer shares:
//! - [`Body`]: which body to evaluate (Sun or Moon)
//! - [`CelestialPosition`]: apparent geocentric ecliptic coordinates

use serde::{Deserialize, Serialize};
use std::fmt;

// Module declarations
pub mod api;
pub mod cache;
pub mod calendar;
pub mod config;
pub mod ephemeris;
pub mod error;
pub mod julian;
pub mod lunar;
pub mod phase;
pub mod renderer;
pub mod riseset;

pub use error::{MoonError, Result};

/// Astronomical unit in kilometres (IAU 2012).
pub const AU_KM: f64 = 149_597_870.7;

/// Bodies the position providers know how to evaluate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Body {
    Sun,
    Moon,
}

impl fmt::Display for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Body::Sun => f.write_str("Sun"),
            Body::Moon => f.write_str("Moon"),
        }
    }
}

/// Apparent geocentric ecliptic position of a body.
///
/// Values are produced fresh for every query and carry no identity beyond
/// their contents:
/// - `longitude`: degrees in `[0, 360)`
/// - `latitude`: degrees in `[-90, 90]`
/// - `distance`: astronomical units, always positive
///
/// # Example
/// ```
/// use moon_calendar_lib::CelestialPosition;
///
/// let pos = CelestialPosition::new(-10.0, 1.5, 0.00257);
/// assert_eq!(pos.longitude, 350.0);
/// assert!((pos.distance_km() - 384_466.0).abs() < 500.0);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CelestialPosition {
    /// Ecliptic longitude in degrees
    pub longitude: f64,
    /// Ecliptic latitude in degrees
    pub latitude: f64,
    /// Distance in AU
    pub distance: f64,
}

impl CelestialPosition {
    /// Build a position, wrapping the longitude into `[0, 360)` and clamping
    /// the latitude into `[-90, 90]`.
    pub fn new(longitude: f64, latitude: f64, distance: f64) -> Self {
        CelestialPosition {
            longitude: normalize_degrees(longitude),
            latitude: latitude.clamp(-90.0, 90.0),
            distance,
        }
    }

    pub fn distance_km(&self) -> f64 {
        self.distance * AU_KM
    }
}

/// Wrap an angle in degrees into `[0, 360)`.
///
/// `rem_euclid` can return exactly 360.0 for tiny negative inputs because of
/// rounding, so that case is folded back to zero.
pub fn normalize_degrees(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(360.0);
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_degrees() {
        assert_eq!(normalize_degrees(0.0), 0.0);
        assert_eq!(normalize_degrees(360.0), 0.0);
        assert_eq!(normalize_degrees(-90.0), 270.0);
        assert_eq!(normalize_degrees(725.0), 5.0);
        assert!(normalize_degrees(-1e-15) < 360.0);
    }

    #[test]
    fn test_position_serializes_with_reference_names() {
        let pos = CelestialPosition::new(12.5, -3.0, 1.0);
        let json = serde_json::to_value(pos).unwrap();
        assert_eq!(json["longitude"], 12.5);
        assert_eq!(json["latitude"], -3.0);
        assert_eq!(json["distance"], 1.0);
    }
}
