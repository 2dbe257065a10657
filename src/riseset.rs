//! # Rise/Set Search
//!
//! Finds the next time a body's upper limb crosses the observer's horizon,
//! scanning forward from a reference instant.
//!
//! ## Algorithm
//!
//! 1. **Altitude**: ecliptic position → equatorial (mean obliquity) → hour
//!    angle from Greenwich mean sidereal time → altitude. The Moon's parallax
//!    (up to ~1°) is removed to get a topocentric altitude.
//! 2. **Horizon reference**: a fixed conventional depression of 34′ for
//!    refraction, minus the body's semidiameter, minus the dip of the visible
//!    horizon for an elevated observer.
//! 3. **Scan**: sample `altitude − reference` every `step_minutes` through the
//!    search window. An ascending sign change brackets a rise, a descending
//!    one a set.
//! 4. **Refine**: bisect the bracket down to `precision_seconds`.
//!
//! No sign change in the window (polar day or night, or a Moon that skips a
//! rise that day) yields `Ok(None)`. A failing position query fails the whole
//! search with that error.
//!
//! Sources: Meeus, *Astronomical Algorithms* chapters 12, 13 and 15; WGS84
//! radius and dip formulas as used by sunrise calculators.

use crate::ephemeris::{mean_obliquity_deg, PositionProvider};
use crate::error::{MoonError, Result};
use crate::julian::{JulianDay, J2000};
use crate::{Body, CelestialPosition};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// WGS84 semi-major axis (equatorial radius) in meters
const A_EQUATOR: f64 = 6_378_137.0;

/// WGS84 semi-minor axis (polar radius) in meters
const B_POLAR: f64 = 6_356_752.314_245;

/// Solar radius in km (IAU nominal).
const SUN_RADIUS_KM: f64 = 696_000.0;

/// Lunar mean radius in km.
const MOON_RADIUS_KM: f64 = 1_737.4;

/// Upper bound on bisection steps; 40 halvings of an hour is far below 1 µs.
const MAX_BISECTIONS: usize = 40;

const MINUTES_PER_DAY: f64 = 1_440.0;
const SECONDS_PER_DAY: f64 = 86_400.0;

/// Accepted range for the coarse scan step, in minutes.
pub const STEP_MINUTES_RANGE: std::ops::RangeInclusive<f64> = 1.0..=360.0;
/// Longest accepted search window, in days.
pub const MAX_SEARCH_WINDOW_DAYS: f64 = 7.0;
/// Accepted range for the bisection precision, in seconds.
pub const PRECISION_SECONDS_RANGE: std::ops::RangeInclusive<f64> = 0.001..=3_600.0;
/// Upper bound on altitude evaluations in one coarse scan.
pub const MAX_SCAN_STEPS: usize = 20_000;

/// A geographic observer.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Observer {
    /// Geodetic latitude in degrees, north positive
    pub latitude: f64,
    /// Longitude in degrees, east positive
    pub longitude: f64,
    /// Height above sea level in meters
    pub elevation: f64,
}

impl Observer {
    /// Validated constructor: latitude in `[-90, 90]`, longitude in
    /// `[-180, 180]`, all values finite.
    pub fn new(latitude: f64, longitude: f64, elevation: f64) -> Result<Self> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(MoonError::invalid(format!(
                "latitude {latitude} must be between -90 and 90"
            )));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(MoonError::invalid(format!(
                "longitude {longitude} must be between -180 and 180"
            )));
        }
        if !elevation.is_finite() {
            return Err(MoonError::invalid("elevation must be finite"));
        }
        Ok(Observer {
            latitude,
            longitude,
            elevation,
        })
    }
}

/// Which horizon crossing to look for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiseSetDirection {
    Rise,
    Set,
}

/// Search tuning.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RiseSetConfig {
    /// Coarse scan step in minutes
    pub step_minutes: f64,
    /// Bisection stops once the bracket is narrower than this
    pub precision_seconds: f64,
    /// Conventional horizon depression for refraction, in arcminutes
    pub refraction_arcmin: f64,
}

impl RiseSetConfig {
    /// Reject scan steps, precisions and refraction values outside the
    /// supported ranges. NaN and infinities are never accepted.
    pub fn validate(&self) -> Result<()> {
        if !STEP_MINUTES_RANGE.contains(&self.step_minutes) {
            return Err(MoonError::invalid(format!(
                "scan step must be between {} and {} minutes, got {}",
                STEP_MINUTES_RANGE.start(),
                STEP_MINUTES_RANGE.end(),
                self.step_minutes
            )));
        }
        if !PRECISION_SECONDS_RANGE.contains(&self.precision_seconds) {
            return Err(MoonError::invalid(format!(
                "precision must be between {} and {} seconds, got {}",
                PRECISION_SECONDS_RANGE.start(),
                PRECISION_SECONDS_RANGE.end(),
                self.precision_seconds
            )));
        }
        if !self.refraction_arcmin.is_finite() {
            return Err(MoonError::invalid("refraction must be finite"));
        }
        Ok(())
    }
}

/// Reject search windows that are not in `(0, MAX_SEARCH_WINDOW_DAYS]`.
pub fn validate_window(window_days: f64) -> Result<()> {
    if window_days.is_finite() && window_days > 0.0 && window_days <= MAX_SEARCH_WINDOW_DAYS {
        Ok(())
    } else {
        Err(MoonError::invalid(format!(
            "search window must be more than 0 and at most {MAX_SEARCH_WINDOW_DAYS} days, got {window_days}"
        )))
    }
}

impl Default for RiseSetConfig {
    fn default() -> Self {
        RiseSetConfig {
            step_minutes: 60.0,
            precision_seconds: 1.0,
            refraction_arcmin: 34.0,
        }
    }
}

/// Next rise and next set found in one window.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RiseSet {
    pub rise: Option<DateTime<Utc>>,
    pub set: Option<DateTime<Utc>>,
}

/// Earth radius at a given latitude on the WGS84 ellipsoid, in meters.
pub fn earth_radius_wgs84(lat_deg: f64) -> f64 {
    let phi = lat_deg.to_radians();
    let (sin, cos) = phi.sin_cos();
    let a2 = A_EQUATOR * A_EQUATOR;
    let b2 = B_POLAR * B_POLAR;
    let numerator = a2 * a2 * cos * cos + b2 * b2 * sin * sin;
    let denominator = (A_EQUATOR * cos).powi(2) + (B_POLAR * sin).powi(2);
    (numerator / denominator).sqrt()
}

/// Dip of the visible horizon in degrees for an observer `h` meters up.
/// Negative elevations give a negative dip.
pub fn horizon_dip_deg(lat_deg: f64, h: f64) -> f64 {
    if h.abs() < 1e-5 {
        return 0.0;
    }
    let r = earth_radius_wgs84(lat_deg);
    let dip = (r / (r + h.abs())).clamp(-1.0, 1.0).acos().to_degrees();
    if h > 0.0 {
        dip
    } else {
        -dip
    }
}

/// Greenwich mean sidereal time in degrees (Meeus 12.4). UT is taken as UTC.
pub fn gmst_deg(jd: JulianDay) -> f64 {
    let d = jd.value() - J2000;
    let t = jd.centuries_since_j2000();
    let theta = 280.460_618_37 + 360.985_647_366_29 * d + 0.000_387_933 * t * t
        - t * t * t / 38_710_000.0;
    crate::normalize_degrees(theta)
}

/// Ecliptic → equatorial. Returns `(right ascension, declination)` in radians.
pub fn ecliptic_to_equatorial(pos: &CelestialPosition, obliquity_deg: f64) -> (f64, f64) {
    let eps = obliquity_deg.to_radians();
    let lon = pos.longitude.to_radians();
    let lat = pos.latitude.to_radians();
    let ra = (lon.sin() * eps.cos() - lat.tan() * eps.sin()).atan2(lon.cos());
    let dec = (lat.sin() * eps.cos() + lat.cos() * eps.sin() * lon.sin()).asin();
    (ra, dec)
}

/// Topocentric altitude of `body` minus its rise/set reference altitude, in
/// degrees. Positive means the upper limb is above the horizon.
pub fn altitude_above_horizon<P>(
    provider: &P,
    body: Body,
    observer: &Observer,
    jd: JulianDay,
    config: &RiseSetConfig,
) -> Result<f64>
where
    P: PositionProvider + ?Sized,
{
    let pos = provider.position(jd, body)?;
    let (ra, dec) = ecliptic_to_equatorial(&pos, mean_obliquity_deg(jd.centuries_since_j2000()));

    let phi = observer.latitude.to_radians();
    let hour_angle = (gmst_deg(jd) + observer.longitude).to_radians() - ra;
    let sin_alt = phi.sin() * dec.sin() + phi.cos() * dec.cos() * hour_angle.cos();
    let geocentric = sin_alt.clamp(-1.0, 1.0).asin().to_degrees();

    let dist_km = pos.distance_km();
    let parallax = (A_EQUATOR / 1_000.0 / dist_km).asin().to_degrees();
    let topocentric = geocentric - parallax * geocentric.to_radians().cos();

    let radius_km = match body {
        Body::Sun => SUN_RADIUS_KM,
        Body::Moon => MOON_RADIUS_KM,
    };
    let semidiameter = (radius_km / dist_km).asin().to_degrees();
    let reference = -config.refraction_arcmin / 60.0
        - semidiameter
        - horizon_dip_deg(observer.latitude, observer.elevation);

    Ok(topocentric - reference)
}

fn is_crossing(direction: RiseSetDirection, before: f64, after: f64) -> bool {
    match direction {
        RiseSetDirection::Rise => before < 0.0 && after >= 0.0,
        RiseSetDirection::Set => before >= 0.0 && after < 0.0,
    }
}

/// Next `direction` crossing of `body` within `window_days` of `reference`.
///
/// Returns `Ok(None)` when the body does not cross the horizon in that
/// direction inside the window.
pub fn find_crossing<P>(
    provider: &P,
    body: Body,
    observer: &Observer,
    reference: DateTime<Utc>,
    direction: RiseSetDirection,
    window_days: f64,
    config: &RiseSetConfig,
) -> Result<Option<DateTime<Utc>>>
where
    P: PositionProvider + ?Sized,
{
    validate_window(window_days)?;
    config.validate()?;

    let start = JulianDay::from_datetime(&reference);
    let end = start.add_days(window_days);
    let step_days = config.step_minutes / MINUTES_PER_DAY;
    let steps = (window_days / step_days).ceil();
    if steps > MAX_SCAN_STEPS as f64 {
        return Err(MoonError::invalid(format!(
            "scan of {window_days} days at {} minute steps exceeds {MAX_SCAN_STEPS} evaluations",
            config.step_minutes
        )));
    }
    let steps = steps as usize;
    let height = |jd: JulianDay| altitude_above_horizon(provider, body, observer, jd, config);

    let mut prev_jd = start;
    let mut prev = height(prev_jd)?;
    for i in 1..=steps {
        let jd = start.add_days(i as f64 * step_days);
        let jd = if jd > end { end } else { jd };
        let cur = height(jd)?;

        if is_crossing(direction, prev, cur) {
            let instant = bisect(direction, prev_jd, jd, config.precision_seconds, &height)?;
            return instant.to_datetime().map(Some);
        }
        prev_jd = jd;
        prev = cur;
    }
    Ok(None)
}

/// Narrow a bracketing interval `[lo, hi]` around the crossing.
fn bisect<F>(
    direction: RiseSetDirection,
    mut lo: JulianDay,
    mut hi: JulianDay,
    precision_seconds: f64,
    height: &F,
) -> Result<JulianDay>
where
    F: Fn(JulianDay) -> Result<f64>,
{
    let precision_days = precision_seconds.max(1e-3) / SECONDS_PER_DAY;
    for _ in 0..MAX_BISECTIONS {
        if hi.value() - lo.value() <= precision_days {
            break;
        }
        let mid = lo.add_days((hi.value() - lo.value()) / 2.0);
        let h = height(mid)?;
        let mid_is_before = match direction {
            RiseSetDirection::Rise => h < 0.0,
            RiseSetDirection::Set => h >= 0.0,
        };
        if mid_is_before {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    Ok(lo.add_days((hi.value() - lo.value()) / 2.0))
}

/// Both crossings of `body` in one window.
pub fn rise_and_set<P>(
    provider: &P,
    body: Body,
    observer: &Observer,
    reference: DateTime<Utc>,
    window_days: f64,
    config: &RiseSetConfig,
) -> Result<RiseSet>
where
    P: PositionProvider + ?Sized,
{
    Ok(RiseSet {
        rise: find_crossing(
            provider,
            body,
            observer,
            reference,
            RiseSetDirection::Rise,
            window_days,
            config,
        )?,
        set: find_crossing(
            provider,
            body,
            observer,
            reference,
            RiseSetDirection::Set,
            window_days,
            config,
        )?,
    })
}
