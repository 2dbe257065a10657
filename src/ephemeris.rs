//! # Sun & Moon Positions
//!
//! Everything above this module asks for positions through the
//! [`PositionProvider`] trait and never knows which model answered. Two
//! backends ship with the crate:
//!
//! - [`MeeusProvider`]: low-accuracy solar series plus the main terms of the
//!   ELP-2000/82 lunar theory. Accuracy ≈ 0.01° for the Sun and ≈ 0.01–0.02°
//!   for the Moon, well inside one phase bucket or zodiac boundary.
//! - [`crate::lunar::SchaeferProvider`]: Schaefer's lunar-cycle model. A few
//!   degrees of error, but only a handful of trig calls.
//!
//! ## Lifecycle
//!
//! [`Ephemeris`] is the process-scoped handle wrapped around a backend. It is
//! built once at startup, shared through `Arc`, and initialises its backend
//! lazily on first use behind a `OnceLock`, so concurrent first callers
//! initialise exactly once. [`Ephemeris::shutdown`] releases it; any query
//! after that fails with [`MoonError::ProviderUnavailable`].
//!
//! References: Meeus, *Astronomical Algorithms* (2nd ed.), chapters 22, 25
//! and 47.

use crate::error::{MoonError, Result};
use crate::julian::JulianDay;
use crate::{Body, CelestialPosition, AU_KM};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;
use tracing::{debug, info};

/// Half-width of the validity window in Julian centuries around J2000
/// (roughly years 1000 to 3000). The truncated series degrade quickly outside.
pub const VALID_CENTURIES: f64 = 10.0;

/// Source of apparent geocentric ecliptic positions.
pub trait PositionProvider: Send + Sync {
    /// Short backend name for logs and diagnostics.
    fn name(&self) -> &'static str;

    /// One-time setup (loading tables, opening data files). Must be
    /// idempotent; [`Ephemeris`] calls it at most once.
    fn initialize(&self) -> Result<()> {
        Ok(())
    }

    /// Apparent ecliptic position of `body` at `jd`.
    fn position(&self, jd: JulianDay, body: Body) -> Result<CelestialPosition>;
}

/// Which backend to build from configuration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EphemerisBackend {
    /// Meeus solar series + truncated ELP-2000 lunar series
    #[default]
    Meeus,
    /// Schaefer lunar cycles + Meeus solar series
    Schaefer,
}

/// Fail with `ProviderUnavailable` when `jd` is outside the series' window.
pub(crate) fn check_validity(jd: JulianDay, body: Body) -> Result<f64> {
    let t = jd.centuries_since_j2000();
    if t.abs() > VALID_CENTURIES {
        return Err(MoonError::unavailable(
            body,
            format!(
                "JD {:.1} is outside the supported range (±{} centuries from J2000)",
                jd.value(),
                VALID_CENTURIES
            ),
        ));
    }
    Ok(t)
}

/// Nutation in longitude in degrees (Meeus 22, 0.5″ accuracy terms).
pub(crate) fn nutation_longitude_deg(t: f64) -> f64 {
    let omega = (125.044_52 - 1_934.136_261 * t).to_radians();
    let l_sun = (280.466_5 + 36_000.769_8 * t).to_radians();
    let l_moon = (218.316_5 + 481_267.881_3 * t).to_radians();
    let arcsec = -17.20 * omega.sin() - 1.32 * (2.0 * l_sun).sin() - 0.23 * (2.0 * l_moon).sin()
        + 0.21 * (2.0 * omega).sin();
    arcsec / 3600.0
}

/// Mean obliquity of the ecliptic in degrees (Meeus 22.2, truncated).
pub fn mean_obliquity_deg(t: f64) -> f64 {
    23.439_291_1 - 0.013_004_2 * t - 1.64e-7 * t * t + 5.04e-7 * t * t * t
}

/// Apparent solar position (Meeus 25, low accuracy).
///
/// Latitude is taken as zero; the true value never exceeds 1.2″.
pub(crate) fn solar_position(t: f64) -> CelestialPosition {
    let l0 = 280.466_46 + 36_000.769_83 * t + 0.000_303_2 * t * t;
    let m = (357.529_11 + 35_999.050_29 * t - 0.000_153_7 * t * t).to_radians();
    let e = 0.016_708_634 - 0.000_042_037 * t - 0.000_000_126_7 * t * t;

    let c = (1.914_602 - 0.004_817 * t - 0.000_014 * t * t) * m.sin()
        + (0.019_993 - 0.000_101 * t) * (2.0 * m).sin()
        + 0.000_289 * (3.0 * m).sin();
    let true_lon = l0 + c;
    let v = m + c.to_radians();
    let radius_au = 1.000_001_018 * (1.0 - e * e) / (1.0 + e * v.cos());

    // Nutation and aberration
    let omega = (125.04 - 1_934.136 * t).to_radians();
    let apparent = true_lon - 0.005_69 - 0.004_78 * omega.sin();

    CelestialPosition::new(apparent, 0.0, radius_au)
}

/// Periodic terms for the Moon's longitude and distance:
/// multiples of (D, M, M', F), Σl in 1e-6 degrees, Σr in metres.
#[rustfmt::skip]
const LON_DIST_TERMS: [(i8, i8, i8, i8, f64, f64); 32] = [
    (0, 0, 1, 0, 6_288_774.0, -20_905_355.0),
    (2, 0, -1, 0, 1_274_027.0, -3_699_111.0),
    (2, 0, 0, 0, 658_314.0, -2_955_968.0),
    (0, 0, 2, 0, 213_618.0, -569_925.0),
    (0, 1, 0, 0, -185_116.0, 48_888.0),
    (0, 0, 0, 2, -114_332.0, -3_149.0),
    (2, 0, -2, 0, 58_793.0, 246_158.0),
    (2, -1, -1, 0, 57_066.0, -152_138.0),
    (2, 0, 1, 0, 53_322.0, -170_733.0),
    (2, -1, 0, 0, 45_758.0, -204_586.0),
    (0, 1, -1, 0, -40_923.0, -129_620.0),
    (1, 0, 0, 0, -34_720.0, 108_743.0),
    (0, 1, 1, 0, -30_383.0, 104_755.0),
    (2, 0, 0, -2, 15_327.0, 10_321.0),
    (0, 0, 1, 2, -12_528.0, 0.0),
    (0, 0, 1, -2, 10_980.0, 79_661.0),
    (4, 0, -1, 0, 10_675.0, -34_782.0),
    (0, 0, 3, 0, 10_034.0, -23_210.0),
    (4, 0, -2, 0, 8_548.0, -21_636.0),
    (2, 1, -1, 0, -7_888.0, 24_208.0),
    (2, 1, 0, 0, -6_766.0, 30_824.0),
    (1, 0, -1, 0, -5_163.0, -8_379.0),
    (1, 1, 0, 0, 4_987.0, -16_675.0),
    (2, -1, 1, 0, 4_036.0, -12_831.0),
    (2, 0, 2, 0, 3_994.0, -10_445.0),
    (4, 0, 0, 0, 3_861.0, -11_650.0),
    (2, 0, -3, 0, 3_665.0, 14_403.0),
    (0, 1, -2, 0, -2_689.0, -7_003.0),
    (2, 0, -1, 2, -2_602.0, 0.0),
    (2, -1, -2, 0, 2_390.0, 10_056.0),
    (1, 0, 1, 0, -2_348.0, 6_322.0),
    (2, -2, 0, 0, 2_236.0, -9_884.0),
];

/// Periodic terms for the Moon's latitude: (D, M, M', F), Σb in 1e-6 degrees.
#[rustfmt::skip]
const LAT_TERMS: [(i8, i8, i8, i8, f64); 15] = [
    (0, 0, 0, 1, 5_128_122.0),
    (0, 0, 1, 1, 280_602.0),
    (0, 0, 1, -1, 277_693.0),
    (2, 0, 0, -1, 173_237.0),
    (2, 0, -1, 1, 55_413.0),
    (2, 0, -1, -1, 46_271.0),
    (2, 0, 0, 1, 32_573.0),
    (0, 0, 2, 1, 17_198.0),
    (2, 0, 1, -1, 9_266.0),
    (0, 0, 2, -1, 8_822.0),
    (2, -1, 0, -1, 8_216.0),
    (2, 0, -2, -1, 4_324.0),
    (2, 0, 1, 1, 4_200.0),
    (2, 1, 0, -1, -3_359.0),
    (2, -1, -1, 1, 2_463.0),
];

/// Apparent lunar position from the truncated ELP-2000 series (Meeus 47).
pub(crate) fn lunar_position(t: f64) -> CelestialPosition {
    let t2 = t * t;
    let lp = 218.316_447_7 + 481_267.881_234_21 * t - 0.001_578_6 * t2;
    let d = (297.850_192_1 + 445_267.111_403_4 * t - 0.001_881_9 * t2).to_radians();
    let m = (357.529_109_2 + 35_999.050_290_9 * t - 0.000_153_6 * t2).to_radians();
    let mp = (134.963_396_4 + 477_198.867_505_5 * t + 0.008_741_4 * t2).to_radians();
    let f = (93.272_095_0 + 483_202.017_523_3 * t - 0.003_653_9 * t2).to_radians();

    // Eccentricity of Earth's orbit scales every term containing M
    let e = 1.0 - 0.002_516 * t - 0.000_007_4 * t2;
    let e_factor = |mult: i8| match mult.abs() {
        1 => e,
        2 => e * e,
        _ => 1.0,
    };
    let arg = |dm: i8, mm: i8, mpm: i8, fm: i8| {
        dm as f64 * d + mm as f64 * m + mpm as f64 * mp + fm as f64 * f
    };

    let (mut sum_l, mut sum_r) = (0.0, 0.0);
    for &(dm, mm, mpm, fm, cl, cr) in LON_DIST_TERMS.iter() {
        let a = arg(dm, mm, mpm, fm);
        let k = e_factor(mm);
        sum_l += cl * k * a.sin();
        sum_r += cr * k * a.cos();
    }
    let mut sum_b = 0.0;
    for &(dm, mm, mpm, fm, cb) in LAT_TERMS.iter() {
        sum_b += cb * e_factor(mm) * arg(dm, mm, mpm, fm).sin();
    }

    // Venus, Jupiter and flattening corrections
    let a1 = (119.75 + 131.849 * t).to_radians();
    let a2 = (53.09 + 479_264.290 * t).to_radians();
    let a3 = (313.45 + 481_266.484 * t).to_radians();
    let lp_r = lp.to_radians();
    sum_l += 3_958.0 * a1.sin() + 1_962.0 * (lp_r - f).sin() + 318.0 * a2.sin();
    sum_b += -2_235.0 * lp_r.sin() + 382.0 * a3.sin() + 175.0 * (a1 - f).sin()
        + 175.0 * (a1 + f).sin()
        + 127.0 * (lp_r - mp).sin()
        - 115.0 * (lp_r + mp).sin();

    let lon = lp + sum_l / 1_000_000.0 + nutation_longitude_deg(t);
    let lat = sum_b / 1_000_000.0;
    let dist_km = 385_000.56 + sum_r / 1_000.0;

    CelestialPosition::new(lon, lat, dist_km / AU_KM)
}

/// Analytic backend: Meeus solar series and truncated ELP-2000 lunar series.
#[derive(Debug, Default, Clone, Copy)]
pub struct MeeusProvider;

impl PositionProvider for MeeusProvider {
    fn name(&self) -> &'static str {
        "meeus"
    }

    fn position(&self, jd: JulianDay, body: Body) -> Result<CelestialPosition> {
        let t = check_validity(jd, body)?;
        Ok(match body {
            Body::Sun => solar_position(t),
            Body::Moon => lunar_position(t),
        })
    }
}

/// Process-scoped ephemeris handle.
///
/// # Example
/// ```
/// use moon_calendar_lib::ephemeris::{Ephemeris, EphemerisBackend, PositionProvider};
/// use moon_calendar_lib::julian::JulianDay;
/// use moon_calendar_lib::Body;
///
/// let eph = Ephemeris::from_backend(EphemerisBackend::Meeus);
/// let jd = JulianDay::from_calendar(2025, 1, 1.0).unwrap();
/// assert!(eph.position(jd, Body::Moon).is_ok());
///
/// eph.shutdown();
/// assert!(eph.position(jd, Body::Moon).is_err());
/// ```
pub struct Ephemeris {
    backend: Box<dyn PositionProvider>,
    ready: OnceLock<Result<()>>,
    released: AtomicBool,
}

impl Ephemeris {
    pub fn new(backend: Box<dyn PositionProvider>) -> Self {
        Ephemeris {
            backend,
            ready: OnceLock::new(),
            released: AtomicBool::new(false),
        }
    }

    pub fn from_backend(backend: EphemerisBackend) -> Self {
        match backend {
            EphemerisBackend::Meeus => Self::new(Box::new(MeeusProvider)),
            EphemerisBackend::Schaefer => Self::new(Box::new(crate::lunar::SchaeferProvider)),
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn is_initialized(&self) -> bool {
        self.ready.get().is_some()
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }

    /// Release the backend. Idempotent; later queries fail.
    pub fn shutdown(&self) {
        if !self.released.swap(true, Ordering::AcqRel) {
            info!(backend = self.backend.name(), "ephemeris released");
        }
    }

    fn ensure_initialized(&self) -> Result<()> {
        self.ready
            .get_or_init(|| {
                debug!(backend = self.backend.name(), "initializing ephemeris backend");
                self.backend.initialize()
            })
            .clone()
    }
}

impl PositionProvider for Ephemeris {
    fn name(&self) -> &'static str {
        self.backend.name()
    }

    fn initialize(&self) -> Result<()> {
        self.ensure_initialized()
    }

    fn position(&self, jd: JulianDay, body: Body) -> Result<CelestialPosition> {
        if self.is_released() {
            return Err(MoonError::unavailable(body, "ephemeris has been shut down"));
        }
        self.ensure_initialized()?;
        self.backend.position(jd, body)
    }
}

impl std::fmt::Debug for Ephemeris {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ephemeris")
            .field("backend", &self.backend.name())
            .field("initialized", &self.is_initialized())
            .field("released", &self.is_released())
            .finish()
    }
}
