//! Low-precision lunar ephemeris (Schaefer 1985/1994)
//!
//! Accuracy: a few hours for lunar age; about 1° for λ and β; under 1 % for Δ.
//! References: Sky & Telescope BASIC "MOONFX.BAS" (Apr 1994) and the
//! earlier phase routine (Mar 1985).
//!
//! The Sun for this backend comes from the same Meeus solar series as
//! [`crate::ephemeris::MeeusProvider`]; only the Moon is cheaper.

use crate::ephemeris::{check_validity, solar_position, PositionProvider};
use crate::error::Result;
use crate::julian::JulianDay;
use crate::{Body, CelestialPosition, AU_KM};
use core::f64::consts::TAU;

/// Mean synodic month in days.
pub const SYNODIC_MONTH: f64 = 29.530_588_853;

/// Epochs (JD) of each cycle's zero point, all from MOONFX.BAS.
const NEW_MOON_EPOCH_JD: f64 = 2_451_550.1;
const PERIGEE_EPOCH_JD: f64 = 2_451_562.2;
const NODE_EPOCH_JD: f64 = 2_451_565.2;
const SIDEREAL_EPOCH_JD: f64 = 2_451_555.8;

/// Equatorial Earth radius in km, the unit Schaefer's distance term uses.
const EARTH_RADIUS_KM: f64 = 6_378.14;

/// Everything the lunar-cycles model produces for one instant.
#[derive(Debug, Clone, Copy)]
pub struct SchaeferMoon {
    /// Age of the Moon in days since the last mean new moon.
    pub age_days: f64,
    /// Geocentric distance in Earth radii.
    pub distance_er: f64,
    /// Ecliptic longitude (deg, low precision, `[0, 360)`).
    pub lon_deg: f64,
    /// Ecliptic latitude (deg, low precision).
    pub lat_deg: f64,
}

fn frac(v: f64) -> f64 {
    v - v.floor()
}

/// Evaluate the four lunar cycles (synodic, anomalistic, draconic, sidereal)
/// at `jd`.
pub fn schaefer_moon(jd: JulianDay) -> SchaeferMoon {
    let jd = jd.value();

    // Synodic phase: fraction of the current lunation
    let synodic = frac((jd - NEW_MOON_EPOCH_JD) / SYNODIC_MONTH);
    let age_days = synodic * SYNODIC_MONTH;
    let two_synodic = 2.0 * synodic * TAU;

    // Anomalistic phase → perigee distance term
    let dp = frac((jd - PERIGEE_EPOCH_JD) / 27.554_549_88) * TAU;
    let distance_er = 60.4 - 3.3 * dp.cos() - 0.6 * (two_synodic - dp).cos() - 0.5 * two_synodic.cos();

    // Draconic (nodal) phase → ecliptic latitude
    let np = frac((jd - NODE_EPOCH_JD) / 27.212_220_817) * TAU;
    let lat_deg = 5.1 * np.sin();

    // Sidereal phase → ecliptic longitude
    let rp = frac((jd - SIDEREAL_EPOCH_JD) / 27.321_582_241);
    let lon_deg = crate::normalize_degrees(
        360.0 * rp + 6.3 * dp.sin() + 1.3 * (two_synodic - dp).sin() + 0.7 * two_synodic.sin(),
    );

    SchaeferMoon {
        age_days,
        distance_er,
        lon_deg,
        lat_deg,
    }
}

/// Low-precision backend: Schaefer Moon, Meeus Sun.
#[derive(Debug, Default, Clone, Copy)]
pub struct SchaeferProvider;

impl PositionProvider for SchaeferProvider {
    fn name(&self) -> &'static str {
        "schaefer"
    }

    fn position(&self, jd: JulianDay, body: Body) -> Result<CelestialPosition> {
        let t = check_validity(jd, body)?;
        Ok(match body {
            Body::Sun => solar_position(t),
            Body::Moon => {
                let moon = schaefer_moon(jd);
                CelestialPosition::new(
                    moon.lon_deg,
                    moon.lat_deg,
                    moon.distance_er * EARTH_RADIUS_KM / AU_KM,
                )
            }
        })
    }
}
