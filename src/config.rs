//! # Configuration Management
//!
//! This module handles loading and parsing configuration from the moon-config.toml file.
//! It provides a centralized way to configure the default observer location, the
//! ephemeris backend and search tuning, caching, and request limits.

use crate::cache::DEFAULT_SWEEP_INTERVAL;
use crate::calendar::DaySettings;
use crate::ephemeris::EphemerisBackend;
use crate::error::Result;
use crate::riseset::{Observer, RiseSetConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// Default config file name, looked up in the working directory
pub const CONFIG_FILE: &str = "moon-config.toml";

/// Application configuration loaded from moon-config.toml
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Observer used when a request gives no location
    pub location: LocationConfig,
    /// Position backend and rise/set search tuning
    pub ephemeris: EphemerisConfig,
    /// In-memory result cache
    pub cache: CacheConfig,
    /// Request limits
    pub api: ApiConfig,
}

/// Default observer location
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LocationConfig {
    /// Human-readable place name for logs
    pub name: String,
    /// Latitude in degrees, north positive
    pub latitude: f64,
    /// Longitude in degrees, east positive
    pub longitude: f64,
    /// Height above sea level in meters
    pub elevation: f64,
}

/// Ephemeris backend and rise/set search configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct EphemerisConfig {
    /// `meeus` (default) or `schaefer`
    pub backend: EphemerisBackend,
    /// Coarse altitude scan step in minutes
    pub step_minutes: f64,
    /// Rise/set search window from UTC midnight, in days
    pub search_window_days: f64,
    /// Bisection precision in seconds
    pub precision_seconds: f64,
}

/// Cache configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CacheConfig {
    /// Set false to recompute every request
    pub enabled: bool,
    /// TTL for located day records in seconds
    pub day_info_ttl_secs: u64,
    /// How often inserts sweep out expired records, in seconds
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

fn default_sweep_interval_secs() -> u64 {
    DEFAULT_SWEEP_INTERVAL.as_secs()
}

/// Request validation limits
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ApiConfig {
    /// Longest accepted calendar range in days
    pub max_calendar_days: i64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            location: LocationConfig {
                name: "Berlin".to_string(),
                latitude: 52.52,
                longitude: 13.405,
                elevation: 0.0,
            },
            ephemeris: EphemerisConfig {
                backend: EphemerisBackend::Meeus,
                step_minutes: 60.0,
                search_window_days: 1.0,
                precision_seconds: 1.0,
            },
            cache: CacheConfig {
                enabled: true,
                day_info_ttl_secs: 86_400, // one day
                sweep_interval_secs: default_sweep_interval_secs(),
            },
            api: ApiConfig {
                max_calendar_days: 60,
            },
        }
    }
}

impl Config {
    /// Load configuration from moon-config.toml file
    /// Falls back to default configuration if file doesn't exist or is invalid
    pub fn load() -> Self {
        Self::load_from_path(CONFIG_FILE)
    }

    /// Load configuration from specified path
    /// Falls back to default configuration if file doesn't exist or is invalid
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<Config>(&contents) {
                Ok(config) => {
                    info!(
                        path = %path.display(),
                        location = %config.location.name,
                        "loaded configuration"
                    );
                    config.sanitized()
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "invalid config file format, using defaults (Berlin)");
                    Self::default()
                }
            },
            Err(_) => {
                info!(path = %path.display(), "no config file found, using defaults (Berlin)");
                Self::default()
            }
        }
    }

    /// Replace each section holding out-of-range values with its default.
    ///
    /// A file can parse and still be unservable, e.g. a latitude past the pole
    /// or a scan step of a microsecond. The backend choice is kept.
    pub fn sanitized(mut self) -> Self {
        let defaults = Config::default();
        if let Err(e) = self.observer() {
            warn!(error = %e, "invalid [location], using defaults (Berlin)");
            self.location = defaults.location;
        }
        if let Err(e) = self.day_settings().validate() {
            warn!(error = %e, "invalid [ephemeris] search settings, using defaults");
            self.ephemeris = EphemerisConfig {
                backend: self.ephemeris.backend,
                ..defaults.ephemeris
            };
        }
        if self.api.max_calendar_days < 0 {
            warn!(
                max_calendar_days = self.api.max_calendar_days,
                "negative [api] range limit, using defaults"
            );
            self.api = defaults.api;
        }
        self
    }

    /// Save current configuration to `path`
    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path.as_ref(), contents)?;
        info!(path = %path.as_ref().display(), "configuration saved");
        Ok(())
    }

    /// Default observer as a validated [`Observer`]
    pub fn observer(&self) -> Result<Observer> {
        Observer::new(
            self.location.latitude,
            self.location.longitude,
            self.location.elevation,
        )
    }

    /// Rise/set search settings for the aggregator
    pub fn day_settings(&self) -> DaySettings {
        DaySettings {
            search_window_days: self.ephemeris.search_window_days,
            rise_set: RiseSetConfig {
                step_minutes: self.ephemeris.step_minutes,
                precision_seconds: self.ephemeris.precision_seconds,
                ..RiseSetConfig::default()
            },
        }
    }
}
