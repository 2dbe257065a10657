//! # Request Layer
//!
//! Validates request parameters, consults the record cache, runs the
//! calculations and shapes `{success, data | error}` envelopes. Each
//! operation corresponds to one HTTP route of the public moon API:
//!
//! | Operation | Route |
//! |-----------|-------|
//! | [`MoonApi::index`] | `/api` |
//! | [`MoonApi::today`] | `/api/moon/today?date&timezone` |
//! | [`MoonApi::day_info`] | `/api/moon/day-info?date&latitude&longitude` |
//! | [`MoonApi::month`] | `/api/moon/month?year&month&location` |
//! | [`MoonApi::calendar`] | `/api/moon/calendar?startDate&endDate` |
//!
//! No socket is bound here; the query structs deserialize from query strings
//! so any HTTP framework can mount these handlers, and the CLI calls them
//! directly.

use crate::cache::{moon_cache_key, MemoryCache};
use crate::calendar::{self, DayRecord, MonthRecord};
use crate::config::Config;
use crate::ephemeris::Ephemeris;
use crate::error::MoonError;
use crate::phase::{phase_info, PhaseCategory, PhaseInfo};
use crate::riseset::Observer;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Offset, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, warn};

/// Errors surfaced to API callers.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    /// The request itself is wrong; maps to HTTP 400.
    #[error("{0}")]
    BadRequest(String),

    /// The calculation failed; maps to HTTP 500.
    #[error("Failed to calculate {operation}: {source}")]
    Internal {
        operation: &'static str,
        #[source]
        source: MoonError,
    },
}

impl ApiError {
    /// HTTP status code for this error.
    pub fn status(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::Internal { .. } => 500,
        }
    }

    fn bad_request(msg: impl Into<String>) -> Self {
        let msg = msg.into();
        warn!(reason = %msg, "rejected request");
        ApiError::BadRequest(msg)
    }

    /// Sort a core error into caller fault or service fault.
    fn from_core(operation: &'static str, err: MoonError) -> Self {
        match err {
            MoonError::InvalidInput(msg) => Self::bad_request(msg),
            source => {
                error!(operation, error = %source, "calculation failed");
                ApiError::Internal { operation, source }
            }
        }
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Response envelope: `{"success": true, "data": ...}` or
/// `{"success": false, "error": "..."}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        ApiResponse {
            success: true,
            data: Some(data),
            count: None,
            error: None,
        }
    }

    pub fn failure(err: &ApiError) -> Self {
        ApiResponse {
            success: false,
            data: None,
            count: None,
            error: Some(err.to_string()),
        }
    }

    pub fn with_count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }

    /// Envelope plus HTTP status for a handler result.
    pub fn from_result(result: ApiResult<T>) -> (u16, Self) {
        match result {
            Ok(data) => (200, Self::ok(data)),
            Err(err) => (err.status(), Self::failure(&err)),
        }
    }
}

/// Parameters of the `today` operation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TodayQuery {
    pub date: Option<String>,
    /// `UTC` (default), `Z`, or a fixed offset such as `+02:00`
    pub timezone: Option<String>,
}

/// Parameters of the `day-info` operation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DayInfoQuery {
    pub date: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Parameters of the `month` operation.
#[derive(Debug, Clone, Deserialize)]
pub struct MonthQuery {
    pub year: i32,
    /// Zero-based month, 0 = January
    pub month: i32,
    /// `"lat,lon"`; the configured location when absent
    pub location: Option<String>,
}

/// Parameters of the `calendar` operation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarQuery {
    pub start_date: String,
    pub end_date: String,
}

/// Compact per-day entry of the `calendar` operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseSummary {
    pub date: DateTime<Utc>,
    pub phase: PhaseCategory,
    pub phase_angle: f64,
    pub illumination: f64,
    pub is_waxing: bool,
    pub moon_longitude: f64,
    pub moon_latitude: f64,
    pub sun_longitude: f64,
}

impl From<&PhaseInfo> for PhaseSummary {
    fn from(info: &PhaseInfo) -> Self {
        PhaseSummary {
            date: info.instant,
            phase: info.phase_category,
            phase_angle: info.phase_angle_deg,
            illumination: info.illumination_pct,
            is_waxing: info.is_waxing,
            moon_longitude: info.moon_position.longitude,
            moon_latitude: info.moon_position.latitude,
            sun_longitude: info.sun_position.longitude,
        }
    }
}

/// Service description returned by the index operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexDocument {
    pub message: &'static str,
    pub version: &'static str,
    pub backend: &'static str,
    pub endpoints: BTreeMap<&'static str, &'static str>,
}

/// Parse a `timezone` parameter into a fixed UTC offset.
pub fn parse_timezone(raw: Option<&str>) -> ApiResult<FixedOffset> {
    let utc = Utc.fix();
    let tz = match raw.map(str::trim) {
        None | Some("") | Some("Z") => return Ok(utc),
        Some(tz) if tz.eq_ignore_ascii_case("utc") => return Ok(utc),
        Some(tz) => tz,
    };

    let unknown = || ApiError::bad_request(format!("Unknown timezone {tz:?}; use UTC or ±HH:MM"));
    let (sign, rest) = if let Some(rest) = tz.strip_prefix('+') {
        (1, rest)
    } else if let Some(rest) = tz.strip_prefix('-') {
        (-1, rest)
    } else {
        return Err(unknown());
    };
    let (hours, minutes) = rest.split_once(':').ok_or_else(unknown)?;
    let two_digits = |s: &str| s.len() == 2 && s.bytes().all(|b| b.is_ascii_digit());
    if !two_digits(hours) || !two_digits(minutes) {
        return Err(unknown());
    }
    let hours: i32 = hours.parse().map_err(|_| unknown())?;
    let minutes: i32 = minutes.parse().map_err(|_| unknown())?;
    if hours > 23 || minutes > 59 {
        return Err(unknown());
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(unknown)
}

/// Parse a date parameter; `None` means now.
///
/// Accepts RFC 3339, `YYYY-MM-DDTHH:MM:SS` or `YYYY-MM-DD`. The last two
/// carry no offset and are read in `zone`.
pub fn parse_date(raw: Option<&str>, zone: FixedOffset) -> ApiResult<DateTime<Utc>> {
    let Some(raw) = raw.map(str::trim) else {
        return Ok(Utc::now());
    };
    if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
        return Ok(instant.with_timezone(&Utc));
    }
    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S").ok().or_else(|| {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
    });
    naive
        .and_then(|local| zone.from_local_datetime(&local).single())
        .map(|instant| instant.with_timezone(&Utc))
        .ok_or_else(|| ApiError::bad_request(format!("Invalid date format: {raw:?}")))
}

/// Parse a `"lat,lon"` location parameter into an observer at sea level.
pub fn parse_location(raw: &str) -> ApiResult<Observer> {
    let invalid = || ApiError::bad_request(format!("Invalid location {raw:?}; expected \"lat,lon\""));
    let (lat, lon) = raw.split_once(',').ok_or_else(invalid)?;
    let lat: f64 = lat.trim().parse().map_err(|_| invalid())?;
    let lon: f64 = lon.trim().parse().map_err(|_| invalid())?;
    validated_observer(lat, lon)
}

fn validated_observer(latitude: f64, longitude: f64) -> ApiResult<Observer> {
    Observer::new(latitude, longitude, 0.0).map_err(|_| {
        ApiError::bad_request("Latitude must be between -90 and 90, longitude between -180 and 180")
    })
}

fn noon_of(date: NaiveDate) -> ApiResult<DateTime<Utc>> {
    date.and_hms_opt(12, 0, 0)
        .map(|noon| noon.and_utc())
        .ok_or_else(|| ApiError::bad_request(format!("Invalid date {date}")))
}

/// The moon API: one shared ephemeris, one cache, one configuration.
#[derive(Debug)]
pub struct MoonApi {
    ephemeris: Arc<Ephemeris>,
    cache: MemoryCache,
    config: Config,
}

impl MoonApi {
    /// Build the API with the backend named in `config`.
    pub fn new(config: Config) -> Self {
        let ephemeris = Arc::new(Ephemeris::from_backend(config.ephemeris.backend));
        Self::with_ephemeris(config, ephemeris)
    }

    /// Out-of-range configuration sections are replaced with defaults, so
    /// request errors only ever describe the request.
    pub fn with_ephemeris(config: Config, ephemeris: Arc<Ephemeris>) -> Self {
        let sweep = Duration::from_secs(config.cache.sweep_interval_secs);
        MoonApi {
            ephemeris,
            cache: MemoryCache::with_sweep_interval(sweep),
            config: config.sanitized(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn cache(&self) -> &MemoryCache {
        &self.cache
    }

    pub fn ephemeris(&self) -> &Arc<Ephemeris> {
        &self.ephemeris
    }

    /// Release the ephemeris; later calculations fail with a 500.
    pub fn shutdown(&self) {
        self.cache.clear();
        self.ephemeris.shutdown();
    }

    pub fn index(&self) -> IndexDocument {
        let endpoints = BTreeMap::from([
            ("today", "/api/moon/today"),
            ("dayInfo", "/api/moon/day-info?latitude=52.52&longitude=13.405"),
            ("month", "/api/moon/month?year=2025&month=9"),
            ("calendar", "/api/moon/calendar?startDate=2025-10-01&endDate=2025-10-31"),
        ]);
        IndexDocument {
            message: "Moon Calendar API",
            version: env!("CARGO_PKG_VERSION"),
            backend: self.ephemeris.backend_name(),
            endpoints,
        }
    }

    /// Phase report for a date (default now), read in `timezone`.
    pub fn today(&self, query: &TodayQuery) -> ApiResult<PhaseInfo> {
        let zone = parse_timezone(query.timezone.as_deref())?;
        let instant = parse_date(query.date.as_deref(), zone)?;
        phase_info(self.ephemeris.as_ref(), instant).map_err(|e| ApiError::from_core("moon phase", e))
    }

    /// Day record for the requested UTC date, anchored at 12:00 UTC.
    ///
    /// Cached per date and location for `cache.day_info_ttl_secs`.
    pub fn day_info(&self, query: &DayInfoQuery) -> ApiResult<DayRecord> {
        let (Some(latitude), Some(longitude)) = (query.latitude, query.longitude) else {
            return Err(ApiError::bad_request("Latitude and longitude are required"));
        };
        let observer = validated_observer(latitude, longitude)?;
        let instant = parse_date(query.date.as_deref(), Utc.fix())?;
        let date = instant.date_naive();
        let noon = noon_of(date)?;
        let settings = self.config.day_settings();

        let compute = || calendar::day_info(self.ephemeris.as_ref(), noon, &observer, &settings);
        let record = if self.config.cache.enabled {
            let key = moon_cache_key(date, Some((latitude, longitude)));
            let ttl = Duration::from_secs(self.config.cache.day_info_ttl_secs);
            self.cache.get_or_insert_with(&key, ttl, compute)
        } else {
            compute()
        };
        record.map_err(|e| ApiError::from_core("day info", e))
    }

    /// Every day of a month, computed in parallel on the blocking pool and
    /// reassembled in date order.
    pub async fn month(&self, query: &MonthQuery) -> ApiResult<MonthRecord> {
        let month0 = u32::try_from(query.month)
            .ok()
            .filter(|m| *m <= 11)
            .ok_or_else(|| ApiError::bad_request("Invalid year or month parameters"))?;
        let observer = match query.location.as_deref() {
            Some(raw) => parse_location(raw)?,
            None => self
                .config
                .observer()
                .map_err(|e| ApiError::from_core("month data", e))?,
        };
        let settings = self.config.day_settings();
        let noons = calendar::month_noons(query.year, month0)
            .map_err(|e| ApiError::from_core("month data", e))?;
        debug!(year = query.year, month = month0, days = noons.len(), "computing month");

        let handles: Vec<_> = noons
            .into_iter()
            .map(|noon| {
                let ephemeris = Arc::clone(&self.ephemeris);
                tokio::task::spawn_blocking(move || {
                    calendar::day_info(ephemeris.as_ref(), noon, &observer, &settings)
                })
            })
            .collect();

        let mut days = Vec::with_capacity(handles.len());
        for handle in handles {
            let day = handle
                .await
                .map_err(|e| MoonError::Join(e.to_string()))
                .and_then(|day| day)
                .map_err(|e| ApiError::from_core("month data", e))?;
            days.push(day);
        }
        Ok(MonthRecord::from_days(query.year, month0, days))
    }

    /// One phase summary per day between two dates, inclusive.
    pub fn calendar(&self, query: &CalendarQuery) -> ApiResult<Vec<PhaseSummary>> {
        let utc = Utc.fix();
        let start = parse_date(Some(&query.start_date), utc)?;
        let end = parse_date(Some(&query.end_date), utc)?;

        let max_days = self.config.api.max_calendar_days;
        let span_days = (end - start).num_seconds() as f64 / 86_400.0;
        if span_days > max_days as f64 {
            return Err(ApiError::bad_request(format!(
                "Date range cannot exceed {max_days} days"
            )));
        }

        let range = calendar::phase_range(self.ephemeris.as_ref(), start, end)
            .map_err(|e| ApiError::from_core("moon calendar", e))?;
        Ok(range.iter().map(PhaseSummary::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    fn api() -> MoonApi {
        MoonApi::new(Config::default())
    }

    fn day_query(date: &str, lat: f64, lon: f64) -> DayInfoQuery {
        DayInfoQuery {
            date: Some(date.to_string()),
            latitude: Some(lat),
            longitude: Some(lon),
        }
    }

    #[test]
    fn test_parse_timezone() {
        assert_eq!(parse_timezone(None).unwrap().local_minus_utc(), 0);
        assert_eq!(parse_timezone(Some("UTC")).unwrap().local_minus_utc(), 0);
        assert_eq!(parse_timezone(Some("Z")).unwrap().local_minus_utc(), 0);
        assert_eq!(parse_timezone(Some("+05:30")).unwrap().local_minus_utc(), 19_800);
        assert_eq!(parse_timezone(Some("-08:00")).unwrap().local_minus_utc(), -28_800);
        for bad in ["Europe/Berlin", "+5", "+24:00", "+05:60", "05:00", "+ab:cd"] {
            let err = parse_timezone(Some(bad)).unwrap_err();
            assert_eq!(err.status(), 400, "{bad}");
        }
    }

    #[test]
    fn test_parse_date_forms() {
        let utc = Utc.fix();
        let expected = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(parse_date(Some("2025-01-01T00:00:00Z"), utc).unwrap(), expected);
        assert_eq!(parse_date(Some("2025-01-01T01:00:00+01:00"), utc).unwrap(), expected);
        assert_eq!(parse_date(Some("2025-01-01T00:00:00"), utc).unwrap(), expected);
        assert_eq!(parse_date(Some("2025-01-01"), utc).unwrap(), expected);

        // Naive dates are read in the requested zone
        let plus_two = parse_timezone(Some("+02:00")).unwrap();
        assert_eq!(parse_date(Some("2025-01-01T02:00:00"), plus_two).unwrap(), expected);

        assert!(parse_date(Some("yesterday"), utc).is_err());
        assert!(parse_date(Some("2025-13-01"), utc).is_err());
        assert!(parse_date(None, utc).is_ok());
    }

    #[test]
    fn test_parse_location() {
        let observer = parse_location("52.52, 13.405").unwrap();
        assert_eq!(observer.latitude, 52.52);
        assert_eq!(observer.longitude, 13.405);
        assert!(parse_location("Berlin").is_err());
        assert!(parse_location("91,0").is_err());
        assert!(parse_location("0,181").is_err());
    }

    #[test]
    fn test_today_new_year() {
        let info = api()
            .today(&TodayQuery {
                date: Some("2025-01-01T00:00:00Z".to_string()),
                timezone: None,
            })
            .unwrap();
        assert_eq!(info.phase_category, PhaseCategory::NewMoon);
        assert!(info.is_waxing);
    }

    #[test]
    fn test_today_rejects_unknown_timezone() {
        let err = api()
            .today(&TodayQuery {
                date: None,
                timezone: Some("Mars/Olympus_Mons".to_string()),
            })
            .unwrap_err();
        assert_eq!(err.status(), 400);
    }

    #[test]
    fn test_day_info_validation() {
        let api = api();
        let missing = DayInfoQuery {
            date: None,
            latitude: Some(52.52),
            longitude: None,
        };
        let err = api.day_info(&missing).unwrap_err();
        assert_eq!(err, ApiError::BadRequest("Latitude and longitude are required".into()));

        assert_eq!(api.day_info(&day_query("2025-01-01", 95.0, 0.0)).unwrap_err().status(), 400);
        assert_eq!(api.day_info(&day_query("2025-01-01", 0.0, -181.0)).unwrap_err().status(), 400);
        assert_eq!(api.day_info(&day_query("01/01/2025", 0.0, 0.0)).unwrap_err().status(), 400);
        assert!(api.cache().is_empty());
    }

    #[test]
    fn test_day_info_is_cached_per_date_and_location() {
        let api = api();
        let first = api.day_info(&day_query("2025-01-01", 52.52, 13.405)).unwrap();
        assert_eq!(api.cache().len(), 1);

        // Same UTC date, different time of day: same anchored record
        let again = api.day_info(&day_query("2025-01-01T18:30:00Z", 52.52, 13.405)).unwrap();
        assert_eq!(first, again);
        assert_eq!(api.cache().len(), 1);
        assert_eq!(first.date, Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap());

        api.day_info(&day_query("2025-01-01", -33.87, 151.21)).unwrap();
        assert_eq!(api.cache().len(), 2);
    }

    #[test]
    fn test_day_info_same_with_cache_disabled() {
        let mut config = Config::default();
        config.cache.enabled = false;
        let uncached = MoonApi::new(config);
        let cached = api();

        let query = day_query("2025-03-14", 40.71, -74.01);
        assert_eq!(uncached.day_info(&query).unwrap(), cached.day_info(&query).unwrap());
        assert!(uncached.cache().is_empty());
    }

    #[test]
    fn test_day_info_with_unbounded_ttl() {
        let mut config = Config::default();
        config.cache.day_info_ttl_secs = u64::MAX;
        let api = MoonApi::new(config);
        let query = day_query("2025-01-01", 52.52, 13.405);
        let first = api.day_info(&query).unwrap();
        assert_eq!(api.day_info(&query).unwrap(), first);
        assert_eq!(api.cache().len(), 1);
    }

    #[test]
    fn test_expired_day_records_do_not_accumulate() {
        let mut config = Config::default();
        config.cache.day_info_ttl_secs = 0;
        config.cache.sweep_interval_secs = 0;
        let api = MoonApi::new(config);
        for day in 1..=20 {
            api.day_info(&day_query(&format!("2025-01-{day:02}"), 52.52, 13.405))
                .unwrap();
        }
        assert!(api.cache().len() <= 1);
    }

    #[test]
    fn test_unservable_config_never_rejects_requests() {
        let mut config = Config::default();
        config.ephemeris.search_window_days = 0.0;
        config.ephemeris.step_minutes = 1e-6;
        config.ephemeris.precision_seconds = f64::NAN;
        let configured = MoonApi::new(config);
        assert_eq!(configured.config().day_settings(), calendar::DaySettings::default());

        let query = day_query("2025-01-01", 52.52, 13.405);
        assert_eq!(configured.day_info(&query).unwrap(), api().day_info(&query).unwrap());
    }

    #[tokio::test]
    async fn test_month_matches_sequential_aggregation() {
        let api = api();
        let query = MonthQuery {
            year: 2024,
            month: 1,
            location: None,
        };
        let month = api.month(&query).await.unwrap();
        assert_eq!(month.month, 1);
        assert_eq!(month.days.len(), 29);
        assert!(month.days.windows(2).all(|w| w[0].date < w[1].date));
        assert_eq!(month.days[28].date.day(), 29);

        let observer = api.config().observer().unwrap();
        let sequential = calendar::month_info(
            api.ephemeris().as_ref(),
            2024,
            1,
            &observer,
            &api.config().day_settings(),
        )
        .unwrap();
        assert_eq!(month, sequential);
    }

    #[tokio::test]
    async fn test_month_validation() {
        let api = api();
        for bad_month in [-1, 12] {
            let query = MonthQuery {
                year: 2025,
                month: bad_month,
                location: None,
            };
            assert_eq!(api.month(&query).await.unwrap_err().status(), 400);
        }
        let query = MonthQuery {
            year: 2025,
            month: 0,
            location: Some("north pole".to_string()),
        };
        assert_eq!(api.month(&query).await.unwrap_err().status(), 400);
    }

    #[tokio::test]
    async fn test_month_outside_ephemeris_range_is_internal() {
        let query = MonthQuery {
            year: 600,
            month: 0,
            location: Some("0,0".to_string()),
        };
        let err = api().month(&query).await.unwrap_err();
        assert_eq!(err.status(), 500);
        assert!(matches!(
            err,
            ApiError::Internal {
                source: MoonError::ProviderUnavailable { .. },
                ..
            }
        ));
    }

    #[test]
    fn test_calendar_range() {
        let api = api();
        let query = CalendarQuery {
            start_date: "2025-10-01".to_string(),
            end_date: "2025-10-31".to_string(),
        };
        let summaries = api.calendar(&query).unwrap();
        assert_eq!(summaries.len(), 31);
        assert!(summaries.windows(2).all(|w| w[0].date < w[1].date));

        let too_long = CalendarQuery {
            start_date: "2025-01-01".to_string(),
            end_date: "2025-03-03".to_string(),
        };
        let err = api.calendar(&too_long).unwrap_err();
        assert_eq!(err.to_string(), "Date range cannot exceed 60 days");

        let reversed = CalendarQuery {
            start_date: "2025-10-31".to_string(),
            end_date: "2025-10-01".to_string(),
        };
        assert!(api.calendar(&reversed).unwrap().is_empty());
    }

    #[test]
    fn test_envelopes() {
        let api = api();
        let query = CalendarQuery {
            start_date: "2025-01-13T22:27:00Z".to_string(),
            end_date: "2025-01-14T22:27:00Z".to_string(),
        };
        let (status, envelope) = ApiResponse::from_result(api.calendar(&query));
        let count = envelope.data.as_ref().map_or(0, Vec::len);
        let json = serde_json::to_value(envelope.with_count(count)).unwrap();
        assert_eq!(status, 200);
        assert_eq!(json["success"], true);
        assert_eq!(json["count"], 2);
        assert_eq!(json["data"][0]["phase"], "full_moon");
        assert!(json["data"][0]["moonLongitude"].is_number());
        assert!(json.get("error").is_none());

        let (status, envelope) =
            ApiResponse::<PhaseInfo>::from_result(Err(ApiError::bad_request("nope")));
        let json = serde_json::to_value(envelope).unwrap();
        assert_eq!(status, 400);
        assert_eq!(json, serde_json::json!({"success": false, "error": "nope"}));
    }

    #[test]
    fn test_shutdown_turns_requests_into_server_errors() {
        let api = api();
        api.shutdown();
        let err = api
            .today(&TodayQuery {
                date: Some("2025-01-01".to_string()),
                timezone: None,
            })
            .unwrap_err();
        assert_eq!(err.status(), 500);
        assert!(err.to_string().starts_with("Failed to calculate moon phase"));
    }

    #[test]
    fn test_index_lists_endpoints() {
        let doc = api().index();
        assert_eq!(doc.message, "Moon Calendar API");
        assert_eq!(doc.backend, "meeus");
        assert_eq!(doc.endpoints.len(), 4);
        assert!(doc.endpoints.contains_key("dayInfo"));
    }
}
