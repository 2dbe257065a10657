//! # Moon Calendar Application Entry Point
//!
//! This binary crate exposes the moon API on the command line: each subcommand
//! runs one API operation and prints its JSON response envelope to stdout.
//! Logs go to stderr so the JSON stays machine-readable.
//!
//! ```text
//! moon-calendar today --date 2025-01-01
//! moon-calendar day-info --latitude 52.52 --longitude 13.405
//! moon-calendar month --year 2025 --month 0 --ascii
//! moon-calendar calendar --start-date 2025-10-01 --end-date 2025-10-31
//! ```


use clap::{Parser, Subcommand};
use moon_calendar_lib::api::{
    ApiResponse, CalendarQuery, DayInfoQuery, MonthQuery, MoonApi, TodayQuery,
};
use moon_calendar_lib::config::{Config, CONFIG_FILE};
use moon_calendar_lib::renderer::render_month;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "moon-calendar")]
#[command(version)]
#[command(about = "Lunar phase, illumination, rise/set times and zodiac position")]
pub struct Cli {
    /// Configuration file (defaults to moon-config.toml in the working directory)
    #[arg(short = 'c', long = "config", value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Pretty-print JSON output
    #[arg(long = "pretty", global = true)]
    pub pretty: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Service name, version and endpoint map
    Index,
    /// Phase report for a date (default now)
    Today {
        #[arg(long)]
        date: Option<String>,
        /// UTC, Z or a fixed offset such as +02:00
        #[arg(long)]
        timezone: Option<String>,
    },
    /// Phase, rise/set times and zodiac sign for one date and location
    DayInfo {
        #[arg(long)]
        date: Option<String>,
        #[arg(long, allow_hyphen_values = true)]
        latitude: Option<f64>,
        #[arg(long, allow_hyphen_values = true)]
        longitude: Option<f64>,
    },
    /// Every day of a month
    Month {
        #[arg(long, allow_hyphen_values = true)]
        year: i32,
        /// Zero-based month (0 = January)
        #[arg(long, allow_hyphen_values = true)]
        month: i32,
        /// "lat,lon"; the configured location when absent
        #[arg(long, allow_hyphen_values = true)]
        location: Option<String>,
        /// Print an ASCII calendar instead of JSON
        #[arg(long)]
        ascii: bool,
    },
    /// One phase summary per day over a date range (at most 60 days)
    Calendar {
        #[arg(long = "start-date")]
        start_date: String,
        #[arg(long = "end-date")]
        end_date: String,
    },
}

/// Result of one command: the text to print and whether it succeeded.
#[derive(Debug, Clone, PartialEq)]
pub struct Output {
    pub text: String,
    pub status: u16,
}

fn to_json<T: Serialize>(value: &T, pretty: bool) -> anyhow::Result<String> {
    Ok(if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    })
}

fn envelope<T: Serialize>(
    result: moon_calendar_lib::api::ApiResult<T>,
    pretty: bool,
) -> anyhow::Result<Output> {
    let (status, response) = ApiResponse::from_result(result);
    Ok(Output {
        text: to_json(&response, pretty)?,
        status,
    })
}

/// Run one command against the API.
pub fn execute(
    api: &MoonApi,
    rt: &tokio::runtime::Runtime,
    command: Command,
    pretty: bool,
) -> anyhow::Result<Output> {
    match command {
        Command::Index => envelope(Ok(api.index()), pretty),
        Command::Today { date, timezone } => {
            envelope(api.today(&TodayQuery { date, timezone }), pretty)
        }
        Command::DayInfo {
            date,
            latitude,
            longitude,
        } => envelope(
            api.day_info(&DayInfoQuery {
                date,
                latitude,
                longitude,
            }),
            pretty,
        ),
        Command::Month {
            year,
            month,
            location,
            ascii,
        } => {
            let query = MonthQuery {
                year,
                month,
                location,
            };
            let result = rt.block_on(api.month(&query));
            match result {
                Ok(record) if ascii => Ok(Output {
                    text: render_month(&record),
                    status: 200,
                }),
                other => envelope(other, pretty),
            }
        }
        Command::Calendar {
            start_date,
            end_date,
        } => {
            let (status, response) = ApiResponse::from_result(api.calendar(&CalendarQuery {
                start_date,
                end_date,
            }));
            let count = response.data.as_ref().map(Vec::len);
            let response = match count {
                Some(count) => response.with_count(count),
                None => response,
            };
            Ok(Output {
                text: to_json(&response, pretty)?,
                status,
            })
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load_from_path(cli.config.as_deref().unwrap_or(Path::new(CONFIG_FILE)));
    info!(backend = ?config.ephemeris.backend, "starting moon calendar");

    // Create Tokio runtime for the parallel month computation
    let rt = tokio::runtime::Runtime::new()?;
    let api = MoonApi::new(config);

    let output = execute(&api, &rt, cli.command, cli.pretty)?;
    api.shutdown();

    println!("{}", output.text.trim_end());
    if output.status != 200 {
        std::process::exit(if output.status >= 500 { 2 } else { 1 });
    }
    Ok(())
}
