#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line front end for hazard prediction and SMS alerts.
//!
//! ```text
//! fixmypothole predict  --reports reports.json --lat 12.97 --lng 77.59 [--time-range week]
//! fixmypothole forecast --reports reports.json --lat 12.97 --lng 77.59 [--address "MG Road"]
//! fixmypothole trends   --reports reports.json [--area "Indiranagar"]
//! fixmypothole alert    --lat 12.97 --lng 77.59 --count 5 --number 9876543210
//! fixmypothole test-sms --number 9876543210 [--message "hello"]
//! ```
//!
//! AI is enabled by `GEMINI_API_KEY` and SMS by `FAST2SMS_API_KEY`; without
//! them the commands still run and report fallback results.

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use fixmypothole_ai::predictor::PredictiveAnalytics;
use fixmypothole_alerts::dispatcher::AlertDispatcher;
use fixmypothole_analytics::geofilter::DEFAULT_RADIUS_KM;
use fixmypothole_analytics_models::TimeRange;
use fixmypothole_report_models::{Location, RawReport, parse_report_batch};
use serde::Serialize;

#[derive(Parser)]
#[command(
    name = "fixmypothole",
    about = "Pothole severity prediction, forecasting, and SMS alerts"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Target point shared by the location-based commands.
#[derive(Args)]
struct LocationArgs {
    /// Latitude in decimal degrees
    #[arg(long, allow_negative_numbers = true)]
    lat: f64,
    /// Longitude in decimal degrees
    #[arg(long, allow_negative_numbers = true)]
    lng: f64,
    /// Street address shown in forecasts and alerts
    #[arg(long)]
    address: Option<String>,
}

impl LocationArgs {
    fn to_location(&self) -> Location {
        let location = Location::new(self.lat, self.lng);
        match &self.address {
            Some(address) => location.with_address(address),
            None => location,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Predict hazard severity around a location
    Predict {
        /// JSON file containing an array of reports
        #[arg(long)]
        reports: PathBuf,
        #[command(flatten)]
        location: LocationArgs,
        /// Window for the "recent reports" statistic (day, week, month, year)
        #[arg(long, default_value = "week")]
        time_range: TimeRange,
        /// Geofilter radius in kilometres
        #[arg(long, default_value_t = DEFAULT_RADIUS_KM)]
        radius_km: f64,
    },
    /// Forecast road conditions at a location
    Forecast {
        /// JSON file containing an array of reports
        #[arg(long)]
        reports: PathBuf,
        #[command(flatten)]
        location: LocationArgs,
    },
    /// Forecast reporting trends for an area
    Trends {
        /// JSON file containing an array of reports
        #[arg(long)]
        reports: PathBuf,
        /// Area name used in the forecast
        #[arg(long, default_value = "Selected Area")]
        area: String,
    },
    /// Send a rate-limited high-priority alert
    Alert {
        #[command(flatten)]
        location: LocationArgs,
        /// Number of reports at the location
        #[arg(long)]
        count: usize,
        /// Recipient phone number (repeatable)
        #[arg(long = "number", required = true)]
        numbers: Vec<String>,
    },
    /// Send a test SMS to check the gateway configuration
    TestSms {
        /// Recipient phone number
        #[arg(long)]
        number: String,
        /// Message text
        #[arg(long)]
        message: Option<String>,
    },
}

fn load_reports(path: &Path) -> Result<Vec<RawReport>, Box<dyn std::error::Error>> {
    let json = std::fs::read_to_string(path)?;
    let reports = parse_report_batch(&json)?;
    log::info!("Loaded {} reports from {}", reports.len(), path.display());
    Ok(reports)
}

fn print_json(value: &impl Serialize) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Predict {
            reports,
            location,
            time_range,
            radius_km,
        } => {
            let reports = load_reports(&reports)?;
            let analytics = PredictiveAnalytics::from_env().with_radius_km(radius_km);
            let result = analytics
                .predict(&location.to_location(), &reports, time_range)
                .await;
            print_json(&result)?;
        }
        Commands::Forecast { reports, location } => {
            let reports = load_reports(&reports)?;
            let forecast = PredictiveAnalytics::from_env()
                .forecast_conditions(&location.to_location(), &reports)
                .await;
            print_json(&forecast)?;
        }
        Commands::Trends { reports, area } => {
            let reports = load_reports(&reports)?;
            let forecast = PredictiveAnalytics::from_env()
                .trend_forecast(&reports, &area)
                .await;
            print_json(&forecast)?;
        }
        Commands::Alert {
            location,
            count,
            numbers,
        } => {
            let outcome = AlertDispatcher::from_env()
                .try_send(&numbers, &location.to_location(), count)
                .await;
            print_json(&outcome)?;
            if !outcome.sent {
                std::process::exit(1);
            }
        }
        Commands::TestSms { number, message } => {
            let outcome = AlertDispatcher::from_env()
                .send_test(&number, message.as_deref())
                .await;
            print_json(&outcome)?;
            if !outcome.sent {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
