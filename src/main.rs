//! CLI entry point for the station traffic tool.
//!
//! Loads a station list and a trip log, then drives the traffic controller
//! with one or more time filter changes and prints or exports the results.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use station_traffic::{
    controller::{FilterChanged, TrafficController, TrafficUpdate},
    filter::{MAX_MINUTE, TimeFilter},
    loader::{load_stations, load_trips},
    output::{CsvSink, print_json, print_pretty},
};
use std::ffi::OsStr;
use std::path::Path;
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "station_traffic")]
#[command(about = "Bike-share station traffic by time of day", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute station traffic for a single time filter
    Show {
        /// Station JSON file (falls back to STATIONS_PATH)
        #[arg(short, long)]
        stations: Option<String>,

        /// Trip CSV file (falls back to TRIPS_PATH)
        #[arg(short, long)]
        trips: Option<String>,

        /// Minutes since midnight, or -1 for any time
        #[arg(long, default_value_t = -1, allow_negative_numbers = true)]
        time: i32,

        /// Print the update as JSON instead of the debug format
        #[arg(long, default_value_t = false)]
        json: bool,

        /// Number of busiest stations to log
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
    /// Sweep the time filter across the day and export every update as CSV
    Sweep {
        /// Station JSON file (falls back to STATIONS_PATH)
        #[arg(short, long)]
        stations: Option<String>,

        /// Trip CSV file (falls back to TRIPS_PATH)
        #[arg(short, long)]
        trips: Option<String>,

        /// Minutes between filter values
        #[arg(long, default_value_t = 60)]
        step: u16,

        /// CSV file to append results to
        #[arg(short, long, default_value = "station_traffic.csv")]
        output: String,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/station_traffic.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("station_traffic.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Show {
            stations,
            trips,
            time,
            json,
            top,
        } => {
            let filter = TimeFilter::from_slider(time)?;
            let mut controller = build_controller(stations, trips)?;

            let update = controller.on_filter_changed(FilterChanged(filter), &mut |u: &TrafficUpdate| {
                info!(
                    time = u.time_label.as_deref().unwrap_or("any time"),
                    trip_count = u.trip_count,
                    max_traffic = u.max_traffic(),
                    "Filter applied"
                );
            });

            if json {
                print_json(update)?;
            } else {
                print_pretty(update);
            }

            for view in update.busiest(top) {
                info!(
                    station = %view.id,
                    radius = view.radius,
                    flow = view.flow_bucket.value(),
                    "{}",
                    view.tooltip_text
                );
            }
        }
        Commands::Sweep {
            stations,
            trips,
            step,
            output,
        } => {
            sweep(stations, trips, step, &output)?;
        }
    }

    Ok(())
}

/// Resolves a data path from the CLI option or its environment fallback.
fn resolve_path(arg: Option<String>, env_key: &str) -> Result<String> {
    match arg {
        Some(path) => Ok(path),
        None => std::env::var(env_key)
            .with_context(|| format!("no path given and {} is not set", env_key)),
    }
}

fn build_controller(stations: Option<String>, trips: Option<String>) -> Result<TrafficController> {
    let stations = load_stations(&resolve_path(stations, "STATIONS_PATH")?)?;
    let trips = load_trips(&resolve_path(trips, "TRIPS_PATH")?)?;

    if stations.is_empty() {
        warn!("Station list is empty");
    }
    info!(
        stations = stations.len(),
        trips = trips.len(),
        untimed = trips.untimed_count(),
        "Data loaded"
    );

    Ok(TrafficController::new(stations, trips))
}

/// Replays slider input from "any time" through the whole day at `step`
/// minute intervals, appending each emitted update to `output`.
#[tracing::instrument(skip(stations, trips))]
fn sweep(stations: Option<String>, trips: Option<String>, step: u16, output: &str) -> Result<()> {
    if step == 0 {
        anyhow::bail!("step must be at least one minute");
    }

    let mut controller = build_controller(stations, trips)?;
    let mut sink = CsvSink::open(output)?;

    controller.refresh(&mut sink);
    for minute in (0..=MAX_MINUTE).step_by(step as usize) {
        controller.on_filter_changed(FilterChanged(TimeFilter::Cutoff(minute)), &mut sink);
    }

    let updates = sink.finish()?;
    info!(updates, output, "Sweep complete");
    Ok(())
}
