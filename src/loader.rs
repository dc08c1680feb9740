//! Reads station and trip data from local files.
//!
//! Stations come from JSON (a GBFS-style `{"data": {"stations": [...]}}`
//! document or a bare array), trips from a CSV file with headers. Unknown
//! fields and columns are ignored. Trip timestamps that fail to parse are
//! kept as `None` so the trip still counts when no time filter is active.

use anyhow::{Context, Result, bail};
use chrono::{DateTime, NaiveDateTime};
use serde::Deserialize;
use serde_json::Value;
use std::fs::File;
use std::io::Read;
use tracing::{debug, info, warn};

use crate::model::{Station, Trip, TripStore};

const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// One CSV row; only the columns the pipeline uses.
#[derive(Deserialize)]
struct TripRecord {
    start_station_id: String,
    end_station_id: String,
    #[serde(default)]
    started_at: String,
    #[serde(default)]
    ended_at: String,
}

/// Parses a timestamp into local wall-clock time. RFC 3339 values keep the
/// wall-clock of their own offset.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local());
    }
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}

pub fn read_stations<R: Read>(reader: R) -> Result<Vec<Station>> {
    let doc: Value = serde_json::from_reader(reader).context("invalid station document")?;

    let records = match doc {
        Value::Array(records) => records,
        Value::Object(mut root) => match root.remove("data") {
            Some(Value::Object(mut data)) => match data.remove("stations") {
                Some(Value::Array(records)) => records,
                _ => bail!("station document has no `data.stations` array"),
            },
            _ => bail!("station document has no `data` object"),
        },
        _ => bail!("station document must be an array or an object with `data.stations`"),
    };

    let stations = records
        .into_iter()
        .enumerate()
        .map(|(i, record)| {
            serde_json::from_value::<Station>(record).with_context(|| format!("invalid station {}", i))
        })
        .collect::<Result<Vec<_>>>()?;

    debug!(count = stations.len(), "Stations parsed");
    Ok(stations)
}

pub fn read_trips<R: Read>(reader: R) -> Result<TripStore> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut trips = Vec::new();
    let mut untimed = 0usize;

    for (row, result) in rdr.deserialize().enumerate() {
        let record: TripRecord = result.with_context(|| format!("invalid trip row {}", row + 1))?;
        let started_at = parse_timestamp(&record.started_at);
        let ended_at = parse_timestamp(&record.ended_at);
        if started_at.is_none() || ended_at.is_none() {
            debug!(
                row = row + 1,
                started_at = %record.started_at,
                ended_at = %record.ended_at,
                "Unparseable trip timestamp"
            );
            untimed += 1;
        }
        trips.push(Trip::new(
            record.start_station_id,
            record.end_station_id,
            started_at,
            ended_at,
        ));
    }

    if untimed > 0 {
        warn!(untimed, "Trips without usable timestamps will never match a time filter");
    }
    Ok(TripStore::new(trips))
}

#[tracing::instrument]
pub fn load_stations(path: &str) -> Result<Vec<Station>> {
    let file = File::open(path).with_context(|| format!("failed to open stations file {}", path))?;
    let stations = read_stations(file).with_context(|| format!("failed to load {}", path))?;
    info!(count = stations.len(), "Stations loaded");
    Ok(stations)
}

#[tracing::instrument]
pub fn load_trips(path: &str) -> Result<TripStore> {
    let file = File::open(path).with_context(|| format!("failed to open trips file {}", path))?;
    let trips = read_trips(file).with_context(|| format!("failed to load {}", path))?;
    info!(count = trips.len(), "Trips loaded");
    Ok(trips)
}
