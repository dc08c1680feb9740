//! Output formatting and persistence for station traffic updates.
//!
//! Supports pretty-printing, JSON serialization, and CSV append.

use anyhow::Result;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::controller::{RenderSink, StationView, TrafficUpdate};
use crate::scale::FlowBucket;
use csv::{Writer, WriterBuilder};
use std::fs::{File, OpenOptions};
use std::path::Path;

/// One CSV row: a station view tagged with the filter it was computed under.
#[derive(Serialize)]
struct ViewRecord<'a> {
    time_filter: i32,
    time_label: &'a str,
    id: &'a str,
    lon: f64,
    lat: f64,
    arrivals: usize,
    departures: usize,
    total_traffic: usize,
    radius: f64,
    flow_bucket: FlowBucket,
}

impl<'a> ViewRecord<'a> {
    fn new(update: &'a TrafficUpdate, view: &'a StationView) -> Self {
        ViewRecord {
            time_filter: update.filter.to_slider(),
            time_label: update.time_label.as_deref().unwrap_or("any"),
            id: view.id.as_str(),
            lon: view.lon,
            lat: view.lat,
            arrivals: view.arrivals,
            departures: view.departures,
            total_traffic: view.total_traffic,
            radius: view.radius,
            flow_bucket: view.flow_bucket,
        }
    }
}

/// Logs an update using Rust's debug pretty-print format.
pub fn print_pretty(update: &TrafficUpdate) {
    debug!("{:#?}", update);
}

/// Logs an update as pretty-printed JSON.
pub fn print_json(update: &TrafficUpdate) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(update)?);
    Ok(())
}

/// Appends one row per station of `update` to a CSV file.
///
/// Creates the file with headers if it does not already exist.
pub fn append_update(path: &str, update: &TrafficUpdate) -> Result<()> {
    let mut sink = CsvSink::open(path)?;
    sink.write(update)?;
    sink.finish()?;
    Ok(())
}

/// Streams every emitted update into one CSV file as it arrives.
///
/// The file stays open for the life of the sink. A write failure is kept and
/// later updates are dropped; [`CsvSink::finish`] reports it.
pub struct CsvSink {
    writer: Writer<File>,
    updates: usize,
    error: Option<anyhow::Error>,
}

impl CsvSink {
    /// Opens `path` for appending, writing headers only to a new file.
    pub fn open(path: &str) -> Result<Self> {
        let file_exists = Path::new(path).exists();
        debug!(path, file_exists, "Opening CSV output");

        let file = OpenOptions::new().append(true).create(true).open(path)?;

        let writer = WriterBuilder::new()
            .has_headers(!file_exists) // IMPORTANT when appending
            .from_writer(file);

        Ok(CsvSink {
            writer,
            updates: 0,
            error: None,
        })
    }

    pub fn write(&mut self, update: &TrafficUpdate) -> Result<()> {
        for view in &update.stations {
            self.writer.serialize(ViewRecord::new(update, view))?;
        }
        self.updates += 1;
        debug!(rows = update.stations.len(), "CSV rows written");
        Ok(())
    }

    /// Flushes the file and returns the number of updates written.
    pub fn finish(mut self) -> Result<usize> {
        if let Some(e) = self.error.take() {
            return Err(e);
        }
        self.writer.flush()?;
        Ok(self.updates)
    }
}

impl RenderSink for CsvSink {
    fn render(&mut self, update: &TrafficUpdate) {
        if self.error.is_some() {
            return;
        }
        if let Err(e) = self.write(update) {
            warn!(error = %e, "Failed to write CSV rows");
            self.error = Some(e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::TrafficController;
    use crate::filter::TimeFilter;
    use crate::model::{Station, Trip, TripStore};
    use std::env;
    use std::fs;

    fn temp_path(name: &str) -> String {
        format!("{}/{}", env::temp_dir().display(), name)
    }

    fn create_update(filter: TimeFilter) -> TrafficUpdate {
        let stations = vec![Station::new("A", -71.0, 42.0), Station::new("B", -71.1, 42.1)];
        let trips = TripStore::new(vec![Trip::new("A", "B", None, None)]);
        let mut controller = TrafficController::new(stations, trips);
        controller
            .on_filter_changed(filter.into(), &mut |_: &TrafficUpdate| {})
            .clone()
    }

    #[test]
    fn test_print_pretty_does_not_panic() {
        print_pretty(&create_update(TimeFilter::Any));
    }

    #[test]
    fn test_print_json_does_not_panic() {
        print_json(&create_update(TimeFilter::Any)).unwrap();
    }

    #[test]
    fn test_append_update_writes_header_once() {
        let path = temp_path("station_traffic_test_header.csv");
        let _ = fs::remove_file(&path);

        let update = create_update(TimeFilter::Any);
        append_update(&path, &update).unwrap();
        append_update(&path, &update).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let header_count = content.lines().filter(|l| l.starts_with("time_filter")).count();
        assert_eq!(header_count, 1);
        // 1 header + 2 stations per update
        assert_eq!(content.lines().count(), 5);

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_csv_sink_streams_controller_updates() {
        let path = temp_path("station_traffic_test_sink.csv");
        let _ = fs::remove_file(&path);

        let stations = vec![Station::new("A", -71.0, 42.0), Station::new("B", -71.1, 42.1)];
        let trips = TripStore::new(vec![Trip::new("A", "B", None, None)]);
        let mut controller = TrafficController::new(stations, trips);

        let mut sink = CsvSink::open(&path).unwrap();
        controller.refresh(&mut sink);
        for minute in [0, 600, 1200] {
            controller.on_filter_changed(TimeFilter::Cutoff(minute).into(), &mut sink);
        }
        assert_eq!(sink.finish().unwrap(), 4);

        let content = fs::read_to_string(&path).unwrap();
        // 1 header + 4 updates of 2 stations
        assert_eq!(content.lines().count(), 9);
        assert!(content.lines().nth(1).unwrap().starts_with("-1,any,A,"));

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_append_update_row_contents() {
        let path = temp_path("station_traffic_test_rows.csv");
        let _ = fs::remove_file(&path);

        append_update(&path, &create_update(TimeFilter::Cutoff(600))).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(
            lines[0],
            "time_filter,time_label,id,lon,lat,arrivals,departures,total_traffic,radius,flow_bucket"
        );
        assert!(lines[1].starts_with("600,10:00 AM,A,"));
        assert!(lines[1].ends_with(",0,0,0,3.0,0.0"));

        fs::remove_file(&path).unwrap();
    }
}
