//! Per-station arrival and departure counts.

use serde::Serialize;
use std::collections::HashMap;

use crate::model::{Station, StationId, Trip};

/// Traffic for one station over one trip set.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StationTraffic {
    pub id: StationId,
    pub lon: f64,
    pub lat: f64,
    pub arrivals: usize,
    pub departures: usize,
    pub total_traffic: usize,
}

impl StationTraffic {
    fn new(station: &Station, arrivals: usize, departures: usize) -> Self {
        StationTraffic {
            id: station.id.clone(),
            lon: station.lon,
            lat: station.lat,
            arrivals,
            departures,
            total_traffic: arrivals + departures,
        }
    }

    /// Share of traffic that departs from this station; 0 for an idle station.
    pub fn departure_ratio(&self) -> f64 {
        if self.total_traffic == 0 {
            0.0
        } else {
            self.departures as f64 / self.total_traffic as f64
        }
    }

    pub fn tooltip_text(&self) -> String {
        format!(
            "{} trips ({} departures, {} arrivals)",
            self.total_traffic, self.departures, self.arrivals
        )
    }
}

/// Counts departures and arrivals for every station in `stations`.
///
/// One record per station, in input order; stations no trip refers to get
/// zero counts, and trips referring to unknown stations are ignored.
pub fn compute_station_traffic<'a, I>(stations: &[Station], trips: I) -> Vec<StationTraffic>
where
    I: IntoIterator<Item = &'a Trip>,
{
    let mut departures: HashMap<&str, usize> = HashMap::new();
    let mut arrivals: HashMap<&str, usize> = HashMap::new();

    for trip in trips {
        *departures.entry(trip.start_station_id.as_str()).or_default() += 1;
        *arrivals.entry(trip.end_station_id.as_str()).or_default() += 1;
    }

    stations
        .iter()
        .map(|station| {
            let id = station.id.as_str();
            StationTraffic::new(
                station,
                arrivals.get(id).copied().unwrap_or(0),
                departures.get(id).copied().unwrap_or(0),
            )
        })
        .collect()
}

/// Largest total traffic in `stations`, 0 when empty.
pub fn max_traffic(stations: &[StationTraffic]) -> usize {
    stations.iter().map(|s| s.total_traffic).max().unwrap_or(0)
}
