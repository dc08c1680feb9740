//! Station and trip records shared by every stage of the pipeline.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Short station code (the `short_name` of a bike-share station).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StationId(String);

impl StationId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for StationId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for StationId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for StationId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A docking location. Immutable once loaded.
///
/// Deserializes from records carrying `short_name`, `id` or both; the short
/// name wins when both are present.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(try_from = "StationRecord")]
pub struct Station {
    pub id: StationId,
    pub lon: f64,
    pub lat: f64,
}

#[derive(Deserialize)]
struct StationRecord {
    short_name: Option<String>,
    id: Option<String>,
    lon: f64,
    lat: f64,
}

impl TryFrom<StationRecord> for Station {
    type Error = String;

    fn try_from(record: StationRecord) -> Result<Self, Self::Error> {
        let id = record
            .short_name
            .or(record.id)
            .ok_or_else(|| "station has neither `short_name` nor `id`".to_string())?;
        Ok(Station::new(id, record.lon, record.lat))
    }
}

impl Station {
    pub fn new(id: impl Into<StationId>, lon: f64, lat: f64) -> Self {
        Station {
            id: id.into(),
            lon,
            lat,
        }
    }
}

/// A single rental. Timestamps are local wall-clock times; `None` means the
/// source value was missing or could not be parsed.
#[derive(Clone, Debug, PartialEq)]
pub struct Trip {
    pub start_station_id: StationId,
    pub end_station_id: StationId,
    pub started_at: Option<NaiveDateTime>,
    pub ended_at: Option<NaiveDateTime>,
}

impl Trip {
    pub fn new(
        start: impl Into<StationId>,
        end: impl Into<StationId>,
        started_at: Option<NaiveDateTime>,
        ended_at: Option<NaiveDateTime>,
    ) -> Self {
        Trip {
            start_station_id: start.into(),
            end_station_id: end.into(),
            started_at,
            ended_at,
        }
    }
}

/// The full trip set for the period, loaded once and never mutated.
#[derive(Debug, Default)]
pub struct TripStore {
    trips: Vec<Trip>,
}

impl TripStore {
    pub fn new(trips: Vec<Trip>) -> Self {
        TripStore { trips }
    }

    pub fn trips(&self) -> &[Trip] {
        &self.trips
    }

    pub fn len(&self) -> usize {
        self.trips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trips.is_empty()
    }

    /// Number of trips carrying at least one unusable timestamp.
    pub fn untimed_count(&self) -> usize {
        self.trips
            .iter()
            .filter(|t| t.started_at.is_none() || t.ended_at.is_none())
            .count()
    }
}

impl From<Vec<Trip>> for TripStore {
    fn from(trips: Vec<Trip>) -> Self {
        TripStore::new(trips)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> Option<NaiveDateTime> {
        NaiveDate::from_ymd_opt(2024, 3, 1).and_then(|d| d.and_hms_opt(h, m, 0))
    }

    #[test]
    fn test_station_deserializes_short_name() {
        let station: Station =
            serde_json::from_str(r#"{"short_name":"A32000","lon":-71.1,"lat":42.3}"#).unwrap();
        assert_eq!(station.id.as_str(), "A32000");
        assert_eq!(station.lon, -71.1);
    }

    #[test]
    fn test_station_deserializes_id_alias() {
        let station: Station = serde_json::from_str(r#"{"id":"B1","lon":0.0,"lat":1.0}"#).unwrap();
        assert_eq!(station.id, StationId::from("B1"));
    }

    #[test]
    fn test_station_prefers_short_name_over_id() {
        let station: Station = serde_json::from_str(
            r#"{"short_name":"A32000","id":"f83466e1-0de8","lon":0.0,"lat":1.0}"#,
        )
        .unwrap();
        assert_eq!(station.id.as_str(), "A32000");
    }

    #[test]
    fn test_station_without_identifier_fails() {
        let result: Result<Station, _> = serde_json::from_str(r#"{"lon":0.0,"lat":1.0}"#);
        let err = result.unwrap_err().to_string();
        assert!(err.contains("short_name"));
    }

    #[test]
    fn test_untimed_count() {
        let store = TripStore::new(vec![
            Trip::new("A", "B", at(8, 0), at(8, 20)),
            Trip::new("A", "B", None, at(8, 20)),
            Trip::new("A", "B", at(9, 0), None),
        ]);
        assert_eq!(store.len(), 3);
        assert_eq!(store.untimed_count(), 2);
    }
}
