//! Reactive update controller.
//!
//! [`TrafficController`] owns the station list, the trip store and the scale
//! state. Each [`FilterChanged`] message runs one synchronous pass (filter,
//! aggregate, rescale) and hands the resulting [`TrafficUpdate`] to a
//! [`RenderSink`]. A new message simply supersedes the previous output.

use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info};

use crate::filter::{TimeFilter, filter_trips_by_time};
use crate::model::{Station, StationId, TripStore};
use crate::scale::{FlowBucket, FlowScale, RadiusScale};
use crate::traffic::{StationTraffic, compute_station_traffic, max_traffic};

/// The "value changed" event from the time control.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FilterChanged(pub TimeFilter);

impl From<TimeFilter> for FilterChanged {
    fn from(filter: TimeFilter) -> Self {
        FilterChanged(filter)
    }
}

/// Everything the renderer needs to draw one station.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StationView {
    pub id: StationId,
    pub lon: f64,
    pub lat: f64,
    pub arrivals: usize,
    pub departures: usize,
    pub total_traffic: usize,
    pub radius: f64,
    pub flow_bucket: FlowBucket,
    pub tooltip_text: String,
}

impl StationView {
    fn new(traffic: StationTraffic, radius: &RadiusScale, flow: &FlowScale) -> Self {
        StationView {
            radius: radius.radius(traffic.total_traffic),
            flow_bucket: flow.bucket(traffic.departure_ratio()),
            tooltip_text: traffic.tooltip_text(),
            id: traffic.id,
            lon: traffic.lon,
            lat: traffic.lat,
            arrivals: traffic.arrivals,
            departures: traffic.departures,
            total_traffic: traffic.total_traffic,
        }
    }
}

/// Output of one pass: views in station-list order, indexed by station id.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TrafficUpdate {
    #[serde(serialize_with = "serialize_filter")]
    pub filter: TimeFilter,
    /// Selected clock time; `None` means "any time".
    pub time_label: Option<String>,
    pub trip_count: usize,
    pub stations: Vec<StationView>,
    #[serde(skip)]
    index: HashMap<StationId, usize>,
}

fn serialize_filter<S: serde::Serializer>(filter: &TimeFilter, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_i32(filter.to_slider())
}

impl TrafficUpdate {
    pub fn new(filter: TimeFilter, trip_count: usize, stations: Vec<StationView>) -> Self {
        let index = stations
            .iter()
            .enumerate()
            .map(|(i, s)| (s.id.clone(), i))
            .collect();
        TrafficUpdate {
            filter,
            time_label: filter.label(),
            trip_count,
            stations,
            index,
        }
    }

    pub fn get(&self, id: &str) -> Option<&StationView> {
        self.index.get(id).and_then(|&i| self.stations.get(i))
    }

    pub fn max_traffic(&self) -> usize {
        self.stations.iter().map(|s| s.total_traffic).max().unwrap_or(0)
    }

    /// The `n` busiest stations, busiest first; ties keep station-list order.
    pub fn busiest(&self, n: usize) -> Vec<&StationView> {
        let mut ranked: Vec<&StationView> = self.stations.iter().collect();
        ranked.sort_by(|a, b| b.total_traffic.cmp(&a.total_traffic));
        ranked.truncate(n);
        ranked
    }
}

/// Receives every update the controller emits.
pub trait RenderSink {
    fn render(&mut self, update: &TrafficUpdate);
}

impl<F: FnMut(&TrafficUpdate)> RenderSink for F {
    fn render(&mut self, update: &TrafficUpdate) {
        self(update)
    }
}

/// Keeps every emitted update; handy for batch export and tests.
#[derive(Debug, Default)]
pub struct CollectingSink {
    pub updates: Vec<TrafficUpdate>,
}

impl RenderSink for CollectingSink {
    fn render(&mut self, update: &TrafficUpdate) {
        self.updates.push(update.clone());
    }
}

pub struct TrafficController {
    stations: Vec<Station>,
    trips: TripStore,
    filter: TimeFilter,
    radius: RadiusScale,
    flow: FlowScale,
    current: TrafficUpdate,
}

impl TrafficController {
    /// Builds the controller in the unfiltered state and runs the initial pass.
    pub fn new(stations: Vec<Station>, trips: TripStore) -> Self {
        let mut controller = TrafficController {
            stations,
            trips,
            filter: TimeFilter::Any,
            radius: RadiusScale::new(TimeFilter::Any, 0),
            flow: FlowScale::default(),
            current: TrafficUpdate::new(TimeFilter::Any, 0, Vec::new()),
        };
        controller.recompute();
        controller
    }

    pub fn filter(&self) -> TimeFilter {
        self.filter
    }

    pub fn radius_scale(&self) -> &RadiusScale {
        &self.radius
    }

    pub fn current(&self) -> &TrafficUpdate {
        &self.current
    }

    pub fn stations(&self) -> &[Station] {
        &self.stations
    }

    pub fn trips(&self) -> &TripStore {
        &self.trips
    }

    /// Applies a filter change and emits the resulting update.
    pub fn on_filter_changed<S: RenderSink + ?Sized>(
        &mut self,
        event: FilterChanged,
        sink: &mut S,
    ) -> &TrafficUpdate {
        self.filter = event.0;
        self.recompute();
        sink.render(&self.current);
        &self.current
    }

    /// Re-emits the last update without re-aggregating, e.g. after the map
    /// viewport moved.
    pub fn refresh<S: RenderSink + ?Sized>(&self, sink: &mut S) {
        sink.render(&self.current);
    }

    #[tracing::instrument(skip(self), fields(filter = self.filter.to_slider()))]
    fn recompute(&mut self) {
        let filtered = filter_trips_by_time(self.trips.trips(), self.filter);
        let trip_count = filtered.len();
        let traffic = compute_station_traffic(&self.stations, filtered);

        self.radius = RadiusScale::new(self.filter, max_traffic(&traffic));
        debug!(
            trip_count,
            max_traffic = self.radius.domain().1,
            range = ?self.radius.range(),
            "Scales updated"
        );

        let stations = traffic
            .into_iter()
            .map(|t| StationView::new(t, &self.radius, &self.flow))
            .collect();

        self.current = TrafficUpdate::new(self.filter, trip_count, stations);

        info!(
            stations = self.current.stations.len(),
            trip_count,
            "Station traffic recomputed"
        );
    }
}
