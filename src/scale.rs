//! Visual scales derived from the current aggregation pass.

use serde::{Serialize, Serializer};

use crate::filter::TimeFilter;

/// Radius output range when no time filter is active.
pub const UNFILTERED_RADIUS: (f64, f64) = (0.0, 25.0);

/// Radius output range while a time filter is active.
pub const FILTERED_RADIUS: (f64, f64) = (3.0, 50.0);

/// Square-root scale from `[0, max_traffic]` onto a radius range.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RadiusScale {
    max_traffic: usize,
    range: (f64, f64),
}

impl RadiusScale {
    /// Builds the scale for a pass: the domain comes from that pass's busiest
    /// station, the range from the filter state alone.
    pub fn new(filter: TimeFilter, max_traffic: usize) -> Self {
        RadiusScale {
            max_traffic,
            range: Self::range_for(filter),
        }
    }

    pub fn range_for(filter: TimeFilter) -> (f64, f64) {
        match filter {
            TimeFilter::Any => UNFILTERED_RADIUS,
            TimeFilter::Cutoff(_) => FILTERED_RADIUS,
        }
    }

    pub fn domain(&self) -> (usize, usize) {
        (0, self.max_traffic)
    }

    pub fn range(&self) -> (f64, f64) {
        self.range
    }

    pub fn radius(&self, total_traffic: usize) -> f64 {
        let (lo, hi) = self.range;
        if self.max_traffic == 0 {
            return lo;
        }
        let t = (total_traffic as f64).sqrt() / (self.max_traffic as f64).sqrt();
        lo + (hi - lo) * t
    }
}

/// Coarse direction of a station's traffic.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlowBucket {
    /// Mostly arrivals.
    Arrivals,
    Balanced,
    /// Mostly departures.
    Departures,
}

impl FlowBucket {
    pub fn value(self) -> f64 {
        match self {
            FlowBucket::Arrivals => 0.0,
            FlowBucket::Balanced => 0.5,
            FlowBucket::Departures => 1.0,
        }
    }
}

impl Serialize for FlowBucket {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.value())
    }
}

/// Quantizes a departure ratio in `[0, 1]` into three equal-width buckets.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FlowScale {
    thresholds: [f64; 2],
}

impl Default for FlowScale {
    fn default() -> Self {
        FlowScale {
            thresholds: [1.0 / 3.0, 2.0 / 3.0],
        }
    }
}

impl FlowScale {
    /// A ratio equal to a threshold falls in the upper bucket. Out-of-domain
    /// ratios clamp to the end buckets; NaN maps to [`FlowBucket::Arrivals`].
    pub fn bucket(&self, ratio: f64) -> FlowBucket {
        match ratio {
            r if r >= self.thresholds[1] => FlowBucket::Departures,
            r if r >= self.thresholds[0] => FlowBucket::Balanced,
            _ => FlowBucket::Arrivals,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_radius_endpoints_unfiltered() {
        let scale = RadiusScale::new(TimeFilter::Any, 400);
        assert_eq!(scale.radius(0), 0.0);
        assert_eq!(scale.radius(400), 25.0);
        assert_eq!(scale.radius(100), 12.5);
    }

    #[test]
    fn test_radius_endpoints_filtered() {
        let scale = RadiusScale::new(TimeFilter::Cutoff(600), 16);
        assert_eq!(scale.radius(0), 3.0);
        assert_eq!(scale.radius(16), 50.0);
        assert_eq!(scale.radius(4), 3.0 + 47.0 * 0.5);
    }

    #[test]
    fn test_range_depends_only_on_filter() {
        assert_eq!(RadiusScale::new(TimeFilter::Any, 0).range(), (0.0, 25.0));
        assert_eq!(RadiusScale::new(TimeFilter::Any, 9000).range(), (0.0, 25.0));
        assert_eq!(RadiusScale::new(TimeFilter::Cutoff(0), 0).range(), (3.0, 50.0));
        assert_eq!(RadiusScale::new(TimeFilter::Cutoff(1439), 7).range(), (3.0, 50.0));
    }

    #[test]
    fn test_same_count_maps_differently_per_domain() {
        let busy = RadiusScale::new(TimeFilter::Any, 100);
        let quiet = RadiusScale::new(TimeFilter::Any, 25);
        assert!(busy.radius(25) < quiet.radius(25));
    }

    #[test]
    fn test_radius_with_empty_domain_is_range_min() {
        assert_eq!(RadiusScale::new(TimeFilter::Any, 0).radius(0), 0.0);
        assert_eq!(RadiusScale::new(TimeFilter::Cutoff(5), 0).radius(0), 3.0);
    }

    #[test]
    fn test_flow_buckets() {
        let flow = FlowScale::default();
        assert_eq!(flow.bucket(0.0), FlowBucket::Arrivals);
        assert_eq!(flow.bucket(0.2), FlowBucket::Arrivals);
        assert_eq!(flow.bucket(0.5), FlowBucket::Balanced);
        assert_eq!(flow.bucket(2.0 / 3.0), FlowBucket::Departures);
        assert_eq!(flow.bucket(1.0), FlowBucket::Departures);
    }

    #[test]
    fn test_flow_out_of_domain() {
        let flow = FlowScale::default();
        assert_eq!(flow.bucket(-0.5), FlowBucket::Arrivals);
        assert_eq!(flow.bucket(1.5), FlowBucket::Departures);
        assert_eq!(flow.bucket(f64::NAN), FlowBucket::Arrivals);
    }

    #[test]
    fn test_flow_bucket_serializes_as_number() {
        assert_eq!(serde_json::to_string(&FlowBucket::Balanced).unwrap(), "0.5");
        assert_eq!(serde_json::to_string(&FlowBucket::Departures).unwrap(), "1.0");
    }
}
