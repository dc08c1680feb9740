//! Time-of-day filtering of trips.
//!
//! A filter is either "any time" or a cutoff minute; a trip passes a cutoff
//! when its start or end minute lies within [`WINDOW_MINUTES`] of it. The
//! window is a plain absolute difference and does not wrap across midnight.

use anyhow::{Result, bail};
use chrono::{NaiveDateTime, NaiveTime, Timelike};

use crate::model::Trip;

/// Slider value meaning "no filter".
pub const ANY_TIME: i32 = -1;

/// Last minute of the day.
pub const MAX_MINUTE: u16 = 24 * 60 - 1;

/// Half-width of the match window around the cutoff, inclusive.
pub const WINDOW_MINUTES: u16 = 60;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TimeFilter {
    #[default]
    Any,
    /// Minutes since midnight, `0..=1439`.
    Cutoff(u16),
}

impl TimeFilter {
    /// Converts a raw slider value (`-1` or minutes since midnight).
    pub fn from_slider(value: i32) -> Result<Self> {
        match value {
            ANY_TIME => Ok(TimeFilter::Any),
            v if (0..=MAX_MINUTE as i32).contains(&v) => Ok(TimeFilter::Cutoff(v as u16)),
            v => bail!("time filter {} out of range (expected -1 or 0..={})", v, MAX_MINUTE),
        }
    }

    pub fn to_slider(self) -> i32 {
        match self {
            TimeFilter::Any => ANY_TIME,
            TimeFilter::Cutoff(m) => m as i32,
        }
    }

    pub fn is_filtered(self) -> bool {
        matches!(self, TimeFilter::Cutoff(_))
    }

    /// Clock label for the selected time; `None` stands for "any time".
    pub fn label(self) -> Option<String> {
        match self {
            TimeFilter::Any => None,
            TimeFilter::Cutoff(m) => Some(format_time(m)),
        }
    }

    fn matches(self, trip: &Trip) -> bool {
        let TimeFilter::Cutoff(cutoff) = self else {
            return true;
        };
        let (Some(started), Some(ended)) = (trip.started_at, trip.ended_at) else {
            return false;
        };
        let near = |t: NaiveDateTime| minutes_since_midnight(t).abs_diff(cutoff) <= WINDOW_MINUTES;
        near(started) || near(ended)
    }
}

pub fn minutes_since_midnight(t: NaiveDateTime) -> u16 {
    (t.hour() * 60 + t.minute()) as u16
}

/// Formats a minute of the day as a US clock time, e.g. `9:05 AM`.
pub fn format_time(minutes: u16) -> String {
    let minutes = minutes.min(MAX_MINUTE) as u32;
    match NaiveTime::from_hms_opt(minutes / 60, minutes % 60, 0) {
        Some(t) => t.format("%-I:%M %p").to_string(),
        None => String::new(),
    }
}

/// Narrows `trips` to those matching `filter`, preserving order.
pub fn filter_trips_by_time(trips: &[Trip], filter: TimeFilter) -> Vec<&Trip> {
    match filter {
        TimeFilter::Any => trips.iter().collect(),
        TimeFilter::Cutoff(_) => trips.iter().filter(|t| filter.matches(t)).collect(),
    }
}
