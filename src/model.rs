// Data model shared by the merge and elevation stages: activity records as
// returned by the tracker, GPS track points and the merged trace.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

/// Timestamp layouts seen in `startTimeLocal`. The tracker uses the first;
/// the others show up in exports and hand-written fixtures.
const START_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

#[derive(Error, Debug, PartialEq)]
pub enum RecordError {
    #[error("activity record has no usable activityId")]
    MissingId,
    #[error("activity {0} has no startTimeLocal")]
    MissingStartTime(ActivityId),
    #[error("activity {id} has an unparseable startTimeLocal {value:?}")]
    InvalidStartTime { id: ActivityId, value: String },
}

#[derive(Error, Debug, PartialEq)]
pub enum TraceError {
    #[error("stop position {position} is out of range (trace has {len} stops)")]
    StopOutOfRange { position: usize, len: usize },
    #[error("invalid stop position {0:?}")]
    InvalidStopPosition(String),
}

/// Opaque activity identifier. The tracker sends numbers, but nothing here
/// depends on that.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActivityId(String);

impl ActivityId {
    pub fn new(id: impl Into<String>) -> Self {
        ActivityId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActivityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One activity as delivered by the tracker: an untyped JSON object. Only
/// `activityId` and `startTimeLocal` are interpreted by the pipeline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActivityRecord(Map<String, Value>);

impl ActivityRecord {
    pub fn new(fields: Map<String, Value>) -> Self {
        ActivityRecord(fields)
    }

    /// Wraps a JSON value; anything but an object is rejected.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(ActivityRecord(fields)),
            _ => None,
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn activity_id(&self) -> Result<ActivityId, RecordError> {
        match self.0.get("activityId") {
            Some(Value::Number(n)) => Ok(ActivityId(n.to_string())),
            Some(Value::String(s)) if !s.is_empty() => Ok(ActivityId(s.clone())),
            _ => Err(RecordError::MissingId),
        }
    }

    pub fn start_time_local(&self) -> Result<NaiveDateTime, RecordError> {
        let id = self.activity_id()?;
        let raw = match self.0.get("startTimeLocal") {
            Some(Value::String(s)) => s.trim(),
            _ => return Err(RecordError::MissingStartTime(id)),
        };
        parse_start_time(raw).ok_or_else(|| RecordError::InvalidStartTime {
            id,
            value: raw.to_string(),
        })
    }

    pub fn name(&self) -> Option<&str> {
        self.0.get("activityName").and_then(Value::as_str)
    }

    pub fn type_key(&self) -> Option<&str> {
        self.0
            .get("activityType")
            .and_then(|t| t.get("typeKey"))
            .and_then(Value::as_str)
    }
}

pub fn parse_start_time(raw: &str) -> Option<NaiveDateTime> {
    START_TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}

/// A single GPS sample. Field names on the wire follow the tracker's
/// polyline entries (`lat`, `lon`, `time`, `altitude`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackPoint {
    #[serde(rename = "lat")]
    pub latitude: f64,
    #[serde(rename = "lon")]
    pub longitude: f64,
    #[serde(rename = "time", default)]
    pub timestamp_ms: i64,
    #[serde(rename = "altitude", default, skip_serializing_if = "Option::is_none")]
    pub altitude_m: Option<f64>,
}

impl TrackPoint {
    pub fn new(latitude: f64, longitude: f64, timestamp_ms: i64) -> Self {
        TrackPoint {
            latitude,
            longitude,
            timestamp_ms,
            altitude_m: None,
        }
    }

    pub fn has_valid_coordinates(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// Several activities' GPS tracks joined into one, plus the bookkeeping
/// needed to tell the legs apart again.
///
/// `boundaries` is the list of stop indices as produced by the merge and
/// never changes. Drops are recorded as positions into that list, so
/// repeated reviews always address the same numbering.
#[derive(Clone, Debug, PartialEq)]
pub struct MergedTrace {
    points: Vec<TrackPoint>,
    activity_ids: Vec<ActivityId>,
    start_times: Vec<NaiveDateTime>,
    boundaries: Vec<usize>,
    stop_indices: Vec<usize>,
    dropped_stop_indices: BTreeSet<usize>,
}

impl MergedTrace {
    pub fn new(
        points: Vec<TrackPoint>,
        activity_ids: Vec<ActivityId>,
        start_times: Vec<NaiveDateTime>,
        boundaries: Vec<usize>,
    ) -> Self {
        MergedTrace {
            points,
            activity_ids,
            start_times,
            stop_indices: boundaries.clone(),
            boundaries,
            dropped_stop_indices: BTreeSet::new(),
        }
    }

    pub fn points(&self) -> &[TrackPoint] {
        &self.points
    }

    /// Mutable access for enrichment. The slice cannot grow or shrink.
    pub fn points_mut(&mut self) -> &mut [TrackPoint] {
        &mut self.points
    }

    pub fn activity_ids(&self) -> &[ActivityId] {
        &self.activity_ids
    }

    pub fn start_times(&self) -> &[NaiveDateTime] {
        &self.start_times
    }

    /// Stop indices still in effect after any drops.
    pub fn stop_indices(&self) -> &[usize] {
        &self.stop_indices
    }

    /// Stop indices exactly as produced by the merge.
    pub fn boundaries(&self) -> &[usize] {
        &self.boundaries
    }

    pub fn dropped_stop_indices(&self) -> &BTreeSet<usize> {
        &self.dropped_stop_indices
    }

    pub fn has_altitude(&self) -> bool {
        self.points.iter().all(|p| p.altitude_m.is_some())
    }

    /// Drop stops by position in the original stop list. Positions already
    /// dropped are accepted again without effect. The whole request is
    /// rejected if any position is out of range.
    pub fn drop_stops(&mut self, positions: &[usize]) -> Result<(), TraceError> {
        let len = self.boundaries.len();
        if let Some(&position) = positions.iter().find(|&&p| p >= len) {
            return Err(TraceError::StopOutOfRange { position, len });
        }
        self.dropped_stop_indices.extend(positions.iter().copied());
        self.stop_indices = self
            .boundaries
            .iter()
            .enumerate()
            .filter(|(pos, _)| !self.dropped_stop_indices.contains(pos))
            .map(|(_, &offset)| offset)
            .collect();
        Ok(())
    }
}

/// Parse operator input such as `"1, 3"` into stop positions. Blank input
/// means nothing to drop.
pub fn parse_stop_positions(input: &str) -> Result<Vec<usize>, TraceError> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<usize>()
                .map_err(|_| TraceError::InvalidStopPosition(s.to_string()))
        })
        .collect()
}
