//! In-process stand-ins for the tracker and the elevation provider.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::time::Instant;

use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use garmin_trail::api::{ActivitySource, Endpoint};
use garmin_trail::elevation::{Coordinate, ElevationProvider};
use garmin_trail::model::{ActivityId, ActivityRecord};
use serde_json::{json, Value};

/// Polyline of `len` points heading north from `lat0`, one second apart.
pub fn polyline(len: usize, lat0: f64, t0: i64) -> Value {
    let points: Vec<Value> = (0..len)
        .map(|i| json!({"lat": lat0 + i as f64 * 0.0001, "lon": 7.0, "time": t0 + i as i64 * 1000}))
        .collect();
    json!({ "geoPolylineDTO": { "polyline": points } })
}

pub fn record(id: &str, start: &str) -> ActivityRecord {
    ActivityRecord::from_value(json!({
        "activityId": id,
        "activityName": format!("Leg {}", id),
        "activityType": {"typeKey": "hiking"},
        "startTimeLocal": start,
    }))
    .unwrap()
}

#[derive(Default)]
pub struct FakeSource {
    pub activities: Vec<ActivityRecord>,
    pub details: HashMap<String, Value>,
    pub broken: HashSet<String>,
    pub detail_calls: RefCell<Vec<String>>,
    pub list_calls: Cell<usize>,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an activity whose polyline has `points` entries.
    pub fn with_track(mut self, id: &str, start: &str, points: usize) -> Self {
        let lat0 = 45.0 + self.activities.len() as f64;
        self.activities.push(record(id, start));
        self.details.insert(id.to_string(), polyline(points, lat0, 0));
        self
    }

    /// Adds an activity whose details carry no polyline at all.
    pub fn without_gps(mut self, id: &str, start: &str) -> Self {
        self.activities.push(record(id, start));
        self.details
            .insert(id.to_string(), json!({"activityId": id, "geoPolylineDTO": null}));
        self
    }

    /// Adds an activity whose details request fails.
    pub fn with_broken_details(mut self, id: &str, start: &str) -> Self {
        self.activities.push(record(id, start));
        self.broken.insert(id.to_string());
        self
    }
}

impl ActivitySource for FakeSource {
    fn activities(&self, start: usize, limit: usize) -> Result<Vec<ActivityRecord>> {
        self.list_calls.set(self.list_calls.get() + 1);
        Ok(self.activities.iter().skip(start).take(limit).cloned().collect())
    }

    fn activities_by_date(&self, _start: NaiveDate, _end: NaiveDate) -> Result<Vec<ActivityRecord>> {
        self.list_calls.set(self.list_calls.get() + 1);
        Ok(self.activities.clone())
    }

    fn activity_details(&self, activity_id: &ActivityId) -> Result<Value> {
        let id = activity_id.as_str();
        self.detail_calls.borrow_mut().push(id.to_string());
        if self.broken.contains(id) {
            return Err(anyhow!("503 Service Unavailable"));
        }
        self.details
            .get(id)
            .cloned()
            .ok_or_else(|| anyhow!("no such activity {}", id))
    }

    fn summary(&self, endpoint: Endpoint) -> Result<Value> {
        Ok(json!({ "endpoint": format!("{:?}", endpoint) }))
    }
}

/// Elevation of a coordinate as the fake provider reports it.
pub fn fake_elevation(at: &Coordinate) -> f64 {
    (at.latitude * 10.0).round() + at.longitude
}

/// Answers with `fake_elevation`, except for `missing` coordinates (no
/// value) and calls listed in `failing_calls` (1-based, whole batch fails).
#[derive(Default)]
pub struct FakeProvider {
    pub calls: RefCell<Vec<Vec<Coordinate>>>,
    pub call_times: RefCell<Vec<Instant>>,
    pub missing: Vec<Coordinate>,
    pub failing_calls: HashSet<usize>,
    pub truncate: bool,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }

    pub fn queried_points(&self) -> usize {
        self.calls.borrow().iter().map(Vec::len).sum()
    }
}

impl ElevationProvider for FakeProvider {
    fn lookup(&self, _dataset: &str, locations: &[Coordinate]) -> Result<Vec<Option<f64>>> {
        self.call_times.borrow_mut().push(Instant::now());
        self.calls.borrow_mut().push(locations.to_vec());
        if self.failing_calls.contains(&self.call_count()) {
            return Err(anyhow!("500 Internal Server Error"));
        }
        let mut values: Vec<Option<f64>> = locations
            .iter()
            .map(|at| {
                if self.missing.contains(at) {
                    None
                } else {
                    Some(fake_elevation(at))
                }
            })
            .collect();
        if self.truncate {
            values.pop();
        }
        Ok(values)
    }
}
