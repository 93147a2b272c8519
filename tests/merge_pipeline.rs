mod common;

use common::{FakeProvider, FakeSource};
use garmin_trail::console::Console;
use garmin_trail::elevation::{ElevationCache, EnrichSettings, Enricher};
use garmin_trail::merge::merge_activities;
use garmin_trail::model::{ActivityId, RecordError, TraceError};
use garmin_trail::render::{write_map, MapStyle};
use std::time::Duration;

fn ids(values: &[ActivityId]) -> Vec<&str> {
    values.iter().map(ActivityId::as_str).collect()
}

#[test]
fn legs_are_joined_in_start_time_order() {
    let source = FakeSource::new()
        .with_track("A", "2024-01-01T08:00", 10)
        .with_track("B", "2024-01-03T09:00", 0)
        .with_track("C", "2024-01-02T10:00", 5);
    let (console, _out) = Console::capture();

    let trace = merge_activities(&source, &source.activities, &console, false)
        .unwrap()
        .expect("trace with points");

    assert_eq!(trace.points().len(), 15);
    assert_eq!(ids(trace.activity_ids()), vec!["A", "C", "B"]);
    assert_eq!(trace.stop_indices(), &[0, 10]);
    // A's points come first, in polyline order.
    assert_eq!(trace.points()[0].latitude, 45.0);
    assert_eq!(trace.points()[9].timestamp_ms, 9000);
    assert_eq!(trace.points()[10].latitude, 47.0);
    assert_eq!(trace.start_times().len(), 3);
}

#[test]
fn input_order_does_not_matter() {
    let source = FakeSource::new()
        .with_track("A", "2024-03-01 08:00:00", 3)
        .with_track("B", "2024-03-01 12:30:00", 4)
        .with_track("C", "2024-03-02 07:15:00", 2)
        .with_track("D", "2024-02-28 18:00:00", 6);
    let (console, _out) = Console::capture();

    let mut records = source.activities.clone();
    let mut seen = Vec::new();
    for _ in 0..records.len() {
        records.rotate_left(1);
        let mut reversed = records.clone();
        reversed.reverse();
        for input in [&records, &reversed] {
            let trace = merge_activities(&source, input, &console, false).unwrap().unwrap();
            seen.push((
                ids(trace.activity_ids()).join(","),
                trace.stop_indices().to_vec(),
                trace.points().len(),
            ));
        }
    }
    let expected = ("D,A,B,C".to_string(), vec![0, 6, 9, 13], 15);
    assert!(seen.iter().all(|s| *s == expected), "{:?}", seen);
}

#[test]
fn equal_start_times_keep_input_order() {
    let source = FakeSource::new()
        .with_track("second", "2024-05-05 10:00:00", 2)
        .with_track("first", "2024-05-05 10:00:00", 2);
    let (console, _out) = Console::capture();

    let trace = merge_activities(&source, &source.activities, &console, false)
        .unwrap()
        .unwrap();
    assert_eq!(ids(trace.activity_ids()), vec!["second", "first"]);
}

#[test]
fn activities_without_gps_add_no_stop() {
    let source = FakeSource::new()
        .with_track("run", "2024-06-01 07:00:00", 4)
        .without_gps("treadmill", "2024-06-01 09:00:00")
        .with_broken_details("flaky", "2024-06-01 10:00:00")
        .with_track("hike", "2024-06-01 11:00:00", 3);
    let (console, out) = Console::capture();

    let trace = merge_activities(&source, &source.activities, &console, true)
        .unwrap()
        .unwrap();

    assert_eq!(ids(trace.activity_ids()), vec!["run", "treadmill", "flaky", "hike"]);
    assert_eq!(trace.stop_indices(), &[0, 4]);
    assert_eq!(trace.points().len(), 7);
    let shown = out.contents();
    assert!(shown.contains("No GPS data found for activity ID treadmill"));
    assert!(shown.contains("No GPS data found for activity ID flaky"));
}

#[test]
fn unparseable_start_time_fails_before_any_fetch() {
    let source = FakeSource::new()
        .with_track("ok", "2024-01-01 08:00:00", 3)
        .with_track("bad", "yesterday-ish", 3);
    let (console, _out) = Console::capture();

    let err = merge_activities(&source, &source.activities, &console, false).unwrap_err();
    assert_eq!(
        err,
        RecordError::InvalidStartTime {
            id: ActivityId::new("bad"),
            value: "yesterday-ish".to_string(),
        }
    );
    assert!(source.detail_calls.borrow().is_empty());
}

#[test]
fn no_gps_anywhere_yields_nothing() {
    let source = FakeSource::new()
        .without_gps("a", "2024-01-01 08:00:00")
        .with_track("b", "2024-01-02 08:00:00", 0);
    let (console, out) = Console::capture();

    let merged = merge_activities(&source, &source.activities, &console, true).unwrap();
    assert!(merged.is_none());
    assert!(out.contents().contains("No GPS data available to merge."));
}

#[test]
fn dropping_a_stop_keeps_the_rest_in_order() {
    let mut source = FakeSource::new();
    for (i, day) in ["01", "02", "03", "04", "05"].iter().enumerate() {
        source = source.with_track(&format!("leg{}", i), &format!("2024-07-{} 08:00:00", day), 2);
    }
    let (console, _out) = Console::capture();
    let mut trace = merge_activities(&source, &source.activities, &console, false)
        .unwrap()
        .unwrap();
    assert_eq!(trace.stop_indices(), &[0, 2, 4, 6, 8]);

    trace.drop_stops(&[1]).unwrap();
    assert_eq!(trace.stop_indices(), &[0, 4, 6, 8]);
    assert!(trace.dropped_stop_indices().contains(&1));

    // Out-of-range requests change nothing.
    let err = trace.drop_stops(&[2, 5]).unwrap_err();
    assert_eq!(err, TraceError::StopOutOfRange { position: 5, len: 5 });
    assert_eq!(trace.stop_indices(), &[0, 4, 6, 8]);

    // Positions keep addressing the original list.
    trace.drop_stops(&[1, 3]).unwrap();
    assert_eq!(trace.stop_indices(), &[0, 4, 8]);
    assert_eq!(trace.points().len(), 10);
}

#[test]
fn merged_trace_renders_after_enrichment() {
    let source = FakeSource::new()
        .with_track("A", "2024-01-01 08:00:00", 6)
        .with_track("B", "2024-01-01 13:00:00", 4);
    let (console, _out) = Console::capture();
    let mut trace = merge_activities(&source, &source.activities, &console, false)
        .unwrap()
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    assert!(write_map(&trace, MapStyle::Terrain, dir.path()).is_err());

    let provider = FakeProvider::new();
    let cache = ElevationCache::open(&dir.path().join("cache.db")).unwrap();
    let settings = EnrichSettings {
        dataset: "srtm90m".to_string(),
        batch_size: 100,
        request_delay: Duration::ZERO,
    };
    let report = Enricher::new(&provider, &cache, settings, console)
        .enrich(&mut trace, false)
        .unwrap();
    assert_eq!(report.queried, 10);
    assert!(trace.has_altitude());

    let flat = write_map(&trace, MapStyle::Flat, dir.path()).unwrap();
    let terrain = write_map(&trace, MapStyle::Terrain, dir.path()).unwrap();
    assert_eq!(flat.file_name().unwrap(), "merged_map.html");
    assert_eq!(terrain.file_name().unwrap(), "merged_map_3d.html");
    let html = std::fs::read_to_string(terrain).unwrap();
    assert!(!html.contains("__TRACK__"));
}
