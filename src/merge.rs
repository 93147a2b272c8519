// GPS trace merge: joins the polylines of several activities into one
// track in chronological order, remembering where each leg starts.

use chrono::NaiveDateTime;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::api::ActivitySource;
use crate::console::Console;
use crate::model::{ActivityId, ActivityRecord, MergedTrace, RecordError, TrackPoint};

/// Points of the activity's GPS polyline, or `None` when the details carry
/// no polyline at all. Entries without usable coordinates are skipped.
pub fn polyline_points(details: &Value) -> Option<Vec<TrackPoint>> {
    let entries = details.pointer("/geoPolylineDTO/polyline")?.as_array()?;
    let points = entries
        .iter()
        .enumerate()
        .filter_map(|(i, entry)| match serde_json::from_value::<TrackPoint>(entry.clone()) {
            Ok(point) => Some(point),
            Err(err) => {
                debug!(index = i, error = %err, "skipping malformed polyline entry");
                None
            }
        })
        .collect();
    Some(points)
}

/// Merge the GPS tracks of `activities` into a single trace.
///
/// Every record must carry a parseable `startTimeLocal`; the first one that
/// does not aborts the merge. Activities without GPS data are kept in
/// `activity_ids` but contribute neither points nor a stop. Returns
/// `Ok(None)` when no activity had any GPS data.
pub fn merge_activities(
    source: &dyn ActivitySource,
    activities: &[ActivityRecord],
    console: &Console,
    display: bool,
) -> Result<Option<MergedTrace>, RecordError> {
    let mut ordered: Vec<(ActivityId, NaiveDateTime)> = activities
        .iter()
        .map(|record| -> Result<_, RecordError> {
            Ok((record.activity_id()?, record.start_time_local()?))
        })
        .collect::<Result<_, _>>()?;
    // Vec::sort_by_key is stable, so equal start times keep input order.
    ordered.sort_by_key(|(_, start)| *start);

    if display {
        console.title(&format!(
            "Found {} activities sorted by start time:",
            ordered.len()
        ));
        for (id, start) in &ordered {
            console.line(&format!("  {}  {}", id, start));
        }
    }

    let mut points: Vec<TrackPoint> = Vec::new();
    let mut boundaries = Vec::new();
    for (id, _) in &ordered {
        let polyline = match source.activity_details(id) {
            Ok(details) => polyline_points(&details).unwrap_or_default(),
            Err(err) => {
                warn!(activity_id = %id, error = %format!("{:#}", err), "failed to fetch activity details");
                Vec::new()
            }
        };
        if polyline.is_empty() {
            warn!(activity_id = %id, "no GPS data for activity");
            if display {
                console.warn(&format!("No GPS data found for activity ID {}", id));
            }
            continue;
        }
        debug!(activity_id = %id, points = polyline.len(), offset = points.len(), "appending leg");
        boundaries.push(points.len());
        points.extend(polyline);
    }

    if points.is_empty() {
        warn!(activities = ordered.len(), "no GPS data available to merge");
        if display {
            console.error("No GPS data available to merge.");
        }
        return Ok(None);
    }

    info!(
        activities = ordered.len(),
        legs = boundaries.len(),
        points = points.len(),
        "merged GPS data"
    );
    let (activity_ids, start_times) = ordered.into_iter().unzip();
    Ok(Some(MergedTrace::new(points, activity_ids, start_times, boundaries)))
}
