// Activity listings for the terminal: a few headline fields per activity.

use serde_json::Value;

use crate::console::Console;
use crate::model::ActivityRecord;

fn number(record: &ActivityRecord, field: &str) -> f64 {
    record.get(field).and_then(Value::as_f64).unwrap_or(0.0)
}

/// `(label, value)` rows summarising one activity.
pub fn summary_rows(record: &ActivityRecord) -> Vec<(&'static str, String)> {
    let text = |v: Option<&str>| v.unwrap_or("N/A").to_string();
    vec![
        ("Activity Name", text(record.name())),
        ("Activity Type", text(record.type_key())),
        (
            "Start Time",
            text(record.get("startTimeLocal").and_then(Value::as_str)),
        ),
        ("Duration", format!("{:.2} minutes", number(record, "duration") / 60.0)),
        ("Distance", format!("{:.2} km", number(record, "distance") / 1000.0)),
        (
            "Average Speed",
            format!("{:.2} km/h", number(record, "averageSpeed") * 3.6),
        ),
    ]
}

/// One-line label used in pickers.
pub fn one_line(record: &ActivityRecord) -> String {
    format!(
        "{}  {} ({})",
        record
            .get("startTimeLocal")
            .and_then(Value::as_str)
            .unwrap_or("????-??-?? ??:??:??"),
        record.name().unwrap_or("Unnamed activity"),
        record.type_key().unwrap_or("unknown"),
    )
}

pub fn show_activities(console: &Console, activities: &[ActivityRecord]) {
    for (i, activity) in activities.iter().enumerate() {
        console.title(&format!("Activity {}", i + 1));
        for (label, value) in summary_rows(activity) {
            console.line(&format!("  {:<14} {}", label, value));
        }
        console.line("");
    }
}
