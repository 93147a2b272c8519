// Secondary processing command: merge the selected activities' GPS data and
// let the operator drop stops that are not real rest points.

use anyhow::Result;
use chrono::{DateTime, Utc};
use dialoguer::Input;

use crate::api::ActivitySource;
use crate::console::Console;
use crate::merge::merge_activities;
use crate::model::{parse_stop_positions, ActivityRecord, MergedTrace};
use crate::registry::SecondaryProcessingCommand;

pub struct MergeGpsData {
    console: Console,
}

impl MergeGpsData {
    pub fn new(console: Console) -> Self {
        MergeGpsData { console }
    }

    fn show_stops(&self, trace: &MergedTrace) {
        self.console.title("Stops (start of each merged leg)");
        for (pos, &offset) in trace.boundaries().iter().enumerate() {
            let when = DateTime::<Utc>::from_timestamp_millis(trace.points()[offset].timestamp_ms)
                .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_else(|| "unknown time".to_string());
            let dropped = if trace.dropped_stop_indices().contains(&pos) {
                "  (dropped)"
            } else {
                ""
            };
            self.console
                .line(&format!("  [{}] point {:>6}  {}{}", pos, offset, when, dropped));
        }
    }

    /// Ask which stops to drop until the answer parses and is in range.
    fn review_stops(&self, trace: &mut MergedTrace) -> Result<()> {
        self.show_stops(trace);
        loop {
            let answer: String = Input::new()
                .with_prompt("Stop positions to drop (comma separated, empty for none)")
                .allow_empty(true)
                .interact_text()?;
            match parse_stop_positions(&answer).and_then(|positions| trace.drop_stops(&positions)) {
                Ok(()) => return Ok(()),
                Err(err) => self.console.error(&err.to_string()),
            }
        }
    }
}

impl SecondaryProcessingCommand for MergeGpsData {
    fn execute(
        &self,
        source: &dyn ActivitySource,
        activities: &[ActivityRecord],
        display: bool,
    ) -> Result<Option<MergedTrace>> {
        let mut trace = match merge_activities(source, activities, &self.console, display)? {
            Some(trace) => trace,
            None => return Ok(None),
        };
        if display {
            if trace.boundaries().len() > 1 {
                self.review_stops(&mut trace)?;
            }
            self.console.success(&format!(
                "Merged GPS data from {} activities: {} points, {} stops.",
                trace.activity_ids().len(),
                trace.points().len(),
                trace.stop_indices().len()
            ));
        }
        Ok(Some(trace))
    }
}
