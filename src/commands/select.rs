// Processing command: lets the operator pick which of the retrieved
// activities go into the merge.

use anyhow::Result;
use dialoguer::MultiSelect;
use std::collections::BTreeSet;
use tracing::warn;

use crate::api::ActivitySource;
use crate::console::Console;
use crate::model::ActivityRecord;
use crate::registry::ProcessingCommand;
use crate::view;

pub struct SelectActivities {
    console: Console,
}

impl SelectActivities {
    pub fn new(console: Console) -> Self {
        SelectActivities { console }
    }
}

/// Distinct activity types among `activities`, sorted.
pub fn activity_types(activities: &[ActivityRecord]) -> BTreeSet<&str> {
    activities
        .iter()
        .map(|a| a.type_key().unwrap_or("unknown"))
        .collect()
}

impl ProcessingCommand for SelectActivities {
    fn execute(
        &self,
        _source: &dyn ActivitySource,
        activities: Vec<ActivityRecord>,
        display: bool,
    ) -> Result<Vec<ActivityRecord>> {
        if activities.is_empty() {
            anyhow::bail!("No activities to choose from; retrieve some activities first");
        }
        if !display {
            return Ok(activities);
        }

        let labels: Vec<String> = activities.iter().map(view::one_line).collect();
        let chosen = MultiSelect::new()
            .with_prompt("Select activities to merge (space toggles, enter confirms)")
            .items(&labels)
            .defaults(&vec![true; labels.len()])
            .interact()?;
        if chosen.is_empty() {
            anyhow::bail!("No activities selected");
        }
        let chosen: BTreeSet<usize> = chosen.into_iter().collect();
        let selected: Vec<ActivityRecord> = activities
            .into_iter()
            .enumerate()
            .filter(|(i, _)| chosen.contains(i))
            .map(|(_, a)| a)
            .collect();

        let types = activity_types(&selected);
        if types.len() > 1 {
            let listed = types.into_iter().collect::<Vec<_>>().join(", ");
            warn!(types = %listed, "merging activities of different types");
            self.console
                .warn(&format!("Merging activities of different types: {}", listed));
        }
        self.console
            .success(&format!("{} activities selected for merging.", selected.len()));
        Ok(selected)
    }
}
