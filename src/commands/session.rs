// Generic command: prints what the session holds so far.

use anyhow::Result;

use crate::console::Console;
use crate::dispatch::SessionState;
use crate::registry::GenericCommand;

pub struct ShowSession {
    console: Console,
}

impl ShowSession {
    pub fn new(console: Console) -> Self {
        ShowSession { console }
    }
}

pub fn describe(session: &SessionState) -> Vec<String> {
    let mut lines = Vec::new();
    lines.push(match session.current_retrieval() {
        Some(sel) => format!("Current retrieval: {}", sel),
        None => "Current retrieval: none (default is used)".to_string(),
    });
    let count = |set: Option<usize>| set.map_or_else(|| "none".to_string(), |n| n.to_string());
    lines.push(format!(
        "Retrieved activities: {}",
        count(session.retrieved().map(<[_]>::len))
    ));
    lines.push(format!(
        "Selected activities: {}",
        count(session.processed().map(<[_]>::len))
    ));
    match session.merged() {
        Some(trace) => {
            lines.push(format!(
                "Merged trace: {} points from {} activities",
                trace.points().len(),
                trace.activity_ids().len()
            ));
            lines.push(format!(
                "Stops: {:?} (dropped positions {:?})",
                trace.stop_indices(),
                trace.dropped_stop_indices()
            ));
            lines.push(format!(
                "Elevation: {}",
                if trace.has_altitude() { "present" } else { "missing" }
            ));
        }
        None => lines.push("Merged trace: none".to_string()),
    }
    if let Some(path) = session.last_artifact() {
        lines.push(format!("Last map: {}", path.display()));
    }
    lines
}

impl GenericCommand for ShowSession {
    fn execute(&self, session: &SessionState, display: bool) -> Result<()> {
        if display {
            self.console.title("Session");
            for line in describe(session) {
                self.console.line(&format!("  {}", line));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_session() {
        let lines = describe(&SessionState::new());
        assert_eq!(lines[0], "Current retrieval: none (default is used)");
        assert_eq!(lines[1], "Retrieved activities: none");
        assert_eq!(lines[3], "Merged trace: none");
    }
}
