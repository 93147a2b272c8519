// Retrieval commands: thin wrappers over the tracker endpoints.

use anyhow::Result;
use chrono::{Local, NaiveDate};
use dialoguer::Input;
use std::cell::Cell;

use crate::api::{ActivitySource, Endpoint};
use crate::console::Console;
use crate::registry::{RetrievalCommand, Retrieved};
use crate::view;

/// Any of the summary endpoints, shown as JSON under a title.
pub struct SummaryQuery {
    title: &'static str,
    query: fn(NaiveDate) -> Endpoint,
    console: Console,
}

impl SummaryQuery {
    pub fn new(title: &'static str, query: fn(NaiveDate) -> Endpoint, console: Console) -> Self {
        SummaryQuery { title, query, console }
    }
}

impl RetrievalCommand for SummaryQuery {
    fn execute(&self, source: &dyn ActivitySource, display: bool) -> Result<Retrieved> {
        let today = Local::now().date_naive();
        let value = source.summary((self.query)(today))?;
        if display {
            self.console.json(self.title, &value);
        }
        Ok(Retrieved::Data(value))
    }
}

pub struct RecentActivities {
    limit: usize,
    console: Console,
}

impl RecentActivities {
    pub fn new(limit: usize, console: Console) -> Self {
        RecentActivities { limit, console }
    }
}

impl RetrievalCommand for RecentActivities {
    fn execute(&self, source: &dyn ActivitySource, display: bool) -> Result<Retrieved> {
        let activities = source.activities(0, self.limit)?;
        if display {
            if activities.is_empty() {
                self.console.warn("No activities found.");
            } else {
                view::show_activities(&self.console, &activities);
            }
        }
        Ok(Retrieved::Activities(activities))
    }
}

pub struct LastActivity {
    console: Console,
}

impl LastActivity {
    pub fn new(console: Console) -> Self {
        LastActivity { console }
    }
}

impl RetrievalCommand for LastActivity {
    fn execute(&self, source: &dyn ActivitySource, display: bool) -> Result<Retrieved> {
        match source.last_activity()? {
            Some(activity) => {
                let activities = vec![activity];
                if display {
                    view::show_activities(&self.console, &activities);
                }
                Ok(Retrieved::Activities(activities))
            }
            None => {
                if display {
                    self.console.warn("No last activity found.");
                }
                Ok(Retrieved::Nothing)
            }
        }
    }
}

pub fn parse_date(input: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d").ok()
}

fn prompt_date(prompt: &str) -> Result<NaiveDate> {
    let raw: String = Input::new()
        .with_prompt(prompt)
        .validate_with(|input: &String| -> Result<(), &'static str> {
            parse_date(input)
                .map(|_| ())
                .ok_or("Invalid date format. Please enter the date in YYYY-MM-DD format.")
        })
        .interact_text()?;
    parse_date(&raw).ok_or_else(|| anyhow::anyhow!("Invalid date {:?}", raw))
}

/// Activities between two prompted dates. The range is remembered so a
/// quiet re-run (for a processing command) does not ask again.
pub struct ActivitiesForRange {
    console: Console,
    last_range: Cell<Option<(NaiveDate, NaiveDate)>>,
}

impl ActivitiesForRange {
    pub fn new(console: Console) -> Self {
        ActivitiesForRange {
            console,
            last_range: Cell::new(None),
        }
    }

    pub fn with_range(console: Console, start: NaiveDate, end: NaiveDate) -> Self {
        ActivitiesForRange {
            console,
            last_range: Cell::new(Some((start, end))),
        }
    }
}

impl RetrievalCommand for ActivitiesForRange {
    fn execute(&self, source: &dyn ActivitySource, display: bool) -> Result<Retrieved> {
        let (start, end) = match self.last_range.get() {
            Some(range) if !display => range,
            None if !display => {
                anyhow::bail!("No date range chosen yet; run R first")
            }
            _ => {
                let start = prompt_date("Enter start date (YYYY-MM-DD)")?;
                let end = prompt_date("Enter end date (YYYY-MM-DD)")?;
                if end < start {
                    anyhow::bail!("End date {} is before start date {}", end, start);
                }
                (start, end)
            }
        };
        self.last_range.set(Some((start, end)));

        let activities = source.activities_by_date(start, end)?;
        if display {
            if activities.is_empty() {
                self.console.warn(&format!(
                    "No activities found between {} and {}.",
                    start, end
                ));
            } else {
                view::show_activities(&self.console, &activities);
            }
        }
        Ok(Retrieved::Activities(activities))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ActivityId, ActivityRecord};
    use serde_json::{json, Value};
    use std::cell::RefCell;

    #[derive(Default)]
    struct Canned {
        ranges: RefCell<Vec<(NaiveDate, NaiveDate)>>,
    }

    impl ActivitySource for Canned {
        fn activities(&self, start: usize, limit: usize) -> Result<Vec<ActivityRecord>> {
            Ok((start..start + limit.min(2))
                .filter_map(|i| ActivityRecord::from_value(json!({"activityId": i})))
                .collect())
        }

        fn activities_by_date(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<ActivityRecord>> {
            self.ranges.borrow_mut().push((start, end));
            Ok(Vec::new())
        }

        fn activity_details(&self, _activity_id: &ActivityId) -> Result<Value> {
            Ok(Value::Null)
        }

        fn summary(&self, endpoint: Endpoint) -> Result<Value> {
            Ok(json!(format!("{:?}", endpoint)))
        }
    }

    #[test]
    fn dates_must_be_iso() {
        assert_eq!(parse_date(" 2024-03-01 "), NaiveDate::from_ymd_opt(2024, 3, 1));
        assert_eq!(parse_date("03/01/2024"), None);
        assert_eq!(parse_date("2024-02-30"), None);
    }

    #[test]
    fn quiet_rerun_reuses_the_last_range() {
        let (console, captured) = Console::capture();
        let start = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 6, 9).unwrap();
        let command = ActivitiesForRange::with_range(console, start, end);
        let source = Canned::default();

        let retrieved = command.execute(&source, false).unwrap();
        assert_eq!(retrieved, Retrieved::Activities(Vec::new()));
        assert_eq!(*source.ranges.borrow(), vec![(start, end)]);
        assert!(captured.contents().is_empty());
    }

    #[test]
    fn quiet_run_without_a_range_does_not_prompt() {
        let (console, captured) = Console::capture();
        let source = Canned::default();
        let err = ActivitiesForRange::new(console).execute(&source, false).unwrap_err();
        assert!(err.to_string().contains("run R first"));
        assert!(source.ranges.borrow().is_empty());
        assert!(captured.contents().is_empty());
    }

    #[test]
    fn recent_and_last_return_activities() {
        let (console, captured) = Console::capture();
        let source = Canned::default();
        let recent = RecentActivities::new(10, console.clone()).execute(&source, false).unwrap();
        assert!(matches!(recent, Retrieved::Activities(ref a) if a.len() == 2));

        let last = LastActivity::new(console).execute(&source, true).unwrap();
        assert!(matches!(last, Retrieved::Activities(ref a) if a.len() == 1));
        assert!(captured.contents().contains("Activity 1"));
    }

    #[test]
    fn summary_prints_only_when_displayed() {
        let (console, captured) = Console::capture();
        let command = SummaryQuery::new("Devices:", |_| Endpoint::Devices, console);
        let source = Canned::default();
        assert_eq!(
            command.execute(&source, false).unwrap(),
            Retrieved::Data(json!("Devices"))
        );
        assert!(captured.contents().is_empty());
        command.execute(&source, true).unwrap();
        assert!(captured.contents().contains("Devices:"));
    }
}
