// Built-in commands and the startup registration list that puts them in
// the registry.

pub mod merge_gps;
pub mod retrieval;
pub mod select;
pub mod session;
pub mod visualize;

use anyhow::Result;
use chrono::NaiveDate;

use crate::api::Endpoint;
use crate::config::Config;
use crate::console::Console;
use crate::elevation::OpenTopoData;
use crate::registry::{Action, PluginDescriptor, Registry};

use merge_gps::MergeGpsData;
use retrieval::{ActivitiesForRange, LastActivity, RecentActivities, SummaryQuery};
use select::SelectActivities;
use session::ShowSession;
use visualize::{FlatMap, TerrainMap};

fn summary(title: &'static str, query: fn(NaiveDate) -> Endpoint, console: &Console) -> Action {
    Action::Retrieval(Box::new(SummaryQuery::new(title, query, console.clone())))
}

/// Every command the menu offers. Selector clashes fail here, at startup.
pub fn builtin(config: &Config, console: &Console) -> Result<Registry> {
    let c = console;
    let provider = OpenTopoData::new(&config.elevation)?;
    let output_dir = config.output.dir.clone();

    let entries: Vec<(&str, &str, Action)> = vec![
        ("1", "Get full name", summary("Full Name:", |_| Endpoint::FullName, c)),
        ("2", "Get unit system", summary("Unit System:", |_| Endpoint::UnitSystem, c)),
        ("3", "Get user summary for today", summary("User Summary:", Endpoint::DailySummary, c)),
        (
            "4",
            "Get body composition for today",
            summary("Body Composition:", Endpoint::BodyComposition, c),
        ),
        (
            "5",
            "Get last 10 activities",
            Action::Retrieval(Box::new(RecentActivities::new(10, c.clone()))),
        ),
        (
            "6",
            "Get last activity",
            Action::Retrieval(Box::new(LastActivity::new(c.clone()))),
        ),
        ("7", "Get devices", summary("Devices:", |_| Endpoint::Devices, c)),
        ("8", "Get active goals", summary("Active Goals:", |_| Endpoint::ActiveGoals, c)),
        ("9", "Get HRV data for today", summary("HRV Data:", Endpoint::Hrv, c)),
        (
            "R",
            "Get activities for a date range",
            Action::Retrieval(Box::new(ActivitiesForRange::new(c.clone()))),
        ),
        (
            "M",
            "Select activities to merge",
            Action::Processing(Box::new(SelectActivities::new(c.clone()))),
        ),
        (
            "G",
            "Merge GPS data from selected activities",
            Action::SecondaryProcessing(Box::new(MergeGpsData::new(c.clone()))),
        ),
        (
            "S",
            "Show session state",
            Action::Generic(Box::new(ShowSession::new(c.clone()))),
        ),
        (
            "v",
            "Render merged track on a map",
            Action::Visualization(Box::new(FlatMap::new(output_dir.clone(), c.clone()))),
        ),
        (
            "V3D",
            "Render merged track in 3D with elevation",
            Action::Visualization(Box::new(TerrainMap::new(
                Box::new(provider),
                config.elevation.clone(),
                output_dir,
                c.clone(),
            ))),
        ),
    ];

    let mut registry = Registry::new();
    for (selector, label, action) in entries {
        registry.register(PluginDescriptor::new(selector, label, action)?)?;
    }
    Ok(registry)
}
