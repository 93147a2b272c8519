// API client module: a small blocking HTTP client for the tracker's
// connect API, plus the `ActivitySource` trait the rest of the crate codes
// against so tests can substitute canned data.

use crate::config::ConnectConfig;
use crate::model::{ActivityId, ActivityRecord};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use reqwest::blocking::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Page size used when walking a date range.
const RANGE_PAGE_SIZE: usize = 20;

/// Read-only summary endpoints exposed by the tracker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Endpoint {
    FullName,
    UnitSystem,
    DailySummary(NaiveDate),
    BodyComposition(NaiveDate),
    Devices,
    ActiveGoals,
    Hrv(NaiveDate),
}

/// Where activity data comes from. The tracker's payloads are passed
/// through as JSON; only the merge stage looks inside them.
pub trait ActivitySource {
    /// Most recent activities, newest first.
    fn activities(&self, start: usize, limit: usize) -> Result<Vec<ActivityRecord>>;

    /// Activities whose start date falls in `[start, end]`.
    fn activities_by_date(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<ActivityRecord>>;

    /// Full activity detail, including `geoPolylineDTO` when GPS was recorded.
    fn activity_details(&self, activity_id: &ActivityId) -> Result<Value>;

    fn summary(&self, endpoint: Endpoint) -> Result<Value>;

    fn last_activity(&self) -> Result<Option<ActivityRecord>> {
        Ok(self.activities(0, 1)?.into_iter().next())
    }
}

/// Blocking client holding the bearer token for one session.
#[derive(Clone)]
pub struct ConnectClient {
    client: Client,
    base_url: String,
    token: String,
}

impl ConnectClient {
    pub fn new(config: &ConnectConfig, token: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .user_agent(concat!("garmin-trail/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(ConnectClient {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: token.trim().to_string(),
        })
    }

    /// GET a JSON document, failing with the server's body on a non-success
    /// status.
    fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, ?query, "connect request");
        let res = self
            .client
            .get(&url)
            .query(query)
            .bearer_auth(&self.token)
            .send()
            .with_context(|| format!("Failed to send request to {}", path))?;
        if !res.status().is_success() {
            let status = res.status();
            let txt = res.text().unwrap_or_else(|_| "".into());
            anyhow::bail!("Request {} failed: {} - {}", path, status, txt);
        }
        if res.content_length() == Some(0) {
            return Ok(Value::Null);
        }
        res.json()
            .with_context(|| format!("Parsing response json from {}", path))
    }

    fn social_profile(&self) -> Result<Value> {
        self.get_json("/userprofile-service/socialProfile", &[])
    }

    fn display_name(&self) -> Result<String> {
        let profile = self.social_profile()?;
        profile
            .get("displayName")
            .and_then(Value::as_str)
            .map(str::to_string)
            .context("Profile has no displayName")
    }
}

fn into_records(value: Value) -> Vec<ActivityRecord> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(ActivityRecord::from_value)
            .collect(),
        _ => Vec::new(),
    }
}

impl ActivitySource for ConnectClient {
    fn activities(&self, start: usize, limit: usize) -> Result<Vec<ActivityRecord>> {
        let query = [("start", start.to_string()), ("limit", limit.to_string())];
        let value = self.get_json(
            "/activitylist-service/activities/search/activities",
            &query,
        )?;
        Ok(into_records(value))
    }

    fn activities_by_date(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<ActivityRecord>> {
        let mut all = Vec::new();
        let mut offset = 0;
        loop {
            let query = [
                ("startDate", start.to_string()),
                ("endDate", end.to_string()),
                ("start", offset.to_string()),
                ("limit", RANGE_PAGE_SIZE.to_string()),
            ];
            let page = into_records(self.get_json(
                "/activitylist-service/activities/search/activities",
                &query,
            )?);
            let len = page.len();
            all.extend(page);
            if len < RANGE_PAGE_SIZE {
                break;
            }
            offset += len;
        }
        Ok(all)
    }

    fn activity_details(&self, activity_id: &ActivityId) -> Result<Value> {
        let path = format!("/activity-service/activity/{}/details", activity_id);
        let query = [
            ("maxChartSize", "2000".to_string()),
            ("maxPolylineSize", "4000".to_string()),
        ];
        self.get_json(&path, &query)
    }

    fn summary(&self, endpoint: Endpoint) -> Result<Value> {
        match endpoint {
            Endpoint::FullName => Ok(self
                .social_profile()?
                .get("fullName")
                .cloned()
                .unwrap_or(Value::Null)),
            Endpoint::UnitSystem => {
                let settings =
                    self.get_json("/userprofile-service/userprofile/user-settings", &[])?;
                Ok(settings
                    .pointer("/userData/measurementSystem")
                    .cloned()
                    .unwrap_or(Value::Null))
            }
            Endpoint::DailySummary(date) => {
                let path = format!(
                    "/usersummary-service/usersummary/daily/{}",
                    self.display_name()?
                );
                self.get_json(&path, &[("calendarDate", date.to_string())])
            }
            Endpoint::BodyComposition(date) => self.get_json(
                "/weight-service/weight/dateRange",
                &[("startDate", date.to_string()), ("endDate", date.to_string())],
            ),
            Endpoint::Devices => {
                self.get_json("/device-service/deviceregistration/devices", &[])
            }
            Endpoint::ActiveGoals => self.get_json(
                "/goal-service/goal/goals",
                &[("status", "active".to_string())],
            ),
            Endpoint::Hrv(date) => self.get_json(&format!("/hrv-service/hrv/{}", date), &[]),
        }
    }
}
