// Remote elevation lookup. `OpenTopoData` speaks the public
// api.opentopodata.org protocol; tests plug in their own provider.

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::Coordinate;
use crate::config::ElevationConfig;

pub trait ElevationProvider {
    /// One elevation per location, in order; `None` where the dataset has
    /// no value. An `Err` fails the whole batch.
    fn lookup(&self, dataset: &str, locations: &[Coordinate]) -> Result<Vec<Option<f64>>>;
}

#[derive(Deserialize, Debug)]
struct LookupResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    results: Vec<LookupResult>,
}

#[derive(Deserialize, Debug)]
struct LookupResult {
    #[serde(default)]
    elevation: Option<f64>,
}

pub struct OpenTopoData {
    client: Client,
    base_url: String,
}

impl OpenTopoData {
    pub fn new(config: &ElevationConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(OpenTopoData {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
}

/// `lat,lon|lat,lon|...` as the provider expects.
pub fn encode_locations(locations: &[Coordinate]) -> String {
    locations
        .iter()
        .map(|c| format!("{},{}", c.latitude, c.longitude))
        .collect::<Vec<_>>()
        .join("|")
}

impl ElevationProvider for OpenTopoData {
    fn lookup(&self, dataset: &str, locations: &[Coordinate]) -> Result<Vec<Option<f64>>> {
        let url = format!("{}/{}", self.base_url, dataset);
        debug!(%url, count = locations.len(), "elevation request");
        let res = self
            .client
            .get(&url)
            .query(&[("locations", encode_locations(locations))])
            .send()
            .context("Failed to send elevation request")?;
        if !res.status().is_success() {
            let status = res.status();
            let txt = res.text().unwrap_or_else(|_| "".into());
            anyhow::bail!("Elevation lookup failed: {} - {}", status, txt);
        }
        let body: LookupResponse = res.json().context("Parsing elevation response json")?;
        if let Some(status) = body.status.as_deref().filter(|s| *s != "OK") {
            anyhow::bail!(
                "Elevation lookup returned status {}: {}",
                status,
                body.error.unwrap_or_default()
            );
        }
        Ok(body.results.into_iter().map(|r| r.elevation).collect())
    }
}
