// Elevation enrichment: fills `altitude_m` on every point of a merged trace
// from a remote elevation model, going through the on-disk cache first.
// Remote failures never abort the run; affected points get 0.

pub mod cache;
pub mod provider;

use anyhow::anyhow;
use indicatif::{ProgressBar, ProgressStyle};
use std::fmt;
use std::thread;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::ElevationConfig;
use crate::console::Console;
use crate::model::{MergedTrace, TrackPoint};
pub use cache::{CacheError, CachedElevation, ElevationCache};
pub use provider::{ElevationProvider, OpenTopoData};

/// Provider's documented cap on locations per request.
pub const MAX_BATCH_SIZE: usize = 100;

/// Datasets the public OpenTopoData instance serves.
pub const SUPPORTED_DATASETS: &[&str] = &[
    "aster30m",
    "emod2018",
    "etopo1",
    "eudem25m",
    "gebco2020",
    "mapzen",
    "ned10m",
    "nzdem8m",
    "srtm30m",
    "srtm90m",
];

#[derive(Error, Debug, PartialEq)]
pub enum EnrichError {
    #[error("unsupported elevation dataset '{dataset}', choose one of: {}", SUPPORTED_DATASETS.join(", "))]
    UnsupportedDataset { dataset: String },
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl From<&TrackPoint> for Coordinate {
    fn from(point: &TrackPoint) -> Self {
        Coordinate {
            latitude: point.latitude,
            longitude: point.longitude,
        }
    }
}

pub fn check_dataset(dataset: &str) -> Result<(), EnrichError> {
    if SUPPORTED_DATASETS.contains(&dataset) {
        Ok(())
    } else {
        Err(EnrichError::UnsupportedDataset {
            dataset: dataset.to_string(),
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct EnrichSettings {
    pub dataset: String,
    pub batch_size: usize,
    pub request_delay: Duration,
}

impl EnrichSettings {
    pub fn from_config(config: &ElevationConfig) -> Self {
        EnrichSettings {
            dataset: config.dataset.clone(),
            batch_size: config.batch_size,
            request_delay: Duration::from_millis(config.request_delay_ms),
        }
    }
}

/// Counters describing one enrichment run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EnrichmentReport {
    pub points: usize,
    pub invalid: usize,
    pub cache_hits: usize,
    pub queried: usize,
    pub zero_filled: usize,
    pub failed_batches: usize,
    pub remote_calls: usize,
}

impl fmt::Display for EnrichmentReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} points: {} from cache, {} looked up, {} set to 0 ({} invalid, {} failed batches)",
            self.points,
            self.cache_hits,
            self.queried,
            self.zero_filled + self.invalid,
            self.invalid,
            self.failed_batches
        )
    }
}

pub struct Enricher<'a> {
    provider: &'a dyn ElevationProvider,
    cache: &'a ElevationCache,
    settings: EnrichSettings,
    console: Console,
}

impl<'a> Enricher<'a> {
    pub fn new(
        provider: &'a dyn ElevationProvider,
        cache: &'a ElevationCache,
        mut settings: EnrichSettings,
        console: Console,
    ) -> Self {
        if settings.batch_size > MAX_BATCH_SIZE {
            warn!(
                requested = settings.batch_size,
                max = MAX_BATCH_SIZE,
                "batch size above provider limit, clamping"
            );
        }
        settings.batch_size = settings.batch_size.clamp(1, MAX_BATCH_SIZE);
        Enricher {
            provider,
            cache,
            settings,
            console,
        }
    }

    pub fn settings(&self) -> &EnrichSettings {
        &self.settings
    }

    /// Set `altitude_m` on every point of `trace`. Only an unsupported
    /// dataset is an error; everything else degrades to 0.
    pub fn enrich(&self, trace: &mut MergedTrace, display: bool) -> Result<EnrichmentReport, EnrichError> {
        let dataset = self.settings.dataset.as_str();
        check_dataset(dataset)?;

        let mut report = EnrichmentReport {
            points: trace.points().len(),
            ..Default::default()
        };
        let mut pending: Vec<(usize, Coordinate)> = Vec::new();

        for (idx, point) in trace.points_mut().iter_mut().enumerate() {
            if !point.has_valid_coordinates() {
                warn!(
                    index = idx,
                    latitude = point.latitude,
                    longitude = point.longitude,
                    "invalid coordinate, using elevation 0"
                );
                if display {
                    self.console.warn(&format!(
                        "Invalid coordinate ({}, {}) at index {}. Using 0.",
                        point.latitude, point.longitude, idx
                    ));
                }
                point.altitude_m = Some(0.0);
                report.invalid += 1;
                continue;
            }
            let at = Coordinate::from(&*point);
            match self.cache.get(dataset, at) {
                Ok(Some(cached)) => {
                    point.altitude_m = Some(cached.meters_or_zero());
                    report.cache_hits += 1;
                }
                Ok(None) => pending.push((idx, at)),
                Err(err) => {
                    warn!(index = idx, error = %err, "elevation cache read failed");
                    pending.push((idx, at));
                }
            }
        }

        let batch_count = pending.len().div_ceil(self.settings.batch_size);
        debug!(
            cached = report.cache_hits,
            pending = pending.len(),
            batches = batch_count,
            "elevation lookup plan"
        );
        let progress = if display && batch_count > 0 {
            let pb = ProgressBar::new(batch_count as u64);
            if let Ok(style) = ProgressStyle::with_template("{spinner} {msg} [{bar:30}] {pos}/{len}") {
                pb.set_style(style);
            }
            pb.set_message("Fetching elevation");
            pb
        } else {
            ProgressBar::hidden()
        };

        let points = trace.points_mut();
        for (batch_no, batch) in pending.chunks(self.settings.batch_size).enumerate() {
            if batch_no > 0 && !self.settings.request_delay.is_zero() {
                thread::sleep(self.settings.request_delay);
            }
            let locations: Vec<Coordinate> = batch.iter().map(|(_, at)| *at).collect();
            report.remote_calls += 1;
            let outcome = self
                .provider
                .lookup(dataset, &locations)
                .and_then(|values| {
                    if values.len() == locations.len() {
                        Ok(values)
                    } else {
                        Err(anyhow!(
                            "provider returned {} results for {} locations",
                            values.len(),
                            locations.len()
                        ))
                    }
                });

            match outcome {
                Ok(values) => {
                    for (&(idx, at), value) in batch.iter().zip(values) {
                        let cached = match value {
                            Some(meters) => {
                                report.queried += 1;
                                CachedElevation::Meters(meters)
                            }
                            None => {
                                warn!(
                                    index = idx,
                                    latitude = at.latitude,
                                    longitude = at.longitude,
                                    "no elevation for point, using 0"
                                );
                                report.zero_filled += 1;
                                CachedElevation::Failed
                            }
                        };
                        points[idx].altitude_m = Some(cached.meters_or_zero());
                        if let Err(err) = self.cache.put(dataset, at, cached) {
                            warn!(index = idx, error = %err, "elevation cache write failed");
                        }
                    }
                }
                Err(err) => {
                    warn!(batch = batch_no + 1, error = %format!("{:#}", err), "elevation batch failed");
                    if display {
                        progress.suspend(|| {
                            self.console.warn(&format!(
                                "Elevation batch {} failed ({:#}). Using 0 for its {} points.",
                                batch_no + 1,
                                err,
                                batch.len()
                            ))
                        });
                    }
                    for &(idx, _) in batch {
                        points[idx].altitude_m = Some(0.0);
                    }
                    report.failed_batches += 1;
                    report.zero_filled += batch.len();
                }
            }
            progress.inc(1);
        }
        progress.finish_and_clear();

        info!(%report, dataset, "elevation enrichment finished");
        Ok(report)
    }
}
