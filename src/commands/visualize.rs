// Visualization commands: write the merged trace out as a map.

use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::warn;

use crate::config::ElevationConfig;
use crate::console::Console;
use crate::elevation::{check_dataset, ElevationCache, ElevationProvider, EnrichSettings, Enricher};
use crate::model::MergedTrace;
use crate::registry::VisualizationCommand;
use crate::render::{write_map, MapStyle};

pub struct FlatMap {
    output_dir: PathBuf,
    console: Console,
}

impl FlatMap {
    pub fn new(output_dir: PathBuf, console: Console) -> Self {
        FlatMap { output_dir, console }
    }
}

impl VisualizationCommand for FlatMap {
    fn execute(&self, trace: &mut MergedTrace, display: bool) -> Result<PathBuf> {
        let path = write_map(trace, MapStyle::Flat, &self.output_dir)?;
        if display {
            self.console.success(&format!(
                "Map has been created and saved to {}",
                path.display()
            ));
        }
        Ok(path)
    }
}

/// 3D map; fills in elevation first. The enriched altitudes stay on the
/// session's trace.
pub struct TerrainMap {
    provider: Box<dyn ElevationProvider>,
    elevation: ElevationConfig,
    output_dir: PathBuf,
    console: Console,
}

impl TerrainMap {
    pub fn new(
        provider: Box<dyn ElevationProvider>,
        elevation: ElevationConfig,
        output_dir: PathBuf,
        console: Console,
    ) -> Self {
        TerrainMap {
            provider,
            elevation,
            output_dir,
            console,
        }
    }
}

impl VisualizationCommand for TerrainMap {
    fn execute(&self, trace: &mut MergedTrace, display: bool) -> Result<PathBuf> {
        let settings = EnrichSettings::from_config(&self.elevation);
        check_dataset(&settings.dataset)?;
        let cache = match ElevationCache::open(&self.elevation.cache_path) {
            Ok(cache) => cache,
            Err(err) => {
                warn!(
                    path = %self.elevation.cache_path.display(),
                    error = %err,
                    "elevation cache unavailable, using an in-memory cache"
                );
                if display {
                    self.console.warn(&format!(
                        "Could not open elevation cache {} ({}). Results will not be kept.",
                        self.elevation.cache_path.display(),
                        err
                    ));
                }
                ElevationCache::open_in_memory().context("Failed to open in-memory elevation cache")?
            }
        };

        if display {
            self.console.info(&format!(
                "Fetching elevation data ({})...",
                settings.dataset
            ));
        }
        let enricher = Enricher::new(self.provider.as_ref(), &cache, settings, self.console.clone());
        let report = enricher.enrich(trace, display)?;
        if display {
            self.console.dim(&report.to_string());
        }

        let path = write_map(trace, MapStyle::Terrain, &self.output_dir)?;
        if display {
            self.console.success(&format!(
                "3D map has been created and saved to {}",
                path.display()
            ));
        }
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elevation::Coordinate;
    use crate::model::{ActivityId, TrackPoint};

    struct Flat;

    impl ElevationProvider for Flat {
        fn lookup(&self, _dataset: &str, locations: &[Coordinate]) -> Result<Vec<Option<f64>>> {
            Ok(vec![Some(250.0); locations.len()])
        }
    }

    fn trace() -> MergedTrace {
        let points = (0..4).map(|i| TrackPoint::new(46.0 + i as f64 * 0.001, 7.0, i * 1000)).collect();
        MergedTrace::new(points, vec![ActivityId::new("1")], Vec::new(), vec![0])
    }

    #[test]
    fn unusable_cache_falls_back_to_memory() {
        let dir = tempfile::tempdir().unwrap();
        // A regular file where the cache directory should be.
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "x").unwrap();
        let elevation = ElevationConfig {
            cache_path: blocker.join("elevation_cache.db"),
            request_delay_ms: 0,
            ..ElevationConfig::default()
        };
        let (console, captured) = Console::capture();
        let command = TerrainMap::new(Box::new(Flat), elevation, dir.path().join("maps"), console);

        let mut trace = trace();
        let path = command.execute(&mut trace, true).unwrap();

        assert!(path.ends_with("merged_map_3d.html"));
        assert!(trace.points().iter().all(|p| p.altitude_m == Some(250.0)));
        assert!(captured.contents().contains("Could not open elevation cache"));
    }
}
