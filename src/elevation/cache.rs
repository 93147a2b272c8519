// Persistent elevation cache. One SQLite row per quantized coordinate and
// dataset; a NULL elevation records a lookup the provider could not answer.

use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use thiserror::Error;
use tracing::info;

use super::Coordinate;

/// Coordinates are stored in units of 1e-5 degree (about a metre).
const QUANTUM: f64 = 1e5;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("cache database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("failed to create cache directory: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CachedElevation {
    Meters(f64),
    /// The provider had no value for this point last time.
    Failed,
}

impl CachedElevation {
    pub fn meters_or_zero(self) -> f64 {
        match self {
            CachedElevation::Meters(m) => m,
            CachedElevation::Failed => 0.0,
        }
    }
}

pub struct ElevationCache {
    conn: Connection,
}

fn quantize(value: f64) -> i64 {
    (value * QUANTUM).round() as i64
}

impl ElevationCache {
    /// Open or create the cache file, creating parent directories as needed.
    pub fn open(path: &Path) -> Result<Self, CacheError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        info!("Opening elevation cache at {:?}", path);
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self, CacheError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, CacheError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS elevations (
                dataset TEXT NOT NULL,
                lat_q INTEGER NOT NULL,
                lon_q INTEGER NOT NULL,
                elevation REAL,
                PRIMARY KEY (dataset, lat_q, lon_q)
            );",
        )?;
        Ok(ElevationCache { conn })
    }

    pub fn get(&self, dataset: &str, at: Coordinate) -> Result<Option<CachedElevation>, CacheError> {
        let row: Option<Option<f64>> = self
            .conn
            .query_row(
                "SELECT elevation FROM elevations WHERE dataset = ?1 AND lat_q = ?2 AND lon_q = ?3",
                params![dataset, quantize(at.latitude), quantize(at.longitude)],
                |row| row.get(0),
            )
            .optional()?;
        Ok(row.map(|elevation| match elevation {
            Some(m) => CachedElevation::Meters(m),
            None => CachedElevation::Failed,
        }))
    }

    pub fn put(&self, dataset: &str, at: Coordinate, value: CachedElevation) -> Result<(), CacheError> {
        let elevation = match value {
            CachedElevation::Meters(m) => Some(m),
            CachedElevation::Failed => None,
        };
        self.conn.execute(
            "INSERT INTO elevations (dataset, lat_q, lon_q, elevation) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (dataset, lat_q, lon_q) DO UPDATE SET elevation = excluded.elevation",
            params![dataset, quantize(at.latitude), quantize(at.longitude), elevation],
        )?;
        Ok(())
    }

    pub fn len(&self) -> Result<usize, CacheError> {
        let count: i64 = self
            .conn
            .query_row("SELECT count(*) FROM elevations", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn is_empty(&self) -> Result<bool, CacheError> {
        Ok(self.len()? == 0)
    }
}
