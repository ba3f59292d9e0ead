//! Batch processing
//!
//! Runs the per-photo pipeline over every photo of a manifest on a bounded
//! worker pool. A failing photo is logged and counted; it never stops the
//! other photos or terminals.

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use indicatif::ProgressBar;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::catalog::TerminalCatalog;
use crate::config::ExtractionConfig;
use crate::fuzzy::MatcherSet;
use crate::imaging::load_photo;
use crate::ocr::OcrEngine;
use crate::pipeline::{self, process_photo, OcrRefiner, PhotoReport, RefineError};
use crate::slide::{PhotoSource, Terminal};

// ============================================================
// Error Types
// ============================================================

/// Batch setup errors
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("Failed to read manifest {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid manifest JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Manifest references unknown terminal {0:?}")]
    UnknownTerminal(String),

    #[error("Failed to build worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

pub type Result<T> = std::result::Result<T, BatchError>;

// ============================================================
// Manifest
// ============================================================

/// One photo listed in a manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Catalog id of the terminal the photo was taken at
    pub terminal: String,
    pub id: String,
    pub created_at: DateTime<Utc>,
    /// Image path, relative to the manifest file
    pub path: PathBuf,
}

/// Photos to process in one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub photos: Vec<ManifestEntry>,
}

impl Manifest {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| BatchError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Resolve terminals against `catalog` and image paths against `base_dir`
    pub fn jobs(&self, catalog: &TerminalCatalog, base_dir: &Path) -> Result<Vec<PhotoJob>> {
        self.photos
            .iter()
            .map(|entry| {
                let terminal = catalog
                    .find_by_id(&entry.terminal)
                    .ok_or_else(|| BatchError::UnknownTerminal(entry.terminal.clone()))?
                    .terminal();
                Ok(PhotoJob {
                    terminal,
                    photo: PhotoSource {
                        id: entry.id.clone(),
                        created_at: entry.created_at,
                    },
                    path: base_dir.join(&entry.path),
                })
            })
            .collect()
    }
}

/// A photo ready to process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoJob {
    pub terminal: Terminal,
    pub photo: PhotoSource,
    pub path: PathBuf,
}

/// Load, OCR and process one photo file
pub fn process_photo_file(
    job: &PhotoJob,
    engine: &dyn OcrEngine,
    matchers: &MatcherSet,
    config: &ExtractionConfig,
) -> pipeline::Result<PhotoReport> {
    let image = load_photo(&job.path).map_err(RefineError::from)?;
    let refiner = OcrRefiner::new(&image, engine);
    let slides = refiner.slides(&job.terminal, &job.photo)?;
    process_photo(&slides, matchers, &refiner, config)
}

// ============================================================
// Statistics
// ============================================================

/// Counters reported at the end of a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunStatistics {
    pub terminals: usize,
    pub terminals_without_errors: usize,
    pub terminals_with_flights: usize,
    pub photos_found: usize,
    /// Older than the configured age limit
    pub photos_skipped: usize,
    pub photos_processed: usize,
    pub photos_with_date_header: usize,
    pub photos_failed: usize,
    pub flights_found: usize,
}

impl fmt::Display for RunStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Terminals: {}", self.terminals)?;
        writeln!(f, "Terminals w/ no errors: {}", self.terminals_without_errors)?;
        writeln!(f, "Terminals w/ found flights: {}", self.terminals_with_flights)?;
        writeln!(f, "Photos found: {}", self.photos_found)?;
        writeln!(f, "Photos skipped (too old): {}", self.photos_skipped)?;
        writeln!(f, "Photos processed: {}", self.photos_processed)?;
        writeln!(f, "Photos w/ date header: {}", self.photos_with_date_header)?;
        writeln!(f, "Photos failed: {}", self.photos_failed)?;
        write!(f, "Flights found: {}", self.flights_found)
    }
}

/// A photo that could not be processed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhotoFailure {
    pub terminal: String,
    pub photo: String,
    pub message: String,
}

/// Result of a batch run
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchOutcome {
    pub reports: Vec<PhotoReport>,
    pub failures: Vec<PhotoFailure>,
    pub statistics: RunStatistics,
}

// ============================================================
// Runner
// ============================================================

/// Bounded worker pool over photos
pub struct BatchRunner {
    pool: rayon::ThreadPool,
    max_photo_age: Duration,
}

impl BatchRunner {
    /// Pool with one worker per CPU unless `threads` is given
    pub fn new(config: &ExtractionConfig, threads: Option<usize>) -> Result<Self> {
        let threads = threads.unwrap_or_else(num_cpus::get).max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("photo-worker-{i}"))
            .build()?;
        info!("Processing photos on {} workers", threads);
        Ok(Self {
            pool,
            max_photo_age: Duration::hours(config.max_photo_age_hours),
        })
    }

    pub fn num_threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Whether a photo taken at `created_at` is recent enough to process
    pub fn is_current(&self, created_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now - created_at <= self.max_photo_age
    }

    /// Process every current photo with `process`
    ///
    /// Reports come back in job order.
    pub fn run<F>(
        &self,
        jobs: &[PhotoJob],
        now: DateTime<Utc>,
        progress: &ProgressBar,
        process: F,
    ) -> BatchOutcome
    where
        F: Fn(&PhotoJob) -> pipeline::Result<PhotoReport> + Sync,
    {
        let mut statistics = RunStatistics {
            photos_found: jobs.len(),
            ..Default::default()
        };

        let (current, stale): (Vec<&PhotoJob>, Vec<&PhotoJob>) = jobs
            .iter()
            .partition(|job| self.is_current(job.photo.created_at, now));
        for job in &stale {
            warn!(
                "Skipping {} {}: taken {}",
                job.terminal.title, job.photo.id, job.photo.created_at
            );
        }
        statistics.photos_skipped = stale.len();

        progress.set_length(current.len() as u64);
        let results: Vec<(&PhotoJob, pipeline::Result<PhotoReport>)> = self.pool.install(|| {
            current
                .par_iter()
                .map(|job| {
                    let result = process(*job);
                    progress.inc(1);
                    (*job, result)
                })
                .collect()
        });
        progress.finish_and_clear();

        let mut outcome = BatchOutcome::default();
        let mut terminals = HashSet::new();
        let mut failed_terminals = HashSet::new();
        let mut terminals_with_flights = HashSet::new();

        for (job, result) in results {
            terminals.insert(job.terminal.id.clone());
            match result {
                Ok(report) => {
                    statistics.photos_processed += 1;
                    statistics.photos_with_date_header += usize::from(report.header_date.is_some());
                    statistics.flights_found += report.flights.len();
                    if !report.flights.is_empty() {
                        terminals_with_flights.insert(job.terminal.id.clone());
                    }
                    outcome.reports.push(report);
                }
                Err(e) => {
                    error!("{} {}: {}", job.terminal.title, job.photo.id, e);
                    statistics.photos_failed += 1;
                    failed_terminals.insert(job.terminal.id.clone());
                    outcome.failures.push(PhotoFailure {
                        terminal: job.terminal.title.clone(),
                        photo: job.photo.id.clone(),
                        message: e.to_string(),
                    });
                }
            }
        }

        for job in &stale {
            terminals.insert(job.terminal.id.clone());
        }
        statistics.terminals = terminals.len();
        statistics.terminals_without_errors = terminals.difference(&failed_terminals).count();
        statistics.terminals_with_flights = terminals_with_flights.len();

        outcome.statistics = statistics;
        outcome
    }
}
