//! Flight store
//!
//! A JSON file of flights. Each processed photo replaces its origin's flights
//! for the schedule day, without touching flights that already departed.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use thiserror::Error;
use tracing::{debug, info};

use crate::flight::Flight;

/// Store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Flight store I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt flight store: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Half-open time range `[start, end)` flights are deleted from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DeleteWindow {
    /// Window for replacing `day`'s flights at time `now`
    ///
    /// Today: from `now` to midnight. A future day: the whole day. A past
    /// day: `None`, since later photos omit flights that already left.
    pub fn for_day(day: NaiveDate, now: DateTime<Utc>) -> Option<Self> {
        let start_of_day = day.and_time(NaiveTime::MIN).and_utc();
        let end_of_day = start_of_day + Duration::days(1);
        let today = now.date_naive();

        if day == today {
            Some(Self {
                start: now,
                end: end_of_day,
            })
        } else if day > today {
            Some(Self {
                start: start_of_day,
                end: end_of_day,
            })
        } else {
            None
        }
    }

    /// Whether `flight` falls in the window
    ///
    /// A flight without a roll call counts as lying anywhere on its photo's
    /// day, so it is covered when the window overlaps that day.
    pub fn covers(&self, flight: &Flight) -> bool {
        match flight.roll_call {
            Some(time) => time >= self.start && time < self.end,
            None => {
                let day_start = flight.source_date.date_naive().and_time(NaiveTime::MIN).and_utc();
                let day_end = day_start + Duration::days(1);
                day_start < self.end && self.start < day_end
            }
        }
    }
}

/// Counts from one replace
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaceSummary {
    pub removed: usize,
    pub inserted: usize,
}

/// Flights persisted as a JSON array
#[derive(Debug)]
pub struct JsonFlightStore {
    path: PathBuf,
    flights: Vec<Flight>,
}

impl JsonFlightStore {
    /// Open the store at `path`; a missing file is an empty store
    pub fn open(path: &Path) -> Result<Self> {
        let flights = match fs::read_to_string(path) {
            Ok(content) if content.trim().is_empty() => Vec::new(),
            Ok(content) => serde_json::from_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(source) => {
                return Err(StoreError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        debug!("Opened flight store {} ({} flights)", path.display(), flights.len());
        Ok(Self {
            path: path.to_path_buf(),
            flights,
        })
    }

    pub fn flights(&self) -> &[Flight] {
        &self.flights
    }

    /// Flights departing from `origin`
    pub fn flights_from<'a>(&'a self, origin: &'a str) -> impl Iterator<Item = &'a Flight> + 'a {
        self.flights.iter().filter(move |f| f.origin == origin)
    }

    /// Delete `origin`'s flights in the window for `day`, then insert
    /// `flights`
    ///
    /// Flights identical to one already stored are not inserted twice.
    pub fn replace_for_day(
        &mut self,
        origin: &str,
        day: NaiveDate,
        now: DateTime<Utc>,
        flights: Vec<Flight>,
    ) -> ReplaceSummary {
        let before = self.flights.len();
        match DeleteWindow::for_day(day, now) {
            Some(window) => self
                .flights
                .retain(|f| f.origin != origin || !window.covers(f)),
            None => debug!("Not deleting past flights for {} on {}", origin, day),
        }
        let removed = before - self.flights.len();

        let mut inserted = 0;
        for flight in flights {
            if !self.flights.contains(&flight) {
                self.flights.push(flight);
                inserted += 1;
            }
        }

        info!(
            "{} {}: removed {} flights, inserted {}",
            origin, day, removed, inserted
        );
        ReplaceSummary { removed, inserted }
    }

    /// Write the store back to its file
    pub fn save(&self) -> Result<()> {
        let io_error = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        // written beside the target, then renamed over it
        let mut file = tempfile::NamedTempFile::new_in(dir).map_err(io_error)?;
        let json = serde_json::to_string_pretty(&self.flights)?;
        file.write_all(json.as_bytes()).map_err(io_error)?;
        file.persist(&self.path).map_err(|e| io_error(e.error))?;
        Ok(())
    }
}
