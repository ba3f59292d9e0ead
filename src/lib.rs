//! # slide-flights
//!
//! Reconstructs flight schedules from noisy OCR of photographed passenger
//! terminal roll-call slides.
//!
//! Each photo is OCR'd as several image variants ("slides"). The extraction
//! core finds the header date, column labels, roll call times, destinations
//! and seat counts on those slides, collapses the duplicates the variants
//! produce, links detections sharing a schedule row, and assembles flights.
//!
//! ## Modules
//!
//! | Module | Role |
//! |--------|------|
//! | [`geometry`] | Bounding boxes, vertical distance, overlap |
//! | [`fuzzy`] | OCR-tolerant keyword and terminal name matching |
//! | [`markup`] | hOCR parsing and text location |
//! | [`extract`] | Dates, times, labels, destinations, seats, dedup |
//! | [`link`] | Row linking between detections |
//! | [`grouping`] | Merging destinations that share a roll call |
//! | [`flight`] | Flight assembly |
//! | [`pipeline`] | Per-photo control flow |
//! | [`batch`] | Worker pool over many photos |
//! | [`store`] | JSON flight store |
//!
//! ## Example
//!
//! ```rust,no_run
//! use slide_flights::{process_photo, ExtractionConfig, NoRefiner, Slide, TerminalCatalog};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ExtractionConfig::default();
//! let catalog = TerminalCatalog::from_file("catalog.json".as_ref())?;
//! let matchers = catalog.build_matchers(&config);
//!
//! let slides: Vec<Slide> = serde_json::from_str(&std::fs::read_to_string("slides.json")?)?;
//! let report = process_photo(&slides, &matchers, &NoRefiner, &config)?;
//! for flight in &report.flights {
//!     println!("{} -> {} at {:?}", flight.origin, flight.destination, flight.roll_call);
//! }
//! # Ok(())
//! # }
//! ```

pub mod batch;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod extract;
pub mod flight;
pub mod fuzzy;
pub mod geometry;
pub mod grouping;
pub mod imaging;
pub mod link;
pub mod markup;
pub mod ocr;
pub mod pipeline;
pub mod slide;
pub mod store;

pub use batch::{BatchOutcome, BatchRunner, Manifest, PhotoJob, RunStatistics};
pub use catalog::{TerminalCatalog, TerminalEntry};
pub use config::ExtractionConfig;
pub use extract::{Destination, Detections, RollCall, SeatType, SeatsAvailable};
pub use flight::Flight;
pub use fuzzy::MatcherSet;
pub use geometry::BoundingBox;
pub use grouping::Grouping;
pub use ocr::{OcrEngine, TesseractCli};
pub use pipeline::{process_photo, NoRefiner, OcrRefiner, PhotoReport, SlideRefiner};
pub use slide::{PhotoSource, Slide, SlideVariant, Terminal};
pub use store::JsonFlightStore;
