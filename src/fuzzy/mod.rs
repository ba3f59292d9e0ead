//! Fuzzy keyword matching module
//!
//! Finds OCR spellings of column headers, month names and terminal names
//! despite the character-level errors OCR introduces.
//!
//! # Example
//!
//! ```rust
//! use slide_flights::config::ExtractionConfig;
//! use slide_flights::fuzzy::MatcherSet;
//!
//! let config = ExtractionConfig::default();
//! let mut matchers = MatcherSet::with_schedule_labels(&config);
//! matchers.train_location("Travis AFB", &[]);
//!
//! let found = matchers.closest_spelling("destination", "DESTINATON SEATS").unwrap();
//! assert_eq!(found.unwrap().distance, 1);
//!
//! let terminals = matchers.find_location_keywords("1430 TRAVlS AFB");
//! assert_eq!(terminals["travls afb"].title, "Travis AFB");
//! ```

mod index;
mod matcher;
mod types;

pub use index::FuzzyIndex;
pub use matcher::MatcherSet;
pub(crate) use matcher::tokenize;
pub use types::{
    FuzzyError, LocationMatch, LocationTraining, Result, SpellingMatch, Suggestion,
    KEYWORD_DESTINATION, KEYWORD_SEATS, MONTHS_LONG,
};
