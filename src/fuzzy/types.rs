//! Fuzzy matcher core types
//!
//! Error type and match results shared by the fuzzy index and matcher set.

use serde::Serialize;
use thiserror::Error;

// ============================================================
// Constants
// ============================================================

/// Column header keyword above the destination column
pub const KEYWORD_DESTINATION: &str = "destination";

/// Column header keyword above the seats column
pub const KEYWORD_SEATS: &str = "seats";

/// Full month names, January first
pub const MONTHS_LONG: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

// ============================================================
// Error Types
// ============================================================

/// Fuzzy matcher error types
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FuzzyError {
    #[error("Keyword too short to match unambiguously: {keyword:?} (minimum {min_length})")]
    KeywordTooShort { keyword: String, min_length: usize },

    #[error("No fuzzy index trained for keyword {0:?}")]
    UnknownKeyword(String),
}

pub type Result<T> = std::result::Result<T, FuzzyError>;

// ============================================================
// Match Results
// ============================================================

/// A suggestion returned by a fuzzy index lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestion {
    /// Trained word that matched
    pub word: String,
    /// Levenshtein distance between the input and `word`
    pub distance: usize,
}

/// Closest OCR spelling of a label keyword
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpellingMatch {
    /// Token as it appears (lowercased) in the OCR text
    pub spelling: String,
    /// Edit distance from the keyword
    pub distance: usize,
}

/// A terminal mention found in OCR text
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocationMatch {
    /// Canonical terminal title
    pub title: String,
    /// Trained keyword the spelling matched
    pub keyword: String,
    /// Edit distance between the spelling and `keyword`
    pub distance: usize,
}

/// Outcome of training one terminal into the location matcher
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocationTraining {
    /// Keywords accepted into an index
    pub trained: Vec<String>,
    /// Keywords rejected as too short
    pub rejected: Vec<String>,
}
