//! Extraction core types
//!
//! Detections found on a photograph's slides, stored per kind in an arena and
//! cross-linked by index.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::fuzzy::FuzzyError;
use crate::geometry::BoundingBox;
use crate::markup::MarkupError;
use crate::pipeline::RefineError;

// ============================================================
// Error Types
// ============================================================

/// Extraction error types
///
/// Only malformed input is an error. A keyword, date or time that cannot be
/// found is an empty result.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error(transparent)]
    Markup(#[from] MarkupError),

    #[error(transparent)]
    Fuzzy(#[from] FuzzyError),

    #[error("Non-numeric capture {capture:?} in {context}")]
    InvalidCapture {
        capture: String,
        context: &'static str,
    },

    #[error("Header crop failed: {0}")]
    Refine(#[from] RefineError),
}

pub type Result<T> = std::result::Result<T, ExtractError>;

// ============================================================
// Arena Ids
// ============================================================

/// Index of a destination in its photo's arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DestinationId(pub usize);

/// Index of a roll call in its photo's arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RollCallId(pub usize);

/// Index of a seats detection in its photo's arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SeatsId(pub usize);

// ============================================================
// Detections
// ============================================================

/// A candidate arrival terminal mention
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Destination {
    /// Canonical terminal title the spelling matched
    pub title: String,
    /// OCR spelling as found in the text
    pub spelling: String,
    /// Edit distance between `spelling` and the matched keyword
    pub spelling_distance: usize,
    pub bbox: BoundingBox,
    pub linked_roll_call: Option<RollCallId>,
    pub linked_seats: Option<SeatsId>,
}

impl Destination {
    pub fn new(
        title: impl Into<String>,
        spelling: impl Into<String>,
        spelling_distance: usize,
        bbox: BoundingBox,
    ) -> Self {
        Self {
            title: title.into(),
            spelling: spelling.into(),
            spelling_distance,
            bbox,
            linked_roll_call: None,
            linked_seats: None,
        }
    }
}

/// A candidate departure time located on the image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollCall {
    pub time: NaiveTime,
    pub bbox: BoundingBox,
    pub linked_seats: Option<SeatsId>,
}

impl RollCall {
    pub fn new(time: NaiveTime, bbox: BoundingBox) -> Self {
        Self {
            time,
            bbox,
            linked_seats: None,
        }
    }
}

/// A time found in the text whose position could not be recovered
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnplacedRollCall {
    pub time: NaiveTime,
    /// Slide the time was read from
    pub slide: String,
}

/// Seat release category printed next to a count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SeatType {
    /// `T`: tentative
    #[serde(rename = "T")]
    Tentative,
    /// `F`: firm
    #[serde(rename = "F")]
    Firm,
    /// `SA`: space available
    #[serde(rename = "SA")]
    SpaceAvailable,
    /// `TBD`: to be determined, no count
    #[serde(rename = "TBD")]
    ToBeDetermined,
}

impl SeatType {
    /// Parse the letter code printed after a seat count
    pub fn from_code(code: &str) -> Option<Self> {
        match code.to_ascii_uppercase().as_str() {
            "T" => Some(SeatType::Tentative),
            "F" => Some(SeatType::Firm),
            "SA" => Some(SeatType::SpaceAvailable),
            "TBD" => Some(SeatType::ToBeDetermined),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            SeatType::Tentative => "T",
            SeatType::Firm => "F",
            SeatType::SpaceAvailable => "SA",
            SeatType::ToBeDetermined => "TBD",
        }
    }
}

impl fmt::Display for SeatType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A candidate seat count and category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeatsAvailable {
    pub count: u32,
    pub seat_type: SeatType,
    pub bbox: BoundingBox,
}

impl SeatsAvailable {
    pub fn new(count: u32, seat_type: SeatType, bbox: BoundingBox) -> Self {
        Self {
            count,
            seat_type,
            bbox,
        }
    }
}

// ============================================================
// Per-Photo Arena
// ============================================================

/// Everything extracted from one photograph's slides
///
/// Links between detections are indexes into these vectors, which are never
/// reordered once linking starts.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Detections {
    pub destinations: Vec<Destination>,
    pub roll_calls: Vec<RollCall>,
    pub seats: Vec<SeatsAvailable>,
    pub unplaced_roll_calls: Vec<UnplacedRollCall>,
}

impl Detections {
    pub fn destination(&self, id: DestinationId) -> &Destination {
        &self.destinations[id.0]
    }

    pub fn roll_call(&self, id: RollCallId) -> &RollCall {
        &self.roll_calls[id.0]
    }

    pub fn seats(&self, id: SeatsId) -> &SeatsAvailable {
        &self.seats[id.0]
    }

    pub fn destination_ids(&self) -> impl Iterator<Item = DestinationId> {
        (0..self.destinations.len()).map(DestinationId)
    }

    pub fn roll_call_ids(&self) -> impl Iterator<Item = RollCallId> {
        (0..self.roll_calls.len()).map(RollCallId)
    }
}

/// Header date recovery outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HeaderDate {
    pub date: NaiveDate,
    /// Hours between the date (at midnight) and the photo time
    pub offset_hours: i64,
}
