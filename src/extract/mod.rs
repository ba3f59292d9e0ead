//! Detection extraction module
//!
//! Turns a photo's OCR'd slides into positioned detections:
//!
//! - header date and row times (`date`)
//! - column labels, destinations and seat counts (`entities`)
//! - duplicate collapse across slides (`dedup`)

mod dedup;
mod date;
mod entities;
mod types;

pub use date::{
    closest_date, dates_in_text, extract_roll_calls, find_header_date, month_candidates,
    times_in_text, MonthCandidate,
};
pub use dedup::{dedup, Deduplicate};
pub use entities::{
    extract_destinations, extract_seats, extraction_limit, find_label_bounds,
    remove_origin_destinations, seats_in_text,
};
pub use types::{
    Destination, DestinationId, Detections, ExtractError, HeaderDate, Result, RollCall,
    RollCallId, SeatType, SeatsAvailable, SeatsId, UnplacedRollCall,
};
