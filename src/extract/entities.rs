//! Raw detection extraction
//!
//! Scans every slide of a photo for column labels, terminal names and seat
//! counts, positions each hit using the slide's markup, and collapses the
//! duplicates the different slides produce.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use crate::config::ExtractionConfig;
use crate::fuzzy::MatcherSet;
use crate::geometry::BoundingBox;
use crate::markup::HocrDocument;
use crate::slide::{Slide, Terminal};

use super::dedup::dedup;
use super::types::{Destination, Result, SeatType, SeatsAvailable};

/// `14T`, `3 F`, `20 SA`
static SEAT_COUNT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b([0-9]{1,3})\s?(SA|T|F)\b").unwrap());

/// Seat count not yet released
static SEAT_TBD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bTBD\b").unwrap());

// ============================================================
// Labels
// ============================================================

/// Position of a column label keyword on the photo
///
/// The label is searched on every slide and positioned on the slide with the
/// closest spelling. `Ok(None)` when no slide has it.
pub fn find_label_bounds(
    keyword: &str,
    slides: &[Slide],
    matchers: &MatcherSet,
    config: &ExtractionConfig,
) -> Result<Option<BoundingBox>> {
    let Some((found, slide)) = matchers.closest_spelling_across_slides(keyword, slides)? else {
        debug!("Label {:?} not found on any slide", keyword);
        return Ok(None);
    };

    let document = HocrDocument::parse(&slide.markup)?;
    let bounds = document.text_bounds(&found.spelling, config.min_word_confidence);
    if bounds.is_empty() {
        debug!(
            "Label spelling {:?} not located in {}",
            found.spelling,
            slide.label()
        );
    }
    Ok(bounds.into_iter().next())
}

/// Topmost row that can hold schedule entries
///
/// Entries start at the destination label. A label found in the lower part
/// of the image is assumed misread, and the whole image is used.
pub fn extraction_limit(
    destination_label: Option<BoundingBox>,
    reference: &Slide,
    config: &ExtractionConfig,
) -> i32 {
    let top = reference.image_bounds.min_y;
    match destination_label {
        Some(label)
            if reference
                .is_within_height_ratio(label.min_y, config.destination_label_max_height_ratio) =>
        {
            label.min_y
        }
        Some(label) => {
            warn!(
                "Destination label at y={} is too low on {}, using image top",
                label.min_y,
                reference.label()
            );
            top
        }
        None => top,
    }
}

// ============================================================
// Destinations
// ============================================================

/// Terminal mentions on or below `limit_min_y`, deduplicated
pub fn extract_destinations(
    slides: &[Slide],
    limit_min_y: i32,
    matchers: &MatcherSet,
    config: &ExtractionConfig,
) -> Result<Vec<Destination>> {
    let mut found = Vec::new();

    for slide in slides {
        let document = HocrDocument::parse(&slide.markup)?;
        let mut matches: Vec<_> = matchers
            .find_location_keywords(&slide.plain_text)
            .into_iter()
            .collect();
        // stable order for the first-seen tie-break in dedup
        matches.sort_by(|a, b| a.0.cmp(&b.0));

        for (spelling, location) in matches {
            for bbox in document.text_bounds(&spelling, config.min_word_confidence) {
                if bbox.min_y < limit_min_y {
                    continue;
                }
                found.push(Destination::new(
                    location.title.clone(),
                    spelling.clone(),
                    location.distance,
                    bbox,
                ));
            }
        }
    }

    let destinations = dedup(&found, config);
    debug!(
        "{} destination candidates, {} after dedup",
        found.len(),
        destinations.len()
    );
    Ok(destinations)
}

/// Drop destinations naming the terminal the photo was taken at
pub fn remove_origin_destinations(destinations: Vec<Destination>, origin: &Terminal) -> Vec<Destination> {
    destinations
        .into_iter()
        .filter(|d| d.title != origin.title)
        .collect()
}

// ============================================================
// Seats
// ============================================================

/// Seat tokens in `text` with their literal spelling
pub fn seats_in_text(text: &str) -> Result<Vec<(String, u32, SeatType)>> {
    let mut seats = Vec::new();
    for caps in SEAT_COUNT_RE.captures_iter(text) {
        let Ok(count) = caps[1].parse::<u32>() else {
            debug!("Skipping unreadable seat count {:?}", &caps[1]);
            continue;
        };
        let Some(seat_type) = SeatType::from_code(&caps[2]) else {
            continue;
        };
        let literal = caps[0].split_whitespace().collect::<Vec<_>>().join(" ");
        seats.push((literal, count, seat_type));
    }
    for m in SEAT_TBD_RE.find_iter(text) {
        seats.push((m.as_str().to_string(), 0, SeatType::ToBeDetermined));
    }
    Ok(seats)
}

/// Whether a seat detection sits in the column under the seats label
///
/// The column is the label's x-range widened by the label's width on each
/// side.
fn in_seats_column(bbox: &BoundingBox, label: &BoundingBox) -> bool {
    let width = label.width();
    let column = BoundingBox::new(
        label.min_x - width,
        label.min_y,
        label.max_x + width,
        label.max_y,
    );
    bbox.min_y > label.min_y && bbox.overlaps_horizontally(&column)
}

/// Seat counts in the seats column, deduplicated
///
/// Without a seats label every seat token found is kept.
pub fn extract_seats(
    slides: &[Slide],
    seats_label: Option<BoundingBox>,
    config: &ExtractionConfig,
) -> Result<Vec<SeatsAvailable>> {
    let mut found = Vec::new();

    for slide in slides {
        let document = HocrDocument::parse(&slide.markup)?;
        for (literal, count, seat_type) in seats_in_text(&slide.plain_text)? {
            for bbox in document.text_bounds(&literal, config.min_word_confidence) {
                if seats_label.is_some_and(|label| !in_seats_column(&bbox, &label)) {
                    continue;
                }
                found.push(SeatsAvailable::new(count, seat_type, bbox));
            }
        }
    }

    Ok(dedup(&found, config))
}
