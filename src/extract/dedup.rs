//! Duplicate detection collapse
//!
//! Every slide of a photo is scanned independently, so the same printed text
//! is usually found several times at nearly the same position. Collapsing
//! keeps one detection per position, preferring the better reading.

use crate::config::ExtractionConfig;
use crate::geometry::{overlap_ratio, same_horizontal_band, BoundingBox};

use super::types::{Destination, RollCall, SeatsAvailable};

/// A detection kind that can be collapsed by position
pub trait Deduplicate {
    fn bbox(&self) -> &BoundingBox;

    /// Whether two detections describe the same printed text
    ///
    /// Must be symmetric.
    fn is_duplicate_of(&self, other: &Self, config: &ExtractionConfig) -> bool {
        overlap_ratio(self.bbox(), other.bbox()) >= config.duplicate_overlap_threshold
    }

    /// Whether this candidate should replace an already kept duplicate
    fn preferred_over(&self, _kept: &Self) -> bool {
        false
    }
}

impl Deduplicate for Destination {
    fn bbox(&self) -> &BoundingBox {
        &self.bbox
    }

    /// Overlapping boxes, or fragments of one terminal name on the same row
    fn is_duplicate_of(&self, other: &Self, config: &ExtractionConfig) -> bool {
        overlap_ratio(&self.bbox, &other.bbox) >= config.duplicate_overlap_threshold
            || (self.title == other.title
                && same_horizontal_band(&self.bbox, &other.bbox, config.same_band_threshold))
    }

    fn preferred_over(&self, kept: &Self) -> bool {
        self.spelling_distance < kept.spelling_distance
    }
}

impl Deduplicate for RollCall {
    fn bbox(&self) -> &BoundingBox {
        &self.bbox
    }
}

impl Deduplicate for SeatsAvailable {
    fn bbox(&self) -> &BoundingBox {
        &self.bbox
    }

    /// A complete count beats a partially occluded one
    fn preferred_over(&self, kept: &Self) -> bool {
        (kept.count == 0 && self.count != 0) || self.count > kept.count
    }
}

/// Collapse duplicates into a fresh list, leaving `items` untouched
///
/// Survivors keep first-seen order. Passes repeat until one merges nothing,
/// so no two survivors are duplicates of each other and running the result
/// through again changes nothing.
pub fn dedup<T: Deduplicate + Clone>(items: &[T], config: &ExtractionConfig) -> Vec<T> {
    let mut current: Vec<T> = items.to_vec();

    loop {
        let before = current.len();
        let mut survivors: Vec<T> = Vec::with_capacity(before);

        for candidate in current {
            match survivors
                .iter()
                .position(|kept| candidate.is_duplicate_of(kept, config))
            {
                Some(index) => {
                    if candidate.preferred_over(&survivors[index]) {
                        survivors[index] = candidate;
                    }
                }
                None => survivors.push(candidate),
            }
        }

        let stable = survivors.len() == before;
        current = survivors;
        if stable {
            return current;
        }
    }
}
