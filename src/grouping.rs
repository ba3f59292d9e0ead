//! Destination grouping
//!
//! A schedule row often lists several arrival terminals under one roll call
//! time, with the time printed next to only one of them. Destinations without
//! their own roll call are merged into the nearest group until every group has
//! one.

use serde::Serialize;
use tracing::debug;

use crate::extract::{Destination, DestinationId, Detections, RollCallId};
use crate::geometry::{vertical_distance, BoundingBox};

/// Destinations believed to share one flight
///
/// Never empty: a grouping starts from one destination and only grows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Grouping {
    destinations: Vec<DestinationId>,
    anchor: Option<RollCallId>,
    bbox: BoundingBox,
}

impl Grouping {
    /// Grouping holding a single destination, anchored by its roll call
    pub fn new(id: DestinationId, destination: &Destination) -> Self {
        Self {
            destinations: vec![id],
            anchor: destination.linked_roll_call,
            bbox: destination.bbox,
        }
    }

    pub fn destinations(&self) -> &[DestinationId] {
        &self.destinations
    }

    pub fn anchor(&self) -> Option<RollCallId> {
        self.anchor
    }

    /// Union of the member destinations' boxes
    pub fn bbox(&self) -> &BoundingBox {
        &self.bbox
    }

    pub fn is_anchored(&self) -> bool {
        self.anchor.is_some()
    }

    /// Take over every destination of `other`, and its anchor if this
    /// grouping has none
    pub fn absorb(&mut self, other: Grouping) {
        self.destinations.extend(other.destinations);
        self.bbox = self.bbox.union(&other.bbox);
        if self.anchor.is_none() {
            self.anchor = other.anchor;
        }
    }
}

/// Result of a merge pass
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergeOutcome {
    pub groupings: Vec<Grouping>,
    /// Number of absorb steps performed
    pub merges: usize,
}

/// One grouping per destination
pub fn initial_groupings(detections: &Detections) -> Vec<Grouping> {
    detections
        .destination_ids()
        .map(|id| Grouping::new(id, detections.destination(id)))
        .collect()
}

/// Merge unanchored groupings into their nearest neighbours
///
/// Scanning in order, an unanchored grouping absorbs the nearest remaining
/// grouping (by vertical distance between union boxes, lowest index on ties)
/// until it gains an anchor or nothing is left to absorb. Absorbed groupings
/// are tombstoned and the survivors compacted at the end, keeping their
/// relative order. Each merge removes one grouping, so there are fewer merges
/// than input groupings.
pub fn merge_groupings(groupings: Vec<Grouping>) -> MergeOutcome {
    let mut slots: Vec<Option<Grouping>> = groupings.into_iter().map(Some).collect();
    let mut merges = 0;

    for i in 0..slots.len() {
        loop {
            let Some(current) = slots[i].as_ref() else {
                break;
            };
            if current.is_anchored() {
                break;
            }

            let nearest = slots
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .filter_map(|(j, slot)| {
                    slot.as_ref()
                        .map(|other| (j, vertical_distance(current.bbox(), other.bbox())))
                })
                .min_by_key(|(j, distance)| (*distance, *j));

            let Some((j, distance)) = nearest else {
                break;
            };
            let Some(absorbed) = slots[j].take() else {
                break;
            };
            debug!(
                "Grouping {} absorbs grouping {} (distance {}, anchored: {})",
                i,
                j,
                distance,
                absorbed.is_anchored()
            );
            if let Some(target) = slots[i].as_mut() {
                target.absorb(absorbed);
                merges += 1;
            }
        }
    }

    MergeOutcome {
        groupings: slots.into_iter().flatten().collect(),
        merges,
    }
}
