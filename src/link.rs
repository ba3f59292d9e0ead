//! Geometric linking
//!
//! Associates detections that sit on the same schedule row:
//!
//! - roll calls claim the nearest destination, with contested claims going
//!   to the closer roll call
//! - seat counts attach to the first roll call and destination they overlap
//!   vertically

use std::collections::VecDeque;

use tracing::debug;

use crate::config::ExtractionConfig;
use crate::extract::{DestinationId, Detections, RollCallId, SeatsId};
use crate::geometry::vertical_distance;

/// Link every roll call to at most one destination
///
/// Each roll call ranks the destinations within `max_distance` by vertical
/// distance and claims its nearest. A roll call strictly closer to an already
/// claimed destination takes it over, and the displaced roll call resumes
/// from its next candidate. Every takeover removes one candidate from one
/// list, so the walk terminates.
///
/// Returns the number of linked destinations.
pub fn link_roll_calls_to_destinations(detections: &mut Detections, max_distance: i32) -> usize {
    let mut candidates: Vec<VecDeque<(DestinationId, i32)>> = detections
        .roll_calls
        .iter()
        .map(|rc| {
            let mut near: Vec<(DestinationId, i32)> = detections
                .destinations
                .iter()
                .enumerate()
                .map(|(i, d)| (DestinationId(i), vertical_distance(&rc.bbox, &d.bbox)))
                .filter(|(_, distance)| *distance <= max_distance)
                .collect();
            near.sort_by_key(|(_, distance)| *distance);
            near.into()
        })
        .collect();

    let mut claimed_by: Vec<Option<RollCallId>> = vec![None; detections.destinations.len()];

    for start in detections.roll_call_ids() {
        let mut pending = vec![start];

        while let Some(rc) = pending.pop() {
            while let Some(&(dest, distance)) = candidates[rc.0].front() {
                let Some(holder) = claimed_by[dest.0] else {
                    claimed_by[dest.0] = Some(rc);
                    break;
                };

                let holder_distance = vertical_distance(
                    &detections.roll_calls[holder.0].bbox,
                    &detections.destinations[dest.0].bbox,
                );
                if distance < holder_distance {
                    debug!(
                        "Roll call {} takes destination {} from roll call {} ({} < {})",
                        rc.0, dest.0, holder.0, distance, holder_distance
                    );
                    claimed_by[dest.0] = Some(rc);
                    candidates[holder.0].retain(|(d, _)| *d != dest);
                    pending.push(holder);
                    break;
                }
                candidates[rc.0].pop_front();
            }
        }
    }

    let mut linked = 0;
    for (dest, claim) in detections.destinations.iter_mut().zip(claimed_by) {
        dest.linked_roll_call = claim;
        linked += usize::from(claim.is_some());
    }
    linked
}

/// Link each seat count to the first unlinked roll call it overlaps by more
/// than `-threshold` pixels
///
/// Seats are visited in arena order. A roll call keeps the first seat count
/// linked to it; a later overlapping count never replaces that link and
/// moves on to the next roll call instead.
pub fn link_seats_to_roll_calls(detections: &mut Detections, threshold: i32) -> usize {
    let mut linked = 0;
    for (i, seats) in detections.seats.iter().enumerate() {
        let target = detections.roll_calls.iter_mut().find(|rc| {
            rc.linked_seats.is_none() && vertical_distance(&seats.bbox, &rc.bbox) < threshold
        });
        if let Some(rc) = target {
            rc.linked_seats = Some(SeatsId(i));
            linked += 1;
        }
    }
    linked
}

/// Link each seat count to the first unlinked destination it overlaps by
/// more than `-threshold` pixels
///
/// As with roll calls, a destination's first seat link is never replaced.
pub fn link_seats_to_destinations(detections: &mut Detections, threshold: i32) -> usize {
    let mut linked = 0;
    for (i, seats) in detections.seats.iter().enumerate() {
        let target = detections.destinations.iter_mut().find(|d| {
            d.linked_seats.is_none() && vertical_distance(&seats.bbox, &d.bbox) < threshold
        });
        if let Some(dest) = target {
            dest.linked_seats = Some(SeatsId(i));
            linked += 1;
        }
    }
    linked
}

/// Run every linking pass in order
pub fn link_all(detections: &mut Detections, config: &ExtractionConfig) {
    let anchors = link_roll_calls_to_destinations(detections, config.roll_call_link_max_distance);
    let rc_seats = link_seats_to_roll_calls(detections, config.seats_link_threshold);
    let dest_seats = link_seats_to_destinations(detections, config.seats_link_threshold);
    debug!(
        "Linked {} destinations to roll calls, seats to {} roll calls and {} destinations",
        anchors, rc_seats, dest_seats
    );
}
