//! Flight assembly
//!
//! Walks the merged groupings and emits one flight per destination, with the
//! roll call and seats inherited from the grouping's anchor where the
//! destination has none of its own.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::extract::{Detections, SeatType};
use crate::grouping::Grouping;
use crate::slide::{PhotoSource, Terminal};

/// A scheduled departure read off one photo
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flight {
    /// Terminal the photo was taken at
    pub origin: String,
    pub destination: String,
    /// Roll call date and time, `None` when no time was linked
    pub roll_call: Option<DateTime<Utc>>,
    /// The header date was not recovered and the photo day was assumed
    pub unknown_roll_call_date: bool,
    pub seat_count: u32,
    pub seat_type: Option<SeatType>,
    pub canceled: bool,
    /// Identifier of the source photo
    pub photo_source: String,
    /// Upload time of the source photo
    pub source_date: DateTime<Utc>,
}

/// Where the flights of one photo come from
#[derive(Debug, Clone, Copy)]
pub struct FlightOrigin<'a> {
    pub terminal: &'a Terminal,
    pub photo: &'a PhotoSource,
    /// Day printed in the schedule header, if recovered
    pub header_date: Option<NaiveDate>,
}

impl FlightOrigin<'_> {
    /// Day roll call times fall on: the header date, else the photo's day
    pub fn roll_call_day(&self) -> NaiveDate {
        self.header_date
            .unwrap_or_else(|| self.photo.created_at.date_naive())
    }
}

/// Propagate anchors into member destinations and emit one flight each
///
/// A destination keeps a roll call or seats link it already has. Destinations
/// in unanchored groupings still produce a flight, without a time.
pub fn assemble_flights(
    detections: &mut Detections,
    groupings: &[Grouping],
    origin: &FlightOrigin<'_>,
) -> Vec<Flight> {
    for grouping in groupings {
        let Some(anchor) = grouping.anchor() else {
            continue;
        };
        let anchor_seats = detections.roll_call(anchor).linked_seats;
        for id in grouping.destinations() {
            let destination = &mut detections.destinations[id.0];
            if destination.linked_roll_call.is_none() {
                destination.linked_roll_call = Some(anchor);
            }
            if destination.linked_seats.is_none() {
                destination.linked_seats = anchor_seats;
            }
        }
    }

    let day = origin.roll_call_day();
    let unknown_roll_call_date = origin.header_date.is_none();

    let mut flights = Vec::new();
    for grouping in groupings {
        for id in grouping.destinations() {
            let destination = detections.destination(*id);
            let roll_call = destination
                .linked_roll_call
                .map(|rc| day.and_time(detections.roll_call(rc).time).and_utc());
            let seats = destination.linked_seats.map(|s| detections.seats(s));

            flights.push(Flight {
                origin: origin.terminal.title.clone(),
                destination: destination.title.clone(),
                roll_call,
                unknown_roll_call_date,
                seat_count: seats.map_or(0, |s| s.count),
                seat_type: seats.map(|s| s.seat_type),
                canceled: false,
                photo_source: origin.photo.id.clone(),
                source_date: origin.photo.created_at,
            });
        }
    }

    debug!(
        "{} flights from {} groupings for {}",
        flights.len(),
        groupings.len(),
        origin.photo.id
    );
    flights
}
