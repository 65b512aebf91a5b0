//! The authoritative check for new and changed bookings: A confirmed booking must never overlap
//! with another confirmed booking of the same room on the same date.
//!
//! The check is always re-derived from the bookings currently stored. The data store
//! implementations call [check_booking_slot] within the same transaction which inserts or updates
//! the booking.

use super::time_interval::{ClockTime, TimeInterval};
use crate::data_store::auth_token::AuthToken;
use crate::data_store::models::{Booking, BookingPatch, BookingStatus};
use crate::data_store::{BookingId, RoomBookStoreFacade, RoomId, StoreError};
use chrono::NaiveDate;
use log::debug;
use std::fmt::{Display, Formatter};

/// Reason for rejecting a booking
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookingRejection {
    /// The end time is not after the start time
    InvalidRange { start: ClockTime, end: ClockTime },
    /// The room is already booked (confirmed) for an overlapping time range
    Conflict {
        conflicting_booking_id: BookingId,
        conflicting_interval: TimeInterval,
    },
}

impl Display for BookingRejection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            BookingRejection::InvalidRange { start, end } => write!(
                f,
                "End time must be after start time (requested {} to {})",
                start, end
            ),
            BookingRejection::Conflict {
                conflicting_interval,
                ..
            } => write!(
                f,
                "Room is already booked for this time slot (existing booking {})",
                conflicting_interval
            ),
        }
    }
}

/// The room, date and time range a booking occupies
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingSlot {
    pub room_id: RoomId,
    pub date: NaiveDate,
    pub start_time: ClockTime,
    pub end_time: ClockTime,
}

impl BookingSlot {
    pub fn of_booking(booking: &Booking) -> Self {
        Self {
            room_id: booking.room_id,
            date: booking.date,
            start_time: booking.start_time,
            end_time: booking.end_time,
        }
    }

    /// Get the effective slot of an existing booking after applying the given patch
    pub fn with_patch(existing: &Booking, patch: &BookingPatch) -> Self {
        Self {
            room_id: patch.room_id.unwrap_or(existing.room_id),
            date: patch.date.unwrap_or(existing.date),
            start_time: patch.start_time.unwrap_or(existing.start_time),
            end_time: patch.end_time.unwrap_or(existing.end_time),
        }
    }
}

/// Check that the time range is not empty or inverted
pub fn validate_range(start: ClockTime, end: ClockTime) -> Result<TimeInterval, BookingRejection> {
    TimeInterval::new(start, end).ok_or(BookingRejection::InvalidRange { start, end })
}

/// Find a booking in `existing` which is confirmed and overlaps with the `interval`.
///
/// `existing` should contain the bookings of the same room and date. The booking with id
/// `exclude` is skipped, such that a booking does not conflict with itself when being edited.
pub fn find_conflict<'a>(
    interval: &TimeInterval,
    existing: &'a [Booking],
    exclude: Option<BookingId>,
) -> Option<&'a Booking> {
    existing
        .iter()
        .filter(|booking| booking.status == BookingStatus::Confirmed)
        .filter(|booking| Some(booking.id) != exclude)
        .find(|booking| {
            booking
                .interval()
                .is_some_and(|other| interval.overlaps(&other))
        })
}

/// Decide if a booking for the given `slot` can be accepted, given the `confirmed` bookings of the
/// same room and date.
///
/// The range check is done first, such that an inverted range is always reported as such.
pub fn check_booking_slot(
    slot: &BookingSlot,
    confirmed: &[Booking],
    exclude: Option<BookingId>,
) -> Result<TimeInterval, BookingRejection> {
    let interval = validate_range(slot.start_time, slot.end_time)?;
    match find_conflict(&interval, confirmed, exclude) {
        Some(conflicting) => {
            debug!(
                "Booking request for room {} on {} at {} conflicts with booking {} \"{}\" at {}",
                slot.room_id,
                slot.date,
                interval,
                conflicting.id,
                conflicting.title,
                conflicting
                    .interval()
                    .map(|i| i.to_string())
                    .unwrap_or_default()
            );
            Err(BookingRejection::Conflict {
                conflicting_booking_id: conflicting.id,
                conflicting_interval: conflicting.interval().unwrap_or(interval),
            })
        }
        None => Ok(interval),
    }
}

/// Check if the time range `[start, end)` on the given room and date overlaps with any confirmed
/// booking in the store, except for the booking `exclude`.
pub fn has_conflict(
    store: &mut dyn RoomBookStoreFacade,
    auth_token: &AuthToken,
    room_id: RoomId,
    date: NaiveDate,
    start: ClockTime,
    end: ClockTime,
    exclude: Option<BookingId>,
) -> Result<bool, StoreError> {
    let confirmed = store.get_confirmed_bookings(auth_token, room_id, date)?;
    Ok(confirmed
        .iter()
        .filter(|booking| Some(booking.id) != exclude)
        .filter_map(|booking| booking.interval())
        .any(|other| super::time_interval::overlaps(start, end, other.start(), other.end())))
}
