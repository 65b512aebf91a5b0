//! Calculation of the time slots offered for booking a room on a given date.
//!
//! Bookings are placed on a fixed daily grid from [FIRST_SLOT] to [LAST_SLOT] (both inclusive)
//! in steps of [SLOT_STEP_MINUTES]. The functions in this module use the same overlap semantics as
//! the [super::conflict_guard], such that every range offered here is accepted by the guard (as
//! long as no other booking is created in between).

use super::time_interval::{ClockTime, TimeInterval};
use crate::data_store::auth_token::AuthToken;
use crate::data_store::{RoomBookStoreFacade, RoomId, StoreError};
use chrono::NaiveDate;

pub const SLOT_STEP_MINUTES: u16 = 30;
/// Opening time: the first bookable slot
pub const FIRST_SLOT: ClockTime = ClockTime::from_minutes_unchecked(7 * 60);
/// Closing time: the last slot of the grid
pub const LAST_SLOT: ClockTime = ClockTime::from_minutes_unchecked(18 * 60);

/// Generate the daily slot grid, in chronological order.
pub fn generate_slots() -> Vec<ClockTime> {
    (FIRST_SLOT.minutes()..=LAST_SLOT.minutes())
        .step_by(SLOT_STEP_MINUTES as usize)
        .map(ClockTime::from_minutes_unchecked)
        .collect()
}

/// Minutes of bookable time per room and day, spanned by the slot grid
pub fn bookable_minutes_per_day() -> u16 {
    LAST_SLOT.minutes() - FIRST_SLOT.minutes()
}

/// A slot is available if it does not lie within any of the `booked` intervals
pub fn is_slot_available(slot: ClockTime, booked: &[TimeInterval]) -> bool {
    !booked.iter().any(|interval| interval.contains(slot))
}

/// Get the slots which can be selected as start time.
///
/// `booked` are the intervals of all confirmed bookings of the selected room on the selected date,
/// or None if the room or date has not been selected yet. In the latter case, the full grid is
/// returned.
pub fn available_start_times(booked: Option<&[TimeInterval]>) -> Vec<ClockTime> {
    let slots = generate_slots();
    match booked {
        None => slots,
        Some(booked) => slots
            .into_iter()
            .filter(|slot| is_slot_available(*slot, booked))
            .collect(),
    }
}

/// Get the slots which can be selected as end time for the given `start` time.
///
/// Only end times are offered which form a single contiguous free range together with the start
/// time: The candidates are walked in order and the walk stops at the first candidate, for which
/// the range `[start, candidate)` touches a booked interval. Thus, later end times behind a booking
/// are never offered. If `start` is not on the slot grid, no end times are returned.
///
/// See [available_start_times] for the meaning of `booked`.
pub fn available_end_times(start: ClockTime, booked: Option<&[TimeInterval]>) -> Vec<ClockTime> {
    let slots = generate_slots();
    let Some(start_index) = slots.iter().position(|slot| *slot == start) else {
        return vec![];
    };
    let Some(booked) = booked else {
        return slots[start_index + 1..].to_vec();
    };

    let mut result = Vec::new();
    for candidate in slots[start_index + 1..].iter() {
        // Checking the whole range instead of the single slots also catches bookings which do not
        // start or end on the slot grid
        let range_is_free = TimeInterval::new(start, *candidate)
            .map(|range| !booked.iter().any(|interval| interval.overlaps(&range)))
            .unwrap_or(false);
        if !range_is_free {
            break;
        }
        result.push(*candidate);
    }
    result
}

/// Available start and end times for a booking form
pub struct SlotAvailability {
    pub start_times: Vec<ClockTime>,
    pub end_times: Vec<ClockTime>,
}

/// Calculate the available start times and (if a start time is given) end times for the given
/// room and date, based on the confirmed bookings currently in the store.
///
/// If `date` or `room_id` is None, all slots are offered. Inactive or non-existing rooms have no
/// available slots at all.
pub fn calculate_availability(
    store: &mut dyn RoomBookStoreFacade,
    auth_token: &AuthToken,
    date: Option<NaiveDate>,
    room_id: Option<RoomId>,
    start_time: Option<ClockTime>,
) -> Result<SlotAvailability, StoreError> {
    let booked: Option<Vec<TimeInterval>> = match (date, room_id) {
        (Some(date), Some(room_id)) => {
            match store.get_room(auth_token, room_id) {
                Ok(room) if room.is_active => {}
                Ok(_) | Err(StoreError::NotExisting) => {
                    return Ok(SlotAvailability {
                        start_times: vec![],
                        end_times: vec![],
                    })
                }
                Err(e) => return Err(e),
            }
            Some(
                store
                    .get_confirmed_bookings(auth_token, room_id, date)?
                    .iter()
                    .filter_map(|booking| booking.interval())
                    .collect(),
            )
        }
        _ => None,
    };

    Ok(SlotAvailability {
        start_times: available_start_times(booked.as_deref()),
        end_times: start_time
            .map(|start| available_end_times(start, booked.as_deref()))
            .unwrap_or_default(),
    })
}
