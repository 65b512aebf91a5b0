//! Creating kitchen orders for the catering requests of accepted bookings.
//!
//! The kitchen order is created after the booking has been committed. Failures in this step never
//! undo or fail the booking: They are reported as [DependencyFailure] and logged by
//! [process_accepted_booking].

use super::notification_channel::KitchenNotificationChannel;
use crate::data_store::auth_token::AuthToken;
use crate::data_store::models::{Booking, KitchenOrder, NewKitchenOrder, Room};
use crate::data_store::{KitchenOrderId, RoomBookStoreFacade, StoreError};
use log::{error, info, warn};
use roombook_api_types::{KitchenOrderBooking, KitchenServerEvent};
use std::fmt::{Display, Formatter};

#[derive(Debug)]
pub enum CateringOutcome {
    /// The booking does not request catering (or misses the people count)
    NotRequested,
    /// The booking requests catering, but no kitchen worker is assigned to the room. No order has
    /// been created.
    NoKitchenWorkerAssigned,
    /// The kitchen order has been created. It has been delivered to `delivered` live connections
    /// of the kitchen worker.
    OrderCreated {
        order: KitchenOrder,
        delivered: usize,
    },
}

/// Failure of a collaborator while creating the kitchen order
#[derive(Debug)]
pub enum DependencyFailure {
    RoomLookup(StoreError),
    OrderCreation(StoreError),
}

impl Display for DependencyFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            DependencyFailure::RoomLookup(e) => {
                write!(f, "Could not look up room of the booking: {}", e)
            }
            DependencyFailure::OrderCreation(e) => {
                write!(f, "Could not create kitchen order: {}", e)
            }
        }
    }
}

impl std::error::Error for DependencyFailure {}

/// Create the kitchen order for the catering request of a freshly created `booking` and notify
/// the kitchen worker assigned to the booking's room.
pub fn link_catering_order(
    store: &mut dyn RoomBookStoreFacade,
    auth_token: &AuthToken,
    booking: &Booking,
    channel: &KitchenNotificationChannel,
) -> Result<CateringOutcome, DependencyFailure> {
    if !booking.requests_catering() {
        return Ok(CateringOutcome::NotRequested);
    }
    let room = store
        .get_room(auth_token, booking.room_id)
        .map_err(DependencyFailure::RoomLookup)?;
    let Some(worker_id) = room.assigned_kitchen_user_id else {
        warn!(
            "Booking {} requests catering, but no kitchen worker is assigned to room {} ({}). No kitchen order created.",
            booking.id, room.id, room.name
        );
        return Ok(CateringOutcome::NoKitchenWorkerAssigned);
    };
    let Some(new_order) = NewKitchenOrder::for_booking(booking, worker_id) else {
        return Ok(CateringOutcome::NotRequested);
    };

    let order = store
        .create_kitchen_order(auth_token, new_order)
        .map_err(DependencyFailure::OrderCreation)?;
    info!(
        "Created kitchen order {} for booking {}, assigned to kitchen worker {}.",
        order.id, booking.id, worker_id
    );

    let delivered = channel.notify(worker_id, &new_order_event(&order, booking, &room));
    if delivered == 0 {
        info!(
            "Kitchen worker {} is not connected. Order {} will only be visible in the order list.",
            worker_id, order.id
        );
    }
    Ok(CateringOutcome::OrderCreated { order, delivered })
}

/// Run [link_catering_order] and log any failure. The booking stays valid in any case.
pub fn process_accepted_booking(
    store: &mut dyn RoomBookStoreFacade,
    auth_token: &AuthToken,
    booking: &Booking,
    channel: &KitchenNotificationChannel,
) -> CateringOutcome {
    match link_catering_order(store, auth_token, booking, channel) {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("Kitchen order for booking {} failed: {}", booking.id, e);
            CateringOutcome::NotRequested
        }
    }
}

/// Mark a kitchen order as completed by the calling kitchen worker
pub fn complete_order(
    store: &mut dyn RoomBookStoreFacade,
    auth_token: &AuthToken,
    order_id: KitchenOrderId,
) -> Result<KitchenOrder, StoreError> {
    let order = store.complete_kitchen_order(auth_token, order_id)?;
    info!(
        "Kitchen order {} completed by {}.",
        order.id,
        auth_token.user_id()
    );
    Ok(order)
}

/// Build the notification event for a new kitchen order
pub fn new_order_event(order: &KitchenOrder, booking: &Booking, room: &Room) -> KitchenServerEvent {
    KitchenServerEvent::NewKitchenOrder {
        order: order.clone().into(),
        booking: KitchenOrderBooking {
            title: booking.title.clone(),
            date: booking.date,
            start_time: booking.start_time.to_string(),
            end_time: booking.end_time.to_string(),
            room: room.name.clone(),
        },
        message: format!(
            "New kitchen order: {} people in {} on {} at {}",
            order.people_count, room.name, order.order_date, order.order_time
        ),
    }
}
