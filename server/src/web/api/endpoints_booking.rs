use crate::data_store::models::{BookingPatch, NewBooking};
use crate::data_store::{BookingFilterBuilder, BookingId, RoomId};
use crate::kitchen::order_linker::{process_accepted_booking, CateringOutcome};
use crate::web::api::{authenticate, APIError, SessionTokenHeader};
use crate::web::AppState;
use actix_web::{delete, get, patch, post, web, HttpResponse, Responder};
use chrono::NaiveDate;
use log::debug;
use serde::Deserialize;

#[derive(Deserialize)]
struct BookingListQuery {
    #[serde(default)]
    date: Option<NaiveDate>,
    #[serde(default, rename = "roomId")]
    room_id: Option<RoomId>,
}

impl BookingListQuery {
    fn apply(self, mut builder: BookingFilterBuilder) -> BookingFilterBuilder {
        if let Some(date) = self.date {
            builder = builder.on_date(date);
        }
        if let Some(room_id) = self.room_id {
            builder = builder.in_room(room_id);
        }
        builder
    }
}

#[get("/bookings")]
pub async fn list_own_bookings(
    query: web::Query<BookingListQuery>,
    state: web::Data<AppState>,
    session_token_header: Option<web::Header<SessionTokenHeader>>,
) -> Result<impl Responder, APIError> {
    let query = query.into_inner();
    let session_token = session_token_header
        .ok_or(APIError::NoSessionToken)?
        .into_inner()
        .session_token(&state.secret)?;
    let bookings: Vec<roombook_api_types::Booking> = web::block(move || -> Result<_, APIError> {
        let mut store = state.store.get_facade()?;
        let auth = authenticate(store.as_mut(), &session_token)?;
        let filter = query
            .apply(BookingFilterBuilder::new().owned_by(auth.user_id()))
            .build();
        Ok(store.get_bookings_filtered(&auth, filter)?)
    })
    .await??
    .into_iter()
    .map(|b| b.into())
    .collect();

    Ok(web::Json(bookings))
}

#[get("/bookings/all")]
pub async fn list_all_bookings(
    query: web::Query<BookingListQuery>,
    state: web::Data<AppState>,
    session_token_header: Option<web::Header<SessionTokenHeader>>,
) -> Result<impl Responder, APIError> {
    let query = query.into_inner();
    let session_token = session_token_header
        .ok_or(APIError::NoSessionToken)?
        .into_inner()
        .session_token(&state.secret)?;
    let bookings: Vec<roombook_api_types::Booking> = web::block(move || -> Result<_, APIError> {
        let mut store = state.store.get_facade()?;
        let auth = authenticate(store.as_mut(), &session_token)?;
        Ok(store.get_bookings_filtered(&auth, query.apply(BookingFilterBuilder::new()).build())?)
    })
    .await??
    .into_iter()
    .map(|b| b.into())
    .collect();

    Ok(web::Json(bookings))
}

#[get("/bookings/{booking_id}")]
pub async fn get_booking(
    path: web::Path<BookingId>,
    state: web::Data<AppState>,
    session_token_header: Option<web::Header<SessionTokenHeader>>,
) -> Result<impl Responder, APIError> {
    let booking_id = path.into_inner();
    let session_token = session_token_header
        .ok_or(APIError::NoSessionToken)?
        .into_inner()
        .session_token(&state.secret)?;
    let booking: roombook_api_types::Booking = web::block(move || -> Result<_, APIError> {
        let mut store = state.store.get_facade()?;
        let auth = authenticate(store.as_mut(), &session_token)?;
        Ok(store.get_booking(&auth, booking_id)?)
    })
    .await??
    .into();

    Ok(web::Json(booking))
}

/// Create a booking. If catering is requested, the kitchen order is created and the kitchen worker
/// is notified after the booking has been stored. Failures of the latter do not affect the
/// response.
#[post("/bookings")]
pub async fn create_booking(
    data: web::Json<roombook_api_types::NewBooking>,
    state: web::Data<AppState>,
    session_token_header: Option<web::Header<SessionTokenHeader>>,
) -> Result<impl Responder, APIError> {
    let session_token = session_token_header
        .ok_or(APIError::NoSessionToken)?
        .into_inner()
        .session_token(&state.secret)?;
    let data = data.into_inner();
    let booking = web::block(move || -> Result<_, APIError> {
        let mut store = state.store.get_facade()?;
        let auth = authenticate(store.as_mut(), &session_token)?;
        let new_booking =
            NewBooking::from_api(data, auth.user_id()).map_err(APIError::InvalidData)?;
        let booking = store.create_booking(&auth, new_booking)?;
        let outcome = process_accepted_booking(
            store.as_mut(),
            &auth,
            &booking,
            &state.kitchen_channel,
        );
        if let CateringOutcome::OrderCreated { order, delivered } = &outcome {
            debug!(
                "Booking {} linked to kitchen order {} ({} live notifications).",
                booking.id, order.id, delivered
            );
        }
        Ok(booking)
    })
    .await??;

    Ok(HttpResponse::Created().json(roombook_api_types::Booking::from(booking)))
}

#[patch("/bookings/{booking_id}")]
pub async fn change_booking(
    path: web::Path<BookingId>,
    data: web::Json<roombook_api_types::BookingPatch>,
    state: web::Data<AppState>,
    session_token_header: Option<web::Header<SessionTokenHeader>>,
) -> Result<impl Responder, APIError> {
    let booking_id = path.into_inner();
    let session_token = session_token_header
        .ok_or(APIError::NoSessionToken)?
        .into_inner()
        .session_token(&state.secret)?;
    let patch = BookingPatch::try_from(data.into_inner()).map_err(APIError::InvalidData)?;
    let booking: roombook_api_types::Booking = web::block(move || -> Result<_, APIError> {
        let mut store = state.store.get_facade()?;
        let auth = authenticate(store.as_mut(), &session_token)?;
        Ok(store.update_booking(&auth, booking_id, patch)?)
    })
    .await??
    .into();

    Ok(web::Json(booking))
}

#[delete("/bookings/{booking_id}")]
pub async fn delete_booking(
    path: web::Path<BookingId>,
    state: web::Data<AppState>,
    session_token_header: Option<web::Header<SessionTokenHeader>>,
) -> Result<impl Responder, APIError> {
    let booking_id = path.into_inner();
    let session_token = session_token_header
        .ok_or(APIError::NoSessionToken)?
        .into_inner()
        .session_token(&state.secret)?;
    web::block(move || -> Result<_, APIError> {
        let mut store = state.store.get_facade()?;
        let auth = authenticate(store.as_mut(), &session_token)?;
        store.delete_booking(&auth, booking_id)?;
        Ok(())
    })
    .await??;

    Ok(HttpResponse::NoContent())
}
