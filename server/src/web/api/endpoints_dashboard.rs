use crate::data_store::auth_token::AuthToken;
use crate::data_store::{BookingFilterBuilder, RoomBookStoreFacade, StoreError};
use crate::scheduling::availability::bookable_minutes_per_day;
use crate::web::api::{authenticate, APIError, SessionTokenHeader};
use crate::web::AppState;
use actix_web::{get, web, Responder};
use chrono::NaiveDate;
use roombook_api_types::DashboardStats;
use std::collections::HashSet;

#[get("/dashboard/stats")]
pub async fn get_dashboard_stats(
    state: web::Data<AppState>,
    session_token_header: Option<web::Header<SessionTokenHeader>>,
) -> Result<impl Responder, APIError> {
    let session_token = session_token_header
        .ok_or(APIError::NoSessionToken)?
        .into_inner()
        .session_token(&state.secret)?;
    // Booking dates are plain calendar dates; "today" is the UTC date for all clients
    let today = chrono::Utc::now().date_naive();
    let stats = web::block(move || -> Result<_, APIError> {
        let mut store = state.store.get_facade()?;
        let auth = authenticate(store.as_mut(), &session_token)?;
        Ok(compute_dashboard_stats(store.as_mut(), &auth, today)?)
    })
    .await??;

    Ok(web::Json(stats))
}

/// Get the number of bookings per active room, most used rooms first
#[get("/dashboard/room-stats")]
pub async fn get_room_stats(
    state: web::Data<AppState>,
    session_token_header: Option<web::Header<SessionTokenHeader>>,
) -> Result<impl Responder, APIError> {
    let session_token = session_token_header
        .ok_or(APIError::NoSessionToken)?
        .into_inner()
        .session_token(&state.secret)?;
    let stats: Vec<roombook_api_types::RoomStats> = web::block(move || -> Result<_, APIError> {
        let mut store = state.store.get_facade()?;
        let auth = authenticate(store.as_mut(), &session_token)?;
        Ok(store.get_room_stats(&auth)?)
    })
    .await??
    .into_iter()
    .map(|s| s.into())
    .collect();

    Ok(web::Json(stats))
}

/// Summarize the confirmed bookings of `today`.
///
/// The occupancy rate is the booked time in active rooms relative to the bookable time of all
/// active rooms, in percent. `activeUsers` counts the owners of confirmed bookings on any date.
fn compute_dashboard_stats(
    store: &mut dyn RoomBookStoreFacade,
    auth_token: &AuthToken,
    today: NaiveDate,
) -> Result<DashboardStats, StoreError> {
    let active_rooms: HashSet<_> = store
        .get_rooms(auth_token, false)?
        .into_iter()
        .map(|r| r.id)
        .collect();
    let confirmed = store.get_bookings_filtered(
        auth_token,
        BookingFilterBuilder::new().only_confirmed().build(),
    )?;

    let todays_bookings: Vec<_> = confirmed.iter().filter(|b| b.date == today).collect();
    let booked_minutes: u32 = todays_bookings
        .iter()
        .filter(|b| active_rooms.contains(&b.room_id))
        .filter_map(|b| b.interval())
        .map(|i| i.duration_minutes() as u32)
        .sum();
    let available_minutes = active_rooms.len() as u32 * bookable_minutes_per_day() as u32;
    let occupancy_rate = if available_minutes > 0 {
        (booked_minutes as f64 * 100.0 / available_minutes as f64).round() as u32
    } else {
        0
    };
    let active_users: HashSet<_> = confirmed.iter().map(|b| b.user_id).collect();

    Ok(DashboardStats {
        today_bookings: todays_bookings.len() as u32,
        active_rooms: active_rooms.len() as u32,
        occupancy_rate,
        active_users: active_users.len() as u32,
    })
}
