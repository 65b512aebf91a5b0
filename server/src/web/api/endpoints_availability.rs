use crate::data_store::RoomId;
use crate::scheduling::availability::calculate_availability;
use crate::scheduling::time_interval::ClockTime;
use crate::web::api::{authenticate, APIError, SessionTokenHeader};
use crate::web::AppState;
use actix_web::{get, web, Responder};
use chrono::NaiveDate;
use serde::Deserialize;

#[derive(Deserialize)]
struct AvailabilityQuery {
    #[serde(default)]
    date: Option<NaiveDate>,
    #[serde(default, rename = "roomId")]
    room_id: Option<RoomId>,
    #[serde(default, rename = "startTime")]
    start_time: Option<String>,
}

/// Get the selectable start times (and end times for the given start time) of a booking form
#[get("/availability")]
pub async fn get_availability(
    query: web::Query<AvailabilityQuery>,
    state: web::Data<AppState>,
    session_token_header: Option<web::Header<SessionTokenHeader>>,
) -> Result<impl Responder, APIError> {
    let query = query.into_inner();
    let start_time: Option<ClockTime> = query
        .start_time
        .filter(|s| !s.is_empty())
        .map(|s| s.parse())
        .transpose()
        .map_err(|e| APIError::InvalidData(format!("{}", e)))?;
    let session_token = session_token_header
        .ok_or(APIError::NoSessionToken)?
        .into_inner()
        .session_token(&state.secret)?;
    let availability = web::block(move || -> Result<_, APIError> {
        let mut store = state.store.get_facade()?;
        let auth = authenticate(store.as_mut(), &session_token)?;
        auth.check_privilege(crate::data_store::auth_token::Privilege::ShowSchedule)?;
        Ok(calculate_availability(
            store.as_mut(),
            &auth,
            query.date,
            query.room_id,
            start_time,
        )?)
    })
    .await??;

    Ok(web::Json(roombook_api_types::Availability {
        start_times: availability
            .start_times
            .iter()
            .map(|t| t.to_string())
            .collect(),
        end_times: availability
            .end_times
            .iter()
            .map(|t| t.to_string())
            .collect(),
    }))
}
