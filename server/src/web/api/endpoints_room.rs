use crate::data_store::models::{NewRoom, RoomPatch};
use crate::data_store::RoomId;
use crate::web::api::{authenticate, APIError, SessionTokenHeader};
use crate::web::AppState;
use actix_web::{delete, get, patch, post, web, HttpResponse, Responder};
use serde::Deserialize;

#[derive(Deserialize)]
struct ListRoomsQuery {
    #[serde(default, rename = "includeInactive")]
    include_inactive: bool,
}

#[get("/rooms")]
pub async fn list_rooms(
    query: web::Query<ListRoomsQuery>,
    state: web::Data<AppState>,
    session_token_header: Option<web::Header<SessionTokenHeader>>,
) -> Result<impl Responder, APIError> {
    let include_inactive = query.into_inner().include_inactive;
    let session_token = session_token_header
        .ok_or(APIError::NoSessionToken)?
        .into_inner()
        .session_token(&state.secret)?;
    let rooms: Vec<roombook_api_types::Room> = web::block(move || -> Result<_, APIError> {
        let mut store = state.store.get_facade()?;
        let auth = authenticate(store.as_mut(), &session_token)?;
        Ok(store.get_rooms(&auth, include_inactive)?)
    })
    .await??
    .into_iter()
    .map(|r| r.into())
    .collect();

    Ok(web::Json(rooms))
}

#[get("/rooms/{room_id}")]
pub async fn get_room(
    path: web::Path<RoomId>,
    state: web::Data<AppState>,
    session_token_header: Option<web::Header<SessionTokenHeader>>,
) -> Result<impl Responder, APIError> {
    let room_id = path.into_inner();
    let session_token = session_token_header
        .ok_or(APIError::NoSessionToken)?
        .into_inner()
        .session_token(&state.secret)?;
    let room: roombook_api_types::Room = web::block(move || -> Result<_, APIError> {
        let mut store = state.store.get_facade()?;
        let auth = authenticate(store.as_mut(), &session_token)?;
        Ok(store.get_room(&auth, room_id)?)
    })
    .await??
    .into();

    Ok(web::Json(room))
}

#[post("/rooms")]
pub async fn create_room(
    data: web::Json<roombook_api_types::NewRoom>,
    state: web::Data<AppState>,
    session_token_header: Option<web::Header<SessionTokenHeader>>,
) -> Result<impl Responder, APIError> {
    let session_token = session_token_header
        .ok_or(APIError::NoSessionToken)?
        .into_inner()
        .session_token(&state.secret)?;
    let new_room = NewRoom::try_from(data.into_inner()).map_err(APIError::InvalidData)?;
    let room: roombook_api_types::Room = web::block(move || -> Result<_, APIError> {
        let mut store = state.store.get_facade()?;
        let auth = authenticate(store.as_mut(), &session_token)?;
        Ok(store.create_room(&auth, new_room)?)
    })
    .await??
    .into();

    Ok(HttpResponse::Created().json(room))
}

#[patch("/rooms/{room_id}")]
pub async fn change_room(
    path: web::Path<RoomId>,
    data: web::Json<roombook_api_types::RoomPatch>,
    state: web::Data<AppState>,
    session_token_header: Option<web::Header<SessionTokenHeader>>,
) -> Result<impl Responder, APIError> {
    let room_id = path.into_inner();
    let session_token = session_token_header
        .ok_or(APIError::NoSessionToken)?
        .into_inner()
        .session_token(&state.secret)?;
    let patch = RoomPatch::try_from(data.into_inner()).map_err(APIError::InvalidData)?;
    let room: roombook_api_types::Room = web::block(move || -> Result<_, APIError> {
        let mut store = state.store.get_facade()?;
        let auth = authenticate(store.as_mut(), &session_token)?;
        Ok(store.update_room(&auth, room_id, patch)?)
    })
    .await??
    .into();

    Ok(web::Json(room))
}

#[delete("/rooms/{room_id}")]
pub async fn delete_room(
    path: web::Path<RoomId>,
    state: web::Data<AppState>,
    session_token_header: Option<web::Header<SessionTokenHeader>>,
) -> Result<impl Responder, APIError> {
    let room_id = path.into_inner();
    let session_token = session_token_header
        .ok_or(APIError::NoSessionToken)?
        .into_inner()
        .session_token(&state.secret)?;
    web::block(move || -> Result<_, APIError> {
        let mut store = state.store.get_facade()?;
        let auth = authenticate(store.as_mut(), &session_token)?;
        store.deactivate_room(&auth, room_id)?;
        Ok(())
    })
    .await??;

    Ok(HttpResponse::NoContent())
}
