use crate::data_store::{KitchenOrderFilter, KitchenOrderId, RoomId};
use crate::kitchen::order_linker::complete_order;
use crate::web::api::{authenticate, APIError, SessionTokenHeader};
use crate::web::AppState;
use actix_web::{get, patch, web, Responder};

#[get("/kitchen/orders")]
pub async fn list_own_kitchen_orders(
    state: web::Data<AppState>,
    session_token_header: Option<web::Header<SessionTokenHeader>>,
) -> Result<impl Responder, APIError> {
    let session_token = session_token_header
        .ok_or(APIError::NoSessionToken)?
        .into_inner()
        .session_token(&state.secret)?;
    let orders: Vec<roombook_api_types::KitchenOrder> =
        web::block(move || -> Result<_, APIError> {
            let mut store = state.store.get_facade()?;
            let auth = authenticate(store.as_mut(), &session_token)?;
            Ok(store.get_kitchen_orders(&auth, KitchenOrderFilter::AssignedTo(auth.user_id()))?)
        })
        .await??
        .into_iter()
        .map(|o| o.into())
        .collect();

    Ok(web::Json(orders))
}

#[get("/kitchen/orders/room/{room_id}")]
pub async fn list_room_kitchen_orders(
    path: web::Path<RoomId>,
    state: web::Data<AppState>,
    session_token_header: Option<web::Header<SessionTokenHeader>>,
) -> Result<impl Responder, APIError> {
    let room_id = path.into_inner();
    let session_token = session_token_header
        .ok_or(APIError::NoSessionToken)?
        .into_inner()
        .session_token(&state.secret)?;
    let orders: Vec<roombook_api_types::KitchenOrder> =
        web::block(move || -> Result<_, APIError> {
            let mut store = state.store.get_facade()?;
            let auth = authenticate(store.as_mut(), &session_token)?;
            Ok(store.get_kitchen_orders(&auth, KitchenOrderFilter::ForRoom(room_id))?)
        })
        .await??
        .into_iter()
        .map(|o| o.into())
        .collect();

    Ok(web::Json(orders))
}

#[patch("/kitchen/orders/{order_id}/complete")]
pub async fn complete_kitchen_order(
    path: web::Path<KitchenOrderId>,
    state: web::Data<AppState>,
    session_token_header: Option<web::Header<SessionTokenHeader>>,
) -> Result<impl Responder, APIError> {
    let order_id = path.into_inner();
    let session_token = session_token_header
        .ok_or(APIError::NoSessionToken)?
        .into_inner()
        .session_token(&state.secret)?;
    let order: roombook_api_types::KitchenOrder = web::block(move || -> Result<_, APIError> {
        let mut store = state.store.get_facade()?;
        let auth = authenticate(store.as_mut(), &session_token)?;
        Ok(complete_order(store.as_mut(), &auth, order_id)?)
    })
    .await??
    .into();

    Ok(web::Json(order))
}
