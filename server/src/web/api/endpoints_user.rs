use crate::data_store::models::UserRolesPatch;
use crate::data_store::UserId;
use crate::web::api::{authenticate, APIError, SessionTokenHeader};
use crate::web::AppState;
use actix_web::{get, patch, web, Responder};
use log::info;

#[get("/users")]
pub async fn list_users(
    state: web::Data<AppState>,
    session_token_header: Option<web::Header<SessionTokenHeader>>,
) -> Result<impl Responder, APIError> {
    let session_token = session_token_header
        .ok_or(APIError::NoSessionToken)?
        .into_inner()
        .session_token(&state.secret)?;
    let users: Vec<roombook_api_types::User> = web::block(move || -> Result<_, APIError> {
        let mut store = state.store.get_facade()?;
        let auth = authenticate(store.as_mut(), &session_token)?;
        Ok(store.get_users(&auth)?)
    })
    .await??
    .into_iter()
    .map(|u| u.into())
    .collect();

    Ok(web::Json(users))
}

/// Grant or revoke the admin and kitchen roles of a user
#[patch("/users/{user_id}/roles")]
pub async fn change_user_roles(
    path: web::Path<UserId>,
    data: web::Json<roombook_api_types::UserRolesPatch>,
    state: web::Data<AppState>,
    session_token_header: Option<web::Header<SessionTokenHeader>>,
) -> Result<impl Responder, APIError> {
    let user_id = path.into_inner();
    let session_token = session_token_header
        .ok_or(APIError::NoSessionToken)?
        .into_inner()
        .session_token(&state.secret)?;
    let patch = UserRolesPatch::from(data.into_inner());
    let user: roombook_api_types::User = web::block(move || -> Result<_, APIError> {
        let mut store = state.store.get_facade()?;
        let auth = authenticate(store.as_mut(), &session_token)?;
        let user = store.update_user_roles(&auth, user_id, patch)?;
        info!(
            "User {} changed the roles of {} to admin={}, kitchen={}.",
            auth.user_id(),
            user.username,
            user.is_admin,
            user.is_kitchen
        );
        Ok(user)
    })
    .await??
    .into();

    Ok(web::Json(user))
}
