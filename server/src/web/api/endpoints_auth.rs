use crate::web::api::{authenticate, APIError, SessionTokenHeader};
use crate::web::AppState;
use actix_web::{get, web, Responder};

#[get("/me")]
pub async fn get_current_user(
    state: web::Data<AppState>,
    session_token_header: Option<web::Header<SessionTokenHeader>>,
) -> Result<impl Responder, APIError> {
    let session_token = session_token_header
        .ok_or(APIError::NoSessionToken)?
        .into_inner()
        .session_token(&state.secret)?;
    let user: roombook_api_types::CurrentUser = web::block(move || -> Result<_, APIError> {
        let mut store = state.store.get_facade()?;
        let auth = authenticate(store.as_mut(), &session_token)?;
        Ok(store.get_current_user(&auth)?)
    })
    .await??
    .into();

    Ok(web::Json(user))
}
