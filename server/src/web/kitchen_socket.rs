//! WebSocket endpoint of the kitchen notification channel.
//!
//! Clients authenticate the upgrade request with their session token (`X-SESSION-TOKEN` header or
//! `token` query parameter, since browsers cannot set headers for WebSocket requests). Afterwards,
//! a kitchen worker identifies with a `KITCHEN_USER_CONNECT` event and is registered at the
//! [KitchenNotificationChannel] until the connection is closed.

use crate::auth_session::{SessionToken, SESSION_TOKEN_MAX_AGE};
use crate::data_store::auth_token::AccessRole;
use crate::data_store::UserId;
use crate::kitchen::notification_channel::{ConnectionId, KitchenNotificationChannel};
use crate::web::api::{authenticate, APIError, SessionTokenHeader};
use crate::web::AppState;
use actix_web::{get, web, HttpRequest, HttpResponse};
use actix_ws::Message;
use futures_util::StreamExt;
use log::{debug, info, warn};
use roombook_api_types::{KitchenClientEvent, KitchenServerEvent};
use serde::Deserialize;
use tokio::sync::mpsc;

#[derive(Deserialize)]
struct WsAuthQuery {
    #[serde(default)]
    token: Option<String>,
}

#[get("/ws")]
pub async fn kitchen_websocket(
    req: HttpRequest,
    body: web::Payload,
    query: web::Query<WsAuthQuery>,
    state: web::Data<AppState>,
    session_token_header: Option<web::Header<SessionTokenHeader>>,
) -> Result<HttpResponse, actix_web::Error> {
    let session_token = match (session_token_header, query.into_inner().token) {
        (Some(header), _) => header.into_inner().session_token(&state.secret),
        (None, Some(token)) => SessionToken::from_string(&token, &state.secret, SESSION_TOKEN_MAX_AGE),
        (None, None) => return Err(APIError::NoSessionToken.into()),
    }
    .map_err(APIError::from)?;
    let store_state = state.clone();
    let (user_id, is_kitchen) = web::block(move || -> Result<_, APIError> {
        let mut store = store_state.store.get_facade()?;
        let auth = authenticate(store.as_mut(), &session_token)?;
        Ok((auth.user_id(), auth.has_role(AccessRole::Kitchen)))
    })
    .await?
    .map_err(actix_web::Error::from)?;

    let (response, session, stream) = actix_ws::handle(&req, body)?;
    debug!("WebSocket connection of user {} opened.", user_id);
    actix_web::rt::spawn(kitchen_session(
        session,
        stream,
        state.kitchen_channel.clone(),
        user_id,
        is_kitchen,
    ));
    Ok(response)
}

/// Check if a `KITCHEN_USER_CONNECT` event may register the connection: The claimed user must be
/// the user of the session, holding the kitchen role.
fn may_register_as_kitchen_user(claimed_user: UserId, session_user: UserId, is_kitchen: bool) -> bool {
    claimed_user == session_user && is_kitchen
}

async fn kitchen_session(
    mut session: actix_ws::Session,
    mut stream: actix_ws::MessageStream,
    channel: KitchenNotificationChannel,
    user_id: UserId,
    is_kitchen: bool,
) {
    let (sender, mut receiver) = mpsc::unbounded_channel::<KitchenServerEvent>();
    let mut sender = Some(sender);
    let mut connection_id: Option<ConnectionId> = None;
    let mut close_reason = None;

    loop {
        tokio::select! {
            event = receiver.recv(), if connection_id.is_some() => {
                let Some(event) = event else {
                    debug!("Notification channel closed, terminating connection of {}.", user_id);
                    break;
                };
                if send_event(&mut session, &event).await.is_err() {
                    break;
                }
            }
            message = stream.next() => {
                match message {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<KitchenClientEvent>(&text) {
                            Ok(KitchenClientEvent::KitchenUserConnect { user_id: claimed_user }) => {
                                if !may_register_as_kitchen_user(claimed_user, user_id, is_kitchen) {
                                    warn!(
                                        "Refused kitchen connection of user {} claiming to be kitchen worker {}.",
                                        user_id, claimed_user
                                    );
                                    continue;
                                }
                                if let Some(sender) = sender.take() {
                                    connection_id = Some(channel.register(user_id, sender));
                                }
                                let confirmation = KitchenServerEvent::ConnectionConfirmed {
                                    message: "Connected to kitchen notifications".to_string(),
                                };
                                if send_event(&mut session, &confirmation).await.is_err() {
                                    break;
                                }
                            }
                            Err(e) => debug!("Ignoring invalid message from {}: {}", user_id, e),
                        }
                    }
                    Some(Ok(Message::Ping(bytes))) => {
                        if session.pong(&bytes).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(reason))) => {
                        close_reason = reason;
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!("WebSocket protocol error on connection of {}: {}", user_id, e);
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    if let Some(id) = connection_id {
        channel.unregister(id);
    }
    let _ = session.close(close_reason).await;
    info!("WebSocket connection of user {} closed.", user_id);
}

async fn send_event(
    session: &mut actix_ws::Session,
    event: &KitchenServerEvent,
) -> Result<(), actix_ws::Closed> {
    match serde_json::to_string(event) {
        Ok(text) => session.text(text).await,
        Err(e) => {
            warn!("Could not serialize kitchen event: {}", e);
            Ok(())
        }
    }
}
