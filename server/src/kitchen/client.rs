//! Client side of the kitchen notification channel.
//!
//! [KitchenClientState] holds the connection state machine of a kitchen client. It does not do any
//! IO by itself. [run_kitchen_listener] drives it with a real WebSocket connection (using `awc`)
//! for the `kitchen-listen` command.

use crate::data_store::UserId;
use actix_web::http::StatusCode;
use awc::ws;
use futures_util::{SinkExt, StreamExt};
use log::{debug, info, warn};
use roombook_api_types::{
    CurrentUser, KitchenClientEvent, KitchenOrder, KitchenOrderBooking, KitchenServerEvent,
};
use std::collections::{HashSet, VecDeque};
use std::fmt::{Display, Formatter};
use std::time::Duration;
use url::Url;
use uuid::Uuid;

/// Delay between losing the connection and the next connection attempt
pub const RECONNECT_DELAY: Duration = Duration::from_millis(3000);

/// Number of recently seen order ids to remember for filtering duplicate notifications
const RECENT_ORDER_IDS_CAPACITY: usize = 32;

/// A new kitchen order, as announced by the server
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrderNotice {
    pub order: KitchenOrder,
    pub booking: KitchenOrderBooking,
    pub message: String,
}

/// Bounded set of the most recently seen order ids. The oldest id is evicted first.
#[derive(Debug, Default)]
struct RecentIds {
    order: VecDeque<Uuid>,
    members: HashSet<Uuid>,
}

impl RecentIds {
    /// Add the id to the set. Returns false if the id has already been in the set.
    fn insert(&mut self, id: Uuid) -> bool {
        if !self.members.insert(id) {
            return false;
        }
        self.order.push_back(id);
        if self.order.len() > RECENT_ORDER_IDS_CAPACITY {
            if let Some(evicted) = self.order.pop_front() {
                self.members.remove(&evicted);
            }
        }
        true
    }
}

pub struct KitchenClientState {
    user_id: UserId,
    recent_orders: RecentIds,
    reconnect_pending: bool,
}

impl KitchenClientState {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            recent_orders: RecentIds::default(),
            reconnect_pending: false,
        }
    }

    /// The connection has been (re)established. Clears any pending reconnect timer and returns the
    /// event to be sent to the server for identifying as kitchen worker.
    pub fn on_connected(&mut self) -> KitchenClientEvent {
        self.reconnect_pending = false;
        KitchenClientEvent::KitchenUserConnect {
            user_id: self.user_id,
        }
    }

    /// Process an event received from the server. Returns the new order, if the event announces a
    /// kitchen order which has not been seen recently.
    pub fn on_server_event(&mut self, event: KitchenServerEvent) -> Option<NewOrderNotice> {
        match event {
            KitchenServerEvent::ConnectionConfirmed { message } => {
                info!("Connection confirmed by server: {}", message);
                None
            }
            KitchenServerEvent::NewKitchenOrder {
                order,
                booking,
                message,
            } => {
                if !self.recent_orders.insert(order.id) {
                    debug!("Ignoring duplicate notification for order {}.", order.id);
                    return None;
                }
                Some(NewOrderNotice {
                    order,
                    booking,
                    message,
                })
            }
        }
    }

    /// The connection has been lost. Returns the delay after which to reconnect, unless a
    /// reconnect is already scheduled.
    pub fn on_disconnected(&mut self) -> Option<Duration> {
        if self.reconnect_pending {
            return None;
        }
        self.reconnect_pending = true;
        Some(RECONNECT_DELAY)
    }

    /// The reconnect timer has fired. Returns true, if a connection attempt should be made, i.e. a
    /// reconnect is (still) pending and the user still holds the kitchen role.
    pub fn reconnect_due(&mut self, still_kitchen_user: bool) -> bool {
        let pending = self.reconnect_pending;
        self.reconnect_pending = false;
        pending && still_kitchen_user
    }
}

#[derive(Debug)]
pub enum ListenerError {
    InvalidServerUrl(url::ParseError),
    Request(String),
    NotAuthenticated,
    NotKitchenUser,
    WebSocket(String),
}

impl Display for ListenerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ListenerError::InvalidServerUrl(e) => write!(f, "Invalid server URL: {}", e),
            ListenerError::Request(e) => write!(f, "Request to server failed: {}", e),
            ListenerError::NotAuthenticated => f.write_str("Session token has been rejected"),
            ListenerError::NotKitchenUser => f.write_str("User does not have the kitchen role"),
            ListenerError::WebSocket(e) => write!(f, "WebSocket connection failed: {}", e),
        }
    }
}

impl std::error::Error for ListenerError {}

impl From<url::ParseError> for ListenerError {
    fn from(value: url::ParseError) -> Self {
        ListenerError::InvalidServerUrl(value)
    }
}

impl From<awc::error::WsProtocolError> for ListenerError {
    fn from(value: awc::error::WsProtocolError) -> Self {
        ListenerError::WebSocket(value.to_string())
    }
}

/// Connect to the kitchen notification channel of the server at `server_url` and print all new
/// kitchen orders to stdout. Reconnects after connection loss, as long as the user still holds the
/// kitchen role.
pub async fn run_kitchen_listener(
    server_url: Url,
    session_token: String,
) -> Result<(), ListenerError> {
    let client = awc::Client::default();
    let user = fetch_current_user(&client, &server_url, &session_token).await?;
    if !user.is_kitchen {
        return Err(ListenerError::NotKitchenUser);
    }
    info!("Listening for kitchen orders of {} ({}).", user.full_name, user.id);
    let ws_url = websocket_url(&server_url, &session_token)?;
    let mut state = KitchenClientState::new(user.id);

    loop {
        match listen_once(&client, &ws_url, &mut state).await {
            Ok(()) => info!("Connection closed by server."),
            Err(e) => warn!("{}", e),
        }
        let Some(delay) = state.on_disconnected() else {
            continue;
        };
        info!("Reconnecting in {} ms.", delay.as_millis());
        actix_web::rt::time::sleep(delay).await;

        let still_kitchen_user =
            match fetch_current_user(&client, &server_url, &session_token).await {
                Ok(user) => user.is_kitchen,
                Err(ListenerError::NotAuthenticated) => false,
                // The server may still be down. Keep the last known role and try again.
                Err(e) => {
                    debug!("Could not refresh user information: {}", e);
                    true
                }
            };
        if !state.reconnect_due(still_kitchen_user) {
            return Err(ListenerError::NotKitchenUser);
        }
    }
}

async fn fetch_current_user(
    client: &awc::Client,
    server_url: &Url,
    session_token: &str,
) -> Result<CurrentUser, ListenerError> {
    let url = server_url.join("/api/v1/me")?;
    let mut response = client
        .get(url.as_str())
        .insert_header(("X-SESSION-TOKEN", session_token))
        .send()
        .await
        .map_err(|e| ListenerError::Request(e.to_string()))?;
    match response.status() {
        StatusCode::OK => response
            .json::<CurrentUser>()
            .await
            .map_err(|e| ListenerError::Request(e.to_string())),
        StatusCode::FORBIDDEN | StatusCode::UNAUTHORIZED => Err(ListenerError::NotAuthenticated),
        status => Err(ListenerError::Request(format!(
            "Unexpected HTTP status {}",
            status
        ))),
    }
}

/// Derive the URL of the WebSocket endpoint from the server's base URL
fn websocket_url(server_url: &Url, session_token: &str) -> Result<Url, ListenerError> {
    let mut url = server_url.join("/ws")?;
    let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
    url.set_scheme(scheme)
        .map_err(|_| ListenerError::Request(format!("Unsupported URL scheme of {}", server_url)))?;
    url.query_pairs_mut().append_pair("token", session_token);
    Ok(url)
}

/// Run a single WebSocket connection until it is closed
async fn listen_once(
    client: &awc::Client,
    ws_url: &Url,
    state: &mut KitchenClientState,
) -> Result<(), ListenerError> {
    let (_response, mut connection) = client
        .ws(ws_url.as_str())
        .connect()
        .await
        .map_err(|e| ListenerError::WebSocket(e.to_string()))?;

    let greeting = serde_json::to_string(&state.on_connected())
        .map_err(|e| ListenerError::WebSocket(e.to_string()))?;
    connection.send(ws::Message::Text(greeting.into())).await?;

    while let Some(frame) = connection.next().await {
        match frame? {
            ws::Frame::Text(text) => match serde_json::from_slice::<KitchenServerEvent>(&text) {
                Ok(event) => {
                    if let Some(notice) = state.on_server_event(event) {
                        print_order(&notice);
                    }
                }
                Err(e) => warn!("Could not parse event from server: {}", e),
            },
            ws::Frame::Ping(data) => connection.send(ws::Message::Pong(data)).await?,
            ws::Frame::Close(reason) => {
                debug!("Close frame received: {:?}", reason);
                break;
            }
            _ => {}
        }
    }
    Ok(())
}

fn print_order(notice: &NewOrderNotice) {
    println!("{}", notice.message);
    println!(
        "  {} | {} {}-{} | {}",
        notice.booking.title,
        notice.booking.date,
        notice.booking.start_time,
        notice.booking.end_time,
        notice.booking.room
    );
    println!(
        "  {} people | meals: {} | drinks: {}",
        notice.order.people_count, notice.order.requested_meals, notice.order.requested_drinks
    );
}
