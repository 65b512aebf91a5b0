use std::fmt::Display;

mod endpoints_auth;
mod endpoints_availability;
mod endpoints_booking;
mod endpoints_dashboard;
mod endpoints_kitchen;
mod endpoints_room;
mod endpoints_user;
#[cfg(test)]
mod tests;

use crate::auth_session::{SessionToken, SESSION_TOKEN_MAX_AGE};
use crate::data_store::auth_token::{AuthToken, Privilege};
use crate::data_store::{RoomBookStoreFacade, StoreError};
use crate::scheduling::conflict_guard::BookingRejection;
use actix_web::error::JsonPayloadError;
use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    web, HttpResponse,
};
use serde_json::json;

pub fn configure_app(cfg: &mut web::ServiceConfig) {
    cfg.service(get_api_service());
}

fn get_api_service() -> actix_web::Scope {
    let json_config =
        web::JsonConfig::default().error_handler(|err, _req| APIError::InvalidJson(err).into());
    let query_config = web::QueryConfig::default()
        .error_handler(|err, _req| APIError::InvalidData(err.to_string()).into());
    web::scope("/api/v1")
        .app_data(json_config)
        .app_data(query_config)
        .service(endpoints_auth::get_current_user)
        .service(endpoints_room::list_rooms)
        .service(endpoints_room::get_room)
        .service(endpoints_room::create_room)
        .service(endpoints_room::change_room)
        .service(endpoints_room::delete_room)
        .service(endpoints_booking::list_own_bookings)
        .service(endpoints_booking::list_all_bookings)
        .service(endpoints_booking::get_booking)
        .service(endpoints_booking::create_booking)
        .service(endpoints_booking::change_booking)
        .service(endpoints_booking::delete_booking)
        .service(endpoints_availability::get_availability)
        .service(endpoints_kitchen::list_own_kitchen_orders)
        .service(endpoints_kitchen::list_room_kitchen_orders)
        .service(endpoints_kitchen::complete_kitchen_order)
        .service(endpoints_dashboard::get_dashboard_stats)
        .service(endpoints_dashboard::get_room_stats)
        .service(endpoints_user::list_users)
        .service(endpoints_user::change_user_roles)
}

#[derive(Debug)]
pub enum APIError {
    NotExisting,
    AlreadyExisting,
    PermissionDenied { required_privilege: Privilege },
    NoSessionToken,
    InvalidSessionToken,
    InvalidJson(actix_web::error::JsonPayloadError),
    InvalidData(String),
    BookingRejected(BookingRejection),
    TransactionConflict,
    InternalError(String),
}

impl Display for APIError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotExisting => f.write_str("Element does not exist")?,
            Self::AlreadyExisting => {
                f.write_str("Element already exists")?;
            },
            Self::PermissionDenied{required_privilege} => {
                write!(f, "Client is not authorized to perform this action. Authentication as {} is required.",
                       required_privilege
                           .qualifying_roles()
                           .iter()
                           .map(|role| role.name().to_owned())
                           .collect::<Vec<String>>()
                           .join(" or "))?;
            },
            Self::NoSessionToken => {
                f.write_str("This action requires authentication, but client did not send authentication session token.")?
            },
            Self::InvalidSessionToken => {
                f.write_str("This action requires authentication, but client authentication session given by the client is not valid.")?
            },
            Self::InternalError(s) => {
                f.write_str("Internal error: ")?;
                f.write_str(s)?;
            },
            Self::InvalidJson(e) => {
                write!(f, "Invalid JSON request data: {}", e)?;
            },
            Self::InvalidData(e) => {
                write!(f, "Invalid request data: {}", e)?;
            },
            Self::BookingRejected(rejection) => {
                write!(f, "{}", rejection)?;
            },
            Self::TransactionConflict => {
                f.write_str("Concurrent database transaction conflict. Please retry request.")?;
            },
        };
        Ok(())
    }
}

impl ResponseError for APIError {
    fn error_response(&self) -> HttpResponse {
        let message = format!("{}", self);

        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .json(json!({
                "httpCode": self.status_code().as_u16(),
                "message": message
            }))
    }
    fn status_code(&self) -> StatusCode {
        match self {
            Self::NotExisting => StatusCode::NOT_FOUND,
            Self::AlreadyExisting => StatusCode::CONFLICT,
            Self::PermissionDenied { .. } => StatusCode::FORBIDDEN,
            Self::NoSessionToken => StatusCode::FORBIDDEN,
            Self::InvalidSessionToken => StatusCode::FORBIDDEN,
            Self::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::InvalidJson(e) => match e {
                JsonPayloadError::ContentType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
                _ => StatusCode::BAD_REQUEST,
            },
            Self::InvalidData(_) => StatusCode::BAD_REQUEST,
            Self::BookingRejected(BookingRejection::InvalidRange { .. }) => StatusCode::BAD_REQUEST,
            Self::BookingRejected(BookingRejection::Conflict { .. }) => StatusCode::CONFLICT,
            Self::TransactionConflict => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl From<StoreError> for APIError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::ConnectionError(error) => {
                Self::InternalError(format!("Could not connect to database: {}", error))
            }
            StoreError::QueryError(diesel_error) => Self::InternalError(format!(
                "Error while executing database query: {}",
                diesel_error
            )),
            StoreError::TransactionConflict => Self::TransactionConflict,
            StoreError::NotExisting => Self::NotExisting,
            StoreError::ConflictEntityExists => Self::AlreadyExisting,
            StoreError::PermissionDenied { required_privilege } => {
                Self::PermissionDenied { required_privilege }
            }
            StoreError::BookingRejected(rejection) => Self::BookingRejected(rejection),
            StoreError::InvalidInputData(e) => Self::InvalidData(e),
            StoreError::InvalidDataInDatabase(e) => Self::InternalError(format!(
                "Data queried from database could not be deserialized: {}",
                e
            )),
        }
    }
}

impl From<actix_web::error::BlockingError> for APIError {
    fn from(_e: actix_web::error::BlockingError) -> Self {
        APIError::InternalError(
            "Could not get thread from thread pool for synchronous database operation.".to_owned(),
        )
    }
}

impl From<crate::auth_session::SessionError> for APIError {
    fn from(_e: crate::auth_session::SessionError) -> Self {
        APIError::InvalidSessionToken
    }
}

/// Get the [AuthToken] for the user of a verified session token. Sessions of users which do not
/// exist (anymore) are rejected as invalid.
pub(super) fn authenticate(
    store: &mut dyn RoomBookStoreFacade,
    session_token: &SessionToken,
) -> Result<AuthToken, APIError> {
    store
        .get_auth_token_for_session(session_token)
        .map_err(|e| match e {
            StoreError::NotExisting => APIError::InvalidSessionToken,
            e => e.into(),
        })
}

/// The `X-SESSION-TOKEN` request header, carrying the (still unverified) session token
pub(super) struct SessionTokenHeader(String);

impl SessionTokenHeader {
    pub(super) fn session_token(
        &self,
        secret: &str,
    ) -> Result<SessionToken, crate::auth_session::SessionError> {
        SessionToken::from_string(&self.0, secret, SESSION_TOKEN_MAX_AGE)
    }
}

impl actix_web::http::header::TryIntoHeaderValue for SessionTokenHeader {
    type Error = actix_web::http::header::InvalidHeaderValue;

    fn try_into_value(self) -> Result<actix_web::http::header::HeaderValue, Self::Error> {
        self.0.parse()
    }
}

impl actix_web::http::header::Header for SessionTokenHeader {
    fn name() -> actix_web::http::header::HeaderName {
        actix_web::http::header::HeaderName::from_static("x-session-token")
    }

    fn parse<M: actix_web::HttpMessage>(msg: &M) -> Result<Self, actix_web::error::ParseError> {
        Ok(Self(
            msg.headers()
                .get(Self::name())
                .ok_or(actix_web::error::ParseError::Header)?
                .to_str()
                .unwrap_or("")
                .to_owned(),
        ))
    }
}
