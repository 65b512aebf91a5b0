//! The backend part of the backend: the database interface
//!
//! The primary entry point to this module is the function [get_store_from_env], which returns an
//! object implementing the [RoomBookStore] trait. This object can be shared between threads in a
//! global application state and be used to create [RoomBookStoreFacade] instances for interaction
//! with the database. These provide a CRUD-like interface, using the data models from the [models]
//! module.
//!
//! The primary implementation of [RoomBookStore] ([postgres::PgDataStore]) wraps a PostgreSQL
//! connection pool and its corresponding [RoomBookStoreFacade] objects
//! ([postgres::PgDataStoreFacade]) hold a reference to one pooled connection each, using the Diesel
//! query DSL for implementing the database interaction.
//!
//! There is also a mock implementation for unittests.

use crate::auth_session::SessionToken;
use crate::cli_error::CliError;
use crate::scheduling::conflict_guard::BookingRejection;
use crate::setup;
use auth_token::{AuthToken, Privilege};
use chrono::NaiveDate;

pub mod auth_token;
pub mod models;
mod postgres;
mod schema;
#[cfg(test)]
pub mod store_mock;
mod util;

/// Get a [RoomBookStore] instance, according the "DATABASE_URL" environment variable.
///
/// The DATABASE_URL must be a PosgreSQL connection url, following the schema
/// "postgres://{user}:{password}@{host}/{database}".
pub fn get_store_from_env() -> Result<impl RoomBookStore, CliError> {
    get_store(&setup::ServerConfig::database_url_from_env()?)
}

/// Get a [RoomBookStore] instance for the given PostgreSQL connection url
pub fn get_store(database_url: &str) -> Result<impl RoomBookStore, CliError> {
    postgres::PgDataStore::new(database_url)
        .map_err(|err| CliError::UnexpectedStoreError(err.to_string()))
}

pub type UserId = uuid::Uuid;
pub type RoomId = uuid::Uuid;
pub type BookingId = uuid::Uuid;
pub type KitchenOrderId = uuid::Uuid;

pub trait RoomBookStoreFacade {
    /// Get an [AuthToken] instance for a client, representing the access roles of the user, who
    /// the session token has been issued for.
    fn get_auth_token_for_session(
        &mut self,
        session_token: &SessionToken,
    ) -> Result<AuthToken, StoreError>;

    /// Get the user, the auth token has been created for
    fn get_current_user(&mut self, auth_token: &AuthToken) -> Result<models::User, StoreError>;
    fn get_users(&mut self, auth_token: &AuthToken) -> Result<Vec<models::User>, StoreError>;
    fn get_user_by_username(
        &mut self,
        auth_token: &AuthToken,
        username: &str,
    ) -> Result<models::User, StoreError>;
    fn create_user(
        &mut self,
        auth_token: &AuthToken,
        user: models::NewUser,
    ) -> Result<models::User, StoreError>;

    /// Change the role flags of a user. Role changes take effect with the next request of the
    /// user, since [AuthToken]s are created per request.
    fn update_user_roles(
        &mut self,
        auth_token: &AuthToken,
        user_id: UserId,
        patch: models::UserRolesPatch,
    ) -> Result<models::User, StoreError>;

    /// Get the list of rooms, sorted by name. Inactive rooms are only included, if
    /// `include_inactive` is true.
    fn get_rooms(
        &mut self,
        auth_token: &AuthToken,
        include_inactive: bool,
    ) -> Result<Vec<models::Room>, StoreError>;
    /// Get a single room, regardless of its `is_active` state
    fn get_room(&mut self, auth_token: &AuthToken, room_id: RoomId)
        -> Result<models::Room, StoreError>;
    fn create_room(
        &mut self,
        auth_token: &AuthToken,
        room: models::NewRoom,
    ) -> Result<models::Room, StoreError>;
    fn update_room(
        &mut self,
        auth_token: &AuthToken,
        room_id: RoomId,
        patch: models::RoomPatch,
    ) -> Result<models::Room, StoreError>;
    /// Soft-delete a room by deactivating it. Existing bookings are kept.
    fn deactivate_room(&mut self, auth_token: &AuthToken, room_id: RoomId)
        -> Result<(), StoreError>;

    /// Get the number of bookings (of any date and status) of each active room, sorted by
    /// descending booking count
    fn get_room_stats(&mut self, auth_token: &AuthToken)
        -> Result<Vec<models::RoomStats>, StoreError>;

    /// Get a filtered list of bookings.
    ///
    /// Bookings are returned in chronological order, i.e. sorted by (date, start_time).
    fn get_bookings_filtered(
        &mut self,
        auth_token: &AuthToken,
        filter: BookingFilter,
    ) -> Result<Vec<models::Booking>, StoreError>;
    fn get_booking(
        &mut self,
        auth_token: &AuthToken,
        booking_id: BookingId,
    ) -> Result<models::Booking, StoreError>;
    /// Get all confirmed bookings of the given room on the given date, sorted by start time
    fn get_confirmed_bookings(
        &mut self,
        auth_token: &AuthToken,
        room_id: RoomId,
        date: NaiveDate,
    ) -> Result<Vec<models::Booking>, StoreError>;
    /// Create a new confirmed booking, owned by the user of the `auth_token`.
    ///
    /// The booking is checked with [crate::scheduling::conflict_guard::check_booking_slot] against
    /// the confirmed bookings of the same room and date, atomically with the insertion.
    ///
    /// # return value
    /// - `Ok(booking)` with the created booking
    /// - `Err(StoreError::NotExisting)` if the room does not exist or is inactive
    /// - `Err(StoreError::BookingRejected(_))` if the time range is invalid or conflicting
    /// - `Err(StoreError::TransactionConflict)` if a concurrent transaction interfered. The
    ///   request may be retried.
    fn create_booking(
        &mut self,
        auth_token: &AuthToken,
        booking: models::NewBooking,
    ) -> Result<models::Booking, StoreError>;
    /// Update the given fields of an existing booking. Only allowed for the owner of the booking
    /// or with the [Privilege::ManageAllBookings] privilege.
    ///
    /// The effective room, date and time range (after applying the patch) is checked in the same
    /// way as in [Self::create_booking], excluding the booking itself.
    fn update_booking(
        &mut self,
        auth_token: &AuthToken,
        booking_id: BookingId,
        patch: models::BookingPatch,
    ) -> Result<models::Booking, StoreError>;
    fn delete_booking(
        &mut self,
        auth_token: &AuthToken,
        booking_id: BookingId,
    ) -> Result<(), StoreError>;

    /// Create a pending kitchen order for a booking.
    ///
    /// Fails with `StoreError::ConflictEntityExists` if there is an order for the booking already.
    fn create_kitchen_order(
        &mut self,
        auth_token: &AuthToken,
        order: models::NewKitchenOrder,
    ) -> Result<models::KitchenOrder, StoreError>;
    /// Get kitchen orders, sorted by (order_date, order_time)
    fn get_kitchen_orders(
        &mut self,
        auth_token: &AuthToken,
        filter: KitchenOrderFilter,
    ) -> Result<Vec<models::KitchenOrder>, StoreError>;
    /// Mark a kitchen order as completed by the user of the `auth_token`.
    ///
    /// Completing an already completed order is allowed and updates the completion timestamp and
    /// user.
    fn complete_kitchen_order(
        &mut self,
        auth_token: &AuthToken,
        order_id: KitchenOrderId,
    ) -> Result<models::KitchenOrder, StoreError>;
}

/// Filter options for retrieving bookings from the store via
/// [RoomBookStoreFacade::get_bookings_filtered]
///
/// Can be constructed through the [BookingFilterBuilder]
#[derive(Default, Clone, Debug)]
pub struct BookingFilter {
    /// Filter for bookings owned by the given user
    pub owner: Option<UserId>,
    /// Filter for bookings of the given room
    pub room: Option<RoomId>,
    /// Filter for bookings on the given date
    pub date: Option<NaiveDate>,
    /// Filter for bookings with status "confirmed"
    pub only_confirmed: bool,
}

impl BookingFilter {
    /// Checks if a given booking matches the filter
    ///
    /// Usually, filtering should be done by the database. This function can be used for separate
    /// checks of individual bookings in software.
    pub fn matches(&self, booking: &models::Booking) -> bool {
        if let Some(owner) = self.owner {
            if owner != booking.user_id {
                return false;
            }
        }
        if let Some(room) = self.room {
            if room != booking.room_id {
                return false;
            }
        }
        if let Some(date) = self.date {
            if date != booking.date {
                return false;
            }
        }
        if self.only_confirmed && booking.status != models::BookingStatus::Confirmed {
            return false;
        }
        true
    }
}

/// Builder for constructing BookingFilter objects
pub struct BookingFilterBuilder {
    result: BookingFilter,
}

impl BookingFilterBuilder {
    pub fn new() -> Self {
        Self {
            result: BookingFilter::default(),
        }
    }

    /// Add filter to only include bookings of the given user
    pub fn owned_by(mut self, user_id: UserId) -> Self {
        self.result.owner = Some(user_id);
        self
    }

    pub fn in_room(mut self, room_id: RoomId) -> Self {
        self.result.room = Some(room_id);
        self
    }

    pub fn on_date(mut self, date: NaiveDate) -> Self {
        self.result.date = Some(date);
        self
    }

    /// Add filter to exclude pending and cancelled bookings
    pub fn only_confirmed(mut self) -> Self {
        self.result.only_confirmed = true;
        self
    }

    /// Create the BookingFilter object
    pub fn build(self) -> BookingFilter {
        self.result
    }
}

/// Selection of kitchen orders for [RoomBookStoreFacade::get_kitchen_orders]
#[derive(Clone, Copy, Debug)]
pub enum KitchenOrderFilter {
    /// Orders assigned to the given kitchen worker
    AssignedTo(UserId),
    /// Orders for bookings of the given room
    ForRoom(RoomId),
}

impl KitchenOrderFilter {
    pub fn matches(&self, order: &models::KitchenOrder) -> bool {
        match self {
            KitchenOrderFilter::AssignedTo(user_id) => order.user_id == *user_id,
            KitchenOrderFilter::ForRoom(room_id) => order.room_id == *room_id,
        }
    }
}

pub trait RoomBookStore: Send + Sync {
    fn get_facade<'a>(&'a self) -> Result<Box<dyn RoomBookStoreFacade + 'a>, StoreError>;
}

#[derive(Debug)]
pub enum StoreError {
    /// Connection the database failed. See string description for details.
    ConnectionError(String),
    /// The query could not be executed because of some error not covered by the other members (see
    /// string description)
    QueryError(diesel::result::Error),
    /// Database transaction could not be commited due to a conflicting concurrent transaction
    TransactionConflict,
    /// The requested entity does not exist
    NotExisting,
    /// The entity could not be created because it already exists
    ConflictEntityExists,
    /// The client is not authorized for this action. It would need to have an access role
    /// qualifying for the `required_privilege`.
    PermissionDenied { required_privilege: Privilege },
    /// The booking has been rejected by the conflict guard
    BookingRejected(BookingRejection),
    /// The provided data is invalid, i.e. it does not match the expected ranges or violates a
    /// SQL constraint. See string description for details.
    InvalidInputData(String),
    /// Some data queried from the database could not be deserialized. See string description for
    /// details.
    InvalidDataInDatabase(String),
}

impl From<diesel::result::Error> for StoreError {
    fn from(error: diesel::result::Error) -> Self {
        match error {
            diesel::result::Error::NotFound => Self::NotExisting,
            diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::UniqueViolation,
                _,
            ) => Self::ConflictEntityExists,
            diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::SerializationFailure,
                _,
            ) => Self::TransactionConflict,
            diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::ForeignKeyViolation
                | diesel::result::DatabaseErrorKind::CheckViolation,
                info,
            ) => Self::InvalidInputData(
                info.constraint_name()
                    .and_then(postgres::description_for_postgres_constraint)
                    .map(|s| s.to_owned())
                    .unwrap_or_else(|| info.message().to_owned()),
            ),
            diesel::result::Error::SerializationError(e) => Self::InvalidInputData(e.to_string()),
            diesel::result::Error::DeserializationError(e) => {
                Self::InvalidDataInDatabase(e.to_string())
            }
            _ => Self::QueryError(error),
        }
    }
}

impl From<r2d2::Error> for StoreError {
    fn from(error: r2d2::Error) -> Self {
        Self::ConnectionError(error.to_string())
    }
}

impl From<BookingRejection> for StoreError {
    fn from(value: BookingRejection) -> Self {
        Self::BookingRejected(value)
    }
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ConnectionError(e) => write!(f, "Error connecting to database: {}", e),
            Self::QueryError(e) => write!(f, "Error while executing database query: {}", e),
            Self::TransactionConflict => f.write_str("Database transaction could not be commited due to a conflicting concurrent transaction"),
            Self::NotExisting => f.write_str("Database record does not exist."),
            Self::ConflictEntityExists => f.write_str("Database record exists already."),
            Self::PermissionDenied { required_privilege } => {
                write!(
                    f,
                    "Client is not authorized to perform this action. {:?} privilege required (one of the roles {}).",
                    required_privilege,
                    required_privilege
                        .qualifying_roles()
                        .iter()
                        .map(|r| r.name())
                        .collect::<Vec<_>>()
                        .join(", ")
                )
            }
            Self::BookingRejected(rejection) => rejection.fmt(f),
            Self::InvalidInputData(e) => {
                write!(f, "Data to be stored in database is not valid: {}", e)
            }
            StoreError::InvalidDataInDatabase(e) => {
                write!(f, "Data queried from database could not be deserialized: {}", e)
            },
        }
    }
}

impl std::error::Error for StoreError {}
