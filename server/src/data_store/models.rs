use crate::data_store::auth_token::{AccessRole, EnumMemberNotExistingError};
use crate::data_store::{BookingId, RoomId, UserId};
use crate::scheduling::time_interval::{ClockTime, TimeInterval};
use chrono::{naive::NaiveDate, DateTime, Utc};
use diesel::deserialize::FromSql;
use diesel::prelude::*;
use diesel::query_builder::bind_collector::RawBytesBindCollector;
use diesel::serialize::ToSql;
use diesel::{AsExpression, FromSqlRow};
use uuid::Uuid;

pub const MAX_BOOKING_TITLE_LENGTH: usize = 100;
pub const MIN_ROOM_CAPACITY: i32 = 1;
pub const MAX_ROOM_CAPACITY: i32 = 500;

#[derive(Clone, Debug, Queryable, Selectable, Identifiable)]
#[diesel(table_name=super::schema::users)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub full_name: String,
    pub is_admin: bool,
    pub is_kitchen: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn roles(&self) -> Vec<AccessRole> {
        AccessRole::for_user_flags(self.is_admin, self.is_kitchen)
    }
}

impl From<User> for roombook_api_types::CurrentUser {
    fn from(value: User) -> Self {
        Self {
            id: value.id,
            username: value.username,
            full_name: value.full_name,
            is_admin: value.is_admin,
            is_kitchen: value.is_kitchen,
        }
    }
}

impl From<User> for roombook_api_types::User {
    fn from(value: User) -> Self {
        Self {
            id: value.id,
            username: value.username,
            full_name: value.full_name,
            is_admin: value.is_admin,
            is_kitchen: value.is_kitchen,
            created_at: value.created_at,
        }
    }
}

#[derive(Clone, Debug, Insertable)]
#[diesel(table_name=super::schema::users)]
pub struct NewUser {
    pub id: UserId,
    pub username: String,
    pub full_name: String,
    pub is_admin: bool,
    pub is_kitchen: bool,
}

/// Changes of the role flags of a user. `None` fields are left unchanged.
#[derive(Clone, Debug, Default, PartialEq, AsChangeset)]
#[diesel(table_name=super::schema::users)]
pub struct UserRolesPatch {
    pub is_admin: Option<bool>,
    pub is_kitchen: Option<bool>,
}

impl UserRolesPatch {
    pub fn is_empty(&self) -> bool {
        self.is_admin.is_none() && self.is_kitchen.is_none()
    }

    pub fn apply_to(&self, user: &mut User) {
        if let Some(is_admin) = self.is_admin {
            user.is_admin = is_admin;
        }
        if let Some(is_kitchen) = self.is_kitchen {
            user.is_kitchen = is_kitchen;
        }
    }
}

impl From<roombook_api_types::UserRolesPatch> for UserRolesPatch {
    fn from(value: roombook_api_types::UserRolesPatch) -> Self {
        Self {
            is_admin: value.is_admin,
            is_kitchen: value.is_kitchen,
        }
    }
}

#[derive(Clone, Debug, Queryable, Selectable, Identifiable)]
#[diesel(table_name=super::schema::rooms)]
pub struct Room {
    pub id: RoomId,
    pub name: String,
    pub location: String,
    pub capacity: i32,
    pub is_active: bool,
    pub assigned_kitchen_user_id: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

impl From<Room> for roombook_api_types::Room {
    fn from(value: Room) -> Self {
        Self {
            id: value.id,
            name: value.name,
            location: value.location,
            capacity: value.capacity,
            is_active: value.is_active,
            assigned_kitchen_user_id: value.assigned_kitchen_user_id,
        }
    }
}

#[derive(Clone, Debug, Insertable)]
#[diesel(table_name=super::schema::rooms)]
pub struct NewRoom {
    pub id: RoomId,
    pub name: String,
    pub location: String,
    pub capacity: i32,
    pub assigned_kitchen_user_id: Option<UserId>,
}

impl TryFrom<roombook_api_types::NewRoom> for NewRoom {
    type Error = String;

    fn try_from(value: roombook_api_types::NewRoom) -> Result<Self, Self::Error> {
        validate_room_name(&value.name)?;
        validate_room_capacity(value.capacity)?;
        Ok(Self {
            id: Uuid::now_v7(),
            name: value.name.trim().to_owned(),
            location: value.location.trim().to_owned(),
            capacity: value.capacity,
            assigned_kitchen_user_id: value.assigned_kitchen_user_id,
        })
    }
}

/// Changes of a [Room]. `None` fields are left unchanged. For `assigned_kitchen_user_id`,
/// `Some(None)` removes the assignment.
#[derive(Clone, Debug, Default, AsChangeset)]
#[diesel(table_name=super::schema::rooms)]
pub struct RoomPatch {
    pub name: Option<String>,
    pub location: Option<String>,
    pub capacity: Option<i32>,
    pub assigned_kitchen_user_id: Option<Option<UserId>>,
}

impl RoomPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.location.is_none()
            && self.capacity.is_none()
            && self.assigned_kitchen_user_id.is_none()
    }
}

impl TryFrom<roombook_api_types::RoomPatch> for RoomPatch {
    type Error = String;

    fn try_from(value: roombook_api_types::RoomPatch) -> Result<Self, Self::Error> {
        if let Some(name) = &value.name {
            validate_room_name(name)?;
        }
        if let Some(capacity) = value.capacity {
            validate_room_capacity(capacity)?;
        }
        Ok(Self {
            name: value.name.map(|n| n.trim().to_owned()),
            location: value.location.map(|l| l.trim().to_owned()),
            capacity: value.capacity,
            assigned_kitchen_user_id: value.assigned_kitchen_user_id,
        })
    }
}

fn validate_room_name(name: &str) -> Result<(), String> {
    if name.trim().is_empty() {
        return Err("Room name must not be empty".to_owned());
    }
    Ok(())
}

fn validate_room_capacity(capacity: i32) -> Result<(), String> {
    if !(MIN_ROOM_CAPACITY..=MAX_ROOM_CAPACITY).contains(&capacity) {
        return Err(format!(
            "Room capacity must be between {} and {}",
            MIN_ROOM_CAPACITY, MAX_ROOM_CAPACITY
        ));
    }
    Ok(())
}

#[derive(Clone, Debug, Queryable, Selectable, Identifiable)]
#[diesel(table_name=super::schema::bookings)]
pub struct Booking {
    pub id: BookingId,
    pub title: String,
    pub description: Option<String>,
    pub responsible_person: Option<String>,
    pub user_id: UserId,
    pub room_id: RoomId,
    pub date: NaiveDate,
    pub start_time: ClockTime,
    pub end_time: ClockTime,
    pub status: BookingStatus,
    pub cafe_requested: bool,
    pub people_count: Option<i32>,
    pub requested_meals: Option<String>,
    pub requested_drinks: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Booking {
    /// The booked time range. None only for inconsistent data, i.e. start_time >= end_time.
    pub fn interval(&self) -> Option<TimeInterval> {
        TimeInterval::new(self.start_time, self.end_time)
    }

    /// Check if the booking requests catering, i.e. a kitchen order should be created for it
    pub fn requests_catering(&self) -> bool {
        self.cafe_requested && self.people_count.is_some()
    }
}

impl From<Booking> for roombook_api_types::Booking {
    fn from(value: Booking) -> Self {
        Self {
            id: value.id,
            title: value.title,
            description: value.description,
            responsible_person: value.responsible_person,
            user_id: value.user_id,
            room_id: value.room_id,
            date: value.date,
            start_time: value.start_time.to_string(),
            end_time: value.end_time.to_string(),
            status: value.status.into(),
            cafe_requested: value.cafe_requested,
            people_count: value.people_count,
            requested_meals: value.requested_meals,
            requested_drinks: value.requested_drinks,
            created_at: value.created_at,
        }
    }
}

#[derive(Clone, Debug, Insertable)]
#[diesel(table_name=super::schema::bookings)]
pub struct NewBooking {
    pub id: BookingId,
    pub title: String,
    pub description: Option<String>,
    pub responsible_person: Option<String>,
    pub user_id: UserId,
    pub room_id: RoomId,
    pub date: NaiveDate,
    pub start_time: ClockTime,
    pub end_time: ClockTime,
    pub status: BookingStatus,
    pub cafe_requested: bool,
    pub people_count: Option<i32>,
    pub requested_meals: Option<String>,
    pub requested_drinks: Option<String>,
}

impl NewBooking {
    /// Create a new (confirmed) booking from the API data, owned by the given user.
    ///
    /// The fields are validated, except for the order of start and end time, which is checked by
    /// the conflict guard.
    pub fn from_api(
        booking: roombook_api_types::NewBooking,
        user_id: UserId,
    ) -> Result<Self, String> {
        validate_booking_title(&booking.title)?;
        if let Some(people_count) = booking.people_count {
            validate_people_count(people_count)?;
        }
        Ok(Self {
            id: Uuid::now_v7(),
            title: booking.title.trim().to_owned(),
            description: booking.description,
            responsible_person: booking.responsible_person,
            user_id,
            room_id: booking.room_id,
            date: booking.date,
            start_time: booking.start_time.parse().map_err(|e| format!("{}", e))?,
            end_time: booking.end_time.parse().map_err(|e| format!("{}", e))?,
            status: BookingStatus::Confirmed,
            cafe_requested: booking.cafe_requested,
            people_count: booking.people_count,
            requested_meals: booking.requested_meals,
            requested_drinks: booking.requested_drinks,
        })
    }
}

/// Changes of a [Booking]. `None` fields are left unchanged.
#[derive(Clone, Debug, Default, AsChangeset)]
#[diesel(table_name=super::schema::bookings)]
pub struct BookingPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub responsible_person: Option<String>,
    pub room_id: Option<RoomId>,
    pub date: Option<NaiveDate>,
    pub start_time: Option<ClockTime>,
    pub end_time: Option<ClockTime>,
}

impl BookingPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.responsible_person.is_none()
            && self.room_id.is_none()
            && self.date.is_none()
            && self.start_time.is_none()
            && self.end_time.is_none()
    }

    /// Apply the changes to a booking in memory
    pub fn apply_to(self, booking: &mut Booking) {
        if let Some(title) = self.title {
            booking.title = title;
        }
        if let Some(description) = self.description {
            booking.description = Some(description);
        }
        if let Some(responsible_person) = self.responsible_person {
            booking.responsible_person = Some(responsible_person);
        }
        if let Some(room_id) = self.room_id {
            booking.room_id = room_id;
        }
        if let Some(date) = self.date {
            booking.date = date;
        }
        if let Some(start_time) = self.start_time {
            booking.start_time = start_time;
        }
        if let Some(end_time) = self.end_time {
            booking.end_time = end_time;
        }
    }
}

impl TryFrom<roombook_api_types::BookingPatch> for BookingPatch {
    type Error = String;

    fn try_from(value: roombook_api_types::BookingPatch) -> Result<Self, Self::Error> {
        if let Some(title) = &value.title {
            validate_booking_title(title)?;
        }
        Ok(Self {
            title: value.title.map(|t| t.trim().to_owned()),
            description: value.description,
            responsible_person: value.responsible_person,
            room_id: value.room_id,
            date: value.date,
            start_time: value
                .start_time
                .map(|t| t.parse())
                .transpose()
                .map_err(|e| format!("{}", e))?,
            end_time: value
                .end_time
                .map(|t| t.parse())
                .transpose()
                .map_err(|e| format!("{}", e))?,
        })
    }
}

fn validate_booking_title(title: &str) -> Result<(), String> {
    let length = title.trim().chars().count();
    if length == 0 {
        return Err("Booking title must not be empty".to_owned());
    }
    if length > MAX_BOOKING_TITLE_LENGTH {
        return Err(format!(
            "Booking title must not be longer than {} characters",
            MAX_BOOKING_TITLE_LENGTH
        ));
    }
    Ok(())
}

fn validate_people_count(people_count: i32) -> Result<(), String> {
    if people_count < 1 {
        return Err("People count must be at least 1".to_owned());
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, AsExpression, FromSqlRow)]
#[diesel(sql_type = diesel::sql_types::Integer)]
#[repr(i32)]
pub enum BookingStatus {
    Confirmed = 0,
    Pending = 1,
    Cancelled = 2,
}

impl TryFrom<i32> for BookingStatus {
    type Error = EnumMemberNotExistingError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(BookingStatus::Confirmed),
            1 => Ok(BookingStatus::Pending),
            2 => Ok(BookingStatus::Cancelled),
            _ => Err(EnumMemberNotExistingError {
                member_value: value,
                enum_name: "BookingStatus",
            }),
        }
    }
}

impl From<BookingStatus> for i32 {
    fn from(value: BookingStatus) -> Self {
        value as i32
    }
}

impl From<BookingStatus> for roombook_api_types::BookingStatus {
    fn from(value: BookingStatus) -> Self {
        match value {
            BookingStatus::Confirmed => Self::Confirmed,
            BookingStatus::Pending => Self::Pending,
            BookingStatus::Cancelled => Self::Cancelled,
        }
    }
}

impl<DB> ToSql<diesel::sql_types::Integer, DB> for BookingStatus
where
    DB: diesel::backend::Backend,
    for<'c> DB: diesel::backend::Backend<BindCollector<'c> = RawBytesBindCollector<DB>>,
    i32: ToSql<diesel::sql_types::Integer, DB>,
{
    fn to_sql<'b>(
        &'b self,
        out: &mut diesel::serialize::Output<'b, '_, DB>,
    ) -> diesel::serialize::Result {
        let value: i32 = (*self).into();
        value.to_sql(&mut out.reborrow())
    }
}

impl<DB> FromSql<diesel::sql_types::Integer, DB> for BookingStatus
where
    DB: diesel::backend::Backend,
    i32: FromSql<diesel::sql_types::Integer, DB>,
{
    fn from_sql(bytes: DB::RawValue<'_>) -> diesel::deserialize::Result<Self> {
        let x = i32::from_sql(bytes)?;
        x.try_into()
            .map_err(|e: EnumMemberNotExistingError| e.to_string().into())
    }
}

#[derive(Clone, Debug, Queryable, Selectable, Identifiable)]
#[diesel(table_name=super::schema::kitchen_orders)]
pub struct KitchenOrder {
    pub id: Uuid,
    pub booking_id: BookingId,
    pub room_id: RoomId,
    /// The kitchen worker responsible for this order
    pub user_id: UserId,
    pub people_count: i32,
    pub requested_meals: String,
    pub requested_drinks: String,
    pub status: KitchenOrderStatus,
    pub order_date: NaiveDate,
    pub order_time: ClockTime,
    pub completed_at: Option<DateTime<Utc>>,
    pub completed_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

impl From<KitchenOrder> for roombook_api_types::KitchenOrder {
    fn from(value: KitchenOrder) -> Self {
        Self {
            id: value.id,
            booking_id: value.booking_id,
            room_id: value.room_id,
            user_id: value.user_id,
            people_count: value.people_count,
            requested_meals: value.requested_meals,
            requested_drinks: value.requested_drinks,
            status: value.status.into(),
            order_date: value.order_date,
            order_time: value.order_time.to_string(),
            completed_at: value.completed_at,
            completed_by: value.completed_by,
            created_at: value.created_at,
        }
    }
}

#[derive(Clone, Debug, Insertable)]
#[diesel(table_name=super::schema::kitchen_orders)]
pub struct NewKitchenOrder {
    pub id: Uuid,
    pub booking_id: BookingId,
    pub room_id: RoomId,
    pub user_id: UserId,
    pub people_count: i32,
    pub requested_meals: String,
    pub requested_drinks: String,
    pub status: KitchenOrderStatus,
    pub order_date: NaiveDate,
    pub order_time: ClockTime,
}

impl NewKitchenOrder {
    /// Create a pending kitchen order for the catering request of the given booking, assigned to
    /// the kitchen worker `worker_id`.
    ///
    /// Returns None, if the booking does not request catering.
    pub fn for_booking(booking: &Booking, worker_id: UserId) -> Option<Self> {
        if !booking.cafe_requested {
            return None;
        }
        Some(Self {
            id: Uuid::now_v7(),
            booking_id: booking.id,
            room_id: booking.room_id,
            user_id: worker_id,
            people_count: booking.people_count?,
            requested_meals: booking.requested_meals.clone().unwrap_or_default(),
            requested_drinks: booking.requested_drinks.clone().unwrap_or_default(),
            status: KitchenOrderStatus::Pending,
            order_date: booking.date,
            order_time: booking.start_time,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, AsExpression, FromSqlRow)]
#[diesel(sql_type = diesel::sql_types::Integer)]
#[repr(i32)]
pub enum KitchenOrderStatus {
    Pending = 0,
    Completed = 1,
}

impl TryFrom<i32> for KitchenOrderStatus {
    type Error = EnumMemberNotExistingError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(KitchenOrderStatus::Pending),
            1 => Ok(KitchenOrderStatus::Completed),
            _ => Err(EnumMemberNotExistingError {
                member_value: value,
                enum_name: "KitchenOrderStatus",
            }),
        }
    }
}

impl From<KitchenOrderStatus> for i32 {
    fn from(value: KitchenOrderStatus) -> Self {
        value as i32
    }
}

impl From<KitchenOrderStatus> for roombook_api_types::KitchenOrderStatus {
    fn from(value: KitchenOrderStatus) -> Self {
        match value {
            KitchenOrderStatus::Pending => Self::Pending,
            KitchenOrderStatus::Completed => Self::Completed,
        }
    }
}

impl<DB> ToSql<diesel::sql_types::Integer, DB> for KitchenOrderStatus
where
    DB: diesel::backend::Backend,
    for<'c> DB: diesel::backend::Backend<BindCollector<'c> = RawBytesBindCollector<DB>>,
    i32: ToSql<diesel::sql_types::Integer, DB>,
{
    fn to_sql<'b>(
        &'b self,
        out: &mut diesel::serialize::Output<'b, '_, DB>,
    ) -> diesel::serialize::Result {
        let value: i32 = (*self).into();
        value.to_sql(&mut out.reborrow())
    }
}

impl<DB> FromSql<diesel::sql_types::Integer, DB> for KitchenOrderStatus
where
    DB: diesel::backend::Backend,
    i32: FromSql<diesel::sql_types::Integer, DB>,
{
    fn from_sql(bytes: DB::RawValue<'_>) -> diesel::deserialize::Result<Self> {
        let x = i32::from_sql(bytes)?;
        x.try_into()
            .map_err(|e: EnumMemberNotExistingError| e.to_string().into())
    }
}

/// Number of bookings of an active room, for usage statistics
#[derive(Clone, Debug, PartialEq)]
pub struct RoomStats {
    pub room_id: RoomId,
    pub room_name: String,
    pub location: String,
    pub booking_count: i64,
}

impl From<RoomStats> for roombook_api_types::RoomStats {
    fn from(value: RoomStats) -> Self {
        Self {
            room_id: value.room_id,
            room_name: value.room_name,
            location: value.location,
            booking_count: value.booking_count.try_into().unwrap_or(u32::MAX),
        }
    }
}

/// Order room statistics by descending booking count; rooms with equal count by name
pub fn sort_room_stats(stats: &mut [RoomStats]) {
    stats.sort_by(|a, b| {
        b.booking_count
            .cmp(&a.booking_count)
            .then_with(|| a.room_name.cmp(&b.room_name))
    });
}
