use chrono::{naive::NaiveDate, DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CurrentUser {
    pub id: Uuid,
    pub username: String,
    #[serde(rename = "fullName")]
    pub full_name: String,
    #[serde(rename = "isAdmin")]
    pub is_admin: bool,
    #[serde(rename = "isKitchen")]
    pub is_kitchen: bool,
}

/// User entry of the user administration
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    #[serde(rename = "fullName")]
    pub full_name: String,
    #[serde(rename = "isAdmin")]
    pub is_admin: bool,
    #[serde(rename = "isKitchen")]
    pub is_kitchen: bool,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

/// Changes of the role flags of a user. Missing fields are left unchanged.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct UserRolesPatch {
    #[serde(default, rename = "isAdmin", skip_serializing_if = "Option::is_none")]
    pub is_admin: Option<bool>,
    #[serde(default, rename = "isKitchen", skip_serializing_if = "Option::is_none")]
    pub is_kitchen: Option<bool>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Room {
    pub id: Uuid,
    pub name: String,
    pub location: String,
    pub capacity: i32,
    #[serde(rename = "isActive")]
    pub is_active: bool,
    #[serde(default, rename = "assignedKitchenUserId")]
    pub assigned_kitchen_user_id: Option<Uuid>,
}

/// Payload for creating a room
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct NewRoom {
    pub name: String,
    pub location: String,
    pub capacity: i32,
    #[serde(default, rename = "assignedKitchenUserId")]
    pub assigned_kitchen_user_id: Option<Uuid>,
}

/// Partial update of a room. Fields which are not given are left unchanged.
///
/// `assignedKitchenUserId` distinguishes between "not given" (field missing) and "remove the
/// assignment" (`null`).
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct RoomPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<i32>,
    #[serde(
        default,
        rename = "assignedKitchenUserId",
        skip_serializing_if = "Option::is_none",
        with = "double_option"
    )]
    pub assigned_kitchen_user_id: Option<Option<Uuid>>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Confirmed,
    Pending,
    Cancelled,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Booking {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, rename = "responsavel")]
    pub responsible_person: Option<String>,
    #[serde(rename = "userId")]
    pub user_id: Uuid,
    #[serde(rename = "roomId")]
    pub room_id: Uuid,
    pub date: NaiveDate,
    #[serde(rename = "startTime")]
    pub start_time: String,
    #[serde(rename = "endTime")]
    pub end_time: String,
    pub status: BookingStatus,
    #[serde(rename = "cafeRequested")]
    pub cafe_requested: bool,
    #[serde(default, rename = "peopleCount")]
    pub people_count: Option<i32>,
    #[serde(default, rename = "requestedMeals")]
    pub requested_meals: Option<String>,
    #[serde(default, rename = "requestedDrinks")]
    pub requested_drinks: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

/// Payload of a booking creation request
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct NewBooking {
    pub title: String,
    #[serde(rename = "roomId")]
    pub room_id: Uuid,
    pub date: NaiveDate,
    #[serde(rename = "startTime")]
    pub start_time: String,
    #[serde(rename = "endTime")]
    pub end_time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, rename = "responsavel", skip_serializing_if = "Option::is_none")]
    pub responsible_person: Option<String>,
    #[serde(default, rename = "cafeRequested")]
    pub cafe_requested: bool,
    #[serde(default, rename = "peopleCount", skip_serializing_if = "Option::is_none")]
    pub people_count: Option<i32>,
    #[serde(default, rename = "requestedMeals", skip_serializing_if = "Option::is_none")]
    pub requested_meals: Option<String>,
    #[serde(default, rename = "requestedDrinks", skip_serializing_if = "Option::is_none")]
    pub requested_drinks: Option<String>,
}

/// Partial update of a booking. Fields which are not given are taken from the stored booking.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct BookingPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, rename = "responsavel", skip_serializing_if = "Option::is_none")]
    pub responsible_person: Option<String>,
    #[serde(default, rename = "roomId", skip_serializing_if = "Option::is_none")]
    pub room_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(default, rename = "startTime", skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(default, rename = "endTime", skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum KitchenOrderStatus {
    Pending,
    Completed,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct KitchenOrder {
    pub id: Uuid,
    #[serde(rename = "bookingId")]
    pub booking_id: Uuid,
    #[serde(rename = "roomId")]
    pub room_id: Uuid,
    /// The kitchen worker responsible for this order
    #[serde(rename = "userId")]
    pub user_id: Uuid,
    #[serde(rename = "peopleCount")]
    pub people_count: i32,
    #[serde(rename = "requestedMeals")]
    pub requested_meals: String,
    #[serde(rename = "requestedDrinks")]
    pub requested_drinks: String,
    pub status: KitchenOrderStatus,
    #[serde(rename = "orderDate")]
    pub order_date: NaiveDate,
    #[serde(rename = "orderTime")]
    pub order_time: String,
    #[serde(default, rename = "completedAt")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, rename = "completedBy")]
    pub completed_by: Option<Uuid>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Availability {
    #[serde(rename = "startTimes")]
    pub start_times: Vec<String>,
    #[serde(rename = "endTimes")]
    pub end_times: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DashboardStats {
    #[serde(rename = "todayBookings")]
    pub today_bookings: u32,
    #[serde(rename = "activeRooms")]
    pub active_rooms: u32,
    /// Percentage of today's bookable time of all active rooms, which is booked
    #[serde(rename = "occupancyRate")]
    pub occupancy_rate: u32,
    #[serde(rename = "activeUsers")]
    pub active_users: u32,
}

/// Usage of a single active room: number of bookings of all dates and states
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RoomStats {
    #[serde(rename = "roomId")]
    pub room_id: Uuid,
    #[serde(rename = "roomName")]
    pub room_name: String,
    pub location: String,
    #[serde(rename = "bookingCount")]
    pub booking_count: u32,
}

/// Booking summary, sent along with a new kitchen order notification
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct KitchenOrderBooking {
    pub title: String,
    pub date: NaiveDate,
    #[serde(rename = "startTime")]
    pub start_time: String,
    #[serde(rename = "endTime")]
    pub end_time: String,
    /// Name of the room
    pub room: String,
}

/// Events sent by kitchen clients over the notification WebSocket
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum KitchenClientEvent {
    #[serde(rename = "KITCHEN_USER_CONNECT")]
    KitchenUserConnect {
        #[serde(rename = "userId")]
        user_id: Uuid,
    },
}

/// Events sent by the server to kitchen clients over the notification WebSocket
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum KitchenServerEvent {
    #[serde(rename = "CONNECTION_CONFIRMED")]
    ConnectionConfirmed { message: String },
    #[serde(rename = "NEW_KITCHEN_ORDER")]
    NewKitchenOrder {
        order: KitchenOrder,
        booking: KitchenOrderBooking,
        message: String,
    },
}

/// (De)serialization of `Option<Option<T>>` fields, such that a missing field is deserialized as
/// `None` and an explicit `null` as `Some(None)`. Use together with `#[serde(default)]`.
mod double_option {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<T, S>(value: &Option<Option<T>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: Serialize,
        S: Serializer,
    {
        match value {
            Some(inner) => inner.serialize(serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        T: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }
}
