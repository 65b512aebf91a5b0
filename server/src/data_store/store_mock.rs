use crate::auth_session::SessionToken;
use crate::data_store::auth_token::{AuthToken, Privilege};
use crate::data_store::models::{
    sort_room_stats, Booking, BookingPatch, KitchenOrder, KitchenOrderStatus, NewBooking,
    NewKitchenOrder, NewRoom, NewUser, Room, RoomPatch, RoomStats, User, UserRolesPatch,
};
use crate::data_store::{
    BookingFilter, BookingId, KitchenOrderFilter, KitchenOrderId, RoomBookStore,
    RoomBookStoreFacade, RoomId, StoreError, UserId,
};
use crate::scheduling::conflict_guard::{check_booking_slot, BookingSlot};
use chrono::NaiveDate;
use std::sync::{Mutex, MutexGuard};

/**
 * A mock [RoomBookStore] implementation for testing.
 *
 * The simulated database consists of the [StoreMockData] structure with vectors of entities. These
 * can be directly modified by the tests.
 *
 * The privilege checks and the booking conflict checks are done like in the database
 * implementation. Booking writes are serialized by the mutex. In addition, the
 * [StoreMockData::next_error] attribute can be set to simulate a database error.
 */
#[derive(Default)]
pub struct StoreMock {
    pub data: Mutex<StoreMockData>,
}

impl RoomBookStore for StoreMock {
    fn get_facade<'a>(&'a self) -> Result<Box<dyn RoomBookStoreFacade + 'a>, StoreError> {
        Ok(Box::new(StoreMockFacade { store: self }))
    }
}

#[derive(Default)]
pub struct StoreMockData {
    pub users: Vec<User>,
    pub rooms: Vec<Room>,
    pub bookings: Vec<Booking>,
    pub kitchen_orders: Vec<KitchenOrder>,
    /// If not none, the next call to a store facade method will return this error.
    pub next_error: Option<StoreError>,
}

struct StoreMockFacade<'a> {
    store: &'a StoreMock,
}

impl StoreMockFacade<'_> {
    /// Lock the mock data and return the simulated error, if one is set.
    fn data(&self) -> Result<MutexGuard<'_, StoreMockData>, StoreError> {
        let mut data = self.store.data.lock().expect("Error while locking mutex.");
        if let Some(e) = data.next_error.take() {
            return Err(e);
        }
        Ok(data)
    }
}

impl StoreMockData {
    fn confirmed_bookings(&self, room_id: RoomId, date: NaiveDate) -> Vec<Booking> {
        let filter = BookingFilter {
            room: Some(room_id),
            date: Some(date),
            only_confirmed: true,
            ..Default::default()
        };
        let mut result: Vec<Booking> = self
            .bookings
            .iter()
            .filter(|b| filter.matches(b))
            .cloned()
            .collect();
        result.sort_by_key(|b| b.start_time);
        result
    }

    fn ensure_room_is_active(&self, room_id: RoomId) -> Result<(), StoreError> {
        match self.rooms.iter().find(|r| r.id == room_id) {
            Some(room) if room.is_active => Ok(()),
            _ => Err(StoreError::NotExisting),
        }
    }
}

impl RoomBookStoreFacade for StoreMockFacade<'_> {
    fn get_auth_token_for_session(
        &mut self,
        session_token: &SessionToken,
    ) -> Result<AuthToken, StoreError> {
        let data = self.data()?;
        data.users
            .iter()
            .find(|u| u.id == session_token.user_id())
            .map(|u| AuthToken::create_for_session(u.id, u.roles()))
            .ok_or(StoreError::NotExisting)
    }

    fn get_current_user(&mut self, auth_token: &AuthToken) -> Result<User, StoreError> {
        let data = self.data()?;
        data.users
            .iter()
            .find(|u| u.id == auth_token.user_id())
            .cloned()
            .ok_or(StoreError::NotExisting)
    }

    fn get_users(&mut self, auth_token: &AuthToken) -> Result<Vec<User>, StoreError> {
        auth_token.check_privilege(Privilege::ManageUsers)?;
        let data = self.data()?;
        let mut users = data.users.clone();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(users)
    }

    fn get_user_by_username(
        &mut self,
        auth_token: &AuthToken,
        username: &str,
    ) -> Result<User, StoreError> {
        auth_token.check_privilege(Privilege::ManageUsers)?;
        let data = self.data()?;
        data.users
            .iter()
            .find(|u| u.username == username)
            .cloned()
            .ok_or(StoreError::NotExisting)
    }

    fn create_user(&mut self, auth_token: &AuthToken, user: NewUser) -> Result<User, StoreError> {
        auth_token.check_privilege(Privilege::ManageUsers)?;
        let mut data = self.data()?;
        if data.users.iter().any(|u| u.username == user.username) {
            return Err(StoreError::ConflictEntityExists);
        }
        let user = User {
            id: user.id,
            username: user.username,
            full_name: user.full_name,
            is_admin: user.is_admin,
            is_kitchen: user.is_kitchen,
            created_at: chrono::Utc::now(),
        };
        data.users.push(user.clone());
        Ok(user)
    }

    fn update_user_roles(
        &mut self,
        auth_token: &AuthToken,
        user_id: UserId,
        patch: UserRolesPatch,
    ) -> Result<User, StoreError> {
        auth_token.check_privilege(Privilege::ManageUsers)?;
        let mut data = self.data()?;
        let user = data
            .users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or(StoreError::NotExisting)?;
        patch.apply_to(user);
        Ok(user.clone())
    }

    fn get_rooms(
        &mut self,
        auth_token: &AuthToken,
        include_inactive: bool,
    ) -> Result<Vec<Room>, StoreError> {
        auth_token.check_privilege(Privilege::ShowSchedule)?;
        if include_inactive {
            auth_token.check_privilege(Privilege::ManageRooms)?;
        }
        let data = self.data()?;
        let mut rooms: Vec<Room> = data
            .rooms
            .iter()
            .filter(|r| include_inactive || r.is_active)
            .cloned()
            .collect();
        rooms.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rooms)
    }

    fn get_room(&mut self, auth_token: &AuthToken, room_id: RoomId) -> Result<Room, StoreError> {
        auth_token.check_privilege(Privilege::ShowSchedule)?;
        let data = self.data()?;
        data.rooms
            .iter()
            .find(|r| r.id == room_id)
            .cloned()
            .ok_or(StoreError::NotExisting)
    }

    fn create_room(&mut self, auth_token: &AuthToken, room: NewRoom) -> Result<Room, StoreError> {
        auth_token.check_privilege(Privilege::ManageRooms)?;
        let mut data = self.data()?;
        if data.rooms.iter().any(|r| r.id == room.id) {
            return Err(StoreError::ConflictEntityExists);
        }
        let room = Room {
            id: room.id,
            name: room.name,
            location: room.location,
            capacity: room.capacity,
            is_active: true,
            assigned_kitchen_user_id: room.assigned_kitchen_user_id,
            created_at: chrono::Utc::now(),
        };
        data.rooms.push(room.clone());
        Ok(room)
    }

    fn update_room(
        &mut self,
        auth_token: &AuthToken,
        room_id: RoomId,
        patch: RoomPatch,
    ) -> Result<Room, StoreError> {
        auth_token.check_privilege(Privilege::ManageRooms)?;
        let mut data = self.data()?;
        let room = data
            .rooms
            .iter_mut()
            .find(|r| r.id == room_id)
            .ok_or(StoreError::NotExisting)?;
        if let Some(name) = patch.name {
            room.name = name;
        }
        if let Some(location) = patch.location {
            room.location = location;
        }
        if let Some(capacity) = patch.capacity {
            room.capacity = capacity;
        }
        if let Some(assigned_kitchen_user_id) = patch.assigned_kitchen_user_id {
            room.assigned_kitchen_user_id = assigned_kitchen_user_id;
        }
        Ok(room.clone())
    }

    fn deactivate_room(&mut self, auth_token: &AuthToken, room_id: RoomId) -> Result<(), StoreError> {
        auth_token.check_privilege(Privilege::ManageRooms)?;
        let mut data = self.data()?;
        let room = data
            .rooms
            .iter_mut()
            .find(|r| r.id == room_id)
            .ok_or(StoreError::NotExisting)?;
        room.is_active = false;
        Ok(())
    }

    fn get_room_stats(&mut self, auth_token: &AuthToken) -> Result<Vec<RoomStats>, StoreError> {
        auth_token.check_privilege(Privilege::ManageRooms)?;
        let data = self.data()?;
        let mut stats: Vec<RoomStats> = data
            .rooms
            .iter()
            .filter(|r| r.is_active)
            .map(|r| RoomStats {
                room_id: r.id,
                room_name: r.name.clone(),
                location: r.location.clone(),
                booking_count: data.bookings.iter().filter(|b| b.room_id == r.id).count() as i64,
            })
            .collect();
        sort_room_stats(&mut stats);
        Ok(stats)
    }

    fn get_bookings_filtered(
        &mut self,
        auth_token: &AuthToken,
        filter: BookingFilter,
    ) -> Result<Vec<Booking>, StoreError> {
        auth_token.check_privilege(Privilege::ShowSchedule)?;
        let data = self.data()?;
        let mut result: Vec<Booking> = data
            .bookings
            .iter()
            .filter(|b| filter.matches(b))
            .cloned()
            .collect();
        result.sort_by_key(|b| (b.date, b.start_time));
        Ok(result)
    }

    fn get_booking(
        &mut self,
        auth_token: &AuthToken,
        booking_id: BookingId,
    ) -> Result<Booking, StoreError> {
        auth_token.check_privilege(Privilege::ShowSchedule)?;
        let data = self.data()?;
        data.bookings
            .iter()
            .find(|b| b.id == booking_id)
            .cloned()
            .ok_or(StoreError::NotExisting)
    }

    fn get_confirmed_bookings(
        &mut self,
        auth_token: &AuthToken,
        room_id: RoomId,
        date: NaiveDate,
    ) -> Result<Vec<Booking>, StoreError> {
        auth_token.check_privilege(Privilege::ShowSchedule)?;
        let data = self.data()?;
        Ok(data.confirmed_bookings(room_id, date))
    }

    fn create_booking(
        &mut self,
        auth_token: &AuthToken,
        booking: NewBooking,
    ) -> Result<Booking, StoreError> {
        auth_token.check_owner_or_privilege(
            booking.user_id,
            Privilege::ManageOwnBookings,
            Privilege::ManageAllBookings,
        )?;
        let mut data = self.data()?;
        data.ensure_room_is_active(booking.room_id)?;
        let confirmed = data.confirmed_bookings(booking.room_id, booking.date);
        check_booking_slot(
            &BookingSlot {
                room_id: booking.room_id,
                date: booking.date,
                start_time: booking.start_time,
                end_time: booking.end_time,
            },
            &confirmed,
            None,
        )?;

        let booking = Booking {
            id: booking.id,
            title: booking.title,
            description: booking.description,
            responsible_person: booking.responsible_person,
            user_id: booking.user_id,
            room_id: booking.room_id,
            date: booking.date,
            start_time: booking.start_time,
            end_time: booking.end_time,
            status: booking.status,
            cafe_requested: booking.cafe_requested,
            people_count: booking.people_count,
            requested_meals: booking.requested_meals,
            requested_drinks: booking.requested_drinks,
            created_at: chrono::Utc::now(),
        };
        data.bookings.push(booking.clone());
        Ok(booking)
    }

    fn update_booking(
        &mut self,
        auth_token: &AuthToken,
        booking_id: BookingId,
        patch: BookingPatch,
    ) -> Result<Booking, StoreError> {
        let mut data = self.data()?;
        let existing = data
            .bookings
            .iter()
            .find(|b| b.id == booking_id)
            .cloned()
            .ok_or(StoreError::NotExisting)?;
        auth_token.check_owner_or_privilege(
            existing.user_id,
            Privilege::ManageOwnBookings,
            Privilege::ManageAllBookings,
        )?;
        if patch.is_empty() {
            return Ok(existing);
        }

        let slot = BookingSlot::with_patch(&existing, &patch);
        if slot != BookingSlot::of_booking(&existing) {
            data.ensure_room_is_active(slot.room_id)?;
        }
        let confirmed = data.confirmed_bookings(slot.room_id, slot.date);
        check_booking_slot(&slot, &confirmed, Some(booking_id))?;

        let booking = data
            .bookings
            .iter_mut()
            .find(|b| b.id == booking_id)
            .ok_or(StoreError::NotExisting)?;
        patch.apply_to(booking);
        Ok(booking.clone())
    }

    fn delete_booking(
        &mut self,
        auth_token: &AuthToken,
        booking_id: BookingId,
    ) -> Result<(), StoreError> {
        let mut data = self.data()?;
        let owner = data
            .bookings
            .iter()
            .find(|b| b.id == booking_id)
            .map(|b| b.user_id)
            .ok_or(StoreError::NotExisting)?;
        auth_token.check_owner_or_privilege(
            owner,
            Privilege::ManageOwnBookings,
            Privilege::ManageAllBookings,
        )?;
        data.bookings.retain(|b| b.id != booking_id);
        Ok(())
    }

    fn create_kitchen_order(
        &mut self,
        auth_token: &AuthToken,
        order: NewKitchenOrder,
    ) -> Result<KitchenOrder, StoreError> {
        auth_token.check_privilege(Privilege::ManageOwnBookings)?;
        let mut data = self.data()?;
        if data
            .kitchen_orders
            .iter()
            .any(|o| o.id == order.id || o.booking_id == order.booking_id)
        {
            return Err(StoreError::ConflictEntityExists);
        }
        let order = KitchenOrder {
            id: order.id,
            booking_id: order.booking_id,
            room_id: order.room_id,
            user_id: order.user_id,
            people_count: order.people_count,
            requested_meals: order.requested_meals,
            requested_drinks: order.requested_drinks,
            status: order.status,
            order_date: order.order_date,
            order_time: order.order_time,
            completed_at: None,
            completed_by: None,
            created_at: chrono::Utc::now(),
        };
        data.kitchen_orders.push(order.clone());
        Ok(order)
    }

    fn get_kitchen_orders(
        &mut self,
        auth_token: &AuthToken,
        filter: KitchenOrderFilter,
    ) -> Result<Vec<KitchenOrder>, StoreError> {
        auth_token.check_privilege(Privilege::ProcessKitchenOrders)?;
        let data = self.data()?;
        let mut result: Vec<KitchenOrder> = data
            .kitchen_orders
            .iter()
            .filter(|o| filter.matches(o))
            .cloned()
            .collect();
        result.sort_by_key(|o| (o.order_date, o.order_time));
        Ok(result)
    }

    fn complete_kitchen_order(
        &mut self,
        auth_token: &AuthToken,
        order_id: KitchenOrderId,
    ) -> Result<KitchenOrder, StoreError> {
        auth_token.check_privilege(Privilege::ProcessKitchenOrders)?;
        let mut data = self.data()?;
        let order = data
            .kitchen_orders
            .iter_mut()
            .find(|o| o.id == order_id)
            .ok_or(StoreError::NotExisting)?;
        order.status = KitchenOrderStatus::Completed;
        order.completed_at = Some(chrono::Utc::now());
        order.completed_by = Some(auth_token.user_id());
        Ok(order.clone())
    }
}
