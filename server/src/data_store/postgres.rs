use super::{
    models, schema, BookingFilter, BookingId, KitchenOrderFilter, KitchenOrderId, RoomBookStore,
    RoomBookStoreFacade, RoomId, StoreError, UserId,
};
use crate::auth_session::SessionToken;
use crate::data_store::auth_token::{AccessRole, AuthToken, Privilege};
use crate::scheduling::conflict_guard::{check_booking_slot, BookingSlot};
use chrono::NaiveDate;
use diesel::expression::AsExpression;
use diesel::pg::PgConnection;
use diesel::prelude::*;

#[derive(Clone)]
pub struct PgDataStore {
    pool: diesel::r2d2::Pool<diesel::r2d2::ConnectionManager<PgConnection>>,
}

impl PgDataStore {
    pub fn new(database_url: &str) -> Result<Self, StoreError> {
        let connection_manager = diesel::r2d2::ConnectionManager::<PgConnection>::new(database_url);
        Ok(Self {
            pool: diesel::r2d2::Pool::builder()
                .test_on_check_out(true)
                .min_idle(Some(2))
                .build(connection_manager)?,
        })
    }
}

impl RoomBookStore for PgDataStore {
    fn get_facade<'a>(&'a self) -> Result<Box<dyn RoomBookStoreFacade + 'a>, StoreError> {
        Ok(Box::new(PgDataStoreFacade::with_pooled_connection(
            self.pool.get()?,
        )))
    }
}

pub struct PgDataStoreFacade {
    connection: diesel::r2d2::PooledConnection<diesel::r2d2::ConnectionManager<PgConnection>>,
}

impl PgDataStoreFacade {
    pub fn with_pooled_connection(
        connection: diesel::r2d2::PooledConnection<diesel::r2d2::ConnectionManager<PgConnection>>,
    ) -> Self {
        Self { connection }
    }
}

impl RoomBookStoreFacade for PgDataStoreFacade {
    fn get_auth_token_for_session(
        &mut self,
        session_token: &SessionToken,
    ) -> Result<AuthToken, StoreError> {
        use schema::users::dsl::*;

        let (admin, kitchen) = users
            .find(session_token.user_id())
            .select((is_admin, is_kitchen))
            .first::<(bool, bool)>(&mut self.connection)?;

        Ok(AuthToken::create_for_session(
            session_token.user_id(),
            AccessRole::for_user_flags(admin, kitchen),
        ))
    }

    fn get_current_user(&mut self, auth_token: &AuthToken) -> Result<models::User, StoreError> {
        use schema::users::dsl::*;

        Ok(users
            .find(auth_token.user_id())
            .select(models::User::as_select())
            .first::<models::User>(&mut self.connection)?)
    }

    fn get_users(&mut self, auth_token: &AuthToken) -> Result<Vec<models::User>, StoreError> {
        use schema::users::dsl::*;
        auth_token.check_privilege(Privilege::ManageUsers)?;

        Ok(users
            .select(models::User::as_select())
            .order_by(username)
            .load::<models::User>(&mut self.connection)?)
    }

    fn get_user_by_username(
        &mut self,
        auth_token: &AuthToken,
        the_username: &str,
    ) -> Result<models::User, StoreError> {
        use schema::users::dsl::*;
        auth_token.check_privilege(Privilege::ManageUsers)?;

        Ok(users
            .filter(username.eq(the_username))
            .select(models::User::as_select())
            .first::<models::User>(&mut self.connection)?)
    }

    fn create_user(
        &mut self,
        auth_token: &AuthToken,
        user: models::NewUser,
    ) -> Result<models::User, StoreError> {
        use schema::users::dsl::*;
        auth_token.check_privilege(Privilege::ManageUsers)?;

        Ok(diesel::insert_into(users)
            .values(&user)
            .returning(models::User::as_returning())
            .get_result::<models::User>(&mut self.connection)?)
    }

    fn update_user_roles(
        &mut self,
        auth_token: &AuthToken,
        user_id: UserId,
        patch: models::UserRolesPatch,
    ) -> Result<models::User, StoreError> {
        use schema::users::dsl::*;
        auth_token.check_privilege(Privilege::ManageUsers)?;

        if patch.is_empty() {
            return Ok(users
                .find(user_id)
                .select(models::User::as_select())
                .first::<models::User>(&mut self.connection)?);
        }
        Ok(diesel::update(users.find(user_id))
            .set(&patch)
            .returning(models::User::as_returning())
            .get_result::<models::User>(&mut self.connection)?)
    }

    fn get_rooms(
        &mut self,
        auth_token: &AuthToken,
        include_inactive: bool,
    ) -> Result<Vec<models::Room>, StoreError> {
        use schema::rooms::dsl::*;
        auth_token.check_privilege(Privilege::ShowSchedule)?;
        if include_inactive {
            auth_token.check_privilege(Privilege::ManageRooms)?;
        }

        let mut query = rooms.select(models::Room::as_select()).into_boxed();
        if !include_inactive {
            query = query.filter(is_active);
        }
        Ok(query
            .order_by((name, id))
            .load::<models::Room>(&mut self.connection)?)
    }

    fn get_room(
        &mut self,
        auth_token: &AuthToken,
        room_id: RoomId,
    ) -> Result<models::Room, StoreError> {
        use schema::rooms::dsl::*;
        auth_token.check_privilege(Privilege::ShowSchedule)?;

        Ok(rooms
            .find(room_id)
            .select(models::Room::as_select())
            .first::<models::Room>(&mut self.connection)?)
    }

    fn create_room(
        &mut self,
        auth_token: &AuthToken,
        room: models::NewRoom,
    ) -> Result<models::Room, StoreError> {
        use schema::rooms::dsl::*;
        auth_token.check_privilege(Privilege::ManageRooms)?;

        Ok(diesel::insert_into(rooms)
            .values(&room)
            .returning(models::Room::as_returning())
            .get_result::<models::Room>(&mut self.connection)?)
    }

    fn update_room(
        &mut self,
        auth_token: &AuthToken,
        room_id: RoomId,
        patch: models::RoomPatch,
    ) -> Result<models::Room, StoreError> {
        use schema::rooms::dsl::*;
        auth_token.check_privilege(Privilege::ManageRooms)?;

        // Diesel refuses to build an UPDATE statement without any column
        if patch.is_empty() {
            return self.get_room(auth_token, room_id);
        }
        Ok(diesel::update(rooms.find(room_id))
            .set(&patch)
            .returning(models::Room::as_returning())
            .get_result::<models::Room>(&mut self.connection)?)
    }

    fn deactivate_room(
        &mut self,
        auth_token: &AuthToken,
        room_id: RoomId,
    ) -> Result<(), StoreError> {
        use schema::rooms::dsl::*;
        auth_token.check_privilege(Privilege::ManageRooms)?;

        let count = diesel::update(rooms.find(room_id))
            .set(is_active.eq(false))
            .execute(&mut self.connection)?;
        if count == 0 {
            return Err(StoreError::NotExisting);
        }
        Ok(())
    }

    fn get_room_stats(
        &mut self,
        auth_token: &AuthToken,
    ) -> Result<Vec<models::RoomStats>, StoreError> {
        use schema::{bookings, rooms};
        auth_token.check_privilege(Privilege::ManageRooms)?;

        let mut stats: Vec<models::RoomStats> = rooms::table
            .left_join(bookings::table)
            .filter(rooms::is_active)
            .group_by((rooms::id, rooms::name, rooms::location))
            .select((
                rooms::id,
                rooms::name,
                rooms::location,
                diesel::dsl::count(bookings::id.nullable()),
            ))
            .load::<(RoomId, String, String, i64)>(&mut self.connection)?
            .into_iter()
            .map(
                |(room_id, room_name, location, booking_count)| models::RoomStats {
                    room_id,
                    room_name,
                    location,
                    booking_count,
                },
            )
            .collect();
        models::sort_room_stats(&mut stats);
        Ok(stats)
    }

    fn get_bookings_filtered(
        &mut self,
        auth_token: &AuthToken,
        filter: BookingFilter,
    ) -> Result<Vec<models::Booking>, StoreError> {
        use schema::bookings::dsl::*;
        auth_token.check_privilege(Privilege::ShowSchedule)?;

        Ok(bookings
            .filter(booking_filter_to_sql(filter))
            .order_by((date, start_time, id))
            .select(models::Booking::as_select())
            .load::<models::Booking>(&mut self.connection)?)
    }

    fn get_booking(
        &mut self,
        auth_token: &AuthToken,
        booking_id: BookingId,
    ) -> Result<models::Booking, StoreError> {
        use schema::bookings::dsl::*;
        auth_token.check_privilege(Privilege::ShowSchedule)?;

        Ok(bookings
            .find(booking_id)
            .select(models::Booking::as_select())
            .first::<models::Booking>(&mut self.connection)?)
    }

    fn get_confirmed_bookings(
        &mut self,
        auth_token: &AuthToken,
        room_id: RoomId,
        the_date: NaiveDate,
    ) -> Result<Vec<models::Booking>, StoreError> {
        auth_token.check_privilege(Privilege::ShowSchedule)?;

        load_confirmed_bookings(room_id, the_date, &mut self.connection)
    }

    fn create_booking(
        &mut self,
        auth_token: &AuthToken,
        booking: models::NewBooking,
    ) -> Result<models::Booking, StoreError> {
        use schema::bookings::dsl::*;
        auth_token.check_owner_or_privilege(
            booking.user_id,
            Privilege::ManageOwnBookings,
            Privilege::ManageAllBookings,
        )?;

        // The conflict check and the insertion must see the same state of the room's bookings.
        // With SERIALIZABLE isolation, a concurrent insertion for the same room makes one of the
        // transactions fail with a serialization failure (StoreError::TransactionConflict).
        self.connection
            .build_transaction()
            .serializable()
            .run(|connection| {
                ensure_room_is_active(booking.room_id, connection)?;
                let confirmed = load_confirmed_bookings(booking.room_id, booking.date, connection)?;
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

                Ok(diesel::insert_into(bookings)
                    .values(&booking)
                    .returning(models::Booking::as_returning())
                    .get_result::<models::Booking>(connection)?)
            })
    }

    fn update_booking(
        &mut self,
        auth_token: &AuthToken,
        booking_id: BookingId,
        patch: models::BookingPatch,
    ) -> Result<models::Booking, StoreError> {
        use schema::bookings::dsl::*;

        self.connection
            .build_transaction()
            .serializable()
            .run(|connection| {
                let existing = bookings
                    .find(booking_id)
                    .select(models::Booking::as_select())
                    .first::<models::Booking>(connection)?;
                auth_token.check_owner_or_privilege(
                    existing.user_id,
                    Privilege::ManageOwnBookings,
                    Privilege::ManageAllBookings,
                )?;
                if patch.is_empty() {
                    return Ok(existing);
                }

                let slot = BookingSlot::with_patch(&existing, &patch);
                // Title or description changes are allowed in deactivated rooms, but no moves
                if slot != BookingSlot::of_booking(&existing) {
                    ensure_room_is_active(slot.room_id, connection)?;
                }
                let confirmed = load_confirmed_bookings(slot.room_id, slot.date, connection)?;
                check_booking_slot(&slot, &confirmed, Some(booking_id))?;

                Ok(diesel::update(bookings.find(booking_id))
                    .set(&patch)
                    .returning(models::Booking::as_returning())
                    .get_result::<models::Booking>(connection)?)
            })
    }

    fn delete_booking(
        &mut self,
        auth_token: &AuthToken,
        booking_id: BookingId,
    ) -> Result<(), StoreError> {
        use schema::bookings::dsl::*;

        self.connection.transaction(|connection| {
            let owner = bookings
                .find(booking_id)
                .select(user_id)
                .first::<uuid::Uuid>(connection)?;
            auth_token.check_owner_or_privilege(
                owner,
                Privilege::ManageOwnBookings,
                Privilege::ManageAllBookings,
            )?;

            diesel::delete(bookings.find(booking_id)).execute(connection)?;
            Ok(())
        })
    }

    fn create_kitchen_order(
        &mut self,
        auth_token: &AuthToken,
        order: models::NewKitchenOrder,
    ) -> Result<models::KitchenOrder, StoreError> {
        use schema::kitchen_orders::dsl::*;
        // Kitchen orders are created on behalf of the booking's owner
        auth_token.check_privilege(Privilege::ManageOwnBookings)?;

        Ok(diesel::insert_into(kitchen_orders)
            .values(&order)
            .returning(models::KitchenOrder::as_returning())
            .get_result::<models::KitchenOrder>(&mut self.connection)?)
    }

    fn get_kitchen_orders(
        &mut self,
        auth_token: &AuthToken,
        filter: KitchenOrderFilter,
    ) -> Result<Vec<models::KitchenOrder>, StoreError> {
        use schema::kitchen_orders::dsl::*;
        auth_token.check_privilege(Privilege::ProcessKitchenOrders)?;

        let query = kitchen_orders
            .select(models::KitchenOrder::as_select())
            .into_boxed();
        let query = match filter {
            KitchenOrderFilter::AssignedTo(the_user_id) => query.filter(user_id.eq(the_user_id)),
            KitchenOrderFilter::ForRoom(the_room_id) => query.filter(room_id.eq(the_room_id)),
        };
        Ok(query
            .order_by((order_date, order_time, id))
            .load::<models::KitchenOrder>(&mut self.connection)?)
    }

    fn complete_kitchen_order(
        &mut self,
        auth_token: &AuthToken,
        order_id: KitchenOrderId,
    ) -> Result<models::KitchenOrder, StoreError> {
        use schema::kitchen_orders::dsl::*;
        auth_token.check_privilege(Privilege::ProcessKitchenOrders)?;

        Ok(diesel::update(kitchen_orders.find(order_id))
            .set((
                status.eq(models::KitchenOrderStatus::Completed),
                completed_at.eq(chrono::Utc::now()),
                completed_by.eq(auth_token.user_id()),
            ))
            .returning(models::KitchenOrder::as_returning())
            .get_result::<models::KitchenOrder>(&mut self.connection)?)
    }
}

/// Load the confirmed bookings of a room on a given date, sorted by start time
fn load_confirmed_bookings(
    the_room_id: RoomId,
    the_date: NaiveDate,
    connection: &mut PgConnection,
) -> Result<Vec<models::Booking>, StoreError> {
    use schema::bookings::dsl::*;

    Ok(bookings
        .filter(room_id.eq(the_room_id))
        .filter(date.eq(the_date))
        .filter(status.eq(models::BookingStatus::Confirmed))
        .order_by((start_time, id))
        .select(models::Booking::as_select())
        .load::<models::Booking>(connection)?)
}

/// Check that the room exists and is active. Bookings of inactive rooms are treated like bookings
/// of non-existing rooms.
fn ensure_room_is_active(
    the_room_id: RoomId,
    connection: &mut PgConnection,
) -> Result<(), StoreError> {
    use schema::rooms::dsl::*;

    let active = rooms
        .find(the_room_id)
        .select(is_active)
        .first::<bool>(connection)?;
    if !active {
        return Err(StoreError::NotExisting);
    }
    Ok(())
}

type BoxedBoolExpression<'a, Table> =
    Box<dyn BoxableExpression<Table, diesel::pg::Pg, SqlType = diesel::sql_types::Bool> + 'a>;

fn booking_filter_to_sql<'a>(
    filter: BookingFilter,
) -> BoxedBoolExpression<'a, schema::bookings::table> {
    use schema::bookings::dsl::*;

    let mut expression: BoxedBoolExpression<'a, schema::bookings::table> =
        Box::new(diesel::dsl::sql::<diesel::sql_types::Bool>("TRUE"));
    if let Some(owner) = filter.owner {
        expression = Box::new(expression.as_expression().and(user_id.eq(owner)));
    }
    if let Some(room) = filter.room {
        expression = Box::new(expression.as_expression().and(room_id.eq(room)));
    }
    if let Some(the_date) = filter.date {
        expression = Box::new(expression.as_expression().and(date.eq(the_date)));
    }
    if filter.only_confirmed {
        expression = Box::new(
            expression
                .as_expression()
                .and(status.eq(models::BookingStatus::Confirmed)),
        );
    }
    expression
}

/// Get a human-readable description of the consistency expectation that is checked by a specific
/// constraint in our Postgres database schema by the constraint's name.
///
/// These are visible to the user when creating or updating entities inconsistently via the REST
/// API.
///
/// Returns None, when no human-readable description is present of the given constraint name. This
/// may be the case when we don't expect this constraint to be violated by a user interaction.
pub fn description_for_postgres_constraint(constraint_name: &str) -> Option<&'static str> {
    match constraint_name {
        "bookings_people_count_positive" => Some("Booking's people count must be at least 1."),
        "bookings_room_id_fkey" => Some("Booking's room must reference an existing room."),
        "bookings_time_range" => Some("Booking's start time must be earlier than its end time."),
        "bookings_title_length" => Some("Booking's title must be 1 to 100 characters long."),
        "bookings_user_id_fkey" => Some("Booking's user must reference an existing user."),
        "kitchen_orders_user_id_fkey" => Some("Kitchen order's user must reference an existing user."),
        "rooms_assigned_kitchen_user_id_fkey" => Some("Room's kitchen user must be null or reference an existing user."),
        "rooms_capacity_range" => Some("Room's capacity must be between 1 and 500."),
        _ => None,
    }
}
