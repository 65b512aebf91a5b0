
use super::*;
use crate::data_store::models::KitchenOrderStatus;
use crate::data_store::store_mock::StoreMock;
use crate::kitchen::notification_channel::KitchenNotificationChannel;
use crate::web::AppState;
use actix_web::body::MessageBody;
use actix_web::{http, test, web, App};
use sample_data::*;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

const APP_SECRET: &str = "123456";

fn create_state() -> (AppState, Arc<StoreMock>) {
    let data_store_mock = Arc::new(StoreMock::default());
    fill_sample_data(data_store_mock.as_ref());
    let state = AppState {
        store: data_store_mock.clone(),
        secret: APP_SECRET.to_string(),
        kitchen_channel: KitchenNotificationChannel::new(),
    };
    (state, data_store_mock)
}

fn token_for(user_id: crate::data_store::UserId) -> (String, String) {
    (
        "X-SESSION-TOKEN".to_string(),
        SessionToken::new_for_user(user_id).as_string(APP_SECRET),
    )
}

fn new_booking_json(room_id: Uuid, start: &str, end: &str) -> serde_json::Value {
    json!({
        "title": "Reunião de equipe",
        "roomId": room_id,
        "date": "2025-03-10",
        "startTime": start,
        "endTime": end,
    })
}

/// Read the JSON error body and return its message
fn error_message(body: &[u8]) -> String {
    let value: serde_json::Value = serde_json::from_slice(body).unwrap();
    value["message"].as_str().unwrap().to_string()
}

#[actix_web::test]
async fn test_get_current_user() {
    let (state, _store) = create_state();
    let app = test::init_service(
        App::new()
            .configure(configure_app)
            .app_data(web::Data::new(state.clone())),
    )
    .await;
    let req = test::TestRequest::get()
        .uri("/api/v1/me")
        .append_header(token_for(USER_CHEF))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::OK);
    let body = res.into_body().try_into_bytes().unwrap();
    let user: roombook_api_types::CurrentUser = serde_json::from_slice(&body).unwrap();
    assert_eq!(user.id, USER_CHEF);
    assert!(user.is_kitchen);
    assert!(!user.is_admin);
}

#[actix_web::test]
async fn test_missing_or_invalid_session() {
    let (state, _store) = create_state();
    let app = test::init_service(
        App::new()
            .configure(configure_app)
            .app_data(web::Data::new(state.clone())),
    )
    .await;

    let req = test::TestRequest::get().uri("/api/v1/rooms").to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::FORBIDDEN);

    let req = test::TestRequest::get()
        .uri("/api/v1/rooms")
        .append_header((
            "X-SESSION-TOKEN",
            SessionToken::new_for_user(USER_ANA).as_string("another secret"),
        ))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::FORBIDDEN);

    // Valid signature, but the user does not exist
    let req = test::TestRequest::get()
        .uri("/api/v1/rooms")
        .append_header(token_for(Uuid::now_v7()))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn test_list_and_manage_rooms() {
    let (state, store) = create_state();
    let app = test::init_service(
        App::new()
            .configure(configure_app)
            .app_data(web::Data::new(state.clone())),
    )
    .await;

    let req = test::TestRequest::get()
        .uri("/api/v1/rooms")
        .append_header(token_for(USER_ANA))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::OK);
    let body = res.into_body().try_into_bytes().unwrap();
    let rooms: Vec<roombook_api_types::Room> = serde_json::from_slice(&body).unwrap();
    assert_eq!(
        rooms.iter().map(|r| r.id).collect::<Vec<_>>(),
        vec![ROOM_AZUL, ROOM_VERDE]
    );

    // Users may not create rooms
    let new_room = json!({"name": "Sala Amarela", "location": "Térreo", "capacity": 6});
    let req = test::TestRequest::post()
        .uri("/api/v1/rooms")
        .append_header(token_for(USER_ANA))
        .set_json(&new_room)
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::FORBIDDEN);

    let req = test::TestRequest::post()
        .uri("/api/v1/rooms")
        .append_header(token_for(USER_ADMIN))
        .set_json(&new_room)
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::CREATED);
    let body = res.into_body().try_into_bytes().unwrap();
    let room: roombook_api_types::Room = serde_json::from_slice(&body).unwrap();
    assert!(room.is_active);
    assert_eq!(room.assigned_kitchen_user_id, None);

    let req = test::TestRequest::patch()
        .uri(&format!("/api/v1/rooms/{}", room.id))
        .append_header(token_for(USER_ADMIN))
        .set_json(json!({"assignedKitchenUserId": USER_CHEF, "capacity": 8}))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::OK);
    let body = res.into_body().try_into_bytes().unwrap();
    let room: roombook_api_types::Room = serde_json::from_slice(&body).unwrap();
    assert_eq!(room.assigned_kitchen_user_id, Some(USER_CHEF));
    assert_eq!(room.capacity, 8);
    assert_eq!(room.name, "Sala Amarela");

    let req = test::TestRequest::delete()
        .uri(&format!("/api/v1/rooms/{}", room.id))
        .append_header(token_for(USER_ADMIN))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::NO_CONTENT);
    let data = store.data.lock().unwrap();
    let stored = data.rooms.iter().find(|r| r.id == room.id).unwrap();
    assert!(!stored.is_active);
}

#[actix_web::test]
async fn test_booking_conflict_scenario() {
    let (state, store) = create_state();
    let app = test::init_service(
        App::new()
            .configure(configure_app)
            .app_data(web::Data::new(state.clone())),
    )
    .await;

    // Overlapping the existing 09:00-10:00 booking
    let req = test::TestRequest::post()
        .uri("/api/v1/bookings")
        .append_header(token_for(USER_BRUNO))
        .set_json(new_booking_json(ROOM_AZUL, "09:30", "10:30"))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::CONFLICT);
    let body = res.into_body().try_into_bytes().unwrap();
    assert!(error_message(&body).starts_with("Room is already booked for this time slot"));

    // Back-to-back is fine
    let req = test::TestRequest::post()
        .uri("/api/v1/bookings")
        .append_header(token_for(USER_BRUNO))
        .set_json(new_booking_json(ROOM_AZUL, "08:00", "09:00"))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::CREATED);
    let body = res.into_body().try_into_bytes().unwrap();
    let booking: roombook_api_types::Booking = serde_json::from_slice(&body).unwrap();
    assert_eq!(booking.user_id, USER_BRUNO);
    assert_eq!(booking.status, roombook_api_types::BookingStatus::Confirmed);
    assert_eq!(booking.start_time, "08:00");

    // Inverted range
    let req = test::TestRequest::post()
        .uri("/api/v1/bookings")
        .append_header(token_for(USER_BRUNO))
        .set_json(new_booking_json(ROOM_AZUL, "10:00", "09:00"))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::BAD_REQUEST);
    let body = res.into_body().try_into_bytes().unwrap();
    assert!(error_message(&body).starts_with("End time must be after start time"));

    // Same range in another room
    let req = test::TestRequest::post()
        .uri("/api/v1/bookings")
        .append_header(token_for(USER_BRUNO))
        .set_json(new_booking_json(ROOM_VERDE, "09:30", "10:30"))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::CREATED);

    // Inactive room
    let req = test::TestRequest::post()
        .uri("/api/v1/bookings")
        .append_header(token_for(USER_BRUNO))
        .set_json(new_booking_json(ROOM_ANTIGA, "12:00", "13:00"))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::NOT_FOUND);

    assert_eq!(store.data.lock().unwrap().bookings.len(), 3);
}

#[actix_web::test]
async fn test_create_booking_invalid_data() {
    let (state, _store) = create_state();
    let app = test::init_service(
        App::new()
            .configure(configure_app)
            .app_data(web::Data::new(state.clone())),
    )
    .await;

    let mut data = new_booking_json(ROOM_AZUL, "11:00", "12:00");
    data["title"] = json!("   ");
    let req = test::TestRequest::post()
        .uri("/api/v1/bookings")
        .append_header(token_for(USER_ANA))
        .set_json(&data)
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::BAD_REQUEST);

    let req = test::TestRequest::post()
        .uri("/api/v1/bookings")
        .append_header(token_for(USER_ANA))
        .set_json(new_booking_json(ROOM_AZUL, "11:00", "25:00"))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::BAD_REQUEST);

    let req = test::TestRequest::post()
        .uri("/api/v1/bookings")
        .append_header(token_for(USER_ANA))
        .set_json(json!({"title": "Missing fields"}))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_catering_booking_creates_kitchen_order() {
    let (state, store) = create_state();
    let (tx1, mut rx1) = mpsc::unbounded_channel();
    let (tx2, mut rx2) = mpsc::unbounded_channel();
    state.kitchen_channel.register(USER_CHEF, tx1);
    state.kitchen_channel.register(USER_CHEF, tx2);
    let app = test::init_service(
        App::new()
            .configure(configure_app)
            .app_data(web::Data::new(state.clone())),
    )
    .await;

    let mut data = new_booking_json(ROOM_AZUL, "14:00", "15:00");
    data["cafeRequested"] = json!(true);
    data["peopleCount"] = json!(4);
    data["requestedMeals"] = json!("Pão de queijo");
    let req = test::TestRequest::post()
        .uri("/api/v1/bookings")
        .append_header(token_for(USER_BRUNO))
        .set_json(&data)
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::CREATED);
    let body = res.into_body().try_into_bytes().unwrap();
    let booking: roombook_api_types::Booking = serde_json::from_slice(&body).unwrap();

    {
        let data = store.data.lock().unwrap();
        assert_eq!(data.kitchen_orders.len(), 1);
        let order = &data.kitchen_orders[0];
        assert_eq!(order.booking_id, booking.id);
        assert_eq!(order.user_id, USER_CHEF);
        assert_eq!(order.status, KitchenOrderStatus::Pending);
        assert_eq!(order.people_count, 4);
        assert_eq!(order.requested_meals, "Pão de queijo");
        assert_eq!(order.order_date, sample_date());
        assert_eq!(order.order_time.to_string(), "14:00");
    }

    for rx in [&mut rx1, &mut rx2] {
        match rx.try_recv().unwrap() {
            roombook_api_types::KitchenServerEvent::NewKitchenOrder { order, booking, .. } => {
                assert_eq!(order.user_id, USER_CHEF);
                assert_eq!(booking.room, "Sala Azul");
                assert_eq!(booking.start_time, "14:00");
            }
            e => panic!("Unexpected event {:?}", e),
        }
        assert!(rx.try_recv().is_err());
    }
}

#[actix_web::test]
async fn test_catering_booking_in_unstaffed_room() {
    let (state, store) = create_state();
    let app = test::init_service(
        App::new()
            .configure(configure_app)
            .app_data(web::Data::new(state.clone())),
    )
    .await;

    let mut data = new_booking_json(ROOM_VERDE, "14:00", "15:00");
    data["cafeRequested"] = json!(true);
    data["peopleCount"] = json!(4);
    let req = test::TestRequest::post()
        .uri("/api/v1/bookings")
        .append_header(token_for(USER_BRUNO))
        .set_json(&data)
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::CREATED);
    assert!(store.data.lock().unwrap().kitchen_orders.is_empty());
}

#[actix_web::test]
async fn test_update_booking() {
    let (state, _store) = create_state();
    let app = test::init_service(
        App::new()
            .configure(configure_app)
            .app_data(web::Data::new(state.clone())),
    )
    .await;

    // Changing the description must not conflict with the booking itself
    let req = test::TestRequest::patch()
        .uri(&format!("/api/v1/bookings/{}", BOOKING_ANA))
        .append_header(token_for(USER_ANA))
        .set_json(json!({"description": "Pauta atualizada"}))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::OK);
    let body = res.into_body().try_into_bytes().unwrap();
    let booking: roombook_api_types::Booking = serde_json::from_slice(&body).unwrap();
    assert_eq!(booking.description.as_deref(), Some("Pauta atualizada"));
    assert_eq!(booking.start_time, "09:00");

    // Extending the booking, overlapping its own old range
    let req = test::TestRequest::patch()
        .uri(&format!("/api/v1/bookings/{}", BOOKING_ANA))
        .append_header(token_for(USER_ANA))
        .set_json(json!({"startTime": "08:30", "endTime": "10:30"}))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::OK);

    // Other users may not change the booking
    let req = test::TestRequest::patch()
        .uri(&format!("/api/v1/bookings/{}", BOOKING_ANA))
        .append_header(token_for(USER_BRUNO))
        .set_json(json!({"title": "Hijacked"}))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::FORBIDDEN);

    let req = test::TestRequest::patch()
        .uri(&format!("/api/v1/bookings/{}", BOOKING_ANA))
        .append_header(token_for(USER_ANA))
        .set_json(json!({"endTime": "08:00"}))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::BAD_REQUEST);

    let req = test::TestRequest::patch()
        .uri(&format!("/api/v1/bookings/{}", Uuid::now_v7()))
        .append_header(token_for(USER_ANA))
        .set_json(json!({"title": "Nothing"}))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_update_booking_into_conflict() {
    let (state, _store) = create_state();
    let app = test::init_service(
        App::new()
            .configure(configure_app)
            .app_data(web::Data::new(state.clone())),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/v1/bookings")
        .append_header(token_for(USER_BRUNO))
        .set_json(new_booking_json(ROOM_AZUL, "11:00", "12:00"))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::CREATED);
    let body = res.into_body().try_into_bytes().unwrap();
    let booking: roombook_api_types::Booking = serde_json::from_slice(&body).unwrap();

    let req = test::TestRequest::patch()
        .uri(&format!("/api/v1/bookings/{}", booking.id))
        .append_header(token_for(USER_BRUNO))
        .set_json(json!({"startTime": "09:30"}))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::CONFLICT);

    // Moving to another room resolves the conflict
    let req = test::TestRequest::patch()
        .uri(&format!("/api/v1/bookings/{}", booking.id))
        .append_header(token_for(USER_BRUNO))
        .set_json(json!({"startTime": "09:30", "roomId": ROOM_VERDE}))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::OK);
}

#[actix_web::test]
async fn test_update_booking_in_deactivated_room() {
    let (state, _store) = create_state();
    let app = test::init_service(
        App::new()
            .configure(configure_app)
            .app_data(web::Data::new(state.clone())),
    )
    .await;

    let req = test::TestRequest::delete()
        .uri(&format!("/api/v1/rooms/{}", ROOM_AZUL))
        .append_header(token_for(USER_ADMIN))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::NO_CONTENT);

    // Existing bookings of the room cannot be moved in time
    let req = test::TestRequest::patch()
        .uri(&format!("/api/v1/bookings/{}", BOOKING_ANA))
        .append_header(token_for(USER_ANA))
        .set_json(json!({"startTime": "14:00", "endTime": "16:00"}))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::NOT_FOUND);

    let req = test::TestRequest::patch()
        .uri(&format!("/api/v1/bookings/{}", BOOKING_ANA))
        .append_header(token_for(USER_ANA))
        .set_json(json!({"date": "2025-03-11"}))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::NOT_FOUND);

    // ... but may still be edited otherwise or moved to an active room
    let req = test::TestRequest::patch()
        .uri(&format!("/api/v1/bookings/{}", BOOKING_ANA))
        .append_header(token_for(USER_ANA))
        .set_json(json!({"title": "Planejamento (sala desativada)"}))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::OK);

    let req = test::TestRequest::patch()
        .uri(&format!("/api/v1/bookings/{}", BOOKING_ANA))
        .append_header(token_for(USER_ANA))
        .set_json(json!({"roomId": ROOM_VERDE}))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::OK);
}

#[actix_web::test]
async fn test_list_and_delete_bookings() {
    let (state, _store) = create_state();
    let app = test::init_service(
        App::new()
            .configure(configure_app)
            .app_data(web::Data::new(state.clone())),
    )
    .await;

    let req = test::TestRequest::get()
        .uri("/api/v1/bookings")
        .append_header(token_for(USER_BRUNO))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::OK);
    let body = res.into_body().try_into_bytes().unwrap();
    let bookings: Vec<roombook_api_types::Booking> = serde_json::from_slice(&body).unwrap();
    assert!(bookings.is_empty());

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/bookings/all?date=2025-03-10&roomId={}", ROOM_AZUL))
        .append_header(token_for(USER_BRUNO))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::OK);
    let body = res.into_body().try_into_bytes().unwrap();
    let bookings: Vec<roombook_api_types::Booking> = serde_json::from_slice(&body).unwrap();
    assert_eq!(bookings.len(), 1);
    assert_eq!(bookings[0].id, BOOKING_ANA);

    let req = test::TestRequest::delete()
        .uri(&format!("/api/v1/bookings/{}", BOOKING_ANA))
        .append_header(token_for(USER_BRUNO))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::FORBIDDEN);

    let req = test::TestRequest::delete()
        .uri(&format!("/api/v1/bookings/{}", BOOKING_ANA))
        .append_header(token_for(USER_ANA))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::NO_CONTENT);

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/bookings/{}", BOOKING_ANA))
        .append_header(token_for(USER_ANA))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_availability() {
    let (state, _store) = create_state();
    let app = test::init_service(
        App::new()
            .configure(configure_app)
            .app_data(web::Data::new(state.clone())),
    )
    .await;

    let req = test::TestRequest::get()
        .uri(&format!(
            "/api/v1/availability?date=2025-03-10&roomId={}&startTime=08:00",
            ROOM_AZUL
        ))
        .append_header(token_for(USER_BRUNO))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::OK);
    let body = res.into_body().try_into_bytes().unwrap();
    let availability: roombook_api_types::Availability = serde_json::from_slice(&body).unwrap();
    assert!(!availability.start_times.contains(&"09:00".to_string()));
    assert!(!availability.start_times.contains(&"09:30".to_string()));
    assert!(availability.start_times.contains(&"10:00".to_string()));
    assert_eq!(availability.start_times.first().map(String::as_str), Some("07:00"));
    assert_eq!(availability.end_times, vec!["08:30", "09:00"]);

    // Without room, all slots are offered
    let req = test::TestRequest::get()
        .uri("/api/v1/availability?date=2025-03-10")
        .append_header(token_for(USER_BRUNO))
        .to_request();
    let res = test::call_service(&app, req).await;
    let body = res.into_body().try_into_bytes().unwrap();
    let availability: roombook_api_types::Availability = serde_json::from_slice(&body).unwrap();
    assert_eq!(availability.start_times.len(), 23);
    assert!(availability.end_times.is_empty());

    let req = test::TestRequest::get()
        .uri("/api/v1/availability?startTime=7h")
        .append_header(token_for(USER_BRUNO))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_complete_kitchen_order_scenario() {
    let (state, store) = create_state();
    let app = test::init_service(
        App::new()
            .configure(configure_app)
            .app_data(web::Data::new(state.clone())),
    )
    .await;

    let mut data = new_booking_json(ROOM_AZUL, "15:00", "16:00");
    data["cafeRequested"] = json!(true);
    data["peopleCount"] = json!(10);
    let req = test::TestRequest::post()
        .uri("/api/v1/bookings")
        .append_header(token_for(USER_ANA))
        .set_json(&data)
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::CREATED);
    let order_id = store.data.lock().unwrap().kitchen_orders[0].id;

    // Only kitchen workers may process orders
    let req = test::TestRequest::patch()
        .uri(&format!("/api/v1/kitchen/orders/{}/complete", order_id))
        .append_header(token_for(USER_ANA))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::FORBIDDEN);

    for _ in 0..2 {
        let req = test::TestRequest::patch()
            .uri(&format!("/api/v1/kitchen/orders/{}/complete", order_id))
            .append_header(token_for(USER_CHEF))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), http::StatusCode::OK);
        let body = res.into_body().try_into_bytes().unwrap();
        let order: roombook_api_types::KitchenOrder = serde_json::from_slice(&body).unwrap();
        assert_eq!(order.status, roombook_api_types::KitchenOrderStatus::Completed);
        assert_eq!(order.completed_by, Some(USER_CHEF));
        assert!(order.completed_at.is_some());
    }

    let req = test::TestRequest::get()
        .uri("/api/v1/kitchen/orders")
        .append_header(token_for(USER_CHEF))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::OK);
    let body = res.into_body().try_into_bytes().unwrap();
    let orders: Vec<roombook_api_types::KitchenOrder> = serde_json::from_slice(&body).unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].status, roombook_api_types::KitchenOrderStatus::Completed);

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/kitchen/orders/room/{}", ROOM_VERDE))
        .append_header(token_for(USER_CHEF))
        .to_request();
    let res = test::call_service(&app, req).await;
    let body = res.into_body().try_into_bytes().unwrap();
    let orders: Vec<roombook_api_types::KitchenOrder> = serde_json::from_slice(&body).unwrap();
    assert!(orders.is_empty());

    let req = test::TestRequest::patch()
        .uri(&format!("/api/v1/kitchen/orders/{}/complete", Uuid::now_v7()))
        .append_header(token_for(USER_CHEF))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_dashboard_stats_endpoint() {
    let (state, _store) = create_state();
    let app = test::init_service(
        App::new()
            .configure(configure_app)
            .app_data(web::Data::new(state.clone())),
    )
    .await;

    let req = test::TestRequest::get()
        .uri("/api/v1/dashboard/stats")
        .append_header(token_for(USER_BRUNO))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::OK);
    let body = res.into_body().try_into_bytes().unwrap();
    let stats: roombook_api_types::DashboardStats = serde_json::from_slice(&body).unwrap();
    assert_eq!(stats.active_rooms, 2);
    assert_eq!(stats.active_users, 1);
}

#[actix_web::test]
async fn test_dashboard_counts_bookings_of_current_utc_date() {
    let (state, _store) = create_state();
    let app = test::init_service(
        App::new()
            .configure(configure_app)
            .app_data(web::Data::new(state.clone())),
    )
    .await;

    let mut data = new_booking_json(ROOM_VERDE, "10:00", "11:00");
    data["date"] = json!(chrono::Utc::now().date_naive());
    let req = test::TestRequest::post()
        .uri("/api/v1/bookings")
        .append_header(token_for(USER_BRUNO))
        .set_json(&data)
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::CREATED);

    let req = test::TestRequest::get()
        .uri("/api/v1/dashboard/stats")
        .append_header(token_for(USER_BRUNO))
        .to_request();
    let res = test::call_service(&app, req).await;
    let body = res.into_body().try_into_bytes().unwrap();
    let stats: roombook_api_types::DashboardStats = serde_json::from_slice(&body).unwrap();
    assert_eq!(stats.today_bookings, 1);
}

#[actix_web::test]
async fn test_room_stats() {
    let (state, _store) = create_state();
    let app = test::init_service(
        App::new()
            .configure(configure_app)
            .app_data(web::Data::new(state.clone())),
    )
    .await;

    let req = test::TestRequest::get()
        .uri("/api/v1/dashboard/room-stats")
        .append_header(token_for(USER_ANA))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::FORBIDDEN);

    let req = test::TestRequest::get()
        .uri("/api/v1/dashboard/room-stats")
        .append_header(token_for(USER_ADMIN))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::OK);
    let body = res.into_body().try_into_bytes().unwrap();
    let stats: Vec<roombook_api_types::RoomStats> = serde_json::from_slice(&body).unwrap();
    assert_eq!(
        stats
            .iter()
            .map(|s| (s.room_id, s.booking_count))
            .collect::<Vec<_>>(),
        vec![(ROOM_AZUL, 1), (ROOM_VERDE, 0)]
    );
    assert_eq!(stats[0].room_name, "Sala Azul");

    for (start, end) in [("08:00", "09:00"), ("13:00", "14:00")] {
        let req = test::TestRequest::post()
            .uri("/api/v1/bookings")
            .append_header(token_for(USER_BRUNO))
            .set_json(new_booking_json(ROOM_VERDE, start, end))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), http::StatusCode::CREATED);
    }

    let req = test::TestRequest::get()
        .uri("/api/v1/dashboard/room-stats")
        .append_header(token_for(USER_ADMIN))
        .to_request();
    let res = test::call_service(&app, req).await;
    let body = res.into_body().try_into_bytes().unwrap();
    let stats: Vec<roombook_api_types::RoomStats> = serde_json::from_slice(&body).unwrap();
    assert_eq!(
        stats
            .iter()
            .map(|s| (s.room_id, s.booking_count))
            .collect::<Vec<_>>(),
        vec![(ROOM_VERDE, 2), (ROOM_AZUL, 1)]
    );
}

#[actix_web::test]
async fn test_manage_user_roles() {
    let (state, _store) = create_state();
    let app = test::init_service(
        App::new()
            .configure(configure_app)
            .app_data(web::Data::new(state.clone())),
    )
    .await;

    let req = test::TestRequest::get()
        .uri("/api/v1/users")
        .append_header(token_for(USER_ADMIN))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::OK);
    let body = res.into_body().try_into_bytes().unwrap();
    let users: Vec<roombook_api_types::User> = serde_json::from_slice(&body).unwrap();
    assert_eq!(
        users.iter().map(|u| u.username.as_str()).collect::<Vec<_>>(),
        vec!["admin", "ana", "bruno", "chef"]
    );

    let req = test::TestRequest::get()
        .uri("/api/v1/users")
        .append_header(token_for(USER_ANA))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::FORBIDDEN);

    // Bruno is no kitchen worker yet
    let req = test::TestRequest::get()
        .uri("/api/v1/kitchen/orders")
        .append_header(token_for(USER_BRUNO))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::FORBIDDEN);

    let req = test::TestRequest::patch()
        .uri(&format!("/api/v1/users/{}/roles", USER_BRUNO))
        .append_header(token_for(USER_ANA))
        .set_json(json!({"isKitchen": true}))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::FORBIDDEN);

    let req = test::TestRequest::patch()
        .uri(&format!("/api/v1/users/{}/roles", USER_BRUNO))
        .append_header(token_for(USER_ADMIN))
        .set_json(json!({"isKitchen": true}))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::OK);
    let body = res.into_body().try_into_bytes().unwrap();
    let user: roombook_api_types::User = serde_json::from_slice(&body).unwrap();
    assert_eq!(user.id, USER_BRUNO);
    assert!(user.is_kitchen);
    assert!(!user.is_admin);

    // The new role is effective with the next request
    let req = test::TestRequest::get()
        .uri("/api/v1/kitchen/orders")
        .append_header(token_for(USER_BRUNO))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::OK);

    let req = test::TestRequest::patch()
        .uri(&format!("/api/v1/users/{}/roles", USER_CHEF))
        .append_header(token_for(USER_ADMIN))
        .set_json(json!({"isKitchen": false, "isAdmin": true}))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::OK);
    let req = test::TestRequest::get()
        .uri("/api/v1/me")
        .append_header(token_for(USER_CHEF))
        .to_request();
    let res = test::call_service(&app, req).await;
    let body = res.into_body().try_into_bytes().unwrap();
    let user: roombook_api_types::CurrentUser = serde_json::from_slice(&body).unwrap();
    assert!(user.is_admin);
    assert!(!user.is_kitchen);

    let req = test::TestRequest::patch()
        .uri(&format!("/api/v1/users/{}/roles", Uuid::now_v7()))
        .append_header(token_for(USER_ADMIN))
        .set_json(json!({"isKitchen": true}))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::NOT_FOUND);
}
