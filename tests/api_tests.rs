//! HTTP surface: status codes and JSON bodies through the full router.

mod common;

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use cinema_booking::{controllers, AppState};
use common::{at, test_config, Cinema};

fn router(cinema: &Cinema) -> Router {
    let state = AppState::with_store(Arc::new(cinema.store.clone()), None, test_config());
    controllers::app(state)
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => request
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

fn screening_body(cinema: &Cinema, hall_id: i64, hour: u32) -> Value {
    json!({
        "movie_id": cinema.feature.id,
        "hall_id": hall_id,
        "screening_type_id": cinema.standard.id,
        "start_time": at(hour, 0),
    })
}

#[tokio::test]
async fn health_check_answers() {
    let cinema = Cinema::new().await;
    let app = router(&cinema);

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"OK");
}

#[tokio::test]
async fn overlapping_screening_returns_conflict() {
    let cinema = Cinema::new().await;
    let app = router(&cinema);

    let (status, created) = send(&app, Method::POST, "/api/screenings", Some(screening_body(&cinema, cinema.hall1.id, 13))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["is_active"], true);

    let (status, error) = send(&app, Method::POST, "/api/screenings", Some(screening_body(&cinema, cinema.hall1.id, 14))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error["error"], "conflict");

    let id = created["id"].as_i64().unwrap();
    let (status, details) = send(&app, Method::GET, &format!("/api/screenings/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(details["hall_name"], "Hall 1");
    assert_eq!(details["movie_duration"], 125);
}

#[tokio::test]
async fn unknown_screening_is_404() {
    let cinema = Cinema::new().await;
    let app = router(&cinema);

    let (status, error) = send(&app, Method::GET, "/api/screenings/31337", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error["error"], "not_found");
    assert_eq!(error["message"], "screening 31337 not found");
}

#[tokio::test]
async fn ticket_lifecycle_over_http() {
    let cinema = Cinema::new().await;
    let app = router(&cinema);
    let screening = cinema
        .store
        .add_screening(cinema.feature.id, cinema.hall1.id, cinema.standard.id, at(13, 0))
        .await;
    let buyer = cinema.customer().await;
    let seat = cinema.hall1_seats[0].id;
    let ticket_body = json!({ "seat_id": seat, "screening_id": screening.id, "user_id": buyer.id });

    let (status, ticket) = send(&app, Method::POST, "/api/tickets", Some(ticket_body.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    let ticket_id = ticket["id"].as_i64().unwrap();

    let (status, _) = send(&app, Method::POST, "/api/tickets", Some(ticket_body.clone())).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, occupancy) = send(&app, Method::GET, &format!("/api/screenings/{}/occupancy", screening.id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(occupancy, json!({ "screening_id": screening.id, "total_seats": 10, "occupied": 1, "free": 9 }));

    let (status, _) = send(&app, Method::DELETE, &format!("/api/tickets/{ticket_id}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, Method::POST, "/api/tickets", Some(ticket_body)).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn booking_errors_map_to_status_codes() {
    let cinema = Cinema::new().await;
    let app = router(&cinema);
    let screening = cinema
        .store
        .add_screening(cinema.feature.id, cinema.hall1.id, cinema.standard.id, at(13, 0))
        .await;
    let admin = cinema.admin().await;
    let buyer = cinema.customer().await;

    let (status, error) = send(
        &app,
        Method::POST,
        "/api/tickets",
        Some(json!({ "seat_id": cinema.hall1_seats[0].id, "screening_id": screening.id, "user_id": admin.id })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(error["error"], "forbidden");

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/tickets",
        Some(json!({ "seat_id": cinema.hall2_seats[0].id, "screening_id": screening.id, "user_id": buyer.id })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    // Ids must be positive before the service is even called
    let (status, error) = send(
        &app,
        Method::POST,
        "/api/tickets",
        Some(json!({ "seat_id": 0, "screening_id": screening.id, "user_id": buyer.id })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error["error"], "invalid");
}

#[tokio::test]
async fn review_requires_ticket_and_valid_rating() {
    let cinema = Cinema::new().await;
    let app = router(&cinema);
    let screening = cinema
        .store
        .add_screening(cinema.feature.id, cinema.hall1.id, cinema.standard.id, at(13, 0))
        .await;
    let viewer = cinema.customer().await;

    let review = |rating: i32| json!({ "user_id": viewer.id, "screening_id": screening.id, "rating": rating, "comment": "ok" });

    let (status, _) = send(&app, Method::POST, "/api/reviews", Some(review(5))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/tickets",
        Some(json!({ "seat_id": cinema.hall1_seats[2].id, "screening_id": screening.id, "user_id": viewer.id })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = send(&app, Method::POST, "/api/reviews", Some(review(6))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, created) = send(&app, Method::POST, "/api/reviews", Some(review(5))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["rating"], 5);

    let (status, _) = send(&app, Method::POST, "/api/reviews", Some(review(4))).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn seat_map_reports_cache_miss_without_redis() {
    let cinema = Cinema::new().await;
    let app = router(&cinema);
    let screening = cinema
        .store
        .add_screening(cinema.short.id, cinema.hall2.id, cinema.standard.id, at(18, 0))
        .await;

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/api/screenings/{}/seats", screening.id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-cache"], "MISS");
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let map: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(map["hall_name"], "Hall 2");
    assert_eq!(map["seats"].as_array().map(Vec::len), Some(10));
}

#[tokio::test]
async fn seat_generation_over_http() {
    let cinema = Cinema::new().await;
    let app = router(&cinema);
    let hall = cinema.store.add_hall("Studio").await;

    let (status, layout) = send(
        &app,
        Method::POST,
        &format!("/api/halls/{}/seats/generate", hall.id),
        Some(json!({ "rows": 3, "seats_per_row": 4 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(layout["seat_count"], 12);
    assert_eq!(layout["seats"][11]["seat_number"], "C4");

    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/api/halls/{}/seats/generate", hall.id),
        Some(json!({ "rows": 27, "seats_per_row": 4 })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn start_time_outside_the_calendar_is_rejected() {
    let cinema = Cinema::new().await;
    let app = router(&cinema);

    let mut body = screening_body(&cinema, cinema.hall1.id, 13);
    body["start_time"] = json!("2500-01-01T10:00:00Z");
    let (status, error) = send(&app, Method::POST, "/api/screenings", Some(body)).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error["error"], "invalid");
    assert!(cinema.store.screenings().await.is_empty());
}

#[tokio::test]
async fn rebooking_an_unknown_ticket_is_404() {
    let cinema = Cinema::new().await;
    let app = router(&cinema);
    let screening = cinema
        .store
        .add_screening(cinema.feature.id, cinema.hall1.id, cinema.standard.id, at(13, 0))
        .await;
    let buyer = cinema.customer().await;

    let (status, error) = send(
        &app,
        Method::PUT,
        "/api/tickets/4040",
        Some(json!({ "seat_id": cinema.hall1_seats[0].id, "screening_id": screening.id, "user_id": buyer.id })),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error["message"], "ticket 4040 not found");
    assert!(cinema.store.tickets().await.is_empty());
}
