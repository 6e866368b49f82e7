use axum::{
    extract::{Path, State},
    http::{header, HeaderName, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Datelike, Utc};
use serde::Deserialize;
use std::sync::Arc;
use validator::{Validate, ValidationError};

use super::invalidate_seat_maps;
use crate::error::BookingError;
use crate::services::{booking, scheduling};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/screenings", post(create_screening))
        .route(
            "/screenings/{id}",
            get(get_screening).put(update_screening).delete(delete_screening),
        )
        .route("/screenings/{id}/seats", get(get_seat_map))
        .route("/screenings/{id}/occupancy", get(get_occupancy))
}

#[derive(Debug, Deserialize, Validate)]
struct ScreeningUpsertRequest {
    #[validate(range(min = 1))]
    movie_id: i64,
    #[validate(range(min = 1))]
    hall_id: i64,
    #[validate(range(min = 1))]
    screening_type_id: i64,
    #[validate(custom(function = "validate_start_time"))]
    start_time: DateTime<Utc>,
}

// Сеансы планируются в пределах разумного календаря
const EARLIEST_YEAR: i32 = 2000;
const LATEST_YEAR: i32 = 2100;

fn validate_start_time(start_time: &DateTime<Utc>) -> Result<(), ValidationError> {
    if (EARLIEST_YEAR..=LATEST_YEAR).contains(&start_time.year()) {
        Ok(())
    } else {
        Err(ValidationError::new("start_time_out_of_range"))
    }
}

impl From<ScreeningUpsertRequest> for scheduling::ScheduleRequest {
    fn from(req: ScreeningUpsertRequest) -> Self {
        Self {
            movie_id: req.movie_id,
            hall_id: req.hall_id,
            screening_type_id: req.screening_type_id,
            start_time: req.start_time,
        }
    }
}

// POST /api/screenings
async fn create_screening(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ScreeningUpsertRequest>,
) -> Result<impl IntoResponse, BookingError> {
    req.validate()?;
    let screening = scheduling::schedule_screening(state.store.as_ref(), req.into()).await?;
    Ok((StatusCode::CREATED, Json(screening)))
}

// GET /api/screenings/{id}
async fn get_screening(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, BookingError> {
    let details = scheduling::screening_details(state.store.as_ref(), id).await?;
    Ok(Json(details))
}

// PUT /api/screenings/{id}
async fn update_screening(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<ScreeningUpsertRequest>,
) -> Result<impl IntoResponse, BookingError> {
    req.validate()?;
    let screening = scheduling::reschedule_screening(state.store.as_ref(), id, req.into()).await?;
    invalidate_seat_maps(&state, &[id]).await;
    Ok(Json(screening))
}

// DELETE /api/screenings/{id} - мягкое удаление
async fn delete_screening(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, BookingError> {
    scheduling::deactivate_screening(state.store.as_ref(), id).await?;
    invalidate_seat_maps(&state, &[id]).await;
    Ok(StatusCode::NO_CONTENT)
}

// GET /api/screenings/{id}/seats
async fn get_seat_map(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Response, BookingError> {
    // 1. Пытаемся отдать из кеша
    if let Some(cache) = &state.cache {
        if let Some(cached_json) = cache.get_seat_map(id).await {
            return Ok(json_with_cache_status(cached_json, "HIT"));
        }
    }

    // 2. Cache miss: собираем схему из БД
    let seat_map = booking::seat_map(state.store.as_ref(), id).await?;

    // 3. Сохраняем в кеш
    match serde_json::to_string(&seat_map) {
        Ok(json) => {
            if let Some(cache) = &state.cache {
                cache.save_seat_map(id, &json).await;
            }
            Ok(json_with_cache_status(json, "MISS"))
        }
        Err(e) => {
            tracing::error!("failed to serialize seat map for screening {}: {:?}", id, e);
            Ok(Json(seat_map).into_response())
        }
    }
}

// GET /api/screenings/{id}/occupancy
async fn get_occupancy(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, BookingError> {
    let occupancy = booking::occupancy(state.store.as_ref(), id).await?;
    Ok(Json(occupancy))
}

fn json_with_cache_status(json: String, status: &'static str) -> Response {
    (
        [
            (header::CONTENT_TYPE, "application/json"),
            (HeaderName::from_static("x-cache"), status),
        ],
        json,
    )
        .into_response()
}
