use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use super::invalidate_seat_maps;
use crate::error::BookingError;
use crate::models::Seat;
use crate::services::halls;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/halls/{id}/seats/generate", post(generate_seats))
}

#[derive(Debug, Deserialize, Validate)]
struct GenerateSeatsRequest {
    #[validate(range(min = 1, max = 26))]
    rows: u32,
    #[validate(range(min = 1, max = 50))]
    seats_per_row: u32,
}

#[derive(Debug, Serialize)]
struct GenerateSeatsResponse {
    hall_id: i64,
    deactivated: u64,
    seat_count: usize,
    seats: Vec<Seat>,
}

// POST /api/halls/{id}/seats/generate - пересоздать схему зала
async fn generate_seats(
    State(state): State<Arc<AppState>>,
    Path(hall_id): Path<i64>,
    Json(req): Json<GenerateSeatsRequest>,
) -> Result<impl IntoResponse, BookingError> {
    req.validate()?;

    let layout =
        halls::generate_seats(state.store.as_ref(), hall_id, req.rows, req.seats_per_row).await?;
    invalidate_seat_maps(&state, &layout.affected_screenings).await;

    Ok((
        StatusCode::CREATED,
        Json(GenerateSeatsResponse {
            hall_id: layout.hall_id,
            deactivated: layout.deactivated,
            seat_count: layout.seats.len(),
            seats: layout.seats,
        }),
    ))
}
