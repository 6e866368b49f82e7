use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::warn;
use validator::Validate;

use super::invalidate_seat_maps;
use crate::error::BookingError;
use crate::services::booking;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/tickets", post(create_ticket))
        .route(
            "/tickets/{id}",
            get(get_ticket).put(update_ticket).delete(cancel_ticket),
        )
}

#[derive(Debug, Deserialize, Validate)]
struct TicketUpsertRequest {
    #[validate(range(min = 1))]
    seat_id: i64,
    #[validate(range(min = 1))]
    screening_id: i64,
    #[validate(range(min = 1))]
    user_id: i64,
}

impl From<TicketUpsertRequest> for booking::BookTicketRequest {
    fn from(req: TicketUpsertRequest) -> Self {
        Self {
            seat_id: req.seat_id,
            screening_id: req.screening_id,
            user_id: req.user_id,
        }
    }
}

// POST /api/tickets
async fn create_ticket(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TicketUpsertRequest>,
) -> Result<impl IntoResponse, BookingError> {
    req.validate()?;
    let ticket = booking::book_ticket(
        state.store.as_ref(),
        &state.config.booking.customer_role,
        req.into(),
    )
    .await?;

    invalidate_seat_maps(&state, &[ticket.screening_id]).await;
    Ok((StatusCode::CREATED, Json(ticket)))
}

// GET /api/tickets/{id}
async fn get_ticket(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, BookingError> {
    let ticket = booking::find_ticket(state.store.as_ref(), id).await?;
    Ok(Json(ticket))
}

// PUT /api/tickets/{id} - пересадка на другое место/сеанс
async fn update_ticket(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<TicketUpsertRequest>,
) -> Result<impl IntoResponse, BookingError> {
    req.validate()?;

    // Старый сеанс тоже надо инвалидировать
    let previous = match booking::find_ticket(state.store.as_ref(), id).await {
        Ok(ticket) => Some(ticket),
        Err(e) => {
            warn!("ticket {} lookup before rebooking failed: {}", id, e);
            None
        }
    };

    let ticket = booking::rebook_ticket(
        state.store.as_ref(),
        &state.config.booking.customer_role,
        id,
        req.into(),
    )
    .await?;

    let mut touched = vec![ticket.screening_id];
    if let Some(prev) = previous.filter(|p| p.screening_id != ticket.screening_id) {
        touched.push(prev.screening_id);
    }
    invalidate_seat_maps(&state, &touched).await;

    Ok(Json(ticket))
}

// DELETE /api/tickets/{id} - отмена билета
async fn cancel_ticket(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, BookingError> {
    let ticket = booking::cancel_ticket(state.store.as_ref(), id).await?;
    invalidate_seat_maps(&state, &[ticket.screening_id]).await;
    Ok(StatusCode::NO_CONTENT)
}
