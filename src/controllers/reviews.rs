use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

use crate::error::BookingError;
use crate::services::reviews;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/reviews", post(create_review))
        .route(
            "/reviews/{id}",
            get(get_review).put(update_review).delete(delete_review),
        )
}

// Диапазон рейтинга проверяет сервис (Invalid), здесь только форма запроса
#[derive(Debug, Deserialize, Validate)]
struct ReviewUpsertRequest {
    rating: i32,
    #[validate(length(max = 1000))]
    comment: Option<String>,
    #[validate(range(min = 1))]
    screening_id: i64,
    #[validate(range(min = 1))]
    user_id: i64,
}

impl From<ReviewUpsertRequest> for reviews::SubmitReviewRequest {
    fn from(req: ReviewUpsertRequest) -> Self {
        Self {
            user_id: req.user_id,
            screening_id: req.screening_id,
            rating: req.rating,
            comment: req.comment,
        }
    }
}

// POST /api/reviews
async fn create_review(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ReviewUpsertRequest>,
) -> Result<impl IntoResponse, BookingError> {
    req.validate()?;
    let review = reviews::submit_review(state.store.as_ref(), req.into()).await?;
    Ok((StatusCode::CREATED, Json(review)))
}

// GET /api/reviews/{id}
async fn get_review(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, BookingError> {
    let review = reviews::find_review(state.store.as_ref(), id).await?;
    Ok(Json(review))
}

// PUT /api/reviews/{id}
async fn update_review(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<ReviewUpsertRequest>,
) -> Result<impl IntoResponse, BookingError> {
    req.validate()?;
    let review = reviews::revise_review(state.store.as_ref(), id, req.into()).await?;
    Ok(Json(review))
}

// DELETE /api/reviews/{id}
async fn delete_review(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, BookingError> {
    reviews::retract_review(state.store.as_ref(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}
