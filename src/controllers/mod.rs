pub mod screenings;
pub mod tickets;
pub mod reviews;
pub mod halls;

use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .merge(screenings::routes())
        .merge(tickets::routes())
        .merge(reviews::routes())
        .merge(halls::routes())
}

/// Full HTTP application: health endpoints plus the API under `/api`.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(|| async { "Cinema Booking API v1.0" }))
        .route("/health", get(|| async { "OK" }))
        .nest("/api", routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

// Сбросить закешированные схемы зала для сеансов
pub(crate) async fn invalidate_seat_maps(state: &AppState, screening_ids: &[i64]) {
    if let Some(cache) = &state.cache {
        cache.invalidate_seat_maps(screening_ids).await;
    }
}
