//! reviews.rs
//!
//! Only attendees review a screening, and only once: the author must hold an
//! active ticket for it and have no other active review of it.

use serde::Deserialize;
use tracing::{info, warn};

use super::scheduling::active_screening;
use crate::error::BookingError;
use crate::models::{Review, ReviewDraft};
use crate::store::Store;

pub const MIN_RATING: i32 = 1;
pub const MAX_RATING: i32 = 5;

#[derive(Debug, Clone, Deserialize)]
pub struct SubmitReviewRequest {
    pub user_id: i64,
    pub screening_id: i64,
    pub rating: i32,
    pub comment: Option<String>,
}

/// POST /reviews
pub async fn submit_review(
    store: &dyn Store,
    request: SubmitReviewRequest,
) -> Result<Review, BookingError> {
    write_review(store, request, None).await
}

/// PUT /reviews/{id}
pub async fn revise_review(
    store: &dyn Store,
    review_id: i64,
    request: SubmitReviewRequest,
) -> Result<Review, BookingError> {
    write_review(store, request, Some(review_id)).await
}

async fn write_review(
    store: &dyn Store,
    request: SubmitReviewRequest,
    exclude_review_id: Option<i64>,
) -> Result<Review, BookingError> {
    let mut tx = store.begin().await?;

    if let Some(id) = exclude_review_id {
        tx.find_review(id)
            .await?
            .filter(|r| r.is_active)
            .ok_or_else(|| BookingError::not_found("review", id))?;
    }

    tx.find_user(request.user_id)
        .await?
        .filter(|u| u.is_active)
        .ok_or_else(|| BookingError::not_found("user", request.user_id))?;

    let screening = active_screening(tx.as_mut(), request.screening_id).await?;

    if !(MIN_RATING..=MAX_RATING).contains(&request.rating) {
        return Err(BookingError::Invalid(format!(
            "Rating must be between {MIN_RATING} and {MAX_RATING}, got {}",
            request.rating
        )));
    }

    if !tx.has_active_ticket(request.user_id, screening.id).await? {
        warn!(
            "review rejected: user {} has no ticket for screening {}",
            request.user_id, screening.id
        );
        return Err(BookingError::Forbidden(
            "You can only review screenings you have a ticket for".to_string(),
        ));
    }

    if let Some(existing) = tx
        .active_review_by_user(request.user_id, screening.id, exclude_review_id)
        .await?
    {
        warn!(
            "review rejected: user {} already reviewed screening {} (review {})",
            request.user_id, screening.id, existing.id
        );
        return Err(BookingError::Conflict(
            "You have already reviewed this screening".to_string(),
        ));
    }

    let draft = ReviewDraft {
        rating: request.rating,
        comment: request.comment,
        screening_id: screening.id,
        user_id: request.user_id,
    };

    let review = match exclude_review_id {
        Some(id) => tx.update_review(id, &draft).await?,
        None => tx.insert_review(&draft).await?,
    };
    tx.commit().await?;

    info!(
        "review {} saved: user {} rated screening {} with {}",
        review.id, review.user_id, review.screening_id, review.rating
    );
    Ok(review)
}

/// DELETE /reviews/{id}
pub async fn retract_review(store: &dyn Store, review_id: i64) -> Result<Review, BookingError> {
    let mut tx = store.begin().await?;

    let review = tx
        .find_review(review_id)
        .await?
        .ok_or_else(|| BookingError::not_found("review", review_id))?;

    if !review.is_active {
        return Ok(review);
    }

    let review = tx.set_review_active(review_id, false).await?;
    tx.commit().await?;

    info!("review {} retracted", review_id);
    Ok(review)
}

pub async fn find_review(store: &dyn Store, review_id: i64) -> Result<Review, BookingError> {
    let mut tx = store.begin().await?;
    tx.find_review(review_id)
        .await?
        .ok_or_else(|| BookingError::not_found("review", review_id))
}
