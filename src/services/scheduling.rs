//! scheduling.rs
//!
//! Screening scheduler. A hall never hosts two active screenings whose
//! `[start, start + movie duration)` intervals overlap.
//!
//! Intervals are half-open: a screening may start exactly when the previous
//! one ends. There is no changeover buffer between screenings.

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use tracing::{info, warn};

use crate::error::BookingError;
use crate::models::{end_of, ScheduledSlot, Screening, ScreeningDetails, ScreeningDraft};
use crate::store::{Store, StoreTx};

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleRequest {
    pub movie_id: i64,
    pub hall_id: i64,
    pub screening_type_id: i64,
    pub start_time: DateTime<Utc>,
}

/// Half-open time interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSlot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeSlot {
    /// Saturates at `DateTime::<Utc>::MAX_UTC` instead of overflowing.
    pub fn from_duration(start: DateTime<Utc>, minutes: i32) -> Self {
        Self {
            start,
            end: end_of(start, minutes),
        }
    }

    /// `None` when the end is not representable.
    pub fn checked(start: DateTime<Utc>, minutes: i32) -> Option<Self> {
        let end = start.checked_add_signed(Duration::minutes(i64::from(minutes)))?;
        Some(Self { start, end })
    }

    pub fn overlaps(&self, other: &TimeSlot) -> bool {
        self.start < other.end && self.end > other.start
    }
}

impl From<&ScheduledSlot> for TimeSlot {
    fn from(slot: &ScheduledSlot) -> Self {
        TimeSlot::from_duration(slot.start_time, slot.duration)
    }
}

/// First existing screening whose interval overlaps the candidate.
pub fn find_conflict<'a>(
    candidate: &TimeSlot,
    existing: &'a [ScheduledSlot],
) -> Option<&'a ScheduledSlot> {
    existing
        .iter()
        .find(|slot| candidate.overlaps(&TimeSlot::from(*slot)))
}

/// POST /screenings
pub async fn schedule_screening(
    store: &dyn Store,
    request: ScheduleRequest,
) -> Result<Screening, BookingError> {
    write_screening(store, request, None).await
}

/// PUT /screenings/{id}: the edited screening is left out of its own conflict scan.
pub async fn reschedule_screening(
    store: &dyn Store,
    screening_id: i64,
    request: ScheduleRequest,
) -> Result<Screening, BookingError> {
    write_screening(store, request, Some(screening_id)).await
}

async fn write_screening(
    store: &dyn Store,
    request: ScheduleRequest,
    exclude_screening_id: Option<i64>,
) -> Result<Screening, BookingError> {
    let mut tx = store.begin().await?;

    let current = match exclude_screening_id {
        Some(id) => Some(active_screening(tx.as_mut(), id).await?),
        None => None,
    };

    let movie = tx
        .find_movie(request.movie_id)
        .await?
        .filter(|m| m.is_active)
        .ok_or_else(|| BookingError::not_found("movie", request.movie_id))?;

    tx.find_hall(request.hall_id)
        .await?
        .filter(|h| h.is_active)
        .ok_or_else(|| BookingError::not_found("hall", request.hall_id))?;

    tx.find_screening_type(request.screening_type_id)
        .await?
        .filter(|t| t.is_active)
        .ok_or_else(|| BookingError::not_found("screening type", request.screening_type_id))?;

    let candidate = TimeSlot::checked(request.start_time, movie.duration).ok_or_else(|| {
        BookingError::Invalid(format!(
            "Screening starting at {} would end outside the supported time range",
            request.start_time
        ))
    })?;

    // Проданные билеты привязаны к местам текущего зала
    if let Some(current) = current.as_ref().filter(|s| s.hall_id != request.hall_id) {
        let sold = tx.active_tickets_for_screening(current.id).await?.len();
        if sold > 0 {
            warn!(
                "reschedule rejected: screening {} has {} active tickets in hall {}",
                current.id, sold, current.hall_id
            );
            return Err(BookingError::Conflict(format!(
                "Screening {} has {} sold tickets and cannot move to another hall",
                current.id, sold
            )));
        }
    }

    // Блокировка зала до конца транзакции: проверка и запись атомарны
    tx.lock_hall(request.hall_id).await?;

    let existing = tx
        .active_screenings_in_hall(request.hall_id, exclude_screening_id)
        .await?;

    if let Some(clash) = find_conflict(&candidate, &existing) {
        warn!(
            "schedule rejected: hall {} already runs screening {} from {} to {}",
            request.hall_id,
            clash.screening_id,
            clash.start_time,
            clash.end_time()
        );
        return Err(BookingError::Conflict(format!(
            "This screening conflicts with screening {} in hall {} ({} - {})",
            clash.screening_id,
            request.hall_id,
            clash.start_time.format("%Y-%m-%d %H:%M"),
            clash.end_time().format("%H:%M"),
        )));
    }

    let draft = ScreeningDraft {
        start_time: request.start_time,
        movie_id: request.movie_id,
        hall_id: request.hall_id,
        screening_type_id: request.screening_type_id,
    };

    let screening = match exclude_screening_id {
        Some(id) => tx.update_screening(id, &draft).await?,
        None => tx.insert_screening(&draft).await?,
    };
    tx.commit().await?;

    info!(
        "screening {} scheduled in hall {} at {} (movie {}, {} min)",
        screening.id, screening.hall_id, screening.start_time, movie.id, movie.duration
    );
    Ok(screening)
}

/// DELETE /screenings/{id}: soft deactivation, repeated calls are no-ops.
pub async fn deactivate_screening(
    store: &dyn Store,
    screening_id: i64,
) -> Result<Screening, BookingError> {
    let mut tx = store.begin().await?;

    let screening = tx
        .find_screening(screening_id)
        .await?
        .ok_or_else(|| BookingError::not_found("screening", screening_id))?;

    if !screening.is_active {
        return Ok(screening);
    }

    let screening = tx.set_screening_active(screening_id, false).await?;
    tx.commit().await?;

    info!("screening {} deactivated", screening_id);
    Ok(screening)
}

pub async fn screening_details(
    store: &dyn Store,
    screening_id: i64,
) -> Result<ScreeningDetails, BookingError> {
    let mut tx = store.begin().await?;
    let screening = tx
        .find_screening(screening_id)
        .await?
        .ok_or_else(|| BookingError::not_found("screening", screening_id))?;
    describe(tx.as_mut(), &screening).await
}

pub(crate) async fn active_screening(
    tx: &mut dyn StoreTx,
    screening_id: i64,
) -> Result<Screening, BookingError> {
    tx.find_screening(screening_id)
        .await?
        .filter(|s| s.is_active)
        .ok_or_else(|| BookingError::not_found("screening", screening_id))
}

/// Joins a screening with its movie, hall and type.
pub(crate) async fn describe(
    tx: &mut dyn StoreTx,
    screening: &Screening,
) -> Result<ScreeningDetails, BookingError> {
    let movie = tx
        .find_movie(screening.movie_id)
        .await?
        .ok_or_else(|| BookingError::not_found("movie", screening.movie_id))?;
    let hall = tx
        .find_hall(screening.hall_id)
        .await?
        .ok_or_else(|| BookingError::not_found("hall", screening.hall_id))?;
    let screening_type = tx
        .find_screening_type(screening.screening_type_id)
        .await?
        .ok_or_else(|| BookingError::not_found("screening type", screening.screening_type_id))?;

    let slot = TimeSlot::from_duration(screening.start_time, movie.duration);

    Ok(ScreeningDetails {
        id: screening.id,
        start_time: slot.start,
        end_time: slot.end,
        is_active: screening.is_active,
        created_at: screening.created_at,
        movie_id: movie.id,
        movie_title: movie.title,
        movie_duration: movie.duration,
        hall_id: hall.id,
        hall_name: hall.name,
        screening_type_id: screening_type.id,
        screening_type_name: screening_type.name,
        price: screening_type.price,
    })
}
