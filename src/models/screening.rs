use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ScreeningType {
    pub id: i64,
    pub name: String,
    pub price: f64,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Screening {
    pub id: i64,
    pub start_time: DateTime<Utc>,
    pub movie_id: i64,
    pub hall_id: i64,
    pub screening_type_id: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Field set written by insert and update.
#[derive(Debug, Clone)]
pub struct ScreeningDraft {
    pub start_time: DateTime<Utc>,
    pub movie_id: i64,
    pub hall_id: i64,
    pub screening_type_id: i64,
}

/// An active screening as seen by the conflict scan: start plus its movie's running time.
#[derive(Debug, Clone, FromRow)]
pub struct ScheduledSlot {
    pub screening_id: i64,
    pub start_time: DateTime<Utc>,
    pub duration: i32,
}

impl ScheduledSlot {
    pub fn end_time(&self) -> DateTime<Utc> {
        end_of(self.start_time, self.duration)
    }
}

/// `start + minutes`, saturating at the latest representable instant.
pub fn end_of(start: DateTime<Utc>, minutes: i32) -> DateTime<Utc> {
    start
        .checked_add_signed(Duration::minutes(i64::from(minutes)))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Screening joined with its movie, hall and type for display.
#[derive(Debug, Clone, Serialize)]
pub struct ScreeningDetails {
    pub id: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub movie_id: i64,
    pub movie_title: String,
    pub movie_duration: i32,
    pub hall_id: i64,
    pub hall_name: String,
    pub screening_type_id: i64,
    pub screening_type_name: String,
    pub price: f64,
}
