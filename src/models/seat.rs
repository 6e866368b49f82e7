use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Seat {
    pub id: i64,
    pub seat_number: String,
    pub hall_id: i64,
    pub seat_type_id: Option<i64>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Seat row before it has been assigned an id.
#[derive(Debug, Clone)]
pub struct NewSeat {
    pub seat_number: String,
    pub hall_id: i64,
    pub seat_type_id: Option<i64>,
}
