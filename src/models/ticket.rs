use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Ticket {
    pub id: i64,
    pub seat_id: i64,
    pub screening_id: i64,
    pub user_id: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct TicketDraft {
    pub seat_id: i64,
    pub screening_id: i64,
    pub user_id: i64,
}

/// Active ticket for a screening joined with the holder's name.
#[derive(Debug, Clone, FromRow)]
pub struct OccupiedSeat {
    pub ticket_id: i64,
    pub seat_id: i64,
    pub user_id: i64,
    pub occupant_name: String,
}
