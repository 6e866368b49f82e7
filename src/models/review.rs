use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Review {
    pub id: i64,
    pub rating: i32,
    pub comment: Option<String>,
    pub screening_id: i64,
    pub user_id: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ReviewDraft {
    pub rating: i32,
    pub comment: Option<String>,
    pub screening_id: i64,
    pub user_id: i64,
}
