use serde::{Deserialize, Serialize};

use super::ScreeningDetails;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeatWithTicket {
    pub id: i64,
    pub seat_number: String,
    pub hall_id: i64,
    pub seat_type_id: Option<i64>,
    pub is_occupied: bool,
    pub ticket_id: Option<i64>,
    pub occupant_name: Option<String>,
}

/// Hall layout for one screening, every active seat marked free or taken.
#[derive(Debug, Clone, Serialize)]
pub struct SeatMap {
    #[serde(flatten)]
    pub screening: ScreeningDetails,
    pub seats: Vec<SeatWithTicket>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occupancy {
    pub screening_id: i64,
    pub total_seats: i64,
    pub occupied: i64,
    pub free: i64,
}

impl Occupancy {
    pub fn new(screening_id: i64, total_seats: i64, occupied: i64) -> Self {
        Self {
            screening_id,
            total_seats,
            occupied,
            free: (total_seats - occupied).max(0),
        }
    }
}
