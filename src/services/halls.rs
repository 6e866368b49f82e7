use tracing::info;

use crate::error::BookingError;
use crate::models::{NewSeat, Seat};
use crate::store::Store;

pub const MAX_ROWS: u32 = 26;
pub const MAX_SEATS_PER_ROW: u32 = 50;

/// Result of regenerating a hall layout.
#[derive(Debug, Clone)]
pub struct SeatLayout {
    pub hall_id: i64,
    pub deactivated: u64,
    pub seats: Vec<Seat>,
    /// Active screenings in the hall whose seat maps changed.
    pub affected_screenings: Vec<i64>,
}

/// Row letter plus 1-based position: row 0, seat 1 -> "A1".
pub fn seat_number(row: u32, position: u32) -> String {
    let letter = char::from(b'A' + (row % MAX_ROWS) as u8);
    format!("{letter}{position}")
}

/// Replaces the hall's seats with a `rows x seats_per_row` grid.
///
/// Old seats are soft-deactivated, never deleted: tickets keep pointing at them.
/// Refused while any seat of the hall carries an active ticket.
pub async fn generate_seats(
    store: &dyn Store,
    hall_id: i64,
    rows: u32,
    seats_per_row: u32,
) -> Result<SeatLayout, BookingError> {
    if !(1..=MAX_ROWS).contains(&rows) || !(1..=MAX_SEATS_PER_ROW).contains(&seats_per_row) {
        return Err(BookingError::Invalid(format!(
            "Layout must have 1-{MAX_ROWS} rows and 1-{MAX_SEATS_PER_ROW} seats per row"
        )));
    }

    let mut tx = store.begin().await?;

    tx.find_hall(hall_id)
        .await?
        .filter(|h| h.is_active)
        .ok_or_else(|| BookingError::not_found("hall", hall_id))?;

    if tx.hall_has_active_tickets(hall_id).await? {
        return Err(BookingError::Conflict(format!(
            "Hall {hall_id} has sold tickets, its seats cannot be regenerated"
        )));
    }

    let deactivated = tx.deactivate_hall_seats(hall_id).await?;

    let layout: Vec<NewSeat> = (0..rows)
        .flat_map(|row| {
            (1..=seats_per_row).map(move |position| NewSeat {
                seat_number: seat_number(row, position),
                hall_id,
                seat_type_id: None,
            })
        })
        .collect();

    let seats = tx.insert_seats(&layout).await?;
    let affected_screenings = tx
        .active_screenings_in_hall(hall_id, None)
        .await?
        .into_iter()
        .map(|slot| slot.screening_id)
        .collect();
    tx.commit().await?;

    info!(
        "hall {} regenerated: {} seats ({}x{}), {} old seats deactivated",
        hall_id,
        seats.len(),
        rows,
        seats_per_row,
        deactivated
    );

    Ok(SeatLayout {
        hall_id,
        deactivated,
        seats,
        affected_screenings,
    })
}
