//! booking.rs
//!
//! Seat and ticket booking for screenings.
//!
//! - A ticket binds one seat of the screening's hall to one customer.
//! - A seat holds at most one active ticket per screening.
//! - Ticket lifecycle is Active -> Inactive (cancellation), nothing else.
//! - Losing the last ticket for a screening retracts the holder's review of it.
//! - Occupancy and seat maps are computed from active seats and active tickets.

use std::collections::HashMap;

use serde::Deserialize;
use tracing::{info, warn};

use super::scheduling::{active_screening, describe};
use crate::error::BookingError;
use crate::models::{Occupancy, SeatMap, SeatWithTicket, Ticket, TicketDraft};
use crate::store::{Store, StoreTx};

#[derive(Debug, Clone, Deserialize)]
pub struct BookTicketRequest {
    pub seat_id: i64,
    pub screening_id: i64,
    pub user_id: i64,
}

/// POST /tickets
pub async fn book_ticket(
    store: &dyn Store,
    customer_role: &str,
    request: BookTicketRequest,
) -> Result<Ticket, BookingError> {
    write_ticket(store, customer_role, request, None).await
}

/// PUT /tickets/{id}: the ticket being edited does not block its own seat.
pub async fn rebook_ticket(
    store: &dyn Store,
    customer_role: &str,
    ticket_id: i64,
    request: BookTicketRequest,
) -> Result<Ticket, BookingError> {
    write_ticket(store, customer_role, request, Some(ticket_id)).await
}

async fn write_ticket(
    store: &dyn Store,
    customer_role: &str,
    request: BookTicketRequest,
    exclude_ticket_id: Option<i64>,
) -> Result<Ticket, BookingError> {
    let mut tx = store.begin().await?;

    let previous = match exclude_ticket_id {
        Some(id) => Some(
            tx.find_ticket(id)
                .await?
                .filter(|t| t.is_active)
                .ok_or_else(|| BookingError::not_found("ticket", id))?,
        ),
        None => None,
    };

    // 1. Покупатель существует и имеет роль покупателя
    tx.find_user(request.user_id)
        .await?
        .filter(|u| u.is_active)
        .ok_or_else(|| BookingError::not_found("user", request.user_id))?;

    if !tx.user_has_role(request.user_id, customer_role).await? {
        warn!(
            "booking rejected: user {} lacks role {}",
            request.user_id, customer_role
        );
        return Err(BookingError::Forbidden(format!(
            "Only users with the {customer_role} role can purchase tickets"
        )));
    }

    // 2. Сеанс
    let screening = active_screening(tx.as_mut(), request.screening_id).await?;

    // 3. Место
    let seat = tx
        .find_seat(request.seat_id)
        .await?
        .filter(|s| s.is_active)
        .ok_or_else(|| BookingError::not_found("seat", request.seat_id))?;

    // 4. Место в зале этого сеанса
    if seat.hall_id != screening.hall_id {
        warn!(
            "booking rejected: seat {} is in hall {}, screening {} runs in hall {}",
            seat.id, seat.hall_id, screening.id, screening.hall_id
        );
        return Err(BookingError::Invalid(format!(
            "Seat {} is not in the hall where screening {} takes place",
            seat.seat_number, screening.id
        )));
    }

    // 5. Место еще свободно
    if let Some(existing) = tx
        .active_ticket_for_seat(seat.id, screening.id, exclude_ticket_id)
        .await?
    {
        warn!(
            "booking rejected: seat {} already sold for screening {} (ticket {})",
            seat.id, screening.id, existing.id
        );
        return Err(BookingError::Conflict(format!(
            "Seat {} is already booked for screening {}",
            seat.seat_number, screening.id
        )));
    }

    let draft = TicketDraft {
        seat_id: seat.id,
        screening_id: screening.id,
        user_id: request.user_id,
    };

    let ticket = match exclude_ticket_id {
        Some(id) => tx.update_ticket(id, &draft).await?,
        None => tx.insert_ticket(&draft).await?,
    };

    // Билет ушел к другому сеансу или покупателю: старый отзыв мог остаться без билета
    if let Some(prev) = previous.filter(|p| {
        (p.user_id, p.screening_id) != (ticket.user_id, ticket.screening_id)
    }) {
        retract_unbacked_review(tx.as_mut(), prev.user_id, prev.screening_id).await?;
    }
    tx.commit().await?;

    info!(
        "ticket {} issued: seat {} screening {} user {}",
        ticket.id, ticket.seat_id, ticket.screening_id, ticket.user_id
    );
    Ok(ticket)
}

/// DELETE /tickets/{id}: Active -> Inactive, frees the seat. Idempotent.
pub async fn cancel_ticket(store: &dyn Store, ticket_id: i64) -> Result<Ticket, BookingError> {
    let mut tx = store.begin().await?;

    let ticket = tx
        .find_ticket(ticket_id)
        .await?
        .ok_or_else(|| BookingError::not_found("ticket", ticket_id))?;

    if !ticket.is_active {
        return Ok(ticket);
    }

    let ticket = tx.set_ticket_active(ticket_id, false).await?;
    retract_unbacked_review(tx.as_mut(), ticket.user_id, ticket.screening_id).await?;
    tx.commit().await?;

    info!(
        "ticket {} cancelled, seat {} released for screening {}",
        ticket.id, ticket.seat_id, ticket.screening_id
    );
    Ok(ticket)
}

/// A review stays active only while its author holds an active ticket for the screening.
async fn retract_unbacked_review(
    tx: &mut dyn StoreTx,
    user_id: i64,
    screening_id: i64,
) -> Result<(), BookingError> {
    if tx.has_active_ticket(user_id, screening_id).await? {
        return Ok(());
    }

    if let Some(review) = tx.active_review_by_user(user_id, screening_id, None).await? {
        tx.set_review_active(review.id, false).await?;
        info!(
            "review {} retracted: user {} no longer holds a ticket for screening {}",
            review.id, user_id, screening_id
        );
    }
    Ok(())
}

pub async fn find_ticket(store: &dyn Store, ticket_id: i64) -> Result<Ticket, BookingError> {
    let mut tx = store.begin().await?;
    tx.find_ticket(ticket_id)
        .await?
        .ok_or_else(|| BookingError::not_found("ticket", ticket_id))
}

/// Seats left = active seats in the hall minus active tickets for the screening.
pub async fn occupancy(store: &dyn Store, screening_id: i64) -> Result<Occupancy, BookingError> {
    let mut tx = store.begin().await?;
    let screening = active_screening(tx.as_mut(), screening_id).await?;

    let total = tx.active_seats_in_hall(screening.hall_id).await?.len() as i64;
    let occupied = tx.active_tickets_for_screening(screening.id).await?.len() as i64;

    Ok(Occupancy::new(screening.id, total, occupied))
}

/// GET /screenings/{id}/seats: hall seats joined with the screening's active tickets.
pub async fn seat_map(store: &dyn Store, screening_id: i64) -> Result<SeatMap, BookingError> {
    let mut tx = store.begin().await?;
    let screening = tx
        .find_screening(screening_id)
        .await?
        .ok_or_else(|| BookingError::not_found("screening", screening_id))?;

    let details = describe(tx.as_mut(), &screening).await?;
    let hall_seats = tx.active_seats_in_hall(screening.hall_id).await?;
    let taken: HashMap<i64, _> = tx
        .active_tickets_for_screening(screening.id)
        .await?
        .into_iter()
        .map(|o| (o.seat_id, o))
        .collect();

    let seats = hall_seats
        .into_iter()
        .map(|seat| {
            let occupant = taken.get(&seat.id);
            SeatWithTicket {
                id: seat.id,
                seat_number: seat.seat_number,
                hall_id: seat.hall_id,
                seat_type_id: seat.seat_type_id,
                is_occupied: occupant.is_some(),
                ticket_id: occupant.map(|o| o.ticket_id),
                occupant_name: occupant.map(|o| o.occupant_name.clone()),
            }
        })
        .collect();

    Ok(SeatMap {
        screening: details,
        seats,
    })
}
