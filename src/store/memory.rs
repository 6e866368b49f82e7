//! In-process entity store.
//!
//! A unit of work holds the store mutex for its whole lifetime and edits a
//! private copy of the state; commit swaps the copy in. Units of work are
//! therefore fully serialized, which is what the test suite relies on.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{Store, StoreResult, StoreTx};
use crate::error::StoreError;
use crate::models::{
    Hall, Movie, NewSeat, OccupiedSeat, Review, ReviewDraft, ScheduledSlot, Screening,
    ScreeningDraft, ScreeningType, Seat, Ticket, TicketDraft, User,
};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    next_id: i64,
    halls: BTreeMap<i64, Hall>,
    seats: BTreeMap<i64, Seat>,
    movies: BTreeMap<i64, Movie>,
    screening_types: BTreeMap<i64, ScreeningType>,
    screenings: BTreeMap<i64, Screening>,
    tickets: BTreeMap<i64, Ticket>,
    reviews: BTreeMap<i64, Review>,
    users: BTreeMap<i64, User>,
    user_roles: HashSet<(i64, String)>,
}

impl MemoryState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_hall(&self, name: &str) -> Hall {
        let mut state = self.state.lock().await;
        let hall = Hall {
            id: state.next_id(),
            name: name.to_string(),
            is_active: true,
            created_at: Utc::now(),
        };
        state.halls.insert(hall.id, hall.clone());
        hall
    }

    pub async fn add_seat(&self, hall_id: i64, seat_number: &str) -> Seat {
        let mut state = self.state.lock().await;
        let seat = Seat {
            id: state.next_id(),
            seat_number: seat_number.to_string(),
            hall_id,
            seat_type_id: None,
            is_active: true,
            created_at: Utc::now(),
        };
        state.seats.insert(seat.id, seat.clone());
        seat
    }

    pub async fn add_movie(&self, title: &str, duration: i32) -> Movie {
        let mut state = self.state.lock().await;
        let movie = Movie {
            id: state.next_id(),
            title: title.to_string(),
            duration,
            is_active: true,
        };
        state.movies.insert(movie.id, movie.clone());
        movie
    }

    pub async fn add_screening_type(&self, name: &str, price: f64) -> ScreeningType {
        let mut state = self.state.lock().await;
        let screening_type = ScreeningType {
            id: state.next_id(),
            name: name.to_string(),
            price,
            is_active: true,
        };
        state
            .screening_types
            .insert(screening_type.id, screening_type.clone());
        screening_type
    }

    pub async fn add_user(&self, first_name: &str, last_name: &str, roles: &[&str]) -> User {
        let mut state = self.state.lock().await;
        let id = state.next_id();
        let user = User {
            id,
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            email: format!("user{id}@cinema.local"),
            is_active: true,
        };
        state.users.insert(id, user.clone());
        for role in roles {
            state.user_roles.insert((id, role.to_string()));
        }
        user
    }

    /// Writes a screening directly, bypassing the scheduler.
    pub async fn add_screening(
        &self,
        movie_id: i64,
        hall_id: i64,
        screening_type_id: i64,
        start_time: DateTime<Utc>,
    ) -> Screening {
        let mut state = self.state.lock().await;
        let screening = Screening {
            id: state.next_id(),
            start_time,
            movie_id,
            hall_id,
            screening_type_id,
            is_active: true,
            created_at: Utc::now(),
        };
        state.screenings.insert(screening.id, screening.clone());
        screening
    }

    pub async fn set_movie_active(&self, movie_id: i64, active: bool) {
        if let Some(movie) = self.state.lock().await.movies.get_mut(&movie_id) {
            movie.is_active = active;
        }
    }

    pub async fn screenings(&self) -> Vec<Screening> {
        self.state.lock().await.screenings.values().cloned().collect()
    }

    pub async fn tickets(&self) -> Vec<Ticket> {
        self.state.lock().await.tickets.values().cloned().collect()
    }

    pub async fn reviews(&self) -> Vec<Review> {
        self.state.lock().await.reviews.values().cloned().collect()
    }

    pub async fn movie_duration(&self, movie_id: i64) -> Option<i32> {
        self.state
            .lock()
            .await
            .movies
            .get(&movie_id)
            .map(|m| m.duration)
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTx>> {
        let guard = self.state.clone().lock_owned().await;
        let work = guard.clone();
        Ok(Box::new(MemoryTx { guard, work }))
    }
}

pub struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    work: MemoryState,
}

fn missing(entity: &'static str, id: i64) -> StoreError {
    StoreError::MissingRow { entity, id }
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn find_movie(&mut self, id: i64) -> StoreResult<Option<Movie>> {
        Ok(self.work.movies.get(&id).cloned())
    }

    async fn find_hall(&mut self, id: i64) -> StoreResult<Option<Hall>> {
        Ok(self.work.halls.get(&id).cloned())
    }

    async fn find_screening_type(&mut self, id: i64) -> StoreResult<Option<ScreeningType>> {
        Ok(self.work.screening_types.get(&id).cloned())
    }

    async fn find_screening(&mut self, id: i64) -> StoreResult<Option<Screening>> {
        Ok(self.work.screenings.get(&id).cloned())
    }

    async fn find_seat(&mut self, id: i64) -> StoreResult<Option<Seat>> {
        Ok(self.work.seats.get(&id).cloned())
    }

    async fn find_ticket(&mut self, id: i64) -> StoreResult<Option<Ticket>> {
        Ok(self.work.tickets.get(&id).cloned())
    }

    async fn find_review(&mut self, id: i64) -> StoreResult<Option<Review>> {
        Ok(self.work.reviews.get(&id).cloned())
    }

    async fn find_user(&mut self, id: i64) -> StoreResult<Option<User>> {
        Ok(self.work.users.get(&id).cloned())
    }

    async fn user_has_role(&mut self, user_id: i64, role: &str) -> StoreResult<bool> {
        Ok(self.work.user_roles.contains(&(user_id, role.to_string())))
    }

    async fn active_screenings_in_hall(
        &mut self,
        hall_id: i64,
        exclude_screening_id: Option<i64>,
    ) -> StoreResult<Vec<ScheduledSlot>> {
        let mut slots: Vec<ScheduledSlot> = self
            .work
            .screenings
            .values()
            .filter(|s| s.hall_id == hall_id && s.is_active)
            .filter(|s| exclude_screening_id != Some(s.id))
            .filter_map(|s| {
                self.work.movies.get(&s.movie_id).map(|m| ScheduledSlot {
                    screening_id: s.id,
                    start_time: s.start_time,
                    duration: m.duration,
                })
            })
            .collect();
        slots.sort_by_key(|slot| slot.start_time);
        Ok(slots)
    }

    async fn active_ticket_for_seat(
        &mut self,
        seat_id: i64,
        screening_id: i64,
        exclude_ticket_id: Option<i64>,
    ) -> StoreResult<Option<Ticket>> {
        Ok(self
            .work
            .tickets
            .values()
            .find(|t| {
                t.seat_id == seat_id
                    && t.screening_id == screening_id
                    && t.is_active
                    && exclude_ticket_id != Some(t.id)
            })
            .cloned())
    }

    async fn active_tickets_for_screening(
        &mut self,
        screening_id: i64,
    ) -> StoreResult<Vec<OccupiedSeat>> {
        let mut occupied: Vec<OccupiedSeat> = self
            .work
            .tickets
            .values()
            .filter(|t| t.screening_id == screening_id && t.is_active)
            .filter_map(|t| {
                self.work.users.get(&t.user_id).map(|u| OccupiedSeat {
                    ticket_id: t.id,
                    seat_id: t.seat_id,
                    user_id: t.user_id,
                    occupant_name: u.full_name(),
                })
            })
            .collect();
        occupied.sort_by_key(|o| o.seat_id);
        Ok(occupied)
    }

    async fn has_active_ticket(&mut self, user_id: i64, screening_id: i64) -> StoreResult<bool> {
        Ok(self
            .work
            .tickets
            .values()
            .any(|t| t.user_id == user_id && t.screening_id == screening_id && t.is_active))
    }

    async fn active_review_by_user(
        &mut self,
        user_id: i64,
        screening_id: i64,
        exclude_review_id: Option<i64>,
    ) -> StoreResult<Option<Review>> {
        Ok(self
            .work
            .reviews
            .values()
            .find(|r| {
                r.user_id == user_id
                    && r.screening_id == screening_id
                    && r.is_active
                    && exclude_review_id != Some(r.id)
            })
            .cloned())
    }

    async fn active_seats_in_hall(&mut self, hall_id: i64) -> StoreResult<Vec<Seat>> {
        Ok(self
            .work
            .seats
            .values()
            .filter(|s| s.hall_id == hall_id && s.is_active)
            .cloned()
            .collect())
    }

    async fn hall_has_active_tickets(&mut self, hall_id: i64) -> StoreResult<bool> {
        let seats = &self.work.seats;
        Ok(self.work.tickets.values().any(|t| {
            t.is_active
                && seats
                    .get(&t.seat_id)
                    .is_some_and(|seat| seat.hall_id == hall_id)
        }))
    }

    async fn lock_hall(&mut self, _hall_id: i64) -> StoreResult<()> {
        // Весь unit of work и так под мьютексом
        Ok(())
    }

    async fn insert_screening(&mut self, draft: &ScreeningDraft) -> StoreResult<Screening> {
        let screening = Screening {
            id: self.work.next_id(),
            start_time: draft.start_time,
            movie_id: draft.movie_id,
            hall_id: draft.hall_id,
            screening_type_id: draft.screening_type_id,
            is_active: true,
            created_at: Utc::now(),
        };
        self.work.screenings.insert(screening.id, screening.clone());
        Ok(screening)
    }

    async fn update_screening(&mut self, id: i64, draft: &ScreeningDraft) -> StoreResult<Screening> {
        let screening = self
            .work
            .screenings
            .get_mut(&id)
            .ok_or_else(|| missing("screening", id))?;
        screening.start_time = draft.start_time;
        screening.movie_id = draft.movie_id;
        screening.hall_id = draft.hall_id;
        screening.screening_type_id = draft.screening_type_id;
        Ok(screening.clone())
    }

    async fn set_screening_active(&mut self, id: i64, active: bool) -> StoreResult<Screening> {
        let screening = self
            .work
            .screenings
            .get_mut(&id)
            .ok_or_else(|| missing("screening", id))?;
        screening.is_active = active;
        Ok(screening.clone())
    }

    async fn insert_ticket(&mut self, draft: &TicketDraft) -> StoreResult<Ticket> {
        let ticket = Ticket {
            id: self.work.next_id(),
            seat_id: draft.seat_id,
            screening_id: draft.screening_id,
            user_id: draft.user_id,
            is_active: true,
            created_at: Utc::now(),
        };
        self.work.tickets.insert(ticket.id, ticket.clone());
        Ok(ticket)
    }

    async fn update_ticket(&mut self, id: i64, draft: &TicketDraft) -> StoreResult<Ticket> {
        let ticket = self
            .work
            .tickets
            .get_mut(&id)
            .ok_or_else(|| missing("ticket", id))?;
        ticket.seat_id = draft.seat_id;
        ticket.screening_id = draft.screening_id;
        ticket.user_id = draft.user_id;
        Ok(ticket.clone())
    }

    async fn set_ticket_active(&mut self, id: i64, active: bool) -> StoreResult<Ticket> {
        let ticket = self
            .work
            .tickets
            .get_mut(&id)
            .ok_or_else(|| missing("ticket", id))?;
        ticket.is_active = active;
        Ok(ticket.clone())
    }

    async fn insert_review(&mut self, draft: &ReviewDraft) -> StoreResult<Review> {
        let review = Review {
            id: self.work.next_id(),
            rating: draft.rating,
            comment: draft.comment.clone(),
            screening_id: draft.screening_id,
            user_id: draft.user_id,
            is_active: true,
            created_at: Utc::now(),
        };
        self.work.reviews.insert(review.id, review.clone());
        Ok(review)
    }

    async fn update_review(&mut self, id: i64, draft: &ReviewDraft) -> StoreResult<Review> {
        let review = self
            .work
            .reviews
            .get_mut(&id)
            .ok_or_else(|| missing("review", id))?;
        review.rating = draft.rating;
        review.comment = draft.comment.clone();
        review.screening_id = draft.screening_id;
        review.user_id = draft.user_id;
        Ok(review.clone())
    }

    async fn set_review_active(&mut self, id: i64, active: bool) -> StoreResult<Review> {
        let review = self
            .work
            .reviews
            .get_mut(&id)
            .ok_or_else(|| missing("review", id))?;
        review.is_active = active;
        Ok(review.clone())
    }

    async fn deactivate_hall_seats(&mut self, hall_id: i64) -> StoreResult<u64> {
        let mut changed = 0;
        for seat in self.work.seats.values_mut() {
            if seat.hall_id == hall_id && seat.is_active {
                seat.is_active = false;
                changed += 1;
            }
        }
        Ok(changed)
    }

    async fn insert_seats(&mut self, seats: &[NewSeat]) -> StoreResult<Vec<Seat>> {
        let mut inserted = Vec::with_capacity(seats.len());
        for new_seat in seats {
            let seat = Seat {
                id: self.work.next_id(),
                seat_number: new_seat.seat_number.clone(),
                hall_id: new_seat.hall_id,
                seat_type_id: new_seat.seat_type_id,
                is_active: true,
                created_at: Utc::now(),
            };
            self.work.seats.insert(seat.id, seat.clone());
            inserted.push(seat);
        }
        Ok(inserted)
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let MemoryTx { mut guard, work } = *self;
        *guard = work;
        Ok(())
    }
}
