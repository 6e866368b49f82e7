//! Entity store interface.
//!
//! Every scheduling, booking and review operation runs inside one unit of work
//! opened with [`Store::begin`]: existence checks, conflict scans and the final
//! write share a transaction and become visible only after [`StoreTx::commit`].
//! Dropping a [`StoreTx`] without committing discards its writes.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::models::{
    Hall, Movie, NewSeat, OccupiedSeat, Review, ReviewDraft, ScheduledSlot, Screening,
    ScreeningDraft, ScreeningType, Seat, Ticket, TicketDraft, User,
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait Store: Send + Sync {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTx>>;
}

#[async_trait]
pub trait StoreTx: Send {
    // --- lookups by id (inactive rows are returned too) ---
    async fn find_movie(&mut self, id: i64) -> StoreResult<Option<Movie>>;
    async fn find_hall(&mut self, id: i64) -> StoreResult<Option<Hall>>;
    async fn find_screening_type(&mut self, id: i64) -> StoreResult<Option<ScreeningType>>;
    async fn find_screening(&mut self, id: i64) -> StoreResult<Option<Screening>>;
    async fn find_seat(&mut self, id: i64) -> StoreResult<Option<Seat>>;
    async fn find_ticket(&mut self, id: i64) -> StoreResult<Option<Ticket>>;
    async fn find_review(&mut self, id: i64) -> StoreResult<Option<Review>>;
    async fn find_user(&mut self, id: i64) -> StoreResult<Option<User>>;

    /// Identity provider question: does the user hold `role`.
    async fn user_has_role(&mut self, user_id: i64, role: &str) -> StoreResult<bool>;

    // --- explicit join queries ---

    /// Active screenings in a hall with their movie durations, optionally skipping one.
    async fn active_screenings_in_hall(
        &mut self,
        hall_id: i64,
        exclude_screening_id: Option<i64>,
    ) -> StoreResult<Vec<ScheduledSlot>>;

    async fn active_ticket_for_seat(
        &mut self,
        seat_id: i64,
        screening_id: i64,
        exclude_ticket_id: Option<i64>,
    ) -> StoreResult<Option<Ticket>>;

    async fn active_tickets_for_screening(
        &mut self,
        screening_id: i64,
    ) -> StoreResult<Vec<OccupiedSeat>>;

    async fn has_active_ticket(&mut self, user_id: i64, screening_id: i64) -> StoreResult<bool>;

    async fn active_review_by_user(
        &mut self,
        user_id: i64,
        screening_id: i64,
        exclude_review_id: Option<i64>,
    ) -> StoreResult<Option<Review>>;

    /// Active seats of a hall ordered by id.
    async fn active_seats_in_hall(&mut self, hall_id: i64) -> StoreResult<Vec<Seat>>;

    async fn hall_has_active_tickets(&mut self, hall_id: i64) -> StoreResult<bool>;

    // --- writes ---

    /// Serializes schedule changes for one hall until the unit of work ends.
    async fn lock_hall(&mut self, hall_id: i64) -> StoreResult<()>;

    async fn insert_screening(&mut self, draft: &ScreeningDraft) -> StoreResult<Screening>;
    async fn update_screening(&mut self, id: i64, draft: &ScreeningDraft) -> StoreResult<Screening>;
    async fn set_screening_active(&mut self, id: i64, active: bool) -> StoreResult<Screening>;

    async fn insert_ticket(&mut self, draft: &TicketDraft) -> StoreResult<Ticket>;
    async fn update_ticket(&mut self, id: i64, draft: &TicketDraft) -> StoreResult<Ticket>;
    async fn set_ticket_active(&mut self, id: i64, active: bool) -> StoreResult<Ticket>;

    async fn insert_review(&mut self, draft: &ReviewDraft) -> StoreResult<Review>;
    async fn update_review(&mut self, id: i64, draft: &ReviewDraft) -> StoreResult<Review>;
    async fn set_review_active(&mut self, id: i64, active: bool) -> StoreResult<Review>;

    /// Soft-deactivates every seat of the hall, returns how many changed.
    async fn deactivate_hall_seats(&mut self, hall_id: i64) -> StoreResult<u64>;
    async fn insert_seats(&mut self, seats: &[NewSeat]) -> StoreResult<Vec<Seat>>;

    async fn commit(self: Box<Self>) -> StoreResult<()>;
}
