use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};

use super::{Store, StoreResult, StoreTx};
use crate::error::StoreError;
use crate::models::{
    Hall, Movie, NewSeat, OccupiedSeat, Review, ReviewDraft, ScheduledSlot, Screening,
    ScreeningDraft, ScreeningType, Seat, Ticket, TicketDraft, User,
};

const SCREENING_COLUMNS: &str =
    "id, start_time, movie_id, hall_id, screening_type_id, is_active, created_at";
const TICKET_COLUMNS: &str = "id, seat_id, screening_id, user_id, is_active, created_at";
const REVIEW_COLUMNS: &str = "id, rating, comment, screening_id, user_id, is_active, created_at";
const SEAT_COLUMNS: &str = "id, seat_number, hall_id, seat_type_id, is_active, created_at";

/// Entity store over the Postgres pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTx>> {
        // READ COMMITTED: каждый запрос видит все закоммиченные строки,
        // гонки закрываются advisory lock по залу и частичными unique индексами
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgTx { tx }))
    }
}

pub struct PgTx {
    tx: Transaction<'static, Postgres>,
}

fn found<T>(row: Option<T>, entity: &'static str, id: i64) -> StoreResult<T> {
    row.ok_or(StoreError::MissingRow { entity, id })
}

#[async_trait]
impl StoreTx for PgTx {
    async fn find_movie(&mut self, id: i64) -> StoreResult<Option<Movie>> {
        let movie = sqlx::query_as::<_, Movie>(
            "SELECT id, title, duration, is_active FROM movies WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(movie)
    }

    async fn find_hall(&mut self, id: i64) -> StoreResult<Option<Hall>> {
        let hall = sqlx::query_as::<_, Hall>(
            "SELECT id, name, is_active, created_at FROM halls WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(hall)
    }

    async fn find_screening_type(&mut self, id: i64) -> StoreResult<Option<ScreeningType>> {
        let screening_type = sqlx::query_as::<_, ScreeningType>(
            "SELECT id, name, price::FLOAT8 AS price, is_active FROM screening_types WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(screening_type)
    }

    async fn find_screening(&mut self, id: i64) -> StoreResult<Option<Screening>> {
        let sql = format!("SELECT {SCREENING_COLUMNS} FROM screenings WHERE id = $1");
        let screening = sqlx::query_as::<_, Screening>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(screening)
    }

    async fn find_seat(&mut self, id: i64) -> StoreResult<Option<Seat>> {
        let sql = format!("SELECT {SEAT_COLUMNS} FROM seats WHERE id = $1");
        let seat = sqlx::query_as::<_, Seat>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(seat)
    }

    async fn find_ticket(&mut self, id: i64) -> StoreResult<Option<Ticket>> {
        let sql = format!("SELECT {TICKET_COLUMNS} FROM tickets WHERE id = $1");
        let ticket = sqlx::query_as::<_, Ticket>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(ticket)
    }

    async fn find_review(&mut self, id: i64) -> StoreResult<Option<Review>> {
        let sql = format!("SELECT {REVIEW_COLUMNS} FROM reviews WHERE id = $1");
        let review = sqlx::query_as::<_, Review>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(review)
    }

    async fn find_user(&mut self, id: i64) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, first_name, last_name, email, is_active FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(user)
    }

    async fn user_has_role(&mut self, user_id: i64, role: &str) -> StoreResult<bool> {
        let has_role = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
              SELECT 1
              FROM user_roles ur
              JOIN roles r ON r.id = ur.role_id
              WHERE ur.user_id = $1 AND r.name = $2
            )
            "#,
        )
        .bind(user_id)
        .bind(role)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(has_role)
    }

    async fn active_screenings_in_hall(
        &mut self,
        hall_id: i64,
        exclude_screening_id: Option<i64>,
    ) -> StoreResult<Vec<ScheduledSlot>> {
        let slots = sqlx::query_as::<_, ScheduledSlot>(
            r#"
            SELECT s.id AS screening_id, s.start_time, m.duration
            FROM screenings s
            JOIN movies m ON m.id = s.movie_id
            WHERE s.hall_id = $1
              AND s.is_active
              AND ($2::BIGINT IS NULL OR s.id <> $2)
            ORDER BY s.start_time
            "#,
        )
        .bind(hall_id)
        .bind(exclude_screening_id)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(slots)
    }

    async fn active_ticket_for_seat(
        &mut self,
        seat_id: i64,
        screening_id: i64,
        exclude_ticket_id: Option<i64>,
    ) -> StoreResult<Option<Ticket>> {
        let sql = format!(
            "SELECT {TICKET_COLUMNS} FROM tickets
             WHERE seat_id = $1 AND screening_id = $2 AND is_active
               AND ($3::BIGINT IS NULL OR id <> $3)
             LIMIT 1"
        );
        let ticket = sqlx::query_as::<_, Ticket>(&sql)
            .bind(seat_id)
            .bind(screening_id)
            .bind(exclude_ticket_id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(ticket)
    }

    async fn active_tickets_for_screening(
        &mut self,
        screening_id: i64,
    ) -> StoreResult<Vec<OccupiedSeat>> {
        let occupied = sqlx::query_as::<_, OccupiedSeat>(
            r#"
            SELECT t.id AS ticket_id, t.seat_id, t.user_id,
                   TRIM(u.first_name || ' ' || u.last_name) AS occupant_name
            FROM tickets t
            JOIN users u ON u.id = t.user_id
            WHERE t.screening_id = $1 AND t.is_active
            ORDER BY t.seat_id
            "#,
        )
        .bind(screening_id)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(occupied)
    }

    async fn has_active_ticket(&mut self, user_id: i64, screening_id: i64) -> StoreResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM tickets WHERE user_id = $1 AND screening_id = $2 AND is_active)",
        )
        .bind(user_id)
        .bind(screening_id)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(exists)
    }

    async fn active_review_by_user(
        &mut self,
        user_id: i64,
        screening_id: i64,
        exclude_review_id: Option<i64>,
    ) -> StoreResult<Option<Review>> {
        let sql = format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews
             WHERE user_id = $1 AND screening_id = $2 AND is_active
               AND ($3::BIGINT IS NULL OR id <> $3)
             LIMIT 1"
        );
        let review = sqlx::query_as::<_, Review>(&sql)
            .bind(user_id)
            .bind(screening_id)
            .bind(exclude_review_id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(review)
    }

    async fn active_seats_in_hall(&mut self, hall_id: i64) -> StoreResult<Vec<Seat>> {
        let sql = format!(
            "SELECT {SEAT_COLUMNS} FROM seats WHERE hall_id = $1 AND is_active ORDER BY id"
        );
        let seats = sqlx::query_as::<_, Seat>(&sql)
            .bind(hall_id)
            .fetch_all(&mut *self.tx)
            .await?;
        Ok(seats)
    }

    async fn hall_has_active_tickets(&mut self, hall_id: i64) -> StoreResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
              SELECT 1
              FROM tickets t
              JOIN seats s ON s.id = t.seat_id
              WHERE s.hall_id = $1 AND t.is_active
            )
            "#,
        )
        .bind(hall_id)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(exists)
    }

    async fn lock_hall(&mut self, hall_id: i64) -> StoreResult<()> {
        // Держится до конца транзакции
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(hall_id)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn insert_screening(&mut self, draft: &ScreeningDraft) -> StoreResult<Screening> {
        let sql = format!(
            "INSERT INTO screenings (start_time, movie_id, hall_id, screening_type_id)
             VALUES ($1, $2, $3, $4)
             RETURNING {SCREENING_COLUMNS}"
        );
        let screening = sqlx::query_as::<_, Screening>(&sql)
            .bind(draft.start_time)
            .bind(draft.movie_id)
            .bind(draft.hall_id)
            .bind(draft.screening_type_id)
            .fetch_one(&mut *self.tx)
            .await?;
        Ok(screening)
    }

    async fn update_screening(&mut self, id: i64, draft: &ScreeningDraft) -> StoreResult<Screening> {
        let sql = format!(
            "UPDATE screenings
             SET start_time = $2, movie_id = $3, hall_id = $4, screening_type_id = $5
             WHERE id = $1
             RETURNING {SCREENING_COLUMNS}"
        );
        let screening = sqlx::query_as::<_, Screening>(&sql)
            .bind(id)
            .bind(draft.start_time)
            .bind(draft.movie_id)
            .bind(draft.hall_id)
            .bind(draft.screening_type_id)
            .fetch_optional(&mut *self.tx)
            .await?;
        found(screening, "screening", id)
    }

    async fn set_screening_active(&mut self, id: i64, active: bool) -> StoreResult<Screening> {
        let sql = format!(
            "UPDATE screenings SET is_active = $2 WHERE id = $1 RETURNING {SCREENING_COLUMNS}"
        );
        let screening = sqlx::query_as::<_, Screening>(&sql)
            .bind(id)
            .bind(active)
            .fetch_optional(&mut *self.tx)
            .await?;
        found(screening, "screening", id)
    }

    async fn insert_ticket(&mut self, draft: &TicketDraft) -> StoreResult<Ticket> {
        let sql = format!(
            "INSERT INTO tickets (seat_id, screening_id, user_id)
             VALUES ($1, $2, $3)
             RETURNING {TICKET_COLUMNS}"
        );
        let ticket = sqlx::query_as::<_, Ticket>(&sql)
            .bind(draft.seat_id)
            .bind(draft.screening_id)
            .bind(draft.user_id)
            .fetch_one(&mut *self.tx)
            .await?;
        Ok(ticket)
    }

    async fn update_ticket(&mut self, id: i64, draft: &TicketDraft) -> StoreResult<Ticket> {
        let sql = format!(
            "UPDATE tickets SET seat_id = $2, screening_id = $3, user_id = $4
             WHERE id = $1
             RETURNING {TICKET_COLUMNS}"
        );
        let ticket = sqlx::query_as::<_, Ticket>(&sql)
            .bind(id)
            .bind(draft.seat_id)
            .bind(draft.screening_id)
            .bind(draft.user_id)
            .fetch_optional(&mut *self.tx)
            .await?;
        found(ticket, "ticket", id)
    }

    async fn set_ticket_active(&mut self, id: i64, active: bool) -> StoreResult<Ticket> {
        let sql =
            format!("UPDATE tickets SET is_active = $2 WHERE id = $1 RETURNING {TICKET_COLUMNS}");
        let ticket = sqlx::query_as::<_, Ticket>(&sql)
            .bind(id)
            .bind(active)
            .fetch_optional(&mut *self.tx)
            .await?;
        found(ticket, "ticket", id)
    }

    async fn insert_review(&mut self, draft: &ReviewDraft) -> StoreResult<Review> {
        let sql = format!(
            "INSERT INTO reviews (rating, comment, screening_id, user_id)
             VALUES ($1, $2, $3, $4)
             RETURNING {REVIEW_COLUMNS}"
        );
        let review = sqlx::query_as::<_, Review>(&sql)
            .bind(draft.rating)
            .bind(draft.comment.as_deref())
            .bind(draft.screening_id)
            .bind(draft.user_id)
            .fetch_one(&mut *self.tx)
            .await?;
        Ok(review)
    }

    async fn update_review(&mut self, id: i64, draft: &ReviewDraft) -> StoreResult<Review> {
        let sql = format!(
            "UPDATE reviews SET rating = $2, comment = $3, screening_id = $4, user_id = $5
             WHERE id = $1
             RETURNING {REVIEW_COLUMNS}"
        );
        let review = sqlx::query_as::<_, Review>(&sql)
            .bind(id)
            .bind(draft.rating)
            .bind(draft.comment.as_deref())
            .bind(draft.screening_id)
            .bind(draft.user_id)
            .fetch_optional(&mut *self.tx)
            .await?;
        found(review, "review", id)
    }

    async fn set_review_active(&mut self, id: i64, active: bool) -> StoreResult<Review> {
        let sql =
            format!("UPDATE reviews SET is_active = $2 WHERE id = $1 RETURNING {REVIEW_COLUMNS}");
        let review = sqlx::query_as::<_, Review>(&sql)
            .bind(id)
            .bind(active)
            .fetch_optional(&mut *self.tx)
            .await?;
        found(review, "review", id)
    }

    async fn deactivate_hall_seats(&mut self, hall_id: i64) -> StoreResult<u64> {
        let result = sqlx::query("UPDATE seats SET is_active = FALSE WHERE hall_id = $1 AND is_active")
            .bind(hall_id)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected())
    }

    async fn insert_seats(&mut self, seats: &[NewSeat]) -> StoreResult<Vec<Seat>> {
        if seats.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("INSERT INTO seats (seat_number, hall_id, seat_type_id) ");
        builder.push_values(seats, |mut row, seat| {
            row.push_bind(seat.seat_number.clone())
                .push_bind(seat.hall_id)
                .push_bind(seat.seat_type_id);
        });
        builder.push(format!(" RETURNING {SEAT_COLUMNS}"));

        let mut inserted = builder
            .build_query_as::<Seat>()
            .fetch_all(&mut *self.tx)
            .await?;
        inserted.sort_by_key(|s| s.id);
        Ok(inserted)
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
