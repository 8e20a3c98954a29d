//! Reservations repository for database operations

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, Pool, Postgres};

use crate::{
    error::{is_unique_violation, AppError, AppResult},
    models::reservation::{Reservation, ReservationQuery, ReservationStatus},
};

/// Partial unique index allowing one pending or ready reservation per member and book
const OPEN_RESERVATION_INDEX: &str = "idx_reservations_open_member_book";

#[derive(Clone)]
pub struct ReservationsRepository {
    pool: Pool<Postgres>,
}

impl ReservationsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get reservation by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Reservation> {
        sqlx::query_as::<_, Reservation>("SELECT * FROM reservations WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Reservation with id {} not found", id)))
    }

    /// Lock a reservation row for update
    pub async fn lock(&self, conn: &mut PgConnection, id: i32) -> AppResult<Reservation> {
        sqlx::query_as::<_, Reservation>("SELECT * FROM reservations WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Reservation with id {} not found", id)))
    }

    /// Reservations matching the filter, oldest first
    pub async fn list(&self, query: &ReservationQuery) -> AppResult<Vec<Reservation>> {
        let reservations = sqlx::query_as::<_, Reservation>(
            r#"
            SELECT * FROM reservations
            WHERE ($1::INTEGER IS NULL OR book_id = $1)
              AND ($2::INTEGER IS NULL OR member_id = $2)
              AND ($3::reservation_status IS NULL OR status = $3)
            ORDER BY reservation_date, id
            "#,
        )
        .bind(query.book_id)
        .bind(query.member_id)
        .bind(query.status)
        .fetch_all(&self.pool)
        .await?;

        Ok(reservations)
    }

    /// Whether the member already holds a pending or ready reservation for the book
    pub async fn has_open(
        &self,
        conn: &mut PgConnection,
        member_id: i32,
        book_id: i32,
    ) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM reservations
                WHERE member_id = $1 AND book_id = $2 AND status IN ('pending', 'ready')
            )
            "#,
        )
        .bind(member_id)
        .bind(book_id)
        .fetch_one(&mut *conn)
        .await?;

        Ok(exists)
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        &self,
        conn: &mut PgConnection,
        book_id: i32,
        member_id: i32,
        reservation_date: DateTime<Utc>,
        expiry_date: DateTime<Utc>,
        status: ReservationStatus,
        notes: Option<&str>,
    ) -> AppResult<Reservation> {
        let reservation = sqlx::query_as::<_, Reservation>(
            r#"
            INSERT INTO reservations (book_id, member_id, reservation_date, expiry_date, status, notes)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(book_id)
        .bind(member_id)
        .bind(reservation_date)
        .bind(expiry_date)
        .bind(status)
        .bind(notes)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| {
            if is_unique_violation(&e, OPEN_RESERVATION_INDEX) {
                AppError::DuplicateReservation { member_id, book_id }
            } else {
                e.into()
            }
        })?;

        Ok(reservation)
    }

    /// Move a reservation into a terminal status
    pub async fn finish(
        &self,
        conn: &mut PgConnection,
        id: i32,
        status: ReservationStatus,
        completed_at: DateTime<Utc>,
        loan_id: Option<i32>,
    ) -> AppResult<Reservation> {
        let reservation = sqlx::query_as::<_, Reservation>(
            r#"
            UPDATE reservations
            SET status = $2, completed_at = $3, loan_id = $4
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(completed_at)
        .bind(loan_id)
        .fetch_one(&mut *conn)
        .await?;

        Ok(reservation)
    }

    /// Mark a reservation ready and restart its hold window
    pub async fn mark_ready(
        &self,
        conn: &mut PgConnection,
        id: i32,
        expiry_date: DateTime<Utc>,
    ) -> AppResult<Reservation> {
        let reservation = sqlx::query_as::<_, Reservation>(
            "UPDATE reservations SET status = 'ready', expiry_date = $2 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(expiry_date)
        .fetch_one(&mut *conn)
        .await?;

        Ok(reservation)
    }

    /// Lock the oldest unexpired pending reservation for a book
    pub async fn lock_next_pending(
        &self,
        conn: &mut PgConnection,
        book_id: i32,
        as_of: DateTime<Utc>,
    ) -> AppResult<Option<Reservation>> {
        let reservation = sqlx::query_as::<_, Reservation>(
            r#"
            SELECT * FROM reservations
            WHERE book_id = $1 AND status = 'pending' AND expiry_date >= $2
            ORDER BY reservation_date, id
            LIMIT 1
            FOR UPDATE SKIP LOCKED
            "#,
        )
        .bind(book_id)
        .bind(as_of)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(reservation)
    }

    /// Expire a member's open reservations for a book whose hold lapsed before `as_of`
    pub async fn expire_lapsed(
        &self,
        conn: &mut PgConnection,
        member_id: i32,
        book_id: i32,
        as_of: DateTime<Utc>,
    ) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE reservations
            SET status = 'expired', completed_at = $3
            WHERE member_id = $1 AND book_id = $2
              AND status IN ('pending', 'ready') AND expiry_date < $3
            "#,
        )
        .bind(member_id)
        .bind(book_id)
        .bind(as_of)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected())
    }

    /// Expire every open reservation whose hold lapsed before `as_of`
    pub async fn expire_stale(&self, as_of: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE reservations
            SET status = 'expired', completed_at = $1
            WHERE status IN ('pending', 'ready') AND expiry_date < $1
            "#,
        )
        .bind(as_of)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
