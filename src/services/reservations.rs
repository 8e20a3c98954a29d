//! Reservation lifecycle: pending → ready → completed, with cancellation and
//! expiry as the other exits.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgConnection;
use utoipa::ToSchema;

use crate::{
    config::CirculationConfig,
    error::{AppError, AppResult},
    models::{
        loan::LoanDetails,
        principal::Principal,
        reservation::{hold_expiry, CreateReservation, Reservation, ReservationQuery, ReservationStatus},
    },
    repository::Repository,
    services::{copies::CopyTracker, loans::open_loan},
};

/// Result of checking out a ready reservation
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Checkout {
    pub reservation: Reservation,
    pub loan: LoanDetails,
}

#[derive(Clone)]
pub struct ReservationsService {
    repository: Repository,
    copies: CopyTracker,
    config: CirculationConfig,
}

impl ReservationsService {
    pub fn new(repository: Repository, copies: CopyTracker, config: CirculationConfig) -> Self {
        Self {
            repository,
            copies,
            config,
        }
    }

    pub async fn get(&self, actor: &Principal, id: i32) -> AppResult<Reservation> {
        let reservation = self.repository.reservations.get_by_id(id).await?;
        actor.require_member_access(reservation.member_id)?;
        Ok(reservation)
    }

    /// List reservations; members only ever see their own
    pub async fn list(
        &self,
        actor: &Principal,
        mut query: ReservationQuery,
    ) -> AppResult<Vec<Reservation>> {
        if !actor.is_staff() {
            query.member_id = Some(actor.resolve_member(query.member_id)?);
        }
        self.repository.reservations.list(&query).await
    }

    /// Reserve a book. The reservation is ready at once when a copy is on the
    /// shelf, pending otherwise.
    pub async fn reserve(
        &self,
        actor: &Principal,
        request: CreateReservation,
    ) -> AppResult<Reservation> {
        let member_id = actor.resolve_member(request.member_id)?;
        let book_id = request.book_id;
        let now = Utc::now();

        let mut tx = self.repository.pool.begin().await?;

        self.repository.members.ensure_exists(&mut tx, member_id).await?;
        self.repository.books.ensure_exists(&mut tx, book_id).await?;

        // A lapsed hold no longer counts against the member
        let lapsed = self
            .repository
            .reservations
            .expire_lapsed(&mut tx, member_id, book_id, now)
            .await?;
        if lapsed > 0 {
            tracing::info!(member_id, book_id, lapsed, "Lapsed reservation expired");
        }

        if self
            .repository
            .reservations
            .has_open(&mut tx, member_id, book_id)
            .await?
        {
            tracing::warn!(member_id, book_id, "Duplicate reservation rejected");
            return Err(AppError::DuplicateReservation { member_id, book_id });
        }

        let available = self.repository.copies.has_available(&mut tx, book_id).await?;
        let status = ReservationStatus::initial(available);
        let reservation = self
            .repository
            .reservations
            .create(
                &mut tx,
                book_id,
                member_id,
                now,
                hold_expiry(now, self.config.reservation_hold_days),
                status,
                request.notes.as_deref(),
            )
            .await?;

        tx.commit().await?;

        tracing::info!(reservation_id = reservation.id, member_id, book_id, status = ?status, "Reservation created");
        Ok(reservation)
    }

    /// pending/ready → cancelled
    pub async fn cancel(&self, actor: &Principal, id: i32) -> AppResult<Reservation> {
        let mut tx = self.repository.pool.begin().await?;

        let reservation = self.repository.reservations.lock(&mut tx, id).await?;
        actor.require_member_access(reservation.member_id)?;
        let cancelled = self.close(&mut tx, &reservation).await?;

        tx.commit().await?;

        tracing::info!(reservation_id = id, by = %actor.sub, "Reservation cancelled");
        Ok(cancelled)
    }

    /// Turn a ready reservation into a loan for its member
    pub async fn checkout(&self, actor: &Principal, id: i32) -> AppResult<Checkout> {
        let now = Utc::now();
        let mut tx = self.repository.pool.begin().await?;

        let reservation = self.repository.reservations.lock(&mut tx, id).await?;
        actor.require_member_access(reservation.member_id)?;
        if let Err(e) = reservation.ensure_ready(now) {
            tracing::warn!(reservation_id = id, status = ?reservation.status, "Checkout rejected");
            return Err(e);
        }

        let loan = open_loan(
            &self.repository,
            &self.copies,
            &mut tx,
            reservation.book_id,
            reservation.member_id,
            now,
            self.config.loan_period_days,
        )
        .await?;
        let completed = self
            .repository
            .reservations
            .finish(&mut tx, id, ReservationStatus::Completed, now, Some(loan.id))
            .await?;

        tx.commit().await?;

        tracing::info!(reservation_id = id, loan_id = loan.id, "Reservation checked out");
        let row = self.repository.loans.get_by_id(loan.id).await?;
        Ok(Checkout {
            reservation: completed,
            loan: LoanDetails::new(row, now),
        })
    }

    /// Staff accept a pending reservation
    pub async fn approve(&self, actor: &Principal, id: i32) -> AppResult<Reservation> {
        actor.require_staff()?;
        let now = Utc::now();

        let mut tx = self.repository.pool.begin().await?;
        let reservation = self.repository.reservations.lock(&mut tx, id).await?;
        reservation.ensure_pending()?;
        let ready = self
            .repository
            .reservations
            .mark_ready(&mut tx, id, hold_expiry(now, self.config.reservation_hold_days))
            .await?;
        tx.commit().await?;

        tracing::info!(reservation_id = id, by = %actor.sub, "Reservation approved");
        Ok(ready)
    }

    /// Staff deny an open reservation
    pub async fn deny(&self, actor: &Principal, id: i32) -> AppResult<Reservation> {
        actor.require_staff()?;

        let mut tx = self.repository.pool.begin().await?;
        let reservation = self.repository.reservations.lock(&mut tx, id).await?;
        let denied = self.close(&mut tx, &reservation).await?;
        tx.commit().await?;

        tracing::info!(reservation_id = id, by = %actor.sub, "Reservation denied");
        Ok(denied)
    }

    /// Expire every open reservation whose hold lapsed before `as_of`
    pub async fn expire_stale(
        &self,
        actor: &Principal,
        as_of: Option<DateTime<Utc>>,
    ) -> AppResult<u64> {
        actor.require_staff()?;
        let as_of = as_of.unwrap_or_else(Utc::now);
        let expired = self.repository.reservations.expire_stale(as_of).await?;
        if expired > 0 {
            tracing::info!(expired, %as_of, "Stale reservations expired");
        }
        Ok(expired)
    }

    /// Promote the oldest unexpired pending reservation of a book to ready
    /// when a copy is on the shelf. Runs in the caller's transaction.
    pub async fn fulfill_next_pending(
        &self,
        conn: &mut PgConnection,
        book_id: i32,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Reservation>> {
        if !self.repository.copies.has_available(conn, book_id).await? {
            return Ok(None);
        }
        let Some(next) = self
            .repository
            .reservations
            .lock_next_pending(conn, book_id, now)
            .await?
        else {
            return Ok(None);
        };

        let ready = self
            .repository
            .reservations
            .mark_ready(conn, next.id, hold_expiry(now, self.config.reservation_hold_days))
            .await?;

        tracing::info!(reservation_id = ready.id, book_id, member_id = ready.member_id, "Reservation ready");
        Ok(Some(ready))
    }

    async fn close(
        &self,
        conn: &mut PgConnection,
        reservation: &Reservation,
    ) -> AppResult<Reservation> {
        reservation.ensure_cancellable()?;
        self.repository
            .reservations
            .finish(conn, reservation.id, ReservationStatus::Cancelled, Utc::now(), None)
            .await
    }
}
