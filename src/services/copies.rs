//! Copy status tracker.
//!
//! Every method runs inside the caller's transaction and locks the copy row
//! before validating and writing its status.

use sqlx::PgConnection;

use crate::{
    error::{AppError, AppResult},
    models::copy::{BookCopy, CopyStatus},
    repository::Repository,
};

#[derive(Clone)]
pub struct CopyTracker {
    repository: Repository,
}

impl CopyTracker {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Lock the lowest-id available copy of a book
    pub async fn find_available_copy(
        &self,
        conn: &mut PgConnection,
        book_id: i32,
    ) -> AppResult<BookCopy> {
        self.repository
            .copies
            .lock_available(conn, book_id)
            .await?
            .ok_or(AppError::NoAvailableCopy(book_id))
    }

    /// available → loaned
    pub async fn mark_loaned(&self, conn: &mut PgConnection, copy_id: i32) -> AppResult<BookCopy> {
        self.transition(conn, copy_id, &[CopyStatus::Available], CopyStatus::Loaned)
            .await
    }

    /// {loaned, reserved} → available
    pub async fn mark_available(
        &self,
        conn: &mut PgConnection,
        copy_id: i32,
    ) -> AppResult<BookCopy> {
        self.transition(
            conn,
            copy_id,
            &[CopyStatus::Loaned, CopyStatus::Reserved],
            CopyStatus::Available,
        )
        .await
    }

    /// available → reserved, for holds tied to a specific copy
    pub async fn mark_reserved(
        &self,
        conn: &mut PgConnection,
        copy_id: i32,
    ) -> AppResult<BookCopy> {
        self.transition(conn, copy_id, &[CopyStatus::Available], CopyStatus::Reserved)
            .await
    }

    /// loaned → lost
    pub async fn mark_lost(&self, conn: &mut PgConnection, copy_id: i32) -> AppResult<BookCopy> {
        self.transition(conn, copy_id, &[CopyStatus::Loaned], CopyStatus::Lost)
            .await
    }

    /// {loaned, available} → damaged
    pub async fn mark_damaged(
        &self,
        conn: &mut PgConnection,
        copy_id: i32,
    ) -> AppResult<BookCopy> {
        self.transition(
            conn,
            copy_id,
            &[CopyStatus::Loaned, CopyStatus::Available],
            CopyStatus::Damaged,
        )
        .await
    }

    /// {available, damaged} → maintenance
    pub async fn send_to_maintenance(
        &self,
        conn: &mut PgConnection,
        copy_id: i32,
    ) -> AppResult<BookCopy> {
        self.transition(
            conn,
            copy_id,
            &[CopyStatus::Available, CopyStatus::Damaged],
            CopyStatus::Maintenance,
        )
        .await
    }

    /// {maintenance, damaged} → available
    pub async fn return_to_shelf(
        &self,
        conn: &mut PgConnection,
        copy_id: i32,
    ) -> AppResult<BookCopy> {
        self.transition(
            conn,
            copy_id,
            &[CopyStatus::Maintenance, CopyStatus::Damaged],
            CopyStatus::Available,
        )
        .await
    }

    async fn transition(
        &self,
        conn: &mut PgConnection,
        copy_id: i32,
        allowed_from: &[CopyStatus],
        next: CopyStatus,
    ) -> AppResult<BookCopy> {
        let copy = self.repository.copies.lock(conn, copy_id).await?;

        if !allowed_from.contains(&copy.status) {
            tracing::debug!(copy_id, from = %copy.status, to = %next, "Rejected copy transition");
            return Err(AppError::InvalidStateTransition(format!(
                "copy {} is {}, cannot become {}",
                copy_id, copy.status, next
            )));
        }
        copy.status.transition(next)?;

        let updated = self.repository.copies.set_status(conn, copy_id, next).await?;
        tracing::info!(copy_id, book_id = copy.book_id, from = %copy.status, to = %next, "Copy status changed");
        Ok(updated)
    }
}
