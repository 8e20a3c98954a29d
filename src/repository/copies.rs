//! Book copies repository. Status reads that precede a status write take a
//! row lock so concurrent requests cannot both claim the same copy.

use chrono::NaiveDate;
use sqlx::{PgConnection, Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::copy::{BookCopy, CopyStatus},
};

#[derive(Clone)]
pub struct CopiesRepository {
    pool: Pool<Postgres>,
}

impl CopiesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get copy by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<BookCopy> {
        sqlx::query_as::<_, BookCopy>("SELECT * FROM book_copies WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Copy with id {} not found", id)))
    }

    /// All copies of a book, lowest id first
    pub async fn list_for_book(&self, book_id: i32) -> AppResult<Vec<BookCopy>> {
        let copies = sqlx::query_as::<_, BookCopy>(
            "SELECT * FROM book_copies WHERE book_id = $1 ORDER BY id",
        )
        .bind(book_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(copies)
    }

    pub async fn create(
        &self,
        conn: &mut PgConnection,
        book_id: i32,
        acquisition_date: Option<NaiveDate>,
    ) -> AppResult<BookCopy> {
        let copy = sqlx::query_as::<_, BookCopy>(
            r#"
            INSERT INTO book_copies (book_id, acquisition_date, status)
            VALUES ($1, COALESCE($2, CURRENT_DATE), 'available')
            RETURNING *
            "#,
        )
        .bind(book_id)
        .bind(acquisition_date)
        .fetch_one(&mut *conn)
        .await?;

        Ok(copy)
    }

    /// Lock the lowest-id available copy of a book. Copies locked by a
    /// concurrent transaction are skipped rather than waited on.
    pub async fn lock_available(
        &self,
        conn: &mut PgConnection,
        book_id: i32,
    ) -> AppResult<Option<BookCopy>> {
        let copy = sqlx::query_as::<_, BookCopy>(
            r#"
            SELECT * FROM book_copies
            WHERE book_id = $1 AND status = 'available'
            ORDER BY id
            LIMIT 1
            FOR UPDATE SKIP LOCKED
            "#,
        )
        .bind(book_id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(copy)
    }

    /// Whether any copy of the book is currently available
    pub async fn has_available(&self, conn: &mut PgConnection, book_id: i32) -> AppResult<bool> {
        let available: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM book_copies WHERE book_id = $1 AND status = 'available')",
        )
        .bind(book_id)
        .fetch_one(&mut *conn)
        .await?;

        Ok(available)
    }

    pub async fn count_available(&self, book_id: i32) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM book_copies WHERE book_id = $1 AND status = 'available'",
        )
        .bind(book_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    /// Lock a copy row for a status change
    pub async fn lock(&self, conn: &mut PgConnection, id: i32) -> AppResult<BookCopy> {
        sqlx::query_as::<_, BookCopy>("SELECT * FROM book_copies WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Copy with id {} not found", id)))
    }

    pub async fn set_status(
        &self,
        conn: &mut PgConnection,
        id: i32,
        status: CopyStatus,
    ) -> AppResult<BookCopy> {
        let copy = sqlx::query_as::<_, BookCopy>(
            "UPDATE book_copies SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(status)
        .fetch_one(&mut *conn)
        .await?;

        Ok(copy)
    }

    /// Number of loans (open or closed) recorded against a copy
    pub async fn count_loans(&self, conn: &mut PgConnection, id: i32) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM loans WHERE copy_id = $1")
            .bind(id)
            .fetch_one(&mut *conn)
            .await?;

        Ok(count)
    }

    pub async fn delete(&self, conn: &mut PgConnection, id: i32) -> AppResult<()> {
        sqlx::query("DELETE FROM book_copies WHERE id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        Ok(())
    }
}
