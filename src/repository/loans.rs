//! Loans repository for database operations

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::loan::{Loan, LoanStatus, LoanWithBook},
};

const LOAN_WITH_BOOK: &str = r#"
    SELECT l.*, b.id AS book_id, b.title AS book_title
    FROM loans l
    JOIN book_copies c ON c.id = l.copy_id
    JOIN books b ON b.id = c.book_id
"#;

#[derive(Clone)]
pub struct LoansRepository {
    pool: Pool<Postgres>,
}

impl LoansRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get loan by ID with its book
    pub async fn get_by_id(&self, id: i32) -> AppResult<LoanWithBook> {
        sqlx::query_as::<_, LoanWithBook>(&format!("{} WHERE l.id = $1", LOAN_WITH_BOOK))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", id)))
    }

    /// Lock a loan row for update
    pub async fn lock(&self, conn: &mut PgConnection, id: i32) -> AppResult<Loan> {
        sqlx::query_as::<_, Loan>("SELECT * FROM loans WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", id)))
    }

    /// Loans of a member, newest first
    pub async fn list_for_member(
        &self,
        member_id: i32,
        open_only: bool,
    ) -> AppResult<Vec<LoanWithBook>> {
        let loans = sqlx::query_as::<_, LoanWithBook>(&format!(
            "{} WHERE l.member_id = $1 AND ($2 = FALSE OR l.return_date IS NULL) ORDER BY l.loan_date DESC, l.id DESC",
            LOAN_WITH_BOOK
        ))
        .bind(member_id)
        .bind(open_only)
        .fetch_all(&self.pool)
        .await?;

        Ok(loans)
    }

    /// Open loans past their due date, most overdue first
    pub async fn list_overdue(&self, as_of: DateTime<Utc>) -> AppResult<Vec<LoanWithBook>> {
        let loans = sqlx::query_as::<_, LoanWithBook>(&format!(
            "{} WHERE l.return_date IS NULL AND l.due_date < $1 ORDER BY l.due_date",
            LOAN_WITH_BOOK
        ))
        .bind(as_of)
        .fetch_all(&self.pool)
        .await?;

        Ok(loans)
    }

    /// Open a loan
    pub async fn create(
        &self,
        conn: &mut PgConnection,
        copy_id: i32,
        member_id: i32,
        loan_date: DateTime<Utc>,
        due_date: DateTime<Utc>,
    ) -> AppResult<Loan> {
        let loan = sqlx::query_as::<_, Loan>(
            r#"
            INSERT INTO loans (copy_id, member_id, loan_date, due_date, renewal_count, status)
            VALUES ($1, $2, $3, $4, 0, 'active')
            RETURNING *
            "#,
        )
        .bind(copy_id)
        .bind(member_id)
        .bind(loan_date)
        .bind(due_date)
        .fetch_one(&mut *conn)
        .await?;

        Ok(loan)
    }

    /// Extend the due date and count the renewal
    pub async fn renew(
        &self,
        conn: &mut PgConnection,
        id: i32,
        due_date: DateTime<Utc>,
        renewed_at: DateTime<Utc>,
    ) -> AppResult<Loan> {
        let loan = sqlx::query_as::<_, Loan>(
            r#"
            UPDATE loans
            SET due_date = $2, last_renewed_at = $3, renewal_count = renewal_count + 1
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(due_date)
        .bind(renewed_at)
        .fetch_one(&mut *conn)
        .await?;

        Ok(loan)
    }

    /// Close a loan with its final status
    pub async fn close(
        &self,
        conn: &mut PgConnection,
        id: i32,
        return_date: DateTime<Utc>,
        status: LoanStatus,
        notes: Option<&str>,
    ) -> AppResult<Loan> {
        let loan = sqlx::query_as::<_, Loan>(
            r#"
            UPDATE loans
            SET return_date = $2, status = $3, notes = COALESCE($4, notes)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(return_date)
        .bind(status)
        .bind(notes)
        .fetch_one(&mut *conn)
        .await?;

        Ok(loan)
    }

    pub async fn delete(&self, conn: &mut PgConnection, id: i32) -> AppResult<()> {
        sqlx::query("DELETE FROM loans WHERE id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        Ok(())
    }

    /// Book owning the copy of a loan
    pub async fn book_id(&self, conn: &mut PgConnection, loan: &Loan) -> AppResult<i32> {
        let book_id: i32 = sqlx::query_scalar("SELECT book_id FROM book_copies WHERE id = $1")
            .bind(loan.copy_id)
            .fetch_one(&mut *conn)
            .await?;

        Ok(book_id)
    }

    /// Count active loans
    pub async fn count_active(&self) -> AppResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM loans WHERE return_date IS NULL")
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    /// Count overdue loans
    pub async fn count_overdue(&self, as_of: DateTime<Utc>) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM loans WHERE return_date IS NULL AND due_date < $1",
        )
        .bind(as_of)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}
