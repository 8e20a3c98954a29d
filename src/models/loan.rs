//! Loan (borrow) model and related types

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{fee::Transaction, reservation::Reservation},
};

/// Loan status. `Overdue` is derived from an active loan past its due date and
/// is never written by the services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[sqlx(type_name = "loan_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LoanStatus {
    Active,
    Returned,
    Overdue,
    Lost,
    Damaged,
}

/// Loan model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Loan {
    pub id: i32,
    pub copy_id: i32,
    pub member_id: i32,
    pub loan_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
    pub renewal_count: i16,
    pub last_renewed_at: Option<DateTime<Utc>>,
    pub status: LoanStatus,
    pub notes: Option<String>,
}

impl Loan {
    pub fn is_open(&self) -> bool {
        self.return_date.is_none()
    }

    /// An open loan whose due date lies before `as_of`
    pub fn is_overdue(&self, as_of: DateTime<Utc>) -> bool {
        self.is_open() && self.due_date < as_of
    }

    /// Whole calendar days past the due date. Closed loans are measured at
    /// their return date, open loans at `as_of`. Never negative.
    pub fn days_overdue(&self, as_of: DateTime<Utc>) -> i64 {
        let end = self.return_date.unwrap_or(as_of);
        if end <= self.due_date {
            return 0;
        }
        (end.date_naive() - self.due_date.date_naive())
            .num_days()
            .max(0)
    }

    /// Status as presented to callers
    pub fn effective_status(&self, as_of: DateTime<Utc>) -> LoanStatus {
        match self.status {
            LoanStatus::Active if self.is_overdue(as_of) => LoanStatus::Overdue,
            status => status,
        }
    }

    pub fn ensure_open(&self) -> AppResult<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(AppError::AlreadyReturned(self.id))
        }
    }

    /// Check renewal preconditions and compute the extended due date.
    /// Overdue loans are extended from `now`, not from the stale due date.
    pub fn renewal(
        &self,
        now: DateTime<Utc>,
        extension_days: i64,
        max_renewals: i16,
    ) -> AppResult<DateTime<Utc>> {
        self.ensure_open()?;
        if self.renewal_count >= max_renewals {
            return Err(AppError::RenewalLimitExceeded(max_renewals));
        }
        Ok(self.due_date.max(now) + Duration::days(extension_days))
    }

    /// Validate a return timestamp against the loan
    pub fn check_return_date(&self, returned_at: DateTime<Utc>) -> AppResult<()> {
        self.ensure_open()?;
        if returned_at < self.loan_date {
            return Err(AppError::Validation(
                "Return date cannot precede the loan date".to_string(),
            ));
        }
        Ok(())
    }
}

/// Loan joined with its catalog record
#[derive(Debug, Clone, FromRow)]
pub struct LoanWithBook {
    #[sqlx(flatten)]
    pub loan: Loan,
    pub book_id: i32,
    pub book_title: String,
}

/// Loan with computed status for display
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoanDetails {
    pub id: i32,
    pub copy_id: i32,
    pub member_id: i32,
    pub book_id: i32,
    pub book_title: String,
    pub loan_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
    pub renewal_count: i16,
    pub status: LoanStatus,
    pub is_overdue: bool,
    pub days_overdue: i64,
}

impl LoanDetails {
    pub fn new(row: LoanWithBook, as_of: DateTime<Utc>) -> Self {
        let LoanWithBook {
            loan,
            book_id,
            book_title,
        } = row;
        Self {
            id: loan.id,
            copy_id: loan.copy_id,
            member_id: loan.member_id,
            book_id,
            book_title,
            loan_date: loan.loan_date,
            due_date: loan.due_date,
            return_date: loan.return_date,
            renewal_count: loan.renewal_count,
            status: loan.effective_status(as_of),
            is_overdue: loan.is_overdue(as_of),
            days_overdue: loan.days_overdue(as_of),
        }
    }
}

/// Borrow request
#[derive(Debug, Default, Deserialize, ToSchema, Validate)]
pub struct BorrowRequest {
    /// Member borrowing the book. Defaults to the caller's own member id.
    pub member_id: Option<i32>,
    /// Staff only: loan period in days; the configured default when omitted
    #[validate(range(min = 1, max = 365))]
    pub loan_period_days: Option<i64>,
    /// Staff only: record a loan that started earlier than now
    pub loan_date: Option<DateTime<Utc>>,
}

/// Return request
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ReturnLoanRequest {
    /// Defaults to now. Staff may record an earlier return.
    pub returned_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

/// Request body for reporting a loan lost or damaged
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ReportLoanRequest {
    pub notes: Option<String>,
}

/// Outcome of closing a loan: the loan, the charges raised, and the
/// reservation promoted to ready when the copy went back on the shelf
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LoanClosure {
    pub loan: LoanDetails,
    pub charges: Vec<Transaction>,
    pub promoted_reservation: Option<Reservation>,
}

/// Active and overdue loan counts
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoanStats {
    pub active: i64,
    pub overdue: i64,
}
