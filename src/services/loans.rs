//! Loan management service

use chrono::{DateTime, Duration, Utc};
use sqlx::PgConnection;
use validator::Validate;

use crate::{
    config::CirculationConfig,
    error::{AppError, AppResult},
    models::{
        fee::{FeeKind, Transaction},
        loan::{
            BorrowRequest, Loan, LoanClosure, LoanDetails, LoanStats, LoanStatus,
            ReportLoanRequest, ReturnLoanRequest,
        },
        principal::Principal,
        reservation::Reservation,
    },
    repository::Repository,
    services::{copies::CopyTracker, ledger::LedgerService, reservations::ReservationsService},
};

/// Claim an available copy of `book_id` and open a loan on it for `member_id`.
/// Shared by direct borrows and reservation checkouts; runs in the caller's
/// transaction.
pub(crate) async fn open_loan(
    repository: &Repository,
    copies: &CopyTracker,
    conn: &mut PgConnection,
    book_id: i32,
    member_id: i32,
    loan_date: DateTime<Utc>,
    period_days: i64,
) -> AppResult<Loan> {
    repository.members.ensure_exists(conn, member_id).await?;
    repository.books.ensure_exists(conn, book_id).await?;

    let copy = copies.find_available_copy(conn, book_id).await?;
    copies.mark_loaned(conn, copy.id).await?;

    let due_date = loan_date + Duration::days(period_days);
    let loan = repository
        .loans
        .create(conn, copy.id, member_id, loan_date, due_date)
        .await?;

    tracing::info!(loan_id = loan.id, copy_id = copy.id, book_id, member_id, %due_date, "Loan opened");
    Ok(loan)
}

#[derive(Clone)]
pub struct LoansService {
    repository: Repository,
    copies: CopyTracker,
    ledger: LedgerService,
    reservations: ReservationsService,
    config: CirculationConfig,
}

impl LoansService {
    pub fn new(
        repository: Repository,
        copies: CopyTracker,
        ledger: LedgerService,
        reservations: ReservationsService,
        config: CirculationConfig,
    ) -> Self {
        Self {
            repository,
            copies,
            ledger,
            reservations,
            config,
        }
    }

    /// Get a loan with its derived status
    pub async fn get(&self, actor: &Principal, loan_id: i32) -> AppResult<LoanDetails> {
        let row = self.repository.loans.get_by_id(loan_id).await?;
        actor.require_member_access(row.loan.member_id)?;
        Ok(LoanDetails::new(row, Utc::now()))
    }

    /// Get loans for a member
    pub async fn list_member_loans(
        &self,
        actor: &Principal,
        member_id: i32,
        open_only: bool,
    ) -> AppResult<Vec<LoanDetails>> {
        actor.require_member_access(member_id)?;
        // Verify member exists
        self.repository.members.get_by_id(member_id).await?;

        let now = Utc::now();
        let loans = self
            .repository
            .loans
            .list_for_member(member_id, open_only)
            .await?;
        Ok(loans.into_iter().map(|row| LoanDetails::new(row, now)).collect())
    }

    pub async fn list_overdue(&self, actor: &Principal) -> AppResult<Vec<LoanDetails>> {
        actor.require_staff()?;
        let now = Utc::now();
        let loans = self.repository.loans.list_overdue(now).await?;
        Ok(loans.into_iter().map(|row| LoanDetails::new(row, now)).collect())
    }

    pub async fn stats(&self, actor: &Principal) -> AppResult<LoanStats> {
        actor.require_staff()?;
        Ok(LoanStats {
            active: self.repository.loans.count_active().await?,
            overdue: self.repository.loans.count_overdue(Utc::now()).await?,
        })
    }

    /// Borrow a book (any available copy)
    pub async fn borrow(
        &self,
        actor: &Principal,
        book_id: i32,
        request: BorrowRequest,
    ) -> AppResult<LoanDetails> {
        request.validate()?;
        let member_id = actor.resolve_member(request.member_id)?;

        let now = Utc::now();
        let loan_date = match request.loan_date {
            Some(date) => {
                actor.require_staff()?;
                if date > now {
                    return Err(AppError::Validation(
                        "Loan date cannot be in the future".to_string(),
                    ));
                }
                date
            }
            None => now,
        };
        let period = match request.loan_period_days {
            Some(days) => {
                actor.require_staff()?;
                days
            }
            None => self.config.loan_period_days,
        };

        let mut tx = self.repository.pool.begin().await?;
        let result = open_loan(
            &self.repository,
            &self.copies,
            &mut tx,
            book_id,
            member_id,
            loan_date,
            period,
        )
        .await;
        let loan = match result {
            Ok(loan) => loan,
            Err(e) => {
                tracing::warn!(book_id, member_id, error = %e, "Borrow rejected");
                return Err(e);
            }
        };
        tx.commit().await?;

        let row = self.repository.loans.get_by_id(loan.id).await?;
        Ok(LoanDetails::new(row, now))
    }

    /// Renew a loan
    pub async fn renew(&self, actor: &Principal, loan_id: i32) -> AppResult<LoanDetails> {
        let now = Utc::now();
        let mut tx = self.repository.pool.begin().await?;

        let loan = self.repository.loans.lock(&mut tx, loan_id).await?;
        actor.require_member_access(loan.member_id)?;

        let due_date = match loan.renewal(now, self.config.renewal_days, self.config.max_renewals) {
            Ok(due_date) => due_date,
            Err(e) => {
                tracing::warn!(loan_id, renewal_count = loan.renewal_count, error = %e, "Renewal rejected");
                return Err(e);
            }
        };
        let renewed = self
            .repository
            .loans
            .renew(&mut tx, loan_id, due_date, now)
            .await?;

        tx.commit().await?;

        tracing::info!(loan_id, %due_date, renewal_count = renewed.renewal_count, "Loan renewed");
        let row = self.repository.loans.get_by_id(loan_id).await?;
        Ok(LoanDetails::new(row, now))
    }

    /// Return a borrowed copy: close the loan, free the copy, charge any late
    /// fee and hand the book to the next pending reservation
    pub async fn return_loan(
        &self,
        actor: &Principal,
        loan_id: i32,
        request: ReturnLoanRequest,
    ) -> AppResult<LoanClosure> {
        actor.require_staff()?;

        let now = Utc::now();
        let returned_at = request.returned_at.unwrap_or(now);
        if returned_at > now {
            return Err(AppError::Validation(
                "Return date cannot be in the future".to_string(),
            ));
        }

        let mut tx = self.repository.pool.begin().await?;

        let loan = self.repository.loans.lock(&mut tx, loan_id).await?;
        if let Err(e) = loan.check_return_date(returned_at) {
            tracing::warn!(loan_id, error = %e, "Return rejected");
            return Err(e);
        }

        let closed = self
            .repository
            .loans
            .close(
                &mut tx,
                loan_id,
                returned_at,
                LoanStatus::Returned,
                request.notes.as_deref(),
            )
            .await?;
        self.copies.mark_available(&mut tx, closed.copy_id).await?;

        let charges = self.late_fee_charges(&mut tx, &closed, returned_at).await?;

        let book_id = self.repository.loans.book_id(&mut tx, &closed).await?;
        let promoted_reservation = self
            .reservations
            .fulfill_next_pending(&mut tx, book_id, now)
            .await?;

        tx.commit().await?;

        tracing::info!(loan_id, copy_id = closed.copy_id, %returned_at, late_fee = !charges.is_empty(), "Loan returned");
        self.closure(loan_id, charges, promoted_reservation, now).await
    }

    /// Close an open loan as lost and charge the replacement fee
    pub async fn report_lost(
        &self,
        actor: &Principal,
        loan_id: i32,
        request: ReportLoanRequest,
    ) -> AppResult<LoanClosure> {
        actor.require_staff()?;
        let now = Utc::now();

        let mut tx = self.repository.pool.begin().await?;

        let loan = self.repository.loans.lock(&mut tx, loan_id).await?;
        loan.ensure_open()?;

        let closed = self
            .repository
            .loans
            .close(&mut tx, loan_id, now, LoanStatus::Lost, request.notes.as_deref())
            .await?;
        self.copies.mark_lost(&mut tx, closed.copy_id).await?;
        let charge = self
            .ledger
            .charge_flat_fee(&mut tx, &closed, FeeKind::Lost)
            .await?;

        tx.commit().await?;

        tracing::info!(loan_id, copy_id = closed.copy_id, "Loan reported lost");
        self.closure(loan_id, vec![charge], None, now).await
    }

    /// Close an open loan as damaged; charges the damage fee and any late fee
    pub async fn report_damaged(
        &self,
        actor: &Principal,
        loan_id: i32,
        request: ReportLoanRequest,
    ) -> AppResult<LoanClosure> {
        actor.require_staff()?;
        let now = Utc::now();

        let mut tx = self.repository.pool.begin().await?;

        let loan = self.repository.loans.lock(&mut tx, loan_id).await?;
        loan.ensure_open()?;

        let closed = self
            .repository
            .loans
            .close(&mut tx, loan_id, now, LoanStatus::Damaged, request.notes.as_deref())
            .await?;
        self.copies.mark_damaged(&mut tx, closed.copy_id).await?;

        let mut charges = vec![
            self.ledger
                .charge_flat_fee(&mut tx, &closed, FeeKind::Damaged)
                .await?,
        ];
        charges.extend(self.late_fee_charges(&mut tx, &closed, now).await?);

        tx.commit().await?;

        tracing::info!(loan_id, copy_id = closed.copy_id, "Loan reported damaged");
        self.closure(loan_id, charges, None, now).await
    }

    /// Accrue the late fee of a still-open overdue loan as of now
    pub async fn assess_late_fee_now(
        &self,
        actor: &Principal,
        loan_id: i32,
    ) -> AppResult<Option<Transaction>> {
        actor.require_staff()?;
        let now = Utc::now();

        let mut tx = self.repository.pool.begin().await?;
        let loan = self.repository.loans.lock(&mut tx, loan_id).await?;
        loan.ensure_open()?;

        let charge = self.late_fee_charges(&mut tx, &loan, now).await?.pop();
        tx.commit().await?;

        Ok(charge)
    }

    /// Delete a loan without charges; an open loan frees its copy first
    pub async fn delete(&self, actor: &Principal, loan_id: i32) -> AppResult<()> {
        actor.require_staff()?;

        let mut tx = self.repository.pool.begin().await?;

        let loan = self.repository.loans.lock(&mut tx, loan_id).await?;
        if self.repository.ledger.count_for_loan(&mut tx, loan_id).await? > 0 {
            tracing::warn!(loan_id, "Delete rejected: loan has transactions");
            return Err(AppError::HasTransactions(loan_id));
        }
        if loan.is_open() {
            self.copies.mark_available(&mut tx, loan.copy_id).await?;
        }
        self.repository.loans.delete(&mut tx, loan_id).await?;

        tx.commit().await?;

        tracing::info!(loan_id, copy_id = loan.copy_id, by = %actor.sub, "Loan deleted");
        Ok(())
    }

    async fn late_fee_charges(
        &self,
        conn: &mut PgConnection,
        loan: &Loan,
        as_of: DateTime<Utc>,
    ) -> AppResult<Vec<Transaction>> {
        if loan.days_overdue(as_of) == 0 {
            return Ok(Vec::new());
        }
        let fee_type = self.ledger.fee_type(conn, FeeKind::LateReturn).await?;
        let charge = self
            .ledger
            .assess_late_fee(conn, loan, fee_type.rate, as_of)
            .await?;
        Ok(charge.into_iter().collect())
    }

    async fn closure(
        &self,
        loan_id: i32,
        charges: Vec<Transaction>,
        promoted_reservation: Option<Reservation>,
        as_of: DateTime<Utc>,
    ) -> AppResult<LoanClosure> {
        let row = self.repository.loans.get_by_id(loan_id).await?;
        Ok(LoanClosure {
            loan: LoanDetails::new(row, as_of),
            charges,
            promoted_reservation,
        })
    }
}
