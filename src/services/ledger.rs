//! Fee and payment ledger.
//!
//! A transaction's status is never set directly by callers: it is derived
//! from the payments recorded against it after every payment change.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgConnection;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        fee::{
            late_fee_amount, CreateTransaction, FeeKind, FeeType, MemberBalance, Payment,
            PaymentRequest, Transaction, TransactionDetails, TransactionStatus, UpdateFeeType,
        },
        loan::Loan,
        principal::Principal,
    },
    repository::{
        ledger::{NewTransaction, PaymentFields},
        Repository,
    },
};

#[derive(Clone)]
pub struct LedgerService {
    repository: Repository,
}

impl LedgerService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    // ---------------------------------------------------------------------
    // Charges raised by circulation (caller's transaction)
    // ---------------------------------------------------------------------

    pub async fn fee_type(&self, conn: &mut PgConnection, kind: FeeKind) -> AppResult<FeeType> {
        self.repository.ledger.fee_type(conn, kind).await
    }

    /// Charge `days_overdue × rate_per_day` for a loan. A pending late fee on
    /// the same loan is updated in place; late fees already paid are deducted.
    /// Returns `None` when nothing is owed.
    pub async fn assess_late_fee(
        &self,
        conn: &mut PgConnection,
        loan: &Loan,
        rate_per_day: Decimal,
        as_of: DateTime<Utc>,
    ) -> AppResult<Option<Transaction>> {
        let days = loan.days_overdue(as_of);
        let total = late_fee_amount(days, rate_per_day);
        if total <= Decimal::ZERO {
            return Ok(None);
        }

        let ledger = &self.repository.ledger;
        let settled = ledger
            .settled_amount_for_loan(conn, loan.id, FeeKind::LateReturn)
            .await?;

        if let Some(existing) = ledger
            .lock_pending_for_loan(conn, loan.id, FeeKind::LateReturn)
            .await?
        {
            let amount = (total - settled).max(Decimal::ZERO);
            ledger.set_amount(conn, existing.id, amount).await?;
            let updated = self.recalculate_status(conn, existing.id).await?;
            tracing::info!(loan_id = loan.id, transaction_id = updated.id, %amount, days, "Late fee updated");
            return Ok(Some(updated));
        }

        let amount = total - settled;
        if amount <= Decimal::ZERO {
            return Ok(None);
        }

        let fee_type = ledger.fee_type(conn, FeeKind::LateReturn).await?;
        let notes = format!("Late return: {} day(s)", days);
        let transaction = ledger
            .create_transaction(
                conn,
                &NewTransaction {
                    member_id: loan.member_id,
                    fee_type_id: fee_type.id,
                    loan_id: Some(loan.id),
                    amount,
                    due_date: None,
                    notes: Some(notes.as_str()),
                },
            )
            .await?;

        tracing::info!(loan_id = loan.id, transaction_id = transaction.id, %amount, days, "Late fee assessed");
        Ok(Some(transaction))
    }

    /// Charge the flat fee of `kind` against a loan
    pub async fn charge_flat_fee(
        &self,
        conn: &mut PgConnection,
        loan: &Loan,
        kind: FeeKind,
    ) -> AppResult<Transaction> {
        let fee_type = self.repository.ledger.fee_type(conn, kind).await?;
        let transaction = self
            .repository
            .ledger
            .create_transaction(
                conn,
                &NewTransaction {
                    member_id: loan.member_id,
                    fee_type_id: fee_type.id,
                    loan_id: Some(loan.id),
                    amount: fee_type.rate,
                    due_date: None,
                    notes: Some(fee_type.name.as_str()),
                },
            )
            .await?;

        tracing::info!(loan_id = loan.id, transaction_id = transaction.id, kind = ?kind, "Flat fee charged");
        Ok(transaction)
    }

    /// Re-derive a transaction's status from its payments
    pub async fn recalculate_status(
        &self,
        conn: &mut PgConnection,
        transaction_id: i32,
    ) -> AppResult<Transaction> {
        let ledger = &self.repository.ledger;
        let transaction = ledger.lock_transaction(conn, transaction_id).await?;
        let paid = ledger.sum_payments(conn, transaction_id).await?;
        let status = TransactionStatus::derive(transaction.status, transaction.amount, paid);

        if status == transaction.status {
            return Ok(transaction);
        }

        tracing::info!(transaction_id, from = ?transaction.status, to = ?status, %paid, "Transaction status changed");
        ledger.set_status(conn, transaction_id, status).await
    }

    // ---------------------------------------------------------------------
    // Fee types
    // ---------------------------------------------------------------------

    pub async fn list_fee_types(&self) -> AppResult<Vec<FeeType>> {
        self.repository.ledger.list_fee_types().await
    }

    pub async fn update_fee_type(
        &self,
        actor: &Principal,
        id: i32,
        update: UpdateFeeType,
    ) -> AppResult<FeeType> {
        actor.require_staff()?;
        update.validate()?;
        self.repository
            .ledger
            .update_fee_type(id, update.rate, update.description.as_deref())
            .await
    }

    // ---------------------------------------------------------------------
    // Transactions
    // ---------------------------------------------------------------------

    pub async fn get_transaction(&self, actor: &Principal, id: i32) -> AppResult<TransactionDetails> {
        let transaction = self.repository.ledger.get_transaction(id).await?;
        actor.require_member_access(transaction.transaction.member_id)?;
        Ok(transaction)
    }

    pub async fn list_member_transactions(
        &self,
        actor: &Principal,
        member_id: i32,
    ) -> AppResult<Vec<TransactionDetails>> {
        actor.require_member_access(member_id)?;
        self.repository.members.get_by_id(member_id).await?;
        self.repository.ledger.list_for_member(member_id).await
    }

    pub async fn list_loan_transactions(
        &self,
        actor: &Principal,
        loan_id: i32,
    ) -> AppResult<Vec<TransactionDetails>> {
        actor.require_staff()?;
        self.repository.ledger.list_for_loan(loan_id).await
    }

    /// Charged, outstanding and paid totals for a member
    pub async fn member_balance(&self, actor: &Principal, member_id: i32) -> AppResult<MemberBalance> {
        let transactions = self.list_member_transactions(actor, member_id).await?;
        Ok(MemberBalance::from_transactions(member_id, &transactions))
    }

    pub async fn list_member_payments(
        &self,
        actor: &Principal,
        member_id: i32,
    ) -> AppResult<Vec<Payment>> {
        actor.require_member_access(member_id)?;
        self.repository.ledger.list_member_payments(member_id).await
    }

    /// Manual charge raised by staff
    pub async fn create_transaction(
        &self,
        actor: &Principal,
        request: CreateTransaction,
    ) -> AppResult<Transaction> {
        actor.require_staff()?;
        request.validate()?;

        let mut tx = self.repository.pool.begin().await?;

        self.repository
            .members
            .ensure_exists(&mut tx, request.member_id)
            .await?;
        let fee_type = self.repository.ledger.fee_type(&mut tx, request.fee_kind).await?;

        let amount = match (request.amount, fee_type.is_flat_fee) {
            (Some(amount), _) => amount,
            (None, true) => fee_type.rate,
            (None, false) => {
                return Err(AppError::Validation(
                    "amount is required for per-day fees".to_string(),
                ))
            }
        };

        if let Some(loan_id) = request.loan_id {
            let loan = self.repository.loans.lock(&mut tx, loan_id).await?;
            if loan.member_id != request.member_id {
                return Err(AppError::Validation(format!(
                    "Loan {} does not belong to member {}",
                    loan_id, request.member_id
                )));
            }
        }

        let transaction = self
            .repository
            .ledger
            .create_transaction(
                &mut tx,
                &NewTransaction {
                    member_id: request.member_id,
                    fee_type_id: fee_type.id,
                    loan_id: request.loan_id,
                    amount,
                    due_date: request.due_date,
                    notes: request.notes.as_deref(),
                },
            )
            .await?;

        tx.commit().await?;

        tracing::info!(transaction_id = transaction.id, member_id = transaction.member_id, %amount, by = %actor.sub, "Charge created");
        Ok(transaction)
    }

    /// pending → cancelled
    pub async fn cancel_transaction(&self, actor: &Principal, id: i32) -> AppResult<Transaction> {
        actor.require_staff()?;

        let mut tx = self.repository.pool.begin().await?;
        let transaction = self.repository.ledger.lock_transaction(&mut tx, id).await?;
        if transaction.status != TransactionStatus::Pending {
            return Err(AppError::TransactionNotPending(id));
        }
        let cancelled = self
            .repository
            .ledger
            .set_status(&mut tx, id, TransactionStatus::Cancelled)
            .await?;
        tx.commit().await?;

        tracing::info!(transaction_id = id, by = %actor.sub, "Transaction cancelled");
        Ok(cancelled)
    }

    /// Delete a transaction that has no payments
    pub async fn delete_transaction(&self, actor: &Principal, id: i32) -> AppResult<()> {
        actor.require_staff()?;

        let mut tx = self.repository.pool.begin().await?;
        self.repository.ledger.lock_transaction(&mut tx, id).await?;
        if self.repository.ledger.count_payments(&mut tx, id).await? > 0 {
            return Err(AppError::HasPayments(id));
        }
        self.repository.ledger.delete_transaction(&mut tx, id).await?;
        tx.commit().await?;

        tracing::info!(transaction_id = id, by = %actor.sub, "Transaction deleted");
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Payments
    // ---------------------------------------------------------------------

    pub async fn list_payments(&self, actor: &Principal, transaction_id: i32) -> AppResult<Vec<Payment>> {
        self.get_transaction(actor, transaction_id).await?;
        self.repository.ledger.list_payments(transaction_id).await
    }

    /// Record a payment against a pending transaction
    pub async fn record_payment(
        &self,
        actor: &Principal,
        transaction_id: i32,
        request: PaymentRequest,
    ) -> AppResult<Payment> {
        actor.require_staff()?;
        request.validate()?;

        let mut tx = self.repository.pool.begin().await?;

        let transaction = self
            .repository
            .ledger
            .lock_transaction(&mut tx, transaction_id)
            .await?;
        if transaction.status != TransactionStatus::Pending {
            tracing::debug!(transaction_id, status = ?transaction.status, "Payment rejected");
            return Err(AppError::TransactionNotPending(transaction_id));
        }

        let fields = PaymentFields {
            amount: request.amount,
            paid_at: request.paid_at.unwrap_or_else(Utc::now),
            method: request.method,
            notes: request.notes.as_deref(),
        };
        let payment = self
            .repository
            .ledger
            .create_payment(&mut tx, transaction_id, &fields, &actor.sub)
            .await?;
        self.recalculate_status(&mut tx, transaction_id).await?;

        tx.commit().await?;

        tracing::info!(payment_id = payment.id, transaction_id, amount = %payment.amount, by = %actor.sub, "Payment recorded");
        Ok(payment)
    }

    pub async fn update_payment(
        &self,
        actor: &Principal,
        payment_id: i32,
        request: PaymentRequest,
    ) -> AppResult<Payment> {
        actor.require_staff()?;
        request.validate()?;

        let mut tx = self.repository.pool.begin().await?;

        let current = self.repository.ledger.lock_payment(&mut tx, payment_id).await?;
        let fields = PaymentFields {
            amount: request.amount,
            paid_at: request.paid_at.unwrap_or(current.paid_at),
            method: request.method,
            notes: request.notes.as_deref(),
        };
        let payment = self
            .repository
            .ledger
            .update_payment(&mut tx, payment_id, &fields)
            .await?;
        self.recalculate_status(&mut tx, payment.transaction_id).await?;

        tx.commit().await?;

        tracing::info!(payment_id, transaction_id = payment.transaction_id, amount = %payment.amount, by = %actor.sub, "Payment updated");
        Ok(payment)
    }

    /// Remove a payment; returns the parent transaction with its new status
    pub async fn delete_payment(&self, actor: &Principal, payment_id: i32) -> AppResult<Transaction> {
        actor.require_staff()?;

        let mut tx = self.repository.pool.begin().await?;

        let payment = self.repository.ledger.lock_payment(&mut tx, payment_id).await?;
        self.repository.ledger.delete_payment(&mut tx, payment_id).await?;
        let transaction = self
            .recalculate_status(&mut tx, payment.transaction_id)
            .await?;

        tx.commit().await?;

        tracing::info!(payment_id, transaction_id = transaction.id, by = %actor.sub, "Payment deleted");
        Ok(transaction)
    }
}
