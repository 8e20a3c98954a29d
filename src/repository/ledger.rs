//! Fee types, transactions and payments repository

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::fee::{
        FeeKind, FeeType, Payment, PaymentMethod, Transaction, TransactionDetails,
        TransactionStatus,
    },
};

const TRANSACTION_DETAILS: &str = r#"
    SELECT t.*, f.kind AS fee_kind,
           COALESCE((SELECT SUM(p.amount) FROM payments p WHERE p.transaction_id = t.id), 0) AS paid_amount
    FROM transactions t
    JOIN fee_types f ON f.id = t.fee_type_id
"#;

/// Fields of a new charge
pub struct NewTransaction<'a> {
    pub member_id: i32,
    pub fee_type_id: i32,
    pub loan_id: Option<i32>,
    pub amount: Decimal,
    pub due_date: Option<DateTime<Utc>>,
    pub notes: Option<&'a str>,
}

/// Fields of a payment
pub struct PaymentFields<'a> {
    pub amount: Decimal,
    pub paid_at: DateTime<Utc>,
    pub method: PaymentMethod,
    pub notes: Option<&'a str>,
}

#[derive(Clone)]
pub struct LedgerRepository {
    pool: Pool<Postgres>,
}

impl LedgerRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    // ---------------------------------------------------------------------
    // Fee types
    // ---------------------------------------------------------------------

    pub async fn list_fee_types(&self) -> AppResult<Vec<FeeType>> {
        let fee_types = sqlx::query_as::<_, FeeType>("SELECT * FROM fee_types ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(fee_types)
    }

    pub async fn fee_type(&self, conn: &mut PgConnection, kind: FeeKind) -> AppResult<FeeType> {
        sqlx::query_as::<_, FeeType>("SELECT * FROM fee_types WHERE kind = $1")
            .bind(kind)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| AppError::Internal(format!("Fee type {:?} is not configured", kind)))
    }

    pub async fn update_fee_type(
        &self,
        id: i32,
        rate: Decimal,
        description: Option<&str>,
    ) -> AppResult<FeeType> {
        sqlx::query_as::<_, FeeType>(
            r#"
            UPDATE fee_types SET rate = $2, description = COALESCE($3, description)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(rate)
        .bind(description)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Fee type with id {} not found", id)))
    }

    // ---------------------------------------------------------------------
    // Transactions
    // ---------------------------------------------------------------------

    pub async fn get_transaction(&self, id: i32) -> AppResult<TransactionDetails> {
        sqlx::query_as::<_, TransactionDetails>(&format!(
            "{} WHERE t.id = $1",
            TRANSACTION_DETAILS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Transaction with id {} not found", id)))
    }

    pub async fn list_for_member(&self, member_id: i32) -> AppResult<Vec<TransactionDetails>> {
        let transactions = sqlx::query_as::<_, TransactionDetails>(&format!(
            "{} WHERE t.member_id = $1 ORDER BY t.created_at DESC, t.id DESC",
            TRANSACTION_DETAILS
        ))
        .bind(member_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(transactions)
    }

    pub async fn list_for_loan(&self, loan_id: i32) -> AppResult<Vec<TransactionDetails>> {
        let transactions = sqlx::query_as::<_, TransactionDetails>(&format!(
            "{} WHERE t.loan_id = $1 ORDER BY t.id",
            TRANSACTION_DETAILS
        ))
        .bind(loan_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(transactions)
    }

    pub async fn lock_transaction(
        &self,
        conn: &mut PgConnection,
        id: i32,
    ) -> AppResult<Transaction> {
        sqlx::query_as::<_, Transaction>("SELECT * FROM transactions WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Transaction with id {} not found", id)))
    }

    /// Lock the pending transaction of the given kind attached to a loan
    pub async fn lock_pending_for_loan(
        &self,
        conn: &mut PgConnection,
        loan_id: i32,
        kind: FeeKind,
    ) -> AppResult<Option<Transaction>> {
        let transaction = sqlx::query_as::<_, Transaction>(
            r#"
            SELECT t.* FROM transactions t
            JOIN fee_types f ON f.id = t.fee_type_id
            WHERE t.loan_id = $1 AND f.kind = $2 AND t.status = 'pending'
            ORDER BY t.id
            LIMIT 1
            FOR UPDATE OF t
            "#,
        )
        .bind(loan_id)
        .bind(kind)
        .fetch_optional(&mut *conn)
        .await?;
        Ok(transaction)
    }

    /// Total of paid transactions of the given kind attached to a loan
    pub async fn settled_amount_for_loan(
        &self,
        conn: &mut PgConnection,
        loan_id: i32,
        kind: FeeKind,
    ) -> AppResult<Decimal> {
        let total: Decimal = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(t.amount), 0) FROM transactions t
            JOIN fee_types f ON f.id = t.fee_type_id
            WHERE t.loan_id = $1 AND f.kind = $2 AND t.status = 'paid'
            "#,
        )
        .bind(loan_id)
        .bind(kind)
        .fetch_one(&mut *conn)
        .await?;
        Ok(total)
    }

    pub async fn create_transaction(
        &self,
        conn: &mut PgConnection,
        new: &NewTransaction<'_>,
    ) -> AppResult<Transaction> {
        let transaction = sqlx::query_as::<_, Transaction>(
            r#"
            INSERT INTO transactions (member_id, fee_type_id, loan_id, amount, status, due_date, notes)
            VALUES ($1, $2, $3, $4, 'pending', $5, $6)
            RETURNING *
            "#,
        )
        .bind(new.member_id)
        .bind(new.fee_type_id)
        .bind(new.loan_id)
        .bind(new.amount)
        .bind(new.due_date)
        .bind(new.notes)
        .fetch_one(&mut *conn)
        .await?;
        Ok(transaction)
    }

    pub async fn set_amount(
        &self,
        conn: &mut PgConnection,
        id: i32,
        amount: Decimal,
    ) -> AppResult<Transaction> {
        let transaction = sqlx::query_as::<_, Transaction>(
            "UPDATE transactions SET amount = $2 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(amount)
        .fetch_one(&mut *conn)
        .await?;
        Ok(transaction)
    }

    pub async fn set_status(
        &self,
        conn: &mut PgConnection,
        id: i32,
        status: TransactionStatus,
    ) -> AppResult<Transaction> {
        let transaction = sqlx::query_as::<_, Transaction>(
            "UPDATE transactions SET status = $2 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(status)
        .fetch_one(&mut *conn)
        .await?;
        Ok(transaction)
    }

    pub async fn count_for_loan(&self, conn: &mut PgConnection, loan_id: i32) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM transactions WHERE loan_id = $1")
            .bind(loan_id)
            .fetch_one(&mut *conn)
            .await?;
        Ok(count)
    }

    pub async fn delete_transaction(&self, conn: &mut PgConnection, id: i32) -> AppResult<()> {
        sqlx::query("DELETE FROM transactions WHERE id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Payments
    // ---------------------------------------------------------------------

    /// Sum of payments recorded against a transaction
    pub async fn sum_payments(
        &self,
        conn: &mut PgConnection,
        transaction_id: i32,
    ) -> AppResult<Decimal> {
        let total: Decimal = sqlx::query_scalar(
            "SELECT COALESCE(SUM(amount), 0) FROM payments WHERE transaction_id = $1",
        )
        .bind(transaction_id)
        .fetch_one(&mut *conn)
        .await?;
        Ok(total)
    }

    pub async fn count_payments(
        &self,
        conn: &mut PgConnection,
        transaction_id: i32,
    ) -> AppResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM payments WHERE transaction_id = $1")
                .bind(transaction_id)
                .fetch_one(&mut *conn)
                .await?;
        Ok(count)
    }

    pub async fn list_payments(&self, transaction_id: i32) -> AppResult<Vec<Payment>> {
        let payments = sqlx::query_as::<_, Payment>(
            "SELECT * FROM payments WHERE transaction_id = $1 ORDER BY paid_at, id",
        )
        .bind(transaction_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(payments)
    }

    pub async fn list_member_payments(&self, member_id: i32) -> AppResult<Vec<Payment>> {
        let payments = sqlx::query_as::<_, Payment>(
            r#"
            SELECT p.* FROM payments p
            JOIN transactions t ON t.id = p.transaction_id
            WHERE t.member_id = $1
            ORDER BY p.paid_at DESC, p.id DESC
            "#,
        )
        .bind(member_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(payments)
    }

    pub async fn lock_payment(&self, conn: &mut PgConnection, id: i32) -> AppResult<Payment> {
        sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Payment with id {} not found", id)))
    }

    /// Insert a payment and stamp its receipt number
    pub async fn create_payment(
        &self,
        conn: &mut PgConnection,
        transaction_id: i32,
        fields: &PaymentFields<'_>,
        processed_by: &str,
    ) -> AppResult<Payment> {
        let payment = sqlx::query_as::<_, Payment>(
            r#"
            INSERT INTO payments (transaction_id, amount, paid_at, method, processed_by, notes)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(transaction_id)
        .bind(fields.amount)
        .bind(fields.paid_at)
        .bind(fields.method)
        .bind(processed_by)
        .bind(fields.notes)
        .fetch_one(&mut *conn)
        .await?;

        let receipt = crate::models::fee::receipt_number(payment.id, payment.paid_at);
        let payment = sqlx::query_as::<_, Payment>(
            "UPDATE payments SET receipt_number = $2 WHERE id = $1 RETURNING *",
        )
        .bind(payment.id)
        .bind(receipt)
        .fetch_one(&mut *conn)
        .await?;

        Ok(payment)
    }

    pub async fn update_payment(
        &self,
        conn: &mut PgConnection,
        id: i32,
        fields: &PaymentFields<'_>,
    ) -> AppResult<Payment> {
        let payment = sqlx::query_as::<_, Payment>(
            r#"
            UPDATE payments
            SET amount = $2, paid_at = $3, method = $4, notes = COALESCE($5, notes)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(fields.amount)
        .bind(fields.paid_at)
        .bind(fields.method)
        .bind(fields.notes)
        .fetch_one(&mut *conn)
        .await?;
        Ok(payment)
    }

    pub async fn delete_payment(&self, conn: &mut PgConnection, id: i32) -> AppResult<()> {
        sqlx::query("DELETE FROM payments WHERE id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }
}
