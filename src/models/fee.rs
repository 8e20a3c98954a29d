//! Fee types, transactions (financial obligations) and payments

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[sqlx(type_name = "fee_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum FeeKind {
    LateReturn,
    Damaged,
    Lost,
}

/// Fee type from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct FeeType {
    pub id: i32,
    pub kind: FeeKind,
    pub name: String,
    #[schema(value_type = String)]
    pub rate: Decimal,
    /// Flat fees are charged once; other fees are charged per day late
    pub is_flat_fee: bool,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[sqlx(type_name = "transaction_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Paid,
    Cancelled,
}

impl TransactionStatus {
    /// Status implied by the payments recorded so far. A cancelled
    /// transaction stays cancelled.
    pub fn derive(current: TransactionStatus, amount: Decimal, paid: Decimal) -> Self {
        match current {
            TransactionStatus::Cancelled => TransactionStatus::Cancelled,
            TransactionStatus::Pending | TransactionStatus::Paid => {
                if paid >= amount {
                    TransactionStatus::Paid
                } else {
                    TransactionStatus::Pending
                }
            }
        }
    }
}

/// Transaction model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Transaction {
    pub id: i32,
    pub member_id: i32,
    pub fee_type_id: i32,
    pub loan_id: Option<i32>,
    #[schema(value_type = String)]
    pub amount: Decimal,
    pub status: TransactionStatus,
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub notes: Option<String>,
}

/// Transaction with its fee type and payment total
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct TransactionDetails {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub transaction: Transaction,
    pub fee_kind: FeeKind,
    #[schema(value_type = String)]
    pub paid_amount: Decimal,
}

impl TransactionDetails {
    /// Amount still owed; zero once covered
    pub fn balance(&self) -> Decimal {
        (self.transaction.amount - self.paid_amount).max(Decimal::ZERO)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[sqlx(type_name = "payment_method", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    CreditCard,
    DebitCard,
    BankTransfer,
    Other,
}

/// Payment model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Payment {
    pub id: i32,
    pub transaction_id: i32,
    #[schema(value_type = String)]
    pub amount: Decimal,
    pub paid_at: DateTime<Utc>,
    pub method: PaymentMethod,
    pub receipt_number: Option<String>,
    pub processed_by: Option<String>,
    pub notes: Option<String>,
}

/// Receipt number of the form `LIB-REC-YYYYMMDD-NNNNNN`
pub fn receipt_number(payment_id: i32, paid_at: DateTime<Utc>) -> String {
    format!("LIB-REC-{}-{:06}", paid_at.format("%Y%m%d"), payment_id)
}

/// Late fee for `days` days at `rate_per_day`
pub fn late_fee_amount(days: i64, rate_per_day: Decimal) -> Decimal {
    if days <= 0 {
        return Decimal::ZERO;
    }
    (Decimal::from(days) * rate_per_day).round_dp(2)
}

fn validate_non_negative(amount: &Decimal) -> Result<(), ValidationError> {
    if *amount < Decimal::ZERO {
        return Err(ValidationError::new("negative_amount"));
    }
    Ok(())
}

/// Manual charge request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateTransaction {
    pub member_id: i32,
    pub fee_kind: FeeKind,
    pub loan_id: Option<i32>,
    /// Defaults to the fee type rate for flat fees
    #[validate(custom(function = "validate_non_negative"))]
    #[schema(value_type = Option<String>)]
    pub amount: Option<Decimal>,
    pub due_date: Option<DateTime<Utc>>,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

/// Record or edit a payment
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct PaymentRequest {
    #[validate(custom(function = "validate_non_negative"))]
    #[schema(value_type = String)]
    pub amount: Decimal,
    /// Defaults to now
    pub paid_at: Option<DateTime<Utc>>,
    pub method: PaymentMethod,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

/// Fee type edit request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateFeeType {
    #[validate(custom(function = "validate_non_negative"))]
    #[schema(value_type = String)]
    pub rate: Decimal,
    #[validate(length(max = 255))]
    pub description: Option<String>,
}

/// Fee summary for one member
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MemberBalance {
    pub member_id: i32,
    /// Sum of all non-cancelled charges
    #[schema(value_type = String)]
    pub total_charged: Decimal,
    /// Unpaid remainder of pending charges
    #[schema(value_type = String)]
    pub outstanding: Decimal,
    /// Sum of all payments received
    #[schema(value_type = String)]
    pub total_paid: Decimal,
}

impl MemberBalance {
    pub fn from_transactions(member_id: i32, transactions: &[TransactionDetails]) -> Self {
        let mut balance = MemberBalance {
            member_id,
            ..Default::default()
        };
        for t in transactions {
            balance.total_paid += t.paid_amount;
            match t.transaction.status {
                TransactionStatus::Cancelled => {}
                TransactionStatus::Paid => balance.total_charged += t.transaction.amount,
                TransactionStatus::Pending => {
                    balance.total_charged += t.transaction.amount;
                    balance.outstanding += t.balance();
                }
            }
        }
        balance
    }
}
