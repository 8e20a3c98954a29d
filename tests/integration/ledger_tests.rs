//! Fee and payment ledger against a real database

use chrono::{Duration, Utc};
use libris_server::{
    error::AppError,
    models::{
        fee::{CreateTransaction, FeeKind, PaymentMethod, PaymentRequest, TransactionStatus, UpdateFeeType},
        loan::{BorrowRequest, ReturnLoanRequest},
        Principal,
    },
};
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::common::fixture;

fn charge(member_id: i32, amount: Decimal) -> CreateTransaction {
    CreateTransaction {
        member_id,
        fee_kind: FeeKind::Damaged,
        loan_id: None,
        amount: Some(amount),
        due_date: None,
        notes: Some("Torn cover".to_string()),
    }
}

fn payment(amount: Decimal) -> PaymentRequest {
    PaymentRequest {
        amount,
        paid_at: None,
        method: PaymentMethod::Cash,
        notes: None,
    }
}

#[sqlx::test]
#[ignore]
async fn test_status_follows_payments(pool: PgPool) {
    let f = fixture(pool);
    let member_id = f.member("Alice").await;
    let ledger = &f.services.ledger;

    let transaction = ledger
        .create_transaction(&f.staff, charge(member_id, Decimal::new(1000, 2)))
        .await
        .unwrap();
    assert_eq!(transaction.status, TransactionStatus::Pending);

    let first = ledger
        .record_payment(&f.staff, transaction.id, payment(Decimal::new(400, 2)))
        .await
        .unwrap();
    assert!(first
        .receipt_number
        .as_deref()
        .is_some_and(|r| r.starts_with("LIB-REC-") && r.ends_with(&format!("{:06}", first.id))));
    assert_eq!(first.processed_by.as_deref(), Some("desk"));
    let details = ledger.get_transaction(&f.staff, transaction.id).await.unwrap();
    assert_eq!(details.transaction.status, TransactionStatus::Pending);
    assert_eq!(details.balance(), Decimal::new(600, 2));

    let second = ledger
        .record_payment(&f.staff, transaction.id, payment(Decimal::new(600, 2)))
        .await
        .unwrap();
    let details = ledger.get_transaction(&f.staff, transaction.id).await.unwrap();
    assert_eq!(details.transaction.status, TransactionStatus::Paid);
    assert_eq!(details.paid_amount, Decimal::new(1000, 2));

    let err = ledger
        .record_payment(&f.staff, transaction.id, payment(Decimal::ONE))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::TransactionNotPending(_)));

    // Removing a payment reopens the charge
    let reopened = ledger.delete_payment(&f.staff, second.id).await.unwrap();
    assert_eq!(reopened.status, TransactionStatus::Pending);

    // Editing the remaining payment to cover the amount settles it again
    ledger
        .update_payment(&f.staff, first.id, payment(Decimal::new(1000, 2)))
        .await
        .unwrap();
    let details = ledger.get_transaction(&f.staff, transaction.id).await.unwrap();
    assert_eq!(details.transaction.status, TransactionStatus::Paid);

    let payments = ledger.list_payments(&f.staff, transaction.id).await.unwrap();
    assert_eq!(payments.len(), 1);
}

#[sqlx::test]
#[ignore]
async fn test_cancel_and_delete_transactions(pool: PgPool) {
    let f = fixture(pool);
    let member_id = f.member("Alice").await;
    let ledger = &f.services.ledger;

    let cancelled = ledger
        .create_transaction(&f.staff, charge(member_id, Decimal::new(500, 2)))
        .await
        .unwrap();
    let cancelled = ledger.cancel_transaction(&f.staff, cancelled.id).await.unwrap();
    assert_eq!(cancelled.status, TransactionStatus::Cancelled);

    let err = ledger
        .record_payment(&f.staff, cancelled.id, payment(Decimal::ONE))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::TransactionNotPending(_)));
    let err = ledger.cancel_transaction(&f.staff, cancelled.id).await.unwrap_err();
    assert!(matches!(err, AppError::TransactionNotPending(_)));

    let paid = ledger
        .create_transaction(&f.staff, charge(member_id, Decimal::new(500, 2)))
        .await
        .unwrap();
    ledger
        .record_payment(&f.staff, paid.id, payment(Decimal::new(200, 2)))
        .await
        .unwrap();
    let err = ledger.delete_transaction(&f.staff, paid.id).await.unwrap_err();
    assert!(matches!(err, AppError::HasPayments(id) if id == paid.id));

    ledger.delete_transaction(&f.staff, cancelled.id).await.unwrap();
    assert!(matches!(
        ledger.get_transaction(&f.staff, cancelled.id).await,
        Err(AppError::NotFound(_))
    ));
}

#[sqlx::test]
#[ignore]
async fn test_flat_fee_defaults_and_per_day_requires_amount(pool: PgPool) {
    let f = fixture(pool);
    let member_id = f.member("Alice").await;
    let ledger = &f.services.ledger;

    let lost = ledger
        .create_transaction(
            &f.staff,
            CreateTransaction {
                member_id,
                fee_kind: FeeKind::Lost,
                loan_id: None,
                amount: None,
                due_date: None,
                notes: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(lost.amount, Decimal::new(20000, 2));

    let err = ledger
        .create_transaction(
            &f.staff,
            CreateTransaction {
                member_id,
                fee_kind: FeeKind::LateReturn,
                loan_id: None,
                amount: None,
                due_date: None,
                notes: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let err = ledger
        .create_transaction(&f.staff, charge(member_id, Decimal::new(-100, 2)))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let err = ledger
        .create_transaction(&f.staff, charge(9999, Decimal::ONE))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::MemberNotFound(9999)));
}

#[sqlx::test]
#[ignore]
async fn test_late_fee_is_reassessed_in_place(pool: PgPool) {
    let f = fixture(pool);
    let book_id = f.book(1).await;
    let member_id = f.member("Alice").await;

    let loan = f
        .services
        .loans
        .borrow(
            &f.staff,
            book_id,
            BorrowRequest {
                member_id: Some(member_id),
                loan_period_days: Some(14),
                loan_date: Some(Utc::now() - Duration::days(18)),
            },
        )
        .await
        .unwrap();

    let accrued = f
        .services
        .loans
        .assess_late_fee_now(&f.staff, loan.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(accrued.amount, Decimal::new(200, 2));

    let again = f
        .services
        .loans
        .assess_late_fee_now(&f.staff, loan.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(again.id, accrued.id);

    let closure = f
        .services
        .loans
        .return_loan(&f.staff, loan.id, ReturnLoanRequest::default())
        .await
        .unwrap();
    assert_eq!(closure.charges.len(), 1);
    assert_eq!(closure.charges[0].id, accrued.id);
    assert_eq!(closure.charges[0].amount, Decimal::new(200, 2));

    let charges = f
        .services
        .ledger
        .list_loan_transactions(&f.staff, loan.id)
        .await
        .unwrap();
    assert_eq!(charges.len(), 1);
}

#[sqlx::test]
#[ignore]
async fn test_paid_late_fee_is_not_charged_twice(pool: PgPool) {
    let f = fixture(pool);
    let book_id = f.book(1).await;
    let member_id = f.member("Alice").await;

    let loan = f
        .services
        .loans
        .borrow(
            &f.staff,
            book_id,
            BorrowRequest {
                member_id: Some(member_id),
                loan_period_days: Some(14),
                loan_date: Some(Utc::now() - Duration::days(18)),
            },
        )
        .await
        .unwrap();

    let accrued = f
        .services
        .loans
        .assess_late_fee_now(&f.staff, loan.id)
        .await
        .unwrap()
        .unwrap();
    f.services
        .ledger
        .record_payment(&f.staff, accrued.id, payment(accrued.amount))
        .await
        .unwrap();

    // Same day: everything owed is already paid
    let closure = f
        .services
        .loans
        .return_loan(&f.staff, loan.id, ReturnLoanRequest::default())
        .await
        .unwrap();
    assert!(closure.charges.is_empty());
}

#[sqlx::test]
#[ignore]
async fn test_member_balance(pool: PgPool) {
    let f = fixture(pool);
    let alice = f.member("Alice").await;
    let bob = f.member("Bob").await;
    let ledger = &f.services.ledger;

    let first = ledger
        .create_transaction(&f.staff, charge(alice, Decimal::new(1000, 2)))
        .await
        .unwrap();
    ledger
        .record_payment(&f.staff, first.id, payment(Decimal::new(250, 2)))
        .await
        .unwrap();
    let second = ledger
        .create_transaction(&f.staff, charge(alice, Decimal::new(300, 2)))
        .await
        .unwrap();
    ledger.cancel_transaction(&f.staff, second.id).await.unwrap();

    let member = Principal::member("alice", alice);
    let balance = ledger.member_balance(&member, alice).await.unwrap();
    assert_eq!(balance.total_charged, Decimal::new(1000, 2));
    assert_eq!(balance.outstanding, Decimal::new(750, 2));
    assert_eq!(balance.total_paid, Decimal::new(250, 2));

    let err = ledger.member_balance(&member, bob).await.unwrap_err();
    assert!(matches!(err, AppError::Authorization(_)));

    let payments = ledger.list_member_payments(&member, alice).await.unwrap();
    assert_eq!(payments.len(), 1);
}

#[sqlx::test]
#[ignore]
async fn test_fee_rate_change_applies_to_next_assessment(pool: PgPool) {
    let f = fixture(pool);
    let book_id = f.book(1).await;
    let member_id = f.member("Alice").await;
    let ledger = &f.services.ledger;

    let late = ledger
        .list_fee_types()
        .await
        .unwrap()
        .into_iter()
        .find(|t| t.kind == FeeKind::LateReturn)
        .unwrap();
    assert_eq!(late.rate, Decimal::new(50, 2));
    assert!(!late.is_flat_fee);

    let err = ledger
        .update_fee_type(
            &Principal::member("alice", member_id),
            late.id,
            UpdateFeeType {
                rate: Decimal::ONE,
                description: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Authorization(_)));

    ledger
        .update_fee_type(
            &f.staff,
            late.id,
            UpdateFeeType {
                rate: Decimal::ONE,
                description: None,
            },
        )
        .await
        .unwrap();

    let loan = f
        .services
        .loans
        .borrow(
            &f.staff,
            book_id,
            BorrowRequest {
                member_id: Some(member_id),
                loan_period_days: Some(14),
                loan_date: Some(Utc::now() - Duration::days(17)),
            },
        )
        .await
        .unwrap();
    let closure = f
        .services
        .loans
        .return_loan(&f.staff, loan.id, ReturnLoanRequest::default())
        .await
        .unwrap();
    assert_eq!(closure.charges[0].amount, Decimal::new(300, 2));
}
