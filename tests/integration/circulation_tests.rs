//! Loan, copy and reservation behavior against a real database.
//!
//! Each test gets a freshly migrated database from `#[sqlx::test]`.
//! Run with: DATABASE_URL=postgres://... cargo test -- --ignored

use chrono::{Duration, TimeZone, Utc};
use libris_server::{
    error::AppError,
    models::{
        copy::{CopyStatus, CreateCopy},
        loan::{BorrowRequest, LoanStatus, ReportLoanRequest, ReturnLoanRequest},
        reservation::{CreateReservation, ReservationQuery, ReservationStatus},
        Principal,
    },
};
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::common::fixture;

fn borrow_for(member_id: i32) -> BorrowRequest {
    BorrowRequest {
        member_id: Some(member_id),
        ..Default::default()
    }
}

fn reserve(book_id: i32, member_id: i32) -> CreateReservation {
    CreateReservation {
        book_id,
        member_id: Some(member_id),
        notes: None,
    }
}

#[sqlx::test]
#[ignore]
async fn test_borrow_exhausts_copies(pool: PgPool) {
    let f = fixture(pool);
    let book_id = f.book(3).await;
    let member_id = f.member("Alice").await;

    let mut copies = Vec::new();
    for _ in 0..3 {
        let loan = f
            .services
            .loans
            .borrow(&f.staff, book_id, borrow_for(member_id))
            .await
            .unwrap();
        assert_eq!(loan.status, LoanStatus::Active);
        assert_eq!(loan.due_date - loan.loan_date, Duration::days(14));
        copies.push(loan.copy_id);
    }
    copies.sort_unstable();
    copies.dedup();
    assert_eq!(copies.len(), 3);

    let err = f
        .services
        .loans
        .borrow(&f.staff, book_id, borrow_for(member_id))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NoAvailableCopy(id) if id == book_id));

    let book = f.services.catalog.get_book(book_id).await.unwrap();
    assert_eq!(book.nb_available, 0);
    assert!(book.copies.iter().all(|c| c.status == CopyStatus::Loaned));
}

#[sqlx::test]
#[ignore]
async fn test_borrow_unknown_member(pool: PgPool) {
    let f = fixture(pool);
    let book_id = f.book(1).await;

    let err = f
        .services
        .loans
        .borrow(&f.staff, book_id, borrow_for(4242))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::MemberNotFound(4242)));

    // Nothing was claimed
    let book = f.services.catalog.get_book(book_id).await.unwrap();
    assert_eq!(book.nb_available, 1);
}

#[sqlx::test]
#[ignore]
async fn test_member_borrows_for_self_only(pool: PgPool) {
    let f = fixture(pool);
    let book_id = f.book(2).await;
    let alice = f.member("Alice").await;
    let bob = f.member("Bob").await;
    let principal = Principal::member("alice", alice);

    let loan = f
        .services
        .loans
        .borrow(&principal, book_id, BorrowRequest::default())
        .await
        .unwrap();
    assert_eq!(loan.member_id, alice);

    let err = f
        .services
        .loans
        .borrow(&principal, book_id, borrow_for(bob))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Authorization(_)));

    // Backdating is a desk operation
    let request = BorrowRequest {
        loan_date: Some(Utc::now() - Duration::days(3)),
        ..Default::default()
    };
    let err = f
        .services
        .loans
        .borrow(&principal, book_id, request)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Authorization(_)));

    // So is choosing the loan period
    let request = BorrowRequest {
        loan_period_days: Some(365),
        ..Default::default()
    };
    let err = f
        .services
        .loans
        .borrow(&principal, book_id, request)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Authorization(_)));
}

#[sqlx::test]
#[ignore]
async fn test_concurrent_borrows_of_last_copy(pool: PgPool) {
    let f = fixture(pool);
    let book_id = f.book(1).await;
    let alice = f.member("Alice").await;
    let bob = f.member("Bob").await;

    let loans = &f.services.loans;
    let (a, b) = tokio::join!(
        loans.borrow(&f.staff, book_id, borrow_for(alice)),
        loans.borrow(&f.staff, book_id, borrow_for(bob)),
    );

    let results = [a, b];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    let loser = results.into_iter().find_map(Result::err).unwrap();
    assert!(matches!(
        loser,
        AppError::NoAvailableCopy(_) | AppError::Conflict(_)
    ));
}

#[sqlx::test]
#[ignore]
async fn test_renewal_limit(pool: PgPool) {
    let f = fixture(pool);
    let book_id = f.book(1).await;
    let member_id = f.member("Alice").await;
    let loan = f
        .services
        .loans
        .borrow(&f.staff, book_id, borrow_for(member_id))
        .await
        .unwrap();

    let first = f.services.loans.renew(&f.staff, loan.id).await.unwrap();
    assert_eq!(first.renewal_count, 1);
    assert_eq!(first.due_date, loan.due_date + Duration::days(14));

    let second = f.services.loans.renew(&f.staff, loan.id).await.unwrap();
    assert_eq!(second.renewal_count, 2);

    let err = f.services.loans.renew(&f.staff, loan.id).await.unwrap_err();
    assert!(matches!(err, AppError::RenewalLimitExceeded(2)));

    let unchanged = f.services.loans.get(&f.staff, loan.id).await.unwrap();
    assert_eq!(unchanged.renewal_count, 2);
    assert_eq!(unchanged.due_date, second.due_date);
}

#[sqlx::test]
#[ignore]
async fn test_return_twice_is_rejected(pool: PgPool) {
    let f = fixture(pool);
    let book_id = f.book(1).await;
    let member_id = f.member("Alice").await;
    let loan = f
        .services
        .loans
        .borrow(&f.staff, book_id, borrow_for(member_id))
        .await
        .unwrap();

    let closure = f
        .services
        .loans
        .return_loan(&f.staff, loan.id, ReturnLoanRequest::default())
        .await
        .unwrap();
    assert_eq!(closure.loan.status, LoanStatus::Returned);
    assert!(closure.charges.is_empty());
    let copy = f.services.catalog.get_copy(loan.copy_id).await.unwrap();
    assert_eq!(copy.status, CopyStatus::Available);

    let err = f
        .services
        .loans
        .return_loan(&f.staff, loan.id, ReturnLoanRequest::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::AlreadyReturned(id) if id == loan.id));

    let after = f.services.loans.get(&f.staff, loan.id).await.unwrap();
    assert_eq!(after.return_date, closure.loan.return_date);

    let err = f.services.loans.renew(&f.staff, loan.id).await.unwrap_err();
    assert!(matches!(err, AppError::AlreadyReturned(_)));
}

#[sqlx::test]
#[ignore]
async fn test_late_return_charges_per_day(pool: PgPool) {
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
                loan_date: Some(Utc.with_ymd_and_hms(2023, 12, 27, 10, 0, 0).unwrap()),
            },
        )
        .await
        .unwrap();
    assert_eq!(
        loan.due_date,
        Utc.with_ymd_and_hms(2024, 1, 10, 10, 0, 0).unwrap()
    );

    let closure = f
        .services
        .loans
        .return_loan(
            &f.staff,
            loan.id,
            ReturnLoanRequest {
                returned_at: Some(Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap()),
                notes: None,
            },
        )
        .await
        .unwrap();

    assert_eq!(closure.loan.days_overdue, 5);
    assert!(!closure.loan.is_overdue);
    assert_eq!(closure.charges.len(), 1);
    let fee = &closure.charges[0];
    assert_eq!(fee.amount, Decimal::new(250, 2));
    assert_eq!(fee.loan_id, Some(loan.id));
    assert_eq!(fee.member_id, member_id);
}

#[sqlx::test]
#[ignore]
async fn test_return_before_loan_date_is_rejected(pool: PgPool) {
    let f = fixture(pool);
    let book_id = f.book(1).await;
    let member_id = f.member("Alice").await;
    let loan = f
        .services
        .loans
        .borrow(&f.staff, book_id, borrow_for(member_id))
        .await
        .unwrap();

    let err = f
        .services
        .loans
        .return_loan(
            &f.staff,
            loan.id,
            ReturnLoanRequest {
                returned_at: Some(loan.loan_date - Duration::days(1)),
                notes: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let still_open = f.services.loans.get(&f.staff, loan.id).await.unwrap();
    assert!(still_open.return_date.is_none());
}

#[sqlx::test]
#[ignore]
async fn test_reserve_then_checkout(pool: PgPool) {
    let f = fixture(pool);
    let book_id = f.book(1).await;
    let member_id = f.member("Alice").await;

    let reservation = f
        .services
        .reservations
        .reserve(&f.staff, reserve(book_id, member_id))
        .await
        .unwrap();
    assert_eq!(reservation.status, ReservationStatus::Ready);
    assert_eq!(
        reservation.expiry_date - reservation.reservation_date,
        Duration::days(7)
    );

    let err = f
        .services
        .reservations
        .reserve(&f.staff, reserve(book_id, member_id))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::DuplicateReservation { .. }));

    let checkout = f
        .services
        .reservations
        .checkout(&f.staff, reservation.id)
        .await
        .unwrap();
    assert_eq!(checkout.reservation.status, ReservationStatus::Completed);
    assert_eq!(checkout.reservation.loan_id, Some(checkout.loan.id));
    assert!(checkout.reservation.completed_at.is_some());
    assert_eq!(checkout.loan.member_id, member_id);

    let expected_due = reservation.reservation_date + Duration::days(14);
    assert!((checkout.loan.due_date - expected_due).num_seconds().abs() < 60);

    let copy = f.services.catalog.get_copy(checkout.loan.copy_id).await.unwrap();
    assert_eq!(copy.status, CopyStatus::Loaned);

    let err = f
        .services
        .reservations
        .cancel(&f.staff, reservation.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotCancellable(_)));
}

#[sqlx::test]
#[ignore]
async fn test_pending_reservation_cannot_be_checked_out(pool: PgPool) {
    let f = fixture(pool);
    let book_id = f.book(1).await;
    let alice = f.member("Alice").await;
    let bob = f.member("Bob").await;

    f.services
        .loans
        .borrow(&f.staff, book_id, borrow_for(alice))
        .await
        .unwrap();
    let reservation = f
        .services
        .reservations
        .reserve(&f.staff, reserve(book_id, bob))
        .await
        .unwrap();
    assert_eq!(reservation.status, ReservationStatus::Pending);

    let err = f
        .services
        .reservations
        .checkout(&f.staff, reservation.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotReady(id) if id == reservation.id));

    let cancelled = f
        .services
        .reservations
        .cancel(&Principal::member("bob", bob), reservation.id)
        .await
        .unwrap();
    assert_eq!(cancelled.status, ReservationStatus::Cancelled);
    assert!(cancelled.completed_at.is_some());
}

#[sqlx::test]
#[ignore]
async fn test_return_promotes_oldest_pending_reservation(pool: PgPool) {
    let f = fixture(pool);
    let book_id = f.book(1).await;
    let alice = f.member("Alice").await;
    let bob = f.member("Bob").await;
    let carol = f.member("Carol").await;

    let loan = f
        .services
        .loans
        .borrow(&f.staff, book_id, borrow_for(alice))
        .await
        .unwrap();
    let first = f
        .services
        .reservations
        .reserve(&f.staff, reserve(book_id, bob))
        .await
        .unwrap();
    let second = f
        .services
        .reservations
        .reserve(&f.staff, reserve(book_id, carol))
        .await
        .unwrap();

    let closure = f
        .services
        .loans
        .return_loan(&f.staff, loan.id, ReturnLoanRequest::default())
        .await
        .unwrap();

    let promoted = closure.promoted_reservation.unwrap();
    assert_eq!(promoted.id, first.id);
    assert_eq!(promoted.status, ReservationStatus::Ready);
    assert!(promoted.expiry_date > first.expiry_date);

    let waiting = f.services.reservations.get(&f.staff, second.id).await.unwrap();
    assert_eq!(waiting.status, ReservationStatus::Pending);

    let ready = f
        .services
        .reservations
        .list(
            &f.staff,
            ReservationQuery {
                book_id: Some(book_id),
                status: Some(ReservationStatus::Ready),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(ready.len(), 1);
    assert_eq!(ready[0].member_id, bob);
}

#[sqlx::test]
#[ignore]
async fn test_added_copy_serves_the_queue(pool: PgPool) {
    let f = fixture(pool);
    let book_id = f.book(1).await;
    let alice = f.member("Alice").await;
    let bob = f.member("Bob").await;

    f.services
        .loans
        .borrow(&f.staff, book_id, borrow_for(alice))
        .await
        .unwrap();
    let reservation = f
        .services
        .reservations
        .reserve(&f.staff, reserve(book_id, bob))
        .await
        .unwrap();

    f.services
        .catalog
        .add_copy(&f.staff, book_id, CreateCopy::default())
        .await
        .unwrap();

    let ready = f.services.reservations.get(&f.staff, reservation.id).await.unwrap();
    assert_eq!(ready.status, ReservationStatus::Ready);
}

#[sqlx::test]
#[ignore]
async fn test_approve_deny_and_expire(pool: PgPool) {
    let f = fixture(pool);
    let book_id = f.book(1).await;
    let alice = f.member("Alice").await;
    let bob = f.member("Bob").await;
    let carol = f.member("Carol").await;

    f.services
        .loans
        .borrow(&f.staff, book_id, borrow_for(alice))
        .await
        .unwrap();
    let for_bob = f
        .services
        .reservations
        .reserve(&f.staff, reserve(book_id, bob))
        .await
        .unwrap();
    let for_carol = f
        .services
        .reservations
        .reserve(&f.staff, reserve(book_id, carol))
        .await
        .unwrap();

    let err = f
        .services
        .reservations
        .approve(&Principal::member("bob", bob), for_bob.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Authorization(_)));

    let approved = f.services.reservations.approve(&f.staff, for_bob.id).await.unwrap();
    assert_eq!(approved.status, ReservationStatus::Ready);

    let denied = f.services.reservations.deny(&f.staff, for_carol.id).await.unwrap();
    assert_eq!(denied.status, ReservationStatus::Cancelled);

    // Nothing lapsed yet
    let expired = f
        .services
        .reservations
        .expire_stale(&f.staff, None)
        .await
        .unwrap();
    assert_eq!(expired, 0);

    let expired = f
        .services
        .reservations
        .expire_stale(&f.staff, Some(Utc::now() + Duration::days(8)))
        .await
        .unwrap();
    assert_eq!(expired, 1);
    let lapsed = f.services.reservations.get(&f.staff, for_bob.id).await.unwrap();
    assert_eq!(lapsed.status, ReservationStatus::Expired);
}

#[sqlx::test]
#[ignore]
async fn test_report_lost_charges_replacement(pool: PgPool) {
    let f = fixture(pool);
    let book_id = f.book(1).await;
    let member_id = f.member("Alice").await;
    let loan = f
        .services
        .loans
        .borrow(&f.staff, book_id, borrow_for(member_id))
        .await
        .unwrap();

    let closure = f
        .services
        .loans
        .report_lost(&f.staff, loan.id, ReportLoanRequest::default())
        .await
        .unwrap();
    assert_eq!(closure.loan.status, LoanStatus::Lost);
    assert_eq!(closure.charges.len(), 1);
    assert_eq!(closure.charges[0].amount, Decimal::new(20000, 2));

    let copy = f.services.catalog.get_copy(loan.copy_id).await.unwrap();
    assert_eq!(copy.status, CopyStatus::Lost);

    let err = f
        .services
        .loans
        .report_damaged(&f.staff, loan.id, ReportLoanRequest::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::AlreadyReturned(_)));
}

#[sqlx::test]
#[ignore]
async fn test_report_damaged_overdue_loan(pool: PgPool) {
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
                loan_date: Some(Utc::now() - Duration::days(20)),
            },
        )
        .await
        .unwrap();
    assert_eq!(loan.status, LoanStatus::Overdue);

    let closure = f
        .services
        .loans
        .report_damaged(&f.staff, loan.id, ReportLoanRequest::default())
        .await
        .unwrap();
    assert_eq!(closure.loan.status, LoanStatus::Damaged);
    assert_eq!(closure.charges.len(), 2);
    assert_eq!(closure.charges[0].amount, Decimal::new(3000, 2));
    assert_eq!(closure.charges[1].amount, Decimal::new(300, 2));

    // Damaged copies go through maintenance before circulating again
    let copy = f
        .services
        .catalog
        .send_to_maintenance(&f.staff, loan.copy_id)
        .await
        .unwrap();
    assert_eq!(copy.status, CopyStatus::Maintenance);
    let err = f
        .services
        .catalog
        .mark_damaged(&f.staff, loan.copy_id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidStateTransition(_)));
    let copy = f
        .services
        .catalog
        .return_to_shelf(&f.staff, loan.copy_id)
        .await
        .unwrap();
    assert_eq!(copy.status, CopyStatus::Available);
}

#[sqlx::test]
#[ignore]
async fn test_delete_loan(pool: PgPool) {
    let f = fixture(pool);
    let book_id = f.book(2).await;
    let member_id = f.member("Alice").await;

    let open = f
        .services
        .loans
        .borrow(&f.staff, book_id, borrow_for(member_id))
        .await
        .unwrap();
    f.services.loans.delete(&f.staff, open.id).await.unwrap();
    let copy = f.services.catalog.get_copy(open.copy_id).await.unwrap();
    assert_eq!(copy.status, CopyStatus::Available);
    assert!(matches!(
        f.services.loans.get(&f.staff, open.id).await,
        Err(AppError::NotFound(_))
    ));

    let charged = f
        .services
        .loans
        .borrow(&f.staff, book_id, borrow_for(member_id))
        .await
        .unwrap();
    f.services
        .loans
        .report_lost(&f.staff, charged.id, ReportLoanRequest::default())
        .await
        .unwrap();
    let err = f.services.loans.delete(&f.staff, charged.id).await.unwrap_err();
    assert!(matches!(err, AppError::HasTransactions(id) if id == charged.id));
}

#[sqlx::test]
#[ignore]
async fn test_copy_with_history_cannot_be_deleted(pool: PgPool) {
    let f = fixture(pool);
    let book_id = f.book(2).await;
    let member_id = f.member("Alice").await;

    let loan = f
        .services
        .loans
        .borrow(&f.staff, book_id, borrow_for(member_id))
        .await
        .unwrap();

    let err = f
        .services
        .catalog
        .delete_copy(&f.staff, loan.copy_id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidStateTransition(_)));

    f.services
        .loans
        .return_loan(&f.staff, loan.id, ReturnLoanRequest::default())
        .await
        .unwrap();
    let err = f
        .services
        .catalog
        .delete_copy(&f.staff, loan.copy_id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::HasLoans(_)));

    let book = f.services.catalog.get_book(book_id).await.unwrap();
    let unused = book
        .copies
        .iter()
        .find(|c| c.id != loan.copy_id)
        .unwrap();
    f.services.catalog.delete_copy(&f.staff, unused.id).await.unwrap();
    assert_eq!(f.services.catalog.get_book(book_id).await.unwrap().copies.len(), 1);
}

#[sqlx::test]
#[ignore]
async fn test_overdue_listing(pool: PgPool) {
    let f = fixture(pool);
    let book_id = f.book(2).await;
    let member_id = f.member("Alice").await;

    let late = f
        .services
        .loans
        .borrow(
            &f.staff,
            book_id,
            BorrowRequest {
                member_id: Some(member_id),
                loan_period_days: Some(7),
                loan_date: Some(Utc::now() - Duration::days(10)),
            },
        )
        .await
        .unwrap();
    f.services
        .loans
        .borrow(&f.staff, book_id, borrow_for(member_id))
        .await
        .unwrap();

    let overdue = f.services.loans.list_overdue(&f.staff).await.unwrap();
    assert_eq!(overdue.len(), 1);
    assert_eq!(overdue[0].id, late.id);
    assert_eq!(overdue[0].days_overdue, 3);

    let stats = f.services.loans.stats(&f.staff).await.unwrap();
    assert_eq!(stats.active, 2);
    assert_eq!(stats.overdue, 1);

    let open = f
        .services
        .loans
        .list_member_loans(&f.staff, member_id, true)
        .await
        .unwrap();
    assert_eq!(open.len(), 2);
}

#[sqlx::test]
#[ignore]
async fn test_reserved_copy_is_held_until_released(pool: PgPool) {
    let f = fixture(pool);
    let book_id = f.book(1).await;
    let copies = &f.services.copies;

    let mut tx = f.pool.begin().await.unwrap();
    let copy = copies.find_available_copy(&mut tx, book_id).await.unwrap();
    let held = copies.mark_reserved(&mut tx, copy.id).await.unwrap();
    assert_eq!(held.status, CopyStatus::Reserved);

    let err = copies.mark_loaned(&mut tx, copy.id).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidStateTransition(_)));
    let err = copies.find_available_copy(&mut tx, book_id).await.unwrap_err();
    assert!(matches!(err, AppError::NoAvailableCopy(id) if id == book_id));

    let released = copies.mark_available(&mut tx, copy.id).await.unwrap();
    assert_eq!(released.status, CopyStatus::Available);
    tx.commit().await.unwrap();
}

#[sqlx::test]
#[ignore]
async fn test_concurrent_duplicate_reservations(pool: PgPool) {
    let f = fixture(pool);
    let book_id = f.book(1).await;
    let alice = f.member("Alice").await;
    let reservations = &f.services.reservations;

    for _ in 0..10 {
        let (a, b) = tokio::join!(
            reservations.reserve(&f.staff, reserve(book_id, alice)),
            reservations.reserve(&f.staff, reserve(book_id, alice)),
        );

        let results = [a, b];
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        let loser = results.iter().find_map(|r| r.as_ref().err()).unwrap();
        assert!(
            matches!(loser, AppError::DuplicateReservation { member_id, book_id: b } if *member_id == alice && *b == book_id),
            "unexpected error: {:?}",
            loser
        );

        let winner = results.into_iter().find_map(Result::ok).unwrap();
        reservations.cancel(&f.staff, winner.id).await.unwrap();
    }
}

#[sqlx::test]
#[ignore]
async fn test_lapsed_hold_does_not_block_new_reservation(pool: PgPool) {
    let f = fixture(pool);
    let book_id = f.book(1).await;
    let alice = f.member("Alice").await;
    let reservations = &f.services.reservations;

    let lapsed = reservations
        .reserve(&f.staff, reserve(book_id, alice))
        .await
        .unwrap();
    sqlx::query("UPDATE reservations SET expiry_date = NOW() - INTERVAL '1 day' WHERE id = $1")
        .bind(lapsed.id)
        .execute(&f.pool)
        .await
        .unwrap();

    let fresh = reservations
        .reserve(&f.staff, reserve(book_id, alice))
        .await
        .unwrap();
    assert_ne!(fresh.id, lapsed.id);
    assert_eq!(fresh.status, ReservationStatus::Ready);

    let lapsed = reservations.get(&f.staff, lapsed.id).await.unwrap();
    assert_eq!(lapsed.status, ReservationStatus::Expired);
    assert!(lapsed.completed_at.is_some());

    // An unexpired hold still counts
    let err = reservations
        .reserve(&f.staff, reserve(book_id, alice))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::DuplicateReservation { .. }));
}
