//! Loan management endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::{
        fee::{Transaction, TransactionDetails},
        loan::{LoanClosure, LoanDetails, LoanStats, ReportLoanRequest, ReturnLoanRequest},
    },
    AppState,
};

use super::AuthenticatedUser;

/// Get a loan
#[utoipa::path(
    get,
    path = "/loans/{id}",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Loan ID")),
    responses(
        (status = 200, description = "Loan with derived status", body = LoanDetails),
        (status = 404, description = "Loan not found")
    )
)]
pub async fn get_loan(
    State(state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(loan_id): Path<i32>,
) -> AppResult<Json<LoanDetails>> {
    let loan = state.services.loans.get(&principal, loan_id).await?;
    Ok(Json(loan))
}

/// Open loans past their due date
#[utoipa::path(
    get,
    path = "/loans/overdue",
    tag = "loans",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Overdue loans, most overdue first", body = Vec<LoanDetails>),
        (status = 403, description = "Staff rights required")
    )
)]
pub async fn list_overdue(
    State(state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
) -> AppResult<Json<Vec<LoanDetails>>> {
    let loans = state.services.loans.list_overdue(&principal).await?;
    Ok(Json(loans))
}

/// Active and overdue loan counts
#[utoipa::path(
    get,
    path = "/loans/stats",
    tag = "loans",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Loan counts", body = LoanStats)
    )
)]
pub async fn loan_stats(
    State(state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
) -> AppResult<Json<LoanStats>> {
    let stats = state.services.loans.stats(&principal).await?;
    Ok(Json(stats))
}

/// Renew a loan
#[utoipa::path(
    post,
    path = "/loans/{id}/renew",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Loan ID")),
    responses(
        (status = 200, description = "Loan renewed", body = LoanDetails),
        (status = 404, description = "Loan not found"),
        (status = 409, description = "Loan already returned"),
        (status = 422, description = "Maximum renewals reached")
    )
)]
pub async fn renew_loan(
    State(state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(loan_id): Path<i32>,
) -> AppResult<Json<LoanDetails>> {
    let loan = state.services.loans.renew(&principal, loan_id).await?;
    Ok(Json(loan))
}

/// Return a borrowed copy
#[utoipa::path(
    post,
    path = "/loans/{id}/return",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Loan ID")),
    request_body = ReturnLoanRequest,
    responses(
        (status = 200, description = "Copy returned", body = LoanClosure),
        (status = 404, description = "Loan not found"),
        (status = 409, description = "Already returned")
    )
)]
pub async fn return_loan(
    State(state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(loan_id): Path<i32>,
    request: Option<Json<ReturnLoanRequest>>,
) -> AppResult<Json<LoanClosure>> {
    let request = request.map(|Json(r)| r).unwrap_or_default();
    let closure = state
        .services
        .loans
        .return_loan(&principal, loan_id, request)
        .await?;
    Ok(Json(closure))
}

/// Report the copy of a loan lost
#[utoipa::path(
    post,
    path = "/loans/{id}/lost",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Loan ID")),
    request_body = ReportLoanRequest,
    responses(
        (status = 200, description = "Loan closed as lost", body = LoanClosure),
        (status = 409, description = "Already returned")
    )
)]
pub async fn report_lost(
    State(state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(loan_id): Path<i32>,
    request: Option<Json<ReportLoanRequest>>,
) -> AppResult<Json<LoanClosure>> {
    let request = request.map(|Json(r)| r).unwrap_or_default();
    let closure = state
        .services
        .loans
        .report_lost(&principal, loan_id, request)
        .await?;
    Ok(Json(closure))
}

/// Report the copy of a loan damaged
#[utoipa::path(
    post,
    path = "/loans/{id}/damaged",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Loan ID")),
    request_body = ReportLoanRequest,
    responses(
        (status = 200, description = "Loan closed as damaged", body = LoanClosure),
        (status = 409, description = "Already returned")
    )
)]
pub async fn report_damaged(
    State(state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(loan_id): Path<i32>,
    request: Option<Json<ReportLoanRequest>>,
) -> AppResult<Json<LoanClosure>> {
    let request = request.map(|Json(r)| r).unwrap_or_default();
    let closure = state
        .services
        .loans
        .report_damaged(&principal, loan_id, request)
        .await?;
    Ok(Json(closure))
}

/// Accrue the late fee of an overdue loan
#[utoipa::path(
    post,
    path = "/loans/{id}/late-fee",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Loan ID")),
    responses(
        (status = 200, description = "Pending late fee, null when nothing is owed", body = Option<Transaction>),
        (status = 409, description = "Already returned")
    )
)]
pub async fn assess_late_fee(
    State(state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(loan_id): Path<i32>,
) -> AppResult<Json<Option<Transaction>>> {
    let charge = state
        .services
        .loans
        .assess_late_fee_now(&principal, loan_id)
        .await?;
    Ok(Json(charge))
}

/// Charges raised against a loan
#[utoipa::path(
    get,
    path = "/loans/{id}/transactions",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Loan ID")),
    responses(
        (status = 200, description = "Loan transactions", body = Vec<TransactionDetails>)
    )
)]
pub async fn get_loan_transactions(
    State(state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(loan_id): Path<i32>,
) -> AppResult<Json<Vec<TransactionDetails>>> {
    let transactions = state
        .services
        .ledger
        .list_loan_transactions(&principal, loan_id)
        .await?;
    Ok(Json(transactions))
}

/// Delete a loan without charges
#[utoipa::path(
    delete,
    path = "/loans/{id}",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Loan ID")),
    responses(
        (status = 204, description = "Loan deleted"),
        (status = 404, description = "Loan not found"),
        (status = 409, description = "Loan has transactions")
    )
)]
pub async fn delete_loan(
    State(state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(loan_id): Path<i32>,
) -> AppResult<StatusCode> {
    state.services.loans.delete(&principal, loan_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
