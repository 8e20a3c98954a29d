//! Member endpoints and per-member views

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    error::AppResult,
    models::{
        fee::{MemberBalance, Payment, TransactionDetails},
        loan::LoanDetails,
        member::{CreateMember, Member},
        reservation::{Reservation, ReservationQuery},
    },
    AppState,
};

use super::AuthenticatedUser;

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MemberLoansQuery {
    /// Only loans not yet returned (default: false)
    pub open_only: Option<bool>,
}

/// Register a member
#[utoipa::path(
    post,
    path = "/members",
    tag = "members",
    security(("bearer_auth" = [])),
    request_body = CreateMember,
    responses(
        (status = 201, description = "Member created", body = Member),
        (status = 400, description = "Invalid input or email already registered"),
        (status = 403, description = "Staff rights required")
    )
)]
pub async fn create_member(
    State(state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Json(member): Json<CreateMember>,
) -> AppResult<(StatusCode, Json<Member>)> {
    let created = state.services.catalog.create_member(&principal, member).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Get a member
#[utoipa::path(
    get,
    path = "/members/{id}",
    tag = "members",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Member ID")),
    responses(
        (status = 200, description = "Member", body = Member),
        (status = 404, description = "Member not found")
    )
)]
pub async fn get_member(
    State(state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Member>> {
    let member = state.services.catalog.get_member(&principal, id).await?;
    Ok(Json(member))
}

/// Loans of a member
#[utoipa::path(
    get,
    path = "/members/{id}/loans",
    tag = "members",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Member ID"),
        MemberLoansQuery
    ),
    responses(
        (status = 200, description = "Member's loans, newest first", body = Vec<LoanDetails>),
        (status = 404, description = "Member not found")
    )
)]
pub async fn get_member_loans(
    State(state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(member_id): Path<i32>,
    Query(query): Query<MemberLoansQuery>,
) -> AppResult<Json<Vec<LoanDetails>>> {
    let loans = state
        .services
        .loans
        .list_member_loans(&principal, member_id, query.open_only.unwrap_or(false))
        .await?;
    Ok(Json(loans))
}

/// Reservations of a member
#[utoipa::path(
    get,
    path = "/members/{id}/reservations",
    tag = "members",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Member ID")),
    responses(
        (status = 200, description = "Member's reservations", body = Vec<Reservation>)
    )
)]
pub async fn get_member_reservations(
    State(state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(member_id): Path<i32>,
) -> AppResult<Json<Vec<Reservation>>> {
    principal.require_member_access(member_id)?;
    let query = ReservationQuery {
        member_id: Some(member_id),
        ..Default::default()
    };
    let reservations = state.services.reservations.list(&principal, query).await?;
    Ok(Json(reservations))
}

/// Charges of a member
#[utoipa::path(
    get,
    path = "/members/{id}/transactions",
    tag = "members",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Member ID")),
    responses(
        (status = 200, description = "Member's transactions", body = Vec<TransactionDetails>),
        (status = 404, description = "Member not found")
    )
)]
pub async fn get_member_transactions(
    State(state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(member_id): Path<i32>,
) -> AppResult<Json<Vec<TransactionDetails>>> {
    let transactions = state
        .services
        .ledger
        .list_member_transactions(&principal, member_id)
        .await?;
    Ok(Json(transactions))
}

/// Payments made by a member
#[utoipa::path(
    get,
    path = "/members/{id}/payments",
    tag = "members",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Member ID")),
    responses(
        (status = 200, description = "Member's payments", body = Vec<Payment>)
    )
)]
pub async fn get_member_payments(
    State(state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(member_id): Path<i32>,
) -> AppResult<Json<Vec<Payment>>> {
    let payments = state
        .services
        .ledger
        .list_member_payments(&principal, member_id)
        .await?;
    Ok(Json(payments))
}

/// Fee balance of a member
#[utoipa::path(
    get,
    path = "/members/{id}/balance",
    tag = "members",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Member ID")),
    responses(
        (status = 200, description = "Charged, outstanding and paid totals", body = MemberBalance),
        (status = 404, description = "Member not found")
    )
)]
pub async fn get_member_balance(
    State(state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(member_id): Path<i32>,
) -> AppResult<Json<MemberBalance>> {
    let balance = state
        .services
        .ledger
        .member_balance(&principal, member_id)
        .await?;
    Ok(Json(balance))
}
