//! Fee type, transaction and payment endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::fee::{
        CreateTransaction, FeeType, Payment, PaymentRequest, Transaction, TransactionDetails,
        UpdateFeeType,
    },
    AppState,
};

use super::AuthenticatedUser;

/// List fee types
#[utoipa::path(
    get,
    path = "/fee-types",
    tag = "fees",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Configured fee types", body = Vec<FeeType>)
    )
)]
pub async fn list_fee_types(
    State(state): State<AppState>,
    AuthenticatedUser(_principal): AuthenticatedUser,
) -> AppResult<Json<Vec<FeeType>>> {
    let fee_types = state.services.ledger.list_fee_types().await?;
    Ok(Json(fee_types))
}

/// Change a fee rate
#[utoipa::path(
    put,
    path = "/fee-types/{id}",
    tag = "fees",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Fee type ID")),
    request_body = UpdateFeeType,
    responses(
        (status = 200, description = "Fee type updated", body = FeeType),
        (status = 404, description = "Fee type not found")
    )
)]
pub async fn update_fee_type(
    State(state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(update): Json<UpdateFeeType>,
) -> AppResult<Json<FeeType>> {
    let fee_type = state
        .services
        .ledger
        .update_fee_type(&principal, id, update)
        .await?;
    Ok(Json(fee_type))
}

/// Raise a manual charge
#[utoipa::path(
    post,
    path = "/transactions",
    tag = "fees",
    security(("bearer_auth" = [])),
    request_body = CreateTransaction,
    responses(
        (status = 201, description = "Transaction created", body = Transaction),
        (status = 400, description = "Invalid input"),
        (status = 404, description = "Member or loan not found")
    )
)]
pub async fn create_transaction(
    State(state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Json(request): Json<CreateTransaction>,
) -> AppResult<(StatusCode, Json<Transaction>)> {
    let transaction = state
        .services
        .ledger
        .create_transaction(&principal, request)
        .await?;
    Ok((StatusCode::CREATED, Json(transaction)))
}

/// Get a transaction with its payment total
#[utoipa::path(
    get,
    path = "/transactions/{id}",
    tag = "fees",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Transaction ID")),
    responses(
        (status = 200, description = "Transaction", body = TransactionDetails),
        (status = 404, description = "Transaction not found")
    )
)]
pub async fn get_transaction(
    State(state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<TransactionDetails>> {
    let transaction = state.services.ledger.get_transaction(&principal, id).await?;
    Ok(Json(transaction))
}

/// Cancel a pending transaction
#[utoipa::path(
    post,
    path = "/transactions/{id}/cancel",
    tag = "fees",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Transaction ID")),
    responses(
        (status = 200, description = "Transaction cancelled", body = Transaction),
        (status = 409, description = "Transaction not pending")
    )
)]
pub async fn cancel_transaction(
    State(state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Transaction>> {
    let transaction = state
        .services
        .ledger
        .cancel_transaction(&principal, id)
        .await?;
    Ok(Json(transaction))
}

/// Delete a transaction without payments
#[utoipa::path(
    delete,
    path = "/transactions/{id}",
    tag = "fees",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Transaction ID")),
    responses(
        (status = 204, description = "Transaction deleted"),
        (status = 409, description = "Transaction has payments")
    )
)]
pub async fn delete_transaction(
    State(state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state
        .services
        .ledger
        .delete_transaction(&principal, id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Payments recorded against a transaction
#[utoipa::path(
    get,
    path = "/transactions/{id}/payments",
    tag = "fees",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Transaction ID")),
    responses(
        (status = 200, description = "Payments, oldest first", body = Vec<Payment>)
    )
)]
pub async fn list_payments(
    State(state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Vec<Payment>>> {
    let payments = state.services.ledger.list_payments(&principal, id).await?;
    Ok(Json(payments))
}

/// Record a payment
#[utoipa::path(
    post,
    path = "/transactions/{id}/payments",
    tag = "fees",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Transaction ID")),
    request_body = PaymentRequest,
    responses(
        (status = 201, description = "Payment recorded", body = Payment),
        (status = 409, description = "Transaction not pending")
    )
)]
pub async fn record_payment(
    State(state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(request): Json<PaymentRequest>,
) -> AppResult<(StatusCode, Json<Payment>)> {
    let payment = state
        .services
        .ledger
        .record_payment(&principal, id, request)
        .await?;
    Ok((StatusCode::CREATED, Json(payment)))
}

/// Edit a payment
#[utoipa::path(
    put,
    path = "/payments/{id}",
    tag = "fees",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Payment ID")),
    request_body = PaymentRequest,
    responses(
        (status = 200, description = "Payment updated", body = Payment),
        (status = 404, description = "Payment not found")
    )
)]
pub async fn update_payment(
    State(state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(request): Json<PaymentRequest>,
) -> AppResult<Json<Payment>> {
    let payment = state
        .services
        .ledger
        .update_payment(&principal, id, request)
        .await?;
    Ok(Json(payment))
}

/// Delete a payment
#[utoipa::path(
    delete,
    path = "/payments/{id}",
    tag = "fees",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Payment ID")),
    responses(
        (status = 200, description = "Parent transaction with its new status", body = Transaction),
        (status = 404, description = "Payment not found")
    )
)]
pub async fn delete_payment(
    State(state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Transaction>> {
    let transaction = state.services.ledger.delete_payment(&principal, id).await?;
    Ok(Json(transaction))
}
