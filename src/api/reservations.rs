//! Reservation endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::reservation::{CreateReservation, Reservation, ReservationQuery},
    services::reservations::Checkout,
    AppState,
};

use super::AuthenticatedUser;

/// Expiry sweep request
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ExpireRequest {
    /// Cut-off instant, defaults to now
    pub as_of: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ExpireResponse {
    /// Number of reservations moved to expired
    pub expired: u64,
}

/// List reservations
#[utoipa::path(
    get,
    path = "/reservations",
    tag = "reservations",
    security(("bearer_auth" = [])),
    params(ReservationQuery),
    responses(
        (status = 200, description = "Reservations, oldest first", body = Vec<Reservation>)
    )
)]
pub async fn list_reservations(
    State(state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Query(query): Query<ReservationQuery>,
) -> AppResult<Json<Vec<Reservation>>> {
    let reservations = state.services.reservations.list(&principal, query).await?;
    Ok(Json(reservations))
}

/// Reserve a book
#[utoipa::path(
    post,
    path = "/reservations",
    tag = "reservations",
    security(("bearer_auth" = [])),
    request_body = CreateReservation,
    responses(
        (status = 201, description = "Reservation created", body = Reservation),
        (status = 404, description = "Book or member not found"),
        (status = 409, description = "Member already holds an open reservation")
    )
)]
pub async fn create_reservation(
    State(state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Json(request): Json<CreateReservation>,
) -> AppResult<(StatusCode, Json<Reservation>)> {
    let reservation = state
        .services
        .reservations
        .reserve(&principal, request)
        .await?;
    Ok((StatusCode::CREATED, Json(reservation)))
}

/// Get a reservation
#[utoipa::path(
    get,
    path = "/reservations/{id}",
    tag = "reservations",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Reservation ID")),
    responses(
        (status = 200, description = "Reservation", body = Reservation),
        (status = 404, description = "Reservation not found")
    )
)]
pub async fn get_reservation(
    State(state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Reservation>> {
    let reservation = state.services.reservations.get(&principal, id).await?;
    Ok(Json(reservation))
}

/// Cancel a reservation
#[utoipa::path(
    post,
    path = "/reservations/{id}/cancel",
    tag = "reservations",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Reservation ID")),
    responses(
        (status = 200, description = "Reservation cancelled", body = Reservation),
        (status = 409, description = "Reservation already closed")
    )
)]
pub async fn cancel_reservation(
    State(state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Reservation>> {
    let reservation = state.services.reservations.cancel(&principal, id).await?;
    Ok(Json(reservation))
}

/// Check out a ready reservation
#[utoipa::path(
    post,
    path = "/reservations/{id}/checkout",
    tag = "reservations",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Reservation ID")),
    responses(
        (status = 201, description = "Loan created from the reservation", body = Checkout),
        (status = 409, description = "Reservation not ready or no available copy")
    )
)]
pub async fn checkout_reservation(
    State(state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<(StatusCode, Json<Checkout>)> {
    let checkout = state.services.reservations.checkout(&principal, id).await?;
    Ok((StatusCode::CREATED, Json(checkout)))
}

/// Accept a pending reservation
#[utoipa::path(
    post,
    path = "/reservations/{id}/approve",
    tag = "reservations",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Reservation ID")),
    responses(
        (status = 200, description = "Reservation ready", body = Reservation),
        (status = 409, description = "Reservation not pending")
    )
)]
pub async fn approve_reservation(
    State(state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Reservation>> {
    let reservation = state.services.reservations.approve(&principal, id).await?;
    Ok(Json(reservation))
}

/// Deny an open reservation
#[utoipa::path(
    post,
    path = "/reservations/{id}/deny",
    tag = "reservations",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Reservation ID")),
    responses(
        (status = 200, description = "Reservation cancelled", body = Reservation),
        (status = 409, description = "Reservation already closed")
    )
)]
pub async fn deny_reservation(
    State(state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Reservation>> {
    let reservation = state.services.reservations.deny(&principal, id).await?;
    Ok(Json(reservation))
}

/// Expire reservations whose hold has lapsed
#[utoipa::path(
    post,
    path = "/reservations/expire",
    tag = "reservations",
    security(("bearer_auth" = [])),
    request_body = ExpireRequest,
    responses(
        (status = 200, description = "Sweep done", body = ExpireResponse),
        (status = 403, description = "Staff rights required")
    )
)]
pub async fn expire_reservations(
    State(state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    request: Option<Json<ExpireRequest>>,
) -> AppResult<Json<ExpireResponse>> {
    let request = request.map(|Json(r)| r).unwrap_or_default();
    let expired = state
        .services
        .reservations
        .expire_stale(&principal, request.as_of)
        .await?;
    Ok(Json(ExpireResponse { expired }))
}
