//! API handlers for Libris REST endpoints

pub mod authors;
pub mod books;
pub mod categories;
pub mod fees;
pub mod health;
pub mod loans;
pub mod members;
pub mod openapi;
pub mod reservations;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
    routing::{get, post, put},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{error::AppError, models::principal::Principal, AppState};

/// Extractor for the authenticated caller from a JWT bearer token
pub struct AuthenticatedUser(pub Principal);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::Authentication("Missing authorization header".to_string()))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Authentication("Invalid authorization header format".to_string()))?;

        let principal = Principal::from_token(token, &state.config.auth.jwt_secret)
            .map_err(|e| AppError::Authentication(e.to_string()))?;

        Ok(AuthenticatedUser(principal))
    }
}

/// Create the application router with all routes
pub fn router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // API v1 routes
    let api_v1 = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Books and copies
        .route("/books", get(books::list_books).post(books::create_book))
        .route("/books/:id", get(books::get_book))
        .route("/books/:id/copies", post(books::add_copy))
        .route("/books/:id/borrow", post(books::borrow))
        .route("/copies/:id", get(books::get_copy).delete(books::delete_copy))
        .route("/copies/:id/damaged", post(books::mark_damaged))
        .route("/copies/:id/maintenance", post(books::send_to_maintenance))
        .route("/copies/:id/shelve", post(books::return_to_shelf))
        // Authors and categories
        .route("/authors", get(authors::list_authors).post(authors::create_author))
        .route(
            "/authors/:id",
            get(authors::get_author)
                .put(authors::update_author)
                .delete(authors::delete_author),
        )
        .route(
            "/categories",
            get(categories::list_categories).post(categories::create_category),
        )
        .route("/categories/:id", get(categories::get_category))
        // Members
        .route("/members", post(members::create_member))
        .route("/members/:id", get(members::get_member))
        .route("/members/:id/loans", get(members::get_member_loans))
        .route("/members/:id/reservations", get(members::get_member_reservations))
        .route("/members/:id/transactions", get(members::get_member_transactions))
        .route("/members/:id/payments", get(members::get_member_payments))
        .route("/members/:id/balance", get(members::get_member_balance))
        // Loans
        .route("/loans/overdue", get(loans::list_overdue))
        .route("/loans/stats", get(loans::loan_stats))
        .route("/loans/:id", get(loans::get_loan).delete(loans::delete_loan))
        .route("/loans/:id/renew", post(loans::renew_loan))
        .route("/loans/:id/return", post(loans::return_loan))
        .route("/loans/:id/lost", post(loans::report_lost))
        .route("/loans/:id/damaged", post(loans::report_damaged))
        .route("/loans/:id/late-fee", post(loans::assess_late_fee))
        .route("/loans/:id/transactions", get(loans::get_loan_transactions))
        // Reservations
        .route(
            "/reservations",
            get(reservations::list_reservations).post(reservations::create_reservation),
        )
        .route("/reservations/expire", post(reservations::expire_reservations))
        .route("/reservations/:id", get(reservations::get_reservation))
        .route("/reservations/:id/cancel", post(reservations::cancel_reservation))
        .route("/reservations/:id/checkout", post(reservations::checkout_reservation))
        .route("/reservations/:id/approve", post(reservations::approve_reservation))
        .route("/reservations/:id/deny", post(reservations::deny_reservation))
        // Fees
        .route("/fee-types", get(fees::list_fee_types))
        .route("/fee-types/:id", put(fees::update_fee_type))
        .route("/transactions", post(fees::create_transaction))
        .route(
            "/transactions/:id",
            get(fees::get_transaction).delete(fees::delete_transaction),
        )
        .route("/transactions/:id/cancel", post(fees::cancel_transaction))
        .route(
            "/transactions/:id/payments",
            get(fees::list_payments).post(fees::record_payment),
        )
        .route("/payments/:id", put(fees::update_payment).delete(fees::delete_payment))
        .with_state(state);

    // OpenAPI documentation
    let openapi = openapi::create_openapi_router();

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi)
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
}
