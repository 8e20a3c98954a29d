//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{authors, books, categories, fees, health, loans, members, reservations};

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Libris API",
        version = "0.3.0",
        description = "Library circulation REST API: copies, loans, reservations and fees"
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Books and copies
        books::list_books,
        books::create_book,
        books::get_book,
        books::add_copy,
        books::borrow,
        books::get_copy,
        books::delete_copy,
        books::mark_damaged,
        books::send_to_maintenance,
        books::return_to_shelf,
        // Authors and categories
        authors::list_authors,
        authors::create_author,
        authors::get_author,
        authors::update_author,
        authors::delete_author,
        categories::list_categories,
        categories::create_category,
        categories::get_category,
        // Members
        members::create_member,
        members::get_member,
        members::get_member_loans,
        members::get_member_reservations,
        members::get_member_transactions,
        members::get_member_payments,
        members::get_member_balance,
        // Loans
        loans::get_loan,
        loans::list_overdue,
        loans::loan_stats,
        loans::renew_loan,
        loans::return_loan,
        loans::report_lost,
        loans::report_damaged,
        loans::assess_late_fee,
        loans::get_loan_transactions,
        loans::delete_loan,
        // Reservations
        reservations::list_reservations,
        reservations::create_reservation,
        reservations::get_reservation,
        reservations::cancel_reservation,
        reservations::checkout_reservation,
        reservations::approve_reservation,
        reservations::deny_reservation,
        reservations::expire_reservations,
        // Fees
        fees::list_fee_types,
        fees::update_fee_type,
        fees::create_transaction,
        fees::get_transaction,
        fees::cancel_transaction,
        fees::delete_transaction,
        fees::list_payments,
        fees::record_payment,
        fees::update_payment,
        fees::delete_payment,
    ),
    components(
        schemas(
            // Books
            crate::models::book::Book,
            crate::models::book::BookDetails,
            crate::models::book::CreateBook,
            crate::models::copy::BookCopy,
            crate::models::copy::CopyStatus,
            crate::models::copy::CreateCopy,
            crate::models::author::Author,
            crate::models::author::CreateAuthor,
            crate::models::author::UpdateAuthor,
            crate::models::category::Category,
            crate::models::category::CreateCategory,
            // Members
            crate::models::member::Member,
            crate::models::member::CreateMember,
            // Loans
            crate::models::loan::LoanStatus,
            crate::models::loan::LoanDetails,
            crate::models::loan::LoanClosure,
            crate::models::loan::LoanStats,
            crate::models::loan::BorrowRequest,
            crate::models::loan::ReturnLoanRequest,
            crate::models::loan::ReportLoanRequest,
            // Reservations
            crate::models::reservation::Reservation,
            crate::models::reservation::ReservationStatus,
            crate::models::reservation::CreateReservation,
            crate::services::reservations::Checkout,
            reservations::ExpireRequest,
            reservations::ExpireResponse,
            // Fees
            crate::models::fee::FeeKind,
            crate::models::fee::FeeType,
            crate::models::fee::UpdateFeeType,
            crate::models::fee::Transaction,
            crate::models::fee::TransactionDetails,
            crate::models::fee::TransactionStatus,
            crate::models::fee::CreateTransaction,
            crate::models::fee::Payment,
            crate::models::fee::PaymentMethod,
            crate::models::fee::PaymentRequest,
            crate::models::fee::MemberBalance,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "books", description = "Catalog, authors, categories and copies"),
        (name = "members", description = "Member register"),
        (name = "loans", description = "Loan management"),
        (name = "reservations", description = "Reservation queue"),
        (name = "fees", description = "Fees, transactions and payments")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
