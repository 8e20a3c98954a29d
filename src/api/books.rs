//! Book and copy endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::{
        book::{Book, BookDetails, BookQuery, CreateBook},
        copy::{BookCopy, CreateCopy},
        loan::{BorrowRequest, LoanDetails},
    },
    AppState,
};

use super::AuthenticatedUser;

/// List books
#[utoipa::path(
    get,
    path = "/books",
    tag = "books",
    security(("bearer_auth" = [])),
    params(BookQuery),
    responses(
        (status = 200, description = "Books ordered by title", body = Vec<Book>)
    )
)]
pub async fn list_books(
    State(state): State<AppState>,
    AuthenticatedUser(_principal): AuthenticatedUser,
    Query(query): Query<BookQuery>,
) -> AppResult<Json<Vec<Book>>> {
    let books = state.services.catalog.list_books(&query).await?;
    Ok(Json(books))
}

/// Create a book with its initial copies
#[utoipa::path(
    post,
    path = "/books",
    tag = "books",
    security(("bearer_auth" = [])),
    request_body = CreateBook,
    responses(
        (status = 201, description = "Book created", body = BookDetails),
        (status = 400, description = "Invalid input"),
        (status = 403, description = "Staff rights required"),
        (status = 404, description = "Unknown author or category")
    )
)]
pub async fn create_book(
    State(state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Json(book): Json<CreateBook>,
) -> AppResult<(StatusCode, Json<BookDetails>)> {
    let created = state.services.catalog.create_book(&principal, book).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Get a book with its authors, category and copies
#[utoipa::path(
    get,
    path = "/books/{id}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Book details", body = BookDetails),
        (status = 404, description = "Book not found")
    )
)]
pub async fn get_book(
    State(state): State<AppState>,
    AuthenticatedUser(_principal): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<BookDetails>> {
    let book = state.services.catalog.get_book(id).await?;
    Ok(Json(book))
}

/// Add a copy to a book
#[utoipa::path(
    post,
    path = "/books/{id}/copies",
    tag = "books",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Book ID")),
    request_body = CreateCopy,
    responses(
        (status = 201, description = "Copy added", body = BookCopy),
        (status = 404, description = "Book not found")
    )
)]
pub async fn add_copy(
    State(state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(book_id): Path<i32>,
    Json(copy): Json<CreateCopy>,
) -> AppResult<(StatusCode, Json<BookCopy>)> {
    let created = state
        .services
        .catalog
        .add_copy(&principal, book_id, copy)
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Borrow any available copy of a book
#[utoipa::path(
    post,
    path = "/books/{id}/borrow",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Book ID")),
    request_body = BorrowRequest,
    responses(
        (status = 201, description = "Loan created", body = LoanDetails),
        (status = 404, description = "Book or member not found"),
        (status = 409, description = "No available copy")
    )
)]
pub async fn borrow(
    State(state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(book_id): Path<i32>,
    Json(request): Json<BorrowRequest>,
) -> AppResult<(StatusCode, Json<LoanDetails>)> {
    let loan = state
        .services
        .loans
        .borrow(&principal, book_id, request)
        .await?;
    Ok((StatusCode::CREATED, Json(loan)))
}

/// Get a copy
#[utoipa::path(
    get,
    path = "/copies/{id}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Copy ID")),
    responses(
        (status = 200, description = "Copy", body = BookCopy),
        (status = 404, description = "Copy not found")
    )
)]
pub async fn get_copy(
    State(state): State<AppState>,
    AuthenticatedUser(_principal): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<BookCopy>> {
    let copy = state.services.catalog.get_copy(id).await?;
    Ok(Json(copy))
}

/// Delete a copy with no loan history
#[utoipa::path(
    delete,
    path = "/copies/{id}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Copy ID")),
    responses(
        (status = 204, description = "Copy deleted"),
        (status = 404, description = "Copy not found"),
        (status = 409, description = "Copy is out or has loan history")
    )
)]
pub async fn delete_copy(
    State(state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state.services.catalog.delete_copy(&principal, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Flag a shelved copy as damaged
#[utoipa::path(
    post,
    path = "/copies/{id}/damaged",
    tag = "books",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Copy ID")),
    responses(
        (status = 200, description = "Copy damaged", body = BookCopy),
        (status = 409, description = "Invalid transition")
    )
)]
pub async fn mark_damaged(
    State(state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<BookCopy>> {
    let copy = state.services.catalog.mark_damaged(&principal, id).await?;
    Ok(Json(copy))
}

/// Send a copy to maintenance
#[utoipa::path(
    post,
    path = "/copies/{id}/maintenance",
    tag = "books",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Copy ID")),
    responses(
        (status = 200, description = "Copy in maintenance", body = BookCopy),
        (status = 409, description = "Invalid transition")
    )
)]
pub async fn send_to_maintenance(
    State(state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<BookCopy>> {
    let copy = state
        .services
        .catalog
        .send_to_maintenance(&principal, id)
        .await?;
    Ok(Json(copy))
}

/// Put a copy back on the shelf
#[utoipa::path(
    post,
    path = "/copies/{id}/shelve",
    tag = "books",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Copy ID")),
    responses(
        (status = 200, description = "Copy available", body = BookCopy),
        (status = 409, description = "Invalid transition")
    )
)]
pub async fn return_to_shelf(
    State(state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<BookCopy>> {
    let copy = state.services.catalog.return_to_shelf(&principal, id).await?;
    Ok(Json(copy))
}
