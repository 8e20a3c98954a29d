//! Router-level checks that never reach the database

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use libris_server::{
    api,
    config::AppConfig,
    models::Principal,
    repository::Repository,
    services::Services,
    AppState,
};
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use tower::ServiceExt;

fn app() -> Router {
    let config = AppConfig::default();
    // Never connects unless a handler runs a query
    let pool = PgPoolOptions::new()
        .connect_lazy(&config.database.url)
        .expect("valid database url");
    let services = Services::new(Repository::new(pool.clone()), config.circulation.clone());

    api::router(AppState {
        config: Arc::new(config),
        services: Arc::new(services),
        pool,
    })
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let response = app()
        .oneshot(Request::get("/api/v1/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_missing_token_is_rejected() {
    let response = app()
        .oneshot(Request::get("/api/v1/loans/overdue").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = json_body(response).await;
    assert_eq!(body["error"], "NotAuthorized");
}

#[tokio::test]
async fn test_token_signed_with_other_secret_is_rejected() {
    let token = Principal::staff("intruder").create_token("not-the-secret").unwrap();
    let response = app()
        .oneshot(
            Request::get("/api/v1/loans/overdue")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_member_cannot_list_overdue_loans() {
    let secret = AppConfig::default().auth.jwt_secret;
    let token = Principal::member("reader", 1).create_token(&secret).unwrap();
    let response = app()
        .oneshot(
            Request::get("/api/v1/loans/overdue")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let response = app()
        .oneshot(Request::get("/api-docs/openapi.json").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert!(body["paths"]["/loans/{id}/return"].is_object());
    assert!(body["paths"]["/reservations/{id}/checkout"].is_object());
    assert!(body["paths"]["/authors/{id}"]["delete"].is_object());
    assert!(body["paths"]["/categories"]["post"].is_object());
}

#[tokio::test]
async fn test_catalog_reads_require_a_token() {
    for uri in ["/api/v1/books", "/api/v1/books/1", "/api/v1/copies/1", "/api/v1/fee-types"] {
        let response = app()
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{}", uri);
    }
}
