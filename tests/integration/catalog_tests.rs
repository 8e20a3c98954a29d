//! Catalog records: authors, categories and book listing

use libris_server::{
    error::AppError,
    models::{
        author::{CreateAuthor, UpdateAuthor},
        book::{BookQuery, CreateBook},
        category::CreateCategory,
        Principal,
    },
};
use sqlx::PgPool;

use crate::common::fixture;

fn author(first_name: &str, last_name: &str) -> CreateAuthor {
    CreateAuthor {
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        ..Default::default()
    }
}

#[sqlx::test]
#[ignore]
async fn test_categories_are_seeded(pool: PgPool) {
    let f = fixture(pool);
    let categories = f.services.catalog.list_categories().await.unwrap();

    assert_eq!(categories.len(), 8);
    assert!(categories.iter().any(|c| c.name == "Science Fiction"));

    let err = f
        .services
        .catalog
        .create_category(
            &f.staff,
            CreateCategory {
                name: "Fantasy".to_string(),
                description: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[sqlx::test]
#[ignore]
async fn test_book_carries_authors_and_category(pool: PgPool) {
    let f = fixture(pool);
    let catalog = &f.services.catalog;

    let pratchett = catalog
        .create_author(&f.staff, author("Terry", "Pratchett"))
        .await
        .unwrap();
    let gaiman = catalog
        .create_author(&f.staff, author("Neil", "Gaiman"))
        .await
        .unwrap();
    let fantasy = catalog
        .list_categories()
        .await
        .unwrap()
        .into_iter()
        .find(|c| c.name == "Fantasy")
        .unwrap();

    let created = catalog
        .create_book(
            &f.staff,
            CreateBook {
                title: "Good Omens".to_string(),
                category_id: Some(fantasy.id),
                description: Some("The end of the world, slightly delayed".to_string()),
                author_ids: vec![pratchett.id, gaiman.id, pratchett.id],
                copies: 2,
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(created.authors.len(), 2);

    let book = catalog.get_book(created.book.id).await.unwrap();
    let names: Vec<_> = book.authors.iter().map(|a| a.last_name.as_str()).collect();
    assert_eq!(names, ["Pratchett", "Gaiman"]);
    assert_eq!(book.category.map(|c| c.id), Some(fantasy.id));
    assert_eq!(book.nb_available, 2);

    // Filtered listing
    f.book(1).await;
    let query = BookQuery {
        category_id: Some(fantasy.id),
        ..Default::default()
    };
    let books = catalog.list_books(&query).await.unwrap();
    assert_eq!(books.len(), 1);
    assert_eq!(books[0].id, created.book.id);
    assert_eq!(catalog.list_books(&BookQuery::default()).await.unwrap().len(), 2);
}

#[sqlx::test]
#[ignore]
async fn test_unknown_author_or_category_writes_nothing(pool: PgPool) {
    let f = fixture(pool);
    let catalog = &f.services.catalog;

    let err = catalog
        .create_book(
            &f.staff,
            CreateBook {
                title: "Ghost".to_string(),
                author_ids: vec![9999],
                copies: 1,
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let err = catalog
        .create_book(
            &f.staff,
            CreateBook {
                title: "Ghost".to_string(),
                category_id: Some(9999),
                copies: 1,
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    assert!(catalog.list_books(&BookQuery::default()).await.unwrap().is_empty());
}

#[sqlx::test]
#[ignore]
async fn test_author_maintenance(pool: PgPool) {
    let f = fixture(pool);
    let catalog = &f.services.catalog;

    let member = Principal::member("alice", 1);
    let err = catalog
        .create_author(&member, author("Albert", "Camus"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Authorization(_)));

    let camus = catalog
        .create_author(&f.staff, author("Albert", "Camus"))
        .await
        .unwrap();
    let updated = catalog
        .update_author(
            &f.staff,
            camus.id,
            UpdateAuthor {
                biography: Some("Born in Mondovi, 1913".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.first_name, "Albert");
    assert!(updated.biography.is_some());

    catalog
        .create_book(
            &f.staff,
            CreateBook {
                title: "L'Étranger".to_string(),
                author_ids: vec![camus.id],
                copies: 1,
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let err = catalog.delete_author(&f.staff, camus.id).await.unwrap_err();
    assert!(matches!(err, AppError::HasBooks(id) if id == camus.id));

    let unused = catalog
        .create_author(&f.staff, author("Jean", "Giono"))
        .await
        .unwrap();
    catalog.delete_author(&f.staff, unused.id).await.unwrap();
    assert!(matches!(
        catalog.get_author(unused.id).await,
        Err(AppError::NotFound(_))
    ));

    let authors = catalog.list_authors().await.unwrap();
    assert_eq!(authors.len(), 1);
}

#[sqlx::test]
#[ignore]
async fn test_far_page_is_empty(pool: PgPool) {
    let f = fixture(pool);
    f.book(1).await;

    let query = BookQuery {
        page: Some(i64::MAX),
        per_page: Some(200),
        ..Default::default()
    };
    let books = f.services.catalog.list_books(&query).await.unwrap();
    assert!(books.is_empty());
}
