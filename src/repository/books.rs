//! Books repository for database operations

use sqlx::{PgConnection, Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::book::{Book, CreateBook},
};

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get book by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Book> {
        sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    /// Check that a book exists inside the caller's transaction
    pub async fn ensure_exists(&self, conn: &mut PgConnection, id: i32) -> AppResult<()> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM books WHERE id = $1)")
            .bind(id)
            .fetch_one(&mut *conn)
            .await?;

        if exists {
            Ok(())
        } else {
            Err(AppError::NotFound(format!("Book with id {} not found", id)))
        }
    }

    /// Insert the catalog record (copies are added separately)
    pub async fn create(
        &self,
        conn: &mut PgConnection,
        book: &CreateBook,
    ) -> AppResult<Book> {
        let created = sqlx::query_as::<_, Book>(
            r#"
            INSERT INTO books (title, isbn, publisher, publication_date, category_id, description)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(&book.title)
        .bind(&book.isbn)
        .bind(&book.publisher)
        .bind(book.publication_date)
        .bind(book.category_id)
        .bind(&book.description)
        .fetch_one(&mut *conn)
        .await?;

        Ok(created)
    }

    /// One page of books ordered by title, optionally within a category
    pub async fn list(
        &self,
        page: i64,
        per_page: i64,
        category_id: Option<i32>,
    ) -> AppResult<Vec<Book>> {
        let offset = (page.max(1) - 1).saturating_mul(per_page);
        let books = sqlx::query_as::<_, Book>(
            r#"
            SELECT * FROM books
            WHERE ($3::INTEGER IS NULL OR category_id = $3)
            ORDER BY title, id
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(per_page)
        .bind(offset)
        .bind(category_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(books)
    }
}
