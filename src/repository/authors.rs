//! Authors repository for database operations

use sqlx::{PgConnection, Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::author::{Author, CreateAuthor, UpdateAuthor},
};

#[derive(Clone)]
pub struct AuthorsRepository {
    pool: Pool<Postgres>,
}

impl AuthorsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get author by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Author> {
        sqlx::query_as::<_, Author>("SELECT * FROM authors WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Author with id {} not found", id)))
    }

    pub async fn list(&self) -> AppResult<Vec<Author>> {
        let authors = sqlx::query_as::<_, Author>(
            "SELECT * FROM authors ORDER BY last_name, first_name, id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(authors)
    }

    /// Authors of a book in credit order
    pub async fn list_for_book(&self, book_id: i32) -> AppResult<Vec<Author>> {
        let authors = sqlx::query_as::<_, Author>(
            r#"
            SELECT a.* FROM authors a
            JOIN book_authors ba ON ba.author_id = a.id
            WHERE ba.book_id = $1
            ORDER BY ba.position, a.id
            "#,
        )
        .bind(book_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(authors)
    }

    /// Fetch the given authors, failing on the first unknown id
    pub async fn get_many(&self, conn: &mut PgConnection, ids: &[i32]) -> AppResult<Vec<Author>> {
        let found = sqlx::query_as::<_, Author>("SELECT * FROM authors WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&mut *conn)
            .await?;

        ids.iter()
            .map(|id| {
                found
                    .iter()
                    .find(|a| a.id == *id)
                    .cloned()
                    .ok_or_else(|| AppError::NotFound(format!("Author with id {} not found", id)))
            })
            .collect()
    }

    pub async fn create(&self, author: &CreateAuthor) -> AppResult<Author> {
        let created = sqlx::query_as::<_, Author>(
            r#"
            INSERT INTO authors (first_name, last_name, middle_name, biography)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(&author.first_name)
        .bind(&author.last_name)
        .bind(&author.middle_name)
        .bind(&author.biography)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    pub async fn update(&self, id: i32, author: &UpdateAuthor) -> AppResult<Author> {
        sqlx::query_as::<_, Author>(
            r#"
            UPDATE authors SET
                first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                middle_name = COALESCE($4, middle_name),
                biography = COALESCE($5, biography)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&author.first_name)
        .bind(&author.last_name)
        .bind(&author.middle_name)
        .bind(&author.biography)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Author with id {} not found", id)))
    }

    /// Lock an author row for update
    pub async fn lock(&self, conn: &mut PgConnection, id: i32) -> AppResult<Author> {
        sqlx::query_as::<_, Author>("SELECT * FROM authors WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Author with id {} not found", id)))
    }

    pub async fn count_books(&self, conn: &mut PgConnection, id: i32) -> AppResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM book_authors WHERE author_id = $1")
                .bind(id)
                .fetch_one(&mut *conn)
                .await?;

        Ok(count)
    }

    pub async fn delete(&self, conn: &mut PgConnection, id: i32) -> AppResult<()> {
        sqlx::query("DELETE FROM authors WHERE id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        Ok(())
    }

    /// Credit authors on a book; position follows slice order
    pub async fn link_book(
        &self,
        conn: &mut PgConnection,
        book_id: i32,
        author_ids: &[i32],
    ) -> AppResult<()> {
        for (position, author_id) in author_ids.iter().enumerate() {
            sqlx::query(
                "INSERT INTO book_authors (book_id, author_id, position) VALUES ($1, $2, $3)",
            )
            .bind(book_id)
            .bind(author_id)
            .bind(position as i16)
            .execute(&mut *conn)
            .await?;
        }

        Ok(())
    }
}
