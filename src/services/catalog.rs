//! Catalog management service: books with their authors, categories and
//! copies, and the member register

use chrono::Utc;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        author::{Author, CreateAuthor, UpdateAuthor},
        book::{Book, BookDetails, BookQuery, CreateBook},
        category::{Category, CreateCategory},
        copy::{BookCopy, CopyStatus, CreateCopy},
        member::{CreateMember, Member},
        principal::Principal,
    },
    repository::Repository,
    services::{copies::CopyTracker, reservations::ReservationsService},
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
    copies: CopyTracker,
    reservations: ReservationsService,
}

impl CatalogService {
    pub fn new(
        repository: Repository,
        copies: CopyTracker,
        reservations: ReservationsService,
    ) -> Self {
        Self {
            repository,
            copies,
            reservations,
        }
    }

    // ---------------------------------------------------------------------
    // Books
    // ---------------------------------------------------------------------

    pub async fn list_books(&self, query: &BookQuery) -> AppResult<Vec<Book>> {
        self.repository
            .books
            .list(
                query.page.unwrap_or(1).max(1),
                query.per_page.unwrap_or(20).clamp(1, 200),
                query.category_id,
            )
            .await
    }

    /// Get a book with its authors, category and copies
    pub async fn get_book(&self, id: i32) -> AppResult<BookDetails> {
        let book = self.repository.books.get_by_id(id).await?;
        let category = match book.category_id {
            Some(category_id) => Some(self.repository.categories.get_by_id(category_id).await?),
            None => None,
        };
        let authors = self.repository.authors.list_for_book(id).await?;
        let copies = self.repository.copies.list_for_book(id).await?;
        let nb_available = self.repository.copies.count_available(id).await?;
        Ok(BookDetails {
            book,
            category,
            authors,
            copies,
            nb_available,
        })
    }

    /// Create a book together with its initial copies
    pub async fn create_book(&self, actor: &Principal, book: CreateBook) -> AppResult<BookDetails> {
        actor.require_staff()?;
        book.validate()?;

        let mut tx = self.repository.pool.begin().await?;
        let category = match book.category_id {
            Some(category_id) => Some(self.repository.categories.get_in(&mut tx, category_id).await?),
            None => None,
        };
        let author_ids = book.credited_authors();
        let authors = self.repository.authors.get_many(&mut tx, &author_ids).await?;

        let created = self.repository.books.create(&mut tx, &book).await?;
        self.repository
            .authors
            .link_book(&mut tx, created.id, &author_ids)
            .await?;
        let mut copies = Vec::with_capacity(book.copies as usize);
        for _ in 0..book.copies {
            copies.push(
                self.repository
                    .copies
                    .create(&mut tx, created.id, book.acquisition_date)
                    .await?,
            );
        }
        tx.commit().await?;

        tracing::info!(book_id = created.id, copies = copies.len(), "Book created");
        let nb_available = copies.len() as i64;
        Ok(BookDetails {
            book: created,
            category,
            authors,
            copies,
            nb_available,
        })
    }

    // ---------------------------------------------------------------------
    // Authors
    // ---------------------------------------------------------------------

    pub async fn list_authors(&self) -> AppResult<Vec<Author>> {
        self.repository.authors.list().await
    }

    pub async fn get_author(&self, id: i32) -> AppResult<Author> {
        self.repository.authors.get_by_id(id).await
    }

    pub async fn create_author(&self, actor: &Principal, author: CreateAuthor) -> AppResult<Author> {
        actor.require_staff()?;
        author.validate()?;

        let created = self.repository.authors.create(&author).await?;
        tracing::info!(author_id = created.id, "Author created");
        Ok(created)
    }

    pub async fn update_author(
        &self,
        actor: &Principal,
        id: i32,
        author: UpdateAuthor,
    ) -> AppResult<Author> {
        actor.require_staff()?;
        author.validate()?;

        self.repository.authors.update(id, &author).await
    }

    /// Remove an author no book credits
    pub async fn delete_author(&self, actor: &Principal, id: i32) -> AppResult<()> {
        actor.require_staff()?;

        let mut tx = self.repository.pool.begin().await?;
        self.repository.authors.lock(&mut tx, id).await?;
        if self.repository.authors.count_books(&mut tx, id).await? > 0 {
            return Err(AppError::HasBooks(id));
        }
        self.repository.authors.delete(&mut tx, id).await?;
        tx.commit().await?;

        tracing::info!(author_id = id, "Author deleted");
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Categories
    // ---------------------------------------------------------------------

    pub async fn list_categories(&self) -> AppResult<Vec<Category>> {
        self.repository.categories.list().await
    }

    pub async fn get_category(&self, id: i32) -> AppResult<Category> {
        self.repository.categories.get_by_id(id).await
    }

    pub async fn create_category(
        &self,
        actor: &Principal,
        category: CreateCategory,
    ) -> AppResult<Category> {
        actor.require_staff()?;
        category.validate()?;

        let created = self
            .repository
            .categories
            .create(&category)
            .await
            .map_err(|e| match e {
                AppError::Conflict(_) => {
                    AppError::Validation(format!("Category {} already exists", category.name))
                }
                other => other,
            })?;

        tracing::info!(category_id = created.id, name = %created.name, "Category created");
        Ok(created)
    }

    // ---------------------------------------------------------------------
    // Copies
    // ---------------------------------------------------------------------

    pub async fn get_copy(&self, id: i32) -> AppResult<BookCopy> {
        self.repository.copies.get_by_id(id).await
    }

    /// Add a copy to a book; a waiting reservation may become ready
    pub async fn add_copy(
        &self,
        actor: &Principal,
        book_id: i32,
        copy: CreateCopy,
    ) -> AppResult<BookCopy> {
        actor.require_staff()?;

        let mut tx = self.repository.pool.begin().await?;
        self.repository.books.ensure_exists(&mut tx, book_id).await?;
        let created = self
            .repository
            .copies
            .create(&mut tx, book_id, copy.acquisition_date)
            .await?;
        self.reservations
            .fulfill_next_pending(&mut tx, book_id, Utc::now())
            .await?;
        tx.commit().await?;

        tracing::info!(copy_id = created.id, book_id, "Copy added");
        Ok(created)
    }

    /// Remove a copy that was never lent and is not out
    pub async fn delete_copy(&self, actor: &Principal, id: i32) -> AppResult<()> {
        actor.require_staff()?;

        let mut tx = self.repository.pool.begin().await?;
        let copy = self.repository.copies.lock(&mut tx, id).await?;
        if matches!(copy.status, CopyStatus::Loaned | CopyStatus::Reserved) {
            return Err(AppError::InvalidStateTransition(format!(
                "copy {} is {}, cannot be removed",
                id, copy.status
            )));
        }
        if self.repository.copies.count_loans(&mut tx, id).await? > 0 {
            return Err(AppError::HasLoans(id));
        }
        self.repository.copies.delete(&mut tx, id).await?;
        tx.commit().await?;

        tracing::info!(copy_id = id, book_id = copy.book_id, "Copy deleted");
        Ok(())
    }

    /// Flag a shelved copy as damaged
    pub async fn mark_damaged(&self, actor: &Principal, id: i32) -> AppResult<BookCopy> {
        actor.require_staff()?;

        let mut tx = self.repository.pool.begin().await?;
        let copy = self.copies.mark_damaged(&mut tx, id).await?;
        tx.commit().await?;
        Ok(copy)
    }

    pub async fn send_to_maintenance(&self, actor: &Principal, id: i32) -> AppResult<BookCopy> {
        actor.require_staff()?;

        let mut tx = self.repository.pool.begin().await?;
        let copy = self.copies.send_to_maintenance(&mut tx, id).await?;
        tx.commit().await?;
        Ok(copy)
    }

    /// Put a repaired copy back in circulation and serve the reservation queue
    pub async fn return_to_shelf(&self, actor: &Principal, id: i32) -> AppResult<BookCopy> {
        actor.require_staff()?;

        let mut tx = self.repository.pool.begin().await?;
        let copy = self.copies.return_to_shelf(&mut tx, id).await?;
        self.reservations
            .fulfill_next_pending(&mut tx, copy.book_id, Utc::now())
            .await?;
        tx.commit().await?;
        Ok(copy)
    }

    // ---------------------------------------------------------------------
    // Members
    // ---------------------------------------------------------------------

    pub async fn get_member(&self, actor: &Principal, id: i32) -> AppResult<Member> {
        actor.require_member_access(id)?;
        self.repository.members.get_by_id(id).await
    }

    pub async fn create_member(&self, actor: &Principal, member: CreateMember) -> AppResult<Member> {
        actor.require_staff()?;
        member.validate()?;

        let created = self
            .repository
            .members
            .create(&member)
            .await
            .map_err(|e| match e {
                AppError::Conflict(_) => {
                    AppError::Validation(format!("Email {} is already registered", member.email))
                }
                other => other,
            })?;

        tracing::info!(member_id = created.id, "Member registered");
        Ok(created)
    }
}
