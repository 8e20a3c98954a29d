//! Repository layer for database operations.
//!
//! Reads that stand alone run on the pool. Every method that takes a
//! `&mut PgConnection` is meant to run inside the caller's transaction, so
//! that a service operation commits all of its writes or none of them.

pub mod authors;
pub mod books;
pub mod categories;
pub mod copies;
pub mod ledger;
pub mod loans;
pub mod members;
pub mod reservations;

use sqlx::{Pool, Postgres};

/// Main repository struct holding database connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
    pub authors: authors::AuthorsRepository,
    pub books: books::BooksRepository,
    pub categories: categories::CategoriesRepository,
    pub copies: copies::CopiesRepository,
    pub members: members::MembersRepository,
    pub loans: loans::LoansRepository,
    pub reservations: reservations::ReservationsRepository,
    pub ledger: ledger::LedgerRepository,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            authors: authors::AuthorsRepository::new(pool.clone()),
            books: books::BooksRepository::new(pool.clone()),
            categories: categories::CategoriesRepository::new(pool.clone()),
            copies: copies::CopiesRepository::new(pool.clone()),
            members: members::MembersRepository::new(pool.clone()),
            loans: loans::LoansRepository::new(pool.clone()),
            reservations: reservations::ReservationsRepository::new(pool.clone()),
            ledger: ledger::LedgerRepository::new(pool.clone()),
            pool,
        }
    }
}
