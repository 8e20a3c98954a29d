//! Book (catalog record) model and related types

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::{author::Author, category::Category, copy::BookCopy};

/// Book model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub isbn: Option<String>,
    pub publisher: Option<String>,
    pub publication_date: Option<NaiveDate>,
    pub category_id: Option<i32>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Book with its authors, category, copies and availability
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BookDetails {
    #[serde(flatten)]
    pub book: Book,
    pub category: Option<Category>,
    pub authors: Vec<Author>,
    pub copies: Vec<BookCopy>,
    pub nb_available: i64,
}

/// Create book request
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct CreateBook {
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    #[validate(length(max = 32))]
    pub isbn: Option<String>,
    #[validate(length(max = 255))]
    pub publisher: Option<String>,
    pub publication_date: Option<NaiveDate>,
    pub category_id: Option<i32>,
    pub description: Option<String>,
    /// Authors in credit order
    #[serde(default)]
    #[validate(length(max = 20))]
    pub author_ids: Vec<i32>,
    /// Number of copies to create with the book
    #[validate(range(min = 1, max = 500))]
    pub copies: i32,
    /// Acquisition date of the initial copies, defaults to today
    pub acquisition_date: Option<NaiveDate>,
}

impl CreateBook {
    /// Author ids in credit order, first mention wins
    pub fn credited_authors(&self) -> Vec<i32> {
        let mut ids = Vec::with_capacity(self.author_ids.len());
        for id in &self.author_ids {
            if !ids.contains(id) {
                ids.push(*id);
            }
        }
        ids
    }
}

/// Book listing parameters
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BookQuery {
    /// Page number (default: 1)
    pub page: Option<i64>,
    /// Books per page (default: 20)
    pub per_page: Option<i64>,
    /// Only books of this category
    pub category_id: Option<i32>,
}
