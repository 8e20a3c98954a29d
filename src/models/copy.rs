//! Book copy (physical loanable unit) model and its status transitions

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};

/// Availability status of a copy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[sqlx(type_name = "copy_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CopyStatus {
    Available,
    Loaned,
    Reserved,
    Maintenance,
    Lost,
    Damaged,
}

impl CopyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CopyStatus::Available => "available",
            CopyStatus::Loaned => "loaned",
            CopyStatus::Reserved => "reserved",
            CopyStatus::Maintenance => "maintenance",
            CopyStatus::Lost => "lost",
            CopyStatus::Damaged => "damaged",
        }
    }

    /// Whether a copy in `self` may move to `next`
    pub fn can_transition_to(self, next: CopyStatus) -> bool {
        use CopyStatus::*;
        match (self, next) {
            (Available, Loaned) | (Available, Reserved) => true,
            (Loaned, Available) | (Reserved, Available) => true,
            (Loaned, Lost) | (Loaned, Damaged) | (Available, Damaged) => true,
            (Available, Maintenance) | (Damaged, Maintenance) => true,
            (Maintenance, Available) | (Damaged, Available) => true,
            (Available, _)
            | (Loaned, _)
            | (Reserved, _)
            | (Maintenance, _)
            | (Lost, _)
            | (Damaged, _) => false,
        }
    }

    /// Validate a transition, returning the new status
    pub fn transition(self, next: CopyStatus) -> AppResult<CopyStatus> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(AppError::InvalidStateTransition(format!(
                "copy cannot move from {} to {}",
                self, next
            )))
        }
    }
}

impl std::fmt::Display for CopyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Copy model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BookCopy {
    pub id: i32,
    pub book_id: i32,
    pub acquisition_date: NaiveDate,
    pub status: CopyStatus,
    pub updated_at: DateTime<Utc>,
}

/// Add copy request
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CreateCopy {
    /// Defaults to today
    pub acquisition_date: Option<NaiveDate>,
}
