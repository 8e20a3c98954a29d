//! Reservation model: a member's claim on a book pending availability

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[sqlx(type_name = "reservation_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatus {
    Pending,
    Ready,
    Completed,
    Cancelled,
    Expired,
}

impl ReservationStatus {
    /// Initial status for a new reservation
    pub fn initial(copy_available: bool) -> Self {
        if copy_available {
            ReservationStatus::Ready
        } else {
            ReservationStatus::Pending
        }
    }

    pub fn is_terminal(self) -> bool {
        match self {
            ReservationStatus::Pending | ReservationStatus::Ready => false,
            ReservationStatus::Completed
            | ReservationStatus::Cancelled
            | ReservationStatus::Expired => true,
        }
    }

    pub fn can_transition_to(self, next: ReservationStatus) -> bool {
        use ReservationStatus::*;
        match (self, next) {
            (Pending, Ready) | (Pending, Cancelled) | (Pending, Expired) => true,
            (Ready, Completed) | (Ready, Cancelled) | (Ready, Expired) => true,
            (Pending, _) | (Ready, _) => false,
            (Completed, _) | (Cancelled, _) | (Expired, _) => false,
        }
    }
}

/// Reservation model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Reservation {
    pub id: i32,
    pub book_id: i32,
    pub member_id: i32,
    pub reservation_date: DateTime<Utc>,
    pub expiry_date: DateTime<Utc>,
    pub status: ReservationStatus,
    pub completed_at: Option<DateTime<Utc>>,
    pub loan_id: Option<i32>,
    pub notes: Option<String>,
}

impl Reservation {
    pub fn ensure_cancellable(&self) -> AppResult<()> {
        if self.status.can_transition_to(ReservationStatus::Cancelled) {
            Ok(())
        } else {
            Err(AppError::NotCancellable(self.id))
        }
    }

    /// Only a ready reservation whose hold has not lapsed can be checked out
    pub fn ensure_ready(&self, now: DateTime<Utc>) -> AppResult<()> {
        if self.status == ReservationStatus::Ready && now <= self.expiry_date {
            Ok(())
        } else {
            Err(AppError::NotReady(self.id))
        }
    }

    pub fn ensure_pending(&self) -> AppResult<()> {
        if self.status == ReservationStatus::Pending {
            Ok(())
        } else {
            Err(AppError::InvalidStateTransition(format!(
                "reservation {} is {:?}, expected pending",
                self.id, self.status
            )))
        }
    }
}

/// Expiry of a hold starting at `from`
pub fn hold_expiry(from: DateTime<Utc>, hold_days: i64) -> DateTime<Utc> {
    from + Duration::days(hold_days)
}

/// Reservation request
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateReservation {
    pub book_id: i32,
    /// Defaults to the caller's own member id
    pub member_id: Option<i32>,
    pub notes: Option<String>,
}

/// Reservation listing filter
#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ReservationQuery {
    pub book_id: Option<i32>,
    pub member_id: Option<i32>,
    pub status: Option<ReservationStatus>,
}
