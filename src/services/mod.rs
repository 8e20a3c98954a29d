//! Business logic services

pub mod catalog;
pub mod copies;
pub mod ledger;
pub mod loans;
pub mod reservations;

use crate::{config::CirculationConfig, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub catalog: catalog::CatalogService,
    pub copies: copies::CopyTracker,
    pub ledger: ledger::LedgerService,
    pub loans: loans::LoansService,
    pub reservations: reservations::ReservationsService,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, circulation: CirculationConfig) -> Self {
        let copies = copies::CopyTracker::new(repository.clone());
        let ledger = ledger::LedgerService::new(repository.clone());
        let reservations = reservations::ReservationsService::new(
            repository.clone(),
            copies.clone(),
            circulation.clone(),
        );

        Self {
            catalog: catalog::CatalogService::new(
                repository.clone(),
                copies.clone(),
                reservations.clone(),
            ),
            loans: loans::LoansService::new(
                repository,
                copies.clone(),
                ledger.clone(),
                reservations.clone(),
                circulation,
            ),
            copies,
            ledger,
            reservations,
        }
    }
}
