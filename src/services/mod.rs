//! Business logic services

pub mod availability;
pub mod borrows;
pub mod equipment;
pub mod notify;
pub mod returns;

use std::sync::Arc;

use crate::{
    config::{EmailConfig, FeeConfig},
    error::AppResult,
    repository::Repository,
};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub equipment: equipment::EquipmentService,
    pub availability: availability::AvailabilityService,
    pub borrows: borrows::BorrowsService,
    pub returns: returns::ReturnsService,
}

impl Services {
    /// Create all services with the given repository
    pub async fn new(
        repository: Repository,
        email_config: EmailConfig,
        fee_config: FeeConfig,
    ) -> AppResult<Self> {
        let notifier: Arc<dyn notify::Notifier> =
            Arc::new(notify::EmailNotifier::new(email_config));
        let resolver: Arc<dyn notify::IdentityResolver> = Arc::new(notify::PassthroughResolver);

        let availability = availability::AvailabilityService::new(repository.clone());
        Ok(Self {
            equipment: equipment::EquipmentService::new(repository.clone(), resolver),
            borrows: borrows::BorrowsService::new(
                repository.clone(),
                availability.clone(),
                notifier.clone(),
            ),
            returns: returns::ReturnsService::new(repository, fee_config, notifier),
            availability,
        })
    }
}
