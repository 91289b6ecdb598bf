use std::sync::Arc;

use crate::config::AllocationConfig;

use super::memory::{InMemoryAccountRepository, InMemoryAgentRepository, InMemoryDistributionRepository};
use super::ranking::RankingService;
use super::rotation::RotationService;
use super::service::{DistributionCoordinator, Repositories};
use super::strategy::{AllocationError, HybridDistributionStrategy};

/// Services wired once at start-up and shared by reference afterwards.
#[derive(Clone)]
pub struct AllocationServices {
    pub repositories: Repositories,
    pub ranking: Arc<RankingService>,
    pub coordinator: Arc<DistributionCoordinator>,
    pub rotation: Arc<RotationService>,
}

impl AllocationServices {
    pub fn build(
        config: &AllocationConfig,
        repositories: Repositories,
    ) -> Result<Self, AllocationError> {
        let strategy = Arc::new(HybridDistributionStrategy::new(
            config.equitable_percentage,
        )?);
        let ranking = Arc::new(RankingService::new(repositories.agents.clone()));
        let coordinator = Arc::new(DistributionCoordinator::new(
            strategy,
            ranking.clone(),
            repositories.clone(),
            config.batch_size,
        ));
        let rotation = Arc::new(RotationService::new(
            coordinator.clone(),
            repositories.clone(),
            config.rotation_percentage,
        ));

        Ok(Self {
            repositories,
            ranking,
            coordinator,
            rotation,
        })
    }

    /// Wire everything against fresh in-memory stores.
    pub fn in_memory(config: &AllocationConfig) -> Result<Self, AllocationError> {
        let repositories = Repositories {
            agents: Arc::new(InMemoryAgentRepository::default()),
            accounts: Arc::new(InMemoryAccountRepository::default()),
            distributions: Arc::new(InMemoryDistributionRepository::with_retention(
                config.history_limit,
            )),
        };
        Self::build(config, repositories)
    }
}
