use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info};

use super::distribution::{Distribution, DistributionId, DistributionKind};
use super::domain::Account;
use super::ranking::RankingService;
use super::report::{build_stats, DistributionStats};
use super::repository::{
    AccountRepository, AgentRepository, DistributionRepository, RepositoryError,
};
use super::strategy::{AllocationError, DistributionStrategy};

/// Shared handles to the three stores the engine reads and writes.
#[derive(Clone)]
pub struct Repositories {
    pub agents: Arc<dyn AgentRepository>,
    pub accounts: Arc<dyn AccountRepository>,
    pub distributions: Arc<dyn DistributionRepository>,
}

/// Error raised by the coordinator and the rotation service.
#[derive(Debug, thiserror::Error)]
pub enum DistributionError {
    #[error(transparent)]
    Validation(#[from] AllocationError),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error(transparent)]
    Storage(#[from] RepositoryError),
}

impl DistributionError {
    /// Bad input as opposed to a storage failure.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            DistributionError::Validation(_) | DistributionError::InvalidArgument(_)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DistributionRequest {
    pub update_rankings: bool,
    pub kind: DistributionKind,
    pub rotated_accounts: Option<usize>,
}

impl Default for DistributionRequest {
    fn default() -> Self {
        Self {
            update_rankings: true,
            kind: DistributionKind::Initial,
            rotated_accounts: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DistributionOutcome {
    pub distribution: Distribution,
    pub total_accounts: usize,
    pub assignments_count: usize,
}

/// Runs ranking, allocation and persistence for one distribution.
///
/// Runs are not serialized internally: two concurrent runs against the same
/// repositories give undefined results, so callers trigger one job at a time.
pub struct DistributionCoordinator {
    strategy: Arc<dyn DistributionStrategy>,
    ranking: Arc<RankingService>,
    repositories: Repositories,
    batch_size: usize,
}

impl DistributionCoordinator {
    pub fn new(
        strategy: Arc<dyn DistributionStrategy>,
        ranking: Arc<RankingService>,
        repositories: Repositories,
        batch_size: usize,
    ) -> Self {
        Self {
            strategy,
            ranking,
            repositories,
            batch_size: batch_size.max(1),
        }
    }

    /// Allocate every active account across all stored agents.
    ///
    /// The distribution is saved before the accounts. A failure between the two
    /// writes leaves accounts without a matching distribution record.
    pub async fn execute(
        &self,
        request: DistributionRequest,
    ) -> Result<DistributionOutcome, DistributionError> {
        if request.update_rankings {
            self.ranking.calculate_rankings(None).await?;
        }

        let mut accounts = self.repositories.accounts.get_available_accounts().await?;
        let agents = self.repositories.agents.get_all().await?;

        let now = Utc::now();
        let assignments = self.strategy.distribute(&mut accounts, &agents, now)?;

        let distribution = Distribution {
            id: DistributionId::generate(),
            distribution_date: now,
            kind: request.kind,
            assignments,
            parameters: self.strategy.parameters(),
            rotated_accounts: request.rotated_accounts,
        };

        self.repositories
            .distributions
            .save(distribution.clone())
            .await?;
        self.save_accounts(accounts).await?;

        let total_accounts = distribution.total_accounts();
        let assignments_count = distribution.assignments.len();
        info!(
            id = %distribution.id,
            kind = distribution.kind.label(),
            total_accounts,
            agents = assignments_count,
            "distribution persisted"
        );

        Ok(DistributionOutcome {
            distribution,
            total_accounts,
            assignments_count,
        })
    }

    /// Persist accounts in chunks of the configured batch size.
    pub(crate) async fn save_accounts(&self, accounts: Vec<Account>) -> Result<(), RepositoryError> {
        let mut remaining = accounts;
        while !remaining.is_empty() {
            let rest = remaining.split_off(remaining.len().min(self.batch_size));
            debug!(batch = remaining.len(), "saving account batch");
            self.repositories.accounts.save_all(remaining).await?;
            remaining = rest;
        }
        Ok(())
    }

    pub async fn latest(&self) -> Result<Option<Distribution>, RepositoryError> {
        self.repositories.distributions.get_latest().await
    }

    pub async fn history(&self, limit: usize) -> Result<Vec<Distribution>, RepositoryError> {
        self.repositories.distributions.get_history(limit).await
    }

    pub async fn by_id(&self, id: &DistributionId) -> Result<Option<Distribution>, RepositoryError> {
        self.repositories.distributions.get_by_id(id).await
    }

    /// Per-agent report for the latest distribution; `None` before the first run.
    pub async fn stats(&self) -> Result<Option<DistributionStats>, RepositoryError> {
        let Some(distribution) = self.latest().await? else {
            debug!("no distribution recorded yet");
            return Ok(None);
        };
        let agents = self.repositories.agents.get_all().await?;
        Ok(Some(build_stats(&distribution, &agents)))
    }
}
