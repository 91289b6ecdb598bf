use async_trait::async_trait;

use super::distribution::{Distribution, DistributionId};
use super::domain::{Account, AccountId, Agent, AgentId};

/// Storage failure. Passed through unchanged by the engine.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("repository unavailable: {0}")]
    Unavailable(String),
    #[error("{0} store lock poisoned")]
    Poisoned(&'static str),
}

/// Agent storage. Lookups of unknown ids return `Ok(None)`.
#[async_trait]
pub trait AgentRepository: Send + Sync {
    async fn get_all(&self) -> Result<Vec<Agent>, RepositoryError>;
    async fn get_by_id(&self, id: &AgentId) -> Result<Option<Agent>, RepositoryError>;
    async fn get_active_agents(&self) -> Result<Vec<Agent>, RepositoryError>;
    async fn save(&self, agent: Agent) -> Result<(), RepositoryError>;
    async fn save_all(&self, agents: Vec<Agent>) -> Result<(), RepositoryError>;
    async fn delete(&self, id: &AgentId) -> Result<bool, RepositoryError>;
    async fn clear(&self) -> Result<(), RepositoryError>;
}

/// Account storage. `get_available_accounts` returns accounts whose status is active.
#[async_trait]
pub trait AccountRepository: Send + Sync {
    async fn get_all(&self) -> Result<Vec<Account>, RepositoryError>;
    async fn get_by_id(&self, id: &AccountId) -> Result<Option<Account>, RepositoryError>;
    async fn get_available_accounts(&self) -> Result<Vec<Account>, RepositoryError>;
    async fn get_by_agent(&self, agent_id: &AgentId) -> Result<Vec<Account>, RepositoryError>;
    async fn save(&self, account: Account) -> Result<(), RepositoryError>;
    async fn save_all(&self, accounts: Vec<Account>) -> Result<(), RepositoryError>;
    async fn delete(&self, id: &AccountId) -> Result<bool, RepositoryError>;
    async fn clear(&self) -> Result<(), RepositoryError>;
}

/// Distribution history. `get_latest` is the run with the greatest `distribution_date`.
#[async_trait]
pub trait DistributionRepository: Send + Sync {
    async fn save(&self, distribution: Distribution) -> Result<(), RepositoryError>;
    async fn get_latest(&self) -> Result<Option<Distribution>, RepositoryError>;
    async fn get_history(&self, limit: usize) -> Result<Vec<Distribution>, RepositoryError>;
    async fn get_by_id(&self, id: &DistributionId)
        -> Result<Option<Distribution>, RepositoryError>;
}
