//! Ranking, hybrid allocation and rotation of client accounts across agents.

mod container;
pub mod distribution;
pub mod domain;
pub mod memory;
pub mod ranking;
pub mod report;
pub mod repository;
pub mod rotation;
pub mod service;
pub mod strategy;

#[cfg(test)]
mod tests;

pub use container::AllocationServices;
pub use distribution::{
    Assignment, Distribution, DistributionId, DistributionKind, DistributionParameters,
    WeightingSystem,
};
pub use domain::{
    Account, AccountId, AccountPriority, AccountStatus, Agent, AgentId, AgentMetrics,
    MetricsUpdate,
};
pub use memory::{InMemoryAccountRepository, InMemoryAgentRepository, InMemoryDistributionRepository};
pub use ranking::{rank_agents, score, RankingService};
pub use report::{AgentStatsRow, DistributionHeader, DistributionStats, DistributionSummary};
pub use repository::{AccountRepository, AgentRepository, DistributionRepository, RepositoryError};
pub use rotation::{
    performance_rotation_rate, select_lowest_value, RotationInterval, RotationOutcome,
    RotationRequest, RotationService, RotationType,
};
pub use service::{
    DistributionCoordinator, DistributionError, DistributionOutcome, DistributionRequest,
    Repositories,
};
pub use strategy::{AllocationError, DistributionStrategy, HybridDistributionStrategy};
