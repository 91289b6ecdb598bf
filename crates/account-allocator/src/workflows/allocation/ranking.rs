use std::sync::Arc;

use tracing::{debug, info};

use super::domain::{Agent, AgentId, AgentMetrics};
use super::repository::{AgentRepository, RepositoryError};

const CONVERSION_WEIGHT: f64 = 0.4;
const SALES_WEIGHT: f64 = 0.4;
const CLOSED_ACCOUNTS_WEIGHT: f64 = 0.2;

/// Weighted performance score. Sales are counted in thousands and closed
/// accounts in tens so the three inputs land on comparable scales.
pub fn score(metrics: &AgentMetrics) -> f64 {
    metrics.conversion_rate * CONVERSION_WEIGHT
        + (metrics.total_sales / 1000.0) * SALES_WEIGHT
        + (f64::from(metrics.closed_accounts) / 10.0) * CLOSED_ACCOUNTS_WEIGHT
}

/// Sort by score, best first, and stamp `current_ranking = position + 1`.
/// Equal scores keep their input order.
pub fn rank_agents(agents: Vec<Agent>) -> Vec<Agent> {
    let mut scored: Vec<(f64, Agent)> = agents
        .into_iter()
        .map(|agent| (score(&agent.metrics), agent))
        .collect();
    scored.sort_by(|(left, _), (right, _)| right.total_cmp(left));

    scored
        .into_iter()
        .enumerate()
        .map(|(position, (_, mut agent))| {
            agent.update_ranking(position as u32 + 1);
            agent
        })
        .collect()
}

/// Recomputes rankings and answers ranking lookups against the agent store.
pub struct RankingService {
    agents: Arc<dyn AgentRepository>,
}

impl RankingService {
    pub fn new(agents: Arc<dyn AgentRepository>) -> Self {
        Self { agents }
    }

    /// Rank `agents`, or every stored agent when `None`, and persist the result.
    pub async fn calculate_rankings(
        &self,
        agents: Option<Vec<Agent>>,
    ) -> Result<Vec<Agent>, RepositoryError> {
        let agents = match agents {
            Some(agents) => agents,
            None => self.agents.get_all().await?,
        };

        let ranked = rank_agents(agents);
        self.agents.save_all(ranked.clone()).await?;

        if let Some(leader) = ranked.first() {
            info!(agents = ranked.len(), leader = %leader.id, "agent rankings recomputed");
        } else {
            debug!("no agents to rank");
        }
        Ok(ranked)
    }

    /// Active agents ordered by ranking, best first.
    pub async fn top_performers(&self, limit: usize) -> Result<Vec<Agent>, RepositoryError> {
        let mut agents: Vec<Agent> = self
            .agents
            .get_all()
            .await?
            .into_iter()
            .filter(Agent::is_active)
            .collect();
        agents.sort_by_key(|agent| agent.current_ranking);
        agents.truncate(limit);
        Ok(agents)
    }

    pub async fn agent_ranking(&self, id: &AgentId) -> Result<Option<u32>, RepositoryError> {
        Ok(self
            .agents
            .get_by_id(id)
            .await?
            .map(|agent| agent.current_ranking))
    }
}
