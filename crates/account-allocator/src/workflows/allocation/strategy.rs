use chrono::{DateTime, Utc};

use super::distribution::{Assignment, DistributionParameters, WeightingSystem};
use super::domain::{Account, Agent};

/// Rejected allocation input. Raised before any account is touched.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AllocationError {
    #[error("accounts must be a non-empty collection")]
    NoAccounts,
    #[error("agents must be a non-empty collection")]
    NoAgents,
    #[error("not enough accounts to distribute: {accounts} accounts for {agents} agents")]
    InsufficientAccounts { accounts: usize, agents: usize },
    #[error("equitable percentage must lie strictly between 0 and 1, got {0}")]
    InvalidEquitablePercentage(f64),
}

/// Pluggable allocation rule used by the coordinator.
pub trait DistributionStrategy: Send + Sync {
    /// Assign every account to one agent, returning one [`Assignment`] per agent
    /// in rank order. Accounts are updated in place with `assigned_at`.
    fn distribute(
        &self,
        accounts: &mut [Account],
        agents: &[Agent],
        assigned_at: DateTime<Utc>,
    ) -> Result<Vec<Assignment>, AllocationError>;

    fn parameters(&self) -> DistributionParameters;
}

/// Equitable share dealt evenly by count, remainder weighted linearly by rank.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HybridDistributionStrategy {
    equitable_percentage: f64,
}

impl HybridDistributionStrategy {
    pub fn new(equitable_percentage: f64) -> Result<Self, AllocationError> {
        if !(equitable_percentage > 0.0 && equitable_percentage < 1.0) {
            return Err(AllocationError::InvalidEquitablePercentage(
                equitable_percentage,
            ));
        }
        Ok(Self {
            equitable_percentage,
        })
    }

    pub fn equitable_percentage(&self) -> f64 {
        self.equitable_percentage
    }

    pub fn ranking_percentage(&self) -> f64 {
        1.0 - self.equitable_percentage
    }
}

impl Default for HybridDistributionStrategy {
    fn default() -> Self {
        Self {
            equitable_percentage: 0.5,
        }
    }
}

impl DistributionStrategy for HybridDistributionStrategy {
    fn distribute(
        &self,
        accounts: &mut [Account],
        agents: &[Agent],
        assigned_at: DateTime<Utc>,
    ) -> Result<Vec<Assignment>, AllocationError> {
        validate_inputs(accounts, agents)?;

        let ranked = sorted_by_ranking(agents);
        let total = accounts.len();
        let total_equitable = (total as f64 * self.equitable_percentage).floor() as usize;
        let per_agent = total_equitable / ranked.len();
        let total_ranking = total - total_equitable;

        let mut book = Ledger {
            accounts,
            claimed: vec![false; total],
            assigned_at,
            assignments: ranked
                .iter()
                .map(|agent| Assignment::empty(agent.id.clone()))
                .collect(),
        };

        book.deal_equitable(per_agent);
        let cursor = book.deal_by_ranking(total_equitable, total_ranking);
        book.deal_residual(cursor);

        Ok(book.assignments)
    }

    fn parameters(&self) -> DistributionParameters {
        DistributionParameters {
            equitable_percentage: self.equitable_percentage,
            ranking_percentage: self.ranking_percentage(),
            weighting_system: WeightingSystem::Linear,
        }
    }
}

fn validate_inputs(accounts: &[Account], agents: &[Agent]) -> Result<(), AllocationError> {
    if accounts.is_empty() {
        return Err(AllocationError::NoAccounts);
    }
    if agents.is_empty() {
        return Err(AllocationError::NoAgents);
    }
    if accounts.len() < agents.len() {
        return Err(AllocationError::InsufficientAccounts {
            accounts: accounts.len(),
            agents: agents.len(),
        });
    }
    Ok(())
}

/// Rank 1 first; agents sharing a rank keep their input order.
fn sorted_by_ranking(agents: &[Agent]) -> Vec<&Agent> {
    let mut ranked: Vec<&Agent> = agents.iter().collect();
    ranked.sort_by_key(|agent| agent.current_ranking);
    ranked
}

/// Linear weights, `len` for the best agent down to 1 for the worst.
pub(crate) fn linear_weights(agents: usize) -> Vec<usize> {
    (0..agents).map(|position| agents - position).collect()
}

struct Ledger<'a> {
    accounts: &'a mut [Account],
    claimed: Vec<bool>,
    assigned_at: DateTime<Utc>,
    assignments: Vec<Assignment>,
}

impl Ledger<'_> {
    fn claim(&mut self, index: usize, slot: usize, equitable: bool) {
        let agent_id = self.assignments[slot].agent_id.clone();
        let account = &mut self.accounts[index];
        account.assign_to_agent(agent_id, self.assigned_at);
        self.claimed[index] = true;

        let account_id = account.id.clone();
        if equitable {
            self.assignments[slot].record_equitable(account_id);
        } else {
            self.assignments[slot].record_ranking(account_id);
        }
    }

    /// Consecutive blocks of `per_agent` accounts, one block per agent in rank order.
    fn deal_equitable(&mut self, per_agent: usize) {
        let total = self.accounts.len();
        let mut cursor = 0;
        for slot in 0..self.assignments.len() {
            let end = (cursor + per_agent).min(total);
            for index in cursor..end {
                self.claim(index, slot, true);
            }
            cursor += per_agent;
        }
    }

    /// Starts at `floor(total * equitable_percentage)` and advances by the
    /// rounded share of each agent even when the slice runs past the end.
    /// Returns the final cursor.
    fn deal_by_ranking(&mut self, start: usize, total_ranking: usize) -> usize {
        let total = self.accounts.len();
        let weights = linear_weights(self.assignments.len());
        let total_weight: usize = weights.iter().sum();

        let mut cursor = start;
        for (slot, weight) in weights.into_iter().enumerate() {
            let share = weight as f64 / total_weight as f64;
            let to_assign = (total_ranking as f64 * share).round() as usize;

            let from = cursor.min(total);
            let to = (cursor + to_assign).min(total);
            for index in from..to {
                self.claim(index, slot, false);
            }
            cursor += to_assign;
        }
        cursor
    }

    /// Round-robin from the best agent: first the tail past `cursor`, then,
    /// continuing the same rotation, the truncation gap the equitable phase
    /// skipped.
    fn deal_residual(&mut self, cursor: usize) {
        let total = self.accounts.len();
        let slots = self.assignments.len();
        let tail = cursor.min(total)..total;
        let gap = (0..cursor.min(total)).filter(|&index| !self.claimed[index]);
        let residual: Vec<usize> = tail.chain(gap).collect();

        if !residual.is_empty() {
            tracing::debug!(
                residual = residual.len(),
                cursor,
                "dealing residual accounts round-robin"
            );
        }

        for (turn, index) in residual.into_iter().enumerate() {
            self.claim(index, turn % slots, false);
        }
    }
}
