use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::domain::{AccountId, AgentId};

/// Identifier wrapper for distribution runs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DistributionId(pub String);

impl DistributionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl fmt::Display for DistributionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What triggered a distribution run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistributionKind {
    #[default]
    Initial,
    FullRotation,
    PartialRotation,
    PerformanceRotation,
}

impl DistributionKind {
    pub const fn label(self) -> &'static str {
        match self {
            DistributionKind::Initial => "initial",
            DistributionKind::FullRotation => "full_rotation",
            DistributionKind::PartialRotation => "partial_rotation",
            DistributionKind::PerformanceRotation => "performance_rotation",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightingSystem {
    #[default]
    Linear,
}

/// Strategy configuration captured alongside each run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DistributionParameters {
    pub equitable_percentage: f64,
    pub ranking_percentage: f64,
    pub weighting_system: WeightingSystem,
}

/// Per-agent outcome of a run.
///
/// `total_accounts == equitable_accounts + ranking_accounts == accounts_list.len()`
/// holds for every value built through the recording methods.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub agent_id: AgentId,
    pub equitable_accounts: usize,
    pub ranking_accounts: usize,
    pub total_accounts: usize,
    pub accounts_list: Vec<AccountId>,
}

impl Assignment {
    pub fn empty(agent_id: AgentId) -> Self {
        Self {
            agent_id,
            equitable_accounts: 0,
            ranking_accounts: 0,
            total_accounts: 0,
            accounts_list: Vec::new(),
        }
    }

    pub(crate) fn record_equitable(&mut self, account: AccountId) {
        self.equitable_accounts += 1;
        self.total_accounts += 1;
        self.accounts_list.push(account);
    }

    pub(crate) fn record_ranking(&mut self, account: AccountId) {
        self.ranking_accounts += 1;
        self.total_accounts += 1;
        self.accounts_list.push(account);
    }
}

/// Immutable record of one allocation run. A new run always produces a new value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Distribution {
    pub id: DistributionId,
    pub distribution_date: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: DistributionKind,
    /// Ordered by agent rank, best first.
    pub assignments: Vec<Assignment>,
    pub parameters: DistributionParameters,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotated_accounts: Option<usize>,
}

impl Distribution {
    pub fn total_accounts(&self) -> usize {
        self.assignments
            .iter()
            .map(|assignment| assignment.total_accounts)
            .sum()
    }

    pub fn assignment_for(&self, agent_id: &AgentId) -> Option<&Assignment> {
        self.assignments
            .iter()
            .find(|assignment| &assignment.agent_id == agent_id)
    }
}
