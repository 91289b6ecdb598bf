use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::distribution::{Distribution, DistributionId, DistributionKind, DistributionParameters};
use super::domain::{Agent, AgentId, AgentMetrics};

const UNKNOWN_AGENT: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistributionHeader {
    pub id: DistributionId,
    pub date: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: DistributionKind,
    pub parameters: DistributionParameters,
}

/// One agent's share of the latest run. Agents deleted after the run report
/// as `"Unknown"` with ranking 0 and no metrics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentStatsRow {
    pub agent_id: AgentId,
    pub agent_name: String,
    pub ranking: u32,
    pub equitable_accounts: usize,
    pub ranking_accounts: usize,
    pub total_accounts: usize,
    pub metrics: Option<AgentMetrics>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DistributionSummary {
    pub total_accounts: usize,
    pub avg_accounts: f64,
    /// Population standard deviation of per-agent totals.
    pub std_deviation: f64,
    pub min_accounts: usize,
    pub max_accounts: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistributionStats {
    pub distribution: DistributionHeader,
    pub stats: Vec<AgentStatsRow>,
    pub summary: DistributionSummary,
}

pub fn build_stats(distribution: &Distribution, agents: &[Agent]) -> DistributionStats {
    let by_id: HashMap<&AgentId, &Agent> = agents.iter().map(|agent| (&agent.id, agent)).collect();

    let mut stats: Vec<AgentStatsRow> = distribution
        .assignments
        .iter()
        .map(|assignment| {
            let agent = by_id.get(&assignment.agent_id);
            AgentStatsRow {
                agent_id: assignment.agent_id.clone(),
                agent_name: agent
                    .map(|agent| agent.name.clone())
                    .unwrap_or_else(|| UNKNOWN_AGENT.to_string()),
                ranking: agent.map(|agent| agent.current_ranking).unwrap_or(0),
                equitable_accounts: assignment.equitable_accounts,
                ranking_accounts: assignment.ranking_accounts,
                total_accounts: assignment.total_accounts,
                metrics: agent.map(|agent| agent.metrics),
            }
        })
        .collect();
    stats.sort_by_key(|row| row.ranking);

    let totals: Vec<usize> = stats.iter().map(|row| row.total_accounts).collect();
    let summary = summarize(&totals);

    DistributionStats {
        distribution: DistributionHeader {
            id: distribution.id.clone(),
            date: distribution.distribution_date,
            kind: distribution.kind,
            parameters: distribution.parameters,
        },
        stats,
        summary,
    }
}

fn summarize(totals: &[usize]) -> DistributionSummary {
    if totals.is_empty() {
        return DistributionSummary::default();
    }

    let total: usize = totals.iter().sum();
    let count = totals.len() as f64;
    let mean = total as f64 / count;
    let variance = totals
        .iter()
        .map(|&value| (value as f64 - mean).powi(2))
        .sum::<f64>()
        / count;

    DistributionSummary {
        total_accounts: total,
        avg_accounts: round_to_cents(mean),
        std_deviation: round_to_cents(variance.sqrt()),
        min_accounts: totals.iter().copied().min().unwrap_or(0),
        max_accounts: totals.iter().copied().max().unwrap_or(0),
    }
}

fn round_to_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
