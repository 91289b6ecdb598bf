use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for sales agents.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(pub String);

/// Identifier wrapper for client accounts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccountId(pub String);

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Performance figures feeding the ranking score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentMetrics {
    /// Percentage in `[0, 100]`.
    pub conversion_rate: f64,
    pub total_sales: f64,
    pub closed_accounts: u32,
}

/// Partial metrics update; absent fields keep their current value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsUpdate {
    pub conversion_rate: Option<f64>,
    pub total_sales: Option<f64>,
    pub closed_accounts: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    pub name: String,
    pub email: String,
    pub active: bool,
    /// 1 is the best performer. Dense and unique after a ranking pass.
    pub current_ranking: u32,
    pub join_date: NaiveDate,
    pub metrics: AgentMetrics,
}

impl Agent {
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn update_ranking(&mut self, ranking: u32) {
        self.current_ranking = ranking;
    }

    pub fn update_metrics(&mut self, update: MetricsUpdate) {
        if let Some(conversion_rate) = update.conversion_rate {
            self.metrics.conversion_rate = conversion_rate;
        }
        if let Some(total_sales) = update.total_sales {
            self.metrics.total_sales = total_sales;
        }
        if let Some(closed_accounts) = update.closed_accounts {
            self.metrics.closed_accounts = closed_accounts;
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    #[default]
    Active,
    Inactive,
    Closed,
}

impl AccountStatus {
    pub const fn label(self) -> &'static str {
        match self {
            AccountStatus::Active => "active",
            AccountStatus::Inactive => "inactive",
            AccountStatus::Closed => "closed",
        }
    }
}

impl FromStr for AccountStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            "closed" => Ok(Self::Closed),
            other => Err(format!("unknown account status '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountPriority {
    High,
    #[default]
    Medium,
    Low,
}

impl AccountPriority {
    pub const fn label(self) -> &'static str {
        match self {
            AccountPriority::High => "high",
            AccountPriority::Medium => "medium",
            AccountPriority::Low => "low",
        }
    }
}

impl FromStr for AccountPriority {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            other => Err(format!("unknown account priority '{other}'")),
        }
    }
}

/// Client account. The owning agent is referenced by id only, so deleting an
/// agent leaves a dangling reference rather than a broken record.
///
/// `assigned_agent` and `assignment_date` are always set and cleared together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub client_name: String,
    pub potential_value: f64,
    pub segment: String,
    pub status: AccountStatus,
    pub priority: AccountPriority,
    assigned_agent: Option<AgentId>,
    assignment_date: Option<DateTime<Utc>>,
}

impl Account {
    pub fn new(
        id: AccountId,
        client_name: impl Into<String>,
        potential_value: f64,
        segment: impl Into<String>,
    ) -> Self {
        Self {
            id,
            client_name: client_name.into(),
            potential_value,
            segment: segment.into(),
            status: AccountStatus::default(),
            priority: AccountPriority::default(),
            assigned_agent: None,
            assignment_date: None,
        }
    }

    pub fn with_status(mut self, status: AccountStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_priority(mut self, priority: AccountPriority) -> Self {
        self.priority = priority;
        self
    }

    /// Restore a previously persisted assignment.
    pub fn with_assignment(mut self, agent_id: AgentId, assigned_at: DateTime<Utc>) -> Self {
        self.assign_to_agent(agent_id, assigned_at);
        self
    }

    pub fn assigned_agent(&self) -> Option<&AgentId> {
        self.assigned_agent.as_ref()
    }

    pub fn assignment_date(&self) -> Option<DateTime<Utc>> {
        self.assignment_date
    }

    pub fn is_active(&self) -> bool {
        self.status == AccountStatus::Active
    }

    pub fn is_assigned(&self) -> bool {
        self.assigned_agent.is_some()
    }

    pub fn assign_to_agent(&mut self, agent_id: AgentId, assigned_at: DateTime<Utc>) {
        self.assigned_agent = Some(agent_id);
        self.assignment_date = Some(assigned_at);
    }

    pub fn release(&mut self) {
        self.assigned_agent = None;
        self.assignment_date = None;
    }

    pub fn update_status(&mut self, status: AccountStatus) {
        self.status = status;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn assignment_fields_move_together() {
        let at = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();
        let mut account = Account::new(AccountId("acc-1".into()), "Grupo Norte", 1200.0, "enterprise");
        assert!(account.assigned_agent().is_none());
        assert!(account.assignment_date().is_none());

        account.assign_to_agent(AgentId("agent-1".into()), at);
        assert_eq!(account.assigned_agent(), Some(&AgentId("agent-1".into())));
        assert_eq!(account.assignment_date(), Some(at));

        account.release();
        assert!(!account.is_assigned());
        assert!(account.assignment_date().is_none());
    }

    #[test]
    fn metrics_update_merges_present_fields_only() {
        let mut agent = Agent {
            id: AgentId("agent-1".into()),
            name: "Ana Lopez".into(),
            email: "ana.lopez@example.com".into(),
            active: true,
            current_ranking: 3,
            join_date: NaiveDate::from_ymd_opt(2021, 5, 3).expect("valid date"),
            metrics: AgentMetrics {
                conversion_rate: 12.0,
                total_sales: 40_000.0,
                closed_accounts: 8,
            },
        };

        agent.update_metrics(MetricsUpdate {
            closed_accounts: Some(11),
            ..MetricsUpdate::default()
        });

        assert_eq!(agent.metrics.closed_accounts, 11);
        assert_eq!(agent.metrics.conversion_rate, 12.0);
        assert_eq!(agent.metrics.total_sales, 40_000.0);
    }

    #[test]
    fn status_parsing_rejects_unknown_labels() {
        assert_eq!("Closed".parse::<AccountStatus>(), Ok(AccountStatus::Closed));
        assert!("archived".parse::<AccountStatus>().is_err());
        assert_eq!(AccountPriority::default().label(), "medium");
    }
}
