use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer};

use crate::workflows::allocation::domain::{
    Account, AccountId, AccountPriority, AccountStatus, Agent, AgentId, AgentMetrics,
};

#[derive(Debug, Deserialize)]
pub(crate) struct AgentRow {
    id: String,
    name: String,
    #[serde(default)]
    email: String,
    #[serde(default = "default_active")]
    active: bool,
    #[serde(default)]
    current_ranking: u32,
    join_date: String,
    #[serde(default)]
    conversion_rate: f64,
    #[serde(default)]
    total_sales: f64,
    #[serde(default)]
    closed_accounts: u32,
}

fn default_active() -> bool {
    true
}

impl AgentRow {
    pub(crate) fn into_agent(self) -> Result<Agent, String> {
        if self.id.is_empty() {
            return Err("agent id is empty".to_string());
        }
        if !(0.0..=100.0).contains(&self.conversion_rate) {
            return Err(format!(
                "conversion_rate {} is outside 0..=100",
                self.conversion_rate
            ));
        }
        if !(self.total_sales.is_finite() && self.total_sales >= 0.0) {
            return Err(format!("total_sales {} must be non-negative", self.total_sales));
        }
        let join_date = parse_date(&self.join_date)
            .ok_or_else(|| format!("join_date '{}' is not YYYY-MM-DD", self.join_date))?;

        Ok(Agent {
            id: AgentId(self.id),
            name: self.name,
            email: self.email,
            active: self.active,
            current_ranking: self.current_ranking,
            join_date,
            metrics: AgentMetrics {
                conversion_rate: self.conversion_rate,
                total_sales: self.total_sales,
                closed_accounts: self.closed_accounts,
            },
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct AccountRow {
    id: String,
    client_name: String,
    potential_value: f64,
    #[serde(default)]
    segment: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    status: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    priority: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    assigned_agent: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    assignment_date: Option<String>,
}

impl AccountRow {
    pub(crate) fn into_account(self) -> Result<Account, String> {
        if self.id.is_empty() {
            return Err("account id is empty".to_string());
        }
        if !(self.potential_value.is_finite() && self.potential_value >= 0.0) {
            return Err(format!(
                "potential_value {} must be non-negative",
                self.potential_value
            ));
        }

        let status = match self.status.as_deref() {
            Some(raw) => raw.parse::<AccountStatus>()?,
            None => AccountStatus::default(),
        };
        let priority = match self.priority.as_deref() {
            Some(raw) => raw.parse::<AccountPriority>()?,
            None => AccountPriority::default(),
        };

        let account = Account::new(
            AccountId(self.id),
            self.client_name,
            self.potential_value,
            self.segment,
        )
        .with_status(status)
        .with_priority(priority);

        match (self.assigned_agent, self.assignment_date) {
            (Some(agent), Some(date)) => {
                let assigned_at = parse_timestamp(&date)
                    .ok_or_else(|| format!("assignment_date '{date}' is not a timestamp"))?;
                Ok(account.with_assignment(AgentId(agent), assigned_at))
            }
            (None, None) => Ok(account),
            _ => Err("assigned_agent and assignment_date must be given together".to_string()),
        }
    }
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()
}

/// RFC 3339, or a bare date taken as midnight UTC.
fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let trimmed = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }
    parse_date(trimmed)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
