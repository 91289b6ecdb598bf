use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use crate::config::AllocationConfig;
use crate::workflows::allocation::domain::{Account, AccountId, Agent, AgentId, AgentMetrics};
use crate::workflows::allocation::memory::{
    InMemoryAccountRepository, InMemoryAgentRepository, InMemoryDistributionRepository,
};
use crate::workflows::allocation::repository::{AccountRepository, RepositoryError};
use crate::workflows::allocation::service::Repositories;
use crate::workflows::allocation::AllocationServices;

pub(super) fn fixed_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 10, 1, 8, 30, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn agent(suffix: &str, ranking: u32, metrics: AgentMetrics) -> Agent {
    Agent {
        id: AgentId(format!("agent-{suffix}")),
        name: format!("Agent {suffix}"),
        email: format!("agent.{suffix}@example.com"),
        active: true,
        current_ranking: ranking,
        join_date: NaiveDate::from_ymd_opt(2022, 2, 14).expect("valid date"),
        metrics,
    }
}

pub(super) fn metrics(conversion_rate: f64, total_sales: f64, closed_accounts: u32) -> AgentMetrics {
    AgentMetrics {
        conversion_rate,
        total_sales,
        closed_accounts,
    }
}

/// `count` agents ranked 1..=count, with metrics that reproduce that order.
pub(super) fn ranked_agents(count: usize) -> Vec<Agent> {
    (1..=count)
        .map(|rank| {
            let strength = (count + 1 - rank) as f64;
            agent(
                &format!("{rank:02}"),
                rank as u32,
                metrics(strength * 2.0, strength * 10_000.0, (strength as u32) * 3),
            )
        })
        .collect()
}

pub(super) fn account_id(index: usize) -> AccountId {
    AccountId(format!("acc-{index:03}"))
}

/// Accounts `acc-000..` with a potential value that cycles so ties occur.
pub(super) fn accounts(count: usize) -> Vec<Account> {
    (0..count)
        .map(|index| {
            Account::new(
                account_id(index),
                format!("Client {index}"),
                ((index * 37) % 50) as f64 * 1_000.0,
                "mid-market",
            )
        })
        .collect()
}

pub(super) fn config() -> AllocationConfig {
    AllocationConfig::default()
}

/// Services over fresh in-memory stores seeded with `agents` and `accounts`.
pub(super) async fn seeded_services(agents: Vec<Agent>, accounts: Vec<Account>) -> AllocationServices {
    let services = AllocationServices::in_memory(&config()).expect("default config is valid");
    services
        .repositories
        .agents
        .save_all(agents)
        .await
        .expect("seed agents");
    services
        .repositories
        .accounts
        .save_all(accounts)
        .await
        .expect("seed accounts");
    services
}

/// Services sharing the given account store, so tests can observe or sabotage it.
pub(super) fn services_with_accounts(
    accounts: Arc<dyn AccountRepository>,
    config: &AllocationConfig,
) -> (AllocationServices, InMemoryAgentRepository) {
    let agents = InMemoryAgentRepository::default();
    let repositories = Repositories {
        agents: Arc::new(agents.clone()),
        accounts,
        distributions: Arc::new(InMemoryDistributionRepository::default()),
    };
    let services = AllocationServices::build(config, repositories).expect("valid config");
    (services, agents)
}

/// Counts `save_all` calls and can be told to fail them.
#[derive(Default)]
pub(super) struct RecordingAccountRepository {
    pub(super) inner: InMemoryAccountRepository,
    pub(super) save_all_calls: AtomicUsize,
    pub(super) fail_saves: bool,
}

impl RecordingAccountRepository {
    pub(super) fn failing() -> Self {
        Self {
            fail_saves: true,
            ..Self::default()
        }
    }

    pub(super) fn save_all_calls(&self) -> usize {
        self.save_all_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AccountRepository for RecordingAccountRepository {
    async fn get_all(&self) -> Result<Vec<Account>, RepositoryError> {
        self.inner.get_all().await
    }

    async fn get_by_id(&self, id: &AccountId) -> Result<Option<Account>, RepositoryError> {
        self.inner.get_by_id(id).await
    }

    async fn get_available_accounts(&self) -> Result<Vec<Account>, RepositoryError> {
        self.inner.get_available_accounts().await
    }

    async fn get_by_agent(&self, agent_id: &AgentId) -> Result<Vec<Account>, RepositoryError> {
        self.inner.get_by_agent(agent_id).await
    }

    async fn save(&self, account: Account) -> Result<(), RepositoryError> {
        self.inner.save(account).await
    }

    async fn save_all(&self, accounts: Vec<Account>) -> Result<(), RepositoryError> {
        self.save_all_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_saves {
            return Err(RepositoryError::Unavailable("disk full".to_string()));
        }
        self.inner.save_all(accounts).await
    }

    async fn delete(&self, id: &AccountId) -> Result<bool, RepositoryError> {
        self.inner.delete(id).await
    }

    async fn clear(&self) -> Result<(), RepositoryError> {
        self.inner.clear().await
    }
}
