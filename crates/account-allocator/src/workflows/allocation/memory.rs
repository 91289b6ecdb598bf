//! In-process repositories used by the CLI and the test-suite.

use std::collections::{HashMap, VecDeque};
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use super::distribution::{Distribution, DistributionId};
use super::domain::{Account, AccountId, Agent, AgentId};
use super::repository::{
    AccountRepository, AgentRepository, DistributionRepository, RepositoryError,
};

/// Insertion-ordered map. Allocation walks accounts in stored order, so the
/// order of first insertion must survive later upserts.
#[derive(Debug)]
struct OrderedStore<K, V> {
    items: Vec<V>,
    positions: HashMap<K, usize>,
}

impl<K, V> Default for OrderedStore<K, V> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            positions: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash + Clone, V: Clone> OrderedStore<K, V> {
    fn upsert(&mut self, key: K, value: V) {
        match self.positions.get(&key) {
            Some(&position) => self.items[position] = value,
            None => {
                self.positions.insert(key, self.items.len());
                self.items.push(value);
            }
        }
    }

    fn get(&self, key: &K) -> Option<V> {
        self.positions
            .get(key)
            .map(|&position| self.items[position].clone())
    }

    fn filtered(&self, predicate: impl Fn(&V) -> bool) -> Vec<V> {
        self.items
            .iter()
            .filter(|item| predicate(item))
            .cloned()
            .collect()
    }

    fn remove(&mut self, key: &K) -> bool {
        let Some(position) = self.positions.remove(key) else {
            return false;
        };
        self.items.remove(position);
        for slot in self.positions.values_mut() {
            if *slot > position {
                *slot -= 1;
            }
        }
        true
    }

    fn clear(&mut self) {
        self.items.clear();
        self.positions.clear();
    }

    fn len(&self) -> usize {
        self.items.len()
    }
}

fn lock<'a, T>(
    mutex: &'a Mutex<T>,
    store: &'static str,
) -> Result<MutexGuard<'a, T>, RepositoryError> {
    mutex.lock().map_err(|_| RepositoryError::Poisoned(store))
}

#[derive(Default, Clone)]
pub struct InMemoryAgentRepository {
    agents: Arc<Mutex<OrderedStore<AgentId, Agent>>>,
}

impl InMemoryAgentRepository {
    pub fn count(&self) -> Result<usize, RepositoryError> {
        Ok(lock(&self.agents, "agent")?.len())
    }
}

#[async_trait]
impl AgentRepository for InMemoryAgentRepository {
    async fn get_all(&self) -> Result<Vec<Agent>, RepositoryError> {
        Ok(lock(&self.agents, "agent")?.filtered(|_| true))
    }

    async fn get_by_id(&self, id: &AgentId) -> Result<Option<Agent>, RepositoryError> {
        Ok(lock(&self.agents, "agent")?.get(id))
    }

    async fn get_active_agents(&self) -> Result<Vec<Agent>, RepositoryError> {
        Ok(lock(&self.agents, "agent")?.filtered(Agent::is_active))
    }

    async fn save(&self, agent: Agent) -> Result<(), RepositoryError> {
        lock(&self.agents, "agent")?.upsert(agent.id.clone(), agent);
        Ok(())
    }

    async fn save_all(&self, agents: Vec<Agent>) -> Result<(), RepositoryError> {
        let mut guard = lock(&self.agents, "agent")?;
        for agent in agents {
            guard.upsert(agent.id.clone(), agent);
        }
        Ok(())
    }

    async fn delete(&self, id: &AgentId) -> Result<bool, RepositoryError> {
        Ok(lock(&self.agents, "agent")?.remove(id))
    }

    async fn clear(&self) -> Result<(), RepositoryError> {
        lock(&self.agents, "agent")?.clear();
        Ok(())
    }
}

#[derive(Default, Clone)]
pub struct InMemoryAccountRepository {
    accounts: Arc<Mutex<OrderedStore<AccountId, Account>>>,
}

impl InMemoryAccountRepository {
    pub fn count(&self) -> Result<usize, RepositoryError> {
        Ok(lock(&self.accounts, "account")?.len())
    }
}

#[async_trait]
impl AccountRepository for InMemoryAccountRepository {
    async fn get_all(&self) -> Result<Vec<Account>, RepositoryError> {
        Ok(lock(&self.accounts, "account")?.filtered(|_| true))
    }

    async fn get_by_id(&self, id: &AccountId) -> Result<Option<Account>, RepositoryError> {
        Ok(lock(&self.accounts, "account")?.get(id))
    }

    async fn get_available_accounts(&self) -> Result<Vec<Account>, RepositoryError> {
        Ok(lock(&self.accounts, "account")?.filtered(Account::is_active))
    }

    async fn get_by_agent(&self, agent_id: &AgentId) -> Result<Vec<Account>, RepositoryError> {
        Ok(lock(&self.accounts, "account")?
            .filtered(|account| account.assigned_agent() == Some(agent_id)))
    }

    async fn save(&self, account: Account) -> Result<(), RepositoryError> {
        lock(&self.accounts, "account")?.upsert(account.id.clone(), account);
        Ok(())
    }

    async fn save_all(&self, accounts: Vec<Account>) -> Result<(), RepositoryError> {
        let mut guard = lock(&self.accounts, "account")?;
        for account in accounts {
            guard.upsert(account.id.clone(), account);
        }
        Ok(())
    }

    async fn delete(&self, id: &AccountId) -> Result<bool, RepositoryError> {
        Ok(lock(&self.accounts, "account")?.remove(id))
    }

    async fn clear(&self) -> Result<(), RepositoryError> {
        lock(&self.accounts, "account")?.clear();
        Ok(())
    }
}

#[derive(Debug, Default)]
struct DistributionLog {
    by_id: HashMap<DistributionId, Distribution>,
    /// Newest first.
    history: VecDeque<DistributionId>,
}

/// Keeps the most recent `retention` runs.
#[derive(Clone)]
pub struct InMemoryDistributionRepository {
    log: Arc<Mutex<DistributionLog>>,
    retention: usize,
}

impl Default for InMemoryDistributionRepository {
    fn default() -> Self {
        Self::with_retention(100)
    }
}

impl InMemoryDistributionRepository {
    pub fn with_retention(retention: usize) -> Self {
        Self {
            log: Arc::new(Mutex::new(DistributionLog::default())),
            retention: retention.max(1),
        }
    }

    pub fn count(&self) -> Result<usize, RepositoryError> {
        Ok(lock(&self.log, "distribution")?.by_id.len())
    }

    pub fn clear(&self) -> Result<(), RepositoryError> {
        let mut guard = lock(&self.log, "distribution")?;
        guard.by_id.clear();
        guard.history.clear();
        Ok(())
    }
}

#[async_trait]
impl DistributionRepository for InMemoryDistributionRepository {
    async fn save(&self, distribution: Distribution) -> Result<(), RepositoryError> {
        let mut guard = lock(&self.log, "distribution")?;
        let id = distribution.id.clone();
        if guard.by_id.insert(id.clone(), distribution).is_some() {
            guard.history.retain(|existing| existing != &id);
        }
        guard.history.push_front(id);

        while guard.history.len() > self.retention {
            if let Some(evicted) = guard.history.pop_back() {
                guard.by_id.remove(&evicted);
            }
        }
        Ok(())
    }

    async fn get_latest(&self) -> Result<Option<Distribution>, RepositoryError> {
        let guard = lock(&self.log, "distribution")?;
        // Oldest to newest so that `max_by_key` prefers the newest save on equal dates.
        Ok(guard
            .history
            .iter()
            .rev()
            .filter_map(|id| guard.by_id.get(id))
            .max_by_key(|distribution| distribution.distribution_date)
            .cloned())
    }

    async fn get_history(&self, limit: usize) -> Result<Vec<Distribution>, RepositoryError> {
        let guard = lock(&self.log, "distribution")?;
        Ok(guard
            .history
            .iter()
            .take(limit)
            .filter_map(|id| guard.by_id.get(id).cloned())
            .collect())
    }

    async fn get_by_id(
        &self,
        id: &DistributionId,
    ) -> Result<Option<Distribution>, RepositoryError> {
        Ok(lock(&self.log, "distribution")?.by_id.get(id).cloned())
    }
}
