use std::sync::Arc;

use super::common::*;
use crate::config::AllocationConfig;
use crate::workflows::allocation::distribution::DistributionKind;
use crate::workflows::allocation::domain::{AccountStatus, AgentId};
use crate::workflows::allocation::repository::{
    AccountRepository, AgentRepository, DistributionRepository, RepositoryError,
};
use crate::workflows::allocation::service::{DistributionError, DistributionRequest};
use crate::workflows::allocation::strategy::AllocationError;

#[tokio::test]
async fn execute_ranks_allocates_and_persists() {
    let mut agents = ranked_agents(4);
    agents.reverse();
    for agent in &mut agents {
        agent.current_ranking = 0;
    }
    let services = seeded_services(agents, accounts(40)).await;

    let outcome = services
        .coordinator
        .execute(DistributionRequest::default())
        .await
        .expect("distribution succeeds");

    assert_eq!(outcome.total_accounts, 40);
    assert_eq!(outcome.assignments_count, 4);
    assert_eq!(outcome.distribution.kind, DistributionKind::Initial);
    assert_eq!(
        outcome.distribution.assignments[0].agent_id,
        AgentId("agent-01".to_string())
    );
    assert_eq!(outcome.distribution.parameters.equitable_percentage, 0.5);

    let latest = services
        .coordinator
        .latest()
        .await
        .expect("lookup succeeds")
        .expect("distribution stored");
    assert_eq!(latest.id, outcome.distribution.id);

    let stored = services
        .repositories
        .accounts
        .get_all()
        .await
        .expect("accounts readable");
    assert!(stored.iter().all(|account| account.is_assigned()));
    for assignment in &outcome.distribution.assignments {
        let book = services
            .repositories
            .accounts
            .get_by_agent(&assignment.agent_id)
            .await
            .expect("accounts readable");
        assert_eq!(book.len(), assignment.total_accounts);
    }
}

#[tokio::test]
async fn inactive_accounts_stay_out_of_the_pool() {
    let mut pool = accounts(12);
    pool[3].update_status(AccountStatus::Closed);
    pool[7].update_status(AccountStatus::Inactive);
    let services = seeded_services(ranked_agents(2), pool).await;

    let outcome = services
        .coordinator
        .execute(DistributionRequest {
            update_rankings: false,
            ..DistributionRequest::default()
        })
        .await
        .expect("distribution succeeds");

    assert_eq!(outcome.total_accounts, 10);
    let closed = services
        .repositories
        .accounts
        .get_by_id(&account_id(3))
        .await
        .expect("lookup succeeds")
        .expect("account stored");
    assert!(!closed.is_assigned());
}

#[tokio::test]
async fn validation_failure_writes_nothing() {
    let services = seeded_services(ranked_agents(5), accounts(3)).await;

    let error = services
        .coordinator
        .execute(DistributionRequest {
            update_rankings: false,
            ..DistributionRequest::default()
        })
        .await
        .expect_err("three accounts cannot cover five agents");

    assert!(matches!(
        error,
        DistributionError::Validation(AllocationError::InsufficientAccounts { .. })
    ));
    assert!(error.is_client_error());
    assert!(services
        .coordinator
        .latest()
        .await
        .expect("lookup succeeds")
        .is_none());
    let stored = services
        .repositories
        .accounts
        .get_all()
        .await
        .expect("accounts readable");
    assert!(stored.iter().all(|account| !account.is_assigned()));
}

#[tokio::test]
async fn storage_failures_pass_through() {
    let accounts_repo = Arc::new(RecordingAccountRepository::failing());
    accounts_repo
        .inner
        .save_all(accounts(6))
        .await
        .expect("seed accounts");
    let (services, agents) = services_with_accounts(accounts_repo.clone(), &config());
    agents.save_all(ranked_agents(2)).await.expect("seed agents");

    let error = services
        .coordinator
        .execute(DistributionRequest::default())
        .await
        .expect_err("account save fails");

    assert!(matches!(
        error,
        DistributionError::Storage(RepositoryError::Unavailable(_))
    ));
    assert!(!error.is_client_error());
    // The distribution was written before the accounts failed.
    assert_eq!(
        services
            .repositories
            .distributions
            .get_history(10)
            .await
            .expect("history readable")
            .len(),
        1
    );
}

#[tokio::test]
async fn accounts_are_saved_in_batches() {
    let accounts_repo = Arc::new(RecordingAccountRepository::default());
    accounts_repo
        .inner
        .save_all(accounts(250))
        .await
        .expect("seed accounts");
    let config = AllocationConfig {
        batch_size: 100,
        ..AllocationConfig::default()
    };
    let (services, agents) = services_with_accounts(accounts_repo.clone(), &config);
    agents.save_all(ranked_agents(3)).await.expect("seed agents");

    services
        .coordinator
        .execute(DistributionRequest::default())
        .await
        .expect("distribution succeeds");

    assert_eq!(accounts_repo.save_all_calls(), 3);
    assert_eq!(accounts_repo.inner.count().expect("count"), 250);
}

#[tokio::test]
async fn history_is_newest_first() {
    let services = seeded_services(ranked_agents(2), accounts(10)).await;

    let first = services
        .coordinator
        .execute(DistributionRequest::default())
        .await
        .expect("first run");
    let second = services
        .coordinator
        .execute(DistributionRequest {
            kind: DistributionKind::FullRotation,
            ..DistributionRequest::default()
        })
        .await
        .expect("second run");

    let history = services.coordinator.history(5).await.expect("history");
    let ids: Vec<_> = history.iter().map(|d| d.id.clone()).collect();
    assert_eq!(
        ids,
        vec![second.distribution.id.clone(), first.distribution.id.clone()]
    );
    let found = services
        .coordinator
        .by_id(&first.distribution.id)
        .await
        .expect("lookup succeeds");
    assert_eq!(found.map(|d| d.kind), Some(DistributionKind::Initial));
}

#[tokio::test]
async fn stats_are_empty_before_the_first_run() {
    let services = seeded_services(ranked_agents(2), accounts(4)).await;
    assert!(services
        .coordinator
        .stats()
        .await
        .expect("stats readable")
        .is_none());
}

#[tokio::test]
async fn stats_join_agents_and_tolerate_deleted_ones() {
    let services = seeded_services(ranked_agents(3), accounts(30)).await;
    let outcome = services
        .coordinator
        .execute(DistributionRequest::default())
        .await
        .expect("distribution succeeds");

    let removed = services
        .repositories
        .agents
        .delete(&AgentId("agent-02".to_string()))
        .await
        .expect("delete succeeds");
    assert!(removed);

    let stats = services
        .coordinator
        .stats()
        .await
        .expect("stats readable")
        .expect("distribution present");

    assert_eq!(stats.distribution.id, outcome.distribution.id);
    assert_eq!(stats.stats.len(), 3);
    let unknown = &stats.stats[0];
    assert_eq!(unknown.agent_name, "Unknown");
    assert_eq!(unknown.ranking, 0);
    assert!(unknown.metrics.is_none());
    assert_eq!(stats.stats[1].ranking, 1);
    assert_eq!(stats.stats[1].agent_name, "Agent 01");
    assert_eq!(stats.summary.total_accounts, 30);
    assert_eq!(stats.summary.avg_accounts, 10.0);
    assert_eq!(
        stats.summary.max_accounts,
        outcome.distribution.assignments[0].total_accounts
    );
}
