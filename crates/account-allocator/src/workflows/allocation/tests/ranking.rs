use proptest::prelude::*;

use super::common::*;
use crate::workflows::allocation::domain::AgentId;
use crate::workflows::allocation::ranking::{rank_agents, score};
use crate::workflows::allocation::repository::AgentRepository;

#[test]
fn score_weights_conversion_sales_and_closed_accounts() {
    let value = score(&metrics(25.0, 50_000.0, 30));
    // 25 * 0.4 + 50 * 0.4 + 3 * 0.2
    assert!((value - 30.6).abs() < 1e-9);
    assert_eq!(score(&metrics(0.0, 0.0, 0)), 0.0);
}

#[test]
fn score_increases_with_each_metric() {
    let base = metrics(10.0, 20_000.0, 5);
    assert!(score(&metrics(10.5, 20_000.0, 5)) > score(&base));
    assert!(score(&metrics(10.0, 20_001.0, 5)) > score(&base));
    assert!(score(&metrics(10.0, 20_000.0, 6)) > score(&base));
}

#[test]
fn ranks_are_dense_and_best_first() {
    let agents = vec![
        agent("low", 0, metrics(5.0, 1_000.0, 1)),
        agent("high", 0, metrics(40.0, 90_000.0, 25)),
        agent("mid", 0, metrics(20.0, 30_000.0, 10)),
    ];

    let ranked = rank_agents(agents);

    let order: Vec<(&str, u32)> = ranked
        .iter()
        .map(|agent| (agent.id.0.as_str(), agent.current_ranking))
        .collect();
    assert_eq!(
        order,
        vec![("agent-high", 1), ("agent-mid", 2), ("agent-low", 3)]
    );
}

#[test]
fn equal_scores_keep_input_order() {
    let same = metrics(12.0, 8_000.0, 4);
    let agents = vec![agent("b", 9, same), agent("a", 3, same), agent("c", 1, same)];

    let ranked = rank_agents(agents);

    let ids: Vec<&str> = ranked.iter().map(|agent| agent.id.0.as_str()).collect();
    assert_eq!(ids, vec!["agent-b", "agent-a", "agent-c"]);
    assert_eq!(
        ranked.iter().map(|a| a.current_ranking).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );
}

#[test]
fn reranking_sorted_agents_changes_nothing() {
    let agents = ranked_agents(6);
    let reranked = rank_agents(agents.clone());
    assert_eq!(reranked, agents);
    assert!(rank_agents(Vec::new()).is_empty());
}

#[tokio::test]
async fn calculate_rankings_persists_every_agent() {
    let mut agents = ranked_agents(4);
    agents.reverse();
    for agent in &mut agents {
        agent.current_ranking = 99;
    }
    let services = seeded_services(agents, accounts(8)).await;

    let ranked = services
        .ranking
        .calculate_rankings(None)
        .await
        .expect("ranking succeeds");
    assert_eq!(ranked[0].id, AgentId("agent-01".to_string()));

    let stored = services
        .repositories
        .agents
        .get_by_id(&AgentId("agent-04".to_string()))
        .await
        .expect("lookup succeeds")
        .expect("agent stored");
    assert_eq!(stored.current_ranking, 4);
}

#[tokio::test]
async fn top_performers_skip_inactive_agents() {
    let mut agents = ranked_agents(5);
    agents[0].active = false;
    let services = seeded_services(agents, Vec::new()).await;

    let top = services
        .ranking
        .top_performers(2)
        .await
        .expect("lookup succeeds");

    let ranks: Vec<u32> = top.iter().map(|agent| agent.current_ranking).collect();
    assert_eq!(ranks, vec![2, 3]);
}

#[tokio::test]
async fn agent_ranking_is_none_for_unknown_agents() {
    let services = seeded_services(ranked_agents(2), Vec::new()).await;

    let known = services
        .ranking
        .agent_ranking(&AgentId("agent-02".to_string()))
        .await
        .expect("lookup succeeds");
    let missing = services
        .ranking
        .agent_ranking(&AgentId("agent-77".to_string()))
        .await
        .expect("lookup succeeds");

    assert_eq!(known, Some(2));
    assert_eq!(missing, None);
}

proptest! {
    #[test]
    fn rankings_are_dense_and_follow_score(
        raw in prop::collection::vec((0.0f64..100.0, 0.0f64..250_000.0, 0u32..60), 1..24),
    ) {
        let agents: Vec<_> = raw
            .iter()
            .enumerate()
            .map(|(index, (conversion, sales, closed))| {
                agent(&index.to_string(), 0, metrics(*conversion, *sales, *closed))
            })
            .collect();

        let ranked = rank_agents(agents);

        for (position, agent) in ranked.iter().enumerate() {
            prop_assert_eq!(agent.current_ranking as usize, position + 1);
        }
        for pair in ranked.windows(2) {
            prop_assert!(score(&pair[0].metrics) >= score(&pair[1].metrics));
        }
    }
}
