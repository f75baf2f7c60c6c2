use activity_graph::config::Config;
use activity_graph::store::queries::templates;
use activity_graph::store::{GraphService, QueryExecutor, QueryResult};
use activity_graph::{GraphError, GraphResult};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Answers each query template with a canned result and records what was asked.
#[derive(Default)]
struct MockExecutor {
    responses: HashMap<&'static str, Vec<Value>>,
    fail: bool,
    calls: AtomicUsize,
    params: Mutex<Vec<Value>>,
}

impl MockExecutor {
    fn with(mut self, query: &'static str, records: Vec<Value>) -> Self {
        self.responses.insert(query, records);
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QueryExecutor for MockExecutor {
    async fn execute(&self, query: &str, params: Value) -> GraphResult<QueryResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.params.lock().unwrap().push(params);
        if self.fail {
            return Err(GraphError::upstream("store unavailable"));
        }
        Ok(QueryResult {
            records: self.responses.get(query).cloned().unwrap_or_default(),
        })
    }
}

fn two_player_graph() -> Value {
    json!({
        "players": [
            {"identity": {"low": 1}, "labels": ["Player"], "properties": {"playerId": "A", "name": "Alpha"}},
            {"identity": {"low": 2}, "labels": ["Player"], "properties": {"playerId": "B", "name": "Bravo"}}
        ],
        "events": [
            {"identity": {"low": 10}, "labels": ["XpGainEvent"], "properties": {"uuid": "a1", "eventType": "XP_GAIN", "xpGained": 10, "skill": "Attack"}},
            {"identity": {"low": 11}, "labels": ["XpGainEvent"], "properties": {"uuid": "b1", "eventType": "XP_GAIN", "xpGained": 20, "skill": "Magic"}}
        ],
        "entities": [
            {"identity": {"low": 20}, "labels": ["Skill"], "properties": {"name": "Attack"}}
        ],
        "relationships": [
            {"identity": {"low": 30}, "type": "IN_SKILL", "start": {"low": 10}, "end": {"low": 20}}
        ]
    })
}

#[tokio::test]
async fn test_multi_player_graph_uses_ownership_query() {
    let executor = MockExecutor::default()
        .with(
            templates::PLAYER_EVENT_OWNERSHIP,
            vec![
                json!({"playerId": "A", "eventId": "a1"}),
                json!({"playerId": "B", "eventId": "b1"}),
            ],
        )
        .with(templates::ACCOUNT_GRAPH, vec![two_player_graph()]);
    let service = GraphService::new(executor, Config::default());

    let graph = service.graph("acct", None).await.unwrap();

    assert_eq!(graph.nodes.len(), 5);
    assert_eq!(
        graph.node("event-a1").unwrap().player_ids.iter().collect::<Vec<_>>(),
        vec!["A"]
    );
    assert!(graph.links.iter().any(|l| l.id == "player-event-A-a1"));
    assert!(graph.links.iter().any(|l| l.id == "player-event-B-b1"));
    assert!(!graph.links.iter().any(|l| l.connects("player-A", "event-b1")));
    assert!(!graph.links.iter().any(|l| l.connects("player-B", "event-a1")));
}

#[tokio::test]
async fn test_single_player_placeholder() {
    let executor = MockExecutor::default().with(
        templates::PLAYER_SUMMARY,
        vec![json!({"id": "7", "name": "Solo", "combatLevel": 3})],
    );
    let service = GraphService::new(executor, Config::default());

    let graph = service.graph("acct", Some("7")).await.unwrap();

    assert_eq!(graph.nodes.len(), 1);
    assert!(graph.links.is_empty());
    let node = &graph.nodes[0];
    assert_eq!(node.id, "player-7");
    assert_eq!(node.name, "Solo");
    assert_eq!(node.property("combatLevel"), Some(&json!(3)));
}

#[tokio::test]
async fn test_unknown_player_yields_empty_graph() {
    let service = GraphService::new(MockExecutor::default(), Config::default());
    let graph = service.graph("acct", Some("missing")).await.unwrap();
    assert!(graph.is_empty());
}

#[tokio::test]
async fn test_upstream_failure_propagates() {
    let executor = MockExecutor {
        fail: true,
        ..MockExecutor::default()
    };
    let service = GraphService::new(executor, Config::default());

    let err = service.graph("acct", None).await.unwrap_err();
    assert!(matches!(err, GraphError::Upstream(_)));

    let err = service.players("acct").await.unwrap_err();
    assert!(matches!(err, GraphError::Upstream(_)));
}

#[tokio::test]
async fn test_blank_account_is_rejected() {
    let service = GraphService::new(MockExecutor::default(), Config::default());
    let err = service.graph("  ", None).await.unwrap_err();
    assert!(matches!(err, GraphError::InvalidRequest(_)));
}

#[tokio::test]
async fn test_graphs_are_cached_until_invalidated() {
    let executor = Arc::new(
        MockExecutor::default().with(templates::ACCOUNT_GRAPH, vec![two_player_graph()]),
    );
    let service = GraphService::new(executor.clone(), Config::default());

    let first = service.graph("acct", None).await.unwrap();
    let calls = executor.calls();
    let second = service.graph("acct", None).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(executor.calls(), calls);
    assert_eq!(service.cached_entries(), 1);

    assert_eq!(service.invalidate("other"), 0);
    assert_eq!(service.invalidate("acct"), 1);
    service.graph("acct", None).await.unwrap();
    assert!(executor.calls() > calls);
}

#[tokio::test]
async fn test_zero_ttl_disables_cache() {
    let executor = Arc::new(
        MockExecutor::default().with(templates::ACCOUNT_GRAPH, vec![two_player_graph()]),
    );
    let config = Config {
        cache_ttl_seconds: 0,
        ..Config::default()
    };
    let service = GraphService::new(executor.clone(), config);

    service.graph("acct", None).await.unwrap();
    let calls = executor.calls();
    service.graph("acct", None).await.unwrap();

    assert_eq!(executor.calls(), calls * 2);
    assert_eq!(service.cached_entries(), 0);
}

#[tokio::test]
async fn test_players_list() {
    let executor = MockExecutor::default().with(
        templates::ACCOUNT_PLAYERS,
        vec![
            json!({"id": "A", "name": "Alpha", "combatLevel": 70}),
            json!({"id": null, "name": "Broken"}),
            json!({"id": {"low": 9}, "name": null}),
        ],
    );
    let service = GraphService::new(executor, Config::default());

    let players = service.players("acct").await.unwrap();

    assert_eq!(players.len(), 2);
    assert_eq!(players[0].name, "Alpha");
    assert_eq!(players[1].id, "9");
    assert_eq!(players[1].name, "9");
}

#[test]
fn test_query_params_carry_account_and_player() {
    let executor = Arc::new(MockExecutor::default());
    let service = GraphService::new(executor.clone(), Config::default());

    tokio_test::block_on(service.graph("acct", Some("42"))).unwrap();

    // Graph query, then the placeholder lookup.
    let params = executor.params.lock().unwrap();
    assert_eq!(params.len(), 2);
    assert_eq!(params[0], json!({"account": "acct", "playerId": "42"}));
    assert_eq!(params[1], params[0]);
}

#[tokio::test]
async fn test_expired_graphs_are_evicted_on_insert() {
    let executor = MockExecutor::default().with(templates::ACCOUNT_GRAPH, vec![two_player_graph()]);
    let config = Config {
        cache_ttl_seconds: 1,
        ..Config::default()
    };
    let service = GraphService::new(executor, config);

    service.graph("a", None).await.unwrap();
    assert_eq!(service.cached_entries(), 1);

    tokio::time::sleep(std::time::Duration::from_millis(1100)).await;
    service.graph("b", None).await.unwrap();

    assert_eq!(service.cached_entries(), 1);
    assert_eq!(service.invalidate("a"), 0);
    assert_eq!(service.invalidate("b"), 1);
}
