//! Fetching raw records from the graph store and serving normalized graphs.
//!
//! The store itself sits behind [`QueryExecutor`]; this crate ships no client.
//! [`GraphService`] picks the single- or multi-player flow, runs the pipeline
//! and caches the result per `(account, player)`.

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

use crate::config::Config;
use crate::error::{GraphError, GraphResult};
use crate::models::{GraphData, Node};
use crate::normalize::builder::{actor_id, make_node};
use crate::normalize::raw::{display_value, RawRecord};
use crate::normalize::{normalize, Category, NormalizeOptions, Scope};

pub mod queries;

use queries::{builders, templates};

/// Rows returned by one query; each row is a JSON object keyed by column alias.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryResult {
    pub records: Vec<Value>,
}

#[async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn execute(&self, query: &str, params: Value) -> GraphResult<QueryResult>;
}

#[async_trait]
impl<E: QueryExecutor + ?Sized> QueryExecutor for Arc<E> {
    async fn execute(&self, query: &str, params: Value) -> GraphResult<QueryResult> {
        (**self).execute(query, params).await
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSummary {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub combat_level: Option<Value>,
}

impl PlayerSummary {
    fn from_row(row: &Value) -> Option<Self> {
        let id = row.get("id").and_then(display_value)?;
        let name = row
            .get("name")
            .and_then(display_value)
            .unwrap_or_else(|| id.clone());
        let combat_level = row.get("combatLevel").filter(|v| !v.is_null()).cloned();
        Some(Self {
            id,
            name,
            combat_level,
        })
    }

    /// The lone node shown for a player with no recorded activity.
    pub fn placeholder_node(&self) -> Node {
        let mut properties = Map::new();
        properties.insert("playerId".to_string(), Value::String(self.id.clone()));
        properties.insert(
            "combatLevel".to_string(),
            self.combat_level.clone().unwrap_or(Value::Null),
        );
        make_node(
            actor_id(&self.id),
            Category::Player.label().to_string(),
            &self.name,
            properties,
            None,
        )
    }
}

type CacheKey = (String, Option<String>);

#[derive(Debug, Clone)]
struct CachedGraph {
    graph: GraphData,
    stored_at: Instant,
}

pub struct GraphService<E> {
    executor: E,
    config: Config,
    ttl: Duration,
    cache: Arc<DashMap<CacheKey, CachedGraph>>,
}

impl<E: QueryExecutor> GraphService<E> {
    pub fn new(executor: E, config: Config) -> Self {
        let ttl = Duration::from_secs(config.cache_ttl_seconds);
        Self {
            executor,
            config,
            ttl,
            cache: Arc::new(DashMap::new()),
        }
    }

    #[instrument(skip(self))]
    pub async fn players(&self, account: &str) -> GraphResult<Vec<PlayerSummary>> {
        let result = self
            .executor
            .execute(templates::ACCOUNT_PLAYERS, builders::account_params(account))
            .await?;

        Ok(result.records.iter().filter_map(PlayerSummary::from_row).collect())
    }

    /// Normalized graph for one player, or for every player on the account.
    #[instrument(skip(self))]
    pub async fn graph(&self, account: &str, player_id: Option<&str>) -> GraphResult<GraphData> {
        if account.trim().is_empty() {
            return Err(GraphError::invalid_request("account must not be empty"));
        }

        let scope = Scope::from_player_id(player_id);
        let key: CacheKey = (account.to_string(), scope.player_id().map(str::to_string));

        if let Some(cached) = self.cached(&key) {
            debug!("Serving cached graph for {:?}", key);
            return Ok(cached);
        }

        let graph = match &scope {
            Scope::Single(id) => self.player_graph(account, id).await?,
            Scope::Multi => self.account_graph(account).await?,
        };

        if !self.ttl.is_zero() {
            self.evict_expired();
            self.cache.insert(
                key,
                CachedGraph {
                    graph: graph.clone(),
                    stored_at: Instant::now(),
                },
            );
        }
        Ok(graph)
    }

    /// Drop every cached graph for `account`. Returns how many were removed.
    pub fn invalidate(&self, account: &str) -> usize {
        let before = self.cache.len();
        self.cache.retain(|(cached_account, _), _| cached_account != account);
        let removed = before.saturating_sub(self.cache.len());
        info!("Invalidated {} cached graphs for account {}", removed, account);
        removed
    }

    pub fn cached_entries(&self) -> usize {
        self.cache.len()
    }

    fn evict_expired(&self) {
        let ttl = self.ttl;
        let before = self.cache.len();
        self.cache.retain(|_, cached| cached.stored_at.elapsed() < ttl);
        let evicted = before.saturating_sub(self.cache.len());
        if evicted > 0 {
            debug!("Evicted {} expired graphs", evicted);
        }
    }

    fn cached(&self, key: &CacheKey) -> Option<GraphData> {
        if self.ttl.is_zero() {
            return None;
        }
        let entry = self.cache.get(key)?;
        if entry.stored_at.elapsed() < self.ttl {
            return Some(entry.graph.clone());
        }
        drop(entry);
        self.cache.remove(key);
        None
    }

    async fn player_graph(&self, account: &str, player_id: &str) -> GraphResult<GraphData> {
        let params = builders::player_params(account, player_id);
        let result = self.executor.execute(templates::PLAYER_GRAPH, params.clone()).await?;

        match first_record(result)? {
            Some(record) => {
                let options = NormalizeOptions::from_config(
                    &self.config,
                    Scope::Single(player_id.to_string()),
                );
                Ok(normalize(&record, &options))
            }
            None => {
                debug!("No activity for player {}, looking up placeholder", player_id);
                let summary = self.executor.execute(templates::PLAYER_SUMMARY, params).await?;
                Ok(summary
                    .records
                    .first()
                    .and_then(PlayerSummary::from_row)
                    .map(|player| GraphData {
                        nodes: vec![player.placeholder_node()],
                        links: Vec::new(),
                    })
                    .unwrap_or_default())
            }
        }
    }

    async fn account_graph(&self, account: &str) -> GraphResult<GraphData> {
        let params = builders::account_params(account);
        let ownership = self
            .executor
            .execute(templates::PLAYER_EVENT_OWNERSHIP, params.clone())
            .await?;
        let hints = ownership_hints(&ownership);

        let result = self.executor.execute(templates::ACCOUNT_GRAPH, params).await?;
        match first_record(result)? {
            Some(record) => {
                let options =
                    NormalizeOptions::from_config(&self.config, Scope::Multi).with_hints(hints);
                Ok(normalize(&record, &options))
            }
            None => Ok(GraphData::default()),
        }
    }
}

/// The aggregate row of a graph query, or `None` when it holds nothing.
fn first_record(result: QueryResult) -> GraphResult<Option<RawRecord>> {
    let Some(row) = result.records.into_iter().next() else {
        return Ok(None);
    };
    if !row.is_object() {
        return Err(GraphError::upstream(format!(
            "graph query returned a non-object row: {}",
            row
        )));
    }
    let record: RawRecord = serde_json::from_value(row)?;
    Ok((!record.is_empty()).then_some(record))
}

/// playerId -> event uuids, from ownership query rows.
fn ownership_hints(result: &QueryResult) -> HashMap<String, HashSet<String>> {
    let mut hints: HashMap<String, HashSet<String>> = HashMap::new();
    for row in &result.records {
        let player = row.get("playerId").and_then(display_value);
        let event = row.get("eventId").and_then(display_value);
        match (player, event) {
            (Some(player), Some(event)) => {
                hints.entry(player).or_default().insert(event);
            }
            _ => warn!("Skipping incomplete ownership row: {}", row),
        }
    }
    hints
}
