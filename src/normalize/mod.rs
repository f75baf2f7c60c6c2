//! The normalization pipeline.
//!
//! A raw record flows through fixed stages, each consuming the previous
//! stage's output: node building (actors, events, entities), relationship
//! linking, actor/event scoping, and combat gap-filling. Every stage is total;
//! malformed elements are skipped and logged at debug level.

pub mod builder;
pub mod inference;
pub mod label;
pub mod linker;
pub mod naming;
pub mod ownership;
pub mod palette;
pub mod raw;

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{info, instrument};

use crate::config::Config;
use crate::models::GraphData;
use builder::NodeBuilder;
use ownership::OwnershipIndex;
use raw::RawRecord;

pub use palette::{legend, Category};

/// Whose activity a record describes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// One actor; every event belongs to it.
    Single(String),
    /// Several actors; events belong to the actors the ownership index names.
    Multi,
}

impl Scope {
    pub fn from_player_id(player_id: Option<&str>) -> Self {
        match player_id.map(str::trim).filter(|id| !id.is_empty()) {
            Some(id) => Scope::Single(id.to_string()),
            None => Scope::Multi,
        }
    }

    pub fn player_id(&self) -> Option<&str> {
        match self {
            Scope::Single(id) => Some(id),
            Scope::Multi => None,
        }
    }

    /// A Player entity is admitted as a node only if it is the scoped actor.
    pub fn is_scoped_actor(&self, player_id: &str) -> bool {
        self.player_id() == Some(player_id)
    }
}

#[derive(Debug, Clone)]
pub struct NormalizeOptions {
    pub scope: Scope,
    pub synthesize_actor_links: bool,
    pub infer_combat_sources: bool,
    /// actor key -> event uuids known to belong to it.
    pub ownership_hints: HashMap<String, HashSet<String>>,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            scope: Scope::Multi,
            synthesize_actor_links: true,
            infer_combat_sources: true,
            ownership_hints: HashMap::new(),
        }
    }
}

impl NormalizeOptions {
    pub fn single(player_id: impl Into<String>) -> Self {
        Self {
            scope: Scope::Single(player_id.into()),
            ..Self::default()
        }
    }

    pub fn multi() -> Self {
        Self::default()
    }

    pub fn from_config(config: &Config, scope: Scope) -> Self {
        Self {
            scope,
            synthesize_actor_links: config.synthesize_actor_links,
            infer_combat_sources: config.infer_combat_sources,
            ownership_hints: HashMap::new(),
        }
    }

    pub fn with_hints(mut self, hints: HashMap<String, HashSet<String>>) -> Self {
        self.ownership_hints = hints;
        self
    }
}

/// Normalize one raw record into a render-ready graph. Never fails: anything
/// unreadable is dropped, and an empty record yields an empty graph.
#[instrument(skip_all, fields(scope = ?options.scope))]
pub fn normalize(record: &RawRecord, options: &NormalizeOptions) -> GraphData {
    if record.is_empty() {
        return GraphData::default();
    }

    let builder = NodeBuilder::new(options.scope.clone()).with_actors(&record.players);
    let owners = match options.scope {
        Scope::Multi => OwnershipIndex::scan(&record.relationships, &builder.actor_store_ids())
            .with_hints(&options.ownership_hints),
        Scope::Single(_) => OwnershipIndex::default(),
    };
    let nodes = builder
        .with_events(&record.events, &owners)
        .with_entities(&record.entities)
        .finish();

    let linked = linker::link_relationships(&record.relationships, &nodes);
    let links = ownership::scope_actor_links(
        &nodes,
        linked.links,
        &options.scope,
        options.synthesize_actor_links,
    );
    let skipped = nodes.skipped();

    let mut graph = GraphData {
        nodes: nodes.into_nodes(),
        links,
    };
    let before_inference = graph.links.len();
    if options.infer_combat_sources {
        graph = inference::fill_combat_gaps(graph);
    }

    info!(
        "Normalized {} nodes and {} links (skipped {} elements, dropped {} relationships, {} duplicates, {} inferred)",
        graph.nodes.len(),
        graph.links.len(),
        skipped,
        linked.dropped,
        linked.duplicates,
        graph.links.len() - before_inference
    );
    graph
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_from_player_id() {
        assert_eq!(Scope::from_player_id(Some("42")), Scope::Single("42".into()));
        assert_eq!(Scope::from_player_id(Some("  ")), Scope::Multi);
        assert_eq!(Scope::from_player_id(None), Scope::Multi);
        assert!(Scope::Single("1".into()).is_scoped_actor("1"));
        assert!(!Scope::Multi.is_scoped_actor("1"));
    }

    #[test]
    fn test_empty_record_yields_empty_graph() {
        let graph = normalize(&RawRecord::default(), &NormalizeOptions::default());
        assert!(graph.is_empty());
    }

    #[test]
    fn test_options_follow_config() {
        let config = Config {
            synthesize_actor_links: false,
            ..Config::default()
        };
        let options = NormalizeOptions::from_config(&config, Scope::Multi);
        assert!(!options.synthesize_actor_links);
        assert!(options.infer_combat_sources);
    }
}
