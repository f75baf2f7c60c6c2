use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeSet, HashMap};

use crate::normalize::palette::Category;

/// A render-ready node. `id` is derived from a natural key, never from the store id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: String,
    pub label: String,
    pub name: String,
    pub color: String,
    #[serde(default)]
    pub properties: Map<String, Value>,
    /// Store-internal identity, kept only so relationships can be resolved.
    #[serde(rename = "neo4jId", default, skip_serializing_if = "Option::is_none")]
    pub neo4j_id: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub player_ids: BTreeSet<String>,
}

impl Node {
    pub fn category(&self) -> Option<Category> {
        Category::from_label(&self.label)
    }

    pub fn is(&self, category: Category) -> bool {
        self.category() == Some(category)
    }

    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    pub fn property_str(&self, key: &str) -> Option<&str> {
        self.properties.get(key).and_then(Value::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub link_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Map<String, Value>>,
}

impl Link {
    pub fn new(
        id: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
        link_type: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            link_type: link_type.into(),
            properties: None,
        }
    }

    pub fn connects(&self, a: &str, b: &str) -> bool {
        (self.source == a && self.target == b) || (self.source == b && self.target == a)
    }
}

/// The renderer contract: `{ nodes, links }` with links referencing node ids.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphData {
    pub nodes: Vec<Node>,
    pub links: Vec<Link>,
}

impl GraphData {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.links.is_empty()
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|node| node.id == id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphStats {
    pub total_nodes: usize,
    pub total_edges: usize,
    pub node_types: HashMap<String, usize>,
    pub avg_degree: f64,
}

impl GraphStats {
    pub fn from_graph(graph: &GraphData) -> Self {
        Self {
            total_nodes: graph.nodes.len(),
            total_edges: graph.links.len(),
            node_types: graph.nodes.iter().fold(HashMap::new(), |mut acc, node| {
                *acc.entry(node.label.clone()).or_insert(0) += 1;
                acc
            }),
            avg_degree: graph.links.len() as f64 * 2.0 / graph.nodes.len().max(1) as f64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LegendEntry {
    pub label: &'static str,
    pub color: &'static str,
}
