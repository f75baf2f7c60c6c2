//! Combat gap-filling.
//!
//! Hit splats frequently arrive without the relationship that says who dealt the
//! damage. Outgoing hits usually name their target, so the first opponent found
//! among them is taken as the source of every unattributed incoming hit. This
//! assumes one opponent per batch; a batch fighting several enemies will
//! attribute all incoming damage to the first.

use std::collections::{HashMap, HashSet};
use tracing::debug;

use super::builder::{character_id, make_node};
use super::naming::{damage_dealt_name, damage_taken_name, is_incoming};
use super::palette::Category;
use crate::models::{GraphData, Link, Node};

const SOURCE_TYPES: [&str; 2] = ["PERFORMED", "CAUSED"];
const TARGET_TYPE: &str = "TARGETED";

#[derive(Debug, Default, Clone)]
struct Connection {
    source: Option<usize>,
    target: Option<usize>,
}

fn is_combatant(node: &Node) -> bool {
    matches!(
        node.category(),
        Some(Category::Character) | Some(Category::Affliction) | Some(Category::Player)
    )
}

fn is_opponent(node: &Node) -> bool {
    matches!(
        node.category(),
        Some(Category::Character) | Some(Category::Affliction)
    )
}

/// Who hit and who was hit, per combat node, from explicit links only.
fn connections(graph: &GraphData, index: &HashMap<&str, usize>) -> HashMap<usize, Connection> {
    let mut found: HashMap<usize, Connection> = HashMap::new();

    for link in &graph.links {
        let (Some(&src), Some(&tgt)) = (index.get(link.source.as_str()), index.get(link.target.as_str()))
        else {
            continue;
        };
        let (source, target) = (&graph.nodes[src], &graph.nodes[tgt]);

        if target.is(Category::Combat)
            && SOURCE_TYPES.contains(&link.link_type.as_str())
            && is_combatant(source)
        {
            // The actor performing its own damage-taken event is not its source.
            if source.is(Category::Player) && is_incoming(&target.properties) {
                continue;
            }
            found.entry(tgt).or_default().source = Some(src);
        }

        if source.is(Category::Combat) && link.link_type == TARGET_TYPE && is_combatant(target) {
            found.entry(src).or_default().target = Some(tgt);
        }
    }

    found
}

/// The opponent named by an outgoing hit: its TARGETED Character or Affliction,
/// else an existing one with the same name, else a new Character node.
enum Opponent {
    Existing(usize),
    Synthesized(Node),
}

fn first_opponent(
    graph: &GraphData,
    outgoing: &[usize],
    found: &HashMap<usize, Connection>,
) -> Option<Opponent> {
    outgoing.iter().find_map(|&hit| {
        let linked = found
            .get(&hit)
            .and_then(|c| c.target)
            .filter(|&target| is_opponent(&graph.nodes[target]));
        if let Some(target) = linked {
            return Some(Opponent::Existing(target));
        }
        let name = graph.nodes[hit].property_str("target")?;
        let id = character_id(name);
        let named = graph
            .nodes
            .iter()
            .position(|node| (is_opponent(node) && node.name == name) || node.id == id);
        Some(match named {
            Some(position) => Opponent::Existing(position),
            None => Opponent::Synthesized(make_node(
                id,
                Category::Character.label().to_string(),
                name,
                Default::default(),
                None,
            )),
        })
    })
}

/// Attribute sourceless incoming hits and rename linked hits.
pub fn fill_combat_gaps(mut graph: GraphData) -> GraphData {
    let index: HashMap<&str, usize> = graph
        .nodes
        .iter()
        .enumerate()
        .map(|(i, node)| (node.id.as_str(), i))
        .collect();
    let found = connections(&graph, &index);
    drop(index);

    let hits: Vec<usize> = graph
        .nodes
        .iter()
        .enumerate()
        .filter(|(_, node)| node.is(Category::Combat))
        .map(|(i, _)| i)
        .collect();
    let (incoming, outgoing): (Vec<usize>, Vec<usize>) = hits
        .into_iter()
        .partition(|&i| is_incoming(&graph.nodes[i].properties));

    let sourceless: Vec<usize> = incoming
        .iter()
        .copied()
        .filter(|i| {
            found.get(i).and_then(|c| c.source).is_none()
                && !graph.nodes[*i].properties.contains_key("source")
        })
        .collect();

    let mut renames: Vec<(usize, String)> = Vec::new();
    for &hit in &outgoing {
        if let Some(target) = found.get(&hit).and_then(|c| c.target) {
            let node = &graph.nodes[hit];
            renames.push((hit, damage_dealt_name(&node.properties, Some(&graph.nodes[target].name))));
        }
    }
    for &hit in &incoming {
        if let Some(source) = found.get(&hit).and_then(|c| c.source) {
            let node = &graph.nodes[hit];
            renames.push((hit, damage_taken_name(&node.properties, Some(&graph.nodes[source].name))));
        }
    }

    if !sourceless.is_empty() {
        match first_opponent(&graph, &outgoing, &found) {
            Some(opponent) => {
                let enemy = match opponent {
                    Opponent::Existing(position) => position,
                    Opponent::Synthesized(node) => {
                        debug!("Synthesized opponent node {}", node.id);
                        graph.nodes.push(node);
                        graph.nodes.len() - 1
                    }
                };
                attribute(&mut graph, enemy, &sourceless, &mut renames);
            }
            None => debug!(
                "{} incoming hits left unattributed: no opponent found",
                sourceless.len()
            ),
        }
    }

    for (position, name) in renames {
        graph.nodes[position].name = name;
    }
    graph
}

fn attribute(graph: &mut GraphData, enemy: usize, hits: &[usize], renames: &mut Vec<(usize, String)>) {
    let enemy_node = &graph.nodes[enemy];
    let link_type = if enemy_node.is(Category::Affliction) {
        "CAUSED"
    } else {
        "PERFORMED"
    };
    let enemy_id = enemy_node.id.clone();
    let enemy_name = enemy_node.name.clone();

    let mut ids: HashSet<String> = graph.links.iter().map(|link| link.id.clone()).collect();
    let already: HashSet<&str> = graph
        .links
        .iter()
        .filter(|link| link.source == enemy_id && SOURCE_TYPES.contains(&link.link_type.as_str()))
        .map(|link| link.target.as_str())
        .collect();
    let mut added = Vec::new();

    for &hit in hits {
        let hit_node = &graph.nodes[hit];
        if !already.contains(hit_node.id.as_str()) {
            let id = format!("link-{}-{}", enemy_id, hit_node.id);
            if ids.insert(id.clone()) {
                added.push(Link::new(id, enemy_id.as_str(), hit_node.id.as_str(), link_type));
            }
        }
        renames.push((hit, damage_taken_name(&hit_node.properties, Some(&enemy_name))));
    }

    debug!("Attributed {} incoming hits to {}", hits.len(), enemy_id);
    graph.links.extend(added);
}
