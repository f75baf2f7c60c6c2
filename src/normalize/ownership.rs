//! Actor/event ownership: who an event belongs to, which actor-event links
//! survive, and the PERFORMED links synthesized for owned but unlinked events.

use std::collections::{BTreeSet, HashMap, HashSet};

use super::builder::NodeSet;
use super::label::clean_label;
use super::naming::is_damage_taken;
use super::raw::{prop_text, Endpoint, RawGraphElement};
use super::Scope;
use crate::models::{Link, Node};

/// Relationship types that tie an event to the actor it belongs to.
pub const OWNERSHIP_TYPES: [&str; 6] = [
    "PERFORMED_BY",
    "GAINED_BY",
    "RECEIVED_BY",
    "TARGETED",
    "PERFORMED",
    "KILLED",
];

pub const SYNTHESIZED_LINK_TYPE: &str = "PERFORMED";

/// Actor keys per event, by store id and by event uuid.
#[derive(Debug, Clone, Default)]
pub struct OwnershipIndex {
    by_store_id: HashMap<String, BTreeSet<String>>,
    by_event_key: HashMap<String, BTreeSet<String>>,
}

impl OwnershipIndex {
    /// Collect owners from relationships whose other endpoint is a known actor.
    /// `actors` maps actor store ids to actor keys.
    pub fn scan(relationships: &[RawGraphElement], actors: &HashMap<String, String>) -> Self {
        let mut index = Self::default();
        if actors.is_empty() {
            return index;
        }

        for rel in relationships {
            let Some(rel_type) = rel.rel_type.as_ref().and_then(|t| t.as_str()) else {
                continue;
            };
            if !OWNERSHIP_TYPES.contains(&clean_label(rel_type)) {
                continue;
            }
            let (Some(start), Some(end)) = (rel.endpoint(Endpoint::Start), rel.endpoint(Endpoint::End))
            else {
                continue;
            };

            if let Some(actor) = actors.get(&start) {
                index.add_store_owner(end.clone(), actor.clone());
            }
            if let Some(actor) = actors.get(&end) {
                index.add_store_owner(start, actor.clone());
            }
        }
        index
    }

    /// Merge caller-provided hints: actor key -> event uuids.
    pub fn with_hints(mut self, hints: &HashMap<String, HashSet<String>>) -> Self {
        for (actor, uuids) in hints {
            for uuid in uuids {
                self.by_event_key
                    .entry(uuid.clone())
                    .or_default()
                    .insert(actor.clone());
            }
        }
        self
    }

    fn add_store_owner(&mut self, store_id: String, actor: String) {
        self.by_store_id.entry(store_id).or_default().insert(actor);
    }

    pub fn owners(&self, store_id: Option<&str>, event_key: Option<&str>) -> BTreeSet<String> {
        let mut owners = BTreeSet::new();
        if let Some(found) = store_id.and_then(|id| self.by_store_id.get(id)) {
            owners.extend(found.iter().cloned());
        }
        if let Some(found) = event_key.and_then(|key| self.by_event_key.get(key)) {
            owners.extend(found.iter().cloned());
        }
        owners
    }
}

/// Whether the actor with `actor_key` owns `event`.
///
/// Single scope: the scoped actor owns every event. Multi scope: the event must
/// list the actor in its playerIds, and a damage-taken event naming a
/// `targetPlayerId` must name this actor.
pub fn owns(scope: &Scope, actor_key: &str, event: &Node) -> bool {
    match scope {
        Scope::Single(player_id) => player_id == actor_key,
        Scope::Multi => {
            if !event.player_ids.contains(actor_key) {
                return false;
            }
            if is_damage_taken(event.category(), &event.properties) {
                if let Some(target) = prop_text(&event.properties, "targetPlayerId") {
                    return target == actor_key;
                }
            }
            true
        }
    }
}

/// Actor key and event node for a link joining an actor and an event, either direction.
fn actor_event<'a>(nodes: &'a NodeSet, link: &Link) -> Option<(&'a str, &'a Node)> {
    let pair = |actor: &str, event: &str| -> Option<(&'a str, &'a Node)> {
        let key = nodes.actor_key(actor)?;
        if !nodes.is_event(event) {
            return None;
        }
        Some((key, nodes.get(event)?))
    };
    pair(&link.source, &link.target).or_else(|| pair(&link.target, &link.source))
}

/// Drop actor-event links the actor does not own, then add a PERFORMED link
/// for every owned event that has no link to its actor yet.
pub fn scope_actor_links(
    nodes: &NodeSet,
    links: Vec<Link>,
    scope: &Scope,
    synthesize: bool,
) -> Vec<Link> {
    let mut kept: Vec<Link> = links
        .into_iter()
        .filter(|link| match actor_event(nodes, link) {
            Some((actor_key, event)) => owns(scope, actor_key, event),
            None => true,
        })
        .collect();

    if !synthesize {
        return kept;
    }

    let connected: HashSet<(String, String)> = kept
        .iter()
        .flat_map(|link| {
            [
                (link.source.clone(), link.target.clone()),
                (link.target.clone(), link.source.clone()),
            ]
        })
        .collect();
    let mut ids: HashSet<String> = kept.iter().map(|link| link.id.clone()).collect();

    let mut synthesized = Vec::new();
    for (actor_id, actor_key) in nodes.actors() {
        for (event_id, event_key) in nodes.events() {
            if connected.contains(&(actor_id.clone(), event_id.clone())) {
                continue;
            }
            let Some(event) = nodes.get(event_id) else {
                continue;
            };
            if !owns(scope, actor_key, event) {
                continue;
            }

            let id = format!("player-event-{}-{}", actor_key, event_key);
            if ids.insert(id.clone()) {
                synthesized.push(Link::new(id, actor_id, event_id, SYNTHESIZED_LINK_TYPE));
            }
        }
    }

    kept.extend(synthesized);
    kept
}
