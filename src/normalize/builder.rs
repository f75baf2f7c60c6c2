//! Node Builder: turns the three raw node collections into one deduplicated node set.
//!
//! Collections are consumed in a fixed order (actors, events, entities) so that
//! actor ids exist before entity records are checked for duplicate actors.

use serde_json::{Map, Value};
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::debug;
use uuid::Uuid;

use super::label::clean_label;
use super::naming::{classify_event, event_category, event_name};
use super::ownership::OwnershipIndex;
use super::palette::{color_for_label, Category};
use super::raw::{first_text, prop_text, RawGraphElement};
use super::Scope;
use crate::models::Node;

/// The node set produced by one pipeline run, plus the lookups later stages need.
#[derive(Debug, Default)]
pub struct NodeSet {
    nodes: Vec<Node>,
    index: HashMap<String, usize>,
    /// store id -> node id; may point at ids that were mapped but never inserted.
    store_ids: HashMap<String, String>,
    /// actor node id -> actor natural key, in insertion order.
    actors: Vec<(String, String)>,
    actor_index: HashMap<String, usize>,
    /// event node id -> event natural key, in insertion order.
    events: Vec<(String, String)>,
    event_index: HashSet<String>,
    skipped: usize,
}

impl NodeSet {
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Node> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Resolve a store id to the id of a node that exists in this set.
    pub fn resolve(&self, store_id: &str) -> Option<&str> {
        self.store_ids
            .get(store_id)
            .filter(|id| self.contains(id))
            .map(String::as_str)
    }

    pub fn actors(&self) -> &[(String, String)] {
        &self.actors
    }

    pub fn events(&self) -> &[(String, String)] {
        &self.events
    }

    pub fn actor_key(&self, node_id: &str) -> Option<&str> {
        self.actor_index
            .get(node_id)
            .map(|&i| self.actors[i].1.as_str())
    }

    pub fn is_event(&self, node_id: &str) -> bool {
        self.event_index.contains(node_id)
    }

    fn push_actor(&mut self, id: String, key: String) {
        self.actor_index.insert(id.clone(), self.actors.len());
        self.actors.push((id, key));
    }

    fn push_event(&mut self, id: String, key: String) {
        self.event_index.insert(id.clone());
        self.events.push((id, key));
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn into_nodes(self) -> Vec<Node> {
        self.nodes
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntityKind {
    Item,
    Skill,
    Character,
    Location,
    Quest,
    AchievementDiary,
    CombatAchievement,
    Object,
    World,
    Reward,
    Affliction,
    Player,
    Other,
}

/// Label markers in dispatch priority order.
const ENTITY_RULES: [(&str, EntityKind); 13] = [
    ("Item", EntityKind::Item),
    ("Skill", EntityKind::Skill),
    ("Character", EntityKind::Character),
    ("Location", EntityKind::Location),
    ("Quest", EntityKind::Quest),
    ("AchievementDiary", EntityKind::AchievementDiary),
    ("CombatAchievement", EntityKind::CombatAchievement),
    ("Object", EntityKind::Object),
    ("World", EntityKind::World),
    ("Reward", EntityKind::Reward),
    ("RewardSource", EntityKind::Reward),
    ("Affliction", EntityKind::Affliction),
    ("Player", EntityKind::Player),
];

fn entity_kind(labels: &[String]) -> EntityKind {
    ENTITY_RULES
        .iter()
        .find(|(marker, _)| labels.iter().any(|label| label == marker))
        .map(|(_, kind)| *kind)
        .unwrap_or(EntityKind::Other)
}

struct Identity {
    id: String,
    label: String,
    name: String,
}

impl Identity {
    fn known(id: String, category: Category, name: String) -> Self {
        Self {
            id,
            label: category.label().to_string(),
            name,
        }
    }
}

/// Natural-key id, display label and name for a non-actor entity.
fn entity_identity(
    kind: EntityKind,
    labels: &[String],
    props: &Map<String, Value>,
    store_id: Option<&str>,
) -> Option<Identity> {
    let name = || prop_text(props, "name");

    let identity = match kind {
        EntityKind::Item => {
            let key = first_text(props, &["itemId", "name"])?;
            let name = first_text(props, &["name", "itemId"])?;
            Identity::known(format!("item-{}", key), Category::Item, name)
        }
        EntityKind::Skill => {
            let name = name()?;
            Identity::known(format!("skill-{}", name), Category::Skill, name)
        }
        EntityKind::Character => {
            let name = first_text(props, &["name", "npcName"])?;
            Identity::known(character_id(&name), Category::Character, name)
        }
        EntityKind::Location => {
            let x = prop_text(props, "x")?;
            let y = prop_text(props, "y")?;
            let plane = prop_text(props, "plane").unwrap_or_else(|| "0".to_string());
            Identity::known(
                format!("loc-{}-{}-{}", x, y, plane),
                Category::Location,
                format!("({}, {}, {})", x, y, plane),
            )
        }
        EntityKind::Quest => {
            let name = name()?;
            Identity::known(format!("quest-{}", name), Category::Quest, name)
        }
        EntityKind::AchievementDiary => {
            let name = name()?;
            let tier = prop_text(props, "tier").unwrap_or_default();
            Identity::known(
                format!("diary-{}-{}", name, tier),
                Category::Diary,
                format!("{} {}", name, tier).trim_end().to_string(),
            )
        }
        EntityKind::CombatAchievement => {
            let name = name()?;
            Identity::known(format!("combat-ach-{}", name), Category::CombatAchievement, name)
        }
        EntityKind::Object => {
            let key = first_text(props, &["objectId", "name"])?;
            let name = first_text(props, &["name", "objectId"])?;
            Identity::known(format!("object-{}", key), Category::Object, name)
        }
        EntityKind::World => match first_text(props, &["world", "worldId", "number"]) {
            Some(number) => Identity::known(
                format!("world-{}", number),
                Category::World,
                format!("World {}", number),
            ),
            None => {
                let name = name()?;
                Identity::known(format!("world-{}", name), Category::World, name)
            }
        },
        EntityKind::Reward => {
            let key = first_text(props, &["name", "source"])?;
            Identity::known(format!("reward-{}", key), Category::Reward, key)
        }
        EntityKind::Affliction => {
            let name = name()?;
            Identity::known(format!("affliction-{}", name), Category::Affliction, name)
        }
        EntityKind::Player => return None,
        EntityKind::Other => {
            let key = store_id
                .map(str::to_string)
                .unwrap_or_else(|| Uuid::new_v4().simple().to_string());
            let label = labels.first().cloned().unwrap_or_else(|| "Entity".to_string());
            let name = name().unwrap_or_else(|| label.clone());
            Identity {
                id: format!("entity-{}", key),
                label,
                name,
            }
        }
    };

    Some(identity)
}

/// Node id a Character entity with this name receives.
pub fn character_id(name: &str) -> String {
    format!("char-{}", name)
}

pub fn actor_id(player_id: &str) -> String {
    format!("player-{}", player_id)
}

pub fn make_node(
    id: String,
    label: String,
    name: &str,
    properties: Map<String, Value>,
    neo4j_id: Option<String>,
) -> Node {
    let color = color_for_label(&label).to_string();
    Node {
        id,
        label,
        name: clean_label(name).to_string(),
        color,
        properties,
        neo4j_id,
        player_ids: BTreeSet::new(),
    }
}

fn actor_node(player_id: &str, props: &Map<String, Value>, store_id: Option<String>) -> Node {
    let name = prop_text(props, "name").unwrap_or_else(|| player_id.to_string());
    make_node(
        actor_id(player_id),
        Category::Player.label().to_string(),
        &name,
        props.clone(),
        store_id,
    )
}

pub struct NodeBuilder {
    scope: Scope,
    set: NodeSet,
}

impl NodeBuilder {
    pub fn new(scope: Scope) -> Self {
        Self {
            scope,
            set: NodeSet::default(),
        }
    }

    fn insert(&mut self, node: Node) {
        if let Some(store_id) = &node.neo4j_id {
            self.set.store_ids.insert(store_id.clone(), node.id.clone());
        }
        self.set.index.insert(node.id.clone(), self.set.nodes.len());
        self.set.nodes.push(node);
    }

    fn map_store_id(&mut self, store_id: Option<String>, node_id: &str) {
        if let Some(store_id) = store_id {
            self.set.store_ids.insert(store_id, node_id.to_string());
        }
    }

    fn skip(&mut self, collection: &str, reason: &str) {
        debug!("Skipping {} element: {}", collection, reason);
        self.set.skipped += 1;
    }

    /// Primary actors. Records without a `playerId` are skipped.
    pub fn with_actors(mut self, players: &[RawGraphElement]) -> Self {
        for player in players {
            let Some(props) = &player.properties else {
                self.skip("player", "missing properties");
                continue;
            };
            let Some(player_id) = prop_text(props, "playerId") else {
                self.skip("player", "missing playerId");
                continue;
            };

            let id = actor_id(&player_id);
            if self.set.contains(&id) {
                self.map_store_id(player.store_id(), &id);
                continue;
            }

            self.insert(actor_node(&player_id, props, player.store_id()));
            self.set.push_actor(id, player_id);
        }
        self
    }

    /// store id -> actor key for every actor inserted so far.
    pub fn actor_store_ids(&self) -> HashMap<String, String> {
        self.set
            .store_ids
            .iter()
            .filter_map(|(store_id, node_id)| {
                self.set
                    .actor_key(node_id)
                    .map(|key| (store_id.clone(), key.to_string()))
            })
            .collect()
    }

    /// Events; every event gets a node even when its metadata is thin.
    pub fn with_events(mut self, events: &[RawGraphElement], owners: &OwnershipIndex) -> Self {
        for event in events {
            let Some(props) = &event.properties else {
                self.skip("event", "missing properties");
                continue;
            };

            let store_id = event.store_id();
            let uuid = prop_text(props, "uuid");
            let key = uuid
                .clone()
                .or_else(|| store_id.clone())
                .unwrap_or_else(|| Uuid::new_v4().simple().to_string());
            let id = format!("event-{}", key);
            let player_ids = owners.owners(store_id.as_deref(), uuid.as_deref());

            if let Some(&i) = self.set.index.get(&id) {
                self.set.nodes[i].player_ids.extend(player_ids);
                self.map_store_id(store_id, &id);
                continue;
            }

            let labels = event.cleaned_labels();
            let event_type = prop_text(props, "eventType");
            let category = event_category(&labels, event_type.as_deref());
            let label = classify_event(category, &labels, event_type.as_deref());
            let name = event_name(category, props);
            let mut node = make_node(id.clone(), label, &name, props.clone(), store_id);
            node.player_ids = player_ids;

            self.insert(node);
            self.set.push_event(id, key);
        }
        self
    }

    /// Other entities, dispatched on their labels.
    pub fn with_entities(mut self, entities: &[RawGraphElement]) -> Self {
        for entity in entities {
            let Some(props) = &entity.properties else {
                self.skip("entity", "missing properties");
                continue;
            };
            let labels = entity.cleaned_labels();
            if labels.is_empty() {
                self.skip("entity", "no labels");
                continue;
            }

            let store_id = entity.store_id();
            let kind = entity_kind(&labels);

            if kind == EntityKind::Player {
                self.add_player_entity(props, store_id);
                continue;
            }

            let Some(identity) = entity_identity(kind, &labels, props, store_id.as_deref()) else {
                self.skip("entity", "missing natural key");
                continue;
            };

            if self.set.contains(&identity.id) {
                self.map_store_id(store_id, &identity.id);
                continue;
            }

            self.insert(make_node(
                identity.id,
                identity.label,
                &identity.name,
                props.clone(),
                store_id,
            ));
        }
        self
    }

    /// A Player inside the entity collection becomes a node only when it is the
    /// scoped actor and not already present; otherwise it is only mapped.
    fn add_player_entity(&mut self, props: &Map<String, Value>, store_id: Option<String>) {
        let Some(player_id) = prop_text(props, "playerId") else {
            self.skip("entity", "player without playerId");
            return;
        };

        let id = actor_id(&player_id);
        if !self.set.contains(&id) && self.scope.is_scoped_actor(&player_id) {
            self.insert(actor_node(&player_id, props, store_id));
            self.set.push_actor(id, player_id);
        } else {
            self.map_store_id(store_id, &id);
        }
    }

    pub fn finish(self) -> NodeSet {
        self.set
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn elements(value: Value) -> Vec<RawGraphElement> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_actors_skip_missing_player_id_and_dedupe() {
        let players = elements(json!([
            {"identity": {"low": 1}, "labels": ["Player"], "properties": {"playerId": "123", "name": "Zezima"}},
            {"identity": {"low": 2}, "labels": ["Player"], "properties": {"name": "NoId"}},
            {"identity": {"low": 9}, "labels": ["Player"], "properties": {"playerId": "123", "name": "Zezima"}},
            {"identity": {"low": 3}, "labels": ["Player"]}
        ]));

        let set = NodeBuilder::new(Scope::Multi).with_actors(&players).finish();

        assert_eq!(set.len(), 1);
        assert_eq!(set.skipped(), 2);
        let node = set.get("player-123").unwrap();
        assert_eq!(node.label, "Player");
        assert_eq!(node.name, "Zezima");
        assert_eq!(node.color, "#000000");
        assert_eq!(set.resolve("1"), Some("player-123"));
        assert_eq!(set.resolve("9"), Some("player-123"));
    }

    #[test]
    fn test_event_keys_fall_back_to_store_id() {
        let events = elements(json!([
            {"identity": 10, "labels": ["XpGainEvent"], "properties": {"uuid": "abc", "eventType": "XP_GAIN", "xpGained": 5, "skill": "Cooking"}},
            {"identity": 11, "labels": [":MenuClickEvent"], "properties": {"eventType": "MENU_CLICK", "action": "Bank"}},
            {"labels": ["Event"], "properties": {}}
        ]));

        let set = NodeBuilder::new(Scope::Multi)
            .with_events(&events, &OwnershipIndex::default())
            .finish();

        assert_eq!(set.len(), 3);
        assert_eq!(set.get("event-abc").unwrap().label, "XP Gain");
        assert_eq!(set.get("event-abc").unwrap().name, "Gained 5 XP in Cooking");
        let menu = set.get("event-11").unwrap();
        assert_eq!(menu.label, "Menu");
        assert_eq!(menu.color, "#0279db");
        assert!(set.nodes()[2].id.starts_with("event-"));
        assert_eq!(set.nodes()[2].label, "Event");
        assert_eq!(set.nodes()[2].name, "Event");
    }

    #[test]
    fn test_entity_dispatch_and_keys() {
        let entities = elements(json!([
            {"identity": 20, "labels": ["Item"], "properties": {"itemId": 526, "name": "Bones"}},
            {"identity": 21, "labels": [":Skill"], "properties": {"name": "Attack"}},
            {"identity": 22, "labels": ["Character"], "properties": {"name": "Goblin"}},
            {"identity": 23, "labels": ["Location"], "properties": {"x": 3200, "y": 3200, "plane": 0}},
            {"identity": 24, "labels": ["AchievementDiary"], "properties": {"name": "Varrock", "tier": "Easy"}},
            {"identity": 25, "labels": ["CombatAchievement"], "properties": {"name": "Noxious Foe"}},
            {"identity": 26, "labels": ["RewardSource"], "properties": {"name": "Barrows"}},
            {"identity": 27, "labels": ["Affliction"], "properties": {"name": "Poison"}},
            {"identity": 28, "labels": ["World"], "properties": {"world": 302}},
            {"identity": 29, "labels": ["Npc"], "properties": {"name": ":Hans"}}
        ]));

        let set = NodeBuilder::new(Scope::Multi).with_entities(&entities).finish();
        let ids: Vec<&str> = set.nodes().iter().map(|n| n.id.as_str()).collect();

        assert_eq!(
            ids,
            vec![
                "item-526",
                "skill-Attack",
                "char-Goblin",
                "loc-3200-3200-0",
                "diary-Varrock-Easy",
                "combat-ach-Noxious Foe",
                "reward-Barrows",
                "affliction-Poison",
                "world-302",
                "entity-29",
            ]
        );
        assert_eq!(set.get("loc-3200-3200-0").unwrap().name, "(3200, 3200, 0)");
        assert_eq!(set.get("diary-Varrock-Easy").unwrap().label, "Diary");
        assert_eq!(set.get("world-302").unwrap().name, "World 302");
        let npc = set.get("entity-29").unwrap();
        assert_eq!(npc.label, "Npc");
        assert_eq!(npc.name, "Hans");
        assert_eq!(npc.color, "#999999");
    }

    #[test]
    fn test_entities_without_key_or_labels_are_skipped() {
        let entities = elements(json!([
            {"identity": 30, "labels": ["Item"], "properties": {}},
            {"identity": 31, "labels": [], "properties": {"name": "x"}},
            {"identity": 32, "labels": ["Skill"]}
        ]));

        let set = NodeBuilder::new(Scope::Multi).with_entities(&entities).finish();
        assert!(set.is_empty());
        assert_eq!(set.skipped(), 3);
    }

    #[test]
    fn test_duplicate_entity_maps_second_store_id() {
        let entities = elements(json!([
            {"identity": 40, "labels": ["Skill"], "properties": {"name": "Attack"}},
            {"identity": 41, "labels": ["Skill"], "properties": {"name": "Attack"}}
        ]));

        let set = NodeBuilder::new(Scope::Multi).with_entities(&entities).finish();
        assert_eq!(set.len(), 1);
        assert_eq!(set.resolve("40"), Some("skill-Attack"));
        assert_eq!(set.resolve("41"), Some("skill-Attack"));
    }

    #[test]
    fn test_player_entities_respect_scope() {
        let players = elements(json!([
            {"identity": 1, "labels": ["Player"], "properties": {"playerId": "1", "name": "Main"}}
        ]));
        let entities = elements(json!([
            {"identity": 50, "labels": ["Player"], "properties": {"playerId": "1", "name": "Main"}},
            {"identity": 51, "labels": ["Player"], "properties": {"playerId": "2", "name": "Alt"}}
        ]));

        let set = NodeBuilder::new(Scope::Single("1".to_string()))
            .with_actors(&players)
            .with_entities(&entities)
            .finish();

        assert_eq!(set.len(), 1);
        assert_eq!(set.resolve("50"), Some("player-1"));
        assert_eq!(set.resolve("51"), None);
        assert_eq!(set.actors().len(), 1);
    }

    #[test]
    fn test_scoped_player_entity_is_admitted_when_absent() {
        let entities = elements(json!([
            {"identity": 60, "labels": ["Player"], "properties": {"playerId": "7", "name": "Solo"}}
        ]));

        let set = NodeBuilder::new(Scope::Single("7".to_string()))
            .with_entities(&entities)
            .finish();

        assert_eq!(set.get("player-7").unwrap().name, "Solo");
        assert_eq!(set.actor_key("player-7"), Some("7"));
    }
}
