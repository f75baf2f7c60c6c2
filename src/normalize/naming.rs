//! Event classification and display-name synthesis.

use serde_json::{Map, Value};

use super::palette::Category;
use super::raw::{display_value, first_text, prop_f64, prop_flag, prop_text};

struct EventRule {
    category: Category,
    labels: &'static [&'static str],
    event_types: &'static [&'static str],
}

/// Priority-ordered; the first rule matching a label or the event type wins.
const EVENT_RULES: [EventRule; 10] = [
    EventRule {
        category: Category::Combat,
        labels: &["CombatEvent", "HitSplatEvent"],
        event_types: &["HIT_SPLAT"],
    },
    EventRule {
        category: Category::Kill,
        labels: &["KillEvent", "MonsterKillEvent"],
        event_types: &["MONSTER_KILL"],
    },
    EventRule {
        category: Category::XpGain,
        labels: &["XpGainEvent"],
        event_types: &["XP_GAIN"],
    },
    EventRule {
        category: Category::Inventory,
        labels: &["InventoryChangeEvent"],
        event_types: &["INVENTORY_CHANGE"],
    },
    EventRule {
        category: Category::Menu,
        labels: &["MenuClickEvent"],
        event_types: &["MENU_CLICK"],
    },
    EventRule {
        category: Category::WorldChange,
        labels: &["WorldChangeEvent"],
        event_types: &["WORLD_CHANGE"],
    },
    EventRule {
        category: Category::Quest,
        labels: &["QuestCompletionEvent"],
        event_types: &["QUEST_COMPLETION"],
    },
    EventRule {
        category: Category::Diary,
        labels: &["AchievementDiaryEvent"],
        event_types: &["ACHIEVEMENT_DIARY_COMPLETION"],
    },
    EventRule {
        category: Category::CombatAchievement,
        labels: &["CombatAchievementEvent"],
        event_types: &["COMBAT_ACHIEVEMENT_COMPLETION"],
    },
    EventRule {
        category: Category::Reward,
        labels: &["RewardEvent", "LootEvent"],
        event_types: &["REWARD", "LOOT"],
    },
];

/// The category of the first rule matching a label or the event type. Labels
/// and `eventType` are equivalent, so records carrying only one of them
/// classify the same way.
pub fn event_category(labels: &[String], event_type: Option<&str>) -> Option<Category> {
    EVENT_RULES
        .iter()
        .find(|rule| {
            labels.iter().any(|label| rule.labels.contains(&label.as_str()))
                || event_type.map_or(false, |t| rule.event_types.contains(&t))
        })
        .map(|rule| rule.category)
}

/// Display label for an event: its category, else the first raw label,
/// else the raw event type, else `Event`.
pub fn classify_event(
    category: Option<Category>,
    labels: &[String],
    event_type: Option<&str>,
) -> String {
    match category {
        Some(category) => category.label().to_string(),
        None => labels
            .first()
            .cloned()
            .or_else(|| event_type.map(str::to_string))
            .unwrap_or_else(|| "Event".to_string()),
    }
}

pub fn is_incoming(props: &Map<String, Value>) -> bool {
    prop_text(props, "direction").map_or(false, |d| d.eq_ignore_ascii_case("incoming"))
}

/// Damage-taken event: an incoming combat event.
pub fn is_damage_taken(category: Option<Category>, props: &Map<String, Value>) -> bool {
    category == Some(Category::Combat) && is_incoming(props)
}

pub fn event_name(category: Option<Category>, props: &Map<String, Value>) -> String {
    match category {
        Some(Category::Combat) if is_incoming(props) => damage_taken_name(props, None),
        Some(Category::Combat) => damage_dealt_name(props, None),
        Some(Category::XpGain) => xp_gain_name(props),
        Some(Category::Inventory) => inventory_name(props),
        Some(Category::Menu) => menu_name(props),
        Some(Category::WorldChange) => match prop_text(props, "world") {
            Some(world) => format!("Hopped to world {}", world),
            None => "World Change".to_string(),
        },
        Some(Category::Quest) if props.contains_key("questName") => quest_name(props),
        Some(Category::Diary) if props.contains_key("diaryName") => {
            let diary = prop_text(props, "diaryName").unwrap_or_default();
            let tier = first_text(props, &["diaryTier", "tier"]).unwrap_or_default();
            format!("Completed {} {}", diary, tier).trim_end().to_string()
        }
        Some(Category::CombatAchievement) if props.contains_key("achievementName") => {
            let name = prop_text(props, "achievementName").unwrap_or_default();
            match first_text(props, &["tier", "achievementTier"]) {
                Some(tier) => format!("Unlocked {} ({})", name, tier),
                None => format!("Unlocked {}", name),
            }
        }
        Some(Category::Kill) => kill_name(props),
        Some(Category::Reward) => reward_name(props),
        _ => prop_text(props, "eventType").unwrap_or_else(|| "Event".to_string()),
    }
}

/// `Hit {target} for {damage} damage`, with an explicit target overriding the property.
pub fn damage_dealt_name(props: &Map<String, Value>, target: Option<&str>) -> String {
    let target = target
        .map(str::to_string)
        .or_else(|| prop_text(props, "target"))
        .unwrap_or_else(|| "Unknown".to_string());
    let damage = prop_text(props, "damage").unwrap_or_else(|| "0".to_string());
    let mut name = format!("Hit {} for {} damage", target, damage);
    if prop_flag(props, "isMaxHit") || prop_flag(props, "maxHit") {
        name.push_str(" (MAX HIT)");
    }
    name
}

/// `Took {damage} damage from {source}`, with an explicit source overriding the properties.
pub fn damage_taken_name(props: &Map<String, Value>, source: Option<&str>) -> String {
    let source = source
        .map(str::to_string)
        .or_else(|| first_text(props, &["source", "damageType", "typeString"]))
        .unwrap_or_else(|| "Unknown".to_string());
    let damage = prop_text(props, "damage").unwrap_or_else(|| "0".to_string());
    format!("Took {} damage from {}", damage, source)
}

fn xp_gain_name(props: &Map<String, Value>) -> String {
    let amount = first_text(props, &["xpGained", "amount", "xp"]).unwrap_or_else(|| "?".to_string());
    let skill = prop_text(props, "skill").unwrap_or_else(|| "Unknown".to_string());
    let mut name = format!("Gained {} XP in {}", amount, skill);
    if let Some(level) = first_text(props, &["level", "newLevel"]) {
        name.push_str(&format!(" (level {})", level));
    }
    name
}

fn inventory_name(props: &Map<String, Value>) -> String {
    let item = first_text(props, &["itemName", "name"]).unwrap_or_else(|| "Unknown Item".to_string());
    let change = prop_text(props, "changeType");
    let verb = match change.as_deref().map(str::to_ascii_uppercase).as_deref() {
        Some("MOVE") | Some("MOVED") => return format!("Moved {}", item),
        Some("ADD") | Some("ADDED") => "Added".to_string(),
        Some("REMOVE") | Some("REMOVED") => "Removed".to_string(),
        Some(_) => change.unwrap_or_default(),
        None => "Changed".to_string(),
    };

    let mut name = format!("{} {}", verb, item);
    if let Some(quantity) = prop_f64(props, "quantity").filter(|q| *q > 1.0) {
        let quantity = props
            .get("quantity")
            .and_then(display_value)
            .unwrap_or_else(|| quantity.to_string());
        name.push_str(&format!(" x{}", quantity));
    }
    name
}

fn menu_name(props: &Map<String, Value>) -> String {
    let action = prop_text(props, "action").unwrap_or_else(|| "?".to_string());
    match prop_text(props, "target") {
        Some(target) => {
            let mut name = format!("{} {}", action, target);
            if let Some(target_type) = prop_text(props, "targetType") {
                name.push_str(&format!(" ({})", target_type));
            }
            name
        }
        None => action,
    }
}

fn quest_name(props: &Map<String, Value>) -> String {
    let quest = prop_text(props, "questName").unwrap_or_else(|| "Unknown Quest".to_string());
    match prop_text(props, "questPoints") {
        Some(points) => format!("Completed {} ({} QP)", quest, points),
        None => format!("Completed {}", quest),
    }
}

fn kill_name(props: &Map<String, Value>) -> String {
    let monster =
        first_text(props, &["monsterName", "npcName"]).unwrap_or_else(|| "Unknown".to_string());
    let drops = match props.get("drops") {
        Some(Value::Array(drops)) => drops.len(),
        _ => prop_f64(props, "dropCount").map_or(0, |n| n.max(0.0) as usize),
    };
    let plural = if drops == 1 { "drop" } else { "drops" };

    match prop_text(props, "combatLevel") {
        Some(level) => format!("Killed {} (lvl {}) - {} {}", monster, level, drops, plural),
        None => format!("Killed {} - {} {}", monster, drops, plural),
    }
}

fn reward_name(props: &Map<String, Value>) -> String {
    let source =
        first_text(props, &["source", "rewardSource"]).unwrap_or_else(|| "Unknown".to_string());
    let mut name = format!("Reward from {}", source);
    if prop_f64(props, "count").map_or(false, |c| c > 1.0) {
        if let Some(count) = prop_text(props, "count") {
            name.push_str(&format!(" (x{})", count));
        }
    }
    name
}
