//! Display categories and the one table that binds each to its color.

use serde::{Deserialize, Serialize};

use crate::models::LegendEntry;

/// Color used for labels that do not belong to a known category.
pub const FALLBACK_COLOR: &str = "#999999";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Player,
    Combat,
    Kill,
    XpGain,
    Item,
    Menu,
    Inventory,
    Quest,
    Diary,
    CombatAchievement,
    Skill,
    Character,
    Location,
    Reward,
    Affliction,
    Object,
    WorldChange,
    World,
}

struct PaletteEntry {
    category: Category,
    label: &'static str,
    color: &'static str,
}

/// Indexed by `Category as usize`; the order doubles as the legend order.
static PALETTE: [PaletteEntry; 18] = [
    PaletteEntry { category: Category::Player, label: "Player", color: "#000000" },
    PaletteEntry { category: Category::Combat, label: "Combat", color: "#f57e64" },
    PaletteEntry { category: Category::Kill, label: "Kill", color: "#fa0202" },
    PaletteEntry { category: Category::XpGain, label: "XP Gain", color: "#80bf9b" },
    PaletteEntry { category: Category::Item, label: "Item", color: "#F1C40F" },
    PaletteEntry { category: Category::Menu, label: "Menu", color: "#0279db" },
    PaletteEntry { category: Category::Inventory, label: "Inventory", color: "#78b0de" },
    PaletteEntry { category: Category::Quest, label: "Quest", color: "#88fcf1" },
    PaletteEntry { category: Category::Diary, label: "Diary", color: "#F687B3" },
    PaletteEntry {
        category: Category::CombatAchievement,
        label: "Combat Achievement",
        color: "#e07ede",
    },
    PaletteEntry { category: Category::Skill, label: "Skill", color: "#027a34" },
    PaletteEntry { category: Category::Character, label: "Character", color: "#8B4513" },
    PaletteEntry { category: Category::Location, label: "Location", color: "#CBD5E0" },
    PaletteEntry { category: Category::Reward, label: "Reward", color: "#8E44AD" },
    PaletteEntry { category: Category::Affliction, label: "Affliction", color: "#03fc88" },
    PaletteEntry { category: Category::Object, label: "Object", color: "#D0AC5E" },
    PaletteEntry { category: Category::WorldChange, label: "World Change", color: "#ECC94B" },
    PaletteEntry { category: Category::World, label: "World", color: "#B7791F" },
];

impl Category {
    pub const ALL: [Category; 18] = [
        Category::Player,
        Category::Combat,
        Category::Kill,
        Category::XpGain,
        Category::Item,
        Category::Menu,
        Category::Inventory,
        Category::Quest,
        Category::Diary,
        Category::CombatAchievement,
        Category::Skill,
        Category::Character,
        Category::Location,
        Category::Reward,
        Category::Affliction,
        Category::Object,
        Category::WorldChange,
        Category::World,
    ];

    fn entry(self) -> &'static PaletteEntry {
        &PALETTE[self as usize]
    }

    pub fn label(self) -> &'static str {
        self.entry().label
    }

    pub fn color(self) -> &'static str {
        self.entry().color
    }

    pub fn from_label(label: &str) -> Option<Self> {
        PALETTE
            .iter()
            .find(|entry| entry.label == label)
            .map(|entry| entry.category)
    }
}

pub fn color_for_label(label: &str) -> &'static str {
    Category::from_label(label)
        .map(Category::color)
        .unwrap_or(FALLBACK_COLOR)
}

pub fn legend() -> Vec<LegendEntry> {
    PALETTE
        .iter()
        .map(|entry| LegendEntry {
            label: entry.label,
            color: entry.color,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_table_is_indexed_by_discriminant() {
        for category in Category::ALL {
            assert_eq!(PALETTE[category as usize].category, category);
        }
    }

    #[test]
    fn test_labels_round_trip_and_are_unique() {
        let mut seen = HashSet::new();
        for category in Category::ALL {
            assert!(seen.insert(category.label()), "duplicate label {}", category.label());
            assert_eq!(Category::from_label(category.label()), Some(category));
            assert_eq!(color_for_label(category.label()), category.color());
        }
    }

    #[test]
    fn test_unknown_label_gets_fallback_color() {
        assert_eq!(Category::from_label("Banana"), None);
        assert_eq!(color_for_label("Banana"), FALLBACK_COLOR);
    }

    #[test]
    fn test_legend_follows_table_order() {
        let legend = legend();
        assert_eq!(legend.len(), Category::ALL.len());
        assert_eq!(legend[0].label, "Player");
        assert_eq!(legend[2].label, "Kill");
    }
}
