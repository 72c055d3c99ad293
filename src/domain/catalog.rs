//! Built-in item catalog, category tables and item search.

use std::{collections::HashMap, sync::OnceLock};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::entities::ItemId;

/// Remote item dumps can be large; searches return at most this many hits.
pub const MAX_CATALOG_RESULTS: usize = 50;

const TIERS: std::ops::RangeInclusive<u8> = 4..=8;

/// Item families in catalog order: (id suffix, base display name).
const FAMILIES: &[(&str, &str)] = &[
    ("BAG", "Bag"),
    ("LEATHER", "Leather"),
    ("CLOTH", "Cloth"),
    ("METALBAR", "Metal Bar"),
    ("PLANKS", "Planks"),
    ("STONEBLOCK", "Stone Block"),
    ("SWORD", "Broadsword"),
    ("AXE", "Battleaxe"),
    ("MACE", "Mace"),
    ("SPEAR", "Spear"),
    ("BOW", "Bow"),
    ("CROSSBOW", "Crossbow"),
    ("DAGGER", "Dagger"),
    ("FIRESTAFF", "Fire Staff"),
    ("ARMOR_CLOTH_SET1", "Scholar Robe"),
    ("ARMOR_LEATHER_SET1", "Mercenary Jacket"),
    ("ARMOR_PLATE_SET1", "Soldier Armor"),
    ("CAPE", "Cape"),
    ("TOOL_PICKAXE", "Pickaxe"),
    ("MEAL_SOUP", "Soup"),
    ("POTION_HEAL", "Healing Potion"),
];

/// Category -> subcategory -> item families (each expanded over all tiers).
const CATEGORIES: &[(&str, &[(&str, &[&str])])] = &[
    (
        "Weapons",
        &[
            ("Swords", &["SWORD"]),
            ("Axes", &["AXE"]),
            ("Maces", &["MACE"]),
            ("Spears", &["SPEAR"]),
            ("Bows", &["BOW"]),
            ("Crossbows", &["CROSSBOW"]),
            ("Daggers", &["DAGGER"]),
            ("Staves", &["FIRESTAFF"]),
        ],
    ),
    (
        "Armor",
        &[
            ("Cloth Armor", &["ARMOR_CLOTH_SET1"]),
            ("Leather Armor", &["ARMOR_LEATHER_SET1"]),
            ("Plate Armor", &["ARMOR_PLATE_SET1"]),
        ],
    ),
    (
        "Accessories",
        &[
            ("Bags", &["BAG"]),
            ("Capes", &["CAPE"]),
            ("Tools", &["TOOL_PICKAXE"]),
        ],
    ),
    (
        "Materials",
        &[
            ("Refined Materials", &["LEATHER", "CLOTH"]),
            ("Metal Bars", &["METALBAR"]),
            ("Planks", &["PLANKS"]),
            ("Stone Blocks", &["STONEBLOCK"]),
        ],
    ),
    (
        "Consumables",
        &[("Food", &["MEAL_SOUP"]), ("Potions", &["POTION_HEAL"])],
    ),
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("unknown category: {0}")]
    UnknownCategory(String),
    #[error("unknown subcategory '{subcategory}' in {category}")]
    UnknownSubcategory {
        category: String,
        subcategory: String,
    },
}

/// An item of the built-in catalog.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: ItemId,
    pub name: String,
    pub tier: u8,
    pub enchantment: u8,
}

/// Entry of the community item dump (`items.json`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AlbionItem {
    #[serde(rename = "UniqueName", default)]
    pub unique_name: String,
    #[serde(rename = "LocalizedNames", default)]
    pub localized_names: Option<HashMap<String, String>>,
    #[serde(rename = "Index", default)]
    pub index: String,
}

impl AlbionItem {
    pub fn english_name(&self) -> Option<&str> {
        self.localized_names
            .as_ref()
            .and_then(|names| names.get("EN-US"))
            .map(String::as_str)
    }
}

pub fn tier_prefix(tier: u8) -> &'static str {
    match tier {
        4 => "Adept",
        5 => "Expert",
        6 => "Master",
        7 => "Grandmaster",
        8 => "Elder",
        _ => "Unknown",
    }
}

/// Every built-in item, tiers ascending within each family.
pub fn common_items() -> &'static [CatalogItem] {
    static ITEMS: OnceLock<Vec<CatalogItem>> = OnceLock::new();
    ITEMS.get_or_init(|| {
        FAMILIES
            .iter()
            .flat_map(|&(code, base)| TIERS.map(move |tier| catalog_item(tier, code, base)))
            .collect()
    })
}

fn catalog_item(tier: u8, code: &str, base: &str) -> CatalogItem {
    CatalogItem {
        id: format!("T{tier}_{code}"),
        name: format!("{}'s {base}", tier_prefix(tier)),
        tier,
        enchantment: 0,
    }
}

pub fn item_by_id(id: &str) -> Option<&'static CatalogItem> {
    common_items().iter().find(|item| item.id == id)
}

/// Case-insensitive substring search over names and ids. A blank query
/// matches nothing.
pub fn search_items(query: &str) -> Vec<&'static CatalogItem> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }

    common_items()
        .iter()
        .filter(|item| {
            item.name.to_lowercase().contains(&needle) || item.id.to_lowercase().contains(&needle)
        })
        .collect()
}

pub fn category_names() -> Vec<&'static str> {
    CATEGORIES.iter().map(|(name, _)| *name).collect()
}

pub fn subcategory_names(category: &str) -> Result<Vec<&'static str>, CatalogError> {
    let subcategories = find_category(category)?;
    Ok(subcategories.iter().map(|(name, _)| *name).collect())
}

/// Items of a category, or of one of its subcategories, in table order.
pub fn items_by_category(
    category: &str,
    subcategory: Option<&str>,
) -> Result<Vec<&'static CatalogItem>, CatalogError> {
    let subcategories = find_category(category)?;

    let families: Vec<&str> = match subcategory {
        Some(wanted) => subcategories
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(wanted))
            .map(|(_, families)| families.to_vec())
            .ok_or_else(|| CatalogError::UnknownSubcategory {
                category: category.to_string(),
                subcategory: wanted.to_string(),
            })?,
        None => subcategories
            .iter()
            .flat_map(|(_, families)| families.iter().copied())
            .collect(),
    };

    Ok(families
        .into_iter()
        .flat_map(|code| TIERS.map(move |tier| format!("T{tier}_{code}")))
        .filter_map(|id| item_by_id(&id))
        .collect())
}

fn find_category(category: &str) -> Result<&'static [(&'static str, &'static [&'static str])], CatalogError> {
    CATEGORIES
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(category))
        .map(|(_, subcategories)| *subcategories)
        .ok_or_else(|| CatalogError::UnknownCategory(category.to_string()))
}

/// Search over a downloaded item dump, matching the English name or the
/// unique name. Capped at [`MAX_CATALOG_RESULTS`].
pub fn search_catalog<'a>(items: &'a [AlbionItem], query: &str) -> Vec<&'a AlbionItem> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }

    items
        .iter()
        .filter(|item| {
            let name = item.english_name().unwrap_or_default().to_lowercase();
            name.contains(&needle) || item.unique_name.to_lowercase().contains(&needle)
        })
        .take(MAX_CATALOG_RESULTS)
        .collect()
}
