// 👹 Demon List - Level sheet records, hierarchy filter, list slices

use crate::csv_reader::{field, Record};
use serde::{Deserialize, Serialize};

/// Completion categories, most prestigious first
pub const DEMON_LIST_HIERARCHY: [&str; 7] = [
    "Pointercrate",
    "Verified",
    "Verification Progress",
    "Completed",
    ">50% Complete",
    "<50% Complete",
    "0% Complete",
];

/// Entries in the main slice; the extended slice holds the same number again
pub const MAIN_LIST_SIZE: usize = 75;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemonLevel {
    pub name: String,
    pub creator: String,
    pub thumbnail: String,
    /// Hierarchy category, `Verified` when the sheet leaves it blank
    pub list: String,
    pub rank: u32,
}

/// Which slice of the filtered list to show
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DemonListType {
    /// Ranks 1-75
    #[default]
    Main,
    /// Ranks 76-150
    Extended,
    /// Ranks 1-150
    All,
}

impl DemonListType {
    pub fn parse(raw: &str) -> Option<DemonListType> {
        match raw.trim().to_lowercase().as_str() {
            "main" => Some(DemonListType::Main),
            "extended" => Some(DemonListType::Extended),
            "all" => Some(DemonListType::All),
            _ => None,
        }
    }

    fn bounds(&self) -> (usize, usize) {
        match self {
            DemonListType::Main => (0, MAIN_LIST_SIZE),
            DemonListType::Extended => (MAIN_LIST_SIZE, MAIN_LIST_SIZE * 2),
            DemonListType::All => (0, MAIN_LIST_SIZE * 2),
        }
    }
}

/// Position of a category in the hierarchy (case-insensitive)
pub fn hierarchy_index(list: &str) -> Option<usize> {
    let list = list.trim();
    DEMON_LIST_HIERARCHY.iter().position(|l| l.eq_ignore_ascii_case(list))
}

/// Parse demon sheet records, dropping rows without a `name`
///
/// Rank comes from `rank`, then `#`, then the 1-based row position.
pub fn parse_demon_levels(records: &[Record]) -> Vec<DemonLevel> {
    records
        .iter()
        .enumerate()
        .filter(|(_, r)| !field(r, "name").is_empty())
        .map(|(i, r)| {
            let rank_cell = match field(r, "rank") {
                "" => field(r, "#"),
                cell => cell,
            };
            DemonLevel {
                name: field(r, "name").to_string(),
                creator: field(r, "creator").to_string(),
                thumbnail: field(r, "image").to_string(),
                list: match field(r, "list") {
                    "" => "Verified".to_string(),
                    l => l.to_string(),
                },
                rank: rank_cell.parse().ok().filter(|n| *n > 0).unwrap_or(i as u32 + 1),
            }
        })
        .collect()
}

/// Levels at or above `filter` in the hierarchy, re-ranked 1..N, then sliced
///
/// An unknown `filter` keeps nothing, as do levels whose category is unknown.
pub fn filter_demon_levels(levels: &[DemonLevel], filter: &str, list_type: DemonListType) -> Vec<DemonLevel> {
    let Some(limit) = hierarchy_index(filter) else {
        return Vec::new();
    };

    let (start, end) = list_type.bounds();
    levels
        .iter()
        .filter(|l| hierarchy_index(&l.list).is_some_and(|i| i <= limit))
        .enumerate()
        .map(|(i, l)| DemonLevel { rank: i as u32 + 1, ..l.clone() })
        .skip(start)
        .take(end - start)
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================
