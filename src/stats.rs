// 📊 Collection Stats - Totals, tier distribution, top artists

use crate::model::{Song, SongType, Tier, UNKNOWN_ARTIST};
use crate::temporal::EntityHistory;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Artists shown in the top-artists table
pub const TOP_ARTIST_LIMIT: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierCount {
    pub tier: Tier,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtistCount {
    pub artist: String,
    pub count: usize,
}

/// CollectionStats - Summary of one song list
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionStats {
    pub total: usize,
    pub unique_artists: usize,
    pub vocal: usize,
    pub instrumental: usize,
    /// Every tier in tier order, zero counts included
    pub by_tier: Vec<TierCount>,
    pub top_artists: Vec<ArtistCount>,
}

impl CollectionStats {
    /// Share of the total as a percentage, 0 for an empty list
    pub fn percent(&self, count: usize) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            count as f64 * 100.0 / self.total as f64
        }
    }
}

pub fn collection_stats(songs: &[&Song]) -> CollectionStats {
    let mut by_artist: HashMap<&str, usize> = HashMap::new();
    let mut by_tier: HashMap<Tier, usize> = HashMap::new();
    let mut stats = CollectionStats { total: songs.len(), ..Default::default() };

    for song in songs {
        *by_artist.entry(song.artist.as_str()).or_default() += 1;
        if let Some(tier) = song.tier {
            *by_tier.entry(tier).or_default() += 1;
        }
        match song.song_type {
            SongType::Vocal => stats.vocal += 1,
            SongType::Instrumental => stats.instrumental += 1,
        }
    }

    stats.unique_artists = by_artist.len();
    stats.by_tier = Tier::ALL
        .iter()
        .map(|t| TierCount { tier: *t, count: by_tier.get(t).copied().unwrap_or(0) })
        .collect();

    let mut artists: Vec<ArtistCount> = by_artist
        .into_iter()
        .map(|(artist, count)| ArtistCount { artist: artist.to_string(), count })
        .collect();
    artists.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.artist.cmp(&b.artist)));
    artists.truncate(TOP_ARTIST_LIMIT);
    stats.top_artists = artists;

    stats
}

/// Distinct known artists across the sheet and every history, sorted
pub fn unique_artists(songs: &[Song], histories: &[EntityHistory]) -> Vec<String> {
    songs
        .iter()
        .map(|s| s.artist.as_str())
        .chain(histories.iter().map(|h| h.artist.as_str()))
        .filter(|a| !a.is_empty() && *a != UNKNOWN_ARTIST)
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================
