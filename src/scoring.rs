// 🏅 Tier Score Calculator - Discrete tier + rank → continuous score

use crate::model::{Song, Tier, TierBand};
use std::collections::{BTreeMap, HashMap};

/// Score of the member at `index` (0 = best rank) among `count` members of a band
///
/// - zero-width band → its single value
/// - lone member → `max - 0.01`, so it never looks tied with a full band's top
/// - otherwise linear from `max` (best) down to `min` (worst)
pub fn band_score(band: TierBand, index: usize, count: usize) -> f64 {
    let width = band.max - band.min;
    if width == 0.0 {
        return band.max;
    }
    if count <= 1 {
        return band.max - 0.01;
    }
    band.max - width * (index as f64) / ((count - 1) as f64)
}

/// Score every main-list song that has a tier
///
/// Keyed by normalized title. Songs outside the main list or without a tier
/// get no score.
pub fn calculate_tier_scores(songs: &[Song]) -> HashMap<String, f64> {
    let mut by_tier: BTreeMap<Tier, Vec<&Song>> = BTreeMap::new();
    for song in songs.iter().filter(|s| s.is_main()) {
        if let Some(tier) = song.tier {
            by_tier.entry(tier).or_default().push(song);
        }
    }

    let mut scores = HashMap::new();
    for (tier, mut members) in by_tier {
        members.sort_by_key(|s| s.rank);
        let count = members.len();
        for (index, song) in members.into_iter().enumerate() {
            scores.insert(song.key(), band_score(tier.band(), index, count));
        }
    }

    scores
}

// ============================================================================
// TESTS
// ============================================================================
