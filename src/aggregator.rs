// 📈 History Aggregator - Snapshots → per-song position histories

use crate::changelog::ArtistLookup;
use crate::model::normalize_title;
use crate::temporal::{EntityHistory, HistoryPoint, Snapshot};
use std::collections::HashMap;

/// Fold date-ordered snapshots into one history per normalized title
///
/// A point is recorded only when a song's rank differs from its previous
/// recorded rank. When two snapshots share a timestamp the later one in
/// the sequence replaces the earlier point, so dates stay strictly
/// increasing. Output is ordered by title.
pub fn build_histories(snapshots: &[Snapshot], artists: &ArtistLookup) -> Vec<EntityHistory> {
    let mut by_key: HashMap<String, EntityHistory> = HashMap::new();

    for snapshot in snapshots {
        for song in snapshot.songs.iter().filter(|s| s.rank > 0) {
            let key = normalize_title(&song.title);
            let entity = by_key.entry(key.clone()).or_insert_with(|| EntityHistory {
                artist: artists.get(&key).cloned().unwrap_or_else(|| song.artist.clone()),
                key,
                title: song.title.clone(),
                history: Vec::new(),
                first_seen: snapshot.date,
            });

            let point = |prior: Option<usize>| HistoryPoint {
                date: snapshot.date,
                rank: song.rank,
                reason: song.reason.clone().unwrap_or_else(|| match prior {
                    Some(old) => format!("Rank updated from #{} to #{}", old, song.rank),
                    None => format!("{} placed at #{}", song.title, song.rank),
                }),
                revision_label: snapshot.revision_label.clone(),
            };

            let history = &mut entity.history;
            match history.last().map(|last| (last.rank, last.date)) {
                None => history.push(point(None)),
                Some((rank, _)) if rank == song.rank => {}
                Some((_, date)) if date == snapshot.date => {
                    // Replacing the last point: describe it against the one before
                    let len = history.len();
                    let before = len.checked_sub(2).map(|i| history[i].rank);
                    if before == Some(song.rank) {
                        history.pop();
                    } else {
                        history[len - 1] = point(before);
                    }
                }
                Some((old, _)) => history.push(point(Some(old))),
            }
        }
    }

    let mut histories: Vec<EntityHistory> = by_key.into_values().collect();
    histories.sort_by(|a, b| a.title.cmp(&b.title).then_with(|| a.key.cmp(&b.key)));
    histories
}

/// Look up one history by any spelling of its title
pub fn find_history<'a>(histories: &'a [EntityHistory], title: &str) -> Option<&'a EntityHistory> {
    let key = normalize_title(title);
    histories.iter().find(|h| h.key == key)
}

// ============================================================================
// TESTS
// ============================================================================
