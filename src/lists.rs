// 🗂️ Ranking Lists - Main, unranked, legacy, past-revision and song-detail projections

use crate::catalog::SongCatalog;
use crate::model::{normalize_title, parse_calendar_date, Song, Tier, PLACEHOLDER_IMAGE};
use crate::temporal::{EntityHistory, Snapshot};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Rank reported for a legacy song whose history is empty
pub const UNKNOWN_LAST_RANK: usize = 9999;

/// Songs flagged `Y`, best rank first
pub fn main_songs(songs: &[Song]) -> Vec<&Song> {
    let mut main: Vec<&Song> = songs.iter().filter(|s| s.is_main()).collect();
    main.sort_by_key(|s| s.rank);
    main
}

/// Songs flagged `U`, oldest `date added` first (missing or unreadable dates first)
pub fn unranked_songs(songs: &[Song]) -> Vec<&Song> {
    let mut unranked: Vec<&Song> = songs.iter().filter(|s| s.is_unranked()).collect();
    unranked.sort_by_key(|s| s.date_added.as_deref().and_then(parse_calendar_date));
    unranked
}

/// LegacySong - A song that was ranked once and is no longer listed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacySong {
    pub song: Song,
    /// Date of the last snapshot the song appeared in
    pub removed_date: Option<NaiveDateTime>,
    pub last_rank: usize,
}

/// Every history whose title is neither main nor unranked today
///
/// Sheet metadata is reused when the catalog still knows the title. Ordered by
/// last-seen date (most recent first), then by last rank.
pub fn legacy_songs(catalog: &SongCatalog, snapshots: &[Snapshot], histories: &[EntityHistory]) -> Vec<LegacySong> {
    let current: HashSet<String> = catalog
        .songs
        .iter()
        .filter(|s| s.is_main() || s.is_unranked())
        .map(Song::key)
        .collect();

    let mut last_seen: HashMap<String, NaiveDateTime> = HashMap::new();
    for snapshot in snapshots {
        for entry in &snapshot.songs {
            last_seen.insert(normalize_title(&entry.title), snapshot.date);
        }
    }

    let mut legacy: Vec<LegacySong> = histories
        .iter()
        .filter(|h| !current.contains(&h.key))
        .map(|h| {
            let mut song = catalog.get(&h.title).cloned().unwrap_or_else(|| Song::new(&h.title, &h.artist));
            song.title = h.title.clone();
            song.artist = h.artist.clone();
            song.rank = 0;
            song.tier = None;
            song.image_url = catalog.thumbnail(&h.title).to_string();

            LegacySong {
                song,
                removed_date: last_seen.get(&h.key).copied(),
                last_rank: h.last_rank().unwrap_or(UNKNOWN_LAST_RANK),
            }
        })
        .collect();

    legacy.sort_by(|a, b| b.removed_date.cmp(&a.removed_date).then(a.last_rank.cmp(&b.last_rank)));
    legacy
}

/// One entry of a past snapshot seen from today
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevisionEntry {
    /// Rank inside the past snapshot
    pub rank: usize,
    pub title: String,
    pub artist: String,
    pub image_url: String,
    pub tier: Option<Tier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Rank in today's main list, none when the song left it
    pub current_rank: Option<u32>,
    /// Position among the snapshot's songs that are still in the main list
    pub relative_historical_rank: Option<usize>,
    /// Today's order among those same surviving songs
    pub relative_current_rank: Option<usize>,
}

/// Annotate a past snapshot with today's ranks
pub fn revision_view(snapshot: &Snapshot, catalog: &SongCatalog) -> Vec<RevisionEntry> {
    let current: HashMap<String, u32> = main_songs(&catalog.songs)
        .into_iter()
        .map(|s| (s.key(), s.rank))
        .collect();

    let survivors: Vec<String> = snapshot
        .songs
        .iter()
        .map(|s| normalize_title(&s.title))
        .filter(|k| current.contains_key(k))
        .collect();

    let historical: HashMap<&str, usize> = survivors.iter().enumerate().map(|(i, k)| (k.as_str(), i + 1)).collect();

    let mut by_current = survivors.clone();
    by_current.sort_by_key(|k| current[k]);
    let relative_current: HashMap<&str, usize> =
        by_current.iter().enumerate().map(|(i, k)| (k.as_str(), i + 1)).collect();

    snapshot
        .songs
        .iter()
        .map(|entry| {
            let key = normalize_title(&entry.title);
            let song = catalog.get(&entry.title);
            RevisionEntry {
                rank: entry.rank,
                title: entry.title.clone(),
                artist: entry.artist.clone(),
                image_url: song
                    .map(|s| catalog.thumbnail(&s.title).to_string())
                    .unwrap_or_else(|| PLACEHOLDER_IMAGE.to_string()),
                tier: song.and_then(|s| s.tier),
                reason: entry.reason.clone(),
                current_rank: current.get(&key).copied(),
                relative_historical_rank: historical.get(key.as_str()).copied(),
                relative_current_rank: relative_current.get(key.as_str()).copied(),
            }
        })
        .collect()
}

/// One history point with its movement against the point before it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRow {
    pub date: NaiveDateTime,
    pub rank: usize,
    /// Positive = climbed; none for the first recorded point
    pub movement: Option<i64>,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision_label: Option<String>,
}

/// Song detail: peak, position in the newest snapshot and filtered points
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryView {
    pub title: String,
    pub artist: String,
    pub first_seen: NaiveDateTime,
    pub peak_rank: Option<usize>,
    /// Position in `latest`, none when the song is not in it
    pub latest_position: Option<usize>,
    pub points: Vec<HistoryRow>,
}

/// Project a history, keeping points on or after `since`
///
/// Movement is always measured against the full history, so the first
/// kept point still shows how it got there.
pub fn history_view(history: &EntityHistory, since: Option<NaiveDateTime>, latest: Option<&Snapshot>) -> HistoryView {
    let kept = match since {
        Some(date) => history.since(date).count(),
        None => history.history.len(),
    };
    let skipped = history.history.len() - kept;

    let points = history.history[skipped..]
        .iter()
        .enumerate()
        .map(|(i, point)| HistoryRow {
            date: point.date,
            rank: point.rank,
            movement: history.movement_at(skipped + i),
            reason: point.reason.clone(),
            revision_label: point.revision_label.clone(),
        })
        .collect();

    HistoryView {
        title: history.title.clone(),
        artist: history.artist.clone(),
        first_seen: history.first_seen,
        peak_rank: history.peak_rank(),
        latest_position: latest.and_then(|s| s.position_of(&history.key)),
        points,
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::changelog::ArtistLookup;
    use crate::model::Membership;
    use crate::temporal::SongEntry;
    use crate::{aggregator::build_histories, catalog::LookupTables};
    use chrono::NaiveDate;

    fn at(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 4, day).unwrap().and_hms_opt(0, 0, 0).unwrap()
    }

    fn song(title: &str, rank: u32, membership: Membership, added: Option<&str>) -> Song {
        let mut s = Song::new(title, "someone");
        s.rank = rank;
        s.membership = membership;
        s.date_added = added.map(str::to_string);
        s
    }

    fn catalog(songs: Vec<Song>) -> SongCatalog {
        SongCatalog { songs, lookups: LookupTables::default() }
    }

    fn snap(day: u32, titles: &[&str]) -> Snapshot {
        Snapshot::new(at(day), titles.iter().map(|t| SongEntry::new(t, "someone")).collect())
    }

    #[test]
    fn test_main_and_unranked_ordering() {
        let songs = vec![
            song("Third", 3, Membership::Main, None),
            song("First", 1, Membership::Main, None),
            song("Late", 0, Membership::Unranked, Some("2024-05-01")),
            song("Undated", 0, Membership::Unranked, None),
            song("Early", 0, Membership::Unranked, Some("2024-01-01")),
            song("Gone", 2, Membership::Off, None),
        ];

        let main: Vec<&str> = main_songs(&songs).iter().map(|s| s.title.as_str()).collect();
        assert_eq!(main, vec!["First", "Third"]);

        let unranked: Vec<&str> = unranked_songs(&songs).iter().map(|s| s.title.as_str()).collect();
        assert_eq!(unranked, vec!["Undated", "Early", "Late"]);
    }

    #[test]
    fn test_legacy_songs() {
        let cat = catalog(vec![song("A", 1, Membership::Main, None), song("U", 0, Membership::Unranked, None)]);
        let snapshots = vec![snap(1, &["A", "B", "C", "U"]), snap(2, &["A", "C", "U"]), snap(3, &["A", "U"])];
        let histories = build_histories(&snapshots, &ArtistLookup::new());

        let legacy = legacy_songs(&cat, &snapshots, &histories);
        let titles: Vec<&str> = legacy.iter().map(|l| l.song.title.as_str()).collect();

        assert_eq!(titles, vec!["C", "B"]);
        assert_eq!(legacy[0].removed_date, Some(at(2)));
        assert_eq!(legacy[0].last_rank, 2);
        assert_eq!(legacy[1].removed_date, Some(at(1)));
        assert_eq!(legacy[1].song.image_url, PLACEHOLDER_IMAGE);
        assert_eq!(legacy[1].song.rank, 0);
    }

    #[test]
    fn test_legacy_ties_break_on_last_rank() {
        let cat = catalog(vec![]);
        let snapshots = vec![snap(1, &["X", "Y"])];
        let histories = build_histories(&snapshots, &ArtistLookup::new());

        let legacy = legacy_songs(&cat, &snapshots, &histories);
        assert_eq!(legacy[0].song.title, "X");
        assert_eq!(legacy[1].song.title, "Y");
    }

    #[test]
    fn test_revision_view_relative_ranks() {
        let cat = catalog(vec![
            song("A", 2, Membership::Main, None),
            song("C", 1, Membership::Main, None),
            song("B", 0, Membership::Off, None),
        ]);
        let past = snap(1, &["A", "B", "C"]);

        let view = revision_view(&past, &cat);
        assert_eq!(view.len(), 3);

        assert_eq!(view[0].current_rank, Some(2));
        assert_eq!(view[0].relative_historical_rank, Some(1));
        assert_eq!(view[0].relative_current_rank, Some(2));

        assert_eq!(view[1].current_rank, None);
        assert_eq!(view[1].relative_historical_rank, None);

        assert_eq!(view[2].relative_historical_rank, Some(2));
        assert_eq!(view[2].relative_current_rank, Some(1));
    }

    #[test]
    fn test_history_view_since_keeps_movement() {
        let snapshots = vec![snap(1, &["A", "B", "C"]), snap(2, &["B", "C", "A"]), snap(3, &["B", "A", "C"])];
        let histories = build_histories(&snapshots, &ArtistLookup::new());
        let a = histories.iter().find(|h| h.key == "a").unwrap();

        let full = history_view(a, None, snapshots.last());
        assert_eq!(full.points.len(), 3);
        assert_eq!(full.peak_rank, Some(1));
        assert_eq!(full.latest_position, Some(2));
        assert_eq!(full.points[0].movement, None);
        assert_eq!(full.points[1].movement, Some(-2));

        let recent = history_view(a, Some(at(3)), None);
        assert_eq!(recent.points.len(), 1);
        assert_eq!(recent.points[0].rank, 2);
        assert_eq!(recent.points[0].movement, Some(1));
        assert_eq!(recent.latest_position, None);
    }
}
