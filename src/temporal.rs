// ⏰ Temporal Model - Snapshots, changelog entries, and position histories
//
// A ranking is a value at one point in time. The list of values over time
// is the history; nothing here is mutated after it is built.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ============================================================================
// SNAPSHOT
// ============================================================================

/// One ranked line of a snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SongEntry {
    /// 1-based position, always equal to index + 1 inside its snapshot
    pub rank: usize,
    pub title: String,
    pub artist: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl SongEntry {
    pub fn new(title: &str, artist: &str) -> Self {
        SongEntry {
            rank: 0,
            title: title.to_string(),
            artist: artist.to_string(),
            reason: None,
        }
    }
}

/// Snapshot - Fully ordered ranking as of one point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Point in time this snapshot represents
    pub date: NaiveDateTime,

    /// Ordered entries, ranks dense 1..N
    pub songs: Vec<SongEntry>,

    /// `Revision <n>` for changelog lines without an explicit time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision_label: Option<String>,

    /// Mutations that produced this snapshot from the previous one
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub changelog_entries: Vec<ChangelogEntry>,
}

impl Snapshot {
    /// Build a snapshot, assigning ranks by position
    pub fn new(date: NaiveDateTime, songs: Vec<SongEntry>) -> Self {
        Snapshot {
            date,
            songs: rerank(songs),
            revision_label: None,
            changelog_entries: Vec::new(),
        }
    }

    /// Count entries in snapshot
    pub fn count(&self) -> usize {
        self.songs.len()
    }

    /// Whether this snapshot came out of a changelog line
    pub fn has_changes(&self) -> bool {
        !self.changelog_entries.is_empty()
    }

    /// 1-based position of a title (by normalized key)
    pub fn position_of(&self, key: &str) -> Option<usize> {
        self.songs
            .iter()
            .position(|s| crate::model::normalize_title(&s.title) == key)
            .map(|i| i + 1)
    }
}

/// Re-derive dense ranks 1..N from list order
pub fn rerank(songs: Vec<SongEntry>) -> Vec<SongEntry> {
    songs
        .into_iter()
        .enumerate()
        .map(|(i, mut s)| {
            s.rank = i + 1;
            s
        })
        .collect()
}

// ============================================================================
// CHANGELOG ENTRY
// ============================================================================

/// What happened to the subject of a changelog entry
///
/// `old_rank` refers to the snapshot before the mutation, `new_rank` to the one after.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ChangeKind {
    Move { old_rank: usize, new_rank: usize },
    Place { new_rank: usize },
    Remove { old_rank: usize },
}

impl ChangeKind {
    pub fn name(&self) -> &'static str {
        match self {
            ChangeKind::Move { .. } => "move",
            ChangeKind::Place { .. } => "place",
            ChangeKind::Remove { .. } => "remove",
        }
    }

    pub fn old_rank(&self) -> Option<usize> {
        match self {
            ChangeKind::Move { old_rank, .. } | ChangeKind::Remove { old_rank } => Some(*old_rank),
            ChangeKind::Place { .. } => None,
        }
    }

    pub fn new_rank(&self) -> Option<usize> {
        match self {
            ChangeKind::Move { new_rank, .. } | ChangeKind::Place { new_rank } => Some(*new_rank),
            ChangeKind::Remove { .. } => None,
        }
    }
}

/// ChangelogEntry - One structured mutation plus its rendered description
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangelogEntry {
    #[serde(flatten)]
    pub kind: ChangeKind,
    pub subject_title: String,
    pub description: String,
}

// ============================================================================
// ENTITY HISTORY
// ============================================================================

/// One recorded rank change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryPoint {
    pub date: NaiveDateTime,
    pub rank: usize,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision_label: Option<String>,
}

/// EntityHistory - Rank changes of one song, oldest first
///
/// Append-only while snapshots are folded in date order; consecutive
/// points never share a rank and dates strictly increase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityHistory {
    /// Normalized title
    pub key: String,
    pub title: String,
    pub artist: String,
    pub history: Vec<HistoryPoint>,
    pub first_seen: NaiveDateTime,
}

impl EntityHistory {
    /// Most recent recorded rank
    pub fn last_rank(&self) -> Option<usize> {
        self.history.last().map(|p| p.rank)
    }

    /// Best (lowest) rank ever held
    pub fn peak_rank(&self) -> Option<usize> {
        self.history.iter().map(|p| p.rank).min()
    }

    /// Points on or after a date (the "time machine" filter)
    pub fn since(&self, date: NaiveDateTime) -> impl Iterator<Item = &HistoryPoint> {
        self.history.iter().filter(move |p| p.date >= date)
    }

    /// Rank delta of point `i` relative to the point before it (positive = climbed)
    pub fn movement_at(&self, i: usize) -> Option<i64> {
        let current = self.history.get(i)?;
        let previous = self.history.get(i.checked_sub(1)?)?;
        Some(previous.rank as i64 - current.rank as i64)
    }
}

// ============================================================================
// TESTS
// ============================================================================
