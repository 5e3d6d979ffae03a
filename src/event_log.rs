// 📜 Event Log Parser - History sheet rows → dated snapshots
//
// The history sheet is a flat, human-authored log:
//   Song Rankings (5/5/2023, Version 2)   ← starts a revision block
//   1, Title, Artist                      ← ranked rows of the block
//   ...
//   "3/14 Changelog\nX moved from #3 to #7\n..."   ← replayed on the last snapshot

use crate::changelog::{replay_changelog, ArtistLookup};
use crate::model::{clean_field, normalize_title, parse_calendar_date, UNKNOWN_ARTIST};
use crate::temporal::{Snapshot, SongEntry};
use chrono::NaiveDateTime;
use regex::Regex;
use std::sync::OnceLock;

fn header_pattern() -> &'static Regex {
    static HEADER: OnceLock<Regex> = OnceLock::new();
    HEADER.get_or_init(|| Regex::new(r"(?i)Song Rankings \((.*)\)").expect("valid regex"))
}

fn version_suffix() -> &'static Regex {
    static SUFFIX: OnceLock<Regex> = OnceLock::new();
    SUFFIX.get_or_init(|| Regex::new(r"(?i),\s*Version \d+").expect("valid regex"))
}

/// Date of a revision label: drop `, Version N`, keep text before the first space
pub fn parse_revision_date(label: &str) -> Option<NaiveDateTime> {
    let without_version = version_suffix().replace_all(label, "");
    let first = without_version.split_whitespace().next()?;
    let first = first.trim_end_matches(',');
    parse_calendar_date(first).and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Revision block being accumulated
struct Block {
    date: Option<NaiveDateTime>,
    songs: Vec<SongEntry>,
}

impl Block {
    /// Close the block; only dated, non-empty blocks become snapshots
    fn finish(self) -> Option<Snapshot> {
        match self.date {
            Some(date) if !self.songs.is_empty() => Some(Snapshot::new(date, self.songs)),
            Some(_) => None,
            None => {
                tracing::debug!(songs = self.songs.len(), "Dropping revision block without a readable date");
                None
            }
        }
    }
}

fn flush(block: &mut Option<Block>, snapshots: &mut Vec<Snapshot>) {
    if let Some(snapshot) = block.take().and_then(Block::finish) {
        snapshots.push(snapshot);
    }
}

/// `<positive integer>, <title>, <artist-or-blank>` row of a revision block
fn ranked_row(row: &[String], artists: &ArtistLookup) -> Option<SongEntry> {
    let rank: u32 = clean_field(row.first()?).parse().ok()?;
    let raw_title = row.get(1)?;
    if rank == 0 || raw_title.trim().is_empty() {
        return None;
    }

    let title = clean_field(raw_title);
    let artist = match artists.get(&normalize_title(&title)) {
        Some(artist) => artist.clone(),
        None => {
            let cell = row.get(2).map(|a| clean_field(a)).unwrap_or_default();
            if cell.is_empty() || cell == UNKNOWN_ARTIST {
                UNKNOWN_ARTIST.to_string()
            } else {
                cell
            }
        }
    };

    Some(SongEntry::new(&title, &artist))
}

/// Parse history sheet rows into snapshots, sorted by date
///
/// Rows are scanned in order:
/// - a `Song Rankings (<label>)` first cell starts a new block
/// - a cell containing "changelog" closes the block and replays that cell
///   against the most recent snapshot
/// - ranked rows are collected into the open block
///
/// Snapshots with equal dates keep their insertion order.
pub fn parse_history_rows(rows: &[Vec<String>], artists: &ArtistLookup) -> Vec<Snapshot> {
    let mut snapshots: Vec<Snapshot> = Vec::new();
    let mut block: Option<Block> = None;

    for row in rows {
        let first = row.first().map(|c| clean_field(c)).unwrap_or_default();

        if let Some(caps) = header_pattern().captures(&first) {
            flush(&mut block, &mut snapshots);
            block = Some(Block {
                date: parse_revision_date(&caps[1]),
                songs: Vec::new(),
            });
            continue;
        }

        if let Some(cell) = row.iter().find(|c| c.to_lowercase().contains("changelog")) {
            flush(&mut block, &mut snapshots);
            if let Some(last) = snapshots.last() {
                let derived = replay_changelog(last, cell, artists);
                tracing::debug!(derived = derived.len(), "Replayed changelog block");
                snapshots.extend(derived);
            }
            continue;
        }

        if let Some(open) = block.as_mut() {
            if let Some(entry) = ranked_row(row, artists) {
                open.songs.push(entry);
            }
        }
    }
    flush(&mut block, &mut snapshots);

    snapshots.sort_by(|a, b| a.date.cmp(&b.date));
    snapshots
}

/// Convenience: raw history CSV text → snapshots
pub fn parse_history_text(text: &str, artists: &ArtistLookup) -> Vec<Snapshot> {
    parse_history_rows(&crate::csv_reader::parse_csv(text), artists)
}

// ============================================================================
// TESTS
// ============================================================================
