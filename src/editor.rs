// ✏️ Edit Buffer - Local reorder/edit session with undo and a replayable log
//
// Every change pushes a full copy of (songs, log) onto the undo stack. Log
// lines look like "3:05 PM: Title moved from #4 to #2" so that, once saved as
// a changelog block, they replay through the changelog engine unchanged.

use crate::model::{normalize_title, Membership, Song, SongType, Tier};
use chrono::{Datelike, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// Editable columns of a song row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditField {
    Title,
    Artist,
    Remixer,
    SongType,
    DateAdded,
    Tier,
    Main,
    Background,
    Duration,
    Link,
    Image,
}

impl EditField {
    /// Parse a column name as written in the sheet header (case-insensitive)
    pub fn parse(column: &str) -> Option<EditField> {
        let field = match column.trim().to_lowercase().as_str() {
            "song" | "title" => EditField::Title,
            "artist" => EditField::Artist,
            "remixer" => EditField::Remixer,
            "inst/vocal" | "type" => EditField::SongType,
            "date added" => EditField::DateAdded,
            "tier" => EditField::Tier,
            "main" => EditField::Main,
            "background" => EditField::Background,
            "duration" => EditField::Duration,
            "link" => EditField::Link,
            "image" => EditField::Image,
            _ => return None,
        };
        Some(field)
    }
}

/// One row of the `save_songs` payload, keys exactly as the sheet header
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveRow {
    #[serde(rename = "#")]
    pub rank_formula: String,
    #[serde(rename = "SONG")]
    pub song: String,
    #[serde(rename = "ARTIST")]
    pub artist: String,
    #[serde(rename = "REMIXER")]
    pub remixer: String,
    #[serde(rename = "INST/VOCAL")]
    pub song_type: String,
    #[serde(rename = "Date Added")]
    pub date_added: String,
    #[serde(rename = "TIER")]
    pub tier: String,
    #[serde(rename = "MAIN")]
    pub main: String,
    #[serde(rename = "BACKGROUND")]
    pub background: String,
    #[serde(rename = "DURATION")]
    pub duration: String,
    #[serde(rename = "LINK")]
    pub link: String,
    #[serde(rename = "IMAGE")]
    pub image: String,
}

#[derive(Debug, Clone)]
struct State {
    songs: Vec<Song>,
    log: Vec<String>,
}

/// EditBuffer - The sheet being edited, never shared with the loaded data
#[derive(Debug, Clone)]
pub struct EditBuffer {
    songs: Vec<Song>,
    /// Newest first
    log: Vec<String>,
    undo_stack: Vec<State>,
    last_change: Option<String>,
    pub auto_log: bool,
}

fn sort_key(song: &Song) -> u32 {
    match song.membership {
        Membership::Main => song.rank,
        _ => u32::MAX,
    }
}

/// `h:mm AM/PM`
pub fn log_time(at: NaiveTime) -> String {
    at.format("%-I:%M %p").to_string()
}

impl EditBuffer {
    /// Main songs by rank first, everything else after in sheet order
    pub fn new(songs: &[Song]) -> Self {
        let mut songs = songs.to_vec();
        songs.sort_by_key(sort_key);
        EditBuffer {
            songs,
            log: Vec::new(),
            undo_stack: Vec::new(),
            last_change: None,
            auto_log: false,
        }
    }

    pub fn songs(&self) -> &[Song] {
        &self.songs
    }

    /// Log lines, newest first
    pub fn log(&self) -> &[String] {
        &self.log
    }

    pub fn last_change(&self) -> Option<&str> {
        self.last_change.as_deref()
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    fn index_of(&self, title: &str) -> Option<usize> {
        let key = normalize_title(title);
        self.songs.iter().position(|s| s.key() == key)
    }

    fn checkpoint(&mut self) {
        self.undo_stack.push(State {
            songs: self.songs.clone(),
            log: self.log.clone(),
        });
    }

    /// Move a song to a 1-based position and renumber every rank by position
    ///
    /// Returns the change text, or None when the title is unknown, the rank is
    /// outside `1..=len`, or the song is already there.
    pub fn move_rank(&mut self, title: &str, new_rank: usize, at: NaiveTime) -> Option<String> {
        let from = self.index_of(title)?;
        if new_rank < 1 || new_rank > self.songs.len() || new_rank == from + 1 {
            return None;
        }

        self.checkpoint();
        let song = self.songs.remove(from);
        self.songs.insert(new_rank - 1, song);
        for (i, song) in self.songs.iter_mut().enumerate() {
            song.rank = i as u32 + 1;
        }

        let text = format!("{} moved from #{} to #{}", self.songs[new_rank - 1].title, from + 1, new_rank);
        self.last_change = Some(text.clone());
        if self.auto_log {
            self.log.insert(0, format!("{}: {}", log_time(at), text));
        }
        Some(text)
    }

    /// Set one column of a song; false when the title is unknown
    pub fn update_field(&mut self, title: &str, field: EditField, value: &str) -> bool {
        let Some(i) = self.index_of(title) else {
            return false;
        };

        self.checkpoint();
        let value = value.trim();
        let optional = || if value.is_empty() { None } else { Some(value.to_string()) };
        let song = &mut self.songs[i];
        match field {
            EditField::Title => song.title = value.to_string(),
            EditField::Artist => song.artist = value.to_string(),
            EditField::Remixer => song.remixer = optional(),
            EditField::SongType => song.song_type = SongType::parse(value),
            EditField::DateAdded => song.date_added = optional(),
            EditField::Tier => song.tier = Tier::parse(value),
            EditField::Main => song.membership = Membership::parse(value),
            EditField::Background => song.background_color = optional(),
            EditField::Duration => song.duration = optional(),
            EditField::Link => song.link = optional(),
            EditField::Image => song.image_url = value.to_string(),
        }
        true
    }

    /// Log the most recent change by hand (when auto-log is off)
    pub fn log_last_change(&mut self, at: NaiveTime) -> bool {
        let Some(text) = self.last_change.clone() else {
            return false;
        };
        self.checkpoint();
        self.log.insert(0, format!("{}: {}", log_time(at), text));
        true
    }

    /// Restore songs and log to the state before the last change
    pub fn undo(&mut self) -> bool {
        match self.undo_stack.pop() {
            Some(state) => {
                self.songs = state.songs;
                self.log = state.log;
                self.last_change = Some("Undid action".to_string());
                true
            }
            None => false,
        }
    }

    /// Rows for the `save_songs` action
    ///
    /// `#` holds a row formula for main and unranked songs so the sheet keeps
    /// numbering itself; other songs leave it blank.
    pub fn save_rows(&self) -> Vec<SaveRow> {
        self.songs
            .iter()
            .enumerate()
            .map(|(i, s)| SaveRow {
                rank_formula: match s.membership {
                    Membership::Main | Membership::Unranked => format!("=ROW(A{})-1", i + 2),
                    Membership::Off => String::new(),
                },
                song: s.title.clone(),
                artist: s.artist.clone(),
                remixer: s.remixer.clone().unwrap_or_default(),
                song_type: s.song_type.as_str().to_string(),
                date_added: s.date_added.clone().unwrap_or_default(),
                tier: s.tier.map(|t| t.label().to_string()).unwrap_or_default(),
                main: s.membership.flag().to_string(),
                background: s.background_color.clone().unwrap_or_default(),
                duration: s.duration.clone().unwrap_or_default(),
                link: s.link.clone().unwrap_or_default(),
                image: s.image_url.clone(),
            })
            .collect()
    }

    /// Changelog block for `append_changelog`, oldest line first
    pub fn changelog_content(&self, date: NaiveDate) -> Option<String> {
        if self.log.is_empty() {
            return None;
        }
        let lines: Vec<&str> = self.log.iter().rev().map(String::as_str).collect();
        Some(format!("{}/{} Changelog\n{}", date.month(), date.day(), lines.join("\n")))
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::changelog::{replay_changelog, ArtistLookup};
    use crate::temporal::{Snapshot, SongEntry};

    fn song(title: &str, rank: u32, membership: Membership) -> Song {
        let mut s = Song::new(title, "someone");
        s.rank = rank;
        s.membership = membership;
        s
    }

    fn buffer() -> EditBuffer {
        EditBuffer::new(&[
            song("Off", 0, Membership::Off),
            song("C", 3, Membership::Main),
            song("A", 1, Membership::Main),
            song("New", 0, Membership::Unranked),
            song("B", 2, Membership::Main),
        ])
    }

    fn titles(buffer: &EditBuffer) -> Vec<&str> {
        buffer.songs().iter().map(|s| s.title.as_str()).collect()
    }

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_initial_order() {
        assert_eq!(titles(&buffer()), vec!["A", "B", "C", "Off", "New"]);
    }

    #[test]
    fn test_move_rank() {
        let mut buf = buffer();
        let text = buf.move_rank("c", 1, time(9, 5));

        assert_eq!(text.as_deref(), Some("C moved from #3 to #1"));
        assert_eq!(titles(&buf), vec!["C", "A", "B", "Off", "New"]);
        let ranks: Vec<u32> = buf.songs().iter().map(|s| s.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3, 4, 5]);
        assert!(buf.log().is_empty());
        assert_eq!(buf.last_change(), Some("C moved from #3 to #1"));
    }

    #[test]
    fn test_invalid_moves_are_rejected() {
        let mut buf = buffer();
        assert!(buf.move_rank("A", 1, time(9, 0)).is_none());
        assert!(buf.move_rank("A", 0, time(9, 0)).is_none());
        assert!(buf.move_rank("A", 6, time(9, 0)).is_none());
        assert!(buf.move_rank("Missing", 2, time(9, 0)).is_none());
        assert!(!buf.can_undo());
    }

    #[test]
    fn test_auto_log_and_undo() {
        let mut buf = buffer();
        buf.auto_log = true;

        buf.move_rank("A", 3, time(15, 7));
        buf.move_rank("B", 2, time(0, 30));
        assert_eq!(buf.log(), &["12:30 AM: B moved from #1 to #2", "3:07 PM: A moved from #1 to #3"]);

        assert!(buf.undo());
        assert_eq!(buf.log().len(), 1);
        assert_eq!(titles(&buf)[..3], ["B", "C", "A"]);
        assert_eq!(buf.last_change(), Some("Undid action"));

        assert!(buf.undo());
        assert!(!buf.undo());
        assert_eq!(titles(&buf)[..3], ["A", "B", "C"]);
    }

    #[test]
    fn test_manual_log() {
        let mut buf = buffer();
        assert!(!buf.log_last_change(time(10, 0)));

        buf.move_rank("B", 1, time(10, 0));
        assert!(buf.log_last_change(time(10, 1)));
        assert_eq!(buf.log(), &["10:01 AM: B moved from #2 to #1"]);
    }

    #[test]
    fn test_update_field() {
        let mut buf = buffer();
        assert!(buf.update_field("A", EditField::Tier, "A+"));
        assert!(buf.update_field("A", EditField::Remixer, ""));
        assert!(buf.update_field("New", EditField::Main, "Y"));
        assert!(!buf.update_field("Missing", EditField::Artist, "x"));

        assert_eq!(buf.songs()[0].tier, Some(Tier::APlus));
        assert_eq!(buf.songs()[0].remixer, None);
        assert_eq!(buf.songs()[4].membership, Membership::Main);
        assert_eq!(EditField::parse("Date Added"), Some(EditField::DateAdded));
        assert_eq!(EditField::parse("nope"), None);
    }

    #[test]
    fn test_save_rows() {
        let rows = buffer().save_rows();
        assert_eq!(rows[0].rank_formula, "=ROW(A2)-1");
        assert_eq!(rows[3].rank_formula, "");
        assert_eq!(rows[3].main, "N");
        assert_eq!(rows[4].rank_formula, "=ROW(A6)-1");
        assert_eq!(rows[4].main, "U");

        let json = serde_json::to_value(&rows[0]).unwrap();
        assert_eq!(json["#"], "=ROW(A2)-1");
        assert_eq!(json["SONG"], "A");
        assert_eq!(json["INST/VOCAL"], "Vocal");
        assert_eq!(json["Date Added"], "");
    }

    #[test]
    fn test_changelog_content_replays() {
        let mut buf = buffer();
        let day = NaiveDate::from_ymd_opt(2024, 7, 4).unwrap();
        assert!(buf.changelog_content(day).is_none());

        buf.auto_log = true;
        buf.move_rank("A", 3, time(13, 0));
        buf.move_rank("C", 1, time(13, 5));

        let content = buf.changelog_content(day).unwrap();
        assert_eq!(content, "7/4 Changelog\n1:00 PM: A moved from #1 to #3\n1:05 PM: C moved from #2 to #1");

        let base = Snapshot::new(
            day.and_hms_opt(0, 0, 0).unwrap(),
            ["A", "B", "C"].iter().map(|t| SongEntry::new(t, "someone")).collect(),
        );
        let replayed = replay_changelog(&base, &content, &ArtistLookup::new());
        let last: Vec<&str> = replayed[1].songs.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(last, vec!["C", "B", "A"]);
    }
}
