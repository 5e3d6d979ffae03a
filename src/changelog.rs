// 🔁 Changelog Replay Engine - Free-text change lines → dated snapshots
//
// Two steps, kept apart so each can be tested alone:
//   1. parse_changelog_line: text → Move | Place | Remove | Unrecognized
//   2. apply_mutation: (list, mutation) → new list + changelog entries
// replay_changelog drives both over a block, stamping each result with a time.

use crate::model::{clean_field, normalize_title, UNKNOWN_ARTIST};
use crate::temporal::{rerank, ChangeKind, ChangelogEntry, Snapshot, SongEntry};
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Normalized title → artist
pub type ArtistLookup = HashMap<String, String>;

// ============================================================================
// PATTERNS
// ============================================================================

struct Patterns {
    block_date: Regex,
    time_token: Regex,
    moved: Regex,
    placed: Regex,
    removed: Regex,
    and_separator: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        block_date: Regex::new(r"(\d{1,2})/(\d{1,2})(?:/(\d{2,4}))?").expect("valid regex"),
        time_token: Regex::new(r"(?i)^(\d{1,2}):(\d{2})\s*(?:(AM|PM)\b)?").expect("valid regex"),
        moved: Regex::new(r"(?i)(.+) moved from #(\d+) to #(\d+)").expect("valid regex"),
        placed: Regex::new(r"(?i)(.+) placed at #(\d+)").expect("valid regex"),
        removed: Regex::new(r"(?i)(.+) removed").expect("valid regex"),
        and_separator: Regex::new(r"(?i) and ").expect("valid regex"),
    })
}

// ============================================================================
// PARSE STEP
// ============================================================================

/// ChangelogLine - Classified content of one changelog line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangelogLine {
    /// `<title> moved from #<old> to #<new>` (`old_rank` is what the text claims)
    Move { title: String, old_rank: usize, new_rank: usize },
    /// `<title> placed at #<new>`
    Place { title: String, new_rank: usize },
    /// `<title>[ and <title> ...] removed`
    Remove { titles: Vec<String> },
    Unrecognized,
}

/// Classify a line's content. Priority: move, then place, then removal.
pub fn parse_changelog_line(content: &str) -> ChangelogLine {
    let p = patterns();

    if let Some(caps) = p.moved.captures(content) {
        let title = clean_field(&caps[1]);
        if let (Ok(old_rank), Ok(new_rank)) = (caps[2].parse::<usize>(), caps[3].parse::<usize>()) {
            if !title.is_empty() {
                return ChangelogLine::Move { title, old_rank, new_rank };
            }
        }
        return ChangelogLine::Unrecognized;
    }

    if let Some(caps) = p.placed.captures(content) {
        let title = clean_field(&caps[1]);
        return match caps[2].parse::<usize>() {
            Ok(new_rank) if !title.is_empty() => ChangelogLine::Place { title, new_rank },
            _ => ChangelogLine::Unrecognized,
        };
    }

    if let Some(caps) = p.removed.captures(content) {
        let titles: Vec<String> = p
            .and_separator
            .split(&caps[1])
            .map(clean_field)
            .filter(|t| !t.is_empty())
            .collect();
        if !titles.is_empty() {
            return ChangelogLine::Remove { titles };
        }
    }

    ChangelogLine::Unrecognized
}

/// Split a leading `H:MM` / `H:MM AM|PM` token off a line
///
/// Returns the time of day (24-hour) and the remaining content with any
/// leading `:`, `|` or `-` separator removed. Lines without a valid token
/// come back unchanged.
pub fn split_time_token(line: &str) -> (Option<NaiveTime>, &str) {
    let Some(caps) = patterns().time_token.captures(line) else {
        return (None, line);
    };

    let mut hour: u32 = caps[1].parse().unwrap_or(u32::MAX);
    let minute: u32 = caps[2].parse().unwrap_or(u32::MAX);
    let meridiem = caps.get(3).map(|m| m.as_str().to_ascii_uppercase());
    match meridiem.as_deref() {
        Some("PM") if hour < 12 => hour += 12,
        Some("AM") if hour == 12 => hour = 0,
        _ => {}
    }

    let Some(time) = NaiveTime::from_hms_opt(hour, minute, 0) else {
        return (None, line);
    };

    let rest = line[caps[0].len()..].trim_start();
    let rest = rest.strip_prefix([':', '|', '-']).unwrap_or(rest).trim_start();
    (Some(time), rest)
}

/// Calendar date named on a block's first line (`M/D` or `M/D/YY[YY]`)
///
/// A missing year is taken from `fallback_year`; two-digit years get 2000 added.
pub fn block_date(first_line: &str, fallback_year: i32) -> Option<NaiveDate> {
    let caps = patterns().block_date.captures(first_line)?;
    let month: u32 = caps[1].parse().ok()?;
    let day: u32 = caps[2].parse().ok()?;
    let year = match caps.get(3) {
        Some(y) => {
            let y: i32 = y.as_str().parse().ok()?;
            if y < 100 {
                y + 2000
            } else {
                y
            }
        }
        None => fallback_year,
    };
    NaiveDate::from_ymd_opt(year, month, day)
}

// ============================================================================
// APPLY STEP
// ============================================================================

/// Result of applying one mutation to a ranking
#[derive(Debug, Clone, PartialEq)]
pub struct Applied {
    /// Resulting list, ranks dense 1..N
    pub songs: Vec<SongEntry>,
    pub entries: Vec<ChangelogEntry>,
}

fn find(list: &[SongEntry], title: &str) -> Option<usize> {
    let key = normalize_title(title);
    list.iter().position(|s| normalize_title(&s.title) == key)
}

/// Neighbours around index `i`: ", above <next> and below <previous>"
///
/// `next` is the entry now directly after the subject ("end" if none),
/// `previous` the entry directly before it ("top" if none).
fn neighbour_clause(list: &[SongEntry], i: usize) -> String {
    let above = list.get(i + 1).map(|s| s.title.as_str()).unwrap_or("end");
    let below = i
        .checked_sub(1)
        .and_then(|j| list.get(j))
        .map(|s| s.title.as_str())
        .unwrap_or("top");
    format!(", above {} and below {}", above, below)
}

/// Apply a classified line to a ranking
///
/// Returns None when the line changes nothing: unrecognized text, a move of
/// an absent title, or a removal where no subject is present. The subject of
/// the mutation gets the entry's description as its reason; every other
/// entry keeps the reason it had.
pub fn apply_mutation(list: &[SongEntry], line: &ChangelogLine, artists: &ArtistLookup) -> Option<Applied> {
    match line {
        ChangelogLine::Move { title, new_rank, .. } => {
            let from = find(list, title)?;
            let mut working = list.to_vec();
            let subject = working.remove(from);
            let to = new_rank.saturating_sub(1).min(working.len());
            working.insert(to, subject);

            let description = format!(
                "{} moved from #{} to #{}{}",
                working[to].title,
                from + 1,
                to + 1,
                neighbour_clause(&working, to)
            );
            working[to].reason = Some(description.clone());

            let entry = ChangelogEntry {
                kind: ChangeKind::Move { old_rank: from + 1, new_rank: to + 1 },
                subject_title: working[to].title.clone(),
                description,
            };

            Some(Applied { songs: rerank(working), entries: vec![entry] })
        }

        ChangelogLine::Place { title, new_rank } => {
            let mut working = list.to_vec();
            if let Some(existing) = find(&working, title) {
                working.remove(existing);
            }

            let key = normalize_title(title);
            let artist = artists.get(&key).map(String::as_str).unwrap_or(UNKNOWN_ARTIST);
            let to = new_rank.saturating_sub(1).min(working.len());
            working.insert(to, SongEntry::new(title, artist));

            let description = format!("{} placed at #{}{}", title, to + 1, neighbour_clause(&working, to));
            working[to].reason = Some(description.clone());

            let entry = ChangelogEntry {
                kind: ChangeKind::Place { new_rank: to + 1 },
                subject_title: title.clone(),
                description,
            };

            Some(Applied { songs: rerank(working), entries: vec![entry] })
        }

        ChangelogLine::Remove { titles } => {
            let mut entries = Vec::new();
            let mut removed_keys = Vec::new();

            for title in titles {
                let key = normalize_title(title);
                if removed_keys.contains(&key) {
                    continue;
                }
                if let Some(i) = find(list, title) {
                    let subject = &list[i];
                    entries.push(ChangelogEntry {
                        kind: ChangeKind::Remove { old_rank: i + 1 },
                        subject_title: subject.title.clone(),
                        description: format!("{} removed", subject.title),
                    });
                    removed_keys.push(key);
                }
            }

            if entries.is_empty() {
                return None;
            }

            let working: Vec<SongEntry> = list
                .iter()
                .filter(|s| !removed_keys.contains(&normalize_title(&s.title)))
                .cloned()
                .collect();

            Some(Applied { songs: rerank(working), entries })
        }

        ChangelogLine::Unrecognized => None,
    }
}

// ============================================================================
// REPLAY
// ============================================================================

/// ReplayClock - Timestamps for the snapshots of one changelog block
///
/// Timed lines use their time of day on the block's date; untimed lines get
/// the block date plus one millisecond per untimed line and a `Revision <n>`
/// label. Every stamp is strictly later than the one before it.
#[derive(Debug, Clone)]
pub struct ReplayClock {
    day: NaiveDateTime,
    revision: u32,
    last: Option<NaiveDateTime>,
}

impl ReplayClock {
    pub fn new(day: NaiveDateTime) -> Self {
        ReplayClock { day, revision: 0, last: None }
    }

    /// Every stamp handed out will be later than `floor`
    pub fn after(mut self, floor: NaiveDateTime) -> Self {
        self.last = Some(floor);
        self
    }

    /// Stamp the next produced snapshot
    pub fn stamp(&mut self, time: Option<NaiveTime>) -> (NaiveDateTime, Option<String>) {
        let (candidate, label) = match time {
            Some(t) => (self.day.date().and_time(t), None),
            None => {
                self.revision += 1;
                (
                    self.day + Duration::milliseconds(i64::from(self.revision)),
                    Some(format!("Revision {}", self.revision)),
                )
            }
        };

        let stamp = match self.last {
            Some(last) if candidate <= last => last + Duration::milliseconds(1),
            _ => candidate,
        };
        self.last = Some(stamp);
        (stamp, label)
    }
}

/// Replay a changelog block against the snapshot that precedes it
///
/// Produces one snapshot per line that changed the ranking, in line order,
/// each stamped strictly later than `base`.
/// Header lines containing "changelog", unrecognized lines and no-op lines are
/// skipped without consuming a timestamp.
pub fn replay_changelog(base: &Snapshot, text: &str, artists: &ArtistLookup) -> Vec<Snapshot> {
    let lines: Vec<&str> = text.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
    let Some(first) = lines.first() else {
        return Vec::new();
    };

    let day = block_date(first, base.date.year())
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or(base.date);

    let mut clock = ReplayClock::new(day).after(base.date);
    let mut working = base.songs.clone();
    let mut produced = Vec::new();

    for line in lines {
        if line.to_lowercase().contains("changelog") {
            continue;
        }

        let (time, content) = split_time_token(line);
        let mutation = parse_changelog_line(content);

        let Some(applied) = apply_mutation(&working, &mutation, artists) else {
            tracing::debug!(line = %line, "Changelog line changed nothing, skipping");
            continue;
        };

        let (date, revision_label) = clock.stamp(time);
        working = applied.songs;

        produced.push(Snapshot {
            date,
            songs: working.clone(),
            revision_label,
            changelog_entries: applied.entries,
        });
    }

    produced
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn base(titles: &[&str]) -> Snapshot {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        Snapshot::new(date, titles.iter().map(|t| SongEntry::new(t, "N/A")).collect())
    }

    fn titles(snapshot: &Snapshot) -> Vec<&str> {
        snapshot.songs.iter().map(|s| s.title.as_str()).collect()
    }

    fn assert_dense(snapshot: &Snapshot) {
        for (i, song) in snapshot.songs.iter().enumerate() {
            assert_eq!(song.rank, i + 1, "rank mismatch for {}", song.title);
        }
    }

    #[test]
    fn test_parse_move_place_remove() {
        assert_eq!(
            parse_changelog_line("A moved from #1 to #3"),
            ChangelogLine::Move { title: "A".to_string(), old_rank: 1, new_rank: 3 }
        );
        assert_eq!(
            parse_changelog_line("New Song placed at #12"),
            ChangelogLine::Place { title: "New Song".to_string(), new_rank: 12 }
        );
        assert_eq!(
            parse_changelog_line("B AND C removed"),
            ChangelogLine::Remove { titles: vec!["B".to_string(), "C".to_string()] }
        );
        assert_eq!(parse_changelog_line("listened to some stuff"), ChangelogLine::Unrecognized);
    }

    #[test]
    fn test_parse_priority_prefers_move() {
        let line = parse_changelog_line("Placed Removed moved from #2 to #1");
        assert!(matches!(line, ChangelogLine::Move { .. }));
    }

    #[test]
    fn test_split_time_token() {
        let (time, rest) = split_time_token("10:05 PM: A moved from #1 to #3");
        assert_eq!(time, NaiveTime::from_hms_opt(22, 5, 0));
        assert_eq!(rest, "A moved from #1 to #3");

        let (time, rest) = split_time_token("12:30 AM - B removed");
        assert_eq!(time, NaiveTime::from_hms_opt(0, 30, 0));
        assert_eq!(rest, "B removed");

        let (time, _) = split_time_token("12:15 pm C placed at #2");
        assert_eq!(time, NaiveTime::from_hms_opt(12, 15, 0));

        let (time, rest) = split_time_token("14:00 | D removed");
        assert_eq!(time, NaiveTime::from_hms_opt(14, 0, 0));
        assert_eq!(rest, "D removed");
    }

    #[test]
    fn test_split_time_token_leaves_titles_alone() {
        let (time, rest) = split_time_token("1:30 Amazing Song placed at #1");
        assert_eq!(time, NaiveTime::from_hms_opt(1, 30, 0));
        assert_eq!(rest, "Amazing Song placed at #1");

        let (time, rest) = split_time_token("A moved from #1 to #2");
        assert_eq!(time, None);
        assert_eq!(rest, "A moved from #1 to #2");
    }

    #[test]
    fn test_block_date() {
        assert_eq!(block_date("3/14 Changelog", 2023), NaiveDate::from_ymd_opt(2023, 3, 14));
        assert_eq!(block_date("3/14/25 Changelog", 2023), NaiveDate::from_ymd_opt(2025, 3, 14));
        assert_eq!(block_date("12/1/2022", 2030), NaiveDate::from_ymd_opt(2022, 12, 1));
        assert_eq!(block_date("Changelog", 2023), None);
        assert_eq!(block_date("13/45 Changelog", 2023), None);
    }

    #[test]
    fn test_move_scenario() {
        let snaps = replay_changelog(&base(&["A", "B", "C"]), "A moved from #1 to #3", &ArtistLookup::new());

        assert_eq!(snaps.len(), 1);
        assert_eq!(titles(&snaps[0]), vec!["B", "C", "A"]);
        assert_dense(&snaps[0]);
        assert_eq!(snaps[0].changelog_entries.len(), 1);
        assert_eq!(snaps[0].changelog_entries[0].kind, ChangeKind::Move { old_rank: 1, new_rank: 3 });
        assert_eq!(
            snaps[0].changelog_entries[0].description,
            "A moved from #1 to #3, above end and below C"
        );
    }

    #[test]
    fn test_place_scenario() {
        let mut artists = ArtistLookup::new();
        artists.insert("c".to_string(), "Composer".to_string());

        let snaps = replay_changelog(&base(&["A", "B"]), "C placed at #1", &artists);

        assert_eq!(snaps.len(), 1);
        assert_eq!(titles(&snaps[0]), vec!["C", "A", "B"]);
        assert_dense(&snaps[0]);
        assert_eq!(snaps[0].songs[0].artist, "Composer");
        assert_eq!(snaps[0].changelog_entries[0].kind, ChangeKind::Place { new_rank: 1 });
        assert_eq!(snaps[0].changelog_entries[0].description, "C placed at #1, above A and below top");
    }

    #[test]
    fn test_remove_scenario() {
        let snaps = replay_changelog(&base(&["A", "B", "C"]), "B and C removed", &ArtistLookup::new());

        assert_eq!(snaps.len(), 1);
        assert_eq!(titles(&snaps[0]), vec!["A"]);
        assert_dense(&snaps[0]);
        let kinds: Vec<ChangeKind> = snaps[0].changelog_entries.iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![ChangeKind::Remove { old_rank: 2 }, ChangeKind::Remove { old_rank: 3 }]);
    }

    #[test]
    fn test_place_replaces_existing_entry_and_clamps() {
        let snaps = replay_changelog(&base(&["A", "B", "C"]), "a placed at #99", &ArtistLookup::new());

        assert_eq!(titles(&snaps[0]), vec!["B", "C", "a"]);
        assert_eq!(snaps[0].songs[2].artist, "N/A");
        assert_eq!(snaps[0].changelog_entries[0].kind, ChangeKind::Place { new_rank: 3 });
    }

    #[test]
    fn test_missing_titles_are_silent_noops() {
        let text = "3/2 Changelog\nZ moved from #1 to #2\nY removed\nnothing to see here";
        let snaps = replay_changelog(&base(&["A", "B"]), text, &ArtistLookup::new());
        assert!(snaps.is_empty());
    }

    #[test]
    fn test_remove_ignores_unknown_subjects() {
        let snaps = replay_changelog(&base(&["A", "B"]), "B and Q removed", &ArtistLookup::new());
        assert_eq!(titles(&snaps[0]), vec!["A"]);
        assert_eq!(snaps[0].changelog_entries.len(), 1);
    }

    #[test]
    fn test_block_replays_sequentially_with_labels() {
        let text = "3/5 Changelog\nA moved from #1 to #2\nnot a change\nD placed at #1\nB removed";
        let snaps = replay_changelog(&base(&["A", "B", "C"]), text, &ArtistLookup::new());

        assert_eq!(snaps.len(), 3);
        assert_eq!(titles(&snaps[0]), vec!["B", "A", "C"]);
        assert_eq!(titles(&snaps[1]), vec!["D", "B", "A", "C"]);
        assert_eq!(titles(&snaps[2]), vec!["D", "A", "C"]);

        // Unrecognized line does not consume a revision number
        let labels: Vec<_> = snaps.iter().map(|s| s.revision_label.clone().unwrap()).collect();
        assert_eq!(labels, vec!["Revision 1", "Revision 2", "Revision 3"]);

        assert_eq!(snaps[0].date.date(), NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());
        assert!(snaps.windows(2).all(|w| w[0].date < w[1].date));
        snaps.iter().for_each(assert_dense);
    }

    #[test]
    fn test_timed_lines_set_time_of_day() {
        let text = "3/5 Changelog\n9:15 AM: A moved from #1 to #2\n9:15 AM: A moved from #2 to #1";
        let snaps = replay_changelog(&base(&["A", "B"]), text, &ArtistLookup::new());

        assert_eq!(snaps.len(), 2);
        assert_eq!(snaps[0].date.time(), NaiveTime::from_hms_opt(9, 15, 0).unwrap());
        assert!(snaps[1].date > snaps[0].date);
        assert_eq!(snaps[0].revision_label, None);
    }

    #[test]
    fn test_block_without_date_uses_base_date() {
        let snapshot = base(&["A", "B"]);
        let snaps = replay_changelog(&snapshot, "Changelog\nB moved from #2 to #1", &ArtistLookup::new());
        assert_eq!(snaps[0].date.date(), snapshot.date.date());
        assert!(snaps[0].date > snapshot.date);
    }

    #[test]
    fn test_reasons_follow_subjects() {
        let text = "A moved from #1 to #2\nC placed at #1";
        let snaps = replay_changelog(&base(&["A", "B"]), text, &ArtistLookup::new());

        let first = &snaps[0];
        assert_eq!(first.songs[1].reason.as_deref(), Some("A moved from #1 to #2, above end and below B"));
        assert_eq!(first.songs[0].reason, None);

        // A keeps its reason while C is the subject
        let second = &snaps[1];
        assert_eq!(second.songs[0].reason.as_deref(), Some("C placed at #1, above B and below top"));
        assert_eq!(second.songs[2].reason, first.songs[1].reason);
    }

    #[test]
    fn test_replay_is_deterministic() {
        let text = "4/1/24 Changelog\nA moved from #1 to #3\n8:00 PM - D placed at #2\nB removed";
        let snapshot = base(&["A", "B", "C"]);
        let first = replay_changelog(&snapshot, text, &ArtistLookup::new());
        let second = replay_changelog(&snapshot, text, &ArtistLookup::new());

        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn test_clock_is_strictly_increasing() {
        let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let mut clock = ReplayClock::new(day);

        let (t1, l1) = clock.stamp(NaiveTime::from_hms_opt(10, 0, 0));
        let (t2, l2) = clock.stamp(None);
        let (t3, _) = clock.stamp(NaiveTime::from_hms_opt(9, 0, 0));

        assert_eq!(l1, None);
        assert_eq!(l2.as_deref(), Some("Revision 1"));
        assert!(t1 < t2 && t2 < t3);
    }

    #[test]
    fn test_block_sharing_a_date_stays_after_its_base() {
        let first = replay_changelog(&base(&["A", "B", "C"]), "3/5 Changelog\nA moved from #1 to #3", &ArtistLookup::new());
        let last = first.last().unwrap();
        let second = replay_changelog(last, "3/5 Changelog\nA moved from #3 to #1\nC moved from #3 to #1", &ArtistLookup::new());

        assert_eq!(titles(last), vec!["B", "C", "A"]);
        assert!(second[0].date > last.date);
        assert!(second[1].date > second[0].date);
        assert_eq!(titles(&second[1]), vec!["C", "A", "B"]);
    }

    #[test]
    fn test_clock_after_floor() {
        let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let floor = day + Duration::milliseconds(5);
        let mut clock = ReplayClock::new(day).after(floor);

        let (t1, label) = clock.stamp(None);
        assert_eq!(label.as_deref(), Some("Revision 1"));
        assert_eq!(t1, floor + Duration::milliseconds(1));
    }
}
