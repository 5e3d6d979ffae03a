// 📚 Song Catalog - Song sheet records → songs + lookup tables
// Built in one pure pass; the lookup tables are returned, never shared and mutated.

use crate::changelog::ArtistLookup;
use crate::csv_reader::{field, Record};
use crate::model::{
    non_placeholder, normalize_title, parse_sheet_date, Membership, Song, SongType, Tier, PLACEHOLDER_IMAGE,
    UNKNOWN_ARTIST,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Lookup tables keyed by normalized title
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LookupTables {
    /// Only sheet images that are real URLs
    pub thumbnails: HashMap<String, String>,
    /// Artist for every song (`N/A` when blank)
    pub artists: ArtistLookup,
    /// Remixer when present and not `N/A`
    pub remixers: HashMap<String, String>,
}

/// SongCatalog - Every song in the sheet plus its lookups
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SongCatalog {
    pub songs: Vec<Song>,
    pub lookups: LookupTables,
}

impl SongCatalog {
    /// Find a song by any spelling of its title
    pub fn get(&self, title: &str) -> Option<&Song> {
        let key = normalize_title(title);
        self.songs.iter().find(|s| s.key() == key)
    }

    /// Thumbnail for a title, falling back to the placeholder
    pub fn thumbnail(&self, title: &str) -> &str {
        self.lookups
            .thumbnails
            .get(&normalize_title(title))
            .map(String::as_str)
            .unwrap_or(PLACEHOLDER_IMAGE)
    }
}

fn optional(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Map one record; `position` is the 1-based index among kept rows
fn song_from_record(record: &Record, position: usize) -> Song {
    let title = field(record, "song").to_string();
    let artist = match field(record, "artist") {
        "" => UNKNOWN_ARTIST.to_string(),
        a => a.to_string(),
    };

    let rank_cell = match field(record, "#") {
        "" => field(record, "rank"),
        cell => cell,
    };
    let rank = rank_cell
        .trim()
        .parse::<u32>()
        .ok()
        .filter(|r| *r > 0)
        .unwrap_or(position as u32);

    let image = field(record, "image");
    let type_cell = field(record, "inst/vocal");
    let link = match field(record, "link") {
        "" => field(record, "url"),
        l => l,
    };

    Song {
        image_url: optional(image).unwrap_or_else(|| PLACEHOLDER_IMAGE.to_string()),
        title,
        artist,
        remixer: optional(field(record, "remixer")),
        song_type: if type_cell.is_empty() { SongType::Vocal } else { SongType::parse(type_cell) },
        date_added: parse_sheet_date(field(record, "date added")),
        tier: Tier::parse(field(record, "tier")),
        rank,
        membership: Membership::parse(field(record, "main")),
        background_color: optional(field(record, "background")),
        link: optional(link),
        duration: optional(field(record, "duration")),
    }
}

/// Build the catalog from song sheet records
///
/// Records without a `song` value are skipped. Rank comes from `#`, then
/// `rank`, then the row's position among kept rows.
pub fn build_catalog(records: &[Record]) -> SongCatalog {
    let mut songs = Vec::new();
    let mut lookups = LookupTables::default();

    for (i, record) in records.iter().filter(|r| !field(r, "song").is_empty()).enumerate() {
        let song = song_from_record(record, i + 1);
        let key = song.key();

        let image = field(record, "image");
        if image.starts_with("http") {
            lookups.thumbnails.insert(key.clone(), image.to_string());
        }
        lookups.artists.insert(key.clone(), song.artist.clone());
        if let Some(remixer) = non_placeholder(field(record, "remixer")) {
            lookups.remixers.insert(key, remixer);
        }

        songs.push(song);
    }

    tracing::debug!(songs = songs.len(), "Built song catalog");
    SongCatalog { songs, lookups }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csv_reader::parse_records;

    const SHEET: &str = "\
#,SONG,ARTIST,REMIXER,INST/VOCAL,Date Added,TIER,MAIN,BACKGROUND,DURATION,LINK,IMAGE
1,Alpha,Artist One,N/A,Vocal,5/5/2023,S+,Y,#112233,3:30,https://x/alpha,https://img/alpha.png
2,Beta,,DJ Remix,Instrumental,45000,A-,Y,,,,not-a-url
,Gamma,Artist Three,,,,,U,,,,
,,Nobody,,,,,,,,,
,Delta,Artist Four,,,,B,N,,,,
";

    #[test]
    fn test_build_catalog_maps_columns() {
        let catalog = build_catalog(&parse_records(SHEET));
        assert_eq!(catalog.songs.len(), 4);

        let alpha = &catalog.songs[0];
        assert_eq!(alpha.rank, 1);
        assert_eq!(alpha.tier, Some(Tier::SPlus));
        assert_eq!(alpha.membership, Membership::Main);
        assert_eq!(alpha.date_added.as_deref(), Some("2023-05-05"));
        assert_eq!(alpha.duration.as_deref(), Some("3:30"));
        assert_eq!(alpha.link.as_deref(), Some("https://x/alpha"));
        assert_eq!(alpha.background_color.as_deref(), Some("#112233"));

        let beta = &catalog.songs[1];
        assert_eq!(beta.artist, "N/A");
        assert_eq!(beta.song_type, SongType::Instrumental);
        assert_eq!(beta.date_added.as_deref(), Some("2023-03-15"));
        assert_eq!(beta.image_url, "not-a-url");
    }

    #[test]
    fn test_rank_falls_back_to_position() {
        let catalog = build_catalog(&parse_records(SHEET));
        let gamma = catalog.get("gamma").unwrap();
        assert_eq!(gamma.rank, 3);
        assert_eq!(gamma.membership, Membership::Unranked);
        assert_eq!(gamma.tier, None);
        assert_eq!(gamma.image_url, PLACEHOLDER_IMAGE);

        // Nameless row does not count toward positions
        assert_eq!(catalog.get("Delta").unwrap().rank, 4);
    }

    #[test]
    fn test_lookup_tables() {
        let catalog = build_catalog(&parse_records(SHEET));
        let lookups = &catalog.lookups;

        assert_eq!(lookups.thumbnails.len(), 1);
        assert_eq!(catalog.thumbnail("ALPHA"), "https://img/alpha.png");
        assert_eq!(catalog.thumbnail("beta"), PLACEHOLDER_IMAGE);

        assert_eq!(lookups.artists["beta"], "N/A");
        assert_eq!(lookups.artists["gamma"], "Artist Three");

        assert_eq!(lookups.remixers.len(), 1);
        assert_eq!(lookups.remixers["beta"], "DJ Remix");
    }

    #[test]
    fn test_rank_column_alias() {
        let catalog = build_catalog(&parse_records("rank,song\n7,Seven\n"));
        assert_eq!(catalog.songs[0].rank, 7);
    }
}
