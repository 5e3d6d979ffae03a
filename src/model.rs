// 🎵 Song Model - Tiers, songs, and title identity
// A song's identity is its normalized title; everything else is a value that can change.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Placeholder shown when a song has no artist
pub const UNKNOWN_ARTIST: &str = "N/A";

/// Thumbnail used when the sheet has no image for a song
pub const PLACEHOLDER_IMAGE: &str = "https://via.placeholder.com/128x72.png?text=No+Image";

// ============================================================================
// TIER
// ============================================================================

/// Tier - Discrete quality bucket, best first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Tier {
    #[serde(rename = "S+")]
    SPlus,
    #[serde(rename = "S")]
    S,
    #[serde(rename = "A++")]
    APlusPlus,
    #[serde(rename = "A+")]
    APlus,
    #[serde(rename = "A")]
    A,
    #[serde(rename = "A-")]
    AMinus,
    #[serde(rename = "B+")]
    BPlus,
    #[serde(rename = "B")]
    B,
    #[serde(rename = "B-")]
    BMinus,
}

/// Score band for one tier (inclusive on both ends)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TierBand {
    pub min: f64,
    pub max: f64,
}

impl Tier {
    /// All tiers, best first
    pub const ALL: [Tier; 9] = [
        Tier::SPlus,
        Tier::S,
        Tier::APlusPlus,
        Tier::APlus,
        Tier::A,
        Tier::AMinus,
        Tier::BPlus,
        Tier::B,
        Tier::BMinus,
    ];

    /// Label as written in the sheet
    pub fn label(&self) -> &'static str {
        match self {
            Tier::SPlus => "S+",
            Tier::S => "S",
            Tier::APlusPlus => "A++",
            Tier::APlus => "A+",
            Tier::A => "A",
            Tier::AMinus => "A-",
            Tier::BPlus => "B+",
            Tier::B => "B",
            Tier::BMinus => "B-",
        }
    }

    /// Parse a sheet cell. Blank or unknown labels have no tier.
    pub fn parse(raw: &str) -> Option<Tier> {
        let label = raw.trim();
        Tier::ALL.iter().copied().find(|t| t.label().eq_ignore_ascii_case(label))
    }

    /// Continuous score band used by the tier score calculator
    pub fn band(&self) -> TierBand {
        let (min, max) = match self {
            Tier::SPlus => (100.0, 100.0),
            Tier::S => (99.0, 100.0),
            Tier::APlusPlus => (97.0, 99.0),
            Tier::APlus => (95.0, 97.0),
            Tier::A => (93.0, 95.0),
            Tier::AMinus => (90.0, 93.0),
            Tier::BPlus => (85.0, 90.0),
            Tier::B => (80.0, 85.0),
            Tier::BMinus => (70.0, 80.0),
        };
        TierBand { min, max }
    }
}

// ============================================================================
// SONG
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SongType {
    #[default]
    Vocal,
    Instrumental,
}

impl SongType {
    pub fn parse(raw: &str) -> SongType {
        if raw.trim().eq_ignore_ascii_case("instrumental") {
            SongType::Instrumental
        } else {
            SongType::Vocal
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SongType::Vocal => "Vocal",
            SongType::Instrumental => "Instrumental",
        }
    }
}

/// Which list a song belongs to, from the sheet's `main` column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Membership {
    /// `Y` - part of the tiered main ranking
    Main,
    /// `U` - listened to but not ranked yet
    Unranked,
    /// Anything else
    #[default]
    Off,
}

impl Membership {
    pub fn parse(raw: &str) -> Membership {
        match raw.trim().to_uppercase().as_str() {
            "Y" => Membership::Main,
            "U" => Membership::Unranked,
            _ => Membership::Off,
        }
    }

    /// Flag written back to the `MAIN` column
    pub fn flag(&self) -> &'static str {
        match self {
            Membership::Main => "Y",
            Membership::Unranked => "U",
            Membership::Off => "N",
        }
    }
}

/// Song - One row of the song sheet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Song {
    pub image_url: String,
    pub title: String,
    pub artist: String,
    pub remixer: Option<String>,
    pub song_type: SongType,
    /// ISO date (`YYYY-MM-DD`) when recognisable, raw text otherwise
    pub date_added: Option<String>,
    /// None for unranked and legacy songs
    pub tier: Option<Tier>,
    pub rank: u32,
    pub membership: Membership,
    pub background_color: Option<String>,
    pub link: Option<String>,
    pub duration: Option<String>,
}

impl Song {
    pub fn new(title: &str, artist: &str) -> Self {
        Song {
            image_url: PLACEHOLDER_IMAGE.to_string(),
            title: title.to_string(),
            artist: artist.to_string(),
            remixer: None,
            song_type: SongType::Vocal,
            date_added: None,
            tier: None,
            rank: 0,
            membership: Membership::Off,
            background_color: None,
            link: None,
            duration: None,
        }
    }

    /// Identity key
    pub fn key(&self) -> String {
        normalize_title(&self.title)
    }

    pub fn is_main(&self) -> bool {
        self.membership == Membership::Main
    }

    pub fn is_unranked(&self) -> bool {
        self.membership == Membership::Unranked
    }
}

// ============================================================================
// TEXT HELPERS
// ============================================================================

/// Undo sheet quoting: `""` → `"`, one surrounding quote pair removed, trimmed
pub fn clean_field(raw: &str) -> String {
    let unescaped = raw.replace("\"\"", "\"");
    let without_lead = unescaped.strip_prefix('"').unwrap_or(&unescaped);
    let without_trail = without_lead.strip_suffix('"').unwrap_or(without_lead);
    without_trail.trim().to_string()
}

/// Identity key for a title: case, punctuation and whitespace folded
///
/// The literal title "strip" maps to a sentinel key. This looks like a workaround
/// for a collision in the source data; it is kept for compatibility only.
pub fn normalize_title(title: &str) -> String {
    let lowered = clean_field(title).to_lowercase();
    let stripped: String = lowered
        .chars()
        .filter(|c| !matches!(c, ':' | '_' | '(' | ')' | '[' | ']' | '"' | '\''))
        .collect();
    let collapsed = stripped.split_whitespace().collect::<Vec<_>>().join(" ");

    if collapsed == "strip" {
        "牢獄strip".to_string()
    } else {
        collapsed
    }
}

/// Treat blank and `N/A` cells as missing
pub fn non_placeholder(raw: &str) -> Option<String> {
    let value = raw.trim();
    if value.is_empty() || value == UNKNOWN_ARTIST {
        None
    } else {
        Some(value.to_string())
    }
}

// ============================================================================
// DATES
// ============================================================================

const DATE_FORMATS: [&str; 6] = ["%Y-%m-%d", "%m/%d/%y", "%m/%d/%Y", "%Y/%m/%d", "%B %d, %Y", "%b %d, %Y"];

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
];

/// Parse the date formats people type into the sheet
pub fn parse_calendar_date(raw: &str) -> Option<NaiveDate> {
    let value = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
                .map(|dt| dt.date())
        })
}

/// Normalize a `date added` cell
///
/// - blank → None
/// - five-digit spreadsheet serial → ISO date (25569 = 1970-01-01)
/// - recognisable date → ISO date
/// - anything else → the raw text
pub fn parse_sheet_date(raw: &str) -> Option<String> {
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }

    if value.len() == 5 && value.chars().all(|c| c.is_ascii_digit()) {
        let serial: i64 = value.parse().ok()?;
        let epoch = NaiveDate::from_ymd_opt(1970, 1, 1)?;
        let date = epoch.checked_add_signed(Duration::days(serial - 25569))?;
        return Some(date.format("%Y-%m-%d").to_string());
    }

    match parse_calendar_date(value) {
        Some(date) => Some(date.format("%Y-%m-%d").to_string()),
        None => Some(value.to_string()),
    }
}

// ============================================================================
// TESTS
// ============================================================================
