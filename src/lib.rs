// Tier List History - Core Library
// Exposes all modules for use in CLI, API server, and tests

pub mod model;
pub mod csv_reader;
pub mod temporal;
pub mod changelog;      // Changelog Replay Engine
pub mod event_log;      // History sheet → snapshots
pub mod aggregator;     // Snapshots → per-song histories
pub mod scoring;        // Tier + rank → score
pub mod catalog;
pub mod demons;
pub mod lists;
pub mod stats;
pub mod comparison;
pub mod editor;
pub mod config;
pub mod dashboard;

#[cfg(feature = "remote")]
pub mod remote;

// Re-export commonly used types
pub use model::{
    Membership, Song, SongType, Tier, TierBand,
    normalize_title, parse_sheet_date,
};
pub use csv_reader::{
    Record, parse_csv, parse_records, rows_to_records, write_csv,
};
pub use temporal::{
    ChangeKind, ChangelogEntry, EntityHistory, HistoryPoint, Snapshot, SongEntry,
};
pub use changelog::{
    ArtistLookup, ChangelogLine, ReplayClock,
    apply_mutation, parse_changelog_line, replay_changelog,
};
pub use event_log::{parse_history_rows, parse_history_text};
pub use aggregator::{build_histories, find_history};
pub use scoring::calculate_tier_scores;
pub use catalog::{LookupTables, SongCatalog, build_catalog};
pub use demons::{DemonLevel, DemonListType, filter_demon_levels, parse_demon_levels};
pub use lists::{
    HistoryRow, HistoryView, LegacySong, RevisionEntry,
    history_view, legacy_songs, main_songs, revision_view, unranked_songs,
};
pub use stats::{CollectionStats, collection_stats, unique_artists};
pub use comparison::{Candidate, ComparisonSession, PoolFilter, Standing, Vote};
pub use editor::{EditBuffer, EditField, SaveRow};
pub use config::AppConfig;
pub use dashboard::Dashboard;

#[cfg(feature = "remote")]
pub use remote::SheetClient;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
