// 🧭 Dashboard - The whole in-memory model, rebuilt from scratch on every load
//
// songs CSV  → catalog (songs + lookups)
// history CSV → snapshots (artist lookup from the catalog) → histories
// main songs  → tier scores
// demons CSV → demon levels

use crate::aggregator::{build_histories, find_history};
use crate::catalog::{build_catalog, SongCatalog};
use crate::csv_reader::{parse_csv, parse_records};
use crate::demons::{parse_demon_levels, DemonLevel};
use crate::event_log::parse_history_rows;
use crate::lists::{history_view, legacy_songs, main_songs, unranked_songs, HistoryView, LegacySong};
use crate::model::Song;
use crate::scoring::calculate_tier_scores;
use crate::temporal::{EntityHistory, Snapshot};
use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Dashboard - Catalog, timeline, histories, scores and demon levels
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dashboard {
    pub catalog: SongCatalog,
    /// Ascending by date
    pub snapshots: Vec<Snapshot>,
    /// Ordered by title
    pub histories: Vec<EntityHistory>,
    /// Normalized title → score, main-list songs with a tier only
    pub scores: HashMap<String, f64>,
    pub demons: Vec<DemonLevel>,
}

impl Dashboard {
    /// Run the full pipeline over the three sheet exports
    pub fn build(songs_csv: &str, history_csv: &str, demons_csv: &str) -> Self {
        let catalog = build_catalog(&parse_records(songs_csv));
        let snapshots = parse_history_rows(&parse_csv(history_csv), &catalog.lookups.artists);
        let histories = build_histories(&snapshots, &catalog.lookups.artists);
        let scores = calculate_tier_scores(&catalog.songs);
        let demons = parse_demon_levels(&parse_records(demons_csv));

        tracing::info!(
            songs = catalog.songs.len(),
            snapshots = snapshots.len(),
            histories = histories.len(),
            scored = scores.len(),
            demons = demons.len(),
            "Dashboard built"
        );

        Dashboard { catalog, snapshots, histories, scores, demons }
    }

    /// Build from local CSV files; a missing demon file means no demon levels
    pub fn from_files(songs: &Path, history: &Path, demons: Option<&Path>) -> Result<Self> {
        let read = |path: &Path| {
            std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
        };

        let songs_csv = read(songs)?;
        let history_csv = read(history)?;
        let demons_csv = match demons {
            Some(path) => read(path)?,
            None => String::new(),
        };

        Ok(Self::build(&songs_csv, &history_csv, &demons_csv))
    }

    pub fn main_songs(&self) -> Vec<&Song> {
        main_songs(&self.catalog.songs)
    }

    pub fn unranked_songs(&self) -> Vec<&Song> {
        unranked_songs(&self.catalog.songs)
    }

    pub fn legacy_songs(&self) -> Vec<LegacySong> {
        legacy_songs(&self.catalog, &self.snapshots, &self.histories)
    }

    pub fn history(&self, title: &str) -> Option<&EntityHistory> {
        find_history(&self.histories, title)
    }

    /// Song detail against the newest snapshot, points on or after `since`
    pub fn history_view(&self, title: &str, since: Option<NaiveDateTime>) -> Option<HistoryView> {
        self.history(title).map(|h| history_view(h, since, self.snapshots.last()))
    }

    /// The ranking as it stood at `at`: newest snapshot not later than it
    pub fn snapshot_at(&self, at: NaiveDateTime) -> Option<&Snapshot> {
        let end = self.snapshots.partition_point(|s| s.date <= at);
        end.checked_sub(1).map(|i| &self.snapshots[i])
    }

    /// Snapshots produced by changelog lines, newest first
    pub fn changelog_feed(&self) -> Vec<&Snapshot> {
        self.snapshots.iter().rev().filter(|s| s.has_changes()).collect()
    }

    /// Pretty JSON of the whole model
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize dashboard")
    }

    /// Write the JSON export to disk
    pub fn export(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?).with_context(|| format!("Failed to write {}", path.display()))
    }
}

// ============================================================================
// TESTS
// ============================================================================
