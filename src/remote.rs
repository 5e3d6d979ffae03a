// 🌐 Remote Sheet - CSV export fetches and Apps Script saves
//
// No retry, no timeout, no partial recovery: a failed load is one error for
// the whole dashboard, a failed save is one error carrying the endpoint's message.

use crate::config::SheetsConfig;
use crate::dashboard::Dashboard;
use crate::editor::SaveRow;
use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};

/// Body of a save request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ScriptAction<'a> {
    SaveSongs { data: &'a [SaveRow] },
    AppendChangelog { content: &'a str },
}

/// `{status: "success"}` or `{status: "error", message}`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScriptResponse {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
}

impl ScriptResponse {
    /// Turn an error status into an error carrying the endpoint's message
    pub fn into_result(self) -> Result<()> {
        if self.status.eq_ignore_ascii_case("error") {
            let message = self.message.unwrap_or_else(|| "Unknown error".to_string());
            if message.contains("authenticate") {
                tracing::warn!("Save endpoint asks for authentication; open the script URL in a browser once");
            }
            bail!(message);
        }
        Ok(())
    }
}

/// SheetClient - Reads the public CSV export, writes through the script endpoint
#[derive(Debug, Clone)]
pub struct SheetClient {
    http: reqwest::Client,
    sheets: SheetsConfig,
}

impl SheetClient {
    pub fn new(sheets: SheetsConfig) -> Self {
        SheetClient {
            http: reqwest::Client::new(),
            sheets,
        }
    }

    /// GET the CSV export of one tab
    pub async fn fetch_csv(&self, gid: &str) -> Result<String> {
        let url = self.sheets.csv_url_for(gid);
        tracing::debug!(gid, "Fetching sheet tab");

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Request for sheet tab {} failed", gid))?
            .error_for_status()
            .with_context(|| format!("Sheet tab {} returned an error status", gid))?;

        response
            .text()
            .await
            .with_context(|| format!("Sheet tab {} body could not be read", gid))
    }

    /// Fetch songs, history and demon list together and build the dashboard
    pub async fn load_dashboard(&self) -> Result<Dashboard> {
        let fetched = tokio::try_join!(
            self.fetch_csv(&self.sheets.song_list_gid),
            self.fetch_csv(&self.sheets.changelog_gid),
            self.fetch_csv(&self.sheets.demon_list_gid),
        );
        let (songs, history, demons) = fetched.context("Failed to load data")?;
        Ok(Dashboard::build(&songs, &history, &demons))
    }

    async fn post(&self, action: &ScriptAction<'_>) -> Result<()> {
        let token = self
            .sheets
            .token
            .as_deref()
            .ok_or_else(|| anyhow!("No save token configured (set TIERLIST_TOKEN or --token)"))?;

        let response: ScriptResponse = self
            .http
            .post(&self.sheets.script_url)
            .query(&[("token", token)])
            .body(serde_json::to_string(action).context("Failed to encode save request")?)
            .send()
            .await
            .context("Save request failed")?
            .json()
            .await
            .context("Save endpoint returned an unreadable response")?;

        response.into_result()
    }

    /// Replace the song sheet with `rows`
    pub async fn save_songs(&self, rows: &[SaveRow]) -> Result<()> {
        self.post(&ScriptAction::SaveSongs { data: rows }).await?;
        tracing::info!(rows = rows.len(), "Saved song sheet");
        Ok(())
    }

    /// Append a changelog block to the history sheet
    pub async fn append_changelog(&self, content: &str) -> Result<()> {
        self.post(&ScriptAction::AppendChangelog { content }).await?;
        tracing::info!(lines = content.lines().count(), "Appended changelog");
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================
