// ⚙️ Configuration - Sheet locations, server bind, log level
// Every field has a default, so running without a config file works out of the box.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

const DEFAULT_CSV_URL: &str =
    "https://docs.google.com/spreadsheets/d/1jwBvS09EtK31B8uPRKMuCSTS-ghJYfRuVqfit1p_a7Q/export?format=csv";
const DEFAULT_SCRIPT_URL: &str = "https://script.google.com/macros/s/AKfycbxWyyhOQ3gTBuDLutem8vlywESzM7iXrkaAqJ-T0OA0HXbZfkPNLm6q9vEzYXCXqpfjCg/exec";

/// Where the spreadsheet lives
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetsConfig {
    /// CSV export URL of the spreadsheet; tabs are selected with `&gid=`
    pub csv_url: String,
    pub song_list_gid: String,
    pub changelog_gid: String,
    pub demon_list_gid: String,
    /// Apps Script endpoint that accepts saves
    pub script_url: String,
    /// Shared secret for saves; never written to disk by this crate
    #[serde(skip_serializing)]
    pub token: Option<String>,
}

impl Default for SheetsConfig {
    fn default() -> Self {
        SheetsConfig {
            csv_url: DEFAULT_CSV_URL.to_string(),
            song_list_gid: "113460815".to_string(),
            changelog_gid: "477178938".to_string(),
            demon_list_gid: "95543877".to_string(),
            script_url: DEFAULT_SCRIPT_URL.to_string(),
            token: None,
        }
    }
}

impl SheetsConfig {
    /// CSV export URL for one tab
    pub fn csv_url_for(&self, gid: &str) -> String {
        format!("{}&gid={}", self.csv_url, gid)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig { bind: "0.0.0.0:3000".to_string() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// trace, debug, info, warn, error (or any EnvFilter directive)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig { level: "info".to_string() }
    }
}

/// AppConfig - Everything read from the TOML file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub sheets: SheetsConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Parse TOML text; missing sections and keys take their defaults
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).context("Invalid configuration TOML")
    }

    /// Read a config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Read `path` when given, defaults otherwise
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Replace the token when one is supplied (CLI flag or environment)
    pub fn with_token(mut self, token: Option<String>) -> Self {
        if let Some(token) = token.filter(|t| !t.trim().is_empty()) {
            self.sheets.token = Some(token);
        }
        self
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.server.bind, "0.0.0.0:3000");
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.sheets.song_list_gid, "113460815");
        assert!(config.sheets.token.is_none());
        assert!(config.sheets.csv_url_for("42").ends_with("export?format=csv&gid=42"));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nbind = \"127.0.0.1:8080\"\n\n[sheets]\nchangelog_gid = \"7\"").unwrap();

        let config = AppConfig::from_file(file.path()).unwrap();
        assert_eq!(config.server.bind, "127.0.0.1:8080");
        assert_eq!(config.sheets.changelog_gid, "7");
        assert_eq!(config.sheets.song_list_gid, "113460815");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = AppConfig::from_file(&dir.path().join("nope.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[server\nbind = 3").unwrap();
        assert!(AppConfig::from_file(file.path()).is_err());
    }

    #[test]
    fn test_load_without_path() {
        assert_eq!(AppConfig::load(None).unwrap(), AppConfig::default());
    }

    #[test]
    fn test_token_override() {
        let config = AppConfig::from_toml("[sheets]\ntoken = \"from-file\"").unwrap();
        assert_eq!(config.clone().with_token(None).sheets.token.as_deref(), Some("from-file"));
        assert_eq!(config.clone().with_token(Some(" ".into())).sheets.token.as_deref(), Some("from-file"));
        assert_eq!(config.with_token(Some("cli".into())).sheets.token.as_deref(), Some("cli"));
    }
}
