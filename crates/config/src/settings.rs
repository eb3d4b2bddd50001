// Engine settings
// Loaded from ~/.config/budgetgrid/settings.json

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    // Navigation
    #[serde(rename = "navigation.enterAppendsRow")]
    pub enter_appends_row: bool,

    #[serde(rename = "navigation.tabAppendsRow")]
    pub tab_appends_row: bool,

    // Clipboard
    #[serde(rename = "clipboard.listSeparator")]
    pub list_separator: char,

    #[serde(rename = "clipboard.growTable")]
    pub paste_grows_table: bool,

    #[serde(rename = "clipboard.maxPasteRows")]
    pub max_paste_rows: usize,

    // History
    #[serde(rename = "history.maxEntries")]
    pub max_history_entries: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            // Navigation
            enter_appends_row: true,
            tab_appends_row: true,
            // Clipboard
            list_separator: ',',
            paste_grows_table: true,
            max_paste_rows: 10_000,
            // History
            max_history_entries: 100,
        }
    }
}

const DEFAULT_SETTINGS_FILE: &str = r#"{
    // Navigation: Enter/Tab on the last row append a new row
    "navigation.enterAppendsRow": true,
    "navigation.tabAppendsRow": true,

    // Clipboard: separator between labels of multi-value cells
    "clipboard.listSeparator": ",",
    // Paste past the last row creates new rows instead of dropping them
    "clipboard.growTable": true,
    "clipboard.maxPasteRows": 10000,

    // Undo depth
    "history.maxEntries": 100
}
"#;

impl EngineSettings {
    /// Get the settings file path
    pub fn config_path() -> PathBuf {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("budgetgrid");
        config_dir.join("settings.json")
    }

    /// Load settings from the default location, falling back to defaults.
    ///
    /// A missing file is created with the commented defaults.
    pub fn load() -> Self {
        let path = Self::config_path();

        if !path.exists() {
            if let Err(e) = Self::write_default_file(&path) {
                log::warn!("{}", e);
            }
            return Self::default();
        }

        match Self::load_from(&path) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("{}; using default settings", e);
                Self::default()
            }
        }
    }

    /// Load settings from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
        Self::parse(&contents).map_err(|e| e.with_path(path))
    }

    /// Parse settings JSON. Lines starting with `//` are comments.
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let cleaned: String = contents
            .lines()
            .filter(|line| !line.trim().starts_with("//"))
            .collect::<Vec<_>>()
            .join("\n");

        let settings: Self = serde_json::from_str(&cleaned)
            .map_err(|e| ConfigError::Parse { path: None, message: e.to_string() })?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.list_separator == '\t' || self.list_separator == '\n' {
            return Err(ConfigError::Invalid(
                "clipboard.listSeparator cannot be a tab or newline".to_string(),
            ));
        }
        if self.max_paste_rows == 0 {
            return Err(ConfigError::Invalid("clipboard.maxPasteRows must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Save settings to an explicit path
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::io(parent, e))?;
        }

        let json = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::Parse { path: None, message: e.to_string() })?;

        fs::write(path, json).map_err(|e| ConfigError::io(path, e))
    }

    fn write_default_file(path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::io(parent, e))?;
        }
        fs::write(path, DEFAULT_SETTINGS_FILE).map_err(|e| ConfigError::io(path, e))
    }
}
