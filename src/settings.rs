//! Persisted preferences: menu items, the on/off switch and the search
//! provider.
//!
//! Stored as a small JSON document, by default at
//! `<config dir>/selection-toolbar/settings.json`:
//!
//! ```json
//! { "enabledItems": ["copy", "search", "translate"], "enabled": true, "searchEngine": "google" }
//! ```
//!
//! Every key is optional on disk; [`Settings::resolve`] fills in defaults.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::actions::MenuItem;

const APP_DIR: &str = "selection-toolbar";
const SETTINGS_FILE: &str = "settings.json";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings I/O failed: {0}")]
    Io(#[from] io::Error),
    #[error("settings file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("at least one menu item must be selected")]
    NoItemsSelected,
    #[error("could not determine the user configuration directory")]
    NoConfigDir,
}

/// Search providers the background can hand a query to.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchEngine {
    #[default]
    Google,
    Bing,
    DuckDuckGo,
    Yahoo,
    Yandex,
}

impl SearchEngine {
    pub const ALL: [SearchEngine; 5] = [
        SearchEngine::Google,
        SearchEngine::Bing,
        SearchEngine::DuckDuckGo,
        SearchEngine::Yahoo,
        SearchEngine::Yandex,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SearchEngine::Google => "google",
            SearchEngine::Bing => "bing",
            SearchEngine::DuckDuckGo => "duckduckgo",
            SearchEngine::Yahoo => "yahoo",
            SearchEngine::Yandex => "yandex",
        }
    }

    fn base_url(&self) -> &'static str {
        match self {
            SearchEngine::Google => "https://www.google.com/search?q=",
            SearchEngine::Bing => "https://www.bing.com/search?q=",
            SearchEngine::DuckDuckGo => "https://duckduckgo.com/?q=",
            SearchEngine::Yahoo => "https://search.yahoo.com/search?p=",
            SearchEngine::Yandex => "https://yandex.com/search/?text=",
        }
    }

    /// Results page for `query`.
    pub fn url_for(&self, query: &str) -> String {
        format!("{}{}", self.base_url(), urlencoding::encode(query))
    }
}

impl fmt::Display for SearchEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown search engine `{0}` (expected google, bing, duckduckgo, yahoo or yandex)")]
pub struct UnknownSearchEngine(pub String);

impl FromStr for SearchEngine {
    type Err = UnknownSearchEngine;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        SearchEngine::ALL
            .into_iter()
            .find(|engine| engine.as_str() == wanted)
            .ok_or(UnknownSearchEngine(wanted))
    }
}

/// The settings document exactly as stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled_items: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_engine: Option<String>,
}

/// Settings with defaults applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub enabled_items: Vec<String>,
    pub enabled: bool,
    pub search_engine: SearchEngine,
}

impl Default for Settings {
    fn default() -> Self {
        Self::resolve(&StoredSettings::default())
    }
}

impl Settings {
    pub fn resolve(stored: &StoredSettings) -> Self {
        let search_engine = match stored.search_engine.as_deref() {
            None => SearchEngine::default(),
            Some(name) => name.parse().unwrap_or_else(|err: UnknownSearchEngine| {
                tracing::warn!(%err, "falling back to the default search engine");
                SearchEngine::default()
            }),
        };
        Self {
            enabled_items: stored
                .enabled_items
                .clone()
                .unwrap_or_else(default_enabled_items),
            enabled: stored.enabled.unwrap_or(true),
            search_engine,
        }
    }

    pub fn menu_items(&self) -> Vec<MenuItem> {
        self.enabled_items
            .iter()
            .filter_map(|name| name.parse().ok())
            .collect()
    }
}

pub fn default_enabled_items() -> Vec<String> {
    MenuItem::ALL.iter().map(|item| item.to_string()).collect()
}

/// Key/value persistence behind the background coordinator.
pub trait SettingsStore {
    fn load(&self) -> Result<StoredSettings, SettingsError>;
    fn save(&mut self, settings: &StoredSettings) -> Result<(), SettingsError>;
}

/// Settings kept in a JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<config dir>/selection-toolbar/settings.json`.
    pub fn default_path() -> Result<PathBuf, SettingsError> {
        let dir = dirs::config_dir().ok_or(SettingsError::NoConfigDir)?;
        Ok(dir.join(APP_DIR).join(SETTINGS_FILE))
    }

    pub fn at_default_location() -> Result<Self, SettingsError> {
        Ok(Self::new(Self::default_path()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for JsonFileStore {
    fn load(&self) -> Result<StoredSettings, SettingsError> {
        if !self.path.exists() {
            return Ok(StoredSettings::default());
        }
        let raw = fs::read_to_string(&self.path)?;
        if raw.trim().is_empty() {
            return Ok(StoredSettings::default());
        }
        Ok(serde_json::from_str(&raw)?)
    }

    fn save(&mut self, settings: &StoredSettings) -> Result<(), SettingsError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(settings)?;
        fs::write(&self.path, json)?;
        Ok(())
    }
}

/// In-memory store with switchable failures.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    settings: StoredSettings,
    fail_reads: bool,
    fail_writes: bool,
}

impl MemoryStore {
    pub fn new(settings: StoredSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    /// A store whose reads and writes always fail.
    pub fn broken() -> Self {
        Self {
            fail_reads: true,
            fail_writes: true,
            ..Self::default()
        }
    }

    pub fn stored(&self) -> &StoredSettings {
        &self.settings
    }
}

impl SettingsStore for MemoryStore {
    fn load(&self) -> Result<StoredSettings, SettingsError> {
        if self.fail_reads {
            return Err(io::Error::other("storage unavailable").into());
        }
        Ok(self.settings.clone())
    }

    fn save(&mut self, settings: &StoredSettings) -> Result<(), SettingsError> {
        if self.fail_writes {
            return Err(io::Error::other("storage unavailable").into());
        }
        self.settings = settings.clone();
        Ok(())
    }
}
