//! The background coordinator.
//!
//! One coordinator serves every page. It owns the on/off switch and the last
//! palette it derived from the host theme, answers the requests in
//! [`crate::protocol`], and performs the privileged work pages cannot do
//! themselves: opening tabs and running searches. Host and storage failures
//! are logged and replaced by defaults, never returned to the page.

use std::sync::mpsc;

use thiserror::Error;

use crate::actions::MenuItem;
use crate::constants::FALLBACK_SEARCH_URL;
use crate::protocol::{Message, Response, SettingsResponse, ThemeResponse};
use crate::settings::{
    SearchEngine, Settings, SettingsError, SettingsStore, StoredSettings, default_enabled_items,
};
use crate::theme::{HostTheme, ThemePalette};

#[derive(Debug, Error)]
pub enum HostError {
    #[error("the host does not provide {0}")]
    Unavailable(&'static str),
    #[error("host call failed: {0}")]
    Failed(String),
}

/// Privileged browser APIs.
pub trait BrowserHost {
    /// The current browser theme, `None` when no theme is installed.
    fn current_theme(&mut self) -> Result<Option<HostTheme>, HostError>;

    fn active_tab_index(&mut self) -> Result<usize, HostError>;

    fn create_tab(
        &mut self,
        url: &str,
        index: Option<usize>,
        active: bool,
    ) -> Result<(), HostError>;

    /// Hand `query` to the search provider.
    fn search(&mut self, query: &str, engine: SearchEngine) -> Result<(), HostError>;

    fn set_icon(&mut self, enabled: bool) -> Result<(), HostError>;

    /// Deliver `message` to every page.
    fn broadcast(&mut self, message: Message);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtensionState {
    pub enabled: bool,
}

impl Default for ExtensionState {
    fn default() -> Self {
        Self { enabled: true }
    }
}

pub struct BackgroundCoordinator<S, B> {
    store: S,
    host: B,
    state: ExtensionState,
    palette: ThemePalette,
}

impl<S: SettingsStore, B: BrowserHost> BackgroundCoordinator<S, B> {
    pub fn new(store: S, host: B) -> Self {
        Self {
            store,
            host,
            state: ExtensionState::default(),
            palette: ThemePalette::default(),
        }
    }

    /// Load the switch state and write the default menu items when none are
    /// stored yet.
    pub fn start(&mut self) {
        let stored = match self.store.load() {
            Ok(stored) => stored,
            Err(err) => {
                tracing::warn!(%err, "could not read settings, using defaults");
                StoredSettings::default()
            }
        };
        self.state.enabled = stored.enabled.unwrap_or(true);
        if stored.enabled_items.is_none() {
            let initial = StoredSettings {
                enabled_items: Some(default_enabled_items()),
                ..stored
            };
            match self.store.save(&initial) {
                Ok(()) => tracing::info!("initialised default menu items"),
                Err(err) => tracing::warn!(%err, "could not write default menu items"),
            }
        }
        if let Err(err) = self.host.set_icon(self.state.enabled) {
            tracing::debug!(%err, "icon not updated");
        }
        if self.state.enabled {
            self.get_theme_colors();
        }
    }

    pub fn handle_message(&mut self, message: Message) -> Option<Response> {
        match message {
            Message::GetSettings => Some(Response::Settings(self.get_settings())),
            Message::GetThemeColors => Some(Response::Theme(ThemeResponse {
                colors: self.get_theme_colors(),
            })),
            Message::PerformSearch { search_text } => {
                self.perform_search(&search_text);
                None
            }
            Message::OpenInBackgroundTab { url } => {
                self.open_in_background_tab(&url);
                None
            }
            Message::ToggleExtension { enabled } => {
                self.toggle_extension(enabled);
                None
            }
            other @ (Message::ThemeColors { .. } | Message::ExtensionDisabled) => {
                tracing::debug!(message = ?other, "ignoring page-bound message");
                None
            }
        }
    }

    pub fn get_settings(&self) -> SettingsResponse {
        match self.store.load() {
            Ok(stored) => SettingsResponse {
                enabled_items: stored.enabled_items.unwrap_or_else(default_enabled_items),
                error: None,
            },
            Err(err) => {
                tracing::warn!(%err, "could not read settings");
                SettingsResponse {
                    enabled_items: default_enabled_items(),
                    error: Some(err.to_string()),
                }
            }
        }
    }

    /// Palette for the current host theme. Never fails: without a usable
    /// theme the default palette is returned.
    pub fn get_theme_colors(&mut self) -> ThemePalette {
        let palette = match self.host.current_theme() {
            Ok(Some(theme)) => ThemePalette::from_host(&theme),
            Ok(None) => ThemePalette::default(),
            Err(err) => {
                tracing::warn!(%err, "theme query failed, using the default palette");
                ThemePalette::default()
            }
        };
        self.palette = palette.clone();
        palette
    }

    /// Re-read the theme after the host reported a change.
    pub fn refresh_theme(&mut self) {
        let colors = self.get_theme_colors();
        if self.state.enabled {
            self.host.broadcast(Message::ThemeColors { colors });
        }
    }

    pub fn toggle_extension(&mut self, enabled: bool) {
        self.state.enabled = enabled;
        if let Err(err) = self.update_stored(|stored| stored.enabled = Some(enabled)) {
            tracing::warn!(%err, "could not persist the extension switch");
        }
        if let Err(err) = self.host.set_icon(enabled) {
            tracing::debug!(%err, "icon not updated");
        }
        tracing::info!(enabled, "extension toggled");
        if enabled {
            let colors = self.get_theme_colors();
            self.host.broadcast(Message::ThemeColors { colors });
        } else {
            self.host.broadcast(Message::ExtensionDisabled);
        }
    }

    /// Open `url` in an unfocused tab right after the active one.
    pub fn open_in_background_tab(&mut self, url: &str) {
        let index = match self.host.active_tab_index() {
            Ok(index) => index,
            Err(err) => {
                tracing::warn!(%err, url, "tab query failed, not opening");
                return;
            }
        };
        if let Err(err) = self.host.create_tab(url, Some(index + 1), false) {
            tracing::warn!(%err, url, "could not open background tab");
        }
    }

    pub fn perform_search(&mut self, query: &str) {
        let engine = self.settings().search_engine;
        if let Err(err) = self.host.search(query, engine) {
            tracing::warn!(%err, %engine, "search provider failed, opening fallback search");
            let url = format!("{FALLBACK_SEARCH_URL}{}", urlencoding::encode(query));
            if let Err(err) = self.host.create_tab(&url, None, true) {
                tracing::warn!(%err, "could not open fallback search");
            }
        }
    }

    /// Persist the menu items chosen in the options form.
    pub fn set_enabled_items(&mut self, items: &[MenuItem]) -> Result<(), SettingsError> {
        if items.is_empty() {
            return Err(SettingsError::NoItemsSelected);
        }
        let names: Vec<String> = items.iter().map(MenuItem::to_string).collect();
        self.update_stored(|stored| stored.enabled_items = Some(names))
    }

    pub fn set_search_engine(&mut self, engine: SearchEngine) -> Result<(), SettingsError> {
        self.update_stored(|stored| stored.search_engine = Some(engine.to_string()))
    }

    /// Stored settings with defaults applied; storage errors give defaults.
    pub fn settings(&self) -> Settings {
        match self.store.load() {
            Ok(stored) => Settings::resolve(&stored),
            Err(err) => {
                tracing::warn!(%err, "could not read settings, using defaults");
                Settings::default()
            }
        }
    }

    pub fn state(&self) -> ExtensionState {
        self.state
    }

    /// The palette derived from the last theme query.
    pub fn palette(&self) -> &ThemePalette {
        &self.palette
    }

    pub fn host(&self) -> &B {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut B {
        &mut self.host
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn update_stored(
        &mut self,
        edit: impl FnOnce(&mut StoredSettings),
    ) -> Result<(), SettingsError> {
        let mut stored = self.store.load()?;
        edit(&mut stored);
        self.store.save(&stored)
    }
}

/// The desktop's default browser, reached through `webbrowser`.
///
/// The system browser exposes neither its theme nor its tab strip, so theme
/// queries report the API as unavailable (unless a theme was supplied) and
/// new tabs simply open in the browser's own default position.
pub struct DesktopBrowser {
    theme: Option<HostTheme>,
    pages: Option<mpsc::Sender<Message>>,
}

impl DesktopBrowser {
    pub fn new() -> Self {
        Self {
            theme: None,
            pages: None,
        }
    }

    pub fn with_theme(mut self, theme: HostTheme) -> Self {
        self.theme = Some(theme);
        self
    }

    /// Forward broadcasts to `pages`.
    pub fn with_pages(mut self, pages: mpsc::Sender<Message>) -> Self {
        self.pages = Some(pages);
        self
    }
}

impl Default for DesktopBrowser {
    fn default() -> Self {
        Self::new()
    }
}

impl BrowserHost for DesktopBrowser {
    fn current_theme(&mut self) -> Result<Option<HostTheme>, HostError> {
        self.theme
            .clone()
            .map(Some)
            .ok_or(HostError::Unavailable("a theme API"))
    }

    fn active_tab_index(&mut self) -> Result<usize, HostError> {
        Ok(0)
    }

    fn create_tab(
        &mut self,
        url: &str,
        _index: Option<usize>,
        _active: bool,
    ) -> Result<(), HostError> {
        webbrowser::open(url).map_err(|err| HostError::Failed(err.to_string()))
    }

    fn search(&mut self, query: &str, engine: SearchEngine) -> Result<(), HostError> {
        webbrowser::open(&engine.url_for(query)).map_err(|err| HostError::Failed(err.to_string()))
    }

    fn set_icon(&mut self, enabled: bool) -> Result<(), HostError> {
        tracing::debug!(enabled, "desktop host has no toolbar icon");
        Ok(())
    }

    fn broadcast(&mut self, message: Message) {
        match &self.pages {
            Some(pages) => {
                if pages.send(message).is_err() {
                    tracing::debug!("no page is listening for broadcasts");
                }
            }
            None => tracing::debug!(message = ?message, "broadcast with no pages attached"),
        }
    }
}

/// A tab opened through [`MemoryHost`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenedTab {
    pub url: String,
    pub index: Option<usize>,
    pub active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ThemeApi {
    Theme,
    Missing,
    Failing,
}

/// Scriptable host that records every call.
#[derive(Debug, Clone)]
pub struct MemoryHost {
    theme: Option<HostTheme>,
    theme_api: ThemeApi,
    active_tab: Option<usize>,
    search_works: bool,
    pub tabs: Vec<OpenedTab>,
    pub searches: Vec<(String, SearchEngine)>,
    pub icon_enabled: Option<bool>,
    pub broadcasts: Vec<Message>,
}

impl Default for MemoryHost {
    fn default() -> Self {
        Self {
            theme: None,
            theme_api: ThemeApi::Theme,
            active_tab: Some(0),
            search_works: true,
            tabs: Vec::new(),
            searches: Vec::new(),
            icon_enabled: None,
            broadcasts: Vec::new(),
        }
    }
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_theme(mut self, theme: HostTheme) -> Self {
        self.theme = Some(theme);
        self
    }

    pub fn without_theme_api(mut self) -> Self {
        self.theme_api = ThemeApi::Missing;
        self
    }

    pub fn failing_theme(mut self) -> Self {
        self.theme_api = ThemeApi::Failing;
        self
    }

    pub fn with_active_tab(mut self, index: Option<usize>) -> Self {
        self.active_tab = index;
        self
    }

    pub fn failing_search(mut self) -> Self {
        self.search_works = false;
        self
    }
}

impl BrowserHost for MemoryHost {
    fn current_theme(&mut self) -> Result<Option<HostTheme>, HostError> {
        match self.theme_api {
            ThemeApi::Theme => Ok(self.theme.clone()),
            ThemeApi::Missing => Err(HostError::Unavailable("a theme API")),
            ThemeApi::Failing => Err(HostError::Failed("theme query rejected".into())),
        }
    }

    fn active_tab_index(&mut self) -> Result<usize, HostError> {
        self.active_tab
            .ok_or_else(|| HostError::Failed("no active tab".into()))
    }

    fn create_tab(
        &mut self,
        url: &str,
        index: Option<usize>,
        active: bool,
    ) -> Result<(), HostError> {
        self.tabs.push(OpenedTab {
            url: url.to_string(),
            index,
            active,
        });
        Ok(())
    }

    fn search(&mut self, query: &str, engine: SearchEngine) -> Result<(), HostError> {
        if !self.search_works {
            return Err(HostError::Unavailable("a search API"));
        }
        self.searches.push((query.to_string(), engine));
        Ok(())
    }

    fn set_icon(&mut self, enabled: bool) -> Result<(), HostError> {
        self.icon_enabled = Some(enabled);
        Ok(())
    }

    fn broadcast(&mut self, message: Message) {
        self.broadcasts.push(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::MemoryStore;

    fn coordinator(host: MemoryHost) -> BackgroundCoordinator<MemoryStore, MemoryHost> {
        BackgroundCoordinator::new(MemoryStore::default(), host)
    }

    #[test]
    fn start_writes_default_items_once() {
        let mut bg = coordinator(MemoryHost::new());
        bg.start();
        assert_eq!(
            bg.store().stored().enabled_items,
            Some(default_enabled_items())
        );
        assert_eq!(bg.host().icon_enabled, Some(true));

        let stored = StoredSettings {
            enabled_items: Some(vec!["search".into()]),
            enabled: Some(false),
            search_engine: None,
        };
        let mut bg = BackgroundCoordinator::new(MemoryStore::new(stored.clone()), MemoryHost::new());
        bg.start();
        assert_eq!(bg.store().stored(), &stored);
        assert!(!bg.state().enabled);
    }

    #[test]
    fn settings_errors_come_back_with_defaults() {
        let bg = BackgroundCoordinator::new(MemoryStore::broken(), MemoryHost::new());
        let response = bg.get_settings();
        assert_eq!(response.enabled_items, default_enabled_items());
        assert!(response.error.is_some());
    }

    #[test]
    fn theme_failures_fall_back_to_default_palette() {
        for host in [
            MemoryHost::new().without_theme_api(),
            MemoryHost::new().failing_theme(),
            MemoryHost::new(),
        ] {
            let mut bg = coordinator(host);
            assert_eq!(bg.get_theme_colors(), ThemePalette::default());
        }
    }

    #[test]
    fn background_tab_opens_after_active_tab() {
        let mut bg = coordinator(MemoryHost::new().with_active_tab(Some(3)));
        bg.open_in_background_tab("https://example.com/");
        assert_eq!(
            bg.host().tabs,
            vec![OpenedTab {
                url: "https://example.com/".into(),
                index: Some(4),
                active: false,
            }]
        );

        let mut bg = coordinator(MemoryHost::new().with_active_tab(None));
        bg.open_in_background_tab("https://example.com/");
        assert!(bg.host().tabs.is_empty());
    }

    #[test]
    fn failed_search_opens_fallback_tab() {
        let mut bg = coordinator(MemoryHost::new().failing_search());
        bg.perform_search("rust lang");
        assert_eq!(
            bg.host().tabs[0].url,
            "https://www.google.com/search?q=rust%20lang"
        );
        assert!(bg.host().tabs[0].active);
    }

    #[test]
    fn empty_item_selection_is_rejected() {
        let mut bg = coordinator(MemoryHost::new());
        assert!(matches!(
            bg.set_enabled_items(&[]),
            Err(SettingsError::NoItemsSelected)
        ));
        bg.set_enabled_items(&[MenuItem::Translate]).unwrap();
        assert_eq!(bg.get_settings().enabled_items, vec!["translate"]);
    }
}
