use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A button the floating panel can offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PanelAction {
    Copy,
    Search,
    Translate,
    Cut,
    Paste,
    Delete,
    SelectAll,
}

impl PanelAction {
    /// Actions that change the content of the target field.
    pub fn is_edit(&self) -> bool {
        matches!(self, PanelAction::Cut | PanelAction::Paste | PanelAction::Delete)
    }

    /// The persisted menu item that gates this action, if any.
    pub fn menu_item(&self) -> Option<MenuItem> {
        match self {
            PanelAction::Copy => Some(MenuItem::Copy),
            PanelAction::Search => Some(MenuItem::Search),
            PanelAction::Translate => Some(MenuItem::Translate),
            _ => None,
        }
    }
}

impl fmt::Display for PanelAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PanelAction::Copy => "Copy",
            PanelAction::Search => "Search",
            PanelAction::Translate => "Translate",
            PanelAction::Cut => "Cut",
            PanelAction::Paste => "Paste",
            PanelAction::Delete => "Delete",
            PanelAction::SelectAll => "Select all",
        };
        write!(f, "{}", s)
    }
}

/// A selection-menu entry the user can switch on or off in the options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MenuItem {
    Copy,
    Search,
    Translate,
}

impl MenuItem {
    pub const ALL: [MenuItem; 3] = [MenuItem::Copy, MenuItem::Search, MenuItem::Translate];

    pub fn as_str(&self) -> &'static str {
        match self {
            MenuItem::Copy => "copy",
            MenuItem::Search => "search",
            MenuItem::Translate => "translate",
        }
    }
}

impl fmt::Display for MenuItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown menu item `{0}` (expected copy, search or translate)")]
pub struct UnknownMenuItem(pub String);

impl FromStr for MenuItem {
    type Err = UnknownMenuItem;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "copy" => Ok(MenuItem::Copy),
            "search" => Ok(MenuItem::Search),
            "translate" => Ok(MenuItem::Translate),
            other => Err(UnknownMenuItem(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn menu_items_parse_case_insensitively() {
        assert_eq!("Copy".parse::<MenuItem>(), Ok(MenuItem::Copy));
        assert_eq!(" search ".parse::<MenuItem>(), Ok(MenuItem::Search));
        assert!("context_menu".parse::<MenuItem>().is_err());
    }

    #[test]
    fn only_selection_actions_are_gated_by_menu_items() {
        assert_eq!(PanelAction::Translate.menu_item(), Some(MenuItem::Translate));
        assert_eq!(PanelAction::Paste.menu_item(), None);
        assert!(PanelAction::Cut.is_edit());
        assert!(!PanelAction::SelectAll.is_edit());
    }
}
