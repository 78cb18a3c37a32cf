//! What the floating panel shows and where.

use serde::{Deserialize, Serialize};

use crate::actions::{MenuItem, PanelAction};
use crate::geometry::{Point, Rect, Size};
use crate::page::ElementId;
use crate::theme::ThemePalette;

/// Which panel, if any, is on screen.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PanelMode {
    #[default]
    #[serde(rename = "none")]
    Hidden,
    /// Selection in static page text.
    #[serde(rename = "selection")]
    Selection,
    /// Focused field without a selection.
    #[serde(rename = "input")]
    PasteOnly,
    /// Selection inside a field.
    #[serde(rename = "input-selection")]
    FullEditing,
}

impl PanelMode {
    pub fn is_input(&self) -> bool {
        matches!(self, PanelMode::PasteOnly | PanelMode::FullEditing)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PanelMode::Hidden => "none",
            PanelMode::Selection => "selection",
            PanelMode::PasteOnly => "input",
            PanelMode::FullEditing => "input-selection",
        }
    }
}

/// Where the panel wants to sit before it is clamped to the viewport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Anchor {
    /// Collapsed range at the selection's focus end.
    Caret(Rect),
    /// Last pointer position.
    Pointer(Point),
    /// The bounding box of a field, read fresh when the panel is placed.
    Field(ElementId),
}

/// Facts about the target field that change its button set.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FieldFacts {
    pub has_text: bool,
    /// The panel's own select-all just selected the whole value.
    pub selected_all: bool,
}

/// The buttons a panel in `mode` offers, in display order.
pub fn button_set(
    mode: PanelMode,
    facts: FieldFacts,
    selection_actions: &[PanelAction],
) -> Vec<PanelAction> {
    match mode {
        PanelMode::Hidden => Vec::new(),
        PanelMode::Selection => selection_actions.to_vec(),
        PanelMode::PasteOnly => {
            let mut buttons = vec![PanelAction::Paste];
            if facts.has_text {
                buttons.push(PanelAction::SelectAll);
            }
            buttons
        }
        PanelMode::FullEditing => {
            let mut buttons = vec![
                PanelAction::Copy,
                PanelAction::Cut,
                PanelAction::Paste,
                PanelAction::Delete,
            ];
            if facts.has_text && !facts.selected_all {
                buttons.push(PanelAction::SelectAll);
            }
            buttons
        }
    }
}

/// `configured` minus actions whose menu item the user switched off. An
/// empty result falls back to the whole configured list.
pub fn filter_selection_actions(
    configured: &[PanelAction],
    enabled_items: &[MenuItem],
) -> Vec<PanelAction> {
    let filtered: Vec<PanelAction> = configured
        .iter()
        .copied()
        .filter(|action| {
            action
                .menu_item()
                .is_none_or(|item| enabled_items.contains(&item))
        })
        .collect();
    if filtered.is_empty() {
        configured.to_vec()
    } else {
        filtered
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct PanelState {
    pub mode: PanelMode,
    pub anchor: Option<Anchor>,
    /// The field the input panels act on.
    pub target: Option<ElementId>,
    pub buttons: Vec<PanelAction>,
    /// Bumped on every show so late completions can tell whether the panel
    /// they belong to is still the one on screen.
    pub generation: u64,
}

impl PanelState {
    pub fn visible(&self) -> bool {
        self.mode != PanelMode::Hidden
    }
}

/// A placed panel, ready to draw.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelView {
    pub mode: PanelMode,
    pub buttons: Vec<PanelAction>,
    pub position: Point,
    pub size: Size,
    pub palette: ThemePalette,
}

impl PanelView {
    pub fn rect(&self) -> Rect {
        Rect::new(
            self.position.x,
            self.position.y,
            self.size.width,
            self.size.height,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEFAULT_SELECTION: [PanelAction; 2] = [PanelAction::Copy, PanelAction::Search];

    #[test]
    fn input_panels_follow_field_facts() {
        let empty = FieldFacts::default();
        let filled = FieldFacts {
            has_text: true,
            selected_all: false,
        };
        assert_eq!(
            button_set(PanelMode::PasteOnly, empty, &DEFAULT_SELECTION),
            vec![PanelAction::Paste]
        );
        assert_eq!(
            button_set(PanelMode::PasteOnly, filled, &DEFAULT_SELECTION),
            vec![PanelAction::Paste, PanelAction::SelectAll]
        );
        assert_eq!(
            button_set(PanelMode::FullEditing, filled, &DEFAULT_SELECTION).len(),
            5
        );
        let after_select_all = FieldFacts {
            has_text: true,
            selected_all: true,
        };
        assert!(
            !button_set(PanelMode::FullEditing, after_select_all, &DEFAULT_SELECTION)
                .contains(&PanelAction::SelectAll)
        );
        assert!(button_set(PanelMode::Hidden, filled, &DEFAULT_SELECTION).is_empty());
    }

    #[test]
    fn disabled_items_are_filtered_with_fallback() {
        let configured = [
            PanelAction::Copy,
            PanelAction::Search,
            PanelAction::Translate,
        ];
        assert_eq!(
            filter_selection_actions(&configured, &[MenuItem::Search]),
            vec![PanelAction::Search]
        );
        assert_eq!(filter_selection_actions(&configured, &[]), configured.to_vec());
        // actions without a menu item are never filtered
        assert_eq!(
            filter_selection_actions(&[PanelAction::Copy, PanelAction::Paste], &[MenuItem::Search]),
            vec![PanelAction::Paste]
        );
    }

    #[test]
    fn modes_use_wire_names() {
        assert_eq!(
            serde_json::to_string(&PanelMode::FullEditing).unwrap(),
            "\"input-selection\""
        );
        assert_eq!(PanelMode::Hidden.as_str(), "none");
        assert!(PanelMode::PasteOnly.is_input());
        assert!(!PanelMode::Selection.is_input());
    }
}
