//! The host page as seen by the panel controller.
//!
//! The controller never owns DOM nodes. It holds [`ElementId`] handles and
//! asks the [`Page`] for a fresh [`ElementInfo`] every time it needs one; a
//! `None` answer means the node has been detached and the handle is stale.

pub mod memory;

pub use memory::{MemoryPage, TextMetrics};

use thiserror::Error;

use crate::actions::PanelAction;
use crate::geometry::{Rect, Size, Viewport};

/// Opaque handle to a node on the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub u32);

/// The `type` attribute of an `<input>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputType(String);

/// Input types that never hold free text.
const NON_TEXT_INPUT_TYPES: &[&str] = &[
    "button", "checkbox", "radio", "file", "submit", "reset", "image", "hidden", "range", "color",
];

impl InputType {
    pub fn new(kind: impl Into<String>) -> Self {
        Self(kind.into().trim().to_ascii_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// An empty or unknown type behaves like `text`, as browsers do.
    pub fn is_free_text(&self) -> bool {
        !NON_TEXT_INPUT_TYPES.contains(&self.0.as_str())
    }
}

impl Default for InputType {
    fn default() -> Self {
        Self::new("text")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementKind {
    Input(InputType),
    TextArea,
    ContentEditable,
    /// Anything else: paragraphs, links, buttons, containers.
    Static,
}

/// A point-in-time view of one element.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementInfo {
    pub kind: ElementKind,
    /// Explicit ARIA role, lowercased.
    pub role: Option<String>,
    /// Nested inside a button, link or `role="button"` ancestor.
    pub inside_interactive: bool,
    pub rect: Rect,
    pub has_text: bool,
    /// A non-collapsed selection exists inside the element.
    pub has_selection: bool,
    pub focused: bool,
}

impl ElementInfo {
    /// Whether the panel treats this element as an editable text field.
    pub fn is_editable_field(&self) -> bool {
        if self.role.as_deref() == Some("textbox") {
            return true;
        }
        match &self.kind {
            ElementKind::Input(kind) => kind.is_free_text(),
            ElementKind::TextArea => true,
            ElementKind::ContentEditable => !self.inside_interactive,
            ElementKind::Static => false,
        }
    }
}

/// The document selection at the moment it was read.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SelectionSnapshot {
    /// Selected text, untrimmed.
    pub text: String,
    /// Collapsed range at the focus end of the selection (where the user's
    /// cursor rests), in viewport coordinates.
    pub focus: Option<Rect>,
}

impl SelectionSnapshot {
    pub fn trimmed(&self) -> &str {
        self.text.trim()
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PageError {
    #[error("element {0:?} is no longer attached to the document")]
    Detached(ElementId),
    #[error("element {0:?} is not an editable field")]
    NotEditable(ElementId),
    #[error("the page does not support `{0}`")]
    Unsupported(&'static str),
}

/// DOM access the panel controller needs from its host.
pub trait Page {
    /// Fresh information about `id`, or `None` once it is detached.
    fn element(&self, id: ElementId) -> Option<ElementInfo>;

    fn active_element(&self) -> Option<ElementId>;

    fn selection(&self) -> SelectionSnapshot;

    /// The selected part of a field's value, if any.
    fn field_selected_text(&self, id: ElementId) -> Option<String>;

    fn viewport(&self) -> Viewport;

    /// Render the panel with `buttons` off-screen and report its size.
    fn measure_panel(&self, buttons: &[PanelAction]) -> Size;

    fn focus(&mut self, id: ElementId) -> Result<(), PageError>;

    fn select_all(&mut self, id: ElementId) -> Result<(), PageError>;

    fn delete_selection(&mut self, id: ElementId) -> Result<(), PageError>;

    /// Replace the field's selection (or insert at its caret) with `text`.
    fn insert_text(&mut self, id: ElementId, text: &str) -> Result<(), PageError>;

    /// Fire a bubbling `input` event so page scripts see the change.
    fn dispatch_input(&mut self, id: ElementId);

    /// Copy through a detached off-screen text field and the legacy copy
    /// command, for when the async clipboard refuses the write.
    fn legacy_copy(&mut self, text: &str) -> Result<(), PageError>;

    /// The browser's own cut command on the field's selection.
    fn native_cut(&mut self, id: ElementId) -> Result<(), PageError>;

    /// Show a user-facing message.
    fn alert(&mut self, message: &str);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(kind: ElementKind) -> ElementInfo {
        ElementInfo {
            kind,
            role: None,
            inside_interactive: false,
            rect: Rect::default(),
            has_text: false,
            has_selection: false,
            focused: false,
        }
    }

    #[test]
    fn text_like_inputs_are_editable() {
        for kind in ["text", "search", "email", "password", "url", "", "TEL"] {
            let el = info(ElementKind::Input(InputType::new(kind)));
            assert!(el.is_editable_field(), "{kind} should be editable");
        }
        for kind in ["button", "checkbox", "radio", "file", "submit", "reset", "image"] {
            let el = info(ElementKind::Input(InputType::new(kind)));
            assert!(!el.is_editable_field(), "{kind} should not be editable");
        }
    }

    #[test]
    fn content_editable_inside_button_is_not_a_field() {
        let mut el = info(ElementKind::ContentEditable);
        assert!(el.is_editable_field());
        el.inside_interactive = true;
        assert!(!el.is_editable_field());
    }

    #[test]
    fn textbox_role_makes_any_element_editable() {
        let mut el = info(ElementKind::Static);
        assert!(!el.is_editable_field());
        el.role = Some("textbox".to_string());
        assert!(el.is_editable_field());
        assert!(info(ElementKind::TextArea).is_editable_field());
    }
}
