//! Shared crate-wide constants.

use std::time::Duration;

/// Quiet period after the last `selectionchange` before the selection is
/// inspected. Coalesces the burst of events fired during a drag-selection.
pub const SELECTION_SETTLE: Duration = Duration::from_millis(200);

/// Delay between a click/focus on an editable field and showing the input
/// panel, so the interaction that caused the focus does not also dismiss it.
pub const CLICK_SETTLE: Duration = Duration::from_millis(100);

/// How long selection changes are ignored after a synthetic select-all.
pub const SELECT_ALL_GUARD: Duration = Duration::from_millis(500);

/// Input panels stay suppressed for this long after the last keystroke.
pub const TYPING_QUIET: Duration = Duration::from_millis(2000);

/// A focus event only counts as user initiated when a pointer-down or
/// key-down happened within this window.
pub const FOCUS_INTENT: Duration = Duration::from_millis(1000);

/// A single click on a navigation link waits this long for a second click.
pub const LINK_SINGLE_CLICK: Duration = Duration::from_millis(300);

/// How long a double-click on a link keeps swallowing follow-up clicks.
pub const LINK_DOUBLE_CLICK_RESET: Duration = Duration::from_millis(400);

/// Minimum distance (CSS pixels) kept between the panel and the viewport edge.
pub const PANEL_MARGIN: f64 = 10.0;

/// Vertical gap between a selection caret (or field box) and the panel.
pub const CARET_GAP: f64 = 5.0;

/// Vertical gap between a pointer position and the panel.
pub const POINTER_GAP: f64 = 20.0;

/// Fallback search URL used when the configured provider cannot be invoked.
pub const FALLBACK_SEARCH_URL: &str = "https://www.google.com/search?q=";

/// Translation service opened by the optional translate action.
pub const TRANSLATE_URL: &str = "https://translate.google.com/?text=";

/// Instruction shown when the clipboard cannot be read for a paste.
pub const PASTE_INSTRUCTION: &str = "To paste, please use Ctrl+V keyboard shortcut";
