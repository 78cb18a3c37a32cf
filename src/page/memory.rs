//! Headless page model.
//!
//! `MemoryPage` keeps a flat list of nodes with their text, layout box and
//! selection, which is enough to drive the panel controller without a
//! browser. Text is laid out as a monospace grid: every character advances
//! `char_width`, every `\n` starts a new line `line_height` further down.

use crate::actions::PanelAction;
use crate::geometry::{Point, Rect, Size, Viewport};

use super::{ElementId, ElementInfo, ElementKind, InputType, Page, PageError, SelectionSnapshot};

/// Glyph and panel metrics used for caret rects and panel measurement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextMetrics {
    pub char_width: f64,
    pub line_height: f64,
    /// Horizontal padding added around each button label.
    pub button_padding: f64,
    pub panel_height: f64,
}

impl Default for TextMetrics {
    fn default() -> Self {
        Self {
            char_width: 8.0,
            line_height: 16.0,
            button_padding: 16.0,
            panel_height: 30.0,
        }
    }
}

impl TextMetrics {
    /// One unit per terminal cell.
    pub const fn cells() -> Self {
        Self {
            char_width: 1.0,
            line_height: 1.0,
            button_padding: 2.0,
            panel_height: 1.0,
        }
    }
}

#[derive(Debug, Clone)]
struct Node {
    kind: ElementKind,
    role: Option<String>,
    inside_interactive: bool,
    rect: Rect,
    text: String,
    /// Field selection as (anchor, focus) char offsets.
    field_sel: (usize, usize),
    attached: bool,
}

impl Node {
    fn is_value_field(&self) -> bool {
        matches!(self.kind, ElementKind::Input(_) | ElementKind::TextArea)
    }

    fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// A selection in static or content-editable text.
#[derive(Debug, Clone, Copy, PartialEq)]
struct DocSelection {
    node: ElementId,
    anchor: usize,
    focus: usize,
}

impl DocSelection {
    fn range(&self) -> (usize, usize) {
        (self.anchor.min(self.focus), self.anchor.max(self.focus))
    }
}

#[derive(Debug, Clone)]
pub struct MemoryPage {
    nodes: Vec<Node>,
    active: Option<ElementId>,
    doc_selection: Option<DocSelection>,
    viewport: Viewport,
    metrics: TextMetrics,
    native_clipboard: Option<String>,
    native_commands: bool,
    native_cut: bool,
    alerts: Vec<String>,
    input_events: Vec<ElementId>,
}

impl Default for MemoryPage {
    fn default() -> Self {
        Self::new(Viewport::default(), TextMetrics::default())
    }
}

impl MemoryPage {
    pub fn new(viewport: Viewport, metrics: TextMetrics) -> Self {
        Self {
            nodes: Vec::new(),
            active: None,
            doc_selection: None,
            viewport,
            metrics,
            native_clipboard: None,
            native_commands: true,
            native_cut: true,
            alerts: Vec::new(),
            input_events: Vec::new(),
        }
    }

    pub fn metrics(&self) -> TextMetrics {
        self.metrics
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    fn push(&mut self, kind: ElementKind, text: &str, rect: Rect) -> ElementId {
        let len = text.chars().count();
        self.nodes.push(Node {
            kind,
            role: None,
            inside_interactive: false,
            rect,
            text: text.to_string(),
            // fields that were never focused put their caret at the end
            field_sel: (len, len),
            attached: true,
        });
        ElementId((self.nodes.len() - 1) as u32)
    }

    pub fn add_paragraph(&mut self, text: &str, rect: Rect) -> ElementId {
        self.push(ElementKind::Static, text, rect)
    }

    pub fn add_input(&mut self, input_type: &str, value: &str, rect: Rect) -> ElementId {
        self.push(ElementKind::Input(InputType::new(input_type)), value, rect)
    }

    pub fn add_textarea(&mut self, value: &str, rect: Rect) -> ElementId {
        self.push(ElementKind::TextArea, value, rect)
    }

    pub fn add_content_editable(&mut self, text: &str, rect: Rect) -> ElementId {
        self.push(ElementKind::ContentEditable, text, rect)
    }

    pub fn set_role(&mut self, id: ElementId, role: &str) {
        if let Some(node) = self.node_mut(id) {
            node.role = Some(role.to_ascii_lowercase());
        }
    }

    pub fn set_inside_interactive(&mut self, id: ElementId, inside: bool) {
        if let Some(node) = self.node_mut(id) {
            node.inside_interactive = inside;
        }
    }

    /// Remove `id` from the document. Its handle stays stale forever.
    pub fn detach(&mut self, id: ElementId) {
        if let Some(node) = self.node_mut(id) {
            node.attached = false;
        }
        if self.active == Some(id) {
            self.active = None;
        }
        if self.doc_selection.is_some_and(|sel| sel.node == id) {
            self.doc_selection = None;
        }
    }

    /// Make the browser's legacy `execCommand` copy/cut paths fail.
    pub fn set_native_commands(&mut self, available: bool) {
        self.native_commands = available;
        self.native_cut = available;
    }

    /// Make only `execCommand('cut')` fail, leaving legacy copy working.
    pub fn set_native_cut(&mut self, available: bool) {
        self.native_cut = available;
    }

    pub fn text(&self, id: ElementId) -> Option<&str> {
        self.node(id).map(|n| n.text.as_str())
    }

    /// Character-offset selection of a field, as (start, end).
    pub fn field_selection(&self, id: ElementId) -> Option<(usize, usize)> {
        let node = self.node(id)?;
        if node.kind == ElementKind::ContentEditable {
            return self
                .doc_selection
                .filter(|sel| sel.node == id)
                .map(|sel| sel.range());
        }
        let (a, f) = node.field_sel;
        Some((a.min(f), a.max(f)))
    }

    /// Handles of every attached node, in document order.
    pub fn element_ids(&self) -> Vec<ElementId> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.attached)
            .map(|(idx, _)| ElementId(idx as u32))
            .collect()
    }

    /// The highlighted range inside `id` as (start, end). Value fields only
    /// show their selection while focused.
    pub fn selected_range(&self, id: ElementId) -> Option<(usize, usize)> {
        let node = self.node(id)?;
        if node.is_value_field() {
            let (a, f) = node.field_sel;
            return (self.active == Some(id)).then(|| (a.min(f), a.max(f)));
        }
        self.doc_selection
            .filter(|sel| sel.node == id)
            .map(|sel| sel.range())
    }

    pub fn native_clipboard(&self) -> Option<&str> {
        self.native_clipboard.as_deref()
    }

    pub fn alerts(&self) -> &[String] {
        &self.alerts
    }

    pub fn take_alerts(&mut self) -> Vec<String> {
        std::mem::take(&mut self.alerts)
    }

    pub fn input_events(&self) -> &[ElementId] {
        &self.input_events
    }

    /// Select a range in any node. Selecting inside a value field also
    /// focuses it; selecting elsewhere blurs the active field.
    pub fn select_range(&mut self, id: ElementId, anchor: usize, focus: usize) {
        let Some(node) = self.node_mut(id) else {
            return;
        };
        let len = node.char_len();
        let (anchor, focus) = (anchor.min(len), focus.min(len));
        if node.is_value_field() {
            node.field_sel = (anchor, focus);
            self.active = Some(id);
            self.doc_selection = None;
        } else {
            let editable = node.kind == ElementKind::ContentEditable;
            self.doc_selection = Some(DocSelection {
                node: id,
                anchor,
                focus,
            });
            self.active = editable.then_some(id);
        }
    }

    pub fn set_caret(&mut self, id: ElementId, offset: usize) {
        self.select_range(id, offset, offset);
    }

    pub fn clear_selection(&mut self) {
        self.doc_selection = None;
    }

    pub fn blur(&mut self) {
        self.active = None;
    }

    /// Simulate the user typing `text` at the caret of the active field.
    pub fn type_text(&mut self, text: &str) -> Option<ElementId> {
        let id = self.active?;
        self.replace_range(id, text).ok()?;
        Some(id)
    }

    /// Simulate Backspace in the active field.
    pub fn backspace(&mut self) -> Option<ElementId> {
        let id = self.active?;
        let (start, end) = self.field_selection(id)?;
        if start == end {
            if start == 0 {
                return Some(id);
            }
            self.select_range(id, start - 1, start);
        }
        self.replace_range(id, "").ok()?;
        Some(id)
    }

    /// Move the caret of the active field by `delta` characters.
    pub fn move_caret(&mut self, delta: isize) -> Option<ElementId> {
        let id = self.active?;
        let (start, end) = self.field_selection(id)?;
        let base = if delta < 0 { start } else { end };
        let next = base.saturating_add_signed(delta);
        self.set_caret(id, next);
        Some(id)
    }

    /// Shift every node by `dy`, as a scroll of the document would.
    pub fn scroll_by(&mut self, dy: f64) {
        for node in &mut self.nodes {
            node.rect.y -= dy;
        }
    }

    /// Topmost attached node under `point`.
    pub fn hit_test(&self, point: Point) -> Option<ElementId> {
        self.nodes
            .iter()
            .enumerate()
            .rev()
            .find(|(_, n)| n.attached && n.rect.contains(point))
            .map(|(idx, _)| ElementId(idx as u32))
    }

    /// Character offset in `id` closest to `point`.
    pub fn offset_at(&self, id: ElementId, point: Point) -> usize {
        let Some(node) = self.node(id) else {
            return 0;
        };
        let m = self.metrics;
        let line = ((point.y - node.rect.y) / m.line_height).floor().max(0.0) as usize;
        let col = ((point.x - node.rect.x) / m.char_width).round().max(0.0) as usize;
        let mut offset = 0;
        for (idx, text) in node.text.split('\n').enumerate() {
            let width = text.chars().count();
            if idx == line {
                return offset + col.min(width);
            }
            offset += width + 1;
        }
        node.char_len()
    }

    /// Collapsed-range rect at char `offset` of `id`.
    pub fn caret_rect(&self, id: ElementId, offset: usize) -> Option<Rect> {
        let node = self.node(id)?;
        let m = self.metrics;
        let before: String = node.text.chars().take(offset).collect();
        let line = before.matches('\n').count();
        let col = before.rsplit('\n').next().map_or(0, |l| l.chars().count());
        Some(Rect::caret(
            node.rect.x + col as f64 * m.char_width,
            node.rect.y + line as f64 * m.line_height,
            m.line_height,
        ))
    }

    fn node(&self, id: ElementId) -> Option<&Node> {
        self.nodes.get(id.0 as usize).filter(|n| n.attached)
    }

    fn node_mut(&mut self, id: ElementId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0 as usize).filter(|n| n.attached)
    }

    fn editable_node(&self, id: ElementId) -> Result<&Node, PageError> {
        let info = self.element(id).ok_or(PageError::Detached(id))?;
        if !info.is_editable_field() {
            return Err(PageError::NotEditable(id));
        }
        self.node(id).ok_or(PageError::Detached(id))
    }

    fn replace_range(&mut self, id: ElementId, text: &str) -> Result<(), PageError> {
        self.editable_node(id)?;
        let (start, end) = self.field_selection(id).unwrap_or_default();
        let node = self.node_mut(id).ok_or(PageError::Detached(id))?;
        let from = byte_index(&node.text, start);
        let to = byte_index(&node.text, end);
        node.text.replace_range(from..to, text);
        let caret = start + text.chars().count();
        self.set_caret(id, caret);
        Ok(())
    }

    fn selected_text_of(&self, id: ElementId) -> Option<String> {
        let node = self.node(id)?;
        let (start, end) = self.field_selection(id)?;
        (start < end).then(|| node.text.chars().skip(start).take(end - start).collect())
    }
}

fn byte_index(text: &str, char_idx: usize) -> usize {
    text.char_indices()
        .nth(char_idx)
        .map_or(text.len(), |(byte, _)| byte)
}

impl Page for MemoryPage {
    fn element(&self, id: ElementId) -> Option<ElementInfo> {
        let node = self.node(id)?;
        let has_selection = self
            .field_selection(id)
            .is_some_and(|(start, end)| start < end);
        Some(ElementInfo {
            kind: node.kind.clone(),
            role: node.role.clone(),
            inside_interactive: node.inside_interactive,
            rect: node.rect,
            has_text: if node.is_value_field() {
                !node.text.is_empty()
            } else {
                !node.text.trim().is_empty()
            },
            has_selection,
            focused: self.active == Some(id),
        })
    }

    fn active_element(&self) -> Option<ElementId> {
        self.active.filter(|id| self.node(*id).is_some())
    }

    fn selection(&self) -> SelectionSnapshot {
        if let Some(id) = self.active_element()
            && let Some(node) = self.node(id)
            && node.is_value_field()
        {
            let text = self.selected_text_of(id).unwrap_or_default();
            return SelectionSnapshot {
                text,
                focus: self.caret_rect(id, node.field_sel.1),
            };
        }
        match self.doc_selection {
            Some(sel) if self.node(sel.node).is_some() => {
                let (start, end) = sel.range();
                let text = self
                    .node(sel.node)
                    .map(|n| n.text.chars().skip(start).take(end - start).collect())
                    .unwrap_or_default();
                SelectionSnapshot {
                    text,
                    focus: self.caret_rect(sel.node, sel.focus),
                }
            }
            _ => SelectionSnapshot::default(),
        }
    }

    fn field_selected_text(&self, id: ElementId) -> Option<String> {
        self.selected_text_of(id)
    }

    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn measure_panel(&self, buttons: &[PanelAction]) -> Size {
        let m = self.metrics;
        let width = buttons
            .iter()
            .map(|b| b.to_string().chars().count() as f64 * m.char_width + m.button_padding)
            .sum();
        Size::new(width, m.panel_height)
    }

    fn focus(&mut self, id: ElementId) -> Result<(), PageError> {
        let node = self.editable_node(id)?;
        if node.kind == ElementKind::ContentEditable && self.field_selection(id).is_none() {
            let len = node.char_len();
            self.set_caret(id, len);
        }
        self.active = Some(id);
        Ok(())
    }

    fn select_all(&mut self, id: ElementId) -> Result<(), PageError> {
        let len = self.editable_node(id)?.char_len();
        self.select_range(id, 0, len);
        Ok(())
    }

    fn delete_selection(&mut self, id: ElementId) -> Result<(), PageError> {
        self.replace_range(id, "")
    }

    fn insert_text(&mut self, id: ElementId, text: &str) -> Result<(), PageError> {
        self.replace_range(id, text)
    }

    fn dispatch_input(&mut self, id: ElementId) {
        self.input_events.push(id);
    }

    fn legacy_copy(&mut self, text: &str) -> Result<(), PageError> {
        if !self.native_commands {
            return Err(PageError::Unsupported("execCommand('copy')"));
        }
        self.native_clipboard = Some(text.to_string());
        Ok(())
    }

    fn native_cut(&mut self, id: ElementId) -> Result<(), PageError> {
        if !self.native_cut {
            return Err(PageError::Unsupported("execCommand('cut')"));
        }
        let text = self.selected_text_of(id).unwrap_or_default();
        self.replace_range(id, "")?;
        self.native_clipboard = Some(text);
        Ok(())
    }

    fn alert(&mut self, message: &str) {
        self.alerts.push(message.to_string());
    }
}
