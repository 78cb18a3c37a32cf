//! Per-page panel controller.
//!
//! The controller owns the page handle, the clipboard and the outgoing
//! message sink. It turns host events into machine stimuli (reading the page
//! where the machine needs facts), carries out the commands the machine
//! returns, and runs queued panel actions on [`PanelController::tick`].

use std::collections::VecDeque;
use std::time::Instant;

use crate::actions::PanelAction;
use crate::clipboard::Clipboard;
use crate::constants::{PASTE_INSTRUCTION, TRANSLATE_URL};
use crate::geometry::{Point, Size};
use crate::machine::{
    ActionOutcome, ClickObservation, Command, FieldObservation, PanelMachine, PendingAction,
    SelectionObservation, Stimulus, Transition,
};
use crate::page::{ElementId, ElementInfo, Page, PageError};
use crate::panel::{Anchor, PanelMode, PanelState, PanelView};
use crate::placement::{AnchorPoint, PlacementConfig, place};
use crate::protocol::{Message, MessageSink, Response};
use crate::theme::ThemePalette;
use crate::timers::{PanelTimer, TimerTable};

#[derive(Debug, Clone, PartialEq)]
pub struct ControllerConfig {
    /// Buttons of the selection panel, before menu preferences apply.
    pub selection_actions: Vec<PanelAction>,
    pub placement: PlacementConfig,
    /// Whether the extension starts switched on.
    pub enabled: bool,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            selection_actions: vec![PanelAction::Copy, PanelAction::Search],
            placement: PlacementConfig::default(),
            enabled: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Escape,
    Other,
}

/// DOM events the host forwards to the controller.
#[derive(Debug, Clone, PartialEq)]
pub enum PageEvent {
    SelectionChange,
    PointerDown {
        point: Point,
    },
    Click {
        point: Point,
        target: Option<ElementId>,
    },
    DoubleClick {
        point: Point,
        target: Option<ElementId>,
    },
    KeyDown {
        key: Key,
    },
    FocusIn {
        target: ElementId,
    },
    FocusOut {
        target: ElementId,
        /// Element receiving focus, if any.
        related: Option<ElementId>,
        /// Focus moved into the panel itself.
        into_panel: bool,
    },
    /// The value of a field changed through the user's typing.
    Input {
        target: ElementId,
    },
    Scroll,
    /// A panel button was activated.
    PanelButton(PanelAction),
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct PanelLayout {
    position: Point,
    size: Size,
}

pub struct PanelController<P, C, M> {
    page: P,
    clipboard: C,
    sink: M,
    machine: PanelMachine,
    timers: TimerTable<PanelTimer>,
    queue: VecDeque<PendingAction>,
    placement: PlacementConfig,
    palette: ThemePalette,
    layout: Option<PanelLayout>,
}

impl<P: Page, C: Clipboard, M: MessageSink> PanelController<P, C, M> {
    pub fn new(page: P, clipboard: C, sink: M, config: ControllerConfig) -> Self {
        let mut machine = PanelMachine::new(config.selection_actions);
        if !config.enabled {
            machine = machine.step(Stimulus::SetEnabled(false)).next;
        }
        Self {
            page,
            clipboard,
            sink,
            machine,
            timers: TimerTable::new(),
            queue: VecDeque::new(),
            placement: config.placement,
            palette: ThemePalette::default(),
            layout: None,
        }
    }

    /// Ask the background for the menu preferences and the theme.
    pub fn start(&mut self) {
        self.sink.send(Message::GetSettings);
        self.sink.send(Message::GetThemeColors);
    }

    pub fn handle_event(&mut self, event: PageEvent, now: Instant) {
        if self.machine.disposed() {
            return;
        }
        let stimulus = match event {
            PageEvent::SelectionChange => Some(Stimulus::SelectionChanged),
            PageEvent::PointerDown { .. } => Some(Stimulus::PointerDown),
            PageEvent::Click { point, target } => Some(Stimulus::Click {
                field: target.filter(|id| self.editable(*id).is_some()),
                point,
                in_panel: self.panel_contains(point),
            }),
            PageEvent::DoubleClick { target, .. } => Some(Stimulus::DoubleClick {
                field: target.and_then(|id| self.observe_field(id)),
            }),
            PageEvent::KeyDown { key } => Some(Stimulus::KeyDown {
                escape: key == Key::Escape,
            }),
            PageEvent::FocusIn { target } => self
                .editable(target)
                .map(|_| Stimulus::FocusIn { field: target }),
            PageEvent::FocusOut {
                target,
                related,
                into_panel,
            } => Some(Stimulus::FocusOut {
                field: target,
                related,
                into_panel,
            }),
            PageEvent::Input { target } => self
                .editable(target)
                .map(|_| Stimulus::Typing { field: target }),
            PageEvent::Scroll => Some(Stimulus::Scroll),
            PageEvent::PanelButton(action) => Some(Stimulus::ButtonActivated {
                action,
                text: self.captured_text(),
            }),
        };
        if let Some(stimulus) = stimulus {
            self.apply(stimulus, now);
        }
    }

    /// Messages pushed by the background.
    pub fn handle_message(&mut self, message: Message, now: Instant) {
        if self.machine.disposed() {
            return;
        }
        match message {
            Message::ThemeColors { colors } => {
                self.palette = colors;
                if !self.machine.enabled() {
                    self.apply(Stimulus::SetEnabled(true), now);
                }
            }
            Message::ExtensionDisabled => self.apply(Stimulus::SetEnabled(false), now),
            other => tracing::debug!(message = ?other, "ignoring message meant for the background"),
        }
    }

    /// Replies to the requests sent by [`PanelController::start`].
    pub fn handle_response(&mut self, response: Response, now: Instant) {
        if self.machine.disposed() {
            return;
        }
        match response {
            Response::Settings(settings) => {
                if let Some(error) = &settings.error {
                    tracing::warn!(%error, "background could not read settings");
                }
                self.apply(Stimulus::SettingsLoaded(settings.menu_items()), now);
            }
            Response::Theme(theme) => self.palette = theme.colors,
        }
    }

    /// Fire due timers, then run queued actions.
    pub fn tick(&mut self, now: Instant) {
        if self.machine.disposed() {
            return;
        }
        while let Some(timer) = self.timers.pop_due(now) {
            let stimulus = match timer {
                PanelTimer::SelectionSettle => {
                    Stimulus::SelectionSettled(self.observe_selection())
                }
                PanelTimer::ClickSettle => Stimulus::ClickSettled(self.observe_click()),
                other => Stimulus::TimerFired(other),
            };
            self.apply(stimulus, now);
        }
        while let Some(pending) = self.queue.pop_front() {
            let outcome = self.run_action(&pending);
            self.apply(
                Stimulus::ActionFinished {
                    action: pending.action,
                    generation: pending.generation,
                    outcome,
                },
                now,
            );
        }
    }

    /// When the next timer is due. Queued actions run on any tick.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.next_deadline()
    }

    pub fn has_queued_actions(&self) -> bool {
        !self.queue.is_empty()
    }

    /// Cancel every timer, drop queued actions and hide. Later events are
    /// ignored.
    pub fn dispose(&mut self) {
        self.queue.clear();
        self.apply(Stimulus::Dispose, Instant::now());
        self.layout = None;
    }

    pub fn view(&self) -> Option<PanelView> {
        let layout = self.layout?;
        let panel = self.machine.panel();
        if !panel.visible() {
            return None;
        }
        Some(PanelView {
            mode: panel.mode,
            buttons: panel.buttons.clone(),
            position: layout.position,
            size: layout.size,
            palette: self.palette.clone(),
        })
    }

    /// The button drawn under `point`.
    pub fn button_at(&self, point: Point) -> Option<PanelAction> {
        let view = self.view()?;
        if !view.rect().contains(point) {
            return None;
        }
        let mut left = view.position.x;
        for button in view.buttons {
            let width = self.page.measure_panel(&[button]).width;
            if point.x < left + width {
                return Some(button);
            }
            left += width;
        }
        None
    }

    pub fn mode(&self) -> PanelMode {
        self.machine.mode()
    }

    pub fn panel(&self) -> &PanelState {
        self.machine.panel()
    }

    pub fn enabled(&self) -> bool {
        self.machine.enabled()
    }

    pub fn palette(&self) -> &ThemePalette {
        &self.palette
    }

    pub fn page(&self) -> &P {
        &self.page
    }

    pub fn page_mut(&mut self) -> &mut P {
        &mut self.page
    }

    pub fn clipboard(&self) -> &C {
        &self.clipboard
    }

    pub fn clipboard_mut(&mut self) -> &mut C {
        &mut self.clipboard
    }

    pub fn sink(&self) -> &M {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut M {
        &mut self.sink
    }

    fn apply(&mut self, stimulus: Stimulus, now: Instant) {
        let Transition { next, commands } = self.machine.step(stimulus);
        self.machine = next;
        for command in commands {
            self.run_command(command, now);
        }
    }

    fn run_command(&mut self, command: Command, now: Instant) {
        match command {
            Command::StartTimer(timer) => self.timers.start(timer, now, timer.delay()),
            Command::CancelTimer(timer) => {
                self.timers.cancel(timer);
            }
            Command::CancelAllTimers => self.timers.cancel_all(),
            Command::Show => self.layout_panel(now),
            Command::Hide => self.layout = None,
            Command::SelectAll(id) => {
                if let Err(err) = self.page.select_all(id) {
                    tracing::debug!(%err, "select all on a stale field");
                    self.apply(Stimulus::TargetLost, now);
                }
            }
            Command::Execute(pending) => {
                tracing::debug!(action = ?pending.action, "queued panel action");
                self.queue.push_back(pending);
            }
        }
    }

    /// Second pass of a show: resolve the anchor, measure, clamp.
    fn layout_panel(&mut self, now: Instant) {
        let panel = self.machine.panel().clone();
        if !panel.visible() {
            self.layout = None;
            return;
        }
        let target_ok = panel.target.is_none_or(|id| self.editable(id).is_some());
        let anchor = match panel.anchor {
            Some(Anchor::Caret(rect)) => Some(AnchorPoint::Caret(rect)),
            Some(Anchor::Pointer(point)) => Some(AnchorPoint::Pointer(point)),
            Some(Anchor::Field(id)) => self.editable(id).map(|info| AnchorPoint::Field(info.rect)),
            None => None,
        };
        let (true, Some(anchor)) = (target_ok, anchor) else {
            tracing::debug!(field = ?panel.target, "panel target went stale before placement");
            self.layout = None;
            self.apply(Stimulus::TargetLost, now);
            return;
        };
        let size = self.page.measure_panel(&panel.buttons);
        let position = place(anchor, size, self.page.viewport(), &self.placement);
        self.layout = Some(PanelLayout { position, size });
    }

    fn panel_contains(&self, point: Point) -> bool {
        self.view().is_some_and(|view| view.rect().contains(point))
    }

    /// Fresh element info, only while `id` is attached and still editable.
    fn editable(&self, id: ElementId) -> Option<ElementInfo> {
        self.page.element(id).filter(ElementInfo::is_editable_field)
    }

    fn observe_field(&self, id: ElementId) -> Option<FieldObservation> {
        self.editable(id).map(|info| FieldObservation {
            id,
            has_text: info.has_text,
            has_selection: info.has_selection,
        })
    }

    fn observe_selection(&self) -> SelectionObservation {
        let selection = self.page.selection();
        SelectionObservation {
            text: selection.trimmed().to_string(),
            focus: selection.focus,
            field: self
                .page
                .active_element()
                .and_then(|id| self.observe_field(id)),
        }
    }

    fn observe_click(&mut self) -> ClickObservation {
        let field = self
            .machine
            .pending_click_field()
            .and_then(|id| self.observe_field(id));
        let clipboard_ok = field.is_some_and(|f| !f.has_selection) && self.clipboard.probe();
        let caret = field
            .filter(|f| f.has_selection)
            .and_then(|_| self.page.selection().focus);
        ClickObservation {
            field,
            clipboard_ok,
            caret,
        }
    }

    /// The text an action activated now would work on.
    fn captured_text(&self) -> String {
        let panel = self.machine.panel();
        match panel.target {
            Some(id) if panel.mode.is_input() => {
                self.page.field_selected_text(id).unwrap_or_default()
            }
            _ => self.page.selection().text,
        }
    }

    fn run_action(&mut self, pending: &PendingAction) -> ActionOutcome {
        let result = match pending.action {
            PanelAction::Copy => self.copy(&pending.text),
            PanelAction::Cut => self.cut(pending),
            PanelAction::Paste => self.paste(pending),
            PanelAction::Delete => self.delete(pending),
            PanelAction::Search => Ok(self.search(&pending.text)),
            PanelAction::Translate => Ok(self.translate(&pending.text)),
            // select all runs synchronously and is never queued
            PanelAction::SelectAll => Ok(ActionOutcome::Completed),
        };
        match result {
            Ok(outcome) => outcome,
            Err(PageError::Detached(_) | PageError::NotEditable(_)) => {
                tracing::debug!(action = ?pending.action, "target went stale, action aborted");
                ActionOutcome::Aborted
            }
            Err(err) => {
                tracing::warn!(action = ?pending.action, %err, "panel action failed");
                ActionOutcome::Failed
            }
        }
    }

    fn live_target(&self, id: ElementId) -> Result<ElementInfo, PageError> {
        let info = self.page.element(id).ok_or(PageError::Detached(id))?;
        if !info.is_editable_field() {
            return Err(PageError::NotEditable(id));
        }
        Ok(info)
    }

    fn copy(&mut self, text: &str) -> Result<ActionOutcome, PageError> {
        let text = text.trim();
        match self.clipboard.write_text(text) {
            Ok(()) => Ok(ActionOutcome::Completed),
            Err(err) => {
                tracing::warn!(%err, "clipboard write refused, falling back to legacy copy");
                self.page.legacy_copy(text)?;
                Ok(ActionOutcome::FellBack)
            }
        }
    }

    fn cut(&mut self, pending: &PendingAction) -> Result<ActionOutcome, PageError> {
        let Some(id) = pending.target else {
            return Ok(ActionOutcome::Aborted);
        };
        self.live_target(id)?;
        match self.clipboard.write_text(&pending.text) {
            Ok(()) => {
                // the field may have gone away while the write was pending
                self.live_target(id)?;
                self.page.delete_selection(id)?;
                self.page.dispatch_input(id);
                Ok(ActionOutcome::Completed)
            }
            Err(err) => {
                tracing::warn!(%err, "clipboard write refused, falling back to native cut");
                if let Err(native) = self.page.native_cut(id) {
                    tracing::warn!(err = %native, "native cut failed, using legacy copy");
                    self.page.legacy_copy(&pending.text)?;
                    self.page.delete_selection(id)?;
                }
                self.page.dispatch_input(id);
                Ok(ActionOutcome::FellBack)
            }
        }
    }

    fn paste(&mut self, pending: &PendingAction) -> Result<ActionOutcome, PageError> {
        let Some(id) = pending.target else {
            return Ok(ActionOutcome::Aborted);
        };
        self.live_target(id)?;
        if !self.clipboard.probe() {
            self.page.alert(PASTE_INSTRUCTION);
            return Ok(ActionOutcome::NeedsManualPaste);
        }
        let text = match self.clipboard.read_text() {
            Ok(text) => text,
            Err(err) => {
                tracing::warn!(%err, "clipboard read refused");
                self.page.alert(PASTE_INSTRUCTION);
                return Ok(ActionOutcome::NeedsManualPaste);
            }
        };
        let info = self.live_target(id)?;
        if !info.focused {
            self.page.focus(id)?;
        }
        self.page.insert_text(id, &text)?;
        self.page.dispatch_input(id);
        Ok(ActionOutcome::Completed)
    }

    fn delete(&mut self, pending: &PendingAction) -> Result<ActionOutcome, PageError> {
        let Some(id) = pending.target else {
            return Ok(ActionOutcome::Aborted);
        };
        self.live_target(id)?;
        self.page.delete_selection(id)?;
        self.page.dispatch_input(id);
        Ok(ActionOutcome::Completed)
    }

    fn search(&mut self, text: &str) -> ActionOutcome {
        let query = text.trim();
        if query.is_empty() {
            return ActionOutcome::Aborted;
        }
        self.sink.send(Message::PerformSearch {
            search_text: query.to_string(),
        });
        ActionOutcome::Completed
    }

    fn translate(&mut self, text: &str) -> ActionOutcome {
        let query = text.trim();
        if query.is_empty() {
            return ActionOutcome::Aborted;
        }
        let url = format!("{TRANSLATE_URL}{}", urlencoding::encode(query));
        self.sink.send(Message::OpenInBackgroundTab { url });
        ActionOutcome::Completed
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::clipboard::MemoryClipboard;
    use crate::geometry::Rect;
    use crate::page::MemoryPage;

    type Harness = PanelController<MemoryPage, MemoryClipboard, Vec<Message>>;

    fn controller(page: MemoryPage) -> Harness {
        PanelController::new(
            page,
            MemoryClipboard::new(),
            Vec::new(),
            ControllerConfig::default(),
        )
    }

    #[test]
    fn start_requests_settings_and_theme() {
        let mut c = controller(MemoryPage::default());
        c.start();
        assert_eq!(
            c.sink(),
            &vec![Message::GetSettings, Message::GetThemeColors]
        );
    }

    #[test]
    fn stale_anchor_field_hides_panel() {
        let mut page = MemoryPage::default();
        let input = page.add_input("text", "abc", Rect::new(10.0, 100.0, 200.0, 20.0));
        let mut c = controller(page);
        let t0 = Instant::now();
        c.handle_event(
            PageEvent::Click {
                point: Point::new(20.0, 110.0),
                target: Some(input),
            },
            t0,
        );
        c.page_mut().detach(input);
        c.tick(t0 + Duration::from_millis(150));
        assert_eq!(c.mode(), PanelMode::Hidden);
        assert!(c.view().is_none());
    }

    #[test]
    fn button_hit_testing_walks_the_row() {
        let mut page = MemoryPage::default();
        let para = page.add_paragraph("hello world", Rect::new(0.0, 200.0, 400.0, 16.0));
        page.select_range(para, 0, 11);
        let mut c = controller(page);
        let t0 = Instant::now();
        c.handle_event(PageEvent::SelectionChange, t0);
        c.tick(t0 + Duration::from_millis(250));
        let view = c.view().unwrap();
        // "Copy" is 4 * 8 + 16 wide
        let first = Point::new(view.position.x + 1.0, view.position.y + 1.0);
        let second = Point::new(view.position.x + 49.0, view.position.y + 1.0);
        assert_eq!(c.button_at(first), Some(PanelAction::Copy));
        assert_eq!(c.button_at(second), Some(PanelAction::Search));
        assert_eq!(c.button_at(Point::new(-5.0, -5.0)), None);
    }

    #[test]
    fn dispose_drops_queued_actions() {
        let mut page = MemoryPage::default();
        let para = page.add_paragraph("hello", Rect::new(0.0, 200.0, 400.0, 16.0));
        page.select_range(para, 0, 5);
        let mut c = controller(page);
        let t0 = Instant::now();
        c.handle_event(PageEvent::SelectionChange, t0);
        c.tick(t0 + Duration::from_millis(250));
        c.handle_event(PageEvent::PanelButton(PanelAction::Search), t0);
        assert!(c.has_queued_actions());
        c.dispose();
        c.tick(t0 + Duration::from_secs(5));
        assert!(c.sink().is_empty());
        assert_eq!(c.next_deadline(), None);
        c.handle_event(PageEvent::SelectionChange, t0);
        assert_eq!(c.next_deadline(), None);
    }
}
