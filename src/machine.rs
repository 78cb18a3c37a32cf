//! The panel's transition function.
//!
//! [`PanelMachine::step`] is pure: it takes one [`Stimulus`] and returns the
//! next machine together with the [`Command`]s the controller has to carry
//! out (start a timer, show the panel, queue an action). Everything the
//! machine needs to know about the page arrives inside the stimulus as an
//! observation, so the whole transition table can be exercised without a
//! page.

use std::collections::BTreeSet;

use crate::actions::{MenuItem, PanelAction};
use crate::geometry::{Point, Rect};
use crate::page::ElementId;
use crate::panel::{Anchor, FieldFacts, PanelMode, PanelState, button_set, filter_selection_actions};
use crate::timers::PanelTimer;

/// A recognized editable field as the controller saw it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldObservation {
    pub id: ElementId,
    pub has_text: bool,
    pub has_selection: bool,
}

/// The document selection once it has settled.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SelectionObservation {
    /// Selected text, already trimmed.
    pub text: String,
    pub focus: Option<Rect>,
    /// The active element, when it is an editable field.
    pub field: Option<FieldObservation>,
}

/// The clicked or focused field once the click has settled.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClickObservation {
    /// `None` when the field is gone or no longer editable.
    pub field: Option<FieldObservation>,
    pub clipboard_ok: bool,
    pub caret: Option<Rect>,
}

/// An action waiting for the controller to run it.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingAction {
    pub action: PanelAction,
    pub target: Option<ElementId>,
    /// Selection text captured when the button was activated.
    pub text: String,
    pub generation: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    Completed,
    /// Succeeded through a legacy or native fallback path.
    FellBack,
    /// The target went stale before the action could run.
    Aborted,
    Failed,
    /// Clipboard read was refused; the user was told to paste by hand.
    NeedsManualPaste,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stimulus {
    SelectionChanged,
    SelectionSettled(SelectionObservation),
    PointerDown,
    Click {
        /// Editable field under the pointer.
        field: Option<ElementId>,
        point: Point,
        in_panel: bool,
    },
    DoubleClick {
        field: Option<FieldObservation>,
    },
    KeyDown {
        escape: bool,
    },
    /// An editable field received focus.
    FocusIn {
        field: ElementId,
    },
    FocusOut {
        field: ElementId,
        related: Option<ElementId>,
        into_panel: bool,
    },
    Typing {
        field: ElementId,
    },
    Scroll,
    ClickSettled(ClickObservation),
    TimerFired(PanelTimer),
    ButtonActivated {
        action: PanelAction,
        text: String,
    },
    ActionFinished {
        action: PanelAction,
        generation: u64,
        outcome: ActionOutcome,
    },
    SettingsLoaded(Vec<MenuItem>),
    SetEnabled(bool),
    /// The controller could not resolve the panel's target or anchor.
    TargetLost,
    Dispose,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    StartTimer(PanelTimer),
    CancelTimer(PanelTimer),
    CancelAllTimers,
    /// Measure, place and draw the panel described by the new state.
    Show,
    Hide,
    SelectAll(ElementId),
    Execute(PendingAction),
}

#[derive(Debug, Clone)]
pub struct Transition {
    pub next: PanelMachine,
    pub commands: Vec<Command>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct ClickIntent {
    field: ElementId,
    pointer: Option<Point>,
}

#[derive(Debug, Clone)]
pub struct PanelMachine {
    panel: PanelState,
    selection_actions: Vec<PanelAction>,
    enabled_items: Vec<MenuItem>,
    enabled: bool,
    disposed: bool,
    pending_click: Option<ClickIntent>,
    select_all_guard: bool,
    typing_quiet: bool,
    focus_intent: bool,
    in_flight: BTreeSet<PanelAction>,
}

impl Default for PanelMachine {
    fn default() -> Self {
        Self::new(vec![PanelAction::Copy, PanelAction::Search])
    }
}

impl PanelMachine {
    pub fn new(selection_actions: Vec<PanelAction>) -> Self {
        Self {
            panel: PanelState::default(),
            selection_actions,
            enabled_items: MenuItem::ALL.to_vec(),
            enabled: true,
            disposed: false,
            pending_click: None,
            select_all_guard: false,
            typing_quiet: false,
            focus_intent: false,
            in_flight: BTreeSet::new(),
        }
    }

    pub fn panel(&self) -> &PanelState {
        &self.panel
    }

    pub fn mode(&self) -> PanelMode {
        self.panel.mode
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn disposed(&self) -> bool {
        self.disposed
    }

    pub fn enabled_items(&self) -> &[MenuItem] {
        &self.enabled_items
    }

    /// The field whose click is waiting for `ClickSettle`.
    pub fn pending_click_field(&self) -> Option<ElementId> {
        self.pending_click.map(|intent| intent.field)
    }

    pub fn is_in_flight(&self, action: PanelAction) -> bool {
        self.in_flight.contains(&action)
    }

    /// Selection-panel buttons after the user's menu preferences.
    pub fn selection_actions(&self) -> Vec<PanelAction> {
        filter_selection_actions(&self.selection_actions, &self.enabled_items)
    }

    pub fn step(&self, stimulus: Stimulus) -> Transition {
        let mut next = self.clone();
        let mut commands = Vec::new();
        if !self.disposed {
            next.apply(stimulus, &mut commands);
        }
        if next.panel.mode != self.panel.mode {
            tracing::debug!(
                from = self.panel.mode.as_str(),
                to = next.panel.mode.as_str(),
                buttons = ?next.panel.buttons,
                "panel transition"
            );
        }
        Transition { next, commands }
    }

    fn apply(&mut self, stimulus: Stimulus, out: &mut Vec<Command>) {
        match stimulus {
            Stimulus::SelectionChanged => {
                if !self.enabled || self.select_all_guard {
                    return;
                }
                self.hide(out);
                out.push(Command::StartTimer(PanelTimer::SelectionSettle));
            }
            Stimulus::SelectionSettled(obs) => self.selection_settled(obs, out),
            Stimulus::PointerDown => self.note_user_intent(out),
            Stimulus::KeyDown { escape } => {
                self.note_user_intent(out);
                if escape {
                    self.cancel_show_timers(out);
                    self.dismiss(out);
                }
            }
            Stimulus::Click {
                field,
                point,
                in_panel,
            } => {
                if in_panel {
                    return;
                }
                match field {
                    Some(field) if self.enabled => {
                        self.pending_click = Some(ClickIntent {
                            field,
                            pointer: Some(point),
                        });
                        out.push(Command::StartTimer(PanelTimer::ClickSettle));
                    }
                    Some(_) => {}
                    None => {
                        // a drag ends in a click, so SelectionSettle keeps running
                        if self.pending_click.take().is_some() {
                            out.push(Command::CancelTimer(PanelTimer::ClickSettle));
                        }
                        if self.panel.visible() {
                            self.dismiss(out);
                        }
                    }
                }
            }
            Stimulus::DoubleClick { field } => {
                if let Some(field) = field
                    && self.enabled
                    && field.has_text
                {
                    self.select_all(field.id, out);
                }
            }
            Stimulus::FocusIn { field } => {
                if !self.enabled || !self.focus_intent {
                    return;
                }
                // a click on the same field may already carry the pointer
                if self.pending_click_field() != Some(field) {
                    self.pending_click = Some(ClickIntent {
                        field,
                        pointer: None,
                    });
                }
                out.push(Command::StartTimer(PanelTimer::ClickSettle));
            }
            Stimulus::FocusOut {
                field,
                related,
                into_panel,
            } => {
                if into_panel || related == Some(field) {
                    return;
                }
                if self.pending_click_field() == Some(field) {
                    self.pending_click = None;
                    out.push(Command::CancelTimer(PanelTimer::ClickSettle));
                }
                if self.panel.mode.is_input() && self.panel.target == Some(field) {
                    self.dismiss(out);
                }
            }
            Stimulus::Typing { .. } => {
                self.typing_quiet = true;
                out.push(Command::StartTimer(PanelTimer::TypingQuiet));
                if self.panel.mode.is_input() {
                    self.hide(out);
                }
            }
            Stimulus::Scroll => {
                self.cancel_show_timers(out);
                self.dismiss(out);
            }
            Stimulus::ClickSettled(obs) => self.click_settled(obs, out),
            Stimulus::TimerFired(timer) => match timer {
                PanelTimer::SelectAllGuard => self.select_all_guard = false,
                PanelTimer::TypingQuiet => self.typing_quiet = false,
                PanelTimer::FocusIntent => self.focus_intent = false,
                PanelTimer::SelectionSettle | PanelTimer::ClickSettle => {}
            },
            Stimulus::ButtonActivated { action, text } => {
                if !self.panel.visible()
                    || !self.panel.buttons.contains(&action)
                    || self.in_flight.contains(&action)
                {
                    return;
                }
                if action == PanelAction::SelectAll {
                    if let Some(target) = self.panel.target {
                        self.select_all(target, out);
                    }
                    return;
                }
                self.in_flight.insert(action);
                out.push(Command::Execute(PendingAction {
                    action,
                    target: self.panel.target,
                    text,
                    generation: self.panel.generation,
                }));
            }
            Stimulus::ActionFinished {
                action,
                generation,
                outcome,
            } => {
                self.in_flight.remove(&action);
                tracing::debug!(?action, ?outcome, "action finished");
                if generation == self.panel.generation {
                    self.dismiss(out);
                }
            }
            Stimulus::SettingsLoaded(items) => self.enabled_items = items,
            Stimulus::SetEnabled(enabled) => {
                self.enabled = enabled;
                if !enabled {
                    self.cancel_show_timers(out);
                    self.dismiss(out);
                }
            }
            Stimulus::TargetLost => self.dismiss(out),
            Stimulus::Dispose => {
                self.disposed = true;
                self.pending_click = None;
                self.in_flight.clear();
                out.push(Command::CancelAllTimers);
                self.dismiss(out);
            }
        }
    }

    fn selection_settled(&mut self, obs: SelectionObservation, out: &mut Vec<Command>) {
        if !self.enabled || self.select_all_guard || obs.text.trim().is_empty() {
            return;
        }
        match obs.field {
            Some(field) => {
                if self.input_suppressed() {
                    return;
                }
                let anchor = obs.focus.map_or(Anchor::Field(field.id), Anchor::Caret);
                let facts = FieldFacts {
                    has_text: field.has_text,
                    selected_all: false,
                };
                self.show(PanelMode::FullEditing, Some(field.id), anchor, facts, out);
            }
            None => {
                let Some(focus) = obs.focus else {
                    return;
                };
                self.show(
                    PanelMode::Selection,
                    None,
                    Anchor::Caret(focus),
                    FieldFacts::default(),
                    out,
                );
            }
        }
    }

    fn click_settled(&mut self, obs: ClickObservation, out: &mut Vec<Command>) {
        let Some(intent) = self.pending_click.take() else {
            return;
        };
        if !self.enabled {
            return;
        }
        let Some(field) = obs.field.filter(|f| f.id == intent.field) else {
            if self.panel.target == Some(intent.field) {
                self.dismiss(out);
            }
            return;
        };
        if self.input_suppressed() {
            return;
        }
        let facts = FieldFacts {
            has_text: field.has_text,
            selected_all: false,
        };
        if field.has_selection {
            let anchor = obs
                .caret
                .map(Anchor::Caret)
                .or(intent.pointer.map(Anchor::Pointer))
                .unwrap_or(Anchor::Field(field.id));
            self.show(PanelMode::FullEditing, Some(field.id), anchor, facts, out);
        } else if obs.clipboard_ok {
            let anchor = intent
                .pointer
                .map_or(Anchor::Field(field.id), Anchor::Pointer);
            self.show(PanelMode::PasteOnly, Some(field.id), anchor, facts, out);
        }
    }

    fn select_all(&mut self, field: ElementId, out: &mut Vec<Command>) {
        self.select_all_guard = true;
        self.pending_click = None;
        out.push(Command::CancelTimer(PanelTimer::ClickSettle));
        out.push(Command::CancelTimer(PanelTimer::SelectionSettle));
        out.push(Command::StartTimer(PanelTimer::SelectAllGuard));
        out.push(Command::SelectAll(field));
        let facts = FieldFacts {
            has_text: true,
            selected_all: true,
        };
        self.show(
            PanelMode::FullEditing,
            Some(field),
            Anchor::Field(field),
            facts,
            out,
        );
    }

    fn show(
        &mut self,
        mode: PanelMode,
        target: Option<ElementId>,
        anchor: Anchor,
        facts: FieldFacts,
        out: &mut Vec<Command>,
    ) {
        let buttons = button_set(mode, facts, &self.selection_actions());
        self.panel = PanelState {
            mode,
            anchor: Some(anchor),
            target,
            buttons,
            generation: self.panel.generation + 1,
        };
        out.push(Command::Show);
    }

    /// Take the panel off screen but remember the target.
    fn hide(&mut self, out: &mut Vec<Command>) {
        if !self.panel.visible() {
            return;
        }
        self.panel.mode = PanelMode::Hidden;
        self.panel.anchor = None;
        self.panel.buttons.clear();
        out.push(Command::Hide);
    }

    fn dismiss(&mut self, out: &mut Vec<Command>) {
        self.hide(out);
        self.panel.target = None;
    }

    fn cancel_show_timers(&mut self, out: &mut Vec<Command>) {
        self.pending_click = None;
        out.push(Command::CancelTimer(PanelTimer::SelectionSettle));
        out.push(Command::CancelTimer(PanelTimer::ClickSettle));
    }

    fn note_user_intent(&mut self, out: &mut Vec<Command>) {
        self.focus_intent = true;
        out.push(Command::StartTimer(PanelTimer::FocusIntent));
    }

    fn input_suppressed(&self) -> bool {
        self.typing_quiet || self.in_flight.iter().any(PanelAction::is_edit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIELD: ElementId = ElementId(7);

    fn caret() -> Rect {
        Rect::caret(40.0, 100.0, 16.0)
    }

    fn field(has_text: bool, has_selection: bool) -> FieldObservation {
        FieldObservation {
            id: FIELD,
            has_text,
            has_selection,
        }
    }

    fn settle_static(m: &PanelMachine, text: &str) -> Transition {
        m.step(Stimulus::SelectionSettled(SelectionObservation {
            text: text.to_string(),
            focus: Some(caret()),
            field: None,
        }))
    }

    fn click_field(m: &PanelMachine, obs: ClickObservation) -> PanelMachine {
        let m = m
            .step(Stimulus::Click {
                field: Some(FIELD),
                point: Point::new(50.0, 50.0),
                in_panel: false,
            })
            .next;
        m.step(Stimulus::ClickSettled(obs)).next
    }

    #[test]
    fn static_selection_shows_selection_panel() {
        let m = PanelMachine::default();
        let t = m.step(Stimulus::SelectionChanged);
        assert_eq!(
            t.commands,
            vec![Command::StartTimer(PanelTimer::SelectionSettle)]
        );
        let t = settle_static(&t.next, "hello world");
        assert_eq!(t.next.mode(), PanelMode::Selection);
        assert_eq!(
            t.next.panel().buttons,
            vec![PanelAction::Copy, PanelAction::Search]
        );
        assert_eq!(t.next.panel().anchor, Some(Anchor::Caret(caret())));
        assert_eq!(t.commands, vec![Command::Show]);
    }

    #[test]
    fn blank_selection_never_shows() {
        let m = PanelMachine::default();
        let t = settle_static(&m, "   \n ");
        assert_eq!(t.next.mode(), PanelMode::Hidden);
        assert!(t.commands.is_empty());
    }

    #[test]
    fn selection_change_hides_until_settled() {
        let m = settle_static(&PanelMachine::default(), "word").next;
        let t = m.step(Stimulus::SelectionChanged);
        assert_eq!(t.next.mode(), PanelMode::Hidden);
        assert_eq!(
            t.commands,
            vec![
                Command::Hide,
                Command::StartTimer(PanelTimer::SelectionSettle)
            ]
        );
    }

    #[test]
    fn selection_in_field_offers_full_editing() {
        let m = PanelMachine::default();
        let t = m.step(Stimulus::SelectionSettled(SelectionObservation {
            text: "abc".into(),
            focus: Some(caret()),
            field: Some(field(true, true)),
        }));
        assert_eq!(t.next.mode(), PanelMode::FullEditing);
        assert_eq!(t.next.panel().target, Some(FIELD));
        assert_eq!(
            t.next.panel().buttons,
            vec![
                PanelAction::Copy,
                PanelAction::Cut,
                PanelAction::Paste,
                PanelAction::Delete,
                PanelAction::SelectAll
            ]
        );
    }

    #[test]
    fn settled_click_on_empty_field_offers_paste_only() {
        let m = click_field(
            &PanelMachine::default(),
            ClickObservation {
                field: Some(field(false, false)),
                clipboard_ok: true,
                caret: None,
            },
        );
        assert_eq!(m.mode(), PanelMode::PasteOnly);
        assert_eq!(m.panel().buttons, vec![PanelAction::Paste]);
        assert_eq!(
            m.panel().anchor,
            Some(Anchor::Pointer(Point::new(50.0, 50.0)))
        );
    }

    #[test]
    fn settled_click_without_clipboard_shows_nothing() {
        let m = click_field(
            &PanelMachine::default(),
            ClickObservation {
                field: Some(field(true, false)),
                clipboard_ok: false,
                caret: None,
            },
        );
        assert_eq!(m.mode(), PanelMode::Hidden);
    }

    #[test]
    fn focus_without_user_intent_is_ignored() {
        let m = PanelMachine::default();
        let t = m.step(Stimulus::FocusIn { field: FIELD });
        assert!(t.commands.is_empty());
        assert_eq!(t.next.pending_click_field(), None);

        let m = m.step(Stimulus::KeyDown { escape: false }).next;
        let t = m.step(Stimulus::FocusIn { field: FIELD });
        assert_eq!(t.next.pending_click_field(), Some(FIELD));
        let m = t
            .next
            .step(Stimulus::TimerFired(PanelTimer::FocusIntent))
            .next;
        // the intent window has closed
        assert!(m.step(Stimulus::FocusIn { field: FIELD }).commands.is_empty());
    }

    #[test]
    fn escape_cancels_pending_shows_and_clears_target() {
        let m = settle_static(&PanelMachine::default(), "x").next;
        let m = m
            .step(Stimulus::Click {
                field: Some(FIELD),
                point: Point::default(),
                in_panel: false,
            })
            .next;
        let t = m.step(Stimulus::KeyDown { escape: true });
        assert_eq!(t.next.mode(), PanelMode::Hidden);
        assert_eq!(t.next.pending_click_field(), None);
        assert!(t.commands.contains(&Command::CancelTimer(PanelTimer::ClickSettle)));
        assert!(t.commands.contains(&Command::Hide));
        // the late settle has nothing to act on
        let t = t.next.step(Stimulus::ClickSettled(ClickObservation {
            field: Some(field(false, false)),
            clipboard_ok: true,
            caret: None,
        }));
        assert_eq!(t.next.mode(), PanelMode::Hidden);
    }

    #[test]
    fn outside_click_hides_only_a_visible_panel() {
        let outside = Stimulus::Click {
            field: None,
            point: Point::default(),
            in_panel: false,
        };
        assert!(PanelMachine::default().step(outside.clone()).commands.is_empty());
        let m = settle_static(&PanelMachine::default(), "x").next;
        let t = m.step(outside);
        assert_eq!(t.commands, vec![Command::Hide]);
        let inside = Stimulus::Click {
            field: None,
            point: Point::default(),
            in_panel: true,
        };
        assert_eq!(m.step(inside).next.mode(), PanelMode::Selection);
    }

    #[test]
    fn outside_click_beats_a_pending_field_click() {
        let m = PanelMachine::default()
            .step(Stimulus::Click {
                field: Some(FIELD),
                point: Point::new(50.0, 50.0),
                in_panel: false,
            })
            .next;
        let t = m.step(Stimulus::Click {
            field: None,
            point: Point::new(600.0, 10.0),
            in_panel: false,
        });
        assert_eq!(
            t.commands,
            vec![Command::CancelTimer(PanelTimer::ClickSettle)]
        );
        assert_eq!(t.next.pending_click_field(), None);
        let t = t.next.step(Stimulus::ClickSettled(ClickObservation {
            field: Some(field(false, false)),
            clipboard_ok: true,
            caret: None,
        }));
        assert_eq!(t.next.mode(), PanelMode::Hidden);
    }

    #[test]
    fn drag_ending_click_keeps_selection_settle_running() {
        let m = PanelMachine::default()
            .step(Stimulus::SelectionChanged)
            .next;
        let t = m.step(Stimulus::Click {
            field: None,
            point: Point::default(),
            in_panel: false,
        });
        assert!(t.commands.is_empty());
        assert_eq!(settle_static(&t.next, "dragged").next.mode(), PanelMode::Selection);
    }

    #[test]
    fn focus_out_hides_input_panel_unless_focus_moves_into_it() {
        let m = click_field(
            &PanelMachine::default(),
            ClickObservation {
                field: Some(field(false, false)),
                clipboard_ok: true,
                caret: None,
            },
        );
        assert_eq!(m.mode(), PanelMode::PasteOnly);

        let kept = m.step(Stimulus::FocusOut {
            field: FIELD,
            related: None,
            into_panel: true,
        });
        assert!(kept.commands.is_empty());
        assert_eq!(kept.next.mode(), PanelMode::PasteOnly);

        let t = m.step(Stimulus::FocusOut {
            field: FIELD,
            related: Some(ElementId(8)),
            into_panel: false,
        });
        assert_eq!(t.next.mode(), PanelMode::Hidden);
        assert_eq!(t.next.panel().target, None);
        assert!(t.commands.contains(&Command::Hide));
    }

    #[test]
    fn focus_out_cancels_a_pending_click_on_that_field() {
        let m = PanelMachine::default()
            .step(Stimulus::Click {
                field: Some(FIELD),
                point: Point::default(),
                in_panel: false,
            })
            .next;
        let t = m.step(Stimulus::FocusOut {
            field: FIELD,
            related: None,
            into_panel: false,
        });
        assert_eq!(t.next.pending_click_field(), None);
        assert_eq!(
            t.commands,
            vec![Command::CancelTimer(PanelTimer::ClickSettle)]
        );
    }

    #[test]
    fn double_click_selects_all_in_a_non_empty_field() {
        let t = PanelMachine::default().step(Stimulus::DoubleClick {
            field: Some(field(true, false)),
        });
        assert!(t.commands.contains(&Command::SelectAll(FIELD)));
        assert!(t.commands.contains(&Command::StartTimer(PanelTimer::SelectAllGuard)));
        assert_eq!(t.next.mode(), PanelMode::FullEditing);
        assert_eq!(t.next.panel().anchor, Some(Anchor::Field(FIELD)));
        assert!(!t.next.panel().buttons.contains(&PanelAction::SelectAll));

        let empty = PanelMachine::default().step(Stimulus::DoubleClick {
            field: Some(field(false, false)),
        });
        assert!(empty.commands.is_empty());
        assert_eq!(empty.next.mode(), PanelMode::Hidden);

        let off = PanelMachine::default().step(Stimulus::SetEnabled(false)).next;
        let t = off.step(Stimulus::DoubleClick {
            field: Some(field(true, false)),
        });
        assert!(t.commands.is_empty());
    }

    #[test]
    fn select_all_guards_selection_changes() {
        let m = click_field(
            &PanelMachine::default(),
            ClickObservation {
                field: Some(field(true, false)),
                clipboard_ok: true,
                caret: None,
            },
        );
        let t = m.step(Stimulus::ButtonActivated {
            action: PanelAction::SelectAll,
            text: String::new(),
        });
        assert!(t.commands.contains(&Command::SelectAll(FIELD)));
        assert_eq!(t.next.panel().anchor, Some(Anchor::Field(FIELD)));
        assert_eq!(
            t.next.panel().buttons,
            vec![
                PanelAction::Copy,
                PanelAction::Cut,
                PanelAction::Paste,
                PanelAction::Delete
            ]
        );
        let guarded = t.next.step(Stimulus::SelectionChanged);
        assert!(guarded.commands.is_empty());
        assert_eq!(guarded.next.mode(), PanelMode::FullEditing);

        let released = guarded
            .next
            .step(Stimulus::TimerFired(PanelTimer::SelectAllGuard))
            .next;
        assert_eq!(
            released.step(Stimulus::SelectionChanged).next.mode(),
            PanelMode::Hidden
        );
    }

    #[test]
    fn typing_suppresses_input_panels() {
        let m = PanelMachine::default()
            .step(Stimulus::Typing { field: FIELD })
            .next;
        let m = click_field(
            &m,
            ClickObservation {
                field: Some(field(true, false)),
                clipboard_ok: true,
                caret: None,
            },
        );
        assert_eq!(m.mode(), PanelMode::Hidden);
        let m = m
            .step(Stimulus::TimerFired(PanelTimer::TypingQuiet))
            .next;
        let m = click_field(
            &m,
            ClickObservation {
                field: Some(field(true, false)),
                clipboard_ok: true,
                caret: None,
            },
        );
        assert_eq!(m.mode(), PanelMode::PasteOnly);
    }

    #[test]
    fn in_flight_action_cannot_be_reactivated() {
        let m = settle_static(&PanelMachine::default(), "x").next;
        let activate = Stimulus::ButtonActivated {
            action: PanelAction::Copy,
            text: "x".into(),
        };
        let t = m.step(activate.clone());
        assert!(matches!(t.commands.as_slice(), [Command::Execute(p)] if p.text == "x"));
        assert!(t.next.is_in_flight(PanelAction::Copy));
        assert!(t.next.step(activate).commands.is_empty());

        let done = t.next.step(Stimulus::ActionFinished {
            action: PanelAction::Copy,
            generation: m.panel().generation,
            outcome: ActionOutcome::Completed,
        });
        assert!(!done.next.is_in_flight(PanelAction::Copy));
        assert_eq!(done.next.mode(), PanelMode::Hidden);
    }

    #[test]
    fn late_completion_leaves_newer_panel_alone() {
        let m = settle_static(&PanelMachine::default(), "x").next;
        let old_generation = m.panel().generation;
        let m = settle_static(&m, "y").next;
        let t = m.step(Stimulus::ActionFinished {
            action: PanelAction::Search,
            generation: old_generation,
            outcome: ActionOutcome::Completed,
        });
        assert_eq!(t.next.mode(), PanelMode::Selection);
    }

    #[test]
    fn edit_in_flight_blocks_input_panels() {
        let m = PanelMachine::default()
            .step(Stimulus::SelectionSettled(SelectionObservation {
                text: "abc".into(),
                focus: Some(caret()),
                field: Some(field(true, true)),
            }))
            .next;
        let m = m
            .step(Stimulus::ButtonActivated {
                action: PanelAction::Paste,
                text: String::new(),
            })
            .next;
        let m = m.step(Stimulus::SelectionChanged).next;
        let t = m.step(Stimulus::SelectionSettled(SelectionObservation {
            text: "abc".into(),
            focus: Some(caret()),
            field: Some(field(true, true)),
        }));
        assert_eq!(t.next.mode(), PanelMode::Hidden);
    }

    #[test]
    fn disabled_extension_shows_nothing() {
        let m = settle_static(&PanelMachine::default(), "x").next;
        let t = m.step(Stimulus::SetEnabled(false));
        assert_eq!(t.next.mode(), PanelMode::Hidden);
        assert_eq!(settle_static(&t.next, "x").next.mode(), PanelMode::Hidden);
        let on = t.next.step(Stimulus::SetEnabled(true)).next;
        assert_eq!(settle_static(&on, "x").next.mode(), PanelMode::Selection);
    }

    #[test]
    fn menu_preferences_shape_selection_panel() {
        let m = PanelMachine::new(vec![
            PanelAction::Copy,
            PanelAction::Search,
            PanelAction::Translate,
        ])
        .step(Stimulus::SettingsLoaded(vec![MenuItem::Translate]))
        .next;
        let t = settle_static(&m, "bonjour");
        assert_eq!(t.next.panel().buttons, vec![PanelAction::Translate]);
    }

    #[test]
    fn dispose_is_final() {
        let m = settle_static(&PanelMachine::default(), "x").next;
        let t = m.step(Stimulus::Dispose);
        assert_eq!(t.commands, vec![Command::CancelAllTimers, Command::Hide]);
        assert!(t.next.disposed());
        assert!(settle_static(&t.next, "x").commands.is_empty());
    }
}
