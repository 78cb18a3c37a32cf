//! Interactive terminal host for the panel controller.
//!
//! The playground lays out a small page of text and fields on a
//! [`MemoryPage`] (one unit per terminal cell), translates mouse and key
//! input into the DOM events a browser would fire, and relays messages
//! between the controller and an in-process [`BackgroundCoordinator`].

pub mod render;

use std::io;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use crossterm::event::{
    Event, KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};

use crate::actions::PanelAction;
use crate::background::{BackgroundCoordinator, DesktopBrowser};
use crate::clipboard::Clipboard;
use crate::controller::{ControllerConfig, Key, PageEvent, PanelController};
use crate::drivers::console::{ConsoleInputDriver, ConsoleOutputDriver};
use crate::drivers::{InputDriver, OutputDriver};
use crate::event_loop::{ControlFlow, EventLoop};
use crate::geometry::{Point, Rect, Viewport};
use crate::page::{ElementId, MemoryPage, Page, TextMetrics};
use crate::placement::PlacementConfig;
use crate::protocol::{Message, MessageSink};
use crate::settings::SettingsStore;

/// Two presses on the same cell within this window make a double click.
const DOUBLE_CLICK_WINDOW: Duration = Duration::from_millis(400);

/// Rows reserved for the log pane when the terminal is tall enough.
const LOG_ROWS: u16 = 8;

const SAMPLE_TEXT: &str = "Drag across this paragraph to select some text.\n\
                           The selection toolbar offers Copy and Search for it.";

pub type PlaygroundController<C> = PanelController<MemoryPage, C, Vec<Message>>;

pub struct Playground<C, S> {
    controller: PlaygroundController<C>,
    background: BackgroundCoordinator<S, DesktopBrowser>,
    broadcasts: mpsc::Receiver<Message>,
    terminal_size: (u16, u16),
    /// Node and offset where the current drag-selection started.
    drag: Option<(ElementId, usize)>,
    last_press: Option<(Instant, Point)>,
    /// The press in progress is the second of a double click.
    double_press: bool,
    hover: Option<PanelAction>,
    alert: Option<String>,
    quit: bool,
}

/// Rows of the terminal given to the page, the rest hold the status line
/// and the log pane.
pub fn page_rows(height: u16) -> u16 {
    let log = if height >= 20 { LOG_ROWS } else { 0 };
    height.saturating_sub(1 + log)
}

fn sample_page(viewport: Viewport) -> MemoryPage {
    let mut page = MemoryPage::new(viewport, TextMetrics::cells());
    page.add_paragraph(SAMPLE_TEXT, Rect::new(2.0, 1.0, 60.0, 2.0));
    page.add_paragraph("Name:", Rect::new(2.0, 4.0, 6.0, 1.0));
    page.add_input("text", "hello world", Rect::new(9.0, 4.0, 30.0, 1.0));
    page.add_paragraph("Notes:", Rect::new(2.0, 6.0, 6.0, 1.0));
    page.add_textarea(
        "Click here to paste,\nor select to cut.",
        Rect::new(9.0, 6.0, 40.0, 3.0),
    );
    page.add_paragraph("Editable:", Rect::new(2.0, 10.0, 9.0, 1.0));
    page.add_content_editable("rich text lives here", Rect::new(12.0, 10.0, 40.0, 1.0));
    page
}

impl<C: Clipboard, S: SettingsStore> Playground<C, S> {
    pub fn new(clipboard: C, store: S, terminal_size: (u16, u16)) -> Self {
        let (pages, broadcasts) = mpsc::channel();
        let mut background =
            BackgroundCoordinator::new(store, DesktopBrowser::new().with_pages(pages));
        background.start();

        let (width, height) = terminal_size;
        let viewport = Viewport::new(f64::from(width), f64::from(page_rows(height)));
        let config = ControllerConfig {
            placement: PlacementConfig::cells(),
            enabled: background.state().enabled,
            ..ControllerConfig::default()
        };
        let mut controller =
            PanelController::new(sample_page(viewport), clipboard, Vec::new(), config);
        controller.start();

        let mut playground = Self {
            controller,
            background,
            broadcasts,
            terminal_size,
            drag: None,
            last_press: None,
            double_press: false,
            hover: None,
            alert: None,
            quit: false,
        };
        playground.relay(Instant::now());
        playground
    }

    pub fn controller(&self) -> &PlaygroundController<C> {
        &self.controller
    }

    pub fn background(&self) -> &BackgroundCoordinator<S, DesktopBrowser> {
        &self.background
    }

    pub fn terminal_size(&self) -> (u16, u16) {
        self.terminal_size
    }

    pub fn hover(&self) -> Option<PanelAction> {
        self.hover
    }

    pub fn alert(&self) -> Option<&str> {
        self.alert.as_deref()
    }

    pub fn quit_requested(&self) -> bool {
        self.quit
    }

    /// When the loop must call [`Playground::tick`] again, if ever.
    pub fn next_wake(&self, now: Instant) -> Option<Instant> {
        if self.controller.has_queued_actions() {
            return Some(now);
        }
        self.controller.next_deadline()
    }

    pub fn tick(&mut self, now: Instant) {
        self.controller.tick(now);
        if let Some(message) = self.controller.page_mut().take_alerts().pop() {
            self.alert = Some(message);
        }
        self.relay(now);
    }

    pub fn dispose(&mut self) {
        self.controller.dispose();
    }

    pub fn handle_terminal_event(&mut self, event: Event, now: Instant) {
        match event {
            Event::Key(key) => self.on_key(key, now),
            Event::Mouse(mouse) => self.on_mouse(mouse, now),
            Event::Resize(width, height) => {
                self.terminal_size = (width, height);
                let viewport = Viewport::new(f64::from(width), f64::from(page_rows(height)));
                self.controller.page_mut().set_viewport(viewport);
            }
            _ => {}
        }
        self.relay(now);
    }

    /// Deliver page-bound traffic in both directions until nothing is left.
    fn relay(&mut self, now: Instant) {
        loop {
            let outgoing = std::mem::take(self.controller.sink_mut());
            let broadcasts: Vec<Message> = self.broadcasts.try_iter().collect();
            if outgoing.is_empty() && broadcasts.is_empty() {
                break;
            }
            for message in outgoing {
                if let Some(response) = self.background.handle_message(message) {
                    self.controller.handle_response(response, now);
                }
            }
            for message in broadcasts {
                self.controller.handle_message(message, now);
            }
        }
    }

    fn on_key(&mut self, key: KeyEvent, now: Instant) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('q') if ctrl => {
                self.quit = true;
                return;
            }
            KeyCode::Char('t') if ctrl => {
                let enabled = !self.background.state().enabled;
                self.controller
                    .sink_mut()
                    .send(Message::ToggleExtension { enabled });
                return;
            }
            _ => {}
        }
        if self.alert.take().is_some() {
            return;
        }

        let escape = key.code == KeyCode::Esc;
        self.controller.handle_event(
            PageEvent::KeyDown {
                key: if escape { Key::Escape } else { Key::Other },
            },
            now,
        );
        let page = self.controller.page_mut();
        let edited = match key.code {
            KeyCode::Char(c) if !ctrl => page.type_text(c.encode_utf8(&mut [0; 4])),
            KeyCode::Enter => page.type_text("\n"),
            KeyCode::Backspace => page.backspace(),
            KeyCode::Left => {
                page.move_caret(-1);
                self.controller.handle_event(PageEvent::SelectionChange, now);
                return;
            }
            KeyCode::Right => {
                page.move_caret(1);
                self.controller.handle_event(PageEvent::SelectionChange, now);
                return;
            }
            KeyCode::Tab => {
                let next = self.next_field();
                self.move_focus(next, now);
                return;
            }
            _ => None,
        };
        if let Some(target) = edited {
            self.controller.handle_event(PageEvent::Input { target }, now);
            self.controller.handle_event(PageEvent::SelectionChange, now);
        }
    }

    fn on_mouse(&mut self, mouse: MouseEvent, now: Instant) {
        let point = Point::new(f64::from(mouse.column), f64::from(mouse.row));
        if mouse.row >= page_rows(self.terminal_size.1) {
            return;
        }
        match mouse.kind {
            MouseEventKind::Moved => self.hover = self.controller.button_at(point),
            MouseEventKind::Down(MouseButton::Left) => self.on_press(point, now),
            MouseEventKind::Drag(MouseButton::Left) => {
                if let Some((id, anchor)) = self.drag {
                    let page = self.controller.page_mut();
                    let offset = page.offset_at(id, point);
                    page.select_range(id, anchor, offset);
                    self.controller.handle_event(PageEvent::SelectionChange, now);
                }
            }
            MouseEventKind::Up(MouseButton::Left) => {
                if let Some((id, _)) = self.drag.take() {
                    self.controller.handle_event(
                        PageEvent::Click {
                            point,
                            target: Some(id),
                        },
                        now,
                    );
                    if std::mem::take(&mut self.double_press) {
                        self.controller.handle_event(
                            PageEvent::DoubleClick {
                                point,
                                target: Some(id),
                            },
                            now,
                        );
                    }
                }
            }
            MouseEventKind::ScrollDown | MouseEventKind::ScrollUp => {
                let dy = if mouse.kind == MouseEventKind::ScrollDown {
                    1.0
                } else {
                    -1.0
                };
                self.controller.page_mut().scroll_by(dy);
                self.controller.handle_event(PageEvent::Scroll, now);
            }
            _ => {}
        }
    }

    fn on_press(&mut self, point: Point, now: Instant) {
        self.alert = None;
        if let Some(action) = self.controller.button_at(point) {
            self.controller
                .handle_event(PageEvent::PanelButton(action), now);
            return;
        }
        let double = self.is_double_press(point, now);
        self.double_press = double;
        self.last_press = (!double).then_some((now, point));

        self.controller
            .handle_event(PageEvent::PointerDown { point }, now);
        let hit = self.controller.page().hit_test(point);
        let field = hit.filter(|id| {
            self.controller
                .page()
                .element(*id)
                .is_some_and(|info| info.is_editable_field())
        });
        self.move_focus(field, now);

        let page = self.controller.page_mut();
        match hit {
            Some(id) => {
                let offset = page.offset_at(id, point);
                if double {
                    let (start, end) = word_bounds(page.text(id).unwrap_or_default(), offset);
                    page.select_range(id, start, end);
                } else {
                    page.set_caret(id, offset);
                }
                self.drag = Some((id, offset));
            }
            None => {
                page.clear_selection();
                self.drag = None;
            }
        }
        self.controller.handle_event(PageEvent::SelectionChange, now);
    }

    fn is_double_press(&self, point: Point, now: Instant) -> bool {
        self.last_press.is_some_and(|(at, last)| {
            last == point && now.saturating_duration_since(at) <= DOUBLE_CLICK_WINDOW
        })
    }

    fn next_field(&self) -> Option<ElementId> {
        let page = self.controller.page();
        let fields: Vec<ElementId> = page
            .element_ids()
            .into_iter()
            .filter(|id| page.element(*id).is_some_and(|i| i.is_editable_field()))
            .collect();
        let current = page.active_element();
        let pos = current.and_then(|id| fields.iter().position(|f| *f == id));
        match pos {
            Some(pos) => fields.get((pos + 1) % fields.len()).copied(),
            None => fields.first().copied(),
        }
    }

    /// Move keyboard focus, firing `focusout` then `focusin` as a browser
    /// does.
    fn move_focus(&mut self, next: Option<ElementId>, now: Instant) {
        let previous = self.controller.page().active_element();
        if previous == next {
            return;
        }
        if let Some(target) = previous {
            self.controller.handle_event(
                PageEvent::FocusOut {
                    target,
                    related: next,
                    into_panel: false,
                },
                now,
            );
        }
        let page = self.controller.page_mut();
        match next {
            Some(id) => {
                if let Err(err) = page.focus(id) {
                    tracing::debug!(%err, "focus refused");
                    return;
                }
            }
            None => page.blur(),
        }
        if let Some(target) = next {
            self.controller
                .handle_event(PageEvent::FocusIn { target }, now);
        }
    }
}

/// Char range of the word around `offset`.
fn word_bounds(text: &str, offset: usize) -> (usize, usize) {
    let chars: Vec<char> = text.chars().collect();
    let is_word = |i: usize| chars.get(i).is_some_and(|c| c.is_alphanumeric());
    let mut start = offset.min(chars.len());
    while start > 0 && is_word(start - 1) {
        start -= 1;
    }
    let mut end = offset.min(chars.len());
    while is_word(end) {
        end += 1;
    }
    (start, end)
}

/// Take over the terminal and run the playground until Ctrl+Q.
pub fn run<C: Clipboard, S: SettingsStore>(clipboard: C, store: S) -> io::Result<()> {
    let mut output = ConsoleOutputDriver::new()?;
    output.enter()?;
    let mut input = ConsoleInputDriver::new();
    input.set_mouse_capture(true)?;

    let size = crossterm::terminal::size()?;
    let mut app = Playground::new(clipboard, store, size);
    tracing::info!(width = size.0, height = size.1, "playground started");

    let mut event_loop = EventLoop::new(input, Duration::from_millis(250));
    let result = event_loop.run(|_, event| {
        let now = Instant::now();
        match event {
            Some(event) => app.handle_terminal_event(event, now),
            None => {
                app.tick(now);
                output.draw(|frame| render::draw(frame, &app))?;
            }
        }
        if app.quit_requested() {
            return Ok(ControlFlow::Quit);
        }
        Ok(match app.next_wake(now) {
            Some(at) => ControlFlow::WaitUntil(at),
            None => ControlFlow::Continue,
        })
    });

    app.dispose();
    let _ = event_loop.driver().set_mouse_capture(false);
    output.exit()?;
    result
}
