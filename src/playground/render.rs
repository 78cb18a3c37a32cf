use ratatui::Frame;
use ratatui::buffer::Buffer;
use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Line;
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

use crate::clipboard::Clipboard;
use crate::debug_log::global_debug_log;
use crate::page::{ElementId, MemoryPage, Page};
use crate::panel::PanelView;
use crate::settings::SettingsStore;
use crate::theme::{css_to_rgb, terminal_color};

use super::{LOG_ROWS, Playground, page_rows};

const WHITE: (u8, u8, u8) = (255, 255, 255);

pub fn draw<C: Clipboard, S: SettingsStore>(frame: &mut Frame<'_>, app: &Playground<C, S>) {
    let area = frame.area();
    let page_area = Rect {
        height: page_rows(area.height).min(area.height),
        ..area
    };
    let controller = app.controller();
    let page = controller.page();

    for id in page.element_ids() {
        draw_element(frame.buffer_mut(), page_area, page, id);
    }
    if let Some(view) = controller.view() {
        draw_panel(frame.buffer_mut(), page_area, page, &view, app);
    }

    let status_y = page_area.bottom();
    if status_y < area.bottom() {
        let status = format!(
            " panel: {} | {} | Tab next field  Ctrl+T toggle  Ctrl+Q quit",
            controller.mode().as_str(),
            if controller.enabled() { "on" } else { "off" },
        );
        let status_area = Rect {
            y: status_y,
            height: 1,
            ..area
        };
        frame.render_widget(
            Paragraph::new(status).style(Style::default().add_modifier(Modifier::REVERSED)),
            status_area,
        );
        let log_area = Rect {
            y: status_y + 1,
            height: area.bottom().saturating_sub(status_y + 1),
            ..area
        };
        if log_area.height > 0 {
            draw_log(frame, log_area);
        }
    }

    if let Some(message) = app.alert() {
        draw_alert(frame, page_area, message);
    }
}

fn cell_at(x: f64, y: f64, area: Rect) -> Option<(u16, u16)> {
    if x < 0.0 || y < 0.0 {
        return None;
    }
    let (x, y) = (x.floor() as u16, y.floor() as u16);
    (x >= area.left() && x < area.right() && y >= area.top() && y < area.bottom())
        .then_some((x, y))
}

fn put(buf: &mut Buffer, area: Rect, x: f64, y: f64, ch: char, style: Style) {
    if let Some(pos) = cell_at(x, y, area)
        && let Some(cell) = buf.cell_mut(pos)
    {
        cell.set_char(ch).set_style(style);
    }
}

fn draw_element(buf: &mut Buffer, area: Rect, page: &MemoryPage, id: ElementId) {
    let (Some(info), Some(text)) = (page.element(id), page.text(id)) else {
        return;
    };
    let field = info.is_editable_field();
    let mut base = Style::default();
    if field {
        base = base.bg(Color::DarkGray);
        if info.focused {
            base = base.add_modifier(Modifier::UNDERLINED);
        }
        for row in 0..info.rect.height as usize {
            for col in 0..info.rect.width as usize {
                let (x, y) = (info.rect.x + col as f64, info.rect.y + row as f64);
                put(buf, area, x, y, ' ', base);
            }
        }
    }

    let selected = page.selected_range(id);
    let caret = selected.filter(|(start, end)| info.focused && start == end);
    let highlight = base.add_modifier(Modifier::REVERSED);
    let (mut line, mut col) = (0usize, 0usize);
    let mut offset = 0usize;
    for ch in text.chars() {
        if ch == '\n' {
            if caret.is_some_and(|(at, _)| at == offset) {
                put_in_box(buf, area, &info.rect, col, line, ' ', highlight);
            }
            line += 1;
            col = 0;
            offset += 1;
            continue;
        }
        let in_selection = selected.is_some_and(|(s, e)| offset >= s && offset < e);
        let on_caret = caret.is_some_and(|(at, _)| at == offset);
        let style = if in_selection || on_caret { highlight } else { base };
        put_in_box(buf, area, &info.rect, col, line, ch, style);
        col += 1;
        offset += 1;
    }
    if caret.is_some_and(|(at, _)| at == offset) {
        put_in_box(buf, area, &info.rect, col, line, ' ', highlight);
    }
}

/// Draw one character of an element, clipped to the element's own box.
fn put_in_box(
    buf: &mut Buffer,
    area: Rect,
    rect: &crate::geometry::Rect,
    col: usize,
    line: usize,
    ch: char,
    style: Style,
) {
    if (col as f64) < rect.width && (line as f64) < rect.height {
        put(buf, area, rect.x + col as f64, rect.y + line as f64, ch, style);
    }
}

fn draw_panel<C: Clipboard, S: SettingsStore>(
    buf: &mut Buffer,
    area: Rect,
    page: &MemoryPage,
    view: &PanelView,
    app: &Playground<C, S>,
) {
    let palette = &view.palette;
    let base = css_to_rgb(&palette.bg_color, WHITE).unwrap_or(WHITE);
    let bg = terminal_color(&palette.bg_color, WHITE);
    let fg = terminal_color(&palette.text_color, base);
    let hover = terminal_color(&palette.hover_color, base);

    let mut left = view.position.x;
    for &button in &view.buttons {
        let width = page.measure_panel(&[button]).width;
        let style = Style::default()
            .fg(fg)
            .bg(if app.hover() == Some(button) { hover } else { bg });
        let label = format!("{:^w$}", button.to_string(), w = width as usize);
        for (idx, ch) in label.chars().enumerate() {
            put(buf, area, left + idx as f64, view.position.y, ch, style);
        }
        left += width;
    }
}

fn draw_log(frame: &mut Frame<'_>, area: Rect) {
    let lines: Vec<Line> = global_debug_log()
        .map(|log| log.tail(usize::from(LOG_ROWS)))
        .unwrap_or_default()
        .into_iter()
        .map(Line::from)
        .collect();
    let block = Block::default().borders(Borders::TOP).title(" log ");
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

/// Centered message box, dismissed by the next key or click.
fn draw_alert(frame: &mut Frame<'_>, area: Rect, message: &str) {
    let width = area.width.min(50).max(1);
    let height = area.height.min(5).max(1);
    let rect = Rect {
        x: area.x + area.width.saturating_sub(width) / 2,
        y: area.y + area.height.saturating_sub(height) / 2,
        width,
        height,
    };
    frame.render_widget(Clear, rect);
    let block = Block::default().title("Alert").borders(Borders::ALL);
    let paragraph = Paragraph::new(message)
        .block(block)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, rect);
}

#[cfg(test)]
mod tests {
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    use super::*;
    use crate::clipboard::MemoryClipboard;
    use crate::settings::{MemoryStore, StoredSettings};

    fn screen(app: &Playground<MemoryClipboard, MemoryStore>) -> String {
        let (width, height) = app.terminal_size();
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal.draw(|frame| draw(frame, app)).unwrap();
        let buffer = terminal.backend().buffer().clone();
        buffer
            .content()
            .chunks(usize::from(width))
            .map(|row| row.iter().map(|cell| cell.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn renders_page_and_status_line() {
        let app = Playground::new(
            MemoryClipboard::new(),
            MemoryStore::new(StoredSettings::default()),
            (80, 30),
        );
        let text = screen(&app);
        assert!(text.contains("Drag across this paragraph"));
        assert!(text.contains("hello world"));
        assert!(text.contains("panel: none | on"));
    }

    #[test]
    fn cells_outside_the_area_are_skipped() {
        let area = Rect::new(0, 0, 10, 5);
        assert_eq!(cell_at(3.0, 4.0, area), Some((3, 4)));
        assert_eq!(cell_at(10.0, 0.0, area), None);
        assert_eq!(cell_at(-1.0, 0.0, area), None);
    }
}
