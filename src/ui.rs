use crate::app::App;
use crate::braille::{BrailleCanvas, BLANK};
use crate::legend::LegendPanel;
use crate::map::palette::{bivariate_color, bivariate_grid, Rgb, OUTLINE};
use crate::map::MapLayers;
use crate::switcher::{RowKind, Switcher, SwitcherRow};
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Margin, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Widget},
    Frame,
};

const PANEL_MAX_WIDTH: u16 = 44;
const LEGEND_WIDTH: u16 = 30;
const CLOSE_BUTTON: &str = "[x]";

/// Where a click on the switcher landed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitcherHit {
    /// Tip or reopen button of a closed switcher
    Open,
    /// Close button of the checkbox tree
    Close,
    /// Index into `App::switcher_rows`
    Row(usize),
    /// Inside the panel but not on a row
    Panel,
}

/// Map, status bar and info line areas
fn layout(area: Rect) -> (Rect, Rect, Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),    // Map
            Constraint::Length(1), // Status bar
            Constraint::Length(1), // Active layer request
        ])
        .split(area);
    (chunks[0], chunks[1], chunks[2])
}

fn map_inner(area: Rect) -> Rect {
    layout(area).0.inner(Margin::new(1, 1))
}

/// Render the UI
pub fn render(frame: &mut Frame, app: &App) {
    let (map_area, status_area, info_area) = layout(frame.area());

    render_map(frame, app, map_area);
    let inner = map_inner(frame.area());
    render_legends(frame, app, inner);
    render_switcher(frame, app);
    render_status_bar(frame, app, status_area);
    render_info_line(frame, app, info_area);
}

fn render_map(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            " Germany Pollution Map ",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let mut viewport = app.viewport.clone();
    // Braille gives 2x4 resolution per character
    viewport.width = inner.width as usize * 2;
    viewport.height = inner.height as usize * 4;

    let layers = app.map_renderer.render(
        inner.width as usize,
        inner.height as usize,
        &viewport,
        app.base_visible(),
        app.visible_features(),
    );

    let cursor_pos = app.mouse_pixel_pos().and_then(|(px, py)| {
        let cx = (px / 2) as u16;
        let cy = (py / 4) as u16;
        (cx < inner.width && cy < inner.height).then_some((cx, cy))
    });

    frame.render_widget(MapWidget { layers, cursor_pos }, inner);
}

/// Choropleth fill underneath braille outlines
struct MapWidget {
    layers: MapLayers,
    cursor_pos: Option<(u16, u16)>,
}

impl MapWidget {
    fn render_layer(canvas: &BrailleCanvas, color: Color, area: Rect, buf: &mut Buffer) {
        for row in 0..canvas.height().min(area.height as usize) {
            for col in 0..canvas.width().min(area.width as usize) {
                let ch = canvas.glyph(col, row);
                if ch == BLANK {
                    continue;
                }
                buf[(area.x + col as u16, area.y + row as u16)]
                    .set_char(ch)
                    .set_fg(color);
            }
        }
    }
}

impl Widget for MapWidget {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // Fill first so outlines keep their background
        if !self.layers.fills.is_empty() {
            for row in 0..area.height {
                for col in 0..area.width {
                    if let Some(fill) = self.layers.fill_at(col as usize, row as usize) {
                        buf[(area.x + col, area.y + row)].set_bg(rgb(fill));
                    }
                }
            }
        }

        Self::render_layer(&self.layers.outlines, Color::Cyan, area, buf);
        Self::render_layer(&self.layers.states, Color::Yellow, area, buf);
        Self::render_layer(&self.layers.feature_edges, rgb(OUTLINE), area, buf);

        if let Some((cx, cy)) = self.cursor_pos {
            buf[(area.x + cx, area.y + cy)].set_char('╋').set_fg(Color::Red);
        }
    }
}

fn rgb((r, g, b): Rgb) -> Color {
    Color::Rgb(r, g, b)
}

/// Legend panels stack upwards from the bottom-left corner
fn render_legends(frame: &mut Frame, app: &App, inner: Rect) {
    let mut bottom = inner.y + inner.height;
    for panel in app.legends.visible_panels() {
        let body = legend_body(panel);
        let height = (body.len() as u16 + 2).min(bottom.saturating_sub(inner.y));
        let width = LEGEND_WIDTH.min(inner.width);
        if height < 3 || width < 4 {
            break;
        }
        bottom -= height;
        let rect = Rect::new(inner.x, bottom, width, height);

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Gray))
            .title(Span::styled(
                panel.title,
                Style::default().add_modifier(Modifier::BOLD),
            ));
        frame.render_widget(Clear, rect);
        frame.render_widget(Paragraph::new(body).block(block), rect);
    }
}

fn legend_body(panel: &LegendPanel) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    if panel.id == crate::legend::BIVARIATE_LEGEND_ID {
        // Highest first-variable quintile on top
        for classes in bivariate_grid().iter().rev() {
            let swatches: Vec<Span> = classes
                .iter()
                .map(|&class| {
                    Span::styled("   ", Style::default().bg(rgb(bivariate_color(Some(class)))))
                })
                .collect();
            lines.push(Line::from(swatches));
        }
    }
    if let Some(image) = &panel.image {
        let name = image
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        lines.push(Line::from(Span::styled(
            name,
            Style::default().fg(Color::DarkGray),
        )));
    }
    lines
}

/// Rect of the switcher panel, or of its button while closed
pub fn switcher_area(frame_area: Rect, app: &App) -> Rect {
    let inner = map_inner(frame_area);
    if app.switcher.is_open() {
        let content = app
            .switcher_rows
            .iter()
            .map(|row| row.depth as u16 * 2 + 4 + row.label.chars().count() as u16)
            .chain(std::iter::once(
                app.switcher.label().chars().count() as u16 + CLOSE_BUTTON.len() as u16 + 2,
            ))
            .max()
            .unwrap_or(0);
        let width = (content + 2).min(PANEL_MAX_WIDTH).min(inner.width);
        let height = (app.switcher_rows.len() as u16 + 2).min(inner.height);
        Rect::new(inner.x + inner.width - width, inner.y, width, height)
    } else {
        let width = (button_label(app).chars().count() as u16).min(inner.width);
        Rect::new(inner.x + inner.width - width, inner.y, width, 1.min(inner.height))
    }
}

fn button_label(app: &App) -> String {
    format!("[ {} ]", app.switcher.label())
}

/// Hit-test a click at terminal cell (`col`, `row`)
pub fn switcher_hit(frame_area: Rect, app: &App, col: u16, row: u16) -> Option<SwitcherHit> {
    let rect = switcher_area(frame_area, app);
    let inside = col >= rect.x && col < rect.x + rect.width && row >= rect.y && row < rect.y + rect.height;
    if !inside {
        return None;
    }
    if !app.switcher.is_open() {
        return Some(SwitcherHit::Open);
    }
    if row == rect.y {
        let close_start = rect.x + rect.width.saturating_sub(CLOSE_BUTTON.len() as u16 + 1);
        if app.switcher.is_fallback() && col >= close_start {
            return Some(SwitcherHit::Close);
        }
        return Some(SwitcherHit::Panel);
    }
    let idx = (row - rect.y - 1) as usize;
    Some(if idx < app.switcher_rows.len() {
        SwitcherHit::Row(idx)
    } else {
        SwitcherHit::Panel
    })
}

fn render_switcher(frame: &mut Frame, app: &App) {
    let rect = switcher_area(frame.area(), app);
    if rect.width == 0 || rect.height == 0 {
        return;
    }
    frame.render_widget(Clear, rect);

    if !app.switcher.is_open() {
        let button = Paragraph::new(Span::styled(
            button_label(app),
            Style::default().fg(Color::Black).bg(Color::Gray),
        ));
        frame.render_widget(button, rect);
        return;
    }

    let mut block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Gray))
        .title(Span::styled(
            app.switcher.label().to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        ));
    if let Switcher::Fallback(_) = app.switcher {
        block = block.title(Line::from(CLOSE_BUTTON).right_aligned());
    }

    let lines: Vec<Line> = app
        .switcher_rows
        .iter()
        .enumerate()
        .map(|(idx, row)| switcher_line(row, app.cursor == Some(idx)))
        .collect();
    frame.render_widget(Paragraph::new(lines).block(block), rect);
}

fn switcher_line(row: &SwitcherRow, selected: bool) -> Line<'static> {
    let indent = " ".repeat(row.depth * 2);
    let (marker, style) = match row.kind {
        RowKind::Group => ("", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
        RowKind::Layer { checked, radio: true, .. } => {
            (if checked { "(•) " } else { "( ) " }, Style::default())
        }
        RowKind::Layer { checked, .. } => (if checked { "[x] " } else { "[ ] " }, Style::default()),
    };
    let style = if selected {
        style.add_modifier(Modifier::REVERSED)
    } else {
        style
    };
    Line::from(Span::styled(format!("{indent}{marker}{}", row.label), style))
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let mut spans = vec![
        Span::styled(" Zoom: ", Style::default().fg(Color::DarkGray)),
        Span::styled(app.zoom_level(), Style::default().fg(Color::Yellow)),
        Span::styled(" | ", Style::default().fg(Color::DarkGray)),
    ];

    if let Some((label, cells)) = app.scale_label(12) {
        let bar = format!("├{}┤ ", "─".repeat(cells.saturating_sub(2) as usize));
        spans.push(Span::styled(bar, Style::default().fg(Color::White)));
        spans.push(Span::styled(label, Style::default().fg(Color::White)));
        spans.push(Span::styled(" | ", Style::default().fg(Color::DarkGray)));
    }

    spans.push(Span::styled(app.mouse_coordinate(), Style::default().fg(Color::Cyan)));
    spans.push(Span::styled(
        " | t:layers tab:select space:toggle r:reset q:quit",
        Style::default().fg(Color::DarkGray),
    ));

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_info_line(frame: &mut Frame, app: &App, area: Rect) {
    let mut spans = Vec::new();
    if app.has_pending_fetches() {
        spans.push(Span::styled(
            " loading features… ",
            Style::default().fg(Color::Yellow),
        ));
    }
    match app.active_request() {
        Some((title, url)) => {
            spans.push(Span::styled(
                format!(" {title}: "),
                Style::default().fg(Color::Green),
            ));
            spans.push(Span::styled(url, Style::default().fg(Color::DarkGray)));
        }
        None => spans.push(Span::styled(
            " no remote layer visible",
            Style::default().fg(Color::DarkGray),
        )),
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MapConfig;
    use std::time::Instant;

    fn app() -> App {
        let mut app = App::new(&MapConfig::default(), 100, 40, Instant::now()).unwrap();
        app.prepare_frame();
        app
    }

    #[test]
    fn test_closed_switcher_is_tip_button() {
        let app = app();
        let area = Rect::new(0, 0, 100, 40);
        let rect = switcher_area(area, &app);
        assert_eq!(rect.height, 1);
        assert_eq!(rect.x + rect.width, 99);
        assert_eq!(switcher_hit(area, &app, 98, 1), Some(SwitcherHit::Open));
        assert_eq!(switcher_hit(area, &app, 2, 1), None);
    }

    #[test]
    fn test_open_switcher_rows_are_hit() {
        let mut app = app();
        app.switcher.open();
        app.prepare_frame();
        let area = Rect::new(0, 0, 100, 40);
        let rect = switcher_area(area, &app);
        assert_eq!(rect.height, app.switcher_rows.len() as u16 + 2);
        assert_eq!(
            switcher_hit(area, &app, rect.x + 2, rect.y + 2),
            Some(SwitcherHit::Row(1))
        );
    }

    #[test]
    fn test_switcher_line_markers() {
        let row = SwitcherRow {
            depth: 1,
            label: "NO₂ AAD Map 2017-2021".to_string(),
            kind: RowKind::Layer {
                id: crate::layers::LayerId(4),
                checked: true,
                radio: false,
            },
        };
        let line = switcher_line(&row, false);
        assert_eq!(line.spans[0].content, "  [x] NO₂ AAD Map 2017-2021");
    }
}
