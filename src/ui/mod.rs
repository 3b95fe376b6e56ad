mod details;
mod dropdown;

pub use details::{format_count, format_decimal};

use crate::app::{App, LoadStatus};
use crate::data::Atlas;
use crate::map::MapLayers;
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Layout, Position, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget, Wrap},
    Frame,
};

const DROPDOWN_WIDTH: u16 = 34;
const DETAILS_WIDTH: u16 = 46;
const DETAILS_HEIGHT: u16 = 9;

/// Basemap line colour
const BASEMAP_COLOR: Color = Color::Rgb(190, 190, 186);

/// Map area and status bar
fn split(screen: Rect) -> [Rect; 2] {
    Layout::vertical([
        Constraint::Min(3),    // Map
        Constraint::Length(1), // Status bar
    ])
    .areas(screen)
}

fn map_block() -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
}

/// Cells available to the map inside its border
pub fn map_inner(screen: Rect) -> Rect {
    let [map, _] = split(screen);
    map_block().inner(map)
}

/// Municipality picker, anchored top-left of the map
pub fn dropdown_rect(inner: Rect, open: bool, entries: usize) -> Rect {
    let width = DROPDOWN_WIDTH.min(inner.width.saturating_sub(2));
    let height = if open {
        let wanted = (entries.min(u16::MAX as usize) as u16).saturating_add(2);
        wanted.min(inner.height.saturating_sub(2)).max(3)
    } else {
        3
    };
    Rect::new(inner.x + 1, inner.y + 1, width, height).intersection(inner)
}

/// First list entry shown when `cursor` must stay visible in `visible` rows
pub fn dropdown_offset(cursor: usize, visible: usize) -> usize {
    (cursor + 1).saturating_sub(visible)
}

/// Entry index under `point` in the open dropdown
pub fn dropdown_entry_at(list: Rect, point: Position, cursor: usize, entries: usize) -> Option<usize> {
    let visible = list.height.saturating_sub(2) as usize;
    if visible == 0 || !list.contains(point) {
        return None;
    }
    // Border rows
    if point.y == list.y || point.y + 1 >= list.bottom() {
        return None;
    }
    let entry = dropdown_offset(cursor, visible) + (point.y - list.y - 1) as usize;
    (entry < entries).then_some(entry)
}

/// Details panel, anchored bottom-right of the map
pub fn details_rect(inner: Rect) -> Rect {
    let width = DETAILS_WIDTH.min(inner.width);
    let height = DETAILS_HEIGHT.min(inner.height);
    let x = inner.right().saturating_sub(width + 1).max(inner.x);
    let y = inner.bottom().saturating_sub(height + 1).max(inner.y);
    Rect::new(x, y, width, height)
}

/// Render the UI
pub fn render(frame: &mut Frame, app: &App) {
    let [map_area, status_area] = split(frame.area());

    match &app.status {
        LoadStatus::Pending => render_loading(frame, map_area),
        LoadStatus::Failed(message) => render_failed(frame, map_area, message),
        LoadStatus::Ready(atlas) => {
            let inner = render_map(frame, app, atlas, map_area);
            dropdown::render(frame, app, atlas, inner);
            if let Some(details) = app.selected_details() {
                details::render(frame, details, details_rect(inner));
            }
        }
    }

    render_status_bar(frame, app, status_area);
}

fn render_loading(frame: &mut Frame, area: Rect) {
    let block = map_block().title(Span::styled(
        " Municipios ",
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
    ));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let [_, middle, _] = Layout::vertical([
        Constraint::Fill(1),
        Constraint::Length(1),
        Constraint::Fill(1),
    ])
    .areas(inner);
    frame.render_widget(
        Paragraph::new("Cargando municipios…")
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::Gray)),
        middle,
    );
}

fn render_failed(frame: &mut Frame, area: Rect, message: &str) {
    let block = map_block().title(Span::styled(
        " Error al cargar datos ",
        Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
    ));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let text = vec![
        Line::from(Span::styled(message.to_string(), Style::default().fg(Color::Red))),
        Line::from(""),
        Line::from(Span::styled(
            "R: reintentar  q: salir",
            Style::default().fg(Color::DarkGray),
        )),
    ];
    frame.render_widget(
        Paragraph::new(text)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true }),
        inner,
    );
}

/// Draw the choropleth; returns the inner map area
fn render_map(frame: &mut Frame, app: &App, atlas: &Atlas, area: Rect) -> Rect {
    let block = map_block()
        .title(Span::styled(
            " Municipios ",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ))
        .title_bottom(
            Line::from(Span::styled(
                format!(" {} ", app.attribution),
                Style::default().fg(Color::DarkGray),
            ))
            .right_aligned(),
        );

    let inner = block.inner(area);
    frame.render_widget(block, area);

    // Braille gives 2x4 resolution per character
    let mut viewport = app.viewport.clone();
    viewport.width = inner.width as usize * 2;
    viewport.height = inner.height as usize * 4;

    let layers = app.map_renderer.render_cached(
        &atlas.boundaries,
        &atlas.basemap,
        app.selection.current(),
        &viewport,
        inner.width as usize,
        inner.height as usize,
    );

    let cursor_pos = app.mouse_pos.filter(|&(col, row)| inner.contains(Position::new(col, row)));

    frame.render_widget(
        MapWidget {
            layers: &layers,
            line_color: app.map_renderer.palette.line.to_color(),
            cursor_pos,
        },
        inner,
    );

    inner
}

/// Cell-filled choropleth with Braille outlines and labels on top
struct MapWidget<'a> {
    layers: &'a MapLayers,
    line_color: Color,
    cursor_pos: Option<(u16, u16)>,
}

impl Widget for MapWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let rows = (area.height as usize).min(self.layers.rows);
        let cols = (area.width as usize).min(self.layers.cols);

        for row in 0..rows {
            let y = area.y + row as u16;
            for col in 0..cols {
                let x = area.x + col as u16;
                let Some(fill) = self.layers.fill_at(col, row) else {
                    continue;
                };
                let cell = &mut buf[(x, y)];
                cell.set_bg(fill.to_color());

                if let Some(glyph) = self.layers.outlines.glyph(col, row) {
                    cell.set_char(glyph).set_fg(self.line_color);
                } else if let Some(glyph) = self.layers.basemap.glyph(col, row) {
                    cell.set_char(glyph).set_fg(BASEMAP_COLOR);
                } else {
                    cell.set_char(' ');
                }
            }
        }

        let label_style = Style::default().fg(Color::Black).add_modifier(Modifier::BOLD);
        for (lx, ly, text) in &self.layers.labels {
            if *ly >= area.height || *lx >= area.width {
                continue;
            }
            let y = area.y + *ly;
            let max_len = area.width.saturating_sub(*lx) as usize;
            for (i, ch) in text.chars().take(max_len).enumerate() {
                let x = area.x + *lx + i as u16;
                buf[(x, y)].set_char(ch).set_style(label_style);
            }
        }

        if let Some((x, y)) = self.cursor_pos {
            buf[(x, y)].set_char('╋').set_fg(Color::Red);
        }
    }
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let selection = app.selection.current().unwrap_or("-").to_string();

    let mut spans = vec![
        Span::styled(" Municipio: ", Style::default().fg(Color::DarkGray)),
        Span::styled(selection, Style::default().fg(Color::Yellow)),
        Span::styled(" | ", Style::default().fg(Color::DarkGray)),
        Span::styled(app.zoom_level(), Style::default().fg(Color::Magenta)),
        Span::styled(" | ", Style::default().fg(Color::DarkGray)),
        Span::styled(app.center_coords(), Style::default().fg(Color::Cyan)),
    ];

    let hints = match app.status {
        LoadStatus::Pending => " | q:quit",
        LoadStatus::Failed(_) => " | R:retry q:quit",
        LoadStatus::Ready(_) if app.dropdown.open => " | ↑↓:move a-z:jump Enter:select Esc:close",
        LoadStatus::Ready(_) => " | Tab:municipio hjkl:pan +/-:zoom f:fit r:reset q:quit",
    };
    spans.push(Span::styled(hints, Style::default().fg(Color::DarkGray)));

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::data::{AttributeTable, DataError, MunicipalityAttributes};
    use crate::map::{BoundaryLayer, MunicipalityGeometry, Polygon};
    use ratatui::{backend::TestBackend, Terminal};

    fn atlas() -> Atlas {
        let attributes = AttributeTable::from_rows(vec![MunicipalityAttributes {
            id: Some(106),
            identifier: "Toluca".to_string(),
            region: "XIII Toluca".to_string(),
            seat_name: "Toluca de Lerdo".to_string(),
            population_male: 438_375,
            population_female: 472_233,
            avg_age_male: 30.25,
            avg_age_female: 31.4,
            occupied_dwellings: 242_000,
        }])
        .unwrap();
        let ring = vec![
            (-99.75, 19.25),
            (-99.55, 19.25),
            (-99.55, 19.45),
            (-99.75, 19.45),
            (-99.75, 19.25),
        ];
        let boundaries = BoundaryLayer::new(vec![MunicipalityGeometry::new(
            "Toluca",
            vec![Polygon::new(ring, Vec::new())],
        )]);
        Atlas::new(attributes, boundaries, Vec::new()).unwrap()
    }

    fn draw(app: &App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|frame| render(frame, app)).unwrap();
        let buffer = terminal.backend().buffer();
        let width = buffer.area.width as usize;
        buffer
            .content()
            .chunks(width)
            .map(|row| row.iter().map(|cell| cell.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_loading_view() {
        let app = App::new(&AppConfig::default(), 100, 30);
        let text = draw(&app);
        assert!(text.contains("Cargando municipios"));
        assert!(!text.contains("Región:"));
    }

    #[test]
    fn test_failed_view_shows_message() {
        let mut app = App::new(&AppConfig::default(), 100, 30);
        app.finish_loading(Err(DataError::EmptyAttributeTable));
        let text = draw(&app);
        assert!(text.contains("attribute table is empty"));
        assert!(!text.contains("Cargando"));
    }

    #[test]
    fn test_details_panel_for_selection() {
        let mut app = App::new(&AppConfig::default(), 100, 30);
        app.finish_loading(Ok(atlas()));
        let text = draw(&app);
        assert!(text.contains("Región:"));
        assert!(text.contains("XIII Toluca"));
        assert!(text.contains("Toluca de Lerdo"));
        assert!(text.contains("438,375"));
        assert!(text.contains("30.25"));
        assert!(text.contains("242,000"));
    }

    #[test]
    fn test_no_details_without_selection() {
        let mut app = App::new(&AppConfig::default(), 100, 30);
        app.finish_loading(Ok(atlas()));
        app.select(None);
        let text = draw(&app);
        assert!(!text.contains("Región:"));
        assert!(text.contains("Seleccione Municipio"));
    }

    #[test]
    fn test_no_details_for_unknown_selection() {
        let mut app = App::new(&AppConfig::default(), 100, 30);
        app.finish_loading(Ok(atlas()));
        app.select(Some("Atlantis".to_string()));
        let text = draw(&app);
        assert!(!text.contains("Región:"));
        assert!(text.contains("Atlantis"));
    }

    #[test]
    fn test_status_bar_tracks_state() {
        let mut app = App::new(&AppConfig::default(), 100, 30);
        let text = draw(&app);
        let status = text.lines().last().unwrap_or_default().to_string();
        assert!(status.contains("Municipio: Toluca"));
        assert!(status.contains("q:quit"));
        assert!(!status.contains("Tab:municipio"));

        app.finish_loading(Ok(atlas()));
        let text = draw(&app);
        let status = text.lines().last().unwrap_or_default().to_string();
        assert!(status.contains("z8.0"));
        assert!(status.contains("19.356°N, 99.645°W"));
        assert!(status.contains("Tab:municipio"));

        app.zoom_in();
        app.open_dropdown();
        app.select(None);
        let text = draw(&app);
        let status = text.lines().last().unwrap_or_default().to_string();
        assert!(status.contains("Municipio: -"));
        assert!(status.contains("z8.5"));
        assert!(status.contains("Enter:select"));
    }

    #[test]
    fn test_layout_rects_stay_inside_map() {
        let inner = map_inner(Rect::new(0, 0, 100, 30));
        assert_eq!(inner, Rect::new(1, 1, 98, 27));
        let details = details_rect(inner);
        assert_eq!(inner.intersection(details), details);
        let dropdown = dropdown_rect(inner, true, 500);
        assert_eq!(dropdown.height, 25);
        assert_eq!(inner.intersection(dropdown), dropdown);
    }

    #[test]
    fn test_dropdown_entry_at_scrolls_with_cursor() {
        let list = Rect::new(2, 2, 30, 7); // 5 visible rows
        assert_eq!(dropdown_entry_at(list, Position::new(5, 3), 0, 20), Some(0));
        assert_eq!(dropdown_entry_at(list, Position::new(5, 7), 0, 20), Some(4));
        // Cursor at 9 scrolls so it is the last visible row
        assert_eq!(dropdown_entry_at(list, Position::new(5, 7), 9, 20), Some(9));
        assert_eq!(dropdown_entry_at(list, Position::new(5, 2), 0, 20), None);
        assert_eq!(dropdown_entry_at(list, Position::new(5, 8), 0, 20), None);
        assert_eq!(dropdown_entry_at(list, Position::new(5, 6), 0, 3), None);
    }
}
