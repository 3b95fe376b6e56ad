use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph},
    Frame,
};

use crate::app::App;
use crate::data::Atlas;
use crate::ui::{dropdown_offset, dropdown_rect};

pub const PLACEHOLDER: &str = "Seleccione Municipio";

fn frame_block(title: &str) -> Block<'_> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Gray))
        .title(Span::styled(title, Style::default().fg(Color::DarkGray)))
        .style(Style::default().bg(Color::White).fg(Color::Black))
}

pub fn render(frame: &mut Frame, app: &App, atlas: &Atlas, inner: Rect) {
    let entries = atlas.attributes.len() + 1;
    let area = dropdown_rect(inner, app.dropdown.open, entries);
    if area.height < 3 {
        return;
    }
    frame.render_widget(Clear, area);

    if !app.dropdown.open {
        let text = match app.selection.current() {
            Some(name) => Span::styled(name, Style::default().add_modifier(Modifier::BOLD)),
            None => Span::styled(PLACEHOLDER, Style::default().fg(Color::DarkGray)),
        };
        let line = Line::from(vec![Span::raw("▾ "), text]);
        frame.render_widget(Paragraph::new(line).block(frame_block(" Tab ")), area);
        return;
    }

    let current = app.selection.current();
    let placeholder = ListItem::new(Span::styled(
        PLACEHOLDER,
        Style::default()
            .fg(Color::DarkGray)
            .add_modifier(Modifier::ITALIC),
    ));
    let items: Vec<ListItem> = std::iter::once(placeholder)
        .chain(atlas.attributes.names().map(|name| {
            let style = if Some(name) == current {
                Style::default().add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            ListItem::new(Span::styled(name, style))
        }))
        .collect();

    let visible = area.height.saturating_sub(2) as usize;
    let mut state = ListState::default()
        .with_offset(dropdown_offset(app.dropdown.cursor, visible))
        .with_selected(Some(app.dropdown.cursor));

    let list = List::new(items)
        .block(frame_block(" Municipio "))
        .highlight_style(
            Style::default()
                .bg(Color::Rgb(99, 102, 106))
                .fg(Color::White),
        )
        .highlight_symbol("› ");

    frame.render_stateful_widget(list, area, &mut state);
}
