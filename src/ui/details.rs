use ratatui::{
    layout::{Constraint, Rect},
    style::{Color, Modifier, Style},
    text::Span,
    widgets::{Block, Borders, Cell, Clear, Row, Table},
    Frame,
};

use crate::data::MunicipalityAttributes;

const PANEL_BG: Color = Color::Rgb(17, 24, 39);
const RULE: Color = Color::Rgb(55, 65, 81);

/// Label/value rows of the panel
fn rows(details: &MunicipalityAttributes) -> [(&'static str, String); 7] {
    [
        ("Región:", details.region.clone()),
        ("Cabecera:", details.seat_name.clone()),
        ("Población Masculina:", format_count(details.population_male)),
        ("Población Femenina:", format_count(details.population_female)),
        ("Edad media (Hombres):", format_decimal(details.avg_age_male)),
        ("Edad media (Mujeres):", format_decimal(details.avg_age_female)),
        ("Viviendas habitadas:", format_count(details.occupied_dwellings)),
    ]
}

pub fn render(frame: &mut Frame, details: &MunicipalityAttributes, area: Rect) {
    let label_style = Style::default().fg(Color::White).add_modifier(Modifier::BOLD);
    let value_style = Style::default().fg(Color::White);

    let table_rows = rows(details)
        .into_iter()
        .map(|(label, value)| {
            Row::new([
                Cell::from(Span::styled(label, label_style)),
                Cell::from(Span::styled(value, value_style)),
            ])
        });

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(RULE))
        .title(Span::styled(
            format!(" {} ", details.identifier),
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        ))
        .style(Style::default().bg(PANEL_BG));

    let table = Table::new(table_rows, [Constraint::Length(22), Constraint::Min(8)])
        .column_spacing(1)
        .block(block);

    frame.render_widget(Clear, area);
    frame.render_widget(table, area);
}

/// Integer with comma thousands separators
pub fn format_count(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Grouped integer part and at most three decimals, trailing zeros dropped
pub fn format_decimal(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    let sign = if value < 0.0 { "-" } else { "" };
    let scaled = (value.abs() * 1000.0).round() as u64;
    let whole = format_count(scaled / 1000);
    let frac = scaled % 1000;
    if frac == 0 {
        format!("{sign}{whole}")
    } else {
        let frac = format!("{frac:03}");
        format!("{sign}{whole}.{}", frac.trim_end_matches('0'))
    }
}
