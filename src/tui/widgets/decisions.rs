use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};

use crate::models::Quadrant;
use crate::tui::app::App;
use crate::tui::widgets::color::{get_contrast_text_color, parse_color};
use crate::tui::widgets::truncate;

fn subtitle(quadrant: Quadrant) -> &'static str {
    match quadrant {
        Quadrant::Do => "urgent, important",
        Quadrant::Schedule => "important",
        Quadrant::Delegate => "urgent",
        Quadrant::Eliminate => "neither",
    }
}

/// Eisenhower grid: Do and Schedule on top, Delegate and Eliminate below
pub fn render_decisions(f: &mut Frame, area: Rect, app: &App) {
    let rows = Layout::vertical([Constraint::Percentage(50), Constraint::Percentage(50)]).split(area);
    for (row, row_area) in rows.iter().enumerate() {
        let cells = Layout::horizontal([Constraint::Percentage(50), Constraint::Percentage(50)]).split(*row_area);
        for (col, cell) in cells.iter().enumerate() {
            let index = row * 2 + col;
            render_quadrant(f, *cell, app, index);
        }
    }
}

fn render_quadrant(f: &mut Frame, area: Rect, app: &App, index: usize) {
    let active_theme = app.config.get_active_theme();
    let fg_color = parse_color(&active_theme.fg);
    let bg_color = parse_color(&active_theme.bg);
    let highlight_bg = parse_color(&active_theme.highlight_bg);
    let highlight_fg = get_contrast_text_color(highlight_bg);

    let quadrant = Quadrant::ALL[index];
    let active = app.decisions.quadrant == index;
    let entries = app.decisions_in(quadrant);
    let width = area.width.saturating_sub(2) as usize;

    let mut lines: Vec<Line> = Vec::new();
    let mut selected_line = None;
    for (i, entry) in entries.iter().enumerate() {
        let selected = active && i == app.decisions.selected;
        let style = if selected {
            Style::default().fg(highlight_fg).bg(highlight_bg)
        } else {
            Style::default().fg(fg_color).bg(bg_color)
        };
        if selected {
            selected_line = Some(lines.len());
        }
        let date = entry.decided_on.format("%m-%d").to_string();
        let title = truncate(&entry.title, width.saturating_sub(date.len() + 1));
        lines.push(Line::from(vec![
            Span::styled(format!("{} ", date), style.add_modifier(Modifier::DIM)),
            Span::styled(title, style),
        ]));
        if !entry.notes.trim().is_empty() {
            lines.push(Line::from(Span::styled(
                truncate(&format!("  {}", entry.notes.trim()), width),
                Style::default().fg(fg_color).add_modifier(Modifier::ITALIC | Modifier::DIM),
            )));
        }
    }
    if lines.is_empty() {
        lines.push(Line::from(Span::styled(
            "empty",
            Style::default().fg(fg_color).add_modifier(Modifier::DIM),
        )));
    }

    let border_style = if active {
        Style::default().fg(highlight_bg).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(fg_color)
    };
    let height = area.height.saturating_sub(2) as usize;
    let skip = selected_line
        .map(|line| (line + 1).saturating_sub(height))
        .unwrap_or(0);
    let title = format!("{} ({}) - {}", quadrant.label(), entries.len(), subtitle(quadrant));
    let paragraph = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border_style)
                .title(title),
        )
        .style(Style::default().fg(fg_color).bg(bg_color))
        .scroll((skip as u16, 0));
    f.render_widget(paragraph, area);
}
