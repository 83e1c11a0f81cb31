use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{
    Block, Borders, List, ListItem, ListState, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState,
};
use ratskin::RatSkin;
use std::cmp;
use termimad::minimad::Text as MinimadText;

use crate::models::StickyNote;
use crate::tui::app::App;
use crate::tui::widgets::color::{get_contrast_text_color, parse_color};
use crate::tui::widgets::truncate;

/// Markdown shown in the note pane: the title as a heading, then the body
pub fn note_markdown(note: &StickyNote, category: Option<&str>) -> String {
    let mut content = format!("# {}\n", note.title);
    if let Some(name) = category {
        content.push_str(&format!("*{}*\n", name));
    }
    content.push('\n');
    if note.content.trim().is_empty() {
        content.push_str("*Empty note. Press Enter to write.*\n");
    } else {
        content.push_str(&note.content);
        content.push('\n');
    }
    content
}

/// Parse markdown with ratskin and convert it to owned ratatui lines
fn markdown_lines(markdown: &str, width: u16) -> Vec<Line<'static>> {
    let parsed = RatSkin::default().parse(MinimadText::from(markdown), width);
    parsed
        .into_iter()
        .map(|line| {
            let spans: Vec<Span<'static>> = line
                .spans
                .into_iter()
                .map(|span| Span::styled(span.content.to_string(), span.style))
                .collect();
            Line::from(spans)
        })
        .collect()
}

pub fn render_notes(f: &mut Frame, area: Rect, app: &App) {
    let [list_area, view_area] =
        Layout::horizontal([Constraint::Percentage(35), Constraint::Percentage(65)]).areas(area);
    render_note_list(f, list_area, app);
    render_note_view(f, view_area, app);
}

fn render_note_list(f: &mut Frame, area: Rect, app: &App) {
    let active_theme = app.config.get_active_theme();
    let fg_color = parse_color(&active_theme.fg);
    let bg_color = parse_color(&active_theme.bg);
    let highlight_bg = parse_color(&active_theme.highlight_bg);
    let highlight_fg = get_contrast_text_color(highlight_bg);
    let max_width = area.width.saturating_sub(4) as usize;

    let notes = app.visible_notes();
    let items: Vec<ListItem> = notes
        .iter()
        .map(|note| {
            let pin = if note.pinned { "* " } else { "  " };
            let swatch = Span::styled("■ ", Style::default().fg(parse_color(&note.color)));
            let title = truncate(&note.title, max_width.saturating_sub(4));
            let title_style = if note.pinned {
                Style::default().add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            ListItem::new(Line::from(vec![
                Span::raw(pin),
                swatch,
                Span::styled(title, title_style),
            ]))
        })
        .collect();

    let title = format!("Notes: {} ({})", app.filter_label(), notes.len());
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(title))
        .style(Style::default().fg(fg_color).bg(bg_color))
        .highlight_style(Style::default().fg(highlight_fg).bg(highlight_bg));

    let selected = if notes.is_empty() { None } else { Some(app.notes.selected) };
    let mut list_state = ListState::default().with_selected(selected);
    f.render_stateful_widget(list, area, &mut list_state);
}

fn render_note_view(f: &mut Frame, area: Rect, app: &App) {
    if area.width < 2 || area.height < 2 {
        return;
    }
    let active_theme = app.config.get_active_theme();
    let fg_color = parse_color(&active_theme.fg);

    let Some(note) = app.selected_note() else {
        let paragraph = Paragraph::new("No notes yet. Press n to add one.")
            .block(Block::default().borders(Borders::ALL).title("Note"))
            .style(Style::default().fg(fg_color));
        f.render_widget(paragraph, area);
        return;
    };

    let [content_area, scrollbar_area] =
        Layout::horizontal([Constraint::Min(1), Constraint::Length(1)]).areas(area);
    let viewport_height = content_area.height.saturating_sub(2) as usize;
    let text_width = content_area.width.saturating_sub(2);

    let category = app.note_category(note).map(|c| c.name.as_str());
    let lines = markdown_lines(&note_markdown(note, category), text_width);
    let total_lines = lines.len();

    let max_scroll = total_lines.saturating_sub(viewport_height);
    let scroll_offset = cmp::min(app.notes.scroll, max_scroll);
    let end_line = cmp::min(scroll_offset + viewport_height, total_lines);
    let visible = if scroll_offset < total_lines {
        Text::from(lines[scroll_offset..end_line].to_vec())
    } else {
        Text::default()
    };

    // The note's own colour marks the border
    let border_style = Style::default().fg(parse_color(&note.color));
    let paragraph = Paragraph::new(visible)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border_style)
                .title("Note"),
        )
        .style(Style::default().fg(fg_color))
        .wrap(ratatui::widgets::Wrap { trim: false });
    f.render_widget(paragraph, content_area);

    if total_lines > viewport_height {
        let scrollbar_inner_area = Rect::new(
            scrollbar_area.x,
            content_area.y + 1,
            scrollbar_area.width,
            content_area.height.saturating_sub(2),
        );
        let mut scrollbar_state = ScrollbarState::new(total_lines)
            .viewport_content_length(viewport_height)
            .position(scroll_offset);
        let scrollbar = Scrollbar::default()
            .orientation(ScrollbarOrientation::VerticalRight)
            .begin_symbol(Some("↑"))
            .end_symbol(Some("↓"))
            .track_symbol(Some("│"))
            .thumb_symbol("█");
        f.render_stateful_widget(scrollbar, scrollbar_inner_area, &mut scrollbar_state);
    }
}
