use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};

use crate::board::{DayBucket, Section};
use crate::models::{Category, Task};
use crate::tui::app::App;
use crate::tui::widgets::color::{get_contrast_text_color, parse_color};
use crate::tui::widgets::truncate;
use crate::utils::format_day_label;

const MIN_DAY_WIDTH: u16 = 24;

struct Palette {
    fg: Color,
    bg: Color,
    highlight_fg: Color,
    highlight_bg: Color,
    overdue: Color,
}

/// First visible day and how many fit, keeping the cursor's day in view
pub fn visible_days(total: usize, cursor_day: usize, width: u16) -> (usize, usize) {
    let fit = usize::from((width / MIN_DAY_WIDTH).max(1));
    let count = fit.min(total.max(1));
    let first = if cursor_day < count { 0 } else { cursor_day + 1 - count };
    (first, count)
}

pub fn render_board(f: &mut Frame, area: Rect, app: &App) {
    let active_theme = app.config.get_active_theme();
    let highlight_bg = parse_color(&active_theme.highlight_bg);
    let palette = Palette {
        fg: parse_color(&active_theme.fg),
        bg: parse_color(&active_theme.bg),
        highlight_fg: get_contrast_text_color(highlight_bg),
        highlight_bg,
        overdue: parse_color(&active_theme.overdue),
    };

    let buckets = app.board.buckets();
    if buckets.is_empty() {
        let empty = Paragraph::new("No days to show")
            .block(Block::default().borders(Borders::ALL).title("Board"))
            .style(Style::default().fg(palette.fg).bg(palette.bg));
        f.render_widget(empty, area);
        return;
    }

    let (first, count) = visible_days(buckets.len(), app.cursor.day, area.width);
    let columns = Layout::horizontal(vec![Constraint::Ratio(1, count as u32); count]).split(area);
    for (offset, column_area) in columns.iter().enumerate() {
        let day = first + offset;
        if let Some(bucket) = buckets.get(day) {
            render_day(f, *column_area, app, day, bucket, &palette);
        }
    }
}

fn render_day(f: &mut Frame, area: Rect, app: &App, day: usize, bucket: &DayBucket, palette: &Palette) {
    let border_style = if app.cursor.day == day {
        Style::default().fg(palette.highlight_bg).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(palette.fg)
    };
    let title = format_day_label(bucket.date, app.board.today());
    let block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .border_style(border_style)
        .style(Style::default().fg(palette.fg).bg(palette.bg));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let halves = Layout::vertical([Constraint::Percentage(50), Constraint::Percentage(50)]).split(inner);
    for (category, half) in Category::ALL.iter().zip(halves.iter()) {
        render_category(f, *half, app, day, bucket, *category, palette);
    }
}

fn render_category(
    f: &mut Frame,
    area: Rect,
    app: &App,
    day: usize,
    bucket: &DayBucket,
    category: Category,
    palette: &Palette,
) {
    let column = bucket.column(category);
    let entries = column.entries();
    let active = app.cursor.day == day && app.cursor.category == category;
    let held = app.picked.as_ref();
    let width = area.width as usize;

    let title_style = if active {
        Style::default().fg(palette.highlight_bg).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(palette.fg)
    };
    let block = Block::default()
        .borders(Borders::TOP)
        .title(format!("{} ({})", category.label(), column.len()))
        .title_style(title_style);
    let inner = block.inner(area);
    f.render_widget(block, area);

    let drop_marker = || {
        Line::from(Span::styled(
            truncate("▸ drop here", width),
            Style::default().fg(palette.highlight_bg).add_modifier(Modifier::BOLD),
        ))
    };

    let mut lines: Vec<Line> = Vec::new();
    let mut cursor_line = None;
    let mut last_section = None;
    for (index, (section, task)) in entries.iter().enumerate() {
        if active && held.is_some() && index == app.cursor.index {
            cursor_line = Some(lines.len());
            lines.push(drop_marker());
        }
        if last_section != Some(*section) {
            lines.push(section_header(*section, width, palette));
            last_section = Some(*section);
        }
        let selected = active && held.is_none() && index == app.cursor.index;
        if selected {
            cursor_line = Some(lines.len());
        }
        let is_held = held.is_some_and(|p| p.task_id == task.id);
        lines.push(task_line(task, *section, selected, is_held, width, palette));
    }
    if active && held.is_some() && app.cursor.index >= entries.len() {
        cursor_line = Some(lines.len());
        lines.push(drop_marker());
    }
    if lines.is_empty() {
        lines.push(Line::from(Span::styled(
            "  nothing planned",
            Style::default().fg(palette.fg).add_modifier(Modifier::DIM),
        )));
    }

    let height = inner.height as usize;
    let skip = cursor_line
        .map(|line| (line + 1).saturating_sub(height))
        .unwrap_or(0);
    let paragraph = Paragraph::new(lines)
        .style(Style::default().fg(palette.fg).bg(palette.bg))
        .scroll((skip as u16, 0));
    f.render_widget(paragraph, inner);
}

fn section_header(section: Section, width: usize, palette: &Palette) -> Line<'static> {
    let style = match section {
        Section::Overdue => Style::default().fg(palette.overdue).add_modifier(Modifier::BOLD),
        _ => Style::default().fg(palette.fg).add_modifier(Modifier::DIM),
    };
    Line::from(Span::styled(truncate(&format!("─ {}", section.label()), width), style))
}

fn task_line(
    task: &Task,
    section: Section,
    selected: bool,
    held: bool,
    width: usize,
    palette: &Palette,
) -> Line<'static> {
    let checkbox = if task.completed { "[x] " } else { "[ ] " };
    let prefix = if held { "» " } else { "" };
    let progress = match task.subtask_progress() {
        (_, 0) => String::new(),
        (done, total) => format!(" {}/{}", done, total),
    };
    let room = width.saturating_sub(prefix.chars().count() + checkbox.len() + progress.len());
    let text = format!("{}{}{}{}", prefix, checkbox, truncate(&task.text, room), progress);

    let mut style = Style::default().fg(palette.fg).bg(palette.bg);
    if section == Section::Overdue {
        style = style.fg(palette.overdue);
    }
    if task.completed {
        style = style.add_modifier(Modifier::CROSSED_OUT | Modifier::DIM);
    }
    if held {
        style = style.add_modifier(Modifier::ITALIC);
    }
    if selected {
        style = style.fg(palette.highlight_fg).bg(palette.highlight_bg);
    }
    Line::from(Span::styled(text, style))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_days_fit_on_wide_terminals() {
        assert_eq!(visible_days(7, 3, 200), (0, 7));
    }

    #[test]
    fn narrow_terminals_scroll_to_the_cursor() {
        assert_eq!(visible_days(7, 0, 50), (0, 2));
        assert_eq!(visible_days(7, 5, 50), (4, 2));
        assert_eq!(visible_days(7, 6, 10), (6, 1));
    }
}
