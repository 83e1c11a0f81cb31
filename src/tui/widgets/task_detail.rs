use chrono::NaiveDate;
use ratatui::Frame;
use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

use crate::Config;
use crate::models::Task;
use crate::tui::widgets::color::{get_contrast_text_color, parse_color};
use crate::tui::widgets::popup_area;

fn date_or_dash(date: Option<NaiveDate>) -> String {
    date.map(|d| d.to_string()).unwrap_or_else(|| "-".to_string())
}

/// Task popup with its dates and a selectable subtask checklist
pub fn render_task_detail(f: &mut Frame, area: Rect, task: &Task, selected: usize, config: &Config) {
    let active_theme = config.get_active_theme();
    let fg_color = parse_color(&active_theme.fg);
    let bg_color = parse_color(&active_theme.bg);
    let highlight_bg = parse_color(&active_theme.highlight_bg);
    let highlight_fg = get_contrast_text_color(highlight_bg);
    let base = Style::default().fg(fg_color).bg(bg_color);
    let label = base.add_modifier(Modifier::BOLD);

    let popup_area = popup_area(area, 60, 70);
    f.render_widget(Clear, popup_area);

    let status = if task.completed { "Completed" } else { "Open" };
    let mut lines = vec![
        Line::from(vec![Span::styled("Category: ", label), Span::styled(task.category.label(), base)]),
        Line::from(vec![Span::styled("Status: ", label), Span::styled(status, base)]),
        Line::from(vec![
            Span::styled("Start: ", label),
            Span::styled(date_or_dash(task.start_date), base),
            Span::styled("   Due: ", label),
            Span::styled(date_or_dash(task.due_date), base),
        ]),
    ];
    if let Some(done_on) = task.completion_date {
        lines.push(Line::from(vec![
            Span::styled("Completed on: ", label),
            Span::styled(done_on.to_string(), base),
        ]));
    }
    lines.push(Line::from(""));

    let (done, total) = task.subtask_progress();
    lines.push(Line::from(Span::styled(format!("Subtasks ({}/{})", done, total), label)));
    if task.subtasks.is_empty() {
        lines.push(Line::from(Span::styled("  none yet", base.add_modifier(Modifier::DIM))));
    }
    for (index, subtask) in task.subtasks.iter().enumerate() {
        let is_selected = index == selected;
        let prefix = if is_selected { "> " } else { "  " };
        let checkbox = if subtask.completed { "[x] " } else { "[ ] " };
        let mut style = if is_selected {
            Style::default().fg(highlight_fg).bg(highlight_bg)
        } else {
            base
        };
        if subtask.completed {
            style = style.add_modifier(Modifier::CROSSED_OUT);
        }
        lines.push(Line::from(Span::styled(
            format!("{}{}{}", prefix, checkbox, subtask.text),
            style,
        )));
    }

    let paragraph = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(task.text.clone())
                .title_alignment(Alignment::Center)
                .style(base),
        )
        .style(base)
        .wrap(ratatui::widgets::Wrap { trim: false });

    f.render_widget(paragraph, popup_area);
}
