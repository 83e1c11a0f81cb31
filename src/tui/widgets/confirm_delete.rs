use ratatui::Frame;
use ratatui::layout::{Alignment, Rect};
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

use crate::Config;
use crate::tui::app::{CONFIRM_OPTIONS, ConfirmState, DeleteTarget};
use crate::tui::widgets::color::{get_contrast_text_color, parse_color};
use crate::tui::widgets::popup_area;

fn kind(target: &DeleteTarget) -> &'static str {
    match target {
        DeleteTarget::Task { .. } => "task",
        DeleteTarget::Subtask { .. } => "subtask",
        DeleteTarget::Note { .. } => "note",
        DeleteTarget::Decision { .. } => "decision",
        DeleteTarget::AlterEgo { .. } => "alter ego and all of its chats",
    }
}

pub fn render_confirm_delete(f: &mut Frame, area: Rect, confirm: &ConfirmState, config: &Config) {
    let active_theme = config.get_active_theme();
    let fg_color = parse_color(&active_theme.fg);
    let bg_color = parse_color(&active_theme.bg);
    let highlight_bg = parse_color(&active_theme.highlight_bg);
    let highlight_fg = get_contrast_text_color(highlight_bg);
    let base = Style::default().fg(fg_color).bg(bg_color);

    let popup_area = popup_area(area, 50, 35);
    f.render_widget(Clear, popup_area);

    let mut lines = vec![
        Line::from(Span::styled(format!("Delete this {}?", kind(&confirm.target)), base)),
        Line::from(""),
        Line::from(Span::styled(confirm.label.clone(), base)),
        Line::from(""),
    ];

    for (index, option) in CONFIRM_OPTIONS.iter().enumerate() {
        let is_selected = index == confirm.selection;
        let prefix = if is_selected { "> " } else { "  " };
        let style = if is_selected {
            Style::default().fg(highlight_fg).bg(highlight_bg)
        } else {
            base
        };
        lines.push(Line::from(Span::styled(format!("{}{}", prefix, option), style)));
    }

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "Use ↑↓ to navigate, Enter to confirm, Esc to cancel",
        base,
    )));

    let paragraph = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Confirm Delete")
                .title_alignment(Alignment::Center)
                .style(base),
        )
        .style(base)
        .wrap(ratatui::widgets::Wrap { trim: true })
        .alignment(Alignment::Center);

    f.render_widget(paragraph, popup_area);
}
