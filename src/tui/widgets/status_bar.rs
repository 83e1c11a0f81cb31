use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::widgets::Paragraph;

use crate::Config;
use crate::tui::widgets::color::{get_contrast_text_color, parse_color};

const SEPARATOR: &str = " • ";
const ELLIPSIS: &str = "...";

/// Join as many hints as fit in `max_width`, ending with an ellipsis when some are left out
pub fn fit_hints(key_hints: &[String], max_width: usize) -> String {
    let mut text = String::new();
    for (i, hint) in key_hints.iter().enumerate() {
        let current = text.chars().count();
        let needed = if i == 0 {
            hint.chars().count()
        } else {
            current + SEPARATOR.chars().count() + hint.chars().count()
        };
        if needed > max_width {
            if text.is_empty() {
                text = hint.chars().take(max_width.saturating_sub(ELLIPSIS.len())).collect();
            } else if current + ELLIPSIS.len() > max_width {
                text = text.chars().take(max_width.saturating_sub(ELLIPSIS.len())).collect();
            }
            text.push_str(ELLIPSIS);
            break;
        }
        if i > 0 {
            text.push_str(SEPARATOR);
        }
        text.push_str(hint);
    }
    text
}

/// One line: the status message or key hints on the left, sync state on the right
pub fn render_status_bar(
    f: &mut Frame,
    area: Rect,
    message: Option<&String>,
    key_hints: &[String],
    sync_label: &str,
    config: &Config,
) {
    let active_theme = config.get_active_theme();
    let fg_color = parse_color(&active_theme.fg);
    let bg_color = parse_color(&active_theme.bg);
    let highlight_bg = parse_color(&active_theme.highlight_bg);

    let label = format!(" [{}]", sync_label);
    let [left, right] = Layout::horizontal([
        Constraint::Min(1),
        Constraint::Length(label.chars().count() as u16),
    ])
    .areas(area);
    let max_width = left.width as usize;

    let (content, style) = match message {
        Some(msg) => {
            let msg_fg = get_contrast_text_color(highlight_bg);
            let mut content = msg.clone();
            if content.chars().count() > max_width {
                content = content.chars().take(max_width.saturating_sub(ELLIPSIS.len())).collect::<String>() + ELLIPSIS;
            }
            (
                content,
                Style::default().fg(msg_fg).bg(highlight_bg).add_modifier(Modifier::BOLD),
            )
        }
        None => (fit_hints(key_hints, max_width), Style::default().fg(fg_color).bg(bg_color)),
    };

    f.render_widget(Paragraph::new(content).style(style), left);
    f.render_widget(
        Paragraph::new(label).style(Style::default().fg(fg_color).bg(bg_color).add_modifier(Modifier::DIM)),
        right,
    );
}
