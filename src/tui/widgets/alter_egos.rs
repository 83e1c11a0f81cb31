use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap};

use crate::models::{AlterEgo, Chat, Sender};
use crate::tui::app::App;
use crate::tui::widgets::color::{get_contrast_text_color, parse_color};

/// Rows a line of `len` characters takes when wrapped at `width`
fn wrapped_rows(len: usize, width: usize) -> usize {
    if width == 0 {
        return 1;
    }
    len.div_ceil(width).max(1)
}

/// Scroll offset that keeps the newest message in view
pub fn transcript_scroll(chat: &Chat, ego_name: &str, width: usize, height: usize) -> usize {
    let rows: usize = chat
        .messages
        .iter()
        .map(|m| {
            let speaker = match m.sender {
                Sender::Me => "You".len(),
                Sender::AlterEgo => ego_name.chars().count(),
            };
            wrapped_rows(speaker + 2 + m.text.chars().count(), width)
        })
        .sum();
    rows.saturating_sub(height)
}

pub fn render_alter_egos(f: &mut Frame, area: Rect, app: &App) {
    let [list_area, chat_area] =
        Layout::horizontal([Constraint::Percentage(30), Constraint::Percentage(70)]).areas(area);
    render_ego_list(f, list_area, app);

    match app.selected_alter_ego() {
        Some(ego) => render_chat(f, chat_area, app, ego),
        None => {
            let fg_color = parse_color(&app.config.get_active_theme().fg);
            let paragraph = Paragraph::new("No alter egos yet. Press n to create one.")
                .block(Block::default().borders(Borders::ALL).title("Chat"))
                .style(Style::default().fg(fg_color));
            f.render_widget(paragraph, chat_area);
        }
    }
}

fn render_ego_list(f: &mut Frame, area: Rect, app: &App) {
    let active_theme = app.config.get_active_theme();
    let fg_color = parse_color(&active_theme.fg);
    let bg_color = parse_color(&active_theme.bg);
    let highlight_bg = parse_color(&active_theme.highlight_bg);
    let highlight_fg = get_contrast_text_color(highlight_bg);

    let items: Vec<ListItem> = app
        .alter_egos
        .egos
        .iter()
        .map(|ego| ListItem::new(ego.name.clone()))
        .collect();
    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("Alter Egos ({})", app.alter_egos.egos.len())),
        )
        .style(Style::default().fg(fg_color).bg(bg_color))
        .highlight_style(Style::default().fg(highlight_fg).bg(highlight_bg));

    let selected = if app.alter_egos.egos.is_empty() {
        None
    } else {
        Some(app.alter_egos.selected)
    };
    let mut list_state = ListState::default().with_selected(selected);
    f.render_stateful_widget(list, area, &mut list_state);
}

fn render_chat(f: &mut Frame, area: Rect, app: &App, ego: &AlterEgo) {
    let active_theme = app.config.get_active_theme();
    let fg_color = parse_color(&active_theme.fg);
    let bg_color = parse_color(&active_theme.bg);
    let accent = parse_color(&active_theme.highlight_bg);
    let base = Style::default().fg(fg_color).bg(bg_color);

    let mut header = Vec::new();
    if !ego.description.trim().is_empty() {
        header.push(Line::from(Span::styled(ego.description.clone(), base.add_modifier(Modifier::ITALIC))));
    }
    if !ego.traits.is_empty() {
        header.push(Line::from(Span::styled(
            format!("Traits: {}", ego.traits.join(", ")),
            base.add_modifier(Modifier::DIM),
        )));
    }
    let header_height = if header.is_empty() { 0 } else { header.len() as u16 + 2 };
    let [header_area, transcript_area] =
        Layout::vertical([Constraint::Length(header_height), Constraint::Min(1)]).areas(area);
    if !header.is_empty() {
        let paragraph = Paragraph::new(header)
            .block(Block::default().borders(Borders::ALL).title(ego.name.clone()))
            .style(base)
            .wrap(Wrap { trim: true });
        f.render_widget(paragraph, header_area);
    }

    let chat = app.current_chat();
    let title = match chat {
        Some(chat) => format!("Chat: {}", chat.title),
        None => format!("Chat with {}", ego.name),
    };
    let block = Block::default().borders(Borders::ALL).title(title).style(base);
    let inner = block.inner(transcript_area);

    let lines: Vec<Line> = match chat {
        Some(chat) if !chat.messages.is_empty() => chat
            .messages
            .iter()
            .map(|message| {
                let (speaker, style) = match message.sender {
                    Sender::Me => ("You".to_string(), base.add_modifier(Modifier::BOLD)),
                    Sender::AlterEgo => (ego.name.clone(), Style::default().fg(accent).add_modifier(Modifier::BOLD)),
                };
                Line::from(vec![
                    Span::styled(format!("{}: ", speaker), style),
                    Span::styled(message.text.clone(), base),
                ])
            })
            .collect(),
        _ => vec![Line::from(Span::styled(
            "Start the conversation: write as yourself or as them.",
            base.add_modifier(Modifier::DIM),
        ))],
    };

    let scroll = chat
        .map(|c| transcript_scroll(c, &ego.name, inner.width as usize, inner.height as usize))
        .unwrap_or(0);
    let paragraph = Paragraph::new(lines)
        .block(block)
        .style(base)
        .wrap(Wrap { trim: false })
        .scroll((scroll as u16, 0));
    f.render_widget(paragraph, transcript_area);
}
