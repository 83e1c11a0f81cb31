use ratatui::Frame;
use ratatui::layout::{Alignment, Rect};
use ratatui::style::Style;
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

use crate::Config;
use crate::tui::widgets::color::parse_color;
use crate::tui::widgets::popup_area;
use crate::utils::format_key_binding_for_display as key;

pub fn render_help(f: &mut Frame, area: Rect, config: &Config) {
    let active_theme = config.get_active_theme();
    let fg_color = parse_color(&active_theme.fg);
    let bg_color = parse_color(&active_theme.bg);

    let popup_area = popup_area(area, 60, 80);
    f.render_widget(Clear, popup_area);

    let paragraph = Paragraph::new(build_help_text(config))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Help - Key Bindings")
                .title_alignment(Alignment::Center)
                .style(Style::default().fg(fg_color).bg(bg_color)),
        )
        .style(Style::default().fg(fg_color).bg(bg_color))
        .wrap(ratatui::widgets::Wrap { trim: true });

    f.render_widget(paragraph, popup_area);
}

pub fn build_help_text(config: &Config) -> String {
    let kb = &config.key_bindings;
    let mut text = String::new();

    text.push_str("Navigation:\n");
    text.push_str(&format!("  {} / {}: Previous / next tab\n", key(&kb.tab_prev), key(&kb.tab_next)));
    text.push_str(&format!(
        "  {} / {} / {} / {}: Jump to tab\n",
        key(&kb.tab_1),
        key(&kb.tab_2),
        key(&kb.tab_3),
        key(&kb.tab_4)
    ));
    text.push_str(&format!("  {} / {}: Up / down\n", key(&kb.list_up), key(&kb.list_down)));
    text.push_str(&format!("  {} / {}: Previous / next day\n", key(&kb.day_left), key(&kb.day_right)));
    text.push_str(&format!("  {}: Work / Personal, note category, quadrant\n", key(&kb.switch_category)));
    text.push('\n');

    text.push_str("Board:\n");
    text.push_str(&format!("  {}: New task in the selected slot\n", key(&kb.new)));
    text.push_str(&format!("  {}: Complete / reopen\n", key(&kb.toggle_completion)));
    text.push_str(&format!("  {}: Pick up, then drop at the cursor\n", key(&kb.pick_up)));
    text.push_str(&format!("  {}: Task details and subtasks\n", key(&kb.select)));
    text.push_str(&format!("  {}: Add subtask (details)\n", key(&kb.add_subtask)));
    text.push_str(&format!("  {} / {}: Edit / delete\n", key(&kb.edit), key(&kb.delete)));
    text.push_str("  Esc: Cancel a move\n");
    text.push('\n');

    text.push_str("Notes:\n");
    text.push_str(&format!("  {}: Write content (markdown)\n", key(&kb.select)));
    text.push_str(&format!("  {}: Pin / unpin\n", key(&kb.toggle_completion)));
    text.push_str(&format!("  {}: Change colour\n", key(&kb.cycle_color)));
    text.push_str(&format!("  {}: Copy to clipboard\n", key(&kb.copy)));
    text.push_str("  PageUp / PageDown: Scroll note\n");
    text.push('\n');

    text.push_str("Alter Egos:\n");
    text.push_str(&format!("  {}: Write as yourself\n", key(&kb.write_as_me)));
    text.push_str(&format!("  {}: Write as the alter ego\n", key(&kb.write_as_alter_ego)));
    text.push('\n');

    text.push_str("General:\n");
    text.push_str(&format!("  {}: Save multi-line text\n", key(&kb.save)));
    text.push_str(&format!("  {}: Reload from storage\n", key(&kb.refresh)));
    text.push_str(&format!("  {}: Show/hide help\n", key(&kb.help)));
    text.push_str(&format!("  {}: Quit\n", key(&kb.quit)));

    text
}
