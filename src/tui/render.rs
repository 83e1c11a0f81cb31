use ratatui::Frame;
use ratatui::layout::Alignment;
use ratatui::style::Style;
use ratatui::widgets::{Block, Borders};

use crate::tui::app::{Mode, Tab};
use crate::tui::widgets::{
    alter_egos::render_alter_egos, board::render_board, color::parse_color,
    confirm_delete::render_confirm_delete, decisions::render_decisions, help::render_help,
    input::render_input, notes::render_notes, status_bar::render_status_bar, tabs::render_tabs,
    task_detail::render_task_detail,
};
use crate::tui::{App, Layout};

pub fn render(f: &mut Frame, app: &App, layout: &Layout) {
    let active_theme = app.config.get_active_theme();
    let fg_color = parse_color(&active_theme.fg);
    let bg_color = parse_color(&active_theme.bg);
    let outer_block = Block::default()
        .borders(Borders::ALL)
        .title("Dayboard")
        .title_alignment(Alignment::Center)
        .style(Style::default().fg(fg_color).bg(bg_color));
    f.render_widget(outer_block, f.area());

    render_tabs(f, layout.tabs_area, app.current_tab, &app.config);

    match app.current_tab {
        Tab::Board => render_board(f, layout.main_area, app),
        Tab::Notes => render_notes(f, layout.main_area, app),
        Tab::Decisions => render_decisions(f, layout.main_area, app),
        Tab::AlterEgos => render_alter_egos(f, layout.main_area, app),
    }

    // The detail popup stays visible under its own prompts and confirmations
    let detail_visible = match app.mode {
        Mode::TaskDetail => true,
        Mode::Input => app.input.as_ref().is_some_and(|s| s.return_mode == Mode::TaskDetail),
        Mode::ConfirmDelete => app.confirm.as_ref().is_some_and(|c| c.return_mode == Mode::TaskDetail),
        _ => false,
    };
    if detail_visible {
        if let (Some(task), Some(detail)) = (app.detail_task(), app.detail.as_ref()) {
            render_task_detail(f, layout.main_area, task, detail.selected, &app.config);
        }
    }

    match app.mode {
        Mode::Help => render_help(f, layout.inner_area, &app.config),
        Mode::Input => {
            if let Some(state) = app.input.as_ref() {
                render_input(f, layout.main_area, &state.purpose.title(), &state.input, &app.config);
            }
        }
        Mode::ConfirmDelete => {
            if let Some(confirm) = app.confirm.as_ref() {
                render_confirm_delete(f, layout.main_area, confirm, &app.config);
            }
        }
        Mode::View | Mode::TaskDetail => {}
    }

    let hints = app.key_hints();
    render_status_bar(
        f,
        layout.status_area,
        app.status.message.as_ref(),
        &hints,
        &app.sync_label(),
        &app.config,
    );
}
