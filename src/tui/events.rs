use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode, size as terminal_size,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::Rect;
use std::io;
use std::time::{Duration, Instant};

use crate::models::Sender;
use crate::tui::app::{Mode, Tab};
use crate::tui::error::TuiError;
use crate::tui::layout::Layout;
use crate::tui::App;
use crate::tui::widgets::input::Input;
use crate::utils::has_primary_modifier;

/// Restores the terminal when dropped, including while unwinding from a panic
struct TerminalGuard {
    raw_mode_enabled: bool,
    alternate_screen_enabled: bool,
}

impl TerminalGuard {
    fn new() -> Result<Self, TuiError> {
        enable_raw_mode()?;
        execute!(io::stdout(), EnterAlternateScreen)?;
        Ok(Self {
            raw_mode_enabled: true,
            alternate_screen_enabled: true,
        })
    }

    /// Restore on normal exit; the drop afterwards does nothing
    fn restore(&mut self) -> Result<(), TuiError> {
        if self.raw_mode_enabled {
            disable_raw_mode()?;
            self.raw_mode_enabled = false;
        }
        if self.alternate_screen_enabled {
            execute!(io::stdout(), LeaveAlternateScreen)?;
            self.alternate_screen_enabled = false;
        }
        Ok(())
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        // Already cleaning up, errors have nowhere to go
        if self.raw_mode_enabled {
            let _ = disable_raw_mode();
        }
        if self.alternate_screen_enabled {
            let _ = execute!(io::stdout(), LeaveAlternateScreen);
        }
    }
}

pub fn run_event_loop(mut app: App) -> Result<(), TuiError> {
    // Checked before entering the alternate screen so the message stays readable
    let (width, height) = terminal_size()?;
    let min_width = Layout::MIN_WIDTH + 2;
    let min_height = Layout::MIN_HEIGHT + 2;
    if width < min_width || height < min_height {
        return Err(TuiError::RenderError(format!(
            "Terminal size too small. Current: {}x{}, Minimum required: {}x{}. Please resize your terminal window.",
            width, height, min_width, min_height
        )));
    }

    let mut guard = TerminalGuard::new()?;
    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)?;

    loop {
        app.check_status_message_timeout();
        app.tick(Instant::now());

        let size = terminal.size()?;
        let layout = Layout::calculate(Rect::new(0, 0, size.width, size.height));
        terminal.draw(|f| crate::tui::render::render(f, &app, &layout))?;

        if event::poll(Duration::from_millis(16))? {
            // Press only: Windows also reports releases
            if let Event::Key(key_event) = event::read()? {
                if key_event.kind == KeyEventKind::Press && handle_key_event(&mut app, key_event)? {
                    break;
                }
            }
        }
    }

    let report = app.shutdown();
    tracing::info!(pushed = report.pushed, failed = report.failed, "tui closed");
    guard.restore()?;
    Ok(())
}

/// Returns true when the user asked to quit
pub fn handle_key_event(app: &mut App, key_event: KeyEvent) -> Result<bool, TuiError> {
    handle_key_event_at(app, key_event, Instant::now())
}

pub fn handle_key_event_at(app: &mut App, key_event: KeyEvent, now: Instant) -> Result<bool, TuiError> {
    let result = match app.mode {
        Mode::Help => {
            handle_help(app, key_event);
            Ok(false)
        }
        Mode::Input => handle_input(app, key_event).map(|_| false),
        Mode::ConfirmDelete => handle_confirm(app, key_event).map(|_| false),
        Mode::TaskDetail => handle_detail(app, key_event, now).map(|_| false),
        Mode::View => handle_view(app, key_event, now),
    };

    match result {
        Err(TuiError::IoError(e)) => Err(TuiError::IoError(e)),
        Err(e) => {
            // Failed actions are reported in place; the UI keeps running
            tracing::warn!(error = %e, "action failed");
            app.set_status_message(format!("Error: {}", e));
            Ok(false)
        }
        ok => ok,
    }
}

fn handle_help(app: &mut App, key_event: KeyEvent) {
    let keys = &app.keys;
    if key_event.code == KeyCode::Esc
        || keys.help.matches(key_event.code, key_event.modifiers)
        || keys.quit.matches(key_event.code, key_event.modifiers)
    {
        app.exit_help_mode();
    }
}

/// Apply an editing key to a text field
fn edit_input(input: &mut Input, key_event: KeyEvent) {
    match key_event.code {
        KeyCode::Enter => input.insert_char('\n'),
        KeyCode::Backspace => input.delete_char(),
        KeyCode::Delete => input.delete_forward(),
        KeyCode::Left => input.move_left(),
        KeyCode::Right => input.move_right(),
        KeyCode::Home => input.move_home(),
        KeyCode::End => input.move_end(),
        KeyCode::Tab => input.insert_char(' '),
        KeyCode::Char(c) if !has_primary_modifier(key_event.modifiers) => input.insert_char(c),
        _ => {}
    }
}

fn handle_input(app: &mut App, key_event: KeyEvent) -> Result<(), TuiError> {
    if app.keys.save.matches(key_event.code, key_event.modifiers) {
        return app.submit_input();
    }
    let multiline = app.input.as_ref().is_some_and(|s| s.input.multiline);
    match key_event.code {
        KeyCode::Esc => app.cancel_input(),
        KeyCode::Enter if !multiline => return app.submit_input(),
        _ => {
            if let Some(state) = app.input.as_mut() {
                edit_input(&mut state.input, key_event);
            }
        }
    }
    Ok(())
}

fn handle_confirm(app: &mut App, key_event: KeyEvent) -> Result<(), TuiError> {
    let keys = &app.keys;
    let (code, modifiers) = (key_event.code, key_event.modifiers);
    if matches!(code, KeyCode::Up | KeyCode::Down)
        || keys.list_up.matches(code, modifiers)
        || keys.list_down.matches(code, modifiers)
    {
        app.toggle_confirm_selection();
        return Ok(());
    }
    match code {
        KeyCode::Enter => app.confirm_selected(),
        KeyCode::Esc => {
            app.cancel_confirm();
            Ok(())
        }
        _ => Ok(()),
    }
}

fn handle_detail(app: &mut App, key_event: KeyEvent, now: Instant) -> Result<(), TuiError> {
    let keys = app.keys.clone();
    let (code, modifiers) = (key_event.code, key_event.modifiers);

    if code == KeyCode::Esc || keys.quit.matches(code, modifiers) {
        app.close_detail();
    } else if code == KeyCode::Up || keys.list_up.matches(code, modifiers) {
        app.detail_up();
    } else if code == KeyCode::Down || keys.list_down.matches(code, modifiers) {
        app.detail_down();
    } else if keys.toggle_completion.matches(code, modifiers) {
        app.detail_toggle_subtask()?;
    } else if keys.add_subtask.matches(code, modifiers) || keys.new.matches(code, modifiers) {
        app.detail_add_subtask();
    } else if keys.delete.matches(code, modifiers) {
        app.request_delete_subtask();
    } else if keys.edit.matches(code, modifiers) {
        app.detail_edit_task();
    } else if keys.select.matches(code, modifiers) {
        app.detail_toggle_task(now);
    }
    Ok(())
}

fn handle_view(app: &mut App, key_event: KeyEvent, now: Instant) -> Result<bool, TuiError> {
    let keys = app.keys.clone();
    let (code, modifiers) = (key_event.code, key_event.modifiers);

    if keys.quit.matches(code, modifiers) {
        return Ok(true);
    }
    if keys.help.matches(code, modifiers) {
        app.enter_help_mode();
        return Ok(false);
    }
    if keys.refresh.matches(code, modifiers) {
        app.reload()?;
        return Ok(false);
    }

    let tab = if keys.tab_next.matches(code, modifiers) {
        Some(app.current_tab.next())
    } else if keys.tab_prev.matches(code, modifiers) {
        Some(app.current_tab.prev())
    } else if keys.tab_1.matches(code, modifiers) {
        Some(Tab::Board)
    } else if keys.tab_2.matches(code, modifiers) {
        Some(Tab::Notes)
    } else if keys.tab_3.matches(code, modifiers) {
        Some(Tab::Decisions)
    } else if keys.tab_4.matches(code, modifiers) {
        Some(Tab::AlterEgos)
    } else {
        None
    };
    if let Some(tab) = tab {
        app.cancel_pick_up();
        app.switch_tab(tab);
        return Ok(false);
    }

    match app.current_tab {
        Tab::Board => handle_board(app, key_event, now)?,
        Tab::Notes => handle_notes(app, key_event)?,
        Tab::Decisions => handle_decisions(app, key_event),
        Tab::AlterEgos => handle_alter_egos(app, key_event)?,
    }
    Ok(false)
}

fn handle_board(app: &mut App, key_event: KeyEvent, now: Instant) -> Result<(), TuiError> {
    let keys = app.keys.clone();
    let (code, modifiers) = (key_event.code, key_event.modifiers);

    if code == KeyCode::Up || keys.list_up.matches(code, modifiers) {
        app.board_up();
    } else if code == KeyCode::Down || keys.list_down.matches(code, modifiers) {
        app.board_down();
    } else if code == KeyCode::Left || keys.day_left.matches(code, modifiers) {
        app.board_left();
    } else if code == KeyCode::Right || keys.day_right.matches(code, modifiers) {
        app.board_right();
    } else if keys.switch_category.matches(code, modifiers) {
        app.switch_board_category();
    } else if code == KeyCode::Esc {
        app.cancel_pick_up();
    } else if keys.pick_up.matches(code, modifiers) {
        app.pick_up_or_drop(now);
    } else if keys.select.matches(code, modifiers) {
        if app.picked.is_some() {
            app.drop_task(now);
        } else {
            app.open_detail(now);
        }
    } else if app.picked.is_some() {
        // Holding a task: everything else waits for the drop
    } else if keys.toggle_completion.matches(code, modifiers) {
        app.toggle_selected_completion(now);
    } else if keys.new.matches(code, modifiers) {
        app.start_new_task();
    } else if keys.edit.matches(code, modifiers) {
        app.start_edit_task();
    } else if keys.delete.matches(code, modifiers) {
        app.request_delete_task();
    }
    Ok(())
}

fn handle_notes(app: &mut App, key_event: KeyEvent) -> Result<(), TuiError> {
    let keys = app.keys.clone();
    let (code, modifiers) = (key_event.code, key_event.modifiers);

    if code == KeyCode::Up || keys.list_up.matches(code, modifiers) {
        app.notes_up();
    } else if code == KeyCode::Down || keys.list_down.matches(code, modifiers) {
        app.notes_down();
    } else if code == KeyCode::PageUp {
        app.scroll_note(false);
    } else if code == KeyCode::PageDown {
        app.scroll_note(true);
    } else if keys.switch_category.matches(code, modifiers) {
        app.cycle_note_filter();
    } else if keys.new.matches(code, modifiers) {
        app.start_new_note();
    } else if keys.select.matches(code, modifiers) {
        app.start_edit_note_content();
    } else if keys.edit.matches(code, modifiers) {
        app.start_edit_note_title();
    } else if keys.toggle_completion.matches(code, modifiers) {
        app.toggle_note_pin()?;
    } else if keys.cycle_color.matches(code, modifiers) {
        app.cycle_note_color()?;
    } else if keys.copy.matches(code, modifiers) {
        app.copy_selected_note();
    } else if keys.delete.matches(code, modifiers) {
        app.request_delete_note();
    }
    Ok(())
}

fn handle_decisions(app: &mut App, key_event: KeyEvent) {
    let keys = app.keys.clone();
    let (code, modifiers) = (key_event.code, key_event.modifiers);

    if code == KeyCode::Up || keys.list_up.matches(code, modifiers) {
        app.decisions_up();
    } else if code == KeyCode::Down || keys.list_down.matches(code, modifiers) {
        app.decisions_down();
    } else if code == KeyCode::Left || keys.day_left.matches(code, modifiers) {
        app.decisions_left();
    } else if code == KeyCode::Right || keys.day_right.matches(code, modifiers) {
        app.decisions_right();
    } else if keys.switch_category.matches(code, modifiers) {
        app.next_quadrant();
    } else if keys.new.matches(code, modifiers) {
        app.start_new_decision();
    } else if keys.edit.matches(code, modifiers) || keys.select.matches(code, modifiers) {
        app.start_edit_decision();
    } else if keys.delete.matches(code, modifiers) {
        app.request_delete_decision();
    }
}

fn handle_alter_egos(app: &mut App, key_event: KeyEvent) -> Result<(), TuiError> {
    let keys = app.keys.clone();
    let (code, modifiers) = (key_event.code, key_event.modifiers);

    if code == KeyCode::Up || keys.list_up.matches(code, modifiers) {
        app.alter_egos_up()?;
    } else if code == KeyCode::Down || keys.list_down.matches(code, modifiers) {
        app.alter_egos_down()?;
    } else if keys.new.matches(code, modifiers) {
        app.start_new_alter_ego();
    } else if keys.write_as_me.matches(code, modifiers) || keys.select.matches(code, modifiers) {
        app.start_chat_message(Sender::Me);
    } else if keys.write_as_alter_ego.matches(code, modifiers) {
        app.start_chat_message(Sender::AlterEgo);
    } else if keys.delete.matches(code, modifiers) {
        app.request_delete_alter_ego();
    }
    Ok(())
}
