use ratatui::Frame;
use ratatui::layout::{Alignment, Position, Rect};
use ratatui::style::Style;
use ratatui::text::Line;
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use std::cmp;

use crate::Config;
use crate::tui::widgets::color::parse_color;
use crate::tui::widgets::popup_area;

/// Text field used by every prompt. Single-line fields submit on Enter;
/// multi-line fields take Enter as a newline and submit on the save binding.
#[derive(Debug, Clone, Default)]
pub struct Input {
    chars: Vec<char>,
    cursor: usize,
    pub multiline: bool,
}

impl Input {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn multiline() -> Self {
        Self {
            multiline: true,
            ..Self::default()
        }
    }

    /// Prefilled field with the cursor at the end
    pub fn from_string(content: &str, multiline: bool) -> Self {
        let chars: Vec<char> = content.chars().collect();
        let cursor = chars.len();
        Self {
            chars,
            cursor,
            multiline,
        }
    }

    pub fn value(&self) -> String {
        self.chars.iter().collect()
    }

    pub fn is_blank(&self) -> bool {
        self.chars.iter().all(|c| c.is_whitespace())
    }

    pub fn insert_char(&mut self, ch: char) {
        if ch == '\n' && !self.multiline {
            return;
        }
        let at = cmp::min(self.cursor, self.chars.len());
        self.chars.insert(at, ch);
        self.cursor = at + 1;
    }

    /// Backspace
    pub fn delete_char(&mut self) {
        if self.cursor > 0 && self.cursor <= self.chars.len() {
            self.chars.remove(self.cursor - 1);
            self.cursor -= 1;
        }
    }

    pub fn delete_forward(&mut self) {
        if self.cursor < self.chars.len() {
            self.chars.remove(self.cursor);
        }
    }

    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        self.cursor = cmp::min(self.cursor + 1, self.chars.len());
    }

    /// Start of the current line
    pub fn move_home(&mut self) {
        while self.cursor > 0 && self.chars[self.cursor - 1] != '\n' {
            self.cursor -= 1;
        }
    }

    /// End of the current line
    pub fn move_end(&mut self) {
        while self.cursor < self.chars.len() && self.chars[self.cursor] != '\n' {
            self.cursor += 1;
        }
    }

    /// Cursor as (line, column), both zero-based
    pub fn cursor_line_col(&self) -> (usize, usize) {
        let before = &self.chars[..cmp::min(self.cursor, self.chars.len())];
        let line = before.iter().filter(|c| **c == '\n').count();
        let col = before.iter().rev().take_while(|c| **c != '\n').count();
        (line, col)
    }
}

/// Render a prompt popup with the field and place the terminal cursor in it
pub fn render_input(f: &mut Frame, area: Rect, title: &str, input: &Input, config: &Config) {
    let active_theme = config.get_active_theme();
    let fg_color = parse_color(&active_theme.fg);
    let bg_color = parse_color(&active_theme.bg);

    let popup = if input.multiline {
        popup_area(area, 70, 60)
    } else {
        let [row] = ratatui::layout::Layout::vertical([ratatui::layout::Constraint::Length(3)])
            .flex(ratatui::layout::Flex::Center)
            .areas(area);
        let [row] = ratatui::layout::Layout::horizontal([ratatui::layout::Constraint::Percentage(60)])
            .flex(ratatui::layout::Flex::Center)
            .areas(row);
        row
    };
    f.render_widget(Clear, popup);

    let inner_height = popup.height.saturating_sub(2) as usize;
    let inner_width = popup.width.saturating_sub(2) as usize;
    let (line, col) = input.cursor_line_col();
    let scroll_y = line.saturating_sub(inner_height.saturating_sub(1));
    let scroll_x = col.saturating_sub(inner_width.saturating_sub(1));

    let value = input.value();
    let lines: Vec<Line> = value
        .split('\n')
        .skip(scroll_y)
        .take(inner_height.max(1))
        .map(|l| Line::from(l.chars().skip(scroll_x).collect::<String>()))
        .collect();

    let paragraph = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title.to_string())
                .title_alignment(Alignment::Left)
                .style(Style::default().fg(fg_color).bg(bg_color)),
        )
        .style(Style::default().fg(fg_color).bg(bg_color));
    f.render_widget(paragraph, popup);

    let x = popup.x + 1 + (col - scroll_x) as u16;
    let y = popup.y + 1 + (line - scroll_y) as u16;
    f.set_cursor_position(Position::new(x, y));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edits_at_cursor() {
        let mut input = Input::from_string("helo", false);
        input.move_left();
        input.insert_char('l');
        assert_eq!(input.value(), "hello");
        input.move_home();
        input.delete_forward();
        assert_eq!(input.value(), "ello");
        input.move_end();
        input.delete_char();
        assert_eq!(input.value(), "ell");
    }

    #[test]
    fn single_line_ignores_newlines() {
        let mut input = Input::new();
        input.insert_char('a');
        input.insert_char('\n');
        assert_eq!(input.value(), "a");
    }

    #[test]
    fn multiline_tracks_line_and_column() {
        let mut input = Input::multiline();
        for c in "ab\ncde".chars() {
            input.insert_char(c);
        }
        assert_eq!(input.cursor_line_col(), (1, 3));
        input.move_home();
        assert_eq!(input.cursor_line_col(), (1, 0));
        input.move_left();
        assert_eq!(input.cursor_line_col(), (0, 2));
    }

    #[test]
    fn blank_detection() {
        assert!(Input::from_string("  ", false).is_blank());
        assert!(!Input::from_string(" x ", false).is_blank());
    }
}
