use ratatui::style::Color;

/// Sticky note colours, in the order `cycle_color` walks through them
pub const NOTE_COLORS: &[&str] = &[
    "yellow", "lightyellow", "lightgreen", "lightblue", "lightmagenta", "lightcyan", "lightred", "white",
];

/// Parse a colour name, `#RRGGBB`/`#RGB`, or `rgb(r, g, b)`.
/// Unknown values fall back to white.
pub fn parse_color(color_str: &str) -> Color {
    let s = color_str.trim().to_lowercase();
    match s.as_str() {
        "black" => Color::Black,
        "red" => Color::Red,
        "green" => Color::Green,
        "yellow" => Color::Yellow,
        "blue" => Color::Blue,
        "magenta" => Color::Magenta,
        "cyan" => Color::Cyan,
        "white" => Color::White,
        "gray" | "grey" | "lightgray" | "lightgrey" => Color::Gray,
        "darkgray" | "darkgrey" => Color::DarkGray,
        "lightred" => Color::LightRed,
        "lightgreen" => Color::LightGreen,
        "lightyellow" => Color::LightYellow,
        "lightblue" => Color::LightBlue,
        "lightmagenta" => Color::LightMagenta,
        "lightcyan" => Color::LightCyan,
        "reset" => Color::Reset,
        _ => s
            .strip_prefix('#')
            .and_then(parse_hex_color)
            .or_else(|| parse_rgb_color(&s))
            .unwrap_or(Color::White),
    }
}

fn parse_hex_color(hex: &str) -> Option<Color> {
    let channel = |range: std::ops::Range<usize>| u8::from_str_radix(hex.get(range)?, 16).ok();
    match hex.len() {
        6 => Some(Color::Rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?)),
        3 => {
            // #RGB expands each digit: 0xF -> 0xFF
            let (r, g, b) = (channel(0..1)?, channel(1..2)?, channel(2..3)?);
            Some(Color::Rgb(r << 4 | r, g << 4 | g, b << 4 | b))
        }
        _ => None,
    }
}

fn parse_rgb_color(s: &str) -> Option<Color> {
    let content = s.strip_prefix("rgb(")?.strip_suffix(')')?;
    let parts: Vec<u8> = content
        .split(',')
        .map(|p| p.trim().parse::<u8>().ok())
        .collect::<Option<Vec<u8>>>()?;
    match parts.as_slice() {
        [r, g, b] => Some(Color::Rgb(*r, *g, *b)),
        _ => None,
    }
}

/// Relative luminance (WCAG) of an RGB colour, 0.0 dark to 1.0 light
fn luminance(r: u8, g: u8, b: u8) -> f64 {
    let linear = |c: u8| {
        let c = c as f64 / 255.0;
        if c <= 0.03928 {
            c / 12.92
        } else {
            ((c + 0.055) / 1.055).powf(2.4)
        }
    };
    0.2126 * linear(r) + 0.7152 * linear(g) + 0.0722 * linear(b)
}

/// Black or white, whichever reads better on `background`
pub fn get_contrast_text_color(background: Color) -> Color {
    let dark = match background {
        Color::Rgb(r, g, b) => luminance(r, g, b) < 0.5,
        // Terminals render gray light, so only these count as dark
        other => matches!(other, Color::Black | Color::Blue | Color::Magenta | Color::Red | Color::DarkGray),
    };
    if dark { Color::White } else { Color::Black }
}

/// Next colour in the note palette; unknown colours restart the cycle
pub fn next_note_color(current: &str) -> &'static str {
    let current = current.trim().to_lowercase();
    NOTE_COLORS
        .iter()
        .position(|c| *c == current)
        .map(|i| NOTE_COLORS[(i + 1) % NOTE_COLORS.len()])
        .unwrap_or(NOTE_COLORS[0])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_names_hex_and_rgb() {
        assert_eq!(parse_color("LightBlue"), Color::LightBlue);
        assert_eq!(parse_color("#ff0000"), Color::Rgb(255, 0, 0));
        assert_eq!(parse_color("#0f0"), Color::Rgb(0, 255, 0));
        assert_eq!(parse_color("rgb(1, 2, 3)"), Color::Rgb(1, 2, 3));
        assert_eq!(parse_color("mauve"), Color::White);
        assert_eq!(parse_color("rgb(1,2)"), Color::White);
    }

    #[test]
    fn contrast_picks_readable_text() {
        assert_eq!(get_contrast_text_color(Color::Yellow), Color::Black);
        assert_eq!(get_contrast_text_color(Color::Blue), Color::White);
        assert_eq!(get_contrast_text_color(Color::Rgb(10, 10, 10)), Color::White);
        assert_eq!(get_contrast_text_color(Color::Rgb(250, 250, 200)), Color::Black);
    }

    #[test]
    fn note_colors_cycle() {
        assert_eq!(next_note_color("yellow"), "lightyellow");
        assert_eq!(next_note_color("white"), "yellow");
        assert_eq!(next_note_color("#123456"), "yellow");
    }
}
