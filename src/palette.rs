use ratatui::style::Color;
use std::str::FromStr;

/// Choices offered by the settings panel before the custom entry.
pub const PRESET_COLORS: &[&str] = &[
    "white", "black", "gray", "darkgray", "lightyellow", "lightcyan", "lightgreen", "#1e1e2e",
    "#282c34", "#fdf6e3",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UiPalette {
    pub base_fg: Color,
    pub base_bg: Color,
    pub accent: Color,
    pub muted: Color,
    pub border: Color,
}

impl UiPalette {
    /// Builds the palette around a background color string.
    pub fn from_background(name: &str) -> Self {
        let base_bg = match parse_color(name) {
            Some(color) => color,
            None => {
                tracing::warn!(color = name, "unrecognized background color, using terminal default");
                Color::Reset
            }
        };
        let light = is_light(base_bg);
        let base_fg = match (base_bg, light) {
            (Color::Reset, _) => Color::Reset,
            (_, true) => Color::Black,
            (_, false) => Color::White,
        };
        let muted = if light { Color::DarkGray } else { Color::Gray };
        let accent = if light { Color::Magenta } else { Color::LightCyan };

        Self {
            base_fg,
            base_bg,
            accent,
            muted,
            border: muted,
        }
    }
}

pub fn parse_color(name: &str) -> Option<Color> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return None;
    }
    Color::from_str(trimmed).ok()
}

fn is_light(color: Color) -> bool {
    match color {
        Color::Rgb(r, g, b) => {
            let luma = 0.299 * f32::from(r) + 0.587 * f32::from(g) + 0.114 * f32::from(b);
            luma > 140.0
        }
        Color::White
        | Color::Gray
        | Color::Yellow
        | Color::LightRed
        | Color::LightGreen
        | Color::LightYellow
        | Color::LightBlue
        | Color::LightMagenta
        | Color::LightCyan
        | Color::Cyan => true,
        _ => false,
    }
}
