//! Block palette and UI colours. Optional btop-style theme files remap them.

use ratatui::style::Color;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

use crate::config::MAX_COLORS;

const BLOCK_COUNT: usize = MAX_COLORS as usize;

/// Block colours and UI colours, loaded from a theme file or the built-in defaults.
#[derive(Debug, Clone)]
pub struct Theme {
    /// Block colours for ids 1..=7: red, green, blue, yellow, white, magenta, cyan.
    pub blocks: [Color; BLOCK_COUNT],
    /// Playfield background.
    pub bg: Color,
    /// Border.
    pub div_line: Color,
    /// Text (score, speed).
    pub main_fg: Color,
    /// Highlight / titles.
    pub title: Color,
    /// Secondary text (hints).
    pub inactive_fg: Color,
}

#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid hex: {0}")]
    InvalidHex(String),
}

impl Default for Theme {
    fn default() -> Self {
        Self::classic()
    }
}

const CLASSIC_BLOCKS: [&str; BLOCK_COUNT] = [
    "#EF4444", "#22C55E", "#3B82F6", "#F59E0B", "#E5E7EB", "#C678DD", "#56B6C2",
];
const HIGH_CONTRAST_BLOCKS: [&str; BLOCK_COUNT] = [
    "#FF0000", "#00FF00", "#0088FF", "#FFFF00", "#FFFFFF", "#FF00FF", "#00FFFF",
];
const COLORBLIND_BLOCKS: [&str; BLOCK_COUNT] = [
    "#CC3311", "#009988", "#0077BB", "#EE7733", "#BBBBBB", "#EE3377", "#33BBEE",
];

/// Theme keys read for each block, first hit wins.
const BLOCK_KEYS: [&[&str]; BLOCK_COUNT] = [
    &["cpu_end", "temp_end"],
    &["mem_box", "cpu_start"],
    &["cpu_box"],
    &["title", "cpu_mid"],
    &["main_fg"],
    &["net_box"],
    &["hi_fg", "proc_misc"],
];

fn hex_or(s: &str, fallback: Color) -> Color {
    parse_hex(s).unwrap_or(fallback)
}

fn palette_colors(hexes: [&str; BLOCK_COUNT]) -> [Color; BLOCK_COUNT] {
    hexes.map(|h| hex_or(h, Color::Gray))
}

impl Theme {
    /// Built-in colours: saturated blocks on a dark navy field.
    pub fn classic() -> Self {
        Self {
            blocks: palette_colors(CLASSIC_BLOCKS),
            bg: hex_or("#0B1220", Color::Black),
            div_line: hex_or("#9CA3AF", Color::Gray),
            main_fg: hex_or("#E5E7EB", Color::White),
            title: hex_or("#F59E0B", Color::Yellow),
            inactive_fg: hex_or("#5C6370", Color::DarkGray),
        }
    }

    /// Read a btop-style theme (`theme[key]="#hex"`, single or double quotes).
    /// Falls back to the built-in defaults if path is None or the file is missing.
    /// `palette` then overrides the block colours for high-contrast or colorblind play.
    pub fn load(path: Option<&Path>, palette: crate::Palette) -> Result<Self, ThemeError> {
        let path = match path {
            Some(p) if p.exists() => p,
            _ => {
                let mut t = Self::classic();
                t.apply_palette(palette);
                return Ok(t);
            }
        };
        let s = std::fs::read_to_string(path)?;
        let map = parse_theme_file(&s);
        let mut theme = Self::from_map(&map);
        theme.apply_palette(palette);
        Ok(theme)
    }

    pub fn apply_palette(&mut self, palette: crate::Palette) {
        match palette {
            crate::Palette::Normal => {}
            crate::Palette::HighContrast => self.blocks = palette_colors(HIGH_CONTRAST_BLOCKS),
            crate::Palette::Colorblind => self.blocks = palette_colors(COLORBLIND_BLOCKS),
        }
    }

    fn from_map(map: &HashMap<String, String>) -> Self {
        let get = |key: &str| map.get(key).and_then(|v| parse_hex(v).ok());
        let defaults = Self::classic();
        let mut blocks = defaults.blocks;
        for (slot, keys) in blocks.iter_mut().zip(BLOCK_KEYS) {
            if let Some(c) = keys.iter().find_map(|k| get(k)) {
                *slot = c;
            }
        }
        Self {
            blocks,
            bg: get("main_bg").or_else(|| get("meter_bg")).unwrap_or(defaults.bg),
            div_line: get("div_line").unwrap_or(defaults.div_line),
            main_fg: get("main_fg").unwrap_or(defaults.main_fg),
            title: get("title").unwrap_or(defaults.title),
            inactive_fg: get("inactive_fg").unwrap_or(defaults.inactive_fg),
        }
    }

    /// Colour for block id `1..=7`; anything else wraps into the palette.
    #[inline]
    pub fn block_color(&self, id: u8) -> Color {
        self.blocks[(id.saturating_sub(1) as usize) % BLOCK_COUNT]
    }
}

/// `theme[key]=value` lines as a map; anything else is skipped.
fn parse_theme_file(s: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for line in s.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some(stripped) = line.strip_prefix("theme[") else {
            continue;
        };
        let Some(end) = stripped.find(']') else {
            continue;
        };
        let key = stripped[..end].trim();
        let rest = stripped[end + 1..].trim();
        if let Some(value) = rest.strip_prefix('=') {
            let value = value.trim().trim_matches('"').trim_matches('\'');
            if !value.is_empty() {
                map.insert(key.to_string(), value.to_string());
            }
        }
    }
    map
}

/// `#RRGGBB` or shorthand `#RGB`.
pub fn parse_hex(s: &str) -> Result<Color, ThemeError> {
    let s = s.trim().trim_start_matches('#');
    let bad = || ThemeError::InvalidHex(s.to_string());
    if !s.is_ascii() {
        return Err(bad());
    }
    let channel = |h: &str| u8::from_str_radix(h, 16).map_err(|_| bad());
    let (r, g, b) = match s.len() {
        6 => (channel(&s[0..2])?, channel(&s[2..4])?, channel(&s[4..6])?),
        3 => (
            channel(&s[0..1])? * 17,
            channel(&s[1..2])? * 17,
            channel(&s[2..3])? * 17,
        ),
        _ => return Err(bad()),
    };
    Ok(Color::Rgb(r, g, b))
}

/// Scale an RGB colour by `factor` (brighten > 1, darken < 1).
pub fn shade(color: Color, factor: f32) -> Color {
    let (r, g, b) = match color {
        Color::Rgb(r, g, b) => (r, g, b),
        Color::Red => (255, 0, 0),
        Color::Green => (0, 255, 0),
        Color::Yellow => (255, 255, 0),
        Color::Blue => (0, 0, 255),
        Color::Magenta => (255, 0, 255),
        Color::Cyan => (0, 255, 255),
        Color::White => (255, 255, 255),
        Color::DarkGray => (64, 64, 64),
        _ => (128, 128, 128),
    };
    let f = |v: u8| (v as f32 * factor).clamp(0.0, 255.0) as u8;
    Color::Rgb(f(r), f(g), f(b))
}
