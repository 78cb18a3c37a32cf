//! Toolbar palette shared by every panel button.
//!
//! Colors stay CSS strings end to end because that is what the browser theme
//! API hands out and what the page styles expect. The terminal playground
//! converts them with [`css_to_rgb`] / [`terminal_color`].

use std::collections::BTreeMap;

use ratatui::style::Color;
use serde::{Deserialize, Serialize};

pub const DEFAULT_BG: &str = "#f9f9fa";
pub const DEFAULT_TEXT: &str = "#0c0c0d";
pub const DEFAULT_BORDER: &str = "#ccc";
pub const DEFAULT_HOVER: &str = "rgba(0,0,0,0.1)";
pub const DEFAULT_ACTIVE: &str = "rgba(0,0,0,0.2)";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemePalette {
    pub bg_color: String,
    pub text_color: String,
    pub border_color: String,
    pub hover_color: String,
    pub active_color: String,
}

impl Default for ThemePalette {
    fn default() -> Self {
        Self {
            bg_color: DEFAULT_BG.to_string(),
            text_color: DEFAULT_TEXT.to_string(),
            border_color: DEFAULT_BORDER.to_string(),
            hover_color: DEFAULT_HOVER.to_string(),
            active_color: DEFAULT_ACTIVE.to_string(),
        }
    }
}

/// The browser's current theme: a bag of named color keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostTheme {
    #[serde(default)]
    pub colors: BTreeMap<String, String>,
}

impl HostTheme {
    fn first(&self, keys: &[&str]) -> Option<String> {
        keys.iter()
            .find_map(|k| self.colors.get(*k))
            .filter(|v| !v.trim().is_empty())
            .cloned()
    }
}

impl ThemePalette {
    /// Map a host theme onto the toolbar palette. Keys the theme does not
    /// define keep their default value.
    pub fn from_host(theme: &HostTheme) -> Self {
        let d = Self::default();
        Self {
            bg_color: theme.first(&["toolbar", "frame"]).unwrap_or(d.bg_color),
            text_color: theme
                .first(&["toolbar_text", "tab_background_text"])
                .unwrap_or(d.text_color),
            border_color: theme
                .first(&["toolbar_field_border", "toolbar_top_separator"])
                .unwrap_or(d.border_color),
            hover_color: theme
                .first(&["button_background_hover"])
                .unwrap_or(d.hover_color),
            active_color: theme
                .first(&["button_background_active"])
                .unwrap_or(d.active_color),
        }
    }
}

/// Parse a CSS color (`#rgb`, `#rrggbb`, `#rrggbbaa`, `rgb()`, `rgba()`) into
/// RGB. Translucent colors are blended over `base`, which is how a hover
/// overlay looks on top of the toolbar background.
pub fn css_to_rgb(css: &str, base: (u8, u8, u8)) -> Option<(u8, u8, u8)> {
    let css = css.trim().to_ascii_lowercase();
    if let Some(hex) = css.strip_prefix('#') {
        let digits: Vec<u8> = hex
            .chars()
            .map(|c| c.to_digit(16).map(|d| d as u8))
            .collect::<Option<_>>()?;
        return match digits.as_slice() {
            [r, g, b] => Some((r * 17, g * 17, b * 17)),
            [r1, r0, g1, g0, b1, b0] => Some((r1 * 16 + r0, g1 * 16 + g0, b1 * 16 + b0)),
            [r1, r0, g1, g0, b1, b0, a1, a0] => {
                let alpha = f64::from(a1 * 16 + a0) / 255.0;
                Some(blend((r1 * 16 + r0, g1 * 16 + g0, b1 * 16 + b0), alpha, base))
            }
            _ => None,
        };
    }
    let inner = css
        .strip_prefix("rgba(")
        .or_else(|| css.strip_prefix("rgb("))?
        .strip_suffix(')')?;
    let parts: Vec<&str> = inner.split(',').map(str::trim).collect();
    let channel = |s: &str| s.parse::<f64>().ok().map(|v| v.clamp(0.0, 255.0) as u8);
    match parts[..] {
        [r, g, b] => Some((channel(r)?, channel(g)?, channel(b)?)),
        [r, g, b, a] => {
            let alpha = a.parse::<f64>().ok()?.clamp(0.0, 1.0);
            Some(blend((channel(r)?, channel(g)?, channel(b)?), alpha, base))
        }
        _ => None,
    }
}

fn blend(top: (u8, u8, u8), alpha: f64, base: (u8, u8, u8)) -> (u8, u8, u8) {
    let mix = |t: u8, b: u8| (f64::from(t) * alpha + f64::from(b) * (1.0 - alpha)).round() as u8;
    (mix(top.0, base.0), mix(top.1, base.1), mix(top.2, base.2))
}

/// Terminal color for a CSS color; truecolor terminals get the exact value,
/// others the nearest xterm-256 entry.
pub fn terminal_color(css: &str, base: (u8, u8, u8)) -> Color {
    let Some((r, g, b)) = css_to_rgb(css, base) else {
        return Color::Reset;
    };
    let truecolor = std::env::var("COLORTERM")
        .map(|v| {
            let v = v.to_ascii_lowercase();
            v.contains("truecolor") || v.contains("24bit")
        })
        .unwrap_or(false);
    if truecolor {
        Color::Rgb(r, g, b)
    } else {
        Color::Indexed(xterm_index(r, g, b))
    }
}

/// Nearest entry in the xterm 6x6x6 cube or the 24-step gray ramp.
fn xterm_index(r: u8, g: u8, b: u8) -> u8 {
    const LEVELS: [u8; 6] = [0, 95, 135, 175, 215, 255];
    let step = |v: u8| ((u16::from(v) * 5 + 127) / 255) as u8;
    let (r6, g6, b6) = (step(r), step(g), step(b));
    let cube = (
        LEVELS[r6 as usize],
        LEVELS[g6 as usize],
        LEVELS[b6 as usize],
    );
    let avg = ((u16::from(r) + u16::from(g) + u16::from(b)) / 3) as u8;
    let gray_step = ((u16::from(avg) * 23 + 127) / 255) as u8;
    let gray_level = (8 + u16::from(gray_step) * 10).min(255) as u8;
    let dist = |c: (u8, u8, u8)| {
        let d = |a: u8, b: u8| (i32::from(a) - i32::from(b)).pow(2);
        d(r, c.0) + d(g, c.1) + d(b, c.2)
    };
    if dist((gray_level, gray_level, gray_level)) < dist(cube) {
        232 + gray_step
    } else {
        16 + 36 * r6 + 6 * g6 + b6
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_palette_matches_documented_literals() {
        let p = ThemePalette::default();
        assert_eq!(p.bg_color, "#f9f9fa");
        assert_eq!(p.text_color, "#0c0c0d");
        assert_eq!(p.border_color, "#ccc");
        assert_eq!(p.hover_color, "rgba(0,0,0,0.1)");
        assert_eq!(p.active_color, "rgba(0,0,0,0.2)");
    }

    #[test]
    fn host_theme_overrides_known_keys_only() {
        let mut theme = HostTheme::default();
        theme.colors.insert("toolbar".into(), "#202020".into());
        theme.colors.insert("tab_background_text".into(), "#eeeeee".into());
        let p = ThemePalette::from_host(&theme);
        assert_eq!(p.bg_color, "#202020");
        assert_eq!(p.text_color, "#eeeeee");
        assert_eq!(p.border_color, DEFAULT_BORDER);
    }

    #[test]
    fn palette_serializes_with_camel_case_keys() {
        let json = serde_json::to_value(ThemePalette::default()).unwrap();
        assert_eq!(json["bgColor"], "#f9f9fa");
        assert_eq!(json["activeColor"], "rgba(0,0,0,0.2)");
    }

    #[test]
    fn css_colors_parse_and_blend() {
        assert_eq!(css_to_rgb("#ccc", (0, 0, 0)), Some((204, 204, 204)));
        assert_eq!(css_to_rgb("#0C0C0D", (0, 0, 0)), Some((12, 12, 13)));
        assert_eq!(css_to_rgb("rgb(1, 2, 3)", (0, 0, 0)), Some((1, 2, 3)));
        // 10% black over white
        assert_eq!(
            css_to_rgb("rgba(0,0,0,0.1)", (255, 255, 255)),
            Some((230, 230, 230))
        );
        assert_eq!(css_to_rgb("papayawhip", (0, 0, 0)), None);
    }

    #[test]
    fn xterm_mapping_picks_cube_or_gray() {
        assert_eq!(xterm_index(255, 0, 0), 196);
        assert_eq!(xterm_index(128, 128, 128), 232 + 12);
    }
}
