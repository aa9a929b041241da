//! Diagram palettes and their resolution from config.
//!
//! Two built-in palettes (dark and light); the `custom` scheme starts from
//! dark and overrides individual colors with hex values from the config file.

use ratatui::style::Color;

use crate::config::{ThemeColorsConfig, ThemeConfig};

// ── Runtime theme colors ─────────────────────────────────────────────────────

/// All runtime colors used in the UI.
#[derive(Debug, Clone)]
pub struct ThemeColors {
    // Diagram
    pub diagram_bg: Color,
    pub node_fg: Color,
    pub node_border_fg: Color,
    /// Border of nodes with collapsed children.
    pub node_collapsed_fg: Color,
    /// Border of the node whose details are open.
    pub selected_border_fg: Color,
    /// Background of the keyboard-focused node.
    pub focused_bg: Color,
    pub edge_fg: Color,

    // Status bar
    pub status_bg: Color,
    pub status_fg: Color,

    // Panels, dialogs, table
    pub border_fg: Color,
    pub dialog_bg: Color,
    pub dialog_border_fg: Color,
    pub table_header_fg: Color,

    // Semantic colors (not configurable)
    pub error_fg: Color,
    pub success_fg: Color,
    pub accent_fg: Color,
    pub dim_fg: Color,
}

// ── Built-in palettes ────────────────────────────────────────────────────────

/// Dark theme using Catppuccin Mocha palette.
pub fn dark_theme() -> ThemeColors {
    ThemeColors {
        diagram_bg: Color::Reset,
        node_fg: Color::Rgb(205, 214, 244),            // #cdd6f4 (text)
        node_border_fg: Color::Rgb(137, 180, 250),     // #89b4fa (blue)
        node_collapsed_fg: Color::Rgb(250, 179, 135),  // #fab387 (peach)
        selected_border_fg: Color::Rgb(166, 227, 161), // #a6e3a1 (green)
        focused_bg: Color::Rgb(69, 71, 90),            // #45475a (surface1)
        edge_fg: Color::Rgb(108, 112, 134),            // #6c7086 (overlay0)

        status_bg: Color::Rgb(30, 30, 46), // #1e1e2e (base)
        status_fg: Color::Rgb(205, 214, 244),

        border_fg: Color::Rgb(88, 91, 112), // #585b70 (surface2)
        dialog_bg: Color::Rgb(49, 50, 68),  // #313244 (surface0)
        dialog_border_fg: Color::Rgb(137, 180, 250),
        table_header_fg: Color::Rgb(203, 166, 247), // #cba6f7 (mauve)

        error_fg: Color::Rgb(243, 139, 168),   // #f38ba8 (red)
        success_fg: Color::Rgb(166, 227, 161), // #a6e3a1 (green)
        accent_fg: Color::Rgb(249, 226, 175),  // #f9e2af (yellow)
        dim_fg: Color::Rgb(108, 112, 134),
    }
}

/// Light theme using Catppuccin Latte palette.
pub fn light_theme() -> ThemeColors {
    ThemeColors {
        diagram_bg: Color::Reset,
        node_fg: Color::Rgb(76, 79, 105),            // #4c4f69 (text)
        node_border_fg: Color::Rgb(30, 102, 245),    // #1e66f5 (blue)
        node_collapsed_fg: Color::Rgb(254, 100, 11), // #fe640b (peach)
        selected_border_fg: Color::Rgb(64, 160, 43), // #40a02b (green)
        focused_bg: Color::Rgb(204, 208, 218),       // #ccd0da (surface1)
        edge_fg: Color::Rgb(156, 160, 176),          // #9ca0b0 (overlay0)

        status_bg: Color::Rgb(239, 241, 245), // #eff1f5 (base)
        status_fg: Color::Rgb(76, 79, 105),

        border_fg: Color::Rgb(172, 176, 190), // #acb0be (surface2)
        dialog_bg: Color::Rgb(230, 233, 239), // #e6e9ef (surface0)
        dialog_border_fg: Color::Rgb(30, 102, 245),
        table_header_fg: Color::Rgb(136, 57, 239), // #8839ef (mauve)

        error_fg: Color::Rgb(210, 15, 57),   // #d20f39 (red)
        success_fg: Color::Rgb(64, 160, 43), // #40a02b (green)
        accent_fg: Color::Rgb(223, 142, 29), // #df8e1d (yellow)
        dim_fg: Color::Rgb(156, 160, 176),
    }
}

// ── Color parsing ────────────────────────────────────────────────────────────

/// Parse a hex color string like `"#aabbcc"` into a `ratatui::style::Color`.
/// Returns `None` for malformed input.
pub fn parse_hex_color(hex: &str) -> Option<Color> {
    let hex = hex.strip_prefix('#').unwrap_or(hex);
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some(Color::Rgb(r, g, b))
}

// ── Theme resolution ─────────────────────────────────────────────────────────

/// Resolve the final `ThemeColors` from config.
///
/// - `"dark"` (default): Catppuccin Mocha
/// - `"light"`: Catppuccin Latte
/// - `"custom"`: dark, then overridden by custom hex values
pub fn resolve_theme(config: &ThemeConfig) -> ThemeColors {
    match config.scheme.as_deref().unwrap_or("dark") {
        "light" => light_theme(),
        "custom" => {
            let mut theme = dark_theme();
            if let Some(custom) = &config.custom {
                apply_custom_colors(&mut theme, custom);
            }
            theme
        }
        _ => dark_theme(),
    }
}

/// Replace `slot` when `hex` is present and well-formed.
fn override_color(slot: &mut Color, hex: &Option<String>) {
    if let Some(color) = hex.as_deref().and_then(parse_hex_color) {
        *slot = color;
    }
}

fn apply_custom_colors(theme: &mut ThemeColors, custom: &ThemeColorsConfig) {
    override_color(&mut theme.diagram_bg, &custom.diagram_bg);
    override_color(&mut theme.node_fg, &custom.node_fg);
    override_color(&mut theme.node_border_fg, &custom.node_border_fg);
    override_color(&mut theme.node_collapsed_fg, &custom.node_collapsed_fg);
    override_color(&mut theme.selected_border_fg, &custom.selected_border_fg);
    override_color(&mut theme.focused_bg, &custom.focused_bg);
    override_color(&mut theme.edge_fg, &custom.edge_fg);
    override_color(&mut theme.status_bg, &custom.status_bg);
    override_color(&mut theme.status_fg, &custom.status_fg);
    override_color(&mut theme.border_fg, &custom.border_fg);
    override_color(&mut theme.dialog_bg, &custom.dialog_bg);
    override_color(&mut theme.dialog_border_fg, &custom.dialog_border_fg);
    override_color(&mut theme.table_header_fg, &custom.table_header_fg);
}

// ── Tests ────────────────────────────────────────────────────────────────────
