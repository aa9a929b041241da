//! Application configuration: TOML file loading, CLI overrides, and defaults.
//!
//! Resolution order (first found wins, values merge/override):
//! 1. CLI flags (`--config`, `--no-mouse`, `--theme`, etc.)
//! 2. `$FTREE_CONFIG` environment variable (path to config file)
//! 3. Project-local `.ftree.toml` in the current working directory
//! 4. Global `~/.config/ftree/config.toml`
//! 5. Built-in defaults

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::tree::layout::{
    LayoutConfig, DEFAULT_LEVEL_SPACING, DEFAULT_MIN_CANVAS_HEIGHT, DEFAULT_NODE_SPACING,
};

// ── Section configs ──────────────────────────────────────────────────────────

/// General application settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct GeneralConfig {
    /// Document opened when no path is given on the command line.
    pub default_document: Option<String>,
    /// Enable mouse support.
    pub mouse: Option<bool>,
}

/// Diagram geometry.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct LayoutSection {
    /// Distance between generations.
    pub level_spacing: Option<f64>,
    /// Distance between neighbouring sibling slots.
    pub node_spacing: Option<f64>,
    /// Slots kept between cousins.
    pub subtree_separation: Option<f64>,
    /// Minimum canvas height reported to the drawing surface.
    pub min_canvas_height: Option<f64>,
}

/// Navigation timing.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct NavigationConfig {
    /// Delay between revealing a search target and opening its details.
    pub transition_ms: Option<u64>,
}

/// Save settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SaveConfig {
    /// Where edited documents are written. Defaults to the opened file.
    pub output_path: Option<String>,
}

/// Log file settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct LoggingConfig {
    /// Level filter: "error", "warn", "info", "debug", "trace".
    pub level: Option<String>,
    /// Directory for rolling log files.
    pub directory: Option<String>,
}

/// Color settings for a single theme palette.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ThemeColorsConfig {
    pub diagram_bg: Option<String>,
    pub node_fg: Option<String>,
    pub node_border_fg: Option<String>,
    pub node_collapsed_fg: Option<String>,
    pub selected_border_fg: Option<String>,
    pub focused_bg: Option<String>,
    pub edge_fg: Option<String>,
    pub status_bg: Option<String>,
    pub status_fg: Option<String>,
    pub border_fg: Option<String>,
    pub dialog_bg: Option<String>,
    pub dialog_border_fg: Option<String>,
    pub table_header_fg: Option<String>,
}

/// Theme configuration section.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ThemeConfig {
    /// Color scheme: "dark", "light", "custom".
    pub scheme: Option<String>,
    /// Custom color overrides.
    pub custom: Option<ThemeColorsConfig>,
}

// ── Top-level config ─────────────────────────────────────────────────────────

/// Top-level application configuration.
///
/// All fields are optional so that partial configs from different sources
/// can be merged together (CLI overrides file, file overrides defaults).
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub general: GeneralConfig,
    pub layout: LayoutSection,
    pub navigation: NavigationConfig,
    pub save: SaveConfig,
    pub logging: LoggingConfig,
    pub theme: ThemeConfig,
}

// ── Default constants ────────────────────────────────────────────────────────

/// Default delay before a navigation opens the details panel.
pub const DEFAULT_TRANSITION_MS: u64 = 250;
/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";
/// Default cousin separation, in slots.
pub const DEFAULT_SUBTREE_SEPARATION: f64 = 2.0;

/// A positive layout spacing, or `default` when missing or invalid.
fn spacing(value: Option<f64>, default: f64, key: &str) -> f64 {
    match value {
        Some(v) if v.is_finite() && v > 0.0 => v,
        Some(v) => {
            tracing::warn!(key, value = v, "ignoring invalid layout value");
            default
        }
        None => default,
    }
}

// ── Config file locator ──────────────────────────────────────────────────────

/// Return the list of candidate config file paths in priority order.
///
/// Does NOT include the CLI `--config` path, which is handled separately.
fn candidate_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Ok(env_path) = std::env::var("FTREE_CONFIG") {
        paths.push(PathBuf::from(env_path));
    }

    if let Ok(cwd) = std::env::current_dir() {
        paths.push(cwd.join(".ftree.toml"));
    }

    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("ftree").join("config.toml"));
    }

    paths
}

/// Try to read and parse a TOML config file. Returns `None` if the file
/// doesn't exist or can't be parsed (with a warning printed to stderr).
fn load_file(path: &Path) -> Option<AppConfig> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(_) => return None,
    };
    match toml::from_str::<AppConfig>(&content) {
        Ok(cfg) => Some(cfg),
        Err(e) => {
            // logging is not up yet when config is read
            eprintln!(
                "Warning: failed to parse config file {}: {}",
                path.display(),
                e
            );
            None
        }
    }
}

// ── Merge logic ──────────────────────────────────────────────────────────────

impl AppConfig {
    /// Merge `other` on top of `self`; `other`'s `Some` values win.
    pub fn merge(self, other: &AppConfig) -> AppConfig {
        AppConfig {
            general: GeneralConfig {
                default_document: other
                    .general
                    .default_document
                    .clone()
                    .or(self.general.default_document),
                mouse: other.general.mouse.or(self.general.mouse),
            },
            layout: LayoutSection {
                level_spacing: other.layout.level_spacing.or(self.layout.level_spacing),
                node_spacing: other.layout.node_spacing.or(self.layout.node_spacing),
                subtree_separation: other
                    .layout
                    .subtree_separation
                    .or(self.layout.subtree_separation),
                min_canvas_height: other
                    .layout
                    .min_canvas_height
                    .or(self.layout.min_canvas_height),
            },
            navigation: NavigationConfig {
                transition_ms: other
                    .navigation
                    .transition_ms
                    .or(self.navigation.transition_ms),
            },
            save: SaveConfig {
                output_path: other.save.output_path.clone().or(self.save.output_path),
            },
            logging: LoggingConfig {
                level: other.logging.level.clone().or(self.logging.level),
                directory: other.logging.directory.clone().or(self.logging.directory),
            },
            theme: ThemeConfig {
                scheme: other.theme.scheme.clone().or(self.theme.scheme),
                custom: match (&self.theme.custom, &other.theme.custom) {
                    (_, Some(o)) => Some(o.clone()),
                    (Some(s), None) => Some(s.clone()),
                    (None, None) => None,
                },
            },
        }
    }

    /// Load the final merged configuration.
    ///
    /// `cli_config_path` is an explicit config file path from `--config`.
    /// `cli_overrides` are partial overrides derived from CLI flags.
    pub fn load(cli_config_path: Option<&Path>, cli_overrides: Option<&AppConfig>) -> AppConfig {
        let mut config = AppConfig::default();

        // Walk in reverse so that highest-priority (env var) overwrites lower.
        let paths = candidate_paths();
        for path in paths.iter().rev() {
            if let Some(file_cfg) = load_file(path) {
                config = config.merge(&file_cfg);
            }
        }

        if let Some(cli_path) = cli_config_path {
            if let Some(file_cfg) = load_file(cli_path) {
                config = config.merge(&file_cfg);
            }
        }

        if let Some(overrides) = cli_overrides {
            config = config.merge(overrides);
        }

        config
    }

    // ── Convenience getters with built-in defaults ──────────────────────────

    /// Whether mouse support is enabled.
    pub fn mouse_enabled(&self) -> bool {
        self.general.mouse.unwrap_or(true)
    }

    /// Document to open when none is given on the command line.
    pub fn default_document(&self) -> Option<&str> {
        self.general.default_document.as_deref()
    }

    /// Layout parameters with defaults filled in. Spacings must be
    /// positive and the canvas height non-negative; anything else falls
    /// back to the default with a warning.
    pub fn layout_config(&self) -> LayoutConfig {
        let layout = &self.layout;
        LayoutConfig {
            level_spacing: spacing(layout.level_spacing, DEFAULT_LEVEL_SPACING, "level_spacing"),
            node_spacing: spacing(layout.node_spacing, DEFAULT_NODE_SPACING, "node_spacing"),
            subtree_separation: spacing(
                layout.subtree_separation,
                DEFAULT_SUBTREE_SEPARATION,
                "subtree_separation",
            ),
            min_canvas_height: match layout.min_canvas_height {
                Some(v) if v.is_finite() && v >= 0.0 => v,
                Some(v) => {
                    tracing::warn!(
                        key = "min_canvas_height",
                        value = v,
                        "ignoring invalid layout value"
                    );
                    DEFAULT_MIN_CANVAS_HEIGHT
                }
                None => DEFAULT_MIN_CANVAS_HEIGHT,
            },
            ..LayoutConfig::default()
        }
    }

    /// Delay between a search navigation and opening the details panel.
    pub fn transition(&self) -> Duration {
        Duration::from_millis(
            self.navigation
                .transition_ms
                .unwrap_or(DEFAULT_TRANSITION_MS),
        )
    }

    /// Where saves go, if configured.
    pub fn output_path(&self) -> Option<&str> {
        self.save.output_path.as_deref()
    }

    /// Log level filter name.
    pub fn log_level(&self) -> &str {
        self.logging.level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }

    /// Directory for log files.
    pub fn log_dir(&self) -> PathBuf {
        if let Some(dir) = &self.logging.directory {
            return PathBuf::from(dir);
        }
        dirs::data_local_dir()
            .map(|d| d.join("ftree").join("logs"))
            .unwrap_or_else(|| PathBuf::from("logs"))
    }

    /// Theme scheme: "dark", "light", or "custom".
    pub fn theme_scheme(&self) -> &str {
        self.theme.scheme.as_deref().unwrap_or("dark")
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_values() {
        let cfg = AppConfig::default();
        assert!(cfg.mouse_enabled());
        assert_eq!(cfg.default_document(), None);
        assert_eq!(cfg.layout_config(), LayoutConfig::default());
        assert_eq!(cfg.transition(), Duration::from_millis(250));
        assert_eq!(cfg.output_path(), None);
        assert_eq!(cfg.log_level(), "info");
        assert_eq!(cfg.theme_scheme(), "dark");
    }

    #[test]
    fn test_toml_parsing_full() {
        let toml = r#"
[general]
default_document = "data/family.json"
mouse = false

[layout]
level_spacing = 240.0
node_spacing = 64.0
subtree_separation = 1.5
min_canvas_height = 800.0

[navigation]
transition_ms = 500

[save]
output_path = "out/family.json"

[logging]
level = "debug"
directory = "/tmp/ftree-logs"

[theme]
scheme = "light"
"#;
        let cfg: AppConfig = toml::from_str(toml).expect("parse failed");
        assert!(!cfg.mouse_enabled());
        assert_eq!(cfg.default_document(), Some("data/family.json"));
        let layout = cfg.layout_config();
        assert_eq!(layout.level_spacing, 240.0);
        assert_eq!(layout.node_spacing, 64.0);
        assert_eq!(layout.subtree_separation, 1.5);
        assert_eq!(layout.min_canvas_height, 800.0);
        assert_eq!(cfg.transition(), Duration::from_millis(500));
        assert_eq!(cfg.output_path(), Some("out/family.json"));
        assert_eq!(cfg.log_level(), "debug");
        assert_eq!(cfg.log_dir(), PathBuf::from("/tmp/ftree-logs"));
        assert_eq!(cfg.theme_scheme(), "light");
    }

    #[test]
    fn test_toml_parsing_partial() {
        let toml = r#"
[layout]
node_spacing = 100.0
"#;
        let cfg: AppConfig = toml::from_str(toml).expect("parse failed");
        let layout = cfg.layout_config();
        assert_eq!(layout.node_spacing, 100.0);
        // Everything else should be defaults
        assert_eq!(layout.level_spacing, DEFAULT_LEVEL_SPACING);
        assert!(cfg.mouse_enabled());
    }

    #[test]
    fn test_non_positive_spacing_falls_back() {
        let toml = r#"
[layout]
level_spacing = 0.0
node_spacing = -40.0
subtree_separation = 15.0
min_canvas_height = -1.0
"#;
        let cfg: AppConfig = toml::from_str(toml).expect("parse failed");
        let layout = cfg.layout_config();
        assert_eq!(layout.level_spacing, DEFAULT_LEVEL_SPACING);
        assert_eq!(layout.node_spacing, DEFAULT_NODE_SPACING);
        assert_eq!(layout.subtree_separation, 15.0);
        assert_eq!(layout.min_canvas_height, DEFAULT_MIN_CANVAS_HEIGHT);

        let cfg: AppConfig = toml::from_str("[layout]\nmin_canvas_height = 0.0").unwrap();
        assert_eq!(cfg.layout_config().min_canvas_height, 0.0);
    }

    #[test]
    fn test_toml_parsing_empty() {
        let cfg: AppConfig = toml::from_str("").expect("parse failed");
        assert!(cfg.mouse_enabled());
        assert_eq!(cfg.log_level(), "info");
    }

    #[test]
    fn test_merge_overrides() {
        let base = AppConfig {
            general: GeneralConfig {
                mouse: Some(false),
                default_document: Some("a.json".into()),
            },
            navigation: NavigationConfig {
                transition_ms: Some(100),
            },
            ..Default::default()
        };

        let over = AppConfig {
            general: GeneralConfig {
                mouse: Some(true),
                // default_document not set, keep base
                ..Default::default()
            },
            ..Default::default()
        };

        let merged = base.merge(&over);
        assert!(merged.mouse_enabled()); // overridden
        assert_eq!(merged.default_document(), Some("a.json")); // from base
        assert_eq!(merged.transition(), Duration::from_millis(100)); // from base
    }

    #[test]
    fn test_merge_none_does_not_clear_some() {
        let base = AppConfig {
            logging: LoggingConfig {
                level: Some("warn".into()),
                directory: Some("/var/log/ftree".into()),
            },
            ..Default::default()
        };
        let merged = base.merge(&AppConfig::default());
        assert_eq!(merged.log_level(), "warn");
        assert_eq!(merged.log_dir(), PathBuf::from("/var/log/ftree"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg_path = dir.path().join("test-config.toml");
        let mut f = std::fs::File::create(&cfg_path).expect("create");
        writeln!(
            f,
            r#"
[navigation]
transition_ms = 400

[save]
output_path = "saved.json"
"#
        )
        .expect("write");

        let cfg = load_file(&cfg_path).expect("load");
        assert_eq!(cfg.transition(), Duration::from_millis(400));
        assert_eq!(cfg.output_path(), Some("saved.json"));
        // Unset fields fall through to defaults
        assert_eq!(cfg.theme_scheme(), "dark");
    }

    #[test]
    fn test_load_missing_file() {
        assert!(load_file(Path::new("/nonexistent/config.toml")).is_none());
    }

    #[test]
    fn test_load_invalid_toml_returns_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg_path = dir.path().join("bad.toml");
        std::fs::write(&cfg_path, "this is { not valid toml").expect("write");
        assert!(load_file(&cfg_path).is_none());
    }

    #[test]
    fn test_load_with_cli_overrides() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg_path = dir.path().join("config.toml");
        std::fs::write(
            &cfg_path,
            r#"
[general]
mouse = false

[logging]
level = "debug"
"#,
        )
        .expect("write");

        let cli_overrides = AppConfig {
            logging: LoggingConfig {
                level: Some("trace".into()),
                ..Default::default()
            },
            ..Default::default()
        };

        let cfg = AppConfig::load(Some(&cfg_path), Some(&cli_overrides));
        // CLI override wins
        assert_eq!(cfg.log_level(), "trace");
        // File value preserved (not overridden by CLI)
        assert!(!cfg.mouse_enabled());
    }

    #[test]
    fn test_theme_custom_colors() {
        let toml = r##"
[theme]
scheme = "custom"

[theme.custom]
node_fg = "#c0caf5"
edge_fg = "#565f89"
"##;
        let cfg: AppConfig = toml::from_str(toml).expect("parse");
        assert_eq!(cfg.theme_scheme(), "custom");
        let custom = cfg.theme.custom.as_ref().expect("custom present");
        assert_eq!(custom.node_fg.as_deref(), Some("#c0caf5"));
        assert_eq!(custom.edge_fg.as_deref(), Some("#565f89"));
        assert!(custom.dialog_bg.is_none());
    }
}
