//! Explorer configuration: TOML file loading, CLI overrides, and defaults.
//!
//! Resolution order (first found wins, values merge/override):
//! 1. CLI flags (`--config`, `--show-hidden`, `--no-watcher`, etc.)
//! 2. `$FTV_CONFIG` environment variable (path to config file)
//! 3. Project-local `.ftv.toml` in the current working directory
//! 4. Global `~/.config/ftv/config.toml`
//! 5. Built-in defaults

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::fs::clipboard::PasteMode;
use crate::tree::model::SortBy;

// ── Section configs ──────────────────────────────────────────────────────────

/// General settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct GeneralConfig {
    /// Starting directory (overridden by CLI positional args).
    pub default_path: Option<String>,
    /// Show hidden files by default.
    pub show_hidden: Option<bool>,
}

/// Tree settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TreeConfig {
    /// Sort order: "name", "size", "modified".
    pub sort_by: Option<String>,
    /// Directories always listed first.
    pub dirs_first: Option<bool>,
    /// Glyph indicators instead of bracketed ASCII.
    pub use_icons: Option<bool>,
    /// Render the root as the first line of each source.
    pub show_root: Option<bool>,
    /// What `open` does on a directory: "cd" or "expand".
    pub open_directory: Option<String>,
    /// Depth limit for recursive expansion.
    pub expand_max_depth: Option<usize>,
}

/// Clipboard settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ClipboardConfig {
    /// After paste: "clear" or "keep_copy".
    pub paste_mode: Option<String>,
}

/// Filesystem watcher settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct WatcherConfig {
    /// Enable filesystem watcher for auto-refresh.
    pub enabled: Option<bool>,
    /// Debounce interval in milliseconds.
    pub debounce_ms: Option<u64>,
    /// Path components whose changes are never reported.
    pub ignore_patterns: Option<Vec<String>>,
    /// Events per window above which the whole source is refreshed.
    pub flood_threshold: Option<usize>,
}

/// Expand-state persistence.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct StateConfig {
    /// JSON file the expand state is loaded from and saved to.
    pub expand_file: Option<String>,
}

/// Log output.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct LogConfig {
    /// Filter directive, e.g. "info" or "file_tree_view=debug".
    pub level: Option<String>,
    /// Log file path.
    pub file: Option<String>,
}

// ── Top-level config ─────────────────────────────────────────────────────────

/// Top-level configuration.
///
/// All fields are optional so that partial configs from different sources
/// can be merged together (CLI overrides file, file overrides defaults).
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub general: GeneralConfig,
    pub tree: TreeConfig,
    pub clipboard: ClipboardConfig,
    pub watcher: WatcherConfig,
    pub state: StateConfig,
    pub log: LogConfig,
}

/// Behavior of `open` on a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OpenDirectory {
    /// Make the directory the new root.
    #[default]
    Cd,
    /// Expand it in place.
    Expand,
}

impl OpenDirectory {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "cd" => Some(OpenDirectory::Cd),
            "expand" => Some(OpenDirectory::Expand),
            _ => None,
        }
    }
}

// ── Default constants ────────────────────────────────────────────────────────

/// Default debounce interval in milliseconds.
pub const DEFAULT_DEBOUNCE_MS: u64 = 300;
/// Events per debounce window before a change burst collapses to a full refresh.
pub const DEFAULT_FLOOD_THRESHOLD: usize = 100;
/// Directories whose churn the watcher never reports.
pub const DEFAULT_IGNORE_PATTERNS: &[&str] = &[
    ".git",
    "node_modules",
    "__pycache__",
    ".venv",
    "target",
];
/// Default depth limit for recursive expansion.
pub const DEFAULT_EXPAND_MAX_DEPTH: usize = 32;
/// Default log filter.
pub const DEFAULT_LOG_LEVEL: &str = "info";

// ── Config file locator ──────────────────────────────────────────────────────

/// Return the list of candidate config file paths in priority order.
///
/// Does NOT include the CLI `--config` path; that one is handled separately.
fn candidate_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Ok(env_path) = std::env::var("FTV_CONFIG") {
        paths.push(PathBuf::from(env_path));
    }

    if let Ok(cwd) = std::env::current_dir() {
        paths.push(cwd.join(".ftv.toml"));
    }

    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("ftv").join("config.toml"));
    }

    paths
}

/// Try to read and parse a TOML config file. Returns `None` if the file
/// doesn't exist or can't be parsed (with a logged warning).
fn load_file(path: &Path) -> Option<AppConfig> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str::<AppConfig>(&content) {
        Ok(cfg) => {
            tracing::debug!("loaded config from {}", path.display());
            Some(cfg)
        }
        Err(e) => {
            tracing::warn!("failed to parse config file {}: {}", path.display(), e);
            None
        }
    }
}

// ── Merge logic ──────────────────────────────────────────────────────────────

impl AppConfig {
    /// Merge `other` on top of `self`: `other`'s `Some` values win.
    pub fn merge(self, other: &AppConfig) -> AppConfig {
        AppConfig {
            general: GeneralConfig {
                default_path: other
                    .general
                    .default_path
                    .clone()
                    .or(self.general.default_path),
                show_hidden: other.general.show_hidden.or(self.general.show_hidden),
            },
            tree: TreeConfig {
                sort_by: other.tree.sort_by.clone().or(self.tree.sort_by),
                dirs_first: other.tree.dirs_first.or(self.tree.dirs_first),
                use_icons: other.tree.use_icons.or(self.tree.use_icons),
                show_root: other.tree.show_root.or(self.tree.show_root),
                open_directory: other
                    .tree
                    .open_directory
                    .clone()
                    .or(self.tree.open_directory),
                expand_max_depth: other.tree.expand_max_depth.or(self.tree.expand_max_depth),
            },
            clipboard: ClipboardConfig {
                paste_mode: other
                    .clipboard
                    .paste_mode
                    .clone()
                    .or(self.clipboard.paste_mode),
            },
            watcher: WatcherConfig {
                enabled: other.watcher.enabled.or(self.watcher.enabled),
                debounce_ms: other.watcher.debounce_ms.or(self.watcher.debounce_ms),
                ignore_patterns: other
                    .watcher
                    .ignore_patterns
                    .clone()
                    .or(self.watcher.ignore_patterns),
                flood_threshold: other.watcher.flood_threshold.or(self.watcher.flood_threshold),
            },
            state: StateConfig {
                expand_file: other.state.expand_file.clone().or(self.state.expand_file),
            },
            log: LogConfig {
                level: other.log.level.clone().or(self.log.level),
                file: other.log.file.clone().or(self.log.file),
            },
        }
    }

    /// Load the final merged configuration.
    ///
    /// `cli_config_path` is an explicit config file path from `--config`.
    /// `cli_overrides` are partial overrides derived from CLI flags.
    pub fn load(cli_config_path: Option<&Path>, cli_overrides: Option<&AppConfig>) -> AppConfig {
        let mut config = AppConfig::default();

        // Lowest priority first so higher layers overwrite.
        for path in candidate_paths().iter().rev() {
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

    pub fn default_path(&self) -> Option<&str> {
        self.general.default_path.as_deref()
    }

    /// Whether to show hidden files by default.
    pub fn show_hidden(&self) -> bool {
        self.general.show_hidden.unwrap_or(false)
    }

    /// Sort mode; unknown values fall back to name.
    pub fn sort_by(&self) -> SortBy {
        match self.tree.sort_by.as_deref() {
            None => SortBy::Name,
            Some(s) => SortBy::parse(s).unwrap_or_else(|| {
                tracing::warn!("unknown sort_by {:?}, using name", s);
                SortBy::Name
            }),
        }
    }

    /// Whether directories are listed before files.
    pub fn dirs_first(&self) -> bool {
        self.tree.dirs_first.unwrap_or(true)
    }

    pub fn use_icons(&self) -> bool {
        self.tree.use_icons.unwrap_or(false)
    }

    pub fn show_root(&self) -> bool {
        self.tree.show_root.unwrap_or(true)
    }

    pub fn open_directory(&self) -> OpenDirectory {
        match self.tree.open_directory.as_deref() {
            None => OpenDirectory::default(),
            Some(s) => OpenDirectory::parse(s).unwrap_or_else(|| {
                tracing::warn!("unknown open_directory {:?}, using cd", s);
                OpenDirectory::default()
            }),
        }
    }

    pub fn expand_max_depth(&self) -> usize {
        self.tree
            .expand_max_depth
            .unwrap_or(DEFAULT_EXPAND_MAX_DEPTH)
    }

    pub fn paste_mode(&self) -> PasteMode {
        match self.clipboard.paste_mode.as_deref() {
            None => PasteMode::default(),
            Some(s) => PasteMode::parse(s).unwrap_or_else(|| {
                tracing::warn!("unknown paste_mode {:?}, using clear", s);
                PasteMode::default()
            }),
        }
    }

    /// Whether the watcher is enabled.
    pub fn watcher_enabled(&self) -> bool {
        self.watcher.enabled.unwrap_or(true)
    }

    /// Watcher debounce interval in milliseconds.
    pub fn debounce_ms(&self) -> u64 {
        self.watcher.debounce_ms.unwrap_or(DEFAULT_DEBOUNCE_MS)
    }

    pub fn ignore_patterns(&self) -> Vec<String> {
        match &self.watcher.ignore_patterns {
            Some(patterns) => patterns.clone(),
            None => DEFAULT_IGNORE_PATTERNS.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn flood_threshold(&self) -> usize {
        self.watcher.flood_threshold.unwrap_or(DEFAULT_FLOOD_THRESHOLD)
    }

    /// File the expand state is persisted to, if any.
    pub fn expand_file(&self) -> Option<PathBuf> {
        self.state.expand_file.as_deref().map(PathBuf::from)
    }

    pub fn log_level(&self) -> &str {
        self.log.level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }

    /// Log file, defaulting to the user's local data directory.
    pub fn log_file(&self) -> PathBuf {
        match &self.log.file {
            Some(file) => PathBuf::from(file),
            None => dirs::data_local_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("ftv")
                .join("ftv.log"),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
