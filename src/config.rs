use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::board::{BoardOptions, TodoOrder};
use crate::utils;

/// Current configuration version
pub const CURRENT_CONFIG_VERSION: u32 = 1;

pub const ENV_SUPABASE_URL: &str = "DAYBOARD_SUPABASE_URL";
pub const ENV_SUPABASE_KEY: &str = "DAYBOARD_SUPABASE_KEY";
pub const ENV_ACCESS_TOKEN: &str = "DAYBOARD_ACCESS_TOKEN";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database_path: String,
    #[serde(default = "default_user_id")]
    pub user_id: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_true")]
    pub seed_samples: bool,
    #[serde(default)]
    pub key_bindings: KeyBindings,
    #[serde(default = "default_current_theme")]
    pub current_theme: String,
    #[serde(default)]
    pub themes: HashMap<String, Theme>,
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub board: BoardConfig,
    #[serde(default = "default_config_version")]
    pub config_version: Option<u32>,
}

/// Hosted table store credentials; both `url` and `anon_key` must be set for
/// the remote backend to be used
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub anon_key: Option<String>,
    /// Signed-in user's JWT; the anon key is sent as bearer when absent
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardConfig {
    #[serde(default = "default_horizon_days")]
    pub horizon_days: u32,
    #[serde(default)]
    pub days_back: u32,
    #[serde(default)]
    pub todo_order: TodoOrder,
    #[serde(default = "default_true")]
    pub auto_complete_parent: bool,
    #[serde(default = "default_move_debounce_ms")]
    pub move_debounce_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyBindings {
    #[serde(default = "default_quit")]
    pub quit: String,
    #[serde(default = "default_help")]
    pub help: String,
    #[serde(default = "default_new")]
    pub new: String,
    #[serde(default = "default_edit")]
    pub edit: String,
    #[serde(default = "default_delete")]
    pub delete: String,
    #[serde(default = "default_select")]
    pub select: String,
    #[serde(default = "default_toggle_completion")]
    pub toggle_completion: String,
    #[serde(default = "default_pick_up")]
    pub pick_up: String,
    #[serde(default = "default_add_subtask")]
    pub add_subtask: String,
    #[serde(default = "default_list_up")]
    pub list_up: String,
    #[serde(default = "default_list_down")]
    pub list_down: String,
    #[serde(default = "default_day_left")]
    pub day_left: String,
    #[serde(default = "default_day_right")]
    pub day_right: String,
    #[serde(default = "default_switch_category")]
    pub switch_category: String,
    #[serde(default = "default_tab_prev")]
    pub tab_prev: String,
    #[serde(default = "default_tab_next")]
    pub tab_next: String,
    #[serde(default = "default_tab_1")]
    pub tab_1: String,
    #[serde(default = "default_tab_2")]
    pub tab_2: String,
    #[serde(default = "default_tab_3")]
    pub tab_3: String,
    #[serde(default = "default_tab_4")]
    pub tab_4: String,
    #[serde(default = "default_copy")]
    pub copy: String,
    #[serde(default = "default_refresh")]
    pub refresh: String,
    #[serde(default = "default_write_as_me")]
    pub write_as_me: String,
    #[serde(default = "default_write_as_alter_ego")]
    pub write_as_alter_ego: String,
    #[serde(default = "default_save")]
    pub save: String,
    #[serde(default = "default_cycle_color")]
    pub cycle_color: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    #[serde(default = "default_fg")]
    pub fg: String,
    #[serde(default = "default_bg")]
    pub bg: String,
    #[serde(default = "default_highlight_bg")]
    pub highlight_bg: String,
    #[serde(default = "default_highlight_fg")]
    pub highlight_fg: String,
    #[serde(default = "default_tab_bg")]
    pub tab_bg: String,
    #[serde(default = "default_overdue")]
    pub overdue: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: String::new(),
            user_id: default_user_id(),
            log_level: default_log_level(),
            seed_samples: true,
            key_bindings: KeyBindings::default(),
            current_theme: default_current_theme(),
            themes: HashMap::new(),
            remote: RemoteConfig::default(),
            board: BoardConfig::default(),
            config_version: Some(CURRENT_CONFIG_VERSION),
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            url: None,
            anon_key: None,
            access_token: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl RemoteConfig {
    pub fn is_configured(&self) -> bool {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        present(&self.url) && present(&self.anon_key)
    }
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            horizon_days: default_horizon_days(),
            days_back: 0,
            todo_order: TodoOrder::default(),
            auto_complete_parent: true,
            move_debounce_ms: default_move_debounce_ms(),
        }
    }
}

impl BoardConfig {
    /// Bucketing options; a zero horizon falls back to the default week
    pub fn options(&self) -> BoardOptions {
        let horizon_days = if self.horizon_days == 0 {
            default_horizon_days()
        } else {
            self.horizon_days
        };
        BoardOptions {
            days_back: self.days_back,
            horizon_days,
            todo_order: self.todo_order,
        }
    }

    pub fn move_debounce(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.move_debounce_ms)
    }
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            quit: default_quit(),
            help: default_help(),
            new: default_new(),
            edit: default_edit(),
            delete: default_delete(),
            select: default_select(),
            toggle_completion: default_toggle_completion(),
            pick_up: default_pick_up(),
            add_subtask: default_add_subtask(),
            list_up: default_list_up(),
            list_down: default_list_down(),
            day_left: default_day_left(),
            day_right: default_day_right(),
            switch_category: default_switch_category(),
            tab_prev: default_tab_prev(),
            tab_next: default_tab_next(),
            tab_1: default_tab_1(),
            tab_2: default_tab_2(),
            tab_3: default_tab_3(),
            tab_4: default_tab_4(),
            copy: default_copy(),
            refresh: default_refresh(),
            write_as_me: default_write_as_me(),
            write_as_alter_ego: default_write_as_alter_ego(),
            save: default_save(),
            cycle_color: default_cycle_color(),
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            fg: default_fg(),
            bg: default_bg(),
            highlight_bg: default_highlight_bg(),
            highlight_fg: default_highlight_fg(),
            tab_bg: default_tab_bg(),
            overdue: default_overdue(),
        }
    }
}

impl Theme {
    /// Preset themes that are always available
    pub fn get_preset_themes() -> HashMap<String, Theme> {
        let mut themes = HashMap::new();

        themes.insert("default".to_string(), Theme::default());

        themes.insert("light".to_string(), Theme {
            fg: "black".to_string(),
            bg: "white".to_string(),
            highlight_bg: "blue".to_string(),
            highlight_fg: "white".to_string(),
            tab_bg: "gray".to_string(),
            overdue: "red".to_string(),
        });

        themes.insert("sticky".to_string(), Theme {
            fg: "black".to_string(),
            bg: "lightyellow".to_string(),
            highlight_bg: "magenta".to_string(),
            highlight_fg: "white".to_string(),
            tab_bg: "yellow".to_string(),
            overdue: "red".to_string(),
        });

        themes.insert("monochrome".to_string(), Theme {
            fg: "white".to_string(),
            bg: "black".to_string(),
            highlight_bg: "white".to_string(),
            highlight_fg: "black".to_string(),
            tab_bg: "gray".to_string(),
            overdue: "white".to_string(),
        });

        themes
    }
}

// Default value functions
fn default_true() -> bool {
    true
}

fn default_user_id() -> String {
    "local-user".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_horizon_days() -> u32 {
    7
}

fn default_move_debounce_ms() -> u64 {
    150
}

fn default_quit() -> String {
    "q".to_string()
}

fn default_help() -> String {
    "F1".to_string()
}

fn default_new() -> String {
    "n".to_string()
}

fn default_edit() -> String {
    "e".to_string()
}

fn default_delete() -> String {
    "d".to_string()
}

fn default_select() -> String {
    "Enter".to_string()
}

fn default_toggle_completion() -> String {
    "Space".to_string()
}

fn default_pick_up() -> String {
    "m".to_string()
}

fn default_add_subtask() -> String {
    "a".to_string()
}

fn default_list_up() -> String {
    "k".to_string()
}

fn default_list_down() -> String {
    "j".to_string()
}

fn default_day_left() -> String {
    "h".to_string()
}

fn default_day_right() -> String {
    "l".to_string()
}

fn default_switch_category() -> String {
    "Tab".to_string()
}

fn default_tab_prev() -> String {
    "[".to_string()
}

fn default_tab_next() -> String {
    "]".to_string()
}

fn default_tab_1() -> String {
    "1".to_string()
}

fn default_tab_2() -> String {
    "2".to_string()
}

fn default_tab_3() -> String {
    "3".to_string()
}

fn default_tab_4() -> String {
    "4".to_string()
}

fn default_save() -> String {
    "Ctrl+s".to_string()
}

fn default_cycle_color() -> String {
    "c".to_string()
}

fn default_copy() -> String {
    "y".to_string()
}

fn default_refresh() -> String {
    "r".to_string()
}

fn default_write_as_me() -> String {
    "i".to_string()
}

fn default_write_as_alter_ego() -> String {
    "o".to_string()
}

fn default_current_theme() -> String {
    "default".to_string()
}

fn default_fg() -> String {
    "white".to_string()
}

fn default_bg() -> String {
    "black".to_string()
}

fn default_highlight_bg() -> String {
    "blue".to_string()
}

fn default_highlight_fg() -> String {
    "white".to_string()
}

fn default_tab_bg() -> String {
    "gray".to_string()
}

fn default_overdue() -> String {
    "lightred".to_string()
}

fn default_config_version() -> Option<u32> {
    Some(CURRENT_CONFIG_VERSION)
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config directory: {0}")]
    ConfigDirError(String),
    #[error("Failed to read config file: {0}")]
    ReadError(String),
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Failed to write config file: {0}")]
    WriteError(String),
    #[error("Theme not found: {0}")]
    ThemeNotFound(String),
}

impl Config {
    /// Load configuration for a profile, creating the default file if missing.
    /// `override_path` replaces the profile's config file location.
    pub fn load_with_profile(
        profile: utils::Profile,
        override_path: Option<&Path>,
    ) -> Result<Self, ConfigError> {
        let config_path = match override_path {
            Some(path) => path.to_path_buf(),
            None => Self::get_config_path(profile)?,
        };
        let mut config = Self::load_from_path(&config_path, profile)?;
        config.apply_overrides_from(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load configuration from an explicit file, writing defaults if it does not exist
    pub fn load_from_path(config_path: &Path, profile: utils::Profile) -> Result<Self, ConfigError> {
        if config_path.exists() {
            let contents = fs::read_to_string(config_path)
                .map_err(|e| ConfigError::ReadError(e.to_string()))?;
            let mut config: Config = toml::from_str(&contents)?;
            if config.database_path.trim().is_empty() {
                config.database_path = Self::default_database_path_for_profile(profile);
            }
            Ok(config)
        } else {
            let mut config = Config::default();
            config.database_path = Self::default_database_path_for_profile(profile);
            config.save_to_path(config_path)?;
            Ok(config)
        }
    }

    /// Apply environment overrides for the remote credentials.
    /// `lookup` is `std::env::var` in production.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(url) = non_empty(ENV_SUPABASE_URL) {
            self.remote.url = Some(url);
        }
        if let Some(key) = non_empty(ENV_SUPABASE_KEY) {
            self.remote.anon_key = Some(key);
        }
        if let Some(token) = non_empty(ENV_ACCESS_TOKEN) {
            self.remote.access_token = Some(token);
        }
    }

    /// Save configuration to an explicit file
    pub fn save_to_path(&mut self, config_path: &Path) -> Result<(), ConfigError> {
        self.config_version = Some(CURRENT_CONFIG_VERSION);

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| ConfigError::WriteError(e.to_string()))?;
        }

        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::WriteError(format!("Failed to serialize config: {}", e)))?;

        fs::write(config_path, toml_string)
            .map_err(|e| ConfigError::WriteError(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the config file
    pub fn get_config_path(profile: utils::Profile) -> Result<PathBuf, ConfigError> {
        let config_dir = utils::get_config_dir(profile)
            .ok_or_else(|| ConfigError::ConfigDirError("Could not determine config directory".to_string()))?;
        Ok(config_dir.join("config.toml"))
    }

    /// Get default database path for a specific profile
    fn default_database_path_for_profile(profile: utils::Profile) -> String {
        if let Some(data_dir) = utils::get_data_dir(profile) {
            data_dir.join("dayboard.db").to_string_lossy().to_string()
        } else {
            match profile {
                utils::Profile::Dev => "~/.local/share/dayboard-dev/dayboard.db".to_string(),
                utils::Profile::Prod => "~/.local/share/dayboard/dayboard.db".to_string(),
            }
        }
    }

    /// Get the expanded database path (with ~ expansion)
    pub fn get_database_path(&self) -> PathBuf {
        utils::expand_path(&self.database_path)
    }

    /// Get the currently active theme, falling back to the default preset
    pub fn get_active_theme(&self) -> Theme {
        if let Some(theme) = self.themes.get(&self.current_theme) {
            theme.clone()
        } else if let Some(theme) = Theme::get_preset_themes().get(&self.current_theme) {
            theme.clone()
        } else {
            Theme::default()
        }
    }

    /// Set the active theme by name
    pub fn set_theme(&mut self, name: &str) -> Result<(), ConfigError> {
        if !self.themes.contains_key(name) && !Theme::get_preset_themes().contains_key(name) {
            return Err(ConfigError::ThemeNotFound(name.to_string()));
        }
        self.current_theme = name.to_string();
        Ok(())
    }

    /// Get all available theme names (presets + user-defined), sorted
    pub fn get_available_themes(&self) -> Vec<String> {
        let mut themes: Vec<String> = Theme::get_preset_themes().keys().cloned().collect();
        for theme_name in self.themes.keys() {
            if !themes.contains(theme_name) {
                themes.push(theme_name.clone());
            }
        }
        themes.sort();
        themes
    }
}
