use crate::sync::ScrollPolicy;
use serde::Deserialize;

/// Flattened engine configuration; (de)serialized through the TOML tables.
#[derive(Debug, Clone, PartialEq, Deserialize, serde::Serialize)]
pub struct EngineConfig {
    #[serde(default = "crate::config::defaults::default_chunk_size_hint")]
    pub chunk_size_hint: usize,
    #[serde(default = "crate::config::defaults::default_max_lookback")]
    pub max_lookback: usize,
    #[serde(default = "crate::config::defaults::default_layout_cache_capacity")]
    pub layout_cache_capacity: usize,
    #[serde(default = "crate::config::defaults::default_char_width")]
    pub char_width: f32,
    #[serde(default = "crate::config::defaults::default_line_height")]
    pub line_height: f32,
    #[serde(default = "crate::config::defaults::default_width")]
    pub width: f32,
    #[serde(default = "crate::config::defaults::default_viewport_height")]
    pub viewport_height: f32,
    #[serde(default = "crate::config::defaults::default_auto_scroll")]
    pub auto_scroll: bool,
    #[serde(default = "crate::config::defaults::default_center_highlight")]
    pub center_highlight: bool,
    #[serde(default = "crate::config::defaults::default_scroll_epsilon_px")]
    pub scroll_epsilon_px: f32,
    #[serde(default = "crate::config::defaults::default_log_level")]
    pub log_level: LogLevel,
}

impl Default for EngineConfig {
    fn default() -> Self {
        use crate::config::defaults::*;
        EngineConfig {
            chunk_size_hint: default_chunk_size_hint(),
            max_lookback: default_max_lookback(),
            layout_cache_capacity: default_layout_cache_capacity(),
            char_width: default_char_width(),
            line_height: default_line_height(),
            width: default_width(),
            viewport_height: default_viewport_height(),
            auto_scroll: default_auto_scroll(),
            center_highlight: default_center_highlight(),
            scroll_epsilon_px: default_scroll_epsilon_px(),
            log_level: default_log_level(),
        }
    }
}

impl EngineConfig {
    pub fn scroll_policy(&self) -> ScrollPolicy {
        ScrollPolicy {
            auto_scroll: self.auto_scroll,
            center_highlight: self.center_highlight,
            epsilon_px: if self.scroll_epsilon_px.is_finite() {
                self.scroll_epsilon_px.max(0.0)
            } else {
                1.0
            },
        }
    }
}

/// Supported logging verbosity levels.
#[derive(Debug, Clone, Copy, Deserialize, serde::Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_filter_str())
    }
}

impl LogLevel {
    pub fn as_filter_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}
