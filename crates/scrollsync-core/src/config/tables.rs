use super::defaults;
use super::models::{EngineConfig, LogLevel};
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize, serde::Serialize)]
pub(super) struct ConfigTables {
    #[serde(default)]
    chunking: ChunkingConfig,
    #[serde(default)]
    layout: LayoutConfig,
    #[serde(default)]
    scrolling: ScrollingConfig,
    #[serde(default)]
    logging: LoggingConfig,
}

impl From<ConfigTables> for EngineConfig {
    fn from(tables: ConfigTables) -> Self {
        EngineConfig {
            chunk_size_hint: tables.chunking.chunk_size_hint,
            max_lookback: tables.chunking.max_lookback,
            layout_cache_capacity: tables.layout.layout_cache_capacity,
            char_width: tables.layout.char_width,
            line_height: tables.layout.line_height,
            width: tables.layout.width,
            viewport_height: tables.layout.viewport_height,
            auto_scroll: tables.scrolling.auto_scroll,
            center_highlight: tables.scrolling.center_highlight,
            scroll_epsilon_px: tables.scrolling.scroll_epsilon_px,
            log_level: tables.logging.log_level,
        }
    }
}

impl From<&EngineConfig> for ConfigTables {
    fn from(config: &EngineConfig) -> Self {
        ConfigTables {
            chunking: ChunkingConfig {
                chunk_size_hint: config.chunk_size_hint,
                max_lookback: config.max_lookback,
            },
            layout: LayoutConfig {
                layout_cache_capacity: config.layout_cache_capacity,
                char_width: config.char_width,
                line_height: config.line_height,
                width: config.width,
                viewport_height: config.viewport_height,
            },
            scrolling: ScrollingConfig {
                auto_scroll: config.auto_scroll,
                center_highlight: config.center_highlight,
                scroll_epsilon_px: config.scroll_epsilon_px,
            },
            logging: LoggingConfig {
                log_level: config.log_level,
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct ChunkingConfig {
    #[serde(default = "defaults::default_chunk_size_hint")]
    chunk_size_hint: usize,
    #[serde(default = "defaults::default_max_lookback")]
    max_lookback: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        ChunkingConfig {
            chunk_size_hint: defaults::default_chunk_size_hint(),
            max_lookback: defaults::default_max_lookback(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct LayoutConfig {
    #[serde(default = "defaults::default_layout_cache_capacity")]
    layout_cache_capacity: usize,
    #[serde(default = "defaults::default_char_width")]
    char_width: f32,
    #[serde(default = "defaults::default_line_height")]
    line_height: f32,
    #[serde(default = "defaults::default_width")]
    width: f32,
    #[serde(default = "defaults::default_viewport_height")]
    viewport_height: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        LayoutConfig {
            layout_cache_capacity: defaults::default_layout_cache_capacity(),
            char_width: defaults::default_char_width(),
            line_height: defaults::default_line_height(),
            width: defaults::default_width(),
            viewport_height: defaults::default_viewport_height(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct ScrollingConfig {
    #[serde(default = "defaults::default_auto_scroll")]
    auto_scroll: bool,
    #[serde(default = "defaults::default_center_highlight")]
    center_highlight: bool,
    #[serde(default = "defaults::default_scroll_epsilon_px")]
    scroll_epsilon_px: f32,
}

impl Default for ScrollingConfig {
    fn default() -> Self {
        ScrollingConfig {
            auto_scroll: defaults::default_auto_scroll(),
            center_highlight: defaults::default_center_highlight(),
            scroll_epsilon_px: defaults::default_scroll_epsilon_px(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct LoggingConfig {
    #[serde(default = "defaults::default_log_level")]
    log_level: LogLevel,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            log_level: defaults::default_log_level(),
        }
    }
}
