pub(crate) fn default_chunk_size_hint() -> usize {
    2000
}

/// Zero selects half of the chunk size hint.
pub(crate) fn default_max_lookback() -> usize {
    0
}

pub(crate) fn default_layout_cache_capacity() -> usize {
    0
}

pub(crate) fn default_char_width() -> f32 {
    9.0
}

pub(crate) fn default_line_height() -> f32 {
    20.0
}

pub(crate) fn default_width() -> f32 {
    600.0
}

pub(crate) fn default_viewport_height() -> f32 {
    800.0
}

pub(crate) fn default_auto_scroll() -> bool {
    true
}

pub(crate) fn default_center_highlight() -> bool {
    true
}

pub(crate) fn default_scroll_epsilon_px() -> f32 {
    1.0
}

pub(crate) fn default_log_level() -> crate::config::LogLevel {
    crate::config::LogLevel::Info
}
