use super::models::EngineConfig;
use super::tables::ConfigTables;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// Load configuration from `path`, falling back to defaults on any error.
pub fn load_config(path: &Path) -> EngineConfig {
    let contents = match fs::read_to_string(path) {
        Ok(data) => {
            info!(path = %path.display(), "Loaded base config");
            data
        }
        Err(err) => {
            warn!(path = %path.display(), "Falling back to default config: {err}");
            return EngineConfig::default();
        }
    };

    match parse_config(&contents) {
        Ok(cfg) => {
            debug!("Parsed configuration from disk");
            cfg
        }
        Err(err) => {
            warn!(path = %path.display(), "Invalid config TOML: {err:#}");
            EngineConfig::default()
        }
    }
}

pub fn parse_config(contents: &str) -> Result<EngineConfig> {
    let tables: ConfigTables = toml::from_str(contents).context("Parsing config tables")?;
    Ok(tables.into())
}

pub fn serialize_config(config: &EngineConfig) -> Result<String> {
    toml::to_string(&ConfigTables::from(config)).context("Serializing config tables")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogLevel;

    #[test]
    fn empty_file_yields_defaults() {
        let cfg = parse_config("").expect("empty TOML is valid");
        assert_eq!(cfg, EngineConfig::default());
    }

    #[test]
    fn partial_tables_keep_remaining_defaults() {
        let cfg = parse_config(
            r#"
[chunking]
chunk_size_hint = 512

[scrolling]
center_highlight = false

[logging]
log_level = "trace"
"#,
        )
        .expect("valid TOML");
        assert_eq!(cfg.chunk_size_hint, 512);
        assert_eq!(cfg.max_lookback, 0);
        assert!(!cfg.center_highlight);
        assert!(cfg.auto_scroll);
        assert_eq!(cfg.log_level, LogLevel::Trace);
        assert_eq!(cfg.line_height, 20.0);
    }

    #[test]
    fn serialized_config_parses_back() {
        let mut cfg = EngineConfig::default();
        cfg.layout_cache_capacity = 8;
        cfg.width = 320.0;
        let text = serialize_config(&cfg).expect("serializes");
        assert!(text.contains("[layout]"));
        assert_eq!(parse_config(&text).expect("parses"), cfg);
    }

    #[test]
    fn missing_or_invalid_file_falls_back() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert_eq!(
            load_config(&dir.path().join("absent.toml")),
            EngineConfig::default()
        );
        let bad = dir.path().join("bad.toml");
        fs::write(&bad, "[chunking\nchunk_size_hint = ").expect("write");
        assert_eq!(load_config(&bad), EngineConfig::default());
    }

    #[test]
    fn scroll_policy_sanitizes_epsilon() {
        let mut cfg = EngineConfig::default();
        cfg.scroll_epsilon_px = f32::NAN;
        assert_eq!(cfg.scroll_policy().epsilon_px, 1.0);
        cfg.scroll_epsilon_px = -2.0;
        assert_eq!(cfg.scroll_policy().epsilon_px, 0.0);
    }
}
