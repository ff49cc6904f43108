//! Engine configuration.
//!
//! Settings live in `conf/config.toml`, grouped into `[chunking]`, `[layout]`,
//! `[scrolling]` and `[logging]` tables. Missing tables or keys fall back to
//! defaults, and an unreadable file yields the default configuration.

mod defaults;
mod io;
mod models;
mod tables;

pub use io::{load_config, parse_config, serialize_config};
pub use models::{EngineConfig, LogLevel};
