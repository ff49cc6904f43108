//! Headless driver for the scroll-sync engine.
//!
//! Responsibilities here are intentionally minimal:
//! - Parse command-line arguments.
//! - Load user configuration from `conf/config.toml`.
//! - Load the transcript via `transcript_loader`.
//! - Replay playback ticks through the engine and a frame-stepped scroll
//!   driver, logging highlight and scroll decisions.
//! - Remember where playback stopped.

mod cache;
mod driver;
mod transcript_loader;

use crate::cache::{Bookmark, load_bookmark, save_bookmark};
use crate::driver::ScrollDriver;
use crate::transcript_loader::load_transcript;
use anyhow::{Context, Result, anyhow};
use scrollsync_core::config::load_config;
use scrollsync_core::{Effect, Engine, MonospaceMeasurer, Phase, TextMeasurer};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*, reload};

type ReloadHandle = reload::Handle<EnvFilter, tracing_subscriber::Registry>;

const REBUILD_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_TICK_MS: u64 = 250;

struct Args {
    transcript: PathBuf,
    tick_ms: u64,
    resume: bool,
}

fn main() {
    let reload_handle = init_tracing();
    if let Err(err) = run(&reload_handle) {
        error!("{err:?}");
        std::process::exit(1);
    }
}

fn run(reload_handle: &ReloadHandle) -> Result<()> {
    let args = parse_args()?;
    let config = load_config(Path::new("conf/config.toml"));
    set_log_level(reload_handle, config.log_level.as_filter_str());
    info!(
        path = %args.transcript.display(),
        level = %config.log_level,
        tick_ms = args.tick_ms,
        "Starting scroll sync replay"
    );

    let transcript = load_transcript(&args.transcript)?;
    let measurer = MonospaceMeasurer::new(config.char_width, config.line_height);
    let mut engine = Engine::new(measurer, &config);
    let mut driver = ScrollDriver::default();

    driver.apply(
        engine
            .set_data(transcript.text, transcript.segments)
            .context("Transcript segments are not usable")?,
    );
    engine.set_viewport_height(config.viewport_height);
    engine.set_width(config.width);
    driver.apply(engine.wait_for_rebuild(REBUILD_TIMEOUT));
    if engine.phase() != Phase::Ready {
        return Err(anyhow!(
            "Chunk index was not built within {}s",
            REBUILD_TIMEOUT.as_secs()
        ));
    }
    if let Some(list) = engine.chunks() {
        info!(
            chunks = list.len(),
            content_height = list.content_height(),
            width = list.width(),
            "Chunk index ready"
        );
    }

    let mut start_ms = 0;
    if args.resume {
        if let Some(bookmark) = load_bookmark(&args.transcript) {
            info!(
                time_ms = bookmark.time_ms,
                scroll_offset = bookmark.scroll_offset,
                "Resuming from bookmark"
            );
            start_ms = bookmark.time_ms;
            driver = ScrollDriver::new(bookmark.scroll_offset);
            engine.scrolled(driver.position());
        }
    }

    let end_ms = engine.segments().total_duration_ms();
    let mut time_ms = start_ms;
    while time_ms < end_ms {
        driver.apply(engine.poll());
        let effects = engine.set_time(time_ms);
        report(&engine, &effects, time_ms);
        driver.apply(effects);
        if let Some(position) = driver.step() {
            engine.scrolled(position);
        }
        time_ms += args.tick_ms;
    }
    while driver.is_animating() {
        if let Some(position) = driver.step() {
            engine.scrolled(position);
        }
    }
    if let Some(range) = driver.highlight() {
        info!(?range, "Last highlighted segment");
    }

    let bookmark = Bookmark {
        time_ms: time_ms.min(end_ms),
        scroll_offset: engine.scroll_offset(),
    };
    save_bookmark(&args.transcript, &bookmark);
    info!(
        time_ms = bookmark.time_ms,
        scroll_offset = bookmark.scroll_offset,
        "Replay finished"
    );
    Ok(())
}

fn report<M: TextMeasurer>(engine: &Engine<M>, effects: &[Effect], time_ms: u64) {
    for effect in effects {
        match effect {
            Effect::Highlight(Some(range)) => {
                let text = excerpt(engine, range.start, range.end);
                info!(time_ms, ?range, %text, "Now reading");
            }
            Effect::Highlight(None) => info!(time_ms, "Between segments"),
            Effect::ScrollTo(target) => {
                let visible = engine.visible_range(*target, engine.viewport_height());
                info!(time_ms, target, ?visible, "Auto-scroll");
            }
            Effect::CancelScroll => {}
        }
    }
}

/// Up to 60 chars of the highlighted text, taken from its owning chunk.
fn excerpt<M: TextMeasurer>(engine: &Engine<M>, start: usize, end: usize) -> String {
    let Some(list) = engine.chunks() else {
        return String::new();
    };
    let Some(index) = list.chunk_index_for_offset(start) else {
        return String::new();
    };
    let (Some(chunk), Some(text)) = (list.get(index), list.chunk_text(index)) else {
        return String::new();
    };
    let take = end.min(chunk.offset_end).saturating_sub(start).min(60);
    text.chars()
        .skip(start - chunk.offset_start)
        .take(take)
        .collect()
}

fn parse_args() -> Result<Args> {
    let usage = || anyhow!("Usage: scrollsync <transcript> [--tick-ms <ms>] [--no-resume]");
    let mut transcript = None;
    let mut tick_ms = DEFAULT_TICK_MS;
    let mut resume = true;

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--tick-ms" => {
                let value = args.next().ok_or_else(usage)?;
                tick_ms = value
                    .parse::<u64>()
                    .with_context(|| format!("Invalid --tick-ms value '{value}'"))?
                    .max(1);
            }
            "--no-resume" => resume = false,
            _ if transcript.is_none() => transcript = Some(PathBuf::from(&arg)),
            _ => return Err(usage()),
        }
    }

    let transcript = transcript.ok_or_else(usage)?;
    if !transcript.exists() {
        return Err(anyhow!("File not found: {}", transcript.display()));
    }
    Ok(Args {
        transcript,
        tick_ms,
        resume,
    })
}

fn init_tracing() -> ReloadHandle {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let (filter_layer, handle) = reload::Layer::new(env_filter);
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_filter(filter_layer),
        )
        .init();
    warn!("Logging initialized; override level with config.log_level or RUST_LOG");
    handle
}

fn set_log_level(handle: &ReloadHandle, level: &str) {
    if env::var_os("RUST_LOG").is_some() {
        info!(%level, "RUST_LOG is set; ignoring config log level");
        return;
    }
    let parsed = EnvFilter::builder()
        .parse(level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    if let Err(err) = handle.modify(|filter| *filter = parsed) {
        warn!(%level, "Failed to update log level from config: {err}");
    } else {
        info!(%level, "Applied log level from config");
    }
}
