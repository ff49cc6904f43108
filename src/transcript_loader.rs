//! Transcript loading for the headless driver.
//!
//! Two on-disk shapes are understood:
//! - JSON: `{ "text": "...", "segments": [{ "start_ms", "end_ms", "offset_start", "offset_end" }] }`
//! - Cue text (`.vtt`, `.srt`, `.txt`): a timing line `HH:MM:SS.mmm --> HH:MM:SS.mmm`
//!   followed by text lines up to a blank line. Cue texts are joined with a
//!   single space and segments are produced from where each cue lands.
//!
//! Segment validation is left to the engine, which rejects bad input at load.

use anyhow::{Context, Result, anyhow};
use once_cell::sync::Lazy;
use regex::Regex;
use scrollsync_core::TextSegment;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

static RE_CUE_TIMING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(\d{1,3}):(\d{2}):(\d{2})[.,](\d{3})\s*-->\s*(\d{1,3}):(\d{2}):(\d{2})[.,](\d{3})")
        .unwrap()
});
static RE_INNER_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

#[derive(Debug, Clone, Deserialize)]
pub struct Transcript {
    pub text: String,
    pub segments: Vec<TextSegment>,
}

/// Load a transcript, choosing the parser from the file extension.
pub fn load_transcript(path: &Path) -> Result<Transcript> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read transcript {}", path.display()))?;
    let transcript = if is_json(path) {
        serde_json::from_str::<Transcript>(&data)
            .with_context(|| format!("Failed to parse JSON transcript {}", path.display()))?
    } else {
        parse_cues(&data).with_context(|| format!("Failed to parse cues in {}", path.display()))?
    };
    info!(
        path = %path.display(),
        chars = transcript.text.chars().count(),
        segments = transcript.segments.len(),
        "Loaded transcript"
    );
    Ok(transcript)
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

/// Build text and segments from cue-formatted input.
pub fn parse_cues(data: &str) -> Result<Transcript> {
    let mut text = String::new();
    let mut text_chars = 0usize;
    let mut segments = Vec::new();
    let mut lines = data.lines().peekable();

    while let Some(line) = lines.next() {
        let Some(caps) = RE_CUE_TIMING.captures(line) else {
            continue;
        };
        let start_ms = timestamp_ms(&caps[1], &caps[2], &caps[3], &caps[4])?;
        let end_ms = timestamp_ms(&caps[5], &caps[6], &caps[7], &caps[8])?;

        let mut body = Vec::new();
        while let Some(next) = lines.peek() {
            if next.trim().is_empty() {
                break;
            }
            body.push(next.trim());
            lines.next();
        }
        let cue = RE_INNER_WS.replace_all(&body.join(" "), " ").into_owned();
        if cue.is_empty() {
            debug!(start_ms, end_ms, "Skipping cue without text");
            continue;
        }

        if !text.is_empty() {
            text.push(' ');
            text_chars += 1;
        }
        let offset_start = text_chars;
        let cue_chars = cue.chars().count();
        text.push_str(&cue);
        text_chars += cue_chars;
        segments.push(TextSegment::new(
            start_ms,
            end_ms,
            offset_start,
            offset_start + cue_chars,
        ));
    }

    if segments.is_empty() {
        return Err(anyhow!("No timed cues found"));
    }
    Ok(Transcript { text, segments })
}

fn timestamp_ms(hours: &str, minutes: &str, seconds: &str, millis: &str) -> Result<u64> {
    let parse = |part: &str| {
        part.parse::<u64>()
            .with_context(|| format!("Invalid timestamp component '{part}'"))
    };
    let (h, m, s, ms) = (parse(hours)?, parse(minutes)?, parse(seconds)?, parse(millis)?);
    if m >= 60 || s >= 60 {
        return Err(anyhow!("Timestamp out of range: {hours}:{minutes}:{seconds}.{millis}"));
    }
    Ok(((h * 60 + m) * 60 + s) * 1000 + ms)
}
