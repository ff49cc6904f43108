//! Whitespace-aligned chunking of the full text and the measured chunk index.
//!
//! A [`ChunkList`] is built in one pass by [`ChunkStore`] and is immutable once
//! returned: re-wrapping at another width produces a fresh list instead of
//! touching the one readers hold.

use crate::cancellation::CancellationToken;
use crate::measure::{TextLayout, TextMeasurer};
use std::fmt;
use std::ops::Range;
use std::sync::Arc;
use tracing::{debug, trace};

/// One layout unit: a char range of the full text plus its vertical extent.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub offset_start: usize,
    pub offset_end: usize,
    byte_start: usize,
    byte_end: usize,
    pub start_y: f32,
    pub height: f32,
}

impl Chunk {
    pub fn offsets(&self) -> Range<usize> {
        self.offset_start..self.offset_end
    }

    pub fn char_len(&self) -> usize {
        self.offset_end - self.offset_start
    }

    pub fn end_y(&self) -> f32 {
        self.start_y + self.height
    }

    pub fn contains_offset(&self, offset: usize) -> bool {
        self.offset_start <= offset && offset < self.offset_end
    }

    pub fn contains_y(&self, y: f32) -> bool {
        self.start_y <= y && y < self.end_y()
    }

    fn bytes(&self) -> Range<usize> {
        self.byte_start..self.byte_end
    }
}

/// Measured, ordered chunks over a shared text.
#[derive(Clone)]
pub struct ChunkList {
    text: Arc<str>,
    chunks: Vec<Chunk>,
    width: f32,
    char_len: usize,
    content_height: f32,
    generation: u64,
}

impl fmt::Debug for ChunkList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChunkList")
            .field("chunks", &self.chunks.len())
            .field("width", &self.width)
            .field("char_len", &self.char_len)
            .field("content_height", &self.content_height)
            .field("generation", &self.generation)
            .finish()
    }
}

impl ChunkList {
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Chunk> {
        self.chunks.get(index)
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Text of chunk `index`, borrowed from the shared full text.
    pub fn chunk_text(&self, index: usize) -> Option<&str> {
        self.chunks.get(index).map(|chunk| &self.text[chunk.bytes()])
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    /// Length of the full text in chars.
    pub fn char_len(&self) -> usize {
        self.char_len
    }

    pub fn content_height(&self) -> f32 {
        self.content_height
    }

    /// Identifies the rebuild that produced this list.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn with_generation(mut self, generation: u64) -> Self {
        self.generation = generation;
        self
    }

    /// Chunk owning char `offset`, or `None` past the end of the text.
    pub fn chunk_index_for_offset(&self, offset: usize) -> Option<usize> {
        if offset >= self.char_len {
            return None;
        }
        let idx = self.chunks.partition_point(|chunk| chunk.offset_end <= offset);
        self.chunks
            .get(idx)
            .filter(|chunk| chunk.contains_offset(offset))
            .map(|_| idx)
    }

    /// Chunk whose `[start_y, start_y + height)` contains `y`.
    pub fn chunk_index_at_y(&self, y: f32) -> Option<usize> {
        if !y.is_finite() || y < 0.0 {
            return None;
        }
        let idx = self.chunks.partition_point(|chunk| chunk.end_y() <= y);
        self.chunks
            .get(idx)
            .filter(|chunk| chunk.contains_y(y))
            .map(|_| idx)
    }
}

/// Char and byte bounds of one chunk before measurement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ChunkBounds {
    pub(crate) chars: Range<usize>,
    pub(crate) bytes: Range<usize>,
}

/// Builds chunk lists through the external measurer.
#[derive(Debug)]
pub struct ChunkStore<M> {
    measurer: Arc<M>,
    chunk_size_hint: usize,
    max_lookback: usize,
}

impl<M: TextMeasurer> ChunkStore<M> {
    /// `max_lookback` of zero means half the chunk size hint.
    pub fn new(measurer: Arc<M>, chunk_size_hint: usize, max_lookback: usize) -> Self {
        let chunk_size_hint = chunk_size_hint.max(1);
        let max_lookback = if max_lookback == 0 {
            (chunk_size_hint / 2).max(1)
        } else {
            max_lookback
        };
        Self {
            measurer,
            chunk_size_hint,
            max_lookback,
        }
    }

    pub fn measurer(&self) -> &Arc<M> {
        &self.measurer
    }

    pub fn chunk_size_hint(&self) -> usize {
        self.chunk_size_hint
    }

    pub fn max_lookback(&self) -> usize {
        self.max_lookback
    }

    /// Split and measure `text` at `width`.
    ///
    /// Returns `None` when the width is not usable yet.
    pub fn rebuild(&self, text: Arc<str>, width: f32) -> Option<ChunkList> {
        self.rebuild_cancellable(text, width, &CancellationToken::new())
    }

    /// Like [`ChunkStore::rebuild`], but gives up as soon as `cancel` fires.
    pub fn rebuild_cancellable(
        &self,
        text: Arc<str>,
        width: f32,
        cancel: &CancellationToken,
    ) -> Option<ChunkList> {
        if !width.is_finite() || width <= 0.0 {
            debug!(width, "Skipping chunk rebuild until a usable width is known");
            return None;
        }

        let bounds = split_bounds(&text, self.chunk_size_hint, self.max_lookback, cancel)?;
        let mut chunks = Vec::with_capacity(bounds.len());
        let mut y = 0.0f32;
        for bound in bounds {
            if cancel.is_cancelled() {
                debug!(measured = chunks.len(), "Chunk rebuild cancelled mid-measurement");
                return None;
            }
            let height = self.measurer.measure(&text[bound.bytes.clone()], width).height();
            chunks.push(Chunk {
                offset_start: bound.chars.start,
                offset_end: bound.chars.end,
                byte_start: bound.bytes.start,
                byte_end: bound.bytes.end,
                start_y: y,
                height,
            });
            y += height;
        }

        let char_len = chunks.last().map(|chunk| chunk.offset_end).unwrap_or(0);
        debug!(
            chunks = chunks.len(),
            char_len,
            width,
            content_height = y,
            "Built chunk index"
        );
        Some(ChunkList {
            text,
            chunks,
            width,
            char_len,
            content_height: y,
            generation: 0,
        })
    }
}

/// Cut `text` into consecutive chunks of about `hint` chars, each ending just
/// after whitespace when one lies within `lookback` chars of the hint boundary.
pub(crate) fn split_bounds(
    text: &str,
    hint: usize,
    lookback: usize,
    cancel: &CancellationToken,
) -> Option<Vec<ChunkBounds>> {
    let hint = hint.max(1);
    let lookback = lookback.max(1);
    let mut bounds = Vec::with_capacity(text.len() / hint + 1);
    let mut byte_pos = 0usize;
    let mut char_pos = 0usize;

    while byte_pos < text.len() {
        if cancel.is_cancelled() {
            debug!(chunks = bounds.len(), "Chunk split cancelled");
            return None;
        }
        let rest = &text[byte_pos..];
        let mut end_bytes = rest.len();
        let mut end_chars = 0usize;
        for (idx, _) in rest.char_indices() {
            if end_chars == hint {
                end_bytes = idx;
                break;
            }
            end_chars += 1;
        }

        if end_bytes < rest.len() {
            match whitespace_cut(&rest[..end_bytes], end_chars, lookback) {
                Some((cut_bytes, cut_chars)) => {
                    end_bytes = cut_bytes;
                    end_chars = cut_chars;
                }
                None => trace!(
                    offset = char_pos + end_chars,
                    lookback, "No whitespace in lookback window; cutting at hint"
                ),
            }
        }

        bounds.push(ChunkBounds {
            chars: char_pos..char_pos + end_chars,
            bytes: byte_pos..byte_pos + end_bytes,
        });
        byte_pos += end_bytes;
        char_pos += end_chars;
    }

    Some(bounds)
}

/// Position just after the last whitespace among the final `lookback` chars
/// of `head`, as (bytes, chars) relative to the start of `head`.
fn whitespace_cut(head: &str, head_chars: usize, lookback: usize) -> Option<(usize, usize)> {
    head.char_indices()
        .rev()
        .take(lookback)
        .enumerate()
        .find(|(_, (_, ch))| ch.is_whitespace())
        .map(|(from_end, (idx, ch))| (idx + ch.len_utf8(), head_chars - from_end))
}
