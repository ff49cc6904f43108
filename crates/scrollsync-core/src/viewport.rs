//! Chunks intersecting the visible band.

use crate::chunks::{Chunk, ChunkList};
use std::ops::Range;

/// A chunk to draw this frame, with its text and absolute position.
#[derive(Debug, Clone, Copy)]
pub struct VisibleChunk<'a> {
    pub index: usize,
    pub chunk: &'a Chunk,
    pub text: &'a str,
}

impl VisibleChunk<'_> {
    pub fn start_y(&self) -> f32 {
        self.chunk.start_y
    }
}

/// Lazy, restartable walk over the chunks touching `[top, bottom]`.
#[derive(Debug, Clone)]
pub struct VisibleChunks<'a> {
    list: &'a ChunkList,
    next: usize,
    bottom: f32,
}

impl<'a> Iterator for VisibleChunks<'a> {
    type Item = VisibleChunk<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let chunk = self.list.get(self.next)?;
        if chunk.start_y > self.bottom {
            return None;
        }
        let text = self.list.chunk_text(self.next)?;
        let item = VisibleChunk {
            index: self.next,
            chunk,
            text,
        };
        self.next += 1;
        Some(item)
    }
}

/// Chunks overlapping the viewport at `scroll_offset` of `viewport_height`.
///
/// Binary-searches the first chunk reaching the top edge, then scans forward
/// until a chunk starts below the bottom edge.
pub fn visible_chunks(
    list: &ChunkList,
    scroll_offset: f32,
    viewport_height: f32,
) -> VisibleChunks<'_> {
    let top = scroll_offset.max(0.0);
    let first = list.chunks().partition_point(|chunk| chunk.end_y() < top);
    VisibleChunks {
        list,
        next: first,
        bottom: top + viewport_height.max(0.0),
    }
}

/// Index range of the chunks [`visible_chunks`] would yield.
pub fn visible_range(list: &ChunkList, scroll_offset: f32, viewport_height: f32) -> Range<usize> {
    let mut iter = visible_chunks(list, scroll_offset, viewport_height);
    let start = iter.next;
    let end = iter.by_ref().last().map(|item| item.index + 1).unwrap_or(start);
    start..end
}
