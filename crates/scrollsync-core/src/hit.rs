//! Offset to position and position to offset mapping.
//!
//! Chunk layouts are measured on demand for each query. A small LRU of recent
//! layouts can be enabled; with capacity zero nothing is retained between
//! calls, so memory stays bounded regardless of how far the user scrolls.

use crate::chunks::ChunkList;
use crate::measure::{TextLayout, TextMeasurer};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::ops::Range;
use std::rc::Rc;
use std::sync::Arc;
use tracing::trace;

/// Absolute geometry of the line holding a char offset.
#[derive(Debug, Clone, PartialEq)]
pub struct LineLocation {
    pub chunk_index: usize,
    /// Line index local to the chunk.
    pub line: usize,
    pub line_top: f32,
    pub line_bottom: f32,
    /// Global char range of the line.
    pub offsets: Range<usize>,
}

impl LineLocation {
    pub fn center(&self) -> f32 {
        (self.line_top + self.line_bottom) * 0.5
    }
}

pub struct HitMapper<M: TextMeasurer> {
    measurer: Arc<M>,
    cache: RefCell<LayoutCache<M::Layout>>,
}

impl<M: TextMeasurer> HitMapper<M> {
    pub fn new(measurer: Arc<M>, cache_capacity: usize) -> Self {
        Self {
            measurer,
            cache: RefCell::new(LayoutCache::new(cache_capacity)),
        }
    }

    /// Drop every cached layout.
    pub fn invalidate(&self) {
        self.cache.borrow_mut().clear();
    }

    pub fn cached_layouts(&self) -> usize {
        self.cache.borrow().len()
    }

    /// Line geometry for global char `offset`, or `None` outside the text.
    pub fn locate(&self, list: &ChunkList, offset: usize) -> Option<LineLocation> {
        let chunk_index = list.chunk_index_for_offset(offset)?;
        let chunk = list.get(chunk_index)?;
        let layout = self.layout_for(list, chunk_index)?;
        let line = layout.line_for_offset(offset - chunk.offset_start);
        let local = layout.line_range(line);
        Some(LineLocation {
            chunk_index,
            line,
            line_top: chunk.start_y + layout.line_top(line),
            line_bottom: chunk.start_y + layout.line_bottom(line),
            offsets: chunk.offset_start + local.start..chunk.offset_start + local.end,
        })
    }

    /// Global char offset under the content-space point `(x, y)`.
    pub fn hit_test(&self, list: &ChunkList, x: f32, y: f32) -> Option<usize> {
        let chunk_index = list.chunk_index_at_y(y)?;
        let chunk = list.get(chunk_index)?;
        let layout = self.layout_for(list, chunk_index)?;
        let line = layout.line_for_vertical(y - chunk.start_y);
        let local = layout
            .offset_for_horizontal(line, x)
            .min(chunk.char_len().saturating_sub(1));
        Some(chunk.offset_start + local)
    }

    fn layout_for(&self, list: &ChunkList, chunk_index: usize) -> Option<Rc<M::Layout>> {
        let key = (list.generation(), chunk_index);
        if let Some(layout) = self.cache.borrow_mut().get(key) {
            trace!(chunk_index, "Layout cache hit");
            return Some(layout);
        }
        let text = list.chunk_text(chunk_index)?;
        let layout = Rc::new(self.measurer.measure(text, list.width()));
        self.cache.borrow_mut().insert(key, Rc::clone(&layout));
        Some(layout)
    }
}

/// Most-recently-used layouts keyed by (list generation, chunk index).
struct LayoutCache<L> {
    capacity: usize,
    entries: VecDeque<((u64, usize), Rc<L>)>,
}

impl<L> LayoutCache<L> {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn clear(&mut self) {
        self.entries.clear();
    }

    fn get(&mut self, key: (u64, usize)) -> Option<Rc<L>> {
        let pos = self.entries.iter().position(|(k, _)| *k == key)?;
        let entry = self.entries.remove(pos)?;
        let layout = Rc::clone(&entry.1);
        self.entries.push_front(entry);
        Some(layout)
    }

    fn insert(&mut self, key: (u64, usize), layout: Rc<L>) {
        if self.capacity == 0 {
            return;
        }
        // Entries from an older list can never be hit again.
        self.entries.retain(|((generation, _), _)| *generation == key.0);
        while self.entries.len() >= self.capacity {
            self.entries.pop_back();
        }
        self.entries.push_front((key, layout));
    }
}
