//! Boundary to the external text measurement capability.
//!
//! The engine never shapes text itself. It hands one chunk at a time to a
//! [`TextMeasurer`] and reads back line geometry through [`TextLayout`]. All
//! offsets crossing this boundary are char indices local to the measured text.

use std::ops::Range;

/// Line-breaking facility the engine calls once per chunk.
pub trait TextMeasurer: Send + Sync + 'static {
    type Layout: TextLayout;

    fn measure(&self, text: &str, width: f32) -> Self::Layout;
}

/// Line geometry of a single measured block of text.
pub trait TextLayout {
    /// Total rendered height.
    fn height(&self) -> f32;

    fn line_count(&self) -> usize;

    fn line_top(&self, line: usize) -> f32;

    fn line_bottom(&self, line: usize) -> f32;

    /// Char offsets covered by `line`.
    fn line_range(&self, line: usize) -> Range<usize>;

    /// Line at local vertical position `y`, clamped to the first/last line.
    fn line_for_vertical(&self, y: f32) -> usize;

    /// Line containing local char `offset`, clamped to the last line.
    fn line_for_offset(&self, offset: usize) -> usize;

    /// Char under horizontal position `x` on `line`.
    fn offset_for_horizontal(&self, line: usize, x: f32) -> usize;
}

/// Deterministic fixed-advance measurer with greedy word wrapping.
///
/// Hard breaks on `\n`, wraps after whitespace, and force-breaks words that
/// are wider than a whole line. Trailing whitespace may hang past the edge.
#[derive(Debug, Clone, Copy)]
pub struct MonospaceMeasurer {
    char_width: f32,
    line_height: f32,
}

impl MonospaceMeasurer {
    pub fn new(char_width: f32, line_height: f32) -> Self {
        Self {
            char_width: sanitize_metric(char_width),
            line_height: sanitize_metric(line_height),
        }
    }

    pub fn char_width(&self) -> f32 {
        self.char_width
    }

    pub fn line_height(&self) -> f32 {
        self.line_height
    }

    fn columns_for(&self, width: f32) -> usize {
        if !width.is_finite() || width <= 0.0 {
            return 1;
        }
        ((width / self.char_width).floor() as usize).max(1)
    }
}

impl Default for MonospaceMeasurer {
    fn default() -> Self {
        Self::new(9.0, 20.0)
    }
}

impl TextMeasurer for MonospaceMeasurer {
    type Layout = MonospaceLayout;

    fn measure(&self, text: &str, width: f32) -> MonospaceLayout {
        MonospaceLayout {
            lines: wrap_lines(text, self.columns_for(width)),
            char_width: self.char_width,
            line_height: self.line_height,
        }
    }
}

fn sanitize_metric(value: f32) -> f32 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        1.0
    }
}

#[derive(Debug, Clone)]
pub struct MonospaceLayout {
    lines: Vec<Range<usize>>,
    char_width: f32,
    line_height: f32,
}

impl TextLayout for MonospaceLayout {
    fn height(&self) -> f32 {
        self.lines.len() as f32 * self.line_height
    }

    fn line_count(&self) -> usize {
        self.lines.len()
    }

    fn line_top(&self, line: usize) -> f32 {
        line.min(self.last_line()) as f32 * self.line_height
    }

    fn line_bottom(&self, line: usize) -> f32 {
        self.line_top(line) + self.line_height
    }

    fn line_range(&self, line: usize) -> Range<usize> {
        self.lines
            .get(line.min(self.last_line()))
            .cloned()
            .unwrap_or(0..0)
    }

    fn line_for_vertical(&self, y: f32) -> usize {
        if !y.is_finite() || y <= 0.0 {
            return 0;
        }
        ((y / self.line_height).floor() as usize).min(self.last_line())
    }

    fn line_for_offset(&self, offset: usize) -> usize {
        self.lines
            .partition_point(|range| range.start <= offset)
            .saturating_sub(1)
            .min(self.last_line())
    }

    fn offset_for_horizontal(&self, line: usize, x: f32) -> usize {
        let range = self.line_range(line);
        if range.is_empty() {
            return range.start;
        }
        let column = if x.is_finite() && x > 0.0 {
            (x / self.char_width).floor() as usize
        } else {
            0
        };
        (range.start + column).min(range.end - 1)
    }
}

impl MonospaceLayout {
    fn last_line(&self) -> usize {
        self.lines.len().saturating_sub(1)
    }
}

/// Greedy wrap of `text` into lines of at most `columns` visible chars.
fn wrap_lines(text: &str, columns: usize) -> Vec<Range<usize>> {
    let mut lines = Vec::new();
    let mut line_start = 0usize;
    // Char index just after the most recent whitespace on the current line.
    let mut break_after: Option<usize> = None;
    let mut total = 0usize;

    for (idx, ch) in text.chars().enumerate() {
        total = idx + 1;
        if ch == '\n' {
            lines.push(line_start..idx + 1);
            line_start = idx + 1;
            break_after = None;
            continue;
        }
        if !ch.is_whitespace() && idx - line_start >= columns {
            let cut = match break_after {
                Some(cut) if cut > line_start => cut,
                _ => idx,
            };
            lines.push(line_start..cut);
            line_start = cut;
            break_after = None;
        }
        if ch.is_whitespace() {
            break_after = Some(idx + 1);
        }
    }

    if line_start < total || lines.is_empty() {
        lines.push(line_start..total);
    }
    lines
}
