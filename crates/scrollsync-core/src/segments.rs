//! Time to text-range index over transcript segments.
//!
//! Segments are loaded once and never mutated; replacing the transcript swaps
//! the whole index. Both lookups are binary searches and treat gaps as a
//! normal "not found" outcome.

use serde::{Deserialize, Serialize};
use std::ops::Range;
use thiserror::Error;

/// One transcript unit: a half-open time interval mapped to a half-open
/// character range of the full text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextSegment {
    pub start_ms: u64,
    pub end_ms: u64,
    pub offset_start: usize,
    pub offset_end: usize,
}

impl TextSegment {
    pub fn new(start_ms: u64, end_ms: u64, offset_start: usize, offset_end: usize) -> Self {
        Self {
            start_ms,
            end_ms,
            offset_start,
            offset_end,
        }
    }

    pub fn offsets(&self) -> Range<usize> {
        self.offset_start..self.offset_end
    }

    pub fn contains_time(&self, time_ms: u64) -> bool {
        self.start_ms <= time_ms && time_ms < self.end_ms
    }

    pub fn contains_offset(&self, offset: usize) -> bool {
        self.offset_start <= offset && offset < self.offset_end
    }
}

/// Reasons a segment list is rejected at load time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SegmentError {
    #[error("segment {index} has an empty time interval [{start_ms}, {end_ms})")]
    EmptyInterval {
        index: usize,
        start_ms: u64,
        end_ms: u64,
    },
    #[error("segment {index} has an empty offset range [{start}, {end})")]
    EmptyRange {
        index: usize,
        start: usize,
        end: usize,
    },
    #[error("segment {index} starts at {start_ms}ms before the previous segment ends at {prev_end_ms}ms")]
    TimeOverlap {
        index: usize,
        start_ms: u64,
        prev_end_ms: u64,
    },
    #[error("segment {index} starts at offset {start} before the previous segment ends at {prev_end}")]
    OffsetOverlap {
        index: usize,
        start: usize,
        prev_end: usize,
    },
    #[error("segment {index} ends at offset {end}, past the text length {text_len}")]
    OutOfBounds {
        index: usize,
        end: usize,
        text_len: usize,
    },
}

/// Ordered, immutable list of segments with logarithmic lookups.
#[derive(Debug, Clone, Default)]
pub struct SegmentIndex {
    segments: Vec<TextSegment>,
}

impl SegmentIndex {
    /// Validate and index `segments` for a text of `text_len` characters.
    ///
    /// Segments must have non-empty intervals, ascending non-overlapping
    /// times and ascending non-overlapping offsets inside the text.
    pub fn new(segments: Vec<TextSegment>, text_len: usize) -> Result<Self, SegmentError> {
        validate(&segments, text_len)?;
        Ok(Self { segments })
    }

    /// Index `segments` without validation.
    ///
    /// Unsorted or overlapping input never panics, but lookups may then
    /// return the wrong segment or miss one that exists.
    pub fn from_sorted_unchecked(segments: Vec<TextSegment>) -> Self {
        Self { segments }
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segment(&self, index: usize) -> Option<&TextSegment> {
        self.segments.get(index)
    }

    pub fn segments(&self) -> &[TextSegment] {
        &self.segments
    }

    /// End of the last segment, or zero when empty.
    pub fn total_duration_ms(&self) -> u64 {
        self.segments.last().map(|s| s.end_ms).unwrap_or(0)
    }

    /// Index of the segment whose `[start_ms, end_ms)` contains `time_ms`.
    pub fn find_segment_at(&self, time_ms: u64) -> Option<usize> {
        let mut lo = 0usize;
        let mut hi = self.segments.len();
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            let segment = &self.segments[mid];
            if time_ms < segment.start_ms {
                hi = mid;
            } else if time_ms >= segment.end_ms {
                lo = mid + 1;
            } else {
                return Some(mid);
            }
        }
        None
    }

    /// Index of the segment whose offset range contains `offset`.
    pub fn find_segment_containing_offset(&self, offset: usize) -> Option<usize> {
        let mut lo = 0usize;
        let mut hi = self.segments.len();
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            let segment = &self.segments[mid];
            if offset < segment.offset_start {
                hi = mid;
            } else if offset >= segment.offset_end {
                lo = mid + 1;
            } else {
                return Some(mid);
            }
        }
        None
    }

    /// Start time of the segment owning `offset`, used for click-to-seek.
    pub fn time_for_offset(&self, offset: usize) -> Option<u64> {
        self.find_segment_containing_offset(offset)
            .and_then(|idx| self.segments.get(idx))
            .map(|segment| segment.start_ms)
    }
}

fn validate(segments: &[TextSegment], text_len: usize) -> Result<(), SegmentError> {
    let mut previous: Option<&TextSegment> = None;
    for (index, segment) in segments.iter().enumerate() {
        if segment.start_ms >= segment.end_ms {
            return Err(SegmentError::EmptyInterval {
                index,
                start_ms: segment.start_ms,
                end_ms: segment.end_ms,
            });
        }
        if segment.offset_start >= segment.offset_end {
            return Err(SegmentError::EmptyRange {
                index,
                start: segment.offset_start,
                end: segment.offset_end,
            });
        }
        if segment.offset_end > text_len {
            return Err(SegmentError::OutOfBounds {
                index,
                end: segment.offset_end,
                text_len,
            });
        }
        if let Some(prev) = previous {
            if segment.start_ms < prev.end_ms {
                return Err(SegmentError::TimeOverlap {
                    index,
                    start_ms: segment.start_ms,
                    prev_end_ms: prev.end_ms,
                });
            }
            if segment.offset_start < prev.offset_end {
                return Err(SegmentError::OffsetOverlap {
                    index,
                    start: segment.offset_start,
                    prev_end: prev.offset_end,
                });
            }
        }
        previous = Some(segment);
    }
    Ok(())
}
