//! Playback synchronization and the auto-scroll decision.
//!
//! [`SyncController`] is a reducer: every input (time tick, gesture phase,
//! index publication) updates [`SyncState`] and returns the [`Effect`]s the
//! caller must carry out. Geometry is injected per call, so the policy can be
//! exercised without a display surface.

use crate::hit::LineLocation;
use crate::segments::SegmentIndex;
use std::ops::Range;
use tracing::{debug, trace};

/// Work for the rendering layer and the scroll-animation driver.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Paint this char range as the current segment, or clear the highlight.
    Highlight(Option<Range<usize>>),
    /// Animate to this absolute scroll offset, replacing any pending target.
    ScrollTo(f32),
    /// Abort any in-flight scroll animation.
    CancelScroll,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No chunk index for the current data yet.
    Idle,
    Ready,
}

/// Line geometry the controller needs to place a scroll target.
pub trait Geometry {
    fn line_at(&self, offset: usize) -> Option<LineLocation>;

    fn content_height(&self) -> f32;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollPolicy {
    pub auto_scroll: bool,
    /// Center the highlighted line; otherwise keep it a quarter from the top.
    pub center_highlight: bool,
    /// Targets closer than this to the previous one are not re-issued.
    pub epsilon_px: f32,
}

impl Default for ScrollPolicy {
    fn default() -> Self {
        Self {
            auto_scroll: true,
            center_highlight: true,
            epsilon_px: 1.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncState {
    pub current_time: Option<u64>,
    pub highlight: Option<Range<usize>>,
    pub last_segment: Option<usize>,
    pub user_touching: bool,
    pub fling_active: bool,
    /// Last scroll target issued and not yet cancelled.
    pub scroll_target: Option<f32>,
}

impl SyncState {
    pub fn is_interacting(&self) -> bool {
        self.user_touching || self.fling_active
    }
}

#[derive(Debug, Clone)]
pub struct SyncController {
    state: SyncState,
    policy: ScrollPolicy,
    phase: Phase,
    viewport_height: f32,
}

impl SyncController {
    pub fn new(policy: ScrollPolicy, viewport_height: f32) -> Self {
        Self {
            state: SyncState::default(),
            policy,
            phase: Phase::Idle,
            viewport_height: viewport_height.max(0.0),
        }
    }

    pub fn state(&self) -> &SyncState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn policy(&self) -> ScrollPolicy {
        self.policy
    }

    pub fn set_policy(&mut self, policy: ScrollPolicy) {
        self.policy = policy;
    }

    pub fn viewport_height(&self) -> f32 {
        self.viewport_height
    }

    pub fn set_viewport_height(&mut self, height: f32) {
        if height.is_finite() {
            self.viewport_height = height.max(0.0);
        }
    }

    /// New playback time. Only a change of segment produces effects.
    pub fn set_time(
        &mut self,
        time_ms: u64,
        segments: &SegmentIndex,
        geometry: Option<&dyn Geometry>,
    ) -> Vec<Effect> {
        self.state.current_time = Some(time_ms);
        let found = segments.find_segment_at(time_ms);
        if found == self.state.last_segment {
            trace!(time_ms, segment = ?found, "Same segment; nothing to do");
            return Vec::new();
        }
        self.state.last_segment = found;

        let mut effects = Vec::new();
        match found.and_then(|idx| segments.segment(idx)) {
            Some(segment) => {
                let range = segment.offsets();
                debug!(time_ms, segment = ?found, ?range, "Highlight moved");
                self.state.highlight = Some(range.clone());
                effects.push(Effect::Highlight(Some(range)));
                if self.policy.auto_scroll {
                    effects.extend(self.follow_highlight(geometry));
                }
            }
            None => {
                if self.state.highlight.take().is_some() {
                    debug!(time_ms, "Time fell into a gap; clearing highlight");
                    effects.push(Effect::Highlight(None));
                }
            }
        }
        effects
    }

    pub fn touch_down(&mut self) -> Vec<Effect> {
        self.state.user_touching = true;
        self.state.scroll_target = None;
        debug!("Touch down; auto-scroll suspended");
        vec![Effect::CancelScroll]
    }

    pub fn touch_up(&mut self) {
        self.state.user_touching = false;
    }

    pub fn touch_cancel(&mut self) {
        self.state.user_touching = false;
    }

    pub fn fling_start(&mut self) {
        self.state.fling_active = true;
        self.state.scroll_target = None;
    }

    /// The fling animation came to rest on its own.
    pub fn fling_end(&mut self) {
        self.state.fling_active = false;
    }

    /// Explicit request to bring the current highlight into view.
    ///
    /// Ignores the auto-scroll toggle and dedup, but not an active gesture.
    pub fn jump_to_current(&mut self, geometry: Option<&dyn Geometry>) -> Vec<Effect> {
        self.state.scroll_target = None;
        self.follow_highlight(geometry).into_iter().collect()
    }

    /// Forget the transcript-bound state after the data was replaced.
    pub fn reset_data(&mut self) -> Vec<Effect> {
        self.phase = Phase::Idle;
        self.state.last_segment = None;
        self.state.scroll_target = None;
        if self.state.highlight.take().is_some() {
            vec![Effect::Highlight(None)]
        } else {
            Vec::new()
        }
    }

    /// A complete chunk index was published.
    ///
    /// On the first index for the current data the current time is evaluated
    /// again; afterwards the highlight is re-targeted because absolute line
    /// positions moved.
    pub fn index_published(
        &mut self,
        segments: &SegmentIndex,
        geometry: Option<&dyn Geometry>,
    ) -> Vec<Effect> {
        if self.phase == Phase::Idle {
            self.phase = Phase::Ready;
            self.state.last_segment = None;
            return match self.state.current_time {
                Some(time_ms) => self.set_time(time_ms, segments, geometry),
                None => Vec::new(),
            };
        }
        if !self.policy.auto_scroll {
            return Vec::new();
        }
        self.state.scroll_target = None;
        self.follow_highlight(geometry).into_iter().collect()
    }

    fn follow_highlight(&mut self, geometry: Option<&dyn Geometry>) -> Option<Effect> {
        if self.state.is_interacting() {
            trace!(
                touching = self.state.user_touching,
                fling = self.state.fling_active,
                "User interacting; auto-scroll suppressed"
            );
            return None;
        }
        let offset = self.state.highlight.as_ref()?.start;
        let geometry = geometry?;
        let line = geometry.line_at(offset)?;
        let target = self.target_for(&line, geometry.content_height());
        if let Some(previous) = self.state.scroll_target {
            if (previous - target).abs() < self.policy.epsilon_px {
                trace!(target, previous, "Scroll target unchanged");
                return None;
            }
        }
        debug!(target, offset, chunk = line.chunk_index, "Auto-scroll target");
        self.state.scroll_target = Some(target);
        Some(Effect::ScrollTo(target))
    }

    fn target_for(&self, line: &LineLocation, content_height: f32) -> f32 {
        let desired = if self.policy.center_highlight {
            line.center() - 0.5 * self.viewport_height
        } else {
            line.line_top - 0.25 * self.viewport_height
        };
        let max_scroll = (content_height - self.viewport_height).max(0.0);
        desired.clamp(0.0, max_scroll)
    }
}
