//! Frame-stepped scroll animation for the headless run.
//!
//! Stands in for a display surface's scroll widget: it applies engine effects,
//! eases toward the latest target once per tick and reports where it landed.

use scrollsync_core::Effect;
use std::ops::Range;
use tracing::{debug, trace};

/// Fraction of the remaining distance covered each frame.
const EASING: f32 = 0.35;
/// Remaining distance under which the animation snaps to its target.
const SNAP_PX: f32 = 0.5;

#[derive(Debug, Default)]
pub struct ScrollDriver {
    position: f32,
    target: Option<f32>,
    highlight: Option<Range<usize>>,
}

impl ScrollDriver {
    pub fn new(position: f32) -> Self {
        Self {
            position: position.max(0.0),
            ..Self::default()
        }
    }

    pub fn position(&self) -> f32 {
        self.position
    }

    pub fn highlight(&self) -> Option<&Range<usize>> {
        self.highlight.as_ref()
    }

    pub fn is_animating(&self) -> bool {
        self.target.is_some()
    }

    pub fn apply(&mut self, effects: impl IntoIterator<Item = Effect>) {
        for effect in effects {
            match effect {
                Effect::Highlight(range) => {
                    debug!(?range, "Highlight");
                    self.highlight = range;
                }
                Effect::ScrollTo(target) => {
                    debug!(target, from = self.position, "Scroll animation started");
                    self.target = Some(target);
                }
                Effect::CancelScroll => {
                    if self.target.take().is_some() {
                        debug!(at = self.position, "Scroll animation cancelled");
                    }
                }
            }
        }
    }

    /// Advance one frame. Returns the new position when it moved.
    pub fn step(&mut self) -> Option<f32> {
        let target = self.target?;
        let remaining = target - self.position;
        if remaining.abs() <= SNAP_PX {
            self.position = target;
            self.target = None;
            trace!(position = target, "Scroll animation settled");
        } else {
            self.position += remaining * EASING;
        }
        Some(self.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eases_to_latest_target() {
        let mut driver = ScrollDriver::new(0.0);
        driver.apply([Effect::ScrollTo(500.0), Effect::ScrollTo(100.0)]);
        let first = driver.step().expect("moving");
        assert!(first > 0.0 && first < 100.0);
        while driver.step().is_some() {}
        assert_eq!(driver.position(), 100.0);
        assert!(!driver.is_animating());
    }

    #[test]
    fn cancel_stops_in_place() {
        let mut driver = ScrollDriver::new(10.0);
        driver.apply([Effect::ScrollTo(300.0)]);
        driver.step();
        let stopped = driver.position();
        driver.apply([Effect::CancelScroll]);
        assert_eq!(driver.step(), None);
        assert_eq!(driver.position(), stopped);
    }

    #[test]
    fn tracks_highlight() {
        let mut driver = ScrollDriver::default();
        driver.apply([Effect::Highlight(Some(4..9))]);
        assert_eq!(driver.highlight(), Some(&(4..9)));
        driver.apply([Effect::Highlight(None)]);
        assert_eq!(driver.highlight(), None);
    }
}
