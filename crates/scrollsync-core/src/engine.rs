//! Foreground facade over the chunk index, lookups and sync policy.
//!
//! The engine is owned by the thread that renders and handles input. Chunk
//! rebuilds run on a worker thread; [`Engine::poll`] picks up finished lists
//! and publishes them with a single atomic store, so a reader always sees one
//! complete list or the next one, never a list under construction.

use crate::chunks::{ChunkList, ChunkStore};
use crate::config::EngineConfig;
use crate::hit::{HitMapper, LineLocation};
use crate::measure::TextMeasurer;
use crate::segments::{SegmentError, SegmentIndex, TextSegment};
use crate::sync::{Effect, Geometry, Phase, ScrollPolicy, SyncController, SyncState};
use crate::viewport;
use crate::worker::RebuildWorker;
use arc_swap::ArcSwapOption;
use sha2::{Digest, Sha256};
use std::ops::Range;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Inputs the currently requested (or published) list was built from.
/// Segments play no part in chunking, so only the text is keyed.
#[derive(Debug, Clone, PartialEq)]
struct BuildKey {
    text_fingerprint: String,
    width: f32,
}

pub struct Engine<M: TextMeasurer> {
    worker: RebuildWorker<M>,
    mapper: HitMapper<M>,
    published: ArcSwapOption<ChunkList>,
    segments: SegmentIndex,
    text: Option<Arc<str>>,
    text_fingerprint: Option<String>,
    fingerprint: Option<String>,
    width: Option<f32>,
    requested: Option<BuildKey>,
    scroll_offset: f32,
    sync: SyncController,
}

impl<M: TextMeasurer> Engine<M> {
    pub fn new(measurer: M, config: &EngineConfig) -> Self {
        let measurer = Arc::new(measurer);
        let store = ChunkStore::new(
            Arc::clone(&measurer),
            config.chunk_size_hint,
            config.max_lookback,
        );
        debug!(
            chunk_size_hint = store.chunk_size_hint(),
            max_lookback = store.max_lookback(),
            layout_cache = config.layout_cache_capacity,
            "Created sync engine"
        );
        Self {
            worker: RebuildWorker::new(Arc::new(store)),
            mapper: HitMapper::new(measurer, config.layout_cache_capacity),
            published: ArcSwapOption::empty(),
            segments: SegmentIndex::default(),
            text: None,
            text_fingerprint: None,
            fingerprint: None,
            width: None,
            requested: None,
            scroll_offset: 0.0,
            sync: SyncController::new(config.scroll_policy(), config.viewport_height),
        }
    }

    /// Replace the text and its transcript atomically.
    ///
    /// Invalid segments are rejected and leave the previous data in place.
    /// Identical data is a no-op. When only the segments change the published
    /// chunk list stays in place and the current time is evaluated again.
    pub fn set_data(
        &mut self,
        text: impl Into<Arc<str>>,
        segments: Vec<TextSegment>,
    ) -> Result<Vec<Effect>, SegmentError> {
        let text: Arc<str> = text.into();
        let text_fingerprint = text_fingerprint(&text);
        let fingerprint = data_fingerprint(&text_fingerprint, &segments);
        if self.fingerprint.as_deref() == Some(fingerprint.as_str()) {
            debug!(%fingerprint, "Data unchanged; skipping reload");
            self.request_rebuild();
            return Ok(Vec::new());
        }

        let char_len = text.chars().count();
        let index = SegmentIndex::new(segments, char_len).inspect_err(|err| {
            warn!(%fingerprint, "Rejected transcript segments: {err}");
        })?;
        info!(
            %fingerprint,
            chars = char_len,
            segments = index.len(),
            "Loaded text and segments"
        );

        self.segments = index;
        self.fingerprint = Some(fingerprint);
        let mut effects = self.sync.reset_data();

        if self.text_fingerprint.as_deref() == Some(text_fingerprint.as_str()) {
            debug!(%text_fingerprint, "Text unchanged; keeping chunk index");
            if let Some(list) = self.chunks() {
                let geometry = ListGeometry {
                    list: &list,
                    mapper: &self.mapper,
                };
                effects.extend(self.sync.index_published(&self.segments, Some(&geometry)));
            }
            return Ok(effects);
        }

        self.text = Some(text);
        self.text_fingerprint = Some(text_fingerprint);
        self.published.store(None);
        self.mapper.invalidate();
        self.request_rebuild();
        Ok(effects)
    }

    /// Available layout width. Unusable widths are ignored until a valid one
    /// arrives; an unchanged width is a no-op.
    pub fn set_width(&mut self, width: f32) {
        if !width.is_finite() || width <= 0.0 {
            debug!(width, "Ignoring unusable layout width");
            return;
        }
        if self.width == Some(width) {
            self.request_rebuild();
            return;
        }
        info!(width, previous = ?self.width, "Layout width changed");
        self.width = Some(width);
        self.request_rebuild();
    }

    pub fn set_viewport_height(&mut self, height: f32) {
        self.sync.set_viewport_height(height);
    }

    pub fn viewport_height(&self) -> f32 {
        self.sync.viewport_height()
    }

    pub fn set_policy(&mut self, policy: ScrollPolicy) {
        debug!(?policy, "Scroll policy changed");
        self.sync.set_policy(policy);
    }

    /// Actual scroll position reported by the scroll driver.
    pub fn scrolled(&mut self, offset: f32) {
        if offset.is_finite() {
            self.scroll_offset = offset.max(0.0);
        }
    }

    pub fn scroll_offset(&self) -> f32 {
        self.scroll_offset
    }

    fn request_rebuild(&mut self) {
        let (Some(text), Some(text_fingerprint), Some(width)) =
            (self.text.as_ref(), self.text_fingerprint.as_ref(), self.width)
        else {
            debug!(
                has_text = self.text.is_some(),
                width = ?self.width,
                "Deferring chunk rebuild until text and width are known"
            );
            return;
        };
        let key = BuildKey {
            text_fingerprint: text_fingerprint.clone(),
            width,
        };
        if self.requested.as_ref() == Some(&key) {
            return;
        }
        if self.worker.submit(Arc::clone(text), width).is_some() {
            self.requested = Some(key);
        }
    }

    /// Per-frame tick: publish a finished rebuild if one is waiting.
    pub fn poll(&mut self) -> Vec<Effect> {
        let latest = self.worker.try_latest();
        self.settle(latest)
    }

    /// Block until the in-flight rebuild lands or `timeout` passes.
    pub fn wait_for_rebuild(&mut self, timeout: Duration) -> Vec<Effect> {
        let latest = self.worker.wait_latest(timeout);
        self.settle(latest)
    }

    fn settle(&mut self, latest: Option<ChunkList>) -> Vec<Effect> {
        if self.worker.take_lost() {
            warn!("Chunk rebuild produced no index; next input retries");
            self.requested = None;
        }
        match latest {
            Some(list) => self.publish(list),
            None => Vec::new(),
        }
    }

    pub fn is_rebuilding(&self) -> bool {
        self.worker.is_busy()
    }

    fn publish(&mut self, list: ChunkList) -> Vec<Effect> {
        debug!(
            generation = list.generation(),
            chunks = list.len(),
            content_height = list.content_height(),
            "Publishing chunk index"
        );
        let list = Arc::new(list);
        self.published.store(Some(Arc::clone(&list)));
        self.mapper.invalidate();
        let geometry = ListGeometry {
            list: &list,
            mapper: &self.mapper,
        };
        self.sync.index_published(&self.segments, Some(&geometry))
    }

    pub fn phase(&self) -> Phase {
        self.sync.phase()
    }

    pub fn sync_state(&self) -> &SyncState {
        self.sync.state()
    }

    pub fn segments(&self) -> &SegmentIndex {
        &self.segments
    }

    /// Snapshot of the published chunk list.
    pub fn chunks(&self) -> Option<Arc<ChunkList>> {
        self.published.load_full()
    }

    pub fn content_height(&self) -> f32 {
        self.chunks().map(|list| list.content_height()).unwrap_or(0.0)
    }

    /// Indices of the chunks touching the viewport.
    pub fn visible_range(&self, scroll_offset: f32, viewport_height: f32) -> Range<usize> {
        self.chunks()
            .map(|list| viewport::visible_range(&list, scroll_offset, viewport_height))
            .unwrap_or(0..0)
    }

    pub fn locate(&self, offset: usize) -> Option<LineLocation> {
        let list = self.chunks()?;
        self.mapper.locate(&list, offset)
    }

    pub fn hit_test(&self, x: f32, y: f32) -> Option<usize> {
        let list = self.chunks()?;
        self.mapper.hit_test(&list, x, y)
    }

    /// Playback time of the segment under a tapped point.
    pub fn seek_time_at(&self, x: f32, y: f32) -> Option<u64> {
        let offset = self.hit_test(x, y)?;
        let time = self.segments.time_for_offset(offset);
        debug!(offset, time_ms = ?time, "Resolved tap to playback time");
        time
    }

    pub fn set_time(&mut self, time_ms: u64) -> Vec<Effect> {
        let list = self.chunks();
        let geometry = list.as_deref().map(|list| ListGeometry {
            list,
            mapper: &self.mapper,
        });
        self.sync.set_time(
            time_ms,
            &self.segments,
            geometry.as_ref().map(|g| g as &dyn Geometry),
        )
    }

    pub fn jump_to_current(&mut self) -> Vec<Effect> {
        let list = self.chunks();
        let geometry = list.as_deref().map(|list| ListGeometry {
            list,
            mapper: &self.mapper,
        });
        self.sync
            .jump_to_current(geometry.as_ref().map(|g| g as &dyn Geometry))
    }

    pub fn touch_down(&mut self) -> Vec<Effect> {
        self.sync.touch_down()
    }

    pub fn touch_up(&mut self) {
        self.sync.touch_up();
    }

    pub fn touch_cancel(&mut self) {
        self.sync.touch_cancel();
    }

    pub fn fling_start(&mut self) {
        self.sync.fling_start();
    }

    pub fn fling_end(&mut self) {
        self.sync.fling_end();
    }
}

struct ListGeometry<'a, M: TextMeasurer> {
    list: &'a ChunkList,
    mapper: &'a HitMapper<M>,
}

impl<M: TextMeasurer> Geometry for ListGeometry<'_, M> {
    fn line_at(&self, offset: usize) -> Option<LineLocation> {
        self.mapper.locate(self.list, offset)
    }

    fn content_height(&self) -> f32 {
        self.list.content_height()
    }
}

fn text_fingerprint(text: &str) -> String {
    format!("{:x}", Sha256::digest(text.as_bytes()))
}

fn data_fingerprint(text_fingerprint: &str, segments: &[TextSegment]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text_fingerprint.as_bytes());
    for segment in segments {
        hasher.update(segment.start_ms.to_le_bytes());
        hasher.update(segment.end_ms.to_le_bytes());
        hasher.update((segment.offset_start as u64).to_le_bytes());
        hasher.update((segment.offset_end as u64).to_le_bytes());
    }
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measure::MonospaceMeasurer;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const WAIT: Duration = Duration::from_secs(10);

    fn config() -> EngineConfig {
        EngineConfig {
            chunk_size_hint: 64,
            viewport_height: 100.0,
            ..EngineConfig::default()
        }
    }

    fn engine() -> Engine<MonospaceMeasurer> {
        Engine::new(MonospaceMeasurer::new(10.0, 20.0), &config())
    }

    fn data() -> (String, Vec<TextSegment>) {
        let sentence = "this sentence has exactly fifty chars in total ok ";
        assert_eq!(sentence.chars().count(), 50);
        let text = sentence.repeat(40);
        let segments = (0..40u64)
            .map(|i| {
                let offset = i as usize * 50;
                TextSegment::new(i * 1000, (i + 1) * 1000, offset, offset + 50)
            })
            .collect();
        (text, segments)
    }

    #[test]
    fn rebuild_waits_for_both_inputs() {
        let mut engine = engine();
        let (text, segments) = data();
        engine.set_data(text.as_str(), segments).expect("valid");
        assert!(!engine.is_rebuilding());
        engine.set_width(0.0);
        assert!(!engine.is_rebuilding());
        engine.set_width(200.0);
        engine.wait_for_rebuild(WAIT);
        assert_eq!(engine.phase(), Phase::Ready);
        assert_eq!(engine.chunks().map(|l| l.char_len()), Some(2000));
    }

    #[test]
    fn width_before_data_converges() {
        let mut engine = engine();
        engine.set_width(200.0);
        assert!(!engine.is_rebuilding());
        let (text, segments) = data();
        engine.set_data(text.as_str(), segments).expect("valid");
        engine.wait_for_rebuild(WAIT);
        assert_eq!(engine.phase(), Phase::Ready);
    }

    #[test]
    fn repeated_inputs_do_not_rebuild() {
        let mut engine = engine();
        let (text, segments) = data();
        engine.set_width(200.0);
        engine.set_data(text.as_str(), segments.clone()).expect("valid");
        engine.wait_for_rebuild(WAIT);
        let first = engine.chunks().expect("published");

        engine.set_data(text.as_str(), segments).expect("valid");
        engine.set_width(200.0);
        assert!(!engine.is_rebuilding());
        let second = engine.chunks().expect("still published");
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn invalid_segments_keep_previous_data() {
        let mut engine = engine();
        let (text, segments) = data();
        engine.set_width(200.0);
        engine.set_data(text.as_str(), segments).expect("valid");
        engine.wait_for_rebuild(WAIT);

        let bad = vec![TextSegment::new(0, 10, 0, 5), TextSegment::new(5, 20, 5, 9)];
        assert!(engine.set_data("short text", bad).is_err());
        assert_eq!(engine.phase(), Phase::Ready);
        assert_eq!(engine.segments().len(), 40);
    }

    #[test]
    fn playback_highlights_and_scrolls() {
        let mut engine = engine();
        let (text, segments) = data();
        engine.set_width(200.0);
        engine.set_data(text.as_str(), segments).expect("valid");
        engine.wait_for_rebuild(WAIT);

        let effects = engine.set_time(20_500);
        assert_eq!(effects[0], Effect::Highlight(Some(1000..1050)));
        let target = match effects.get(1) {
            Some(Effect::ScrollTo(y)) => *y,
            other => panic!("expected scroll, got {other:?}"),
        };
        let line = engine.locate(1000).expect("located");
        assert_eq!(target, line.center() - 50.0);
        assert!(engine.set_time(20_900).is_empty());
    }

    #[test]
    fn seek_resolves_tapped_segment() {
        let mut engine = engine();
        let (text, segments) = data();
        engine.set_width(200.0);
        engine.set_data(text.as_str(), segments).expect("valid");
        engine.wait_for_rebuild(WAIT);

        let line = engine.locate(525).expect("located");
        let time = engine.seek_time_at(5.0, line.center()).expect("hit");
        let offset = engine.hit_test(5.0, line.center()).expect("hit");
        assert_eq!(time, (offset as u64 / 50) * 1000);
        assert_eq!(engine.seek_time_at(5.0, engine.content_height() + 10.0), None);
    }

    #[test]
    fn scrolled_offset_is_clamped_and_kept() {
        let mut engine = engine();
        engine.scrolled(420.0);
        engine.scrolled(f32::NAN);
        assert_eq!(engine.scroll_offset(), 420.0);
        engine.scrolled(-3.0);
        assert_eq!(engine.scroll_offset(), 0.0);
    }

    #[test]
    fn time_set_before_ready_applies_on_publish() {
        let mut engine = engine();
        let (text, segments) = data();
        engine.set_data(text.as_str(), segments).expect("valid");
        let early = engine.set_time(3_000);
        assert_eq!(early, vec![Effect::Highlight(Some(150..200))]);
        engine.set_width(200.0);
        let effects = engine.wait_for_rebuild(WAIT);
        assert!(effects.iter().any(|e| matches!(e, Effect::ScrollTo(_))));
    }

    #[test]
    fn replacing_data_clears_highlight() {
        let mut engine = engine();
        let (text, segments) = data();
        engine.set_width(200.0);
        engine.set_data(text.as_str(), segments).expect("valid");
        engine.wait_for_rebuild(WAIT);
        engine.set_time(1_000);

        let effects = engine
            .set_data("brand new text", vec![TextSegment::new(0, 500, 0, 5)])
            .expect("valid");
        assert_eq!(effects, vec![Effect::Highlight(None)]);
        assert_eq!(engine.phase(), Phase::Idle);
        assert!(engine.chunks().is_none());
        engine.wait_for_rebuild(WAIT);
        let list = engine.chunks().expect("republished");
        assert_eq!(list.text(), "brand new text");
    }

    #[test]
    fn segments_only_swap_keeps_chunk_index() {
        let mut engine = engine();
        let (text, segments) = data();
        engine.set_width(200.0);
        engine.set_data(text.as_str(), segments).expect("valid");
        engine.wait_for_rebuild(WAIT);
        let before = engine.chunks().expect("published");
        engine.set_time(2_500);

        // Same text, coarser transcript: 20 segments of 100 chars.
        let coarse = (0..20u64)
            .map(|i| {
                let offset = i as usize * 100;
                TextSegment::new(i * 2000, (i + 1) * 2000, offset, offset + 100)
            })
            .collect();
        let effects = engine.set_data(text.as_str(), coarse).expect("valid");

        assert!(!engine.is_rebuilding());
        assert_eq!(engine.phase(), Phase::Ready);
        let after = engine.chunks().expect("still published");
        assert!(Arc::ptr_eq(&before, &after));
        assert_eq!(effects[0], Effect::Highlight(None));
        assert_eq!(effects[1], Effect::Highlight(Some(100..200)));
        assert!(matches!(effects.get(2), Some(Effect::ScrollTo(_))));
        assert_eq!(engine.segments().len(), 20);
    }

    /// Panics on its first `failures` measurements.
    struct FlakyMeasurer {
        inner: MonospaceMeasurer,
        failures: AtomicUsize,
    }

    impl TextMeasurer for FlakyMeasurer {
        type Layout = <MonospaceMeasurer as TextMeasurer>::Layout;

        fn measure(&self, text: &str, width: f32) -> Self::Layout {
            let failing = self
                .failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
                .is_ok();
            if failing {
                panic!("measurement backend unavailable");
            }
            self.inner.measure(text, width)
        }
    }

    #[test]
    fn lost_rebuild_is_retried_on_next_input() {
        let measurer = FlakyMeasurer {
            inner: MonospaceMeasurer::new(10.0, 20.0),
            failures: AtomicUsize::new(1),
        };
        let mut engine = Engine::new(measurer, &config());
        let (text, segments) = data();
        engine.set_data(text.as_str(), segments).expect("valid");
        engine.set_width(200.0);
        assert!(engine.wait_for_rebuild(WAIT).is_empty());
        assert_eq!(engine.phase(), Phase::Idle);
        assert!(!engine.is_rebuilding());

        engine.set_width(200.0);
        assert!(engine.is_rebuilding());
        engine.wait_for_rebuild(WAIT);
        assert_eq!(engine.phase(), Phase::Ready);
        assert_eq!(engine.chunks().map(|l| l.char_len()), Some(2000));
    }
}
