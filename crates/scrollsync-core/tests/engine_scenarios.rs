use scrollsync_core::{
    ChunkStore, Effect, Engine, EngineConfig, MonospaceLayout, MonospaceMeasurer, Phase,
    TextMeasurer, TextSegment,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(10);

/// Ten 100-char segments of 100ms each over `abcd abcd ...`.
fn ten_segments() -> (String, Vec<TextSegment>) {
    let text = "abcd ".repeat(200);
    let segments = (0..10u64)
        .map(|i| {
            let offset = i as usize * 100;
            TextSegment::new(i * 100, (i + 1) * 100, offset, offset + 100)
        })
        .collect();
    (text, segments)
}

fn config(chunk_size_hint: usize) -> EngineConfig {
    EngineConfig {
        chunk_size_hint,
        viewport_height: 100.0,
        ..EngineConfig::default()
    }
}

fn scroll_count(effects: &[Effect]) -> usize {
    effects
        .iter()
        .filter(|effect| matches!(effect, Effect::ScrollTo(_)))
        .count()
}

#[test]
fn chunk_boundaries_inside_segments_resolve_consistently() {
    let (text, segments) = ten_segments();
    let mut engine = Engine::new(MonospaceMeasurer::new(10.0, 20.0), &config(250));
    engine.set_data(text.as_str(), segments).expect("valid segments");
    engine.set_width(300.0);
    engine.wait_for_rebuild(WAIT);
    assert_eq!(engine.phase(), Phase::Ready);

    assert_eq!(engine.segments().find_segment_at(250), Some(2));
    assert_eq!(engine.segments().find_segment_at(299), Some(2));
    assert_eq!(engine.segments().find_segment_at(1000), None);

    let list = engine.chunks().expect("published");
    assert!(list.len() > 1);
    let chunks = list.chunks();
    assert_eq!(chunks[0].offset_start, 0);
    assert_eq!(chunks[chunks.len() - 1].offset_end, 1000);
    for pair in chunks.windows(2) {
        assert_eq!(pair[0].offset_end, pair[1].offset_start);
        assert_eq!(pair[0].end_y(), pair[1].start_y);
    }

    let owner = list.chunk_index_for_offset(250).expect("in text");
    assert!(chunks[owner].contains_offset(250));
    let line = engine.locate(250).expect("in text");
    assert_eq!(line.chunk_index, owner);
    assert!(line.offsets.contains(&250));
    assert!(line.line_top >= chunks[owner].start_y);
    assert!(line.line_bottom <= chunks[owner].end_y());

    let hit = engine.hit_test(0.0, line.center()).expect("inside content");
    assert!(line.offsets.contains(&hit));
}

/// Holds narrow-width measurements until the gate opens.
struct GatedMeasurer {
    inner: MonospaceMeasurer,
    gate_below: f32,
    open: Arc<AtomicBool>,
}

impl TextMeasurer for GatedMeasurer {
    type Layout = MonospaceLayout;

    fn measure(&self, text: &str, width: f32) -> MonospaceLayout {
        if width < self.gate_below {
            while !self.open.load(Ordering::Acquire) {
                thread::sleep(Duration::from_millis(2));
            }
        }
        self.inner.measure(text, width)
    }
}

#[test]
fn narrower_width_republishes_taller_list_without_exposing_partial_state() {
    let (text, segments) = ten_segments();
    let open = Arc::new(AtomicBool::new(false));
    let measurer = GatedMeasurer {
        inner: MonospaceMeasurer::new(10.0, 20.0),
        gate_below: 200.0,
        open: Arc::clone(&open),
    };
    let mut engine = Engine::new(measurer, &config(250));
    engine.set_data(text.as_str(), segments).expect("valid segments");
    engine.set_width(300.0);
    engine.wait_for_rebuild(WAIT);
    let wide = engine.chunks().expect("published");
    assert_eq!(wide.width(), 300.0);

    engine.set_width(150.0);
    assert!(engine.is_rebuilding());
    for _ in 0..5 {
        assert!(engine.poll().is_empty());
        let current = engine.chunks().expect("old list stays published");
        assert!(Arc::ptr_eq(&current, &wide));
        assert!(engine.locate(500).is_some());
        thread::sleep(Duration::from_millis(5));
    }

    open.store(true, Ordering::Release);
    engine.wait_for_rebuild(WAIT);
    let narrow = engine.chunks().expect("republished");
    assert_eq!(narrow.width(), 150.0);
    assert!(narrow.content_height() > wide.content_height());
    assert_eq!(narrow.char_len(), wide.char_len());
}

#[test]
fn touch_suppresses_auto_scroll_until_next_segment_after_release() {
    let (text, segments) = ten_segments();
    let mut engine = Engine::new(MonospaceMeasurer::new(10.0, 20.0), &config(250));
    engine.set_data(text.as_str(), segments).expect("valid segments");
    engine.set_width(300.0);
    engine.wait_for_rebuild(WAIT);

    assert_eq!(scroll_count(&engine.set_time(150)), 1);
    assert!(engine.set_time(160).is_empty());

    assert_eq!(engine.touch_down(), vec![Effect::CancelScroll]);
    for t in (200..700).step_by(50) {
        let effects = engine.set_time(t);
        assert_eq!(scroll_count(&effects), 0, "scrolled while touching at {t}ms");
    }
    engine.touch_up();
    engine.fling_start();
    assert_eq!(scroll_count(&engine.set_time(700)), 0);
    engine.fling_end();

    assert!(engine.set_time(750).is_empty());
    let effects = engine.set_time(800);
    assert_eq!(effects[0], Effect::Highlight(Some(800..900)));
    assert_eq!(scroll_count(&effects), 1);
}

#[test]
fn rebuilding_identical_inputs_is_bit_identical() {
    let (text, _) = ten_segments();
    let store = ChunkStore::new(Arc::new(MonospaceMeasurer::new(7.5, 18.0)), 250, 0);
    let text: Arc<str> = Arc::from(text.as_str());
    let first = store.rebuild(Arc::clone(&text), 210.0).expect("valid width");
    let second = store.rebuild(text, 210.0).expect("valid width");
    assert_eq!(first.chunks(), second.chunks());
    assert_eq!(
        first.content_height().to_bits(),
        second.content_height().to_bits()
    );
}
