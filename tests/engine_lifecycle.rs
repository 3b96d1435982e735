//! End-to-end engine tests against a recording backend: timing windows,
//! auto-dismiss, teardown, and the dial commit path, with short configured
//! durations so the suite stays fast.

use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use tvosd::dial::DialInput;
use tvosd::state::InfoPayload;
use tvosd::stream::StreamControl;
use tvosd::surface::{
    Backend, Color, ImageHandle, Position, Region, Surface, TextAlign, VOLUME_ASSET_COUNT,
};
use tvosd::{OsdConfig, OsdEngine, OsdError};

#[derive(Debug, Clone, PartialEq)]
enum DrawCall {
    Clear,
    Fill(Color),
    Text(String),
    Blit(u32),
}

type Frame = Vec<DrawCall>;

#[derive(Default)]
struct FakeBackend {
    frames: Arc<Mutex<Vec<Frame>>>,
    fail_present: Arc<AtomicBool>,
}

impl FakeBackend {
    fn last_frame(&self) -> Frame {
        self.frames
            .lock()
            .expect("frame log lock")
            .last()
            .cloned()
            .unwrap_or_default()
    }
}

impl Backend for FakeBackend {
    fn create_surface(&mut self) -> Result<Box<dyn Surface>> {
        Ok(Box::new(FakeSurface {
            pending: Vec::new(),
            frames: self.frames.clone(),
            fail_present: self.fail_present.clone(),
        }))
    }

    fn load_image_asset(&mut self, name: &str) -> Result<ImageHandle> {
        let level: u32 = name
            .strip_prefix("volume_")
            .and_then(|suffix| suffix.parse().ok())
            .ok_or_else(|| anyhow::anyhow!("unknown asset {name}"))?;
        assert!((level as usize) < VOLUME_ASSET_COUNT);
        Ok(ImageHandle(level))
    }
}

struct FakeSurface {
    pending: Frame,
    frames: Arc<Mutex<Vec<Frame>>>,
    fail_present: Arc<AtomicBool>,
}

impl Surface for FakeSurface {
    fn size(&self) -> (u32, u32) {
        (1280, 720)
    }

    fn clear(&mut self) -> Result<()> {
        self.pending.clear();
        self.pending.push(DrawCall::Clear);
        Ok(())
    }

    fn fill_rect(&mut self, _region: Region, color: Color) -> Result<()> {
        self.pending.push(DrawCall::Fill(color));
        Ok(())
    }

    fn draw_text(
        &mut self,
        text: &str,
        _position: Position,
        _align: TextAlign,
        _color: Color,
    ) -> Result<()> {
        self.pending.push(DrawCall::Text(text.to_string()));
        Ok(())
    }

    fn blit(&mut self, image: ImageHandle, _position: Position) -> Result<()> {
        self.pending.push(DrawCall::Blit(image.0));
        Ok(())
    }

    fn present(&mut self) -> Result<()> {
        if self.fail_present.load(Ordering::SeqCst) {
            anyhow::bail!("flip rejected by backend");
        }
        self.frames
            .lock()
            .expect("frame log lock")
            .push(std::mem::take(&mut self.pending));
        Ok(())
    }
}

fn fast_config() -> OsdConfig {
    OsdConfig {
        program_banner_ms: 300,
        volume_ms: 300,
        info_ms: 600,
        dial_debounce_ms: 200,
        frame_cap_hz: Some(200),
        finalize_on_third_digit: false,
    }
}

fn sleep_ms(ms: u64) {
    thread::sleep(Duration::from_millis(ms));
}

fn has_blit(frame: &Frame, level: u32) -> bool {
    frame.contains(&DrawCall::Blit(level))
}

fn has_any_blit(frame: &Frame) -> bool {
    frame.iter().any(|call| matches!(call, DrawCall::Blit(_)))
}

fn has_text(frame: &Frame, text: &str) -> bool {
    frame.contains(&DrawCall::Text(text.to_string()))
}

#[test]
fn volume_shows_matching_asset_then_auto_dismisses() {
    let mut backend = FakeBackend::default();
    let mut engine = OsdEngine::init(&mut backend, fast_config()).expect("init");

    engine.show_volume(7).expect("show volume");
    sleep_ms(100);
    assert!(has_blit(&backend.last_frame(), 7), "level 7 selects volume_7");

    sleep_ms(500);
    assert!(
        !has_any_blit(&backend.last_frame()),
        "volume should auto-dismiss after its window"
    );
    engine.deinit().expect("deinit");
}

#[test]
fn out_of_range_volume_is_rejected_before_the_store() {
    let mut backend = FakeBackend::default();
    let mut engine = OsdEngine::init(&mut backend, fast_config()).expect("init");

    match engine.show_volume(11) {
        Err(OsdError::Precondition(message)) => assert!(message.contains("11")),
        other => panic!("expected precondition violation, got {other:?}"),
    }
    sleep_ms(60);
    assert!(
        !has_any_blit(&backend.last_frame()),
        "rejected call must not reach the render loop"
    );
    engine.deinit().expect("deinit");
}

#[test]
fn rearming_resets_the_visible_window_to_full_duration() {
    let mut backend = FakeBackend::default();
    let mut engine = OsdEngine::init(&mut backend, fast_config()).expect("init");
    let payload = InfoPayload::default();

    // info_ms = 600: show at t=0, again at t~400; first deadline (600) must
    // not apply, the panel stays until ~1000.
    engine.show_info(payload).expect("first show");
    sleep_ms(400);
    engine.show_info(payload).expect("second show");
    sleep_ms(300); // t ~ 700, past the first deadline
    assert!(
        has_text(&backend.last_frame(), "Program info"),
        "re-arm must restart the window, not keep the old deadline"
    );
    sleep_ms(500); // t ~ 1200, past the second deadline
    assert!(!has_text(&backend.last_frame(), "Program info"));
    engine.deinit().expect("deinit");
}

#[test]
fn second_show_supersedes_the_first_deadline() {
    let mut backend = FakeBackend::default();
    let config = OsdConfig {
        volume_ms: 500,
        ..fast_config()
    };
    let mut engine = OsdEngine::init(&mut backend, config).expect("init");

    engine.show_volume(7).expect("show 7");
    sleep_ms(250);
    engine.show_volume(3).expect("show 3");
    sleep_ms(350); // t ~ 600: past the first deadline (500), inside the second
    let frame = backend.last_frame();
    assert!(has_blit(&frame, 3), "latest payload should render");
    assert!(!has_blit(&frame, 7), "stale payload must not render");
    sleep_ms(450); // t ~ 1050: past the second deadline (750)
    assert!(!has_any_blit(&backend.last_frame()));
    engine.deinit().expect("deinit");
}

#[test]
fn program_banner_auto_dismisses() {
    let mut backend = FakeBackend::default();
    let mut engine = OsdEngine::init(&mut backend, fast_config()).expect("init");

    engine.show_program_number(123).expect("show banner");
    sleep_ms(100);
    assert!(has_text(&backend.last_frame(), "123"));
    sleep_ms(500);
    assert!(!has_text(&backend.last_frame(), "123"));
    engine.deinit().expect("deinit");
}

#[test]
fn radio_placeholder_stays_until_hidden() {
    let mut backend = FakeBackend::default();
    let mut engine = OsdEngine::init(&mut backend, fast_config()).expect("init");

    engine.show_radio_placeholder();
    sleep_ms(500); // longer than every auto-dismiss window
    assert!(has_text(&backend.last_frame(), "Radio"));

    engine.hide_radio_placeholder();
    sleep_ms(100);
    assert!(!has_text(&backend.last_frame(), "Radio"));
    engine.deinit().expect("deinit");
}

#[test]
fn dial_digit_count_is_bounded() {
    let mut backend = FakeBackend::default();
    let mut engine = OsdEngine::init(&mut backend, fast_config()).expect("init");

    assert!(matches!(
        engine.show_channel_dial(&[]),
        Err(OsdError::Precondition(_))
    ));
    assert!(matches!(
        engine.show_channel_dial(&[1, 2, 3, 4]),
        Err(OsdError::Precondition(_))
    ));
    engine.show_channel_dial(&[1, 2]).expect("two digits valid");
    sleep_ms(60);
    assert!(has_text(&backend.last_frame(), "12"));
    engine.deinit().expect("deinit");
}

#[test]
fn deinit_terminates_with_a_timer_still_pending() {
    let mut backend = FakeBackend::default();
    let mut engine = OsdEngine::init(&mut backend, fast_config()).expect("init");

    engine.show_program_number(9).expect("arm timer");
    engine.deinit().expect("deinit with pending timer");
    // Second call is a guarded no-op.
    engine.deinit().expect("repeat deinit");
}

#[test]
fn present_failure_is_fatal_and_reported_at_deinit() {
    let mut backend = FakeBackend::default();
    let fail_present = backend.fail_present.clone();
    let mut engine = OsdEngine::init(&mut backend, fast_config()).expect("init");

    sleep_ms(50);
    let frames_before_failure = backend.frames.lock().expect("frame log lock").len();
    assert!(frames_before_failure > 0, "loop was presenting");

    fail_present.store(true, Ordering::SeqCst);
    sleep_ms(100);
    let frames_after = backend.frames.lock().expect("frame log lock").len();

    match engine.deinit() {
        Err(OsdError::Render(err)) => assert!(format!("{err:#}").contains("flip rejected")),
        other => panic!("expected render error from deinit, got {other:?}"),
    }
    // The loop stopped on the failed flip rather than spinning on it.
    let frames_final = backend.frames.lock().expect("frame log lock").len();
    assert_eq!(frames_after, frames_final);
}

#[derive(Default)]
struct RecordingStream {
    changes: Mutex<Vec<u16>>,
}

impl RecordingStream {
    fn changes(&self) -> Vec<u16> {
        self.changes.lock().expect("changes lock").clone()
    }
}

impl StreamControl for RecordingStream {
    fn change_channel(&self, number: u16) -> Result<()> {
        self.changes.lock().expect("changes lock").push(number);
        Ok(())
    }
}

#[test]
fn dial_commits_after_the_debounce_window() {
    let mut backend = FakeBackend::default();
    let config = fast_config();
    let engine = Arc::new(OsdEngine::init(&mut backend, config.clone()).expect("init"));
    let stream = Arc::new(RecordingStream::default());
    let dial = DialInput::new(engine.clone(), stream.clone(), &config).expect("dial");

    for digit in [1, 2, 3] {
        dial.press_digit(digit).expect("digit");
    }
    sleep_ms(60);
    assert!(has_text(&backend.last_frame(), "123"), "dial box shows entry");
    assert!(stream.changes().is_empty(), "commit waits out the debounce");

    sleep_ms(400); // past the 200 ms quiet period
    assert_eq!(stream.changes(), vec![123]);
    assert!(
        !has_text(&backend.last_frame(), "123"),
        "dial hides once committed"
    );
}

#[test]
fn single_digit_entry_composes_that_channel() {
    let mut backend = FakeBackend::default();
    let config = fast_config();
    let engine = Arc::new(OsdEngine::init(&mut backend, config.clone()).expect("init"));
    let stream = Arc::new(RecordingStream::default());
    let dial = DialInput::new(engine.clone(), stream.clone(), &config).expect("dial");

    dial.press_digit(4).expect("digit");
    sleep_ms(400);
    assert_eq!(stream.changes(), vec![4]);
}

#[test]
fn fast_dial_commits_on_the_third_digit() {
    let mut backend = FakeBackend::default();
    let config = OsdConfig {
        dial_debounce_ms: 60_000, // would never fire in this test
        finalize_on_third_digit: true,
        ..fast_config()
    };
    let engine = Arc::new(OsdEngine::init(&mut backend, config.clone()).expect("init"));
    let stream = Arc::new(RecordingStream::default());
    let dial = DialInput::new(engine.clone(), stream.clone(), &config).expect("dial");

    for digit in [4, 5, 6] {
        dial.press_digit(digit).expect("digit");
    }
    assert_eq!(stream.changes(), vec![456], "no debounce wait on a full entry");
}
