//! The render loop: a dedicated thread that repaints the composited overlay
//! frame from store snapshots until told to stop.
//!
//! Painting is deliberately dumb: snapshot, clear, draw every visible element
//! in fixed order, present, check the stop flag. A single element failing to
//! draw is skipped for that frame and retried on the next one; a failed
//! present is fatal because there is no safe way to keep rendering into a
//! broken surface.

use anyhow::{Context, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::lock::{lock_or_recover, wait_timeout_or_recover};
use crate::state::{ElementKind, OverlayState, OverlayStore, Teletext};
use crate::surface::{Color, ImageHandle, Position, Region, Surface, TextAlign};

const BANNER_BG: Color = Color::rgb(0xFF, 0x00, 0xFF);
const BANNER_TEXT: Color = Color::rgb(0x00, 0x00, 0x00);
const INFO_OUTER_BG: Color = Color::rgba(0xB0, 0x00, 0x00, 0xCF);
const INFO_INNER_BG: Color = Color::rgba(0x30, 0x00, 0x00, 0xCF);
const INFO_TEXT: Color = Color::rgb(0xFF, 0xFF, 0xFF);
const TELETEXT_AVAILABLE: Color = Color::rgb(0x00, 0xC0, 0x00);
const TELETEXT_UNAVAILABLE: Color = Color::rgb(0xE0, 0x00, 0x00);
const TELETEXT_UNKNOWN: Color = Color::rgb(0x80, 0x80, 0x80);
const DIAL_BG: Color = Color::rgba(0x00, 0x00, 0x00, 0xB0);
const DIAL_TEXT: Color = Color::rgb(0xFF, 0xFF, 0xFF);
const RADIO_BG: Color = Color::rgb(0x10, 0x10, 0x40);
const RADIO_TEXT: Color = Color::rgb(0xE0, 0xE0, 0xE0);

/// The 11 volume-bar images, indexed by level.
pub(crate) struct VolumeAssets(pub [ImageHandle; crate::surface::VOLUME_ASSET_COUNT]);

/// Screen regions for every element, derived once from the surface size with
/// the same fractional geometry the set-top box used.
#[derive(Debug, Clone, Copy)]
struct Layout {
    full_screen: Region,
    program_banner: Region,
    volume_position: Position,
    info_outer: Region,
    info_inner: Region,
    dial_box: Region,
}

impl Layout {
    fn from_size(width: u32, height: u32) -> Self {
        let w = width as i32;
        let h = height as i32;
        let info_outer = Region::new(w / 10, 3 * h / 5, 8 * w / 10, 3 * h / 10);
        let margin = h / 60;
        Self {
            full_screen: Region::new(0, 0, w, h),
            program_banner: Region::new(w / 10, h / 6, w / 5, h / 6),
            volume_position: Position {
                x: 7 * w / 10,
                y: h / 6,
            },
            info_outer,
            info_inner: Region::new(
                info_outer.x + margin,
                info_outer.y + margin,
                info_outer.width - 2 * margin,
                info_outer.height - 2 * margin,
            ),
            dial_box: Region::new(2 * w / 5, h / 12, w / 5, h / 8),
        }
    }
}

/// Completion handshake between the render thread and `deinit`. The thread
/// signals after its final present; the controller waits bounded, then joins.
pub(crate) struct ShutdownGate {
    finished: Mutex<bool>,
    cv: Condvar,
}

impl ShutdownGate {
    fn new() -> Self {
        Self {
            finished: Mutex::new(false),
            cv: Condvar::new(),
        }
    }

    fn signal(&self) {
        let mut finished = lock_or_recover(&self.finished, "shutdown gate signal");
        *finished = true;
        self.cv.notify_all();
    }

    /// Returns `false` if the timeout elapsed before the loop finished.
    fn wait(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut finished = lock_or_recover(&self.finished, "shutdown gate wait");
        while !*finished {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }
            let (guard, _timed_out) =
                wait_timeout_or_recover(&self.cv, finished, remaining, "shutdown gate wait");
            finished = guard;
        }
        true
    }
}

/// Owning handle for the running render thread.
pub(crate) struct RenderLoop {
    stop: Arc<AtomicBool>,
    gate: Arc<ShutdownGate>,
    error: Arc<Mutex<Option<anyhow::Error>>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl RenderLoop {
    /// Spawn the thread; it takes sole ownership of the surface until it
    /// exits. `frame_interval` optionally caps the free-running redraw rate.
    pub(crate) fn spawn(
        mut surface: Box<dyn Surface>,
        store: Arc<OverlayStore>,
        assets: VolumeAssets,
        frame_interval: Option<Duration>,
    ) -> Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let gate = Arc::new(ShutdownGate::new());
        let error = Arc::new(Mutex::new(None));

        let thread_stop = stop.clone();
        let thread_gate = gate.clone();
        let thread_error = error.clone();
        let handle = thread::Builder::new()
            .name("osd-render".into())
            .spawn(move || {
                let (width, height) = surface.size();
                let layout = Layout::from_size(width, height);
                info!("render loop running at {width}x{height}");
                loop {
                    let frame_started = Instant::now();
                    let snapshot = store.snapshot();
                    paint_frame(surface.as_mut(), &snapshot, &assets, &layout);
                    if let Err(err) = surface.present() {
                        error!("present failed, stopping render loop: {err:#}");
                        *lock_or_recover(&thread_error, "render error slot") =
                            Some(err.context("presenting composited frame"));
                        break;
                    }
                    // Stop is re-checked after present so the last armed frame
                    // still reaches the screen.
                    if thread_stop.load(Ordering::SeqCst) {
                        break;
                    }
                    if let Some(interval) = frame_interval {
                        let spent = frame_started.elapsed();
                        if spent < interval {
                            thread::sleep(interval - spent);
                        }
                    }
                }
                info!("render loop stopped");
                thread_gate.signal();
            })
            .context("spawning render thread")?;

        Ok(Self {
            stop,
            gate,
            error,
            handle: Some(handle),
        })
    }

    pub(crate) fn request_stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    /// Bounded wait for the loop's final iteration; `false` on timeout.
    pub(crate) fn wait_finished(&self, timeout: Duration) -> bool {
        self.gate.wait(timeout)
    }

    /// Join the thread. Returns an error description if it panicked.
    pub(crate) fn join(&mut self) -> std::result::Result<(), String> {
        match self.handle.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| "render thread panicked before join".to_string()),
            None => Ok(()),
        }
    }

    /// Fatal error recorded by the loop, if it died on its own.
    pub(crate) fn take_error(&self) -> Option<anyhow::Error> {
        lock_or_recover(&self.error, "render error slot").take()
    }
}

/// Paint one composited frame from a snapshot. Pure in the snapshot: the same
/// state yields the same draw sequence. Per-element failures skip only that
/// element; the next frame retries, so nothing ever sticks on screen.
fn paint_frame(
    surface: &mut dyn Surface,
    snapshot: &OverlayState,
    assets: &VolumeAssets,
    layout: &Layout,
) {
    if let Err(err) = surface.clear() {
        warn!("clear failed, painting over stale frame: {err:#}");
    }
    for kind in ElementKind::DRAW_ORDER {
        if !snapshot.is_visible(kind) {
            continue;
        }
        let drawn = match kind {
            ElementKind::ProgramNumber => draw_program_banner(surface, snapshot, layout),
            ElementKind::Volume => draw_volume(surface, snapshot, assets, layout),
            ElementKind::RadioLogo => draw_radio_logo(surface, layout),
            ElementKind::Info => draw_info_panel(surface, snapshot, layout),
            ElementKind::ChannelDial => draw_channel_dial(surface, snapshot, layout),
        };
        if let Err(err) = drawn {
            debug!("skipping {} this frame: {err:#}", kind.label());
        }
    }
}

fn draw_program_banner(
    surface: &mut dyn Surface,
    snapshot: &OverlayState,
    layout: &Layout,
) -> Result<()> {
    surface.fill_rect(layout.program_banner, BANNER_BG)?;
    surface.draw_text(
        &snapshot.program_number.to_string(),
        layout.program_banner.center(),
        TextAlign::Center,
        BANNER_TEXT,
    )
}

fn draw_volume(
    surface: &mut dyn Surface,
    snapshot: &OverlayState,
    assets: &VolumeAssets,
    layout: &Layout,
) -> Result<()> {
    // The control API clamps/rejects before the store, so the level always
    // indexes a loaded asset.
    let image = assets.0[usize::from(snapshot.volume_level)];
    surface.blit(image, layout.volume_position)
}

fn draw_radio_logo(surface: &mut dyn Surface, layout: &Layout) -> Result<()> {
    surface.fill_rect(layout.full_screen, RADIO_BG)?;
    surface.draw_text(
        "Radio",
        layout.full_screen.center(),
        TextAlign::Center,
        RADIO_TEXT,
    )
}

fn draw_info_panel(
    surface: &mut dyn Surface,
    snapshot: &OverlayState,
    layout: &Layout,
) -> Result<()> {
    surface.fill_rect(layout.info_outer, INFO_OUTER_BG)?;
    surface.fill_rect(layout.info_inner, INFO_INNER_BG)?;

    let info = &snapshot.info;
    let time_line = match info.time {
        Some(time) => format!("Time: {}", time.display()),
        None => "Time: unavailable".to_string(),
    };
    let teletext_color = match info.teletext {
        Teletext::Available => TELETEXT_AVAILABLE,
        Teletext::Unavailable => TELETEXT_UNAVAILABLE,
        Teletext::Unknown => TELETEXT_UNKNOWN,
    };
    let lines = [
        ("Program info".to_string(), INFO_TEXT),
        (format!("Program number: {}", info.program_number), INFO_TEXT),
        (format!("Video PID: {}", info.video_pid), INFO_TEXT),
        (format!("Audio PID: {}", info.audio_pid), INFO_TEXT),
        (time_line, INFO_TEXT),
        (info.teletext.label().to_string(), teletext_color),
    ];

    let line_height = layout.info_inner.height / lines.len() as i32;
    let x = layout.info_inner.x + layout.info_inner.width / 20;
    for (row, (text, color)) in lines.iter().enumerate() {
        let y = layout.info_inner.y + line_height * row as i32 + line_height / 2;
        surface.draw_text(text, Position { x, y }, TextAlign::Left, *color)?;
    }
    Ok(())
}

fn draw_channel_dial(
    surface: &mut dyn Surface,
    snapshot: &OverlayState,
    layout: &Layout,
) -> Result<()> {
    surface.fill_rect(layout.dial_box, DIAL_BG)?;
    let digits: String = snapshot
        .dial_digits
        .iter()
        .map(|digit| char::from(b'0' + digit))
        .collect();
    surface.draw_text(&digits, layout.dial_box.center(), TextAlign::Center, DIAL_TEXT)
}
