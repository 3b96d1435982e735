//! Interactive demo: drives the overlay engine with a terminal-cell backend
//! and keyboard input standing in for the remote control.
//!
//! Keys: digits type a channel, `+`/`-` adjust volume, `m` mutes, `i` shows
//! the info panel, `n`/`p` change channel, `r` toggles the radio placeholder,
//! `q` quits.

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEventKind},
    execute, queue,
    style::{self, Color as TermColor},
    terminal,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{info, warn};

use tvosd::clock::{TimeReference, WallClock};
use tvosd::dial::DialInput;
use tvosd::state::{InfoPayload, Teletext};
use tvosd::stream::{ChannelInfo, StreamControl};
use tvosd::surface::{
    Backend, Color, ImageHandle, Position, Region, Surface, TextAlign, VOLUME_ASSET_COUNT,
};
use tvosd::timer::ExpiryTimer;
use tvosd::{telemetry, OsdConfig, OsdEngine};

/// Delay before the info panel pops after a channel change, so it does not
/// appear before the (pretend) stream has started.
const INFO_DELAY: Duration = Duration::from_millis(3_500);

#[derive(Debug, Parser)]
#[command(name = "tvosd-demo", about = "Keyboard-driven OSD overlay demo")]
struct DemoArgs {
    /// JSON file overriding the engine timings.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Redraw cap; terminal backends have no vsync to pace the loop.
    #[arg(long, default_value_t = 30)]
    fps: u32,

    /// Commit dial entries immediately on the third digit.
    #[arg(long)]
    fast_dial: bool,

    /// Debug-level logging (stderr; also via TVOSD_LOG).
    #[arg(long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = DemoArgs::parse();
    telemetry::init_tracing(args.verbose);

    let mut config = match &args.config {
        Some(path) => OsdConfig::load_json(path)?,
        None => OsdConfig::default(),
    };
    config.frame_cap_hz = Some(args.fps.max(1));
    config.finalize_on_third_digit = args.fast_dial;

    let guard = TermGuard::acquire()?;
    let result = run(config);
    drop(guard);
    result
}

fn run(config: OsdConfig) -> Result<()> {
    let mut backend = TermBackend;
    let engine = Arc::new(OsdEngine::init(&mut backend, config.clone())?);

    let clock = Arc::new(WallClock::new());
    clock.register(local_time_reference());

    let stream = Arc::new(StubStream::new(engine.clone(), clock.clone())?);
    let dial = DialInput::new(engine.clone(), stream.clone(), &config)?;

    let mut volume: u8 = 5;
    info!("demo running; press q to exit");

    loop {
        if !event::poll(Duration::from_millis(100))? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => break,
            KeyCode::Char(ch @ '0'..='9') => {
                dial.press_digit(ch as u8 - b'0')?;
            }
            KeyCode::Char('+') | KeyCode::Char('=') => {
                volume = (volume + 1).min(10);
                engine.show_volume(volume)?;
            }
            KeyCode::Char('-') => {
                volume = volume.saturating_sub(1);
                engine.show_volume(volume)?;
            }
            KeyCode::Char('m') => {
                volume = 0;
                engine.show_volume(volume)?;
            }
            KeyCode::Char('i') => {
                engine.show_info(stream.info_payload())?;
            }
            KeyCode::Char('n') => stream.step_channel(1),
            KeyCode::Char('p') => stream.step_channel(-1),
            KeyCode::Char('r') => stream.toggle_radio(),
            _ => {}
        }
    }

    // Dial and stream hold engine clones through their timer closures; shut
    // them down first so the engine can be deinitialized exclusively.
    drop(dial);
    drop(stream);
    match Arc::try_unwrap(engine) {
        Ok(mut engine) => engine.deinit()?,
        Err(engine) => {
            drop(engine);
            warn!("engine still shared at exit; deinit deferred to drop");
        }
    }
    Ok(())
}

/// Current wall time as a broadcast-style reference (UTC).
fn local_time_reference() -> TimeReference {
    let since_midnight = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
        % 86_400;
    TimeReference {
        hours: (since_midnight / 3_600) as u8,
        minutes: (since_midnight % 3_600 / 60) as u8,
        seconds: (since_midnight % 60) as u8,
    }
}

/// Pretend tuner. Tracks the tuned channel, pops the program banner on a
/// change, and shows the info panel after a short delay the way the real box
/// waits for the stream to start.
struct StubStream {
    engine: Arc<OsdEngine>,
    clock: Arc<WallClock>,
    current: Arc<Mutex<ChannelInfo>>,
    radio: Mutex<bool>,
    info_delay: ExpiryTimer,
}

impl StubStream {
    fn new(engine: Arc<OsdEngine>, clock: Arc<WallClock>) -> Result<Self> {
        let current = Arc::new(Mutex::new(default_channel(1)));
        let info_delay = {
            let engine = engine.clone();
            let clock = clock.clone();
            let current = current.clone();
            ExpiryTimer::spawn("info-delay", INFO_DELAY, move || {
                let info = *current.lock().unwrap_or_else(|err| err.into_inner());
                let _ = engine.show_info(payload_for(info, &clock));
            })?
        };
        Ok(Self {
            engine,
            clock,
            current,
            radio: Mutex::new(false),
            info_delay,
        })
    }

    fn info_payload(&self) -> InfoPayload {
        let info = *self.current.lock().unwrap_or_else(|err| err.into_inner());
        payload_for(info, &self.clock)
    }

    fn step_channel(&self, delta: i32) {
        let next = {
            let current = self.current.lock().unwrap_or_else(|err| err.into_inner());
            (i32::from(current.program_number) + delta).clamp(1, 999) as u16
        };
        if let Err(err) = self.change_channel(next) {
            warn!("channel step failed: {err:#}");
        }
    }

    fn toggle_radio(&self) {
        let mut radio = self.radio.lock().unwrap_or_else(|err| err.into_inner());
        *radio = !*radio;
        if *radio {
            self.engine.show_radio_placeholder();
        } else {
            self.engine.hide_radio_placeholder();
        }
    }

    fn tune(&self, number: u16) {
        let mut current = self.current.lock().unwrap_or_else(|err| err.into_inner());
        *current = default_channel(number);
    }
}

impl StreamControl for StubStream {
    fn change_channel(&self, number: u16) -> Result<()> {
        self.tune(number);
        info!("tuned to channel {number}");
        self.engine.show_program_number(number)?;
        self.info_delay.arm();
        Ok(())
    }
}

fn default_channel(number: u16) -> ChannelInfo {
    ChannelInfo {
        program_number: number,
        audio_pid: 100 + number as i16,
        video_pid: 200 + number as i16,
        teletext: if number % 2 == 0 {
            Teletext::Available
        } else {
            Teletext::Unavailable
        },
    }
}

fn payload_for(info: ChannelInfo, clock: &WallClock) -> InfoPayload {
    InfoPayload {
        program_number: info.program_number,
        audio_pid: info.audio_pid,
        video_pid: info.video_pid,
        time: clock.current(),
        teletext: info.teletext,
    }
}

/// Raw-mode / alternate-screen guard; restores the terminal on drop so a
/// panic or early return never leaves the shell unusable.
struct TermGuard;

impl TermGuard {
    fn acquire() -> Result<Self> {
        terminal::enable_raw_mode().context("enabling raw mode")?;
        execute!(io::stdout(), terminal::EnterAlternateScreen, cursor::Hide)
            .context("entering alternate screen")?;
        Ok(Self)
    }
}

impl Drop for TermGuard {
    fn drop(&mut self) {
        let _ = execute!(io::stdout(), cursor::Show, terminal::LeaveAlternateScreen);
        let _ = terminal::disable_raw_mode();
    }
}

struct TermBackend;

impl Backend for TermBackend {
    fn create_surface(&mut self) -> Result<Box<dyn Surface>> {
        let (cols, rows) = terminal::size().context("querying terminal size")?;
        Ok(Box::new(TermSurface::new(cols, rows)))
    }

    /// Resolve `volume_N` to a handle carrying the level; `blit` turns it
    /// back into a segment bar.
    fn load_image_asset(&mut self, name: &str) -> Result<ImageHandle> {
        let level: u32 = name
            .strip_prefix("volume_")
            .and_then(|suffix| suffix.parse().ok())
            .with_context(|| format!("unknown image asset {name}"))?;
        anyhow::ensure!(
            (level as usize) < VOLUME_ASSET_COUNT,
            "volume asset {name} out of range"
        );
        Ok(ImageHandle(level))
    }
}

#[derive(Clone, Copy)]
struct Cell {
    ch: char,
    fg: Color,
    bg: Option<Color>,
}

impl Cell {
    const EMPTY: Cell = Cell {
        ch: ' ',
        fg: Color::rgb(0xFF, 0xFF, 0xFF),
        bg: None,
    };
}

/// Cell-grid frame surface. Coordinates are terminal cells; alpha is ignored
/// because terminals cannot blend.
struct TermSurface {
    cols: u16,
    rows: u16,
    cells: Vec<Cell>,
}

impl TermSurface {
    fn new(cols: u16, rows: u16) -> Self {
        Self {
            cols,
            rows,
            cells: vec![Cell::EMPTY; usize::from(cols) * usize::from(rows)],
        }
    }

    fn put(&mut self, x: i32, y: i32, update: impl Fn(&mut Cell)) {
        if x < 0 || y < 0 || x >= i32::from(self.cols) || y >= i32::from(self.rows) {
            return;
        }
        let index = y as usize * usize::from(self.cols) + x as usize;
        update(&mut self.cells[index]);
    }

    fn write_text(&mut self, text: &str, position: Position, align: TextAlign, color: Color) {
        let width = text.chars().count() as i32;
        let start_x = match align {
            TextAlign::Left => position.x,
            TextAlign::Center => position.x - width / 2,
            TextAlign::Right => position.x - width,
        };
        for (offset, ch) in text.chars().enumerate() {
            self.put(start_x + offset as i32, position.y, |cell| {
                cell.ch = ch;
                cell.fg = color;
            });
        }
    }
}

fn term_color(color: Color) -> TermColor {
    TermColor::Rgb {
        r: color.r,
        g: color.g,
        b: color.b,
    }
}

impl Surface for TermSurface {
    fn size(&self) -> (u32, u32) {
        (u32::from(self.cols), u32::from(self.rows))
    }

    fn clear(&mut self) -> Result<()> {
        self.cells.fill(Cell::EMPTY);
        Ok(())
    }

    fn fill_rect(&mut self, region: Region, color: Color) -> Result<()> {
        for y in region.y..region.y + region.height {
            for x in region.x..region.x + region.width {
                self.put(x, y, |cell| {
                    cell.ch = ' ';
                    cell.bg = Some(color);
                });
            }
        }
        Ok(())
    }

    fn draw_text(
        &mut self,
        text: &str,
        position: Position,
        align: TextAlign,
        color: Color,
    ) -> Result<()> {
        self.write_text(text, position, align, color);
        Ok(())
    }

    fn blit(&mut self, image: ImageHandle, position: Position) -> Result<()> {
        let level = image.0 as usize;
        let mut bar = String::from("VOL ");
        for segment in 0..10 {
            bar.push(if segment < level { '\u{25AE}' } else { '\u{25AF}' });
        }
        self.write_text(&bar, position, TextAlign::Left, Color::rgb(0x00, 0xE0, 0x40));
        Ok(())
    }

    fn present(&mut self) -> Result<()> {
        let mut out = io::BufWriter::new(io::stdout());
        queue!(out, cursor::MoveTo(0, 0))?;
        for y in 0..self.rows {
            queue!(out, cursor::MoveTo(0, y))?;
            for x in 0..self.cols {
                let cell = self.cells[usize::from(y) * usize::from(self.cols) + usize::from(x)];
                match cell.bg {
                    Some(bg) => queue!(out, style::SetBackgroundColor(term_color(bg)))?,
                    None => queue!(out, style::SetBackgroundColor(TermColor::Reset))?,
                }
                queue!(
                    out,
                    style::SetForegroundColor(term_color(cell.fg)),
                    style::Print(cell.ch)
                )?;
            }
        }
        out.flush().context("flushing frame to terminal")?;
        Ok(())
    }
}
