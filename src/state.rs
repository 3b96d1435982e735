//! Shared overlay state: which elements are up and what they display.
//!
//! One mutex guards everything. The render loop takes a snapshot per
//! iteration, control-API calls and timer expirations mutate through the same
//! lock, so every reader sees a consistent frame's worth of state. All
//! transitions funnel through [`OverlayState::apply`] so the show/hide state
//! machine lives in one place instead of scattered callbacks.

use std::sync::Mutex;

use crate::lock::lock_or_recover;

/// Maximum digits in a channel-dial entry.
pub const DIAL_MAX_DIGITS: usize = 3;
/// Highest valid volume level (inclusive); one image asset exists per level.
pub const VOLUME_MAX_LEVEL: u8 = 10;

/// One independently shown/hidden overlay layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    ProgramNumber,
    Volume,
    Info,
    ChannelDial,
    RadioLogo,
}

impl ElementKind {
    /// All elements in draw order: later entries composite over earlier ones.
    pub const DRAW_ORDER: [ElementKind; 5] = [
        ElementKind::ProgramNumber,
        ElementKind::Volume,
        ElementKind::RadioLogo,
        ElementKind::Info,
        ElementKind::ChannelDial,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::ProgramNumber => "program-number",
            Self::Volume => "volume",
            Self::Info => "info",
            Self::ChannelDial => "channel-dial",
            Self::RadioLogo => "radio-logo",
        }
    }

    fn index(self) -> usize {
        match self {
            Self::ProgramNumber => 0,
            Self::Volume => 1,
            Self::Info => 2,
            Self::ChannelDial => 3,
            Self::RadioLogo => 4,
        }
    }
}

/// Teletext availability as reported by the demux tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Teletext {
    Available,
    Unavailable,
    #[default]
    Unknown,
}

impl Teletext {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Available => "teletext available",
            Self::Unavailable => "no teletext",
            Self::Unknown => "teletext unknown",
        }
    }
}

/// Broadcast time of day. Absence is modelled as `Option<ClockTime>` rather
/// than an out-of-range sentinel value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockTime {
    pub hours: u8,
    pub minutes: u8,
}

impl ClockTime {
    pub fn display(&self) -> String {
        format!("{:02}:{:02}", self.hours, self.minutes)
    }
}

/// Everything the info panel shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InfoPayload {
    pub program_number: u16,
    pub audio_pid: i16,
    pub video_pid: i16,
    /// `None` until a time table has been received.
    pub time: Option<ClockTime>,
    pub teletext: Teletext,
}

/// Tagged transition applied to the store. Timer expirations arrive as
/// [`OverlayEvent::ElementExpired`] so auto-dismiss is an explicit state
/// transition, not an anonymous flag write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverlayEvent {
    ShowProgramNumber(u16),
    ShowVolume(u8),
    ShowInfo(InfoPayload),
    ShowChannelDial(Vec<u8>),
    HideChannelDial,
    ShowRadioLogo,
    HideRadioLogo,
    ElementExpired(ElementKind),
}

/// The single shared record the render loop paints from.
#[derive(Debug, Clone, Default)]
pub struct OverlayState {
    visible: [bool; 5],
    pub program_number: u16,
    pub volume_level: u8,
    pub info: InfoPayload,
    pub dial_digits: Vec<u8>,
}

impl OverlayState {
    pub fn is_visible(&self, kind: ElementKind) -> bool {
        self.visible[kind.index()]
    }

    fn set_visible(&mut self, kind: ElementKind, visible: bool) {
        self.visible[kind.index()] = visible;
    }

    /// The transition table. Callers enforce preconditions (volume range,
    /// digit count) before building an event; this only asserts them.
    pub fn apply(&mut self, event: OverlayEvent) {
        match event {
            OverlayEvent::ShowProgramNumber(number) => {
                self.program_number = number;
                self.set_visible(ElementKind::ProgramNumber, true);
            }
            OverlayEvent::ShowVolume(level) => {
                debug_assert!(level <= VOLUME_MAX_LEVEL);
                self.volume_level = level;
                self.set_visible(ElementKind::Volume, true);
            }
            OverlayEvent::ShowInfo(payload) => {
                self.info = payload;
                self.set_visible(ElementKind::Info, true);
            }
            OverlayEvent::ShowChannelDial(digits) => {
                debug_assert!(!digits.is_empty() && digits.len() <= DIAL_MAX_DIGITS);
                self.dial_digits = digits;
                self.set_visible(ElementKind::ChannelDial, true);
            }
            OverlayEvent::HideChannelDial => {
                self.dial_digits.clear();
                self.set_visible(ElementKind::ChannelDial, false);
            }
            OverlayEvent::ShowRadioLogo => self.set_visible(ElementKind::RadioLogo, true),
            OverlayEvent::HideRadioLogo => self.set_visible(ElementKind::RadioLogo, false),
            OverlayEvent::ElementExpired(kind) => self.set_visible(kind, false),
        }
    }
}

/// Locked owner of the one [`OverlayState`] instance. Shared by `Arc` between
/// the control API, the timer threads, and the render loop.
#[derive(Debug, Default)]
pub struct OverlayStore {
    inner: Mutex<OverlayState>,
}

impl OverlayStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clone the current state under the lock. The render loop calls this
    /// once per iteration; rapid successive mutations may coalesce into one
    /// observed snapshot, which is fine.
    pub fn snapshot(&self) -> OverlayState {
        lock_or_recover(&self.inner, "overlay store snapshot").clone()
    }

    /// Run a mutator under the lock. Nothing slow may happen inside: the
    /// closure applies the mutation (and may arm a timer, which is one
    /// non-blocking channel send) and returns.
    pub fn update<F>(&self, mutate: F)
    where
        F: FnOnce(&mut OverlayState),
    {
        let mut state = lock_or_recover(&self.inner, "overlay store update");
        mutate(&mut state);
    }

    pub fn apply(&self, event: OverlayEvent) {
        self.update(|state| state.apply(event));
    }
}
