//! Engine timing configuration. Defaults match the set-top-box constants:
//! 4 s program banner, 3 s volume bar, 3 s info panel, 2 s dial debounce.

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OsdConfig {
    /// How long the program-number banner stays up after a channel change.
    pub program_banner_ms: u64,
    /// How long the volume bar stays up after a volume key.
    pub volume_ms: u64,
    /// How long the info panel stays up.
    pub info_ms: u64,
    /// Quiet period after the last digit key before the dial entry commits.
    pub dial_debounce_ms: u64,
    /// Optional redraw cap. `None` free-runs the render loop; overlay content
    /// only changes on discrete events, so a cap does not change what is shown.
    pub frame_cap_hz: Option<u32>,
    /// Fast path: commit the dial entry as soon as a third digit arrives
    /// instead of waiting out the debounce window.
    pub finalize_on_third_digit: bool,
}

impl Default for OsdConfig {
    fn default() -> Self {
        Self {
            program_banner_ms: 4_000,
            volume_ms: 3_000,
            info_ms: 3_000,
            dial_debounce_ms: 2_000,
            frame_cap_hz: None,
            finalize_on_third_digit: false,
        }
    }
}

impl OsdConfig {
    pub fn load_json(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Self = serde_json::from_str(&raw)
            .with_context(|| format!("parsing config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the timer set cannot honor. A zero duration
    /// would make an element invisible before the render loop ever saw it.
    pub fn validate(&self) -> Result<()> {
        ensure!(self.program_banner_ms > 0, "program_banner_ms must be > 0");
        ensure!(self.volume_ms > 0, "volume_ms must be > 0");
        ensure!(self.info_ms > 0, "info_ms must be > 0");
        ensure!(self.dial_debounce_ms > 0, "dial_debounce_ms must be > 0");
        if let Some(hz) = self.frame_cap_hz {
            ensure!(hz > 0, "frame_cap_hz must be > 0 when set");
        }
        Ok(())
    }

    pub fn program_banner_duration(&self) -> Duration {
        Duration::from_millis(self.program_banner_ms)
    }

    pub fn volume_duration(&self) -> Duration {
        Duration::from_millis(self.volume_ms)
    }

    pub fn info_duration(&self) -> Duration {
        Duration::from_millis(self.info_ms)
    }

    pub fn dial_debounce_duration(&self) -> Duration {
        Duration::from_millis(self.dial_debounce_ms)
    }

    pub fn frame_interval(&self) -> Option<Duration> {
        self.frame_cap_hz
            .map(|hz| Duration::from_secs_f64(1.0 / f64::from(hz)))
    }
}
