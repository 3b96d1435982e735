//! Engine lifecycle and the public control API.
//!
//! `init` wires the store, the expiry timers, and the render thread together;
//! `deinit` runs the shutdown handshake in the one order that is safe: stop
//! the render loop, wait bounded on its completion signal, join, shut the
//! timers down, and only then let the store and surface go. Control-API calls
//! mutate the store and re-arm the matching timer inside a single critical
//! section so the render loop can never observe `visible` without its payload.

use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::OsdConfig;
use crate::error::OsdError;
use crate::render::{RenderLoop, VolumeAssets};
use crate::state::{
    ElementKind, InfoPayload, OverlayEvent, OverlayStore, DIAL_MAX_DIGITS, VOLUME_MAX_LEVEL,
};
use crate::surface::{volume_asset_name, Backend, ImageHandle};
use crate::timer::ExpiryTimer;

/// Upper bound on waiting for the render loop's completion signal. Blowing
/// it is logged, not fatal; the thread is still joined afterwards.
const DEINIT_WAIT: Duration = Duration::from_secs(2);

struct ExpiryTimers {
    program_number: ExpiryTimer,
    volume: ExpiryTimer,
    info: ExpiryTimer,
}

/// The OSD overlay engine. Shareable across threads behind an `Arc`; every
/// control method takes `&self`.
pub struct OsdEngine {
    store: Arc<OverlayStore>,
    timers: ExpiryTimers,
    render: RenderLoop,
    deinitialized: bool,
}

impl OsdEngine {
    /// Bring the engine up: create the surface, preload the volume assets,
    /// start the auto-dismiss timers and the render thread. Any failure is an
    /// [`OsdError::Init`]; there is no partial retry, tear down and start over.
    pub fn init(backend: &mut dyn Backend, config: OsdConfig) -> Result<Self, OsdError> {
        config.validate().map_err(OsdError::Init)?;

        let surface = backend
            .create_surface()
            .context("creating frame surface")
            .map_err(OsdError::Init)?;

        let mut handles = [ImageHandle(0); crate::surface::VOLUME_ASSET_COUNT];
        for (level, slot) in handles.iter_mut().enumerate() {
            let name = volume_asset_name(level as u8);
            *slot = backend
                .load_image_asset(&name)
                .with_context(|| format!("loading image asset {name}"))
                .map_err(OsdError::Init)?;
        }

        let store = Arc::new(OverlayStore::new());

        // Expiry is delivered to the store as an explicit event; each timer
        // clears exactly one visibility flag through the store's lock.
        let timers = ExpiryTimers {
            program_number: Self::expiry_timer(
                &store,
                ElementKind::ProgramNumber,
                config.program_banner_duration(),
            )?,
            volume: Self::expiry_timer(&store, ElementKind::Volume, config.volume_duration())?,
            info: Self::expiry_timer(&store, ElementKind::Info, config.info_duration())?,
        };

        let render = RenderLoop::spawn(
            surface,
            store.clone(),
            VolumeAssets(handles),
            config.frame_interval(),
        )
        .map_err(OsdError::Init)?;

        info!("overlay engine initialized");
        Ok(Self {
            store,
            timers,
            render,
            deinitialized: false,
        })
    }

    fn expiry_timer(
        store: &Arc<OverlayStore>,
        kind: ElementKind,
        duration: Duration,
    ) -> Result<ExpiryTimer, OsdError> {
        let store = store.clone();
        ExpiryTimer::spawn(kind.label(), duration, move || {
            store.apply(OverlayEvent::ElementExpired(kind));
        })
        .map_err(OsdError::Init)
    }

    /// Show the program-number banner and restart its 4 s window.
    pub fn show_program_number(&self, number: u16) -> Result<(), OsdError> {
        self.store.update(|state| {
            state.apply(OverlayEvent::ShowProgramNumber(number));
            self.timers.program_number.arm();
        });
        Ok(())
    }

    /// Show the volume bar for `level` and restart its window. Levels above
    /// 10 have no asset and are rejected before the store is touched.
    pub fn show_volume(&self, level: u8) -> Result<(), OsdError> {
        if level > VOLUME_MAX_LEVEL {
            return Err(OsdError::Precondition(format!(
                "volume level {level} outside 0..={VOLUME_MAX_LEVEL}"
            )));
        }
        self.store.update(|state| {
            state.apply(OverlayEvent::ShowVolume(level));
            self.timers.volume.arm();
        });
        Ok(())
    }

    /// Show the info panel with `payload` and restart its window.
    pub fn show_info(&self, payload: InfoPayload) -> Result<(), OsdError> {
        self.store.update(|state| {
            state.apply(OverlayEvent::ShowInfo(payload));
            self.timers.info.arm();
        });
        Ok(())
    }

    /// Show the channel-dial box with the digits typed so far. The dial has
    /// no engine-owned timer; the caller's debounce decides when it commits.
    pub fn show_channel_dial(&self, digits: &[u8]) -> Result<(), OsdError> {
        if digits.is_empty() || digits.len() > DIAL_MAX_DIGITS {
            return Err(OsdError::Precondition(format!(
                "channel dial needs 1..={DIAL_MAX_DIGITS} digits, got {}",
                digits.len()
            )));
        }
        if let Some(bad) = digits.iter().find(|digit| **digit > 9) {
            return Err(OsdError::Precondition(format!(
                "channel dial digit {bad} outside 0..=9"
            )));
        }
        self.store
            .apply(OverlayEvent::ShowChannelDial(digits.to_vec()));
        Ok(())
    }

    pub fn hide_channel_dial(&self) {
        self.store.apply(OverlayEvent::HideChannelDial);
    }

    /// Radio placeholder has no auto-dismiss; it stays until hidden. Whether
    /// it is meaningful (no video PID tuned) is the stream controller's call.
    pub fn show_radio_placeholder(&self) {
        self.store.apply(OverlayEvent::ShowRadioLogo);
    }

    pub fn hide_radio_placeholder(&self) {
        self.store.apply(OverlayEvent::HideRadioLogo);
    }

    /// Tear the engine down. Idempotent: the second and later calls are
    /// no-ops. Returns [`OsdError::Render`] if the render loop had already
    /// died of a present failure, [`OsdError::Thread`] if the join failed;
    /// teardown releases every resource it can in either case.
    pub fn deinit(&mut self) -> Result<(), OsdError> {
        if self.deinitialized {
            return Ok(());
        }
        self.deinitialized = true;

        self.render.request_stop();
        if !self.render.wait_finished(DEINIT_WAIT) {
            warn!(
                "render loop did not signal completion within {DEINIT_WAIT:?}; joining anyway"
            );
        }
        let join_result = self.render.join();
        let render_error = self.render.take_error();

        // Timers go down after the render thread but before the store can be
        // dropped; each holds its own Arc to the store, so a callback racing
        // shutdown still has valid state to write to.
        self.timers.program_number.shutdown();
        self.timers.volume.shutdown();
        self.timers.info.shutdown();

        info!("overlay engine deinitialized");
        if let Some(err) = render_error {
            return Err(OsdError::Render(err));
        }
        join_result.map_err(OsdError::Thread)
    }
}

impl Drop for OsdEngine {
    fn drop(&mut self) {
        if !self.deinitialized {
            if let Err(err) = self.deinit() {
                warn!("implicit deinit on drop reported: {err}");
            }
        }
    }
}
