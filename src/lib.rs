//! Transient on-screen-display overlays for a set-top-box TV application:
//! channel banner, volume bar, info panel, channel-dial entry, and radio
//! placeholder, each with independent auto-dismiss timing, composited over
//! the live video surface by a dedicated render thread.
//!
//! The rendering backend, tuner/demux control, and remote-control decoding
//! are collaborators behind the traits in [`surface`] and [`stream`]; this
//! crate owns only the shared overlay state, the timers, the render loop,
//! and the startup/teardown handshake between them.

pub mod clock;
pub mod config;
pub mod dial;
pub mod engine;
mod error;
mod lock;
mod render;
pub mod state;
pub mod stream;
pub mod surface;
pub mod telemetry;
pub mod timer;

pub use config::OsdConfig;
pub use engine::OsdEngine;
pub use error::OsdError;
