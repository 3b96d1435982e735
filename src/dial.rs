//! Channel-dial input: collects typed digits, keeps the dial box on screen,
//! and commits the entry to the stream controller once the debounce window
//! runs out (or, optionally, as soon as a third digit lands).

use anyhow::Result;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

use crate::config::OsdConfig;
use crate::engine::OsdEngine;
use crate::error::OsdError;
use crate::lock::lock_or_recover;
use crate::state::DIAL_MAX_DIGITS;
use crate::stream::StreamControl;
use crate::timer::ExpiryTimer;

/// Append a digit to an in-progress entry. A fourth digit starts a fresh
/// entry with itself as the first digit, matching the remote's behavior on
/// the original box.
fn push_digit(digits: &mut Vec<u8>, digit: u8) {
    if digits.len() >= DIAL_MAX_DIGITS {
        digits.clear();
    }
    digits.push(digit);
}

/// Compose the typed digits into a channel number, exactly as entered. Any
/// off-by-one mapping to internal channel indices is the stream controller's
/// concern.
pub fn compose_channel(digits: &[u8]) -> u16 {
    digits
        .iter()
        .fold(0u16, |number, digit| number * 10 + u16::from(*digit))
}

/// Commit the current entry: hide the dial, hand the number to the stream
/// controller, reset for the next entry. Runs on the debounce timer thread,
/// or inline on the fast path.
fn finalize_entry(engine: &OsdEngine, stream: &dyn StreamControl, digits: &Mutex<Vec<u8>>) {
    let number = {
        let mut digits = lock_or_recover(digits, "dial digits");
        if digits.is_empty() {
            return;
        }
        let number = compose_channel(&digits);
        digits.clear();
        number
    };
    engine.hide_channel_dial();
    debug!("dial entry committed to channel {number}");
    if let Err(err) = stream.change_channel(number) {
        warn!("channel change to {number} failed: {err:#}");
    }
}

/// Multi-digit channel entry with a debounce timer. Digit keys feed
/// [`press_digit`](Self::press_digit); everything else is automatic.
pub struct DialInput {
    engine: Arc<OsdEngine>,
    stream: Arc<dyn StreamControl>,
    digits: Arc<Mutex<Vec<u8>>>,
    debounce: ExpiryTimer,
    finalize_on_third_digit: bool,
}

impl DialInput {
    pub fn new(
        engine: Arc<OsdEngine>,
        stream: Arc<dyn StreamControl>,
        config: &OsdConfig,
    ) -> Result<Self> {
        let digits = Arc::new(Mutex::new(Vec::with_capacity(DIAL_MAX_DIGITS)));
        let debounce = {
            let engine = engine.clone();
            let stream = stream.clone();
            let digits = digits.clone();
            ExpiryTimer::spawn("dial-debounce", config.dial_debounce_duration(), move || {
                finalize_entry(&engine, stream.as_ref(), &digits);
            })?
        };
        Ok(Self {
            engine,
            stream,
            digits,
            debounce,
            finalize_on_third_digit: config.finalize_on_third_digit,
        })
    }

    /// Handle one digit key: update the entry, refresh the dial box, and
    /// restart the quiet-period countdown.
    pub fn press_digit(&self, digit: u8) -> Result<(), OsdError> {
        if digit > 9 {
            return Err(OsdError::Precondition(format!(
                "dial digit {digit} outside 0..=9"
            )));
        }
        let full = {
            let mut digits = lock_or_recover(&self.digits, "dial digits");
            push_digit(&mut digits, digit);
            self.engine.show_channel_dial(&digits)?;
            digits.len() == DIAL_MAX_DIGITS
        };
        if full && self.finalize_on_third_digit {
            // Fast path: the entry cannot grow any further, so don't make the
            // viewer wait out the quiet period.
            self.debounce.cancel();
            finalize_entry(&self.engine, self.stream.as_ref(), &self.digits);
        } else {
            self.debounce.arm();
        }
        Ok(())
    }
}
