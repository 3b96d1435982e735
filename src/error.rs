//! Error taxonomy for the overlay engine public API.

use thiserror::Error;

/// Errors surfaced across the engine boundary.
///
/// Internal plumbing uses `anyhow`; the variants here classify failures the
/// way callers need to react to them: `Init` aborts startup, `Thread` and
/// `Render` are teardown/runtime reports, `Precondition` is a contract
/// violation rejected at the API boundary before any state changes.
#[derive(Debug, Error)]
pub enum OsdError {
    /// Backend/resource acquisition or thread spawn failed during `init`.
    /// Not partially retryable; tear down and retry from scratch.
    #[error("overlay engine init failed: {0:#}")]
    Init(#[source] anyhow::Error),

    /// A worker thread could not be joined at teardown. Teardown proceeds
    /// best-effort so remaining resources are still released.
    #[error("overlay thread error: {0}")]
    Thread(String),

    /// The render loop died mid-run (a failed present/flip is fatal to it).
    #[error("render loop failed: {0:#}")]
    Render(#[source] anyhow::Error),

    /// Caller passed a value outside the documented contract.
    #[error("precondition violated: {0}")]
    Precondition(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn messages_identify_the_failure_class() {
        let err = OsdError::Init(anyhow!("no surface"));
        assert!(err.to_string().contains("init failed"));

        let err = OsdError::Precondition("volume level 11 outside 0..=10".into());
        assert!(err.to_string().contains("volume level 11"));
    }
}
