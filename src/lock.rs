//! Poisoned-lock recovery helpers shared by the store and worker threads.

use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::Duration;
use tracing::warn;

/// Lock a mutex, recovering the inner value if a panicking thread poisoned it.
/// Overlay state stays valid across a poisoned lock (every mutation is a
/// complete assignment), so recovery is always safe here.
pub(crate) fn lock_or_recover<'a, T>(lock: &'a Mutex<T>, context: &str) -> MutexGuard<'a, T> {
    match lock.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            warn!("mutex poisoned in {context}; recovering");
            poisoned.into_inner()
        }
    }
}

/// Bounded condvar wait with the same poisoning policy. Returns the guard and
/// whether the wait timed out.
pub(crate) fn wait_timeout_or_recover<'a, T>(
    cv: &Condvar,
    guard: MutexGuard<'a, T>,
    timeout: Duration,
    context: &str,
) -> (MutexGuard<'a, T>, bool) {
    match cv.wait_timeout(guard, timeout) {
        Ok((guard, result)) => (guard, result.timed_out()),
        Err(poisoned) => {
            warn!("condvar wait poisoned in {context}; recovering");
            let (guard, result) = poisoned.into_inner();
            (guard, result.timed_out())
        }
    }
}
