//! [`Config`] defines tuning knobs shared by the acquisition slow path.

use std::fmt;
#[cfg(not(feature = "loom"))]
use std::thread::yield_now;

#[cfg(feature = "loom")]
use loom::thread::yield_now;

/// [`Config`] defines tuning knobs shared by the acquisition slow path.
pub(crate) trait Config: fmt::Debug + Default {
    /// The number of acquisition retries before the caller enters the wait queue.
    #[inline]
    #[must_use]
    fn spin_count() -> usize {
        // Spinning only multiplies the schedules `loom` has to explore.
        if cfg!(feature = "loom") { 1 } else { 4096 }
    }

    /// The backoff applied between acquisition retries.
    #[inline]
    fn backoff(spin_count: usize) {
        if spin_count % 64 == 0 {
            yield_now();
        }
    }
}

/// Default configuration for the lock.
#[derive(Debug, Default)]
pub(crate) struct DefaultConfig;

impl Config for DefaultConfig {}
