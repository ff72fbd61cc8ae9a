//! Time source for the coil re-initialization timeout
//!
//! The state machine only compares relative times, so any millisecond counter
//! works. Hosts without one use [`LogicalTime`], which the driver advances by the
//! configured sampling delay on every `measure()` call.

use core::cell::Cell;

/// Millisecond time source
pub trait TimeSource {
    /// Current time in milliseconds (wrapping)
    fn now_ms(&self) -> u32;

    /// Called by the driver once per `measure()` with the sampling delay
    ///
    /// Real clocks ignore it.
    fn advance(&self, _elapsed_ms: u32) {}

    /// Whether `now_ms` reflects real time
    ///
    /// Measurements only carry a timestamp when this is `true`.
    fn is_monotonic(&self) -> bool {
        true
    }
}

/// Logical clock driven by the sample cadence
///
/// # Example
///
/// ```
/// use yas537::{LogicalTime, TimeSource};
///
/// let time = LogicalTime::new();
/// time.advance(50);
/// time.advance(50);
/// assert_eq!(time.now_ms(), 100);
/// assert!(!time.is_monotonic());
/// ```
#[derive(Debug, Clone, Default)]
pub struct LogicalTime {
    current_ms: Cell<u32>,
}

impl LogicalTime {
    /// Create a logical clock starting at 0
    #[must_use]
    pub const fn new() -> Self {
        Self {
            current_ms: Cell::new(0),
        }
    }
}

impl TimeSource for LogicalTime {
    fn now_ms(&self) -> u32 {
        self.current_ms.get()
    }

    fn advance(&self, elapsed_ms: u32) {
        self.current_ms
            .set(self.current_ms.get().wrapping_add(elapsed_ms));
    }

    fn is_monotonic(&self) -> bool {
        false
    }
}

impl<T: TimeSource> TimeSource for &T {
    fn now_ms(&self) -> u32 {
        (**self).now_ms()
    }

    fn advance(&self, elapsed_ms: u32) {
        (**self).advance(elapsed_ms);
    }

    fn is_monotonic(&self) -> bool {
        (**self).is_monotonic()
    }
}
