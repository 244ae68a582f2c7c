//! Free-running millisecond clock
//!
//! A single background tick (1 ms period) is the only writer of the counter.
//! The control loop reads it inside a critical section so a multi-byte value
//! is never observed half-updated. The counter wraps at 2^32 ms (~49.7 days);
//! intervals are always computed with [`elapsed_ms`], which is correct across
//! the wrap.

use core::cell::Cell;

use critical_section::Mutex;

/// Source of monotonic milliseconds for the control loop.
pub trait Clock {
    /// Current counter value. Non-decreasing modulo 2^32.
    fn now_ms(&self) -> u32;
}

impl<T: Clock + ?Sized> Clock for &T {
    fn now_ms(&self) -> u32 {
        (**self).now_ms()
    }
}

/// Millisecond counter advanced by a periodic tick.
///
/// ```rust,ignore
/// static CLOCK: TickClock = TickClock::new();
///
/// // in the 1 ms timer interrupt / tick task
/// CLOCK.on_tick();
///
/// // in the control loop
/// let now = CLOCK.now_ms();
/// ```
pub struct TickClock {
    millis: Mutex<Cell<u32>>,
}

impl Default for TickClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TickClock {
    pub const fn new() -> Self {
        Self {
            millis: Mutex::new(Cell::new(0)),
        }
    }

    /// Start the counter at an arbitrary value.
    pub const fn starting_at(millis: u32) -> Self {
        Self {
            millis: Mutex::new(Cell::new(millis)),
        }
    }

    /// Advance the counter by one millisecond. Called from the tick context only.
    pub fn on_tick(&self) {
        critical_section::with(|cs| {
            let millis = self.millis.borrow(cs);
            millis.set(millis.get().wrapping_add(1));
        });
    }
}

impl Clock for TickClock {
    fn now_ms(&self) -> u32 {
        // Held only for the load.
        critical_section::with(|cs| self.millis.borrow(cs).get())
    }
}

/// Milliseconds between two counter readings, correct across wraparound.
#[inline]
pub const fn elapsed_ms(since: u32, now: u32) -> u32 {
    now.wrapping_sub(since)
}

/// Whether `now` lies strictly after `deadline`, treating both as points on a
/// wrapping 32-bit timeline less than 2^31 ms apart.
#[inline]
pub const fn is_after(now: u32, deadline: u32) -> bool {
    (now.wrapping_sub(deadline) as i32) > 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticks_advance_counter() {
        let clock = TickClock::new();
        for _ in 0..250 {
            clock.on_tick();
        }
        assert_eq!(clock.now_ms(), 250);
    }

    #[test]
    fn test_counter_wraps_silently() {
        let clock = TickClock::starting_at(u32::MAX);
        clock.on_tick();
        assert_eq!(clock.now_ms(), 0);
    }

    #[test]
    fn test_elapsed_across_wraparound() {
        assert_eq!(elapsed_ms(4_294_967_290, 5), 11);
        assert_eq!(elapsed_ms(1_000, 1_125), 125);
    }

    #[test]
    fn test_is_after_handles_wrap() {
        assert!(is_after(5, 4_294_967_290));
        assert!(!is_after(4_294_967_290, 5));
        assert!(!is_after(100, 100));
        assert!(is_after(101, 100));
    }

    #[test]
    fn test_clock_by_reference() {
        let clock = TickClock::starting_at(42);
        let by_ref: &TickClock = &clock;
        assert_eq!(Clock::now_ms(&by_ref), 42);
    }
}
