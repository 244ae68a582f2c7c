//! 1 ms background tick driving the controller clock

use chargestop_core::clock::TickClock;
use embassy_time::{Duration, Ticker};

/// Millisecond counter read by the control loop.
pub static CLOCK: TickClock = TickClock::new();

#[embassy_executor::task]
pub async fn clock_tick_task() -> ! {
    let mut ticker = Ticker::every(Duration::from_millis(1));
    loop {
        ticker.next().await;
        CLOCK.on_tick();
    }
}
