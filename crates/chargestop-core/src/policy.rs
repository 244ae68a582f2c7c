//! Stop conditions evaluated once per cycle while charging
//!
//! The evaluator is pure: it only looks at the totals, the latest sample and
//! the dwell deadline it is handed, and returns the (possibly re-armed)
//! deadline alongside its verdict. The caller owns the output line.

use crate::accumulator::Totals;
use crate::clock::is_after;
use crate::config::ControllerConfig;
use crate::limits::LimitKind;
use crate::sensors::Sample;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StopDecision {
    pub stop: bool,
    pub dwell_deadline_ms: u32,
}

/// Decide whether the active limit has been reached.
///
/// For [`LimitKind::Current`] the current must stay below `limit` until
/// `now_ms` passes the dwell deadline; any reading at or above the limit
/// pushes the deadline to `now_ms + dwell_window_ms`.
pub fn should_stop(
    kind: LimitKind,
    limit: u16,
    totals: &Totals,
    sample: &Sample,
    now_ms: u32,
    dwell_deadline_ms: u32,
    config: &ControllerConfig,
) -> StopDecision {
    let limit = limit as u32;
    let mut deadline = dwell_deadline_ms;

    let stop = match kind {
        LimitKind::Capacity => totals.capacity_mah() >= limit,
        LimitKind::Energy => totals.energy_mwh() >= limit,
        LimitKind::Current => {
            if (sample.current_ma as u32) < limit {
                is_after(now_ms, dwell_deadline_ms)
            } else {
                deadline = now_ms.wrapping_add(config.dwell_window_ms);
                false
            }
        }
        LimitKind::Duration => totals.charge_minutes(config.duration_cap_secs) >= limit,
    };

    StopDecision {
        stop,
        dwell_deadline_ms: deadline,
    }
}
