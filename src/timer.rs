//! Timer loop (spec.md §4.4): the high-resolution driver that walks a
//! port's `SendCache` and emits the staged frame for each instant.
//!
//! The handler's decision logic (§4.4 steps 1-8) is kept as a pure
//! function, `next`, separate from the thread that drives it in
//! [`crate::port`] — the same split the teacher draws between parsing
//! (`variable_versions/v9.rs`, pure) and the tokio-driven examples that
//! call it. Pure logic is what spec.md §8's invariants are about, and it's
//! what the test clock in [`crate::clock::TestClock`] is for.

use std::hint;

use crate::clock::Clock;
use crate::dispatcher::SendCache;

/// `Idle`/`Armed` from spec.md §4.4.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    Idle,
    Armed,
}

/// What the handler decided to do at one expiry, before the busy-wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandlerOutcome {
    /// Nanoseconds until the *next* expiry should be armed.
    pub wait_ns: u64,
    /// The flow whose staged frame should be emitted this expiry.
    pub flow_id: u16,
    /// Absolute wall-clock time (ns since the clock's epoch) this flow's
    /// frame should leave the port.
    pub send_time_abs_ns: u64,
}

/// spec.md §4.4 step 2: compute what to do at one timer expiry.
///
/// `global_time_ns` is read once at expiry; `wall_now_ns` anchors the
/// `send_time_abs_ns` projection. `advance_time_ns` is the per-port slack
/// from [`crate::config::ScheduleConfig`].
pub fn next(
    cache: &SendCache,
    global_time_ns: u64,
    wall_now_ns: u64,
    advance_time_ns: u64,
) -> HandlerOutcome {
    let macro_period = cache.macro_period;
    let size = cache.size();
    let mod_time = global_time_ns % macro_period;

    let idx = cache.index_at_or_before(mod_time);
    let flow_id = cache.flow_ids[idx];
    let next_idx = (idx + 1) % size;
    let wrapped = next_idx == 0;

    // spec.md §4.4: "wait_ns = times[(idx+1) mod size] - times[idx],
    // adjusted by + macro_period on wrap". Wrap means idx was the last
    // instant, not that the subtraction went negative — an adjacent
    // duplicate instant (the collision case) legitimately yields 0 here.
    let mut wait_ns = if wrapped {
        cache.times[next_idx] + macro_period - cache.times[idx]
    } else {
        cache.times[next_idx] - cache.times[idx]
    };

    let offset_to_instant = (macro_period + cache.times[idx] - mod_time) % macro_period;
    let send_time_abs_ns = wall_now_ns + offset_to_instant;

    // spec.md §4.4 step 3: two flows at the same instant (the tolerated
    // collision case) yield wait_ns == 0; bias the next expiry forward so
    // the loop does not spin on a zero-length rearm.
    if wait_ns == 0 {
        wait_ns = send_time_abs_ns + advance_time_ns;
    }

    HandlerOutcome {
        wait_ns,
        flow_id,
        send_time_abs_ns,
    }
}

/// spec.md §4.4 step 6: did the handler wake after the intended instant?
pub fn is_miss(send_time_abs_ns: u64, wall_now_ns: u64) -> bool {
    send_time_abs_ns < wall_now_ns
}

/// Pluggable busy-wait strategy (spec.md §9: "the spec admits a pluggable
/// wait strategy"). The handler spins until `wall_now_ns() + advance >=
/// target`, re-reading the clock each iteration.
pub trait WaitStrategy: Send + Sync {
    fn spin_until(&self, clock: &dyn Clock, advance_time_ns: u64, target_ns: u64);
}

/// Default strategy: a tight spin using `std::hint::spin_loop`, sized for
/// sub-microsecond alignment inside the `advance_time_ns` slack.
#[derive(Debug, Clone, Copy, Default)]
pub struct TightSpin;

impl WaitStrategy for TightSpin {
    fn spin_until(&self, clock: &dyn Clock, advance_time_ns: u64, target_ns: u64) {
        while clock.wall_now_ns() + advance_time_ns < target_ns {
            hint::spin_loop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::build_send_cache;
    use crate::flow_table::FlowEntry;

    fn entry(flow_id: u16, offset: u64, period: u64) -> FlowEntry {
        FlowEntry { flow_id, period, offset, packet_size: 64, buffer_id: 0 }
    }

    /// S2 — single-flow schedule, `next(0)` (spec.md §8).
    #[test]
    fn single_flow_next_at_zero() {
        let cache = build_send_cache(&[entry(7, 250, 1_000)]).unwrap();
        let outcome = next(&cache, 0, 1_000_000, 50_000);
        assert_eq!(outcome.wait_ns, 1_000);
        assert_eq!(outcome.flow_id, 7);
        assert_eq!(outcome.send_time_abs_ns, 1_000_000 + 250);
    }

    #[test]
    fn wraps_around_macro_period() {
        let cache = build_send_cache(&[entry(7, 250, 1_000)]).unwrap();
        // global_time just past the single instant: next expiry wraps to
        // the same flow one macro period later.
        let outcome = next(&cache, 260, 0, 50_000);
        assert_eq!(outcome.flow_id, 7);
        assert_eq!(outcome.wait_ns, 1_000);
    }

    #[test]
    fn collision_biases_wait_forward_instead_of_zero() {
        let cache = build_send_cache(&[entry(0, 0, 300), entry(1, 100, 500)]).unwrap();
        // mod_time == 600 lands exactly on the colliding pair; wait_ns from
        // times[idx] to times[idx+1] (both 600) would be zero.
        let outcome = next(&cache, 600, 0, 50_000);
        assert_ne!(outcome.wait_ns, 0);
    }

    #[test]
    fn miss_detection() {
        assert!(is_miss(1_000, 1_500));
        assert!(!is_miss(1_500, 1_000));
        assert!(!is_miss(1_000, 1_000));
    }
}
