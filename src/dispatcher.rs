//! Dispatcher (spec.md §4.3): turns a port's send `FlowTable` into a
//! `SendCache` — a macro period and the sorted timeline of fire instants.
//!
//! Grounded on the teacher's preference for small, pure, allocation-once
//! functions over the hot path (see `variable_versions/v9.rs`'s template
//! expansion loops): `build_send_cache` takes a snapshot of entries and
//! returns an owned result, no shared state.

use crate::error::TtEvent;
use crate::flow_table::FlowEntry;

/// The dispatcher's output for a port (spec.md §3).
#[derive(Debug, Clone, Default)]
pub struct SendCache {
    pub macro_period: u64,
    pub times: Vec<u64>,
    pub flow_ids: Vec<u16>,
    /// Collisions detected while building this cache, reported but not
    /// fatal — the schedule in `times`/`flow_ids` is still installed.
    pub collisions: Vec<TtEvent>,
}

impl SendCache {
    pub fn size(&self) -> usize {
        self.times.len()
    }

    /// Binary-search lookup used by the timer handler (spec.md §4.4, §8
    /// property 6): the greatest `i` with `times[i] <= t`, wrapping to
    /// `size - 1` if `t` precedes every instant.
    pub fn index_at_or_before(&self, t: u64) -> usize {
        match self.times.binary_search(&t) {
            Ok(i) => i,
            Err(0) => self.times.len() - 1,
            Err(i) => i - 1,
        }
    }
}

fn gcd(a: u64, b: u64) -> u64 {
    if b == 0 { a } else { gcd(b, a % b) }
}

fn lcm(a: u64, b: u64) -> u64 {
    a / gcd(a, b) * b
}

/// Build a [`SendCache`] from a port's present send-table entries.
///
/// Returns `None` if `entries` is empty — callers map that to
/// `TtError::NothingToSchedule` (spec.md §4.3 step 1).
pub fn build_send_cache(entries: &[FlowEntry]) -> Option<SendCache> {
    if entries.is_empty() {
        return None;
    }

    let macro_period = entries
        .iter()
        .map(|e| e.period)
        .fold(1u64, |acc, period| lcm(acc, period));

    let size: usize = entries
        .iter()
        .map(|e| (macro_period / e.period) as usize)
        .sum();

    let mut times = Vec::with_capacity(size);
    let mut flow_ids = Vec::with_capacity(size);

    for entry in entries {
        let mut instant = entry.offset;
        while instant < macro_period {
            times.push(instant);
            flow_ids.push(entry.flow_id);
            instant += entry.period;
        }
    }

    // A stable sort, not an unstable one: spec.md notes "stable sort
    // unnecessary", but a deterministic tie order makes collision reports
    // reproducible across runs, which is worth the (here, negligible) cost.
    let mut order: Vec<usize> = (0..times.len()).collect();
    order.sort_by_key(|&i| times[i]);

    let sorted_times: Vec<u64> = order.iter().map(|&i| times[i]).collect();
    let sorted_flow_ids: Vec<u16> = order.iter().map(|&i| flow_ids[i]).collect();

    let mut collisions = Vec::new();
    for i in 1..sorted_times.len() {
        if sorted_times[i] <= sorted_times[i - 1] {
            collisions.push(TtEvent::Collision {
                flow_a: sorted_flow_ids[i - 1],
                flow_b: sorted_flow_ids[i],
                instant_ns: sorted_times[i],
            });
        }
    }

    Some(SendCache {
        macro_period,
        times: sorted_times,
        flow_ids: sorted_flow_ids,
        collisions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(flow_id: u16, offset: u64, period: u64) -> FlowEntry {
        FlowEntry {
            flow_id,
            period,
            offset,
            packet_size: 64,
            buffer_id: 0,
        }
    }

    /// S1 — Two-flow schedule (spec.md §8).
    #[test]
    fn two_flow_schedule_matches_spec_scenario() {
        let entries = vec![entry(0, 0, 300), entry(1, 100, 500)];
        let cache = build_send_cache(&entries).unwrap();
        assert_eq!(cache.macro_period, 1_500);
        assert_eq!(cache.size(), 8);
        assert_eq!(
            cache.times,
            vec![0, 100, 300, 600, 600, 900, 1_100, 1_200]
        );
        assert_eq!(cache.collisions.len(), 1);
        assert_eq!(
            cache.collisions[0],
            TtEvent::Collision { flow_a: 0, flow_b: 1, instant_ns: 600 }
        );
    }

    /// S2 — Single-flow schedule (spec.md §8).
    #[test]
    fn single_flow_schedule_matches_spec_scenario() {
        let entries = vec![entry(7, 250, 1_000)];
        let cache = build_send_cache(&entries).unwrap();
        assert_eq!(cache.macro_period, 1_000);
        assert_eq!(cache.size(), 1);
        assert_eq!(cache.times, vec![250]);
        assert_eq!(cache.flow_ids, vec![7]);
    }

    #[test]
    fn empty_table_has_nothing_to_schedule() {
        assert!(build_send_cache(&[]).is_none());
    }

    #[test]
    fn times_are_strictly_sorted_barring_collisions() {
        let entries = vec![entry(0, 0, 300), entry(1, 100, 500)];
        let cache = build_send_cache(&entries).unwrap();
        for window in cache.times.windows(2) {
            assert!(window[1] >= window[0]);
        }
    }

    #[test]
    fn every_entry_appears_macro_period_over_period_times() {
        let entries = vec![entry(0, 0, 300), entry(1, 100, 500)];
        let cache = build_send_cache(&entries).unwrap();
        let count_zero = cache.flow_ids.iter().filter(|&&id| id == 0).count();
        let count_one = cache.flow_ids.iter().filter(|&&id| id == 1).count();
        assert_eq!(count_zero, cache.macro_period as usize / 300);
        assert_eq!(count_one, cache.macro_period as usize / 500);
    }

    #[test]
    fn binary_search_wraps_when_t_precedes_all_instants() {
        let entries = vec![entry(7, 250, 1_000)];
        let cache = build_send_cache(&entries).unwrap();
        assert_eq!(cache.index_at_or_before(0), 0);
    }

    #[test]
    fn binary_search_finds_greatest_le_t() {
        let entries = vec![entry(0, 0, 300), entry(1, 100, 500)];
        let cache = build_send_cache(&entries).unwrap();
        assert_eq!(cache.index_at_or_before(650), 4);
        assert_eq!(cache.index_at_or_before(1_499), 7);
    }
}
