//! Flow table (spec.md §3, §4.2): a sparse, index-addressed, per-port
//! container of [`FlowEntry`] records, safe to read concurrently with the
//! single writer that mutates it.
//!
//! Grounded on the corpus's index-addressed slot tables (the `bindless`
//! `Table`/`SlotArray` pattern and `readyset`'s `table.rs`) but simplified
//! to what spec.md actually asks for: a `Vec<Option<FlowEntry>>` rather
//! than a generational slot map, because `flow_id` reuse across a table
//! replacement is not a concern the spec raises. Concurrent-safe reads are
//! `arc_swap::ArcSwap`, which gives the deferred-reclamation behavior
//! spec.md §9 asks for "for free": a reader's `Guard` keeps the old `Arc`
//! alive for the duration of its borrow, so there is no separate epoch
//! counter to maintain.

use std::sync::Arc;

use arc_swap::{ArcSwap, Guard};
use serde::Serialize;

use crate::error::TtError;

/// One scheduled flow on a port (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FlowEntry {
    pub flow_id: u16,
    /// Nanoseconds, strictly positive.
    pub period: u64,
    /// Nanoseconds, `0 <= offset < period`.
    pub offset: u64,
    /// Advisory, for admission checks.
    pub packet_size: u32,
    /// Opaque association with a staged packet slot.
    pub buffer_id: u32,
}

/// The slot array itself. Immutable once built; `FlowTable::insert`/`delete`
/// always produce a new `FlowTableInner` that gets swapped in atomically.
#[derive(Debug, Clone, Default)]
struct FlowTableInner {
    slots: Vec<Option<FlowEntry>>,
    count: usize,
}

impl FlowTableInner {
    fn capacity(&self) -> usize {
        self.slots.len()
    }
}

/// Handle to a port's send or arrive table.
///
/// Writers call [`FlowTable::insert`]/[`FlowTable::delete`] under the
/// port's mutex (spec.md §5: "FlowTable writes serialize on the port
/// mutex"). Readers call [`FlowTable::lookup`]/[`FlowTable::count`] from
/// any thread, lock-free.
#[derive(Debug)]
pub struct FlowTable {
    inner: ArcSwap<FlowTableInner>,
    min_cap: u16,
}

impl FlowTable {
    pub fn new(min_cap: u16) -> Self {
        FlowTable {
            inner: ArcSwap::from_pointee(FlowTableInner {
                slots: vec![None; min_cap as usize],
                count: 0,
            }),
            min_cap,
        }
    }

    /// O(1) indexed read, safe under concurrent mutation.
    pub fn lookup(&self, flow_id: u16) -> Option<FlowEntry> {
        let snapshot: Guard<Arc<FlowTableInner>> = self.inner.load();
        snapshot.slots.get(flow_id as usize).copied().flatten()
    }

    /// Exact occupied-slot count.
    pub fn count(&self) -> usize {
        self.inner.load().count
    }

    /// Current slot count (informative; not part of the public contract
    /// but useful for the resize-monotonicity property tests).
    pub fn capacity(&self) -> usize {
        self.inner.load().capacity()
    }

    /// Insert `entry`, growing the table to `flow_id + min_cap` if needed.
    /// Replaces any existing entry at that slot.
    pub fn insert(&self, entry: FlowEntry) -> Result<(), TtError> {
        let current = self.inner.load_full();
        let needed = entry.flow_id as usize + 1;

        let mut next = if needed > current.capacity() {
            let new_cap = entry.flow_id as usize + self.min_cap as usize;
            let mut slots = Vec::new();
            slots.try_reserve(new_cap).map_err(|_| TtError::OutOfMemory)?;
            slots.resize(new_cap, None);
            slots[..current.capacity()].copy_from_slice(&current.slots);
            FlowTableInner {
                slots,
                count: current.count,
            }
        } else {
            (*current).clone()
        };

        let slot = &mut next.slots[entry.flow_id as usize];
        if slot.is_none() {
            next.count += 1;
        }
        *slot = Some(entry);

        self.inner.store(Arc::new(next));
        Ok(())
    }

    /// Clear the slot for `flow_id`. No-op if the id is missing. May shrink
    /// the table by half when occupancy drops low enough.
    pub fn delete(&self, flow_id: u16) {
        let current = self.inner.load_full();
        if current.slots.get(flow_id as usize).copied().flatten().is_none() {
            return;
        }

        let mut next = (*current).clone();
        next.slots[flow_id as usize] = None;
        next.count -= 1;

        let min_cap = self.min_cap as usize;
        if next.capacity() >= 2 * min_cap && next.count <= next.capacity() / 3 {
            let new_cap = (next.capacity() / 2).max(min_cap);
            next.slots.truncate(new_cap);
        }

        self.inner.store(Arc::new(next));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(flow_id: u16) -> FlowEntry {
        FlowEntry {
            flow_id,
            period: 1_000,
            offset: 0,
            packet_size: 64,
            buffer_id: 0,
        }
    }

    #[test]
    fn insert_then_lookup_then_delete() {
        let table = FlowTable::new(4);
        table.insert(entry(2)).unwrap();
        assert_eq!(table.lookup(2), Some(entry(2)));
        assert_eq!(table.count(), 1);
        table.delete(2);
        assert_eq!(table.lookup(2), None);
        assert_eq!(table.count(), 0);
    }

    #[test]
    fn lookup_out_of_range_is_none() {
        let table = FlowTable::new(4);
        assert_eq!(table.lookup(999), None);
    }

    #[test]
    fn delete_missing_id_is_noop() {
        let table = FlowTable::new(4);
        table.insert(entry(0)).unwrap();
        table.delete(5);
        assert_eq!(table.count(), 1);
    }

    #[test]
    fn grows_on_out_of_range_insert() {
        let table = FlowTable::new(4);
        table.insert(entry(10)).unwrap();
        assert!(table.capacity() >= 11);
        assert!(table.capacity() >= 4);
    }

    #[test]
    fn resize_monotonicity_across_many_inserts_and_deletes() {
        let table = FlowTable::new(4);
        for id in 0..32u16 {
            table.insert(entry(id)).unwrap();
        }
        assert!(table.capacity() >= 33);

        for id in 0..32u16 {
            table.delete(id);
        }
        assert!(table.capacity() >= 4);
        assert_eq!(table.count(), 0);
    }

    #[test]
    fn replace_existing_entry_does_not_bump_count() {
        let table = FlowTable::new(4);
        table.insert(entry(1)).unwrap();
        let mut updated = entry(1);
        updated.period = 2_000;
        table.insert(updated).unwrap();
        assert_eq!(table.count(), 1);
        assert_eq!(table.lookup(1).unwrap().period, 2_000);
    }
}
