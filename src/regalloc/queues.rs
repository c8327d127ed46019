//! C2: the interval queues.
//!
//! The reference implementation's `AddInterval` walks `dest` from the back
//! looking for the last entry whose `Begin` is `<=` the new interval's, and
//! inserts right after it — stable on ties, arrival order preserved. This
//! module's [`add_sorted`] is that same scan, just over a `Vec<IntervalId>`
//! instead of an intrusive linked list (§9 "Mutable shared pointer graph
//! between queues": queues hold ids, not pointers, so this is a plain
//! `Vec::insert`).

use std::collections::HashMap;

use crate::regalloc::interval::{IntervalId, IntervalStore};

/// Insert `id` into `queue`, kept sorted by `Begin` ascending; ties are
/// broken by arrival order (§2-C2, §5 ordering guarantees).
pub fn add_sorted(queue: &mut Vec<IntervalId>, id: IntervalId, store: &IntervalStore) {
    let begin = store.get(id).begin;
    let at = queue.iter().rposition(|&q| store.get(q).begin <= begin).map_or(0, |p| p + 1);
    queue.insert(at, id);
}

/// Intervals that have already been assigned a starting queue by the
/// liveness collaborator's `prepare_interval` pre-pass (§4.1), for one
/// register file: `regular` awaiting allocation, `fixed` keyed by codegen
/// register number (remapped to regalloc index on import, §4.1 step 3).
#[derive(Debug, Default)]
pub struct PendingIntervals {
    pub regular: Vec<IntervalId>,
    pub fixed: HashMap<u16, IntervalId>,
}

/// Live allocator-side state for one register file while
/// `assign_locations` runs (§3 "Interval queues").
#[derive(Debug, Default)]
pub struct WorkingIntervals {
    pub active: Vec<IntervalId>,
    pub inactive: Vec<IntervalId>,
    pub stack: Vec<IntervalId>,
    pub handled: Vec<IntervalId>,
    /// Indexed by regalloc index; at most one fixed interval per index.
    pub fixed: Vec<Option<IntervalId>>,
}

impl WorkingIntervals {
    pub fn clear(&mut self, fixed_len: usize) {
        self.active.clear();
        self.inactive.clear();
        self.stack.clear();
        self.handled.clear();
        self.fixed.clear();
        self.fixed.resize(fixed_len, None);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::regalloc::interval::{LifeInterval, LifeNumber, Location, Range, UsePosition};

    fn at(store: &mut IntervalStore, begin: u32, end: u32) -> IntervalId {
        store.push(LifeInterval {
            id: IntervalId(0),
            begin: LifeNumber(begin),
            end: LifeNumber(end),
            ranges: vec![Range::new(begin, end)],
            use_positions: vec![UsePosition::new(begin)],
            location: Location::Unassigned,
            physical: false,
            preassigned: false,
            split_sibling: false,
            inst: None,
            temp_owner: None,
            wide: false,
        })
    }

    #[test]
    fn add_sorted_keeps_ascending_begin_order() {
        let mut store = IntervalStore::new();
        let a = at(&mut store, 10, 20);
        let b = at(&mut store, 0, 5);
        let c = at(&mut store, 5, 8);

        let mut queue = Vec::new();
        add_sorted(&mut queue, a, &store);
        add_sorted(&mut queue, b, &store);
        add_sorted(&mut queue, c, &store);

        let begins: Vec<u32> = queue.iter().map(|&id| store.get(id).begin.0).collect();
        assert_eq!(begins, vec![0, 5, 10]);
    }

    #[test]
    fn add_sorted_breaks_ties_by_arrival_order() {
        let mut store = IntervalStore::new();
        let first = at(&mut store, 5, 10);
        let second = at(&mut store, 5, 20);

        let mut queue = Vec::new();
        add_sorted(&mut queue, first, &store);
        add_sorted(&mut queue, second, &store);

        assert_eq!(queue, vec![first, second]);
    }

    #[test]
    fn clear_resets_every_queue_and_resizes_fixed() {
        let mut working = WorkingIntervals::default();
        working.active.push(IntervalId(0));
        working.fixed = vec![Some(IntervalId(0))];

        working.clear(3);

        assert!(working.active.is_empty());
        assert_eq!(working.fixed, vec![None, None, None]);
    }
}
