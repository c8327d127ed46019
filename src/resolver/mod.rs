//! Resolver stub (§4.11, ambient collaborator).
//!
//! Given every interval's final [`Location`], a real resolver would insert
//! move or spill instructions at split boundaries and block edges. This
//! module ships only the data-collection half — a [`ResolutionPlan`]
//! recording the source and destination `Location` at each split point —
//! as a demonstration of the contract the allocator core exposes. Lowering
//! this into real machine instructions is out of scope (non-goal (b)).

use std::collections::HashMap;

use crate::ir::InstId;
use crate::regalloc::interval::{IntervalStore, LifeNumber, Location};

/// One point where a move instruction would need to be inserted: the value
/// produced by `inst` moves from `from` to `to` at `at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolutionMove {
    pub inst: InstId,
    pub at: LifeNumber,
    pub from: Location,
    pub to: Location,
}

/// The data-collection half of resolution: every location change across a
/// split chain, in program order.
#[derive(Debug, Default)]
pub struct ResolutionPlan {
    pub moves: Vec<ResolutionMove>,
}

/// Walks every interval in `store` with a source instruction, groups split
/// siblings by that instruction, and records a move wherever consecutive
/// pieces of the chain disagree on `Location`.
pub fn build(store: &IntervalStore) -> ResolutionPlan {
    let mut by_inst: HashMap<InstId, Vec<_>> = HashMap::new();
    for id in store.ids() {
        let interval = store.get(id);
        if let Some(inst) = interval.inst {
            by_inst.entry(inst).or_insert_with(Vec::new).push(id);
        }
    }

    let mut plan = ResolutionPlan::default();
    for (inst, mut chain) in by_inst {
        chain.sort_by_key(|&id| store.get(id).begin);
        for pair in chain.windows(2) {
            let prev = store.get(pair[0]);
            let next = store.get(pair[1]);
            if prev.location != next.location {
                plan.moves.push(ResolutionMove { inst, at: next.begin, from: prev.location, to: next.location });
            }
        }
    }
    plan.moves.sort_by_key(|m| m.at);
    plan
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ir::InstId;
    use crate::regalloc::interval::{IntervalId, LifeInterval, Range};

    fn interval(inst: InstId, begin: u32, end: u32, loc: Location, split_sibling: bool) -> LifeInterval {
        LifeInterval {
            id: IntervalId(0),
            begin: LifeNumber(begin),
            end: LifeNumber(end),
            ranges: vec![Range::new(begin, end)],
            use_positions: Vec::new(),
            location: loc,
            physical: false,
            preassigned: false,
            split_sibling,
            inst: Some(inst),
            temp_owner: None,
            wide: false,
        }
    }

    #[test]
    fn records_a_move_across_a_split_chain() {
        let mut store = IntervalStore::new();
        let inst = InstId(3);
        store.push(interval(inst, 0, 10, Location::Register(1), false));
        store.push(interval(inst, 10, 20, Location::StackSlot(0), true));

        let plan = build(&store);
        assert_eq!(plan.moves.len(), 1);
        assert_eq!(plan.moves[0].from, Location::Register(1));
        assert_eq!(plan.moves[0].to, Location::StackSlot(0));
        assert_eq!(plan.moves[0].at, LifeNumber(10));
    }

    #[test]
    fn no_move_when_chain_keeps_the_same_location() {
        let mut store = IntervalStore::new();
        let inst = InstId(4);
        store.push(interval(inst, 0, 10, Location::Register(2), false));
        store.push(interval(inst, 10, 20, Location::Register(2), true));

        let plan = build(&store);
        assert!(plan.moves.is_empty());
    }
}
