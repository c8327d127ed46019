//! The data model of §3: life numbers, ranges, use positions, locations and
//! the life interval itself, held in a small arena so splitting an interval
//! is a pure "append a new id" operation instead of a pointer-aliasing
//! hazard (see the crate's `SPEC_FULL.md`, §9 "Mutable shared pointer graph
//! between queues").

use crate::ir::InstId;
use std::cmp;

/// A position in the linearized instruction stream. Even values are block
/// boundaries, odd values are instruction mid-points; consecutive
/// instruction slots are two apart ([`LIFE_NUMBER_GAP`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LifeNumber(pub u32);

/// The gap between consecutive instruction slots.
pub const LIFE_NUMBER_GAP: u32 = 2;

impl LifeNumber {
    /// Sentinel meaning "no such position" — returned by queries that find
    /// nothing (no use, no intersection, ...).
    pub const INVALID: LifeNumber = LifeNumber(u32::MAX);
    /// Sentinel meaning "past the end of everything" — used as the initial
    /// fold value when computing the furthest blocking use in §4.4.
    pub const MAX: LifeNumber = LifeNumber(u32::MAX - 1);

    pub fn is_valid(self) -> bool {
        self != LifeNumber::INVALID
    }

    pub fn plus_gap(self) -> LifeNumber {
        LifeNumber(self.0 + LIFE_NUMBER_GAP)
    }
}

impl std::ops::Add<u32> for LifeNumber {
    type Output = LifeNumber;
    fn add(self, rhs: u32) -> LifeNumber {
        LifeNumber(self.0 + rhs)
    }
}

impl std::ops::Sub<u32> for LifeNumber {
    type Output = LifeNumber;
    fn sub(self, rhs: u32) -> LifeNumber {
        LifeNumber(self.0 - rhs)
    }
}

/// A half-open `[begin, end)` span of liveness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    pub begin: LifeNumber,
    pub end: LifeNumber,
}

impl Range {
    pub fn new(begin: u32, end: u32) -> Range {
        Range { begin: LifeNumber(begin), end: LifeNumber(end) }
    }

    pub fn contains(&self, pos: LifeNumber) -> bool {
        self.begin <= pos && pos < self.end
    }
}

/// One position where a value is read or defined; `fixed_reg` is set when
/// the liveness collaborator attached a physical-register requirement to
/// this particular use (e.g. a call argument register).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsePosition {
    pub pos: LifeNumber,
    pub fixed_reg: Option<u16>,
}

impl UsePosition {
    pub fn new(pos: u32) -> UsePosition {
        UsePosition { pos: LifeNumber(pos), fixed_reg: None }
    }

    pub fn fixed(pos: u32, reg: u16) -> UsePosition {
        UsePosition { pos: LifeNumber(pos), fixed_reg: Some(reg) }
    }
}

/// Where a value currently lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    Unassigned,
    /// Holds a regalloc-index register while mid-allocation, and a codegen
    /// register number once `RemapRegistersIntervals` has run.
    Register(u16),
    StackSlot(u32),
    ConstantSlot(u32),
    /// Entry-only, immutable: where a parameter was placed on function
    /// entry, before the allocator has had a chance to move it anywhere.
    StackParameter(u32),
}

impl Location {
    pub fn is_stack(&self) -> bool {
        matches!(self, Location::StackSlot(_))
    }

    pub fn is_stack_parameter(&self) -> bool {
        matches!(self, Location::StackParameter(_))
    }

    pub fn reg(&self) -> Option<u16> {
        if let Location::Register(r) = self { Some(*r) } else { None }
    }
}

/// Dense identity of one [`LifeInterval`] in an [`IntervalStore`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IntervalId(pub u32);

/// The live range of one virtual value, or one split thereof (§3).
#[derive(Debug, Clone)]
pub struct LifeInterval {
    pub id: IntervalId,
    pub begin: LifeNumber,
    pub end: LifeNumber,
    /// Sorted, non-overlapping, ascending.
    pub ranges: Vec<Range>,
    /// Sorted ascending.
    pub use_positions: Vec<UsePosition>,
    pub location: Location,
    pub physical: bool,
    pub preassigned: bool,
    pub split_sibling: bool,
    /// `None` for synthetic temp-register helpers; see §3 "has-inst".
    pub inst: Option<InstId>,
    /// For a temp-register helper (`inst.is_none()`): the instruction whose
    /// fixed-location requirements this temp must not collide with.
    pub temp_owner: Option<InstId>,
    /// Mirrors the owning instruction's `is_wide` (§3/§6 slot-stride rule);
    /// `false` for temp helpers and fixed/physical intervals, which never
    /// reach the stack.
    pub wide: bool,
}

impl LifeInterval {
    pub fn has_reg(&self) -> bool {
        self.location.reg().is_some()
    }

    pub fn has_inst(&self) -> bool {
        self.inst.is_some()
    }

    pub fn is_pseudo_helper(&self) -> bool {
        self.inst.is_none()
    }

    pub fn set_reg(&mut self, reg: u16) {
        self.location = Location::Register(reg);
    }

    pub fn clear_location(&mut self) {
        self.location = Location::Unassigned;
    }

    /// True if some range covers `pos` (the interval is not in a hole
    /// there). Named `split_cover` after the interface of §6 — it is also
    /// used, unsplit, by expiration (§4.2) to decide active vs. inactive.
    pub fn split_cover(&self, pos: LifeNumber) -> bool {
        self.find_range_covering(pos).is_some()
    }

    pub fn find_range_covering(&self, pos: LifeNumber) -> Option<Range> {
        self.ranges.iter().copied().find(|r| r.contains(pos))
    }

    /// Largest use position `<= pos`, or `INVALID`.
    pub fn prev_use(&self, pos: LifeNumber) -> LifeNumber {
        self.use_positions
            .iter()
            .rev()
            .map(|u| u.pos)
            .find(|&p| p <= pos)
            .unwrap_or(LifeNumber::INVALID)
    }

    /// Smallest use position `>= pos`, or `INVALID`.
    pub fn next_use_from(&self, pos: LifeNumber) -> LifeNumber {
        self.use_positions
            .iter()
            .map(|u| u.pos)
            .find(|&p| p >= pos)
            .unwrap_or(LifeNumber::INVALID)
    }

    /// Largest use position strictly `< pos`, or `INVALID`.
    pub fn last_use_before(&self, pos: LifeNumber) -> LifeNumber {
        self.use_positions
            .iter()
            .rev()
            .map(|u| u.pos)
            .find(|&p| p < pos)
            .unwrap_or(LifeNumber::INVALID)
    }

    /// Insert a use position at `pos` if none already sits there; keeps
    /// `use_positions` sorted. Used only by the constant-rematerialization
    /// guard (§4.7) to force a use at `Begin`.
    pub fn prepend_use_position(&mut self, pos: LifeNumber) {
        if self.use_positions.iter().any(|u| u.pos == pos) {
            return;
        }
        let at = self.use_positions.iter().position(|u| u.pos > pos).unwrap_or(self.use_positions.len());
        self.use_positions.insert(at, UsePosition { pos, fixed_reg: None });
    }

    /// Smallest position `>= from` at which `self` and `other` both have a
    /// live range, or `INVALID`.
    pub fn first_intersection_with(&self, other: &LifeInterval, from: LifeNumber) -> LifeNumber {
        let (mut i, mut j) = (0usize, 0usize);
        while i < self.ranges.len() && j < other.ranges.len() {
            let a = self.ranges[i];
            let b = other.ranges[j];
            let lo = cmp::max(a.begin, b.begin);
            let hi = cmp::min(a.end, b.end);
            if lo < hi && hi > from {
                return cmp::max(lo, from);
            }
            if a.end <= b.end {
                i += 1;
            } else {
                j += 1;
            }
        }
        LifeNumber::INVALID
    }
}

/// Owns every [`LifeInterval`] created for one `allocate()` call. Queues
/// elsewhere in this module hold [`IntervalId`]s, never references, so a
/// split only ever appends — it can never invalidate an id already held by
/// some queue.
#[derive(Debug, Default)]
pub struct IntervalStore {
    intervals: Vec<LifeInterval>,
}

impl IntervalStore {
    pub fn new() -> IntervalStore {
        IntervalStore { intervals: Vec::new() }
    }

    pub fn push(&mut self, mut interval: LifeInterval) -> IntervalId {
        let id = IntervalId(self.intervals.len() as u32);
        interval.id = id;
        self.intervals.push(interval);
        id
    }

    pub fn get(&self, id: IntervalId) -> &LifeInterval {
        &self.intervals[id.0 as usize]
    }

    pub fn get_mut(&mut self, id: IntervalId) -> &mut LifeInterval {
        &mut self.intervals[id.0 as usize]
    }

    /// Every interval currently in the arena, in creation order.
    pub fn ids(&self) -> impl Iterator<Item = IntervalId> + '_ {
        (0..self.intervals.len()).map(|i| IntervalId(i as u32))
    }

    /// Split `id` into `[begin, pos)` (kept in place) and `[pos, end)` (a
    /// fresh arena entry, returned). `pos` must fall strictly inside the
    /// interval. Mirrors `LifeIntervals::SplitAt` in the reference
    /// implementation.
    pub fn split_at(&mut self, id: IntervalId, pos: LifeNumber) -> IntervalId {
        let (inst, temp_owner, wide, head_end, tail_begin, tail_end, head_ranges, tail_ranges, head_uses, tail_uses) = {
            let interval = self.get(id);
            debug_assert!(interval.begin < pos && pos < interval.end, "split position must be interior");

            let mut head_ranges = Vec::new();
            let mut tail_ranges = Vec::new();
            for &r in &interval.ranges {
                if r.end <= pos {
                    head_ranges.push(r);
                } else if r.begin >= pos {
                    tail_ranges.push(r);
                } else {
                    head_ranges.push(Range { begin: r.begin, end: pos });
                    tail_ranges.push(Range { begin: pos, end: r.end });
                }
            }

            let mut head_uses = Vec::new();
            let mut tail_uses = Vec::new();
            for &u in &interval.use_positions {
                if u.pos < pos {
                    head_uses.push(u);
                } else {
                    tail_uses.push(u);
                }
            }

            let head_end = head_ranges.last().map(|r| r.end).unwrap_or(interval.begin);
            let tail_begin = tail_ranges.first().map(|r| r.begin).unwrap_or(pos);
            let tail_end = interval.end;

            (
                interval.inst,
                interval.temp_owner,
                interval.wide,
                head_end,
                tail_begin,
                tail_end,
                head_ranges,
                tail_ranges,
                head_uses,
                tail_uses,
            )
        };

        {
            let head = self.get_mut(id);
            head.ranges = head_ranges;
            head.use_positions = head_uses;
            head.end = head_end;
        }

        self.push(LifeInterval {
            id: IntervalId(0), // overwritten by push()
            begin: tail_begin,
            end: tail_end,
            ranges: tail_ranges,
            use_positions: tail_uses,
            location: Location::Unassigned,
            physical: false,
            preassigned: false,
            split_sibling: true,
            inst,
            temp_owner,
            wide,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    fn simple(begin: u32, end: u32) -> LifeInterval {
        LifeInterval {
            id: IntervalId(0),
            begin: LifeNumber(begin),
            end: LifeNumber(end),
            ranges: vec![Range::new(begin, end)],
            use_positions: vec![UsePosition::new(begin), UsePosition::new(end - 1)],
            location: Location::Unassigned,
            physical: false,
            preassigned: false,
            split_sibling: false,
            inst: None,
            temp_owner: None,
            wide: false,
        }
    }

    #[test]
    fn range_contains_is_half_open() {
        let r = Range::new(4, 8);
        assert!(!r.contains(LifeNumber(3)));
        assert!(r.contains(LifeNumber(4)));
        assert!(r.contains(LifeNumber(7)));
        assert!(!r.contains(LifeNumber(8)));
    }

    #[test]
    fn use_position_queries() {
        let mut interval = simple(0, 10);
        interval.use_positions = vec![UsePosition::new(2), UsePosition::new(5), UsePosition::new(8)];

        assert_eq!(interval.prev_use(LifeNumber(5)), LifeNumber(5));
        assert_eq!(interval.prev_use(LifeNumber(6)), LifeNumber(5));
        assert_eq!(interval.prev_use(LifeNumber(1)), LifeNumber::INVALID);

        assert_eq!(interval.next_use_from(LifeNumber(5)), LifeNumber(5));
        assert_eq!(interval.next_use_from(LifeNumber(6)), LifeNumber(8));
        assert_eq!(interval.next_use_from(LifeNumber(9)), LifeNumber::INVALID);

        assert_eq!(interval.last_use_before(LifeNumber(5)), LifeNumber(2));
        assert_eq!(interval.last_use_before(LifeNumber(2)), LifeNumber::INVALID);
    }

    #[test]
    fn prepend_use_position_keeps_sorted_and_dedups() {
        let mut interval = simple(0, 10);
        interval.use_positions = vec![UsePosition::new(4)];
        interval.prepend_use_position(LifeNumber(0));
        interval.prepend_use_position(LifeNumber(4));
        assert_eq!(interval.use_positions.iter().map(|u| u.pos).collect::<Vec<_>>(), vec![LifeNumber(0), LifeNumber(4)]);
    }

    #[test]
    fn first_intersection_with_finds_overlap_from_a_point() {
        let a = simple(0, 10);
        let mut b = simple(5, 15);
        b.ranges = vec![Range::new(5, 15)];

        assert_eq!(a.first_intersection_with(&b, LifeNumber(0)), LifeNumber(5));
        assert_eq!(a.first_intersection_with(&b, LifeNumber(7)), LifeNumber(7));
        assert_eq!(a.first_intersection_with(&b, LifeNumber(10)), LifeNumber::INVALID);
    }

    #[test]
    fn first_intersection_with_disjoint_ranges_is_invalid() {
        let a = simple(0, 5);
        let b = simple(5, 10);
        assert_eq!(a.first_intersection_with(&b, LifeNumber(0)), LifeNumber::INVALID);
    }

    #[test]
    fn split_at_divides_ranges_and_uses() {
        let mut store = IntervalStore::new();
        let id = store.push(LifeInterval {
            id: IntervalId(0),
            begin: LifeNumber(0),
            end: LifeNumber(20),
            ranges: vec![Range::new(0, 20)],
            use_positions: vec![UsePosition::new(0), UsePosition::new(8), UsePosition::new(16)],
            location: Location::Register(3),
            physical: false,
            preassigned: false,
            split_sibling: false,
            inst: None,
            temp_owner: None,
            wide: false,
        });

        let tail = store.split_at(id, LifeNumber(10));

        let head = store.get(id);
        assert_eq!(head.end, LifeNumber(10));
        assert_eq!(head.use_positions.iter().map(|u| u.pos).collect::<Vec<_>>(), vec![LifeNumber(0), LifeNumber(8)]);
        assert!(!head.split_sibling);

        let tail = store.get(tail);
        assert_eq!(tail.begin, LifeNumber(10));
        assert_eq!(tail.end, LifeNumber(20));
        assert_eq!(tail.use_positions.iter().map(|u| u.pos).collect::<Vec<_>>(), vec![LifeNumber(16)]);
        assert!(tail.split_sibling);
        assert_eq!(tail.location, Location::Unassigned);
    }

    #[test]
    #[should_panic]
    fn split_at_rejects_boundary_positions_in_debug_builds() {
        let mut store = IntervalStore::new();
        let id = store.push(simple(0, 10));
        store.split_at(id, LifeNumber(0));
    }
}
