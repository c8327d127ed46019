//! The liveness collaborator (§4.10, ambient stack).
//!
//! Computes, for one [`Function`], the [`LifeInterval`]s and use positions
//! the allocator core consumes — nothing more. Grounded in the classic
//! "live = union of successor live-ins, walk instructions in reverse"
//! shape (compare `back::regalloc::lifetime_intervals::build_intervals` in
//! this lineage's earlier sketch), generalized from per-block virtual
//! registers to whole-function SSA values with a single contiguous range
//! per value (splitting into non-contiguous ranges is the allocator's job,
//! not this one's — see `IntervalStore::split_at`).
//!
//! Non-goal (spec §1(a)): no dataflow fixpoint. Blocks are walked in
//! reverse of the order the function lists them in (assumed
//! reverse-postorder, i.e. a forward topological order), so forward edges
//! see an already-computed successor live-in, while back edges (loop
//! headers not yet visited) contribute nothing — a value live around a
//! back-edge gets one conservative range rather than an
//! iteratively-tightened one.

use std::collections::{HashMap, HashSet};

use crate::ir::{BlockId, Function, InstId, ParameterLocation};
use crate::machine::Target;
use crate::regalloc::interval::{IntervalId, IntervalStore, LifeInterval, LifeNumber, Location, Range, UsePosition};

/// Program-point numbering: each block gets an even boundary number, each
/// instruction an odd mid-point two apart from its neighbours (§3).
struct Numbering {
    inst_pos: HashMap<InstId, LifeNumber>,
    block_start: HashMap<BlockId, LifeNumber>,
}

impl Numbering {
    fn build(function: &Function) -> Numbering {
        let mut inst_pos = HashMap::new();
        let mut block_start = HashMap::new();
        let mut pos = 0u32;

        for block in &function.blocks {
            block_start.insert(block.id, LifeNumber(pos));
            for &inst in &block.insts {
                pos += 1;
                inst_pos.insert(inst, LifeNumber(pos));
                pos += 1;
            }
        }

        Numbering { inst_pos, block_start }
    }

    fn of(&self, inst: InstId) -> LifeNumber {
        self.inst_pos[&inst]
    }
}

/// Per-value (by defining instruction) fixed-location uses, keyed by the
/// *used* value's defining instruction — exactly the `use_table` of §6: a
/// side table independent of whatever splits the allocator later performs.
#[derive(Debug, Default)]
pub struct UseTable {
    fixed_uses: HashMap<InstId, Vec<UsePosition>>,
}

impl UseTable {
    fn record(&mut self, value: InstId, pos: LifeNumber, reg: u16) {
        let uses = self.fixed_uses.entry(value).or_insert_with(Vec::new);
        let at = uses.iter().position(|u| u.pos > pos).unwrap_or(uses.len());
        uses.insert(at, UsePosition::fixed(pos.0, reg));
    }

    /// Smallest fixed-location use of `value` at or after `from`, if any.
    pub fn next_use_on_fixed_location(&self, value: InstId, from: LifeNumber) -> Option<u16> {
        self.fixed_uses
            .get(&value)
            .and_then(|uses| uses.iter().find(|u| u.pos >= from))
            .and_then(|u| u.fixed_reg)
    }

    /// True iff `value` has a fixed-location use exactly at `pos`.
    pub fn has_use_on_fixed_location(&self, value: InstId, pos: LifeNumber) -> bool {
        self.fixed_uses
            .get(&value)
            .map_or(false, |uses| uses.iter().any(|u| u.pos == pos))
    }
}

/// The two register files' worth of intervals produced by one analysis
/// run, already partitioned the way `prepare_interval` (§4.1) wants them:
/// `regular` holds intervals awaiting allocation, `fixed` holds physical
/// call-clobber ranges keyed by codegen register number.
#[derive(Debug, Default)]
pub struct FileIntervals {
    pub regular: Vec<IntervalId>,
    pub fixed: HashMap<u16, IntervalId>,
}

/// Everything the allocator needs from one liveness run.
pub struct LivenessResult {
    pub store: IntervalStore,
    pub use_table: UseTable,
    pub int: FileIntervals,
    pub fp: FileIntervals,
}

/// Accumulated (not yet finalized) liveness state for one value while
/// walking a function backward.
struct OpenValue {
    ranges: Vec<Range>,
    uses: Vec<UsePosition>,
}

/// Runs the backward per-block scan of §4.10 over `function` and returns
/// the intervals + use table the allocator core consumes.
pub fn analyze(function: &Function, target: &Target) -> LivenessResult {
    let numbering = Numbering::build(function);
    let mut store = IntervalStore::new();
    let mut use_table = UseTable::default();
    let mut int = FileIntervals::default();
    let mut fp = FileIntervals::default();

    let mut open: HashMap<InstId, OpenValue> = HashMap::new();
    let mut live_in: HashMap<BlockId, HashSet<InstId>> = HashMap::new();

    for block in function.blocks.iter().rev() {
        trace!("block: {:?}", block.id);

        let mut live: HashSet<InstId> = HashSet::new();
        for succ in &block.successors {
            if let Some(succ_live_in) = live_in.get(succ) {
                live.extend(succ_live_in.iter().copied());
            }
        }
        trace!("live-out: {:?}", live);

        let block_start = numbering.block_start[&block.id];

        // Values merely passing live through this block (no instruction
        // here references them) still need their range to reach back to
        // this block's start — positions are global, so widening `begin`
        // is enough to cover the whole block implicitly.
        for &value in &live {
            if let Some(entry) = open.get_mut(&value) {
                if let Some(first) = entry.ranges.first_mut() {
                    if first.begin > block_start {
                        first.begin = block_start;
                    }
                }
            }
        }

        for &inst_id in block.insts.iter().rev() {
            let inst = function.inst(inst_id);
            let pos = numbering.of(inst_id);
            trace!("instruction: {:?} at {}", inst_id, pos.0);

            // Operands: record fixed-location uses against the *used*
            // value, extend its open range back to this block's start.
            for operand in &inst.inputs {
                if let Some(reg) = operand.fixed_reg {
                    use_table.record(operand.value, pos, reg);
                }
                live.insert(operand.value);
                let entry = open.entry(operand.value).or_insert_with(|| OpenValue {
                    ranges: vec![Range { begin: block_start, end: pos.plus_gap() }],
                    uses: Vec::new(),
                });
                entry.uses.push(UsePosition { pos, fixed_reg: operand.fixed_reg });
                if let Some(first) = entry.ranges.first_mut() {
                    if first.begin > block_start {
                        first.begin = block_start;
                    }
                    if first.end < pos.plus_gap() {
                        first.end = pos.plus_gap();
                    }
                }
            }

            // Own destination: close out the value's interval here.
            if !inst.no_dest() && inst.dst_count == 1 {
                live.remove(&inst_id);

                let mut value = open.remove(&inst_id).unwrap_or_else(|| OpenValue {
                    ranges: vec![Range { begin: pos, end: pos.plus_gap() }],
                    uses: Vec::new(),
                });
                if let Some(first) = value.ranges.first_mut() {
                    first.begin = pos;
                }
                value.uses.push(UsePosition { pos, fixed_reg: inst.dst_fixed_reg });
                value.uses.sort_by_key(|u| u.pos);
                value.uses.dedup_by_key(|u| u.pos);

                // §4.1 rules 3 & 4: a destination pinned to the accumulator
                // pseudo-register or to the architectural zero-register
                // needs no location of its own — drop it rather than
                // enqueue it in `regular`.
                let regs_for_dest = if inst.is_fp { &target.fp_regs } else { &target.int_regs };
                let targets_accumulator = match regs_for_dest.accumulator_reg {
                    Some(acc) => inst.dst_fixed_reg == Some(acc),
                    None => false,
                };
                let targets_zero_reg = match regs_for_dest.zero_reg {
                    Some(z) => inst.dst_fixed_reg == Some(z),
                    None => false,
                };

                if targets_accumulator || targets_zero_reg {
                    trace!("dropping {:?}: no location needed (accumulator/zero-register destination)", inst_id);
                } else {
                    let begin = value.ranges.first().unwrap().begin;
                    let end = value.ranges.last().unwrap().end;
                    let preassigned = inst.dst_fixed_reg.is_some();
                    let location = match inst.parameter {
                        Some(ParameterLocation::StackParameter(slot)) => Location::StackParameter(slot),
                        Some(ParameterLocation::Register(reg)) => Location::Register(reg),
                        None => match inst.dst_fixed_reg {
                            Some(reg) => Location::Register(reg),
                            None => Location::Unassigned,
                        },
                    };
                    let id = store.push(LifeInterval {
                        id: IntervalId(0),
                        begin,
                        end,
                        ranges: value.ranges,
                        use_positions: value.uses,
                        location,
                        physical: false,
                        preassigned: preassigned || matches!(inst.parameter, Some(ParameterLocation::Register(_))),
                        split_sibling: false,
                        inst: Some(inst_id),
                        temp_owner: None,
                        wide: inst.is_wide,
                    });
                    let file = if inst.is_fp { &mut fp } else { &mut int };
                    file.regular.push(id);
                }
            }

            // Unconstrained scratch register this instruction needs.
            if inst.needs_temp {
                let id = store.push(LifeInterval {
                    id: IntervalId(0),
                    begin: pos,
                    end: pos.plus_gap(),
                    ranges: vec![Range { begin: pos, end: pos.plus_gap() }],
                    use_positions: Vec::new(),
                    location: Location::Unassigned,
                    physical: false,
                    preassigned: false,
                    split_sibling: false,
                    inst: None,
                    temp_owner: Some(inst_id),
                    wide: false,
                });
                let file = if inst.is_fp { &mut fp } else { &mut int };
                file.regular.push(id);
            }
        }

        if !live.is_empty() {
            live_in.insert(block.id, live);
        }
    }

    build_call_clobbers(function, target, &numbering, &mut store, &mut int, &mut fp);

    LivenessResult { store, use_table, int, fp }
}

/// Builds one `fixed` interval per call-clobbered register, its ranges one
/// per call site in the function (§3: "an interval may be non-contiguous").
fn build_call_clobbers(
    function: &Function,
    target: &Target,
    numbering: &Numbering,
    store: &mut IntervalStore,
    int: &mut FileIntervals,
    fp: &mut FileIntervals,
) {
    let mut int_ranges: HashMap<u16, Vec<Range>> = HashMap::new();
    let mut fp_ranges: HashMap<u16, Vec<Range>> = HashMap::new();

    for block in &function.blocks {
        for &inst_id in &block.insts {
            let inst = function.inst(inst_id);
            if !inst.is_call {
                continue;
            }
            let pos = numbering.of(inst_id);
            let range = Range { begin: pos, end: pos.plus_gap() };
            for reg in target.int_regs.call_clobbers.iter() {
                int_ranges.entry(reg).or_insert_with(Vec::new).push(range);
            }
            for reg in target.fp_regs.call_clobbers.iter() {
                fp_ranges.entry(reg).or_insert_with(Vec::new).push(range);
            }
        }
    }

    for (reg, ranges) in int_ranges {
        let id = push_fixed(store, reg, ranges);
        int.fixed.insert(reg, id);
    }
    for (reg, ranges) in fp_ranges {
        let id = push_fixed(store, reg, ranges);
        fp.fixed.insert(reg, id);
    }
}

fn push_fixed(store: &mut IntervalStore, reg: u16, mut ranges: Vec<Range>) -> IntervalId {
    ranges.sort_by_key(|r| r.begin);
    let begin = ranges.first().unwrap().begin;
    let end = ranges.last().unwrap().end;
    store.push(LifeInterval {
        id: IntervalId(0),
        begin,
        end,
        ranges,
        use_positions: Vec::new(),
        location: Location::Register(reg),
        physical: true,
        preassigned: false,
        split_sibling: false,
        inst: None,
        temp_owner: None,
        wide: false,
    })
}


/// Fixed-location registers required by a temp-helper's owning instruction
/// (§4.4's `enumerate_fixed_locations_overlapping_temp`): the scratch
/// register must avoid all of these.
pub fn fixed_locations_overlapping_temp(function: &Function, interval: &LifeInterval) -> Vec<u16> {
    let owner = match interval.temp_owner {
        Some(owner) => owner,
        None => return Vec::new(),
    };
    let inst = function.inst(owner);
    let mut regs = Vec::new();
    if let Some(reg) = inst.dst_fixed_reg {
        regs.push(reg);
    }
    for operand in &inst.inputs {
        if let Some(reg) = operand.fixed_reg {
            if !regs.contains(&reg) {
                regs.push(reg);
            }
        }
    }
    regs
}
