//! C5–C9: the allocator driver itself.
//!
//! Grounded line-by-line on `RegAllocLinearScan` (`reg_alloc_linear_scan`):
//! `assign_locations` is `AssignLocations`,
//! `walk_intervals` is `WalkIntervals`, and so on. The `template <bool
//! IS_FP>` duplication of the source collapses into a single set of methods
//! parameterized by [`File`] (§9 "Template-based file polymorphism"); the
//! erase-while-iterating traversal of `active`/`inactive` becomes a
//! carry-over/eviction pass (§9 "Iteration with in-place erasure"); the
//! intrusive linked-list queues become `Vec<IntervalId>` plus
//! [`queues::add_sorted`] (§9 "Mutable shared pointer graph between
//! queues").

use crate::ir::{Function, InstId};
use crate::liveness::{LivenessResult, UseTable};
use crate::machine::{Arch, RegisterFile, Target};
use crate::regalloc::config::AllocatorConfig;
use crate::regalloc::const_slots::ConstantSlotManager;
use crate::regalloc::error::AllocError;
use crate::regalloc::interval::{IntervalId, IntervalStore, LifeNumber, Location, LIFE_NUMBER_GAP};
use crate::regalloc::queues::{add_sorted, PendingIntervals, WorkingIntervals};
use crate::regalloc::reg_map::RegisterMap;
use crate::regalloc::stack::StackSlotManager;

/// Which of the two register files (§2 C9) a method call concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum File {
    Int,
    Fp,
}

impl File {
    fn is_fp(self) -> bool {
        matches!(self, File::Fp)
    }
}

/// Selects which working queue `split_and_spill` scans — not present as a
/// distinct type in the source (it takes the list by pointer), but the
/// borrow-checker wants a cheap tag instead of a `&mut Vec` alias.
#[derive(Debug, Clone, Copy)]
enum Queue {
    Active,
    Inactive,
}

pub struct Allocator<'f> {
    function: &'f Function,
    target: Target,
    config: AllocatorConfig,
    store: IntervalStore,
    use_table: UseTable,
    general: PendingIntervals,
    vector: PendingIntervals,
    reg_map: RegisterMap,
    working: WorkingIntervals,
    regs_use_positions: Vec<LifeNumber>,
    stack: StackSlotManager,
    consts: ConstantSlotManager,
    error: Option<AllocError>,
}

impl<'f> Allocator<'f> {
    pub fn new(function: &'f Function, target: Target, config: AllocatorConfig, liveness: LivenessResult) -> Allocator<'f> {
        let max_imm_slots = target.max_imm_slots;
        let max_stack_slots = config.max_stack_slots;
        Allocator {
            function,
            target,
            config,
            store: liveness.store,
            use_table: liveness.use_table,
            general: PendingIntervals { regular: liveness.int.regular, fixed: liveness.int.fixed },
            vector: PendingIntervals { regular: liveness.fp.regular, fixed: liveness.fp.fixed },
            reg_map: RegisterMap::new(),
            working: WorkingIntervals::default(),
            regs_use_positions: Vec::new(),
            stack: StackSlotManager::new(max_stack_slots),
            consts: ConstantSlotManager::new(max_imm_slots),
            error: None,
        }
    }

    pub fn store(&self) -> &IntervalStore {
        &self.store
    }

    pub fn into_store(self) -> IntervalStore {
        self.store
    }

    /// C9: runs the integer file to completion, then the vector file.
    pub fn allocate(&mut self) -> Result<(), AllocError> {
        self.assign_locations(File::Int);
        self.assign_locations(File::Fp);
        match self.error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn pending(&self, file: File) -> &PendingIntervals {
        match file {
            File::Int => &self.general,
            File::Fp => &self.vector,
        }
    }

    fn pending_mut(&mut self, file: File) -> &mut PendingIntervals {
        match file {
            File::Int => &mut self.general,
            File::Fp => &mut self.vector,
        }
    }

    fn reg_file(&self, file: File) -> &RegisterFile {
        self.target.regs(file.is_fp())
    }

    /// §4.1 "Allocation pass".
    fn assign_locations(&mut self, file: File) {
        if self.pending(file).regular.is_empty() {
            debug!("{:?}: nothing to allocate, skipping", file);
            return;
        }
        debug!("{:?}: {} intervals pending", file, self.pending(file).regular.len());

        let rf = self.reg_file(file).clone();
        self.reg_map.set_mask(&rf, rf.first_callee_save);

        let n = self.reg_map.available_regs_count();
        self.regs_use_positions = vec![LifeNumber::MAX; n];
        self.working.clear(n);

        self.add_fixed_intervals_to_working_intervals(file);
        self.preprocess_preassigned_intervals(file);

        while !self.pending(file).regular.is_empty() && self.error.is_none() {
            let begin = self.store.get(self.pending(file).regular[0]).begin;
            self.expire_intervals(begin);
            self.walk_intervals(file);
        }

        self.remap_registers_intervals();
    }

    /// §4.1 step 3: import physical intervals, remapping to regalloc index.
    fn add_fixed_intervals_to_working_intervals(&mut self, file: File) {
        let entries: Vec<(u16, IntervalId)> = self.pending(file).fixed.iter().map(|(&r, &id)| (r, id)).collect();
        for (codegen_reg, id) in entries {
            if let Some(idx) = self.reg_map.try_codegen_to_regalloc(codegen_reg) {
                self.store.get_mut(id).set_reg(idx);
                self.working.fixed[idx as usize] = Some(id);
            }
        }
    }

    /// §4.1 step 4.
    fn preprocess_preassigned_intervals(&mut self, file: File) {
        let ids: Vec<IntervalId> = self.pending(file).regular.clone();
        let acc = self.reg_file(file).accumulator_reg;
        for id in ids {
            let interval = self.store.get(id);
            if !interval.preassigned || interval.split_sibling {
                continue;
            }
            let reg = match interval.location.reg() {
                Some(r) => r,
                None => continue,
            };
            if Some(reg) == acc {
                continue;
            }
            let idx = self.reg_map.codegen_to_regalloc_reg(reg);
            self.store.get_mut(id).set_reg(idx);
        }
    }

    /// §4.2: expire `active`/`inactive`/`stack` at `current`.
    fn expire_intervals(&mut self, current: LifeNumber) {
        let active = std::mem::take(&mut self.working.active);
        let mut kept = Vec::with_capacity(active.len());
        for id in active {
            let interval = self.store.get(id);
            if !interval.has_reg() || interval.end <= current {
                self.working.handled.push(id);
            } else if !interval.split_cover(current) {
                add_sorted(&mut self.working.inactive, id, &self.store);
            } else {
                kept.push(id);
            }
        }
        self.working.active = kept;

        let inactive = std::mem::take(&mut self.working.inactive);
        let mut kept = Vec::with_capacity(inactive.len());
        for id in inactive {
            let interval = self.store.get(id);
            if !interval.has_reg() || interval.end <= current {
                self.working.handled.push(id);
            } else if interval.split_cover(current) {
                add_sorted(&mut self.working.active, id, &self.store);
            } else {
                kept.push(id);
            }
        }
        self.working.inactive = kept;

        let stack = std::mem::take(&mut self.working.stack);
        let mut kept = Vec::with_capacity(stack.len());
        for id in stack {
            let interval = self.store.get(id);
            if interval.end <= current {
                if let Location::StackSlot(slot) = interval.location {
                    if self.needs_slot_pair(id) {
                        self.stack.release_pair(slot);
                    } else {
                        self.stack.release(slot);
                    }
                }
            } else {
                kept.push(id);
            }
        }
        self.working.stack = kept;
    }

    /// §4.3: process one interval drawn from the front of `regular`.
    fn walk_intervals(&mut self, file: File) {
        let current_id = self.pending_mut(file).regular.remove(0);
        trace!(
            "walk: interval {:?} [{}, {})",
            current_id,
            self.store.get(current_id).begin.0,
            self.store.get(current_id).end.0
        );

        if self.store.get(current_id).location.is_stack_parameter() {
            let begin = self.store.get(current_id).begin;
            let next_use = self.store.get(current_id).next_use_from(begin + 1);
            self.split_before_use(file, current_id, next_use);
            return;
        }

        if !self.store.get(current_id).has_reg() {
            if self.try_to_assign_register(file, current_id) {
                // assigned
            } else {
                debug!("walk: no register available for {:?}", current_id);
                self.error = Some(AllocError::NoRegisterAvailable);
                return;
            }
        } else {
            let reg = self.store.get(current_id).location.reg().unwrap();
            if !self.is_reg_free(current_id, reg) {
                self.split_and_spill(file, Queue::Active, current_id);
                self.split_and_spill(file, Queue::Inactive, current_id);
            }
        }

        self.handle_fixed_interval_intersection(file, current_id);
        add_sorted(&mut self.working.active, current_id, &self.store);
    }

    /// §4.4 `try_to_assign_register`.
    fn try_to_assign_register(&mut self, file: File, id: IntervalId) -> bool {
        if let Some(reg) = self.get_suitable_register(file, id) {
            self.store.get_mut(id).set_reg(reg);
            return true;
        }

        let (blocked_reg, next_blocked_use) = self.get_blocked_register(id);
        let begin = self.store.get(id).begin;
        let next_use = self.store.get(id).next_use_from(begin);

        if blocked_reg.is_some() && next_blocked_use < next_use && !self.is_non_spillable_const_interval(id) {
            self.split_before_use(file, id, next_use);
            self.assign_stack_slot(id);
            return true;
        }

        match blocked_reg {
            None => false,
            Some(_) if next_blocked_use < begin + LIFE_NUMBER_GAP => false,
            Some(reg) => {
                self.store.get_mut(id).set_reg(reg);
                self.split_and_spill(file, Queue::Active, id);
                self.split_and_spill(file, Queue::Inactive, id);
                true
            }
        }
    }

    /// §4.4 `get_suitable_register`: hint first, then a free register.
    fn get_suitable_register(&mut self, file: File, id: IntervalId) -> Option<u16> {
        let interval = self.store.get(id);
        if !interval.has_inst() {
            return self.get_free_register(id);
        }
        let inst_id = interval.inst.unwrap();
        let begin = interval.begin;
        if let Some(hint_reg) = self.use_table.next_use_on_fixed_location(inst_id, begin) {
            if let Some(idx) = self.reg_map.try_codegen_to_regalloc(hint_reg) {
                if self.reg_map.is_reg_available(idx, self.config.arch) && self.is_reg_free(id, idx) {
                    return Some(idx);
                }
            }
        }
        self.get_free_register(id)
    }

    /// §4.4 `get_free_register`.
    fn get_free_register(&mut self, id: IntervalId) -> Option<u16> {
        let n = self.reg_map.available_regs_count();
        self.regs_use_positions.clear();
        self.regs_use_positions.resize(n, LifeNumber::MAX);

        let current_begin = self.store.get(id).begin;
        let current_end = self.store.get(id).end;

        let fixed_ids = self.working.fixed.clone();
        for (reg_idx, maybe_fixed) in fixed_ids.iter().enumerate() {
            let fixed_id = match maybe_fixed {
                Some(f) => *f,
                None => continue,
            };
            let intersection = {
                let fixed = self.store.get(fixed_id);
                let current = self.store.get(id);
                fixed.first_intersection_with(current, LifeNumber(0))
            };
            if !intersection.is_valid() {
                continue;
            }
            if intersection == current_begin {
                let fixed = self.store.get(fixed_id);
                if let Some(range) = fixed.find_range_covering(intersection) {
                    if range.begin == intersection {
                        continue;
                    }
                }
            }
            self.regs_use_positions[reg_idx] = intersection;
        }

        let inactive_ids = self.working.inactive.clone();
        for iid in inactive_ids {
            let reg = match self.store.get(iid).location.reg() {
                Some(r) => r,
                None => continue,
            };
            let intersection = {
                let interval = self.store.get(iid);
                let current = self.store.get(id);
                interval.first_intersection_with(current, LifeNumber(0))
            };
            if !intersection.is_valid() {
                continue;
            }
            if (reg as usize) < self.regs_use_positions.len() {
                let slot = &mut self.regs_use_positions[reg as usize];
                if intersection < *slot {
                    *slot = intersection;
                }
            }
        }

        let active_ids = self.working.active.clone();
        for aid in active_ids {
            if let Some(reg) = self.store.get(aid).location.reg() {
                if (reg as usize) < self.regs_use_positions.len() {
                    self.regs_use_positions[reg as usize] = LifeNumber(0);
                }
            }
        }

        self.block_overlapped_registers(id);

        let (best_idx, best_pos) = self.pick_max_first();
        if best_pos >= current_end {
            Some(best_idx as u16)
        } else {
            None
        }
    }

    /// §4.4 `get_blocked_register`: mirrors `get_free_register` but uses
    /// "next use from" instead of raw intersection for inactive/active.
    fn get_blocked_register(&mut self, id: IntervalId) -> (Option<u16>, LifeNumber) {
        if self.config.bytecode_mode {
            return (None, LifeNumber::INVALID);
        }

        let n = self.reg_map.available_regs_count();
        self.regs_use_positions.clear();
        self.regs_use_positions.resize(n, LifeNumber::MAX);

        let current_begin = self.store.get(id).begin;

        let fixed_ids = self.working.fixed.clone();
        for (reg_idx, maybe_fixed) in fixed_ids.iter().enumerate() {
            let fixed_id = match maybe_fixed {
                Some(f) => *f,
                None => continue,
            };
            let intersection = {
                let fixed = self.store.get(fixed_id);
                let current = self.store.get(id);
                fixed.first_intersection_with(current, LifeNumber(0))
            };
            if !intersection.is_valid() {
                continue;
            }
            if intersection == current_begin {
                let fixed = self.store.get(fixed_id);
                if let Some(range) = fixed.find_range_covering(intersection) {
                    if range.begin == intersection {
                        continue;
                    }
                }
            }
            self.regs_use_positions[reg_idx] = intersection;
        }

        let inactive_ids = self.working.inactive.clone();
        for iid in inactive_ids {
            let reg = match self.store.get(iid).location.reg() {
                Some(r) => r,
                None => continue,
            };
            let intersection = {
                let interval = self.store.get(iid);
                let current = self.store.get(id);
                interval.first_intersection_with(current, LifeNumber(0))
            };
            if !intersection.is_valid() {
                continue;
            }
            let next = self.store.get(iid).next_use_from(intersection);
            if (reg as usize) < self.regs_use_positions.len() {
                let slot = &mut self.regs_use_positions[reg as usize];
                if next < *slot {
                    *slot = next;
                }
            }
        }

        let active_ids = self.working.active.clone();
        for aid in active_ids {
            let reg = match self.store.get(aid).location.reg() {
                Some(r) => r,
                None => continue,
            };
            let next = self.store.get(aid).next_use_from(current_begin);
            if (reg as usize) < self.regs_use_positions.len() {
                let slot = &mut self.regs_use_positions[reg as usize];
                if next < *slot {
                    *slot = next;
                }
            }
        }

        self.block_overlapped_registers(id);
        self.block_adjacent_pseudo_user(id);

        let (best_idx, best_pos) = self.pick_max_first();
        (Some(best_idx as u16), best_pos)
    }

    /// First index achieving the maximum in `regs_use_positions`, matching
    /// `std::max_element`'s "first maximum wins" tie-break (§4.1 step 2
    /// relies on this to prefer the priority/callee-save anchor at index 0).
    fn pick_max_first(&self) -> (usize, LifeNumber) {
        let mut best_idx = 0;
        let mut best_pos = self.regs_use_positions[0];
        for (i, &p) in self.regs_use_positions.iter().enumerate().skip(1) {
            if p > best_pos {
                best_pos = p;
                best_idx = i;
            }
        }
        (best_idx, best_pos)
    }

    /// §4.4 `is_reg_free`.
    fn is_reg_free(&self, id: IntervalId, reg_idx: u16) -> bool {
        let current = self.store.get(id);

        for fid in self.working.fixed.iter().filter_map(|o| *o) {
            let fixed = self.store.get(fid);
            if fixed.location.reg() != Some(reg_idx) {
                continue;
            }
            let intersection = fixed.first_intersection_with(current, LifeNumber(0));
            if intersection.is_valid() && intersection < current.begin + LIFE_NUMBER_GAP {
                return false;
            }
        }

        for &iid in &self.working.inactive {
            let interval = self.store.get(iid);
            if interval.location.reg() == Some(reg_idx)
                && interval.first_intersection_with(current, LifeNumber(0)).is_valid()
            {
                return false;
            }
        }

        for &aid in &self.working.active {
            if self.store.get(aid).location.reg() == Some(reg_idx) {
                return false;
            }
        }

        true
    }

    /// §4.5 `split_and_spill`.
    fn split_and_spill(&mut self, file: File, queue: Queue, current_id: IntervalId) {
        let ids: Vec<IntervalId> = match queue {
            Queue::Active => self.working.active.clone(),
            Queue::Inactive => self.working.inactive.clone(),
        };
        let current_reg = self.store.get(current_id).location.reg();
        let current_begin = self.store.get(current_id).begin;

        for id in ids {
            let interval = self.store.get(id);
            if interval.location.reg() != current_reg {
                continue;
            }
            let current = self.store.get(current_id);
            if !interval.first_intersection_with(current, LifeNumber(0)).is_valid() {
                continue;
            }
            self.split_active_interval(file, id, current_begin);
        }
    }

    /// §4.5 `split_active_interval`.
    fn split_active_interval(&mut self, file: File, id: IntervalId, pos: LifeNumber) {
        trace!("splitting {:?} at {}", id, pos.0);
        self.before_constant_interval_spill(id, pos);

        let prev_use = self.store.get(id).prev_use(pos);
        let next_use = self.store.get(id).next_use_from(pos + 1);

        let split_id = if !prev_use.is_valid() {
            self.store.get_mut(id).clear_location();
            id
        } else {
            let split_position = if pos.0 % 2 == 1 { pos } else { pos - 1 };
            self.store.split_at(id, split_position)
        };

        self.split_before_use(file, split_id, next_use);
        self.assign_stack_slot(split_id);
    }

    /// §4.9 `split_before_use`.
    fn split_before_use(&mut self, file: File, id: IntervalId, use_pos: LifeNumber) {
        if !use_pos.is_valid() {
            return;
        }
        let tail = self.store.split_at(id, use_pos - 1);
        add_sorted(&mut self.pending_mut(file).regular, tail, &self.store);
    }

    /// §3/§6 stack-slot stride: a wide (64-bit) value needs two consecutive
    /// slots starting at an even index on a 32-bit target, and one slot
    /// everywhere else.
    fn needs_slot_pair(&self, id: IntervalId) -> bool {
        self.store.get(id).wide && self.target.cconv.slots_for_64bit_value() > 1
    }

    /// §4.8 `assign_stack_slot`.
    fn assign_stack_slot(&mut self, id: IntervalId) {
        debug_assert!(!self.store.get(id).location.is_stack(), "interval already on the stack");

        if let Some(inst_id) = self.store.get(id).inst {
            if self.function.inst(inst_id).is_const && self.config.remat_constants {
                if let Some(slot) = self.consts.add_spilled_constant(inst_id) {
                    self.store.get_mut(id).location = Location::ConstantSlot(slot);
                    return;
                }
            }
        }

        let acquired = if self.needs_slot_pair(id) { self.stack.acquire_pair() } else { self.stack.acquire() };
        match acquired {
            Some(slot) => {
                self.store.get_mut(id).location = Location::StackSlot(slot);
                self.working.stack.push(id);
            }
            None => {
                debug!("assign_stack_slot: stack-slot manager exhausted for {:?}", id);
                self.error = Some(AllocError::NoStackSlot);
            }
        }
    }

    /// §4.6 `handle_fixed_interval_intersection`.
    fn handle_fixed_interval_intersection(&mut self, file: File, id: IntervalId) {
        let reg = match self.store.get(id).location.reg() {
            Some(r) => r,
            None => return,
        };
        let fixed_id = match self.working.fixed.get(reg as usize).copied().flatten() {
            Some(f) => f,
            None => return,
        };

        let current_begin = self.store.get(id).begin;
        let mut intersection = {
            let fixed = self.store.get(fixed_id);
            let current = self.store.get(id);
            fixed.first_intersection_with(current, LifeNumber(0))
        };

        if intersection == current_begin {
            let fixed = self.store.get(fixed_id);
            let current = self.store.get(id);
            intersection = fixed.first_intersection_with(current, intersection + 1);
        }

        if !intersection.is_valid() {
            return;
        }

        if let Some(inst_id) = self.store.get(id).inst {
            if self.use_table.has_use_on_fixed_location(inst_id, intersection) {
                self.split_before_use(file, id, intersection);
                return;
            }
        }

        self.before_constant_interval_spill(id, intersection);
        let last_use_before = self.store.get(id).last_use_before(intersection);
        if last_use_before.is_valid() {
            self.split_before_use(file, id, last_use_before + LIFE_NUMBER_GAP);
            return;
        }

        let next_use = self.store.get(id).next_use_from(intersection);
        self.store.get_mut(id).clear_location();
        self.split_before_use(file, id, next_use);
        self.assign_stack_slot(id);
    }

    /// Block any register overlapping a fixed-location requirement of a
    /// temp-helper's owning instruction (§4.4).
    fn block_overlapped_registers(&mut self, id: IntervalId) {
        let interval = self.store.get(id);
        if interval.has_inst() {
            return;
        }
        let regs = crate::liveness::fixed_locations_overlapping_temp(self.function, interval);
        for reg in regs {
            if let Some(idx) = self.reg_map.try_codegen_to_regalloc(reg) {
                if (idx as usize) < self.regs_use_positions.len() {
                    self.regs_use_positions[idx as usize] = LifeNumber(0);
                }
            }
        }
    }

    /// Two adjacent pseudo-users of the same multi-output instruction must
    /// receive distinct registers (§4.4 tie-breaker).
    fn block_adjacent_pseudo_user(&mut self, id: IntervalId) {
        let interval = self.store.get(id);
        let inst_id = match interval.inst {
            Some(i) => i,
            None => return,
        };
        if !self.function.inst(inst_id).is_pseudo_user_of_multi_output {
            return;
        }
        let prev_id = match self.function.prev(inst_id) {
            Some(p) => p,
            None => return,
        };
        if !self.function.inst(prev_id).is_pseudo_user_of_multi_output {
            return;
        }
        if let Some(reg) = self.find_assigned_reg_for_inst(prev_id) {
            if (reg as usize) < self.regs_use_positions.len() {
                self.regs_use_positions[reg as usize] = LifeNumber(0);
            }
        }
    }

    fn find_assigned_reg_for_inst(&self, inst_id: InstId) -> Option<u16> {
        self.working
            .active
            .iter()
            .chain(self.working.inactive.iter())
            .chain(self.working.handled.iter())
            .map(|&id| self.store.get(id))
            .find(|interval| interval.inst == Some(inst_id))
            .and_then(|interval| interval.location.reg())
    }

    /// §4.7: whether `id` is a constant interval that must not be spilled
    /// to the stack.
    fn is_non_spillable_const_interval(&self, id: IntervalId) -> bool {
        let interval = self.store.get(id);
        if interval.split_sibling || interval.physical {
            return false;
        }
        let inst_id = match interval.inst {
            Some(i) => i,
            None => return false,
        };
        let inst = self.function.inst(inst_id);
        inst.is_const
            && self.config.remat_constants
            && self.consts.slot_of(inst_id).is_none()
            && !self.consts.has_available_slots()
    }

    /// §4.7 guard: force a use position at `Begin` on a non-spillable
    /// constant about to be split or spilled.
    fn before_constant_interval_spill(&mut self, id: IntervalId, split_pos: LifeNumber) {
        if !self.is_non_spillable_const_interval(id) {
            return;
        }
        if self.store.get(id).prev_use(split_pos).is_valid() {
            return;
        }
        let begin = self.store.get(id).begin;
        self.store.get_mut(id).prepend_use_position(begin);
    }

    fn remap_regalloc_reg(&mut self, id: IntervalId) {
        if let Some(reg) = self.store.get(id).location.reg() {
            let codegen = self.reg_map.regalloc_to_codegen_reg(reg);
            self.store.get_mut(id).set_reg(codegen);
        }
    }

    /// After draining, remap every live interval's regalloc index back to
    /// a codegen register number (§4.1 step 6).
    fn remap_registers_intervals(&mut self) {
        let ids: Vec<IntervalId> = self
            .working
            .handled
            .iter()
            .chain(self.working.active.iter())
            .chain(self.working.inactive.iter())
            .copied()
            .chain(self.working.fixed.iter().filter_map(|o| *o))
            .collect();
        for id in ids {
            self.remap_regalloc_reg(id);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;
    use crate::ir::Function;
    use crate::liveness::{FileIntervals, LivenessResult, UseTable};
    use crate::machine::{CallingConvention, PointerWidth, RegisterFile, RegisterMask};
    use crate::regalloc::interval::{LifeInterval, Range, UsePosition};
    use std::collections::HashMap;

    fn empty_function() -> Function {
        Function::new(Vec::new(), Vec::new())
    }

    fn reg_file(count: u16) -> RegisterFile {
        RegisterFile {
            mask: RegisterMask::from_range(count),
            first_callee_save: 2,
            accumulator_reg: None,
            zero_reg: None,
            call_clobbers: RegisterMask::new(),
        }
    }

    fn four_register_target() -> Target {
        Target {
            arch: Arch::None,
            int_regs: reg_file(4),
            fp_regs: reg_file(0),
            max_imm_slots: 0,
            cconv: CallingConvention::new(PointerWidth::Bits64, Vec::new()),
        }
    }

    fn plain(begin: u32, end: u32, uses: &[u32]) -> LifeInterval {
        LifeInterval {
            id: IntervalId(0),
            begin: LifeNumber(begin),
            end: LifeNumber(end),
            ranges: vec![Range::new(begin, end)],
            use_positions: uses.iter().map(|&p| UsePosition::new(p)).collect(),
            location: Location::Unassigned,
            physical: false,
            preassigned: false,
            split_sibling: false,
            inst: None,
            temp_owner: None,
            wide: false,
        }
    }

    fn allocator_for<'f>(
        function: &'f Function,
        target: Target,
        config: AllocatorConfig,
        store: IntervalStore,
        regular: Vec<IntervalId>,
        fixed: HashMap<u16, IntervalId>,
    ) -> Allocator<'f> {
        let liveness = LivenessResult {
            store,
            use_table: UseTable::default(),
            int: FileIntervals { regular, fixed },
            fp: FileIntervals::default(),
        };
        Allocator::new(function, target, config, liveness)
    }

    /// Scenario A (§8): three non-overlapping-enough intervals on a free
    /// four-register file all get a register, with the priority anchor
    /// (regalloc index 0, codegen register 2) reused once it frees up.
    #[test]
    fn scenario_a_straight_line_all_free() {
        let function = empty_function();
        let mut store = IntervalStore::new();
        let v1 = store.push(plain(0, 4, &[0, 3]));
        let v2 = store.push(plain(2, 6, &[2, 5]));
        let v3 = store.push(plain(4, 8, &[4, 7]));

        let mut allocator = allocator_for(
            &function,
            four_register_target(),
            AllocatorConfig::new(Arch::None),
            store,
            vec![v1, v2, v3],
            HashMap::new(),
        );
        allocator.allocate().expect("four registers are plenty for three short intervals");

        assert_eq!(allocator.store().get(v1).location.reg(), Some(2));
        assert_eq!(allocator.store().get(v2).location.reg(), Some(3));
        assert_eq!(allocator.store().get(v3).location.reg(), Some(2));
    }

    /// Scenario C (§8): a fixed interval pinned to codegen register 2 blocks
    /// that register for anyone whose range crosses it.
    #[test]
    fn scenario_c_fixed_interval_forces_a_different_register() {
        let function = empty_function();
        let mut store = IntervalStore::new();
        let v1 = store.push(plain(0, 8, &[0, 4, 7]));
        let mut fixed_interval = plain(4, 5, &[]);
        fixed_interval.physical = true;
        let clobber = store.push(fixed_interval);

        let mut fixed = HashMap::new();
        fixed.insert(2u16, clobber);

        let mut allocator = allocator_for(
            &function,
            four_register_target(),
            AllocatorConfig::new(Arch::None),
            store,
            vec![v1],
            fixed,
        );
        allocator.allocate().expect("registers 0, 1 and 3 are all unoccupied");

        assert_ne!(allocator.store().get(v1).location.reg(), Some(2));
    }

    /// Scenario D (§8): a preassigned interval keeps its register; a second,
    /// unconstrained interval overlapping it must land somewhere else.
    #[test]
    fn scenario_d_preassigned_interval_is_respected() {
        let function = empty_function();
        let mut store = IntervalStore::new();
        let mut pinned = plain(0, 6, &[0, 5]);
        pinned.preassigned = true;
        pinned.location = Location::Register(0);
        let v1 = store.push(pinned);
        let v2 = store.push(plain(2, 5, &[2, 4]));

        let mut allocator = allocator_for(
            &function,
            four_register_target(),
            AllocatorConfig::new(Arch::None),
            store,
            vec![v1, v2],
            HashMap::new(),
        );
        allocator.allocate().expect("one preassigned interval leaves three registers free");

        assert_eq!(allocator.store().get(v1).location.reg(), Some(0));
        assert_ne!(allocator.store().get(v2).location.reg(), Some(0));
    }

    /// Scenario F (§8): an interval that enters on a stack parameter is
    /// split right before its first real use instead of ever occupying a
    /// register at its definition point.
    #[test]
    fn scenario_f_stack_parameter_splits_before_first_use() {
        let function = empty_function();
        let mut store = IntervalStore::new();
        let mut param = plain(0, 12, &[0, 10]);
        param.location = Location::StackParameter(0);
        let v1 = store.push(param);

        let mut allocator = allocator_for(
            &function,
            four_register_target(),
            AllocatorConfig::new(Arch::None),
            store,
            vec![v1],
            HashMap::new(),
        );
        allocator.allocate().expect("the tail piece has a free register to land in");

        let head = allocator.store().get(v1);
        assert_eq!(head.location, Location::StackParameter(0));
        assert_eq!(head.end, LifeNumber(9));

        let tail = allocator
            .store()
            .ids()
            .find(|&id| id != v1 && allocator.store().get(id).begin == LifeNumber(9))
            .expect("split_before_use enqueued a tail piece");
        assert!(allocator.store().get(tail).location.reg().is_some());
    }

    /// Bytecode mode (§4.4 `get_blocked_register`) disables register
    /// stealing outright: with every register already active and no free
    /// one available, allocation must fail instead of evicting a neighbor.
    #[test]
    fn bytecode_mode_disables_stealing_and_fails_instead() {
        let function = empty_function();
        let mut store = IntervalStore::new();
        let v1 = store.push(plain(0, 10, &[0, 9]));
        let v2 = store.push(plain(0, 10, &[0, 9]));
        let v3 = store.push(plain(0, 10, &[0, 9]));
        let v4 = store.push(plain(0, 10, &[0, 9]));
        let v5 = store.push(plain(1, 2, &[1]));

        let config = AllocatorConfig::new(Arch::None).with_bytecode_mode(true);
        let mut allocator = allocator_for(&function, four_register_target(), config, store, vec![v1, v2, v3, v4, v5], HashMap::new());

        let result = allocator.allocate();
        assert_eq!(result, Err(AllocError::NoRegisterAvailable));
    }

    /// The same contention resolves by stealing once bytecode mode is off:
    /// the fifth interval evicts whichever active interval holds the
    /// register `get_blocked_register` picks.
    #[test]
    fn normal_mode_steals_a_blocked_register_instead_of_failing() {
        let function = empty_function();
        let mut store = IntervalStore::new();
        let v1 = store.push(plain(0, 10, &[0, 9]));
        let v2 = store.push(plain(0, 10, &[0, 9]));
        let v3 = store.push(plain(0, 10, &[0, 9]));
        let v4 = store.push(plain(0, 10, &[0, 9]));
        let v5 = store.push(plain(1, 2, &[1]));

        let mut allocator = allocator_for(
            &function,
            four_register_target(),
            AllocatorConfig::new(Arch::None),
            store,
            vec![v1, v2, v3, v4, v5],
            HashMap::new(),
        );
        allocator.allocate().expect("stealing lets every interval land somewhere");

        assert!(allocator.store().get(v5).location.reg().is_some());
    }

    /// §3/§6 slot stride: a wide value spilled on a 32-bit target claims two
    /// consecutive, even-aligned slots rather than one.
    #[test]
    fn assign_stack_slot_on_32bit_target_acquires_an_even_aligned_pair() {
        let function = empty_function();
        let mut store = IntervalStore::new();
        let mut wide_interval = plain(0, 4, &[0]);
        wide_interval.wide = true;
        let v1 = store.push(wide_interval);

        let mut target = four_register_target();
        target.cconv = CallingConvention::new(PointerWidth::Bits32, Vec::new());

        let mut allocator = allocator_for(&function, target, AllocatorConfig::new(Arch::None), store, vec![v1], HashMap::new());
        allocator.assign_stack_slot(v1);

        match allocator.store().get(v1).location {
            Location::StackSlot(slot) => assert_eq!(slot % 2, 0, "wide value must start at an even slot"),
            other => panic!("expected a stack slot, got {:?}", other),
        }
    }

    /// The same wide value on a 64-bit target only ever needs one slot.
    #[test]
    fn assign_stack_slot_on_64bit_target_stays_single_width() {
        let function = empty_function();
        let mut store = IntervalStore::new();
        let mut wide_interval = plain(0, 4, &[0]);
        wide_interval.wide = true;
        let v1 = store.push(wide_interval);

        let mut allocator = allocator_for(&function, four_register_target(), AllocatorConfig::new(Arch::None), store, vec![v1], HashMap::new());
        allocator.assign_stack_slot(v1);

        assert_eq!(allocator.store().get(v1).location, Location::StackSlot(0));
    }
}

