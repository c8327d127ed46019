//! C4: the constant (immediate-table) slot manager.
//!
//! Maps constant instructions to immediate-table slots when
//! rematerialization is enabled; once the table is at capacity, further
//! constants fall back to the stack-slot manager transparently (§4.7,
//! §4.8).

use std::collections::HashMap;

use crate::ir::InstId;

#[derive(Debug, Clone)]
pub struct ConstantSlotManager {
    slots: HashMap<InstId, u32>,
    next: u32,
    capacity: u32,
}

impl ConstantSlotManager {
    pub fn new(capacity: u32) -> ConstantSlotManager {
        ConstantSlotManager { slots: HashMap::new(), next: 0, capacity }
    }

    /// Assigns (or returns the existing) immediate slot for `inst`. `None`
    /// once the table is full — callers fall back to a stack slot.
    pub fn add_spilled_constant(&mut self, inst: InstId) -> Option<u32> {
        if let Some(&slot) = self.slots.get(&inst) {
            return Some(slot);
        }
        if self.next >= self.capacity {
            return None;
        }
        let slot = self.next;
        self.next += 1;
        self.slots.insert(inst, slot);
        Some(slot)
    }

    pub fn has_available_slots(&self) -> bool {
        self.next < self.capacity
    }

    pub fn slot_of(&self, inst: InstId) -> Option<u32> {
        self.slots.get(&inst).copied()
    }
}
