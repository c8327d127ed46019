//! Allocator configuration (§9 "Global options object").
//!
//! The reference implementation reads `remat_constants` off a process-wide
//! options singleton. This crate passes it — along with the other knobs
//! that influence allocator behavior — as an explicit struct to the
//! allocator's constructor instead.

use crate::machine::Arch;

#[derive(Debug, Clone, Copy)]
pub struct AllocatorConfig {
    /// Enable single-immediate constant rematerialization (§4.7).
    pub remat_constants: bool,
    /// Capacity of the stack-slot manager (§3 "Stack-slot table").
    pub max_stack_slots: u32,
    /// Bytecode-optimizer framing: disallows stealing a blocked register
    /// (§4.4 `get_blocked_register`).
    pub bytecode_mode: bool,
    pub arch: Arch,
}

impl AllocatorConfig {
    pub fn new(arch: Arch) -> AllocatorConfig {
        AllocatorConfig {
            remat_constants: false,
            max_stack_slots: 256,
            bytecode_mode: false,
            arch,
        }
    }

    pub fn with_remat(mut self, remat_constants: bool) -> AllocatorConfig {
        self.remat_constants = remat_constants;
        self
    }

    pub fn with_bytecode_mode(mut self, bytecode_mode: bool) -> AllocatorConfig {
        self.bytecode_mode = bytecode_mode;
        self
    }

    pub fn with_max_stack_slots(mut self, max_stack_slots: u32) -> AllocatorConfig {
        self.max_stack_slots = max_stack_slots;
        self
    }
}
