//! The calling-convention description the allocator core treats as an
//! external collaborator (spec §1, §6): where entry parameters live, and how
//! many stack slots a value of a given width needs.

use crate::ir::ParameterLocation;

/// Whether the target is 32-bit or 64-bit, for the sole purpose of the
/// slot-stride rule below.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerWidth {
    Bits32,
    Bits64,
}

/// Parameter locations and stack-slot sizing rules for one target ABI.
#[derive(Debug, Clone)]
pub struct CallingConvention {
    pub pointer_width: PointerWidth,
    params: Vec<ParameterLocation>,
}

impl CallingConvention {
    pub fn new(pointer_width: PointerWidth, params: Vec<ParameterLocation>) -> CallingConvention {
        CallingConvention { pointer_width, params }
    }

    pub fn parameter_location(&self, index: usize) -> Option<ParameterLocation> {
        self.params.get(index).copied()
    }

    /// How many consecutive stack slots a 64-bit value occupies under this
    /// ABI (spec §3/§6): one on a 64-bit target, two starting at an even
    /// index on a 32-bit target.
    pub fn slots_for_64bit_value(&self) -> u32 {
        match self.pointer_width {
            PointerWidth::Bits64 => 1,
            PointerWidth::Bits32 => 2,
        }
    }
}
