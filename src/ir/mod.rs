//! A deliberately thin instruction / control-flow model.
//!
//! Instruction semantics — opcodes, operand types, the actual control-flow
//! graph data structure — are explicitly out of scope for a register
//! allocator core (see the crate's `SPEC_FULL.md`, §1). [`liveness`][crate::liveness]
//! only needs instruction *identity* and the handful of flags that influence
//! allocation decisions, so that's all this module carries.

use std::fmt;

/// Dense identity of one instruction within a [`Function`], in program order.
///
/// Values are identified with the instruction that defines them (as in most
/// SSA-form IRs): an [`Operand`] referring to `InstId(7)` means "the result
/// of instruction 7".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InstId(pub u32);

impl fmt::Display for InstId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "inst{}", self.0)
    }
}

/// Identity of a block within a [`Function`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockId(pub u32);

/// Where an entry parameter lives on function entry, per the calling
/// convention (`crate::machine::cconv`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterLocation {
    Register(u16),
    StackParameter(u32),
}

/// One read of a value, optionally constrained to a specific codegen
/// register (e.g. the second operand of a shift must be in `CL`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operand {
    pub value: InstId,
    pub fixed_reg: Option<u16>,
}

impl Operand {
    pub fn new(value: InstId) -> Operand {
        Operand { value, fixed_reg: None }
    }

    pub fn fixed(value: InstId, reg: u16) -> Operand {
        Operand { value, fixed_reg: Some(reg) }
    }
}

/// Per-instruction metadata the liveness analyzer and allocator consult.
///
/// `dst_count` drives the `prepare_interval` classification of §4.1: zero
/// means the instruction produces no value worth a location of its own,
/// more than one means its individual results are represented by separate
/// *pseudo-user* instructions inserted right after it.
#[derive(Debug, Clone)]
pub struct Instruction {
    pub id: InstId,
    pub dst_count: u8,
    /// Routes this instruction's own interval (and any temp it needs) to
    /// the vector/floating-point register file instead of the general one.
    pub is_fp: bool,
    pub is_const: bool,
    pub is_call: bool,
    pub is_pseudo_user_of_multi_output: bool,
    pub parameter: Option<ParameterLocation>,
    pub inputs: Vec<Operand>,
    /// Fixed-location requirement on this instruction's own destination
    /// (e.g. a division result pinned to a return-value register).
    pub dst_fixed_reg: Option<u16>,
    /// This instruction additionally needs an (unconstrained) scratch
    /// register during codegen — the liveness analyzer synthesizes a
    /// pseudo-helper interval for it (§3 "has-inst" = false).
    pub needs_temp: bool,
    /// Whether this instruction's destination is a 64-bit value. Only
    /// matters on a 32-bit target, where such a value needs two
    /// consecutive stack slots starting at an even index instead of one
    /// (§3/§6 slot-stride rule; `CallingConvention::slots_for_64bit_value`).
    pub is_wide: bool,
}

impl Instruction {
    pub fn new(id: InstId) -> Instruction {
        Instruction {
            id,
            dst_count: 1,
            is_fp: false,
            is_const: false,
            is_call: false,
            is_pseudo_user_of_multi_output: false,
            parameter: None,
            inputs: Vec::new(),
            dst_fixed_reg: None,
            needs_temp: false,
            is_wide: false,
        }
    }

    pub fn no_dest(&self) -> bool {
        self.dst_count == 0
    }
}

/// A basic block: an ordered run of instructions plus its successors.
#[derive(Debug, Clone)]
pub struct Block {
    pub id: BlockId,
    pub insts: Vec<InstId>,
    pub successors: Vec<BlockId>,
}

/// A function body: blocks in reverse-postorder, instructions addressable
/// by [`InstId`].
#[derive(Debug, Clone)]
pub struct Function {
    instructions: Vec<Instruction>,
    pub blocks: Vec<Block>,
}

impl Function {
    pub fn new(instructions: Vec<Instruction>, blocks: Vec<Block>) -> Function {
        Function { instructions, blocks }
    }

    pub fn inst(&self, id: InstId) -> &Instruction {
        &self.instructions[id.0 as usize]
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// The instruction immediately preceding `id` in program order, if any.
    ///
    /// Used by the allocator to detect adjacent pseudo-users of the same
    /// multi-output instruction (§4.4).
    pub fn prev(&self, id: InstId) -> Option<InstId> {
        if id.0 == 0 {
            None
        } else {
            Some(InstId(id.0 - 1))
        }
    }

    pub fn block(&self, id: BlockId) -> &Block {
        &self.blocks[id.0 as usize]
    }
}
