//! The linear-scan allocator core (spec §2: "C" components).
//!
//! Each submodule is one component from the architecture diagram: a small
//! arena-backed data model ([`interval`]), the two interval queues
//! ([`queues`]), the stack-slot and constant-slot tables ([`stack`],
//! [`const_slots`]), the regalloc-index bijection ([`reg_map`]), explicit
//! configuration and error types ([`config`], [`error`]) in place of the
//! reference implementation's global options object and cross-component
//! assertions, and finally the driver itself ([`allocator`]).

pub mod allocator;
pub mod config;
pub mod const_slots;
pub mod error;
pub mod interval;
pub mod queues;
pub mod reg_map;
pub mod stack;

pub use allocator::{Allocator, File};
pub use config::AllocatorConfig;
pub use error::AllocError;
pub use interval::{IntervalId, IntervalStore, LifeInterval, LifeNumber, Location, Range, UsePosition};

use crate::ir::Function;
use crate::machine::Target;

/// Runs liveness analysis followed by allocation for `function` against
/// `target`, returning the interval store with every interval's final
/// location filled in (codegen register, stack slot, constant slot, or
/// untouched stack-parameter location).
pub fn allocate(function: &Function, target: Target, config: AllocatorConfig) -> Result<IntervalStore, AllocError> {
    let liveness = crate::liveness::analyze(function, &target);
    let mut allocator = Allocator::new(function, target, config, liveness);
    allocator.allocate()?;
    Ok(allocator.into_store())
}
