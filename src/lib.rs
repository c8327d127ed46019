//! A linear-scan register allocator for SSA-form compiler IR.
//!
//! The crate is organized leaves-first, the way the allocator consumes its
//! collaborators:
//!
//! - [`ir`] and [`machine`] describe the (deliberately thin) instruction and
//!   target model the allocator is given.
//! - [`liveness`] turns that model into the lifetime intervals and use
//!   positions the allocator actually works with.
//! - [`regalloc`] is the allocator itself: the interval-scheduling loop,
//!   split-and-spill policy, and register selection.
//! - [`resolver`] sketches the move-materialization pass that would consume
//!   the allocator's output.

#![deny(unused_features)]
#![deny(deprecated)]
#![warn(unused_variables)]
#![warn(unused_imports)]
#![warn(dead_code)]

#[macro_use]
extern crate log;

#[macro_use]
pub mod macros;

pub mod driver;
pub mod ir;
pub mod liveness;
pub mod machine;
pub mod regalloc;
pub mod resolver;
pub mod util;
