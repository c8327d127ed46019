//! Ambient, process-level concerns: error reporting for the demo CLI.
//!
//! Earlier revisions of this lineage kept a thread-local `Session` here so
//! every compiler phase could reach global state (the source map, the
//! interned-string table, an accumulated error flag) without threading it
//! through every call. The allocator has no such phase-spanning state of its
//! own — its configuration is the explicit `AllocatorConfig` passed to its
//! constructor (see [`crate::regalloc::config`]) — so this module shrinks to
//! what's left once that pattern is removed: stderr reporting for the demo
//! binary.

mod error;

pub use self::error::{abort, fatal};