//! IR entity references.
//!
//! As in the teacher crate's `ir::entities`, these wrap a dense `u32` index
//! into a table owned by `Function` rather than being real Rust references,
//! so the IR graph can be built and mutated without fighting the borrow
//! checker.

use cg_entity::entity_impl;

/// A reference to a basic block.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Block(u32);
entity_impl!(Block, "block");

/// A reference to an SSA-ish value (an instruction result or a block
/// parameter).
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Value(u32);
entity_impl!(Value, "v");

/// A reference to an instruction.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Inst(u32);
entity_impl!(Inst, "inst");
