//! The target interface (spec.md §4.5): everything target-specific is
//! reached through the [`Target`] trait, so the core pipeline stages never
//! hardcode a concrete machine.

pub mod demo;

use crate::isel::tile::Tile;
use cg_entity::entity_impl;
use std::fmt;

/// A virtual register: one per DAG node that produces a value, assigned
/// during instruction selection and replaced by a real register (or a
/// spill slot) during allocation.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VReg(u32);
entity_impl!(VReg, "vr");

/// A physical register, identified by its class-relative index. Targets
/// are free to interpret the index however they like; the core only ever
/// compares and counts them.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PReg(pub u8);

impl fmt::Display for PReg {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "p{}", self.0)
    }
}

/// One target-independent machine instruction: a mnemonic, at most one
/// register def, any number of register uses, and an optional immediate.
/// `uses` and `def` hold virtual registers before allocation and physical
/// ones after rewriting.
#[derive(Debug, Clone)]
pub struct AbstractInst {
    pub mnemonic: String,
    pub def: Option<VReg>,
    pub uses: Vec<VReg>,
    pub imm: Option<i64>,
    /// Set by [`Target::emit_move`] implementations: marks a register copy
    /// so the driver can drop it once allocation has colored its def and
    /// use the same (spec.md §8 property 5).
    pub is_move: bool,
}

impl AbstractInst {
    pub fn new(mnemonic: impl Into<String>) -> Self {
        AbstractInst {
            mnemonic: mnemonic.into(),
            def: None,
            uses: Vec::new(),
            imm: None,
            is_move: false,
        }
    }

    pub fn with_def(mut self, def: VReg) -> Self {
        self.def = Some(def);
        self
    }

    pub fn with_uses(mut self, uses: Vec<VReg>) -> Self {
        self.uses = uses;
        self
    }

    pub fn with_imm(mut self, imm: i64) -> Self {
        self.imm = Some(imm);
        self
    }

    /// Mark this instruction as a register-to-register copy.
    pub fn as_move(mut self) -> Self {
        self.is_move = true;
        self
    }
}

/// Everything the core pipeline needs to know about a target machine.
pub trait Target {
    /// A short name for diagnostics and output headers.
    fn name(&self) -> &str;

    /// The tiles available to the instruction selector, in no particular
    /// order -- the selector's dynamic program picks the optimum regardless
    /// of list order.
    fn tiles(&self) -> &[Tile];

    /// How many general-purpose registers this target exposes to the
    /// allocator (spec.md §4.4's `K`).
    fn num_registers(&self) -> usize;

    /// The assembly-level name of physical register `reg`.
    fn register_name(&self, reg: PReg) -> String;

    /// The longest an basic block's instruction list may get before the
    /// splitter must cut it (spec.md §4.1, §9 resolution: a target
    /// property, not a fixed global constant).
    fn max_block_len(&self) -> usize;

    /// Registers used, in order, to pass a call's first `n` integer
    /// arguments.
    fn abi_arg_registers(&self) -> &[PReg];

    /// The register a call's single return value comes back in.
    fn abi_return_register(&self) -> PReg;

    /// Emit the function-entry glue (stack frame setup) given the frame's
    /// size in bytes.
    fn emit_prologue(&self, frame_size: u32) -> Vec<AbstractInst>;

    /// Emit the function-exit glue (stack frame teardown).
    fn emit_epilogue(&self, frame_size: u32) -> Vec<AbstractInst>;

    /// Emit an unconditional jump to `label`.
    fn emit_jump(&self, label: &str) -> AbstractInst;

    /// Emit a conditional branch: go to `then_label` if `cond` is nonzero,
    /// otherwise fall through to code the driver places immediately after.
    fn emit_branch(&self, cond: VReg, then_label: &str) -> AbstractInst;

    /// Emit a return, optionally moving `value` into the ABI return
    /// register first.
    fn emit_return(&self, value: Option<VReg>) -> Vec<AbstractInst>;

    /// Emit a direct call to `callee`, with `args` already in the ABI
    /// argument registers and `result`, if present, receiving the ABI
    /// return register.
    fn emit_call(&self, callee: &str, args: &[VReg], result: Option<VReg>) -> Vec<AbstractInst>;

    /// Emit a register-to-register move, used by the allocator's rewrite
    /// step and by coalescing candidates.
    fn emit_move(&self, dst: VReg, src: VReg) -> AbstractInst;

    /// Emit a reload of a spilled value from its frame slot (spec.md
    /// §4.4 step 6: "rewrite the program, inserting loads and stores
    /// around every use and def of a spilled temporary").
    fn emit_frame_load(&self, dst: VReg, offset: i32) -> AbstractInst;

    /// Emit a spill of a value to its frame slot.
    fn emit_frame_store(&self, src: VReg, offset: i32) -> AbstractInst;
}
