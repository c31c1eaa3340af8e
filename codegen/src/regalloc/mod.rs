//! Iterated Chaitin-Briggs register allocation (spec.md §4.4): build the
//! interference graph from liveness, color it, and if some vregs can't be
//! colored, rewrite the program with explicit spill loads/stores and
//! start over. Bounded by `MAX_SPILL_ROUNDS` -- a real target's register
//! file is never so starved relative to live ranges that this doesn't
//! converge quickly, and a non-converging run is a target bug, not
//! something to loop on forever.

pub mod coloring;
pub mod interference;
pub mod liveness;
pub mod register_set;

pub use coloring::Coloring;
pub use liveness::BlockRange;

use crate::frame::Frame;
use crate::isa::{AbstractInst, PReg, Target, VReg};
use crate::result::{CodegenError, CodegenResult};
use cg_entity::EntityRef;
use std::collections::{HashMap, HashSet};

const MAX_SPILL_ROUNDS: usize = 10;

/// Allocate registers for one function's flattened instruction stream,
/// spilling and retrying as needed. Returns the (possibly spill-rewritten)
/// instruction stream, its updated block ranges, and the final
/// vreg-to-register coloring; every vreg still appearing in the returned
/// stream is a key of the map.
pub fn allocate(
    mut instructions: Vec<AbstractInst>,
    mut blocks: Vec<BlockRange>,
    precolored: &HashMap<VReg, PReg>,
    target: &dyn Target,
    frame: &mut Frame,
    coalesce: bool,
) -> CodegenResult<(Vec<AbstractInst>, Vec<BlockRange>, HashMap<VReg, PReg>)> {
    let k = target.num_registers();
    for _ in 0..MAX_SPILL_ROUNDS {
        let live = liveness::live_after(&instructions, &blocks);
        let graph = interference::build(&instructions, &live);
        let result = coloring::color(&graph, precolored, k, coalesce);
        if result.spills.is_empty() {
            return Ok((instructions, blocks, result.colors));
        }
        log::debug!(
            "{}: spilling {} temporar{} and retrying allocation",
            frame.function_name,
            result.spills.len(),
            if result.spills.len() == 1 { "y" } else { "ies" }
        );
        rewrite_with_spills(&mut instructions, &mut blocks, &result.spills, target, frame);
    }
    Err(CodegenError::AllocationFailure {
        class: target.name().to_string(),
    })
}

fn fresh_vreg(next: &mut u32) -> VReg {
    let v = VReg::new(*next as usize);
    *next += 1;
    v
}

/// Insert a frame load before every use and a frame store after every def
/// of a spilled vreg, each through its own fresh vreg -- the allocator
/// never has to reconcile a spilled value living in a register across
/// more than one instruction.
fn rewrite_with_spills(instructions: &mut Vec<AbstractInst>, blocks: &mut [BlockRange], spills: &[VReg], target: &dyn Target, frame: &mut Frame) {
    let spill_set: HashSet<VReg> = spills.iter().copied().collect();
    let mut next_vreg: u32 = instructions
        .iter()
        .flat_map(|i| i.uses.iter().copied().chain(i.def))
        .map(|v| v.index() as u32 + 1)
        .max()
        .unwrap_or(0);

    let mut block_of = vec![0usize; instructions.len()];
    for (bi, b) in blocks.iter().enumerate() {
        for i in b.start..b.end {
            block_of[i] = bi;
        }
    }

    let mut per_block: Vec<Vec<AbstractInst>> = vec![Vec::new(); blocks.len()];
    for (idx, inst) in instructions.iter().enumerate() {
        let bi = block_of[idx];

        let mut new_uses = Vec::with_capacity(inst.uses.len());
        for &u in &inst.uses {
            if spill_set.contains(&u) {
                let tmp = fresh_vreg(&mut next_vreg);
                let offset = frame.slot_for(u);
                per_block[bi].push(target.emit_frame_load(tmp, offset));
                new_uses.push(tmp);
            } else {
                new_uses.push(u);
            }
        }

        let new_def = match inst.def {
            Some(d) if spill_set.contains(&d) => Some(fresh_vreg(&mut next_vreg)),
            other => other,
        };

        per_block[bi].push(AbstractInst {
            mnemonic: inst.mnemonic.clone(),
            def: new_def,
            uses: new_uses,
            imm: inst.imm,
            is_move: inst.is_move,
        });

        if let Some(d) = inst.def {
            if spill_set.contains(&d) {
                let offset = frame.slot_for(d);
                per_block[bi].push(target.emit_frame_store(new_def.unwrap(), offset));
            }
        }
    }

    let mut flattened = Vec::with_capacity(per_block.iter().map(Vec::len).sum());
    for (bi, mut body) in per_block.into_iter().enumerate() {
        let start = flattened.len();
        flattened.append(&mut body);
        blocks[bi].start = start;
        blocks[bi].end = flattened.len();
    }
    *instructions = flattened;
}

/// Rewrite every vreg reference in `instructions` to the physical
/// register the allocator assigned it. Every vreg must be present in
/// `colors` -- the caller only reaches here once `allocate` returns
/// successfully.
pub fn apply_coloring(instructions: &[AbstractInst], colors: &HashMap<VReg, PReg>) -> Vec<(String, Vec<PReg>, Option<PReg>, Option<i64>)> {
    instructions
        .iter()
        .map(|inst| {
            let uses = inst.uses.iter().map(|v| colors[v]).collect();
            let def = inst.def.map(|v| colors[&v]);
            (inst.mnemonic.clone(), uses, def, inst.imm)
        })
        .collect()
}
