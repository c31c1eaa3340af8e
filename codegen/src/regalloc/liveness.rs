//! Backward liveness analysis over a function's flattened abstract
//! instruction stream (spec.md §4.4 step 1: "liveness drives the
//! interference graph").
//!
//! The allocator works on one function at a time, after every block's
//! control transfers have been lowered to concrete jump/branch/return
//! instructions and block-parameter passing has been made explicit as
//! register moves, so ordinary per-instruction dataflow is enough -- there
//! is no remaining notion of an SSA phi to special-case.

use crate::isa::{AbstractInst, VReg};
use std::collections::HashSet;

/// One basic block's span within the flattened instruction list, and the
/// block indices control can transfer to from its last instruction.
#[derive(Debug, Clone)]
pub struct BlockRange {
    pub start: usize,
    pub end: usize,
    pub successors: Vec<usize>,
}

fn block_use_def(instructions: &[AbstractInst], range: &BlockRange) -> (HashSet<VReg>, HashSet<VReg>) {
    let mut use_set = HashSet::new();
    let mut def_set = HashSet::new();
    for inst in &instructions[range.start..range.end] {
        for &u in &inst.uses {
            if !def_set.contains(&u) {
                use_set.insert(u);
            }
        }
        if let Some(d) = inst.def {
            def_set.insert(d);
        }
    }
    (use_set, def_set)
}

/// Live-out set per instruction index: the set of vregs still live
/// immediately after that instruction executes.
pub fn live_after(instructions: &[AbstractInst], blocks: &[BlockRange]) -> Vec<HashSet<VReg>> {
    let use_def: Vec<(HashSet<VReg>, HashSet<VReg>)> = blocks.iter().map(|b| block_use_def(instructions, b)).collect();

    let mut live_in: Vec<HashSet<VReg>> = vec![HashSet::new(); blocks.len()];
    let mut live_out: Vec<HashSet<VReg>> = vec![HashSet::new(); blocks.len()];

    let mut changed = true;
    while changed {
        changed = false;
        for (idx, block) in blocks.iter().enumerate() {
            let mut out = HashSet::new();
            for &succ in &block.successors {
                out.extend(live_in[succ].iter().copied());
            }
            let (use_set, def_set) = &use_def[idx];
            let mut new_in = out.difference(def_set).copied().collect::<HashSet<_>>();
            new_in.extend(use_set.iter().copied());

            if new_in != live_in[idx] {
                live_in[idx] = new_in;
                changed = true;
            }
            if out != live_out[idx] {
                live_out[idx] = out;
                changed = true;
            }
        }
    }

    let mut result = vec![HashSet::new(); instructions.len()];
    for (idx, block) in blocks.iter().enumerate() {
        let mut live = live_out[idx].clone();
        for i in (block.start..block.end).rev() {
            result[i] = live.clone();
            if let Some(d) = instructions[i].def {
                live.remove(&d);
            }
            live.extend(instructions[i].uses.iter().copied());
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use cg_entity::EntityRef;

    fn v(i: u32) -> VReg {
        VReg::new(i as usize)
    }

    #[test]
    fn a_value_used_across_a_jump_stays_live_through_it() {
        // block0: def v0; jmp block1
        // block1: use v0; ret
        let instructions = vec![
            AbstractInst::new("li").with_def(v(0)).with_imm(1),
            AbstractInst::new("jmp l1"),
            AbstractInst::new("ret").with_uses(vec![v(0)]),
        ];
        let blocks = vec![
            BlockRange {
                start: 0,
                end: 2,
                successors: vec![1],
            },
            BlockRange {
                start: 2,
                end: 3,
                successors: vec![],
            },
        ];
        let live = live_after(&instructions, &blocks);
        assert!(live[0].contains(&v(0)));
        assert!(live[1].contains(&v(0)));
        assert!(!live[2].contains(&v(0)));
    }

    #[test]
    fn dead_value_is_not_live_after_its_definition() {
        let instructions = vec![AbstractInst::new("li").with_def(v(0)).with_imm(1), AbstractInst::new("ret")];
        let blocks = vec![BlockRange {
            start: 0,
            end: 2,
            successors: vec![],
        }];
        let live = live_after(&instructions, &blocks);
        assert!(!live[0].contains(&v(0)));
    }
}
