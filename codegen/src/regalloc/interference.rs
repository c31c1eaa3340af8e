//! Interference graph construction (spec.md §4.4 step 2).
//!
//! Two virtual registers interfere if one is defined while the other is
//! live. The one exception is a register-to-register move: its
//! destination does not interfere with its own source, which is exactly
//! what makes the pair a coalescing candidate.

use crate::isa::{AbstractInst, VReg};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Default)]
pub struct InterferenceGraph {
    pub adjacency: HashMap<VReg, HashSet<VReg>>,
    /// Candidate `(dst, src)` pairs from move instructions, in program
    /// order.
    pub moves: Vec<(VReg, VReg)>,
}

impl InterferenceGraph {
    fn touch(&mut self, v: VReg) {
        self.adjacency.entry(v).or_default();
    }

    fn add_edge(&mut self, a: VReg, b: VReg) {
        if a == b {
            return;
        }
        self.adjacency.entry(a).or_default().insert(b);
        self.adjacency.entry(b).or_default().insert(a);
    }
}

/// `live_after[i]` must be the set of vregs live immediately after
/// `instructions[i]`, as produced by [`super::liveness::live_after`].
pub fn build(instructions: &[AbstractInst], live_after: &[HashSet<VReg>]) -> InterferenceGraph {
    let mut graph = InterferenceGraph::default();

    for (idx, inst) in instructions.iter().enumerate() {
        for &u in &inst.uses {
            graph.touch(u);
        }
        let Some(def) = inst.def else { continue };
        graph.touch(def);

        let is_move = inst.is_move && inst.uses.len() == 1;
        if is_move {
            let src = inst.uses[0];
            if src != def {
                graph.moves.push((def, src));
            }
            for &live in &live_after[idx] {
                if live != def && live != src {
                    graph.add_edge(def, live);
                }
            }
        } else {
            for &live in &live_after[idx] {
                if live != def {
                    graph.add_edge(def, live);
                }
            }
        }
    }

    graph
}

#[cfg(test)]
mod tests {
    use super::*;
    use cg_entity::EntityRef;

    fn v(i: u32) -> VReg {
        VReg::new(i as usize)
    }

    #[test]
    fn a_move_does_not_interfere_with_its_own_source() {
        let instructions = vec![
            AbstractInst::new("li").with_def(v(0)).with_imm(1),
            AbstractInst::new("mov").with_def(v(1)).with_uses(vec![v(0)]).as_move(),
            AbstractInst::new("ret").with_uses(vec![v(1)]),
        ];
        let live_after = vec![
            [v(0)].into_iter().collect(),
            [v(1)].into_iter().collect(),
            HashSet::new(),
        ];
        let graph = build(&instructions, &live_after);
        assert!(!graph.adjacency.get(&v(0)).unwrap().contains(&v(1)));
        assert_eq!(graph.moves, vec![(v(1), v(0))]);
    }

    #[test]
    fn two_simultaneously_live_defs_interfere() {
        let instructions = vec![
            AbstractInst::new("li").with_def(v(0)).with_imm(1),
            AbstractInst::new("li").with_def(v(1)).with_imm(2),
            AbstractInst::new("add").with_def(v(2)).with_uses(vec![v(0), v(1)]),
        ];
        let live_after = vec![
            [v(0)].into_iter().collect(),
            [v(0), v(1)].into_iter().collect(),
            HashSet::new(),
        ];
        let graph = build(&instructions, &live_after);
        assert!(graph.adjacency[&v(0)].contains(&v(1)));
    }
}
