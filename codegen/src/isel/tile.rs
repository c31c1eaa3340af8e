//! Tile patterns matched against the selection DAG (spec.md §4.3).
//!
//! A tile's pattern may span more than one DAG node (e.g. an add that folds
//! in an immediate operand) provided every folded node has exactly one use;
//! a folded node with other uses must still get its own materialized
//! value, so folding it away would duplicate work.

use crate::dag::{Dag, NodeId, NodeKind};
use crate::ir::BinOp;
use crate::isa::{AbstractInst, VReg};
use std::collections::HashMap;

/// A shape to match against one DAG node, optionally recursing into its
/// operands.
#[derive(Debug, Clone)]
pub enum Pattern {
    /// Matches any node; the matched node becomes one of the tile's
    /// register inputs rather than being folded into it.
    Any,
    /// A constant leaf, folded into the tile as an immediate. Only matches
    /// if the constant has no other users.
    Const,
    /// A binary operator node whose operands recursively match.
    Binary(BinOp, Box<Pattern>, Box<Pattern>),
    /// A load node whose address recursively matches.
    Load(Box<Pattern>),
}

/// The result of successfully matching a [`Pattern`] at a node: the leaf
/// nodes that still need their own register inputs, in left-to-right
/// order, and the folded immediate, if the pattern matched a `Const` leaf.
#[derive(Debug, Clone, Default)]
pub struct Match {
    pub leaves: Vec<NodeId>,
    pub imm: Option<i64>,
}

/// The number of DAG nodes a pattern covers, used to break ties between
/// tiles of equal cost (spec.md §4.3: prefer the larger, i.e. more nodes
/// covered, pattern; among equal coverage, the lexicographically smaller
/// mnemonic).
pub fn pattern_size(pattern: &Pattern) -> usize {
    match pattern {
        Pattern::Any | Pattern::Const => 1,
        Pattern::Binary(_, l, r) => 1 + pattern_size(l) + pattern_size(r),
        Pattern::Load(p) => 1 + pattern_size(p),
    }
}

/// Try to match `pattern` rooted at `node`. `uses` maps every node to how
/// many DAG edges reference it. `at_root` is true only for the outermost
/// call (the node the tile is actually being matched against): a `Const`
/// matched there always gets its own `li`-style tile regardless of its use
/// count, since no fold is happening. A `Const` matched while recursing
/// into a parent pattern (`at_root == false`) is being folded away, which
/// is only sound when this is its one and only use.
pub fn try_match(dag: &Dag, node: NodeId, pattern: &Pattern, uses: &HashMap<NodeId, u32>) -> Option<Match> {
    try_match_inner(dag, node, pattern, uses, true)
}

fn try_match_inner(dag: &Dag, node: NodeId, pattern: &Pattern, uses: &HashMap<NodeId, u32>, at_root: bool) -> Option<Match> {
    match pattern {
        Pattern::Any => Some(Match {
            leaves: vec![node],
            imm: None,
        }),
        Pattern::Const => {
            if let NodeKind::Const { imm, .. } = dag.node(node).kind {
                if at_root || uses.get(&node).copied().unwrap_or(0) <= 1 {
                    return Some(Match {
                        leaves: vec![],
                        imm: Some(imm),
                    });
                }
            }
            None
        }
        Pattern::Binary(op, lp, rp) => {
            let data = dag.node(node);
            if let NodeKind::Binary { op: actual, .. } = &data.kind {
                if actual == op {
                    let lhs = try_match_inner(dag, data.operands[0], lp, uses, false)?;
                    let rhs = try_match_inner(dag, data.operands[1], rp, uses, false)?;
                    let mut leaves = lhs.leaves;
                    leaves.extend(rhs.leaves);
                    let imm = lhs.imm.or(rhs.imm);
                    return Some(Match { leaves, imm });
                }
            }
            None
        }
        Pattern::Load(pp) => {
            let data = dag.node(node);
            if matches!(data.kind, NodeKind::Load { .. }) {
                let inner = try_match_inner(dag, data.operands[0], pp, uses, false)?;
                return Some(Match {
                    leaves: inner.leaves,
                    imm: inner.imm,
                });
            }
            None
        }
    }
}

/// Count how many edges reference each node, across both value operands
/// and chain edges.
pub fn count_uses(dag: &Dag) -> HashMap<NodeId, u32> {
    let mut uses = HashMap::new();
    for id in dag.postorder() {
        let node = dag.node(id);
        for &operand in &node.operands {
            *uses.entry(operand).or_insert(0) += 1;
        }
        if let Some(chain) = node.chain_in {
            *uses.entry(chain).or_insert(0) += 1;
        }
    }
    uses
}

/// The virtual registers bound to a tile's match at selection time: one
/// per leaf the pattern left unfolded, in the same left-to-right order
/// `Match::leaves` was built in, plus the result register this tile
/// defines (absent for tiles with no value result).
pub struct TileMatch {
    pub result: Option<VReg>,
    pub inputs: Vec<VReg>,
    pub imm: Option<i64>,
}

/// A target-supplied instruction pattern: the DAG shape it covers, what it
/// costs the allocator's optimum-tiling search, and how to turn a
/// successful match into abstract instructions.
pub struct Tile {
    pub mnemonic: &'static str,
    pub pattern: Pattern,
    pub cost: u32,
    pub emit: fn(&TileMatch) -> Vec<AbstractInst>,
}
