//! Bottom-up optimal tiling instruction selector (spec.md §4.3).
//!
//! For each DAG node, in post-order, every tile is tried against it; the
//! dynamic-programming cost of a node is the winning tile's own cost plus
//! the already-computed cost of each of its unfolded leaves. Ties are
//! broken first by preferring the tile covering the most nodes (larger
//! pattern), then by the lexicographically smaller mnemonic, so the choice
//! never depends on the order `Target::tiles()` happens to list them in.

use super::tile::{count_uses, pattern_size, try_match, Match, Tile, TileMatch};
use crate::dag::{Dag, NodeId, NodeKind};
use crate::ir::Value;
use crate::isa::{AbstractInst, Target, VReg};
use crate::result::{CodegenError, CodegenResult};
use std::collections::HashMap;

fn fresh_vreg(next: &mut u32) -> VReg {
    let v = cg_entity::EntityRef::new(*next as usize);
    *next += 1;
    v
}

struct Choice {
    tile: usize,
    cost: u32,
    leaves: Vec<NodeId>,
    imm: Option<i64>,
}

fn pick_tile(dag: &Dag, node: NodeId, tiles: &[Tile], uses: &HashMap<NodeId, u32>, cost_of: &HashMap<NodeId, u32>) -> Option<Choice> {
    let mut best: Option<Choice> = None;
    for (idx, tile) in tiles.iter().enumerate() {
        let Some(Match { leaves, imm }) = try_match(dag, node, &tile.pattern, uses) else {
            continue;
        };
        let leaves_cost: u32 = leaves.iter().map(|l| cost_of.get(l).copied().unwrap_or(0)).sum();
        let total = tile.cost + leaves_cost;
        let better = match &best {
            None => true,
            Some(b) => {
                if total != b.cost {
                    total < b.cost
                } else {
                    let size = pattern_size(&tile.pattern);
                    let best_size = pattern_size(&tiles[b.tile].pattern);
                    if size != best_size {
                        size > best_size
                    } else {
                        tile.mnemonic < tiles[b.tile].mnemonic
                    }
                }
            }
        };
        if better {
            best = Some(Choice {
                tile: idx,
                cost: total,
                leaves,
                imm,
            });
        }
    }
    best
}

/// The outcome of selecting one block: its abstract instructions in
/// program order, the vreg bound to each of its own parameters in
/// parameter order, and a lookup from every `Value` defined in the block
/// back to the vreg selection assigned it (used to translate the block's
/// terminator once register allocation has run).
pub struct Selection {
    pub insts: Vec<AbstractInst>,
    pub param_vregs: Vec<VReg>,
    pub value_vregs: HashMap<Value, VReg>,
}

/// Select instructions for every value-producing node of `dag`, plus the
/// fixed lowering of its store/call nodes, using `target`'s tiles.
///
/// Runs two passes over the post-order. The first computes, for every
/// tileable node, the cheapest tile and the set of operand nodes it leaves
/// unfolded ("leaves"). A node that never appears as a leaf of any chosen
/// tile -- because its sole consumer folded it in as an immediate -- is
/// never materialized into its own instruction; the second pass emits
/// code only for nodes the first pass determined are actually needed as
/// standalone register values.
pub fn select_block(dag: &Dag, target: &dyn Target, next_vreg: &mut u32) -> CodegenResult<Selection> {
    let tiles = target.tiles();
    let uses = count_uses(dag);
    let order = dag.postorder();

    let mut cost_of: HashMap<NodeId, u32> = HashMap::new();
    let mut choice_of: HashMap<NodeId, Choice> = HashMap::new();

    for &id in &order {
        let kind = &dag.node(id).kind;
        if !matches!(kind, NodeKind::Const { .. } | NodeKind::Binary { .. } | NodeKind::Load { .. }) {
            continue;
        }
        let choice = pick_tile(dag, id, tiles, &uses, &cost_of).ok_or_else(|| CodegenError::NoMatchingTile {
            opcode: format!("{}", kind),
            ty: kind.ty().unwrap_or(crate::ir::Type::I32),
        })?;
        cost_of.insert(id, choice.cost);
        choice_of.insert(id, choice);
    }

    let mut needed: std::collections::HashSet<NodeId> = std::collections::HashSet::new();
    for choice in choice_of.values() {
        needed.extend(choice.leaves.iter().copied());
    }
    for &id in &order {
        let node = dag.node(id);
        match &node.kind {
            NodeKind::Store | NodeKind::Call { .. } | NodeKind::BlockExit => {
                needed.extend(node.operands.iter().copied());
            }
            _ => {}
        }
    }

    let mut vreg_of: HashMap<NodeId, VReg> = HashMap::new();

    let mut param_vregs = Vec::new();
    for &param_node in &dag.params {
        let v: VReg = fresh_vreg(next_vreg);
        vreg_of.insert(param_node, v);
        param_vregs.push(v);
    }

    let mut insts = Vec::new();

    for &id in &order {
        let node = dag.node(id);
        match &node.kind {
            NodeKind::EntryToken | NodeKind::Param { .. } => continue,
            NodeKind::Const { .. } | NodeKind::Binary { .. } | NodeKind::Load { .. } => {
                if !needed.contains(&id) {
                    // Folded entirely into its sole consumer's tile.
                    continue;
                }
                let choice = &choice_of[&id];
                let result = fresh_vreg(next_vreg);
                vreg_of.insert(id, result);
                let inputs: Vec<VReg> = choice.leaves.iter().map(|l| vreg_of[l]).collect();
                let tile_match = TileMatch {
                    result: Some(result),
                    inputs,
                    imm: choice.imm,
                };
                insts.extend((tiles[choice.tile].emit)(&tile_match));
            }
            NodeKind::Store => {
                let ptr = vreg_of[&node.operands[0]];
                let value = vreg_of[&node.operands[1]];
                insts.push(AbstractInst::new("st").with_uses(vec![ptr, value]));
            }
            NodeKind::Call { callee, has_result } => {
                let args: Vec<VReg> = node.operands.iter().map(|o| vreg_of[o]).collect();
                let result = if *has_result {
                    let v = fresh_vreg(next_vreg);
                    vreg_of.insert(id, v);
                    Some(v)
                } else {
                    None
                };
                insts.extend(target.emit_call(callee, &args, result));
            }
            NodeKind::BlockExit => {
                // The driver lowers the actual terminator (return/jump/
                // branch) once register allocation has picked concrete
                // registers; every exit operand is guaranteed a vreg by
                // having been added to `needed` above.
            }
        }
    }

    let value_vregs: HashMap<Value, VReg> = dag
        .value_nodes
        .iter()
        .filter_map(|(&value, node)| vreg_of.get(node).map(|&v| (value, v)))
        .collect();

    Ok(Selection {
        insts,
        param_vregs,
        value_vregs,
    })
}
