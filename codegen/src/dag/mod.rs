//! Per-block selection DAG (spec.md §4.2): the IR is lowered into one DAG
//! per basic block, with value edges for data dependencies and chain edges
//! threading side-effecting nodes into their original program order.

pub mod builder;
pub mod node;

pub use builder::build_block_dag;
pub use node::{DagNode, NodeId, NodeKind};

use crate::ir::Value;
use cg_entity::{EntityRef, PrimaryMap};
use std::collections::HashMap;

/// The selection DAG for one basic block.
#[derive(Debug, Clone)]
pub struct Dag {
    pub(crate) nodes: PrimaryMap<NodeId, DagNode>,
    /// The distinguished block-exit node; every other live node is
    /// reachable from it by following value and chain edges.
    pub block_exit: NodeId,
    /// This block's incoming parameters, in declaration order, paired with
    /// the leaf node that represents each one.
    pub params: Vec<NodeId>,
    /// Every IR value defined in this block (its own params and its
    /// instructions' results), mapped to the node that computes it. Lets
    /// callers translate a terminator's `Value` operands back into DAG
    /// nodes after selection has assigned them registers.
    pub value_nodes: HashMap<Value, NodeId>,
}

impl Dag {
    pub fn node(&self, id: NodeId) -> &DagNode {
        &self.nodes[id]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes in a topological order consistent with both value and chain
    /// edges (post-order from the block-exit node), suitable for bottom-up
    /// tiling.
    pub fn postorder(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut visited = vec![false; self.nodes.len()];
        let mut stack = vec![(self.block_exit, false)];
        while let Some((id, expanded)) = stack.pop() {
            if visited[id.index()] {
                continue;
            }
            if expanded {
                visited[id.index()] = true;
                order.push(id);
                continue;
            }
            stack.push((id, true));
            let node = &self.nodes[id];
            for &operand in &node.operands {
                if !visited[operand.index()] {
                    stack.push((operand, false));
                }
            }
            if let Some(chain) = node.chain_in {
                if !visited[chain.index()] {
                    stack.push((chain, false));
                }
            }
        }
        order
    }
}
