//! The "dagger": lowers one basic block's linear IR into a [`Dag`]
//! (spec.md §4.2).
//!
//! Pure-value nodes are shared by structural identity (classic CSE: same
//! operator, same operand nodes, same type yields the same node). Nodes
//! with a side effect are never shared, and are threaded onto a chain so
//! the selector and scheduler can't reorder loads around stores or calls.

use super::node::{DagNode, NodeKind};
use super::{Dag, NodeId};
use crate::ir::{Block, Function, InstructionData, Value};
use cg_entity::PrimaryMap;
use std::collections::HashMap;

/// CSE is keyed on a node's kind plus its operand identities: two
/// instructions produce the same node only if both match exactly.
type CseKey = (NodeKind, Vec<NodeId>);

struct Builder<'f> {
    function: &'f Function,
    nodes: PrimaryMap<NodeId, DagNode>,
    cse: HashMap<CseKey, NodeId>,
    value_nodes: HashMap<Value, NodeId>,
    chain: Option<NodeId>,
}

impl<'f> Builder<'f> {
    fn new(function: &'f Function) -> Self {
        Builder {
            function,
            nodes: PrimaryMap::new(),
            cse: HashMap::new(),
            value_nodes: HashMap::new(),
            chain: None,
        }
    }

    /// Insert a node, deduplicating pure (non-side-effecting) nodes by
    /// structural identity. Side-effecting nodes always get a fresh
    /// identity and advance the chain.
    fn insert(&mut self, kind: NodeKind, operands: Vec<NodeId>) -> NodeId {
        if kind.has_side_effect() {
            let chain_in = self.chain;
            let id = self.nodes.push(DagNode {
                kind,
                operands,
                chain_in,
            });
            self.chain = Some(id);
            return id;
        }
        let key = (kind.clone(), operands.clone());
        if let Some(&existing) = self.cse.get(&key) {
            return existing;
        }
        let id = self.nodes.push(DagNode {
            kind,
            operands,
            chain_in: None,
        });
        self.cse.insert(key, id);
        id
    }

    fn operand(&self, value: Value) -> NodeId {
        *self
            .value_nodes
            .get(&value)
            .expect("operand value defined earlier in this block or as a block param")
    }

    fn lower_inst(&mut self, inst_data: &InstructionData) -> (NodeKind, Vec<NodeId>) {
        match inst_data {
            InstructionData::IConst { imm } => (NodeKind::Const { ty: crate::ir::Type::I32, imm: *imm }, vec![]),
            InstructionData::Binary { op, lhs, rhs } => {
                (NodeKind::Binary { op: *op, ty: crate::ir::Type::I32 }, vec![self.operand(*lhs), self.operand(*rhs)])
            }
            InstructionData::Load { ptr } => (NodeKind::Load { ty: crate::ir::Type::I32 }, vec![self.operand(*ptr)]),
            InstructionData::Store { ptr, value } => (NodeKind::Store, vec![self.operand(*ptr), self.operand(*value)]),
            InstructionData::Call { callee, args } => (
                NodeKind::Call {
                    callee: callee.clone(),
                    has_result: false,
                },
                args.iter().map(|a| self.operand(*a)).collect(),
            ),
        }
    }
}

/// Build the selection DAG for `block` of `function`.
pub fn build_block_dag(function: &Function, block: Block) -> Dag {
    let mut builder = Builder::new(function);

    let entry_token = builder.insert(NodeKind::EntryToken, vec![]);
    builder.chain = Some(entry_token);

    let block_data = function.block(block);

    let mut params = Vec::with_capacity(block_data.params.len());
    for (index, &value) in block_data.params.iter().enumerate() {
        let ty = function.value_type(value);
        let node = builder.insert(NodeKind::Param { ty, index }, vec![]);
        builder.value_nodes.insert(value, node);
        params.push(node);
    }

    for &inst in &block_data.insts {
        let data = function.inst(inst);
        let has_result = function.inst_result(inst).is_some();
        let result_ty = function.inst_result(inst).map(|v| function.value_type(v));

        let (mut kind, operands) = builder.lower_inst(data);
        if let Some(ty) = result_ty {
            kind = retype(kind, ty);
        }
        if let NodeKind::Call { callee, .. } = &kind {
            kind = NodeKind::Call {
                callee: callee.clone(),
                has_result,
            };
        }

        let node = builder.insert(kind, operands);
        if let Some(value) = function.inst_result(inst) {
            builder.value_nodes.insert(value, node);
        }
    }

    let terminator = function.terminator(block);
    let exit_operands: Vec<NodeId> = terminator.arguments().iter().map(|&v| builder.operand(v)).collect();
    let block_exit = builder.nodes.push(DagNode {
        kind: NodeKind::BlockExit,
        operands: exit_operands,
        chain_in: builder.chain,
    });

    Dag {
        nodes: builder.nodes,
        block_exit,
        params,
        value_nodes: builder.value_nodes,
    }
}

fn retype(kind: NodeKind, ty: crate::ir::Type) -> NodeKind {
    match kind {
        NodeKind::Const { imm, .. } => NodeKind::Const { ty, imm },
        NodeKind::Binary { op, .. } => NodeKind::Binary { op, ty },
        NodeKind::Load { .. } => NodeKind::Load { ty },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{BinOp, Terminator, Type};

    #[test]
    fn common_subexpressions_share_a_node() {
        let mut f = Function::new("f");
        let entry = f.entry;
        let a = f.append_block_param(entry, Type::I32);
        let b = f.append_block_param(entry, Type::I32);
        let sum1 = f.binary(entry, BinOp::Add, Type::I32, a, b);
        let sum2 = f.binary(entry, BinOp::Add, Type::I32, a, b);
        let total = f.binary(entry, BinOp::Add, Type::I32, sum1, sum2);
        f.set_terminator(entry, Terminator::Return(Some(total)));

        let dag = build_block_dag(&f, entry);
        // sum1 and sum2 collapse to one node: total's two operands are equal.
        let exit = dag.node(dag.block_exit);
        let total_node_id = exit.operands[0];
        let total_node = dag.node(total_node_id);
        assert_eq!(total_node.operands[0], total_node.operands[1]);
    }

    #[test]
    fn loads_and_stores_stay_chained_in_program_order() {
        let mut f = Function::new("g");
        let entry = f.entry;
        let ptr = f.append_block_param(entry, Type::Ptr);
        let v = f.append_block_param(entry, Type::I32);
        f.store(entry, ptr, v);
        let loaded = f.load(entry, Type::I32, ptr);
        f.set_terminator(entry, Terminator::Return(Some(loaded)));

        let dag = build_block_dag(&f, entry);
        let exit = dag.node(dag.block_exit);
        let load_node_id = exit.operands[0];
        let load_node = dag.node(load_node_id);
        let store_node_id = load_node.chain_in.expect("load is chained after the store");
        assert!(matches!(dag.node(store_node_id).kind, NodeKind::Store));
    }

    #[test]
    fn postorder_lists_operands_before_users() {
        let mut f = Function::new("h");
        let entry = f.entry;
        let a = f.append_block_param(entry, Type::I32);
        let one = f.iconst(entry, Type::I32, 1);
        let sum = f.binary(entry, BinOp::Add, Type::I32, a, one);
        f.set_terminator(entry, Terminator::Return(Some(sum)));

        let dag = build_block_dag(&f, entry);
        let order = dag.postorder();
        let pos = |id: NodeId| order.iter().position(|&n| n == id).unwrap();
        assert!(pos(dag.block_exit) == order.len() - 1);
    }
}
