//! Selection DAG node kinds (spec.md §4.2).

use crate::ir::{BinOp, Type};
use cg_entity::entity_impl;
use std::fmt;

/// A reference to a node in a [`super::Dag`].
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);
entity_impl!(NodeId, "dag");

/// What a DAG node computes. Mirrors `InstructionData` plus the leaves and
/// the distinguished block-exit node that do not exist in the linear IR.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// The block's incoming chain token; the root of every chain edge.
    EntryToken,
    /// A typed integer constant.
    Const { ty: Type, imm: i64 },
    /// The `index`-th incoming block parameter, of type `ty`.
    Param { ty: Type, index: usize },
    /// A binary operator over two operand nodes of the same type.
    Binary { op: BinOp, ty: Type },
    /// A memory load of type `ty`; threaded onto the chain.
    Load { ty: Type },
    /// A memory store; threaded onto the chain, produces no value.
    Store,
    /// A direct call; threaded onto the chain. `has_result` tells the
    /// selector whether this node produces a value operand for users.
    Call { callee: String, has_result: bool },
    /// The block's single exit: consumes the final chain state plus every
    /// value the terminator reads. Never has a value result of its own.
    BlockExit,
}

impl NodeKind {
    pub fn ty(&self) -> Option<Type> {
        match self {
            NodeKind::Const { ty, .. } | NodeKind::Param { ty, .. } | NodeKind::Binary { ty, .. } | NodeKind::Load { ty } => {
                Some(*ty)
            }
            NodeKind::Call { has_result, .. } if *has_result => None,
            NodeKind::EntryToken | NodeKind::Store | NodeKind::Call { .. } | NodeKind::BlockExit => None,
        }
    }

    pub fn has_side_effect(&self) -> bool {
        matches!(self, NodeKind::Load { .. } | NodeKind::Store | NodeKind::Call { .. })
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            NodeKind::EntryToken => write!(f, "entry"),
            NodeKind::Const { ty, imm } => write!(f, "const.{} {}", ty, imm),
            NodeKind::Param { ty, index } => write!(f, "param.{} {}", ty, index),
            NodeKind::Binary { op, ty } => write!(f, "{}.{}", op, ty),
            NodeKind::Load { ty } => write!(f, "load.{}", ty),
            NodeKind::Store => write!(f, "store"),
            NodeKind::Call { callee, .. } => write!(f, "call {}", callee),
            NodeKind::BlockExit => write!(f, "exit"),
        }
    }
}

/// One DAG node: its operation and its operand edges, in operand order.
/// `chain_in`, when present, is an extra edge ordering this node after the
/// last side-effecting node that precedes it in program order.
#[derive(Debug, Clone)]
pub struct DagNode {
    pub kind: NodeKind,
    pub operands: Vec<NodeId>,
    pub chain_in: Option<NodeId>,
}
