//! IR instruction payloads and block terminators.

use crate::ir::entities::{Block, Value};
use std::fmt;

/// A binary arithmetic or comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    IcmpEq,
    IcmpNe,
    IcmpLt,
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            BinOp::Add => "add",
            BinOp::Sub => "sub",
            BinOp::Mul => "mul",
            BinOp::IcmpEq => "icmp_eq",
            BinOp::IcmpNe => "icmp_ne",
            BinOp::IcmpLt => "icmp_lt",
        };
        write!(f, "{}", s)
    }
}

/// A single IR instruction's operation and operands. Every instruction has
/// a stable `Inst` identity (used for value-numbering in the DAG builder)
/// and produces at most one `Value`.
#[derive(Debug, Clone)]
pub enum InstructionData {
    /// A typed integer constant.
    IConst { imm: i64 },
    /// A binary operator over two values of the same type.
    Binary { op: BinOp, lhs: Value, rhs: Value },
    /// A memory load through a pointer value.
    Load { ptr: Value },
    /// A memory store of `value` through `ptr`. Produces no result.
    Store { ptr: Value, value: Value },
    /// A direct call. Produces a result only if `has_result` was set when
    /// the instruction was appended (a `void`-returning callee produces
    /// none).
    Call { callee: String, args: Vec<Value> },
}

impl InstructionData {
    /// The operand values this instruction reads, in operand order.
    pub fn arguments(&self) -> Vec<Value> {
        match self {
            InstructionData::IConst { .. } => vec![],
            InstructionData::Binary { lhs, rhs, .. } => vec![*lhs, *rhs],
            InstructionData::Load { ptr } => vec![*ptr],
            InstructionData::Store { ptr, value } => vec![*ptr, *value],
            InstructionData::Call { args, .. } => args.clone(),
        }
    }

    /// Does evaluating this instruction read or write memory (and thus
    /// need to be threaded onto the DAG's chain)?
    pub fn has_side_effect(&self) -> bool {
        matches!(
            self,
            InstructionData::Load { .. } | InstructionData::Store { .. } | InstructionData::Call { .. }
        )
    }
}

/// How a basic block ends. Every block has exactly one terminator, which
/// never appears in the block's linear instruction list.
#[derive(Debug, Clone)]
pub enum Terminator {
    /// Return from the function, optionally with a value.
    Return(Option<Value>),
    /// Unconditional control transfer, passing `args` as the target
    /// block's parameters.
    Jump { target: Block, args: Vec<Value> },
    /// Conditional control transfer: branch to `then_block` if `cond` is
    /// nonzero, `else_block` otherwise.
    Branch {
        cond: Value,
        then_block: Block,
        then_args: Vec<Value>,
        else_block: Block,
        else_args: Vec<Value>,
    },
}

impl Terminator {
    /// The value(s) a terminator consumes directly (branch condition,
    /// return value) -- these get wired to the DAG's distinguished
    /// block-exit node.
    pub fn arguments(&self) -> Vec<Value> {
        match self {
            Terminator::Return(Some(v)) => vec![*v],
            Terminator::Return(None) => vec![],
            Terminator::Jump { args, .. } => args.clone(),
            Terminator::Branch {
                cond,
                then_args,
                else_args,
                ..
            } => {
                let mut vs = vec![*cond];
                vs.extend(then_args.iter().copied());
                vs.extend(else_args.iter().copied());
                vs
            }
        }
    }

    pub fn successors(&self) -> Vec<Block> {
        match self {
            Terminator::Return(_) => vec![],
            Terminator::Jump { target, .. } => vec![*target],
            Terminator::Branch {
                then_block,
                else_block,
                ..
            } => vec![*then_block, *else_block],
        }
    }
}
