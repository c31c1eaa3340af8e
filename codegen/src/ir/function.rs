//! The IR function and module data model (spec.md §3).

use crate::ir::entities::{Block, Inst, Value};
use crate::ir::instruction::{BinOp, InstructionData, Terminator};
use crate::ir::types::Type;
use cg_entity::PrimaryMap;
use std::collections::HashMap;

/// Where a `Value` comes from.
#[derive(Debug, Clone, Copy)]
pub enum ValueDef {
    /// The result of an instruction.
    Result(Inst),
    /// The `index`-th parameter of `block`.
    BlockParam(Block, usize),
}

#[derive(Debug, Clone)]
struct ValueData {
    ty: Type,
    def: ValueDef,
}

/// One basic block: an ordered parameter list, a linear instruction
/// sequence, and exactly one terminator.
#[derive(Debug, Clone)]
pub struct BlockData {
    pub params: Vec<Value>,
    pub insts: Vec<Inst>,
    pub terminator: Option<Terminator>,
}

impl BlockData {
    fn new() -> Self {
        BlockData {
            params: Vec::new(),
            insts: Vec::new(),
            terminator: None,
        }
    }
}

/// One function: an ordered list of basic blocks, the first of which is
/// the entry, each holding a linear instruction sequence and a terminator.
#[derive(Debug, Clone)]
pub struct Function {
    pub name: String,
    pub entry: Block,
    pub block_order: Vec<Block>,
    pub(crate) blocks: PrimaryMap<Block, BlockData>,
    pub(crate) insts: PrimaryMap<Inst, InstructionData>,
    values: PrimaryMap<Value, ValueData>,
    inst_results: HashMap<Inst, Value>,
}

impl Function {
    pub fn new(name: impl Into<String>) -> Self {
        let mut blocks = PrimaryMap::new();
        let entry = blocks.push(BlockData::new());
        Function {
            name: name.into(),
            entry,
            block_order: vec![entry],
            blocks,
            insts: PrimaryMap::new(),
            values: PrimaryMap::new(),
            inst_results: HashMap::new(),
        }
    }

    pub fn block(&self, block: Block) -> &BlockData {
        &self.blocks[block]
    }

    pub fn inst(&self, inst: Inst) -> &InstructionData {
        &self.insts[inst]
    }

    pub fn value_type(&self, value: Value) -> Type {
        self.values[value].ty
    }

    pub fn value_def(&self, value: Value) -> ValueDef {
        self.values[value].def
    }

    pub fn inst_result(&self, inst: Inst) -> Option<Value> {
        self.inst_results.get(&inst).copied()
    }

    pub fn terminator(&self, block: Block) -> &Terminator {
        self.blocks[block]
            .terminator
            .as_ref()
            .expect("block verified to have a terminator before this is called")
    }

    /// Create a new, empty block and append it to the function.
    pub fn create_block(&mut self) -> Block {
        let block = self.blocks.push(BlockData::new());
        self.block_order.push(block);
        block
    }

    /// Append a parameter of type `ty` to `block`, returning the fresh
    /// value that names it.
    pub fn append_block_param(&mut self, block: Block, ty: Type) -> Value {
        let index = self.blocks[block].params.len();
        let value = self.values.push(ValueData {
            ty,
            def: ValueDef::BlockParam(block, index),
        });
        self.blocks[block].params.push(value);
        value
    }

    fn append_inst(&mut self, block: Block, data: InstructionData, result_ty: Option<Type>) -> Option<Value> {
        let inst = self.insts.push(data);
        self.blocks[block].insts.push(inst);
        let value = result_ty.map(|ty| {
            let v = self.values.push(ValueData {
                ty,
                def: ValueDef::Result(inst),
            });
            self.inst_results.insert(inst, v);
            v
        });
        value
    }

    pub fn iconst(&mut self, block: Block, ty: Type, imm: i64) -> Value {
        self.append_inst(block, InstructionData::IConst { imm }, Some(ty)).unwrap()
    }

    pub fn binary(&mut self, block: Block, op: BinOp, ty: Type, lhs: Value, rhs: Value) -> Value {
        self.append_inst(block, InstructionData::Binary { op, lhs, rhs }, Some(ty))
            .unwrap()
    }

    pub fn load(&mut self, block: Block, ty: Type, ptr: Value) -> Value {
        self.append_inst(block, InstructionData::Load { ptr }, Some(ty)).unwrap()
    }

    pub fn store(&mut self, block: Block, ptr: Value, value: Value) {
        self.append_inst(block, InstructionData::Store { ptr, value }, None);
    }

    /// A call that produces a result of type `ty`.
    pub fn call(&mut self, block: Block, ty: Type, callee: impl Into<String>, args: Vec<Value>) -> Value {
        self.append_inst(
            block,
            InstructionData::Call {
                callee: callee.into(),
                args,
            },
            Some(ty),
        )
        .unwrap()
    }

    /// A call with no result (a `void`-returning callee).
    pub fn call_void(&mut self, block: Block, callee: impl Into<String>, args: Vec<Value>) {
        self.append_inst(
            block,
            InstructionData::Call {
                callee: callee.into(),
                args,
            },
            None,
        );
    }

    pub fn set_terminator(&mut self, block: Block, terminator: Terminator) {
        self.blocks[block].terminator = Some(terminator);
    }

    /// Split the instruction list of `block` at position `at`, creating a
    /// new successor block that inherits the tail of the instruction list
    /// and the original terminator. `block` falls through unconditionally
    /// to the new block. Any value defined before `at` and used at or
    /// after it is carried across as a block parameter of the new block
    /// (spec.md §4.1: "defs live across the split become block arguments").
    pub fn split_block_at(&mut self, block: Block, at: usize) -> Block {
        let new_block = self.blocks.push(BlockData::new());

        let tail: Vec<Inst> = self.blocks[block].insts.split_off(at);
        let old_terminator = self
            .blocks[block]
            .terminator
            .take()
            .expect("block must have a terminator before splitting");

        // Find every value defined in the head that the tail (or the
        // carried-over terminator) still reads.
        let head_defs: std::collections::HashSet<Inst> = self.blocks[block].insts.iter().copied().collect();
        let mut candidates: Vec<Value> = Vec::new();
        for &inst in &tail {
            candidates.extend(self.insts[inst].arguments());
        }
        candidates.extend(old_terminator.arguments());

        let mut live_across: Vec<Value> = Vec::new();
        let mut seen = std::collections::HashSet::new();
        for v in candidates {
            let defined_in_head = matches!(self.values[v].def, ValueDef::Result(def_inst) if head_defs.contains(&def_inst));
            if defined_in_head && seen.insert(v) {
                live_across.push(v);
            }
        }

        // Bind fresh block parameters on the new block for each carried
        // value, and rewrite the tail + terminator to reference them.
        let mut rewrite: HashMap<Value, Value> = HashMap::new();
        for v in &live_across {
            let ty = self.values[*v].ty;
            let param = self.append_block_param(new_block, ty);
            rewrite.insert(*v, param);
        }
        for &inst in &tail {
            rewrite_inst_operands(&mut self.insts[inst], &rewrite);
        }
        let new_terminator = rewrite_terminator(old_terminator, &rewrite);

        self.blocks[new_block].insts = tail;
        self.blocks[new_block].terminator = Some(new_terminator);
        self.blocks[block].terminator = Some(Terminator::Jump {
            target: new_block,
            args: live_across,
        });

        let pos = self.block_order.iter().position(|b| *b == block).unwrap();
        self.block_order.insert(pos + 1, new_block);
        new_block
    }
}

fn rewrite_value(v: Value, rewrite: &HashMap<Value, Value>) -> Value {
    rewrite.get(&v).copied().unwrap_or(v)
}

fn rewrite_inst_operands(data: &mut InstructionData, rewrite: &HashMap<Value, Value>) {
    match data {
        InstructionData::IConst { .. } => {}
        InstructionData::Binary { lhs, rhs, .. } => {
            *lhs = rewrite_value(*lhs, rewrite);
            *rhs = rewrite_value(*rhs, rewrite);
        }
        InstructionData::Load { ptr } => *ptr = rewrite_value(*ptr, rewrite),
        InstructionData::Store { ptr, value } => {
            *ptr = rewrite_value(*ptr, rewrite);
            *value = rewrite_value(*value, rewrite);
        }
        InstructionData::Call { args, .. } => {
            for a in args.iter_mut() {
                *a = rewrite_value(*a, rewrite);
            }
        }
    }
}

fn rewrite_terminator(term: Terminator, rewrite: &HashMap<Value, Value>) -> Terminator {
    match term {
        Terminator::Return(v) => Terminator::Return(v.map(|v| rewrite_value(v, rewrite))),
        Terminator::Jump { target, args } => Terminator::Jump {
            target,
            args: args.into_iter().map(|v| rewrite_value(v, rewrite)).collect(),
        },
        Terminator::Branch {
            cond,
            then_block,
            then_args,
            else_block,
            else_args,
        } => Terminator::Branch {
            cond: rewrite_value(cond, rewrite),
            then_block,
            then_args: then_args.into_iter().map(|v| rewrite_value(v, rewrite)).collect(),
            else_block,
            else_args: else_args.into_iter().map(|v| rewrite_value(v, rewrite)).collect(),
        },
    }
}

/// A global variable declaration: a label and a size in bytes.
#[derive(Debug, Clone)]
pub struct GlobalVariable {
    pub name: String,
    pub size: u32,
}

/// An IR module: an ordered list of globals and functions.
#[derive(Debug, Clone, Default)]
pub struct Module {
    pub globals: Vec<GlobalVariable>,
    pub functions: Vec<Function>,
}

impl Module {
    pub fn new() -> Self {
        Self::default()
    }
}
