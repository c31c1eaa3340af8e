//! Top-level orchestration (spec.md §4.6): verify once, then for each
//! function split its blocks, build a DAG per block, select instructions,
//! wire up block-parameter passing as explicit moves, allocate registers,
//! and render the result. Modeled directly on a classic single-pass
//! per-function code generator driver.

use crate::binemit::{render_instruction, FunctionOutputStream};
use crate::dag::build_block_dag;
use crate::frame::Frame;
use crate::ir::{block_label, Block, Function, Module, Terminator, Value};
use crate::isel::select_block;
use crate::regalloc::{self, BlockRange};
use crate::result::{CodegenError, CodegenResult};
use crate::settings::Settings;
use crate::splitter::split_function;
use crate::verifier::verify_module;
use crate::isa::{AbstractInst, PReg, Target, VReg};
use std::collections::HashMap;

fn fresh_vreg(next: &mut u32) -> VReg {
    let v = cg_entity::EntityRef::new(*next as usize);
    *next += 1;
    v
}

struct PendingBlock {
    label: String,
    insts: Vec<AbstractInst>,
    successors: Vec<String>,
    /// Whether this block's last instruction is the function's return, so
    /// the epilogue can be spliced in immediately before it.
    is_return: bool,
}

/// Compile every function in `module` against `target`, writing assembly
/// text to `out`. Globals are emitted first, as size-only declarations;
/// the core has no notion of an initializer.
pub fn compile_module(module: &Module, target: &dyn Target, settings: &Settings, out: &mut dyn FunctionOutputStream) -> CodegenResult<()> {
    verify_module(module, settings.verifier_strict())?;

    out.select_section("data");
    for global in &module.globals {
        out.emit_label(&global.name);
        out.emit_instruction(&format!(".space {}", global.size));
    }

    out.select_section("code");
    let mut first_error = None;
    for function in &module.functions {
        if let Err(e) = compile_function(function, target, settings, out) {
            let e = e.into_compilation_error(&function.name);
            log::warn!("{}", e);
            first_error.get_or_insert(e);
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

fn compile_function(function: &Function, target: &dyn Target, settings: &Settings, out: &mut dyn FunctionOutputStream) -> CodegenResult<()> {
    let mut function = function.clone();
    split_function(&mut function, target.max_block_len());

    let labels: HashMap<Block, String> = function
        .block_order
        .iter()
        .map(|&b| (b, block_label(&function.name, &function, b)))
        .collect();

    let mut next_vreg: u32 = 0;
    let mut selections = HashMap::new();
    for &block in &function.block_order {
        let dag = build_block_dag(&function, block);
        let selection = select_block(&dag, target, &mut next_vreg)?;
        selections.insert(block, selection);
    }

    let mut precolored: HashMap<VReg, PReg> = HashMap::new();
    let entry_params = &selections[&function.entry].param_vregs;
    if entry_params.len() > target.abi_arg_registers().len() {
        return Err(CodegenError::TargetContractViolation(format!(
            "{} takes {} arguments but target exposes only {} argument registers",
            function.name,
            entry_params.len(),
            target.abi_arg_registers().len()
        )));
    }
    for (param, &reg) in entry_params.iter().zip(target.abi_arg_registers()) {
        precolored.insert(*param, reg);
    }

    let mut pending = Vec::new();
    for &block in &function.block_order {
        let label = labels[&block].clone();
        let is_return = matches!(function.terminator(block), Terminator::Return(_));
        let selection = &selections[&block];
        let mut insts = selection.insts.clone();
        let mut successors = Vec::new();
        let mut extra = lower_terminator(
            &function,
            block,
            &labels,
            &selections,
            target,
            &label,
            &mut insts,
            &mut successors,
            &mut next_vreg,
            &mut precolored,
        );
        pending.push(PendingBlock {
            label,
            insts,
            successors,
            is_return,
        });
        pending.append(&mut extra);
    }

    let label_index: HashMap<String, usize> = pending.iter().enumerate().map(|(i, p)| (p.label.clone(), i)).collect();

    let mut instructions = Vec::new();
    let mut blocks = Vec::new();
    for block in &pending {
        let start = instructions.len();
        instructions.extend(block.insts.iter().cloned());
        let end = instructions.len();
        let successors = block.successors.iter().map(|s| label_index[s]).collect();
        blocks.push(BlockRange { start, end, successors });
    }

    let coalesce = matches!(settings.coalescing(), crate::settings::Coalescing::Conservative);
    let mut frame = Frame::new(function.name.clone());
    let (instructions, blocks, colors) = regalloc::allocate(instructions, blocks, &precolored, target, &mut frame, coalesce)?;

    let mut block_of = vec![0usize; instructions.len()];
    for (bi, b) in blocks.iter().enumerate() {
        for i in b.start..b.end {
            block_of[i] = bi;
        }
    }

    let frame_size = frame.size();
    out.emit_label(&pending[0].label);
    for inst in target.emit_prologue(frame_size) {
        out.emit_instruction(&render(target, &inst, &colors));
    }

    let mut current_block = usize::MAX;
    for (idx, inst) in instructions.iter().enumerate() {
        let bi = block_of[idx];
        if bi != current_block {
            if bi != 0 {
                out.emit_label(&pending[bi].label);
            }
            current_block = bi;
        }
        if pending[bi].is_return && idx + 1 == blocks[bi].end {
            for epilogue_inst in target.emit_epilogue(frame_size) {
                out.emit_instruction(&render(target, &epilogue_inst, &colors));
            }
        }
        if is_redundant_move(inst, &colors) {
            continue;
        }
        out.emit_instruction(&render(target, inst, &colors));
    }

    Ok(())
}

/// A coalesced copy whose def and sole use landed in the same physical
/// register: the allocator already merged them, so the copy itself is
/// dead weight (spec.md §8 property 5).
fn is_redundant_move(inst: &AbstractInst, colors: &HashMap<VReg, PReg>) -> bool {
    inst.is_move && inst.def.map(|d| colors[&d]) == inst.uses.first().map(|u| colors[u])
}

fn render(target: &dyn Target, inst: &AbstractInst, colors: &HashMap<VReg, PReg>) -> String {
    let def = inst.def.map(|v| colors[&v]);
    let uses: Vec<PReg> = inst.uses.iter().map(|v| colors[v]).collect();
    render_instruction(target, &inst.mnemonic, def, &uses, inst.imm)
}

#[allow(clippy::too_many_arguments)]
fn lower_terminator(
    function: &Function,
    block: Block,
    labels: &HashMap<Block, String>,
    selections: &HashMap<Block, crate::isel::Selection>,
    target: &dyn Target,
    own_label: &str,
    insts: &mut Vec<AbstractInst>,
    successors: &mut Vec<String>,
    next_vreg: &mut u32,
    precolored: &mut HashMap<VReg, PReg>,
) -> Vec<PendingBlock> {
    let selection = &selections[&block];
    let value_vreg = |v: Value| selection.value_vregs[&v];

    match function.terminator(block) {
        Terminator::Return(v) => {
            // Move the result into a fresh vreg precolored to the ABI
            // return register, so the allocator places it there instead
            // of wherever selection happened to land it.
            let result = v.map(|v| {
                let src = value_vreg(v);
                let dst = fresh_vreg(next_vreg);
                precolored.insert(dst, target.abi_return_register());
                insts.push(target.emit_move(dst, src));
                dst
            });
            insts.extend(target.emit_return(result));
            Vec::new()
        }
        Terminator::Jump { target: dest, args } => {
            insts.extend(build_moves(target, args, &value_vreg, &selections[dest].param_vregs));
            insts.push(target.emit_jump(&labels[dest]));
            successors.push(labels[dest].clone());
            Vec::new()
        }
        Terminator::Branch {
            cond,
            then_block,
            then_args,
            else_block,
            else_args,
        } => {
            let cond_vreg = value_vreg(*cond);
            if then_args.is_empty() && else_args.is_empty() {
                insts.push(target.emit_branch(cond_vreg, &labels[then_block]));
                insts.push(target.emit_jump(&labels[else_block]));
                successors.push(labels[then_block].clone());
                successors.push(labels[else_block].clone());
                Vec::new()
            } else {
                let then_label = format!("{}__then", own_label);
                let else_label = format!("{}__else", own_label);
                insts.push(target.emit_branch(cond_vreg, &then_label));
                insts.push(target.emit_jump(&else_label));
                successors.push(then_label.clone());
                successors.push(else_label.clone());

                let then_moves = build_moves(target, then_args, &value_vreg, &selections[then_block].param_vregs);
                let else_moves = build_moves(target, else_args, &value_vreg, &selections[else_block].param_vregs);
                vec![
                    PendingBlock {
                        label: then_label,
                        insts: {
                            let mut v = then_moves;
                            v.push(target.emit_jump(&labels[then_block]));
                            v
                        },
                        successors: vec![labels[then_block].clone()],
                        is_return: false,
                    },
                    PendingBlock {
                        label: else_label,
                        insts: {
                            let mut v = else_moves;
                            v.push(target.emit_jump(&labels[else_block]));
                            v
                        },
                        successors: vec![labels[else_block].clone()],
                        is_return: false,
                    },
                ]
            }
        }
    }
}

fn build_moves(target: &dyn Target, args: &[Value], value_vreg: &dyn Fn(Value) -> VReg, dst_params: &[VReg]) -> Vec<AbstractInst> {
    args.iter()
        .zip(dst_params)
        .filter_map(|(&a, &dst)| {
            let src = value_vreg(a);
            if src == dst {
                None
            } else {
                Some(target.emit_move(dst, src))
            }
        })
        .collect()
}
