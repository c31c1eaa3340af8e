//! Structural IR verification (spec.md §4.6 step 1, §9 resolution).
//!
//! Checks structural invariants, def-before-use, and type consistency.
//! Runs once at the top of the driver; in `verifier.strict` mode (the
//! default) findings are fatal `IRStructureError`s, otherwise they are
//! logged as warnings and compilation proceeds.

use crate::ir::{BinOp, Function, InstructionData, Module, Terminator, Type, ValueDef, Value};
use crate::result::{CodegenError, CodegenResult};
use std::collections::HashSet;

/// One verifier finding, before it is turned into a fatal error or a
/// logged warning depending on `verifier.strict`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifierIssue {
    pub detail: String,
}

/// Verify every function in `module`. In strict mode the first issue found
/// is returned as an `IRStructureError`; otherwise every issue is logged
/// as a warning and verification always succeeds.
pub fn verify_module(module: &Module, strict: bool) -> CodegenResult<()> {
    for function in &module.functions {
        verify_function(function, strict)?;
    }
    Ok(())
}

pub fn verify_function(function: &Function, strict: bool) -> CodegenResult<()> {
    let issues = collect_issues(function);
    if issues.is_empty() {
        return Ok(());
    }
    if strict {
        let first = issues.into_iter().next().unwrap();
        return Err(CodegenError::IRStructureError {
            function: function.name.clone(),
            detail: first.detail,
        });
    }
    for issue in &issues {
        log::warn!("verifier: {}: {}", function.name, issue.detail);
    }
    Ok(())
}

fn collect_issues(function: &Function) -> Vec<VerifierIssue> {
    let mut issues = Vec::new();

    // Every block must have a terminator.
    for &block in &function.block_order {
        if function.block(block).terminator.is_none() {
            issues.push(VerifierIssue {
                detail: format!("block {} has no terminator", block),
            });
        }
    }
    if !issues.is_empty() {
        // A missing terminator makes every other check below unreliable
        // (no well-defined successor set, no argument list).
        return issues;
    }

    // def-before-use, approximated by declaration order: a value may be
    // used if it is a parameter of the current or an earlier block, or the
    // result of an instruction that appears earlier in the current block's
    // instruction list, or in any earlier block.
    let block_index: std::collections::HashMap<_, _> = function
        .block_order
        .iter()
        .enumerate()
        .map(|(i, b)| (*b, i))
        .collect();

    for &block in &function.block_order {
        let mut defined: HashSet<Value> = function.block(block).params.iter().copied().collect();
        for &earlier in &function.block_order {
            if block_index[&earlier] >= block_index[&block] {
                continue;
            }
            defined.extend(function.block(earlier).params.iter().copied());
            for &inst in &function.block(earlier).insts {
                if let Some(v) = function.inst_result(inst) {
                    defined.insert(v);
                }
            }
        }

        for &inst in &function.block(block).insts {
            let data = function.inst(inst);
            for used in data.arguments() {
                if !defined.contains(&used) {
                    issues.push(VerifierIssue {
                        detail: format!("use of {} before its definition in {}", used, block),
                    });
                }
            }
            if let Some(issue) = check_types(function, data) {
                issues.push(issue);
            }
            if let Some(v) = function.inst_result(inst) {
                defined.insert(v);
            }
        }

        let terminator = function.terminator(block);
        for used in terminator.arguments() {
            if !defined.contains(&used) {
                issues.push(VerifierIssue {
                    detail: format!("use of {} before its definition in {}'s terminator", used, block),
                });
            }
        }
        for successor in terminator.successors() {
            let arity = match terminator {
                Terminator::Jump { target, args } if *target == successor => args.len(),
                Terminator::Branch {
                    then_block,
                    then_args,
                    else_block,
                    else_args,
                    ..
                } => {
                    if successor == *then_block {
                        then_args.len()
                    } else if successor == *else_block {
                        else_args.len()
                    } else {
                        continue;
                    }
                }
                _ => continue,
            };
            let expected = function.block(successor).params.len();
            if arity != expected {
                issues.push(VerifierIssue {
                    detail: format!(
                        "{} passes {} argument(s) to {}, which expects {}",
                        block, arity, successor, expected
                    ),
                });
            }
        }
    }

    issues
}

fn check_types(function: &Function, data: &InstructionData) -> Option<VerifierIssue> {
    match data {
        InstructionData::Binary { op, lhs, rhs } => {
            let lt = function.value_type(*lhs);
            let rt = function.value_type(*rhs);
            if lt != rt {
                return Some(VerifierIssue {
                    detail: format!("binary {} operand type mismatch: {} vs {}", op, lt, rt),
                });
            }
            if matches!(op, BinOp::IcmpEq | BinOp::IcmpNe | BinOp::IcmpLt) && lt.is_float() {
                return Some(VerifierIssue {
                    detail: format!("comparison {} does not accept float operands", op),
                });
            }
            None
        }
        InstructionData::Load { ptr } | InstructionData::Store { ptr, .. } => {
            if function.value_type(*ptr) != Type::Ptr {
                Some(VerifierIssue {
                    detail: "memory operation's address operand is not of type ptr".to_string(),
                })
            } else {
                None
            }
        }
        InstructionData::IConst { .. } | InstructionData::Call { .. } => None,
    }
}

/// Used by `ValueDef` matches in diagnostics that want to name where a
/// value came from; kept here so the verifier and the DAG builder agree on
/// vocabulary.
pub fn describe_def(function: &Function, value: Value) -> String {
    match function.value_def(value) {
        ValueDef::Result(inst) => format!("result of {:?}", inst),
        ValueDef::BlockParam(block, idx) => format!("param {} of {}", idx, block),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::BinOp;

    #[test]
    fn missing_terminator_is_an_error() {
        let f = Function::new("f");
        // No terminator set on the entry block.
        let err = verify_function(&f, true).unwrap_err();
        assert!(matches!(err, CodegenError::IRStructureError { .. }));
    }

    #[test]
    fn well_formed_function_verifies() {
        let mut f = Function::new("g");
        let entry = f.entry;
        let a = f.append_block_param(entry, Type::I32);
        let b = f.append_block_param(entry, Type::I32);
        let t = f.binary(entry, BinOp::Add, Type::I32, a, b);
        f.set_terminator(entry, Terminator::Return(Some(t)));
        verify_function(&f, true).unwrap();
    }

    #[test]
    fn type_mismatch_is_an_error() {
        let mut f = Function::new("h");
        let entry = f.entry;
        let a = f.append_block_param(entry, Type::I32);
        let b = f.append_block_param(entry, Type::I64);
        let t = f.binary(entry, BinOp::Add, Type::I64, a, b);
        f.set_terminator(entry, Terminator::Return(Some(t)));
        let err = verify_function(&f, true).unwrap_err();
        assert!(matches!(err, CodegenError::IRStructureError { .. }));
    }

    #[test]
    fn non_strict_mode_never_fails() {
        let f = Function::new("i");
        verify_function(&f, false).unwrap();
    }
}
