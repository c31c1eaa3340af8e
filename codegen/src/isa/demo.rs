//! A small reference target used to exercise the pipeline end to end
//! (spec.md §8 scenarios S1-S5). Three general-purpose registers, a tiny
//! tile set, and a two-register calling convention -- enough to force the
//! allocator to spill on anything non-trivial, which is the point.

use super::{AbstractInst, PReg, Target, VReg};
use crate::ir::BinOp;
use crate::isel::tile::{Pattern, Tile, TileMatch};
use once_cell::sync::Lazy;

fn li(m: &TileMatch) -> Vec<AbstractInst> {
    vec![AbstractInst::new("li").with_def(m.result.unwrap()).with_imm(m.imm.unwrap())]
}

fn binop_mnemonic(op: BinOp) -> &'static str {
    match op {
        BinOp::Add => "add",
        BinOp::Sub => "sub",
        BinOp::Mul => "mul",
        BinOp::IcmpEq => "cmpeq",
        BinOp::IcmpNe => "cmpne",
        BinOp::IcmpLt => "cmplt",
    }
}

macro_rules! binop_tile {
    ($fn_name:ident, $op:ident) => {
        fn $fn_name(m: &TileMatch) -> Vec<AbstractInst> {
            vec![AbstractInst::new(binop_mnemonic(BinOp::$op))
                .with_def(m.result.unwrap())
                .with_uses(m.inputs.clone())]
        }
    };
}

binop_tile!(emit_add, Add);
binop_tile!(emit_sub, Sub);
binop_tile!(emit_mul, Mul);
binop_tile!(emit_cmpeq, IcmpEq);
binop_tile!(emit_cmpne, IcmpNe);
binop_tile!(emit_cmplt, IcmpLt);

macro_rules! binop_imm_tile {
    ($fn_name:ident, $op:ident, $mnemonic:expr) => {
        fn $fn_name(m: &TileMatch) -> Vec<AbstractInst> {
            vec![AbstractInst::new($mnemonic)
                .with_def(m.result.unwrap())
                .with_uses(m.inputs.clone())
                .with_imm(m.imm.unwrap())]
        }
    };
}

binop_imm_tile!(emit_addi, Add, "addi");
binop_imm_tile!(emit_subi, Sub, "subi");

fn ld(m: &TileMatch) -> Vec<AbstractInst> {
    vec![AbstractInst::new("ld").with_def(m.result.unwrap()).with_uses(m.inputs.clone())]
}

static TILES: Lazy<Vec<Tile>> = Lazy::new(|| {
    vec![
        Tile {
            mnemonic: "li",
            pattern: Pattern::Const,
            cost: 1,
            emit: li,
        },
        Tile {
            mnemonic: "add",
            pattern: Pattern::Binary(BinOp::Add, Box::new(Pattern::Any), Box::new(Pattern::Any)),
            cost: 1,
            emit: emit_add,
        },
        Tile {
            mnemonic: "addi",
            pattern: Pattern::Binary(BinOp::Add, Box::new(Pattern::Any), Box::new(Pattern::Const)),
            cost: 1,
            emit: emit_addi,
        },
        Tile {
            mnemonic: "sub",
            pattern: Pattern::Binary(BinOp::Sub, Box::new(Pattern::Any), Box::new(Pattern::Any)),
            cost: 1,
            emit: emit_sub,
        },
        Tile {
            mnemonic: "subi",
            pattern: Pattern::Binary(BinOp::Sub, Box::new(Pattern::Any), Box::new(Pattern::Const)),
            cost: 1,
            emit: emit_subi,
        },
        Tile {
            mnemonic: "mul",
            pattern: Pattern::Binary(BinOp::Mul, Box::new(Pattern::Any), Box::new(Pattern::Any)),
            cost: 3,
            emit: emit_mul,
        },
        Tile {
            mnemonic: "cmpeq",
            pattern: Pattern::Binary(BinOp::IcmpEq, Box::new(Pattern::Any), Box::new(Pattern::Any)),
            cost: 1,
            emit: emit_cmpeq,
        },
        Tile {
            mnemonic: "cmpne",
            pattern: Pattern::Binary(BinOp::IcmpNe, Box::new(Pattern::Any), Box::new(Pattern::Any)),
            cost: 1,
            emit: emit_cmpne,
        },
        Tile {
            mnemonic: "cmplt",
            pattern: Pattern::Binary(BinOp::IcmpLt, Box::new(Pattern::Any), Box::new(Pattern::Any)),
            cost: 1,
            emit: emit_cmplt,
        },
        Tile {
            mnemonic: "ld",
            pattern: Pattern::Load(Box::new(Pattern::Any)),
            cost: 2,
            emit: ld,
        },
    ]
});

/// The demo target: `r0`-`r2`, `r0` doubling as the return register and
/// first argument register, `r1` as the second argument register.
pub struct DemoTarget;

impl Target for DemoTarget {
    fn name(&self) -> &str {
        "demo"
    }

    fn tiles(&self) -> &[Tile] {
        &TILES
    }

    fn num_registers(&self) -> usize {
        3
    }

    fn register_name(&self, reg: PReg) -> String {
        format!("r{}", reg.0)
    }

    fn max_block_len(&self) -> usize {
        8
    }

    fn abi_arg_registers(&self) -> &[PReg] {
        const ARGS: [PReg; 2] = [PReg(0), PReg(1)];
        &ARGS
    }

    fn abi_return_register(&self) -> PReg {
        PReg(0)
    }

    fn emit_prologue(&self, frame_size: u32) -> Vec<AbstractInst> {
        if frame_size == 0 {
            return vec![];
        }
        vec![AbstractInst::new("sub_sp").with_imm(frame_size as i64)]
    }

    fn emit_epilogue(&self, frame_size: u32) -> Vec<AbstractInst> {
        if frame_size == 0 {
            return vec![];
        }
        vec![AbstractInst::new("add_sp").with_imm(frame_size as i64)]
    }

    fn emit_jump(&self, label: &str) -> AbstractInst {
        AbstractInst::new(format!("jmp {}", label))
    }

    fn emit_branch(&self, cond: VReg, then_label: &str) -> AbstractInst {
        AbstractInst::new(format!("brnz {}", then_label)).with_uses(vec![cond])
    }

    fn emit_return(&self, value: Option<VReg>) -> Vec<AbstractInst> {
        match value {
            Some(v) => vec![AbstractInst::new("ret").with_uses(vec![v])],
            None => vec![AbstractInst::new("ret")],
        }
    }

    fn emit_call(&self, callee: &str, args: &[VReg], result: Option<VReg>) -> Vec<AbstractInst> {
        let mut inst = AbstractInst::new(format!("call {}", callee)).with_uses(args.to_vec());
        if let Some(r) = result {
            inst = inst.with_def(r);
        }
        vec![inst]
    }

    fn emit_move(&self, dst: VReg, src: VReg) -> AbstractInst {
        AbstractInst::new("mov").with_def(dst).with_uses(vec![src]).as_move()
    }

    fn emit_frame_load(&self, dst: VReg, offset: i32) -> AbstractInst {
        AbstractInst::new("ld_spill").with_def(dst).with_imm(offset as i64)
    }

    fn emit_frame_store(&self, src: VReg, offset: i32) -> AbstractInst {
        AbstractInst::new("st_spill").with_uses(vec![src]).with_imm(offset as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tile_list_has_no_duplicate_mnemonics_at_the_same_pattern_shape() {
        let target = DemoTarget;
        assert!(target.tiles().iter().any(|t| t.mnemonic == "addi"));
        assert!(target.tiles().iter().any(|t| t.mnemonic == "li"));
    }

    #[test]
    fn abi_registers_are_distinct() {
        let target = DemoTarget;
        assert_ne!(target.abi_arg_registers()[0], target.abi_arg_registers()[1]);
    }
}
